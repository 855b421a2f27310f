//! Classification of user-interaction events against the annotated tree.
//!
//! Classification is a pure function over a serializable snapshot of the
//! event target and its surroundings. The production adapter captures the
//! snapshot from whatever UI framework delivered the event; nothing here
//! touches a live DOM, which keeps the routing decision unit-testable.

use crate::fragment::Element;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fallback payload text when a note's `content_for_{id}` element is absent.
pub const MISSING_NOTE_TEXT: &str = "Note content not found.";

/// Attributes of one element, captured at event time.
///
/// `data` holds `data-*` attributes keyed without the `data-` prefix, so the
/// verse id lives under `"verse"` and the descriptor under
/// `"verse-descriptor"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ElementSnapshot {
    pub fn data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    fn class_contains(&self, needle: &str) -> bool {
        self.class
            .as_deref()
            .is_some_and(|class| class.contains(needle))
    }
}

impl From<&Element> for ElementSnapshot {
    fn from(element: &Element) -> Self {
        let mut data = BTreeMap::new();
        for (key, value) in &element.attrs {
            if let Some(name) = key.strip_prefix("data-") {
                data.insert(name.to_string(), value.clone());
            }
        }
        Self {
            id: element.attr("id").map(str::to_string),
            class: element.attr("class").map(str::to_string),
            href: element.attr("href").map(str::to_string),
            text: Some(element.text_content()),
            data,
        }
    }
}

/// Everything the classifier may look at for one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub target: ElementSnapshot,
    /// The target's parent element, when it has one.
    #[serde(default)]
    pub parent: Option<ElementSnapshot>,
    /// Nearest `verse-link`-classed element within the enclosing verse
    /// container, used as best-effort verse context for word lookups.
    #[serde(default)]
    pub container_verse_link: Option<ElementSnapshot>,
    /// Text content of note-body elements, keyed by their DOM id.
    #[serde(default)]
    pub note_contents: BTreeMap<String, String>,
}

/// A structured verse reference recomputed from DOM attributes on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseDescriptor {
    pub descriptor: Option<String>,
    pub verse: Option<String>,
    pub id: Option<String>,
    pub href: Option<String>,
}

impl VerseDescriptor {
    /// An all-`None` descriptor marks an invalid verse target; callers must
    /// treat it as a no-op.
    pub fn is_empty(&self) -> bool {
        self.descriptor.is_none() && self.verse.is_none() && self.id.is_none() && self.href.is_none()
    }
}

/// Result of classifying one interaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClassifiedEvent {
    Word {
        text: String,
        verse: Option<VerseDescriptor>,
    },
    Verse {
        descriptor: VerseDescriptor,
    },
    Note {
        id: String,
        text: String,
    },
    Empty,
}

/// Classifies an event snapshot into a popup routing decision.
///
/// Checks class-attribute substring containment in fixed order: `word`, then
/// `verse`, then `note-tag`; the first hit wins and anything else is
/// [`ClassifiedEvent::Empty`]. A node carrying both `word` and `verse`
/// tokens therefore classifies as a word; that precedence is inherited from
/// the shipped UI and deliberately left unchanged.
pub fn classify(snapshot: &EventSnapshot) -> ClassifiedEvent {
    if snapshot.target.class_contains("word") {
        return ClassifiedEvent::Word {
            text: snapshot.target.text.clone().unwrap_or_default(),
            verse: snapshot
                .container_verse_link
                .as_ref()
                .map(descriptor_from_verse_link),
        };
    }

    if snapshot.target.class_contains("verse") {
        return ClassifiedEvent::Verse {
            descriptor: descriptor_from_parent(snapshot),
        };
    }

    if snapshot.target.class_contains("note-tag") {
        let id = snapshot.target.id.clone().unwrap_or_default();
        let text = snapshot
            .note_contents
            .get(&format!("content_for_{id}"))
            .cloned()
            .unwrap_or_else(|| MISSING_NOTE_TEXT.to_string());
        return ClassifiedEvent::Note { id, text };
    }

    ClassifiedEvent::Empty
}

/// Verse context read off a rewritten `verse-link` element.
fn descriptor_from_verse_link(link: &ElementSnapshot) -> VerseDescriptor {
    VerseDescriptor {
        descriptor: link.data("verse-descriptor").map(str::to_string),
        verse: link.data("verse").map(str::to_string),
        id: link
            .data("original-id")
            .map(str::to_string)
            .or_else(|| link.id.clone()),
        href: link.href.clone(),
    }
}

/// Descriptor for a clicked verse anchor: attributes come from the anchor's
/// parent element, the href from the anchor itself. A parent without
/// `data-verse-descriptor` yields the all-`None` descriptor.
fn descriptor_from_parent(snapshot: &EventSnapshot) -> VerseDescriptor {
    match snapshot.parent.as_ref() {
        Some(parent) if parent.data("verse-descriptor").is_some() => VerseDescriptor {
            descriptor: parent.data("verse-descriptor").map(str::to_string),
            verse: parent.data("verse").map(str::to_string),
            id: parent.id.clone(),
            href: snapshot.target.href.clone(),
        },
        _ => VerseDescriptor::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_class(class: &str) -> EventSnapshot {
        EventSnapshot {
            target: ElementSnapshot {
                class: Some(class.to_string()),
                ..ElementSnapshot::default()
            },
            ..EventSnapshot::default()
        }
    }

    #[test]
    fn highlighted_word_classifies_as_word() {
        let mut snapshot = snapshot_with_class("word highlighted");
        snapshot.target.text = Some("νόμε".to_string());
        let event = classify(&snapshot);
        assert_eq!(
            event,
            ClassifiedEvent::Word {
                text: "νόμε".to_string(),
                verse: None,
            }
        );
    }

    #[test]
    fn word_carries_verse_context_from_container_link() {
        let mut snapshot = snapshot_with_class("word");
        snapshot.target.text = Some("λόγος".to_string());
        snapshot.container_verse_link = Some(ElementSnapshot {
            id: Some("main-v1".to_string()),
            class: Some("verse-link".to_string()),
            href: Some("/work/x/1/1".to_string()),
            text: Some("1".to_string()),
            data: BTreeMap::from([
                ("verse".to_string(), "1".to_string()),
                ("verse-descriptor".to_string(), "John 1:1".to_string()),
                ("original-id".to_string(), "v1".to_string()),
            ]),
        });
        let event = classify(&snapshot);
        let ClassifiedEvent::Word { verse, .. } = event else {
            panic!("expected word event, got {event:?}");
        };
        let verse = verse.expect("verse context present");
        assert_eq!(verse.descriptor.as_deref(), Some("John 1:1"));
        assert_eq!(verse.verse.as_deref(), Some("1"));
        assert_eq!(verse.id.as_deref(), Some("v1"));
        assert_eq!(verse.href.as_deref(), Some("/work/x/1/1"));
    }

    #[test]
    fn word_precedes_verse_when_both_tokens_present() {
        let snapshot = snapshot_with_class("word verse");
        assert!(matches!(classify(&snapshot), ClassifiedEvent::Word { .. }));
    }

    #[test]
    fn verse_descriptor_reads_parent_attributes_and_anchor_href() {
        let mut snapshot = snapshot_with_class("verse-link");
        snapshot.target.href = Some("/work/x/3/16".to_string());
        snapshot.parent = Some(ElementSnapshot {
            id: Some("verse-16".to_string()),
            data: BTreeMap::from([
                ("verse".to_string(), "16".to_string()),
                ("verse-descriptor".to_string(), "John 3:16".to_string()),
            ]),
            ..ElementSnapshot::default()
        });
        let event = classify(&snapshot);
        assert_eq!(
            event,
            ClassifiedEvent::Verse {
                descriptor: VerseDescriptor {
                    descriptor: Some("John 3:16".to_string()),
                    verse: Some("16".to_string()),
                    id: Some("verse-16".to_string()),
                    href: Some("/work/x/3/16".to_string()),
                }
            }
        );
    }

    #[test]
    fn missing_descriptor_yields_empty_verse_payload() {
        let mut snapshot = snapshot_with_class("verse-link");
        snapshot.parent = Some(ElementSnapshot::default());
        let ClassifiedEvent::Verse { descriptor } = classify(&snapshot) else {
            panic!("expected verse event");
        };
        assert!(descriptor.is_empty());

        let snapshot = snapshot_with_class("verse-link");
        let ClassifiedEvent::Verse { descriptor } = classify(&snapshot) else {
            panic!("expected verse event");
        };
        assert!(descriptor.is_empty());
    }

    #[test]
    fn note_resolves_content_by_id() {
        let mut snapshot = snapshot_with_class("note-tag");
        snapshot.target.id = Some("n1".to_string());
        snapshot
            .note_contents
            .insert("content_for_n1".to_string(), "see also Matt 5".to_string());
        assert_eq!(
            classify(&snapshot),
            ClassifiedEvent::Note {
                id: "n1".to_string(),
                text: "see also Matt 5".to_string(),
            }
        );
    }

    #[test]
    fn note_lookup_miss_returns_fallback_text() {
        let mut snapshot = snapshot_with_class("note-tag");
        snapshot.target.id = Some("n2".to_string());
        assert_eq!(
            classify(&snapshot),
            ClassifiedEvent::Note {
                id: "n2".to_string(),
                text: MISSING_NOTE_TEXT.to_string(),
            }
        );
    }

    #[test]
    fn unclassified_targets_are_empty() {
        assert_eq!(classify(&snapshot_with_class("paragraph")), ClassifiedEvent::Empty);
        assert_eq!(classify(&EventSnapshot::default()), ClassifiedEvent::Empty);
    }

    #[test]
    fn snapshot_from_element_splits_data_attributes() {
        let fragment = crate::fragment::Fragment::parse(
            r#"<a class="verse-link" href="/w/1" data-verse="1" data-original-id="v1" id="main-v1">1</a>"#,
        )
        .expect("fragment parses");
        let element = fragment.nodes[0].as_element().expect("element");
        let snapshot = ElementSnapshot::from(element);
        assert_eq!(snapshot.id.as_deref(), Some("main-v1"));
        assert_eq!(snapshot.data("verse"), Some("1"));
        assert_eq!(snapshot.data("original-id"), Some("v1"));
        assert_eq!(snapshot.text.as_deref(), Some("1"));
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = ClassifiedEvent::Note {
            id: "n1".to_string(),
            text: "text".to_string(),
        };
        let json = serde_json::to_value(&event).expect("serializes");
        assert_eq!(json["kind"], "note");
        assert_eq!(json["id"], "n1");
    }
}
