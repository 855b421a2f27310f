//! Rewrite rules that decorate a parsed chapter fragment with interactivity
//! metadata: word-highlight wrappers, normalized verse links, and
//! notes-indicator classes.

use crate::fragment::{Element, Fragment, FragmentError, Node};
use crate::matcher;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Backend notes metadata for one verse, as returned by the notes endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub verse_indicator: String,
}

/// Inputs for one annotation pass.
///
/// All fields are read-only snapshots for the duration of the pass; the
/// rewrite rules never mutate them. `id_prefix` keeps element ids unique when
/// the same chapter is rendered twice for parallel-work comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotateOptions<'a> {
    /// Words to highlight, in order; the match position selects the
    /// `highlight{i}` color class.
    pub highlight_set: &'a [String],
    /// Verse id whose link gets the `highlighted` class, compared by plain
    /// string equality against `data-verse`.
    pub highlighted_verse: Option<&'a str>,
    /// Prefix prepended to rewritten element ids.
    pub id_prefix: &'a str,
    /// Verses that carry user notes; `None` disables the notes indicator.
    pub notes: Option<&'a [NoteMetadata]>,
}

/// Parses a chapter fragment and applies the rewrite rules to every node.
///
/// The pass is synchronous end-to-end. Unparseable input surfaces as a
/// [`FragmentError`] so the UI can show a load-failure state instead of a
/// blank or truncated chapter.
pub fn annotate_fragment(
    html: &str,
    options: &AnnotateOptions<'_>,
) -> Result<Fragment, FragmentError> {
    let mut fragment = Fragment::parse(html)?;
    annotate_tree(&mut fragment, options);
    Ok(fragment)
}

/// Applies the rewrite rules to an already parsed tree.
pub fn annotate_tree(fragment: &mut Fragment, options: &AnnotateOptions<'_>) {
    for node in &mut fragment.nodes {
        rewrite_node(node, options);
    }
}

fn rewrite_node(node: &mut Node, options: &AnnotateOptions<'_>) {
    if let Node::Element(element) = node {
        apply_rules(element, options);
        for child in &mut element.children {
            rewrite_node(child, options);
        }
    }
}

/// The rule table. Rules are checked in order and the first applicable rule
/// wins; nodes no rule applies to pass through unmodified.
fn apply_rules(element: &mut Element, options: &AnnotateOptions<'_>) {
    // Rule 1: word highlight. Requires the class attribute to be exactly
    // `word`, a text first child, and a non-empty highlight set.
    if element.attr("class") == Some("word") && !options.highlight_set.is_empty() {
        if let Some(Node::Text { text }) = element.children.first() {
            if let Some(index) = matcher::find_match_index(options.highlight_set, text) {
                element.set_attr("class", format!("word highlighted highlight{index}"));
            }
            return;
        }
    }

    // Rule 2: verse link. Any node carrying `data-verse` is rebuilt with a
    // normalized attribute set.
    if element.attr("data-verse").is_some() {
        rewrite_verse_link(element, options);
        return;
    }

    // Rule 3: notes indicator on verse containers, in place.
    if element.attr("class") == Some("verse-container") {
        if let Some(notes) = options.notes {
            match verse_number_from_id(element.attr("id")) {
                Some(number) => {
                    if notes.iter().any(|note| note.verse_indicator == number) {
                        let classes = element.attr("class").unwrap_or_default().to_string();
                        element.set_attr("class", format!("{classes} noted"));
                    }
                }
                None => {
                    // Caller data-integrity defect: report and keep going
                    // rather than aborting the fragment.
                    warn!(
                        id = element.attr("id").unwrap_or("<missing>"),
                        "verse container id has no parsable verse number; skipping notes indicator"
                    );
                }
            }
        }
    }
}

fn rewrite_verse_link(element: &mut Element, options: &AnnotateOptions<'_>) {
    let verse = element.attr("data-verse").unwrap_or_default().to_string();
    let href = element.attr("href").map(str::to_string);
    let descriptor = element.attr("data-verse-descriptor").map(str::to_string);
    let original_id = element.attr("id").map(str::to_string);

    let highlighted = options.highlighted_verse == Some(verse.as_str());
    element.attrs.clear();
    element.set_attr(
        "class",
        if highlighted {
            "verse-link highlighted"
        } else {
            "verse-link"
        },
    );
    if let Some(href) = href {
        element.set_attr("href", href);
    }
    element.set_attr("data-verse", verse);
    if let Some(descriptor) = descriptor {
        element.set_attr("data-verse-descriptor", descriptor);
    }
    if let Some(original_id) = original_id {
        element.set_attr("id", format!("{}{original_id}", options.id_prefix));
        element.set_attr("data-original-id", original_id);
    }
}

/// Extracts the digits following the literal `verse-` in a container id.
/// Returns `None` for missing ids and ids that don't match the pattern.
fn verse_number_from_id(id: Option<&str>) -> Option<String> {
    let id = id?;
    let start = id.find("verse-")? + "verse-".len();
    let digits: String = id[start..]
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    if digits.is_empty() { None } else { Some(digits) }
}
