//! Annotation engine for a web-based ancient-Greek reading UI.
//!
//! The backend delivers each chapter as an HTML string; this crate parses it
//! into an owned render tree, decorates word and verse nodes with
//! interactivity metadata, and classifies interaction-event snapshots into
//! popup routing decisions. Everything is a synchronous, in-memory
//! transformation: no network, no persistence, no live DOM.

pub mod annotate;
pub mod classify;
pub mod debounce;
pub mod fragment;
pub mod matcher;

pub use annotate::{AnnotateOptions, NoteMetadata, annotate_fragment, annotate_tree};
pub use classify::{
    ClassifiedEvent, ElementSnapshot, EventSnapshot, MISSING_NOTE_TEXT, VerseDescriptor, classify,
};
pub use debounce::{RequestSequence, RequestTicket};
pub use fragment::{Element, Fragment, FragmentError, Node};
pub use matcher::{find_match_index, fold};
