//! Streaming XML Flattener
//!
//! Turns one document's element tree into a [`FlatRecord`]: a mapping from
//! dot-joined ancestor-tag paths to the text values observed at each path,
//! in document order. The walk keeps an explicit stack of open element
//! names instead of recursing, so pathologically deep documents cannot
//! overflow the call stack.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{FlattenError, Result};

/// Separator between element names in a record path, e.g. `.Return.EIN`.
pub const PATH_SEPARATOR: char = '.';

/// Path-keyed record produced by flattening a single document.
///
/// Paths are unique keys; each maps to the ordered sequence of trimmed,
/// non-empty text values observed at that path. A path visited with no
/// text is still present, bound to an empty sequence, so schema
/// reconciliation can emit a blank cell instead of dropping the column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord {
    paths: HashMap<String, Vec<String>>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text value to the sequence for `path`, preserving
    /// occurrence order for repeated elements.
    fn push_value(&mut self, path: &str, value: String) {
        self.paths.entry(path.to_string()).or_default().push(value);
    }

    /// Register `path` with an empty sequence unless already present.
    fn register(&mut self, path: &str) {
        self.paths.entry(path.to_string()).or_default();
    }

    /// Values recorded at `path`, if the path was visited.
    pub fn values(&self, path: &str) -> Option<&[String]> {
        self.paths.get(path).map(|v| v.as_slice())
    }

    /// All visited paths, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    /// Number of distinct paths visited.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of paths that collected at least one text value.
    pub fn non_empty_paths(&self) -> usize {
        self.paths.values().filter(|v| !v.is_empty()).count()
    }
}

/// Flatten one XML document into a [`FlatRecord`].
///
/// Text content is trimmed and, when non-empty, attributed to the path of
/// the innermost open element. Element attributes are not recorded. Any
/// decoder-level syntax error, including a document that ends with
/// unclosed elements, aborts this document only; the caller decides how
/// the partial record is discarded.
pub fn flatten_document(bytes: &[u8]) -> Result<FlatRecord> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().check_end_names = true;

    let mut record = FlatRecord::new();
    let mut path = String::new();
    // Saved path lengths, one per open element.
    let mut open: Vec<usize> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                open.push(path.len());
                path.push(PATH_SEPARATOR);
                path.push_str(&String::from_utf8_lossy(e.local_name().as_ref()));
            }
            Event::End(_) => {
                record.register(&path);
                // An end tag with nothing open is rejected by the reader's
                // end-name check before this branch can underflow.
                if let Some(truncate_to) = open.pop() {
                    path.truncate(truncate_to);
                } else {
                    path.clear();
                }
            }
            Event::Empty(e) => {
                let truncate_to = path.len();
                path.push(PATH_SEPARATOR);
                path.push_str(&String::from_utf8_lossy(e.local_name().as_ref()));
                record.register(&path);
                path.truncate(truncate_to);
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| FlattenError::Xml(e.into()))?;
                let value = text.trim();
                if !value.is_empty() && !path.is_empty() {
                    record.push_value(&path, value.to_string());
                }
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(&t).into_owned();
                let value = text.trim();
                if !value.is_empty() && !path.is_empty() {
                    record.push_value(&path, value.to_string());
                }
            }
            Event::Eof => {
                if !open.is_empty() {
                    return Err(FlattenError::TruncatedDocument { depth: open.len() });
                }
                break;
            }
            // Declarations, comments, processing instructions, doctypes.
            _ => {}
        }
        buf.clear();
    }

    Ok(record)
}
