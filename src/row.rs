//! Row Materialization
//!
//! Reconciles one [`FlatRecord`] against the immutable [`Header`] into a
//! fixed-width output row. Every row has exactly one cell per header
//! column: zero values resolve to an empty cell, one value is copied
//! verbatim, and repeated values are joined in document order with the
//! configured delimiter. Record paths the header does not claim are
//! counted for the run summary and dropped.

use std::sync::Arc;

use crate::flatten::FlatRecord;
use crate::schema::Header;

/// Default delimiter between repeated values in one cell.
pub const DEFAULT_MULTI_VALUE_DELIMITER: &str = "|";

/// One materialized output row plus its reconciliation observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedRow {
    /// Exactly one cell per header column.
    pub cells: Vec<String>,
    /// Record paths with no corresponding header column.
    pub unmapped_paths: usize,
}

/// Stateless reconciler shared by all workers.
#[derive(Debug, Clone)]
pub struct RowMaterializer {
    header: Arc<Header>,
    multi_value_delimiter: String,
}

impl RowMaterializer {
    pub fn new(header: Arc<Header>, multi_value_delimiter: String) -> Self {
        Self {
            header,
            multi_value_delimiter,
        }
    }

    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    /// Produce the row for one document. `document_name` fills any column
    /// bound to the source file name.
    pub fn materialize(&self, record: &FlatRecord, document_name: &str) -> MaterializedRow {
        let mut cells = Vec::with_capacity(self.header.len());

        for column in self.header.columns() {
            if column.document_name {
                cells.push(document_name.to_string());
                continue;
            }

            let mut values: Vec<&str> = Vec::new();
            for path in &column.paths {
                if let Some(observed) = record.values(path) {
                    values.extend(observed.iter().map(String::as_str));
                }
            }

            let cell = match values.len() {
                0 => String::new(),
                1 => values[0].to_string(),
                _ => values.join(&self.multi_value_delimiter),
            };
            cells.push(cell);
        }

        let unmapped_paths = record
            .paths()
            .filter(|path| self.header.column_for_path(path).is_none())
            .count();

        debug_assert_eq!(cells.len(), self.header.len());
        MaterializedRow {
            cells,
            unmapped_paths,
        }
    }
}
