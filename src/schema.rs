//! Output Header Schema
//!
//! The header is the fixed, ordered list of output columns and the rule
//! mapping a record path to a column. It is computed once before any
//! worker starts and is immutable afterwards, so workers share it behind
//! an `Arc` without locking.
//!
//! The column set is a hand-maintained canonical list for the Form 990
//! e-file domain; a custom header can be loaded from a JSON file instead.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlattenError, Result};

/// One output column: a name plus the canonical record paths it accepts.
///
/// A column may instead bind to the source document's file name
/// (`document_name`), in which case `paths` is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub document_name: bool,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl Column {
    pub fn bound<S: Into<String>>(name: S, paths: &[&str]) -> Self {
        Self {
            name: name.into(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            document_name: false,
        }
    }

    pub fn document_name<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
            document_name: true,
        }
    }
}

/// Immutable ordered output schema shared read-only by all workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: Vec<Column>,
    by_path: HashMap<String, usize>,
}

impl Header {
    /// Canonical Form 990 header. Column order here is the column order of
    /// every emitted row.
    pub fn canonical() -> Self {
        let columns = vec![
            Column::document_name("FileName"),
            Column::bound("EIN", &[".Return.ReturnHeader.Filer.EIN", ".Return.EIN"]),
            Column::bound(
                "OrganizationName",
                &[
                    ".Return.ReturnHeader.Filer.BusinessName.BusinessNameLine1Txt",
                    ".Return.ReturnHeader.Filer.BusinessName.BusinessNameLine1",
                    ".Return.Filer.Name",
                ],
            ),
            Column::bound(
                "TaxYear",
                &[".Return.ReturnHeader.TaxYr", ".Return.ReturnHeader.TaxYear"],
            ),
            Column::bound(
                "ReturnType",
                &[
                    ".Return.ReturnHeader.ReturnTypeCd",
                    ".Return.ReturnHeader.ReturnType",
                ],
            ),
        ];

        Self::from_columns(columns).expect("canonical header is well-formed")
    }

    /// Build a header from an explicit column list, validating that column
    /// names are present and that no record path is claimed twice.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(FlattenError::Schema("header has no columns".to_string()));
        }

        let mut by_path = HashMap::new();
        for (index, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(FlattenError::Schema(format!(
                    "column {} has an empty name",
                    index
                )));
            }
            if !column.document_name && column.paths.is_empty() {
                return Err(FlattenError::Schema(format!(
                    "column '{}' binds no paths",
                    column.name
                )));
            }
            for path in &column.paths {
                if let Some(previous) = by_path.insert(path.clone(), index) {
                    return Err(FlattenError::Schema(format!(
                        "path '{}' bound by both '{}' and '{}'",
                        path, columns[previous].name, column.name
                    )));
                }
            }
        }

        Ok(Self { columns, by_path })
    }

    /// Load a header from a JSON column list.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let columns: Vec<Column> = serde_json::from_str(&text)
            .map_err(|e| FlattenError::Schema(format!("{}: {}", path.display(), e)))?;
        Self::from_columns(columns)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Ordered column names, i.e. the output file's header row.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Index of the column that accepts `path`, if any.
    pub fn column_for_path(&self, path: &str) -> Option<usize> {
        self.by_path.get(path).copied()
    }
}
