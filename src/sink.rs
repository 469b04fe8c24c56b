//! Serialized CSV Sink
//!
//! The single synchronization point of the pipeline. All workers funnel
//! fully materialized rows through one mutex-guarded CSV writer, so no two
//! rows ever interleave at the byte level. The header row is written once
//! at creation, before any worker starts; every append is flushed so a
//! crash mid-run loses at most the in-flight row. Write and flush failures
//! are fatal to the run because a corrupted sink invalidates every future
//! row.

use std::fs::File;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::{FlattenError, Result};
use crate::schema::Header;

/// Durable, mutex-serialized appender for the output table.
pub struct CsvSink {
    writer: Mutex<csv::Writer<File>>,
    path: PathBuf,
}

impl CsvSink {
    /// Create (truncating any previous run's output) and write the header
    /// row. Field quoting follows RFC 4180: cells containing the delimiter,
    /// quote character, or line breaks are quoted by the writer.
    pub fn create(path: &Path, header: &Header) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .from_path(path)
            .map_err(|e| FlattenError::Sink {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;

        writer.write_record(header.names()).map_err(|e| FlattenError::Sink {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        writer.flush().map_err(|e| FlattenError::Sink {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        Ok(Self {
            writer: Mutex::new(writer),
            path: path.to_path_buf(),
        })
    }

    /// Append one row and flush it. Callers block here while another
    /// worker holds the writer.
    pub async fn append(&self, cells: &[String]) -> Result<()> {
        let mut writer = self.writer.lock().await;

        writer.write_record(cells).map_err(|e| FlattenError::Sink {
            path: self.path.clone(),
            details: e.to_string(),
        })?;
        writer.flush().map_err(|e| FlattenError::Sink {
            path: self.path.clone(),
            details: e.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_header_written_once_before_rows() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");

        let sink = CsvSink::create(&out, &Header::canonical()).unwrap();
        sink.append(&[
            "a.xml".to_string(),
            "1".to_string(),
            "ACME".to_string(),
            "2023".to_string(),
            "990".to_string(),
        ])
        .await
        .unwrap();

        let rows = read_rows(&out);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "FileName");
        assert_eq!(rows[1][0], "a.xml");
    }

    #[tokio::test]
    async fn test_create_truncates_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        std::fs::write(&out, "stale,content\nfrom,last,run\n").unwrap();

        let _sink = CsvSink::create(&out, &Header::canonical()).unwrap();

        let rows = read_rows(&out);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "FileName");
    }

    #[tokio::test]
    async fn test_fields_with_delimiter_quote_and_newline_survive() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");

        let header =
            Header::from_columns(vec![crate::schema::Column::bound("V", &[".r.v"])]).unwrap();
        let sink = CsvSink::create(&out, &header).unwrap();

        let tricky = vec![
            "has,comma".to_string(),
            "has \"quote\"".to_string(),
            "has\nnewline".to_string(),
        ];
        for cell in &tricky {
            sink.append(std::slice::from_ref(cell)).await.unwrap();
        }

        let rows = read_rows(&out);
        assert_eq!(rows[1][0], "has,comma");
        assert_eq!(rows[2][0], "has \"quote\"");
        assert_eq!(rows[3][0], "has\nnewline");
    }

    #[tokio::test]
    async fn test_concurrent_appends_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");

        let header =
            Header::from_columns(vec![crate::schema::Column::bound("V", &[".r.v"])]).unwrap();
        let sink = Arc::new(CsvSink::create(&out, &header).unwrap());

        let mut tasks = Vec::new();
        for worker in 0..8 {
            let sink = Arc::clone(&sink);
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    sink.append(&[format!("w{}-row{}", worker, i)]).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let rows = read_rows(&out);
        assert_eq!(rows.len(), 1 + 8 * 50);
        // Every data row is a single intact cell of the expected shape.
        for row in &rows[1..] {
            assert_eq!(row.len(), 1);
            assert!(row[0].starts_with('w'), "corrupt row: {:?}", row);
            assert!(row[0].contains("-row"), "corrupt row: {:?}", row);
        }
    }

    #[tokio::test]
    async fn test_create_fails_for_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing-subdir").join("out.csv");

        let result = CsvSink::create(&out, &Header::canonical());
        assert!(matches!(result, Err(FlattenError::Sink { .. })));
    }
}
