use crate::error::{LoadError, Result};
use crate::extract::enrich_row;
use crate::models::Record;
use crate::source::{open_input, MalformedTracker, RecordSource};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::Value;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Streams the `<row .../>` elements of a StackExchange table export.
///
/// Each row's attributes become a record, enriched with the DOIs found in its
/// `Body` or `Text`. The document is read one event at a time.
pub struct RowReader {
    name: String,
    reader: Reader<Box<dyn BufRead>>,
    buf: Vec<u8>,
    limit: Option<u64>,
    rows_seen: u64,
    dropped: u64,
    malformed: MalformedTracker,
    failure: Option<LoadError>,
    done: bool,
}

enum Step {
    Row(std::result::Result<Record, String>),
    Skip,
    Eof,
    Broken(String),
    Unreadable(io::Error),
}

fn io_error(err: Arc<io::Error>) -> io::Error {
    Arc::try_unwrap(err).unwrap_or_else(|shared| io::Error::new(shared.kind(), shared.to_string()))
}

/// Location of a table export, e.g. `data/ai/Posts.xml`.
pub fn table_path(data_dir: &Path, board: &str, table: &str) -> PathBuf {
    data_dir.join(board).join(format!("{table}.xml"))
}

impl RowReader {
    /// Opens an export. `limit` caps the number of rows read, counted before
    /// any row is dropped.
    pub fn open(path: &Path, limit: Option<u64>) -> Result<Self> {
        let reader = open_input(path)?;
        info!(path = %path.display(), ?limit, "Reading XML rows");
        Ok(Self::from_reader(&path.display().to_string(), reader, limit))
    }

    pub fn for_table(data_dir: &Path, board: &str, table: &str, limit: Option<u64>) -> Result<Self> {
        let mut reader = Self::open(&table_path(data_dir, board, table), limit)?;
        reader.name = format!("{board}/{table}");
        Ok(reader)
    }

    pub fn from_reader(name: &str, reader: Box<dyn BufRead>, limit: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            reader: Reader::from_reader(reader),
            buf: Vec::with_capacity(8192),
            limit,
            rows_seen: 0,
            dropped: 0,
            malformed: MalformedTracker::new(),
            failure: None,
            done: false,
        }
    }

    /// Rows read so far, including dropped and malformed ones.
    pub fn rows_seen(&self) -> u64 {
        self.rows_seen
    }

    /// Comment rows discarded because they cite no DOI.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn finish(&mut self) -> Option<Record> {
        self.done = true;
        info!(
            source = %self.name,
            rows = self.rows_seen,
            dropped = self.dropped,
            "Finished reading rows"
        );
        self.malformed.finish(&self.name);
        None
    }
}

fn row_attributes(start: &BytesStart) -> std::result::Result<Record, String> {
    let mut record = Record::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        record.insert(key, Value::String(value.into_owned()));
    }
    Ok(record)
}

impl Iterator for RowReader {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            if self.done {
                return None;
            }
            if self.limit.is_some_and(|limit| self.rows_seen >= limit) {
                return self.finish();
            }

            self.buf.clear();
            let step = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"row" => {
                    Step::Row(row_attributes(&e))
                }
                Ok(Event::Eof) => Step::Eof,
                Ok(_) => Step::Skip,
                Err(quick_xml::Error::Io(e)) => Step::Unreadable(io_error(e)),
                Err(e) => Step::Broken(e.to_string()),
            };
            let position = self.reader.buffer_position();

            match step {
                Step::Skip => continue,
                Step::Eof => return self.finish(),
                Step::Broken(reason) => {
                    let err = LoadError::MalformedRecord {
                        location: format!("{} byte {position}", self.name),
                        reason,
                    };
                    error!(source = %self.name, error = %err, "XML is unreadable past this point");
                    self.malformed.count_only();
                    return self.finish();
                }
                Step::Unreadable(source) => {
                    self.done = true;
                    self.failure = Some(LoadError::ReadFailure {
                        source_name: self.name.clone(),
                        location: format!("byte {position}"),
                        source,
                    });
                    return None;
                }
                Step::Row(Err(reason)) => {
                    self.rows_seen += 1;
                    let err = LoadError::MalformedRecord {
                        location: format!("{} row {}", self.name, self.rows_seen),
                        reason,
                    };
                    self.malformed.record(&self.name, &err);
                }
                Step::Row(Ok(record)) => {
                    self.rows_seen += 1;
                    match enrich_row(record) {
                        Some(record) => return Some(record),
                        None => self.dropped += 1,
                    }
                }
            }
        }
    }
}

impl RecordSource for RowReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn malformed(&self) -> u64 {
        self.malformed.count()
    }

    fn take_failure(&mut self) -> Option<LoadError> {
        self.failure.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DOIS_FIELD;
    use serde_json::json;
    use std::io::{Cursor, Read};

    fn reader(xml: &str, limit: Option<u64>) -> RowReader {
        RowReader::from_reader("test", Box::new(Cursor::new(xml.as_bytes().to_vec())), limit)
    }

    const POSTS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<posts>
  <row Id="1" PostTypeId="1" Title="Backprop" Body="&lt;p&gt;See 10.1038/323533a0&lt;/p&gt;" Score="5" />
  <row Id="2" PostTypeId="2" Body="&lt;p&gt;No refs here&lt;/p&gt;" Score="1" />
  <row Id="3" PostTypeId="1" Title="Attention" Body="10.48550/arXiv.1706.03762 and 10.1162/neco.1997.9.8.1735" Score="9" />
</posts>"#;

    #[test]
    fn yields_attributes_as_fields() {
        let rows: Vec<Record> = reader(POSTS, None).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Id"], "1");
        assert_eq!(rows[0]["Title"], "Backprop");
        assert_eq!(rows[0]["Body"], "<p>See 10.1038/323533a0</p>");
        assert_eq!(rows[0]["Score"], "5");
    }

    #[test]
    fn posts_get_dois_even_when_empty() {
        let rows: Vec<Record> = reader(POSTS, None).collect();
        assert_eq!(rows[0][DOIS_FIELD], json!(["10.1038/323533a0"]));
        assert_eq!(rows[1][DOIS_FIELD], json!([]));
        assert_eq!(
            rows[2][DOIS_FIELD],
            json!(["10.48550/arXiv.1706.03762", "10.1162/neco.1997.9.8.1735"])
        );
    }

    #[test]
    fn comments_without_doi_are_dropped() {
        let xml = r#"<comments>
  <row Id="10" PostId="1" Text="great answer" />
  <row Id="11" PostId="1" Text="cf. 10.1145/1327452.1327492" />
  <row Id="12" PostId="3" Text="thanks" />
</comments>"#;
        let mut rows = reader(xml, None);
        let kept: Vec<Record> = rows.by_ref().collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["Id"], "11");
        assert_eq!(rows.dropped(), 2);
        assert_eq!(rows.rows_seen(), 3);
    }

    #[test]
    fn links_pass_through() {
        let xml = r#"<postlinks><row Id="1" PostId="1" RelatedPostId="3" LinkTypeId="1" /></postlinks>"#;
        let rows: Vec<Record> = reader(xml, None).collect();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].contains_key(DOIS_FIELD));
        assert_eq!(rows[0]["RelatedPostId"], "3");
    }

    #[test]
    fn ignores_non_row_elements() {
        let xml = r#"<posts><meta a="b"/><row Id="1"></row><other Id="2"/></posts>"#;
        let rows: Vec<Record> = reader(xml, None).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Id"], "1");
    }

    #[test]
    fn limit_counts_rows_before_filtering() {
        let mut xml = String::from("<comments>");
        for i in 0..20 {
            if i % 2 == 0 {
                xml.push_str(&format!(r#"<row Id="{i}" Text="ref 10.1000/abc{i}" />"#));
            } else {
                xml.push_str(&format!(r#"<row Id="{i}" Text="nothing" />"#));
            }
        }
        xml.push_str("</comments>");

        let mut rows = reader(&xml, Some(5));
        let kept: Vec<Record> = rows.by_ref().collect();
        assert_eq!(rows.rows_seen(), 5);
        assert_eq!(kept.len(), 3);
        assert_eq!(rows.dropped(), 2);
    }

    #[test]
    fn limit_stops_before_broken_tail() {
        let xml = r#"<posts><row Id="1" /><row Id="2" /><row Id="3" /><<<garbage"#;
        let mut rows = reader(xml, Some(2));
        assert_eq!(rows.by_ref().count(), 2);
        assert_eq!(rows.malformed(), 0);
    }

    #[test]
    fn malformed_row_is_skipped() {
        let xml = r#"<posts><row Id="1" /><row Id="2" Id="2" /><row Id="3" /></posts>"#;
        let mut rows = reader(xml, None);
        let ids: Vec<String> = rows
            .by_ref()
            .map(|r| r["Id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(rows.malformed(), 1);
    }

    #[test]
    fn broken_document_ends_stream() {
        let xml = r#"<posts><row Id="1" /></wrong><row Id="2" /></posts>"#;
        let mut rows = reader(xml, None);
        assert_eq!(rows.by_ref().count(), 1);
        assert_eq!(rows.malformed(), 1);
        assert_eq!(rows.malformed.logged(), 0);
        assert!(rows.next().is_none());
        assert!(rows.take_failure().is_none());
    }

    struct Truncated(Cursor<Vec<u8>>);

    impl io::Read for Truncated {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream truncated")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn read_error_is_a_failure_not_malformed() {
        let xml = r#"<posts><row Id="1" /><row Id="2" /><row Id"#;
        let input = io::BufReader::new(Truncated(Cursor::new(xml.as_bytes().to_vec())));
        let mut rows = RowReader::from_reader("ai/Posts", Box::new(input), None);
        assert_eq!(rows.by_ref().count(), 2);
        assert_eq!(rows.malformed(), 0);
        match rows.take_failure() {
            Some(LoadError::ReadFailure { source_name, source, .. }) => {
                assert_eq!(source_name, "ai/Posts");
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn table_path_layout() {
        let path = table_path(Path::new("data"), "ai", "Posts");
        assert_eq!(path, PathBuf::from("data/ai/Posts.xml"));
    }

    #[test]
    fn missing_table_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = RowReader::for_table(dir.path(), "ai", "Posts", None);
        assert!(matches!(result, Err(LoadError::MissingResource { .. })));
    }
}
