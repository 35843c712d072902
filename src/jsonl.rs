use crate::error::{LoadError, Result};
use crate::models::Record;
use crate::source::{open_input, MalformedTracker, RecordSource};
use std::io::BufRead;
use std::path::Path;
use tracing::info;

/// Reads one JSON object per line, skipping lines that fail to parse.
pub struct JsonLinesSource {
    name: String,
    reader: Box<dyn BufRead>,
    buf: Vec<u8>,
    line_no: u64,
    malformed: MalformedTracker,
    failure: Option<LoadError>,
    done: bool,
}

impl JsonLinesSource {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = open_input(path)?;
        info!(path = %path.display(), "Reading JSON lines");
        Ok(Self::from_reader(&path.display().to_string(), reader))
    }

    pub fn from_reader(name: &str, reader: Box<dyn BufRead>) -> Self {
        Self {
            name: name.to_string(),
            reader,
            buf: Vec::with_capacity(4096),
            line_no: 0,
            malformed: MalformedTracker::new(),
            failure: None,
            done: false,
        }
    }

    pub fn tracker(&self) -> &MalformedTracker {
        &self.malformed
    }

    fn finish(&mut self) -> Option<Record> {
        self.done = true;
        self.malformed.finish(&self.name);
        None
    }
}

impl Iterator for JsonLinesSource {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return self.finish(),
                Ok(_) => {}
                Err(source) => {
                    self.done = true;
                    self.failure = Some(LoadError::ReadFailure {
                        source_name: self.name.clone(),
                        location: format!("line {}", self.line_no),
                        source,
                    });
                    return None;
                }
            }
            self.line_no += 1;

            let line = self.buf.trim_ascii_end();
            match serde_json::from_slice::<Record>(line) {
                Ok(record) => return Some(record),
                Err(e) => {
                    let err = LoadError::MalformedRecord {
                        location: format!("{}:{}", self.name, self.line_no),
                        reason: e.to_string(),
                    };
                    self.malformed.record(&self.name, &err);
                }
            }
        }
        None
    }
}

impl RecordSource for JsonLinesSource {
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
    use std::io::{Cursor, Read};

    fn source(text: &str) -> JsonLinesSource {
        JsonLinesSource::from_reader("test", Box::new(Cursor::new(text.as_bytes().to_vec())))
    }

    #[test]
    fn parses_each_line() {
        let mut src = source("{\"id\":1,\"title\":\"A\"}\n{\"id\":2,\"title\":\"B\"}\n");
        let first = src.next().unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(first["title"], "A");
        assert_eq!(src.next().unwrap()["id"], 2);
        assert!(src.next().is_none());
        assert_eq!(src.malformed(), 0);
    }

    #[test]
    fn keeps_field_order() {
        let mut src = source("{\"z\":1,\"a\":2,\"m\":3}\n");
        let keys: Vec<String> = src.next().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn handles_missing_trailing_newline_and_crlf() {
        let src = source("{\"id\":1}\r\n{\"id\":2}");
        assert_eq!(src.count(), 2);
    }

    #[test]
    fn skips_and_counts_malformed_lines() {
        let text = "{\"id\":1}\n<malformed>\n{\"id\":2}\n[1,2]\n\n{\"id\":3}\n";
        let mut src = source(text);
        let ids: Vec<i64> = src.by_ref().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(src.malformed(), 3);
    }

    #[test]
    fn logs_only_first_ten_malformed() {
        let mut text = String::new();
        for i in 0..25 {
            text.push_str("not json\n");
            text.push_str(&format!("{{\"id\":{i}}}\n"));
        }
        let mut src = source(&text);
        assert_eq!(src.by_ref().count(), 25);
        assert_eq!(src.malformed(), 25);
        assert_eq!(src.tracker().logged(), 10);
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let mut bytes = b"{\"id\":1}\n".to_vec();
        bytes.extend_from_slice(b"{\"t\":\"\xff\xfe\"}\n");
        bytes.extend_from_slice(b"{\"id\":2}\n");
        let mut src = JsonLinesSource::from_reader("bytes", Box::new(Cursor::new(bytes)));
        assert_eq!(src.by_ref().count(), 2);
        assert_eq!(src.malformed(), 1);
    }

    struct FailAfter {
        data: Cursor<Vec<u8>>,
    }

    impl std::io::Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream truncated",
                )),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn read_error_is_kept_as_failure() {
        let data = Cursor::new(b"{\"id\":1}\n{\"id\":2}\n{\"id\"".to_vec());
        let reader = std::io::BufReader::new(FailAfter { data });
        let mut src = JsonLinesSource::from_reader("cut", Box::new(reader));
        assert_eq!(src.by_ref().count(), 2);
        assert_eq!(src.malformed(), 0);
        match src.take_failure() {
            Some(LoadError::ReadFailure { source_name, location, source }) => {
                assert_eq!(source_name, "cut");
                assert_eq!(location, "line 2");
                assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected failure: {other:?}"),
        }
        assert!(src.take_failure().is_none());
        assert!(src.next().is_none());
    }

    #[test]
    fn clean_end_has_no_failure() {
        let mut src = source("{\"id\":1}\n");
        assert_eq!(src.by_ref().count(), 1);
        assert!(src.take_failure().is_none());
    }

    #[test]
    fn stays_exhausted() {
        let mut src = source("{\"id\":1}\n");
        assert!(src.next().is_some());
        assert!(src.next().is_none());
        assert!(src.next().is_none());
    }
}
