//! Where identifiers come from.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A finite sequence of raw identifiers.
///
/// Either one identifier given directly, or a file with one identifier per
/// line. Lines are handed out untrimmed (apart from the line ending);
/// validation trims them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierSource {
    Single(String),
    File(PathBuf),
}

impl IdentifierSource {
    pub fn single(identifier: impl Into<String>) -> Self {
        Self::Single(identifier.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Treat `arg` as a file path if such a file exists, otherwise as an
    /// identifier.
    pub fn detect(arg: &str) -> Self {
        if Path::new(arg).is_file() {
            Self::file(arg)
        } else {
            Self::single(arg)
        }
    }

    /// Start reading from the beginning. Each call yields a fresh reader.
    pub async fn open(&self) -> io::Result<IdentifierReader> {
        let inner = match self {
            Self::Single(id) => ReaderInner::Single(Some(id.clone())),
            Self::File(path) => {
                let file = File::open(path).await?;
                ReaderInner::File(BufReader::new(file))
            }
        };
        Ok(IdentifierReader {
            inner,
            buf: Vec::new(),
        })
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Single(_) => None,
            Self::File(path) => Some(path),
        }
    }
}

impl fmt::Display for IdentifierSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(id) => write!(f, "identifier {id}"),
            Self::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

/// One entry read from an [`IdentifierSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLine {
    Text(String),
    /// A line that is not valid UTF-8, decoded lossily for reporting.
    InvalidUtf8(String),
}

enum ReaderInner {
    Single(Option<String>),
    File(BufReader<File>),
}

/// Lazy reader over an [`IdentifierSource`].
pub struct IdentifierReader {
    inner: ReaderInner,
    buf: Vec<u8>,
}

impl IdentifierReader {
    /// The next line, or `None` at the end. Only I/O failures are errors;
    /// undecodable lines come back as [`SourceLine::InvalidUtf8`].
    pub async fn next_identifier(&mut self) -> io::Result<Option<SourceLine>> {
        let file = match &mut self.inner {
            ReaderInner::Single(slot) => return Ok(slot.take().map(SourceLine::Text)),
            ReaderInner::File(file) => file,
        };

        self.buf.clear();
        if file.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        let line = match std::str::from_utf8(&self.buf) {
            Ok(text) => SourceLine::Text(text.to_owned()),
            Err(_) => SourceLine::InvalidUtf8(String::from_utf8_lossy(&self.buf).into_owned()),
        };
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    async fn drain(source: &IdentifierSource) -> Vec<SourceLine> {
        let mut reader = source.open().await.unwrap();
        let mut out = Vec::new();
        while let Some(line) = reader.next_identifier().await.unwrap() {
            out.push(line);
        }
        out
    }

    fn texts(lines: &[&str]) -> Vec<SourceLine> {
        lines.iter().map(|l| SourceLine::Text((*l).to_owned())).collect()
    }

    #[tokio::test]
    async fn single_yields_once() {
        let source = IdentifierSource::single("test:pid");
        assert_eq!(drain(&source).await, texts(&["test:pid"]));
    }

    #[tokio::test]
    async fn file_yields_lines_in_order_including_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "a:1\n  b:2 \r\n\nc:3\n").unwrap();

        let source = IdentifierSource::detect(file.path().to_str().unwrap());
        assert_eq!(source.path(), Some(file.path()));
        assert_eq!(drain(&source).await, texts(&["a:1", "  b:2 ", "", "c:3"]));
    }

    #[tokio::test]
    async fn undecodable_line_does_not_stop_reading() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"a:1\n\xfftest:2\nc:3").unwrap();

        let lines = drain(&IdentifierSource::file(file.path())).await;
        assert_eq!(
            lines,
            [
                SourceLine::Text("a:1".into()),
                SourceLine::InvalidUtf8("\u{fffd}test:2".into()),
                SourceLine::Text("c:3".into()),
            ]
        );
    }

    #[tokio::test]
    async fn file_source_is_restartable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a:1").unwrap();
        writeln!(file, "a:2").unwrap();

        let source = IdentifierSource::file(file.path());
        assert_eq!(drain(&source).await, drain(&source).await);
    }

    #[test]
    fn detect_falls_back_to_identifier() {
        let source = IdentifierSource::detect("test:does-not-exist");
        assert_eq!(source, IdentifierSource::single("test:does-not-exist"));
        assert_eq!(source.to_string(), "identifier test:does-not-exist");
    }

    #[test]
    fn detect_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        let arg = dir.path().to_str().unwrap();
        assert_eq!(IdentifierSource::detect(arg), IdentifierSource::single(arg));
    }

    #[tokio::test]
    async fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let source = IdentifierSource::file(dir.path().join("missing.txt"));
        assert!(source.open().await.is_err());
    }
}
