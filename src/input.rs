//! Input sources and line splitting.
//!
//! All sources are read as one logical byte stream, opened lazily and
//! strictly in order. Lines are split on that joined stream, so a file
//! that does not end in a newline runs into the first line of the next.

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::error::PipeError;
use crate::pipeline::{Pipeline, PipelineSpec, RunSummary};

/// One place input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    /// Sources for a list of command line paths. No paths means stdin;
    /// `-` stands for stdin.
    pub fn from_paths(paths: &[PathBuf]) -> Vec<Source> {
        if paths.is_empty() {
            return vec![Source::Stdin];
        }
        paths
            .iter()
            .map(|p| {
                if p.as_os_str() == "-" {
                    Source::Stdin
                } else {
                    Source::File(p.clone())
                }
            })
            .collect()
    }

    fn open(&self) -> io::Result<Box<dyn Read>> {
        match self {
            Source::Stdin => Ok(Box::new(io::stdin())),
            Source::File(path) => Ok(Box::new(File::open(path)?)),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stdin => write!(f, "<stdin>"),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Concatenation of sources as a single `Read`.
///
/// The next source is opened only once the current one reports EOF.
pub struct SourceChain {
    pending: VecDeque<Source>,
    current: Option<Box<dyn Read>>,
    label: String,
}

impl SourceChain {
    pub fn new(sources: Vec<Source>) -> Self {
        Self {
            pending: sources.into(),
            current: None,
            label: String::new(),
        }
    }

    /// The source being read (or last opened).
    pub fn current_label(&self) -> &str {
        &self.label
    }
}

impl Read for SourceChain {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if let Some(reader) = self.current.as_mut() {
                let n = reader.read(buf)?;
                if n > 0 || buf.is_empty() {
                    return Ok(n);
                }
                debug!(source = %self.label, "end of source");
                self.current = None;
            }
            let Some(next) = self.pending.pop_front() else {
                return Ok(0);
            };
            self.label = next.to_string();
            debug!(source = %self.label, "opening source");
            self.current = Some(next.open()?);
        }
    }
}

/// Lines of a `SourceChain`, without their terminators.
///
/// Splits on `\n` and strips one trailing `\r`. Bytes that are not valid
/// UTF-8 are replaced.
pub struct Lines {
    reader: BufReader<SourceChain>,
    buf: Vec<u8>,
}

impl Lines {
    pub fn new(chain: SourceChain) -> Self {
        Self {
            reader: BufReader::new(chain),
            buf: Vec::new(),
        }
    }
}

impl Iterator for Lines {
    type Item = Result<String, PipeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                }
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(source) => Some(Err(PipeError::Io {
                path: self.reader.get_ref().current_label().to_string(),
                source,
            })),
        }
    }
}

pub fn lines(sources: Vec<Source>) -> Lines {
    Lines::new(SourceChain::new(sources))
}

/// Run `spec` over every line of `sources`, writing results to `writer`.
///
/// The pipeline stays open across source boundaries and is finished once,
/// after the last source.
pub fn run<W: Write>(
    spec: &PipelineSpec,
    sources: Vec<Source>,
    writer: W,
) -> Result<RunSummary, PipeError> {
    let mut pipeline = Pipeline::build(spec, writer)?;
    for line in lines(sources) {
        pipeline.push(line?)?;
    }
    pipeline.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn read_lines(paths: Vec<PathBuf>) -> Vec<String> {
        lines(Source::from_paths(&paths))
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_from_paths() {
        assert_eq!(Source::from_paths(&[]), vec![Source::Stdin]);
        assert_eq!(
            Source::from_paths(&[PathBuf::from("a.txt"), PathBuf::from("-")]),
            vec![Source::File(PathBuf::from("a.txt")), Source::Stdin]
        );
    }

    #[test]
    fn test_lines_across_files() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.txt", b"one\ntwo\n");
        let b = write_file(&dir, "b.txt", b"three\n");
        assert_eq!(read_lines(vec![a, b]), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_missing_trailing_newline_joins_files() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.txt", b"one\ntw");
        let b = write_file(&dir, "b.txt", b"o\nthree");
        assert_eq!(read_lines(vec![a, b]), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_crlf_and_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.txt", b"dos\r\nbad\xff\n\n");
        assert_eq!(read_lines(vec![a]), vec!["dos", "bad\u{fffd}", ""]);
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.txt", b"");
        assert!(read_lines(vec![a]).is_empty());
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.txt", b"first\n");
        let missing = dir.path().join("missing.txt");
        let mut iter = lines(Source::from_paths(&[a, missing.clone()]));
        assert_eq!(iter.next().unwrap().unwrap(), "first");
        let err = iter.next().unwrap().unwrap_err();
        let PipeError::Io { path, .. } = &err else {
            panic!("expected an io error, got {err:?}");
        };
        assert_eq!(Path::new(path), missing.as_path());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_run_keeps_index_across_files() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.txt", b"a\nb\n");
        let b = write_file(&dir, "b.txt", b"c\nd\n");
        let spec = PipelineSpec {
            map: Some("i".into()),
            ..PipelineSpec::default()
        };
        let mut out = Vec::new();
        let summary = run(&spec, Source::from_paths(&[a, b]), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0\n1\n2\n3\n");
        assert_eq!(summary.lines_read, 4);
    }
}
