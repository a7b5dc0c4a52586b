//! Line-oriented key/value input.

use crate::config;
use crate::streaming::buffers::DEFAULT_INPUT_BUFFER;
use crate::streaming::parsing::split_kv_pair;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors raised by the map/reduce shim.
#[derive(Error, Debug)]
pub enum WmrError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot decode value '{value}' as {target}: {message}")]
    Decode {
        value: String,
        target: &'static str,
        message: String,
    },

    #[error("Invalid delimiter: {0}")]
    InvalidDelimiter(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Input not sorted: {0}")]
    Unsorted(String),
}

pub type Result<T> = std::result::Result<T, WmrError>;

/// A source of newline-terminated records.
///
/// `read_line` fills a caller-owned buffer with the next line, without its
/// trailing `\n`, and returns `Ok(false)` at end of input. The source keeps
/// no reference to the buffer once the call returns, so callers are free to
/// reuse or swap buffers between reads.
pub trait LineSource {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<bool>;
}

impl<S: LineSource + ?Sized> LineSource for &mut S {
    #[inline]
    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        (**self).read_line(buf)
    }
}

/// Buffered line reader over any readable source.
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
}

impl LineReader<File> {
    /// Open an input file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_INPUT_BUFFER)
    }

    /// Create a reader with custom buffer capacity.
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            line_number: 0,
        }
    }

    /// Number of lines read so far, empty ones included.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: Read> LineSource for LineReader<R> {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        buf.clear();
        if self.reader.read_until(b'\n', buf)? == 0 {
            return Ok(false);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        self.line_number += 1;
        Ok(true)
    }
}

/// An owned key/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Split a raw line on the first `delimiter`. Returns None for an empty line.
    pub fn from_line(line: &[u8], delimiter: u8) -> Option<Self> {
        split_kv_pair(line, delimiter).map(|(key, value)| Self::new(key, value))
    }

    pub fn key_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// Parse key/value pairs from a string, skipping empty lines.
///
/// Uses the process-wide delimiter.
pub fn parse_pairs(content: &str) -> Vec<KeyValue> {
    let delimiter = config::delimiter();
    content
        .split('\n')
        .filter_map(|line| KeyValue::from_line(line.as_bytes(), delimiter))
        .collect()
}
