//! Streaming mapper driver.
//!
//! Reads lines, splits each into key and value on the first delimiter and
//! calls the mapper once per non-empty line. There is no grouping state.

use crate::config;
use crate::kv::{LineReader, LineSource, Result, WmrError};
use crate::streaming::buffers::{IoBuffers, DEFAULT_LINE_BUFFER};
use crate::streaming::output::KvWriter;
use crate::streaming::parsing::{split_kv_pair, words};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// A user mapper: called once per input record.
pub trait Mapper {
    fn map<W: Write>(&mut self, key: &[u8], value: &[u8], out: &mut KvWriter<W>) -> Result<()>;
}

/// Mappers shipped with the `wmr` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinMapper {
    /// Re-emit every record unchanged
    Identity,
    /// Emit `word<delim>1` for every whitespace-separated word of key and value
    Words,
    /// Emit `value<delim>key`
    Swap,
}

impl BuiltinMapper {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "identity" => Some(Self::Identity),
            "words" => Some(Self::Words),
            "swap" => Some(Self::Swap),
            _ => None,
        }
    }
}

impl Mapper for BuiltinMapper {
    fn map<W: Write>(&mut self, key: &[u8], value: &[u8], out: &mut KvWriter<W>) -> Result<()> {
        match self {
            Self::Identity => out.emit(key, value),
            Self::Words => {
                for word in words(key).chain(words(value)) {
                    out.emit(word, b"1")?;
                }
                Ok(())
            }
            Self::Swap => out.emit(value, key),
        }
    }
}

/// Streaming map command configuration.
#[derive(Debug, Clone)]
pub struct MapCommand {
    pub delimiter: u8,
    /// Use small I/O buffers
    pub low_memory: bool,
}

impl Default for MapCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl MapCommand {
    /// Create a command using the process-wide delimiter.
    pub fn new() -> Self {
        Self {
            delimiter: config::delimiter(),
            low_memory: false,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_low_memory(mut self, low_memory: bool) -> Self {
        self.low_memory = low_memory;
        self
    }

    /// Run a mapper over a file.
    pub fn run<P: AsRef<Path>, W: Write, M: Mapper>(
        &self,
        input_path: P,
        output: W,
        mapper: &mut M,
    ) -> Result<MapStats> {
        let file = std::fs::File::open(input_path)?;
        let buffers = IoBuffers::new(self.low_memory);
        let reader = LineReader::with_capacity(file, buffers.input);
        self.run_streaming(reader, output, |key, value, out| mapper.map(key, value, out))
    }

    /// Run a mapper over stdin.
    pub fn run_stdin<W: Write, M: Mapper>(&self, output: W, mapper: &mut M) -> Result<MapStats> {
        let stdin = io::stdin();
        let buffers = IoBuffers::new(self.low_memory);
        let reader = LineReader::with_capacity(stdin.lock(), buffers.input);
        self.run_streaming(reader, output, |key, value, out| mapper.map(key, value, out))
    }

    /// Core map loop.
    pub fn run_streaming<S, W, F>(&self, mut source: S, output: W, mut map: F) -> Result<MapStats>
    where
        S: LineSource,
        W: Write,
        F: FnMut(&[u8], &[u8], &mut KvWriter<W>) -> Result<()>,
    {
        let mut stats = MapStats::default();
        let buffers = IoBuffers::new(self.low_memory);
        let mut writer = KvWriter::with_capacity(buffers.output, output, self.delimiter);
        let mut line = Vec::with_capacity(DEFAULT_LINE_BUFFER);

        loop {
            match source.read_line(&mut line) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => return Err(WmrError::Io(e)),
            }
            stats.lines_read += 1;

            match split_kv_pair(&line, self.delimiter) {
                Some((key, value)) => map(key, value, &mut writer)?,
                None => stats.empty_lines += 1,
            }
        }

        writer.flush()?;
        stats.records_written = writer.records_written();
        info!(%stats, "map finished");
        Ok(stats)
    }
}

/// Statistics from a map run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MapStats {
    /// Physical lines read
    pub lines_read: u64,
    /// Empty lines skipped
    pub empty_lines: u64,
    /// Records emitted by the mapper
    pub records_written: u64,
}

impl std::fmt::Display for MapStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Lines: {}, Empty: {}, Emitted: {}",
            self.lines_read, self.empty_lines, self.records_written
        )
    }
}
