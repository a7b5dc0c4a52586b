//! Buffered key/value output.
//!
//! Uses itoa for integer formatting and ryu for float formatting
//! to avoid allocation in the hot path.

use crate::config;
use crate::kv::{Result, WmrError};
use crate::streaming::buffers::DEFAULT_OUTPUT_BUFFER;
use std::fmt::Display;
use std::io::{BufWriter, Write};

/// Emitter for `key<delimiter>value\n` records.
pub struct KvWriter<W: Write> {
    writer: BufWriter<W>,
    delimiter: u8,
    records: u64,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
}

impl<W: Write> KvWriter<W> {
    /// Create a writer using the process-wide delimiter.
    pub fn new(output: W) -> Self {
        Self::with_delimiter(output, config::delimiter())
    }

    pub fn with_delimiter(output: W, delimiter: u8) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output, delimiter)
    }

    /// Create a writer with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W, delimiter: u8) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            delimiter,
            records: 0,
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
        }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Number of records emitted so far.
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Emit one record.
    #[inline]
    pub fn emit(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        write_record(&mut self.writer, self.delimiter, key, value)?;
        self.records += 1;
        Ok(())
    }

    #[inline]
    pub fn emit_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.emit(key.as_bytes(), value.as_bytes())
    }

    /// Emit an integer value using itoa.
    #[inline]
    pub fn emit_int<I: itoa::Integer>(&mut self, key: &[u8], n: I) -> Result<()> {
        let value = self.itoa_buf.format(n);
        write_record(&mut self.writer, self.delimiter, key, value.as_bytes())?;
        self.records += 1;
        Ok(())
    }

    /// Emit a float value using ryu.
    ///
    /// Non-finite values are written as `NaN`, `inf` and `-inf`.
    #[inline]
    pub fn emit_float(&mut self, key: &[u8], f: f64) -> Result<()> {
        let value = self.ryu_buf.format(f);
        write_record(&mut self.writer, self.delimiter, key, value.as_bytes())?;
        self.records += 1;
        Ok(())
    }

    /// Emit any pair of displayable values.
    pub fn emit_display<K: Display, V: Display>(&mut self, key: K, value: V) -> Result<()> {
        write!(self.writer, "{}", key).map_err(WmrError::Io)?;
        self.writer
            .write_all(&[self.delimiter])
            .map_err(WmrError::Io)?;
        writeln!(self.writer, "{}", value).map_err(WmrError::Io)?;
        self.records += 1;
        Ok(())
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(WmrError::Io)?;
        Ok(())
    }
}

#[inline]
fn write_record<W: Write>(
    writer: &mut BufWriter<W>,
    delimiter: u8,
    key: &[u8],
    value: &[u8],
) -> Result<()> {
    writer.write_all(key).map_err(WmrError::Io)?;
    writer.write_all(&[delimiter]).map_err(WmrError::Io)?;
    writer.write_all(value).map_err(WmrError::Io)?;
    writer.write_all(b"\n").map_err(WmrError::Io)?;
    Ok(())
}
