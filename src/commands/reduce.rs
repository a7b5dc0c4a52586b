//! Streaming reducer driver.
//!
//! Calls the reducer once per group of the (externally sorted) input.
//!
//! # Algorithm
//!
//! 1. Prime the cursor by reading the first non-empty line
//! 2. Snapshot the current key into a driver-owned buffer
//! 3. Call the reducer with the key and a [`Values`] accessor for the group
//! 4. Discard whatever the reducer left unread, then repeat from 2
//!
//! The loop ends when the cursor reaches end of input.
//!
//! # Undrained groups
//!
//! A reducer that returns before pulling every value of its group does not
//! see the rest of it again: the leftover values are dropped (and counted
//! as skipped) before the next key is presented. Returning early is a way
//! for a reducer to ignore the tail of a group.
//!
//! # Memory Complexity
//!
//! O(1) in the number of values: two line buffers plus one key snapshot.

use crate::config;
use crate::kv::{LineReader, LineSource, Result, WmrError};
use crate::streaming::buffers::{IoBuffers, DEFAULT_KEY_BUFFER};
use crate::streaming::cursor::GroupCursor;
use crate::streaming::output::KvWriter;
use crate::streaming::validation::KeyOrderValidator;
use crate::streaming::values::Values;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// A user reducer: called once per distinct key.
pub trait Reducer {
    fn reduce<S: LineSource, W: Write>(
        &mut self,
        key: &[u8],
        values: &mut Values<'_, S>,
        out: &mut KvWriter<W>,
    ) -> Result<()>;
}

/// Reducers shipped with the `wmr` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinReducer {
    /// Re-emit every value under its key
    Identity,
    /// Sum the values as signed 64-bit integers; overflow is an error
    Sum,
    /// Count the values
    Count,
}

impl BuiltinReducer {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "identity" => Some(Self::Identity),
            "sum" => Some(Self::Sum),
            "count" => Some(Self::Count),
            _ => None,
        }
    }
}

impl Reducer for BuiltinReducer {
    fn reduce<S: LineSource, W: Write>(
        &mut self,
        key: &[u8],
        values: &mut Values<'_, S>,
        out: &mut KvWriter<W>,
    ) -> Result<()> {
        match self {
            Self::Identity => {
                while let Some(value) = values.next_value() {
                    out.emit(key, value)?;
                }
                Ok(())
            }
            Self::Sum => {
                let mut total: i64 = 0;
                for value in values.typed::<i64>() {
                    total = total.checked_add(value?).ok_or_else(|| {
                        WmrError::InvalidArgument(format!(
                            "sum overflows i64 for key '{}'",
                            String::from_utf8_lossy(key)
                        ))
                    })?;
                }
                out.emit_int(key, total)
            }
            Self::Count => {
                let n = values.count_remaining();
                out.emit_int(key, n)
            }
        }
    }
}

/// Streaming reduce command configuration.
#[derive(Debug, Clone)]
pub struct ReduceCommand {
    pub delimiter: u8,
    /// Require group keys in strictly ascending bytewise order
    pub verify_sorted: bool,
    /// Use small I/O buffers
    pub low_memory: bool,
}

impl Default for ReduceCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl ReduceCommand {
    /// Create a command using the process-wide delimiter.
    pub fn new() -> Self {
        Self {
            delimiter: config::delimiter(),
            verify_sorted: false,
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

    pub fn with_verify_sorted(mut self, verify: bool) -> Self {
        self.verify_sorted = verify;
        self
    }

    /// Run a reducer over a sorted file.
    pub fn run<P: AsRef<Path>, W: Write, R: Reducer>(
        &self,
        input_path: P,
        output: W,
        reducer: &mut R,
    ) -> Result<ReduceStats> {
        let file = std::fs::File::open(input_path)?;
        let buffers = IoBuffers::new(self.low_memory);
        let reader = LineReader::with_capacity(file, buffers.input);
        self.run_streaming(reader, output, |key, values, out| {
            reducer.reduce(key, values, out)
        })
    }

    /// Run a reducer over stdin.
    pub fn run_stdin<W: Write, R: Reducer>(
        &self,
        output: W,
        reducer: &mut R,
    ) -> Result<ReduceStats> {
        let stdin = io::stdin();
        let buffers = IoBuffers::new(self.low_memory);
        let reader = LineReader::with_capacity(stdin.lock(), buffers.input);
        self.run_streaming(reader, output, |key, values, out| {
            reducer.reduce(key, values, out)
        })
    }

    /// Build a cursor and writer around `source` and `output`, then drive.
    pub fn run_streaming<S, W, F>(&self, source: S, output: W, reduce: F) -> Result<ReduceStats>
    where
        S: LineSource,
        W: Write,
        F: FnMut(&[u8], &mut Values<'_, S>, &mut KvWriter<W>) -> Result<()>,
    {
        let mut cursor = GroupCursor::with_delimiter(source, self.delimiter);
        let buffers = IoBuffers::new(self.low_memory);
        let mut writer = KvWriter::with_capacity(buffers.output, output, self.delimiter);
        self.drive(&mut cursor, &mut writer, reduce)
    }

    /// Core reduce loop: one reducer call per group.
    pub fn drive<S, W, F>(
        &self,
        cursor: &mut GroupCursor<S>,
        writer: &mut KvWriter<W>,
        mut reduce: F,
    ) -> Result<ReduceStats>
    where
        S: LineSource,
        W: Write,
        F: FnMut(&[u8], &mut Values<'_, S>, &mut KvWriter<W>) -> Result<()>,
    {
        let mut stats = ReduceStats::default();
        let mut validator = self.verify_sorted.then(KeyOrderValidator::new);
        let mut key = Vec::with_capacity(DEFAULT_KEY_BUFFER);
        let records_before = writer.records_written();

        cursor.prime();
        while let Some((handle, current)) = cursor.current_group() {
            // Nested pulls overwrite the cursor's buffers; the reducer gets a copy
            key.clear();
            key.extend_from_slice(current);

            if let Some(v) = validator.as_mut() {
                v.validate(&key)?;
            }
            stats.groups += 1;

            let mut values = Values::new(cursor, handle);
            reduce(key.as_slice(), &mut values, writer)?;
            stats.values_delivered += values.delivered();

            let skipped = cursor.skip_group(handle);
            if skipped > 0 {
                debug!(
                    key = %String::from_utf8_lossy(&key),
                    skipped,
                    "reducer returned before draining its group"
                );
                stats.values_skipped += skipped;
            }
        }

        writer.flush()?;

        let cursor_stats = cursor.stats();
        stats.lines_read = cursor_stats.lines_read;
        stats.empty_lines = cursor_stats.empty_lines;
        stats.read_errors = cursor_stats.read_errors;
        stats.records_written = writer.records_written() - records_before;
        info!(%stats, "reduce finished");
        Ok(stats)
    }
}

/// Statistics from a reduce run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReduceStats {
    /// Physical lines read
    pub lines_read: u64,
    /// Empty lines skipped
    pub empty_lines: u64,
    /// Read failures treated as end of input
    pub read_errors: u64,
    /// Reducer invocations (distinct keys)
    pub groups: u64,
    /// Values pulled by the reducer
    pub values_delivered: u64,
    /// Values left unread by the reducer and dropped
    pub values_skipped: u64,
    /// Records emitted by the reducer
    pub records_written: u64,
}

impl std::fmt::Display for ReduceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Lines: {}, Groups: {}, Values: {}, Skipped: {}, Emitted: {}",
            self.lines_read,
            self.groups,
            self.values_delivered,
            self.values_skipped,
            self.records_written
        )?;
        if self.read_errors > 0 {
            write!(f, ", Read errors: {}", self.read_errors)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_builtin(reducer: BuiltinReducer, input: &str) -> Result<(String, ReduceStats)> {
        let mut output = Vec::new();
        let mut reducer = reducer;
        let stats = ReduceCommand::new().with_delimiter(b'\t').run_streaming(
            LineReader::new(input.as_bytes()),
            &mut output,
            |key, values, out| reducer.reduce(key, values, out),
        )?;
        Ok((String::from_utf8(output).unwrap(), stats))
    }

    #[test]
    fn test_identity_reducer() {
        let (out, stats) = run_builtin(BuiltinReducer::Identity, "a\t1\na\t2\nb\t3\n").unwrap();
        assert_eq!(out, "a\t1\na\t2\nb\t3\n");
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.values_delivered, 3);
        assert_eq!(stats.values_skipped, 0);
        assert_eq!(stats.records_written, 3);
    }

    #[test]
    fn test_sum_reducer() {
        let (out, _) = run_builtin(BuiltinReducer::Sum, "a\t1\na\t2\nb\t-3\nb\t10\nc\t7\n").unwrap();
        assert_eq!(out, "a\t3\nb\t7\nc\t7\n");
    }

    #[test]
    fn test_sum_reducer_bad_value() {
        let err = run_builtin(BuiltinReducer::Sum, "a\t1\na\tx\n").unwrap_err();
        assert!(matches!(err, WmrError::Decode { .. }));
    }

    #[test]
    fn test_sum_reducer_overflow() {
        let err = run_builtin(BuiltinReducer::Sum, "a\t9223372036854775807\na\t1\n").unwrap_err();
        assert!(matches!(err, WmrError::InvalidArgument(_)));
        assert!(err.to_string().contains("overflows i64 for key 'a'"));

        let err = run_builtin(BuiltinReducer::Sum, "b\t-9223372036854775808\nb\t-1\n").unwrap_err();
        assert!(matches!(err, WmrError::InvalidArgument(_)));

        // Reaching the bounds exactly is fine
        let (out, _) = run_builtin(BuiltinReducer::Sum, "c\t9223372036854775806\nc\t1\n").unwrap();
        assert_eq!(out, "c\t9223372036854775807\n");
    }

    #[test]
    fn test_count_reducer() {
        let (out, _) = run_builtin(BuiltinReducer::Count, "a\t1\na\t1\na\t1\nb\t1\n").unwrap();
        assert_eq!(out, "a\t3\nb\t1\n");
    }

    #[test]
    fn test_empty_input_never_calls_reducer() {
        let mut calls = 0;
        let stats = ReduceCommand::new()
            .with_delimiter(b'\t')
            .run_streaming(LineReader::new(&b"\n\n"[..]), Vec::new(), |_, _, _| {
                calls += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(calls, 0);
        assert_eq!(stats.groups, 0);
        assert_eq!(stats.empty_lines, 2);
    }

    #[test]
    fn test_undrained_group_is_skipped() {
        let mut seen = Vec::new();
        let stats = ReduceCommand::new()
            .with_delimiter(b'\t')
            .run_streaming(
                LineReader::new(&b"a\t1\na\t2\na\t3\nb\t4\nb\t5\n"[..]),
                Vec::new(),
                |key, values, _| {
                    // Take only the first value of every group
                    let first = values.next_value().map(|v| v.to_vec());
                    seen.push((key.to_vec(), first));
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (b"a".to_vec(), Some(b"1".to_vec())),
                (b"b".to_vec(), Some(b"4".to_vec()))
            ]
        );
        assert_eq!(stats.groups, 2);
        assert_eq!(stats.values_delivered, 2);
        assert_eq!(stats.values_skipped, 3);
    }

    #[test]
    fn test_reducer_reading_nothing_terminates() {
        let stats = ReduceCommand::new()
            .with_delimiter(b'\t')
            .run_streaming(
                LineReader::new(&b"a\t1\nb\t2\nc\t3\n"[..]),
                Vec::new(),
                |_, _, _| Ok(()),
            )
            .unwrap();
        assert_eq!(stats.groups, 3);
        assert_eq!(stats.values_skipped, 3);
    }

    #[test]
    fn test_verify_sorted_rejects_interleaved_keys() {
        let result = ReduceCommand::new()
            .with_delimiter(b'\t')
            .with_verify_sorted(true)
            .run_streaming(
                LineReader::new(&b"a\t1\nb\t2\na\t3\n"[..]),
                Vec::new(),
                |_, values, _| {
                    values.count_remaining();
                    Ok(())
                },
            );
        assert!(matches!(result, Err(WmrError::Unsorted(_))));
    }

    #[test]
    fn test_unsorted_input_without_verification() {
        // Without verification a returning key is simply a new group
        let (out, stats) = run_builtin(BuiltinReducer::Count, "a\t1\nb\t2\na\t3\n").unwrap();
        assert_eq!(out, "a\t1\nb\t1\na\t1\n");
        assert_eq!(stats.groups, 3);
    }

    #[test]
    fn test_reducer_error_stops_run() {
        let mut calls = 0;
        let result = ReduceCommand::new().with_delimiter(b'\t').run_streaming(
            LineReader::new(&b"a\t1\nb\t2\n"[..]),
            Vec::new(),
            |_, _, _| {
                calls += 1;
                Err(WmrError::Unsorted("boom".to_string()))
            },
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_stats_display() {
        let stats = ReduceStats {
            lines_read: 5,
            groups: 2,
            values_delivered: 4,
            values_skipped: 1,
            records_written: 2,
            ..Default::default()
        };
        assert_eq!(
            stats.to_string(),
            "Lines: 5, Groups: 2, Values: 4, Skipped: 1, Emitted: 2"
        );
    }
}
