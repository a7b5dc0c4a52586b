//! Grouped key/value cursor over sorted reducer input.
//!
//! The cursor holds exactly one look-ahead line. Values are handed out one
//! at a time, and each successful [`GroupCursor::get_value`] consumes one
//! line of input, so memory stays at two line buffers no matter how large a
//! group is.
//!
//! # Buffers
//!
//! Two line buffers alternate roles. Advancing flips an index and reads the
//! next line into the buffer that is not holding the value just returned,
//! so that value stays intact until the following call.
//!
//! # Handles
//!
//! Every change of key bumps a 64-bit epoch. A [`GroupHandle`] records the
//! epoch of the group it was issued for; a call presenting any other epoch
//! is answered with `None`. This guards against reading across a key
//! boundary with a stale handle. It is not a security boundary.

use crate::config;
use crate::kv::LineSource;
use crate::streaming::buffers::{DEFAULT_KEY_BUFFER, DEFAULT_LINE_BUFFER};
use crate::streaming::parsing::{split_kv_span, KvSpan};
use tracing::{trace, warn};

/// Token identifying one group of the reducer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupHandle {
    epoch: u64,
}

impl GroupHandle {
    /// Key epoch this handle was issued for.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Counters maintained while reading reducer input.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CursorStats {
    /// Physical lines read, empty ones included
    pub lines_read: u64,
    /// Empty lines skipped
    pub empty_lines: u64,
    /// Read failures, each of which ended the input
    pub read_errors: u64,
    /// Number of key transitions observed
    pub key_changes: u64,
}

/// Grouping engine over a [`LineSource`].
pub struct GroupCursor<S: LineSource> {
    source: S,
    delimiter: u8,
    lines: [Vec<u8>; 2],
    /// Index of the buffer holding the current (look-ahead) line.
    active: usize,
    current: Option<KvSpan>,
    last_key: Vec<u8>,
    epoch: u64,
    primed: bool,
    finished: bool,
    stats: CursorStats,
}

impl<S: LineSource> GroupCursor<S> {
    /// Create a cursor using the process-wide delimiter.
    pub fn new(source: S) -> Self {
        Self::with_delimiter(source, config::delimiter())
    }

    /// Create a cursor splitting lines on `delimiter`.
    pub fn with_delimiter(source: S, delimiter: u8) -> Self {
        Self {
            source,
            delimiter,
            lines: [
                Vec::with_capacity(DEFAULT_LINE_BUFFER),
                Vec::with_capacity(DEFAULT_LINE_BUFFER),
            ],
            active: 0,
            current: None,
            last_key: Vec::with_capacity(DEFAULT_KEY_BUFFER),
            epoch: 0,
            primed: false,
            finished: false,
            stats: CursorStats::default(),
        }
    }

    /// Read the first line. Later calls do nothing.
    pub fn prime(&mut self) {
        if !self.primed {
            self.primed = true;
            self.advance();
        }
    }

    /// Key of the group under the cursor, or None at end of input.
    pub fn current_key(&self) -> Option<&[u8]> {
        self.current
            .as_ref()
            .map(|span| &self.lines[self.active][span.key.clone()])
    }

    /// Next value of the current group, not yet consumed.
    pub fn current_value(&self) -> Option<&[u8]> {
        self.current
            .as_ref()
            .map(|span| &self.lines[self.active][span.value.clone()])
    }

    /// Handle for the group under the cursor, or None at end of input.
    pub fn handle(&self) -> Option<GroupHandle> {
        self.current.as_ref().map(|_| GroupHandle { epoch: self.epoch })
    }

    /// Handle and key of the group under the cursor.
    pub fn current_group(&self) -> Option<(GroupHandle, &[u8])> {
        let handle = self.handle()?;
        self.current_key().map(|key| (handle, key))
    }

    /// Current key epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True once the input is exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.primed && self.current.is_none()
    }

    /// Fetch the next value of the group identified by `handle`.
    ///
    /// Returns None at end of input, or when `handle` does not belong to the
    /// group under the cursor; neither case changes any state. Otherwise the
    /// cursor moves one line forward and the value it was holding is
    /// returned. That value remains valid until the next call.
    pub fn get_value(&mut self, handle: GroupHandle) -> Option<&[u8]> {
        if handle.epoch != self.epoch {
            return None;
        }
        let span = self.current.clone()?;
        let held = self.active;
        self.advance();
        Some(&self.lines[held][span.value])
    }

    /// Consume whatever is left of the group identified by `handle`.
    ///
    /// Returns the number of values discarded.
    pub fn skip_group(&mut self, handle: GroupHandle) -> u64 {
        let mut skipped = 0;
        while self.get_value(handle).is_some() {
            skipped += 1;
        }
        skipped
    }

    /// Bytes currently reserved by the line and key buffers.
    pub fn buffered_bytes(&self) -> usize {
        self.lines[0].capacity() + self.lines[1].capacity() + self.last_key.capacity()
    }

    /// Number of line buffers; fixed regardless of input.
    pub fn buffered_lines(&self) -> usize {
        self.lines.len()
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> &CursorStats {
        &self.stats
    }

    /// Delimiter separating key from value.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Move to the next non-empty line.
    fn advance(&mut self) {
        self.active ^= 1;

        loop {
            if self.finished {
                self.current = None;
                return;
            }

            let line = &mut self.lines[self.active];
            match self.source.read_line(line) {
                Ok(true) => {}
                Ok(false) => {
                    self.finished = true;
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "read failed, treating as end of input");
                    self.stats.read_errors += 1;
                    self.finished = true;
                    continue;
                }
            }
            self.stats.lines_read += 1;

            let Some(span) = split_kv_span(line, self.delimiter) else {
                self.stats.empty_lines += 1;
                continue;
            };

            let key = &self.lines[self.active][span.key.clone()];
            if key != self.last_key.as_slice() {
                self.last_key.clear();
                self.last_key.extend_from_slice(key);
                self.epoch += 1;
                self.stats.key_changes += 1;
                trace!(epoch = self.epoch, "key changed");
            }

            self.current = Some(span);
            return;
        }
    }
}
