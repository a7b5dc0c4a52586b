//! Global configuration for the key/value wire format.
//!
//! The delimiter is a process-wide constant: it is set once at startup,
//! before any reader or writer is constructed, and read when cursors,
//! mappers and writers are built without an explicit delimiter.

use crate::kv::{Result, WmrError};
use std::sync::atomic::{AtomicU8, Ordering};

/// Default key/value delimiter (horizontal tab).
pub const DEFAULT_DELIMITER: u8 = b'\t';

static DELIMITER: AtomicU8 = AtomicU8::new(DEFAULT_DELIMITER);

/// Set the process-wide key/value delimiter.
///
/// # Example
///
/// ```
/// use wmr_stream::config;
///
/// config::set_delimiter(b',');
/// assert_eq!(config::delimiter(), b',');
/// config::set_delimiter(config::DEFAULT_DELIMITER);
/// ```
#[inline]
pub fn set_delimiter(delimiter: u8) {
    DELIMITER.store(delimiter, Ordering::Release);
}

/// Current process-wide key/value delimiter.
#[inline]
pub fn delimiter() -> u8 {
    DELIMITER.load(Ordering::Acquire)
}

/// Parse a delimiter given on the command line.
///
/// Accepts a single ASCII character, the escapes `\t` and `\xHH`, or the
/// word `tab`. Newline can never be a delimiter since it terminates records.
pub fn parse_delimiter(value: &str) -> Result<u8> {
    let byte = match value {
        "\\t" | "tab" | "TAB" => b'\t',
        s if s.len() == 4 && (s.starts_with("\\x") || s.starts_with("\\X")) => {
            u8::from_str_radix(&s[2..], 16).map_err(|_| {
                WmrError::InvalidDelimiter(format!("'{}' is not a valid hex escape", s))
            })?
        }
        s if s.len() == 1 => s.as_bytes()[0],
        s => {
            return Err(WmrError::InvalidDelimiter(format!(
                "'{}' must be a single byte (use \\t or \\xHH for control characters)",
                s
            )))
        }
    };

    if byte == b'\n' {
        return Err(WmrError::InvalidDelimiter(
            "newline terminates records and cannot be the delimiter".to_string(),
        ));
    }

    Ok(byte)
}
