//! Key order validation for reducer input.
//!
//! The grouping engine only needs equal keys to be adjacent, but a job whose
//! shuffle sorts keys bytewise can check that it actually did. A group key
//! that is not strictly greater than the previous group key means either an
//! unsorted input or a key split into two groups.

use crate::kv::{LineSource, Result, WmrError};
use crate::streaming::buffers::{DEFAULT_KEY_BUFFER, DEFAULT_LINE_BUFFER};
use crate::streaming::parsing::split_kv_pair;

/// Inline validator fed one key per group.
#[derive(Debug, Default)]
pub struct KeyOrderValidator {
    prev_key: Option<Vec<u8>>,
    group_count: u64,
}

impl KeyOrderValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the key of a new group.
    #[inline]
    pub fn validate(&mut self, key: &[u8]) -> Result<()> {
        self.group_count += 1;

        match self.prev_key.as_mut() {
            Some(prev) => {
                if key <= prev.as_slice() {
                    return Err(WmrError::Unsorted(format!(
                        "key '{}' in group {} does not sort after '{}'",
                        String::from_utf8_lossy(key),
                        self.group_count,
                        String::from_utf8_lossy(prev)
                    )));
                }
                prev.clear();
                prev.extend_from_slice(key);
            }
            None => {
                let mut prev = Vec::with_capacity(DEFAULT_KEY_BUFFER.max(key.len()));
                prev.extend_from_slice(key);
                self.prev_key = Some(prev);
            }
        }

        Ok(())
    }

    /// Number of groups validated so far.
    pub fn group_count(&self) -> u64 {
        self.group_count
    }
}

/// Verify that a whole source is grouped in ascending key order.
///
/// Returns the number of groups on success. Empty lines are ignored, as the
/// reducer does.
pub fn verify_sorted_source<S: LineSource>(mut source: S, delimiter: u8) -> Result<u64> {
    let mut validator = KeyOrderValidator::new();
    let mut line = Vec::with_capacity(DEFAULT_LINE_BUFFER);
    let mut current = Vec::with_capacity(DEFAULT_KEY_BUFFER);

    while source.read_line(&mut line)? {
        let Some((key, _)) = split_kv_pair(&line, delimiter) else {
            continue;
        };
        // First group has no previous key, even when its key is empty
        if validator.group_count() == 0 || current.as_slice() != key {
            validator.validate(key)?;
            current.clear();
            current.extend_from_slice(key);
        }
    }

    Ok(validator.group_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::LineReader;

    #[test]
    fn test_validator_accepts_ascending() {
        let mut v = KeyOrderValidator::new();
        assert!(v.validate(b"a").is_ok());
        assert!(v.validate(b"ab").is_ok());
        assert!(v.validate(b"b").is_ok());
        assert_eq!(v.group_count(), 3);
    }

    #[test]
    fn test_validator_rejects_descending() {
        let mut v = KeyOrderValidator::new();
        v.validate(b"b").unwrap();
        let err = v.validate(b"a").unwrap_err();
        assert!(err.to_string().contains("does not sort after 'b'"));
    }

    #[test]
    fn test_validator_rejects_split_group() {
        let mut v = KeyOrderValidator::new();
        v.validate(b"a").unwrap();
        assert!(v.validate(b"a").is_err());
    }

    #[test]
    fn test_validator_bytewise_order() {
        // Uppercase sorts before lowercase, "10" before "9"
        let mut v = KeyOrderValidator::new();
        v.validate(b"Z").unwrap();
        v.validate(b"a").unwrap();
        let mut n = KeyOrderValidator::new();
        n.validate(b"10").unwrap();
        n.validate(b"9").unwrap();
    }

    #[test]
    fn test_verify_sorted_source() {
        let input = b"a\t1\na\t2\n\nb\t3\nc\n";
        let groups = verify_sorted_source(LineReader::new(&input[..]), b'\t').unwrap();
        assert_eq!(groups, 3);
    }

    #[test]
    fn test_verify_sorted_source_interleaved() {
        let input = b"a\t1\nb\t2\na\t3\n";
        assert!(verify_sorted_source(LineReader::new(&input[..]), b'\t').is_err());
    }

    #[test]
    fn test_verify_sorted_source_empty_and_long_keys() {
        // Leading empty key is its own group; later keys outgrow the key buffer
        let long = "k".repeat(DEFAULT_KEY_BUFFER * 4);
        let input = format!("\t1\n\t2\na\t3\n{long}\t4\n{long}\t5\n{long}z\t6\n");
        let groups = verify_sorted_source(LineReader::new(input.as_bytes()), b'\t').unwrap();
        assert_eq!(groups, 4);

        let split = format!("{long}\t1\na\t2\n");
        assert!(verify_sorted_source(LineReader::new(split.as_bytes()), b'\t').is_err());
    }

    #[test]
    fn test_verify_sorted_source_empty() {
        assert_eq!(verify_sorted_source(LineReader::new(&b""[..]), b'\t').unwrap(), 0);
    }
}
