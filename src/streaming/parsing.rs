//! Zero-allocation key/value splitting and value tokenizing.
//!
//! Every function here borrows from the line it is given; nothing in the
//! hot path allocates.

use crate::kv::{Result, WmrError};
use memchr::memchr;
use std::fmt::Display;
use std::ops::Range;
use std::str::FromStr;

/// Byte ranges of the key and value within a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvSpan {
    pub key: Range<usize>,
    pub value: Range<usize>,
}

/// Locate key and value in `line`, splitting on the first `delimiter`.
///
/// A trailing `\n` is never part of key or value. Returns None if the line
/// has no content at all. A line without the delimiter is all key, with an
/// empty value.
#[inline]
pub fn split_kv_span(line: &[u8], delimiter: u8) -> Option<KvSpan> {
    let len = match line.last() {
        Some(b'\n') => line.len() - 1,
        _ => line.len(),
    };
    if len == 0 {
        return None;
    }

    let span = match memchr(delimiter, &line[..len]) {
        Some(pos) => KvSpan {
            key: 0..pos,
            value: pos + 1..len,
        },
        None => KvSpan {
            key: 0..len,
            value: len..len,
        },
    };
    Some(span)
}

/// Split `line` into `(key, value)` on the first `delimiter`.
///
/// # Example
///
/// ```
/// use wmr_stream::streaming::split_kv_pair;
///
/// assert_eq!(split_kv_pair(b"a\t1", b'\t'), Some((&b"a"[..], &b"1"[..])));
/// assert_eq!(split_kv_pair(b"abc", b'\t'), Some((&b"abc"[..], &b""[..])));
/// assert_eq!(split_kv_pair(b"", b'\t'), None);
/// ```
#[inline]
pub fn split_kv_pair(line: &[u8], delimiter: u8) -> Option<(&[u8], &[u8])> {
    split_kv_span(line, delimiter).map(|span| (&line[span.key], &line[span.value]))
}

/// Split a value into fields on every `delimiter`, keeping empty fields.
pub fn split_fields(value: &[u8], delimiter: u8) -> impl Iterator<Item = &[u8]> {
    value.split(move |&b| b == delimiter)
}

/// Split a value on any byte in `delimiters`, dropping empty tokens.
pub fn split_any<'a>(value: &'a [u8], delimiters: &'a [u8]) -> impl Iterator<Item = &'a [u8]> {
    value
        .split(move |b| delimiters.contains(b))
        .filter(|token| !token.is_empty())
}

/// Split a value into ASCII-whitespace separated words.
pub fn words(value: &[u8]) -> impl Iterator<Item = &[u8]> {
    value
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
}

/// Decode a raw value as `T`.
///
/// The bytes must be UTF-8; surrounding ASCII whitespace is ignored.
pub fn decode_value<T>(raw: &[u8]) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let text = std::str::from_utf8(raw).map_err(|e| decode_error::<T>(raw, e))?;
    text.trim_ascii()
        .parse::<T>()
        .map_err(|e| decode_error::<T>(raw, e))
}

fn decode_error<T>(raw: &[u8], err: impl Display) -> WmrError {
    WmrError::Decode {
        value: String::from_utf8_lossy(raw).into_owned(),
        target: std::any::type_name::<T>(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_kv_pair_first_delimiter_only() {
        assert_eq!(
            split_kv_pair(b"k\tv1\tv2", b'\t'),
            Some((&b"k"[..], &b"v1\tv2"[..]))
        );
    }

    #[test]
    fn test_split_kv_pair_no_delimiter() {
        assert_eq!(split_kv_pair(b"abc", b'\t'), Some((&b"abc"[..], &b""[..])));
        assert_eq!(
            split_kv_pair(b"abc\n", b'\t'),
            Some((&b"abc"[..], &b""[..]))
        );
    }

    #[test]
    fn test_split_kv_pair_empty_lines() {
        assert_eq!(split_kv_pair(b"", b'\t'), None);
        assert_eq!(split_kv_pair(b"\n", b'\t'), None);
        // A bare delimiter is content: empty key, empty value
        assert_eq!(split_kv_pair(b"\t", b'\t'), Some((&b""[..], &b""[..])));
        assert_eq!(split_kv_pair(b"\tv", b'\t'), Some((&b""[..], &b"v"[..])));
    }

    #[test]
    fn test_split_kv_pair_custom_delimiter() {
        assert_eq!(
            split_kv_pair(b"a,b\tc", b','),
            Some((&b"a"[..], &b"b\tc"[..]))
        );
    }

    #[test]
    fn test_split_kv_span_trailing_newline() {
        let span = split_kv_span(b"a\t1\n", b'\t').unwrap();
        assert_eq!(span.key, 0..1);
        assert_eq!(span.value, 2..3);
    }

    #[test]
    fn test_split_fields_keeps_empty() {
        let fields: Vec<_> = split_fields(b"a,,b,", b',').collect();
        assert_eq!(fields, vec![&b"a"[..], &b""[..], &b"b"[..], &b""[..]]);
    }

    #[test]
    fn test_split_any() {
        let tokens: Vec<_> = split_any(b"a, b;;c", b",; ").collect();
        assert_eq!(tokens, vec![&b"a"[..], &b"b"[..], &b"c"[..]]);
    }

    #[test]
    fn test_words() {
        let tokens: Vec<_> = words(b"  the quick\tfox \n").collect();
        assert_eq!(tokens, vec![&b"the"[..], &b"quick"[..], &b"fox"[..]]);
    }

    #[test]
    fn test_decode_value() {
        assert_eq!(decode_value::<i64>(b"42").unwrap(), 42);
        assert_eq!(decode_value::<i64>(b" -7 ").unwrap(), -7);
        assert_eq!(decode_value::<f64>(b"2.5").unwrap(), 2.5);
        assert!(decode_value::<bool>(b"true").unwrap());
        assert_eq!(decode_value::<String>(b"text").unwrap(), "text");
    }

    #[test]
    fn test_decode_value_errors() {
        let err = decode_value::<i64>(b"4x2").unwrap_err();
        match err {
            WmrError::Decode { value, target, .. } => {
                assert_eq!(value, "4x2");
                assert_eq!(target, "i64");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(decode_value::<i64>(&[0xff, 0xfe]).is_err());
    }
}
