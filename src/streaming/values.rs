//! Per-group value accessor handed to reducers.
//!
//! [`Values`] pairs the shared cursor with the handle of one group. Raw
//! values come back as byte slices that stay valid until the next pull;
//! [`Values::next_as`] and [`Values::typed`] decode each value on the way
//! out with [`FromStr`].

use crate::kv::{LineSource, Result, WmrError};
use crate::streaming::cursor::{GroupCursor, GroupHandle};
use crate::streaming::parsing::decode_value;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

/// Values of one key, pulled on demand.
pub struct Values<'c, S: LineSource> {
    cursor: &'c mut GroupCursor<S>,
    handle: GroupHandle,
    delivered: u64,
}

impl<'c, S: LineSource> Values<'c, S> {
    pub fn new(cursor: &'c mut GroupCursor<S>, handle: GroupHandle) -> Self {
        Self {
            cursor,
            handle,
            delivered: 0,
        }
    }

    /// Handle of the group these values belong to.
    pub fn handle(&self) -> GroupHandle {
        self.handle
    }

    /// Whether another value of this group is waiting.
    pub fn has_next(&self) -> bool {
        self.cursor.handle() == Some(self.handle)
    }

    /// Pull the next raw value. None once the group is exhausted.
    pub fn next_value(&mut self) -> Option<&[u8]> {
        match self.cursor.get_value(self.handle) {
            Some(value) => {
                self.delivered += 1;
                Some(value)
            }
            None => None,
        }
    }

    /// Pull the next value as UTF-8 text.
    pub fn next_str(&mut self) -> Option<Result<&str>> {
        self.next_value().map(|raw| {
            std::str::from_utf8(raw).map_err(|e| WmrError::Decode {
                value: String::from_utf8_lossy(raw).into_owned(),
                target: "str",
                message: e.to_string(),
            })
        })
    }

    /// Pull the next value and decode it as `T`.
    pub fn next_as<T>(&mut self) -> Option<Result<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.next_value().map(decode_value::<T>)
    }

    /// Iterate over the remaining values decoded as `T`.
    ///
    /// ```
    /// use wmr_stream::kv::LineReader;
    /// use wmr_stream::streaming::{GroupCursor, Values};
    ///
    /// let mut cursor = GroupCursor::with_delimiter(LineReader::new(&b"n\t1\nn\t2\n"[..]), b'\t');
    /// cursor.prime();
    /// let handle = cursor.handle().unwrap();
    /// let mut values = Values::new(&mut cursor, handle);
    /// let total: i64 = values.typed::<i64>().map(|v| v.unwrap()).sum();
    /// assert_eq!(total, 3);
    /// ```
    pub fn typed<T>(&mut self) -> TypedValues<'_, 'c, S, T>
    where
        T: FromStr,
        T::Err: Display,
    {
        TypedValues {
            values: self,
            _marker: PhantomData,
        }
    }

    /// Consume the rest of the group, returning how many values it held.
    pub fn count_remaining(&mut self) -> u64 {
        let mut n = 0;
        while self.next_value().is_some() {
            n += 1;
        }
        n
    }

    /// Number of values pulled through this accessor.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

/// Iterator of decoded values, see [`Values::typed`].
pub struct TypedValues<'v, 'c, S: LineSource, T> {
    values: &'v mut Values<'c, S>,
    _marker: PhantomData<fn() -> T>,
}

impl<S, T> Iterator for TypedValues<'_, '_, S, T>
where
    S: LineSource,
    T: FromStr,
    T::Err: Display,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.values.next_as::<T>()
    }
}
