// Clippy allows for the whole crate
#![allow(clippy::should_implement_trait)]

//! wmr-stream: Hadoop-streaming style map/reduce shim
//!
//! Mappers and reducers read `key<TAB>value` lines on stdin and write
//! `key<TAB>value` lines on stdout. Sorting between the two phases is done
//! by the surrounding job system.
//!
//! # Features
//!
//! - **Pull-based grouping**: a reducer sees one key at a time and pulls its
//!   values on demand; nothing is buffered beyond one look-ahead line
//! - **Stale handle detection**: pulling with the handle of a finished group
//!   yields nothing instead of another key's values
//! - **Typed extraction**: values decoded with `FromStr` as they are pulled
//!
//! # Example
//!
//! ```rust
//! use wmr_stream::commands::ReduceCommand;
//! use wmr_stream::kv::LineReader;
//!
//! let input = "apple\t1\napple\t2\npear\t5\n";
//! let mut output = Vec::new();
//!
//! ReduceCommand::new()
//!     .with_delimiter(b'\t')
//!     .run_streaming(LineReader::new(input.as_bytes()), &mut output, |key, values, out| {
//!         let mut total = 0i64;
//!         for v in values.typed::<i64>() {
//!             total += v?;
//!         }
//!         out.emit_int(key, total)
//!     })
//!     .unwrap();
//!
//! assert_eq!(output, b"apple\t3\npear\t5\n");
//! ```

pub mod commands;
pub mod config;
pub mod kv;
pub mod streaming;

// Re-export commonly used types
pub use kv::{KeyValue, LineReader, LineSource, Result, WmrError};
pub use streaming::{GroupCursor, GroupHandle, KvWriter, Values};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{
        BuiltinMapper, BuiltinReducer, MapCommand, Mapper, ReduceCommand, Reducer,
    };
    pub use crate::kv::{KeyValue, LineReader, LineSource, Result, WmrError};
    pub use crate::streaming::{GroupCursor, GroupHandle, KvWriter, Values};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_map_then_reduce_workflow() {
        use crate::commands::{BuiltinMapper, BuiltinReducer, MapCommand, Mapper, ReduceCommand, Reducer};
        use crate::kv::{parse_pairs, LineReader};

        let text = "b a\nc a b\n";

        let mut mapped = Vec::new();
        let mut mapper = BuiltinMapper::Words;
        MapCommand::new()
            .with_delimiter(b'\t')
            .run_streaming(LineReader::new(text.as_bytes()), &mut mapped, |k, v, out| {
                mapper.map(k, v, out)
            })
            .unwrap();

        // Stand-in for the shuffle
        let mut pairs = parse_pairs(std::str::from_utf8(&mapped).unwrap());
        pairs.sort();
        let shuffled: String = pairs
            .iter()
            .map(|p| format!("{}\t{}\n", p.key_str(), p.value_str()))
            .collect();

        let mut reduced = Vec::new();
        let mut reducer = BuiltinReducer::Sum;
        ReduceCommand::new()
            .with_delimiter(b'\t')
            .run_streaming(LineReader::new(shuffled.as_bytes()), &mut reduced, |k, v, out| {
                reducer.reduce(k, v, out)
            })
            .unwrap();

        assert_eq!(String::from_utf8(reduced).unwrap(), "a\t2\nb\t2\nc\t1\n");
    }
}
