//! Streaming building blocks shared by the map and reduce drivers.
//!
//! - Zero-allocation key/value splitting
//! - The grouping cursor and its per-group value accessor
//! - Buffered key/value output
//! - Key order validation
//!
//! Reducer input is read one line ahead; memory stays at two line buffers
//! regardless of group size.

pub mod buffers;
pub mod cursor;
pub mod output;
pub mod parsing;
pub mod validation;
pub mod values;

pub use cursor::{CursorStats, GroupCursor, GroupHandle};
pub use output::KvWriter;
pub use parsing::{
    decode_value, split_any, split_fields, split_kv_pair, split_kv_span, words, KvSpan,
};
pub use validation::{verify_sorted_source, KeyOrderValidator};
pub use values::{TypedValues, Values};
