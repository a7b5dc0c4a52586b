//! Map and reduce drivers.

pub mod map;
pub mod reduce;

pub use crate::streaming::{verify_sorted_source, KeyOrderValidator};
pub use map::{BuiltinMapper, MapCommand, MapStats, Mapper};
pub use reduce::{BuiltinReducer, ReduceCommand, ReduceStats, Reducer};
