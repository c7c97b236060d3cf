//! Telemetry aggregation: the bounded result buffer, time windows, success
//! rate buckets and per-kind series pivots.

mod bucket;
mod buffer;
mod label;
mod pivot;
mod window;

pub use bucket::*;
pub use buffer::*;
pub use label::*;
pub use pivot::*;
pub use window::*;
