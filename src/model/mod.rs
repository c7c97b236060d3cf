//! Model types shared with the probe backend.
//!
//! Configs and results are owned by the backend; this crate only reads them.

mod config;
mod payload;
mod result;

pub use config::*;
pub use payload::*;
pub use result::*;
