//! Filter design and decimation used at the tail of the nsfium audio chain.
//!
//! Two independent pieces live here:
//! - [`design_filter`] turns a short spec string such as `"LpBuZ2/8000"` into an
//!   opaque [`FilterHandle`] that is stepped once per output sample.
//! - [`Decimator`] is a polyphase windowed-sinc FIR that converts a buffer at
//!   the CPU clock rate down to the host sample rate and reports how much of
//!   the input it consumed, so callers can carry the tail into the next frame.

mod decimator;
mod design;
mod error;
mod spec;

pub use decimator::Decimator;
pub use design::{FilterHandle, design_filter};
pub use error::FilterError;
pub use spec::{FilterSpec, Response, Transform};
