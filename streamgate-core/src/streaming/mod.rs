//! Range-aware HTTP streaming primitives.
//!
//! Splits the correctness-critical path into three small pieces: parsing a
//! `Range` header into a validated byte interval, framing the 200/206
//! response headers, and pumping backend chunks into the response body with
//! explicit terminal outcomes.

mod framer;
mod pump;
mod range;

pub use framer::{build_stream_headers, cors_headers};
pub use pump::{PumpHandle, PumpStatus, StreamOutcome, StreamPump};
pub use range::{ByteRange, RangeError, parse_range};
