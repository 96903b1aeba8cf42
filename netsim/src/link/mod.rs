//! Data link layer: frames and integrity trailers.

mod error_detection;
mod frame;

pub use error_detection::{error_detection_data, frame_has_errors};
pub use frame::{Frame, MacAddr};
