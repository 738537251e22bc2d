//! HTTP/3 framing layer.

pub mod frame;
pub mod settings;

pub use frame::{encode_frame, parse_frame, Frame};
pub use settings::Settings;
