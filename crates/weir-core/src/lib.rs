//! weir-core — node identifiers, the server frame format, and configuration.
//! All other weir crates depend on this one.

pub mod config;
pub mod wire;

pub use wire::{deframe, frame, FrameHeader, NodeId, WireError, FRAME_HEADER_LEN};
