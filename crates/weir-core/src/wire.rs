//! weir wire format — the server-to-server frame header.
//!
//! Every unit that crosses a shared link between two servers is prefixed
//! with the sending and receiving node IDs, so a receiver that multiplexes
//! many logical peers over one channel can recover the logical source.
//!
//! The header is fixed width. There is no length field: the payload runs to
//! the end of the transport unit, and the transport preserves unit
//! boundaries. Both IDs are big-endian on the wire.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;
use zerocopy::byteorder::{BigEndian, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

// ── Node identity ────────────────────────────────────────────────────────────

/// Identifier of a server in the cluster.
///
/// Ordering matters: the scheduler breaks virtual-time ties by ascending ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ── Frame header ─────────────────────────────────────────────────────────────

/// Prefix of every server-to-server unit.
///
/// Wire size: 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
pub struct FrameHeader {
    /// Node that built the frame.
    pub source: U32<BigEndian>,

    /// Node the frame is addressed to. Checked by the receiver.
    pub dest: U32<BigEndian>,
}

assert_eq_size!(FrameHeader, [u8; 8]);

/// Width of [`FrameHeader`] on the wire.
pub const FRAME_HEADER_LEN: usize = std::mem::size_of::<FrameHeader>();

impl FrameHeader {
    pub fn new(source: NodeId, dest: NodeId) -> Self {
        Self {
            source: U32::new(source.get()),
            dest: U32::new(dest.get()),
        }
    }

    pub fn source(&self) -> NodeId {
        NodeId(self.source.get())
    }

    pub fn dest(&self) -> NodeId {
        NodeId(self.dest.get())
    }

    /// Check that a received frame was meant for `local`.
    pub fn expect_dest(&self, local: NodeId) -> Result<(), WireError> {
        if self.dest() == local {
            Ok(())
        } else {
            Err(WireError::Misrouted {
                expected: local,
                actual: self.dest(),
            })
        }
    }
}

/// Build `header || payload` in a single allocation.
pub fn frame(source: NodeId, dest: NodeId, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.put_slice(FrameHeader::new(source, dest).as_bytes());
    buf.put_slice(payload);
    buf.freeze()
}

/// Parse the header at the front of `unit`.
///
/// Returns the header and the offset at which the payload starts, which is
/// always [`FRAME_HEADER_LEN`].
pub fn deframe(unit: &[u8]) -> Result<(FrameHeader, usize), WireError> {
    let header = FrameHeader::read_from_prefix(unit)
        .ok_or(WireError::MalformedFrame { len: unit.len() })?;
    Ok((header, FRAME_HEADER_LEN))
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting a received frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("malformed frame: {len} bytes, header needs {}", FRAME_HEADER_LEN)]
    MalformedFrame { len: usize },

    #[error("misrouted frame: addressed to {actual}, this node is {expected}")]
    Misrouted { expected: NodeId, actual: NodeId },
}

// ── Tests ────────────────────────────────────────────────────────────────────
