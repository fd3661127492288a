//! Transport collaborator contract
//!
//! The library does not implement connection establishment, handshaking, or
//! socket I/O; those live behind the [`Transport`] trait. A transport
//! assembles inbound packets into a caller-owned [`TransportPacket`] slot
//! and accepts complete, pre-muxed FLV tags for writing.

use std::future::Future;

use bytes::{Bytes, BytesMut};

pub mod memory;

pub use memory::MemoryTransport;

/// Transport packet type: audio data
pub const PACKET_TYPE_AUDIO: u8 = 8;
/// Transport packet type: video data
pub const PACKET_TYPE_VIDEO: u8 = 9;
/// Transport packet type: script data (AMF0 metadata)
pub const PACKET_TYPE_SCRIPT: u8 = 18;

/// Check whether a packet type carries application media
pub fn is_media_type(packet_type: u8) -> bool {
    matches!(
        packet_type,
        PACKET_TYPE_AUDIO | PACKET_TYPE_VIDEO | PACKET_TYPE_SCRIPT
    )
}

/// Status of a single transport read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The read completed; the assembly slot may now hold a ready packet
    Ok,
    /// Clean end of stream
    Eof,
    /// Transport failure
    Error,
}

/// Reusable packet assembly slot
///
/// A transport fills this slot across one or more reads; once `ready`, the
/// body can be detached so the slot can be reused without invalidating the
/// surfaced buffer.
#[derive(Debug, Default)]
pub struct TransportPacket {
    /// Transport-level packet type
    pub packet_type: u8,
    /// Presentation timestamp in milliseconds
    pub timestamp: u32,
    /// Assembled payload
    pub body: BytesMut,
    /// Whether a complete packet has been assembled
    pub ready: bool,
}

impl TransportPacket {
    /// Clear the slot for the next assembly
    pub fn reset(&mut self) {
        self.packet_type = 0;
        self.timestamp = 0;
        self.body.clear();
        self.ready = false;
    }

    /// Detach the assembled body, leaving the slot reusable.
    ///
    /// The returned buffer is independently owned; later reads never touch
    /// it.
    pub fn detach_body(&mut self) -> Bytes {
        self.ready = false;
        self.body.split().freeze()
    }
}

/// Contract consumed by [`StreamSession`](crate::session::StreamSession)
///
/// All I/O methods are async; readiness probing (`poll_readable`) and
/// connection-state queries are synchronous and non-blocking.
pub trait Transport: Send + 'static {
    /// Establish the connection. Returns false on failure.
    fn connect(&mut self, url: &str) -> impl Future<Output = bool> + Send;

    /// Switch the connection into publish (write) mode. Must be called
    /// before `connect` when publishing.
    fn enable_write(&mut self);

    /// Whether the connection is currently established
    fn is_connected(&self) -> bool;

    /// Whether the connection has timed out
    fn is_timed_out(&self) -> bool;

    /// Write one complete FLV tag. Returns false on failure.
    fn write_bytes(&mut self, buf: &[u8]) -> impl Future<Output = bool> + Send;

    /// Read one packet (or part of one) into the assembly slot.
    ///
    /// Check `slot.ready` after an `Ok` return to see whether a complete
    /// packet was assembled.
    fn read_packet(
        &mut self,
        slot: &mut TransportPacket,
    ) -> impl Future<Output = ReadStatus> + Send;

    /// Zero-timeout readiness probe: is inbound data pending?
    fn poll_readable(&self) -> bool;

    /// Handle a protocol control packet internally
    fn dispatch_control(&mut self, packet: &TransportPacket);

    /// Tear down the connection
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
