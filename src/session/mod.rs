//! Stream session
//!
//! Thin adapter over the [`Transport`] collaborator: write complete FLV
//! tags, and poll-read inbound packets one at a time. The session owns the
//! single reusable packet-assembly slot; surfaced packet buffers are
//! detached from it, so a later poll never invalidates them.
//!
//! Transport-level control packets are dispatched back into the transport
//! and never surfaced to the caller.

use bytes::Bytes;

use crate::error::SessionError;
use crate::transport::{
    is_media_type, ReadStatus, Transport, TransportPacket, PACKET_TYPE_AUDIO, PACKET_TYPE_SCRIPT,
    PACKET_TYPE_VIDEO,
};

/// Kind of media packet surfaced to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Audio,
    Video,
    Script,
}

impl PacketKind {
    /// Map a transport packet type to a media kind
    pub fn from_packet_type(packet_type: u8) -> Option<Self> {
        match packet_type {
            PACKET_TYPE_AUDIO => Some(PacketKind::Audio),
            PACKET_TYPE_VIDEO => Some(PacketKind::Video),
            PACKET_TYPE_SCRIPT => Some(PacketKind::Script),
            _ => None,
        }
    }
}

/// One owned media packet
///
/// Exactly one owner at each pipeline stage: session -> reader -> queue ->
/// dispatcher -> application callback.
#[derive(Debug)]
pub struct Packet {
    /// Media kind
    pub kind: PacketKind,
    /// Presentation timestamp in milliseconds
    pub pts: u32,
    /// Owned payload
    pub data: Bytes,
}

impl Packet {
    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Outcome of one non-blocking read poll
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete media packet
    Packet(Packet),
    /// The read made progress but no media packet is ready
    MoreData,
    /// Clean end of stream
    Eof,
}

/// Session over a transport: tag writes and packet polls
#[derive(Debug)]
pub struct StreamSession<T: Transport> {
    transport: T,
    slot: TransportPacket,
}

impl<T: Transport> StreamSession<T> {
    /// Wrap a transport in a session
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            slot: TransportPacket::default(),
        }
    }

    /// Connect the underlying transport.
    ///
    /// `publish` switches the transport into write mode before connecting.
    pub async fn connect(&mut self, url: &str, publish: bool) -> Result<(), SessionError> {
        if publish {
            self.transport.enable_write();
        }
        if !self.transport.connect(url).await {
            return Err(SessionError::ConnectFailed(url.to_string()));
        }
        tracing::debug!(url, publish, "session connected");
        Ok(())
    }

    /// Write one complete FLV tag.
    ///
    /// Fails immediately when the connection is down or timed out; no
    /// retry. After a successful write, one zero-timeout readiness poll
    /// services any pending control packet.
    pub async fn write_tag(&mut self, tag: &[u8]) -> Result<(), SessionError> {
        if !self.transport.is_connected() {
            return Err(SessionError::NotConnected);
        }
        if self.transport.is_timed_out() {
            return Err(SessionError::TimedOut);
        }
        if !self.transport.write_bytes(tag).await {
            return Err(SessionError::WriteFailed);
        }

        if self.transport.poll_readable() {
            if let ReadStatus::Ok = self.transport.read_packet(&mut self.slot).await {
                if self.slot.ready {
                    self.transport.dispatch_control(&self.slot);
                    self.slot.reset();
                }
            }
        }
        Ok(())
    }

    /// Poll one packet from the transport.
    ///
    /// Control packets are dispatched internally and reported as
    /// `MoreData`. Media packet bodies are detached from the assembly
    /// slot before being surfaced.
    pub async fn poll_read(&mut self) -> Result<ReadOutcome, SessionError> {
        match self.transport.read_packet(&mut self.slot).await {
            ReadStatus::Eof => Ok(ReadOutcome::Eof),
            ReadStatus::Error => Err(SessionError::TransportError),
            ReadStatus::Ok => {
                if !self.slot.ready {
                    return Ok(ReadOutcome::MoreData);
                }
                if !is_media_type(self.slot.packet_type) {
                    self.transport.dispatch_control(&self.slot);
                    self.slot.reset();
                    return Ok(ReadOutcome::MoreData);
                }

                // from_packet_type cannot fail for media types
                let kind = PacketKind::from_packet_type(self.slot.packet_type)
                    .unwrap_or(PacketKind::Script);
                let pts = self.slot.timestamp;
                let data = self.slot.detach_body();
                Ok(ReadOutcome::Packet(Packet { kind, pts, data }))
            }
        }
    }

    /// Close the underlying transport
    pub async fn close(&mut self) {
        self.transport.close().await;
    }

    /// Access the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Recover the transport, dropping session state
    pub fn into_transport(self) -> T {
        self.transport
    }
}
