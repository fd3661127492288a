//! In-memory transport
//!
//! A scripted [`Transport`] implementation for tests and local pipeline
//! development. Outbound tags are recorded; inbound reads replay a queued
//! script of packets, partial reads, EOF, or errors.
//!
//! The transport is a cheap cloneable handle, so a test can keep one clone
//! for inspection while the session owns another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::{ReadStatus, Transport, TransportPacket};

/// One scripted inbound read
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    /// A complete packet becomes ready
    Packet {
        packet_type: u8,
        timestamp: u32,
        body: Bytes,
    },
    /// A read that completes without finishing a packet
    Partial,
    /// Clean end of stream
    Eof,
    /// Transport failure
    Error,
}

#[derive(Debug, Default)]
struct Inner {
    connected: bool,
    timed_out: bool,
    write_enabled: bool,
    refuse_connect: bool,
    written: Vec<Bytes>,
    inbound: VecDeque<ScriptedRead>,
    dispatched_controls: Vec<u8>,
}

/// Scripted in-memory transport
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTransport {
    /// Create a transport that will accept a connection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport whose `connect` always fails
    pub fn refusing() -> Self {
        let t = Self::default();
        t.lock().refuse_connect = true;
        t
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a complete inbound media or control packet
    pub fn push_packet(&self, packet_type: u8, timestamp: u32, body: &[u8]) {
        self.lock().inbound.push_back(ScriptedRead::Packet {
            packet_type,
            timestamp,
            body: Bytes::copy_from_slice(body),
        });
    }

    /// Queue a read that completes without a ready packet
    pub fn push_partial(&self) {
        self.lock().inbound.push_back(ScriptedRead::Partial);
    }

    /// Queue a clean end of stream
    pub fn push_eof(&self) {
        self.lock().inbound.push_back(ScriptedRead::Eof);
    }

    /// Queue a transport failure
    pub fn push_error(&self) {
        self.lock().inbound.push_back(ScriptedRead::Error);
    }

    /// Mark the connection as timed out
    pub fn set_timed_out(&self, timed_out: bool) {
        self.lock().timed_out = timed_out;
    }

    /// Tags written so far, one entry per `write_bytes` call
    pub fn written(&self) -> Vec<Bytes> {
        self.lock().written.clone()
    }

    /// All written tags concatenated into one byte stream
    pub fn written_stream(&self) -> Vec<u8> {
        let inner = self.lock();
        let mut out = Vec::new();
        for tag in &inner.written {
            out.extend_from_slice(tag);
        }
        out
    }

    /// Packet types handed to `dispatch_control`
    pub fn dispatched_controls(&self) -> Vec<u8> {
        self.lock().dispatched_controls.clone()
    }

    /// Whether publish mode was requested before connecting
    pub fn write_enabled(&self) -> bool {
        self.lock().write_enabled
    }
}

impl Transport for MemoryTransport {
    async fn connect(&mut self, url: &str) -> bool {
        let mut inner = self.lock();
        if inner.refuse_connect {
            tracing::debug!(url, "memory transport refusing connect");
            return false;
        }
        inner.connected = true;
        true
    }

    fn enable_write(&mut self) {
        self.lock().write_enabled = true;
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn is_timed_out(&self) -> bool {
        self.lock().timed_out
    }

    async fn write_bytes(&mut self, buf: &[u8]) -> bool {
        let mut inner = self.lock();
        if !inner.connected || inner.timed_out {
            return false;
        }
        inner.written.push(Bytes::copy_from_slice(buf));
        true
    }

    async fn read_packet(&mut self, slot: &mut TransportPacket) -> ReadStatus {
        let next = self.lock().inbound.pop_front();
        match next {
            Some(ScriptedRead::Packet {
                packet_type,
                timestamp,
                body,
            }) => {
                slot.reset();
                slot.packet_type = packet_type;
                slot.timestamp = timestamp;
                slot.body.extend_from_slice(&body);
                slot.ready = true;
                ReadStatus::Ok
            }
            Some(ScriptedRead::Partial) => {
                slot.ready = false;
                ReadStatus::Ok
            }
            Some(ScriptedRead::Eof) | None => ReadStatus::Eof,
            Some(ScriptedRead::Error) => ReadStatus::Error,
        }
    }

    fn poll_readable(&self) -> bool {
        !self.lock().inbound.is_empty()
    }

    fn dispatch_control(&mut self, packet: &TransportPacket) {
        self.lock().dispatched_controls.push(packet.packet_type);
    }

    async fn close(&mut self) {
        self.lock().connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::PACKET_TYPE_VIDEO;

    #[tokio::test]
    async fn test_scripted_reads() {
        let handle = MemoryTransport::new();
        let mut transport = handle.clone();
        assert!(transport.connect("mem://test").await);

        handle.push_packet(PACKET_TYPE_VIDEO, 40, &[1, 2, 3]);
        handle.push_partial();
        handle.push_eof();

        let mut slot = TransportPacket::default();
        assert_eq!(transport.read_packet(&mut slot).await, ReadStatus::Ok);
        assert!(slot.ready);
        assert_eq!(slot.timestamp, 40);
        assert_eq!(&slot.body[..], &[1, 2, 3]);

        assert_eq!(transport.read_packet(&mut slot).await, ReadStatus::Ok);
        assert!(!slot.ready);

        assert_eq!(transport.read_packet(&mut slot).await, ReadStatus::Eof);
        // EOF is sticky once the script runs out
        assert_eq!(transport.read_packet(&mut slot).await, ReadStatus::Eof);
    }

    #[tokio::test]
    async fn test_write_requires_connection() {
        let mut transport = MemoryTransport::new();
        assert!(!transport.write_bytes(&[0u8; 4]).await);

        assert!(transport.connect("mem://test").await);
        assert!(transport.write_bytes(&[0u8; 4]).await);
        assert_eq!(transport.written().len(), 1);

        transport.set_timed_out(true);
        assert!(!transport.write_bytes(&[0u8; 4]).await);
    }

    #[tokio::test]
    async fn test_refusing_connect() {
        let mut transport = MemoryTransport::refusing();
        assert!(!transport.connect("mem://test").await);
        assert!(!transport.is_connected());
    }
}
