//! Jitter buffer
//!
//! Bounded FIFO decoupling transport read timing from dispatch timing.
//! Packets move through by ownership: the reader pushes, the dispatcher
//! pops, and no two tasks ever hold the same packet.
//!
//! The bound is a soft high-water mark enforced by backpressure: the
//! producer waits once the count is above the mark, so the count can
//! transiently exceed it by at most one in-flight packet. All waiting is
//! `Notify`-based signaling, not fixed-interval polling.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::session::Packet;

/// Default soft high-water mark for the packet queue
pub const HIGH_WATER_MARK: usize = 200;

/// Bounded packet FIFO shared between the reader and dispatcher loops
#[derive(Debug, Default)]
pub struct JitterBuffer {
    queue: Mutex<VecDeque<Packet>>,
    high_water: usize,
    /// Consumer wakeup: a packet arrived, or eof/stop was raised
    data_ready: Notify,
    /// Producer wakeup: the queue drained below the mark, or stop
    space_ready: Notify,
    /// Both loops wake on resume (or stop) while paused
    resumed: Notify,
    stop: AtomicBool,
    eof: AtomicBool,
    failed: AtomicBool,
    paused: AtomicBool,
}

impl JitterBuffer {
    /// Create a buffer with the given high-water mark
    pub fn new(high_water: usize) -> Self {
        Self {
            high_water,
            ..Default::default()
        }
    }

    /// Current queue length
    pub fn len(&self) -> usize {
        self.lock_queue().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.lock_queue().is_empty()
    }

    /// The configured high-water mark
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Packet>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a packet; returns the new queue length.
    pub fn push(&self, packet: Packet) -> usize {
        let len = {
            let mut queue = self.lock_queue();
            queue.push_back(packet);
            queue.len()
        };
        self.data_ready.notify_one();
        len
    }

    /// Take the head packet, if any.
    pub fn pop(&self) -> Option<Packet> {
        let (packet, len) = {
            let mut queue = self.lock_queue();
            let packet = queue.pop_front();
            (packet, queue.len())
        };
        if len <= self.high_water {
            self.space_ready.notify_one();
        }
        packet
    }

    /// Discard all queued packets, returning how many were dropped.
    pub fn drain(&self) -> usize {
        let mut queue = self.lock_queue();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    /// Raise the end-of-stream flag
    pub fn set_eof(&self) {
        self.eof.store(true, Ordering::SeqCst);
        self.data_ready.notify_one();
    }

    /// Record a mid-stream transport failure
    pub fn set_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
        self.data_ready.notify_one();
    }

    /// Set or clear the paused flag
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
        if !paused {
            self.resumed.notify_waiters();
        }
    }

    /// Request both loops to stop and wake every waiter
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.data_ready.notify_one();
        self.space_ready.notify_one();
        self.resumed.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn is_eof(&self) -> bool {
        self.eof.load(Ordering::SeqCst)
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Backpressure wait: block while the queue is above the high-water
    /// mark and no stop has been requested.
    pub async fn wait_for_space(&self) {
        loop {
            let notified = self.space_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_stopped() || self.len() <= self.high_water {
                return;
            }
            notified.await;
        }
    }

    /// Consumer wait: returns the next packet, or `None` once the stream
    /// has ended (stop, or eof/failure with the queue drained).
    pub async fn wait_for_packet(&self) -> Option<Packet> {
        loop {
            let notified = self.data_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_stopped() {
                return None;
            }
            if let Some(packet) = self.pop() {
                return Some(packet);
            }
            if self.is_eof() || self.is_failed() {
                return None;
            }
            notified.await;
        }
    }

    /// Block while paused; stop requests break the wait.
    pub async fn wait_while_paused(&self) {
        loop {
            let notified = self.resumed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.is_paused() || self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;

    use crate::session::PacketKind;

    fn packet(pts: u32) -> Packet {
        Packet {
            kind: PacketKind::Video,
            pts,
            data: Bytes::from_static(&[0x27, 0x01]),
        }
    }

    #[test]
    fn test_fifo_order() {
        let buf = JitterBuffer::new(8);
        for pts in [0, 40, 80] {
            buf.push(packet(pts));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.pop().unwrap().pts, 0);
        assert_eq!(buf.pop().unwrap().pts, 40);
        assert_eq!(buf.pop().unwrap().pts, 80);
        assert!(buf.pop().is_none());
    }

    #[test]
    fn test_drain_discards_everything() {
        let buf = JitterBuffer::new(8);
        for pts in 0..5 {
            buf.push(packet(pts));
        }
        assert_eq!(buf.drain(), 5);
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_packet_returns_pushed() {
        let buf = Arc::new(JitterBuffer::new(8));
        let waiter = {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move { buf.wait_for_packet().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        buf.push(packet(40));

        let got = waiter.await.unwrap().unwrap();
        assert_eq!(got.pts, 40);
    }

    #[tokio::test]
    async fn test_wait_for_packet_ends_on_eof() {
        let buf = Arc::new(JitterBuffer::new(8));
        buf.push(packet(0));
        buf.set_eof();

        // Queued packets still come out before the eof takes effect
        assert!(buf.wait_for_packet().await.is_some());
        assert!(buf.wait_for_packet().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_wakes_consumer() {
        let buf = Arc::new(JitterBuffer::new(8));
        let waiter = {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move { buf.wait_for_packet().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        buf.request_stop();
        assert!(waiter.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backpressure_stabilizes_at_high_water() {
        let high_water = 20;
        let buf = Arc::new(JitterBuffer::new(high_water));

        // Producer with an effectively unbounded supply and no consumer
        let producer = {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move {
                for pts in 0..500u32 {
                    let len = buf.push(packet(pts));
                    if len > buf.high_water() {
                        buf.wait_for_space().await;
                    }
                    if buf.is_stopped() {
                        break;
                    }
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let stalled_at = buf.len();
        assert!(
            stalled_at <= high_water + 1,
            "queue grew past the mark: {}",
            stalled_at
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(buf.len(), stalled_at, "queue kept growing while stalled");

        // Draining below the mark releases the producer
        for _ in 0..10 {
            buf.pop();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(buf.len() > stalled_at - 10);

        buf.request_stop();
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_resume_wakes_pause_waiters() {
        let buf = Arc::new(JitterBuffer::new(8));
        buf.set_paused(true);

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let buf = Arc::clone(&buf);
                tokio::spawn(async move { buf.wait_while_paused().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        buf.set_paused(false);
        for w in waiters {
            tokio::time::timeout(Duration::from_secs(1), w)
                .await
                .expect("pause waiter never woke")
                .unwrap();
        }
    }
}
