//! Stream player
//!
//! Pulls tagged packets from a remote stream into an application callback.
//! Once playing, two tasks run concurrently:
//!
//! ```text
//!   transport ──► StreamSession.poll_read ──► [reader task]
//!                                                  │ push (ownership move)
//!                                                  ▼
//!                                          JitterBuffer (soft cap 200)
//!                                                  │ pop (ownership move)
//!                                                  ▼
//!                                         [dispatcher task] ──► packet callback
//! ```
//!
//! The reader applies backpressure when the queue passes its high-water
//! mark; the dispatcher holds both loops while paused. `stop()` has join
//! semantics: it does not return until both tasks have exited, after which
//! no callback will ever fire again.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{Error, Result, SessionError};
use crate::session::{Packet, ReadOutcome, StreamSession};
use crate::transport::Transport;

pub mod jitter;
pub mod state;

pub use jitter::{JitterBuffer, HIGH_WATER_MARK};
pub use state::{PlayerEvent, PlayerState, PlayerStatus};

/// Callback invoked on the dispatcher task for every delivered packet.
///
/// Runs synchronously; it must not block indefinitely.
pub type PacketCallback = Box<dyn FnMut(Packet) + Send + 'static>;

/// Callback invoked on open completion and on stop
pub type EventCallback = Box<dyn FnMut(PlayerEvent, PlayerStatus) + Send + 'static>;

type SharedEventCallback = Arc<Mutex<Option<EventCallback>>>;

/// Player tunables
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Soft cap on the packet queue before the reader is throttled
    pub high_water_mark: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            high_water_mark: HIGH_WATER_MARK,
        }
    }
}

impl PlayerConfig {
    /// Set the queue high-water mark
    pub fn high_water_mark(mut self, mark: usize) -> Self {
        self.high_water_mark = mark;
        self
    }
}

/// A session that is either connected or still being opened in the
/// background
enum SessionSlot<T: Transport> {
    Ready(StreamSession<T>),
    Pending(oneshot::Receiver<Option<StreamSession<T>>>),
}

/// Stream playback driver
///
/// Owns the jitter buffer and the two pipeline tasks. One playback cycle
/// per transport: `open` (or `open_background`), `play`, optionally
/// `pause`/`play`, then `stop` and `close`.
pub struct Player<T: Transport> {
    config: PlayerConfig,
    state: Arc<Mutex<PlayerState>>,
    buffer: Arc<JitterBuffer>,
    packet_cb: Option<PacketCallback>,
    event_cb: SharedEventCallback,
    transport: Option<T>,
    session: Option<SessionSlot<T>>,
    open_task: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl<T: Transport> Player<T> {
    /// Create a player over an unconnected transport
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, PlayerConfig::default())
    }

    /// Create a player with custom tunables
    pub fn with_config(transport: T, config: PlayerConfig) -> Self {
        let buffer = Arc::new(JitterBuffer::new(config.high_water_mark));
        Self {
            config,
            state: Arc::new(Mutex::new(PlayerState::Idle)),
            buffer,
            packet_cb: None,
            event_cb: Arc::new(Mutex::new(None)),
            transport: Some(transport),
            session: None,
            open_task: None,
            dispatcher: None,
        }
    }

    /// The player configuration
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> PlayerState {
        *lock_ok(&self.state)
    }

    /// Number of packets currently queued
    pub fn queued(&self) -> usize {
        self.buffer.len()
    }

    /// Set the packet callback. Must be set before `play()`.
    pub fn set_packet_callback(&mut self, cb: impl FnMut(Packet) + Send + 'static) {
        self.packet_cb = Some(Box::new(cb));
    }

    /// Set the event callback
    pub fn set_event_callback(&mut self, cb: impl FnMut(PlayerEvent, PlayerStatus) + Send + 'static) {
        *lock_ok(&self.event_cb) = Some(Box::new(cb));
    }

    /// Open the stream, waiting for the connection to complete.
    ///
    /// On failure the transport is kept and the state returns to `Idle`.
    pub async fn open(&mut self, url: &str) -> Result<()> {
        let transport = self.transport.take().ok_or_else(|| {
            Error::Session(SessionError::ConnectFailed("player already opened".into()))
        })?;
        self.set_state(PlayerState::Opening);

        let mut session = StreamSession::new(transport);
        match session.connect(url, false).await {
            Ok(()) => {
                tracing::info!(url, "stream opened");
                self.session = Some(SessionSlot::Ready(session));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "open failed");
                self.transport = Some(session.into_transport());
                self.set_state(PlayerState::Idle);
                Err(e.into())
            }
        }
    }

    /// Open the stream on a background task.
    ///
    /// Completion is reported exactly once through the event callback with
    /// `PlayerEvent::Open`; `play()` may be called immediately and will
    /// wait for the open to settle.
    pub fn open_background(&mut self, url: &str) {
        let Some(transport) = self.transport.take() else {
            fire_event(&self.event_cb, PlayerEvent::Open, PlayerStatus::ConnectFailed);
            return;
        };
        self.set_state(PlayerState::Opening);

        let (tx, rx) = oneshot::channel();
        self.session = Some(SessionSlot::Pending(rx));

        let state = Arc::clone(&self.state);
        let event_cb = Arc::clone(&self.event_cb);
        let url = url.to_string();
        self.open_task = Some(tokio::spawn(async move {
            let mut session = StreamSession::new(transport);
            match session.connect(&url, false).await {
                Ok(()) => {
                    tracing::info!(url = %url, "stream opened");
                    let _ = tx.send(Some(session));
                    fire_event(&event_cb, PlayerEvent::Open, PlayerStatus::Ok);
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "open failed");
                    let _ = tx.send(None);
                    set_state(&state, PlayerState::Idle);
                    fire_event(&event_cb, PlayerEvent::Open, PlayerStatus::ConnectFailed);
                }
            }
        }));
    }

    /// Start (or resume) playback.
    ///
    /// Spawns the reader and dispatcher tasks on first call; called while
    /// paused, it resumes delivery instead.
    pub fn play(&mut self) {
        if self.state() == PlayerState::Paused {
            tracing::debug!("resuming playback");
            self.buffer.set_paused(false);
            self.set_state(PlayerState::Playing);
            return;
        }
        if self.dispatcher.is_some() {
            return;
        }

        let slot = self.session.take();
        let packet_cb = self.packet_cb.take().unwrap_or_else(|| {
            tracing::warn!("no packet callback set, packets will be dropped");
            Box::new(|_| {})
        });

        self.dispatcher = Some(tokio::spawn(run_pipeline(
            slot,
            Arc::clone(&self.buffer),
            Arc::clone(&self.state),
            packet_cb,
            Arc::clone(&self.event_cb),
        )));
    }

    /// Hold delivery. Both loops wait until `play()` is called again.
    pub fn pause(&mut self) {
        if self.state() == PlayerState::Playing {
            tracing::debug!("pausing playback");
            self.buffer.set_paused(true);
            self.set_state(PlayerState::Paused);
        }
    }

    /// Stop playback and wait for both pipeline tasks to exit.
    ///
    /// Queued-but-undelivered packets are discarded. After this returns,
    /// no callback will fire again and the player may be dropped safely.
    pub async fn stop(&mut self) {
        if let Some(task) = self.open_task.take() {
            // A pending open must settle before teardown
            let _ = task.await;
        }
        let Some(dispatcher) = self.dispatcher.take() else {
            return;
        };

        self.set_state(PlayerState::Stopping);
        // Raise the stop flag before releasing pause waiters, so a paused
        // loop wakes into the stop check rather than another delivery.
        self.buffer.request_stop();
        self.buffer.set_paused(false);

        if let Err(e) = dispatcher.await {
            tracing::warn!(error = %e, "dispatcher task panicked");
        }
        self.set_state(PlayerState::Stopped);
    }

    /// Stop playback, close the session, and return to `Idle`.
    pub async fn close(&mut self) {
        self.stop().await;
        if let Some(mut session) = resolve_session(self.session.take()).await {
            session.close().await;
        }
        self.set_state(PlayerState::Idle);
    }

    fn set_state(&self, new: PlayerState) {
        set_state(&self.state, new);
    }
}

async fn run_pipeline<T: Transport>(
    slot: Option<SessionSlot<T>>,
    buffer: Arc<JitterBuffer>,
    state: Arc<Mutex<PlayerState>>,
    mut packet_cb: PacketCallback,
    event_cb: SharedEventCallback,
) {
    let session = match resolve_session(slot).await {
        Some(session) => session,
        None => {
            set_state(&state, PlayerState::Stopped);
            fire_event(&event_cb, PlayerEvent::Stop, PlayerStatus::ConnectFailed);
            return;
        }
    };

    set_state(&state, PlayerState::Playing);
    tracing::info!("playback pipeline started");

    let reader = tokio::spawn(run_reader(session, Arc::clone(&buffer)));

    loop {
        buffer.wait_while_paused().await;
        match buffer.wait_for_packet().await {
            Some(packet) => {
                tracing::trace!(pts = packet.pts, len = packet.len(), "dispatching packet");
                packet_cb(packet);
            }
            None => break,
        }
    }

    // Decide the stop status before forcing the reader out: a stop request
    // beats eof, which beats nothing; a recorded failure beats both.
    let status = if buffer.is_failed() {
        PlayerStatus::TransportError
    } else if buffer.is_stopped() {
        PlayerStatus::Ok
    } else {
        PlayerStatus::EndOfStream
    };

    buffer.request_stop();
    if let Err(e) = reader.await {
        tracing::warn!(error = %e, "reader task panicked");
    }

    let discarded = buffer.drain();
    if discarded > 0 {
        tracing::debug!(discarded, "discarded undelivered packets");
    }

    set_state(&state, PlayerState::Stopped);
    tracing::info!(status = ?status, "playback pipeline stopped");
    fire_event(&event_cb, PlayerEvent::Stop, status);
}

async fn run_reader<T: Transport>(mut session: StreamSession<T>, buffer: Arc<JitterBuffer>) {
    loop {
        if buffer.is_stopped() {
            break;
        }
        buffer.wait_while_paused().await;
        if buffer.is_stopped() {
            break;
        }

        match session.poll_read().await {
            Ok(ReadOutcome::Packet(packet)) => {
                let queued = buffer.push(packet);
                if queued > buffer.high_water() {
                    tracing::debug!(queued, "backpressure engaged");
                    buffer.wait_for_space().await;
                }
            }
            Ok(ReadOutcome::MoreData) => {
                tokio::task::yield_now().await;
            }
            Ok(ReadOutcome::Eof) => {
                tracing::debug!("end of stream");
                buffer.set_eof();
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "transport read failed");
                buffer.set_failed();
                break;
            }
        }
    }
    session.close().await;
}

async fn resolve_session<T: Transport>(
    slot: Option<SessionSlot<T>>,
) -> Option<StreamSession<T>> {
    match slot {
        Some(SessionSlot::Ready(session)) => Some(session),
        Some(SessionSlot::Pending(rx)) => rx.await.ok().flatten(),
        None => None,
    }
}

fn lock_ok<V>(mutex: &Mutex<V>) -> std::sync::MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn set_state(state: &Mutex<PlayerState>, new: PlayerState) {
    let mut guard = lock_ok(state);
    if *guard != new {
        tracing::debug!(from = ?*guard, to = ?new, "player state change");
        *guard = new;
    }
}

fn fire_event(cb: &SharedEventCallback, event: PlayerEvent, status: PlayerStatus) {
    if let Some(cb) = lock_ok(cb).as_mut() {
        cb(event, status);
    }
}
