//! Player lifecycle state and events

/// Player lifecycle state
///
/// Transitions happen only through `open()` / `play()` / `pause()` /
/// `stop()` / `close()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No stream opened
    Idle,
    /// Connection being established
    Opening,
    /// Pipeline running, packets being delivered
    Playing,
    /// Pipeline held; reader and dispatcher both wait
    Paused,
    /// Stop requested, loops winding down
    Stopping,
    /// Both loops exited
    Stopped,
}

impl PlayerState {
    /// Whether the playback pipeline is live (playing or paused)
    pub fn is_active(&self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Paused)
    }
}

/// Event kind reported through the event callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Open completed (successfully or not)
    Open,
    /// Playback stopped (requested, end of stream, or failure)
    Stop,
}

/// Status code carried by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// Completed as requested
    Ok,
    /// Clean end of stream; not a failure
    EndOfStream,
    /// Connection could not be established
    ConnectFailed,
    /// Mid-stream transport failure
    TransportError,
}

impl PlayerStatus {
    /// Whether this status reports a failure (end of stream is not one)
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PlayerStatus::ConnectFailed | PlayerStatus::TransportError
        )
    }
}
