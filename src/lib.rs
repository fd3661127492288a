//! # flvpipe
//!
//! FLV tag muxing and asynchronous stream playback.
//!
//! The crate has two halves:
//!
//! - **Publish path**: byte-exact encoders for FLV media tags, the
//!   AVCDecoderConfigurationRecord, and the `onMetaData` script tag, plus a
//!   [`Publisher`] that writes them through a [`Transport`].
//! - **Playback path**: a [`Player`] that pulls tagged packets from the
//!   transport on a reader task, buffers them in a bounded jitter buffer,
//!   and delivers them to an application callback from a dispatcher task,
//!   with pause/resume and join-on-stop semantics.
//!
//! Connection establishment, handshaking, and socket I/O are left to the
//! [`Transport`] collaborator; an in-memory implementation is provided for
//! tests and local development.
//!
//! # Playback example
//! ```no_run
//! use flvpipe::player::Player;
//! use flvpipe::transport::MemoryTransport;
//!
//! # async fn example() -> flvpipe::Result<()> {
//! let mut player = Player::new(MemoryTransport::new());
//! player.set_packet_callback(|pkt| {
//!     println!("packet kind={:?} pts={} len={}", pkt.kind, pkt.pts, pkt.len());
//! });
//! player.open("rtmp://localhost/live/key").await?;
//! player.play();
//! // ... later
//! player.stop().await;
//! player.close().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod mux;
pub mod player;
pub mod publish;
pub mod session;
pub mod transport;

pub use error::{Error, MuxError, Result, SessionError};
pub use mux::{AvcDecoderConfig, StreamMetadata, TagMuxer, TagParams};
pub use player::{Player, PlayerConfig, PlayerEvent, PlayerState, PlayerStatus};
pub use publish::Publisher;
pub use session::{Packet, PacketKind, ReadOutcome, StreamSession};
pub use transport::{MemoryTransport, ReadStatus, Transport, TransportPacket};
