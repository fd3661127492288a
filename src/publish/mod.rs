//! Stream publisher
//!
//! High-level API for publishing one video (and optionally one audio)
//! elementary stream as FLV tags over a transport.
//!
//! Publish order matters: metadata first, then the AVC sequence header,
//! then access units. Timestamps are milliseconds from stream start.

pub mod annexb;

pub use annexb::{nal_units, NaluType};

use crate::error::Result;
use crate::mux::avcc::AvcDecoderConfig;
use crate::mux::metadata::{encode_metadata_tag, StreamMetadata};
use crate::mux::tag::{TagMuxer, TagParams};
use crate::session::StreamSession;
use crate::transport::Transport;

/// FLV tag publisher over a transport
///
/// # Example
/// ```no_run
/// use flvpipe::publish::Publisher;
/// use flvpipe::transport::MemoryTransport;
///
/// # async fn example() -> flvpipe::Result<()> {
/// let mut publisher = Publisher::new(MemoryTransport::new());
/// publisher.connect("rtmp://localhost/live/key").await?;
/// publisher.send_metadata(240, 160, false).await?;
/// publisher.send_avc_sequence_header(&[0x67, 0x42, 0xC0, 0x1E], &[0x68, 0xCB]).await?;
/// publisher.send_video(&[0x65, 0x88], 0, true).await?;
/// # Ok(())
/// # }
/// ```
pub struct Publisher<T: Transport> {
    session: StreamSession<T>,
    muxer: TagMuxer,
    header_sent: bool,
}

impl<T: Transport> Publisher<T> {
    /// Create a publisher over an unconnected transport
    pub fn new(transport: T) -> Self {
        Self {
            session: StreamSession::new(transport),
            muxer: TagMuxer::new(),
            header_sent: false,
        }
    }

    /// Connect in publish mode
    pub async fn connect(&mut self, url: &str) -> Result<()> {
        self.session.connect(url, true).await?;
        tracing::info!(url, "publisher connected");
        Ok(())
    }

    /// Announce stream metadata.
    ///
    /// Width/height of zero omit the video keys; `have_audio` controls the
    /// audio codec key.
    pub async fn send_metadata(&mut self, width: u32, height: u32, have_audio: bool) -> Result<()> {
        let meta = StreamMetadata {
            width,
            height,
            have_audio,
        };
        let tag = encode_metadata_tag(meta)?;
        self.session.write_tag(&tag).await?;
        Ok(())
    }

    /// Send the AVC sequence header built from one SPS and one PPS.
    ///
    /// Must precede any video access unit.
    pub async fn send_avc_sequence_header(&mut self, sps: &[u8], pps: &[u8]) -> Result<()> {
        let record = AvcDecoderConfig::from_parameter_sets(sps, pps)?.encode();
        let tag = self.muxer.mux(
            &record,
            TagParams::video(0, 0).keyframe(true).sequence_header(true),
        )?;
        self.session.write_tag(&tag).await?;
        self.header_sent = true;
        tracing::debug!(
            sps_len = sps.len(),
            pps_len = pps.len(),
            "sequence header sent"
        );
        Ok(())
    }

    /// Send one video access unit (a bare NAL payload, no start code).
    pub async fn send_video(&mut self, nal: &[u8], pts: u32, keyframe: bool) -> Result<()> {
        let tag = self
            .muxer
            .mux(nal, TagParams::video(pts, pts).keyframe(keyframe))?;
        self.session.write_tag(&tag).await?;
        Ok(())
    }

    /// Send the audio decoder configuration (e.g. AudioSpecificConfig).
    pub async fn send_audio_config(&mut self, config: &[u8]) -> Result<()> {
        let tag = self
            .muxer
            .mux(config, TagParams::audio(0).sequence_header(true))?;
        self.session.write_tag(&tag).await?;
        Ok(())
    }

    /// Send one raw audio frame.
    pub async fn send_audio(&mut self, frame: &[u8], pts: u32) -> Result<()> {
        let tag = self.muxer.mux(frame, TagParams::audio(pts))?;
        self.session.write_tag(&tag).await?;
        Ok(())
    }

    /// Whether the sequence header has been sent
    pub fn header_sent(&self) -> bool {
        self.header_sent
    }

    /// Close the connection
    pub async fn disconnect(&mut self) {
        self.session.close().await;
        tracing::info!("publisher disconnected");
    }
}
