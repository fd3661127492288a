//! FLV tag muxing
//!
//! Packages one access unit (or a decoder configuration record) into a
//! complete, self-describing FLV tag ready to hand to the transport.
//!
//! FLV Tag Structure:
//! ```text
//! +--------+-------------+-----------+-------------+---------+------------+
//! | Type(1)| DataSize(3) | TS(3+1)   | StreamID(3) | Body(N) | PrevSize(4)|
//! +--------+-------------+-----------+-------------+---------+------------+
//! ```
//!
//! Video body (AVC):
//! ```text
//! +----------+----------+-----------------+------------------+
//! |FrameType | CodecID  | AVCPacketType   | CompositionTime  | Data
//! | (4 bits) | (4 bits) | (1 byte)        | (3 bytes, SI24)  |
//! +----------+----------+-----------------+------------------+
//! ```
//! NALU bodies carry a 4-byte big-endian length before the raw payload;
//! sequence headers carry the configuration record with no length prefix.
//!
//! Audio body (AAC): header byte `0xAF`, then packet type (0 = config,
//! 1 = raw frame).

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::MuxError;

/// FLV tag type: audio
pub const TAG_TYPE_AUDIO: u8 = 8;
/// FLV tag type: video
pub const TAG_TYPE_VIDEO: u8 = 9;
/// FLV tag type: script data
pub const TAG_TYPE_SCRIPT: u8 = 18;

/// Fixed tag header size (type + size + timestamp + stream id)
pub const TAG_HEADER_SIZE: usize = 11;
/// Largest body size the 24-bit data size field can declare
pub const MAX_TAG_DATA_SIZE: usize = 0x00FF_FFFF;
/// Size of the previous-tag-size trailer
pub const TAG_TRAILER_SIZE: usize = 4;

/// AVC codec id, low nibble of the video header byte
pub const VIDEO_CODEC_AVC: u8 = 0x07;
/// Frame type nibble: keyframe
pub const FRAME_TYPE_KEYFRAME: u8 = 1;
/// Frame type nibble: inter frame
pub const FRAME_TYPE_INTER: u8 = 2;
/// Audio header byte: AAC, 44100Hz, stereo, 16-bit
pub const AUDIO_HEADER_AAC: u8 = 0xA0 | 0x0F;

/// Media kind carried by a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// The FLV tag type byte for this kind
    pub fn tag_type(&self) -> u8 {
        match self {
            MediaKind::Audio => TAG_TYPE_AUDIO,
            MediaKind::Video => TAG_TYPE_VIDEO,
        }
    }
}

/// Timing and framing parameters for one tag
#[derive(Debug, Clone, Copy)]
pub struct TagParams {
    /// Media kind
    pub kind: MediaKind,
    /// Presentation timestamp in milliseconds
    pub pts: u32,
    /// Decode timestamp in milliseconds
    pub dts: u32,
    /// Keyframe flag (video only)
    pub keyframe: bool,
    /// Sequence header flag (decoder configuration, not a playable unit)
    pub sequence_header: bool,
}

impl TagParams {
    /// Video tag parameters (inter frame, not a sequence header)
    pub fn video(pts: u32, dts: u32) -> Self {
        Self {
            kind: MediaKind::Video,
            pts,
            dts,
            keyframe: false,
            sequence_header: false,
        }
    }

    /// Audio tag parameters (raw frame)
    pub fn audio(pts: u32) -> Self {
        Self {
            kind: MediaKind::Audio,
            pts,
            dts: pts,
            keyframe: false,
            sequence_header: false,
        }
    }

    /// Set the keyframe flag
    pub fn keyframe(mut self, keyframe: bool) -> Self {
        self.keyframe = keyframe;
        self
    }

    /// Set the sequence header flag
    pub fn sequence_header(mut self, sequence_header: bool) -> Self {
        self.sequence_header = sequence_header;
        self
    }
}

/// FLV tag encoder
///
/// Reuses its internal buffer across calls; each `mux()` returns a frozen,
/// independently owned tag.
#[derive(Debug, Default)]
pub struct TagMuxer {
    buf: BytesMut,
}

impl TagMuxer {
    /// Create a new muxer
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Encode one access unit into a complete FLV tag.
    ///
    /// The declared size fields are computed from the actual encoded
    /// lengths; the trailer always equals 11 + body size. The body must
    /// fit the 24-bit size field; larger payloads are rejected.
    pub fn mux(&mut self, payload: &[u8], params: TagParams) -> Result<Bytes, MuxError> {
        let is_video = params.kind == MediaKind::Video;

        // Body size: payload + type-specific header, plus the NALU length
        // prefix for non-sequence-header video.
        let mut data_size = payload.len() + if is_video { 5 } else { 2 };
        if is_video && !params.sequence_header {
            data_size += 4;
        }
        if data_size > MAX_TAG_DATA_SIZE {
            return Err(MuxError::BufferOverflow {
                needed: data_size,
                capacity: MAX_TAG_DATA_SIZE,
            });
        }

        let buf = &mut self.buf;
        buf.reserve(TAG_HEADER_SIZE + data_size + TAG_TRAILER_SIZE);

        buf.put_u8(params.kind.tag_type());
        put_u24(buf, data_size as u32);

        // 24-bit timestamp plus the extended byte (bits 24..32)
        put_u24(buf, params.dts & 0x00FF_FFFF);
        buf.put_u8((params.dts >> 24) as u8);

        // Stream id, always zero
        put_u24(buf, 0);

        if is_video {
            let frame_type = if params.keyframe {
                FRAME_TYPE_KEYFRAME
            } else {
                FRAME_TYPE_INTER
            };
            buf.put_u8((frame_type << 4) | VIDEO_CODEC_AVC);
            buf.put_u8(if params.sequence_header { 0x00 } else { 0x01 });

            // Composition time: pts - dts, zero for sequence headers
            let cts = if params.sequence_header {
                0
            } else {
                params.pts as i64 - params.dts as i64
            };
            put_u24(buf, (cts as u32) & 0x00FF_FFFF);

            if !params.sequence_header {
                buf.put_u32(payload.len() as u32);
            }
        } else {
            buf.put_u8(AUDIO_HEADER_AAC);
            buf.put_u8(if params.sequence_header { 0x00 } else { 0x01 });
        }

        buf.put_slice(payload);
        buf.put_u32((data_size + TAG_HEADER_SIZE) as u32);

        debug_assert_eq!(
            buf.len(),
            TAG_HEADER_SIZE + data_size + TAG_TRAILER_SIZE
        );
        Ok(buf.split().freeze())
    }
}

/// Parsed FLV tag header (the fixed 11-byte prefix)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    /// Tag type byte (8 = audio, 9 = video, 18 = script)
    pub tag_type: u8,
    /// Declared body size
    pub data_size: u32,
    /// Timestamp in milliseconds (extended byte included)
    pub timestamp: u32,
}

impl TagHeader {
    /// Parse the fixed header from the start of `buf`
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < TAG_HEADER_SIZE {
            return None;
        }
        let data_size = u32::from(buf[1]) << 16 | u32::from(buf[2]) << 8 | u32::from(buf[3]);
        let timestamp = u32::from(buf[4]) << 16
            | u32::from(buf[5]) << 8
            | u32::from(buf[6])
            | u32::from(buf[7]) << 24;
        Some(Self {
            tag_type: buf[0],
            data_size,
            timestamp,
        })
    }

    /// Total encoded length of the tag this header starts, trailer included
    pub fn total_len(&self) -> usize {
        TAG_HEADER_SIZE + self.data_size as usize + TAG_TRAILER_SIZE
    }
}

/// Read the previous-tag-size trailer of a complete encoded tag
pub fn tag_trailer(tag: &[u8]) -> Option<u32> {
    if tag.len() < TAG_TRAILER_SIZE {
        return None;
    }
    let t = &tag[tag.len() - TAG_TRAILER_SIZE..];
    Some(u32::from_be_bytes([t[0], t[1], t[2], t[3]]))
}

fn put_u24(buf: &mut BytesMut, v: u32) {
    buf.put_u8((v >> 16) as u8);
    buf.put_u8((v >> 8) as u8);
    buf.put_u8(v as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_tag_size_fields() {
        let mut muxer = TagMuxer::new();
        for payload_len in [0usize, 1, 17, 1000, 70000] {
            let payload = vec![0xABu8; payload_len];
            let tag = muxer.mux(&payload, TagParams::video(40, 40)).unwrap();

            let header = TagHeader::parse(&tag).unwrap();
            assert_eq!(header.tag_type, TAG_TYPE_VIDEO);
            // 5 header bytes + 4-byte NALU length prefix
            assert_eq!(header.data_size as usize, payload_len + 5 + 4);
            assert_eq!(tag.len(), header.total_len());
            assert_eq!(tag_trailer(&tag), Some(header.data_size + 11));
        }
    }

    #[test]
    fn test_audio_tag_size_fields() {
        let mut muxer = TagMuxer::new();
        for payload_len in [0usize, 3, 512] {
            let payload = vec![0x21u8; payload_len];
            let tag = muxer.mux(&payload, TagParams::audio(0)).unwrap();

            let header = TagHeader::parse(&tag).unwrap();
            assert_eq!(header.tag_type, TAG_TYPE_AUDIO);
            assert_eq!(header.data_size as usize, payload_len + 2);
            assert_eq!(tag.len(), header.total_len());
            assert_eq!(tag_trailer(&tag), Some(header.data_size + 11));
        }
    }

    #[test]
    fn test_video_keyframe_byte() {
        let mut muxer = TagMuxer::new();

        let key = muxer.mux(&[0x65], TagParams::video(0, 0).keyframe(true)).unwrap();
        assert_eq!(key[TAG_HEADER_SIZE], 0x17);

        let inter = muxer.mux(&[0x41], TagParams::video(40, 40)).unwrap();
        assert_eq!(inter[TAG_HEADER_SIZE], 0x27);
    }

    #[test]
    fn test_video_sequence_header_layout() {
        let mut muxer = TagMuxer::new();
        let record = [0x01, 0x42, 0xC0, 0x1E];
        let tag = muxer
            .mux(
                &record,
                TagParams::video(0, 0).keyframe(true).sequence_header(true),
            )
            .unwrap();

        let body = &tag[TAG_HEADER_SIZE..];
        assert_eq!(body[0], 0x17); // keyframe + AVC
        assert_eq!(body[1], 0x00); // AVC packet type: sequence header
        assert_eq!(&body[2..5], &[0, 0, 0]); // composition time zero
        // No NALU length prefix: record follows directly
        assert_eq!(&body[5..9], &record);

        let header = TagHeader::parse(&tag).unwrap();
        assert_eq!(header.data_size as usize, record.len() + 5);
    }

    #[test]
    fn test_nalu_length_prefix() {
        let mut muxer = TagMuxer::new();
        let nal = [0x41, 0x9A, 0x00, 0xFF, 0x10];
        let tag = muxer.mux(&nal, TagParams::video(80, 80)).unwrap();

        let body = &tag[TAG_HEADER_SIZE..];
        assert_eq!(body[1], 0x01); // AVC packet type: NALU
        assert_eq!(&body[5..9], &(nal.len() as u32).to_be_bytes());
        assert_eq!(&body[9..9 + nal.len()], &nal);
    }

    #[test]
    fn test_composition_time() {
        let mut muxer = TagMuxer::new();
        let tag = muxer.mux(&[0x41], TagParams::video(120, 80)).unwrap();
        let body = &tag[TAG_HEADER_SIZE..];
        assert_eq!(&body[2..5], &[0, 0, 40]);
    }

    #[test]
    fn test_timestamp_extended_byte() {
        let mut muxer = TagMuxer::new();
        let ts: u32 = 0x0123_4567;
        let tag = muxer.mux(&[0x41], TagParams::video(ts, ts)).unwrap();

        let header = TagHeader::parse(&tag).unwrap();
        assert_eq!(header.timestamp, ts);
        // Low 24 bits first, then the extended byte
        assert_eq!(&tag[4..8], &[0x23, 0x45, 0x67, 0x01]);
    }

    #[test]
    fn test_audio_config_packet_type() {
        let mut muxer = TagMuxer::new();
        let tag = muxer.mux(&[0x12, 0x10], TagParams::audio(0).sequence_header(true)).unwrap();
        let body = &tag[TAG_HEADER_SIZE..];
        assert_eq!(body[0], AUDIO_HEADER_AAC);
        assert_eq!(body[1], 0x00);

        let tag = muxer.mux(&[0x21, 0x00], TagParams::audio(23)).unwrap();
        assert_eq!(tag[TAG_HEADER_SIZE + 1], 0x01);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let mut muxer = TagMuxer::new();

        // Video header overhead is 9 bytes; right at the u24 limit passes
        let payload = vec![0u8; MAX_TAG_DATA_SIZE - 9];
        let tag = muxer.mux(&payload, TagParams::video(0, 0)).unwrap();
        let header = TagHeader::parse(&tag).unwrap();
        assert_eq!(header.data_size as usize, MAX_TAG_DATA_SIZE);

        // One byte more would truncate the declared size field
        let payload = vec![0u8; MAX_TAG_DATA_SIZE - 8];
        let err = muxer.mux(&payload, TagParams::video(0, 0)).unwrap_err();
        assert_eq!(
            err,
            MuxError::BufferOverflow {
                needed: MAX_TAG_DATA_SIZE + 1,
                capacity: MAX_TAG_DATA_SIZE,
            }
        );
    }

    #[test]
    fn test_muxer_buffer_reuse() {
        let mut muxer = TagMuxer::new();
        let a = muxer.mux(&[1, 2, 3], TagParams::audio(0)).unwrap();
        let b = muxer.mux(&[4, 5, 6], TagParams::audio(10)).unwrap();
        // Earlier outputs stay valid after the buffer is reused
        assert_eq!(&a[TAG_HEADER_SIZE + 2..TAG_HEADER_SIZE + 5], &[1, 2, 3]);
        assert_eq!(&b[TAG_HEADER_SIZE + 2..TAG_HEADER_SIZE + 5], &[4, 5, 6]);
    }
}
