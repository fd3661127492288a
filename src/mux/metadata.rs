//! Stream metadata script tag
//!
//! Encodes the `onMetaData` script-data tag: an AMF0 ECMA array with the
//! fixed key set {duration, width, height, videocodecid, audiocodecid}.
//! Video keys appear only when both dimensions are positive; the audio key
//! only when the stream has audio. The whole tag is encoded into a bounded
//! buffer and fails explicitly when the bound is insufficient.

use bytes::Bytes;

use super::amf0::BoundedAmf0Writer;
use super::tag::{TAG_HEADER_SIZE, TAG_TYPE_SCRIPT};
use crate::error::MuxError;

/// Fixed encode buffer capacity for the metadata tag
pub const METADATA_BUF_CAPACITY: usize = 512;

/// AMF videocodecid value for AVC
const VIDEO_CODEC_ID_AVC: f64 = 7.0;
/// AMF audiocodecid value for AAC
const AUDIO_CODEC_ID_AAC: f64 = 10.0;

/// Stream properties announced in the metadata tag
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamMetadata {
    /// Video width in pixels (0 = no video dimensions announced)
    pub width: u32,
    /// Video height in pixels
    pub height: u32,
    /// Whether the stream carries audio
    pub have_audio: bool,
}

impl StreamMetadata {
    /// Video-only metadata
    pub fn video(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            have_audio: false,
        }
    }

    /// Enable the audio codec announcement
    pub fn with_audio(mut self) -> Self {
        self.have_audio = true;
        self
    }
}

/// Encode a complete `onMetaData` script tag, trailer included.
pub fn encode_metadata_tag(meta: StreamMetadata) -> Result<Bytes, MuxError> {
    let mut w = BoundedAmf0Writer::new(METADATA_BUF_CAPACITY);

    // Fixed tag header; the size field is patched once the body is known.
    w.put_u8(TAG_TYPE_SCRIPT)?;
    w.put_u24(0)?; // data size, patched below
    w.put_u24(0)?; // timestamp
    w.put_u8(0)?; // timestamp extended
    w.put_u24(0)?; // stream id

    w.put_string("onMetaData")?;
    w.put_ecma_array_header(5)?; // count hint, matches the full key set

    w.put_named_number("duration", 0.0)?;
    if meta.width > 0 && meta.height > 0 {
        w.put_named_number("width", meta.width as f64)?;
        w.put_named_number("height", meta.height as f64)?;
        w.put_named_number("videocodecid", VIDEO_CODEC_ID_AVC)?;
    }
    if meta.have_audio {
        w.put_named_number("audiocodecid", AUDIO_CODEC_ID_AAC)?;
    }
    w.put_object_end()?;

    let data_size = (w.len() - TAG_HEADER_SIZE) as u32;
    w.patch_u24(1, data_size);
    w.put_u32(data_size + TAG_HEADER_SIZE as u32)?;

    Ok(w.into_bytes())
}
