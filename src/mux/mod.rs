//! FLV tag encoding
//!
//! This module provides:
//! - FLV tag muxing for audio/video access units
//! - AVCDecoderConfigurationRecord building and parsing
//! - `onMetaData` script tag encoding
//! - Bounded AMF0 write primitives

pub mod amf0;
pub mod avcc;
pub mod metadata;
pub mod tag;

pub use amf0::BoundedAmf0Writer;
pub use avcc::{build_avcc, AvcDecoderConfig};
pub use metadata::{encode_metadata_tag, StreamMetadata};
pub use tag::{MediaKind, TagHeader, TagMuxer, TagParams, TAG_HEADER_SIZE, TAG_TRAILER_SIZE};
