//! Bounded AMF0 write primitives
//!
//! A minimal write-side AMF0 encoder for the script-data tag. Every write
//! is checked against a fixed capacity and fails with `BufferOverflow`
//! instead of growing the buffer.
//!
//! Type markers used here:
//! ```text
//! 0x00 - Number (IEEE 754 double)
//! 0x02 - String (UTF-8, 16-bit length prefix)
//! 0x08 - ECMA Array (associative array)
//! 0x09 - Object End (0x000009 sequence)
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::MuxError;

/// AMF0 number marker
pub const MARKER_NUMBER: u8 = 0x00;
/// AMF0 string marker
pub const MARKER_STRING: u8 = 0x02;
/// AMF0 ECMA array marker
pub const MARKER_ECMA_ARRAY: u8 = 0x08;
/// AMF0 object end marker
pub const MARKER_OBJECT_END: u8 = 0x09;

/// AMF0 writer with a hard capacity bound
#[derive(Debug)]
pub struct BoundedAmf0Writer {
    buf: BytesMut,
    capacity: usize,
}

impl BoundedAmf0Writer {
    /// Create a writer that refuses to grow past `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn ensure(&mut self, extra: usize) -> Result<(), MuxError> {
        let needed = self.buf.len() + extra;
        if needed > self.capacity {
            return Err(MuxError::BufferOverflow {
                needed,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Write a raw byte
    pub fn put_u8(&mut self, v: u8) -> Result<(), MuxError> {
        self.ensure(1)?;
        self.buf.put_u8(v);
        Ok(())
    }

    /// Write a raw 24-bit big-endian integer
    pub fn put_u24(&mut self, v: u32) -> Result<(), MuxError> {
        self.ensure(3)?;
        self.buf.put_u8((v >> 16) as u8);
        self.buf.put_u8((v >> 8) as u8);
        self.buf.put_u8(v as u8);
        Ok(())
    }

    /// Write a raw 32-bit big-endian integer
    pub fn put_u32(&mut self, v: u32) -> Result<(), MuxError> {
        self.ensure(4)?;
        self.buf.put_u32(v);
        Ok(())
    }

    /// Write raw bytes
    pub fn put_slice(&mut self, v: &[u8]) -> Result<(), MuxError> {
        self.ensure(v.len())?;
        self.buf.put_slice(v);
        Ok(())
    }

    /// Write an AMF0 string (marker + 16-bit length + UTF-8 bytes)
    pub fn put_string(&mut self, s: &str) -> Result<(), MuxError> {
        self.ensure(3 + s.len())?;
        self.buf.put_u8(MARKER_STRING);
        self.buf.put_u16(s.len() as u16);
        self.buf.put_slice(s.as_bytes());
        Ok(())
    }

    /// Write an AMF0 number (marker + IEEE 754 double)
    pub fn put_number(&mut self, n: f64) -> Result<(), MuxError> {
        self.ensure(9)?;
        self.buf.put_u8(MARKER_NUMBER);
        self.buf.put_f64(n);
        Ok(())
    }

    /// Write the ECMA array marker with its element count hint
    pub fn put_ecma_array_header(&mut self, count: u32) -> Result<(), MuxError> {
        self.ensure(5)?;
        self.buf.put_u8(MARKER_ECMA_ARRAY);
        self.buf.put_u32(count);
        Ok(())
    }

    /// Write a named number property (bare key + number value)
    pub fn put_named_number(&mut self, name: &str, n: f64) -> Result<(), MuxError> {
        self.ensure(2 + name.len() + 9)?;
        self.buf.put_u16(name.len() as u16);
        self.buf.put_slice(name.as_bytes());
        self.buf.put_u8(MARKER_NUMBER);
        self.buf.put_f64(n);
        Ok(())
    }

    /// Write the object end sequence (empty key + end marker)
    pub fn put_object_end(&mut self) -> Result<(), MuxError> {
        self.put_u24(MARKER_OBJECT_END as u32)
    }

    /// Patch a 24-bit big-endian value at an already-written offset
    pub fn patch_u24(&mut self, offset: usize, v: u32) {
        debug_assert!(offset + 3 <= self.buf.len());
        self.buf[offset] = (v >> 16) as u8;
        self.buf[offset + 1] = (v >> 8) as u8;
        self.buf[offset + 2] = v as u8;
    }

    /// Freeze the written bytes
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}
