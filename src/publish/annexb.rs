//! Annex-B elementary stream splitting
//!
//! Raw H.264 files carry NAL units separated by 3- or 4-byte start codes
//! (`00 00 01` / `00 00 00 01`). The publisher needs the bare NAL payloads,
//! so this module walks a byte stream and yields them without the codes.

/// NAL unit type relevant to the publish flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    /// Non-IDR slice
    Slice,
    /// IDR slice (keyframe)
    Idr,
    /// Supplemental enhancement information
    Sei,
    /// Sequence parameter set
    Sps,
    /// Picture parameter set
    Pps,
    /// Anything else
    Other(u8),
}

impl NaluType {
    /// Classify a NAL unit from its first byte
    pub fn from_byte(b: u8) -> Self {
        match b & 0x1F {
            1 => NaluType::Slice,
            5 => NaluType::Idr,
            6 => NaluType::Sei,
            7 => NaluType::Sps,
            8 => NaluType::Pps,
            t => NaluType::Other(t),
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, NaluType::Idr)
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, NaluType::Sps | NaluType::Pps)
    }
}

/// Iterator over the NAL unit payloads of an Annex-B stream
#[derive(Debug)]
pub struct NalUnits<'a> {
    buf: &'a [u8],
}

/// Iterate the NAL units of an Annex-B byte stream.
///
/// The stream must begin with a start code; bytes before the first start
/// code are skipped.
pub fn nal_units(buf: &[u8]) -> NalUnits<'_> {
    NalUnits { buf }
}

impl<'a> Iterator for NalUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let start = find_start_code(self.buf)?;
        let payload_start = start.0 + start.1;
        let rest = &self.buf[payload_start..];

        match find_start_code(rest) {
            Some((next, _)) => {
                self.buf = &rest[next..];
                Some(&rest[..next])
            }
            None => {
                self.buf = &[];
                Some(rest)
            }
        }
    }
}

/// Locate the next start code: (offset, code length)
fn find_start_code(buf: &[u8]) -> Option<(usize, usize)> {
    let mut pos = 0;
    while pos + 3 <= buf.len() {
        if buf[pos] == 0 && buf[pos + 1] == 0 {
            if buf[pos + 2] == 1 {
                return Some((pos, 3));
            }
            if pos + 4 <= buf.len() && buf[pos + 2] == 0 && buf[pos + 3] == 1 {
                return Some((pos, 4));
            }
        }
        pos += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_mixed_start_codes() {
        let stream = [
            0, 0, 0, 1, 0x67, 0x42, // SPS, 4-byte code
            0, 0, 1, 0x68, 0xCB, // PPS, 3-byte code
            0, 0, 0, 1, 0x65, 0x88, 0x84, // IDR
        ];
        let nals: Vec<&[u8]> = nal_units(&stream).collect();
        assert_eq!(nals.len(), 3);
        assert_eq!(nals[0], &[0x67, 0x42]);
        assert_eq!(nals[1], &[0x68, 0xCB]);
        assert_eq!(nals[2], &[0x65, 0x88, 0x84]);
    }

    #[test]
    fn test_classification() {
        assert_eq!(NaluType::from_byte(0x67), NaluType::Sps);
        assert_eq!(NaluType::from_byte(0x68), NaluType::Pps);
        assert_eq!(NaluType::from_byte(0x65), NaluType::Idr);
        assert_eq!(NaluType::from_byte(0x41), NaluType::Slice);
        assert_eq!(NaluType::from_byte(0x06), NaluType::Sei);
        assert_eq!(NaluType::from_byte(0x69), NaluType::Other(9));

        assert!(NaluType::Idr.is_keyframe());
        assert!(!NaluType::Slice.is_keyframe());
        assert!(NaluType::Sps.is_parameter_set());
        assert!(NaluType::Pps.is_parameter_set());
        assert!(!NaluType::Idr.is_parameter_set());
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert_eq!(nal_units(&[]).count(), 0);
        assert_eq!(nal_units(&[0xFF, 0x00, 0xAB]).count(), 0);

        // Leading garbage before the first start code is skipped
        let stream = [0xAA, 0xBB, 0, 0, 1, 0x41, 0x9A];
        let nals: Vec<&[u8]> = nal_units(&stream).collect();
        assert_eq!(nals, vec![&[0x41, 0x9A][..]]);
    }
}
