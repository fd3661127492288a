//! AVC decoder configuration record
//!
//! Builds and parses the AVCDecoderConfigurationRecord carried by a video
//! sequence-header tag. Exactly one SPS and one PPS are supported.
//!
//! Record layout:
//! ```text
//! configurationVersion (1) | AVCProfileIndication (1) | profile_compatibility (1)
//! | AVCLevelIndication (1) | 0xFC | lengthSizeMinusOne (2 bits)
//! | 0xE0 | numOfSPS (5 bits) | spsLength (2) | spsNALUnit
//! | numOfPPS (1) | ppsLength (2) | ppsNALUnit
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::MuxError;

/// Fixed scratch capacity for a single parameter set
pub const MAX_PARAMETER_SET_LEN: usize = 100;

/// AVC decoder configuration built from one SPS and one PPS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcDecoderConfig {
    /// AVC profile (SPS byte 1)
    pub profile: u8,
    /// Profile compatibility flags (SPS byte 2)
    pub compatibility: u8,
    /// AVC level (SPS byte 3)
    pub level: u8,
    /// Sequence parameter set
    pub sps: Bytes,
    /// Picture parameter set
    pub pps: Bytes,
}

impl AvcDecoderConfig {
    /// Build a configuration from raw parameter sets.
    ///
    /// The profile/compatibility/level bytes are copied out of the SPS.
    pub fn from_parameter_sets(sps: &[u8], pps: &[u8]) -> Result<Self, MuxError> {
        if sps.len() < 4 {
            return Err(MuxError::MalformedParameterSets {
                reason: "sps shorter than 4 bytes",
            });
        }
        if sps.len() > MAX_PARAMETER_SET_LEN {
            return Err(MuxError::MalformedParameterSets {
                reason: "sps exceeds scratch capacity",
            });
        }
        if pps.is_empty() {
            return Err(MuxError::MalformedParameterSets {
                reason: "pps empty",
            });
        }
        if pps.len() > MAX_PARAMETER_SET_LEN {
            return Err(MuxError::MalformedParameterSets {
                reason: "pps exceeds scratch capacity",
            });
        }

        Ok(Self {
            profile: sps[1],
            compatibility: sps[2],
            level: sps[3],
            sps: Bytes::copy_from_slice(sps),
            pps: Bytes::copy_from_slice(pps),
        })
    }

    /// Encode the AVCDecoderConfigurationRecord
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(11 + self.sps.len() + self.pps.len());

        buf.put_u8(0x01); // configuration version
        buf.put_u8(self.profile);
        buf.put_u8(self.compatibility);
        buf.put_u8(self.level);
        buf.put_u8(0xFC | 3); // reserved (6 bits), NALU length size - 1
        buf.put_u8(0xE0 | 1); // reserved (3 bits), number of SPS

        buf.put_u16(self.sps.len() as u16);
        buf.put_slice(&self.sps);

        buf.put_u8(1); // number of PPS
        buf.put_u16(self.pps.len() as u16);
        buf.put_slice(&self.pps);

        buf.freeze()
    }

    /// Parse an encoded record back into its parameter sets.
    ///
    /// Only the single-SPS/single-PPS form produced by `encode()` is
    /// accepted.
    pub fn parse(data: &[u8]) -> Result<Self, MuxError> {
        if data.len() < 11 {
            return Err(MuxError::MalformedParameterSets {
                reason: "record truncated",
            });
        }
        if data[0] != 0x01 {
            return Err(MuxError::MalformedParameterSets {
                reason: "unsupported configuration version",
            });
        }

        let profile = data[1];
        let compatibility = data[2];
        let level = data[3];

        let num_sps = (data[5] & 0x1F) as usize;
        if num_sps != 1 {
            return Err(MuxError::MalformedParameterSets {
                reason: "exactly one sps expected",
            });
        }

        let sps_len = u16::from_be_bytes([data[6], data[7]]) as usize;
        let mut pos = 8;
        if data.len() < pos + sps_len {
            return Err(MuxError::MalformedParameterSets {
                reason: "record truncated",
            });
        }
        let sps = Bytes::copy_from_slice(&data[pos..pos + sps_len]);
        pos += sps_len;

        if data.len() < pos + 3 {
            return Err(MuxError::MalformedParameterSets {
                reason: "record truncated",
            });
        }
        let num_pps = data[pos] as usize;
        if num_pps != 1 {
            return Err(MuxError::MalformedParameterSets {
                reason: "exactly one pps expected",
            });
        }
        let pps_len = u16::from_be_bytes([data[pos + 1], data[pos + 2]]) as usize;
        pos += 3;
        if data.len() < pos + pps_len {
            return Err(MuxError::MalformedParameterSets {
                reason: "record truncated",
            });
        }
        let pps = Bytes::copy_from_slice(&data[pos..pos + pps_len]);

        Ok(Self {
            profile,
            compatibility,
            level,
            sps,
            pps,
        })
    }
}

/// Convenience function: encode a record directly from parameter sets
pub fn build_avcc(sps: &[u8], pps: &[u8]) -> Result<Bytes, MuxError> {
    Ok(AvcDecoderConfig::from_parameter_sets(sps, pps)?.encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: &[u8] = &[
        0x67, 0x42, 0xC0, 0x1E, 0xD9, 0x00, 0xF0, 0x88, 0x45, 0x96,
    ];
    const PPS: &[u8] = &[0x68, 0xCB, 0x83, 0xCB, 0x20];

    #[test]
    fn test_encode_layout() {
        let record = build_avcc(SPS, PPS).unwrap();

        assert_eq!(record[0], 0x01);
        assert_eq!(record[1], SPS[1]); // profile
        assert_eq!(record[2], SPS[2]); // compatibility
        assert_eq!(record[3], SPS[3]); // level
        assert_eq!(record[4], 0xFF); // 0xFC | 3
        assert_eq!(record[5], 0xE1); // 0xE0 | 1
        assert_eq!(&record[6..8], &(SPS.len() as u16).to_be_bytes());
        assert_eq!(&record[8..8 + SPS.len()], SPS);

        let pps_at = 8 + SPS.len();
        assert_eq!(record[pps_at], 1);
        assert_eq!(
            &record[pps_at + 1..pps_at + 3],
            &(PPS.len() as u16).to_be_bytes()
        );
        assert_eq!(&record[pps_at + 3..], PPS);
    }

    #[test]
    fn test_roundtrip() {
        let config = AvcDecoderConfig::from_parameter_sets(SPS, PPS).unwrap();
        let encoded = config.encode();
        let parsed = AvcDecoderConfig::parse(&encoded).unwrap();

        assert_eq!(&parsed.sps[..], SPS);
        assert_eq!(&parsed.pps[..], PPS);
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_short_sps_rejected() {
        let err = build_avcc(&[0x67, 0x42], PPS).unwrap_err();
        assert!(matches!(err, MuxError::MalformedParameterSets { .. }));
    }

    #[test]
    fn test_oversized_parameter_sets_rejected() {
        let big = vec![0x67; MAX_PARAMETER_SET_LEN + 1];
        assert!(build_avcc(&big, PPS).is_err());
        assert!(build_avcc(SPS, &big).is_err());

        // At the bound, both still fit
        let sps_max = {
            let mut v = vec![0u8; MAX_PARAMETER_SET_LEN];
            v[..4].copy_from_slice(&[0x67, 0x42, 0xC0, 0x1E]);
            v
        };
        let pps_max = vec![0x68; MAX_PARAMETER_SET_LEN];
        assert!(build_avcc(&sps_max, &pps_max).is_ok());
    }

    #[test]
    fn test_empty_pps_rejected() {
        assert!(build_avcc(SPS, &[]).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_version() {
        let mut record = build_avcc(SPS, PPS).unwrap().to_vec();
        record[0] = 0x02;
        assert!(AvcDecoderConfig::parse(&record).is_err());
    }

    #[test]
    fn test_parse_rejects_truncated() {
        let record = build_avcc(SPS, PPS).unwrap();
        for cut in [0, 5, 10, record.len() - 1] {
            assert!(AvcDecoderConfig::parse(&record[..cut]).is_err());
        }
    }
}
