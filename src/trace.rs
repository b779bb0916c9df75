//! Layer 1 trace messages carried inside frames of the trace channel.
//!
//! The first five payload bytes of a trace message form the [TraceHeader]:
//!
//! ```text
//! | msg_type | trace_id | info | content_len (BE u16) | content ...
//! ```
//!
//! The `info` byte contains the direction in bit 0 and the [TraceFormat] code in bits 1 to 4.
use crate::ByteConversionError;
use arbitrary_int::{prelude::*, u4};

/// Length of the trace header preceding the trace content.
pub const TRACE_HEADER_LEN: usize = 5;
/// Message type of layer 1 trace messages.
pub const MSG_TYPE_L1_TRACE: u8 = 0x03;
/// Trace IDs starting with this value (GPRS RLC/MAC headers, RATSCCH) are not translated.
pub const FIRST_UNSUPPORTED_TRACE_ID: u8 = 0x04;

/// The `info` byte of the trace header.
#[bitbybit::bitfield(u8, default = 0x00, debug, defmt_bitfields(feature = "defmt"))]
#[derive(PartialEq, Eq)]
pub struct TraceInfo {
    #[bits(1..=4, rw)]
    format_code: u4,
    #[bit(0, rw)]
    uplink: bool,
}

impl TraceInfo {
    /// Known format of this trace, or [None] for reserved and unassigned codes.
    #[inline]
    pub fn format(&self) -> Option<TraceFormat> {
        TraceFormat::try_from(self.format_code().as_u8()).ok()
    }
}

/// Air interface channel or burst type of a trace message.
///
/// Codes 6, 13, 14 and 15 are not assigned.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TraceFormat {
    NormalBurst = 0,
    Rach = 1,
    AccessBurst = 2,
    Bcch = 3,
    Pch = 4,
    /// Cell broadcast channel, transported on an SDCCH.
    Cbch = 5,
    Sdcch = 7,
    /// Slow associated control channel of an SDCCH.
    SacchSdcch = 8,
    TchF = 9,
    TchH = 10,
    Ccch = 11,
    Agch = 12,
}

/// Header of a layer 1 trace message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TraceHeader {
    pub msg_type: u8,
    pub trace_id: u8,
    pub info: TraceInfo,
    /// Length of the trace content following the header. This is independent of the frame
    /// length and must be checked against the available payload.
    pub content_len: u16,
}

impl TraceHeader {
    /// Parse [Self] from the leading payload bytes of a frame.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ByteConversionError> {
        if buf.len() < TRACE_HEADER_LEN {
            return Err(ByteConversionError::FromSliceTooSmall {
                found: buf.len(),
                expected: TRACE_HEADER_LEN,
            });
        }
        Ok(Self {
            msg_type: buf[0],
            trace_id: buf[1],
            info: TraceInfo::new_with_raw_value(buf[2]),
            content_len: u16::from_be_bytes([buf[3], buf[4]]),
        })
    }

    /// Only layer 1 traces except the GPRS RLC/MAC header and RATSCCH traces can be expressed
    /// as GSMTAP packets.
    #[inline]
    pub const fn is_translatable(&self) -> bool {
        self.msg_type == MSG_TYPE_L1_TRACE && self.trace_id < FIRST_UNSUPPORTED_TRACE_ID
    }

    /// Total length of header and content.
    #[inline]
    pub const fn len_message(&self) -> usize {
        TRACE_HEADER_LEN + self.content_len as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_fields() {
        let info = TraceInfo::new_with_raw_value(0x07);
        assert!(info.uplink());
        assert_eq!(info.format_code().as_u8(), 3);
        assert_eq!(info.format(), Some(TraceFormat::Bcch));

        let info = TraceInfo::new_with_raw_value(0b0001_0110);
        assert!(!info.uplink());
        assert_eq!(info.format_code().as_u8(), 11);
        assert_eq!(info.format(), Some(TraceFormat::Ccch));
    }

    #[test]
    fn test_info_upper_bits_ignored() {
        let info = TraceInfo::new_with_raw_value(0b1110_0000);
        assert!(!info.uplink());
        assert_eq!(info.format_code().as_u8(), 0);
        assert_eq!(info.format(), Some(TraceFormat::NormalBurst));
    }

    #[test]
    fn test_info_builder() {
        let info = TraceInfo::builder()
            .with_format_code(u4::new(9))
            .with_uplink(true)
            .build();
        assert_eq!(info.raw_value(), 0x13);
    }

    #[test]
    fn test_unassigned_formats() {
        for code in [6, 13, 14, 15] {
            let info = TraceInfo::new_with_raw_value(code << 1);
            assert_eq!(info.format(), None);
        }
    }

    #[test]
    fn test_header_from_bytes() {
        let header = TraceHeader::from_bytes(&[0x03, 0x00, 0x07, 0x01, 0x02, 0xAA]).unwrap();
        assert_eq!(header.msg_type, MSG_TYPE_L1_TRACE);
        assert_eq!(header.trace_id, 0);
        assert!(header.info.uplink());
        assert_eq!(header.content_len, 0x0102);
        assert_eq!(header.len_message(), 5 + 0x0102);
        assert!(header.is_translatable());
    }

    #[test]
    fn test_header_too_short() {
        let error = TraceHeader::from_bytes(&[0x03, 0x00, 0x07]).unwrap_err();
        assert_eq!(
            error,
            ByteConversionError::FromSliceTooSmall {
                found: 3,
                expected: TRACE_HEADER_LEN
            }
        );
    }

    #[test]
    fn test_untranslatable_traces() {
        let header = TraceHeader::from_bytes(&[0x03, 0x04, 0x00, 0x00, 0x00]).unwrap();
        assert!(!header.is_translatable());
        let header = TraceHeader::from_bytes(&[0x01, 0x00, 0x00, 0x00, 0x00]).unwrap();
        assert!(!header.is_translatable());
    }
}
