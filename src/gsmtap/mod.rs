//! # GSMTAP packet support
//!
//! This module contains the version 2 GSMTAP header as specified by the Osmocom
//! [gsmtap.h](https://gitea.osmocom.org/osmocom/libosmocore/src/branch/master/include/osmocom/core/gsmtap.h)
//! and the [GsmtapPacketCreator] which converts a decoded trace [Frame] into a GSMTAP packet.
//!
//! # Examples
//!
//! ```rust
//! use otr_gsmtap::frame::Frame;
//! use otr_gsmtap::gsmtap::{GsmtapHeader, GsmtapPacketCreator, GsmtapSubtype, GSMTAP_HDR_LEN};
//!
//! let frame = Frame::new(0x00, &[0x03, 0x00, 0x07, 0x00, 0x02, 0xAA, 0xBB]).unwrap();
//! let creator = GsmtapPacketCreator::new(&frame).unwrap();
//! let mut buf: [u8; 32] = [0; 32];
//! let written = creator.write_to_bytes(&mut buf).unwrap();
//! assert_eq!(written, GSMTAP_HDR_LEN + 2);
//! assert_eq!(&buf[GSMTAP_HDR_LEN..written], &[0xAA, 0xBB]);
//!
//! let header = GsmtapHeader::from_bytes(&buf).unwrap();
//! assert_eq!(header.subtype, GsmtapSubtype::Bcch);
//! assert!(header.uplink);
//! ```
use crate::frame::{Frame, TRACE_APP_ID};
use crate::trace::{TraceHeader, TRACE_HEADER_LEN};
use crate::ByteConversionError;
use core::mem::size_of;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod mapping;

pub use mapping::ChannelMapping;

/// Only this header version is generated and parsed by the library.
pub const GSMTAP_VERSION: u8 = 0x02;
/// Well-known UDP port GSMTAP receivers listen on.
pub const GSMTAP_UDP_PORT: u16 = 4729;
pub const GSMTAP_HDR_LEN: usize = size_of::<zc::GsmtapHeader>();
/// Header length in units of 32-bit words as written into the header.
pub const GSMTAP_HDR_LEN_WORDS: u8 = (GSMTAP_HDR_LEN / 4) as u8;

pub const ARFCN_FLAG_PCS: u16 = 0x8000;
pub const ARFCN_FLAG_UPLINK: u16 = 0x4000;
pub const ARFCN_MASK: u16 = 0x3FFF;
/// Flag which can be combined with a [ChannelType] for the associated control channel.
pub const CHANNEL_FLAG_ACCH: u8 = 0x80;

/// Payload type of a GSMTAP packet.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[non_exhaustive]
pub enum GsmtapType {
    /// Layer 2 message on the Um air interface.
    Um = 0x01,
    Abis = 0x02,
    /// Raw physical layer burst on the Um air interface.
    UmBurst = 0x03,
}

/// Subtypes of [GsmtapType::UmBurst] packets.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BurstType {
    Unknown = 0x00,
    Fcch = 0x01,
    PartialSch = 0x02,
    Sch = 0x03,
    CtsSch = 0x04,
    CompactSch = 0x05,
    Normal = 0x06,
    Dummy = 0x07,
    Access = 0x08,
    None = 0x09,
}

/// Subtypes of [GsmtapType::Um] packets. May be combined with [CHANNEL_FLAG_ACCH].
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ChannelType {
    Unknown = 0x00,
    Bcch = 0x01,
    Ccch = 0x02,
    Rach = 0x03,
    Agch = 0x04,
    Pch = 0x05,
    Sdcch = 0x06,
    Sdcch4 = 0x07,
    Sdcch8 = 0x08,
    TchF = 0x09,
    TchH = 0x0a,
}

/// Subtypes which can be generated from trace messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GsmtapSubtype {
    NormalBurst,
    AccessBurst,
    Rach,
    Bcch,
    Pch,
    Sdcch,
    /// Associated control channel of an SDCCH.
    AcchSdcch,
    TchF,
    TchH,
    Ccch,
    Agch,
    Unknown,
}

impl GsmtapSubtype {
    #[inline]
    pub const fn is_burst(&self) -> bool {
        matches!(self, Self::NormalBurst | Self::AccessBurst)
    }

    /// Payload type which carries this subtype.
    #[inline]
    pub const fn gsmtap_type(&self) -> GsmtapType {
        if self.is_burst() {
            GsmtapType::UmBurst
        } else {
            GsmtapType::Um
        }
    }

    /// Raw value of the `sub_type` header field.
    pub const fn raw(&self) -> u8 {
        match self {
            Self::NormalBurst => BurstType::Normal as u8,
            Self::AccessBurst => BurstType::Access as u8,
            Self::Rach => ChannelType::Rach as u8,
            Self::Bcch => ChannelType::Bcch as u8,
            Self::Pch => ChannelType::Pch as u8,
            Self::Sdcch => ChannelType::Sdcch as u8,
            Self::AcchSdcch => CHANNEL_FLAG_ACCH | ChannelType::Sdcch as u8,
            Self::TchF => ChannelType::TchF as u8,
            Self::TchH => ChannelType::TchH as u8,
            Self::Ccch => ChannelType::Ccch as u8,
            Self::Agch => ChannelType::Agch as u8,
            Self::Unknown => ChannelType::Unknown as u8,
        }
    }

    /// Inverse of [Self::raw]. Returns [None] for values which can not be generated from a
    /// trace message.
    pub fn from_raw(gsmtap_type: GsmtapType, raw: u8) -> Option<Self> {
        match gsmtap_type {
            GsmtapType::UmBurst => match BurstType::try_from(raw).ok()? {
                BurstType::Normal => Some(Self::NormalBurst),
                BurstType::Access => Some(Self::AccessBurst),
                _ => None,
            },
            GsmtapType::Um => {
                if raw == CHANNEL_FLAG_ACCH | ChannelType::Sdcch as u8 {
                    return Some(Self::AcchSdcch);
                }
                match ChannelType::try_from(raw).ok()? {
                    ChannelType::Unknown => Some(Self::Unknown),
                    ChannelType::Bcch => Some(Self::Bcch),
                    ChannelType::Ccch => Some(Self::Ccch),
                    ChannelType::Rach => Some(Self::Rach),
                    ChannelType::Agch => Some(Self::Agch),
                    ChannelType::Pch => Some(Self::Pch),
                    ChannelType::Sdcch => Some(Self::Sdcch),
                    ChannelType::TchF => Some(Self::TchF),
                    ChannelType::TchH => Some(Self::TchH),
                    ChannelType::Sdcch4 | ChannelType::Sdcch8 => None,
                }
            }
            _ => None,
        }
    }
}

/// Errors when creating a GSMTAP packet from a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Only frames of the trace channel carry trace messages.
    #[error("frame with AppID {0:#04x} is not a trace message")]
    WrongAppId(u8),
    /// Payload is shorter than the trace header.
    #[error("payload with {found} bytes is too short for a trace header")]
    TooShort { found: usize },
    /// The trace message is valid, but not a layer 1 trace GSMTAP can express.
    #[error("trace with message type {msg_type:#04x} and trace ID {trace_id:#04x} is not supported")]
    NotLayer1Trace { msg_type: u8, trace_id: u8 },
    /// Trace content length exceeds the available payload.
    #[error("trace content truncated, expected {expected} payload bytes, found {found}")]
    Truncated { expected: usize, found: usize },
}

/// Errors when parsing a GSMTAP header.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GsmtapError {
    #[error("byte conversion error: {0}")]
    ByteConversion(#[from] ByteConversionError),
    #[error("invalid version number: {0}")]
    InvalidVersionNumber(u8),
    #[error("invalid header length {0} in 32-bit words")]
    InvalidHeaderLength(u8),
    #[error("invalid GSMTAP type: {0}")]
    InvalidType(u8),
    #[error("unsupported subtype {sub_type:#04x} for type {gsmtap_type:?}")]
    UnsupportedSubtype {
        gsmtap_type: GsmtapType,
        sub_type: u8,
    },
}

/// GSMTAP version 2 header.
///
/// All fields not covered by trace messages are zero when created with [GsmtapHeader::new].
/// The GSMTAP type is not stored separately, it always follows from the [GsmtapSubtype].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GsmtapHeader {
    pub timeslot: u8,
    /// ARFCN without the flag bits.
    pub arfcn: u16,
    pub pcs_band: bool,
    pub uplink: bool,
    pub signal_dbm: i8,
    pub snr_db: i8,
    pub frame_number: u32,
    pub subtype: GsmtapSubtype,
    pub antenna_nr: u8,
    pub sub_slot: u8,
}

impl GsmtapHeader {
    /// Create a header for the given mapping.
    pub const fn new(mapping: ChannelMapping, uplink: bool) -> Self {
        Self {
            timeslot: 0,
            arfcn: 0,
            pcs_band: false,
            uplink,
            signal_dbm: 0,
            snr_db: 0,
            frame_number: 0,
            subtype: mapping.subtype,
            antenna_nr: 0,
            sub_slot: 0,
        }
    }

    #[inline]
    pub const fn gsmtap_type(&self) -> GsmtapType {
        self.subtype.gsmtap_type()
    }

    /// Raw ARFCN field including the band and direction flags.
    #[inline]
    pub const fn arfcn_raw(&self) -> u16 {
        let mut raw = self.arfcn & ARFCN_MASK;
        if self.pcs_band {
            raw |= ARFCN_FLAG_PCS;
        }
        if self.uplink {
            raw |= ARFCN_FLAG_UPLINK;
        }
        raw
    }

    /// Write [self] to the provided byte buffer.
    pub fn write_to_bytes(&self, buf: &mut [u8]) -> Result<usize, ByteConversionError> {
        if buf.len() < GSMTAP_HDR_LEN {
            return Err(ByteConversionError::ToSliceTooSmall {
                found: buf.len(),
                expected: GSMTAP_HDR_LEN,
            });
        }
        let zc_header = zc::GsmtapHeader::from(*self);
        buf[0..GSMTAP_HDR_LEN].copy_from_slice(zerocopy::IntoBytes::as_bytes(&zc_header));
        Ok(GSMTAP_HDR_LEN)
    }

    /// Parse [Self] from raw bytes.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, GsmtapError> {
        if buf.len() < GSMTAP_HDR_LEN {
            return Err(ByteConversionError::FromSliceTooSmall {
                found: buf.len(),
                expected: GSMTAP_HDR_LEN,
            }
            .into());
        }
        let zc_header = zc::GsmtapHeader::from_bytes(&buf[0..GSMTAP_HDR_LEN]).ok_or(
            ByteConversionError::FromSliceTooSmall {
                found: buf.len(),
                expected: GSMTAP_HDR_LEN,
            },
        )?;
        Self::try_from(zc_header)
    }
}

impl TryFrom<zc::GsmtapHeader> for GsmtapHeader {
    type Error = GsmtapError;

    fn try_from(value: zc::GsmtapHeader) -> Result<Self, Self::Error> {
        if value.version() != GSMTAP_VERSION {
            return Err(GsmtapError::InvalidVersionNumber(value.version()));
        }
        if value.hdr_len() != GSMTAP_HDR_LEN_WORDS {
            return Err(GsmtapError::InvalidHeaderLength(value.hdr_len()));
        }
        let gsmtap_type = GsmtapType::try_from(value.gsmtap_type())
            .map_err(|e| GsmtapError::InvalidType(e.number))?;
        let subtype = GsmtapSubtype::from_raw(gsmtap_type, value.sub_type()).ok_or(
            GsmtapError::UnsupportedSubtype {
                gsmtap_type,
                sub_type: value.sub_type(),
            },
        )?;
        let arfcn_raw = value.arfcn_raw();
        Ok(Self {
            timeslot: value.timeslot(),
            arfcn: arfcn_raw & ARFCN_MASK,
            pcs_band: (arfcn_raw & ARFCN_FLAG_PCS) != 0,
            uplink: (arfcn_raw & ARFCN_FLAG_UPLINK) != 0,
            signal_dbm: value.signal_dbm(),
            snr_db: value.snr_db(),
            frame_number: value.frame_number(),
            subtype,
            antenna_nr: value.antenna_nr(),
            sub_slot: value.sub_slot(),
        })
    }
}

pub mod zc {
    use zerocopy::{
        FromBytes, Immutable, IntoBytes, KnownLayout, NetworkEndian, Unaligned, U16, U32,
    };

    /// Bit-exact wire layout of the GSMTAP version 2 header.
    #[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug)]
    #[repr(C)]
    pub struct GsmtapHeader {
        version: u8,
        hdr_len: u8,
        gsmtap_type: u8,
        timeslot: u8,
        arfcn: U16<NetworkEndian>,
        signal_dbm: i8,
        snr_db: i8,
        frame_number: U32<NetworkEndian>,
        sub_type: u8,
        antenna_nr: u8,
        sub_slot: u8,
        res: u8,
    }

    impl GsmtapHeader {
        pub fn from_bytes(slice: &[u8]) -> Option<Self> {
            Self::read_from_bytes(slice).ok()
        }

        #[inline]
        pub fn version(&self) -> u8 {
            self.version
        }

        #[inline]
        pub fn hdr_len(&self) -> u8 {
            self.hdr_len
        }

        #[inline]
        pub fn gsmtap_type(&self) -> u8 {
            self.gsmtap_type
        }

        #[inline]
        pub fn timeslot(&self) -> u8 {
            self.timeslot
        }

        #[inline]
        pub fn arfcn_raw(&self) -> u16 {
            self.arfcn.get()
        }

        #[inline]
        pub fn signal_dbm(&self) -> i8 {
            self.signal_dbm
        }

        #[inline]
        pub fn snr_db(&self) -> i8 {
            self.snr_db
        }

        #[inline]
        pub fn frame_number(&self) -> u32 {
            self.frame_number.get()
        }

        #[inline]
        pub fn sub_type(&self) -> u8 {
            self.sub_type
        }

        #[inline]
        pub fn antenna_nr(&self) -> u8 {
            self.antenna_nr
        }

        #[inline]
        pub fn sub_slot(&self) -> u8 {
            self.sub_slot
        }
    }

    impl From<super::GsmtapHeader> for GsmtapHeader {
        fn from(value: super::GsmtapHeader) -> Self {
            GsmtapHeader {
                version: super::GSMTAP_VERSION,
                hdr_len: super::GSMTAP_HDR_LEN_WORDS,
                gsmtap_type: value.gsmtap_type().into(),
                timeslot: value.timeslot,
                arfcn: U16::new(value.arfcn_raw()),
                signal_dbm: value.signal_dbm,
                snr_db: value.snr_db,
                frame_number: U32::new(value.frame_number),
                sub_type: value.subtype.raw(),
                antenna_nr: value.antenna_nr,
                sub_slot: value.sub_slot,
                res: 0,
            }
        }
    }
}

/// Creates a GSMTAP packet from a decoded trace [Frame].
///
/// The content is borrowed from the frame, so no data is copied until the packet is written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GsmtapPacketCreator<'frame> {
    header: GsmtapHeader,
    content: &'frame [u8],
}

impl<'frame> GsmtapPacketCreator<'frame> {
    /// Validate the trace message inside the frame and prepare the GSMTAP header.
    pub fn new(frame: &'frame Frame) -> Result<Self, EncodeError> {
        if frame.app_id() != TRACE_APP_ID {
            return Err(EncodeError::WrongAppId(frame.app_id()));
        }
        Self::new_from_trace(frame.payload())
    }

    /// Same as [Self::new], but operates directly on the payload of a trace channel frame.
    pub fn new_from_trace(payload: &'frame [u8]) -> Result<Self, EncodeError> {
        let trace_header = TraceHeader::from_bytes(payload).map_err(|_| EncodeError::TooShort {
            found: payload.len(),
        })?;
        if !trace_header.is_translatable() {
            return Err(EncodeError::NotLayer1Trace {
                msg_type: trace_header.msg_type,
                trace_id: trace_header.trace_id,
            });
        }
        if payload.len() < trace_header.len_message() {
            return Err(EncodeError::Truncated {
                expected: trace_header.len_message(),
                found: payload.len(),
            });
        }
        Ok(Self {
            header: GsmtapHeader::new(
                mapping::map_info(trace_header.info),
                trace_header.info.uplink(),
            ),
            content: &payload[TRACE_HEADER_LEN..trace_header.len_message()],
        })
    }

    #[inline]
    pub fn header(&self) -> &GsmtapHeader {
        &self.header
    }

    #[inline]
    pub fn content(&self) -> &'frame [u8] {
        self.content
    }

    /// Length of the packet when written to bytes.
    #[inline]
    pub fn len_written(&self) -> usize {
        GSMTAP_HDR_LEN + self.content.len()
    }

    /// Write [self] to the provided byte buffer.
    pub fn write_to_bytes(&self, buf: &mut [u8]) -> Result<usize, ByteConversionError> {
        let full_len = self.len_written();
        if buf.len() < full_len {
            return Err(ByteConversionError::ToSliceTooSmall {
                found: buf.len(),
                expected: full_len,
            });
        }
        let mut current_idx = self.header.write_to_bytes(buf)?;
        buf[current_idx..current_idx + self.content.len()].copy_from_slice(self.content);
        current_idx += self.content.len();
        Ok(current_idx)
    }

    /// Write [self] to a newly allocated [alloc::vec::Vec] and return it.
    #[cfg(feature = "alloc")]
    pub fn to_vec(&self) -> alloc::vec::Vec<u8> {
        let mut vec = alloc::vec::Vec::with_capacity(self.len_written());
        vec.extend_from_slice(zerocopy::IntoBytes::as_bytes(&zc::GsmtapHeader::from(
            self.header,
        )));
        vec.extend_from_slice(self.content);
        vec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MAX_PAYLOAD_LEN;
    use std::string::ToString;
    use std::vec;

    const BCCH_TRACE: [u8; 7] = [0x03, 0x00, 0x07, 0x00, 0x02, 0xAA, 0xBB];

    #[test]
    fn test_header_len() {
        assert_eq!(GSMTAP_HDR_LEN, 16);
        assert_eq!(GSMTAP_HDR_LEN_WORDS, 4);
    }

    #[test]
    fn test_bcch_scenario() {
        let frame = Frame::new(TRACE_APP_ID, &BCCH_TRACE).unwrap();
        let creator = GsmtapPacketCreator::new(&frame).unwrap();
        assert_eq!(creator.header().gsmtap_type(), GsmtapType::Um);
        assert_eq!(creator.header().subtype, GsmtapSubtype::Bcch);
        assert!(creator.header().uplink);
        assert_eq!(creator.content(), &[0xAA, 0xBB]);
        assert_eq!(creator.len_written(), 18);

        let mut buf: [u8; 18] = [0; 18];
        assert_eq!(creator.write_to_bytes(&mut buf).unwrap(), 18);
        assert_eq!(
            buf,
            [
                0x02, 0x04, 0x01, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
                0x00, 0x00, 0x00, 0xAA, 0xBB
            ]
        );
    }

    #[test]
    fn test_downlink_burst() {
        // Format code 0, downlink, one content byte.
        let frame = Frame::new(TRACE_APP_ID, &[0x03, 0x01, 0x00, 0x00, 0x01, 0x5A]).unwrap();
        let buf = GsmtapPacketCreator::new(&frame).unwrap().to_vec();
        assert_eq!(buf.len(), GSMTAP_HDR_LEN + 1);
        assert_eq!(buf[2], GsmtapType::UmBurst as u8);
        assert_eq!(&buf[4..6], &[0x00, 0x00]);
        assert_eq!(buf[12], BurstType::Normal as u8);
        assert_eq!(buf[16], 0x5A);
    }

    #[test]
    fn test_content_shorter_than_payload() {
        // Content length 1, trailing payload byte is not part of the packet.
        let frame = Frame::new(TRACE_APP_ID, &[0x03, 0x00, 0x08, 0x00, 0x01, 0x11, 0x22]).unwrap();
        let creator = GsmtapPacketCreator::new(&frame).unwrap();
        assert_eq!(creator.content(), &[0x11]);
        assert_eq!(creator.header().subtype, GsmtapSubtype::Pch);
    }

    #[test]
    fn test_empty_content() {
        let frame = Frame::new(TRACE_APP_ID, &[0x03, 0x00, 0x16, 0x00, 0x00]).unwrap();
        let creator = GsmtapPacketCreator::new(&frame).unwrap();
        assert!(creator.content().is_empty());
        assert_eq!(creator.len_written(), GSMTAP_HDR_LEN);
    }

    #[test]
    fn test_truncated() {
        let frame = Frame::new(TRACE_APP_ID, &[0x03, 0x00, 0x07, 0x00, 0x03, 0xAA, 0xBB]).unwrap();
        let error = GsmtapPacketCreator::new(&frame).unwrap_err();
        assert_eq!(
            error,
            EncodeError::Truncated {
                expected: 8,
                found: 7
            }
        );
        assert_eq!(
            error.to_string(),
            "trace content truncated, expected 8 payload bytes, found 7"
        );
    }

    #[test]
    fn test_content_length_beyond_frame_capacity() {
        let mut payload = vec![0; MAX_PAYLOAD_LEN];
        payload[0] = 0x03;
        payload[3] = 0xFF;
        payload[4] = 0xFF;
        let frame = Frame::new(TRACE_APP_ID, &payload).unwrap();
        assert!(matches!(
            GsmtapPacketCreator::new(&frame),
            Err(EncodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_too_short() {
        let frame = Frame::new(TRACE_APP_ID, &[0x03, 0x00, 0x07, 0x00]).unwrap();
        assert_eq!(
            GsmtapPacketCreator::new(&frame).unwrap_err(),
            EncodeError::TooShort { found: 4 }
        );
    }

    #[test]
    fn test_wrong_app_id() {
        let frame = Frame::new(0x01, &BCCH_TRACE).unwrap();
        assert_eq!(
            GsmtapPacketCreator::new(&frame).unwrap_err(),
            EncodeError::WrongAppId(0x01)
        );
    }

    #[test]
    fn test_not_layer1_trace() {
        let frame = Frame::new(TRACE_APP_ID, &[0x03, 0x04, 0x07, 0x00, 0x00]).unwrap();
        assert_eq!(
            GsmtapPacketCreator::new(&frame).unwrap_err(),
            EncodeError::NotLayer1Trace {
                msg_type: 0x03,
                trace_id: 0x04
            }
        );
        let frame = Frame::new(TRACE_APP_ID, &[0x02, 0x00, 0x07, 0x00, 0x00]).unwrap();
        assert!(matches!(
            GsmtapPacketCreator::new(&frame),
            Err(EncodeError::NotLayer1Trace { msg_type: 0x02, .. })
        ));
    }

    #[test]
    fn test_write_buf_too_small() {
        let frame = Frame::new(TRACE_APP_ID, &BCCH_TRACE).unwrap();
        let creator = GsmtapPacketCreator::new(&frame).unwrap();
        let mut buf: [u8; 17] = [0; 17];
        assert_eq!(
            creator.write_to_bytes(&mut buf).unwrap_err(),
            ByteConversionError::ToSliceTooSmall {
                found: 17,
                expected: 18
            }
        );
    }

    #[test]
    fn test_header_parse_back() {
        let frame = Frame::new(TRACE_APP_ID, &[0x03, 0x02, 0x11, 0x00, 0x00]).unwrap();
        let buf = GsmtapPacketCreator::new(&frame).unwrap().to_vec();
        let header = GsmtapHeader::from_bytes(&buf).unwrap();
        assert_eq!(header.gsmtap_type(), GsmtapType::Um);
        assert_eq!(header.subtype, GsmtapSubtype::AcchSdcch);
        assert!(header.uplink);
        assert!(!header.pcs_band);
        assert_eq!(header.arfcn, 0);
        assert_eq!(header.frame_number, 0);
    }

    #[test]
    fn test_header_with_all_fields() {
        let mut header = GsmtapHeader::new(
            ChannelMapping {
                is_burst_type: false,
                subtype: GsmtapSubtype::TchH,
            },
            false,
        );
        header.arfcn = 0x3FF;
        header.pcs_band = true;
        header.timeslot = 3;
        header.signal_dbm = -70;
        header.snr_db = 12;
        header.frame_number = 0x0102_0304;
        header.sub_slot = 1;
        let mut buf: [u8; GSMTAP_HDR_LEN] = [0; GSMTAP_HDR_LEN];
        header.write_to_bytes(&mut buf).unwrap();
        assert_eq!(&buf[4..6], &[0x83, 0xFF]);
        assert_eq!(buf[6] as i8, -70);
        assert_eq!(&buf[8..12], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(GsmtapHeader::from_bytes(&buf).unwrap(), header);
    }

    #[test]
    fn test_type_follows_subtype() {
        let frame = Frame::new(TRACE_APP_ID, &BCCH_TRACE).unwrap();
        let mut header = *GsmtapPacketCreator::new(&frame).unwrap().header();
        assert_eq!(header.gsmtap_type(), GsmtapType::Um);
        header.subtype = GsmtapSubtype::NormalBurst;
        assert_eq!(header.gsmtap_type(), GsmtapType::UmBurst);

        let mut buf: [u8; GSMTAP_HDR_LEN] = [0; GSMTAP_HDR_LEN];
        header.write_to_bytes(&mut buf).unwrap();
        assert_eq!(buf[2], GsmtapType::UmBurst as u8);
        assert_eq!(buf[12], BurstType::Normal as u8);
        let parsed = GsmtapHeader::from_bytes(&buf).unwrap();
        assert_eq!(parsed.subtype, GsmtapSubtype::NormalBurst);
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_header_parse_errors() {
        let frame = Frame::new(TRACE_APP_ID, &BCCH_TRACE).unwrap();
        let buf = GsmtapPacketCreator::new(&frame).unwrap().to_vec();

        let mut invalid = buf.clone();
        invalid[0] = 0x01;
        assert_eq!(
            GsmtapHeader::from_bytes(&invalid).unwrap_err(),
            GsmtapError::InvalidVersionNumber(0x01)
        );
        let mut invalid = buf.clone();
        invalid[1] = 0x05;
        assert_eq!(
            GsmtapHeader::from_bytes(&invalid).unwrap_err(),
            GsmtapError::InvalidHeaderLength(0x05)
        );
        let mut invalid = buf.clone();
        invalid[2] = 0x7F;
        assert_eq!(
            GsmtapHeader::from_bytes(&invalid).unwrap_err(),
            GsmtapError::InvalidType(0x7F)
        );
        let mut invalid = buf.clone();
        invalid[12] = ChannelType::Sdcch4 as u8;
        assert!(matches!(
            GsmtapHeader::from_bytes(&invalid).unwrap_err(),
            GsmtapError::UnsupportedSubtype { .. }
        ));
        assert_eq!(
            GsmtapHeader::from_bytes(&buf[0..10]).unwrap_err(),
            GsmtapError::ByteConversion(ByteConversionError::FromSliceTooSmall {
                found: 10,
                expected: GSMTAP_HDR_LEN
            })
        );
    }

    #[test]
    fn test_subtype_raw_inverse() {
        let subtypes = [
            GsmtapSubtype::NormalBurst,
            GsmtapSubtype::AccessBurst,
            GsmtapSubtype::Rach,
            GsmtapSubtype::Bcch,
            GsmtapSubtype::Pch,
            GsmtapSubtype::Sdcch,
            GsmtapSubtype::AcchSdcch,
            GsmtapSubtype::TchF,
            GsmtapSubtype::TchH,
            GsmtapSubtype::Ccch,
            GsmtapSubtype::Agch,
            GsmtapSubtype::Unknown,
        ];
        for subtype in subtypes {
            assert_eq!(
                GsmtapSubtype::from_raw(subtype.gsmtap_type(), subtype.raw()),
                Some(subtype)
            );
        }
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_serde_header() {
        use postcard::{from_bytes, to_allocvec};
        let frame = Frame::new(TRACE_APP_ID, &BCCH_TRACE).unwrap();
        let header = *GsmtapPacketCreator::new(&frame).unwrap().header();
        let output = to_allocvec(&header).unwrap();
        let header_deser: GsmtapHeader = from_bytes(&output).unwrap();
        assert_eq!(header_deser, header);
    }
}
