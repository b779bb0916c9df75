//! # Frames of the serial diagnostic link
//!
//! Every frame on the serial link has the following format:
//!
//! ```text
//! | STX (0x02) | AppID | LenHi | LenLo | Payload[len] | FCS | ETX (0x03) |
//! ```
//!
//! The payload length is `((LenHi & 0x1F) << 8) | LenLo`, the upper three bits of `LenHi` are
//! reserved. The FCS is the exclusive-or of AppID, both length bytes and all payload bytes, see
//! the [crate::fcs] module.
//!
//! Even though the header allows 13 bit lengths, only payloads up to [MAX_PAYLOAD_LEN] bytes are
//! supported. Trace messages never exceed this size.
use crate::fcs::{self, FrameCheckSequence};
use crate::{ByteConversionError, ETX, STX};
use arbitrary_int::{prelude::*, u13};
use core::fmt::{Debug, Formatter};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod decoder;

/// AppID of the diagnostic trace (OTR) channel.
pub const TRACE_APP_ID: u8 = 0x00;
/// Maximum supported payload length.
pub const MAX_PAYLOAD_LEN: usize = 255;
/// Header bytes following the start marker: AppID and the two length bytes.
pub const FRAME_HEADER_LEN: usize = 3;
/// FCS and end marker.
pub const FRAME_TRAILER_LEN: usize = 2;
/// Frame overhead including the start marker.
pub const FRAME_OVERHEAD: usize = 1 + FRAME_HEADER_LEN + FRAME_TRAILER_LEN;

const LEN_HI_MASK: u8 = 0x1F;

/// Errors which invalidate a single frame. The stream itself stays usable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// The declared length exceeds [MAX_PAYLOAD_LEN]. Payload and trailer are not consumed.
    #[error("declared payload length {declared} exceeds maximum of {max}", max = MAX_PAYLOAD_LEN)]
    OversizeLength { declared: usize },
    #[error("expected ETX {etx:#04x}, found {found:#04x}", etx = ETX)]
    WrongTerminator { found: u8 },
    #[error("checksum mismatch, computed {computed:#04x}, received {received:#04x}")]
    ChecksumMismatch { computed: u8, received: u8 },
    /// Frame is valid, but does not belong to the trace channel.
    #[error("frame with AppID {0:#04x} filtered")]
    FilteredAppId(u8),
}

impl FrameError {
    /// Whether this error means the frame was corrupted or unsupported. A filtered frame is
    /// intact and therefore not an error in this sense.
    #[inline]
    pub const fn is_corrupted(&self) -> bool {
        !matches!(self, FrameError::FilteredAppId(_))
    }
}

/// The three header bytes following the start marker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    pub app_id: u8,
    pub len_hi: u8,
    pub len_lo: u8,
}

impl FrameHeader {
    /// Header for the given AppID and payload length. Bits which do not fit into the 13 bit
    /// length field are discarded.
    pub const fn new(app_id: u8, payload_len: u16) -> Self {
        Self {
            app_id,
            len_hi: (payload_len >> 8) as u8 & LEN_HI_MASK,
            len_lo: payload_len as u8,
        }
    }

    #[inline]
    pub const fn from_raw(raw: [u8; FRAME_HEADER_LEN]) -> Self {
        Self {
            app_id: raw[0],
            len_hi: raw[1],
            len_lo: raw[2],
        }
    }

    #[inline]
    pub const fn raw(&self) -> [u8; FRAME_HEADER_LEN] {
        [self.app_id, self.len_hi, self.len_lo]
    }

    /// Payload length declared by the header. The reserved upper bits of `LenHi` are ignored.
    #[inline]
    pub fn declared_len(&self) -> u13 {
        u13::new((((self.len_hi & LEN_HI_MASK) as u16) << 8) | self.len_lo as u16)
    }

    /// Initial check sequence covering the raw header bytes, including reserved bits.
    #[inline]
    pub const fn fcs_seed(&self) -> FrameCheckSequence {
        FrameCheckSequence::new_from_header(self.app_id, self.len_hi, self.len_lo)
    }
}

/// A validated frame of the serial diagnostic link.
#[derive(Clone)]
pub struct Frame {
    app_id: u8,
    payload: [u8; MAX_PAYLOAD_LEN],
    payload_len: u8,
    received_checksum: u8,
}

impl Frame {
    /// Create a frame with a correct check sequence, for example to simulate a modem.
    pub fn new(app_id: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::OversizeLength {
                declared: payload.len(),
            });
        }
        let header = FrameHeader::new(app_id, payload.len() as u16);
        let mut fcs = header.fcs_seed();
        fcs.update(payload);
        let mut buf = [0; MAX_PAYLOAD_LEN];
        buf[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            app_id,
            payload: buf,
            payload_len: payload.len() as u8,
            received_checksum: fcs.value(),
        })
    }

    /// Constructor used by the decoder after the checksum was verified.
    pub(crate) fn new_from_decoded(
        app_id: u8,
        payload: [u8; MAX_PAYLOAD_LEN],
        payload_len: u8,
        received_checksum: u8,
    ) -> Self {
        Self {
            app_id,
            payload,
            payload_len,
            received_checksum,
        }
    }

    #[inline]
    pub fn app_id(&self) -> u8 {
        self.app_id
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len as usize]
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }

    #[inline]
    pub fn received_checksum(&self) -> u8 {
        self.received_checksum
    }

    #[inline]
    pub fn is_trace(&self) -> bool {
        self.app_id == TRACE_APP_ID
    }

    #[inline]
    pub fn header(&self) -> FrameHeader {
        FrameHeader::new(self.app_id, self.payload_len as u16)
    }

    /// Length of the frame on the serial link, including markers.
    #[inline]
    pub fn len_written(&self) -> usize {
        FRAME_OVERHEAD + self.payload_len()
    }

    /// Write the serial representation of [self] to the provided byte buffer.
    pub fn write_to_bytes(&self, buf: &mut [u8]) -> Result<usize, ByteConversionError> {
        let full_len = self.len_written();
        if buf.len() < full_len {
            return Err(ByteConversionError::ToSliceTooSmall {
                found: buf.len(),
                expected: full_len,
            });
        }
        self.write_unchecked(&mut buf[..full_len]);
        Ok(full_len)
    }

    /// Write [self] to a newly allocated [alloc::vec::Vec] and return it.
    #[cfg(feature = "alloc")]
    pub fn to_vec(&self) -> alloc::vec::Vec<u8> {
        let mut vec = alloc::vec![0; self.len_written()];
        self.write_unchecked(&mut vec);
        vec
    }

    /// The buffer must have a length of exactly [Self::len_written].
    fn write_unchecked(&self, buf: &mut [u8]) {
        let (start, rest) = buf.split_at_mut(1);
        start[0] = STX;
        let (header, rest) = rest.split_at_mut(FRAME_HEADER_LEN);
        header.copy_from_slice(&self.header().raw());
        let (payload, trailer) = rest.split_at_mut(self.payload_len());
        payload.copy_from_slice(self.payload());
        trailer.copy_from_slice(&[self.received_checksum, ETX]);
    }

    /// Recalculate the check sequence from header and payload and compare it against the
    /// received one.
    pub fn checksum_valid(&self) -> bool {
        let computed = fcs::compute(&self.header().raw()) ^ fcs::compute(self.payload());
        fcs::verify(computed, self.received_checksum)
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.app_id == other.app_id
            && self.payload() == other.payload()
            && self.received_checksum == other.received_checksum
    }
}

impl Eq for Frame {}

impl Debug for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frame")
            .field("app_id", &self.app_id)
            .field("payload", &self.payload())
            .field("received_checksum", &self.received_checksum)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;
    use std::vec;

    #[test]
    fn test_declared_len() {
        let header = FrameHeader::from_raw([0x00, 0x01, 0x2C]);
        assert_eq!(header.declared_len().as_usize(), 300);
        // Reserved bits are ignored for the length but covered by the FCS.
        let header = FrameHeader::from_raw([0x00, 0xE0, 0x10]);
        assert_eq!(header.declared_len().as_usize(), 0x10);
        assert_eq!(header.fcs_seed().value(), 0xF0);
        let header = FrameHeader::from_raw([0x00, 0xFF, 0xFF]);
        assert_eq!(header.declared_len().as_usize(), 0x1FFF);
    }

    #[test]
    fn test_header_new() {
        let header = FrameHeader::new(0x05, 0x0123);
        assert_eq!(header.raw(), [0x05, 0x01, 0x23]);
        assert_eq!(header.declared_len().as_u16(), 0x0123);
    }

    #[test]
    fn test_new_frame() {
        let frame = Frame::new(TRACE_APP_ID, &[0x03, 0x00, 0x07, 0x00, 0x02, 0xAA, 0xBB]).unwrap();
        assert!(frame.is_trace());
        assert_eq!(frame.payload_len(), 7);
        assert_eq!(frame.received_checksum(), 0x10);
        assert!(frame.checksum_valid());
    }

    #[test]
    fn test_new_frame_oversize() {
        let payload = [0; MAX_PAYLOAD_LEN + 1];
        let error = Frame::new(TRACE_APP_ID, &payload).unwrap_err();
        assert_eq!(error, FrameError::OversizeLength { declared: 256 });
        assert_eq!(
            error.to_string(),
            "declared payload length 256 exceeds maximum of 255"
        );
    }

    #[test]
    fn test_max_size_frame() {
        let payload = [0x5A; MAX_PAYLOAD_LEN];
        let frame = Frame::new(TRACE_APP_ID, &payload).unwrap();
        assert_eq!(frame.payload(), &payload);
        assert_eq!(frame.header().raw(), [0x00, 0x00, 0xFF]);
        assert_eq!(frame.len_written(), MAX_PAYLOAD_LEN + FRAME_OVERHEAD);
    }

    #[test]
    fn test_write_to_bytes() {
        let frame = Frame::new(0x01, &[0x10, 0x20]).unwrap();
        let mut buf: [u8; 8] = [0; 8];
        assert_eq!(frame.write_to_bytes(&mut buf).unwrap(), 8);
        assert_eq!(buf, [0x02, 0x01, 0x00, 0x02, 0x10, 0x20, 0x33, 0x03]);
        assert_eq!(frame.to_vec(), vec![0x02, 0x01, 0x00, 0x02, 0x10, 0x20, 0x33, 0x03]);
    }

    #[test]
    fn test_write_to_larger_buf() {
        let frame = Frame::new(TRACE_APP_ID, &[0x10]).unwrap();
        let mut buf: [u8; 10] = [0xEE; 10];
        assert_eq!(frame.write_to_bytes(&mut buf).unwrap(), 7);
        assert_eq!(&buf[..7], frame.to_vec().as_slice());
        assert_eq!(&buf[..7], &[0x02, 0x00, 0x00, 0x01, 0x10, 0x11, 0x03]);
        assert_eq!(&buf[7..], &[0xEE; 3]);
    }

    #[test]
    fn test_write_to_bytes_too_small() {
        let frame = Frame::new(TRACE_APP_ID, &[]).unwrap();
        let mut buf: [u8; 5] = [0; 5];
        assert_eq!(
            frame.write_to_bytes(&mut buf).unwrap_err(),
            ByteConversionError::ToSliceTooSmall {
                found: 5,
                expected: 6
            }
        );
    }

    #[test]
    fn test_frame_eq_ignores_unused_capacity() {
        let mut raw = [0xFF; MAX_PAYLOAD_LEN];
        raw[0] = 0x01;
        let decoded = Frame::new_from_decoded(TRACE_APP_ID, raw, 1, 0x00);
        let created = Frame::new(TRACE_APP_ID, &[0x01]).unwrap();
        assert_eq!(decoded, created);
    }

    #[test]
    fn test_error_classification() {
        assert!(FrameError::WrongTerminator { found: 0 }.is_corrupted());
        assert!(FrameError::OversizeLength { declared: 300 }.is_corrupted());
        assert!(FrameError::ChecksumMismatch {
            computed: 0,
            received: 1
        }
        .is_corrupted());
        assert!(!FrameError::FilteredAppId(1).is_corrupted());
    }
}
