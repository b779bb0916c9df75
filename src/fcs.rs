//! Frame check sequence (FCS) of the serial diagnostic link.
//!
//! The FCS is a single byte which is the exclusive-or of the AppID, both raw length bytes and
//! every payload byte of a frame. Neither the start marker nor the end marker are covered.

/// Calculate the frame check sequence for the given bytes.
///
/// Returns 0 for an empty slice.
#[inline]
pub fn compute(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, byte| acc ^ byte)
}

/// Compare a calculated check sequence against the one received in a frame trailer.
#[inline]
pub const fn verify(computed: u8, received: u8) -> bool {
    computed == received
}

/// Running frame check sequence which can be fed incrementally while a frame is read.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameCheckSequence(u8);

impl FrameCheckSequence {
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Seed the check sequence with the three header bytes following the start marker.
    #[inline]
    pub const fn new_from_header(app_id: u8, len_hi: u8, len_lo: u8) -> Self {
        Self(app_id ^ len_hi ^ len_lo)
    }

    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        self.0 ^= byte;
    }

    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        self.0 ^= compute(bytes);
    }

    #[inline]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Check the running value against the FCS byte of a frame trailer.
    #[inline]
    pub const fn verify(&self, received: u8) -> bool {
        verify(self.0, received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(compute(&[]), 0);
        assert_eq!(FrameCheckSequence::new().value(), 0);
    }

    #[test]
    fn test_compute() {
        assert_eq!(compute(&[0x01, 0x02, 0x04]), 0x07);
        assert_eq!(compute(&[0xFF, 0xFF]), 0x00);
        let data = [0x00, 0x00, 0x07, 0x03, 0x00, 0x07, 0x00, 0x02, 0xAA, 0xBB];
        assert_eq!(compute(&data), 0x10);
        assert_eq!(compute(&data), compute(&data));
    }

    #[test]
    fn test_incremental_matches_compute() {
        let header = [0x00, 0x01, 0x2C];
        let payload = [0x10, 0x20, 0x30, 0x40, 0x55];
        let mut fcs = FrameCheckSequence::new_from_header(header[0], header[1], header[2]);
        fcs.update(&payload[0..2]);
        for byte in &payload[2..] {
            fcs.update_byte(*byte);
        }
        assert_eq!(fcs.value(), compute(&header) ^ compute(&payload));
        assert!(fcs.verify(fcs.value()));
        assert!(!fcs.verify(fcs.value() ^ 0x01));
    }

    #[test]
    fn test_verify() {
        assert!(verify(0x42, 0x42));
        assert!(!verify(0x42, 0x43));
    }
}
