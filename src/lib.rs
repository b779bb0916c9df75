//! # Modem diagnostic trace to GSMTAP bridge
//!
//! This crate decodes the framed diagnostic byte stream emitted by some cellular modems over
//! their serial debug port and re-encodes the layer 1 trace messages as
//! [GSMTAP](https://osmocom.org/projects/baseband/wiki/GSMTAP) packets, which can be consumed
//! by packet capture tooling like Wireshark.
//!
//! Currently, this includes the following components:
//!
//!  - The [fcs] module which contains the exclusive-or frame check sequence of the serial link.
//!  - The [frame] module which contains the serial [frame::Frame] format and the
//!    [frame::decoder::FrameDecoder] state machine assembling frames from a
//!    [frame::decoder::ByteSource].
//!  - The [trace] module which contains the header of layer 1 trace messages.
//!  - The [gsmtap] module which contains the GSMTAP header and the mapping from trace format
//!    codes to GSMTAP types and channel subtypes.
//!  - The [control] module which contains the request enabling or disabling the trace output
//!    of the modem.
//!  - The [bridge] module which contains a sequential run loop connecting a byte source with a
//!    packet sink. Requires the `std` feature.
//!
//! ## Features
//!
//! `otr-gsmtap` is also suitable for `no_std` environments.
//!
//! It also offers optional support for [`serde`](https://serde.rs/) and
//! [`defmt`](https://defmt.ferrous-systems.com/) for its plain data types.
//!
//! Default features:
//!
//!  - [`std`](https://doc.rust-lang.org/std/): Enables functionality relying on the standard
//!    library, most notably the [bridge] module and its [tracing] based logging.
//!  - [`alloc`](https://doc.rust-lang.org/alloc/): Enables features which operate on containers
//!    like [`alloc::vec::Vec`](https://doc.rust-lang.org/beta/alloc/vec/struct.Vec.html).
//!    Enabled by the `std` feature.
//!
//! ## Example
//!
//! ```rust
//! use otr_gsmtap::frame::decoder::{FrameDecoder, SliceSource};
//! use otr_gsmtap::gsmtap::{GsmtapPacketCreator, GsmtapSubtype, GsmtapType};
//! use core::sync::atomic::AtomicBool;
//!
//! // STX, AppID, length, BCCH trace message, FCS, ETX
//! let raw = [
//!     0x02, 0x00, 0x00, 0x07, 0x03, 0x00, 0x07, 0x00, 0x02, 0xAA, 0xBB, 0x10, 0x03,
//! ];
//! let stop = AtomicBool::new(false);
//! let mut decoder = FrameDecoder::new(SliceSource::new(&raw));
//! let frame = decoder.next_frame(&stop).expect("decoding frame failed");
//!
//! let packet = GsmtapPacketCreator::new(&frame).expect("frame is not a valid trace message");
//! assert_eq!(packet.header().gsmtap_type(), GsmtapType::Um);
//! assert_eq!(packet.header().subtype, GsmtapSubtype::Bcch);
//! assert_eq!(packet.content(), &[0xAA, 0xBB]);
//! ```
#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(any(feature = "std", test))]
extern crate std;

#[cfg(feature = "std")]
pub mod bridge;
pub mod control;
pub mod fcs;
pub mod frame;
pub mod gsmtap;
pub mod trace;

/// Start of text marker preceding every serial frame.
pub const STX: u8 = 0x02;
/// End of text marker terminating every serial frame.
pub const ETX: u8 = 0x03;

/// Generic error type when converting to and from raw byte slices.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteConversionError {
    /// The passed slice is too small. Returns the passed slice length and expected minimum size
    #[error("target slice with size {found} is too small, expected size of at least {expected}")]
    ToSliceTooSmall { found: usize, expected: usize },
    /// The provider buffer is too small. Returns the passed slice length and expected minimum size
    #[error("source slice with size {found} too small, expected at least {expected} bytes")]
    FromSliceTooSmall { found: usize, expected: usize },
}
