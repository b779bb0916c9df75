//! Control requests switching the trace output of the modem on and off.
//!
//! A control request is a regular serial frame on the trace channel with a six byte payload.
//! The last payload byte selects the trace mask, the frame check sequence follows from it.
//!
//! ```text
//! | STX | 0x00 | 0x00 | 0x06 | 0x00 | 0x1F | 0x00 | 0x00 | 0x00 | mask | FCS | ETX |
//! ```
use crate::frame::{FrameHeader, FRAME_OVERHEAD, TRACE_APP_ID};
use crate::{ETX, STX};

/// Payload length of a control request.
pub const CONTROL_PAYLOAD_LEN: usize = 6;
/// Length of a control request on the serial link.
pub const CONTROL_REQUEST_LEN: usize = CONTROL_PAYLOAD_LEN + FRAME_OVERHEAD;
/// Command byte of the trace configuration request.
pub const CMD_TRACE_CONFIG: u8 = 0x1F;
/// Trace mask enabling all layer 1 traces.
pub const TRACE_MASK_ALL: u8 = 0x3F;
pub const TRACE_MASK_NONE: u8 = 0x00;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlRequest {
    EnableTrace,
    DisableTrace,
}

impl ControlRequest {
    #[inline]
    pub const fn new(enable: bool) -> Self {
        if enable {
            ControlRequest::EnableTrace
        } else {
            ControlRequest::DisableTrace
        }
    }

    #[inline]
    pub const fn trace_mask(&self) -> u8 {
        match self {
            ControlRequest::EnableTrace => TRACE_MASK_ALL,
            ControlRequest::DisableTrace => TRACE_MASK_NONE,
        }
    }

    /// Serial representation of the request.
    pub const fn to_bytes(&self) -> [u8; CONTROL_REQUEST_LEN] {
        let header = FrameHeader::new(TRACE_APP_ID, CONTROL_PAYLOAD_LEN as u16);
        let payload = [0x00, CMD_TRACE_CONFIG, 0x00, 0x00, 0x00, self.trace_mask()];
        let mut fcs = header.fcs_seed().value();
        let mut i = 0;
        while i < CONTROL_PAYLOAD_LEN {
            fcs ^= payload[i];
            i += 1;
        }
        [
            STX,
            header.app_id,
            header.len_hi,
            header.len_lo,
            payload[0],
            payload[1],
            payload[2],
            payload[3],
            payload[4],
            payload[5],
            fcs,
            ETX,
        ]
    }
}

/// Build the control request enabling or disabling the trace output.
#[inline]
pub const fn build(enable: bool) -> [u8; CONTROL_REQUEST_LEN] {
    ControlRequest::new(enable).to_bytes()
}

#[cfg(feature = "std")]
pub mod stdmod {
    use super::ControlRequest;
    use std::io;
    use std::time::Duration;

    /// Write a control request to the serial device.
    ///
    /// Non-blocking devices may refuse the write with [io::ErrorKind::WouldBlock]. The write
    /// is then repeated after `retry_delay` until it was accepted.
    pub fn write_control_request<W: io::Write + ?Sized>(
        writer: &mut W,
        request: ControlRequest,
        retry_delay: Duration,
    ) -> io::Result<()> {
        let raw = request.to_bytes();
        let mut written = 0;
        while written < raw.len() {
            match writer.write(&raw[written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(len) => written += len,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => std::thread::sleep(retry_delay),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
                Err(e) => return Err(e),
            }
        }
        writer.flush()
    }
}

#[cfg(feature = "std")]
pub use stdmod::*;
