//! Sequential bridge from the serial trace stream to a GSMTAP packet sink.
//!
//! The [Bridge] pulls frames from a [FrameDecoder], converts every layer 1 trace into a GSMTAP
//! packet and hands it to a [PacketSink]. Corrupted frames and traces which can not be
//! expressed as GSMTAP packets are logged, counted in the [RunSummary] and skipped.
//!
//! The loop ends when the byte source reaches its end, fails or when a stop was requested
//! through the [StopHandle].
use crate::control::{self, ControlRequest};
use crate::frame::decoder::{ByteSource, DecodeError, DecodeStats, FrameDecoder};
use crate::frame::{FrameError, MAX_PAYLOAD_LEN};
use crate::gsmtap::{EncodeError, GsmtapPacketCreator, GSMTAP_HDR_LEN};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub mod adapters;

pub use adapters::ReadSource;

/// Delay between attempts to write a control request to a busy device.
pub const DEFAULT_CONTROL_RETRY_DELAY: Duration = Duration::from_millis(1);
/// Largest GSMTAP packet which can result from a single frame.
pub const MAX_PACKET_LEN: usize = GSMTAP_HDR_LEN + MAX_PAYLOAD_LEN;

/// Configuration of the [Bridge].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Enable the trace output before the loop starts and disable it afterwards. Only used by
    /// [Bridge::run_with_control].
    pub send_control_requests: bool,
    /// Delay between write attempts of a control request.
    pub control_retry_delay: Duration,
    /// Abort the loop on the first failed send instead of counting and dropping the packet.
    pub stop_on_send_error: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            send_control_requests: true,
            control_retry_delay: DEFAULT_CONTROL_RETRY_DELAY,
            stop_on_send_error: false,
        }
    }
}

/// Cloneable handle to request the termination of a running [Bridge], for example from a
/// signal handler or another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear a previous stop request so the bridge can be run again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn flag(&self) -> &AtomicBool {
        &self.0
    }
}

/// Destination for encoded GSMTAP packets.
pub trait PacketSink {
    type Error;

    /// Send a single, complete packet.
    fn send(&mut self, packet: &[u8]) -> Result<(), Self::Error>;
}

impl<T: PacketSink + ?Sized> PacketSink for &mut T {
    type Error = T::Error;

    #[inline]
    fn send(&mut self, packet: &[u8]) -> Result<(), Self::Error> {
        (**self).send(packet)
    }
}

/// Reason the bridge loop ended without an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Termination {
    EndOfStream,
    Cancelled,
}

/// Counters of a single bridge run.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    pub decode: DecodeStats,
    /// Packets handed to the sink successfully.
    pub forwarded: u64,
    /// Trace messages without GSMTAP representation, for example GPRS RLC/MAC headers.
    pub skipped: u64,
    pub encode_errors: u64,
    pub send_errors: u64,
}

impl RunSummary {
    delegate::delegate! {
        to self.decode {
            /// Frames which were dropped because they were corrupted.
            #[call(total_errors)]
            pub fn frame_errors(&self) -> u64;
        }
    }

    /// All frames or packets which were dropped because of an error.
    #[inline]
    pub fn total_errors(&self) -> u64 {
        self.frame_errors() + self.encode_errors + self.send_errors
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError<SourceError, SinkError> {
    #[error("byte source error: {0}")]
    Source(SourceError),
    #[error("packet sink error: {0}")]
    Sink(SinkError),
    #[error("writing control request failed: {0}")]
    Control(io::Error),
}

/// The sequential decode, encode and send loop.
#[derive(Debug, Default)]
pub struct Bridge {
    config: BridgeConfig,
    summary: RunSummary,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            summary: RunSummary::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Counters of the last run. Also valid after a run failed.
    #[inline]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Run the loop until the source ends, fails or a stop is requested.
    ///
    /// Returns how the loop ended. The counters are available through [Self::summary].
    pub fn run<S: ByteSource, K: PacketSink>(
        &mut self,
        source: S,
        sink: &mut K,
        stop: &StopHandle,
    ) -> Result<Termination, BridgeError<S::Error, K::Error>>
    where
        K::Error: core::fmt::Display,
    {
        self.summary = RunSummary::default();
        info!("starting trace to GSMTAP bridge");
        let mut decoder = FrameDecoder::new(source);
        let result = self.run_loop(&mut decoder, sink, stop);
        self.summary.decode = *decoder.stats();
        info!(
            forwarded = self.summary.forwarded,
            frame_errors = self.summary.frame_errors(),
            checksum_errors = self.summary.decode.checksum_errors,
            skipped = self.summary.skipped,
            "bridge stopped"
        );
        result
    }

    /// Same as [Self::run], but operates on a serial device which is also used to enable the
    /// trace output before and to disable it after the loop, if configured.
    ///
    /// The disable request is also sent when the loop failed. In that case the error of the
    /// loop is returned and a failed disable request is only logged.
    pub fn run_with_control<D: io::Read + io::Write, K: PacketSink>(
        &mut self,
        device: &mut D,
        sink: &mut K,
        stop: &StopHandle,
    ) -> Result<Termination, BridgeError<io::Error, K::Error>>
    where
        K::Error: core::fmt::Display,
    {
        if self.config.send_control_requests {
            self.send_control_request(device, ControlRequest::EnableTrace)
                .map_err(BridgeError::Control)?;
        }
        let result = self.run(ReadSource::new(&mut *device), sink, stop);
        if self.config.send_control_requests {
            if let Err(e) = self.send_control_request(device, ControlRequest::DisableTrace) {
                if result.is_ok() {
                    return Err(BridgeError::Control(e));
                }
                warn!("disabling trace output failed: {e}");
            }
        }
        result
    }

    fn send_control_request<W: io::Write>(
        &self,
        device: &mut W,
        request: ControlRequest,
    ) -> io::Result<()> {
        debug!(?request, "sending control request");
        control::write_control_request(device, request, self.config.control_retry_delay)
    }

    fn run_loop<S: ByteSource, K: PacketSink>(
        &mut self,
        decoder: &mut FrameDecoder<S>,
        sink: &mut K,
        stop: &StopHandle,
    ) -> Result<Termination, BridgeError<S::Error, K::Error>>
    where
        K::Error: core::fmt::Display,
    {
        let mut packet_buf = [0; MAX_PACKET_LEN];
        loop {
            let frame = match decoder.next_frame(stop.flag()) {
                Ok(frame) => frame,
                Err(DecodeError::Frame(FrameError::FilteredAppId(app_id))) => {
                    debug!(app_id, "dropping frame of other channel");
                    continue;
                }
                Err(DecodeError::Frame(e)) => {
                    warn!("dropping frame: {e}");
                    continue;
                }
                Err(DecodeError::EndOfStream) => {
                    info!("byte source reached end of stream");
                    return Ok(Termination::EndOfStream);
                }
                Err(DecodeError::Cancelled) => {
                    info!("stop requested");
                    return Ok(Termination::Cancelled);
                }
                Err(DecodeError::Source(e)) => return Err(BridgeError::Source(e)),
            };

            let creator = match GsmtapPacketCreator::new(&frame) {
                Ok(creator) => creator,
                Err(e @ EncodeError::NotLayer1Trace { .. }) => {
                    debug!("skipping trace: {e}");
                    self.summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("dropping trace: {e}");
                    self.summary.encode_errors += 1;
                    continue;
                }
            };
            let written = match creator.write_to_bytes(&mut packet_buf) {
                Ok(written) => written,
                Err(e) => {
                    warn!("encoding GSMTAP packet failed: {e}");
                    self.summary.encode_errors += 1;
                    continue;
                }
            };
            debug!(
                subtype = ?creator.header().subtype,
                uplink = creator.header().uplink,
                len = written,
                "forwarding trace"
            );
            match sink.send(&packet_buf[..written]) {
                Ok(()) => self.summary.forwarded += 1,
                Err(e) => {
                    warn!("sending GSMTAP packet failed: {e}");
                    self.summary.send_errors += 1;
                    if self.config.stop_on_send_error {
                        return Err(BridgeError::Sink(e));
                    }
                }
            }
        }
    }
}
