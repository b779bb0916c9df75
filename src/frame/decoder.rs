//! Frame decoder state machine.
//!
//! The [FrameDecoder] pulls bytes from a [ByteSource] and assembles validated [Frame]s. It
//! passes through the following states for every frame:
//!
//! 1. Await start: single bytes are read and discarded until the start marker was found.
//! 2. Read header: AppID and the two length bytes. The check sequence is seeded with them.
//! 3. Read payload: exactly the declared number of bytes, folded into the check sequence.
//! 4. Read trailer: FCS and end marker.
//! 5. Dispatch: only intact frames of the trace channel are returned.
//!
//! A frame with an oversized length is abandoned right after the header, so the decoder
//! resynchronizes on the next start marker it sees.
use super::{
    Frame, FrameError, FrameHeader, FRAME_HEADER_LEN, FRAME_TRAILER_LEN, MAX_PAYLOAD_LEN,
    TRACE_APP_ID,
};
use crate::{ETX, STX};
use arbitrary_int::prelude::*;
use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of a single read attempt on a [ByteSource].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadOutcome {
    /// The given number of bytes were written to the start of the buffer.
    Data(usize),
    /// The source will never deliver data again.
    EndOfStream,
    /// No data was available within the bounded wait time of the source.
    Retry,
}

/// Abstract source of the raw serial byte stream.
///
/// Implementations should only block for a bounded time and return [ReadOutcome::Retry] when
/// no data arrived, so a stop request can be observed.
pub trait ByteSource {
    type Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, Self::Error>;
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    type Error = T::Error;

    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, Self::Error> {
        (**self).read(buf)
    }
}

/// [ByteSource] over an in-memory buffer, optionally handing out the data in small chunks.
#[derive(Debug, Clone)]
pub struct SliceSource<'data> {
    data: &'data [u8],
    position: usize,
    max_chunk: usize,
}

impl<'data> SliceSource<'data> {
    pub fn new(data: &'data [u8]) -> Self {
        Self {
            data,
            position: 0,
            max_chunk: usize::MAX,
        }
    }

    /// Deliver at most `max_chunk` bytes per read call.
    pub fn new_chunked(data: &'data [u8], max_chunk: usize) -> Self {
        Self {
            data,
            position: 0,
            max_chunk: max_chunk.max(1),
        }
    }

    /// Number of bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> &'data [u8] {
        &self.data[self.position..]
    }
}

impl ByteSource for SliceSource<'_> {
    type Error = Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, Self::Error> {
        let remaining = self.remaining();
        if remaining.is_empty() {
            return Ok(ReadOutcome::EndOfStream);
        }
        let len = remaining.len().min(buf.len()).min(self.max_chunk);
        buf[..len].copy_from_slice(&remaining[..len]);
        self.position += len;
        Ok(ReadOutcome::Data(len))
    }
}

/// Errors returned by [FrameDecoder::next_frame].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError<E> {
    /// A single frame was dropped. Decoding can continue.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    /// The byte source failed. Decoding must stop.
    #[error("byte source error: {0}")]
    Source(E),
    #[error("byte source reached end of stream")]
    EndOfStream,
    #[error("decoding was cancelled")]
    Cancelled,
}

impl<E> DecodeError<E> {
    /// Fatal errors terminate the decode loop.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DecodeError::Frame(_))
    }
}

/// Outcome counters of the decoder.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodeStats {
    /// Start markers followed by a complete header.
    pub frames_started: u64,
    /// Intact frames of the trace channel returned to the caller.
    pub frames_valid: u64,
    pub oversize_errors: u64,
    pub terminator_errors: u64,
    pub checksum_errors: u64,
    /// Intact frames of channels other than the trace channel.
    pub filtered: u64,
    /// Bytes discarded while searching for a start marker.
    pub resync_bytes: u64,
}

impl DecodeStats {
    /// All frames which were dropped because they were corrupted.
    #[inline]
    pub fn total_errors(&self) -> u64 {
        self.oversize_errors + self.terminator_errors + self.checksum_errors
    }

    fn record(&mut self, error: &FrameError) {
        match error {
            FrameError::OversizeLength { .. } => self.oversize_errors += 1,
            FrameError::WrongTerminator { .. } => self.terminator_errors += 1,
            FrameError::ChecksumMismatch { .. } => self.checksum_errors += 1,
            FrameError::FilteredAppId(_) => self.filtered += 1,
        }
    }
}

/// Pull based decoder for the serial frame format.
#[derive(Debug)]
pub struct FrameDecoder<S> {
    source: S,
    stats: DecodeStats,
    terminated: bool,
}

impl<S: ByteSource> FrameDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            stats: DecodeStats::default(),
            terminated: false,
        }
    }

    #[inline]
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[inline]
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Decode the next frame of the trace channel.
    ///
    /// Dropped frames are returned as [DecodeError::Frame] and counted in [Self::stats], so the
    /// caller can continue with the next call. All other errors are fatal.
    ///
    /// The `stop` flag is checked before every read while searching for the start marker and
    /// after every read attempt which yielded [ReadOutcome::Retry]. A frame which is streaming
    /// in is therefore completed before a stop request is honored.
    pub fn next_frame(&mut self, stop: &AtomicBool) -> Result<Frame, DecodeError<S::Error>> {
        let result = self.decode_frame(stop);
        if let Err(DecodeError::Frame(error)) = &result {
            self.stats.record(error);
        }
        result
    }

    fn decode_frame(&mut self, stop: &AtomicBool) -> Result<Frame, DecodeError<S::Error>> {
        self.await_start(stop)?;

        let mut raw_header = [0; FRAME_HEADER_LEN];
        self.read_exact(&mut raw_header, stop)?;
        self.stats.frames_started += 1;
        let header = FrameHeader::from_raw(raw_header);
        let declared = header.declared_len().as_usize();
        if declared > MAX_PAYLOAD_LEN {
            return Err(FrameError::OversizeLength { declared }.into());
        }

        // Frames of other channels are read completely as well to stay in sync.
        let mut fcs = header.fcs_seed();
        let mut payload = [0; MAX_PAYLOAD_LEN];
        self.read_exact(&mut payload[..declared], stop)?;
        fcs.update(&payload[..declared]);

        let mut trailer = [0; FRAME_TRAILER_LEN];
        self.read_exact(&mut trailer, stop)?;
        let [received_checksum, etx] = trailer;
        if etx != ETX {
            return Err(FrameError::WrongTerminator { found: etx }.into());
        }
        if !fcs.verify(received_checksum) {
            return Err(FrameError::ChecksumMismatch {
                computed: fcs.value(),
                received: received_checksum,
            }
            .into());
        }
        if header.app_id != TRACE_APP_ID {
            return Err(FrameError::FilteredAppId(header.app_id).into());
        }

        self.stats.frames_valid += 1;
        Ok(Frame::new_from_decoded(
            header.app_id,
            payload,
            declared as u8,
            received_checksum,
        ))
    }

    fn await_start(&mut self, stop: &AtomicBool) -> Result<(), DecodeError<S::Error>> {
        let mut byte = [0; 1];
        loop {
            if stop.load(Ordering::Relaxed) {
                return Err(DecodeError::Cancelled);
            }
            match self.source.read(&mut byte).map_err(DecodeError::Source)? {
                ReadOutcome::Data(0) | ReadOutcome::Retry => continue,
                ReadOutcome::Data(_) => {
                    if byte[0] == STX {
                        return Ok(());
                    }
                    self.stats.resync_bytes += 1;
                }
                ReadOutcome::EndOfStream => return Err(DecodeError::EndOfStream),
            }
        }
    }

    /// Fill the whole buffer, accumulating partial reads.
    fn read_exact(&mut self, buf: &mut [u8], stop: &AtomicBool) -> Result<(), DecodeError<S::Error>> {
        let mut filled = 0;
        while filled < buf.len() {
            match self
                .source
                .read(&mut buf[filled..])
                .map_err(DecodeError::Source)?
            {
                ReadOutcome::Data(0) | ReadOutcome::Retry => {
                    if stop.load(Ordering::Relaxed) {
                        return Err(DecodeError::Cancelled);
                    }
                }
                ReadOutcome::Data(read) => filled += read.min(buf.len() - filled),
                ReadOutcome::EndOfStream => return Err(DecodeError::EndOfStream),
            }
        }
        Ok(())
    }
}

impl<S: ByteSource> Iterator for FrameDecoder<S> {
    type Item = Result<Frame, DecodeError<S::Error>>;

    /// Decodes frames without a stop flag. Ends once a fatal error was returned.
    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated {
            return None;
        }
        let stop = AtomicBool::new(false);
        match self.next_frame(&stop) {
            Err(DecodeError::EndOfStream) => {
                self.terminated = true;
                None
            }
            Err(e) if e.is_fatal() => {
                self.terminated = true;
                Some(Err(e))
            }
            result => Some(result),
        }
    }
}
