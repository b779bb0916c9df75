//! Adapters connecting the bridge to standard library I/O handles.
use super::PacketSink;
use crate::frame::decoder::{ByteSource, ReadOutcome};
use std::io;
use std::net::UdpSocket;

/// [ByteSource] over any [io::Read] implementation, for example a serial device which was
/// opened with a read timeout.
///
/// Timeouts and interruptions are reported as [ReadOutcome::Retry], a read of zero bytes as
/// [ReadOutcome::EndOfStream].
#[derive(Debug)]
pub struct ReadSource<R> {
    reader: R,
}

impl<R: io::Read> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: io::Read> ByteSource for ReadSource<R> {
    type Error = io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, Self::Error> {
        match self.reader.read(buf) {
            Ok(0) => Ok(ReadOutcome::EndOfStream),
            Ok(len) => Ok(ReadOutcome::Data(len)),
            Err(e) => match e.kind() {
                io::ErrorKind::WouldBlock
                | io::ErrorKind::TimedOut
                | io::ErrorKind::Interrupted => Ok(ReadOutcome::Retry),
                _ => Err(e),
            },
        }
    }
}

/// Sends every packet as a single datagram to the peer the socket is connected to.
impl PacketSink for UdpSocket {
    type Error = io::Error;

    fn send(&mut self, packet: &[u8]) -> Result<(), Self::Error> {
        let sent = UdpSocket::send(self, packet)?;
        if sent != packet.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "GSMTAP packet was only sent partially",
            ));
        }
        Ok(())
    }
}
