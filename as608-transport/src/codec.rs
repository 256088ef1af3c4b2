//! Frame I/O over async byte streams
//!
//! `read_frame` pulls exactly one frame off a stream, `read_packet` drives
//! the reassembler until one logical packet is complete and `write_packet`
//! splits a packet into frames and writes them back to back.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use as608_core::{
    constants::HEADER_SIZE, fragment, ChunkSize, Frame, FrameHeader, Packet, Reassembler,
    Reassembly,
};

use crate::error::{Error, Result};

/// Read one frame
///
/// Partial reads are retried until the header and then the declared body
/// are complete. A bad magic pair fails before the body is touched.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut raw = [0u8; HEADER_SIZE];
    reader.read_exact(&mut raw).await?;

    let header = FrameHeader::parse(&raw)?;

    let mut body = BytesMut::zeroed(header.body_len());
    reader.read_exact(&mut body).await?;

    let frame = Frame::from_parts(header, body)?;
    trace!("Received: {:?}", frame);

    Ok(frame)
}

/// Read one logical packet, reassembling `Data`..`End` sequences
///
/// If a frame fails after fragments were collected, the error carries the
/// partial payload as `Error::Incomplete`.
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut reassembler = Reassembler::new();

    loop {
        let frame = match read_frame(reader).await {
            Ok(frame) => frame,
            Err(err) if reassembler.frames() > 0 => {
                let partial = reassembler.take_partial();
                debug!(
                    received = partial.len(),
                    "Multi-frame exchange interrupted: {}", err
                );
                return Err(Error::Incomplete {
                    partial,
                    source: Box::new(err),
                });
            }
            Err(err) => return Err(err),
        };

        if let Reassembly::Complete(packet) = reassembler.push(frame) {
            trace!("Reassembled: {:?}", packet);
            return Ok(packet);
        }
    }
}

/// Write a packet, split according to `chunk`, then flush
pub async fn write_packet<W>(writer: &mut W, packet: &Packet, chunk: ChunkSize) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    for frame in fragment::split(packet, chunk) {
        let data = frame.encode()?;
        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);
        writer.write_all(&data).await?;
    }

    writer.flush().await?;
    Ok(())
}
