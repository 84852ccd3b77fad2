//! Generated shrex/nd wire types (`proto/shrex_nd.proto`, compiled by
//! `build.rs` with `prost-build`), plus length-delimited framing.
//!
//! Framing is a `prost`-style varint length prefix followed by the encoded
//! message, read byte-at-a-time off an `AsyncRead` since `prost`'s own
//! `encode_length_delimited`/`decode_length_delimited` operate on buffers
//! already resident in memory, not on a stream.

#![allow(clippy::all)]
include!(concat!(env!("OUT_DIR"), "/shrex.nd.rs"));

use crate::error::{Error, Result};
use bytes::BytesMut;
use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub async fn write_framed<W, M>(w: &mut W, msg: &M) -> Result<()>
where
    W: AsyncWrite + Unpin,
    M: Message,
{
    let mut len_buf = BytesMut::with_capacity(10);
    prost::encoding::encode_varint(msg.encoded_len() as u64, &mut len_buf);

    let mut payload = BytesMut::with_capacity(msg.encoded_len());
    msg.encode(&mut payload)?;

    w.write_all(&len_buf).await?;
    w.write_all(&payload).await?;
    w.flush().await?;
    Ok(())
}

pub async fn read_framed<R, M>(r: &mut R) -> Result<M>
where
    R: AsyncRead + Unpin,
    M: Message + Default,
{
    let len = read_varint(r).await?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf).await?;
    Ok(M::decode(&buf[..])?)
}

/// Reads the varint one byte at a time so an empty/closed stream surfaces as
/// `std::io::ErrorKind::UnexpectedEof` — the client's signal that the peer
/// closed the stream before writing a response (rate-limit backpressure,
/// spec §4.7).
async fn read_varint<R: AsyncRead + Unpin>(r: &mut R) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let mut byte = [0u8; 1];
        let n = r.read(&mut byte).await?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stream closed before a length prefix was read")));
        }
        result |= ((byte[0] & 0x7f) as u64) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(result)
}
