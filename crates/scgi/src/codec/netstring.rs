//! Netstring framing: `<decimal length>:<bytes>,`.
//!
//! The length prefix is a plain byte count, one or more ASCII digits with no
//! sign and no whitespace. The trailing comma is mandatory. Decoding is
//! strict; a malformed frame is never resynchronised.
//!
//! Two renderings share the same grammar:
//!
//! - [`write_netstring`] and [`read_netstring`] work on blocking `std::io`
//!   streams
//! - [`NetstringCodec`] decodes and encodes frames in a [`BytesMut`], for
//!   data that arrives in pieces

use std::io::{self, BufRead, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::ensure;
use crate::protocol::ScgiError;

/// `u64::MAX` has 20 decimal digits; anything longer can't be a length.
const MAX_LENGTH_DIGITS: usize = 20;

const LENGTH_SEPARATOR: u8 = b':';
const TRAILING_COMMA: u8 = b',';

const INVALID_LENGTH: &str = "invalid length";
const MISSING_TRAILING_COMMA: &str = "missing trailing comma";

/// Writes `data` to `writer` as one netstring.
///
/// The data itself is not inspected.
///
/// # Errors
///
/// Any write failure is returned as [`ScgiError::Io`]; the writer may have
/// received part of the frame.
pub fn write_netstring<W: Write>(mut writer: W, data: &[u8]) -> Result<(), ScgiError> {
    write!(writer, "{}:", data.len())?;
    writer.write_all(data)?;
    writer.write_all(&[TRAILING_COMMA])?;
    trace!(data_len = data.len(), "wrote netstring");
    Ok(())
}

/// Reads exactly one netstring from `reader` and returns its payload.
///
/// Nothing past the trailing comma is consumed.
///
/// # Errors
///
/// - [`ScgiError::Format`] with `invalid length` if the prefix is not a
///   decimal number
/// - [`ScgiError::Io`] if the stream ends before the frame is complete
/// - [`ScgiError::Format`] with `missing trailing comma` if the byte after
///   the payload is not `,`
pub fn read_netstring<R: BufRead>(reader: &mut R) -> Result<Bytes, ScgiError> {
    let mut prefix = Vec::with_capacity(MAX_LENGTH_DIGITS + 1);
    reader.by_ref().take((MAX_LENGTH_DIGITS + 1) as u64).read_until(LENGTH_SEPARATOR, &mut prefix)?;

    let Some((&LENGTH_SEPARATOR, digits)) = prefix.split_last() else {
        // either the stream ended or the prefix is longer than any length can be
        ensure!(prefix.len() <= MAX_LENGTH_DIGITS, ScgiError::format(INVALID_LENGTH));
        return Err(ScgiError::io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "netstring: stream ended before length separator",
        )));
    };
    let length = parse_length(digits)?;
    let frame_len = length.checked_add(1).ok_or_else(|| ScgiError::format(INVALID_LENGTH))?;

    let mut data = Vec::new();
    reader.by_ref().take(frame_len as u64).read_to_end(&mut data)?;
    ensure!(
        data.len() == frame_len,
        ScgiError::io(io::Error::new(io::ErrorKind::UnexpectedEof, "netstring: stream ended before trailing comma"))
    );

    ensure!(data.pop() == Some(TRAILING_COMMA), ScgiError::format(MISSING_TRAILING_COMMA));
    trace!(data_len = length, "read netstring");
    Ok(Bytes::from(data))
}

/// Parses a netstring length prefix, the bytes before `:`.
fn parse_length(digits: &[u8]) -> Result<usize, ScgiError> {
    ensure!(!digits.is_empty(), ScgiError::format(INVALID_LENGTH));

    digits.iter().try_fold(0usize, |length, &digit| {
        ensure!(digit.is_ascii_digit(), ScgiError::format(INVALID_LENGTH));
        length
            .checked_mul(10)
            .and_then(|length| length.checked_add(usize::from(digit - b'0')))
            .ok_or_else(|| ScgiError::format(INVALID_LENGTH))
    })
}

/// Netstring framing over a [`BytesMut`].
///
/// Decoding yields the payload of each complete frame and `Ok(None)` while a
/// frame is still incomplete. A malformed prefix is rejected as soon as it is
/// seen, without waiting for the rest of the frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetstringCodec;

impl NetstringCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for NetstringCodec {
    type Item = Bytes;
    type Error = ScgiError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(separator) = src.iter().position(|&b| b == LENGTH_SEPARATOR) else {
            ensure!(
                src.len() <= MAX_LENGTH_DIGITS && src.iter().all(u8::is_ascii_digit),
                ScgiError::format(INVALID_LENGTH)
            );
            return Ok(None);
        };

        let length = parse_length(&src[..separator])?;
        let frame_len = separator
            .checked_add(length)
            .and_then(|len| len.checked_add(2))
            .ok_or_else(|| ScgiError::format(INVALID_LENGTH))?;

        if src.len() < frame_len {
            return Ok(None);
        }

        src.advance(separator + 1);
        let data = src.split_to(length).freeze();
        ensure!(src.get_u8() == TRAILING_COMMA, ScgiError::format(MISSING_TRAILING_COMMA));

        trace!(data_len = length, "decoded netstring");
        Ok(Some(data))
    }
}

impl<'a> Encoder<&'a [u8]> for NetstringCodec {
    type Error = ScgiError;

    fn encode(&mut self, item: &'a [u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = item.len().to_string();
        dst.reserve(length.len() + item.len() + 2);
        dst.put_slice(length.as_bytes());
        dst.put_u8(LENGTH_SEPARATOR);
        dst.put_slice(item);
        dst.put_u8(TRAILING_COMMA);
        Ok(())
    }
}

impl Encoder<Bytes> for NetstringCodec {
    type Error = ScgiError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&[u8]>>::encode(self, &item[..], dst)
    }
}
