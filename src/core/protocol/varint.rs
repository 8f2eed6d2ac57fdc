// ─── VarInt ───
// 7 data bits per byte, least significant group first, high bit set on
// every byte except the last. At most 5 bytes for a 32-bit value.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::core::error::{AppError, AppResult};

pub const MAX_VARINT_LEN: usize = 5;

const SEGMENT_BITS: u8 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Append the encoding of `value` to `buf`.
pub fn write_varint(buf: &mut Vec<u8>, value: u32) {
    let mut value = value;
    loop {
        if value & !(SEGMENT_BITS as u32) == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        value >>= 7;
    }
}

pub fn encode(value: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    write_varint(&mut buf, value);
    buf
}

/// Decode a varint from the front of `bytes`, returning the value and the
/// number of bytes consumed.
pub fn decode(bytes: &[u8]) -> AppResult<(u32, usize)> {
    let mut decoder = Decoder::default();
    for (idx, &byte) in bytes.iter().enumerate() {
        if let Some(value) = decoder.push(byte)? {
            return Ok((value, idx + 1));
        }
    }
    Err(AppError::protocol("truncated varint"))
}

/// Read one varint from an async stream, a byte at a time.
pub async fn read_varint<R>(reader: &mut R) -> AppResult<u32>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = Decoder::default();
    loop {
        let byte = reader.read_u8().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                AppError::protocol("connection closed in the middle of a varint")
            }
            _ => AppError::protocol(format!("read failed: {e}")),
        })?;
        if let Some(value) = decoder.push(byte)? {
            return Ok(value);
        }
    }
}

#[derive(Default)]
struct Decoder {
    value: u32,
    position: usize,
}

impl Decoder {
    fn push(&mut self, byte: u8) -> AppResult<Option<u32>> {
        if self.position >= MAX_VARINT_LEN {
            return Err(AppError::protocol("varint longer than 5 bytes"));
        }
        self.value |= ((byte & SEGMENT_BITS) as u32) << (7 * self.position);
        self.position += 1;

        if byte & CONTINUE_BIT == 0 {
            Ok(Some(self.value))
        } else {
            Ok(None)
        }
    }
}
