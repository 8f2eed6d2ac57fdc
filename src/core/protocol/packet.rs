use tokio::io::{AsyncRead, AsyncReadExt};

use super::varint::{self, read_varint};
use crate::core::error::{AppError, AppResult};

/// Upper bound on an incoming packet. Status responses with an embedded
/// favicon are well below this.
pub const MAX_PACKET_LEN: u32 = 2 * 1024 * 1024;

/// Builds the body of one outgoing packet.
#[derive(Debug, Default)]
pub struct PacketWriter {
    body: Vec<u8>,
}

impl PacketWriter {
    pub fn new(packet_id: u32) -> Self {
        let mut writer = Self::default();
        writer.varint(packet_id);
        writer
    }

    pub fn varint(&mut self, value: u32) -> &mut Self {
        varint::write_varint(&mut self.body, value);
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.varint(value.len() as u32);
        self.body.extend_from_slice(value.as_bytes());
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.body.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.body.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Length-prefixed frame ready to be written to the socket.
    pub fn frame(&self) -> Vec<u8> {
        let mut frame = varint::encode(self.body.len() as u32);
        frame.extend_from_slice(&self.body);
        frame
    }
}

/// Cursor over the body of one incoming packet.
#[derive(Debug)]
pub struct PacketReader {
    data: Vec<u8>,
    pos: usize,
}

impl PacketReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// Read one length-prefixed frame from `reader`.
    pub async fn read_frame<R>(reader: &mut R) -> AppResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        let len = read_varint(reader).await?;
        if len == 0 {
            return Err(AppError::protocol("empty packet"));
        }
        if len > MAX_PACKET_LEN {
            return Err(AppError::protocol(format!(
                "packet of {len} bytes exceeds the {MAX_PACKET_LEN} byte limit"
            )));
        }

        let mut data = vec![0u8; len as usize];
        reader.read_exact(&mut data).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                AppError::protocol(format!("connection closed before {len} byte packet"))
            }
            _ => AppError::protocol(format!("read failed: {e}")),
        })?;

        Ok(Self::new(data))
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn varint(&mut self) -> AppResult<u32> {
        let (value, used) = varint::decode(&self.data[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    pub fn bytes(&mut self, len: usize) -> AppResult<&[u8]> {
        if self.remaining() < len {
            return Err(AppError::protocol(format!(
                "expected {len} bytes, only {} left",
                self.remaining()
            )));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..self.pos])
    }

    pub fn string(&mut self) -> AppResult<String> {
        let len = self.varint()? as usize;
        let bytes = self.bytes(len)?.to_vec();
        String::from_utf8(bytes).map_err(|e| AppError::protocol(format!("invalid UTF-8: {e}")))
    }

    pub fn i64(&mut self) -> AppResult<i64> {
        let bytes = self.bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(buf))
    }

    /// Read the packet id and check it against `expected`.
    pub fn expect_id(&mut self, expected: u32) -> AppResult<()> {
        let id = self.varint()?;
        if id != expected {
            return Err(AppError::protocol(format!(
                "unexpected packet id {id:#04x}, wanted {expected:#04x}"
            )));
        }
        Ok(())
    }
}
