//! Newline-delimited message framing.
//!
//! Each message is one JSON document on a single line:
//!
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"ping"}\n
//! {"jsonrpc":"2.0","id":1,"result":{}}\n
//! ```
//!
//! `serde_json` never emits raw newlines inside a document, so a compact
//! encoding is always a valid frame.

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

/// Encodes a message as a single line terminated by `\n`.
pub fn encode_line<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let mut buffer = serde_json::to_vec(message)?;

    if buffer.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: buffer.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    buffer.push(b'\n');
    Ok(buffer)
}

/// Decodes one line (with or without its trailing newline).
pub fn decode_line<T: DeserializeOwned>(line: &[u8]) -> ProtocolResult<T> {
    let trimmed = line.trim_ascii();

    if trimmed.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }

    if trimmed.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: trimmed.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    Ok(serde_json::from_slice(trimmed)?)
}

/// Reads newline-delimited frames from an async byte stream.
pub struct LineReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    /// Creates a new LineReader wrapping the given reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(4096),
        }
    }

    /// Reads the next non-blank line, without its terminator.
    ///
    /// Returns `Ok(None)` at EOF. A final line without a trailing newline is
    /// still returned.
    pub async fn next_line(&mut self) -> ProtocolResult<Option<Vec<u8>>> {
        loop {
            self.buffer.clear();
            let read = self.reader.read_until(b'\n', &mut self.buffer).await?;
            if read == 0 {
                return Ok(None);
            }

            let line = self.buffer.trim_ascii();
            if line.is_empty() {
                continue;
            }

            if line.len() > MAX_MESSAGE_SIZE {
                return Err(ProtocolError::MessageTooLarge {
                    size: line.len(),
                    max: MAX_MESSAGE_SIZE,
                });
            }

            return Ok(Some(line.to_vec()));
        }
    }

    /// Reads and decodes the next message.
    pub async fn read_message<T: DeserializeOwned>(&mut self) -> ProtocolResult<Option<T>> {
        match self.next_line().await? {
            Some(line) => decode_line(&line).map(Some),
            None => Ok(None),
        }
    }

    /// Unwraps this LineReader, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writes newline-delimited frames to an async byte stream.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    /// Creates a new LineWriter wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a single message and flushes.
    ///
    /// Flushing after every frame keeps the peer from waiting on a buffered
    /// response.
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> ProtocolResult<()> {
        let data = encode_line(message)?;
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Returns a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Unwraps this LineWriter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
