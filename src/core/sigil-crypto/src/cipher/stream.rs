//! Stream adapters for cipher sessions.
//!
//! Data moves through the session in chunks of at most
//! [`StreamConfig::buffer_size`] bytes, so memory use stays bounded regardless
//! of payload size. The chunk size never changes the output bytes.

use std::io::{self, ErrorKind, Read, Write};

use tracing::debug;

use super::session::CipherSession;
use crate::error::CryptoError;

/// Default chunk size for stream processing.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Stream processing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    buffer_size: usize,
}

impl StreamConfig {
    /// Creates a configuration with the given chunk size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` if `buffer_size` is zero.
    pub fn new(buffer_size: usize) -> Result<Self, CryptoError> {
        if buffer_size == 0 {
            return Err(CryptoError::InvalidParameters(
                "stream buffer size must be non-zero".into(),
            ));
        }
        Ok(Self { buffer_size })
    }

    /// Chunk size in bytes.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Pumps `reader` through an initialized `session` into `writer`.
///
/// Finalizes the session at end of input and returns the number of bytes written.
pub fn process_stream<R: Read, W: Write>(
    session: &mut CipherSession,
    reader: &mut R,
    writer: &mut W,
    config: &StreamConfig,
) -> Result<u64, CryptoError> {
    let mut buf = vec![0u8; config.buffer_size()];
    let mut read = 0u64;
    let mut written = 0u64;

    loop {
        let n = read_chunk(reader, &mut buf)?;
        if n == 0 {
            break;
        }
        read += n as u64;

        let output = session.update(&buf[..n])?;
        writer.write_all(&output)?;
        written += output.len() as u64;
    }

    let tail = session.finalize()?;
    writer.write_all(&tail)?;
    writer.flush()?;
    written += tail.len() as u64;

    debug!(read, written, "stream processed");
    Ok(written)
}

/// A writer that transforms everything written to it through a session.
///
/// Call [`CipherWriter::finish`] to flush the final block; dropping the writer
/// without finishing loses it.
pub struct CipherWriter<W: Write> {
    inner: W,
    session: CipherSession,
}

impl<W: Write> CipherWriter<W> {
    /// Wraps `inner`. The session must already be initialized.
    pub fn new(inner: W, session: CipherSession) -> Self {
        Self { inner, session }
    }

    /// The underlying session, for reading generated parameters.
    pub fn session(&self) -> &CipherSession {
        &self.session
    }

    /// Finalizes the session, writes the tail and returns the inner writer.
    pub fn finish(mut self) -> Result<W, CryptoError> {
        let tail = self.session.finalize()?;
        self.inner.write_all(&tail)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for CipherWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let output = self.session.update(buf).map_err(io::Error::other)?;
        self.inner.write_all(&output)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A reader that transforms everything read from `inner` through a session.
///
/// The session is finalized when `inner` reaches end of input. Once the
/// session fails, every later read returns the same error.
pub struct CipherReader<R: Read> {
    inner: R,
    session: CipherSession,
    chunk: Vec<u8>,
    pending: Vec<u8>,
    pos: usize,
    done: bool,
    failed: Option<String>,
}

impl<R: Read> CipherReader<R> {
    /// Wraps `inner` with the default chunk size. The session must already be initialized.
    pub fn new(inner: R, session: CipherSession) -> Self {
        Self::with_config(inner, session, &StreamConfig::default())
    }

    /// Wraps `inner`, reading it in chunks of `config.buffer_size()` bytes.
    pub fn with_config(inner: R, session: CipherSession, config: &StreamConfig) -> Self {
        Self {
            inner,
            session,
            chunk: vec![0u8; config.buffer_size()],
            pending: Vec::new(),
            pos: 0,
            done: false,
            failed: None,
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &CipherSession {
        &self.session
    }

    /// Returns the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for CipherReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.pending.len() {
                let n = out.len().min(self.pending.len() - self.pos);
                out[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if let Some(reason) = &self.failed {
                return Err(io::Error::other(reason.clone()));
            }
            if self.done || out.is_empty() {
                return Ok(0);
            }

            let n = read_chunk(&mut self.inner, &mut self.chunk)?;
            let result = if n == 0 {
                self.session.finalize()
            } else {
                self.session.update(&self.chunk[..n])
            };
            match result {
                Ok(bytes) => {
                    self.done = n == 0;
                    self.pending = bytes;
                    self.pos = 0;
                },
                Err(e) => {
                    debug!(error = %e, "cipher reader failed");
                    self.failed = Some(e.to_string());
                    return Err(io::Error::other(e));
                },
            }
        }
    }
}
