//! Telnet transport for console servers and devices without SSH.
//!
//! Option negotiation is refused except for server-side ECHO and
//! SUPPRESS-GO-AHEAD, which is what a plain NVT session with a device
//! CLI needs. Login happens in-band and is handled by the session.

use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::config::TransportConfig;
use super::{Transport, take_pending};
use crate::error::{Result, TransportError};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;

/// Byte stream a telnet session can run over.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

/// Incremental decoder separating telnet commands from NVT data.
///
/// Sequences split across reads are carried over to the next call.
#[derive(Debug, Default)]
pub struct TelnetDecoder {
    carry: Vec<u8>,
}

impl TelnetDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `input`, appending data bytes to `data` and negotiation
    /// replies to `replies`.
    pub fn decode(&mut self, input: &[u8], data: &mut BytesMut, replies: &mut Vec<u8>) {
        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(input);

        let mut i = 0;
        while i < buf.len() {
            if buf[i] != IAC {
                data.put_u8(buf[i]);
                i += 1;
                continue;
            }

            let Some(&cmd) = buf.get(i + 1) else {
                break;
            };
            match cmd {
                IAC => {
                    data.put_u8(IAC);
                    i += 2;
                }
                DO | DONT | WILL | WONT => {
                    let Some(&opt) = buf.get(i + 2) else {
                        break;
                    };
                    match cmd {
                        DO => replies.extend_from_slice(&[IAC, WONT, opt]),
                        WILL if opt == OPT_ECHO || opt == OPT_SGA => {
                            replies.extend_from_slice(&[IAC, DO, opt])
                        }
                        WILL => replies.extend_from_slice(&[IAC, DONT, opt]),
                        _ => {}
                    }
                    i += 3;
                }
                SB => {
                    // Skip to IAC SE; wait for more input if it has not arrived
                    match buf[i + 2..].windows(2).position(|w| w == [IAC, SE]) {
                        Some(pos) => i += 2 + pos + 2,
                        None => break,
                    }
                }
                _ => i += 2,
            }
        }

        self.carry = buf.split_off(i);
    }

    /// Discard any partially received sequence.
    pub fn reset(&mut self) {
        self.carry.clear();
    }
}

/// Telnet transport over TCP, or over any injected byte stream.
pub struct TelnetTransport {
    config: Arc<TransportConfig>,
    stream: Option<Box<dyn AsyncStream>>,
    decoder: TelnetDecoder,
    pending: BytesMut,
    scratch: Vec<u8>,
}

impl TelnetTransport {
    /// Create an unconnected telnet transport; `open()` dials TCP.
    pub fn new(config: Arc<TransportConfig>) -> Self {
        Self {
            config,
            stream: None,
            decoder: TelnetDecoder::new(),
            pending: BytesMut::with_capacity(8192),
            scratch: vec![0; 8192],
        }
    }

    /// Wrap an already connected stream (serial console bridge, test double).
    ///
    /// `open()` is a no-op while the stream is live; after `close()` it dials
    /// TCP using the configuration.
    pub fn with_stream(config: Arc<TransportConfig>, stream: impl AsyncStream + 'static) -> Self {
        let mut transport = Self::new(config);
        transport.stream = Some(Box::new(stream));
        transport
    }

    async fn dial(config: &TransportConfig) -> Result<TcpStream> {
        let stream = tokio::time::timeout(
            config.timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|source| TransportError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;
        stream.set_nodelay(true).map_err(TransportError::Io)?;
        Ok(stream)
    }

    fn mark_closed(&mut self) {
        self.stream = None;
        self.decoder.reset();
    }
}

impl Transport for TelnetTransport {
    async fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        self.pending.clear();
        self.decoder.reset();

        debug!("telnet: connecting to {}", self.config.socket_addr());
        let stream = Self::dial(&self.config).await?;
        self.stream = Some(Box::new(stream));
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotOpen)?;

        let escaped: Vec<u8>;
        let payload = if memchr::memchr(IAC, data).is_some() {
            escaped = data
                .iter()
                .flat_map(|&b| if b == IAC { vec![IAC, IAC] } else { vec![b] })
                .collect();
            &escaped[..]
        } else {
            data
        };

        let result = async {
            stream.write_all(payload).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = result {
            debug!("telnet: write failed: {}", e);
            self.mark_closed();
            return Err(TransportError::Disconnected.into());
        }
        Ok(())
    }

    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Bytes> {
        if let Some(chunk) = take_pending(&mut self.pending, max_bytes) {
            return Ok(chunk);
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let stream = self.stream.as_mut().ok_or(TransportError::NotOpen)?;
            let n = match tokio::time::timeout_at(deadline, stream.read(&mut self.scratch)).await {
                Err(_) => return Err(TransportError::Timeout(timeout).into()),
                Ok(Ok(0)) => {
                    debug!("telnet: remote closed the connection");
                    self.mark_closed();
                    return Err(TransportError::Disconnected.into());
                }
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    debug!("telnet: read failed: {}", e);
                    self.mark_closed();
                    return Err(TransportError::Disconnected.into());
                }
            };

            let mut replies = Vec::new();
            self.decoder
                .decode(&self.scratch[..n], &mut self.pending, &mut replies);

            if !replies.is_empty() {
                trace!("telnet: answering {} bytes of negotiation", replies.len());
                if let Some(stream) = self.stream.as_mut() {
                    stream
                        .write_all(&replies)
                        .await
                        .map_err(|_| TransportError::Disconnected)?;
                }
            }

            if let Some(chunk) = take_pending(&mut self.pending, max_bytes) {
                return Ok(chunk);
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.pending.clear();
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("telnet: shutdown failed: {}", e);
            }
        }
        self.decoder.reset();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
