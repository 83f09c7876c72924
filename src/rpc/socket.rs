//! TCP transport: one connection per call, length-prefixed frames.

use std::convert::TryFrom;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing::trace;

use crate::common::{ErrorSpecific, Message, MessageType, RequestSpecific, ResponseSpecific};
use crate::error::PROTOCOL_ERROR;
use crate::{Result, TransportError};

use super::config::Config;

/// Default bound on connecting, writing a request and reading its response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Key transfers are unbounded in size, but a frame larger than this is
/// treated as garbage rather than allocated.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

const LENGTH_PREFIX_SIZE: usize = 4;

/// Write `payload` preceded by its length as a big-endian u32.
pub(crate) fn write_frame<W: Write>(
    stream: &mut W,
    payload: &[u8],
    max_frame_size: usize,
) -> Result<(), TransportError> {
    let length = u32::try_from(payload.len())
        .ok()
        .filter(|length| *length as usize <= max_frame_size)
        .ok_or(TransportError::FrameTooLarge {
            size: payload.len(),
            max: max_frame_size,
        })?;

    stream.write_all(&length.to_be_bytes())?;
    stream.write_all(payload)?;
    stream.flush()?;

    Ok(())
}

/// Read one frame written by [write_frame].
///
/// A peer closing the connection mid-frame surfaces as
/// [std::io::ErrorKind::UnexpectedEof], a stalled one as a read timeout.
pub(crate) fn read_frame<R: Read>(
    stream: &mut R,
    max_frame_size: usize,
) -> Result<Vec<u8>, TransportError> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    stream.read_exact(&mut prefix)?;

    let size = u32::from_be_bytes(prefix) as usize;
    if size > max_frame_size {
        return Err(TransportError::FrameTooLarge {
            size,
            max: max_frame_size,
        });
    }

    let mut payload = vec![0u8; size];
    stream.read_exact(&mut payload)?;

    Ok(payload)
}

#[derive(Debug)]
/// Sends requests to peers and waits for their responses.
pub struct Transport {
    next_tid: AtomicU32,
    request_timeout: Duration,
    max_frame_size: usize,
}

impl Transport {
    pub fn new(config: &Config) -> Self {
        Self {
            next_tid: AtomicU32::new(0),
            request_timeout: config.request_timeout,
            max_frame_size: config.max_frame_size,
        }
    }

    fn tid(&self) -> u32 {
        self.next_tid.fetch_add(1, Ordering::Relaxed)
    }

    /// Send `request` to `address` over a fresh connection and block until the
    /// response arrives, the peer closes the connection, or the timeout hits.
    ///
    /// Error responses are converted into the matching [crate::Error].
    pub fn request(
        &self,
        address: SocketAddr,
        request: RequestSpecific,
    ) -> Result<ResponseSpecific> {
        let tid = self.tid();
        let method = request.method();

        let message = Message {
            transaction_id: tid,
            message_type: MessageType::Request(request),
        };
        trace!(context = "socket_message_sending", ?address, message = ?message);

        let bytes = message.to_bytes()?;

        let mut stream = TcpStream::connect_timeout(&address, self.request_timeout)
            .map_err(TransportError::from)?;
        stream
            .set_read_timeout(Some(self.request_timeout))
            .map_err(TransportError::from)?;
        stream
            .set_write_timeout(Some(self.request_timeout))
            .map_err(TransportError::from)?;
        stream.set_nodelay(true).map_err(TransportError::from)?;

        write_frame(&mut stream, &bytes, self.max_frame_size)?;
        // Nothing else will be written on this connection.
        let _ = stream.shutdown(Shutdown::Write);

        let response = Message::from_bytes(read_frame(&mut stream, self.max_frame_size)?)?;
        trace!(context = "socket_message_receiving", ?address, message = ?response);

        // A request the server could not decode is answered with tid 0.
        let garbled = response.transaction_id == 0
            && matches!(
                response.message_type,
                MessageType::Error(ErrorSpecific {
                    code: PROTOCOL_ERROR,
                    ..
                })
            );

        match response.message_type {
            MessageType::Request(_) => Err(TransportError::UnexpectedMessage(format!(
                "request in response to {}",
                method
            ))
            .into()),
            _ if response.transaction_id != tid && !garbled => {
                Err(TransportError::TransactionMismatch {
                    sent: tid,
                    received: response.transaction_id,
                }
                .into())
            }
            MessageType::Error(error) => Err(error.into()),
            MessageType::Response(response) => Ok(response),
        }
    }
}
