//! Listening side: accepts connections and hands each request to a [RequestHandler].

use std::fmt::{self, Debug, Display, Formatter};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, Sender, TryRecvError};
use tracing::{debug, trace, warn};

use crate::common::{
    messages, ErrorSpecific, Message, MessageType, RequestSpecific, ResponseSpecific,
};
use crate::error::{GENERIC_ERROR, PROTOCOL_ERROR};
use crate::{Error, Result, TransportError};

use super::config::Config;
use super::socket::{read_frame, write_frame};

/// How long the accept loop sleeps when no connection is pending, which is also
/// the worst case delay to notice a shutdown.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(5);

/// Serves requests arriving at a [Server].
pub trait RequestHandler: Send + Sync + 'static {
    fn handle_request(
        &self,
        request: RequestSpecific,
        from: SocketAddr,
    ) -> Result<ResponseSpecific>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Handle the server issues to every accepted connection.
pub struct ConnectionId(u64);

impl Display for ConnectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accept loop running on its own thread, one worker thread per connection.
pub struct Server {
    local_addr: SocketAddr,
    shutdown: Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Debug for Server {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

#[derive(Clone, Copy)]
struct ConnectionSettings {
    request_timeout: Duration,
    max_frame_size: usize,
}

impl Server {
    /// Start accepting connections on an already bound `listener`.
    pub fn start(
        listener: TcpListener,
        handler: Arc<dyn RequestHandler>,
        config: &Config,
    ) -> Result<Server> {
        let local_addr = listener.local_addr().map_err(TransportError::from)?;
        listener
            .set_nonblocking(true)
            .map_err(TransportError::from)?;

        let (shutdown, receiver) = flume::bounded(1);
        let settings = ConnectionSettings {
            request_timeout: config.request_timeout,
            max_frame_size: config.max_frame_size,
        };

        let handle = thread::Builder::new()
            .name(format!("chord-server-{}", local_addr))
            .spawn(move || run(listener, handler, receiver, settings))
            .map_err(TransportError::from)?;

        debug!(?local_addr, "Listening for incoming connections");

        Ok(Server {
            local_addr,
            shutdown,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Returns the address the server is listening to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Connections already accepted are served to completion on their own threads.
    pub fn shutdown(&self) {
        let _ = self.shutdown.try_send(());

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn run(
    listener: TcpListener,
    handler: Arc<dyn RequestHandler>,
    shutdown: Receiver<()>,
    settings: ConnectionSettings,
) {
    let next_connection_id = AtomicU64::new(0);

    loop {
        match shutdown.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match listener.accept() {
            Ok((stream, from)) => {
                let id = ConnectionId(next_connection_id.fetch_add(1, Ordering::Relaxed));
                let handler = handler.clone();

                trace!(context = "server_accept", connection = %id, ?from);

                let spawned = thread::Builder::new()
                    .name(format!("chord-{}", id))
                    .spawn(move || serve_connection(id, stream, from, handler, settings));

                if let Err(error) = spawned {
                    debug!(connection = %id, ?error, "Failed to spawn connection worker");
                }
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                debug!(?error, "Failed to accept connection");
                thread::sleep(ACCEPT_BACKOFF);
            }
        }
    }

    debug!("Server shut down");
}

fn serve_connection(
    id: ConnectionId,
    mut stream: TcpStream,
    from: SocketAddr,
    handler: Arc<dyn RequestHandler>,
    settings: ConnectionSettings,
) {
    if let Err(error) = exchange(id, &mut stream, from, handler.as_ref(), settings) {
        debug!(connection = %id, ?from, ?error, "Connection failed");
    }
}

/// Read one request, dispatch it, write one response.
fn exchange(
    id: ConnectionId,
    stream: &mut TcpStream,
    from: SocketAddr,
    handler: &dyn RequestHandler,
    settings: ConnectionSettings,
) -> Result<(), TransportError> {
    // Accepted sockets inherit non-blocking mode on some platforms.
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(settings.request_timeout))?;
    stream.set_write_timeout(Some(settings.request_timeout))?;
    stream.set_nodelay(true)?;

    let frame = read_frame(stream, settings.max_frame_size)?;

    let reply = match Message::from_bytes(&frame) {
        Ok(Message {
            transaction_id,
            message_type: MessageType::Request(request),
        }) => {
            trace!(context = "server_request", connection = %id, method = request.method());

            let message_type = match handler.handle_request(request, from) {
                Ok(response) => MessageType::Response(response),
                Err(error) => {
                    debug!(connection = %id, ?error, "Request failed");
                    MessageType::Error(ErrorSpecific::from(&error))
                }
            };

            Message {
                transaction_id,
                message_type,
            }
        }
        Ok(message) => Message {
            transaction_id: message.transaction_id,
            message_type: MessageType::Error(ErrorSpecific {
                code: GENERIC_ERROR,
                description: "Expected a request".to_string(),
            }),
        },
        Err(error) => match messages::unknown_method(&frame) {
            Some((transaction_id, method)) => {
                debug!(connection = %id, ?from, method = %method, "Unknown method");

                Message {
                    transaction_id,
                    message_type: MessageType::Error(ErrorSpecific::from(
                        &Error::UnknownMethod(method),
                    )),
                }
            }
            None => Message {
                transaction_id: 0,
                message_type: MessageType::Error(ErrorSpecific {
                    code: PROTOCOL_ERROR,
                    description: error.to_string(),
                }),
            },
        },
    };

    let bytes = reply.to_bytes().map_err(|error| match error {
        Error::Transport(error) => error,
        other => TransportError::UnexpectedMessage(other.to_string()),
    })?;

    let handed_over = handed_over_keys(&reply);

    write_frame(stream, &bytes, settings.max_frame_size).map_err(|error| {
        if handed_over > 0 {
            warn!(
                connection = %id,
                ?from,
                count = handed_over,
                ?error,
                "Lost keys handed over to a new predecessor"
            );
        }

        error
    })
}

/// Keys a reply carries away from this node, already removed from its store.
fn handed_over_keys(reply: &Message) -> usize {
    match &reply.message_type {
        MessageType::Response(ResponseSpecific::Keys(keys)) => keys.len(),
        _ => 0,
    }
}
