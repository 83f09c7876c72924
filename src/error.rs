//! Main Crate Error

use crate::common::{ErrorSpecific, Id};

#[derive(thiserror::Error, Debug)]
/// Chord crate error enum.
pub enum Error {
    /// An argument is outside of the space it addresses, e.g. a finger index
    /// that is not in `1..=m`.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Id bytes are not exactly [ID_SIZE](crate::common::ID_SIZE) long.
    #[error("Invalid Id size, expected 20, got {0}")]
    InvalidIdSize(usize),

    /// The key is not stored on the node that owns its interval.
    #[error("Key not found: {0}")]
    NotFound(Id),

    /// The peer did not recognize the requested method.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error(transparent)]
    /// Connection refused, timed out, or the exchanged message was garbled.
    Transport(#[from] TransportError),

    /// `find_predecessor` did not converge, which only happens when finger
    /// tables along the path are inconsistent.
    #[error("Lookup for {target} did not converge after {hops} hops")]
    LookupExhausted { target: Id, hops: usize },

    /// Error reported by a peer that has no local counterpart.
    #[error("Remote error {code}: {description}")]
    Remote { code: i32, description: String },
}

#[derive(thiserror::Error, Debug)]
/// Failures of the framed TCP exchange between two nodes.
pub enum TransportError {
    #[error(transparent)]
    /// Transparent [std::io::Error]
    IO(#[from] std::io::Error),

    #[error("Failed to parse message bytes: {0}")]
    BencodeError(#[from] serde_bencode::Error),

    /// Declared frame length exceeds the configured maximum.
    #[error("Frame of {size} bytes exceeds the maximum of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    /// Decoded a well formed message of the wrong kind, e.g. a request where
    /// a response was expected.
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("Response transaction_id {received} does not match request {sent}")]
    TransactionMismatch { sent: u32, received: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// KRPC error codes, plus 404 for missing keys.
pub(crate) const GENERIC_ERROR: i32 = 201;
pub(crate) const SERVER_ERROR: i32 = 202;
pub(crate) const PROTOCOL_ERROR: i32 = 203;
pub(crate) const METHOD_UNKNOWN: i32 = 204;
pub(crate) const KEY_NOT_FOUND: i32 = 404;

impl From<&Error> for ErrorSpecific {
    fn from(error: &Error) -> Self {
        let code = match error {
            Error::InvalidArgument(_) | Error::InvalidIdSize(_) => PROTOCOL_ERROR,
            Error::NotFound(_) => KEY_NOT_FOUND,
            Error::UnknownMethod(_) => METHOD_UNKNOWN,
            Error::Transport(_) | Error::LookupExhausted { .. } => SERVER_ERROR,
            Error::Remote { code, .. } => *code,
        };

        let description = match error {
            // Carry only the hex id, so the caller can rebuild `NotFound`.
            Error::NotFound(id) => id.to_string(),
            Error::UnknownMethod(method) => method.clone(),
            Error::InvalidArgument(reason) => reason.clone(),
            Error::Remote { description, .. } => description.clone(),
            other => other.to_string(),
        };

        ErrorSpecific { code, description }
    }
}

impl From<ErrorSpecific> for Error {
    fn from(error: ErrorSpecific) -> Self {
        match error.code {
            PROTOCOL_ERROR => Error::InvalidArgument(error.description),
            METHOD_UNKNOWN => Error::UnknownMethod(error.description),
            KEY_NOT_FOUND => match error.description.parse::<Id>() {
                Ok(id) => Error::NotFound(id),
                Err(_) => Error::Remote {
                    code: error.code,
                    description: error.description,
                },
            },
            code => Error::Remote {
                code,
                description: error.description,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_survives_the_wire() {
        let id = Id::from_key("breezyreid/25239281951");
        let error = Error::NotFound(id);

        let specific = ErrorSpecific::from(&error);
        assert_eq!(specific.code, KEY_NOT_FOUND);

        match Error::from(specific) {
            Error::NotFound(received) => assert_eq!(received, id),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn transport_failures_become_server_errors() {
        let error = Error::from(TransportError::IO(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        )));

        let specific = ErrorSpecific::from(&error);
        assert_eq!(specific.code, SERVER_ERROR);

        assert!(matches!(
            Error::from(specific),
            Error::Remote {
                code: SERVER_ERROR,
                ..
            }
        ));
    }

    #[test]
    fn unknown_codes_stay_remote() {
        let error = Error::from(ErrorSpecific {
            code: GENERIC_ERROR,
            description: "oops".to_string(),
        });

        assert!(matches!(error, Error::Remote { code: GENERIC_ERROR, .. }));
    }
}
