use avdecc_datalink::DataLinkError;
use thiserror::Error;

/// Errors raised by the synchronous issue step of every controller
/// operation. Transaction outcomes (protocol or library status) travel in
/// the typed result instead; see [`crate::AemStatus`] and friends.
///
/// Each variant has a stable numeric code (`0` is reserved for "no error"
/// and never appears here because success is `Ok`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The transport failed. This is terminal: the interface is no longer
    /// usable and every operation on this controller will return it.
    #[error("transport interface failed")]
    TransportError,
    #[error("operation timed out")]
    Timeout,
    #[error("unknown remote entity")]
    UnknownRemoteEntity,
    #[error("unknown local entity")]
    UnknownLocalEntity,
    #[error("invalid entity type for the operation")]
    InvalidEntityType,
    #[error("local entity id already in use")]
    DuplicateLocalEntityId,
    #[error("interface not found")]
    InterfaceNotFound,
    #[error("interface invalid")]
    InterfaceInvalid,
    #[error("interface not supported")]
    InterfaceNotSupported,
    #[error("message type not supported by this interface")]
    MessageNotSupported,
    #[error("internal error")]
    InternalError,
}

impl Error {
    /// The stable numeric code for this error.
    pub const fn code(self) -> u8 {
        match self {
            Self::TransportError => 1,
            Self::Timeout => 2,
            Self::UnknownRemoteEntity => 3,
            Self::UnknownLocalEntity => 4,
            Self::InvalidEntityType => 5,
            Self::DuplicateLocalEntityId => 6,
            Self::InterfaceNotFound => 7,
            Self::InterfaceInvalid => 8,
            Self::InterfaceNotSupported => 9,
            Self::MessageNotSupported => 10,
            Self::InternalError => 99,
        }
    }
}

impl From<DataLinkError> for Error {
    fn from(err: DataLinkError) -> Self {
        match err {
            DataLinkError::InterfaceNotFound => Self::InterfaceNotFound,
            DataLinkError::InterfaceInvalid(_) => Self::InterfaceInvalid,
            DataLinkError::InterfaceNotSupported => Self::InterfaceNotSupported,
            DataLinkError::Io(_)
            | DataLinkError::FrameTooLarge
            | DataLinkError::InvalidFrame
            | DataLinkError::Closed => Self::TransportError,
        }
    }
}
