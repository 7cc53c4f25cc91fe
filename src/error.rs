use std::io;

use crate::addr::Addr;

/// Binding a listener failed.
#[derive(Debug, thiserror::Error)]
#[error("bind {addr}: {source}")]
pub struct BindError {
    pub addr: Addr,
    #[source]
    pub source: io::Error,
}

impl BindError {
    /// True when another listener already owns the address.
    pub fn is_addr_in_use(&self) -> bool {
        self.source.kind() == io::ErrorKind::AddrInUse
    }
}

/// Accepting an inbound connection failed.
#[derive(Debug, thiserror::Error)]
pub enum AcceptError {
    #[error("accept on {addr}: listener closed")]
    Closed { addr: Addr },

    #[error("accept on {addr}: {source}")]
    Io {
        addr: Addr,
        #[source]
        source: io::Error,
    },
}

impl AcceptError {
    /// Address of the listener the accept was issued on.
    pub fn addr(&self) -> Addr {
        match self {
            AcceptError::Closed { addr } | AcceptError::Io { addr, .. } => *addr,
        }
    }

    /// True when the listener was closed, before or during the call.
    pub fn is_closed(&self) -> bool {
        matches!(self, AcceptError::Closed { .. })
    }
}

/// Connecting to a remote endpoint failed.
#[derive(Debug, thiserror::Error)]
#[error("dial {addr}: {source}")]
pub struct DialError {
    pub addr: Addr,
    #[source]
    pub source: io::Error,
}

impl DialError {
    /// Kind of the underlying OS error.
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }

    /// True when nothing is listening at the remote address.
    ///
    /// The virtio and loopback transports answer an unbound port with a reset
    /// packet, so the kernel reports `ECONNRESET` as often as `ECONNREFUSED`.
    pub fn is_refused(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset
        )
    }
}

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Accept(#[from] AcceptError),

    #[error(transparent)]
    Dial(#[from] DialError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
