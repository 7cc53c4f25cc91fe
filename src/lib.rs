//! Addressing and connection establishment for VSOCK, the host/guest socket
//! family addressed by (context ID, port).

pub mod addr;
pub mod error;
pub mod server;
pub mod transport;

// Re-export key types at crate root for convenience.
pub use addr::{Addr, ContextId, CID_ANY, HOST, HYPERVISOR, LOOPBACK};
pub use error::{AcceptError, BindError, DialError, Error, Result};
pub use transport::vsock::{
    dial, listen, listen_local, local_context_id, CloseHandle, Connection, Listener,
};
