/// VSOCK transport: listen, accept, dial.
pub mod vsock;

pub use vsock::{dial, listen, listen_local, local_context_id, CloseHandle, Connection, Listener};
