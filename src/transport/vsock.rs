use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_vsock::{VsockListener, VsockStream};

use crate::addr::Addr;
use crate::error::{AcceptError, BindError, DialError, Error};

/// Bind a listener on the loopback context ID.
pub fn listen_local(port: u32) -> Result<Listener, BindError> {
    listen(Addr::loopback(port))
}

/// Bind a listener at `addr`.
///
/// Fails if the address is already bound or the kernel rejects it.
pub fn listen(addr: Addr) -> Result<Listener, BindError> {
    let socket = VsockListener::bind(addr.into()).map_err(|source| BindError { addr, source })?;
    let local = socket
        .local_addr()
        .map(Addr::from)
        .map_err(|source| BindError { addr, source })?;

    tracing::info!(addr = %addr, "vsock listener bound");

    Ok(Listener {
        shared: Arc::new(Shared {
            addr,
            local,
            socket: Mutex::new(Some(socket)),
            closed: CancellationToken::new(),
        }),
    })
}

/// Connect to the endpoint at (`context_id`, `port`).
///
/// A single synchronous connect; nothing is retried.
pub async fn dial(context_id: u32, port: u32) -> Result<Connection, DialError> {
    let addr = Addr::new(context_id, port);
    tracing::debug!(addr = %addr, "dialing");

    let stream = VsockStream::connect(addr.into())
        .await
        .map_err(|source| DialError { addr, source })?;

    tracing::debug!(addr = %addr, "connected");
    Ok(Connection { stream, peer: addr })
}

/// Context ID of the machine this process runs on, read from `/dev/vsock`.
pub fn local_context_id() -> io::Result<u32> {
    vsock::get_local_cid()
}

/// State shared between a [`Listener`] and its [`CloseHandle`]s.
struct Shared {
    addr: Addr,
    local: Addr,
    /// `None` once the socket has been released.
    socket: Mutex<Option<VsockListener>>,
    closed: CancellationToken,
}

impl Shared {
    fn close(&self) {
        self.closed.cancel();
        self.release_if_closed();
    }

    /// Drop the socket of a closed listener.
    ///
    /// While an `accept` holds the lock this is a no-op; that `accept` wakes on
    /// the cancelled token and calls back in once the lock is free.
    fn release_if_closed(&self) {
        if !self.closed.is_cancelled() {
            return;
        }
        if let Ok(mut socket) = self.socket.try_lock() {
            if socket.take().is_some() {
                tracing::debug!(addr = %self.addr, "vsock listener closed");
            }
        }
    }
}

/// A bound, passive VSOCK socket.
///
/// Closing the listener, directly or through a [`CloseHandle`], releases the
/// socket so the address can be bound again and new dials are refused. A
/// pending [`accept`](Listener::accept) fails with [`AcceptError::Closed`].
pub struct Listener {
    shared: Arc<Shared>,
}

impl Listener {
    /// The address this listener was bound to.
    pub fn addr(&self) -> Addr {
        self.shared.addr
    }

    /// Address reported by the kernel at bind time.
    pub fn local_addr(&self) -> Addr {
        self.shared.local
    }

    /// Wait for one inbound connection.
    pub async fn accept(&mut self) -> Result<Connection, AcceptError> {
        let result = self.accept_once().await;
        self.shared.release_if_closed();
        result
    }

    async fn accept_once(&self) -> Result<Connection, AcceptError> {
        let shared = &*self.shared;
        let addr = shared.addr;

        let mut socket = shared.socket.lock().await;
        let Some(socket) = socket.as_mut() else {
            return Err(AcceptError::Closed { addr });
        };

        tokio::select! {
            biased;

            _ = shared.closed.cancelled() => Err(AcceptError::Closed { addr }),
            res = socket.accept() => {
                let (stream, peer) = res.map_err(|source| AcceptError::Io { addr, source })?;
                let peer = Addr::from(peer);
                tracing::debug!(addr = %addr, peer = %peer, "accepted connection");
                Ok(Connection { stream, peer })
            }
        }
    }

    /// Handle that closes this listener from another task.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// True once the listener has been closed by any route.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    /// Close the listener and release its socket.
    pub fn close(self) {
        self.shared.close();
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("addr", &self.shared.addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Closes a [`Listener`] from outside the task that owns it.
///
/// Closing is idempotent. The socket is released right away, or by the
/// pending `accept` as it returns.
#[derive(Clone)]
pub struct CloseHandle {
    shared: Arc<Shared>,
}

impl CloseHandle {
    /// Close the listener this handle was taken from.
    pub fn close(&self) {
        self.shared.close();
    }

    /// True once the listener has been closed by any route.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }
}

impl std::fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseHandle")
            .field("addr", &self.shared.addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// An established VSOCK stream, produced by [`dial`] or [`Listener::accept`].
pub struct Connection {
    stream: VsockStream,
    peer: Addr,
}

impl Connection {
    /// Remote end: the dialed address, or the peer reported by `accept`.
    pub fn peer_addr(&self) -> Addr {
        self.peer
    }

    /// Local end as reported by the kernel.
    pub fn local_addr(&self) -> io::Result<Addr> {
        self.stream.local_addr().map(Addr::from)
    }

    /// Shut down the write half, then release the socket.
    pub async fn close(mut self) -> Result<(), Error> {
        tracing::debug!(peer = %self.peer, "closing connection");
        AsyncWriteExt::shutdown(&mut self.stream)
            .await
            .map_err(Error::Io)
    }

    /// Unwrap the underlying `tokio-vsock` stream.
    pub fn into_inner(self) -> VsockStream {
        self.stream
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("peer", &self.peer).finish()
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_context_id_reports_cid_or_error() {
        // Hosts without a vsock device answer with an error instead.
        match local_context_id() {
            Ok(cid) => assert_ne!(cid, crate::addr::CID_ANY),
            Err(e) => assert!(e.raw_os_error().is_some(), "unexpected error: {e}"),
        }
    }
}
