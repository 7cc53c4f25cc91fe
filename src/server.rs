use std::fmt::Display;
use std::future::Future;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::Error;
use crate::transport::vsock::{Connection, Listener};

/// Serve every inbound connection on its own task.
///
/// Each accepted connection is passed to `handler`, and the returned future
/// is spawned. Handler failures are logged and do not stop the loop. Returns
/// `Ok(())` once the listener is closed through its
/// [`CloseHandle`](crate::transport::vsock::CloseHandle); any other accept
/// failure is returned.
pub async fn serve<H, Fut, T, E>(mut listener: Listener, mut handler: H) -> Result<(), Error>
where
    H: FnMut(Connection) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    let addr = listener.addr();
    tracing::info!(addr = %addr, "serving vsock connections");

    loop {
        let conn = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) if e.is_closed() => {
                tracing::info!(addr = %addr, "listener closed, stopping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let peer = conn.peer_addr();
        let task = handler(conn);

        tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::warn!(%peer, error = %e, "connection handler error");
            }
        });
    }
}

/// Write back everything read from `conn` until the peer stops sending, then
/// close it. Returns the number of bytes echoed.
pub async fn echo(mut conn: Connection) -> Result<u64, Error> {
    let peer = conn.peer_addr();
    let mut buf = vec![0u8; 4096];
    let mut total = 0u64;

    loop {
        let n = conn.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        conn.write_all(&buf[..n]).await?;
        conn.flush().await?;
        total += n as u64;
    }

    tracing::debug!(%peer, bytes = total, "peer finished sending");
    conn.close().await?;
    Ok(total)
}
