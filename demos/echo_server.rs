use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use vsock_conn::server::{echo, serve};
use vsock_conn::{dial, listen_local, LOOPBACK};

/// Echo server over the vsock loopback transport.
///
/// Run with: `cargo run --example echo_server` (needs `vsock_loopback`).
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = 9876;
    let listener = listen_local(port)?;
    let closer = listener.close_handle();
    println!("echo server listening on {}", listener.addr());

    let server = tokio::spawn(serve(listener, echo));

    // Give the server a moment to start accepting.
    tokio::time::sleep(Duration::from_millis(50)).await;

    for i in 0..3 {
        let mut conn = dial(LOOPBACK, port).await?;
        let msg = format!("echo request #{i}");
        println!("[client] sending: {msg}");
        conn.write_all(msg.as_bytes()).await?;
        conn.shutdown().await?;

        let mut reply = Vec::new();
        conn.read_to_end(&mut reply).await?;
        println!("[client] received: {}", String::from_utf8_lossy(&reply));
    }

    closer.close();
    server.await??;
    println!("done!");

    Ok(())
}
