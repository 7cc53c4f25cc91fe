use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use vsock_conn::{server, Addr, LOOPBACK};

#[derive(Parser)]
#[command(name = "vsock-conn", about = "VSOCK address and connection utility")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the device name of an address
    Resolve {
        #[arg(long)]
        cid: u32,
        #[arg(long)]
        port: u32,
    },

    /// Print the context ID of this machine
    LocalCid,

    /// Run an echo server until interrupted
    Echo {
        /// Port to listen on
        #[arg(long)]
        port: u32,

        /// Context ID to bind (defaults to loopback)
        #[arg(long, default_value_t = LOOPBACK)]
        cid: u32,
    },

    /// Connect to a peer, sending stdin and printing what comes back
    Dial {
        #[arg(long)]
        cid: u32,
        #[arg(long)]
        port: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Resolve { cid, port } => {
            println!("{}", Addr::new(cid, port).file_name());
        }
        Command::LocalCid => {
            let cid = vsock_conn::local_context_id().context("reading local context ID")?;
            println!("{cid}");
        }
        Command::Echo { port, cid } => run_echo(Addr::new(cid, port)).await?,
        Command::Dial { cid, port } => run_dial(cid, port).await?,
    }

    Ok(())
}

async fn run_echo(addr: Addr) -> Result<()> {
    let listener = vsock_conn::listen(addr)?;
    let closer = listener.close_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, closing listener");
            closer.close();
        }
    });

    server::serve(listener, server::echo).await?;
    Ok(())
}

async fn run_dial(cid: u32, port: u32) -> Result<()> {
    let conn = vsock_conn::dial(cid, port).await?;
    tracing::info!(peer = %conn.peer_addr(), "connected");

    let (mut reader, mut writer) = tokio::io::split(conn);

    let upload = async {
        let mut stdin = tokio::io::stdin();
        tokio::io::copy(&mut stdin, &mut writer).await?;
        writer.shutdown().await
    };

    let download = async {
        let mut stdout = tokio::io::stdout();
        tokio::io::copy(&mut reader, &mut stdout).await?;
        stdout.flush().await
    };

    tokio::try_join!(upload, download).context("relaying stdin/stdout")?;
    Ok(())
}
