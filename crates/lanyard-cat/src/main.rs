//! `lanyard-cat`: connect to a WebSocket URL, send stdin lines, print what
//! comes back.
//!
//! ```bash
//! lanyard-cat ws://127.0.0.1:9000/echo
//! RUST_LOG=lanyard_core=debug lanyard-cat --force-close ws://127.0.0.1:9000
//! ```
//!
//! Exits 0 when the connection closes cleanly and 1 when it fails.

mod cli;

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use lanyard_core::{ChannelDelegate, Endpoint, EndpointError, EndpointEvent, ws::WsTransport};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;

#[derive(Debug, Error)]
enum CatError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("endpoint stopped reporting events")]
    EventsEnded,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter).init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "connection failed");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<(), CatError> {
    let (delegate, mut events) = ChannelDelegate::new();
    let delegate = Arc::new(delegate);
    let endpoint =
        Endpoint::new(args.url.as_str(), WsTransport::new(), &delegate, args.endpoint_config());

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut output = tokio::io::stdout();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    endpoint.open();

    // stdin is only read once the connection is open
    let mut opened = false;
    let mut closing = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(EndpointEvent::Opened) => {
                    info!(url = %args.url, "connected");
                    opened = true;
                },
                Some(EndpointEvent::Message(payload)) => {
                    output.write_all(payload.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                    output.flush().await?;
                },
                Some(EndpointEvent::Closed) => {
                    info!(url = %args.url, "connection closed");
                    return Ok(());
                },
                Some(EndpointEvent::Failed(err)) => return Err(err.into()),
                None => return Err(CatError::EventsEnded),
            },
            line = input.next_line(), if opened && !closing => match line? {
                Some(line) => endpoint.send(line),
                None => {
                    closing = true;
                    endpoint.close(args.force_close);
                },
            },
            interrupted = &mut ctrl_c, if !closing => {
                interrupted?;
                info!("interrupted, closing");
                closing = true;
                endpoint.close(args.force_close);
            },
        }
    }
}
