//! Gr0G bridge binary for BlueZ hosts.
//!
//! Wires the control-daemon clients into the attribute tree, walks the
//! bootstrap sequence against the host BlueZ stack, then serves GATT
//! requests until shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use gr0g_bridge::advertisement::Advertisement;
use gr0g_bridge::service::{Application, Service};
use gr0g_bridge::stack::{PairingAgent, PeripheralStack};
use gr0g_bridge::{bootstrap, RestClient, RpcClient};

mod stack;

use stack::BlueZStack;

#[derive(Parser)]
#[command(name = "gr0g")]
#[command(about = "BLE GATT bridge for the Gr0G grow chamber")]
struct Cli {
    /// Base URL of the control daemon's REST surface
    #[arg(long, default_value = "http://127.0.0.1:8732")]
    rest_url: String,

    /// Path of the control daemon's RPC socket
    #[arg(long, default_value = "/run/gr0g/control.sock")]
    rpc_socket: PathBuf,

    /// Per-call backend timeout in milliseconds
    #[arg(long, default_value = "2000")]
    backend_timeout_ms: u64,

    /// Mount the fan characteristic (requires the fan relay)
    #[arg(long)]
    with_fan: bool,

    /// Log filter, tracing syntax (e.g. "info,gr0g_bridge=debug")
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cli.log))
        .init();

    let timeout = Duration::from_millis(cli.backend_timeout_ms);
    let rpc = Arc::new(RpcClient::new(&cli.rpc_socket, timeout));
    let service = if cli.with_fan {
        let rest = Arc::new(RestClient::new(&cli.rest_url, timeout)?);
        Service::status_with_fan(rest, rpc)
    } else {
        Service::status(rpc)
    };
    let application = Arc::new(Application::new(service));

    let mut stack = BlueZStack::new().await?;
    let agent = PairingAgent::default();
    bootstrap::run(&mut stack, Advertisement::gr0g(), application, &agent).await?;

    stack.serve().await?;
    Ok(())
}
