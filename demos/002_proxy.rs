//! Proxy and subprotocol demonstration.
//!
//! Demonstrates:
//! - Routing the handshake through an HTTP CONNECT proxy
//! - Offering subprotocols and reading the negotiated one
//! - Read timeout as a liveness bound
//!
//! Note: Requires an HTTP proxy to fully verify functionality.
//!
//! Usage:
//!   cargo run --example 002_proxy -- --url wss://host/ws --proxy http://127.0.0.1:3128
//!   cargo run --example 002_proxy -- --no-wait
//!   cargo run --example 002_proxy -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use common::Args;
use ws_socket::{ConnectionOptions, Result, Socket, build_proxy};

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_PROXY: &str = "http://127.0.0.1:3128";
const READ_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 002: Proxy ===\n");

    let proxy_url = args.proxy.as_deref().unwrap_or(DEFAULT_PROXY);

    // ========================================================================
    // Configure
    // ========================================================================

    println!("[1] Configuring...");
    println!("    URL: {}", args.url);
    println!("    Proxy: {proxy_url}");

    let options = ConnectionOptions::new()
        .with_tls_verification(!args.insecure)
        .with_subprotocols(["chat.v2", "chat.v1"])
        .with_proxy(build_proxy(proxy_url)?)
        .with_read_timeout(READ_TIMEOUT);

    let socket = Socket::builder(&args.url).options(options).build();

    socket.on_text_message(|_socket, text| async move {
        println!("    ← {text}");
    });
    socket.on_disconnected(|_socket, error| async move {
        println!("    ✓ Disconnected: {error:?}");
    });

    println!("    ✓ Configured\n");

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[2] Connecting through proxy...");
    socket.connect().await?;
    println!("    ✓ Connected");
    println!("    Subprotocol: {:?}\n", socket.subprotocol());

    socket.send_text("hello through the tunnel").await?;

    common::wait_for_exit(args.no_wait).await;

    println!("[3] Closing...");
    socket.close().await?;

    println!("\n=== Done ===");
    Ok(())
}
