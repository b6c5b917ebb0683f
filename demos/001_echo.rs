//! Echo round-trip demonstration.
//!
//! Demonstrates:
//! - Registering lifecycle and message callbacks
//! - Connecting with custom headers
//! - Sending text and binary frames
//! - Closing from the caller
//!
//! Usage:
//!   cargo run --example 001_echo -- --url ws://127.0.0.1:9001
//!   cargo run --example 001_echo -- --url wss://host/ws --insecure
//!   cargo run --example 001_echo -- --no-wait
//!   cargo run --example 001_echo -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::sleep;

use common::Args;
use ws_socket::{Result, Socket};

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
    println!("=== 001: Echo ===\n");

    // ========================================================================
    // Configure Socket
    // ========================================================================

    println!("[1] Configuring socket...");
    println!("    URL: {}", args.url);

    let socket = Socket::builder(&args.url)
        .header("User-Agent", "ws-socket-demo/0.1")
        .tls_verification(!args.insecure)
        .build();

    socket.on_connected(|_socket| async move {
        println!("    ✓ Connected");
    });
    socket.on_connect_error(|_socket, error| async move {
        println!("    ✗ Connect error: {error}");
    });
    socket.on_text_message(|_socket, text| async move {
        println!("    ← text: {text}");
    });
    socket.on_binary_message(|_socket, data| async move {
        println!("    ← binary: {} bytes", data.len());
    });
    socket.on_ping_received(|_socket, payload| async move {
        println!("    ← ping ({} bytes)", payload.len());
    });
    socket.on_disconnected(|_socket, error| async move {
        match error {
            Some(e) => println!("    ✓ Disconnected: {e}"),
            None => println!("    ✓ Disconnected"),
        }
    });

    println!("    ✓ Socket ready\n");

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[2] Connecting...");
    socket.connect().await?;
    println!();

    // ========================================================================
    // Send
    // ========================================================================

    println!("[3] Sending frames...");
    socket.send_text("ping").await?;
    socket.send_binary(vec![0xde, 0xad, 0xbe, 0xef]).await?;
    sleep(Duration::from_millis(500)).await;
    println!();

    common::wait_for_exit(args.no_wait).await;

    // ========================================================================
    // Close
    // ========================================================================

    println!("[4] Closing...");
    socket.close().await?;

    println!("\n=== Done ===");
    Ok(())
}
