//! Echo round-trip benchmark suite.
//!
//! Benchmarks against an in-process echo server:
//! - Payload sizes: 16 B, 1 KiB, 64 KiB
//! - Single round-trip latency (send, wait for echo)
//! - Concurrent writers contending for the write lock
//!
//! Run with: cargo bench --bench echo_roundtrip
//! Results saved to: target/criterion/

use std::net::SocketAddr;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::{Mutex, mpsc};
use ws_socket::Socket;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAYLOAD_SIZES: &[usize] = &[16, 1024, 64 * 1024];
const WRITER_COUNTS: &[usize] = &[1, 4, 16];
const FRAMES_PER_WRITER: usize = 32;

// ============================================================================
// Echo Server
// ============================================================================

async fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    if (message.is_text() || message.is_binary()) && ws.send(message).await.is_err()
                    {
                        break;
                    }
                }
            });
        }
    });

    addr
}

async fn connected_socket(addr: SocketAddr) -> (Socket, Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>) {
    let socket = Socket::new(format!("ws://{addr}"));
    let (tx, rx) = mpsc::unbounded_channel();
    socket.on_binary_message(move |_socket, data| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(data);
        }
    });
    socket.connect().await.unwrap();
    (socket, Arc::new(Mutex::new(rx)))
}

// ============================================================================
// Benchmark: Round Trip
// ============================================================================

fn bench_roundtrip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (socket, rx) = rt.block_on(async {
        let addr = start_echo_server().await;
        connected_socket(addr).await
    });

    let mut group = c.benchmark_group("roundtrip");

    for &size in PAYLOAD_SIZES {
        let payload = vec![0xa5_u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("binary", size), &payload, |b, payload| {
            b.to_async(&rt).iter(|| async {
                socket.send_binary(payload.clone()).await.unwrap();
                rx.lock().await.recv().await.unwrap();
            });
        });
    }

    group.finish();
    rt.block_on(socket.close()).unwrap();
}

// ============================================================================
// Benchmark: Concurrent Writers
// ============================================================================

fn bench_concurrent_writers(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (socket, rx) = rt.block_on(async {
        let addr = start_echo_server().await;
        connected_socket(addr).await
    });

    let mut group = c.benchmark_group("concurrent_writers");
    group.sample_size(20);

    for &writers in WRITER_COUNTS {
        group.throughput(Throughput::Elements((writers * FRAMES_PER_WRITER) as u64));
        group.bench_with_input(BenchmarkId::new("writers", writers), &writers, |b, &writers| {
            b.to_async(&rt).iter(|| async {
                let sends: Vec<_> = (0..writers)
                    .map(|_| {
                        let socket = socket.clone();
                        async move {
                            for _ in 0..FRAMES_PER_WRITER {
                                socket.send_binary(vec![0_u8; 256]).await.unwrap();
                            }
                        }
                    })
                    .collect();
                futures_util::future::join_all(sends).await;

                let mut rx = rx.lock().await;
                for _ in 0..writers * FRAMES_PER_WRITER {
                    rx.recv().await.unwrap();
                }
            });
        });
    }

    group.finish();
    rt.block_on(socket.close()).unwrap();
}

criterion_group!(benches, bench_roundtrip, bench_concurrent_writers);
criterion_main!(benches);
