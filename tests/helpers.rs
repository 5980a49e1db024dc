// Shared test helpers: stub HTTP servers for the integration suite.
//
// Each server binds 127.0.0.1:0 and returns its base URL. They speak just
// enough raw HTTP/1.1 for reqwest to parse, which keeps full control over
// pathological behavior (stalling, dripping) without extra dependencies.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned response served by the happy-path stub.
const OK_RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok";

/// Initializes test logging once; safe to call from every test.
#[allow(dead_code)] // Used by other test files
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Starts a stub server that answers every request with `200 OK` / body `ok`.
#[allow(dead_code)] // Used by other test files
pub async fn start_ok_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("Failed to get stub address");

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                // Read the request head before answering; some clients drop
                // responses that arrive before the request is fully sent.
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(OK_RESPONSE).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Starts a stub server that accepts connections and never writes a byte.
///
/// Connections are held open, so a client sits waiting for a response head
/// until it gives up or is cancelled.
#[allow(dead_code)] // Used by other test files
pub async fn start_stalled_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("Failed to get stub address");

    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            held.push(socket);
        }
    });

    format!("http://{}", addr)
}

/// Starts a stub server that sends the response head immediately, then drips
/// the body one byte at a time with `delay` between bytes.
#[allow(dead_code)] // Used by other test files
pub async fn start_drip_server(body: &'static [u8], delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("Failed to get stub address");

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                    body.len()
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for byte in body {
                    tokio::time::sleep(delay).await;
                    if socket.write_all(&[*byte]).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}
