//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One HTTP request as observed by a mock backend.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub target: String,
    pub head: String,
    pub body: Vec<u8>,
}

/// Read a single HTTP/1.1 request off the socket.
///
/// Returns `None` if the peer goes away before a complete request
/// arrives. Body framing is by `Content-Length` only, which is all the
/// gateway's client emits towards backends in these tests.
pub async fn read_request(socket: &mut TcpStream) -> Option<SeenRequest> {
    let mut buffer: Vec<u8> = Vec::new();

    let head_end = loop {
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let mut chunk = [0u8; 1024];
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();

    let content_length = head
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find_map(|(name, value)| {
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buffer.len() < head_end + content_length {
        let mut chunk = [0u8; 1024];
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }

    let mut request_line = head.split("\r\n").next().unwrap_or("").split(' ');
    let method = request_line.next().unwrap_or("").to_string();
    let target = request_line.next().unwrap_or("").to_string();

    Some(SeenRequest {
        method,
        target,
        head,
        body: buffer[head_end..head_end + content_length].to_vec(),
    })
}

/// Start a programmable mock backend.
///
/// The handler receives each parsed request and returns the status and
/// body to answer with. Connections are served until the peer closes, so
/// pooled gateway connections can be reused across requests.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, handler: F)
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        while let Some(request) = read_request(&mut socket).await {
                            let (status, body) = handler(request).await;
                            let status_text = match status {
                                200 => "200 OK",
                                404 => "404 Not Found",
                                429 => "429 Too Many Requests",
                                500 => "500 Internal Server Error",
                                502 => "502 Bad Gateway",
                                503 => "503 Service Unavailable",
                                _ => "200 OK",
                            };

                            let response = format!(
                                "HTTP/1.1 {}\r\nContent-Length: {}\r\n\r\n{}",
                                status_text,
                                body.len(),
                                body
                            );
                            if socket.write_all(response.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a mock backend that answers every request with a fixed 200 body.
#[allow(dead_code)]
pub async fn start_mock_backend(addr: SocketAddr, body: &'static str) {
    start_programmable_backend(addr, move |_| async move { (200, body.to_string()) }).await;
}
