//! End-to-end tests for the upgrade tunnel path.
//!
//! These drive the gateway with real WebSocket clients and raw sockets
//! to pin down the handshake rewrite, preread delivery, and teardown
//! behavior of tunneled connections.

mod common;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, client_async};

use prefix_gateway::config::GatewayConfig;
use prefix_gateway::net::Listener;
use prefix_gateway::{HttpServer, Shutdown};

use common::start_programmable_backend;

fn gateway_config(port: u16) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = format!("127.0.0.1:{}", port);
    for backend in &mut config.backends {
        backend.host = "127.0.0.1".to_string();
    }
    config
}

fn point_backend(config: &mut GatewayConfig, name: &str, port: u16) {
    let backend = config
        .backends
        .iter_mut()
        .find(|b| b.name == name)
        .expect("backend exists in the default config");
    backend.port = port;
}

fn backend_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

async fn start_gateway(config: GatewayConfig) -> Shutdown {
    let server = HttpServer::new(&config).expect("config should compile into a server");
    let listener = Listener::bind(&config.listener)
        .await
        .expect("test port should be free");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

/// Guard against hangs: tunnel bugs tend to stall rather than error.
async fn with_timeout<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("test step timed out")
}

#[tokio::test]
async fn websocket_echo_end_to_end() {
    // Real WebSocket backend that records the handshake it received.
    let listener = TcpListener::bind(backend_addr(28511)).await.unwrap();
    let captured: Arc<Mutex<Option<(String, String)>>> = Arc::new(Mutex::new(None));
    let handshake = captured.clone();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            let host = request
                .headers()
                .get("host")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            handshake
                .lock()
                .unwrap()
                .replace((request.uri().to_string(), host));
            Ok(response)
        };
        let mut ws = accept_hdr_async(stream, callback).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if message.is_text() || message.is_binary() {
                if ws.send(message).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut config = gateway_config(28501);
    point_backend(&mut config, "terminal", 28511);
    let shutdown = start_gateway(config).await;

    let stream = TcpStream::connect("127.0.0.1:28501").await.unwrap();
    let (mut ws, response) = with_timeout(client_async(
        "ws://127.0.0.1:28501/terminal/echo?sid=7",
        stream,
    ))
    .await
    .expect("websocket handshake through the gateway");

    assert_eq!(response.status().as_u16(), 101);
    assert!(response.headers().contains_key("sec-websocket-accept"));

    ws.send(Message::text("ping")).await.unwrap();
    let echoed = with_timeout(ws.next()).await.expect("echo frame").unwrap();
    assert_eq!(echoed.into_text().unwrap().as_str(), "ping");

    // The backend saw the stripped path and its own authority.
    let (uri, host) = captured
        .lock()
        .unwrap()
        .clone()
        .expect("backend saw the handshake");
    assert_eq!(uri, "/echo?sid=7");
    assert_eq!(host, "127.0.0.1:28511");

    let _ = ws.close(None).await;
    shutdown.trigger();
}

#[tokio::test]
async fn handshake_is_rewritten_and_preread_bytes_are_delivered() {
    // Raw upgrade backend: captures the head plus any bytes the client
    // managed to send before the tunnel existed, then echoes one chunk.
    let listener = TcpListener::bind(backend_addr(28512)).await.unwrap();
    let (seen_tx, seen_rx) = tokio::sync::oneshot::channel::<(String, Vec<u8>)>();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut buffer: Vec<u8> = Vec::new();
        let head_end = loop {
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let mut chunk = [0u8; 1024];
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buffer.extend_from_slice(&chunk[..n]);
        };
        while buffer.len() < head_end + 5 {
            let mut chunk = [0u8; 1024];
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buffer.extend_from_slice(&chunk[..n]);
        }

        let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
        let early = buffer[head_end..head_end + 5].to_vec();
        let _ = seen_tx.send((head, early));

        socket
            .write_all(b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: tcp\r\nConnection: Upgrade\r\n\r\n")
            .await
            .unwrap();

        let mut chunk = [0u8; 64];
        if let Ok(n) = socket.read(&mut chunk).await {
            if n > 0 {
                let _ = socket.write_all(&chunk[..n]).await;
            }
        }
    });

    let mut config = gateway_config(28502);
    point_backend(&mut config, "terminal", 28512);
    let shutdown = start_gateway(config).await;

    // Head and first payload bytes arrive in a single write.
    let mut client = TcpStream::connect("127.0.0.1:28502").await.unwrap();
    client
        .write_all(
            b"GET /terminal/session HTTP/1.1\r\n\
              Host: 127.0.0.1:28502\r\n\
              Connection: Upgrade\r\n\
              Upgrade: tcp\r\n\
              Sec-Custom: 1\r\n\
              \r\n\
              EARLY",
        )
        .await
        .unwrap();

    let (head, early) = with_timeout(seen_rx).await.expect("backend saw the upgrade");

    // Path stripped, header order and casing preserved, Host rewritten
    // to the backend authority and moved to the end.
    assert!(head.starts_with("GET /session HTTP/1.1\r\n"), "head was: {}", head);
    assert!(head.ends_with("Host: 127.0.0.1:28512\r\n\r\n"), "head was: {}", head);
    assert_eq!(head.matches("Host:").count(), 1, "head was: {}", head);
    let connection = head.find("Connection: Upgrade").unwrap();
    let upgrade = head.find("Upgrade: tcp").unwrap();
    let custom = head.find("Sec-Custom: 1").unwrap();
    assert!(connection < upgrade && upgrade < custom, "head was: {}", head);
    assert_eq!(early, b"EARLY");

    // The 101 comes back through the relay, then live bytes flow.
    let mut response = Vec::new();
    loop {
        if response.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        let mut chunk = [0u8; 1024];
        let n = with_timeout(client.read(&mut chunk)).await.unwrap();
        assert!(n > 0, "gateway closed before relaying the 101");
        response.extend_from_slice(&chunk[..n]);
    }
    assert!(response.starts_with(b"HTTP/1.1 101"));

    client.write_all(b"MORE!").await.unwrap();
    let mut echo = [0u8; 5];
    with_timeout(client.read_exact(&mut echo)).await.unwrap();
    assert_eq!(&echo, b"MORE!");

    shutdown.trigger();
}

#[tokio::test]
async fn backend_close_propagates_to_the_client() {
    // Backend accepts the upgrade, then hangs up right after the 101.
    let listener = TcpListener::bind(backend_addr(28514)).await.unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut buffer: Vec<u8> = Vec::new();
        while !buffer.windows(4).any(|w| w == b"\r\n\r\n") {
            let mut chunk = [0u8; 1024];
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buffer.extend_from_slice(&chunk[..n]);
        }

        let _ = socket
            .write_all(b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: tcp\r\nConnection: Upgrade\r\n\r\n")
            .await;
    });

    let mut config = gateway_config(28505);
    point_backend(&mut config, "terminal", 28514);
    let shutdown = start_gateway(config).await;

    let mut client = TcpStream::connect("127.0.0.1:28505").await.unwrap();
    client
        .write_all(
            b"GET /terminal/x HTTP/1.1\r\n\
              Host: 127.0.0.1:28505\r\n\
              Connection: Upgrade\r\n\
              Upgrade: tcp\r\n\
              \r\n",
        )
        .await
        .unwrap();

    let mut response = Vec::new();
    loop {
        let mut chunk = [0u8; 1024];
        match with_timeout(client.read(&mut chunk)).await {
            Ok(0) | Err(_) => break,
            Ok(n) => response.extend_from_slice(&chunk[..n]),
        }
    }
    // The 101 made it through, then the close was relayed promptly.
    assert!(
        response.starts_with(b"HTTP/1.1 101"),
        "response was: {}",
        String::from_utf8_lossy(&response)
    );

    shutdown.trigger();
}

#[tokio::test]
async fn upgrade_on_a_plain_route_closes_without_contacting_the_backend() {
    let hits = Arc::new(AtomicUsize::new(0));
    let backend_hits = hits.clone();
    start_programmable_backend(backend_addr(28513), move |_| {
        let backend_hits = backend_hits.clone();
        async move {
            backend_hits.fetch_add(1, Ordering::SeqCst);
            (200, "ok".to_string())
        }
    })
    .await;

    let mut config = gateway_config(28503);
    point_backend(&mut config, "chat", 28513);
    let shutdown = start_gateway(config).await;

    let mut socket = TcpStream::connect("127.0.0.1:28503").await.unwrap();
    socket
        .write_all(
            b"GET /chat/live HTTP/1.1\r\n\
              Host: 127.0.0.1:28503\r\n\
              Connection: Upgrade\r\n\
              Upgrade: websocket\r\n\
              \r\n",
        )
        .await
        .unwrap();

    let mut buf = [0u8; 64];
    match with_timeout(socket.read(&mut buf)).await {
        Ok(0) | Err(_) => {}
        Ok(n) => panic!(
            "expected the socket to close, got: {}",
            String::from_utf8_lossy(&buf[..n])
        ),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_upgrade_backend_closes_the_client_socket() {
    let mut config = gateway_config(28504);
    // Port 28599 is never bound, so the tunnel connect is refused.
    point_backend(&mut config, "terminal", 28599);
    let shutdown = start_gateway(config).await;

    let mut socket = TcpStream::connect("127.0.0.1:28504").await.unwrap();
    socket
        .write_all(
            b"GET /terminal/x HTTP/1.1\r\n\
              Host: 127.0.0.1:28504\r\n\
              Connection: Upgrade\r\n\
              Upgrade: websocket\r\n\
              \r\n",
        )
        .await
        .unwrap();

    // Tunnel failures never produce an HTTP response, the socket just
    // goes away.
    let mut buf = [0u8; 64];
    match with_timeout(socket.read(&mut buf)).await {
        Ok(0) | Err(_) => {}
        Ok(n) => panic!(
            "expected the socket to close, got: {}",
            String::from_utf8_lossy(&buf[..n])
        ),
    }

    shutdown.trigger();
}
