//! Shared utilities for integration testing.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use asset_proxy::config::ProxyConfig;
use asset_proxy::{HttpServer, Shutdown};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// A canned upstream response.
#[allow(dead_code)]
pub struct MockResponse {
    pub status: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Send a Content-Length matching the body.
    pub content_length: bool,
}

#[allow(dead_code)]
impl MockResponse {
    pub fn image(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status: "200 OK",
            headers: vec![("Content-Type".into(), content_type.into())],
            body,
            content_length: true,
        }
    }

    pub fn redirect(location: String) -> Self {
        Self {
            status: "302 Found",
            headers: vec![("Location".into(), location)],
            body: Vec::new(),
            content_length: true,
        }
    }

    pub fn status(status: &'static str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".into(), "image/png".into())],
            body: Vec::new(),
            content_length: true,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn without_content_length(mut self) -> Self {
        self.content_length = false;
        self
    }
}

/// A request as the mock upstream saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    /// Header names lowercased.
    pub headers: Vec<(String, String)>,
}

#[allow(dead_code)]
impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Handle on a running mock upstream.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

#[allow(dead_code)]
impl MockUpstream {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a programmable upstream on an ephemeral port of 127.0.0.1. Every
/// connection serves one request and closes.
pub async fn start_upstream<F>(respond: F) -> MockUpstream
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    start_upstream_on(Ipv4Addr::LOCALHOST, respond).await
}

/// Like [`start_upstream`], bound to another loopback address.
#[allow(dead_code)]
pub async fn start_upstream_on<F>(ip: Ipv4Addr, respond: F) -> MockUpstream
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind((ip, 0)).await.unwrap();
    let upstream = MockUpstream {
        addr: listener.local_addr().unwrap(),
        connections: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let respond = Arc::new(respond);
    let handle = upstream.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            handle.connections.fetch_add(1, Ordering::SeqCst);
            let respond = respond.clone();
            let requests = handle.requests.clone();
            tokio::spawn(async move {
                let (read, mut write) = socket.into_split();
                let mut reader = BufReader::new(read);

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).await.is_err() {
                    return;
                }
                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();

                let mut headers = Vec::new();
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
                    }
                }
                requests.lock().unwrap().push(SeenRequest {
                    path: path.clone(),
                    headers,
                });

                let response = respond(&path);
                let mut head = format!("HTTP/1.1 {}\r\n", response.status);
                for (name, value) in &response.headers {
                    head.push_str(&format!("{}: {}\r\n", name, value));
                }
                if response.content_length {
                    head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
                }
                head.push_str("Connection: close\r\n\r\n");

                let _ = write.write_all(head.as_bytes()).await;
                let _ = write.write_all(&response.body).await;
                let _ = write.shutdown().await;
            });
        }
    });

    upstream
}

/// Start the proxy on an ephemeral port. Returns its address and the
/// coordinator that stops it.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).expect("server builds");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Client for talking to the proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// Hex-encode a target URL for the path form.
pub fn hex(target: &str) -> String {
    target.bytes().map(|b| format!("{:02x}", b)).collect()
}

/// Deterministic image-ish payload.
#[allow(dead_code)]
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
