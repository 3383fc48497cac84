//! Minimal in-process HTTP server standing in for the release feed.
//!
//! Serves a fixed route table over plain HTTP/1.1 and records every
//! request path, so tests can assert which assets were (not) fetched.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Routes = Arc<Mutex<HashMap<String, Vec<u8>>>>;
type Requests = Arc<Mutex<Vec<String>>>;

/// One release to publish on the stub feed.
pub struct ReleaseSpec {
    /// Tag name, e.g. `core-v1.3.0`.
    pub tag: String,
    /// Asset name/body pairs.
    pub assets: Vec<(String, Vec<u8>)>,
    /// Publish a `checksums.txt` manifest for the assets.
    pub with_manifest: bool,
    /// Corrupt the manifest digest for this asset name, if set.
    pub corrupt_digest_for: Option<String>,
}

impl ReleaseSpec {
    /// A release with a correct checksum manifest.
    pub fn new(tag: &str, assets: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            tag: tag.to_string(),
            assets,
            with_manifest: true,
            corrupt_digest_for: None,
        }
    }
}

/// In-process stub release feed.
pub struct StubFeed {
    addr: SocketAddr,
    routes: Routes,
    requests: Requests,
    handle: tokio::task::JoinHandle<()>,
}

impl StubFeed {
    /// Bind to an ephemeral local port and start serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let requests: Requests = Arc::new(Mutex::new(Vec::new()));
        let handle = tokio::spawn(serve(listener, Arc::clone(&routes), Arc::clone(&requests)));
        Self {
            addr,
            routes,
            requests,
            handle,
        }
    }

    /// The release-list endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("http://{}/releases", self.addr)
    }

    /// Publish the given releases: asset routes, per-release manifests,
    /// and the `/releases` JSON list (ordered as given, newest first).
    pub fn publish(&self, specs: &[ReleaseSpec]) {
        let mut releases = Vec::new();
        let mut routes = self.routes.lock().unwrap();

        for spec in specs {
            let mut asset_entries = Vec::new();
            let mut manifest = String::new();

            for (name, body) in &spec.assets {
                let path = format!("/dl/{}/{name}", spec.tag);
                routes.insert(path.clone(), body.clone());
                asset_entries.push(serde_json::json!({
                    "name": name,
                    "browser_download_url": format!("http://{}{path}", self.addr),
                }));

                let mut digest = hex::encode(Sha256::digest(body));
                if spec.corrupt_digest_for.as_deref() == Some(name.as_str()) {
                    digest = "0".repeat(64);
                }
                manifest.push_str(&format!("{name}  {digest}\n"));
            }

            if spec.with_manifest {
                let path = format!("/dl/{}/checksums.txt", spec.tag);
                routes.insert(path.clone(), manifest.into_bytes());
                asset_entries.push(serde_json::json!({
                    "name": "checksums.txt",
                    "browser_download_url": format!("http://{}{path}", self.addr),
                }));
            }

            releases.push(serde_json::json!({
                "tag_name": spec.tag,
                "assets": asset_entries,
            }));
        }

        let body = serde_json::to_vec(&releases).unwrap();
        routes.insert("/releases".to_string(), body);
    }

    /// Replace the `/releases` body with arbitrary bytes (for malformed
    /// feed tests).
    pub fn set_releases_raw(&self, body: &[u8]) {
        self.routes
            .lock()
            .unwrap()
            .insert("/releases".to_string(), body.to_vec());
    }

    /// Every request line (`METHOD /path`) seen so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubFeed {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(listener: TcpListener, routes: Routes, requests: Requests) {
    loop {
        let Ok((socket, _)) = listener.accept().await else {
            break;
        };
        let routes = Arc::clone(&routes);
        let requests = Arc::clone(&requests);
        tokio::spawn(async move {
            let _ = handle_connection(socket, &routes, &requests).await;
        });
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    routes: &Routes,
    requests: &Requests,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; 8192];
    let mut read = 0;
    loop {
        let n = socket.read(&mut buf[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") || read == buf.len() {
            break;
        }
    }

    let head = String::from_utf8_lossy(&buf[..read]);
    let mut parts = head.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();
    requests.lock().unwrap().push(format!("{method} {path}"));

    let body = routes.lock().unwrap().get(&path).cloned();
    let response = match body {
        Some(body) => {
            let mut response = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            )
            .into_bytes();
            if method != "HEAD" {
                response.extend_from_slice(&body);
            }
            response
        }
        None => {
            b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_vec()
        }
    };
    socket.write_all(&response).await?;
    socket.shutdown().await
}
