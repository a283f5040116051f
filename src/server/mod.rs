//! Development HTTP server.
//!
//! Serves the output directory with live reload and optional reverse-proxy
//! rules. The server runs on background worker threads so the caller can go
//! on to watch sources.

pub mod files;
pub mod proxy;
pub mod reload;

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::config::ServerConfig;
use files::{content_type, is_html, resolve, Resolved};
use proxy::Proxy;
pub use reload::{ReloadHandle, RELOAD_PATH};

/// Number of threads answering requests.
const WORKERS: usize = 4;

/// Error starting or running the dev server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listening socket
    #[error("Failed to start server on {addr}: {message}")]
    Bind { addr: String, message: String },
    /// Served directory is missing
    #[error("Output directory not found: {0}")]
    MissingRoot(PathBuf),
    /// HTTP client for proxy rules could not be built
    #[error("Failed to create proxy client: {0}")]
    ProxyClient(#[from] reqwest::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

type HttpResponse = Response<Cursor<Vec<u8>>>;

/// Request handling state shared by the workers.
struct Site {
    root: PathBuf,
    livereload: bool,
    reload: ReloadHandle,
    proxy: Proxy,
}

/// A running dev server. Dropping it stops the workers.
pub struct DevServer {
    addr: SocketAddr,
    server: Arc<Server>,
    stopping: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl DevServer {
    /// Bind and start serving `root` in the background.
    pub fn start(
        config: &ServerConfig,
        root: PathBuf,
        reload: ReloadHandle,
    ) -> Result<Self, ServerError> {
        if !root.is_dir() {
            return Err(ServerError::MissingRoot(root));
        }

        let addr = format!("{}:{}", config.host, config.port);
        let server = Server::http(&addr)
            .map_err(|e| ServerError::Bind { addr: addr.clone(), message: e.to_string() })?;
        let bound = server.server_addr().to_ip().ok_or_else(|| ServerError::Bind {
            addr: addr.clone(),
            message: "not an IP listener".to_string(),
        })?;

        let server = Arc::new(server);
        let stopping = Arc::new(AtomicBool::new(false));
        let site = Arc::new(Site {
            root,
            livereload: config.livereload,
            reload,
            proxy: Proxy::new(config.proxy.clone())?,
        });

        let workers = (0..WORKERS)
            .map(|_| {
                let server = Arc::clone(&server);
                let stopping = Arc::clone(&stopping);
                let site = Arc::clone(&site);
                std::thread::spawn(move || serve_loop(&server, &stopping, &site))
            })
            .collect();

        log::info!("serving {} at http://{}", site.root.display(), bound);
        if !site.proxy.is_empty() {
            log::info!("proxying {} prefix rule(s)", config.proxy.len());
        }
        if config.open {
            open_browser(&format!("http://{}", bound));
        }

        Ok(Self { addr: bound, server, stopping, workers })
    }

    /// Address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Block until the server stops.
    pub fn join(mut self) {
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }

    /// Stop accepting requests and wait for the workers.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        for _ in 0..self.workers.len() {
            self.server.unblock();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn serve_loop(server: &Server, stopping: &AtomicBool, site: &Site) {
    while !stopping.load(Ordering::SeqCst) {
        match server.recv_timeout(Duration::from_millis(250)) {
            Ok(Some(request)) => handle_request(site, request),
            Ok(None) => {}
            Err(e) => {
                log::warn!("server: {}", e);
                break;
            }
        }
    }
}

fn handle_request(site: &Site, mut request: Request) {
    let url = request.url().to_string();

    let response = if let Some(rule) = site.proxy.rule_for(&url) {
        let rule = rule.clone();
        site.proxy.forward(&rule, &mut request)
    } else if url.split('?').next() == Some(RELOAD_PATH) {
        json_response(site.reload.status_json())
    } else if matches!(request.method(), Method::Get | Method::Head) {
        serve_static(site, &url)
    } else {
        text_response(405, "Method Not Allowed")
    };

    log::debug!("{} {} -> {}", request.method(), url, response.status_code().0);
    if let Err(e) = request.respond(response) {
        log::debug!("server: failed to respond: {}", e);
    }
}

fn serve_static(site: &Site, url: &str) -> HttpResponse {
    let path = match resolve(&site.root, url) {
        Resolved::File(path) => path,
        Resolved::NotFound => return text_response(404, "Not Found"),
        Resolved::Forbidden => return text_response(403, "Forbidden"),
    };

    let mut body = match std::fs::read(&path) {
        Ok(body) => body,
        Err(e) => {
            log::warn!("server: failed to read {}: {}", path.display(), e);
            return text_response(500, "Internal Server Error");
        }
    };

    if site.livereload && is_html(&path) {
        if let Ok(html) = std::str::from_utf8(&body) {
            body = reload::inject(html).into_bytes();
        }
    }

    with_headers(
        Response::from_data(body),
        &[("Content-Type", content_type(&path)), ("Cache-Control", "no-cache")],
    )
}

fn json_response(body: String) -> HttpResponse {
    with_headers(
        Response::from_data(body.into_bytes()),
        &[("Content-Type", "application/json"), ("Cache-Control", "no-store")],
    )
}

fn text_response(status: u16, message: &str) -> HttpResponse {
    with_headers(
        Response::from_data(message.as_bytes().to_vec()).with_status_code(StatusCode(status)),
        &[("Content-Type", "text/plain; charset=utf-8")],
    )
}

fn with_headers(mut response: HttpResponse, headers: &[(&str, &str)]) -> HttpResponse {
    for (name, value) in headers {
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            response.add_header(header);
        }
    }
    response
}

fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let _ = std::process::Command::new("open").arg(url).spawn();

    #[cfg(target_os = "linux")]
    let _ = std::process::Command::new("xdg-open").arg(url).spawn();

    #[cfg(target_os = "windows")]
    let _ = std::process::Command::new("cmd").args(["/c", "start", url]).spawn();
}
