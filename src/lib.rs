//! # Watermark Server
//!
//! A small development HTTP server for the watermark web app.
//!
//! It serves static files from a configured root directory, stamps every
//! response with cache-disabling headers so the browser always fetches fresh
//! copies during development, and can open the default browser on the app's
//! standalone entry page at startup.
//!
//! ## Example
//!
//! ```no_run
//! use watermark_server::{DevServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), watermark_server::ServeError> {
//!     let server = DevServer::bind(ServerConfig::new("site")).await?;
//!     server.serve().await
//! }
//! ```

use std::{
    error::Error,
    fmt,
    future::Future,
    io,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use axum::{
    Router,
    http::{HeaderValue, header},
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer};

/// Port the app is served on when no other address is configured.
pub const DEFAULT_PORT: u16 = 8000;

/// Entry page opened in the browser at startup.
pub const STANDALONE_PAGE: &str = "watermark-standalone.html";

/// Alternate entry page advertised in the startup banner.
pub const REACT_PAGE: &str = "index.html";

const CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";
const PRAGMA: &str = "no-cache";
const EXPIRES: &str = "0";

/// Startup configuration for a [`DevServer`].
///
/// Holds the file-serving root and the bind address, so tests can run several
/// independent instances with different roots and ephemeral ports.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    root: PathBuf,
    addr: SocketAddr,
}

impl ServerConfig {
    /// Creates a configuration serving `root` on port 8000, all interfaces.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_addr(root, SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)))
    }

    /// Creates a configuration serving `root` on a specific address.
    pub fn with_addr(root: impl Into<PathBuf>, addr: SocketAddr) -> Self {
        Self {
            root: root.into(),
            addr,
        }
    }
}

/// Errors that can stop the server from starting or running.
#[derive(Debug)]
pub enum ServeError {
    /// The configured port is already bound by another process.
    PortInUse(u16),
    /// Any other OS-level failure while binding the listener.
    Bind(io::Error),
    /// An I/O failure inside the serve loop.
    Serve(io::Error),
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortInUse(port) => write!(
                f,
                "port {port} is already in use, close the other application or change the port"
            ),
            Self::Bind(err) => write!(f, "failed to start the server: {err}"),
            Self::Serve(err) => write!(f, "server error: {err}"),
        }
    }
}

impl Error for ServeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PortInUse(_) => None,
            Self::Bind(err) | Self::Serve(err) => Some(err),
        }
    }
}

/// Opens a URL in some viewer, typically the default web browser.
///
/// Kept behind a trait so tests and headless environments can substitute a
/// no-op implementation.
pub trait BrowserLauncher {
    /// Attempts to open `url`.
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Launches the host's default browser.
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

/// A launcher that does nothing, for tests and headless use.
pub struct NoBrowser;

impl BrowserLauncher for NoBrowser {
    fn open(&self, _url: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Tries to open `url` with `launcher`.
///
/// A failure never aborts startup: it degrades to a warning telling the user
/// to open the page manually.
pub fn launch_browser(launcher: &dyn BrowserLauncher, url: &str) {
    match launcher.open(url) {
        Ok(()) => println!("Opened {url} in your browser"),
        Err(why) => {
            eprintln!("Could not open a browser automatically ({why}), open {url} manually")
        }
    }
}

/// Builds the request-handling router for a serving root.
///
/// All paths fall through to [`ServeDir`]; file resolution, content types,
/// and error statuses (404, 403) are entirely its business. The only
/// customization is the cache-disabling header set, applied to every
/// response regardless of status so the browser never reuses a stale copy.
pub fn router(root: impl AsRef<Path>) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root.as_ref()))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static(PRAGMA),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static(EXPIRES),
        ))
}

/// A bound development server, ready to serve.
///
/// Owns the listener for its whole lifetime; the socket is released when the
/// serve future resolves, whichever way it exits.
pub struct DevServer {
    listener: TcpListener,
    addr: SocketAddr,
    root: PathBuf,
}

impl DevServer {
    /// Binds a listener on the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::PortInUse`] when the port is already bound, and
    /// [`ServeError::Bind`] for any other OS failure. Bind failures are
    /// fatal; there is no retry or alternate-port fallback.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServeError> {
        let listener = TcpListener::bind(config.addr).await.map_err(|err| {
            if err.kind() == io::ErrorKind::AddrInUse {
                ServeError::PortInUse(config.addr.port())
            } else {
                ServeError::Bind(err)
            }
        })?;
        let addr = listener.local_addr().map_err(ServeError::Bind)?;

        Ok(Self {
            listener,
            addr,
            root: config.root,
        })
    }

    /// Returns the address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Prints the startup banner and serves until Ctrl+C.
    ///
    /// Interrupt is the normal way to stop the server, not an error: a
    /// farewell line is printed and `Ok(())` returned.
    pub async fn serve(self) -> Result<(), ServeError> {
        let port = self.addr.port();
        println!("Watermark app server started");
        println!("Local address: http://localhost:{port}");
        println!("Standalone version: http://localhost:{port}/{STANDALONE_PAGE}");
        println!("React version: http://localhost:{port}/{REACT_PAGE}");
        println!("Press Ctrl+C to stop the server");

        self.serve_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

        println!("Server stopped");
        Ok(())
    }

    /// Serves until the `shutdown` future resolves.
    pub async fn serve_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServeError> {
        let app = router(&self.root);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServeError::Serve)
    }
}
