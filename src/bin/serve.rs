//! Serves the watermark app for local development.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin serve
//! ```
//!
//! Then open <http://localhost:8000> in your browser (one is opened
//! automatically when possible). Stop with Ctrl+C.

use std::{
    env,
    path::{Path, PathBuf},
    process,
};

use watermark_server::{DevServer, STANDALONE_PAGE, ServerConfig, SystemBrowser, launch_browser};

/// Resolves the directory the server binary lives in.
///
/// Serving is anchored there regardless of where the command was invoked
/// from, falling back to the current directory if the executable path
/// cannot be resolved.
fn serving_root() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() {
    let config = ServerConfig::new(serving_root());

    let server = match DevServer::bind(config).await {
        Ok(server) => server,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    let port = server.local_addr().port();
    launch_browser(
        &SystemBrowser,
        &format!("http://localhost:{port}/{STANDALONE_PAGE}"),
    );

    if let Err(err) = server.serve().await {
        eprintln!("{err}");
        process::exit(1);
    }
}
