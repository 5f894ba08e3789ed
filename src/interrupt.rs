//! Ctrl-C handling.
//!
//! The session blocks on stdin, so the signal is awaited on a separate
//! thread with a small tokio runtime. On Ctrl-C the operator gets the
//! farewell and the process exits cleanly; every decision already applied
//! has been committed.

use anyhow::{Context, Result};
use std::io::Write;
use std::thread;
use tracing::{info, warn};

pub const FAREWELL: &str = "Bye!";

pub fn install_ctrl_c_handler() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            if let Err(err) = runtime.block_on(tokio::signal::ctrl_c()) {
                warn!(error = %err, "could not listen for Ctrl-C");
                return;
            }
            info!("operator interrupted session");
            let mut stdout = std::io::stdout();
            let _ = writeln!(stdout, "\n{}", FAREWELL);
            let _ = stdout.flush();
            std::process::exit(0);
        })
        .context("Failed to spawn Ctrl-C watcher")?;

    Ok(())
}
