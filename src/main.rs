//! Ensures the SCH certified-products archive is cached locally and prints its
//! path.
//!
//! Configuration is provided via `SCH_*` environment variables parsed by
//! [`OrthoConfig`](https://github.com/leynos/ortho-config). Logs go to stderr
//! and honour `RUST_LOG`. The binary exits with status code `0` on success,
//! `130` when interrupted with Ctrl-C and `1` on any other error.

use std::io::{self, Write};
use std::process::ExitCode;

use color_eyre::eyre::{Context, Result};
use sch_datasets::{AcquireErrorKind, Acquirer, CancelToken, DatasetsCfg};
use tracing_subscriber::EnvFilter;

const INTERRUPTED_EXIT: u8 = 130;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    init_tracing();
    sch_datasets::install_interrupt_handler().context("failed to install SIGINT handler")?;

    let cfg = DatasetsCfg::load().context("failed to load configuration via OrthoConfig")?;
    let options = cfg.to_options()?;
    let transport = cfg.to_transport()?;
    let acquirer = Acquirer::new(transport).with_cancel(CancelToken::interruptible());

    match acquirer.acquire(&cfg.to_dataset(), &options) {
        Ok(path) => {
            writeln!(io::stdout().lock(), "{path}")?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.kind() == AcquireErrorKind::Cancelled => {
            tracing::warn!("{err}");
            Ok(ExitCode::from(INTERRUPTED_EXIT))
        }
        Err(err) => Err(err.into()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
