//! The `serve` subcommand.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use clap::Args;

use crate::{
    analysis::AzureDocumentAnalyzer,
    prelude::*,
    server::{AppState, DEFAULT_MAX_UPLOAD_BYTES, ServerVariant, serve},
};

use super::AnalyzerOpts;

/// Command line arguments for `serve`.
#[derive(Debug, Args)]
pub struct ServeOpts {
    /// Which server to run.
    #[clap(long, value_enum, default_value = "fields")]
    pub variant: ServerVariant,

    /// Address to listen on.
    #[clap(long, default_value = "0.0.0.0", env = "DOCINTEL_HOST")]
    pub host: IpAddr,

    /// Port to listen on. Defaults to 8000 for `coords` and 5000 for `fields`.
    #[clap(long, env = "DOCINTEL_PORT")]
    pub port: Option<u16>,

    /// Directory holding `index.html` and its JS, CSS and PDF assets.
    #[clap(long, default_value = ".", env = "DOCINTEL_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// Directory for temporary copies of uploads. Defaults to the system
    /// temporary directory.
    #[clap(long, env = "DOCINTEL_UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Largest upload we accept, in bytes.
    #[clap(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    #[clap(flatten)]
    pub analyzer_opts: AnalyzerOpts,
}

/// The `serve` subcommand.
///
/// Missing credentials don't stop the server from starting. They're logged
/// now and reported to each caller.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_serve(opts: &ServeOpts) -> Result<()> {
    let analyzer = AzureDocumentAnalyzer::from_env(opts.analyzer_opts.poll_interval());
    let state = AppState {
        static_dir: opts.static_dir.clone(),
        upload_dir: opts.upload_dir.clone(),
        max_upload_bytes: opts.max_upload_bytes,
        ..AppState::new(Arc::new(analyzer))
    };
    let port = opts.port.unwrap_or_else(|| opts.variant.default_port());
    serve(SocketAddr::new(opts.host, port), opts.variant, state).await
}
