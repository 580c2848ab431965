use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{prelude::*, ui::Ui};

mod analysis;
mod cmd;
mod config;
mod models;
mod normalize;
mod output;
mod prelude;
mod server;
mod ui;

/// Send documents to Azure Document Intelligence and reshape the results.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT: The resource endpoint URL.
  - AZURE_DOCUMENT_INTELLIGENCE_KEY: The resource key.
  - AZURE_DOCUMENT_INTELLIGENCE_API_VERSION (optional): Override the
    REST API version.
  - RUST_LOG (optional): Log filter, such as `debug` or
    `docintel_gateway=trace`.

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Run an HTTP server that forwards uploads for analysis.
    Serve(cmd::serve::ServeOpts),
    /// Print the words and lines of a PDF with their coordinates.
    Coords(cmd::coords::CoordsOpts),
    /// Print the text, key-value pairs and document fields of a PDF.
    Extract(cmd::extract::ExtractOpts),
    /// Print schemas for our output formats.
    Schema(cmd::schema::SchemaOpts),
}

impl Cmd {
    /// Should we hide the spinner?
    ///
    /// The server logs instead, and JSON on stdout shouldn't be mixed with
    /// terminal escapes.
    fn hide_progress_bars(&self) -> bool {
        match self {
            Cmd::Serve(_) => true,
            Cmd::Coords(opts) => opts.json && opts.output_path.is_none(),
            Cmd::Extract(opts) => opts.json && opts.output_path.is_none(),
            Cmd::Schema(_) => true,
        }
    }
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);

    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Load environment variables from a `.env` file, if it exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments.
    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    if opts.subcmd.hide_progress_bars() {
        ui.hide_progress_bars();
    }

    match &opts.subcmd {
        Cmd::Serve(opts) => cmd::serve::cmd_serve(opts).await?,
        Cmd::Coords(opts) => cmd::coords::cmd_coords(&ui, opts).await?,
        Cmd::Extract(opts) => cmd::extract::cmd_extract(&ui, opts).await?,
        Cmd::Schema(schema_opts) => cmd::schema::cmd_schema(schema_opts).await?,
    }
    Ok(())
}
