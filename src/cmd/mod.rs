//! Command-line entry points.

use std::time::Duration;

use clap::Args;

use crate::{
    analysis::{
        AnalysisRequest, AnalyzeResult, AzureDocumentAnalyzer, DocumentAnalyzer as _,
        DocumentSource, client::DEFAULT_POLL_INTERVAL,
    },
    config::AzureCredentials,
    models::ModelId,
    prelude::*,
    ui::{ProgressConfig, Ui},
};

pub mod coords;
pub mod extract;
pub mod schema;
pub mod serve;

/// Options for talking to the remote service.
#[derive(Debug, Clone, Args)]
pub struct AnalyzerOpts {
    /// How long to wait between status checks while the remote job runs, in
    /// milliseconds. The service's `retry-after` header takes precedence.
    #[clap(
        long,
        default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64,
        env = "DOCINTEL_POLL_INTERVAL_MS"
    )]
    pub poll_interval_ms: u64,
}

impl AnalyzerOpts {
    /// Our poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Analyze a local file, for the CLI commands.
///
/// Unlike the server, we check for the file and for credentials up front, so
/// the user gets a clear error before anything is sent.
#[instrument(level = "debug", skip(ui, analyzer_opts))]
pub async fn analyze_local_file(
    ui: &Ui,
    path: &Path,
    model: ModelId,
    analyzer_opts: &AnalyzerOpts,
) -> Result<AnalyzeResult> {
    if !path.is_file() {
        return Err(anyhow!("PDF file {:?} not found", path));
    }
    let credentials = AzureCredentials::from_env()?;
    let analyzer =
        AzureDocumentAnalyzer::new(Ok(credentials), analyzer_opts.poll_interval());

    let spinner = ui.new_spinner(&ProgressConfig {
        emoji: "📄",
        msg: "Analyzing document",
        done_msg: "Analyzed document",
    });
    let result = analyzer
        .analyze(AnalysisRequest {
            model,
            document: DocumentSource::Path(path.to_owned()),
        })
        .await
        .with_context(|| format!("Failed to analyze {:?}", path));
    match &result {
        Ok(_) => spinner.finish_using_style(),
        Err(_) => spinner.abandon_with_message("Analysis failed"),
    }
    result
}
