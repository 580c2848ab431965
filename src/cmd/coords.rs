//! The `coords` subcommand: lines and words with their bounding polygons.

use std::fmt;

use clap::Args;

use crate::{
    models::ModelId,
    normalize::{CoordsOutput, coords_output},
    output::write_json,
    prelude::*,
    ui::Ui,
};

use super::{AnalyzerOpts, analyze_local_file};

/// How many words we print in the report.
const WORDS_TO_SHOW: usize = 10;

/// Command line arguments for `coords`.
#[derive(Debug, Args)]
pub struct CoordsOpts {
    /// The PDF to analyze.
    #[clap(default_value = "input.pdf")]
    pub input_path: PathBuf,

    /// Print the words and lines as JSON instead of a report.
    #[clap(long)]
    pub json: bool,

    /// Where to write JSON output. Defaults to standard output.
    #[clap(short = 'o', long = "out", requires = "json")]
    pub output_path: Option<PathBuf>,

    /// Page of the word to look up, starting at 1.
    #[clap(long, default_value = "1")]
    pub highlight_page: u32,

    /// Position of the word to look up within its page, starting at 0.
    #[clap(long, default_value = "2")]
    pub highlight_word: usize,

    #[clap(flatten)]
    pub analyzer_opts: AnalyzerOpts,
}

/// The `coords` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_coords(ui: &Ui, opts: &CoordsOpts) -> Result<()> {
    let model = ModelId::Layout;
    if !opts.json {
        println!(
            "Analyzing PDF: {} using model: {model}",
            opts.input_path.display()
        );
    }
    let result =
        analyze_local_file(ui, &opts.input_path, model, &opts.analyzer_opts).await?;
    let coords = coords_output(&result);

    if opts.json {
        write_json(opts.output_path.as_deref(), &coords).await
    } else {
        let mut report = String::new();
        write_report(
            &mut report,
            &coords,
            opts.highlight_page,
            opts.highlight_word,
        )?;
        print!("{report}");
        Ok(())
    }
}

/// Write every line, the first few words, and one looked-up word.
fn write_report(
    out: &mut impl fmt::Write,
    coords: &CoordsOutput,
    highlight_page: u32,
    highlight_word: usize,
) -> fmt::Result {
    for line in &coords.lines {
        writeln!(out, "Page {}: '{}' at {:?}", line.page, line.text, line.polygon)?;
    }
    for word in coords.words.iter().take(WORDS_TO_SHOW) {
        writeln!(
            out,
            "Page {} Word {}: '{}' at {:?}",
            word.page, word.word_index, word.text, word.polygon
        )?;
    }

    let found = coords
        .words
        .iter()
        .find(|w| w.page == highlight_page && w.word_index == highlight_word);
    match found {
        Some(word) => writeln!(
            out,
            "\nHighlight example: Page {} Word {}: '{}' at {:?}",
            highlight_page,
            highlight_word + 1,
            word.text,
            word.polygon
        ),
        None => writeln!(
            out,
            "\nNo word found at page {highlight_page} index {highlight_word}"
        ),
    }
}
