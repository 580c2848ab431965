//! The `extract` subcommand: text, key-value pairs and document fields.

use std::fmt;

use clap::Args;

use crate::{
    models::ModelId,
    normalize::{FullOutput, NormalizedRegion, full_output},
    output::write_json,
    prelude::*,
    ui::Ui,
};

use super::{AnalyzerOpts, analyze_local_file};

/// How much of the document's text we print.
const CONTENT_PREVIEW_CHARS: usize = 500;

/// Command line arguments for `extract`.
#[derive(Debug, Args)]
pub struct ExtractOpts {
    /// The PDF to analyze.
    #[clap(default_value = "input.pdf")]
    pub input_path: PathBuf,

    /// The remote model to use.
    #[clap(long, value_enum, default_value_t = ModelId::Layout)]
    pub model: ModelId,

    /// Print the normalized result as JSON instead of a report.
    #[clap(long)]
    pub json: bool,

    /// Where to write JSON output. Defaults to standard output.
    #[clap(short = 'o', long = "out", requires = "json")]
    pub output_path: Option<PathBuf>,

    #[clap(flatten)]
    pub analyzer_opts: AnalyzerOpts,
}

/// The `extract` subcommand.
#[instrument(level = "debug", skip_all, fields(model = %opts.model))]
pub async fn cmd_extract(ui: &Ui, opts: &ExtractOpts) -> Result<()> {
    if !opts.json {
        println!(
            "Analyzing PDF: {} using model: {}",
            opts.input_path.display(),
            opts.model
        );
    }
    let result =
        analyze_local_file(ui, &opts.input_path, opts.model, &opts.analyzer_opts)
            .await?;
    let output = full_output(&result);

    if opts.json {
        write_json(opts.output_path.as_deref(), &output).await
    } else {
        let mut report = String::new();
        write_report(&mut report, &output)?;
        print!("{report}");
        Ok(())
    }
}

/// Write a human-readable summary of a result.
fn write_report(out: &mut impl fmt::Write, output: &FullOutput) -> fmt::Result {
    writeln!(
        out,
        "\n--- Raw Extracted Content (First {CONTENT_PREVIEW_CHARS} chars) ---"
    )?;
    match output.content.as_deref() {
        Some(content) if !content.is_empty() => {
            let preview = content.chars().take(CONTENT_PREVIEW_CHARS).collect::<String>();
            let ellipsis = if content.chars().count() > CONTENT_PREVIEW_CHARS {
                "..."
            } else {
                ""
            };
            writeln!(out, "{preview}{ellipsis}")?;
        }
        _ => writeln!(out, "No content extracted.")?,
    }

    writeln!(out, "\n--- Extracted Key-Value Pairs ---")?;
    if output.key_value_pairs.is_empty() {
        writeln!(out, "No general key-value pairs found.")?;
    }
    for pair in &output.key_value_pairs {
        let key = pair.key.as_ref().map_or("N/A", |k| k.content.as_str());
        let value = pair.value.as_ref().map_or("N/A", |v| v.content.as_str());
        writeln!(out, "  Key: {key:?} (Confidence: {})", confidence(pair.confidence))?;
        writeln!(out, "  Value: {value:?}")?;
        let regions = pair
            .value
            .as_ref()
            .map(|v| v.bounding_regions.as_slice())
            .unwrap_or_default();
        write_locations(out, "    ", regions)?;
        writeln!(out, "---")?;
    }

    writeln!(out, "\n--- Extracted Document Fields ---")?;
    if output.documents.is_empty() {
        writeln!(
            out,
            "No specific document fields found (this is expected if using prebuilt-layout/read)."
        )?;
    }
    for (idx, doc) in output.documents.iter().enumerate() {
        writeln!(
            out,
            "\nDocument #{} (Type: {}, Confidence: {}):",
            idx + 1,
            doc.doc_type,
            confidence(doc.confidence)
        )?;
        for (name, field) in &doc.fields {
            let text = field.content.as_deref().unwrap_or("N/A");
            writeln!(
                out,
                "  Field: {name:?} (Confidence: {})",
                confidence(field.confidence)
            )?;
            writeln!(out, "  Value: {text:?}")?;
            write_locations(out, "    ", &field.bounding_regions)?;
            writeln!(out, "  ---")?;
        }
    }

    writeln!(out, "\nAnalysis complete!")
}

fn write_locations(
    out: &mut impl fmt::Write,
    indent: &str,
    regions: &[NormalizedRegion],
) -> fmt::Result {
    if regions.is_empty() {
        return writeln!(out, "{indent}-> Location: N/A");
    }
    for region in regions {
        writeln!(
            out,
            "{indent}-> Location: Page #{}, Box: {:?}",
            region.page_number, region.polygon
        )?;
    }
    Ok(())
}

fn confidence(confidence: Option<f64>) -> String {
    match confidence {
        Some(c) => format!("{c:.2}"),
        None => "N/A".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalyzeResult, tests::sample_invoice_result};

    #[test]
    fn test_report_for_invoice() {
        let result: AnalyzeResult =
            serde_json::from_value(sample_invoice_result()).unwrap();
        let mut report = String::new();
        write_report(&mut report, &full_output(&result)).unwrap();

        assert!(report.contains("CONTOSO LTD.\nINVOICE\nINV-100\n"));
        assert!(report.contains("  Key: \"Invoice No:\" (Confidence: 0.91)\n"));
        assert!(report.contains("  Value: \"INV-100\"\n"));
        assert!(report.contains("Document #1 (Type: invoice, Confidence: 1.00):"));
        assert!(report.contains("  Field: \"InvoiceTotal\" (Confidence: 0.95)\n"));
        assert!(report.contains("  Value: \"$110.00\"\n"));
        assert!(report.contains("    -> Location: Page #1, Box: [7.0, 9.0,"));
        // `InvoiceDate` has no bounding regions in the sample.
        assert!(report.contains(
            "  Value: \"11/15/2019\"\n    -> Location: N/A\n"
        ));
        assert!(report.ends_with("\nAnalysis complete!\n"));
    }

    #[test]
    fn test_report_for_empty_result() {
        let mut report = String::new();
        write_report(&mut report, &full_output(&AnalyzeResult::default())).unwrap();
        assert!(report.contains("No content extracted."));
        assert!(report.contains("No general key-value pairs found."));
        assert!(report.contains("No specific document fields found"));
    }

    #[test]
    fn test_long_content_is_truncated() {
        let result = AnalyzeResult {
            content: Some("x".repeat(CONTENT_PREVIEW_CHARS + 1)),
            ..Default::default()
        };
        let mut report = String::new();
        write_report(&mut report, &full_output(&result)).unwrap();
        let expected = format!("{}...\n", "x".repeat(CONTENT_PREVIEW_CHARS));
        assert!(report.contains(&expected));
        assert!(!report.contains(&"x".repeat(CONTENT_PREVIEW_CHARS + 1)));
    }
}
