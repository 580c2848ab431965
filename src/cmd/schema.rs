//! The `schema` subcommand.

use clap::{Args, ValueEnum};
use schemars::schema_for;

use crate::{
    normalize::{CoordsOutput, FullOutput},
    output::write_json,
    prelude::*,
    server::error::ErrorResponse,
};

/// The different schema types we support.
///
/// We parse these as PascalCase, because they represent type names.
#[derive(Debug, Clone, Copy, ValueEnum)]
#[clap(rename_all = "PascalCase")]
pub enum SchemaType {
    /// Words and lines with coordinates (`coords`, `POST /analyze-pdf`).
    CoordsOutput,
    /// Full normalized result (`extract`, `POST /analyze`).
    FullOutput,
    /// HTTP error body.
    ErrorResponse,
}

/// Schema command line arguments.
#[derive(Debug, Args)]
pub struct SchemaOpts {
    /// The schema type to generate.
    #[clap(value_enum, value_name = "TYPE")]
    pub schema_type: SchemaType,

    /// The output path to write the schema to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `schema` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_schema(schema_opts: &SchemaOpts) -> Result<()> {
    let schema = match schema_opts.schema_type {
        SchemaType::CoordsOutput => schema_for!(CoordsOutput),
        SchemaType::FullOutput => schema_for!(FullOutput),
        SchemaType::ErrorResponse => schema_for!(ErrorResponse),
    };
    write_json(schema_opts.output_path.as_deref(), &schema)
        .await
        .context("failed to write schema")
}
