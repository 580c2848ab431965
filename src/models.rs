//! Remote model identifiers.

use std::{fmt, str::FromStr};

use clap::ValueEnum;

use crate::prelude::*;

/// The prebuilt Document Intelligence models we know how to ask for.
///
/// The model decides what the service extracts: text only, layout, generic
/// key-value pairs, or typed fields for a specific kind of document.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    PartialEq,
    Serialize,
    ValueEnum,
)]
pub enum ModelId {
    /// Generic documents, including key-value pairs. Newer API versions
    /// dropped this model, so we run [`ModelId::Layout`] with key-value pairs
    /// turned on instead. See [`ModelId::service_model`].
    #[serde(rename = "prebuilt-document")]
    #[value(name = "prebuilt-document")]
    Document,

    /// Text, selection marks, tables and structure, without fields.
    #[default]
    #[serde(rename = "prebuilt-layout")]
    #[value(name = "prebuilt-layout")]
    Layout,

    /// Invoices.
    #[serde(rename = "prebuilt-invoice")]
    #[value(name = "prebuilt-invoice")]
    Invoice,

    /// Sales receipts.
    #[serde(rename = "prebuilt-receipt")]
    #[value(name = "prebuilt-receipt")]
    Receipt,

    /// Printed and handwritten text only.
    #[serde(rename = "prebuilt-read")]
    #[value(name = "prebuilt-read")]
    Read,
}

impl ModelId {
    /// All the models we support.
    pub const ALL: [ModelId; 5] = [
        ModelId::Document,
        ModelId::Layout,
        ModelId::Invoice,
        ModelId::Receipt,
        ModelId::Read,
    ];

    /// The name the remote service uses for this model.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelId::Document => "prebuilt-document",
            ModelId::Layout => "prebuilt-layout",
            ModelId::Invoice => "prebuilt-invoice",
            ModelId::Receipt => "prebuilt-receipt",
            ModelId::Read => "prebuilt-read",
        }
    }
}

impl ModelId {
    /// The model we actually ask the service to run.
    pub fn service_model(self) -> ModelId {
        match self {
            ModelId::Document => ModelId::Layout,
            other => other,
        }
    }

    /// Optional analysis features to request, for the `features` query
    /// parameter. Layout only finds key-value pairs when asked.
    pub fn features(self) -> &'static [&'static str] {
        match self {
            ModelId::Document | ModelId::Layout => &["keyValuePairs"],
            ModelId::Invoice | ModelId::Receipt | ModelId::Read => &[],
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ModelId::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| anyhow!("unknown model: {s:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            <ModelId as FromStr>::from_str("prebuilt-invoice").unwrap(),
            ModelId::Invoice
        );
        assert_eq!(<ModelId as FromStr>::from_str("prebuilt-read").unwrap(), ModelId::Read);
        assert!(<ModelId as FromStr>::from_str("prebuilt-tax.us.w2").is_err());
        assert!(<ModelId as FromStr>::from_str("").is_err());
    }

    #[test]
    fn test_service_model_and_features() {
        assert_eq!(ModelId::Document.service_model(), ModelId::Layout);
        assert_eq!(ModelId::Document.features(), ["keyValuePairs"]);
        assert_eq!(ModelId::Layout.features(), ["keyValuePairs"]);
        assert_eq!(ModelId::Invoice.service_model(), ModelId::Invoice);
        assert!(ModelId::Invoice.features().is_empty());
        assert!(ModelId::Read.features().is_empty());
    }

    #[test]
    fn test_display_matches_serde() {
        for model in ModelId::ALL {
            let json = serde_json::to_value(model).unwrap();
            assert_eq!(json, Value::String(model.to_string()));
        }
    }
}
