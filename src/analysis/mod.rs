//! Typed view of a Document Intelligence analysis result.
//!
//! These types follow the REST API's JSON (`camelCase` names). We only model
//! the parts we use. Every collection defaults to empty, and nearly every
//! scalar is optional, because which parts show up depends on the model that
//! ran. Unknown JSON keys are ignored.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};

use crate::prelude::*;

pub mod client;

pub use self::client::{
    AnalysisRequest, AzureDocumentAnalyzer, DocumentAnalyzer, DocumentSource,
};

/// The result of a completed analyze operation.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    /// The REST API version that produced this result.
    #[serde(default)]
    pub api_version: Option<String>,

    /// The model that produced this result.
    #[serde(default)]
    pub model_id: Option<String>,

    /// All the text in the document, in reading order.
    #[serde(default)]
    pub content: Option<String>,

    /// Per-page layout.
    #[serde(default)]
    pub pages: Vec<DocumentPage>,

    #[serde(default)]
    pub tables: Vec<DocumentTable>,

    /// Generic key-value pairs, from models which detect them.
    #[serde(default)]
    pub key_value_pairs: Vec<DocumentKeyValuePair>,

    #[serde(default)]
    pub styles: Vec<DocumentStyle>,

    #[serde(default)]
    pub languages: Vec<DocumentLanguage>,

    /// Recognized document instances, from field-extraction models.
    #[serde(default)]
    pub documents: Vec<AnalyzedDocument>,
}

/// A single page.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPage {
    /// 1-based page number.
    #[serde(default)]
    pub page_number: u32,

    /// Text orientation in degrees, clockwise.
    #[serde(default)]
    pub angle: Option<f64>,

    #[serde(default)]
    pub width: Option<f64>,

    #[serde(default)]
    pub height: Option<f64>,

    /// Unit for `width`, `height` and polygon coordinates: `pixel` or `inch`.
    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub lines: Vec<DocumentLine>,

    #[serde(default)]
    pub words: Vec<DocumentWord>,
}

/// A line of text on a page.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLine {
    #[serde(default)]
    pub content: String,

    /// Flat list of `x, y` pairs, usually 4 corners clockwise from top-left.
    #[serde(default)]
    pub polygon: Vec<f64>,
}

/// A single word on a page.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentWord {
    #[serde(default)]
    pub content: String,

    /// Flat list of `x, y` pairs.
    #[serde(default)]
    pub polygon: Vec<f64>,
}

/// A page number and a polygon locating content on that page.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRegion {
    #[serde(default)]
    pub page_number: u32,

    #[serde(default)]
    pub polygon: Vec<f64>,
}

/// A range of characters in [`AnalyzeResult::content`].
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DocumentSpan {
    pub offset: usize,
    pub length: usize,
}

/// A generic key-value pair, as detected by `prebuilt-document` and friends.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentKeyValuePair {
    #[serde(default)]
    pub key: Option<DocumentKeyValueElement>,

    #[serde(default)]
    pub value: Option<DocumentKeyValueElement>,

    #[serde(default)]
    pub confidence: Option<f64>,
}

/// One side of a [`DocumentKeyValuePair`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentKeyValueElement {
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
}

/// A table, from the layout model.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTable {
    #[serde(default)]
    pub row_count: usize,

    #[serde(default)]
    pub column_count: usize,

    #[serde(default)]
    pub cells: Vec<DocumentTableCell>,

    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTableCell {
    /// `content`, `rowHeader`, `columnHeader`, `stubHead` or `description`.
    /// Missing means `content`.
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub row_index: usize,

    #[serde(default)]
    pub column_index: usize,

    #[serde(default)]
    pub row_span: Option<usize>,

    #[serde(default)]
    pub column_span: Option<usize>,

    #[serde(default)]
    pub content: String,
}

/// A text style observed somewhere in the document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStyle {
    #[serde(default)]
    pub is_handwritten: Option<bool>,

    #[serde(default)]
    pub confidence: Option<f64>,

    #[serde(default)]
    pub spans: Vec<DocumentSpan>,
}

/// A detected language. Only present when the `languages` feature ran.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLanguage {
    #[serde(default)]
    pub locale: String,

    #[serde(default)]
    pub confidence: Option<f64>,

    #[serde(default)]
    pub spans: Vec<DocumentSpan>,
}

/// A recognized document instance, such as one invoice.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedDocument {
    /// Document type, e.g. `invoice`.
    #[serde(default)]
    pub doc_type: String,

    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,

    #[serde(default)]
    pub spans: Vec<DocumentSpan>,

    #[serde(default)]
    pub confidence: Option<f64>,

    /// Fields by name. Sorted, so our output is stable.
    #[serde(default)]
    pub fields: BTreeMap<String, DocumentField>,
}

/// A typed, named value extracted from a document.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(from = "RawDocumentField")]
pub struct DocumentField {
    /// The type tag exactly as the service sent it.
    pub type_tag: String,

    /// The interpretation selected by `type_tag`.
    pub value: FieldValue,

    /// The raw text this field was extracted from.
    pub content: Option<String>,

    pub confidence: Option<f64>,

    pub bounding_regions: Vec<BoundingRegion>,

    pub spans: Vec<DocumentSpan>,
}

/// The typed value of a [`DocumentField`]. Exactly one interpretation applies
/// per type tag.
///
/// Scalar payloads are optional because the service leaves them out when a
/// field was found but could not be normalized.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    String(Option<String>),
    Date(Option<NaiveDate>),
    Time(Option<NaiveTime>),
    PhoneNumber(Option<String>),
    Number(Option<f64>),
    Integer(Option<i64>),
    /// `selected` or `unselected`.
    SelectionMark(Option<String>),
    /// ISO 3166-1 alpha-3 code.
    CountryRegion(Option<String>),
    /// `signed` or `unsigned`.
    Signature(Option<String>),
    List(Vec<DocumentField>),
    Dictionary(BTreeMap<String, DocumentField>),
    /// A type we don't surface a value for, such as `currency` or `address`.
    Unrecognized,
}

/// Wire format of a [`DocumentField`]: one `value*` slot per type.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocumentField {
    #[serde(default, rename = "type")]
    type_tag: String,
    #[serde(default)]
    value_string: Option<String>,
    #[serde(default)]
    value_date: Option<String>,
    #[serde(default)]
    value_time: Option<String>,
    #[serde(default)]
    value_phone_number: Option<String>,
    #[serde(default)]
    value_number: Option<f64>,
    #[serde(default)]
    value_integer: Option<i64>,
    #[serde(default)]
    value_selection_mark: Option<String>,
    #[serde(default)]
    value_country_region: Option<String>,
    #[serde(default)]
    value_signature: Option<String>,
    #[serde(default, alias = "valueList")]
    value_array: Option<Vec<DocumentField>>,
    #[serde(default, alias = "valueDictionary")]
    value_object: Option<BTreeMap<String, DocumentField>>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    bounding_regions: Vec<BoundingRegion>,
    #[serde(default)]
    spans: Vec<DocumentSpan>,
}

impl From<RawDocumentField> for DocumentField {
    fn from(raw: RawDocumentField) -> Self {
        // Accept both the REST names and the older snake_case names.
        let value = match raw.type_tag.as_str() {
            "string" => FieldValue::String(raw.value_string),
            "date" => FieldValue::Date(
                raw.value_date
                    .as_deref()
                    .and_then(|s| parse_lenient(s, |s| s.parse::<NaiveDate>())),
            ),
            "time" => FieldValue::Time(
                raw.value_time
                    .as_deref()
                    .and_then(|s| parse_lenient(s, |s| s.parse::<NaiveTime>())),
            ),
            "phoneNumber" | "phone_number" => {
                FieldValue::PhoneNumber(raw.value_phone_number)
            }
            "number" => FieldValue::Number(raw.value_number),
            "integer" => FieldValue::Integer(raw.value_integer),
            "selectionMark" | "selection_mark" => {
                FieldValue::SelectionMark(raw.value_selection_mark)
            }
            "countryRegion" | "country_region" => {
                FieldValue::CountryRegion(raw.value_country_region)
            }
            "signature" => FieldValue::Signature(raw.value_signature),
            "array" | "list" => FieldValue::List(raw.value_array.unwrap_or_default()),
            "object" | "dictionary" => {
                FieldValue::Dictionary(raw.value_object.unwrap_or_default())
            }
            _ => FieldValue::Unrecognized,
        };
        DocumentField {
            type_tag: raw.type_tag,
            value,
            content: raw.content,
            confidence: raw.confidence,
            bounding_regions: raw.bounding_regions,
            spans: raw.spans,
        }
    }
}

/// Parse a date or time, logging and discarding values we can't read.
fn parse_lenient<T, E>(s: &str, parse: impl FnOnce(&str) -> Result<T, E>) -> Option<T>
where
    E: std::fmt::Display,
{
    match parse(s) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(value = %s, "Ignoring unparseable field value: {err}");
            None
        }
    }
}
