//! Flatten an [`AnalyzeResult`] into plain JSON output.
//!
//! Nothing in here can fail. Anything the service left out shows up as an
//! empty list or a `null`.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde_json::Map;

use crate::{
    analysis::{
        AnalyzeResult, AnalyzedDocument, BoundingRegion, DocumentField,
        DocumentKeyValueElement, DocumentKeyValuePair, DocumentLanguage, DocumentSpan,
        DocumentStyle, DocumentTable, FieldValue,
    },
    prelude::*,
};

/// A line of text and where it is.
#[derive(Clone, Debug, JsonSchema, PartialEq, Serialize)]
pub struct LineCoords {
    /// 1-based page number.
    pub page: u32,

    /// Position of this line within its page, starting at 0.
    pub line_index: usize,

    pub text: String,

    /// Flat list of `x, y` coordinates for the bounding polygon.
    pub polygon: Vec<f64>,
}

/// A word and where it is.
#[derive(Clone, Debug, JsonSchema, PartialEq, Serialize)]
pub struct WordCoords {
    /// 1-based page number.
    pub page: u32,

    /// Position of this word within its page, starting at 0.
    pub word_index: usize,

    pub text: String,

    /// Flat list of `x, y` coordinates for the bounding polygon.
    pub polygon: Vec<f64>,
}

/// Words and lines with coordinates.
#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct CoordsOutput {
    pub words: Vec<WordCoords>,
    pub lines: Vec<LineCoords>,
}

/// Everything we report from a field-extraction model.
#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct FullOutput {
    pub api_version: Option<String>,
    pub model_id: Option<String>,

    /// All the text in the document. May be large.
    pub content: Option<String>,

    pub pages: Vec<PageSummary>,
    pub tables: Vec<NormalizedTable>,
    pub key_value_pairs: Vec<NormalizedKeyValuePair>,
    pub styles: Vec<NormalizedStyle>,

    /// Empty unless the service was asked to detect languages.
    pub languages: Vec<NormalizedLanguage>,

    pub documents: Vec<NormalizedDocument>,
}

/// Page size and orientation.
#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct PageSummary {
    pub page_number: u32,
    pub angle: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Clone, Debug, JsonSchema, PartialEq, Serialize)]
pub struct NormalizedRegion {
    pub page_number: u32,
    pub polygon: Vec<f64>,
}

#[derive(Clone, Debug, JsonSchema, PartialEq, Serialize)]
pub struct NormalizedSpan {
    pub offset: usize,
    pub length: usize,
}

/// A table and its cells, in the order the service returned them.
#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct NormalizedTable {
    pub row_count: usize,
    pub column_count: usize,
    pub cells: Vec<NormalizedTableCell>,
    pub bounding_regions: Vec<NormalizedRegion>,
}

#[derive(Clone, Debug, JsonSchema, PartialEq, Serialize)]
pub struct NormalizedTableCell {
    /// `content` unless this is a header or description cell.
    pub kind: String,
    pub row_index: usize,
    pub column_index: usize,
    pub row_span: usize,
    pub column_span: usize,
    pub content: String,
}

#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct NormalizedStyle {
    pub is_handwritten: Option<bool>,
    pub confidence: Option<f64>,
    pub spans: Vec<NormalizedSpan>,
}

#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct NormalizedLanguage {
    pub locale: String,
    pub confidence: Option<f64>,
    pub spans: Vec<NormalizedSpan>,
}

/// One side of a key-value pair.
#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct NormalizedKeyValueElement {
    pub content: String,
    pub bounding_regions: Vec<NormalizedRegion>,
}

/// A generic key-value pair.
#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct NormalizedKeyValuePair {
    pub key: Option<NormalizedKeyValueElement>,
    pub value: Option<NormalizedKeyValueElement>,
    pub confidence: Option<f64>,
}

/// A recognized document instance.
#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct NormalizedDocument {
    pub doc_type: String,
    pub bounding_regions: Vec<NormalizedRegion>,
    pub spans: Vec<NormalizedSpan>,
    pub confidence: Option<f64>,
    pub fields: BTreeMap<String, NormalizedField>,
}

/// A typed document field.
#[derive(Clone, Debug, JsonSchema, PartialEq, Serialize)]
pub struct NormalizedField {
    /// The service's type tag, e.g. `string` or `currency`.
    #[serde(rename = "type")]
    pub type_tag: String,

    /// The typed value, or `null` for types we don't surface.
    pub value: Value,

    pub content: Option<String>,
    pub bounding_regions: Vec<NormalizedRegion>,
    pub spans: Vec<NormalizedSpan>,
    pub confidence: Option<f64>,
}

/// Every line on every page, in order.
pub fn extract_lines(result: &AnalyzeResult) -> Vec<LineCoords> {
    let lines = result
        .pages
        .iter()
        .flat_map(|page| {
            page.lines
                .iter()
                .enumerate()
                .map(|(line_index, line)| LineCoords {
                    page: page.page_number,
                    line_index,
                    text: line.content.clone(),
                    polygon: line.polygon.clone(),
                })
        })
        .collect::<Vec<_>>();
    debug!(count = lines.len(), "Extracted lines");
    lines
}

/// Every word on every page, in order.
pub fn extract_words(result: &AnalyzeResult) -> Vec<WordCoords> {
    let words = result
        .pages
        .iter()
        .flat_map(|page| {
            page.words
                .iter()
                .enumerate()
                .map(|(word_index, word)| WordCoords {
                    page: page.page_number,
                    word_index,
                    text: word.content.clone(),
                    polygon: word.polygon.clone(),
                })
        })
        .collect::<Vec<_>>();
    debug!(count = words.len(), "Extracted words");
    words
}

/// Words and lines with coordinates.
pub fn coords_output(result: &AnalyzeResult) -> CoordsOutput {
    CoordsOutput {
        words: extract_words(result),
        lines: extract_lines(result),
    }
}

/// Scalars, page summaries, key-value pairs and documents.
pub fn full_output(result: &AnalyzeResult) -> FullOutput {
    FullOutput {
        api_version: result.api_version.clone(),
        model_id: result.model_id.clone(),
        content: result.content.clone(),
        pages: result
            .pages
            .iter()
            .map(|page| PageSummary {
                page_number: page.page_number,
                angle: page.angle,
                width: page.width,
                height: page.height,
                unit: page.unit.clone(),
            })
            .collect(),
        tables: result.tables.iter().map(normalize_table).collect(),
        key_value_pairs: result.key_value_pairs.iter().map(normalize_pair).collect(),
        styles: result.styles.iter().map(normalize_style).collect(),
        languages: result.languages.iter().map(normalize_language).collect(),
        documents: result.documents.iter().map(normalize_document).collect(),
    }
}

fn normalize_table(table: &DocumentTable) -> NormalizedTable {
    NormalizedTable {
        row_count: table.row_count,
        column_count: table.column_count,
        cells: table
            .cells
            .iter()
            .map(|cell| NormalizedTableCell {
                kind: cell.kind.clone().unwrap_or_else(|| "content".to_owned()),
                row_index: cell.row_index,
                column_index: cell.column_index,
                row_span: cell.row_span.unwrap_or(1),
                column_span: cell.column_span.unwrap_or(1),
                content: cell.content.clone(),
            })
            .collect(),
        bounding_regions: regions(&table.bounding_regions),
    }
}

fn normalize_style(style: &DocumentStyle) -> NormalizedStyle {
    NormalizedStyle {
        is_handwritten: style.is_handwritten,
        confidence: style.confidence,
        spans: spans(&style.spans),
    }
}

fn normalize_language(language: &DocumentLanguage) -> NormalizedLanguage {
    NormalizedLanguage {
        locale: language.locale.clone(),
        confidence: language.confidence,
        spans: spans(&language.spans),
    }
}

fn normalize_pair(pair: &DocumentKeyValuePair) -> NormalizedKeyValuePair {
    let element = |element: &DocumentKeyValueElement| NormalizedKeyValueElement {
        content: element.content.clone(),
        bounding_regions: regions(&element.bounding_regions),
    };
    NormalizedKeyValuePair {
        key: pair.key.as_ref().map(element),
        value: pair.value.as_ref().map(element),
        confidence: pair.confidence,
    }
}

fn normalize_document(doc: &AnalyzedDocument) -> NormalizedDocument {
    debug!(doc_type = %doc.doc_type, fields = doc.fields.len(), "Normalizing document");
    NormalizedDocument {
        doc_type: doc.doc_type.clone(),
        bounding_regions: regions(&doc.bounding_regions),
        spans: spans(&doc.spans),
        confidence: doc.confidence,
        fields: doc
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), normalize_field(field)))
            .collect(),
    }
}

/// Normalize a single field. The type tag picks which value we surface.
pub fn normalize_field(field: &DocumentField) -> NormalizedField {
    NormalizedField {
        type_tag: field.type_tag.clone(),
        value: field_value(&field.value),
        content: field.content.clone(),
        bounding_regions: regions(&field.bounding_regions),
        spans: spans(&field.spans),
        confidence: field.confidence,
    }
}

/// Convert a typed value to JSON. Lists and dictionaries only report the
/// content of their items, not their full structure.
fn field_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::String(s)
        | FieldValue::PhoneNumber(s)
        | FieldValue::SelectionMark(s)
        | FieldValue::CountryRegion(s)
        | FieldValue::Signature(s) => json!(s),
        FieldValue::Date(date) => json!(date.map(|d| d.format("%Y-%m-%d").to_string())),
        FieldValue::Time(time) => json!(time.map(|t| t.format("%H:%M:%S%.f").to_string())),
        FieldValue::Number(n) => json!(n),
        FieldValue::Integer(n) => json!(n),
        FieldValue::List(items) => {
            Value::Array(items.iter().map(|item| json!(item.content)).collect())
        }
        FieldValue::Dictionary(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, entry)| (key.clone(), json!(entry.content)))
                .collect::<Map<String, Value>>(),
        ),
        FieldValue::Unrecognized => Value::Null,
    }
}

fn regions(regions: &[BoundingRegion]) -> Vec<NormalizedRegion> {
    regions
        .iter()
        .map(|region| NormalizedRegion {
            page_number: region.page_number,
            polygon: region.polygon.clone(),
        })
        .collect()
}

fn spans(spans: &[DocumentSpan]) -> Vec<NormalizedSpan> {
    spans
        .iter()
        .map(|span| NormalizedSpan {
            offset: span.offset,
            length: span.length,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DocumentLine, DocumentPage, tests::sample_invoice_result};

    fn field(value: Value) -> DocumentField {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_result() {
        let result = AnalyzeResult::default();
        let coords = coords_output(&result);
        assert!(coords.words.is_empty());
        assert!(coords.lines.is_empty());

        let full = full_output(&result);
        assert!(full.pages.is_empty());
        assert!(full.tables.is_empty());
        assert!(full.key_value_pairs.is_empty());
        assert!(full.styles.is_empty());
        assert!(full.languages.is_empty());
        assert!(full.documents.is_empty());
        assert_eq!(full.content, None);
    }

    #[test]
    fn test_pages_without_lines_or_words() {
        let result: AnalyzeResult = serde_json::from_value(json!({
            "pages": [{ "pageNumber": 1 }, { "pageNumber": 2, "lines": [] }],
            "documents": [{ "docType": "invoice" }],
        }))
        .unwrap();
        assert!(extract_lines(&result).is_empty());
        assert!(extract_words(&result).is_empty());
        let full = full_output(&result);
        assert_eq!(full.pages.len(), 2);
        assert!(full.documents[0].fields.is_empty());
        assert!(full.documents[0].bounding_regions.is_empty());
    }

    #[test]
    fn test_line_indices_are_per_page() {
        let line = |text: &str| DocumentLine {
            content: text.to_owned(),
            polygon: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
        };
        let result = AnalyzeResult {
            pages: vec![
                DocumentPage {
                    page_number: 1,
                    lines: vec![line("first"), line("second"), line("third")],
                    ..Default::default()
                },
                DocumentPage {
                    page_number: 2,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let lines = extract_lines(&result);
        assert_eq!(lines.len(), 3);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line.page, 1);
            assert_eq!(line.line_index, i);
        }
        let texts = lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn test_word_indices_restart_on_each_page() {
        let result: AnalyzeResult = serde_json::from_value(json!({
            "pages": [
                { "pageNumber": 1, "words": [{ "content": "a" }, { "content": "b" }] },
                { "pageNumber": 2, "words": [{ "content": "c" }] },
            ],
        }))
        .unwrap();
        let words = extract_words(&result);
        let got = words
            .iter()
            .map(|w| (w.page, w.word_index, w.text.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(got, [(1, 0, "a"), (1, 1, "b"), (2, 0, "c")]);
        assert!(words[0].polygon.is_empty());
    }

    #[test]
    fn test_unrecognized_type_keeps_other_attributes() {
        let normalized = normalize_field(&field(json!({
            "type": "address",
            "valueAddress": { "city": "Redmond" },
            "content": "1 Microsoft Way, Redmond",
            "confidence": 0.8,
            "boundingRegions": [{ "pageNumber": 2, "polygon": [1.0, 2.0, 3.0, 4.0] }],
        })));
        assert_eq!(normalized.type_tag, "address");
        assert_eq!(normalized.value, Value::Null);
        assert_eq!(normalized.content.as_deref(), Some("1 Microsoft Way, Redmond"));
        assert_eq!(normalized.confidence, Some(0.8));
        assert_eq!(
            normalized.bounding_regions,
            vec![NormalizedRegion {
                page_number: 2,
                polygon: vec![1.0, 2.0, 3.0, 4.0],
            }]
        );
    }

    #[test]
    fn test_typed_values() {
        let cases = [
            (json!({ "type": "string", "valueString": "hi" }), json!("hi")),
            (json!({ "type": "date", "valueDate": "2025-04-23" }), json!("2025-04-23")),
            (json!({ "type": "time", "valueTime": "13:59:00" }), json!("13:59:00")),
            (
                json!({ "type": "time", "valueTime": "08:30:15.25" }),
                json!("08:30:15.250"),
            ),
            (
                json!({ "type": "phoneNumber", "valuePhoneNumber": "+15555550100" }),
                json!("+15555550100"),
            ),
            (json!({ "type": "number", "valueNumber": 12.5 }), json!(12.5)),
            (json!({ "type": "integer", "valueInteger": 7 }), json!(7)),
            (
                json!({ "type": "selectionMark", "valueSelectionMark": "selected" }),
                json!("selected"),
            ),
            (
                json!({ "type": "countryRegion", "valueCountryRegion": "USA" }),
                json!("USA"),
            ),
            (
                json!({ "type": "signature", "valueSignature": "signed" }),
                json!("signed"),
            ),
            (json!({ "type": "string" }), Value::Null),
            (json!({ "type": "boolean", "valueBoolean": true }), Value::Null),
        ];
        for (input, expected) in cases {
            let normalized = normalize_field(&field(input.clone()));
            assert_eq!(normalized.value, expected, "for {input}");
        }
    }

    #[test]
    fn test_list_and_dictionary_values() {
        let list = normalize_field(&field(json!({
            "type": "array",
            "valueArray": [
                { "type": "string", "content": "one" },
                { "type": "string" },
            ],
        })));
        assert_eq!(list.value, json!(["one", null]));

        let dict = normalize_field(&field(json!({
            "type": "object",
            "valueObject": {
                "Amount": { "type": "currency", "content": "$10.00" },
                "Description": { "type": "string", "content": "Widgets" },
            },
        })));
        assert_eq!(
            dict.value,
            json!({ "Amount": "$10.00", "Description": "Widgets" })
        );
    }

    #[test]
    fn test_full_output_of_invoice() {
        let result: AnalyzeResult =
            serde_json::from_value(sample_invoice_result()).unwrap();
        let full = serde_json::to_value(full_output(&result)).unwrap();

        assert_eq!(full["model_id"], "prebuilt-invoice");
        assert_eq!(full["pages"][0]["unit"], "inch");
        assert_eq!(full["key_value_pairs"][0]["key"]["content"], "Invoice No:");
        assert_eq!(full["key_value_pairs"][0]["value"]["content"], "INV-100");
        assert_eq!(full["languages"], json!([]));
        assert_eq!(full["styles"][0]["is_handwritten"], true);
        assert_eq!(full["tables"][0]["row_count"], 2);
        assert_eq!(
            full["tables"][0]["cells"][3],
            json!({
                "kind": "content",
                "row_index": 1,
                "column_index": 1,
                "row_span": 1,
                "column_span": 1,
                "content": "$110.00",
            })
        );
        assert_eq!(full["tables"][0]["cells"][0]["kind"], "columnHeader");

        let doc = &full["documents"][0];
        assert_eq!(doc["doc_type"], "invoice");
        assert_eq!(doc["spans"], json!([{ "offset": 0, "length": 28 }]));
        assert_eq!(doc["fields"]["InvoiceId"]["type"], "string");
        assert_eq!(doc["fields"]["InvoiceId"]["value"], "INV-100");
        assert_eq!(doc["fields"]["InvoiceDate"]["value"], "2019-11-15");
        assert_eq!(doc["fields"]["InvoiceTotal"]["value"], Value::Null);
        assert_eq!(doc["fields"]["InvoiceTotal"]["content"], "$110.00");
        assert_eq!(
            doc["fields"]["Items"]["value"],
            json!(["Consulting 2", "Hosting"])
        );
    }

    #[test]
    fn test_coords_output_shape() {
        let result: AnalyzeResult =
            serde_json::from_value(sample_invoice_result()).unwrap();
        let coords = serde_json::to_value(coords_output(&result)).unwrap();
        assert_eq!(
            coords["lines"][1],
            json!({
                "page": 1,
                "line_index": 1,
                "text": "INVOICE",
                "polygon": [6.0, 0.6, 7.0, 0.6, 7.0, 0.9, 6.0, 0.9],
            })
        );
        assert_eq!(coords["words"][0]["word_index"], 0);
        assert_eq!(coords["words"][1]["text"], "LTD.");
    }
}
