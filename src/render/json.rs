//! JSON rendering for analyzed documents.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::AnalyzedDocument;

/// Keys only written in detailed output.
const DETAIL_KEYS: [&str; 4] = ["bbox", "row_boxes", "col_boxes", "font_statistics"];

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a document to a JSON value. Bounding boxes and font statistics
/// are kept only when the document was analyzed in detailed mode.
pub fn to_json_value(doc: &AnalyzedDocument) -> Result<Value> {
    let mut value = serde_json::to_value(doc)
        .map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))?;
    if !doc.detailed {
        strip_details(&mut value);
    }
    Ok(value)
}

/// Convert a document to JSON.
pub fn to_json(doc: &AnalyzedDocument, format: JsonFormat) -> Result<String> {
    let value = to_json_value(doc)?;
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(&value),
        JsonFormat::Compact => serde_json::to_string(&value),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

fn strip_details(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in DETAIL_KEYS {
                map.remove(key);
            }
            map.values_mut().for_each(strip_details);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_details),
        _ => {}
    }
}
