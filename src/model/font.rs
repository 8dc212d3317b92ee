//! Font metadata attached to text runs.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Sizes closer than this are treated as the same size.
pub const SIZE_EPSILON: f32 = 0.25;

/// Font information for a run of text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FontInfo {
    /// Font name as reported by the reader (e.g., "Helvetica-Bold")
    pub name: String,

    /// Font family (e.g., "Helvetica"); inferred from the name when empty
    #[serde(default)]
    pub family: String,

    /// Font size in points, rounded to 0.1
    pub size: f32,

    /// Fill colour as 0xRRGGBB
    #[serde(default, alias = "colour")]
    pub color: u32,

    #[serde(default)]
    pub bold: bool,

    #[serde(default)]
    pub italic: bool,

    #[serde(default)]
    pub superscript: bool,

    #[serde(default)]
    pub small_caps: bool,
}

impl FontInfo {
    /// Create font info from a name and size, inferring family and style.
    pub fn new(name: impl Into<String>, size: f32) -> Self {
        Self {
            name: name.into(),
            family: String::new(),
            size,
            color: 0,
            bold: false,
            italic: false,
            superscript: false,
            small_caps: false,
        }
        .normalized()
    }

    /// Mark as bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Mark as italic.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Mark as superscript.
    pub fn superscript(mut self) -> Self {
        self.superscript = true;
        self
    }

    /// Set the fill colour.
    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    /// Fill in the family, round the size, and infer style flags from the name.
    pub fn normalized(mut self) -> Self {
        if self.family.is_empty() {
            self.family = family_of(&self.name);
        }
        self.size = (self.size * 10.0).round() / 10.0;

        let lower = self.name.to_lowercase();
        if lower.contains("bold") || lower.contains("black") || lower.contains("heavy") {
            self.bold = true;
        }
        if lower.contains("italic") || lower.contains("oblique") {
            self.italic = true;
        }
        self
    }

    /// Whether two fonts render text the same way for grouping purposes.
    pub fn is_equivalent(&self, other: &FontInfo) -> bool {
        self.family == other.family
            && (self.size - other.size).abs() < SIZE_EPSILON
            && self.bold == other.bold
            && self.italic == other.italic
            && self.superscript == other.superscript
            && self.small_caps == other.small_caps
    }

    /// Whether this is a symbol font whose glyphs do not map to text.
    pub fn is_symbolic(&self) -> bool {
        let lower = self.family.to_lowercase();
        lower.contains("wingdings") || lower.contains("symbol") || lower.contains("dingbat")
    }
}

/// Infer a family from a font name: drop the subset tag, then cut at the
/// first `-` or `_`.
fn family_of(name: &str) -> String {
    let base = match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => {
            rest
        }
        _ => name,
    };
    let base = base.split('-').next().unwrap_or(base);
    let base = base.split('_').next().unwrap_or(base);
    base.to_string()
}

impl Serialize for FontInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FontInfo", 9)?;
        state.serialize_field("name", "font")?;
        state.serialize_field("font", &self.name)?;
        state.serialize_field("family", &self.family)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("colour", &self.color)?;
        state.serialize_field("bold", &self.bold)?;
        state.serialize_field("italic", &self.italic)?;
        state.serialize_field("superscript", &self.superscript)?;
        state.serialize_field("small_caps", &self.small_caps)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_inference() {
        assert_eq!(FontInfo::new("Helvetica-Bold", 12.0).family, "Helvetica");
        assert_eq!(FontInfo::new("ABCDEF+Times_Roman", 12.0).family, "Times");
        assert_eq!(FontInfo::new("Arial", 12.0).family, "Arial");
        assert_eq!(FontInfo::new("Ab+Weird", 12.0).family, "Ab+Weird");
    }

    #[test]
    fn test_style_from_name() {
        let font = FontInfo::new("Helvetica-BoldOblique", 10.0);
        assert!(font.bold);
        assert!(font.italic);

        let font = FontInfo::new("Helvetica", 10.0);
        assert!(!font.bold);
        assert!(!font.italic);
    }

    #[test]
    fn test_size_rounding() {
        let font = FontInfo::new("Helvetica", 11.96);
        assert!((font.size - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_equivalence() {
        let a = FontInfo::new("Helvetica", 12.0);
        let b = FontInfo::new("Helvetica-Light", 12.1);
        let c = FontInfo::new("Helvetica-Bold", 12.0);
        let d = FontInfo::new("Helvetica", 14.0);

        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
        assert!(!a.is_equivalent(&d));
    }

    #[test]
    fn test_serialized_shape() {
        let font = FontInfo::new("Helvetica-Bold", 12.0);
        let value = serde_json::to_value(&font).unwrap();
        assert_eq!(value["name"], "font");
        assert_eq!(value["font"], "Helvetica-Bold");
        assert_eq!(value["family"], "Helvetica");
        assert_eq!(value["bold"], true);
    }

    #[test]
    fn test_deserialize_reader_font() {
        let font: FontInfo =
            serde_json::from_str(r#"{"name": "Times-Italic", "size": 9.5}"#).unwrap();
        let font = font.normalized();
        assert_eq!(font.family, "Times");
        assert!(font.italic);
        assert_eq!(font.color, 0);
    }
}
