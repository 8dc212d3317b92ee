//! Text-run cleanup applied before grouping.
//!
//! Normalises run text (NFKC, bullet glyphs, private-use and replacement
//! characters) and removes overprinted duplicate runs.

use unicode_normalization::UnicodeNormalization;

use crate::model::TextRun;

/// Glyphs rewritten to the standard bullet `•`.
const BULLET_GLYPHS: [char; 12] = ['●', '○', '■', '□', '◆', '◇', '▪', '▫', '►', '▻', '‣', '⁃'];

/// Private-use code points that symbol fonts commonly use for bullets.
const PUA_BULLETS: [char; 5] = ['\u{F0B7}', '\u{F0A7}', '\u{F076}', '\u{F0D8}', '\u{F0FC}'];

/// Runs overlapping this much with an identical run are overprints.
const DUPLICATE_OVERLAP: f32 = 0.9;

/// Cleanup preset levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPreset {
    /// Compatibility normalisation only
    Minimal,
    /// Normalisation, bullet standardisation and character filtering
    #[default]
    Standard,
}

/// Options for run cleanup.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupOptions {
    /// Normalize Unicode to NFKC form (also expands ligatures)
    pub normalize_unicode: bool,

    /// Standardize bullet characters (●, ○, ■ → •)
    pub standardize_bullets: bool,

    /// Remove Private Use Area (PUA) characters
    pub remove_pua: bool,

    /// Remove Unicode replacement character (U+FFFD)
    pub remove_replacement_char: bool,

    /// Drop runs printed twice at the same position
    pub remove_duplicates: bool,
}

impl CleanupOptions {
    /// Create options from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        match preset {
            CleanupPreset::Minimal => Self::minimal(),
            CleanupPreset::Standard => Self::standard(),
        }
    }

    /// Minimal cleanup options.
    pub fn minimal() -> Self {
        Self {
            normalize_unicode: true,
            standardize_bullets: false,
            remove_pua: false,
            remove_replacement_char: false,
            remove_duplicates: false,
        }
    }

    /// Standard cleanup options.
    pub fn standard() -> Self {
        Self {
            normalize_unicode: true,
            standardize_bullets: true,
            remove_pua: true,
            remove_replacement_char: true,
            remove_duplicates: true,
        }
    }
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::standard()
    }
}

/// Whether the text is a single bullet glyph.
pub fn is_bullet_glyph(text: &str) -> bool {
    let mut chars = text.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c == '•' || c == '·' || BULLET_GLYPHS.contains(&c) || c == '-' || c == '–',
        _ => false,
    }
}

/// Clean a single piece of text.
pub fn clean_text(text: &str, options: &CleanupOptions) -> String {
    let mut result: String = if options.standardize_bullets {
        text.chars()
            .map(|c| {
                if BULLET_GLYPHS.contains(&c) || PUA_BULLETS.contains(&c) {
                    '•'
                } else {
                    c
                }
            })
            .collect()
    } else {
        text.to_string()
    };

    if options.normalize_unicode {
        result = result.nfkc().collect();
    }

    if options.remove_pua {
        result = result.chars().filter(|c| !is_private_use(*c)).collect();
    }

    if options.remove_replacement_char {
        result = result.replace('\u{FFFD}', "");
    }

    result
}

fn is_private_use(c: char) -> bool {
    let code = c as u32;
    (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
}

/// Clean run text, map symbol-font single glyphs to bullets, and drop runs
/// left empty or printed twice.
pub fn clean_runs(runs: Vec<TextRun>, options: &CleanupOptions) -> Vec<TextRun> {
    let mut cleaned: Vec<TextRun> = Vec::with_capacity(runs.len());

    for mut run in runs {
        if options.standardize_bullets
            && run.font.is_symbolic()
            && run.text.trim().chars().count() == 1
        {
            run.text = "•".to_string();
        } else {
            run.text = clean_text(&run.text, options);
        }
        if run.text.trim().is_empty() {
            continue;
        }

        if options.remove_duplicates
            && cleaned.iter().any(|kept| {
                kept.text == run.text && kept.bbox.overlap_fraction(&run.bbox) > DUPLICATE_OVERLAP
            })
        {
            log::debug!("Dropping overprinted run {:?}", run.text);
            continue;
        }
        cleaned.push(run);
    }

    cleaned
}
