//! List assembly.
//!
//! Consecutive text blocks whose first line starts with a label of one
//! family (bullets, decimal numbers, letters, roman numerals) with rising
//! values collapse into a [`TextList`]. Single labelled blocks stay plain
//! text blocks.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{LayoutElement, LayoutElementGroup, TextBlock, TextList, TextListItem};

/// Smallest indent of an unlabelled continuation block, in points.
const CONTINUATION_MIN_INDENT: f32 = 5.0;

/// Largest indent of an unlabelled continuation block, in points.
const CONTINUATION_MAX_INDENT: f32 = 30.0;

fn label_regex() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^\s*
            (?:
                (?P<bullet>[•·\-–*‣⁃])
              | \(\s*(?P<paren>[0-9]{1,3}|[a-zA-Z]|[ivxlcdm]{1,7}|[IVXLCDM]{1,7})\s*\)
              | (?P<bare>[0-9]{1,3}|[a-zA-Z]|[ivxlcdm]{1,7}|[IVXLCDM]{1,7})[.)]
            )
            (?:\s|$)",
        )
        .expect("label pattern is valid")
    })
}

/// Numbering scheme of a list label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelFamily {
    Bullet,
    Decimal,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl LabelFamily {
    /// Whether items of this family count upwards.
    pub fn is_enumerable(&self) -> bool {
        !matches!(self, LabelFamily::Bullet)
    }
}

/// A label found at the start of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// The label as printed, without surrounding whitespace
    pub text: String,

    /// Every reading of the label with its value; single letters such as
    /// `i` or `v` read as both a letter and a roman numeral
    pub readings: Vec<(LabelFamily, u32)>,

    /// Characters the label occupies after leading whitespace
    pub char_len: usize,
}

/// Recognise a list label at the start of `text`.
pub fn parse_label(text: &str) -> Option<Label> {
    let caps = label_regex().captures(text)?;

    let readings = if caps.name("bullet").is_some() {
        vec![(LabelFamily::Bullet, 0)]
    } else {
        let token = caps.name("paren").or_else(|| caps.name("bare"))?;
        readings_of(token.as_str())
    };
    if readings.is_empty() {
        return None;
    }

    let text = caps.get(0)?.as_str().trim().to_string();
    Some(Label {
        char_len: text.chars().count(),
        text,
        readings,
    })
}

fn readings_of(token: &str) -> Vec<(LabelFamily, u32)> {
    let mut readings = Vec::new();

    if let Ok(n) = token.parse::<u32>() {
        readings.push((LabelFamily::Decimal, n));
        return readings;
    }

    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_lowercase() {
            readings.push((LabelFamily::LowerAlpha, c as u32 - 'a' as u32 + 1));
        } else if c.is_ascii_uppercase() {
            readings.push((LabelFamily::UpperAlpha, c as u32 - 'A' as u32 + 1));
        }
    }

    if let Some(value) = roman_value(token) {
        if token.chars().all(|c| c.is_ascii_lowercase()) {
            readings.push((LabelFamily::LowerRoman, value));
        } else if token.chars().all(|c| c.is_ascii_uppercase()) {
            readings.push((LabelFamily::UpperRoman, value));
        }
    }

    readings
}

/// Value of a well-formed roman numeral.
fn roman_value(token: &str) -> Option<u32> {
    let digit = |c: char| match c.to_ascii_lowercase() {
        'i' => Some(1),
        'v' => Some(5),
        'x' => Some(10),
        'l' => Some(50),
        'c' => Some(100),
        'd' => Some(500),
        'm' => Some(1000),
        _ => None,
    };
    let values: Vec<u32> = token.chars().map(digit).collect::<Option<_>>()?;
    let mut total = 0;
    for (i, v) in values.iter().enumerate() {
        match values.get(i + 1) {
            Some(next) if next > v => total -= *v as i64,
            _ => total += *v as i64,
        }
    }
    let total = u32::try_from(total).ok().filter(|t| *t > 0)?;
    // Reject non-canonical forms such as "iiii" or "vx".
    if to_roman(total).eq_ignore_ascii_case(token) {
        Some(total)
    } else {
        None
    }
}

fn to_roman(mut num: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (value, numeral) in TABLE {
        while num >= value {
            out.push_str(numeral);
            num -= value;
        }
    }
    out
}

/// One labelled block inside a run being assembled.
struct PendingItem {
    label: String,
    label_x: f32,
    blocks: Vec<TextBlock>,
}

/// Collapses labelled block runs into lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListAssembler;

impl ListAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble lists in an ordered element sequence, including inside
    /// asides and sections.
    pub fn assemble(&self, elements: Vec<LayoutElement>) -> Vec<LayoutElement> {
        let mut out: Vec<LayoutElement> = Vec::with_capacity(elements.len());
        let mut run: Vec<PendingItem> = Vec::new();
        let mut families: Vec<(LabelFamily, u32)> = Vec::new();

        for element in elements {
            let element = self.descend(element);

            let block = match element {
                LayoutElement::TextBlock(block) if !block.is_heading() => block,
                other => {
                    flush(&mut out, &mut run, &families);
                    families.clear();
                    out.push(other);
                    continue;
                }
            };

            let label = block.lines().first().and_then(|l| parse_label(&l.text()));

            match label {
                Some(label) => {
                    let continuing: Vec<(LabelFamily, u32)> = if run.is_empty() {
                        Vec::new()
                    } else {
                        label
                            .readings
                            .iter()
                            .copied()
                            .filter(|(family, value)| {
                                families.iter().any(|(f, prev)| {
                                    f == family
                                        && (*family == LabelFamily::Bullet || value > prev)
                                })
                            })
                            .collect()
                    };

                    if continuing.is_empty() {
                        flush(&mut out, &mut run, &families);
                        families = label.readings.clone();
                    } else {
                        families = continuing;
                    }
                    run.push(PendingItem {
                        label: label.text.clone(),
                        label_x: block.bbox().x0(),
                        blocks: vec![block],
                    });
                }
                None => {
                    let indent = run
                        .last()
                        .map(|item| block.bbox().x0() - item.label_x)
                        .unwrap_or(0.0);
                    if (CONTINUATION_MIN_INDENT..=CONTINUATION_MAX_INDENT).contains(&indent) {
                        if let Some(item) = run.last_mut() {
                            item.blocks.push(block);
                        }
                    } else {
                        flush(&mut out, &mut run, &families);
                        families.clear();
                        out.push(LayoutElement::TextBlock(block));
                    }
                }
            }
        }
        flush(&mut out, &mut run, &families);
        out
    }

    /// Assemble lists inside container elements.
    fn descend(&self, element: LayoutElement) -> LayoutElement {
        match element {
            LayoutElement::Aside(mut aside) => {
                // The aside keeps its content if the assembled items are rejected.
                let items = self.assemble(aside.items().to_vec());
                if let Err(e) = aside.replace_items(items) {
                    log::warn!("List assembly inside aside failed: {}", e);
                }
                LayoutElement::Aside(aside)
            }
            LayoutElement::Section(mut section) => {
                section.items = self.assemble(std::mem::take(&mut section.items));
                LayoutElement::Section(section)
            }
            other => other,
        }
    }
}

/// Emit the pending run: two or more items become a list, a single item
/// goes back as plain blocks.
fn flush(out: &mut Vec<LayoutElement>, run: &mut Vec<PendingItem>, families: &[(LabelFamily, u32)]) {
    if run.is_empty() {
        return;
    }
    if run.len() < 2 {
        for item in run.drain(..) {
            out.extend(item.blocks.into_iter().map(LayoutElement::TextBlock));
        }
        return;
    }

    let ordered = families
        .first()
        .map(|(family, _)| family.is_enumerable())
        .unwrap_or(false);
    log::debug!("Assembled list of {} items (ordered={})", run.len(), ordered);

    let items = run
        .drain(..)
        .map(|item| {
            let mut elements: Vec<LayoutElement> = Vec::with_capacity(item.blocks.len());
            for (i, block) in item.blocks.into_iter().enumerate() {
                let block = if i == 0 {
                    strip_label(block, item.label.chars().count())
                } else {
                    Some(block)
                };
                if let Some(block) = block {
                    elements.push(LayoutElement::TextBlock(block));
                }
            }
            TextListItem::new(item.label, elements)
        })
        .collect();
    out.push(LayoutElement::TextList(TextList::new(ordered, items)));
}

/// Remove the label from the block's first line.
fn strip_label(block: TextBlock, label_chars: usize) -> Option<TextBlock> {
    let mut lines = block.lines().to_vec();
    if lines.is_empty() {
        return None;
    }
    let first = lines.remove(0);
    if let Some(stripped) = first.strip_prefix_chars(label_chars) {
        lines.insert(0, stripped);
    }
    TextBlock::new(block.kind(), lines)
}
