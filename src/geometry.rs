//! Bounding-box algebra used by every layout stage.
//!
//! Coordinates are page-relative points with the origin at the top-left
//! corner: `x` grows to the right and `y` grows downward. A [`BoundingBox`]
//! can only be built through [`BoundingBox::new`], which rejects non-finite
//! and inverted extents, so every box in the pipeline satisfies
//! `x0 <= x1` and `y0 <= y1`.
//!
//! # Examples
//!
//! ```
//! use pageflow::geometry::BoundingBox;
//!
//! let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
//! let b = BoundingBox::new(5.0, 5.0, 20.0, 20.0).unwrap();
//! assert!(a.overlaps(&b));
//! assert_eq!(a.overlap_fraction(&b), 0.25);
//! assert!(a.merge(&b).contains(&a));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tolerance used by containment checks.
const CONTAIN_EPSILON: f32 = 1e-3;

/// How an overlap length or area is normalised into a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Divide by the smaller of the two boxes
    #[default]
    Min,
    /// Divide by the larger of the two boxes
    Max,
    /// Divide by the box the method is called on
    First,
    /// Divide by the argument box
    Second,
}

/// An axis-aligned rectangle on one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    #[serde(skip)]
    page: usize,
}

impl BoundingBox {
    /// Create a bounding box from its left, top, right and bottom edges.
    ///
    /// Fails when a coordinate is not finite or when an extent is inverted.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Result<Self> {
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidBoundingBox(format!(
                "non-finite coordinate in [{}, {}, {}, {}]",
                x0, y0, x1, y1
            )));
        }
        if x0 > x1 {
            return Err(Error::InvalidBoundingBox(format!(
                "inverted x range {} > {}",
                x0, x1
            )));
        }
        if y0 > y1 {
            return Err(Error::InvalidBoundingBox(format!(
                "inverted y range {} > {}",
                y0, y1
            )));
        }
        Ok(Self {
            x0,
            y0,
            x1,
            y1,
            page: 0,
        })
    }

    /// Create a bounding box from an `[x0, y0, x1, y1]` array.
    pub fn from_array(coords: [f32; 4]) -> Result<Self> {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    /// Tag this box with a 0-based page index.
    pub fn on_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// 0-based page index this box belongs to.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Left edge.
    pub fn x0(&self) -> f32 {
        self.x0
    }

    /// Top edge.
    pub fn y0(&self) -> f32 {
        self.y0
    }

    /// Right edge.
    pub fn x1(&self) -> f32 {
        self.x1
    }

    /// Bottom edge.
    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Horizontal centre.
    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical centre.
    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// Length of the shared x range, zero when disjoint.
    pub fn x_overlap(&self, other: &BoundingBox) -> f32 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    /// Length of the shared y range, zero when disjoint.
    pub fn y_overlap(&self, other: &BoundingBox) -> f32 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }

    /// Shared x range as a fraction of one of the widths.
    pub fn x_overlap_fraction(&self, other: &BoundingBox, norm: Normalization) -> f32 {
        normalise(self.x_overlap(other), self.width(), other.width(), norm)
    }

    /// Shared y range as a fraction of one of the heights.
    pub fn y_overlap_fraction(&self, other: &BoundingBox, norm: Normalization) -> f32 {
        normalise(self.y_overlap(other), self.height(), other.height(), norm)
    }

    /// Area of the intersection, zero when disjoint.
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        self.x_overlap(other) * self.y_overlap(other)
    }

    /// Whether the two boxes share a region of positive area.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.x_overlap(other) > 0.0 && self.y_overlap(other) > 0.0
    }

    /// Intersection area divided by the smaller of the two areas.
    ///
    /// Symmetric and always within `[0, 1]`. Zero-area boxes never overlap.
    pub fn overlap_fraction(&self, other: &BoundingBox) -> f32 {
        self.overlap_with(other, Normalization::Min)
    }

    /// Intersection area normalised by the chosen box.
    pub fn overlap_with(&self, other: &BoundingBox, norm: Normalization) -> f32 {
        normalise(self.intersection_area(other), self.area(), other.area(), norm)
    }

    /// Whether `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x0 >= self.x0 - CONTAIN_EPSILON
            && other.y0 >= self.y0 - CONTAIN_EPSILON
            && other.x1 <= self.x1 + CONTAIN_EPSILON
            && other.y1 <= self.y1 + CONTAIN_EPSILON
    }

    /// Whether a point lies inside this box (edges included).
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Tight union of the two boxes. Keeps this box's page index.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            page: self.page,
        }
    }

    /// Tight union of every box, `None` for an empty input.
    pub fn merge_all<'a, I>(boxes: I) -> Option<BoundingBox>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        boxes
            .into_iter()
            .fold(None, |acc: Option<BoundingBox>, b| match acc {
                Some(a) => Some(a.merge(b)),
                None => Some(*b),
            })
    }

    /// Empty space between the boxes along y, zero when they share a band.
    pub fn vertical_gap(&self, other: &BoundingBox) -> f32 {
        (self.y0.max(other.y0) - self.y1.min(other.y1)).max(0.0)
    }

    /// Empty space between the boxes along x, zero when they share a band.
    pub fn horizontal_gap(&self, other: &BoundingBox) -> f32 {
        (self.x0.max(other.x0) - self.x1.min(other.x1)).max(0.0)
    }

    /// Grow the box by `margin` on every side. Negative margins shrink it
    /// down to its centre line at most.
    pub fn expand(&self, margin: f32) -> BoundingBox {
        let dx = margin.max(-self.width() / 2.0);
        let dy = margin.max(-self.height() / 2.0);
        BoundingBox {
            x0: self.x0 - dx,
            y0: self.y0 - dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            page: self.page,
        }
    }

    /// Whether the box intersects a `width` x `height` page at all.
    pub fn is_on_page(&self, width: f32, height: f32) -> bool {
        self.x1 >= 0.0 && self.y1 >= 0.0 && self.x0 <= width && self.y0 <= height
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

fn normalise(value: f32, first: f32, second: f32, norm: Normalization) -> f32 {
    let denominator = match norm {
        Normalization::Min => first.min(second),
        Normalization::Max => first.max(second),
        Normalization::First => first,
        Normalization::Second => second,
    };
    if denominator <= 0.0 {
        return 0.0;
    }
    (value / denominator).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x0: f32, y0: f32, x1: f32, y1: f32) -> BoundingBox {
        BoundingBox::new(x0, y0, x1, y1).unwrap()
    }

    #[test]
    fn test_rejects_inverted_and_non_finite() {
        assert!(BoundingBox::new(10.0, 0.0, 5.0, 5.0).is_err());
        assert!(BoundingBox::new(0.0, 10.0, 5.0, 5.0).is_err());
        assert!(BoundingBox::new(f32::NAN, 0.0, 5.0, 5.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, f32::INFINITY, 5.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_overlap_fraction() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(5.0, 5.0, 20.0, 20.0);
        assert!((a.overlap_fraction(&b) - 0.25).abs() < 1e-6);

        let inner = bbox(2.0, 2.0, 4.0, 4.0);
        assert!((a.overlap_fraction(&inner) - 1.0).abs() < 1e-6);
        assert!((a.overlap_with(&inner, Normalization::First) - 0.04).abs() < 1e-6);

        let far = bbox(50.0, 50.0, 60.0, 60.0);
        assert_eq!(a.overlap_fraction(&far), 0.0);
        assert!(!a.overlaps(&far));
    }

    #[test]
    fn test_merge_contains_both_and_overlap_symmetric() {
        let coords = [0.0_f32, 3.5, 10.0, 22.0];
        let mut boxes = Vec::new();
        for &x0 in &coords {
            for &y0 in &coords {
                for &w in &[0.0_f32, 1.0, 8.0, 30.0] {
                    for &h in &[0.0_f32, 2.0, 15.0] {
                        boxes.push(bbox(x0, y0, x0 + w, y0 + h));
                    }
                }
            }
        }

        for a in &boxes {
            for b in &boxes {
                let merged = a.merge(b);
                assert!(merged.contains(a));
                assert!(merged.contains(b));

                let ab = a.overlap_fraction(b);
                let ba = b.overlap_fraction(a);
                assert!((0.0..=1.0).contains(&ab));
                assert!((ab - ba).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_gaps() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let below = bbox(0.0, 14.0, 10.0, 20.0);
        let right = bbox(25.0, 2.0, 30.0, 8.0);

        assert!((a.vertical_gap(&below) - 4.0).abs() < 1e-6);
        assert_eq!(a.horizontal_gap(&below), 0.0);
        assert!((a.horizontal_gap(&right) - 15.0).abs() < 1e-6);
        assert_eq!(a.vertical_gap(&right), 0.0);
    }

    #[test]
    fn test_contains() {
        let outer = bbox(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains(&bbox(10.0, 10.0, 90.0, 90.0)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&bbox(50.0, 50.0, 101.0, 60.0)));
        assert!(outer.contains_point(100.0, 0.0));
    }

    #[test]
    fn test_merge_all() {
        let boxes = [bbox(0.0, 5.0, 1.0, 6.0), bbox(3.0, 0.0, 4.0, 2.0)];
        let merged = BoundingBox::merge_all(&boxes).unwrap();
        assert_eq!(merged.to_array(), [0.0, 0.0, 4.0, 6.0]);
        let empty: [BoundingBox; 0] = [];
        assert!(BoundingBox::merge_all(&empty).is_none());
    }

    #[test]
    fn test_page_tag_survives_merge() {
        let a = bbox(0.0, 0.0, 1.0, 1.0).on_page(4);
        let b = bbox(2.0, 2.0, 3.0, 3.0).on_page(4);
        assert_eq!(a.merge(&b).page(), 4);
    }

    #[test]
    fn test_expand_never_inverts() {
        let a = bbox(0.0, 0.0, 10.0, 4.0);
        let shrunk = a.expand(-5.0);
        assert!(shrunk.x0() <= shrunk.x1());
        assert!(shrunk.y0() <= shrunk.y1());
        assert_eq!(a.expand(2.0).to_array(), [-2.0, -2.0, 12.0, 6.0]);
    }
}
