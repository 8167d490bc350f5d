//! Screen geometry and the default visibility rule.

use serde::{Deserialize, Serialize};

use super::{Visibility, VisibilityClassifier};

/// Axis-aligned rectangle in screen pixels, `right` and `bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Overlapping area of two rectangles, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let overlap = Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        (!overlap.is_empty()).then_some(overlap)
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    /// The same rectangle moved by `(dx, dy)`.
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }
}

/// Classifies an element as fully visible only when it lies entirely inside
/// the container's bounds.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainmentClassifier;

impl VisibilityClassifier for ContainmentClassifier {
    fn classify(&self, container: Rect, element: Rect) -> Visibility {
        match container.intersect(&element) {
            None => Visibility::Hidden,
            Some(visible) if visible == element => Visibility::Full,
            Some(_) => Visibility::Partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect::new(0, 0, 1080, 1920);

    #[test]
    fn test_rect_dimensions() {
        let rect = Rect::new(10, 20, 110, 70);
        assert_eq!(rect.width(), 100);
        assert_eq!(rect.height(), 50);
        assert!(!rect.is_empty());
        assert!(Rect::new(5, 5, 5, 50).is_empty());
        assert_eq!(Rect::new(50, 0, 10, 10).width(), 0);
    }

    #[test]
    fn test_intersect() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 150, 150);
        assert_eq!(a.intersect(&b), Some(Rect::new(50, 50, 100, 100)));
        assert_eq!(a.intersect(&Rect::new(100, 0, 200, 100)), None);
    }

    #[test]
    fn test_offset() {
        assert_eq!(
            Rect::new(0, 100, 50, 200).offset(5, -100),
            Rect::new(5, 0, 55, 100)
        );
    }

    #[test]
    fn test_fully_inside_is_full() {
        let element = Rect::new(0, 400, 1080, 800);
        assert!(SCREEN.contains(&element));
        assert_eq!(
            ContainmentClassifier.classify(SCREEN, element),
            Visibility::Full
        );
    }

    #[test]
    fn test_edge_aligned_is_full() {
        let element = Rect::new(0, 1520, 1080, 1920);
        assert_eq!(
            ContainmentClassifier.classify(SCREEN, element),
            Visibility::Full
        );
    }

    #[test]
    fn test_clipped_is_partial() {
        let element = Rect::new(0, 1800, 1080, 2200);
        assert_eq!(
            ContainmentClassifier.classify(SCREEN, element),
            Visibility::Partial
        );
    }

    #[test]
    fn test_outside_or_empty_is_hidden() {
        let below = Rect::new(0, 2000, 1080, 2400);
        assert_eq!(
            ContainmentClassifier.classify(SCREEN, below),
            Visibility::Hidden
        );
        let collapsed = Rect::new(0, 100, 1080, 100);
        assert_eq!(
            ContainmentClassifier.classify(SCREEN, collapsed),
            Visibility::Hidden
        );
    }
}
