//! Elements anchored to a map coordinate.

pub mod popup;

pub use popup::{Popup, PopupOptions};

use crate::geometry::Point;
use crate::view::{MapView, Pixel, PixelRect};

/// Which point of the element sits on the anchor pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Positioning {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    CenterCenter,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Positioning {
    /// Fractions of the element size to shift left and up from the anchor.
    fn factors(self) -> (f64, f64) {
        use Positioning::*;
        let h = match self {
            TopLeft | CenterLeft | BottomLeft => 0.0,
            TopCenter | CenterCenter | BottomCenter => 0.5,
            TopRight | CenterRight | BottomRight => 1.0,
        };
        let v = match self {
            TopLeft | TopCenter | TopRight => 0.0,
            CenterLeft | CenterCenter | CenterRight => 0.5,
            BottomLeft | BottomCenter | BottomRight => 1.0,
        };
        (h, v)
    }
}

/// Geometry shared by every overlay: anchor, pixel offset, positioning and
/// the rendered element size.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub position: Option<Point>,
    pub offset: Pixel,
    pub positioning: Positioning,
    /// Rendered element width and height in pixels.
    pub size: (f64, f64),
}

impl Overlay {
    pub fn new(offset: Pixel, positioning: Positioning) -> Self {
        Self {
            position: None,
            offset,
            positioning,
            size: (0.0, 0.0),
        }
    }

    /// Page-pixel box of the element when anchored at `coordinate`.
    pub fn element_bounds_at(&self, map: &impl MapView, coordinate: Point) -> PixelRect {
        let viewport = map.viewport();
        let anchor = map.pixel_from_coordinate(coordinate);
        let (width, height) = self.size;
        let (h, v) = self.positioning.factors();
        PixelRect::new(
            viewport.left + anchor.x + self.offset.x - width * h,
            viewport.top + anchor.y + self.offset.y - height * v,
            width,
            height,
        )
    }

    /// Page-pixel box at the current position, `None` when unpositioned.
    pub fn element_bounds(&self, map: &impl MapView) -> Option<PixelRect> {
        self.position.map(|p| self.element_bounds_at(map, p))
    }
}
