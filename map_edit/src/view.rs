//! Map and view contract consumed by overlays, plus an in-memory map.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Duration of a recenter animation in milliseconds.
pub const PAN_DURATION_MS: u32 = 250;

/// Position in pixels, y pointing down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pixel rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// True when the rectangles overlap or touch.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.left <= other.right()
            && other.left <= self.right()
            && self.top <= other.bottom()
            && other.top <= self.bottom()
    }

    /// This rectangle expressed relative to `origin`'s top-left corner.
    pub fn relative_to(&self, origin: &PixelRect) -> PixelRect {
        PixelRect::new(
            self.left - origin.left,
            self.top - origin.top,
            self.width,
            self.height,
        )
    }
}

/// Animated pan from `source` to whatever center is set next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanAnimation {
    pub source: Point,
    pub duration: u32,
}

impl PanAnimation {
    pub fn new(source: Point, duration: u32) -> Self {
        Self { source, duration }
    }

    /// Center to render `elapsed` ms into the pan toward `target`.
    pub fn center_at(&self, target: Point, elapsed: u32) -> Point {
        if self.duration == 0 || elapsed >= self.duration {
            return target;
        }
        let t = f64::from(elapsed) / f64::from(self.duration);
        // ease in and out
        let k = t * t * (3.0 - 2.0 * t);
        Point::new(
            self.source.x + (target.x - self.source.x) * k,
            self.source.y + (target.y - self.source.y) * k,
        )
    }
}

/// What an overlay needs from the map it is shown on.
pub trait MapView {
    /// Page-pixel bounding box of the map viewport.
    fn viewport(&self) -> PixelRect;
    /// Viewport-relative pixel of a map coordinate.
    fn pixel_from_coordinate(&self, coordinate: Point) -> Pixel;
    fn center(&self) -> Point;
    fn set_center(&mut self, center: Point);
    /// Map units per pixel.
    fn resolution(&self) -> f64;
    /// Schedules `animation` to run before the next render.
    fn before_render(&mut self, animation: PanAnimation);
}

/// View state: center and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub center: Point,
    pub resolution: f64,
}

impl View {
    pub fn new(center: Point, resolution: f64) -> Self {
        Self { center, resolution }
    }
}

/// Headless map with a fixed viewport, used by the CLI and in tests.
#[derive(Debug, Clone)]
pub struct Map {
    viewport: PixelRect,
    view: View,
    animations: Vec<PanAnimation>,
}

impl Map {
    pub fn new(viewport: PixelRect, view: View) -> Self {
        Self {
            viewport,
            view,
            animations: Vec::new(),
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Animations scheduled since the last call, oldest first.
    pub fn take_animations(&mut self) -> Vec<PanAnimation> {
        std::mem::take(&mut self.animations)
    }

    pub fn coordinate_from_pixel(&self, pixel: Pixel) -> Point {
        let res = self.view.resolution;
        Point::new(
            self.view.center.x + (pixel.x - self.viewport.width / 2.0) * res,
            self.view.center.y - (pixel.y - self.viewport.height / 2.0) * res,
        )
    }
}

impl MapView for Map {
    fn viewport(&self) -> PixelRect {
        self.viewport
    }

    fn pixel_from_coordinate(&self, coordinate: Point) -> Pixel {
        let res = self.view.resolution;
        Pixel::new(
            (coordinate.x - self.view.center.x) / res + self.viewport.width / 2.0,
            (self.view.center.y - coordinate.y) / res + self.viewport.height / 2.0,
        )
    }

    fn center(&self) -> Point {
        self.view.center
    }

    fn set_center(&mut self, center: Point) {
        self.view.center = center;
    }

    fn resolution(&self) -> f64 {
        self.view.resolution
    }

    fn before_render(&mut self, animation: PanAnimation) {
        self.animations.push(animation);
    }
}
