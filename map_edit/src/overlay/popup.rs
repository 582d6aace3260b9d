//! Popup overlay that pans the map to stay fully visible.

use log::debug;
use serde::{Deserialize, Serialize};

use super::{Overlay, Positioning};
use crate::geometry::Point;
use crate::view::{MapView, PanAnimation, Pixel, PixelRect, PAN_DURATION_MS};

/// Pixel offset of the popup box from its anchor. The vertical part leaves
/// room for the pointer tail below the box.
pub const POPUP_OFFSET: Pixel = Pixel { x: -50.0, y: -12.0 };

/// Popup configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopupOptions {
    /// Pan the map so the popup is fully visible when shown.
    pub pan_into_view: bool,
    /// Minimum distance in pixels kept between popup and viewport edges.
    pub padding: f64,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            pan_into_view: true,
            padding: 10.0,
        }
    }
}

/// Popup anchored at a coordinate, showing an HTML fragment.
#[derive(Debug, Clone)]
pub struct Popup {
    overlay: Overlay,
    options: PopupOptions,
    content: String,
    visible: bool,
}

impl Popup {
    pub fn new(options: PopupOptions) -> Self {
        Self {
            overlay: Overlay::new(POPUP_OFFSET, Positioning::BottomLeft),
            options,
            content: String::new(),
            visible: false,
        }
    }

    pub fn position(&self) -> Option<Point> {
        self.overlay.position
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Records the rendered size of the popup element.
    pub fn set_size(&mut self, width: f64, height: f64) -> &mut Self {
        self.overlay.size = (width, height);
        self
    }

    /// Shows `html` at `coordinate`, panning `map` if configured to.
    pub fn show(
        &mut self,
        map: &mut impl MapView,
        coordinate: Point,
        html: impl Into<String>,
    ) -> &mut Self {
        self.overlay.position = Some(coordinate);
        self.content = html.into();
        self.visible = true;
        if self.options.pan_into_view {
            self.pan_into_view(map, coordinate);
        }
        self
    }

    pub fn hide(&mut self) -> &mut Self {
        self.visible = false;
        self
    }

    /// Click on the close link.
    pub fn handle_closer_click(&mut self) -> &mut Self {
        self.hide()
    }

    /// Pans `map` so the popup shown at `coordinate` is entirely visible and
    /// returns the new center.
    ///
    /// A popup that lies completely outside the viewport is handled by
    /// centering on `coordinate`.
    pub fn pan_into_view(&self, map: &mut impl MapView, coordinate: Point) -> Point {
        let viewport = map.viewport();
        let mut bounds = self.overlay.element_bounds_at(map, coordinate);
        bounds.height += self.overlay.offset.y.abs();

        let target = fit_center(
            &viewport,
            &bounds,
            self.options.padding,
            map.center(),
            map.resolution(),
        )
        .unwrap_or(coordinate);
        debug!("popup pan target ({:.3}, {:.3})", target.x, target.y);
        animate_center(map, target)
    }

    /// Container markup: closer link plus content.
    pub fn render_html(&self) -> String {
        let display = if self.visible { "block" } else { "none" };
        format!(
            "<div class=\"ol-popup\" style=\"display: {display}\">\
             <a class=\"ol-popup-closer\" href=\"#\"></a>\
             <div class=\"ol-popup-content\">{}</div></div>",
            self.content
        )
    }
}

impl Default for Popup {
    fn default() -> Self {
        Self::new(PopupOptions::default())
    }
}

/// New view center that brings `element` within `viewport` minus `padding`.
///
/// Both boxes are in page pixels. Returns `None` when they do not intersect
/// at all. Each axis gets at most one correction; right wins over left and
/// top wins over bottom.
pub fn fit_center(
    viewport: &PixelRect,
    element: &PixelRect,
    padding: f64,
    center: Point,
    resolution: f64,
) -> Option<Point> {
    if !element.intersects(viewport) {
        return None;
    }
    let rel = element.relative_to(viewport);

    let from_left = rel.left - padding;
    let from_right = viewport.width - (rel.right() + padding);
    let from_top = rel.top - padding;
    let from_bottom = viewport.height - (rel.bottom() + padding);

    let mut target = center;
    if from_right < 0.0 {
        target.x -= from_right * resolution;
    } else if from_left < 0.0 {
        target.x += from_left * resolution;
    }
    // map y grows upward, pixel y downward
    if from_top < 0.0 {
        target.y -= from_top * resolution;
    } else if from_bottom < 0.0 {
        target.y += from_bottom * resolution;
    }
    Some(target)
}

fn animate_center(map: &mut impl MapView, target: Point) -> Point {
    let source = map.center();
    map.before_render(PanAnimation::new(source, PAN_DURATION_MS));
    map.set_center(target);
    map.center()
}
