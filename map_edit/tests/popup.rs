use map_edit::{
    geometry::Point,
    overlay::{popup::fit_center, Popup, PopupOptions},
    view::{Map, MapView, PixelRect, View, PAN_DURATION_MS},
};

fn viewport() -> PixelRect {
    PixelRect::new(0.0, 0.0, 800.0, 600.0)
}

#[test]
fn popup_inside_viewport_keeps_center() {
    let center = Point::new(1000.0, 2000.0);
    let popup_box = PixelRect::new(350.0, 238.0, 100.0, 50.0);
    let target = fit_center(&viewport(), &popup_box, 10.0, center, 4.0).unwrap();
    assert_eq!(target, center);
}

#[test]
fn popup_past_right_edge_shifts_by_deficit_times_resolution() {
    let resolution = 2.5;
    let center = Point::new(0.0, 0.0);
    // right edge at 820, 20px past the viewport
    let popup_box = PixelRect::new(720.0, 200.0, 100.0, 50.0);
    let target = fit_center(&viewport(), &popup_box, 10.0, center, resolution).unwrap();
    assert_eq!(target, Point::new(30.0 * resolution, 0.0));
}

#[test]
fn show_pans_with_single_animation() {
    let mut map = Map::new(
        PixelRect::new(8.0, 8.0, 800.0, 600.0),
        View::new(Point::new(0.0, 0.0), 1.0),
    );
    let mut popup = Popup::new(PopupOptions {
        pan_into_view: true,
        padding: 10.0,
    });
    popup.set_size(200.0, 80.0);

    // anchor 5px below the top edge: box and tail are above the viewport
    let coordinate = Point::new(0.0, 295.0);
    popup.show(&mut map, coordinate, "<p>You clicked here</p>");

    let animations = map.take_animations();
    assert_eq!(animations.len(), 1);
    assert_eq!(animations[0].duration, PAN_DURATION_MS);
    assert_eq!(animations[0].source, Point::new(0.0, 0.0));
    // box top at 5 - 12 - 80 = -87, needs 97px to clear the padding
    assert_eq!(map.center(), Point::new(0.0, 97.0));
    assert!(popup.is_visible());
    assert_eq!(popup.content(), "<p>You clicked here</p>");
}
