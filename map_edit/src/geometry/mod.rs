//! Basic geometry primitives carried as feature attributes.

pub mod point;

pub use point::Point;

/// Axis aligned bounding box in map units.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Extent {
    pub min: Point,
    pub max: Point,
}

impl Extent {
    /// Smallest extent covering all `points`, or `None` when empty.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut ext = Self {
            min: first,
            max: first,
        };
        for p in iter {
            ext.min.x = ext.min.x.min(p.x);
            ext.min.y = ext.min.y.min(p.y);
            ext.max.x = ext.max.x.max(p.x);
            ext.max.y = ext.max.y.max(p.y);
        }
        Some(ext)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }
}

/// Representation of a series of connected line segments.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polyline {
    pub vertices: Vec<Point>,
}

impl Polyline {
    /// Creates a new polyline from a list of vertices.
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }
}

/// Mutable vector geometry stored on a feature.
///
/// Cloning always produces an independent copy of the vertices, so a cloned
/// geometry never observes edits made to the original.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Point),
    LineString(Polyline),
    /// Single exterior ring, not explicitly closed.
    Polygon(Vec<Point>),
}

impl Geometry {
    /// All vertices of the geometry in order.
    pub fn vertices(&self) -> &[Point] {
        match self {
            Geometry::Point(p) => std::slice::from_ref(p),
            Geometry::LineString(line) => &line.vertices,
            Geometry::Polygon(ring) => ring,
        }
    }

    fn vertices_mut(&mut self) -> &mut [Point] {
        match self {
            Geometry::Point(p) => std::slice::from_mut(p),
            Geometry::LineString(line) => &mut line.vertices,
            Geometry::Polygon(ring) => ring,
        }
    }

    /// Moves every vertex by `dx`, `dy` in place.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for p in self.vertices_mut() {
            *p = p.offset(dx, dy);
        }
    }

    /// Bounding box of the geometry, `None` for an empty line or ring.
    pub fn extent(&self) -> Option<Extent> {
        Extent::from_points(self.vertices())
    }
}

impl From<Point> for Geometry {
    fn from(p: Point) -> Self {
        Geometry::Point(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_moves_all_vertices() {
        let mut g = Geometry::LineString(Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
        ]));
        g.translate(2.0, -1.0);
        assert_eq!(g.vertices(), &[Point::new(2.0, -1.0), Point::new(3.0, 0.0)]);
    }

    #[test]
    fn clone_does_not_alias() {
        let original = Geometry::Point(Point::new(1.0, 2.0));
        let mut copy = original.clone();
        copy.translate(10.0, 10.0);
        assert_eq!(original, Geometry::Point(Point::new(1.0, 2.0)));
        assert_eq!(copy, Geometry::Point(Point::new(11.0, 12.0)));
    }

    #[test]
    fn extent_of_polygon() {
        let g = Geometry::Polygon(vec![
            Point::new(-1.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(3.0, 2.0),
        ]);
        let ext = g.extent().unwrap();
        assert_eq!(ext.width(), 4.0);
        assert_eq!(ext.height(), 2.0);
        assert_eq!(ext.center(), Point::new(1.0, 1.0));
        assert!(Geometry::Polygon(Vec::new()).extent().is_none());
    }
}
