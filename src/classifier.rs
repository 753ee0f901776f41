//! Shape signature of encoding-error glyphs.
//!
//! Characters that fail to decode are usually rendered as a small, solid,
//! upright box. A contour is taken for such a box when it is near-square,
//! axis aligned, glyph sized and nearly fills its minimum-area rectangle.

use geo::ConvexHull;
use imageproc::{
    geometry::{approximate_polygon_dp, arc_length},
    point::Point,
};

use crate::util::{from_geo_poly, oriented_box, polygon_area, to_geo_poly};

/// Douglas-Peucker tolerance, as a fraction of the closed perimeter.
pub const APPROX_EPSILON_FACTOR: f64 = 0.1;
pub const MAX_APPROX_VERTICES: usize = 12;
pub const MIN_ASPECT_RATIO: f64 = 0.8;
pub const MAX_ASPECT_RATIO: f64 = 1.1;
pub const MIN_BOX_AREA: f64 = 100.0;
pub const MAX_BOX_AREA: f64 = 10_000.0;
pub const MIN_CONTOUR_BOX_PCT: f64 = 85.0;
pub const MIN_HULL_BOX_PCT: f64 = 95.0;
pub const MAX_HULL_BOX_PCT: f64 = 115.0;

/// Upright bounding rectangle, pixel inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UprightRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl UprightRect {
    pub fn of(points: &[Point<i32>]) -> Option<Self> {
        let min_x = points.iter().map(|p| p.x).min()?;
        let max_x = points.iter().map(|p| p.x).max()?;
        let min_y = points.iter().map(|p| p.y).min()?;
        let max_y = points.iter().map(|p| p.y).max()?;
        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMeasures {
    /// Vertices left after polygon simplification.
    pub approx_vertices: usize,
    pub bounds: UprightRect,
    /// Oriented box corners, `[0]` being the anchor.
    pub oriented_box: [Point<i32>; 4],
    pub hull: Vec<Point<i32>>,
    pub contour_area: f64,
    pub box_area: f64,
    pub hull_area: f64,
}

impl ShapeMeasures {
    pub fn contour_box_pct(&self) -> f64 {
        self.contour_area / self.box_area * 100.0
    }

    pub fn hull_box_pct(&self) -> f64 {
        self.hull_area / self.box_area * 100.0
    }

    /// The oriented box starts at the upright box's top-left corner, which
    /// only happens when the shape is not rotated.
    pub fn is_axis_aligned(&self) -> bool {
        let anchor = self.oriented_box[0];
        anchor.x == self.bounds.x && anchor.y == self.bounds.y
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeometricDefectClassifier;

impl GeometricDefectClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Whether `contour` has the encoding-error square signature.
    pub fn classify(&self, contour: &[Point<i32>]) -> bool {
        self.measure(contour)
            .is_some_and(|measures| self.accepts(&measures))
    }

    /// Derived geometry of a closed contour, `None` when it cannot enclose
    /// any area.
    pub fn measure(&self, contour: &[Point<i32>]) -> Option<ShapeMeasures> {
        if contour.len() < 3 {
            return None;
        }
        let epsilon = APPROX_EPSILON_FACTOR * arc_length(contour, true);
        if epsilon <= 0.0 {
            return None;
        }
        let approx_vertices = approximate_polygon_dp(contour, epsilon, true).len();

        let bounds = UprightRect::of(contour)?;
        let oriented_box = oriented_box(contour)?;

        let outline = to_geo_poly(contour);
        let hull = from_geo_poly(&outline.convex_hull());

        Some(ShapeMeasures {
            approx_vertices,
            bounds,
            oriented_box,
            contour_area: polygon_area(contour),
            box_area: polygon_area(&oriented_box),
            hull_area: polygon_area(&hull),
            hull,
        })
    }

    pub fn accepts(&self, measures: &ShapeMeasures) -> bool {
        if !(1..=MAX_APPROX_VERTICES).contains(&measures.approx_vertices) {
            return false;
        }
        if measures.box_area <= 0.0 {
            return false;
        }
        let ratio = measures.bounds.aspect_ratio();
        let contour_pct = measures.contour_box_pct();
        let hull_pct = measures.hull_box_pct();
        log::trace!(
            "ratio {ratio:.3}, box area {}, contour/box {contour_pct:.1}%, hull/box {hull_pct:.1}%",
            measures.box_area
        );

        (MIN_ASPECT_RATIO..=MAX_ASPECT_RATIO).contains(&ratio)
            && measures.is_axis_aligned()
            && measures.box_area > MIN_BOX_AREA
            && measures.box_area < MAX_BOX_AREA
            && fills_box(contour_pct)
            && hull_matches_box(hull_pct)
    }
}

fn fills_box(contour_box_pct: f64) -> bool {
    contour_box_pct > MIN_CONTOUR_BOX_PCT
}

fn hull_matches_box(hull_box_pct: f64) -> bool {
    hull_box_pct > MIN_HULL_BOX_PCT && hull_box_pct < MAX_HULL_BOX_PCT
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    /// Corners of a `size`x`size` pixel square, as compressed border points.
    fn square(x: i32, y: i32, size: i32) -> Vec<Point<i32>> {
        rectangle(x, y, size, size)
    }

    fn rectangle(x: i32, y: i32, width: i32, height: i32) -> Vec<Point<i32>> {
        let (right, bottom) = (x + width - 1, y + height - 1);
        vec![
            Point::new(x, y),
            Point::new(right, y),
            Point::new(right, bottom),
            Point::new(x, bottom),
        ]
    }

    /// Every border pixel of a square, clockwise from the top-left corner.
    fn square_border(x: i32, y: i32, size: i32) -> Vec<Point<i32>> {
        let last = size - 1;
        let top = (0..last).map(|i| Point::new(x + i, y));
        let right = (0..last).map(|i| Point::new(x + last, y + i));
        let bottom = (0..last).map(|i| Point::new(x + last - i, y + last));
        let left = (0..last).map(|i| Point::new(x, y + last - i));
        top.chain(right).chain(bottom).chain(left).collect()
    }

    fn star(cx: f64, cy: f64, outer: f64, inner: f64) -> Vec<Point<i32>> {
        (0..10)
            .map(|i| {
                let radius = if i % 2 == 0 { outer } else { inner };
                let angle = PI / 5.0 * i as f64 - PI / 2.0;
                Point::new(
                    (cx + radius * angle.cos()).round() as i32,
                    (cy + radius * angle.sin()).round() as i32,
                )
            })
            .collect()
    }

    #[test]
    fn small_solid_square_is_flagged() {
        let classifier = GeometricDefectClassifier::new();
        let measures = classifier.measure(&square(10, 10, 20)).unwrap();
        assert_eq!(
            measures.bounds,
            UprightRect {
                x: 10,
                y: 10,
                width: 20,
                height: 20
            }
        );
        assert_eq!(measures.oriented_box[0], Point::new(10, 10));
        assert_eq!(measures.box_area, 361.0);
        assert_eq!(measures.contour_box_pct(), 100.0);
        assert_eq!(measures.hull_box_pct(), 100.0);
        assert!(classifier.accepts(&measures));
    }

    #[test]
    fn full_border_square_is_flagged() {
        assert!(GeometricDefectClassifier::new().classify(&square_border(40, 25, 20)));
    }

    #[test]
    fn area_bounds_are_exclusive() {
        let classifier = GeometricDefectClassifier::new();
        // 9x9 box: area 81.
        assert!(!classifier.classify(&square(0, 0, 10)));
        // 10x10 box: area exactly 100.
        assert!(!classifier.classify(&square(0, 0, 11)));
        assert!(classifier.classify(&square(0, 0, 12)));
        // 99x99 box: area 9801.
        assert!(classifier.classify(&square(0, 0, 100)));
        // 100x100 box: area exactly 10000.
        assert!(!classifier.classify(&square(0, 0, 101)));
        assert!(!classifier.classify(&square(0, 0, 150)));
    }

    /// Upright 20x20 glyph with a 200 px² box and the given areas.
    fn glyph_measures(contour_area: f64, hull_area: f64) -> ShapeMeasures {
        ShapeMeasures {
            approx_vertices: 4,
            bounds: UprightRect {
                x: 10,
                y: 10,
                width: 20,
                height: 20,
            },
            oriented_box: [
                Point::new(10, 10),
                Point::new(29, 10),
                Point::new(29, 29),
                Point::new(10, 29),
            ],
            hull: Vec::new(),
            contour_area,
            box_area: 200.0,
            hull_area,
        }
    }

    #[test]
    fn aspect_ratio_bounds_are_inclusive() {
        let classifier = GeometricDefectClassifier::new();
        // 22 / 20 == 1.1 and 16 / 20 == 0.8.
        assert!(classifier.classify(&rectangle(10, 10, 22, 20)));
        assert!(classifier.classify(&rectangle(10, 10, 16, 20)));
        assert!(!classifier.classify(&rectangle(10, 10, 23, 20)));
        assert!(!classifier.classify(&rectangle(10, 10, 15, 20)));
    }

    #[test]
    fn fill_ratio_bound_is_exclusive() {
        let classifier = GeometricDefectClassifier::new();
        let at_bound = glyph_measures(170.0, 200.0);
        assert_eq!(at_bound.contour_box_pct(), MIN_CONTOUR_BOX_PCT);
        assert!(!classifier.accepts(&at_bound));
        assert!(classifier.accepts(&glyph_measures(171.0, 200.0)));
        assert!(!fills_box(MIN_CONTOUR_BOX_PCT));
    }

    #[test]
    fn hull_ratio_bounds_are_exclusive() {
        let classifier = GeometricDefectClassifier::new();
        let at_lower = glyph_measures(200.0, 190.0);
        assert_eq!(at_lower.hull_box_pct(), MIN_HULL_BOX_PCT);
        assert!(!classifier.accepts(&at_lower));
        assert!(classifier.accepts(&glyph_measures(200.0, 191.0)));
        assert!(classifier.accepts(&glyph_measures(200.0, 229.0)));
        assert!(!classifier.accepts(&glyph_measures(200.0, 231.0)));

        assert!(!hull_matches_box(MIN_HULL_BOX_PCT));
        assert!(!hull_matches_box(MAX_HULL_BOX_PCT));
        assert!(hull_matches_box(100.0));
    }

    #[test]
    fn elongated_rectangles_are_ignored() {
        let classifier = GeometricDefectClassifier::new();
        assert!(!classifier.classify(&rectangle(10, 10, 5, 20)));
        assert!(!classifier.classify(&rectangle(10, 10, 50, 200)));
        assert!(!classifier.classify(&rectangle(10, 10, 30, 20)));
    }

    #[test]
    fn rotated_square_is_ignored() {
        let diamond = vec![
            Point::new(30, 10),
            Point::new(50, 30),
            Point::new(30, 50),
            Point::new(10, 30),
        ];
        let classifier = GeometricDefectClassifier::new();
        let measures = classifier.measure(&diamond).unwrap();
        assert!((measures.bounds.aspect_ratio() - 1.0).abs() < f64::EPSILON);
        assert!(!measures.is_axis_aligned());
        assert!(!classifier.accepts(&measures));
    }

    #[test]
    fn star_is_ignored() {
        let classifier = GeometricDefectClassifier::new();
        let measures = classifier.measure(&star(60.0, 60.0, 40.0, 15.0)).unwrap();
        assert!(measures.contour_box_pct() < MIN_CONTOUR_BOX_PCT);
        assert!(!classifier.accepts(&measures));
    }

    #[test]
    fn hollow_outline_is_ignored() {
        // Thin "C" shape: the outline doubles back on itself.
        let outline = vec![
            Point::new(10, 10),
            Point::new(40, 10),
            Point::new(40, 12),
            Point::new(12, 12),
            Point::new(12, 38),
            Point::new(40, 38),
            Point::new(40, 40),
            Point::new(10, 40),
        ];
        assert!(!GeometricDefectClassifier::new().classify(&outline));
    }

    #[test]
    fn degenerate_contours_are_ignored() {
        let classifier = GeometricDefectClassifier::new();
        assert!(!classifier.classify(&[]));
        assert!(!classifier.classify(&[Point::new(3, 3), Point::new(30, 3)]));
        let line = vec![Point::new(0, 0), Point::new(20, 0), Point::new(40, 0)];
        assert!(!classifier.classify(&line));
    }
}
