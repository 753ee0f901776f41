use geo::{Area, Coord, LineString, MinimumRotatedRect, Polygon};
use imageproc::point::Point;

pub(crate) fn to_geo_poly(points: &[Point<i32>]) -> Polygon<f64> {
    let points = points
        .iter()
        .map(|point| Coord {
            x: point.x as f64,
            y: point.y as f64,
        })
        .collect();
    Polygon::new(LineString::new(points), vec![])
}

pub(crate) fn from_geo_poly(poly: &Polygon<f64>) -> Vec<Point<i32>> {
    let mut points = poly
        .exterior()
        .coords()
        .map(|coord| Point::new(coord.x.round() as i32, coord.y.round() as i32))
        .collect::<Vec<_>>();
    // Drop the closing coordinate.
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Shoelace area of a closed polygon.
pub(crate) fn polygon_area(points: &[Point<i32>]) -> f64 {
    to_geo_poly(points).unsigned_area()
}

/// Minimum-area rotated rectangle, corners snapped to the pixel grid.
///
/// The corners keep their cyclic order but start at the top-most corner
/// (left-most on ties), so `[0]` is stable regardless of how the rectangle
/// was found.
pub(crate) fn oriented_box(points: &[Point<i32>]) -> Option<[Point<i32>; 4]> {
    let rect = to_geo_poly(points).minimum_rotated_rect()?;
    let corners: [Point<i32>; 4] = from_geo_poly(&rect).try_into().ok()?;
    let anchor = (0..4).min_by_key(|&i| (corners[i].y, corners[i].x))?;
    Some(std::array::from_fn(|i| corners[(anchor + i) % 4]))
}

/// Drops the interior points of straight horizontal, vertical and diagonal
/// runs, leaving only the points where the border changes direction.
pub(crate) fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let len = points.len();
    if len < 3 {
        return points.to_vec();
    }
    let compressed = (0..len)
        .filter(|&i| {
            let prev = points[(i + len - 1) % len];
            let current = points[i];
            let next = points[(i + 1) % len];
            (current.x - prev.x, current.y - prev.y) != (next.x - current.x, next.y - current.y)
        })
        .map(|i| points[i])
        .collect::<Vec<_>>();
    if compressed.is_empty() {
        points.to_vec()
    } else {
        compressed
    }
}

/// Normalized 1D Gaussian kernel of odd `size`.
pub(crate) fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let center = (size / 2) as f32;
    let weights = (0..size)
        .map(|i| {
            let offset = i as f32 - center;
            (-(offset * offset) / (2.0 * sigma * sigma)).exp()
        })
        .collect::<Vec<_>>();
    let sum = weights.iter().sum::<f32>();
    weights.into_iter().map(|w| w / sum).collect()
}
