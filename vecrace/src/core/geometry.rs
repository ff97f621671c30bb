//! Geometry kernel: points, integer grid vectors, segments and polygons together with the pure
//! predicates the legality engine and the lap tracker are built on.
//!
//! All coordinates are grid units. Functions are total: degenerate input (zero-length segments,
//! points exactly on an edge) has a fixed answer that is documented per function.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Tolerance used for orientation and boundary tests.
pub const EPS: f64 = 1e-9;

/// Point (or free vector) with real grid-unit coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product.
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Point) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, `None` for the zero vector.
    pub fn normalized(self) -> Option<Point> {
        let len = self.length();
        if len < EPS {
            None
        } else {
            Some(Point::new(self.x / len, self.y / len))
        }
    }

    /// Left-hand perpendicular (rotated by +90 degrees in math convention).
    pub fn perp(self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn lerp(self, other: Point, t: f64) -> Point {
        self + (other - self) * t
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point {
    fn from(v: [f64; 2]) -> Self {
        Point::new(v[0], v[1])
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Integer grid vector used for car positions, velocities and accelerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct GridVec {
    pub x: i32,
    pub y: i32,
}

impl GridVec {
    pub const ZERO: GridVec = GridVec { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> GridVec {
        GridVec { x, y }
    }

    pub fn to_point(self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    /// Euclidean length, i.e. the speed when the vector is a velocity.
    pub fn length(self) -> f64 {
        self.to_point().length()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }
}

impl From<[i32; 2]> for GridVec {
    fn from(v: [i32; 2]) -> Self {
        GridVec::new(v[0], v[1])
    }
}

impl From<GridVec> for [i32; 2] {
    fn from(v: GridVec) -> Self {
        [v.x, v.y]
    }
}

impl From<GridVec> for Point {
    fn from(v: GridVec) -> Self {
        v.to_point()
    }
}

impl Add for GridVec {
    type Output = GridVec;
    fn add(self, rhs: GridVec) -> GridVec {
        GridVec::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for GridVec {
    type Output = GridVec;
    fn sub(self, rhs: GridVec) -> GridVec {
        GridVec::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Straight line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[Point; 2]", into = "[Point; 2]")]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub fn new(a: Point, b: Point) -> Segment {
        Segment { a, b }
    }

    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }

    pub fn midpoint(&self) -> Point {
        self.a.lerp(self.b, 0.5)
    }

    pub fn direction(&self) -> Point {
        self.b - self.a
    }
}

impl From<[Point; 2]> for Segment {
    fn from(v: [Point; 2]) -> Self {
        Segment::new(v[0], v[1])
    }
}

impl From<Segment> for [Point; 2] {
    fn from(s: Segment) -> Self {
        [s.a, s.b]
    }
}

/// Closed polygon given by its vertices; the last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Polygon {
        Polygon { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates over all edges including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| Segment::new(self.points[i], self.points[(i + 1) % n]))
    }

    /// Shoelace area. Positive means clockwise on screen (y axis pointing down).
    pub fn signed_area(&self) -> f64 {
        self.edges().map(|e| e.a.cross(e.b)).sum::<f64>() / 2.0
    }

    /// (min, max) corners of the axis-aligned bounding box, `None` if empty.
    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }

    /// A polygon is simple if it has at least three vertices, no zero-length edge and no two
    /// edges touch except adjacent edges at their shared vertex.
    pub fn is_simple(&self) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let edges: Vec<Segment> = self.edges().collect();
        if edges.iter().any(|e| e.length() < EPS) {
            return false;
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                let (e, f) = (edges[i], edges[j]);
                if adjacent {
                    // adjacent edges may only share their common vertex, i.e. must not fold back
                    let shared = if j == i + 1 { e.b } else { e.a };
                    let other_e = if j == i + 1 { e.a } else { e.b };
                    let other_f = if j == i + 1 { f.b } else { f.a };
                    let d1 = other_e - shared;
                    let d2 = other_f - shared;
                    if d1.cross(d2).abs() < EPS && d1.dot(d2) > 0.0 {
                        return false;
                    }
                } else if segments_intersect(e.a, e.b, f.a, f.b) {
                    return false;
                }
            }
        }
        true
    }
}

/// Location of a point relative to a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    Boundary,
    Outside,
}

fn orientation_sign(a: Point, b: Point, c: Point) -> i8 {
    let v = (b - a).cross(c - a);
    if v > EPS {
        1
    } else if v < -EPS {
        -1
    } else {
        0
    }
}

/// p is assumed collinear with a-b; checks it lies within the segment's extent.
fn within_extent(p: Point, a: Point, b: Point) -> bool {
    p.x >= a.x.min(b.x) - EPS
        && p.x <= a.x.max(b.x) + EPS
        && p.y >= a.y.min(b.y) - EPS
        && p.y <= a.y.max(b.y) + EPS
}

/// Orientation-based test whether the closed segments a-b and c-d share at least one point.
/// Touching at an endpoint counts. Collinear segments only intersect if they overlap.
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let o1 = orientation_sign(a, b, c);
    let o2 = orientation_sign(a, b, d);
    let o3 = orientation_sign(c, d, a);
    let o4 = orientation_sign(c, d, b);

    if o1 * o2 < 0 && o3 * o4 < 0 {
        return true;
    }

    (o1 == 0 && within_extent(c, a, b))
        || (o2 == 0 && within_extent(d, a, b))
        || (o3 == 0 && within_extent(a, c, d))
        || (o4 == 0 && within_extent(b, c, d))
}

/// Proper crossing: each segment has its endpoints strictly on opposite sides of the other.
/// Touching and collinear overlap do not count.
pub fn segments_cross(a: Point, b: Point, c: Point, d: Point) -> bool {
    let o1 = orientation_sign(a, b, c);
    let o2 = orientation_sign(a, b, d);
    let o3 = orientation_sign(c, d, a);
    let o4 = orientation_sign(c, d, b);
    o1 * o2 < 0 && o3 * o4 < 0
}

/// True if the open segment a-b properly crosses any edge of the polygon.
pub fn segment_intersects_polygon(a: Point, b: Point, polygon: &Polygon) -> bool {
    polygon.edges().any(|e| segments_cross(a, b, e.a, e.b))
}

/// Euclidean distance from p to the closed segment a-b. A zero-length segment degrades to the
/// distance between p and a.
pub fn distance_point_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq < EPS * EPS {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Classifies a point as inside, on the boundary of, or outside the polygon (crossing number
/// test after an explicit boundary check).
pub fn classify_point(p: Point, polygon: &Polygon) -> PointLocation {
    if polygon
        .edges()
        .any(|e| distance_point_to_segment(p, e.a, e.b) < EPS)
    {
        return PointLocation::Boundary;
    }

    let mut inside = false;
    for e in polygon.edges() {
        if (e.a.y > p.y) != (e.b.y > p.y) {
            let x_cross = e.a.x + (p.y - e.a.y) / (e.b.y - e.a.y) * (e.b.x - e.a.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
    }

    if inside {
        PointLocation::Inside
    } else {
        PointLocation::Outside
    }
}

/// Strict point-in-polygon test: points on the boundary count as outside.
pub fn point_in_polygon(p: Point, polygon: &Polygon) -> bool {
    classify_point(p, polygon) == PointLocation::Inside
}

/// Parameters t in [0, 1] along a-b at which the segment touches the given edge. Returns the
/// overlap endpoints for collinear overlap.
fn contact_params(a: Point, b: Point, edge: Segment, out: &mut Vec<f64>) {
    let r = b - a;
    let s = edge.direction();
    let denom = r.cross(s);
    let qp = edge.a - a;

    if denom.abs() > EPS {
        let t = qp.cross(s) / denom;
        let u = qp.cross(r) / denom;
        if (-EPS..=1.0 + EPS).contains(&t) && (-EPS..=1.0 + EPS).contains(&u) {
            out.push(t.clamp(0.0, 1.0));
        }
    } else if qp.cross(r).abs() < EPS {
        let rr = r.dot(r);
        if rr < EPS * EPS {
            return;
        }
        for q in [edge.a, edge.b] {
            let t = (q - a).dot(r) / rr;
            if (-EPS..=1.0 + EPS).contains(&t) {
                out.push(t.clamp(0.0, 1.0));
            }
        }
    }
}

/// Sorted, deduplicated parameters along a-b at which the segment touches any polygon edge,
/// always including 0 and 1. Consecutive parameters bound sub-segments that lie entirely on one
/// side of every polygon edge.
pub fn split_params(a: Point, b: Point, polygons: &[&Polygon]) -> Vec<f64> {
    let mut params = vec![0.0, 1.0];
    for polygon in polygons {
        for edge in polygon.edges() {
            contact_params(a, b, edge, &mut params);
        }
    }
    params.sort_by(|x, y| x.total_cmp(y));
    params.dedup_by(|x, y| (*x - *y).abs() < EPS);
    params
}

/// Distances t >= 0 along the ray origin + t * dir at which it hits polygon edges. Edges parallel
/// to the ray are skipped.
pub fn ray_polygon_params(origin: Point, dir: Point, polygon: &Polygon) -> Vec<f64> {
    polygon
        .edges()
        .filter_map(|e| {
            let s = e.direction();
            let denom = dir.cross(s);
            if denom.abs() < EPS {
                return None;
            }
            let qp = e.a - origin;
            let t = qp.cross(s) / denom;
            let u = qp.cross(dir) / denom;
            if t >= 0.0 && (-EPS..=1.0 + EPS).contains(&u) {
                Some(t)
            } else {
                None
            }
        })
        .collect()
}

/// Minimum distance from a point to any edge of the polygon.
pub fn distance_to_polygon(p: Point, polygon: &Polygon) -> f64 {
    polygon
        .edges()
        .map(|e| distance_point_to_segment(p, e.a, e.b))
        .fold(f64::INFINITY, f64::min)
}
