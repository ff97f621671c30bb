use crate::core::errors::TrackError;
use crate::core::geometry::{
    classify_point, distance_to_polygon, ray_polygon_params, segment_intersects_polygon,
    segments_intersect, split_params, Point, PointLocation, Polygon, Segment, EPS,
};
use helpers::general::lin_interp;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of rays cast around the inner boundary when deriving a default racing line.
const DEFAULT_LINE_SAMPLES: usize = 32;

/// Turn angle above which a default-line waypoint is treated as an apex.
const APEX_ANGLE: f64 = PI / 10.0;

/// Turn angles (rad) and target speeds (grid units per turn) of the default racing line.
const DEFAULT_SPEED_ANGLES: [f64; 4] = [0.0, PI / 8.0, PI / 4.0, PI / 2.0];
const DEFAULT_SPEED_VALUES: [f64; 4] = [5.0, 4.0, 3.0, 2.0];

/// Racing direction as seen on screen (y axis pointing down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacingDirection {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerType {
    Straight,
    Entry,
    Apex,
    Exit,
}

impl Default for CornerType {
    fn default() -> Self {
        CornerType::Straight
    }
}

/// Coarse side of the track relative to the inner boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeZone {
    Left,
    Right,
    Top,
    Bottom,
}

impl SafeZone {
    /// Unit vector of the expected travel direction in this zone.
    pub fn expected_direction(self, direction: RacingDirection) -> Point {
        let cw = match self {
            SafeZone::Top => Point::new(1.0, 0.0),
            SafeZone::Right => Point::new(0.0, 1.0),
            SafeZone::Bottom => Point::new(-1.0, 0.0),
            SafeZone::Left => Point::new(0.0, -1.0),
        };
        match direction {
            RacingDirection::Clockwise => cw,
            RacingDirection::CounterClockwise => -cw,
        }
    }
}

/// * `line` - Segment across the track
/// * `forward` - Optional crossing direction; derived from the checkpoint order if omitted
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LinePars {
    pub line: Segment,
    #[serde(default)]
    pub forward: Option<Point>,
}

/// * `position` - Waypoint position in grid units
/// * `target_speed` - (grid units per turn) Desired speed when passing the waypoint
/// * `corner_type` - Role of the waypoint within a corner
/// * `brake_zone` - True if the car should be slowing down here
/// * `safe_zone` - Side of the track; classified from the position if omitted
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WaypointPars {
    pub position: Point,
    pub target_speed: f64,
    #[serde(default)]
    pub corner_type: CornerType,
    #[serde(default)]
    pub brake_zone: bool,
    #[serde(default)]
    pub safe_zone: Option<SafeZone>,
}

/// * `name` - Track name
/// * `outer_boundary` - Outer boundary polygon (grid units)
/// * `inner_boundary` - Inner boundary polygon, i.e. the hole
/// * `checkpoints` - Checkpoint lines in the order they must be crossed
/// * `start_line` - Start/finish line
/// * `racing_line` - Optional ideal line; a default line is derived if omitted, an empty list
///   disables the racing line
/// * `racing_direction` - Optional; inferred from the checkpoint order if omitted
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrackPars {
    pub name: String,
    pub outer_boundary: Vec<Point>,
    pub inner_boundary: Vec<Point>,
    pub checkpoints: Vec<LinePars>,
    pub start_line: LinePars,
    #[serde(default)]
    pub racing_line: Option<Vec<WaypointPars>>,
    #[serde(default)]
    pub racing_direction: Option<RacingDirection>,
}

/// Line that must be crossed in the direction of `forward` (unit vector).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingLine {
    pub line: Segment,
    pub forward: Point,
}

impl TimingLine {
    /// True if the path from `from` to `to` touches the line while moving forward.
    pub fn crossed_forward(&self, from: Point, to: Point) -> bool {
        (to - from).dot(self.forward) > EPS
            && segments_intersect(from, to, self.line.a, self.line.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Waypoint {
    pub position: Point,
    pub target_speed: f64,
    pub corner_type: CornerType,
    pub brake_zone: bool,
    pub safe_zone: SafeZone,
}

/// Where the racing line of a track came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacingLineSource {
    Provided,
    Derived,
    /// No line could be built; the AI steers by direction only.
    Missing,
}

/// Validated, immutable track.
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    outer: Polygon,
    inner: Polygon,
    inner_bbox: (Point, Point),
    checkpoints: Vec<TimingLine>,
    start_line: TimingLine,
    racing_line: Vec<Waypoint>,
    racing_line_source: RacingLineSource,
    /// arc length from waypoint i to waypoint i + 1 (wrapping)
    leg_lengths: Vec<f64>,
    racing_direction: RacingDirection,
}

impl Track {
    pub fn new(track_pars: &TrackPars) -> Result<Track, TrackError> {
        let outer = Polygon::new(track_pars.outer_boundary.to_owned());
        let inner = Polygon::new(track_pars.inner_boundary.to_owned());

        check_finite(track_pars)?;

        for (which, polygon) in [("outer", &outer), ("inner", &inner)] {
            if polygon.len() < 3 {
                return Err(TrackError::TooFewPoints {
                    which,
                    got: polygon.len(),
                });
            }
            if !polygon.is_simple() {
                return Err(TrackError::NotSimple { which });
            }
        }

        let inner_inside = inner
            .points()
            .iter()
            .all(|&p| classify_point(p, &outer) == PointLocation::Inside)
            && !inner.edges().any(|ie| {
                outer
                    .edges()
                    .any(|oe| segments_intersect(ie.a, ie.b, oe.a, oe.b))
            });
        if !inner_inside {
            return Err(TrackError::InnerNotInsideOuter);
        }

        let inner_bbox = inner
            .bounding_box()
            .ok_or(TrackError::TooFewPoints { which: "inner", got: 0 })?;

        let mut track = Track {
            name: track_pars.name.to_owned(),
            outer,
            inner,
            inner_bbox,
            checkpoints: Vec::new(),
            start_line: TimingLine {
                line: track_pars.start_line.line,
                forward: Point::ZERO,
            },
            racing_line: Vec::new(),
            racing_line_source: RacingLineSource::Missing,
            leg_lengths: Vec::new(),
            racing_direction: RacingDirection::Clockwise,
        };

        // timing lines
        if track_pars.checkpoints.is_empty() {
            return Err(TrackError::NoCheckpoints);
        }
        track.check_line_on_track(&track_pars.start_line.line, "start line")?;
        for (i, cp) in track_pars.checkpoints.iter().enumerate() {
            track.check_line_on_track(&cp.line, &format!("checkpoint {}", i))?;
        }

        let mids: Vec<Point> = track_pars
            .checkpoints
            .iter()
            .map(|cp| cp.line.midpoint())
            .collect();
        let no_cps = mids.len();

        track.start_line = resolve_timing_line(&track_pars.start_line, mids[0], "start line")?;
        for (i, cp) in track_pars.checkpoints.iter().enumerate() {
            let toward = if i + 1 < no_cps {
                mids[i + 1]
            } else {
                track_pars.start_line.line.midpoint()
            };
            track
                .checkpoints
                .push(resolve_timing_line(cp, toward, &format!("checkpoint {}", i))?);
        }

        track.racing_direction = match track_pars.racing_direction {
            Some(direction) => direction,
            None => track.infer_racing_direction(),
        };

        // racing line
        match &track_pars.racing_line {
            Some(waypoints) if waypoints.is_empty() => {
                log::warn!(
                    "Track {} has an empty racing line, AI will steer by direction only",
                    track.name
                );
            }
            Some(waypoints) => {
                let mut racing_line = Vec::with_capacity(waypoints.len());
                for (i, wp) in waypoints.iter().enumerate() {
                    if !track.contains(wp.position) {
                        return Err(TrackError::OutsideTrack {
                            what: format!("waypoint {}", i),
                        });
                    }
                    racing_line.push(Waypoint {
                        position: wp.position,
                        target_speed: wp.target_speed.max(0.0),
                        corner_type: wp.corner_type,
                        brake_zone: wp.brake_zone,
                        safe_zone: wp
                            .safe_zone
                            .unwrap_or_else(|| track.classify_safe_zone(wp.position)),
                    });
                }
                track.set_racing_line(racing_line, RacingLineSource::Provided);
            }
            None => {
                let racing_line = track.default_racing_line();
                if racing_line.len() >= 3 {
                    track.set_racing_line(racing_line, RacingLineSource::Derived);
                } else {
                    log::warn!(
                        "Track {}: could not derive a racing line, AI will steer by direction only",
                        track.name
                    );
                }
            }
        }

        log::debug!(
            "Track {} races {:?}",
            track.name,
            track.racing_direction
        );

        Ok(track)
    }

    // ---------------------------------------------------------------------------------------------
    // ACCESSORS -----------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn outer_boundary(&self) -> &Polygon {
        &self.outer
    }

    pub fn inner_boundary(&self) -> &Polygon {
        &self.inner
    }

    pub fn checkpoints(&self) -> &[TimingLine] {
        &self.checkpoints
    }

    pub fn start_line(&self) -> &TimingLine {
        &self.start_line
    }

    pub fn racing_line(&self) -> &[Waypoint] {
        &self.racing_line
    }

    pub fn racing_line_source(&self) -> RacingLineSource {
        self.racing_line_source
    }

    pub fn racing_direction(&self) -> RacingDirection {
        self.racing_direction
    }

    // ---------------------------------------------------------------------------------------------
    // ANNULUS QUERIES -----------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// True if the point lies on the racing surface. Points on either boundary count as inside.
    pub fn contains(&self, p: Point) -> bool {
        classify_point(p, &self.outer) != PointLocation::Outside
            && classify_point(p, &self.inner) != PointLocation::Inside
    }

    /// True if every point of the straight path lies on the racing surface. Touching or running
    /// along a boundary is allowed, crossing it is not.
    pub fn path_clear(&self, from: Point, to: Point) -> bool {
        if from.distance(to) < EPS {
            return self.contains(from);
        }
        if segment_intersects_polygon(from, to, &self.outer)
            || segment_intersects_polygon(from, to, &self.inner)
        {
            return false;
        }

        // split at every boundary contact; each piece lies on one side of every edge
        let params = split_params(from, to, &[&self.outer, &self.inner]);
        params.iter().all(|&t| self.contains(from.lerp(to, t)))
            && params
                .windows(2)
                .all(|w| self.contains(from.lerp(to, (w[0] + w[1]) / 2.0)))
    }

    /// Relaxed check used by the AI's emergency fallback: the path must not leave the outer
    /// boundary, the inner boundary is ignored.
    pub fn path_within_outer(&self, from: Point, to: Point) -> bool {
        !segment_intersects_polygon(from, to, &self.outer)
            && classify_point(to, &self.outer) != PointLocation::Outside
    }

    /// Distance from the point to the closest boundary edge.
    pub fn clearance(&self, p: Point) -> f64 {
        distance_to_polygon(p, &self.outer).min(distance_to_polygon(p, &self.inner))
    }

    // ---------------------------------------------------------------------------------------------
    // RACING LINE ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// Index of the waypoint closest to the position; ties resolve to the lowest index.
    pub fn nearest_waypoint_index(&self, position: Point) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, wp) in self.racing_line.iter().enumerate() {
            let d = wp.position.distance(position);
            match best {
                Some((_, d_best)) if d >= d_best => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn find_nearest_waypoint(&self, position: Point) -> Option<&Waypoint> {
        self.nearest_waypoint_index(position)
            .map(|i| &self.racing_line[i])
    }

    /// Walks forward along the racing line from the nearest waypoint until the accumulated arc
    /// length reaches `lookahead_distance` and returns the index of the waypoint reached.
    pub fn lookahead_waypoint_index(
        &self,
        position: Point,
        lookahead_distance: f64,
    ) -> Option<usize> {
        let start = self.nearest_waypoint_index(position)?;
        let n = self.racing_line.len();
        let loop_length: f64 = self.leg_lengths.iter().sum();

        if lookahead_distance <= 0.0 || loop_length < EPS {
            return Some(start);
        }

        let distance = lookahead_distance % loop_length;
        let mut idx = start;
        let mut s = 0.0;
        for _ in 0..n {
            if s >= distance {
                break;
            }
            s += self.leg_lengths[idx];
            idx = (idx + 1) % n;
        }
        Some(idx)
    }

    pub fn find_lookahead_waypoint(
        &self,
        position: Point,
        lookahead_distance: f64,
    ) -> Option<&Waypoint> {
        self.lookahead_waypoint_index(position, lookahead_distance)
            .map(|i| &self.racing_line[i])
    }

    /// Safe zone at a position: taken from the nearest waypoint if a racing line exists,
    /// otherwise classified from the position relative to the inner boundary.
    pub fn safe_zone_at(&self, position: Point) -> SafeZone {
        match self.find_nearest_waypoint(position) {
            Some(wp) => wp.safe_zone,
            None => self.classify_safe_zone(position),
        }
    }

    /// Expected unit travel direction at a position.
    pub fn expected_direction_at(&self, position: Point) -> Point {
        self.safe_zone_at(position)
            .expected_direction(self.racing_direction)
    }

    /// Classifies a position by the side of the inner boundary's bounding box it is furthest
    /// beyond. Ties resolve in the order top, right, bottom, left.
    pub fn classify_safe_zone(&self, p: Point) -> SafeZone {
        let (lo, hi) = self.inner_bbox;
        let candidates = [
            (SafeZone::Top, lo.y - p.y),
            (SafeZone::Right, p.x - hi.x),
            (SafeZone::Bottom, p.y - hi.y),
            (SafeZone::Left, lo.x - p.x),
        ];
        let mut best = candidates[0];
        for &c in candidates.iter().skip(1) {
            if c.1 > best.1 {
                best = c;
            }
        }
        best.0
    }

    // ---------------------------------------------------------------------------------------------
    // CONSTRUCTION HELPERS ------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn check_line_on_track(&self, line: &Segment, what: &str) -> Result<(), TrackError> {
        if line.length() < EPS {
            return Err(TrackError::DegenerateSegment {
                what: what.to_owned(),
            });
        }
        if !self.contains(line.midpoint()) {
            return Err(TrackError::OutsideTrack {
                what: what.to_owned(),
            });
        }
        Ok(())
    }

    fn set_racing_line(&mut self, racing_line: Vec<Waypoint>, source: RacingLineSource) {
        let n = racing_line.len();
        self.leg_lengths = (0..n)
            .map(|i| racing_line[i].position.distance(racing_line[(i + 1) % n].position))
            .collect();
        self.racing_line = racing_line;
        self.racing_line_source = source;
    }

    /// Orientation of the loop start line -> checkpoints; falls back to the start line's
    /// forward vector around the inner boundary's center for short loops.
    fn infer_racing_direction(&self) -> RacingDirection {
        let mut ring = vec![self.start_line.line.midpoint()];
        ring.extend(self.checkpoints.iter().map(|cp| cp.line.midpoint()));

        let area = if ring.len() >= 3 {
            Polygon::new(ring).signed_area()
        } else {
            let center = self.inner_bbox.0.lerp(self.inner_bbox.1, 0.5);
            (self.start_line.line.midpoint() - center).cross(self.start_line.forward)
        };

        if area < 0.0 {
            RacingDirection::CounterClockwise
        } else {
            RacingDirection::Clockwise
        }
    }

    /// Default racing line: centerline points found by casting rays from the inner boundary's
    /// center, ordered in racing direction and starting next to the start line. Falls back to
    /// the timing line midpoints if too few rays hit.
    fn default_racing_line(&self) -> Vec<Waypoint> {
        let center = self.inner_bbox.0.lerp(self.inner_bbox.1, 0.5);
        let mut points: Vec<Point> = Vec::with_capacity(DEFAULT_LINE_SAMPLES);

        for k in 0..DEFAULT_LINE_SAMPLES {
            // screen angles grow clockwise with the y axis pointing down
            let k_dir = match self.racing_direction {
                RacingDirection::Clockwise => k,
                RacingDirection::CounterClockwise => DEFAULT_LINE_SAMPLES - k,
            };
            let angle = 2.0 * PI * k_dir as f64 / DEFAULT_LINE_SAMPLES as f64;
            let dir = Point::new(angle.cos(), angle.sin());

            let inner_exit = ray_polygon_params(center, dir, &self.inner)
                .into_iter()
                .fold(0.0, f64::max);
            let outer_hit = ray_polygon_params(center, dir, &self.outer)
                .into_iter()
                .filter(|&t| t > inner_exit + EPS)
                .fold(f64::INFINITY, f64::min);
            if !outer_hit.is_finite() {
                continue;
            }

            let p = center + dir * ((inner_exit + outer_hit) / 2.0);
            if self.contains(p) {
                points.push(p);
            }
        }

        if points.len() < 3 {
            points = std::iter::once(self.start_line.line.midpoint())
                .chain(self.checkpoints.iter().map(|cp| cp.line.midpoint()))
                .collect();
        }
        if points.len() < 3 {
            return Vec::new();
        }

        // begin at the point closest to the start line
        let start_mid = self.start_line.line.midpoint();
        let mut i_start = 0;
        for (i, p) in points.iter().enumerate() {
            if p.distance(start_mid) < points[i_start].distance(start_mid) {
                i_start = i;
            }
        }
        points.rotate_left(i_start);

        let n = points.len();
        let angles: Vec<f64> = (0..n)
            .map(|i| {
                let prev = points[(i + n - 1) % n];
                let next = points[(i + 1) % n];
                turn_angle(points[i] - prev, next - points[i])
            })
            .collect();
        let is_apex = |i: usize| angles[i % n] >= APEX_ANGLE;

        (0..n)
            .map(|i| {
                let corner_type = if is_apex(i) {
                    CornerType::Apex
                } else if is_apex(i + 1) {
                    CornerType::Entry
                } else if is_apex(i + n - 1) {
                    CornerType::Exit
                } else {
                    CornerType::Straight
                };
                Waypoint {
                    position: points[i],
                    target_speed: lin_interp(
                        angles[i],
                        &DEFAULT_SPEED_ANGLES,
                        &DEFAULT_SPEED_VALUES,
                    ),
                    corner_type,
                    brake_zone: corner_type == CornerType::Entry,
                    safe_zone: self.classify_safe_zone(points[i]),
                }
            })
            .collect()
    }
}

/// Unsigned angle between two direction vectors in [0, pi]; zero if either is degenerate.
fn turn_angle(a: Point, b: Point) -> f64 {
    match (a.normalized(), b.normalized()) {
        (Some(a), Some(b)) => a.dot(b).clamp(-1.0, 1.0).acos(),
        _ => 0.0,
    }
}

/// Builds a timing line with a unit forward vector. An explicit forward vector is normalized,
/// otherwise the line normal pointing toward `toward` is used.
fn resolve_timing_line(
    pars: &LinePars,
    toward: Point,
    what: &str,
) -> Result<TimingLine, TrackError> {
    let bad_forward = || TrackError::BadForward {
        what: what.to_owned(),
    };
    let along = pars.line.direction().normalized().ok_or_else(bad_forward)?;

    let forward = match pars.forward {
        Some(f) => {
            let f = f.normalized().ok_or_else(bad_forward)?;
            if f.cross(along).abs() < EPS {
                return Err(bad_forward());
            }
            f
        }
        None => {
            let normal = along.perp();
            let side = (toward - pars.line.midpoint()).dot(normal);
            if side.abs() < EPS {
                return Err(bad_forward());
            }
            if side > 0.0 {
                normal
            } else {
                -normal
            }
        }
    };

    Ok(TimingLine {
        line: pars.line,
        forward,
    })
}

fn check_finite(track_pars: &TrackPars) -> Result<(), TrackError> {
    let mut points = track_pars
        .outer_boundary
        .iter()
        .chain(track_pars.inner_boundary.iter())
        .copied()
        .chain(std::iter::once(track_pars.start_line.line.a))
        .chain(std::iter::once(track_pars.start_line.line.b))
        .chain(track_pars.start_line.forward)
        .chain(
            track_pars
                .checkpoints
                .iter()
                .flat_map(|cp| vec![cp.line.a, cp.line.b].into_iter().chain(cp.forward)),
        );

    let waypoints_ok = track_pars.racing_line.iter().flatten().all(|wp| {
        wp.position.is_finite() && wp.target_speed.is_finite()
    });

    if points.all(|p| p.is_finite()) && waypoints_ok {
        Ok(())
    } else {
        Err(TrackError::NonFinite)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn line(a: [f64; 2], b: [f64; 2]) -> LinePars {
        LinePars {
            line: Segment::new(a.into(), b.into()),
            forward: None,
        }
    }

    /// Rectangular loop driven counter-clockwise on screen: down the left side, right along the
    /// bottom, up the right side, left along the top.
    pub(crate) fn rectangle_pars() -> TrackPars {
        TrackPars {
            name: "rectangle".to_owned(),
            outer_boundary: vec![p(2.0, 2.0), p(48.0, 2.0), p(48.0, 33.0), p(2.0, 33.0)],
            inner_boundary: vec![p(12.0, 10.0), p(38.0, 10.0), p(38.0, 25.0), p(12.0, 25.0)],
            checkpoints: vec![
                line([25.0, 25.0], [25.0, 33.0]),
                line([38.0, 17.0], [48.0, 17.0]),
                line([25.0, 2.0], [25.0, 10.0]),
            ],
            start_line: line([2.0, 17.0], [12.0, 17.0]),
            racing_line: None,
            racing_direction: None,
        }
    }

    pub(crate) fn rectangle_track() -> Track {
        Track::new(&rectangle_pars()).expect("rectangle track is valid")
    }

    #[test]
    fn rectangle_track_loads_with_derived_line() {
        let track = rectangle_track();
        assert_eq!(track.checkpoints().len(), 3);
        assert_eq!(track.racing_direction(), RacingDirection::CounterClockwise);
        assert_eq!(track.racing_line_source(), RacingLineSource::Derived);
        assert!(track.racing_line().len() >= 3);
        for wp in track.racing_line() {
            assert!(track.contains(wp.position));
        }
    }

    #[test]
    fn derived_forward_vectors_follow_checkpoint_order() {
        let track = rectangle_track();
        // start line on the left side points down toward checkpoint 0 on the bottom side
        assert_relative_eq!(track.start_line().forward.y, 1.0);
        // bottom checkpoint points right
        assert_relative_eq!(track.checkpoints()[0].forward.x, 1.0);
        // right checkpoint points up
        assert_relative_eq!(track.checkpoints()[1].forward.y, -1.0);
        // top checkpoint points left, toward the start line
        assert_relative_eq!(track.checkpoints()[2].forward.x, -1.0);
    }

    #[test]
    fn explicit_forward_is_normalized() {
        let mut pars = rectangle_pars();
        pars.start_line.forward = Some(p(0.0, 4.0));
        let track = Track::new(&pars).unwrap();
        assert_relative_eq!(track.start_line().forward.y, 1.0);
    }

    #[test]
    fn forward_along_the_line_is_rejected() {
        let mut pars = rectangle_pars();
        pars.start_line.forward = Some(p(1.0, 0.0));
        assert!(matches!(Track::new(&pars), Err(TrackError::BadForward { .. })));
    }

    #[test]
    fn annulus_membership() {
        let track = rectangle_track();
        assert!(track.contains(p(7.0, 20.0)));
        assert!(!track.contains(p(20.0, 20.0)));
        assert!(!track.contains(p(50.0, 20.0)));
        // boundaries count as racing surface
        assert!(track.contains(p(12.0, 20.0)));
        assert!(track.contains(p(2.0, 20.0)));
    }

    #[test]
    fn path_through_hole_corner_is_blocked() {
        let track = rectangle_track();
        // both endpoints are on the racing surface but the path clips the hole
        assert!(track.contains(p(10.0, 12.0)));
        assert!(track.contains(p(14.0, 8.0)));
        assert!(!track.path_clear(p(10.0, 14.0), p(16.0, 8.0)));
        // running along the inner boundary is fine
        assert!(track.path_clear(p(12.0, 12.0), p(12.0, 20.0)));
    }

    #[test]
    fn path_within_outer_ignores_hole() {
        let track = rectangle_track();
        assert!(track.path_within_outer(p(7.0, 20.0), p(20.0, 20.0)));
        assert!(!track.path_within_outer(p(7.0, 20.0), p(-3.0, 20.0)));
    }

    #[test]
    fn malformed_tracks_are_rejected() {
        let mut pars = rectangle_pars();
        pars.inner_boundary.truncate(2);
        assert!(matches!(Track::new(&pars), Err(TrackError::TooFewPoints { which: "inner", .. })));

        let mut pars = rectangle_pars();
        pars.outer_boundary = vec![p(2.0, 2.0), p(48.0, 33.0), p(48.0, 2.0), p(2.0, 33.0)];
        assert!(matches!(Track::new(&pars), Err(TrackError::NotSimple { which: "outer" })));

        let mut pars = rectangle_pars();
        pars.inner_boundary = vec![p(12.0, 10.0), p(60.0, 10.0), p(60.0, 25.0), p(12.0, 25.0)];
        assert_eq!(Track::new(&pars).unwrap_err(), TrackError::InnerNotInsideOuter);

        let mut pars = rectangle_pars();
        pars.checkpoints.clear();
        assert_eq!(Track::new(&pars).unwrap_err(), TrackError::NoCheckpoints);

        let mut pars = rectangle_pars();
        pars.checkpoints[1] = line([20.0, 20.0], [30.0, 20.0]);
        assert!(matches!(Track::new(&pars), Err(TrackError::OutsideTrack { .. })));

        let mut pars = rectangle_pars();
        pars.outer_boundary[0] = p(f64::NAN, 2.0);
        assert_eq!(Track::new(&pars).unwrap_err(), TrackError::NonFinite);
    }

    #[test]
    fn racing_line_outside_annulus_is_rejected() {
        let mut pars = rectangle_pars();
        pars.racing_line = Some(vec![WaypointPars {
            position: p(25.0, 17.0),
            target_speed: 3.0,
            corner_type: CornerType::Straight,
            brake_zone: false,
            safe_zone: None,
        }]);
        assert!(matches!(Track::new(&pars), Err(TrackError::OutsideTrack { .. })));
    }

    /// Rectangle whose track file lists no waypoints at all.
    pub(crate) fn directionless_track() -> Track {
        let mut pars = rectangle_pars();
        pars.racing_line = Some(Vec::new());
        Track::new(&pars).expect("rectangle track is valid")
    }

    #[test]
    fn empty_racing_line_leaves_direction_only() {
        let track = directionless_track();
        assert_eq!(track.racing_line_source(), RacingLineSource::Missing);
        assert!(track.racing_line().is_empty());
        assert!(track.find_lookahead_waypoint(p(7.0, 20.0), 5.0).is_none());
        assert_eq!(track.racing_direction(), RacingDirection::CounterClockwise);
    }

    fn provided_line_track() -> Track {
        let mut pars = rectangle_pars();
        let wps = [(7.0, 6.0), (7.0, 29.0), (43.0, 29.0), (43.0, 6.0)];
        pars.racing_line = Some(
            wps.iter()
                .map(|&(x, y)| WaypointPars {
                    position: p(x, y),
                    target_speed: 3.0,
                    corner_type: CornerType::Apex,
                    brake_zone: false,
                    safe_zone: None,
                })
                .collect(),
        );
        Track::new(&pars).unwrap()
    }

    #[test]
    fn nearest_and_lookahead_waypoints() {
        let track = provided_line_track();
        assert_eq!(track.racing_line_source(), RacingLineSource::Provided);
        assert_eq!(track.nearest_waypoint_index(p(8.0, 8.0)), Some(0));
        // leg 0 -> 1 is 23 units long, leg 1 -> 2 is 36 units long
        assert_eq!(track.lookahead_waypoint_index(p(8.0, 8.0), 10.0), Some(1));
        assert_eq!(track.lookahead_waypoint_index(p(8.0, 8.0), 30.0), Some(2));
        // wraps around the loop (total length 118)
        assert_eq!(track.lookahead_waypoint_index(p(8.0, 8.0), 118.0 + 10.0), Some(1));
        assert_eq!(track.lookahead_waypoint_index(p(43.0, 7.0), 1.0), Some(0));
        let wp = track.find_lookahead_waypoint(p(8.0, 8.0), 0.0).unwrap();
        assert_eq!(wp.position, p(7.0, 6.0));
    }

    #[test]
    fn safe_zones_and_expected_direction() {
        let track = rectangle_track();
        assert_eq!(track.classify_safe_zone(p(7.0, 20.0)), SafeZone::Left);
        assert_eq!(track.classify_safe_zone(p(25.0, 5.0)), SafeZone::Top);
        assert_eq!(track.classify_safe_zone(p(44.0, 20.0)), SafeZone::Right);
        assert_eq!(track.classify_safe_zone(p(25.0, 30.0)), SafeZone::Bottom);

        // counter-clockwise on screen: down the left side
        let dir = SafeZone::Left.expected_direction(RacingDirection::CounterClockwise);
        assert_relative_eq!(dir.y, 1.0);
        let dir = track.expected_direction_at(p(7.0, 20.0));
        assert_relative_eq!(dir.y, 1.0);
    }

    #[test]
    fn timing_line_direction() {
        let track = rectangle_track();
        let start = track.start_line();
        assert!(start.crossed_forward(p(7.0, 15.0), p(7.0, 19.0)));
        assert!(!start.crossed_forward(p(7.0, 19.0), p(7.0, 15.0)));
        assert!(!start.crossed_forward(p(7.0, 18.0), p(7.0, 21.0)));
    }
}
