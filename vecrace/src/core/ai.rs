//! AI decision engine. Every legal candidate move is scored as a weighted sum of named factors;
//! the difficulty tier only supplies the numbers.

use crate::core::car::Car;
use crate::core::driver::{
    Difficulty, DifficultyParams, Factor, BOUNDARY_TIERS, FACTORS, NO_FACTORS,
};
use crate::core::geometry::{GridVec, Point};
use crate::core::movement::{
    can_stop, check_move, check_move_outer_only, legal_moves, path_collides, Move, MoveCheck,
    ALL_MOVES,
};
use crate::core::track::{Track, Waypoint};
use helpers::general::argmax_by;
use log::debug;
use serde::Serialize;
use std::cmp::Ordering;

/// Alignment below which a candidate counts as driving backwards.
const BACKWARD_ALIGNMENT: f64 = -0.5;

/// Share of the waypoint target speed kept when the waypoint lies in a brake zone.
const BRAKE_ZONE_SCALE: f64 = 0.75;

/// Default radius (grid units) used for the rival proximity factor.
pub const DEFAULT_COLLISION_RADIUS: f64 = 0.5;

/// Score of one legal candidate. `factors` holds the unweighted factor values in the order of
/// `FACTORS`. `dead_end` is set if the car could no longer brake to a standstill after the move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub mv: Move,
    pub check: MoveCheck,
    pub factors: [f64; NO_FACTORS],
    pub score: f64,
    pub dist_to_target: f64,
    pub dead_end: bool,
}

impl CandidateScore {
    pub fn factor(&self, factor: Factor) -> f64 {
        self.factors[factor as usize]
    }
}

/// Outcome of one AI decision together with the diagnostics behind it.
///
/// * `fallback` - No candidate was legal, the move came from the emergency fallback
/// * `stuck` - Even the fallback found nothing; the null move was forced
/// * `desperate` - No legal candidate leaves the car able to brake to a standstill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub mv: Move,
    pub target: Option<Waypoint>,
    pub target_speed: f64,
    pub candidates: Vec<CandidateScore>,
    pub fallback: bool,
    pub stuck: bool,
    pub desperate: bool,
}

#[derive(Debug, Clone)]
pub struct AiDriver {
    difficulty: Difficulty,
    params: DifficultyParams,
    collision_radius: f64,
}

impl AiDriver {
    pub fn new(difficulty: Difficulty) -> AiDriver {
        AiDriver {
            difficulty,
            params: difficulty.params(),
            collision_radius: DEFAULT_COLLISION_RADIUS,
        }
    }

    pub fn with_collision_radius(mut self, collision_radius: f64) -> AiDriver {
        self.collision_radius = collision_radius;
        self
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn params(&self) -> &DifficultyParams {
        &self.params
    }

    /// decide chooses a move for the car. `rivals` are the positions of the other active cars;
    /// they only enter through the soft proximity factor.
    pub fn decide(&self, track: &Track, car: &Car, rivals: &[GridVec]) -> Decision {
        let position = car.position();
        let velocity = car.velocity();
        let pos = position.to_point();

        let target = track
            .find_lookahead_waypoint(pos, self.params.lookahead_distance)
            .copied();
        let target_speed = match target {
            Some(wp) if wp.brake_zone => {
                self.params.target_speed(wp.target_speed * BRAKE_ZONE_SCALE)
            }
            Some(wp) => self.params.target_speed(wp.target_speed),
            None => self.params.default_target_speed(),
        };
        let expected = track.expected_direction_at(pos);

        let candidates: Vec<CandidateScore> = legal_moves(track, position, velocity)
            .into_iter()
            .map(|(mv, check)| {
                self.score_candidate(
                    track,
                    position,
                    mv,
                    check,
                    target.as_ref(),
                    target_speed,
                    expected,
                    rivals,
                )
            })
            .collect();

        let idx_best = match argmax_by(&candidates, compare_candidates) {
            Some(idx) => idx,
            None => return self.fallback(track, position, velocity, target, target_speed),
        };

        let desperate = candidates.iter().all(|c| c.dead_end);
        let best = &candidates[idx_best];
        debug!(
            "Car {} ({}) picks acceleration ({}, {}) with score {:.3}{}",
            car.car_no(),
            self.difficulty,
            best.mv.acceleration().x,
            best.mv.acceleration().y,
            best.score,
            if desperate { ", all candidates are dead ends" } else { "" }
        );

        Decision {
            mv: best.mv,
            target,
            target_speed,
            candidates,
            fallback: false,
            stuck: false,
            desperate,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn score_candidate(
        &self,
        track: &Track,
        position: GridVec,
        mv: Move,
        check: MoveCheck,
        target: Option<&Waypoint>,
        target_speed: f64,
        expected: Point,
        rivals: &[GridVec],
    ) -> CandidateScore {
        let new_pos = check.new_position.to_point();
        let new_vel = check.new_velocity.to_point();

        let dist_to_target = target.map_or(0.0, |wp| new_pos.distance(wp.position));
        let alignment = new_vel.normalized().map_or(0.0, |v| v.dot(expected));
        let dead_end = !can_stop(track, check.new_position, check.new_velocity);

        let mut factors = [0.0; NO_FACTORS];
        for factor in FACTORS.iter() {
            factors[*factor as usize] = match factor {
                Factor::RacingLine => -dist_to_target,
                Factor::Speed => {
                    -(new_vel.length() - target_speed).abs() / self.params.speed_tolerance
                }
                Factor::Direction => alignment,
                Factor::Boundary => -boundary_penalty(track.clearance(new_pos)),
                Factor::Lookahead => {
                    if dead_end {
                        -1.0
                    } else {
                        0.0
                    }
                }
                Factor::Backward => {
                    if alignment < BACKWARD_ALIGNMENT {
                        -1.0
                    } else {
                        0.0
                    }
                }
                Factor::RivalProximity => {
                    let hit =
                        path_collides(position, check.new_position, rivals, self.collision_radius);
                    if hit.is_some() {
                        -1.0
                    } else {
                        0.0
                    }
                }
            };
        }

        let score: f64 = FACTORS
            .iter()
            .map(|&f| self.params.weight(f) * factors[f as usize])
            .sum();

        CandidateScore {
            mv,
            check,
            factors,
            score,
            dist_to_target,
            dead_end,
        }
    }

    /// Emergency fallback when no candidate is legal: the null move alone, then the first move
    /// that stays within the outer boundary, else the null move with the stuck flag set.
    fn fallback(
        &self,
        track: &Track,
        position: GridVec,
        velocity: GridVec,
        target: Option<Waypoint>,
        target_speed: f64,
    ) -> Decision {
        let mut decision = Decision {
            mv: Move::COAST,
            target,
            target_speed,
            candidates: Vec::new(),
            fallback: true,
            stuck: false,
            desperate: true,
        };

        if check_move(track, position, velocity, Move::COAST).legal {
            return decision;
        }

        if let Some(&mv) = ALL_MOVES
            .iter()
            .find(|&&mv| check_move_outer_only(track, position, velocity, mv).legal)
        {
            decision.mv = mv;
            return decision;
        }

        decision.stuck = true;
        decision
    }
}

/// choose_move returns the move the AI of the given difficulty would make, ignoring rivals.
pub fn choose_move(track: &Track, car: &Car, difficulty: Difficulty) -> Move {
    AiDriver::new(difficulty).decide(track, car, &[]).mv
}

/// Penalty of the tightest boundary tier the clearance falls into.
fn boundary_penalty(clearance: f64) -> f64 {
    BOUNDARY_TIERS
        .iter()
        .filter(|(margin, _)| clearance < *margin)
        .map(|(_, penalty)| *penalty)
        .fold(0.0, f64::max)
}

/// Orders candidates so that the better one compares greater: higher score, then closer to the
/// target, then smaller acceleration. Remaining ties keep enumeration order.
fn compare_candidates(a: &CandidateScore, b: &CandidateScore) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| b.dist_to_target.total_cmp(&a.dist_to_target))
        .then_with(|| b.mv.magnitude_sq().cmp(&a.mv.magnitude_sq()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::car::tests::ai_car;
    use crate::core::track::tests::{directionless_track, rectangle_track};
    use approx::assert_relative_eq;

    const DIFFICULTIES: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    fn candidate(mv: Move, score: f64, dist_to_target: f64) -> CandidateScore {
        CandidateScore {
            mv,
            check: MoveCheck {
                legal: true,
                new_position: GridVec::ZERO,
                new_velocity: GridVec::ZERO,
            },
            factors: [0.0; NO_FACTORS],
            score,
            dist_to_target,
            dead_end: false,
        }
    }

    #[test]
    fn boundary_penalty_tiers() {
        assert_relative_eq!(boundary_penalty(5.0), 0.0);
        assert_relative_eq!(boundary_penalty(2.5), 1.0);
        assert_relative_eq!(boundary_penalty(1.5), 4.0);
        assert_relative_eq!(boundary_penalty(0.0), 16.0);
    }

    #[test]
    fn ties_prefer_target_then_small_acceleration() {
        let diag = Move::new(1, 1).unwrap();
        let side = Move::new(1, 0).unwrap();

        let cands = [candidate(diag, 1.0, 2.0), candidate(side, 1.0, 3.0)];
        assert_eq!(argmax_by(&cands, compare_candidates), Some(0));

        let cands = [
            candidate(diag, 1.0, 2.0),
            candidate(side, 1.0, 2.0),
            candidate(Move::COAST, 1.0, 2.0),
        ];
        assert_eq!(argmax_by(&cands, compare_candidates), Some(2));

        let cands = [candidate(side, 1.0, 2.0), candidate(Move::new(0, 1).unwrap(), 1.0, 2.0)];
        assert_eq!(argmax_by(&cands, compare_candidates), Some(0));

        let cands = [candidate(side, 0.5, 0.0), candidate(diag, 1.0, 9.0)];
        assert_eq!(argmax_by(&cands, compare_candidates), Some(1));
    }

    #[test]
    fn chosen_move_is_legal_whenever_one_exists() {
        let track = rectangle_track();
        let mut checked = 0;
        for x in (2..=48).step_by(3) {
            for y in (2..=33).step_by(3) {
                let position = GridVec::new(x, y);
                if !track.contains(position.to_point()) {
                    continue;
                }
                for &(vx, vy) in [(0, 0), (0, 3), (3, 0), (-2, -2), (4, -1), (-5, 0)].iter() {
                    let velocity = GridVec::new(vx, vy);
                    if legal_moves(&track, position, velocity).is_empty() {
                        continue;
                    }
                    for &difficulty in DIFFICULTIES.iter() {
                        let car = ai_car(position, velocity, difficulty);
                        let mv = choose_move(&track, &car, difficulty);
                        assert!(
                            check_move(&track, position, velocity, mv).legal,
                            "illegal choice at {:?} with velocity {:?}",
                            position,
                            velocity
                        );
                        checked += 1;
                    }
                }
            }
        }
        assert!(checked > 100);
    }

    #[test]
    fn dead_ends_are_avoided_when_possible() {
        let track = rectangle_track();
        for x in (3..=47).step_by(4) {
            for y in (3..=32).step_by(4) {
                let position = GridVec::new(x, y);
                if !track.contains(position.to_point()) {
                    continue;
                }
                for &(vx, vy) in [(0, 4), (4, 0), (-4, 0), (0, -4), (3, 3)].iter() {
                    let car = ai_car(position, GridVec::new(vx, vy), Difficulty::Easy);
                    let decision = AiDriver::new(Difficulty::Easy).decide(&track, &car, &[]);
                    if decision.candidates.iter().any(|c| !c.dead_end) {
                        let chosen = decision
                            .candidates
                            .iter()
                            .find(|c| c.mv == decision.mv)
                            .unwrap();
                        assert!(!chosen.dead_end);
                    }
                }
            }
        }
    }

    #[test]
    fn decision_is_deterministic() {
        let track = rectangle_track();
        let car = ai_car(GridVec::new(7, 20), GridVec::new(0, 3), Difficulty::Medium);
        let driver = AiDriver::new(Difficulty::Medium);
        let first = driver.decide(&track, &car, &[GridVec::new(8, 26)]);
        for _ in 0..5 {
            assert_eq!(driver.decide(&track, &car, &[GridVec::new(8, 26)]), first);
        }
    }

    #[test]
    fn keeps_driving_forward_on_the_straight() {
        let track = rectangle_track();
        for &difficulty in DIFFICULTIES.iter() {
            let car = ai_car(GridVec::new(7, 18), GridVec::new(0, 1), difficulty);
            let decision = AiDriver::new(difficulty).decide(&track, &car, &[]);
            let chosen = decision
                .candidates
                .iter()
                .find(|c| c.mv == decision.mv)
                .unwrap();
            assert!(chosen.check.new_velocity.y > 0);
            assert!(decision.target.is_some());
            assert!(!decision.fallback);
        }
    }

    #[test]
    fn brakes_before_the_bottom_wall() {
        let track = rectangle_track();
        // 11 cells of track left below, braking from 5 needs 10
        for &difficulty in DIFFICULTIES.iter() {
            let car = ai_car(GridVec::new(7, 22), GridVec::new(0, 5), difficulty);
            let decision = AiDriver::new(difficulty).decide(&track, &car, &[]);
            assert!(!decision.desperate);
            assert!(decision.mv.acceleration().y < 0, "{} did not brake", difficulty);

            let safe: Vec<&CandidateScore> =
                decision.candidates.iter().filter(|c| !c.dead_end).collect();
            assert_eq!(safe.len(), 3);
            assert!(safe.iter().all(|c| c.mv.acceleration().y == -1));
        }
    }

    #[test]
    fn steers_by_direction_without_racing_line() {
        let track = directionless_track();
        for &difficulty in DIFFICULTIES.iter() {
            let position = GridVec::new(7, 20);
            let velocity = GridVec::new(0, 2);
            let car = ai_car(position, velocity, difficulty);
            let driver = AiDriver::new(difficulty);
            let decision = driver.decide(&track, &car, &[]);

            assert!(decision.target.is_none());
            assert!(!decision.fallback);
            assert_relative_eq!(decision.target_speed, driver.params().default_target_speed());
            let check = check_move(&track, position, velocity, decision.mv);
            assert!(check.legal);
            assert!(check.new_velocity.y > 0);
            assert!(decision.candidates.iter().all(|c| c.factor(Factor::RacingLine) == 0.0));
        }
    }

    #[test]
    fn rival_in_the_path_is_penalized() {
        let track = rectangle_track();
        let car = ai_car(GridVec::new(7, 20), GridVec::new(0, 3), Difficulty::Medium);
        let decision =
            AiDriver::new(Difficulty::Medium).decide(&track, &car, &[GridVec::new(7, 22)]);
        let coast = decision
            .candidates
            .iter()
            .find(|c| c.mv == Move::COAST)
            .unwrap();
        assert_relative_eq!(coast.factor(Factor::RivalProximity), -1.0);
        let swerve = decision
            .candidates
            .iter()
            .find(|c| c.mv == Move::new(1, 0).unwrap())
            .unwrap();
        assert_relative_eq!(swerve.factor(Factor::RivalProximity), 0.0);
    }

    #[test]
    fn boxed_in_car_is_stuck() {
        let track = rectangle_track();
        // heading through the left wall far too fast
        let car = ai_car(GridVec::new(7, 20), GridVec::new(-8, 0), Difficulty::Medium);
        let decision = AiDriver::new(Difficulty::Medium).decide(&track, &car, &[]);
        assert!(decision.candidates.is_empty());
        assert!(decision.fallback);
        assert!(decision.stuck);
        assert_eq!(decision.mv, Move::COAST);
    }

    #[test]
    fn fallback_uses_relaxed_check() {
        let track = rectangle_track();
        // every move ends inside the hole, none leaves the outer boundary
        let car = ai_car(GridVec::new(10, 17), GridVec::new(8, 0), Difficulty::Hard);
        let decision = AiDriver::new(Difficulty::Hard).decide(&track, &car, &[]);
        assert!(decision.fallback);
        assert!(!decision.stuck);
        assert_eq!(decision.mv, ALL_MOVES[0]);
    }
}
