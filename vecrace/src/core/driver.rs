use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// AI difficulty tier. Tiers only change numeric parameters, never the decision algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(format!("unknown difficulty '{}' (expected easy, medium or hard)", s)),
        }
    }
}

/// Named scoring factors of the AI in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    RacingLine,
    Speed,
    Direction,
    Boundary,
    Lookahead,
    Backward,
    RivalProximity,
}

pub const NO_FACTORS: usize = 7;

pub const FACTORS: [Factor; NO_FACTORS] = [
    Factor::RacingLine,
    Factor::Speed,
    Factor::Direction,
    Factor::Boundary,
    Factor::Lookahead,
    Factor::Backward,
    Factor::RivalProximity,
];

/// Boundary clearance tiers (grid units) and the penalty applied inside each tier. A position
/// closer than a tier's margin receives that tier's penalty; the tightest tier wins.
pub const BOUNDARY_TIERS: [(f64, f64); 3] = [(3.0, 1.0), (2.0, 4.0), (1.0, 16.0)];

/// * `min_speed`, `max_speed` - Range the target speed is clamped to
/// * `speed_scale` - Factor applied to the waypoint target speed
/// * `speed_tolerance` - Speed deviation that costs one unit of the speed factor
/// * `lookahead_distance` - Arc length along the racing line to the targeted waypoint
/// * `weights` - Weight per factor, indexed like `FACTORS`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DifficultyParams {
    pub min_speed: f64,
    pub max_speed: f64,
    pub speed_scale: f64,
    pub speed_tolerance: f64,
    pub lookahead_distance: f64,
    pub weights: [f64; NO_FACTORS],
}

impl DifficultyParams {
    pub fn weight(&self, factor: Factor) -> f64 {
        self.weights[factor as usize]
    }

    /// target_speed scales a waypoint target speed and clamps it to the tier's range.
    pub fn target_speed(&self, waypoint_speed: f64) -> f64 {
        (waypoint_speed * self.speed_scale).max(self.min_speed).min(self.max_speed)
    }

    /// Target used when the track has no racing line at all.
    pub fn default_target_speed(&self) -> f64 {
        0.5 * (self.min_speed + self.max_speed)
    }
}

impl Difficulty {
    pub fn params(self) -> DifficultyParams {
        // weights: racing line, speed, direction, boundary, lookahead, backward, rival proximity
        match self {
            Difficulty::Easy => DifficultyParams {
                min_speed: 1.0,
                max_speed: 4.0,
                speed_scale: 0.6,
                speed_tolerance: 2.0,
                lookahead_distance: 3.0,
                weights: [3.0, 1.0, 2.0, 2.0, 200.0, 50.0, 2.0],
            },
            Difficulty::Medium => DifficultyParams {
                min_speed: 1.0,
                max_speed: 5.0,
                speed_scale: 0.8,
                speed_tolerance: 1.5,
                lookahead_distance: 5.0,
                weights: [3.0, 1.0, 2.0, 1.0, 200.0, 50.0, 2.0],
            },
            Difficulty::Hard => DifficultyParams {
                min_speed: 2.0,
                max_speed: 6.0,
                speed_scale: 1.0,
                speed_tolerance: 1.0,
                lookahead_distance: 8.0,
                weights: [3.0, 1.5, 2.0, 0.5, 200.0, 50.0, 2.0],
            },
        }
    }
}
