use crate::core::car::Car;
use crate::core::errors::RaceError;
use crate::core::geometry::{distance_point_to_segment, GridVec};
use crate::core::track::Track;
use serde::Serialize;

/// Acceleration chosen for one turn. Both components are in -1..=1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Move {
    acceleration: GridVec,
}

/// All nine moves in enumeration order (row by row, y axis pointing down).
pub const ALL_MOVES: [Move; 9] = [
    Move::raw(-1, -1),
    Move::raw(0, -1),
    Move::raw(1, -1),
    Move::raw(-1, 0),
    Move::raw(0, 0),
    Move::raw(1, 0),
    Move::raw(-1, 1),
    Move::raw(0, 1),
    Move::raw(1, 1),
];

impl Move {
    /// The null move: keep the current velocity.
    pub const COAST: Move = Move::raw(0, 0);

    const fn raw(x: i32, y: i32) -> Move {
        Move {
            acceleration: GridVec::new(x, y),
        }
    }

    pub fn new(x: i32, y: i32) -> Result<Move, RaceError> {
        if (-1..=1).contains(&x) && (-1..=1).contains(&y) {
            Ok(Move::raw(x, y))
        } else {
            Err(RaceError::InvalidAcceleration)
        }
    }

    pub fn acceleration(&self) -> GridVec {
        self.acceleration
    }

    pub fn is_coast(&self) -> bool {
        self.acceleration.is_zero()
    }

    /// Squared length of the acceleration (0, 1 or 2).
    pub fn magnitude_sq(&self) -> i32 {
        self.acceleration.x * self.acceleration.x + self.acceleration.y * self.acceleration.y
    }

    /// Numeric keypad layout: 8 is up (negative y), 5 is coasting.
    pub fn from_numpad(key: u8) -> Option<Move> {
        match key {
            1..=9 => {
                let k = (key - 1) as i32;
                Some(Move::raw(k % 3 - 1, 1 - k / 3))
            }
            _ => None,
        }
    }

    pub fn numpad_key(&self) -> u8 {
        ((1 - self.acceleration.y) * 3 + self.acceleration.x + 2) as u8
    }
}

/// Outcome of the legality check for one candidate move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveCheck {
    pub legal: bool,
    pub new_position: GridVec,
    pub new_velocity: GridVec,
}

/// Computes the state after applying `mv` and checks that the straight path from the old to the
/// new position stays on the racing surface. Other cars are not considered.
pub fn check_move(track: &Track, position: GridVec, velocity: GridVec, mv: Move) -> MoveCheck {
    let new_velocity = velocity + mv.acceleration;
    let new_position = position + new_velocity;
    MoveCheck {
        legal: track.path_clear(position.to_point(), new_position.to_point()),
        new_position,
        new_velocity,
    }
}

/// Legality check of a move for the given car.
pub fn is_legal_move(track: &Track, car: &Car, mv: Move) -> MoveCheck {
    check_move(track, car.position(), car.velocity(), mv)
}

/// Relaxed check used by the emergency fallback: only the outer boundary is respected.
pub fn check_move_outer_only(
    track: &Track,
    position: GridVec,
    velocity: GridVec,
    mv: Move,
) -> MoveCheck {
    let new_velocity = velocity + mv.acceleration;
    let new_position = position + new_velocity;
    MoveCheck {
        legal: track.path_within_outer(position.to_point(), new_position.to_point()),
        new_position,
        new_velocity,
    }
}

/// All nine candidates with their check, in enumeration order.
pub fn candidate_moves(
    track: &Track,
    position: GridVec,
    velocity: GridVec,
) -> Vec<(Move, MoveCheck)> {
    ALL_MOVES
        .iter()
        .map(|&mv| (mv, check_move(track, position, velocity, mv)))
        .collect()
}

/// The legal subset of `candidate_moves`, used for move previews.
pub fn legal_moves(track: &Track, position: GridVec, velocity: GridVec) -> Vec<(Move, MoveCheck)> {
    candidate_moves(track, position, velocity)
        .into_iter()
        .filter(|(_, check)| check.legal)
        .collect()
}

/// True if braking at full rate on both axes brings the car to rest without leaving the track.
/// A car in such a state can never be forced off the track.
pub fn can_stop(track: &Track, position: GridVec, velocity: GridVec) -> bool {
    let mut position = position;
    let mut velocity = velocity;

    while !velocity.is_zero() {
        let braking = Move::raw(-velocity.x.signum(), -velocity.y.signum());
        let check = check_move(track, position, velocity, braking);
        if !check.legal {
            return false;
        }
        position = check.new_position;
        velocity = check.new_velocity;
    }
    true
}

/// Index of the first obstacle whose position lies within `radius` of the path, if any.
pub fn path_collides(
    from: GridVec,
    to: GridVec,
    obstacles: &[GridVec],
    radius: f64,
) -> Option<usize> {
    obstacles.iter().position(|&o| {
        distance_point_to_segment(o.to_point(), from.to_point(), to.to_point()) < radius
    })
}
