use crate::core::ai::Decision;
use crate::core::car::Car;
use crate::core::geometry::GridVec;
use crate::core::movement::{Move, MoveCheck};
use crate::core::race::TurnResult;
use crate::post::race_result::RaceResult;
use serde::Serialize;

/// Snapshot of one car as handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarState {
    pub car_no: u32,
    pub name: String,
    pub position: GridVec,
    pub velocity: GridVec,
    pub crashed: bool,
    pub finished: bool,
    pub laps_completed: u32,
    pub next_checkpoint: usize,
    pub race_prog: f64,
}

impl CarState {
    pub fn from_car(car: &Car) -> CarState {
        CarState {
            car_no: car.car_no(),
            name: car.name().to_owned(),
            position: car.position(),
            velocity: car.velocity(),
            crashed: car.crashed(),
            finished: car.finished(),
            laps_completed: car.laps_completed(),
            next_checkpoint: car.next_checkpoint(),
            race_prog: car.race_prog(),
        }
    }
}

/// Legal candidate of the active car, keyed by its numeric keypad digit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovePreview {
    pub key: u8,
    pub mv: Move,
    pub new_position: GridVec,
    pub new_velocity: GridVec,
}

impl MovePreview {
    pub fn new(mv: Move, check: &MoveCheck) -> MovePreview {
        MovePreview {
            key: mv.numpad_key(),
            mv,
            new_position: check.new_position,
            new_velocity: check.new_velocity,
        }
    }
}

/// RaceState is sent to observers after every turn. `final_result` is only set in the last
/// message of a race.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RaceState {
    pub turn: u32,
    pub car_states: Vec<CarState>,
    pub active_car_no: Option<u32>,
    pub move_preview: Vec<MovePreview>,
    pub last_turn: Option<TurnResult>,
    pub ai_decision: Option<Decision>,
    pub final_result: Option<RaceResult>,
}
