use crate::core::driver::Difficulty;
use crate::core::geometry::GridVec;
use crate::core::state_handler::{ProgressEvents, StateHandler};
use crate::core::track::Track;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a car in the race arena (grid order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CarId(pub usize);

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PilotKind {
    Ai,
    Human,
}

impl Default for PilotKind {
    fn default() -> Self {
        PilotKind::Ai
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pilot {
    Human,
    Ai(Difficulty),
}

/// * `car_no` - Car number, unique within a race
/// * `name` - Display name
/// * `pilot` - Who chooses the moves (ai or human)
/// * `difficulty` - AI difficulty tier (ignored for human seats)
/// * `start_position` - (OPTIONAL) Explicit grid position, otherwise generated from the start line
#[derive(Debug, Deserialize, Clone)]
pub struct CarPars {
    pub car_no: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pilot: PilotKind,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub start_position: Option<GridVec>,
}

impl CarPars {
    pub fn get_pilot(&self) -> Pilot {
        match self.pilot {
            PilotKind::Human => Pilot::Human,
            PilotKind::Ai => Pilot::Ai(self.difficulty),
        }
    }
}

/// Car state. Fields are only mutated by the race on this car's turn; everybody else reads
/// through the getters.
#[derive(Debug, Clone)]
pub struct Car {
    id: CarId,
    car_no: u32,
    name: String,
    pilot: Pilot,
    position: GridVec,
    velocity: GridVec,
    crashed: bool,
    finish_turn: Option<u32>,
    trail: Vec<GridVec>,
    stuck_turns: u32,
    sh: StateHandler,
}

impl Car {
    pub fn new(
        id: CarId,
        car_pars: &CarPars,
        start_position: GridVec,
        no_checkpoints: usize,
        required_laps: u32,
    ) -> Car {
        let name = if car_pars.name.is_empty() {
            format!("Car {}", car_pars.car_no)
        } else {
            car_pars.name.to_owned()
        };

        Car {
            id,
            car_no: car_pars.car_no,
            name,
            pilot: car_pars.get_pilot(),
            position: start_position,
            velocity: GridVec::ZERO,
            crashed: false,
            finish_turn: None,
            trail: vec![start_position],
            stuck_turns: 0,
            sh: StateHandler::new(no_checkpoints, required_laps),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // GETTERS -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn id(&self) -> CarId {
        self.id
    }

    pub fn car_no(&self) -> u32 {
        self.car_no
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pilot(&self) -> Pilot {
        self.pilot
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        match self.pilot {
            Pilot::Ai(difficulty) => Some(difficulty),
            Pilot::Human => None,
        }
    }

    pub fn position(&self) -> GridVec {
        self.position
    }

    pub fn velocity(&self) -> GridVec {
        self.velocity
    }

    pub fn crashed(&self) -> bool {
        self.crashed
    }

    pub fn finished(&self) -> bool {
        self.sh.is_finished()
    }

    pub fn finish_turn(&self) -> Option<u32> {
        self.finish_turn
    }

    /// A car is active while it has neither crashed nor finished.
    pub fn is_active(&self) -> bool {
        !self.crashed && !self.finished()
    }

    pub fn laps_completed(&self) -> u32 {
        self.sh.get_compl_laps()
    }

    pub fn next_checkpoint(&self) -> usize {
        self.sh.get_next_checkpoint()
    }

    pub fn race_prog(&self) -> f64 {
        self.sh.get_race_prog()
    }

    /// All positions the car has occupied, starting with its grid position.
    pub fn trail(&self) -> &[GridVec] {
        &self.trail
    }

    pub fn stuck_turns(&self) -> u32 {
        self.stuck_turns
    }

    // ---------------------------------------------------------------------------------------------
    // MUTATORS (RACE ONLY) ------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// drive_to moves the car along a legal path and lets the state handler evaluate it.
    pub(crate) fn drive_to(
        &mut self,
        track: &Track,
        new_position: GridVec,
        new_velocity: GridVec,
        cur_turn: u32,
    ) -> ProgressEvents {
        let events =
            self.sh
                .check_state_transition(track, self.position.to_point(), new_position.to_point());
        self.position = new_position;
        self.velocity = new_velocity;
        self.trail.push(new_position);
        if events.finished {
            self.finish_turn = Some(cur_turn);
        }
        events
    }

    pub(crate) fn crash(&mut self) {
        self.crashed = true;
    }

    /// Rejected by a collision: the car keeps its place and loses its speed.
    pub(crate) fn stop(&mut self) {
        self.velocity = GridVec::ZERO;
        self.trail.push(self.position);
    }

    pub(crate) fn set_stuck(&mut self, stuck: bool) -> u32 {
        if stuck {
            self.stuck_turns += 1;
        } else {
            self.stuck_turns = 0;
        }
        self.stuck_turns
    }

    /// Test helper: places the car with the given velocity.
    #[cfg(test)]
    pub(crate) fn place(&mut self, position: GridVec, velocity: GridVec) {
        self.position = position;
        self.velocity = velocity;
    }
}
