use crate::core::ai::{AiDriver, Decision, DEFAULT_COLLISION_RADIUS};
use crate::core::car::{Car, CarId, CarPars, Pilot};
use crate::core::errors::RaceError;
use crate::core::geometry::{GridVec, EPS};
use crate::core::movement::{self, is_legal_move, path_collides, Move, MoveCheck};
use crate::core::state_handler::ProgressEvents;
use crate::core::track::Track;
use crate::interfaces::race_state::{CarState, MovePreview, RaceState};
use crate::post::race_result::{CarResult, CarTrail, RaceEvent, RaceEventKind, RaceResult};
use helpers::general::{argsort, SortOrder};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Number of rows behind the start line searched for grid slots.
const MAX_GRID_ROWS: i32 = 8;

fn default_required_laps() -> u32 {
    1
}

fn default_collision_radius() -> f64 {
    DEFAULT_COLLISION_RADIUS
}

fn default_max_turns() -> u32 {
    500
}

fn default_stuck_turn_limit() -> u32 {
    3
}

/// * `track_name` - (OPTIONAL) Track file to load if the parameter file carries no track
/// * `required_laps` - Laps needed to finish
/// * `collisions_enabled` - Reject moves passing too close to another active car
/// * `collision_radius` - (grid units) Distance below which two cars collide
/// * `max_turns` - Maximum number of turns per car before the race is stopped
/// * `stuck_turn_limit` - Consecutive fallback or dead-end decisions that count as a soft-lock
/// * `participants` - Car numbers taking part
/// * `grid_seed` - (OPTIONAL) Seed used to shuffle the grid order
#[derive(Debug, Deserialize, Clone)]
pub struct RacePars {
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default = "default_required_laps")]
    pub required_laps: u32,
    #[serde(default)]
    pub collisions_enabled: bool,
    #[serde(default = "default_collision_radius")]
    pub collision_radius: f64,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_stuck_turn_limit")]
    pub stuck_turn_limit: u32,
    pub participants: Vec<u32>,
    #[serde(default)]
    pub grid_seed: Option<u64>,
}

/// Race options passed to the turn executor and the AI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RaceConfig {
    pub required_laps: u32,
    pub collisions_enabled: bool,
    pub collision_radius: f64,
    pub max_turns: u32,
    pub stuck_turn_limit: u32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        RaceConfig {
            required_laps: default_required_laps(),
            collisions_enabled: false,
            collision_radius: default_collision_radius(),
            max_turns: default_max_turns(),
            stuck_turn_limit: default_stuck_turn_limit(),
        }
    }
}

impl RaceConfig {
    pub fn from_pars(race_pars: &RacePars) -> RaceConfig {
        RaceConfig {
            required_laps: race_pars.required_laps,
            collisions_enabled: race_pars.collisions_enabled,
            collision_radius: race_pars.collision_radius,
            max_turns: race_pars.max_turns,
            stuck_turn_limit: race_pars.stuck_turn_limit,
        }
    }
}

/// Result of one applied move.
///
/// * `legal` - False if the move crashed the car or was rejected by a collision
/// * `crashed` - The path left the racing surface; the car is out of the race
/// * `collision` - The move was rejected because it passed the given car
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResult {
    pub turn: u32,
    pub car_id: CarId,
    pub car: CarState,
    pub mv: Move,
    pub legal: bool,
    pub crashed: bool,
    pub collision: Option<CarId>,
    pub checkpoint_passed: Option<usize>,
    pub lap_completed: bool,
    pub finished: bool,
}

/// Race owns all cars and is the only place where they are mutated. Cars move one at a time in
/// grid order; crashed and finished cars are skipped.
#[derive(Debug)]
pub struct Race {
    track: Track,
    config: RaceConfig,
    cars_list: Vec<Car>,
    ai_drivers: Vec<Option<AiDriver>>,
    active_idx: usize,
    cur_turn: u32,
    finish_order: Vec<CarId>,
    events: Vec<RaceEvent>,
    last_turn: Option<TurnResult>,
    last_decision: Option<Decision>,
}

impl Race {
    pub fn new(
        race_pars: &RacePars,
        track: Track,
        car_pars_all: &HashMap<u32, CarPars>,
    ) -> Result<Race, RaceError> {
        let config = RaceConfig::from_pars(race_pars);

        if config.required_laps == 0 {
            return Err(RaceError::NoLaps);
        }
        if race_pars.participants.is_empty() {
            return Err(RaceError::NoParticipants);
        }

        // resolve participants
        let mut seen = HashSet::with_capacity(race_pars.participants.len());
        let mut grid: Vec<&CarPars> = Vec::with_capacity(race_pars.participants.len());

        for car_no in race_pars.participants.iter() {
            if !seen.insert(*car_no) {
                return Err(RaceError::DuplicateCarNo(*car_no));
            }
            grid.push(
                car_pars_all
                    .get(car_no)
                    .ok_or(RaceError::UnknownCarNo(*car_no))?,
            );
        }

        if let Some(seed) = race_pars.grid_seed {
            let mut rng = StdRng::seed_from_u64(seed);
            grid.shuffle(&mut rng);
        }

        // create cars in grid order
        let start_positions = assign_start_positions(&track, &grid)?;
        let no_checkpoints = track.checkpoints().len();

        let cars_list: Vec<Car> = grid
            .iter()
            .zip(start_positions.iter())
            .enumerate()
            .map(|(i, (car_pars, &start))| {
                Car::new(CarId(i), car_pars, start, no_checkpoints, config.required_laps)
            })
            .collect();

        let ai_drivers = grid
            .iter()
            .map(|car_pars| match car_pars.get_pilot() {
                Pilot::Ai(difficulty) => {
                    Some(AiDriver::new(difficulty).with_collision_radius(config.collision_radius))
                }
                Pilot::Human => None,
            })
            .collect();

        for car in cars_list.iter() {
            debug!(
                "Car {} ({}) starts at ({}, {})",
                car.car_no(),
                car.name(),
                car.position().x,
                car.position().y
            );
        }
        info!(
            "Race on {} with {} cars over {} laps",
            track.name,
            cars_list.len(),
            config.required_laps
        );

        Ok(Race {
            track,
            config,
            cars_list,
            ai_drivers,
            active_idx: 0,
            cur_turn: 1,
            finish_order: Vec::new(),
            events: Vec::new(),
            last_turn: None,
            last_decision: None,
        })
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHODS --------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// apply_move executes the move of the active car. Illegal moves are not errors: they crash
    /// the car and are reported through the turn result.
    pub fn apply_move(&mut self, car_id: CarId, mv: Move) -> Result<TurnResult, RaceError> {
        let idx = self.check_turn(car_id)?;
        self.last_decision = None;

        let result = self.execute_move(idx, mv);
        self.last_turn = Some(result.clone());
        self.advance_turn();

        Ok(result)
    }

    /// play_ai_turn lets the AI of the active car decide and applies its move.
    pub fn play_ai_turn(&mut self) -> Result<TurnResult, RaceError> {
        let car_id = self.active_car().ok_or(RaceError::RaceOver)?;
        let idx = car_id.0;

        let decision = {
            let driver = self.ai_drivers[idx]
                .as_ref()
                .ok_or(RaceError::NotAiControlled(idx))?;
            driver.decide(&self.track, &self.cars_list[idx], &self.rival_positions(idx))
        };

        let turn = self.cur_turn;
        let car_no = self.cars_list[idx].car_no();

        if decision.stuck {
            warn!("Car {} has no usable move in turn {}, forcing the null move", car_no, turn);
            self.push_event(turn, car_no, RaceEventKind::AiStuck);
        } else if decision.fallback {
            warn!("Car {} uses the emergency fallback in turn {}", car_no, turn);
            self.push_event(turn, car_no, RaceEventKind::Fallback);
        }

        let stuck_turns = self.cars_list[idx].set_stuck(decision.fallback || decision.desperate);
        if self.config.stuck_turn_limit > 0 && stuck_turns == self.config.stuck_turn_limit {
            warn!(
                "Car {} is soft-locked after {} turns without a safe move",
                car_no, stuck_turns
            );
            self.push_event(turn, car_no, RaceEventKind::SoftLock { stuck_turns });
        }

        let result = self.apply_move(car_id, decision.mv)?;
        self.last_decision = Some(decision);

        Ok(result)
    }

    fn execute_move(&mut self, idx: usize, mv: Move) -> TurnResult {
        let turn = self.cur_turn;
        let car_no = self.cars_list[idx].car_no();
        let check = is_legal_move(&self.track, &self.cars_list[idx], mv);

        let mut legal = check.legal;
        let mut crashed = false;
        let mut collision = None;
        let mut progress = ProgressEvents::default();

        if !check.legal {
            self.cars_list[idx].crash();
            crashed = true;
            warn!(
                "Car {} crashed in turn {} heading for ({}, {})",
                car_no, turn, check.new_position.x, check.new_position.y
            );
            self.push_event(turn, car_no, RaceEventKind::Crash);
        } else if let Some(other) = self.find_collision(idx, &check) {
            self.cars_list[idx].stop();
            legal = false;
            collision = Some(other);
            let other_car_no = self.cars_list[other.0].car_no();
            info!(
                "Car {} was stopped by car {} in turn {}",
                car_no, other_car_no, turn
            );
            self.push_event(turn, car_no, RaceEventKind::Collision { other_car_no });
        } else {
            progress = self.cars_list[idx].drive_to(
                &self.track,
                check.new_position,
                check.new_velocity,
                turn,
            );

            if let Some(index) = progress.checkpoint_passed {
                debug!("Car {} passed checkpoint {} in turn {}", car_no, index, turn);
                self.push_event(turn, car_no, RaceEventKind::Checkpoint { index });
            }
            if progress.lap_completed {
                let laps_completed = self.cars_list[idx].laps_completed();
                info!("Car {} completed lap {} in turn {}", car_no, laps_completed, turn);
                self.push_event(turn, car_no, RaceEventKind::Lap { laps_completed });
            }
            if progress.finished {
                info!("Car {} finished in turn {}", car_no, turn);
                self.finish_order.push(CarId(idx));
                self.push_event(turn, car_no, RaceEventKind::Finish);
            }
        }

        TurnResult {
            turn,
            car_id: CarId(idx),
            car: CarState::from_car(&self.cars_list[idx]),
            mv,
            legal,
            crashed,
            collision,
            checkpoint_passed: progress.checkpoint_passed,
            lap_completed: progress.lap_completed,
            finished: progress.finished,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn check_turn(&self, car_id: CarId) -> Result<usize, RaceError> {
        let car = self
            .cars_list
            .get(car_id.0)
            .ok_or(RaceError::CarIdOutOfRange(car_id.0))?;

        if !car.is_active() {
            return Err(RaceError::CarInactive(car_id.0));
        }
        if self.is_over() {
            return Err(RaceError::RaceOver);
        }
        if self.active_idx != car_id.0 {
            return Err(RaceError::NotYourTurn {
                expected: self.active_idx,
                got: car_id.0,
            });
        }
        Ok(car_id.0)
    }

    /// Moves the turn to the next active car; passing the end of the grid starts a new turn.
    fn advance_turn(&mut self) {
        if self.get_all_finished() {
            return;
        }

        let no_cars = self.cars_list.len();
        let mut idx = self.active_idx;

        for _ in 0..no_cars {
            idx += 1;
            if idx == no_cars {
                idx = 0;
                self.cur_turn += 1;
            }
            if self.cars_list[idx].is_active() {
                self.active_idx = idx;
                return;
            }
        }
    }

    fn find_collision(&self, idx: usize, check: &MoveCheck) -> Option<CarId> {
        if !self.config.collisions_enabled {
            return None;
        }

        let others: Vec<CarId> = self
            .cars_list
            .iter()
            .filter(|car| car.id().0 != idx && car.is_active())
            .map(|car| car.id())
            .collect();
        let positions: Vec<GridVec> = others
            .iter()
            .map(|id| self.cars_list[id.0].position())
            .collect();

        path_collides(
            self.cars_list[idx].position(),
            check.new_position,
            &positions,
            self.config.collision_radius,
        )
        .map(|i| others[i])
    }

    fn rival_positions(&self, idx: usize) -> Vec<GridVec> {
        self.cars_list
            .iter()
            .filter(|car| car.id().0 != idx && car.is_active())
            .map(|car| car.position())
            .collect()
    }

    fn push_event(&mut self, turn: u32, car_no: u32, kind: RaceEventKind) {
        self.events.push(RaceEvent { turn, car_no, kind });
    }

    // ---------------------------------------------------------------------------------------------
    // GETTERS -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars_list
    }

    pub fn car(&self, car_id: CarId) -> Result<&Car, RaceError> {
        self.cars_list
            .get(car_id.0)
            .ok_or(RaceError::CarIdOutOfRange(car_id.0))
    }

    pub fn events(&self) -> &[RaceEvent] {
        &self.events
    }

    pub fn get_cur_turn(&self) -> u32 {
        self.cur_turn
    }

    pub fn last_decision(&self) -> Option<&Decision> {
        self.last_decision.as_ref()
    }

    /// True if no car is left to move.
    pub fn get_all_finished(&self) -> bool {
        !self.cars_list.iter().any(|car| car.is_active())
    }

    pub fn is_over(&self) -> bool {
        self.get_all_finished() || self.cur_turn > self.config.max_turns
    }

    /// The car whose turn it is, `None` once the race is over.
    pub fn active_car(&self) -> Option<CarId> {
        if self.is_over() {
            None
        } else {
            Some(CarId(self.active_idx))
        }
    }

    pub fn is_ai_controlled(&self, car_id: CarId) -> bool {
        matches!(self.ai_drivers.get(car_id.0), Some(Some(_)))
    }

    /// Legal candidate moves of a car (move preview). Other cars are not considered.
    pub fn legal_moves(&self, car_id: CarId) -> Result<Vec<(Move, MoveCheck)>, RaceError> {
        let car = self.car(car_id)?;
        Ok(movement::legal_moves(&self.track, car.position(), car.velocity()))
    }

    pub fn get_race_state(&self) -> RaceState {
        let active = self.active_car();

        let move_preview = match active {
            Some(car_id) => {
                let car = &self.cars_list[car_id.0];
                movement::legal_moves(&self.track, car.position(), car.velocity())
                    .iter()
                    .map(|(mv, check)| MovePreview::new(*mv, check))
                    .collect()
            }
            None => Vec::new(),
        };

        RaceState {
            turn: self.cur_turn,
            car_states: self.cars_list.iter().map(CarState::from_car).collect(),
            active_car_no: active.map(|car_id| self.cars_list[car_id.0].car_no()),
            move_preview,
            last_turn: self.last_turn.clone(),
            ai_decision: self.last_decision.clone(),
            final_result: None,
        }
    }

    /// get_race_result returns the standings (finishers in finishing order, then everybody else
    /// by race progress) together with events and trails.
    pub fn get_race_result(&self) -> RaceResult {
        let race_progs: Vec<f64> = self.cars_list.iter().map(|car| car.race_prog()).collect();

        let mut order: Vec<usize> = self.finish_order.iter().map(|car_id| car_id.0).collect();
        for idx in argsort(&race_progs, SortOrder::Descending) {
            if !order.contains(&idx) {
                order.push(idx);
            }
        }

        RaceResult {
            track_name: self.track.name.to_owned(),
            required_laps: self.config.required_laps,
            turns_played: self.cur_turn.min(self.config.max_turns),
            standings: order
                .iter()
                .enumerate()
                .map(|(i, &idx)| CarResult::from_car(i as u32 + 1, &self.cars_list[idx]))
                .collect(),
            events: self.events.to_owned(),
            trails: self
                .cars_list
                .iter()
                .map(|car| CarTrail {
                    car_no: car.car_no(),
                    points: car.trail().to_vec(),
                })
                .collect(),
        }
    }
}

/// Grid slots behind the start line, row by row, each row ordered from the middle of the line
/// outward. Slots are integer points on the racing surface strictly behind the line.
fn grid_slots(track: &Track) -> Vec<GridVec> {
    let start = track.start_line();
    let no_samples = (start.line.length().round() as usize).max(1);

    let ts: Vec<f64> = (0..no_samples)
        .map(|k| (k as f64 + 0.5) / no_samples as f64)
        .collect();
    let dists_to_mid: Vec<f64> = ts.iter().map(|t| (t - 0.5).abs()).collect();
    let sample_order = argsort(&dists_to_mid, SortOrder::Ascending);

    let mut slots: Vec<GridVec> = Vec::new();

    for row in 1..=MAX_GRID_ROWS {
        for &k in sample_order.iter() {
            let p = start.line.a.lerp(start.line.b, ts[k]) - start.forward * row as f64;
            let slot = GridVec::new(p.x.round() as i32, p.y.round() as i32);
            let behind = (slot.to_point() - start.line.a).dot(start.forward) < -EPS;

            if behind && track.contains(slot.to_point()) && !slots.contains(&slot) {
                slots.push(slot);
            }
        }
    }

    slots
}

fn assign_start_positions(track: &Track, grid: &[&CarPars]) -> Result<Vec<GridVec>, RaceError> {
    let mut occupied: HashSet<GridVec> = HashSet::new();

    for car_pars in grid.iter() {
        if let Some(pos) = car_pars.start_position {
            if !track.contains(pos.to_point()) {
                return Err(RaceError::StartOutsideTrack(car_pars.car_no));
            }
            if !occupied.insert(pos) {
                return Err(RaceError::NoStartPosition(car_pars.car_no));
            }
        }
    }

    let mut free_slots = grid_slots(track)
        .into_iter()
        .filter(|slot| !occupied.contains(slot));

    grid.iter()
        .map(|car_pars| match car_pars.start_position {
            Some(pos) => Ok(pos),
            None => free_slots
                .next()
                .ok_or(RaceError::NoStartPosition(car_pars.car_no)),
        })
        .collect()
}
