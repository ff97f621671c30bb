use crate::core::race::Race;
use crate::core::track::{RacingLineSource, Track};
use crate::interfaces::race_state::RaceState;
use crate::post::race_result::RaceResult;
use crate::pre::read_sim_pars::SimPars;
use anyhow::Context;
use flume::Sender;
use log::{debug, info, warn};

/// create_race validates the track and sets up the race with its start grid.
pub fn create_race(sim_pars: &SimPars) -> anyhow::Result<Race> {
    let track = Track::new(&sim_pars.track_pars).context(format!(
        "Track {} is malformed!",
        sim_pars.track_pars.name
    ))?;

    match track.racing_line_source() {
        RacingLineSource::Provided => info!(
            "Loaded track {} with {} checkpoints and {} waypoints",
            track.name,
            track.checkpoints().len(),
            track.racing_line().len()
        ),
        RacingLineSource::Derived => info!(
            "Loaded track {} with {} checkpoints, derived a racing line with {} waypoints",
            track.name,
            track.checkpoints().len(),
            track.racing_line().len()
        ),
        RacingLineSource::Missing => warn!(
            "Track {} has no usable racing line, AI cars steer by direction only",
            track.name
        ),
    }

    let race = Race::new(&sim_pars.race_pars, track, &sim_pars.car_pars_all)
        .context(format!("Failed to set up the race on {}!", sim_pars.track_pars.name))?;
    Ok(race)
}

/// run_ai_turns plays AI turns until the race is over or a human seat has to move. Returns true
/// in the latter case. Every turn is sent to the observer if a sender was inserted.
pub fn run_ai_turns(race: &mut Race, tx: Option<&Sender<RaceState>>) -> anyhow::Result<bool> {
    while let Some(car_id) = race.active_car() {
        if !race.is_ai_controlled(car_id) {
            return Ok(true);
        }

        let result = race.play_ai_turn()?;
        debug!(
            "Turn {}: car {} at ({}, {}) with velocity ({}, {})",
            result.turn,
            result.car.car_no,
            result.car.position.x,
            result.car.position.y,
            result.car.velocity.x,
            result.car.velocity.y
        );

        if let Some(tx) = tx {
            tx.send(race.get_race_state())
                .context("Failed to send race state to observer!")?;
        }
    }
    Ok(false)
}

/// finish_race collects the result and sends the final state to the observer.
pub fn finish_race(race: &Race, tx: Option<&Sender<RaceState>>) -> anyhow::Result<RaceResult> {
    let result = race.get_race_result();

    if !race.get_all_finished() {
        warn!(
            "Race on {} stopped after {} turns with cars still running",
            result.track_name, result.turns_played
        );
    }
    match result.winner() {
        Some(car_no) => info!("Car {} wins on {}", car_no, result.track_name),
        None => info!("Nobody finished on {}", result.track_name),
    }

    if let Some(tx) = tx {
        let mut final_state = race.get_race_state();
        final_state.final_result = Some(result.clone());
        tx.send(final_state)
            .context("Failed to send final race result to observer!")?;
    }

    Ok(result)
}

/// handle_race creates and plays a race on the basis of the inserted parameters, and returns
/// the results for post-processing. All seats must be AI controlled.
pub fn handle_race(
    sim_pars: &SimPars,
    tx: Option<&Sender<RaceState>>,
) -> anyhow::Result<RaceResult> {
    let mut race = create_race(sim_pars)?;

    if run_ai_turns(&mut race, tx)? {
        let car_no = race
            .active_car()
            .and_then(|car_id| race.car(car_id).ok())
            .map_or(0, |car| car.car_no());
        anyhow::bail!(
            "Car {} is human controlled, run in interactive mode to race it!",
            car_no
        );
    }

    finish_race(&race, tx)
}
