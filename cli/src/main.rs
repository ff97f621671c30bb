mod logger;

use anyhow::Context;
use clap::Parser;
use log::info;
use rayon::prelude::*;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::thread;
use std::time::Instant;
use vecrace::core::car::PilotKind;
use vecrace::core::handle_race::{create_race, finish_race, handle_race, run_ai_turns};
use vecrace::core::movement::Move;
use vecrace::interfaces::race_state::RaceState;
use vecrace::post::race_result::RaceResult;
use vecrace::pre::read_sim_pars::{read_sim_pars_flexible, SimPars};
use vecrace::pre::sim_opts::SimOpts;

fn apply_overrides(sim_pars: &mut SimPars, sim_opts: &SimOpts) {
    if let Some(difficulty) = sim_opts.difficulty {
        for car_pars in sim_pars.car_pars_all.values_mut() {
            if car_pars.pilot == PilotKind::Ai {
                car_pars.difficulty = difficulty;
            }
        }
    }
    if let Some(max_turns) = sim_opts.max_turns {
        sim_pars.race_pars.max_turns = max_turns;
    }
}

fn file_stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("race")
}

fn export_results(result: &RaceResult, out_dir: &Path, stem: &str) -> anyhow::Result<()> {
    let result_path = out_dir.join(format!("{}_result.json", stem));
    result.write_result_to_file(&result_path)?;
    let trails_path = out_dir.join(format!("{}_trails.csv", stem));
    result.write_trails_to_csv(&trails_path)?;
    info!(
        "Results written to {} and {}",
        result_path.display(),
        trails_path.display()
    );
    Ok(())
}

fn print_race_state(state: &RaceState) {
    let mut line = format!("TURN {:4} |", state.turn);
    for car in state.car_states.iter() {
        let status = if car.crashed {
            "X"
        } else if car.finished {
            "F"
        } else {
            " "
        };
        line.push_str(&format!(
            " #{} ({:3},{:3}) v({:2},{:2}) L{} C{}{} |",
            car.car_no,
            car.position.x,
            car.position.y,
            car.velocity.x,
            car.velocity.y,
            car.laps_completed,
            car.next_checkpoint,
            status
        ));
    }
    println!("{}", line);
}

/// Races all parameter files in parallel without observer.
fn run_batch(sim_pars_all: &[SimPars], sim_opts: &SimOpts) -> anyhow::Result<()> {
    let t_start = Instant::now();

    let results: Vec<anyhow::Result<RaceResult>> = sim_pars_all
        .par_iter()
        .map(|sim_pars| handle_race(sim_pars, None))
        .collect();

    info!("Execution time: {}ms", t_start.elapsed().as_millis());

    for (result, parfile_path) in results.into_iter().zip(sim_opts.parfile_paths.iter()) {
        let result = result.context(format!("Race {} failed!", parfile_path.display()))?;
        result.print_standings()?;
        export_results(&result, &sim_opts.out_dir, file_stem(parfile_path))?;
    }
    Ok(())
}

/// Races in a separate thread and prints every state received over the channel.
fn run_watched(sim_pars: &SimPars, stem: &str, sim_opts: &SimOpts) -> anyhow::Result<()> {
    let (tx, rx) = flume::unbounded();
    let sim_pars_thread = sim_pars.clone();

    let handle = thread::spawn(move || handle_race(&sim_pars_thread, Some(&tx)));

    let mut final_result = None;
    for state in rx.iter() {
        print_race_state(&state);
        if state.final_result.is_some() {
            final_result = state.final_result;
        }
    }

    handle
        .join()
        .map_err(|_| anyhow::anyhow!("Race thread panicked!"))??;

    let result = final_result
        .ok_or_else(|| anyhow::anyhow!("Observer did not receive a final result!"))?;
    result.print_standings()?;
    export_results(&result, &sim_opts.out_dir, stem)
}

/// Plays AI seats automatically and asks for the moves of human seats on stdin.
fn run_interactive(sim_pars: &SimPars, stem: &str, sim_opts: &SimOpts) -> anyhow::Result<()> {
    let mut race = create_race(sim_pars)?;
    let stdin = io::stdin();

    while run_ai_turns(&mut race, None)? {
        let car_id = match race.active_car() {
            Some(car_id) => car_id,
            None => break,
        };
        let car = race.car(car_id)?;
        println!(
            "TURN {}: car {} ({}) at ({}, {}) with velocity ({}, {}), lap {}, next checkpoint {}",
            race.get_cur_turn(),
            car.car_no(),
            car.name(),
            car.position().x,
            car.position().y,
            car.velocity().x,
            car.velocity().y,
            car.laps_completed() + 1,
            car.next_checkpoint()
        );

        let previews = race.legal_moves(car_id)?;
        if previews.is_empty() {
            println!("  no legal move left, every choice crashes the car");
        }
        for (mv, check) in previews.iter() {
            println!(
                "  [{}] -> ({}, {}) with velocity ({}, {})",
                mv.numpad_key(),
                check.new_position.x,
                check.new_position.y,
                check.new_velocity.x,
                check.new_velocity.y
            );
        }

        print!("Choose a move (1-9, 5 keeps the velocity, q quits): ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            anyhow::bail!("Input closed before the race was over!");
        }
        let input = input.trim();
        if input == "q" {
            break;
        }

        let mv = match input.parse::<u8>().ok().and_then(Move::from_numpad) {
            Some(mv) => mv,
            None => {
                println!("Invalid input '{}', use the keys 1-9", input);
                continue;
            }
        };

        let result = race.apply_move(car_id, mv)?;
        if result.crashed {
            println!("CRASH: car {} left the track", result.car.car_no);
        } else if result.collision.is_some() {
            println!("Blocked by another car, velocity reset");
        } else if result.lap_completed {
            println!("Lap {} completed!", result.car.laps_completed);
        }
    }

    let result = finish_race(&race, None)?;
    result.print_standings()?;
    export_results(&result, &sim_opts.out_dir, stem)
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();
    logger::init(sim_opts.debug)?;

    // get simulation parameters
    let mut sim_pars_all: Vec<SimPars> = Vec::with_capacity(sim_opts.parfile_paths.len());
    for parfile_path in sim_opts.parfile_paths.iter() {
        info!("Reading simulation parameters from {:?}", parfile_path);
        let mut sim_pars = read_sim_pars_flexible(parfile_path, &sim_opts.track_dir)?;
        apply_overrides(&mut sim_pars, &sim_opts);
        sim_pars_all.push(sim_pars);
    }

    std::fs::create_dir_all(&sim_opts.out_dir).context(format!(
        "Failed to create output directory {}!",
        sim_opts.out_dir.display()
    ))?;

    // EXECUTION -----------------------------------------------------------------------------------
    let stem = file_stem(&sim_opts.parfile_paths[0]);

    if sim_opts.interactive {
        info!("Racing {} interactively", sim_pars_all[0].track_pars.name);
        run_interactive(&sim_pars_all[0], stem, &sim_opts)
    } else if sim_opts.watch {
        info!("Racing {} with live view", sim_pars_all[0].track_pars.name);
        run_watched(&sim_pars_all[0], stem, &sim_opts)
    } else {
        info!("Racing {} parameter file(s)", sim_pars_all.len());
        run_batch(&sim_pars_all, &sim_opts)
    }
}
