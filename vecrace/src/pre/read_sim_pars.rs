use crate::core::car::CarPars;
use crate::core::race::RacePars;
use crate::core::track::TrackPars;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// SimPars is used to store all other parameter structs.
#[derive(Debug, Deserialize, Clone)]
pub struct SimPars {
    pub race_pars: RacePars,
    pub track_pars: TrackPars,
    pub car_pars_all: HashMap<u32, CarPars>,
}

/// Scenario file without track data; the track is loaded via `race_pars.track_name`.
#[derive(Debug, Deserialize, Clone)]
pub struct RaceScenarioFile {
    pub race_pars: RacePars,
    pub car_pars_all: HashMap<u32, CarPars>,
}

fn read_json<T: DeserializeOwned>(filepath: &Path, what: &str) -> anyhow::Result<T> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!("Failed to open {} {}!", what, filepath.display()))?;
    let pars = serde_json::from_reader(&fh)
        .context(format!("Failed to parse {} {}!", what, filepath.display()))?;
    Ok(pars)
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the simulation parameters
/// struct.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    read_json(filepath, "parameter file")
}

pub fn read_race_scenario(filepath: &Path) -> anyhow::Result<RaceScenarioFile> {
    read_json(filepath, "race scenario file")
}

pub fn read_track_pars(filepath: &Path) -> anyhow::Result<TrackPars> {
    read_json(filepath, "track file")
}

/// Path of a named track inside the track directory.
pub fn track_path(track_dir: &Path, track_name: &str) -> PathBuf {
    track_dir.join(format!("{}.json", track_name))
}

/// Flexible reader: tries full SimPars first; if it fails, reads a scenario-only file (without
/// `track_pars`) and loads the track from `<track_dir>/<track_name>.json`.
pub fn read_sim_pars_flexible(filepath: &Path, track_dir: &Path) -> anyhow::Result<SimPars> {
    match read_sim_pars(filepath) {
        Ok(p) => Ok(p),
        Err(_) => {
            let scen = read_race_scenario(filepath)?;
            let track_name = scen.race_pars.track_name.clone().ok_or_else(|| {
                anyhow::anyhow!(
                    "Scenario {} is missing track_name; required when track_pars is not present",
                    filepath.display()
                )
            })?;
            let track_pars = read_track_pars(&track_path(track_dir, &track_name))?;
            Ok(SimPars {
                race_pars: scen.race_pars,
                track_pars,
                car_pars_all: scen.car_pars_all,
            })
        }
    }
}
