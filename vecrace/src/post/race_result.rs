use crate::core::car::Car;
use crate::core::geometry::GridVec;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::fs::OpenOptions;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RaceEventKind {
    Crash,
    Collision { other_car_no: u32 },
    Checkpoint { index: usize },
    Lap { laps_completed: u32 },
    Finish,
    AiStuck,
    Fallback,
    SoftLock { stuck_turns: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEvent {
    pub turn: u32,
    pub car_no: u32,
    #[serde(flatten)]
    pub kind: RaceEventKind,
}

/// Final classification entry of one car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarResult {
    pub position: u32,
    pub car_no: u32,
    pub name: String,
    pub laps_completed: u32,
    pub next_checkpoint: usize,
    pub race_prog: f64,
    pub crashed: bool,
    pub finished: bool,
    pub finish_turn: Option<u32>,
    pub moves: usize,
}

impl CarResult {
    pub fn from_car(position: u32, car: &Car) -> CarResult {
        CarResult {
            position,
            car_no: car.car_no(),
            name: car.name().to_owned(),
            laps_completed: car.laps_completed(),
            next_checkpoint: car.next_checkpoint(),
            race_prog: car.race_prog(),
            crashed: car.crashed(),
            finished: car.finished(),
            finish_turn: car.finish_turn(),
            moves: car.trail().len().saturating_sub(1),
        }
    }

    fn status(&self) -> String {
        if let Some(turn) = self.finish_turn {
            format!("finished in turn {}", turn)
        } else if self.crashed {
            "crashed".to_owned()
        } else {
            format!("running, next checkpoint {}", self.next_checkpoint)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarTrail {
    pub car_no: u32,
    pub points: Vec<GridVec>,
}

/// One row of the trail export.
#[derive(Debug, Serialize)]
struct TrailRecord {
    car_no: u32,
    step: usize,
    x: i32,
    y: i32,
}

/// RaceResult contains all race information that is required for post-processing the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub track_name: String,
    pub required_laps: u32,
    pub turns_played: u32,
    pub standings: Vec<CarResult>,
    pub events: Vec<RaceEvent>,
    pub trails: Vec<CarTrail>,
}

impl RaceResult {
    /// Car number of the winner, if anybody finished.
    pub fn winner(&self) -> Option<u32> {
        self.standings
            .first()
            .filter(|res| res.finished)
            .map(|res| res.car_no)
    }

    pub fn format_standings(&self) -> anyhow::Result<String> {
        let mut content = String::new();
        writeln!(
            &mut content,
            "RESULT: {} after {} turns ({} laps required)",
            self.track_name, self.turns_played, self.required_laps
        )?;
        for res in self.standings.iter() {
            writeln!(
                &mut content,
                "{:3}. #{:<3} {:<16} laps {:2}, moves {:4}, {}",
                res.position,
                res.car_no,
                res.name,
                res.laps_completed,
                res.moves,
                res.status()
            )?;
        }
        Ok(content)
    }

    /// print_standings prints the final classification to the console output.
    pub fn print_standings(&self) -> anyhow::Result<()> {
        print!("{}", self.format_standings()?);
        Ok(())
    }

    /// write_result_to_file writes the complete result as pretty JSON.
    pub fn write_result_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let fh = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .context(format!("Failed to open result file {}!", path.display()))?;
        serde_json::to_writer_pretty(fh, self)
            .context(format!("Failed to write result file {}!", path.display()))?;
        Ok(())
    }

    /// write_trails_to_csv writes one row per car and visited grid point.
    pub fn write_trails_to_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .context(format!("Failed to open trail file {}!", path.display()))?;

        for trail in self.trails.iter() {
            for (step, point) in trail.points.iter().enumerate() {
                wtr.serialize(TrailRecord {
                    car_no: trail.car_no,
                    step,
                    x: point.x,
                    y: point.y,
                })?;
            }
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> RaceResult {
        RaceResult {
            track_name: "rectangle".to_owned(),
            required_laps: 1,
            turns_played: 42,
            standings: vec![
                CarResult {
                    position: 1,
                    car_no: 7,
                    name: "Seven".to_owned(),
                    laps_completed: 1,
                    next_checkpoint: 0,
                    race_prog: 1.0,
                    crashed: false,
                    finished: true,
                    finish_turn: Some(40),
                    moves: 40,
                },
                CarResult {
                    position: 2,
                    car_no: 3,
                    name: "Three".to_owned(),
                    laps_completed: 0,
                    next_checkpoint: 2,
                    race_prog: 0.5,
                    crashed: true,
                    finished: false,
                    finish_turn: None,
                    moves: 17,
                },
            ],
            events: vec![
                RaceEvent {
                    turn: 17,
                    car_no: 3,
                    kind: RaceEventKind::Crash,
                },
                RaceEvent {
                    turn: 40,
                    car_no: 7,
                    kind: RaceEventKind::Lap { laps_completed: 1 },
                },
            ],
            trails: vec![CarTrail {
                car_no: 7,
                points: vec![GridVec::new(7, 16), GridVec::new(7, 17)],
            }],
        }
    }

    #[test]
    fn winner_is_first_finisher() {
        let mut result = sample_result();
        assert_eq!(result.winner(), Some(7));
        result.standings[0].finished = false;
        assert_eq!(result.winner(), None);
    }

    #[test]
    fn standings_text_lists_every_car() {
        let text = sample_result().format_standings().unwrap();
        assert!(text.contains("after 42 turns"));
        assert!(text.contains("finished in turn 40"));
        assert!(text.contains("crashed"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn events_serialize_flat() {
        let json = serde_json::to_value(&sample_result().events[1]).unwrap();
        assert_eq!(json["kind"], "lap");
        assert_eq!(json["laps_completed"], 1);
        assert_eq!(json["car_no"], 7);
    }
}
