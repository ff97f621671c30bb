use crate::core::geometry::Point;
use crate::core::track::Track;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum State {
    /// `lap_armed` is set once the last checkpoint of the lap has been crossed; the next forward
    /// crossing of the start line then completes the lap.
    Racing {
        next_checkpoint: usize,
        lap_armed: bool,
    },
    Finished,
}

/// Progress events caused by a single move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressEvents {
    pub checkpoint_passed: Option<usize>,
    pub lap_completed: bool,
    pub finished: bool,
}

/// StateHandler tracks the lap progress of one car. Checkpoints must be crossed strictly in order
/// and in their forward direction; the start line only counts a lap after all of them.
#[derive(Debug, Clone)]
pub struct StateHandler {
    no_checkpoints: usize,
    required_laps: u32,
    state: State,
    compl_laps: u32,
}

impl StateHandler {
    pub fn new(no_checkpoints: usize, required_laps: u32) -> StateHandler {
        StateHandler {
            no_checkpoints,
            required_laps,
            state: State::Racing {
                next_checkpoint: 0,
                lap_armed: false,
            },
            compl_laps: 0,
        }
    }

    /// check_state_transition evaluates the path of a legal move. At most one checkpoint is
    /// passed per move; the start line is checked after the checkpoint so that a move crossing
    /// the last checkpoint and the start line completes the lap.
    pub fn check_state_transition(
        &mut self,
        track: &Track,
        from: Point,
        to: Point,
    ) -> ProgressEvents {
        let mut events = ProgressEvents::default();

        let (mut next_checkpoint, mut lap_armed) = match self.state {
            State::Racing {
                next_checkpoint,
                lap_armed,
            } => (next_checkpoint, lap_armed),
            State::Finished => return events,
        };

        if !lap_armed {
            if let Some(cp) = track.checkpoints().get(next_checkpoint) {
                if cp.crossed_forward(from, to) {
                    events.checkpoint_passed = Some(next_checkpoint);
                    next_checkpoint = (next_checkpoint + 1) % self.no_checkpoints;
                    lap_armed = next_checkpoint == 0;
                }
            }
        }

        if lap_armed && track.start_line().crossed_forward(from, to) {
            self.compl_laps += 1;
            lap_armed = false;
            events.lap_completed = true;
        }

        self.state = if self.compl_laps >= self.required_laps {
            events.finished = true;
            State::Finished
        } else {
            State::Racing {
                next_checkpoint,
                lap_armed,
            }
        };

        events
    }

    pub fn get_state(&self) -> State {
        self.state
    }

    pub fn get_compl_laps(&self) -> u32 {
        self.compl_laps
    }

    /// get_next_checkpoint returns the index of the checkpoint to cross next (0 when finished).
    pub fn get_next_checkpoint(&self) -> usize {
        match self.state {
            State::Racing {
                next_checkpoint, ..
            } => next_checkpoint,
            State::Finished => 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished)
    }

    /// get_race_prog returns completed laps plus the fraction of timing lines passed in the
    /// current lap (checkpoints and start line count equally).
    pub fn get_race_prog(&self) -> f64 {
        match self.state {
            State::Finished => self.compl_laps as f64,
            State::Racing {
                next_checkpoint,
                lap_armed,
            } => {
                let passed = if lap_armed {
                    self.no_checkpoints
                } else {
                    next_checkpoint
                };
                self.compl_laps as f64 + passed as f64 / (self.no_checkpoints + 1) as f64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::track::tests::rectangle_track;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    /// Moves crossing the start line, then checkpoints 0, 1, 2 of the rectangle track.
    const START: [(f64, f64); 2] = [(7.0, 15.0), (7.0, 19.0)];
    const CPS: [[(f64, f64); 2]; 3] = [
        [(24.0, 29.0), (27.0, 29.0)],
        [(43.0, 19.0), (43.0, 15.0)],
        [(26.0, 6.0), (23.0, 6.0)],
    ];

    fn drive(sh: &mut StateHandler, track: &Track, leg: [(f64, f64); 2]) -> ProgressEvents {
        sh.check_state_transition(track, p(leg[0].0, leg[0].1), p(leg[1].0, leg[1].1))
    }

    #[test]
    fn full_lap_is_counted() {
        let track = rectangle_track();
        let mut sh = StateHandler::new(3, 2);

        // leaving the grid does not count
        assert!(!drive(&mut sh, &track, START).lap_completed);

        for (i, leg) in CPS.iter().enumerate() {
            let ev = drive(&mut sh, &track, *leg);
            assert_eq!(ev.checkpoint_passed, Some(i));
            assert!(!ev.lap_completed);
        }
        assert_eq!(
            sh.get_state(),
            State::Racing {
                next_checkpoint: 0,
                lap_armed: true
            }
        );

        let ev = drive(&mut sh, &track, START);
        assert!(ev.lap_completed);
        assert!(!ev.finished);
        assert_eq!(sh.get_compl_laps(), 1);
        assert_relative_eq!(sh.get_race_prog(), 1.0);
    }

    #[test]
    fn reverse_crossing_is_ignored() {
        let track = rectangle_track();
        let mut sh = StateHandler::new(3, 1);
        let ev = drive(&mut sh, &track, [CPS[0][1], CPS[0][0]]);
        assert_eq!(ev.checkpoint_passed, None);
        assert_eq!(sh.get_next_checkpoint(), 0);
    }

    #[test]
    fn checkpoints_out_of_order_are_ignored() {
        let track = rectangle_track();
        let mut sh = StateHandler::new(3, 1);
        assert_eq!(drive(&mut sh, &track, CPS[1]).checkpoint_passed, None);
        assert_eq!(drive(&mut sh, &track, CPS[0]).checkpoint_passed, Some(0));
        assert_eq!(drive(&mut sh, &track, CPS[2]).checkpoint_passed, None);
        assert_eq!(sh.get_next_checkpoint(), 1);
    }

    #[test]
    fn cutting_the_course_does_not_count_a_lap() {
        let track = rectangle_track();
        let mut sh = StateHandler::new(3, 1);
        drive(&mut sh, &track, CPS[0]);
        drive(&mut sh, &track, CPS[1]);
        // skip checkpoint 2, back over the start line
        let ev = drive(&mut sh, &track, START);
        assert!(!ev.lap_completed);
        assert_eq!(sh.get_compl_laps(), 0);
        // reversing over the start line and crossing again does not help either
        drive(&mut sh, &track, [START[1], START[0]]);
        assert!(!drive(&mut sh, &track, START).lap_completed);
    }

    #[test]
    fn only_one_checkpoint_per_move() {
        let track = rectangle_track();
        let mut sh = StateHandler::new(3, 1);
        // path crosses checkpoint 0 and checkpoint 1
        let ev = sh.check_state_transition(&track, p(20.0, 30.0), p(45.0, 14.0));
        assert_eq!(ev.checkpoint_passed, Some(0));
        assert_eq!(sh.get_next_checkpoint(), 1);
    }

    #[test]
    fn finishing_locks_the_state() {
        let track = rectangle_track();
        let mut sh = StateHandler::new(3, 1);
        for leg in CPS.iter() {
            drive(&mut sh, &track, *leg);
        }
        let ev = drive(&mut sh, &track, START);
        assert!(ev.lap_completed && ev.finished);
        assert!(sh.is_finished());

        // further crossings change nothing
        let ev = drive(&mut sh, &track, CPS[0]);
        assert_eq!(ev, ProgressEvents::default());
        assert_eq!(sh.get_compl_laps(), 1);
    }

    #[test]
    fn race_progress_counts_timing_lines() {
        let track = rectangle_track();
        let mut sh = StateHandler::new(3, 3);
        assert_relative_eq!(sh.get_race_prog(), 0.0);
        drive(&mut sh, &track, CPS[0]);
        assert_relative_eq!(sh.get_race_prog(), 0.25);
        drive(&mut sh, &track, CPS[1]);
        drive(&mut sh, &track, CPS[2]);
        assert_relative_eq!(sh.get_race_prog(), 0.75);
    }
}
