/// Reasons a track description is rejected at load time. A race is never started on a track
/// that failed validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error("{which} boundary needs at least 3 points, got {got}")]
    TooFewPoints { which: &'static str, got: usize },
    #[error("{which} boundary is not a simple closed polygon")]
    NotSimple { which: &'static str },
    #[error("track contains non-finite coordinates")]
    NonFinite,
    #[error("inner boundary is not strictly inside the outer boundary")]
    InnerNotInsideOuter,
    #[error("track needs at least one checkpoint")]
    NoCheckpoints,
    #[error("{what} has zero length")]
    DegenerateSegment { what: String },
    #[error("{what} does not lie on the racing surface")]
    OutsideTrack { what: String },
    #[error("forward vector of {what} is zero or parallel to the line")]
    BadForward { what: String },
}

/// Errors raised by the race (turn executor). Illegal moves are not errors; they are reported
/// through `TurnResult`.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RaceError {
    #[error("race needs at least one participant")]
    NoParticipants,
    #[error("missing car number {0} in car parameters")]
    UnknownCarNo(u32),
    #[error("car number {0} is listed more than once")]
    DuplicateCarNo(u32),
    #[error("car id {0} is out of range")]
    CarIdOutOfRange(usize),
    #[error("car {0} is not active (crashed or finished)")]
    CarInactive(usize),
    #[error("it is not car {got}'s turn, active car is {expected}")]
    NotYourTurn { expected: usize, got: usize },
    #[error("car {0} is not AI controlled")]
    NotAiControlled(usize),
    #[error("no free start position for car number {0}")]
    NoStartPosition(u32),
    #[error("start position of car number {0} is not on the racing surface")]
    StartOutsideTrack(u32),
    #[error("acceleration components must be in -1..=1")]
    InvalidAcceleration,
    #[error("required laps must be at least 1")]
    NoLaps,
    #[error("race is over, no car is left to move")]
    RaceOver,
}
