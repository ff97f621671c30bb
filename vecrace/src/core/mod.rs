pub mod ai;
pub mod car;
pub mod driver;
pub mod errors;
pub mod geometry;
pub mod handle_race;
pub mod movement;
pub mod race;
pub mod state_handler;
pub mod track;
