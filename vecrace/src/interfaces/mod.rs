pub mod race_state;
