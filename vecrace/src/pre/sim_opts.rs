use crate::core::driver::Difficulty;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "vecrace",
    about = "A turn-based vector racing simulator on a discrete grid"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing
    #[clap(short, long)]
    pub debug: bool,

    /// Print a live view of the race, turn by turn (only the first parameter file is raced)
    #[clap(short, long)]
    pub watch: bool,

    /// Read the moves of human seats from stdin (only the first parameter file is raced)
    #[clap(short, long)]
    pub interactive: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path(s) to the simulation parameter or scenario file(s), several files are raced in
    /// parallel
    #[clap(short, long = "parfile-path", required = true)]
    pub parfile_paths: Vec<PathBuf>,

    /// Set directory containing the track files referenced by scenario files
    #[clap(long, default_value = "input/tracks")]
    pub track_dir: PathBuf,

    /// Override the difficulty of all AI cars (easy, medium, hard)
    #[clap(long)]
    pub difficulty: Option<Difficulty>,

    /// Override the maximum number of turns per car
    #[clap(short, long)]
    pub max_turns: Option<u32>,

    /// Set output directory for results and trails
    #[clap(short, long, default_value = "output")]
    pub out_dir: PathBuf,
}
