use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "jobwatch")]
#[command(about = "Collect early-career engineering postings from ATS boards and career portals", long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Seen-jobs state file, overrides `state_file` from the configuration
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Directory the new-jobs report is written to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Comma separated targets to run (e.g. `greenhouse,ashby`), `all` for everything
    #[arg(long, value_name = "TARGETS", env = "ONLY", default_value = "")]
    pub only: String,

    /// Comma separated targets to skip, wins over `--only`
    #[arg(long, value_name = "TARGETS", env = "SKIP", default_value = "")]
    pub skip: String,

    /// Reduce query breadth and scroll depth for quicker smoke runs
    #[arg(long)]
    pub fast: bool,

    /// Shorthand for `--verbosity debug`
    #[arg(long, env = "JOBWATCH_DEBUG")]
    pub debug: bool,

    /// Sets the logger's verbosity level
    #[arg(short, long, value_name = "VERBOSITY", default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,
}

impl Args {
    pub fn level(&self) -> LevelFilter {
        if self.debug {
            self.verbosity.max(LevelFilter::Debug)
        } else {
            self.verbosity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_raises_but_never_lowers_verbosity() {
        let args = Args::parse_from(["jobwatch", "--debug"]);
        assert_eq!(args.level(), LevelFilter::Debug);

        let args = Args::parse_from(["jobwatch", "--debug", "-v", "trace"]);
        assert_eq!(args.level(), LevelFilter::Trace);

        let args = Args::parse_from(["jobwatch", "--only", "apple,meta", "--fast"]);
        assert_eq!(args.only, "apple,meta");
        assert!(args.fast);
        assert_eq!(args.config, PathBuf::from("config.toml"));
    }
}
