use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use eyre::Result;
use log::{error, info};

use jobwatch::report::{JsonReport, LogNotifier};
use jobwatch::utils::cli::Args;
use jobwatch::utils::config::{Config, config};
use jobwatch::utils::log::Logger;
use jobwatch::{Runner, TargetSelection};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.level());

    info!(
        "starting jobwatch {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config: Config = match config(args.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return Err(e);
        }
    };

    let config = Arc::new({
        let mut cfg = (*config).clone();
        cfg.fast_mode |= args.fast;
        if let Some(state) = &args.state {
            cfg.state_file = state.clone();
        }
        if let Some(output_dir) = &args.output_dir {
            cfg.output_dir = output_dir.clone();
        }
        cfg
    });

    if config.fast_mode {
        info!("{}", "fast mode: reduced query breadth and scroll depth".yellow());
    }

    let selection = TargetSelection::parse(&args.only, &args.skip);
    let report = JsonReport::new(&config.output_dir, Local::now().date_naive());
    let runner = Runner::new(config.clone(), selection);

    let summary = runner.run(&report, &LogNotifier).await?;

    info!(
        "{} {} new of {} current jobs",
        "done:".green().bold(),
        summary.new_jobs.len().to_string().cyan(),
        summary.current.to_string().cyan()
    );
    if let Some(path) = summary.report {
        info!("report written to {}", path.display().to_string().cyan());
    }

    Ok(())
}
