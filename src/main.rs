use std::process::ExitCode;
use tracing::{error, info};

use bird_frame_guidance::cli::{Args, Command};
use bird_frame_guidance::core::{import_label_studio_export, run_label_export, run_split_guidance};
use bird_frame_guidance::logging::setup_logging;
use bird_frame_guidance::{GuidanceConfig, GuidanceResult};

fn run(args: Args) -> GuidanceResult<()> {
    match args.command {
        Command::Import { export, output } => {
            let tables = import_label_studio_export(&export)?;
            tables.write(&output)?;
        }
        Command::Guidance {
            videos,
            tracks,
            output,
            config,
            seed,
        } => {
            let mut config = match config {
                Some(path) => GuidanceConfig::load(&path)?,
                None => {
                    info!("No config given, using defaults");
                    GuidanceConfig::default()
                }
            };
            if let Some(seed) = seed {
                info!("Overriding random seed with {}", seed);
                config.random_seed = seed;
            }

            let written = run_split_guidance(&videos, &tracks, &output, &config)?;
            info!("Wrote {} lookup tables to {:?}", written.len(), output);
        }
        Command::Labels {
            guidance,
            boxes,
            output,
            native_fps,
        } => {
            run_label_export(&guidance, &boxes, &output, native_fps)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse_args();

    if let Err(e) = setup_logging(&args.log_dir) {
        eprintln!("Failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
