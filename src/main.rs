use clap::Parser;
use frame_audit::api::{build_detectors, AnalysisSession, DetectorBackends};
use frame_audit::core::config::AnalysisConfig;
use frame_audit::core::detect::MatchPolicy;
use frame_audit::core::report::render;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "frame-audit", about = "Sample video frames and summarise detector results")]
struct Cli {
    /// Video file, or a directory of frame images
    video_path: PathBuf,
    /// JSON run configuration; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Analyze every Nth frame
    #[arg(long, value_name = "K")]
    interval: Option<u64>,
    /// Stop after reading this many frames
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,
    /// Where to write the text report
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Only accept identity matches within this encoding distance
    #[arg(long, value_name = "F")]
    max_distance: Option<f32>,
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig, String> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path).map_err(|e| format!("{:?}: {}", path, e))?,
        None => {
            let policy = match cli.max_distance {
                Some(max_distance) => MatchPolicy::WithinDistance { max_distance },
                None => {
                    info!("👤 No --max-distance given, faces match their nearest identity");
                    MatchPolicy::Nearest
                }
            };
            AnalysisConfig::new(policy)
        }
    };

    if let Some(max_distance) = cli.max_distance {
        config.identity_match = MatchPolicy::WithinDistance { max_distance };
    }
    if let Some(interval) = cli.interval {
        config.sampling_interval = interval;
    }
    if cli.max_frames.is_some() {
        config.max_frames = cli.max_frames;
    }
    if let Some(report) = &cli.report {
        config.report_path = report.clone();
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    // usage errors exit with 2
    let cli = Cli::parse();
    frame_audit::init_logging();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Invalid configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    // no model backends are bundled; only motion detection runs
    let session = match build_detectors(&config, DetectorBackends::default())
        .and_then(|detectors| AnalysisSession::new(config, detectors))
    {
        Ok(session) => session,
        Err(e) => {
            error!("❌ {}", e);
            return ExitCode::from(2);
        }
    };

    match session.run_path(&cli.video_path) {
        Ok(outcome) => {
            print!("{}", render(&outcome.summary));
            match outcome.report_error {
                Some(_) => ExitCode::from(3),
                None => ExitCode::SUCCESS,
            }
        }
        Err(e) => {
            error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("frame-audit").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let cli = parse(&[
            "clip.mp4",
            "--interval",
            "5",
            "--max-distance",
            "0.6",
            "--report",
            "out.txt",
        ])
        .unwrap();

        assert_eq!(cli.video_path, PathBuf::from("clip.mp4"));
        assert_eq!(cli.interval, Some(5));
        assert_eq!(cli.max_distance, Some(0.6));
        assert_eq!(cli.report, Some(PathBuf::from("out.txt")));
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["clip.mp4", "--interval"]).is_err());
        assert!(parse(&["clip.mp4", "--interval", "x"]).is_err());
        assert!(parse(&["clip.mp4", "--bogus"]).is_err());
        assert!(parse(&["a.mp4", "b.mp4"]).is_err());
    }

    #[test]
    fn test_load_config_without_file() {
        let cli = parse(&["clip.mp4", "--max-frames", "10"]).unwrap();
        let config = load_config(&cli).unwrap();

        assert_eq!(config.identity_match, MatchPolicy::Nearest);
        assert_eq!(config.max_frames, Some(10));
        assert_eq!(config.sampling_interval, 20);

        let cli = parse(&["clip.mp4", "--max-distance", "0.5"]).unwrap();
        assert_eq!(
            load_config(&cli).unwrap().identity_match,
            MatchPolicy::WithinDistance { max_distance: 0.5 }
        );
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{"identity_match":"nearest","sampling_interval":7}"#).unwrap();
        let path_arg = path.to_string_lossy().to_string();

        let cli = parse(&["clip.mp4", "--config", &path_arg]).unwrap();
        assert_eq!(load_config(&cli).unwrap().sampling_interval, 7);

        let cli = parse(&["clip.mp4", "--config", &path_arg, "--interval", "3"]).unwrap();
        assert_eq!(load_config(&cli).unwrap().sampling_interval, 3);
    }

    #[test]
    fn test_load_config_rejects_zero_interval() {
        let cli = parse(&["clip.mp4", "--interval", "0"]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}
