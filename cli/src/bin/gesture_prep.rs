use clap::{Args, Parser, Subcommand};
use cli::{run, run_stage, DetectorConfig, PipelineConfig, Stage, StageSummary};
use color_eyre::eyre::{eyre, Result};
use std::path::PathBuf;
use strum::IntoEnumIterator;
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Prepare hand-gesture keypoint datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every stage.
#[derive(Args)]
struct Common {
    /// Pipeline configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Root directory of every stage output
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode gesture videos into fixed-length frame sequences
    ExtractFrames {
        #[command(flatten)]
        common: Common,
        /// `<category>/<gesture>/<video>` input tree
        #[arg(short, long)]
        videos: Option<PathBuf>,
        /// Frames written per video
        #[arg(long)]
        max_frames: Option<usize>,
        /// Write plain frames without the landmark overlay
        #[arg(long)]
        no_annotate: bool,
        #[command(flatten)]
        detector: DetectorArgs,
    },
    /// Detect hand landmarks on every extracted frame
    ExtractLandmarks {
        #[command(flatten)]
        common: Common,
        #[command(flatten)]
        detector: DetectorArgs,
    },
    /// Min-max normalize extracted keypoints per video
    Normalize {
        #[command(flatten)]
        common: Common,
    },
    /// Generate augmented variants of every label
    Augment {
        #[command(flatten)]
        common: Common,
        #[arg(long)]
        variants: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Subsample points and split frames into train/test
    Split {
        #[command(flatten)]
        common: Common,
        #[arg(long)]
        train_ratio: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run several stages in pipeline order
    Run {
        #[command(flatten)]
        common: Common,
        /// Comma-separated stages, all of them when omitted
        #[arg(long, value_delimiter = ',')]
        stages: Vec<Stage>,
        #[arg(short, long)]
        videos: Option<PathBuf>,
        /// Seed for both augmentation and splitting
        #[arg(long)]
        seed: Option<u64>,
        #[command(flatten)]
        detector: DetectorArgs,
    },
    /// Print the JSON schema of the configuration file
    Schema {
        /// Write the schema to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct DetectorArgs {
    /// External landmark program speaking the length-prefixed PNG frame protocol
    #[arg(long)]
    detector: Option<String>,
    /// Argument passed to the detector, repeatable
    #[arg(long = "detector-arg", allow_hyphen_values = true)]
    detector_args: Vec<String>,
}

impl Common {
    fn load(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                PipelineConfig::from_file(path)?
            }
            None => PipelineConfig::default(),
        };
        if let Some(output) = &self.output {
            config.paths.output = output.clone();
        }
        Ok(config)
    }
}

impl DetectorArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(program) = &self.detector {
            config.landmarks.detector = Some(DetectorConfig {
                program: program.clone(),
                args: self.detector_args.clone(),
            });
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    let summaries = match cli.command {
        Commands::ExtractFrames {
            common,
            videos,
            max_frames,
            no_annotate,
            detector,
        } => {
            let mut config = common.load()?;
            if videos.is_some() {
                config.paths.videos = videos;
            }
            if let Some(max_frames) = max_frames {
                config.frames.max_frames = max_frames;
            }
            if no_annotate {
                config.frames.annotate = false;
            }
            detector.apply(&mut config);
            vec![run_stage(&config, Stage::ExtractFrames)?]
        }
        Commands::ExtractLandmarks { common, detector } => {
            let mut config = common.load()?;
            detector.apply(&mut config);
            vec![run_stage(&config, Stage::ExtractLandmarks)?]
        }
        Commands::Normalize { common } => {
            vec![run_stage(&common.load()?, Stage::Normalize)?]
        }
        Commands::Augment { common, variants, seed } => {
            let mut config = common.load()?;
            if let Some(variants) = variants {
                config.augment.variants = variants;
            }
            if seed.is_some() {
                config.augment.seed = seed;
            }
            run(&config, &[Stage::Augment])?
        }
        Commands::Split {
            common,
            train_ratio,
            seed,
        } => {
            let mut config = common.load()?;
            if let Some(train_ratio) = train_ratio {
                config.split.train_ratio = train_ratio;
            }
            if seed.is_some() {
                config.split.seed = seed;
            }
            run(&config, &[Stage::Split])?
        }
        Commands::Run {
            common,
            stages,
            videos,
            seed,
            detector,
        } => {
            let mut config = common.load()?;
            if videos.is_some() {
                config.paths.videos = videos;
            }
            if seed.is_some() {
                config.augment.seed = seed;
                config.split.seed = seed;
            }
            detector.apply(&mut config);

            let stages = if stages.is_empty() {
                Stage::iter().collect()
            } else {
                stages
            };
            run(&config, &stages)?
        }
        Commands::Schema { output } => {
            let schema = serde_json::to_string_pretty(&PipelineConfig::schema())?;
            match output {
                Some(path) => {
                    std::fs::write(&path, schema)?;
                    info!("Schema written to {}", path.display());
                }
                None => println!("{}", schema),
            }
            return Ok(());
        }
    };

    report(&summaries)
}

fn report(summaries: &[StageSummary]) -> Result<()> {
    let mut failed = 0;
    for summary in summaries {
        for path in &summary.skipped {
            warn!("{}: skipped {}", summary.stage, path.display());
        }
        failed += summary.failed.len();
    }

    if failed > 0 {
        return Err(eyre!("{} output file(s) could not be written", failed));
    }
    info!("✅ Completed {} stage(s)", summaries.len());
    Ok(())
}
