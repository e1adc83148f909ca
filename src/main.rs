//! Face affect analysis: Gabor-feature emotions and eye blinks from face landmarks.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use face_affect::app::{self, AffectApp, ExtractJob};
use face_affect::config::{Config, EXAMPLE_CONFIG};
use face_affect::emotion::SoftmaxClassifier;
use face_affect::records;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract face, Gabor, emotion, blink and distance records
    Extract {
        /// Frame directories or video files
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Face record CSV (single input only; defaults to faces.csv in the
        /// frame directory or <name>.faces.csv next to a video)
        #[arg(short, long)]
        faces: Option<PathBuf>,

        /// Emotion model (overrides the configuration)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Output directory (overrides the configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write zeros instead of empty cells for frames without a face
        #[arg(long)]
        legacy_zero_sentinel: bool,
    },

    /// Train an emotion model from labelled Gabor features
    Train {
        /// Training CSV (`sample, resp.0000, ..., label`)
        #[arg(long)]
        data: PathBuf,

        /// Where to save the model
        #[arg(short, long)]
        model: PathBuf,

        /// Gradient descent epochs (overrides the configuration)
        #[arg(long)]
        epochs: Option<usize>,
    },

    /// Classify a Gabor feature CSV into an emotions CSV
    Classify {
        /// Gabor feature CSV
        #[arg(short, long)]
        gabor: PathBuf,

        /// Emotion model
        #[arg(short, long)]
        model: PathBuf,

        /// Emotions CSV to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print an example configuration
    Config,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config file {}", config_path.display()))?
    } else {
        Config::default()
    };

    match args.command {
        Command::Extract {
            input,
            faces,
            model,
            output,
            legacy_zero_sentinel,
        } => {
            if faces.is_some() && input.len() > 1 {
                bail!("--faces can only be given with a single input");
            }
            if model.is_some() {
                config.emotion.model = model;
            }
            if let Some(output) = output {
                config.output.directory = output;
            }
            config.output.legacy_zero_sentinel |= legacy_zero_sentinel;

            let batch = input.len() > 1;
            let jobs: Vec<ExtractJob> = input
                .into_iter()
                .map(|input| {
                    let output_dir = if batch {
                        let name = input.file_stem().map(PathBuf::from).unwrap_or_default();
                        config.output.directory.join(name)
                    } else {
                        config.output.directory.clone()
                    };
                    match &faces {
                        Some(faces) => ExtractJob {
                            input,
                            faces: faces.clone(),
                            output_dir,
                        },
                        None => ExtractJob::with_default_faces(input, output_dir),
                    }
                })
                .collect();

            let app = AffectApp::new(config)?;
            let summary = app.extract_batch(&jobs)?;
            for (input, error) in &summary.failed {
                warn!("{} failed: {error}", input.display());
            }
            if summary.processed.is_empty() {
                bail!("No input could be processed");
            }
        }

        Command::Train { data, model, epochs } => {
            let mut params = config.emotion.training;
            if let Some(epochs) = epochs {
                params.epochs = epochs;
            }
            app::train(&data, &model, &params)?;
        }

        Command::Classify { gabor, model, output } => {
            let classifier = SoftmaxClassifier::load(&model)?;
            let emotions = app::classify(&gabor, &classifier, config.input.legacy_zero_sentinel)?;
            records::write_emotions(&output, &emotions, config.output.legacy_zero_sentinel)?;
            info!("Wrote {} emotion records to {}", emotions.len(), output.display());
        }

        Command::Config => {
            print!("{EXAMPLE_CONFIG}");
        }
    }

    Ok(())
}
