// DirectAI command line interface
// Batch classification and detection over a directory, and live stream sessions

mod recording;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use directai_client::{
    BatchRunner, Classifier, Detector, DirectAIClient, ModelKind, MultiClassifier, RunOptions,
    StopOutcome, StreamClassifierConfig, StreamSession, TrackerConfig,
};
use directai_core::{resolve_config, ClientConfig, Credentials, DeployRequest, DeploymentKind};
use directai_eye::AnnotationStyle;
use recording::{RecordOptions, Recording};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "directai")]
#[command(about = "Run DirectAI classifiers and detectors over local images and live streams", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Client settings file (JSON, TOML or YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, overrides the settings file and DIRECTAI_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Args)]
struct BatchArgs {
    /// Directory of input images
    #[arg(long = "data-dir", short = 'd', default_value = "data")]
    data_dir: PathBuf,

    /// Directory for results and per-class copies
    #[arg(long = "results-dir", short = 'r', default_value = "results")]
    results_dir: PathBuf,
}

#[derive(Args)]
struct RecordArgs {
    /// Save the rebroadcast stream under this directory with ffmpeg
    #[arg(long)]
    record_dir: Option<PathBuf>,

    /// Seconds to wait before the recorder connects
    #[arg(long, default_value = "10")]
    record_delay_secs: u64,
}

impl RecordArgs {
    fn options(&self) -> Option<RecordOptions> {
        self.record_dir
            .clone()
            .map(|dir| RecordOptions::new(dir, self.record_delay_secs))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every image and copy it into its predicted class directory
    Classify {
        #[command(flatten)]
        batch: BatchArgs,

        /// Classifier configuration, used when no class names are given
        #[arg(long = "config-file", short = 'f', default_value = "configs/classifier.json")]
        config_file: PathBuf,

        /// Class names to deploy instead of the configuration file
        #[arg(long = "class-name", short = 'c', num_args = 1..)]
        class_names: Vec<String>,

        /// Record results without copying files into class directories
        #[arg(long)]
        no_route: bool,
    },

    /// Detect objects in every image
    Detect {
        #[command(flatten)]
        batch: BatchArgs,

        /// Detector configuration, used when no class names are given
        #[arg(long = "config-file", short = 'f', default_value = "configs/detector.json")]
        config_file: PathBuf,

        /// Class names to deploy instead of the configuration file
        #[arg(long = "class-name", short = 'c', num_args = 1..)]
        class_names: Vec<String>,

        /// Write annotated copies with bounding boxes drawn
        #[arg(long = "bounding-boxes", short = 'b')]
        bounding_boxes: bool,

        /// Box outline thickness in pixels
        #[arg(long, default_value = "2")]
        thickness: u32,
    },

    /// Query several classifiers per image in one call
    MultiClassify {
        #[command(flatten)]
        batch: BatchArgs,

        /// Classifier configurations, one deployment each
        #[arg(
            long = "config-file",
            short = 'f',
            num_args = 1..,
            default_values = ["configs/classifier.json", "configs/alt_classifier.json"]
        )]
        config_files: Vec<PathBuf>,

        #[arg(long)]
        no_route: bool,
    },

    /// Track detections on a live stream until interrupted
    Track {
        /// Tracker configuration
        #[arg(long = "config-file", short = 'f', default_value = "configs/tracker.json")]
        config_file: PathBuf,

        /// Override the configured stream URL
        #[arg(long)]
        stream_url: Option<String>,

        /// Override the configured webhook URL
        #[arg(long)]
        webhook_url: Option<String>,

        #[command(flatten)]
        record: RecordArgs,
    },

    /// Run a classifier on a live stream until interrupted
    StreamClassify {
        #[arg(long = "config-file", short = 'f', default_value = "configs/classifier.json")]
        config_file: PathBuf,

        #[arg(long = "class-name", short = 'c', num_args = 1..)]
        class_names: Vec<String>,

        /// Source stream (rtsp, rtmp or http)
        #[arg(long)]
        stream_url: String,

        /// Endpoint receiving per-frame classifications
        #[arg(long)]
        webhook_url: Option<String>,

        #[command(flatten)]
        record: RecordArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    let config = load_config(cli.config.as_deref(), cli.base_url.as_deref())?;
    let job = prepare(cli.command, &config)?;

    let credentials = Credentials::from_env().context("missing DirectAI credentials")?;
    let client = DirectAIClient::connect(config, &credentials)
        .await
        .context("could not authenticate with DirectAI")?;

    job.run(&client).await
}

/// A subcommand with its model configuration resolved and validated
enum Job {
    Classify {
        kind: Classifier,
        batch: BatchArgs,
        route_files: bool,
    },
    Detect {
        kind: Detector,
        batch: BatchArgs,
    },
    MultiClassify {
        kind: MultiClassifier,
        batch: BatchArgs,
        route_files: bool,
    },
    Track {
        tracker: TrackerConfig,
        record: Option<RecordOptions>,
    },
    StreamClassify {
        request: DeployRequest,
        stream_url: String,
        webhook_url: Option<String>,
        record: Option<RecordOptions>,
    },
}

/// Load every local config a command needs before any request is made
fn prepare(command: Commands, config: &ClientConfig) -> anyhow::Result<Job> {
    let job = match command {
        Commands::Classify {
            batch,
            config_file,
            class_names,
            no_route,
        } => {
            let request = resolve_config(
                DeploymentKind::Classifier,
                &class_names,
                Some(config_file.as_path()),
                &config.detector,
            )?;
            Job::Classify {
                kind: Classifier::new(request)?,
                batch,
                route_files: !no_route,
            }
        }
        Commands::Detect {
            batch,
            config_file,
            class_names,
            bounding_boxes,
            thickness,
        } => {
            let request = resolve_config(
                DeploymentKind::Detector,
                &class_names,
                Some(config_file.as_path()),
                &config.detector,
            )?;
            let mut kind = Detector::new(request)?;
            if bounding_boxes {
                kind = kind.with_annotation(AnnotationStyle { thickness });
            }
            Job::Detect { kind, batch }
        }
        Commands::MultiClassify {
            batch,
            config_files,
            no_route,
        } => {
            let requests = config_files
                .iter()
                .map(|path| DeployRequest::from_file(DeploymentKind::Classifier, path))
                .collect::<Result<Vec<_>, _>>()?;
            Job::MultiClassify {
                kind: MultiClassifier::new(requests)?,
                batch,
                route_files: !no_route,
            }
        }
        Commands::Track {
            config_file,
            stream_url,
            webhook_url,
            record,
        } => {
            let mut tracker = TrackerConfig::from_file(&config_file)
                .with_context(|| format!("failed to load {}", config_file.display()))?;
            if let Some(url) = stream_url {
                tracker.stream_url = url;
            }
            if webhook_url.is_some() {
                tracker.webhook_url = webhook_url;
            }
            tracker.validate()?;
            Job::Track {
                tracker,
                record: record.options(),
            }
        }
        Commands::StreamClassify {
            config_file,
            class_names,
            stream_url,
            webhook_url,
            record,
        } => {
            let request = resolve_config(
                DeploymentKind::Classifier,
                &class_names,
                Some(config_file.as_path()),
                &config.detector,
            )?;
            request.validate()?;
            Job::StreamClassify {
                request,
                stream_url,
                webhook_url,
                record: record.options(),
            }
        }
    };
    Ok(job)
}

impl Job {
    async fn run(self, client: &DirectAIClient) -> anyhow::Result<()> {
        match self {
            Job::Classify {
                kind,
                batch,
                route_files,
            } => run_batch(client, &kind, &batch, route_files).await,
            Job::Detect { kind, batch } => run_batch(client, &kind, &batch, false).await,
            Job::MultiClassify {
                kind,
                batch,
                route_files,
            } => run_batch(client, &kind, &batch, route_files).await,
            Job::Track { tracker, record } => {
                let session = client
                    .start_tracker(&tracker)
                    .await
                    .context("could not start tracker")?;
                hold_session(client, session, record).await
            }
            Job::StreamClassify {
                request,
                stream_url,
                webhook_url,
                record,
            } => {
                let handle = client.deploy(&request).await?;
                let stream =
                    StreamClassifierConfig::new(stream_url, &handle).with_webhook(webhook_url);
                let session = client
                    .start_classifier_stream(&stream)
                    .await
                    .context("could not start stream classifier")?;
                hold_session(client, session, record).await
            }
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Settings file, then environment, then command line
fn load_config(path: Option<&Path>, base_url: Option<&str>) -> anyhow::Result<ClientConfig> {
    let mut config = match path {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ClientConfig::default(),
    };
    config.apply_env();
    if let Some(url) = base_url {
        config.base_url = url.to_string();
    }
    config.validate()?;
    debug!("Using API at {}", config.base_url);
    Ok(config)
}

async fn run_batch<K: ModelKind>(
    client: &DirectAIClient,
    kind: &K,
    batch: &BatchArgs,
    route_files: bool,
) -> anyhow::Result<()> {
    let options =
        RunOptions::new(&batch.data_dir, &batch.results_dir).with_routing(route_files);
    let report = BatchRunner::new(client, kind, options)
        .execute()
        .await
        .with_context(|| format!("{} run over {} failed", kind.name(), batch.data_dir.display()))?;

    println!(
        "Processed {} files, results in {}",
        report.results.len(),
        report.results_path.display()
    );
    if route_files {
        let mut per_class: BTreeMap<String, usize> = BTreeMap::new();
        for payload in report.results.values() {
            for class_name in kind.routing_keys(payload)? {
                *per_class.entry(class_name).or_default() += 1;
            }
        }
        for (class_name, count) in per_class {
            println!("  {:<24} {}", class_name, count);
        }
    }
    Ok(())
}

/// Keep a stream session alive until Ctrl+C / SIGTERM, then stop it
async fn hold_session(
    client: &DirectAIClient,
    session: StreamSession,
    record: Option<RecordOptions>,
) -> anyhow::Result<()> {
    println!("Watch the stream at {}", session.watch_url);
    println!("Press Ctrl+C to stop");

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    let mut recorder = None;
    if let Some(options) = record {
        tokio::select! {
            _ = &mut shutdown => {
                return stop_session(client, &session).await;
            }
            _ = tokio::time::sleep(options.warmup) => {
                match Recording::start(&options, &session.watch_url, &session.tracker_instance_id) {
                    Ok(recording) => {
                        debug!("Recorder writing {}", recording.path().display());
                        recorder = Some(recording);
                    }
                    Err(e) => warn!("Could not start recording: {}", e),
                }
            }
        }
    }

    shutdown.await;

    if let Some(recording) = recorder {
        recording.stop().await;
    }
    stop_session(client, &session).await
}

async fn stop_session(client: &DirectAIClient, session: &StreamSession) -> anyhow::Result<()> {
    match client.stop_stream(session).await {
        Ok(StopOutcome::Stopped) => {
            println!("Stream {} stopped", session.tracker_instance_id);
        }
        Ok(StopOutcome::NotConfirmed(message)) => {
            warn!(
                "Stop of {} not confirmed: {}",
                session.tracker_instance_id, message
            );
        }
        Err(e) => {
            warn!("Failed to stop {}: {}", session.tracker_instance_id, e);
        }
    }
    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
