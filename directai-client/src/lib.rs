pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod runner;
pub mod stream;

#[cfg(test)]
mod test_support;

pub use client::{DeploymentHandle, DirectAIClient, ImageUpload};
pub use error::{ClientError, Result};
pub use models::{Classifier, Detector, ModelKind, MultiClassifier};
pub use runner::{
    collect_inputs, persist_results, prepare_sinks, route_file, BatchRunner, ResultsMap,
    RunOptions, RunReport,
};
pub use stream::{
    StopOutcome, StreamClassifierConfig, StreamDetector, StreamSession, TrackerConfig,
    TrackerSettings,
};
