// Batch inference over a directory of images

use crate::client::{DirectAIClient, ImageUpload};
use crate::error::Result;
use crate::models::ModelKind;
use directai_core::media::is_ignored_file_name;
use directai_core::Error;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Filename -> service payload, in processing order
pub type ResultsMap = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_dir: PathBuf,
    pub results_dir: PathBuf,
    /// Copy each input into the directory named after its prediction
    pub route_files: bool,
}

impl RunOptions {
    pub fn new(input_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            results_dir: results_dir.into(),
            route_files: false,
        }
    }

    pub fn with_routing(mut self, route_files: bool) -> Self {
        self.route_files = route_files;
        self
    }
}

/// Outcome of a completed run
#[derive(Debug)]
pub struct RunReport {
    pub results: ResultsMap,
    pub results_path: PathBuf,
}

/// A class name must name exactly one directory directly under the results dir
fn sink_path(results_dir: &Path, class_name: &str) -> Result<PathBuf> {
    let mut components = Path::new(class_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(results_dir.join(class_name)),
        _ => Err(Error::Config(format!(
            "class name '{}' cannot be used as a directory name",
            class_name
        ))
        .into()),
    }
}

/// Create one empty directory per class under `results_dir`, wiping any
/// previous contents
pub fn prepare_sinks(class_names: &[String], results_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sinks = Vec::with_capacity(class_names.len());
    for class_name in class_names {
        let sink = sink_path(results_dir, class_name)?;
        if sink.is_dir() {
            fs::remove_dir_all(&sink)?;
        } else if sink.exists() {
            fs::remove_file(&sink)?;
        }
        fs::create_dir_all(&sink)?;
        debug!("Prepared result directory {}", sink.display());
        sinks.push(sink);
    }
    Ok(sinks)
}

/// Copy `source` into the prepared directory for `class_name`
pub fn route_file(source: &Path, results_dir: &Path, class_name: &str) -> Result<PathBuf> {
    let sink = sink_path(results_dir, class_name)?;
    if !sink.is_dir() {
        return Err(Error::MissingSink {
            class: class_name.to_string(),
            path: sink.display().to_string(),
        }
        .into());
    }

    let file_name = source
        .file_name()
        .ok_or_else(|| Error::Config(format!("{} has no file name", source.display())))?;
    let destination = sink.join(file_name);
    fs::copy(source, &destination)?;
    Ok(destination)
}

/// Write all results as one JSON document, replacing any previous file
pub fn persist_results(results: &ResultsMap, results_dir: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(results_dir)?;
    let path = results_dir.join(file_name);
    let content = serde_json::to_string_pretty(results)?;
    fs::write(&path, content)?;
    info!("Saved {} results to {}", results.len(), path.display());
    Ok(path)
}

/// Files to submit, in directory-listing order
pub fn collect_inputs(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if is_ignored_file_name(&name.to_string_lossy()) {
            debug!("Skipping {}", entry.path().display());
            continue;
        }
        if entry.path().is_dir() {
            debug!("Skipping directory {}", entry.path().display());
            continue;
        }
        inputs.push(entry.path());
    }
    Ok(inputs)
}

pub struct BatchRunner<'a, K: ModelKind> {
    client: &'a DirectAIClient,
    kind: &'a K,
    options: RunOptions,
}

impl<'a, K: ModelKind> BatchRunner<'a, K> {
    pub fn new(client: &'a DirectAIClient, kind: &'a K, options: RunOptions) -> Self {
        Self {
            client,
            kind,
            options,
        }
    }

    /// Prepare result directories, deploy, submit every input and save the results.
    ///
    /// Any failure aborts the run; nothing is written to the results file unless
    /// every input succeeded.
    pub async fn execute(&self) -> Result<RunReport> {
        if self.options.route_files {
            prepare_sinks(&self.kind.class_names(), &self.options.results_dir)?;
        } else {
            fs::create_dir_all(&self.options.results_dir)?;
        }

        let handle = self.kind.deploy(self.client).await?;
        debug!("Using {} deployment {:?}", self.kind.name(), handle);

        let results = self.run(&handle).await?;
        let results_path = persist_results(
            &results,
            &self.options.results_dir,
            self.kind.results_file_name(),
        )?;

        Ok(RunReport {
            results,
            results_path,
        })
    }

    /// Submit every input file sequentially against an existing deployment
    pub async fn run(&self, handle: &K::Handle) -> Result<ResultsMap> {
        let inputs = collect_inputs(&self.options.input_dir)?;
        let total = inputs.len();
        info!(
            "Running {} on {} files from {}",
            self.kind.name(),
            total,
            self.options.input_dir.display()
        );

        let mut results = ResultsMap::new();
        for (index, path) in inputs.iter().enumerate() {
            let upload = ImageUpload::from_path(path)?;
            info!("[{}/{}] {}", index + 1, total, upload.file_name);

            let payload = self.kind.submit(self.client, handle, &upload).await?;
            debug!("{} -> {}", upload.file_name, payload);

            if self.options.route_files {
                for class_name in self.kind.routing_keys(&payload)? {
                    route_file(path, &self.options.results_dir, &class_name)?;
                }
            }
            self.kind
                .after_submit(path, &payload, &self.options.results_dir)?;

            results.insert(upload.file_name, payload);
        }

        Ok(results)
    }
}
