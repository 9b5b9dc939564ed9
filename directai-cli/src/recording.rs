// Local capture of a rebroadcast stream through ffmpeg

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub dir: PathBuf,
    /// Time to let the rebroadcast come up before connecting
    pub warmup: Duration,
    /// Time the recorder gets to finalize its output after being asked to quit
    pub grace: Duration,
    pub program: String,
}

impl RecordOptions {
    pub fn new(dir: PathBuf, warmup_secs: u64) -> Self {
        Self {
            dir,
            warmup: Duration::from_secs(warmup_secs),
            grace: Duration::from_secs(10),
            program: "ffmpeg".to_string(),
        }
    }
}

/// `{dir}/stream_{id}_{YYYYmmdd_HHMMSS}.mp4`
pub fn recording_path(dir: &Path, tracker_instance_id: &str, started: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "stream_{}_{}.mp4",
        tracker_instance_id,
        started.format("%Y%m%d_%H%M%S")
    ))
}

pub struct Recording {
    child: Child,
    path: PathBuf,
    grace: Duration,
}

impl Recording {
    /// Copy the watch stream to disk without re-encoding
    pub fn start(
        options: &RecordOptions,
        watch_url: &str,
        tracker_instance_id: &str,
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(&options.dir)?;
        let path = recording_path(&options.dir, tracker_instance_id, Local::now());

        let child = Command::new(&options.program)
            .arg("-i")
            .arg(watch_url)
            .args(["-c", "copy"])
            .arg(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        info!("Recording {} to {}", watch_url, path.display());
        Ok(Self {
            child,
            path,
            grace: options.grace,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ask the recorder to quit so it can write the container trailer.
    /// Killed only if it has not exited within the grace period.
    pub async fn stop(mut self) {
        if let Ok(Some(status)) = self.child.try_wait() {
            warn!("Recorder already exited with {}", status);
            return;
        }

        if let Some(mut stdin) = self.child.stdin.take() {
            if let Err(e) = stdin.write_all(b"q\n").await {
                debug!("Could not send quit to recorder: {}", e);
            }
            // closing stdin is a second quit signal
            drop(stdin);
        }

        match tokio::time::timeout(self.grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!("Recorder exited with {}", status);
                info!("Recording saved to {}", self.path.display());
            }
            Ok(Err(e)) => warn!("Failed to wait for recorder: {}", e),
            Err(_) => {
                warn!(
                    "Recorder did not exit within {:?}, killing it; {} may be incomplete",
                    self.grace,
                    self.path.display()
                );
                if let Err(e) = self.child.kill().await {
                    warn!("Failed to stop recorder: {}", e);
                }
            }
        }
    }
}
