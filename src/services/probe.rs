//! ffprobe wrapper used to read a video's frame dimensions.

use crate::models::aspect_ratio::AspectRatio;
use serde::Deserialize;
use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` started but its output could not be collected: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("ffprobe exited with code {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("ffprobe did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("failed to parse ffprobe output: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no video stream found")]
    NoStreams,

    #[error("video stream has no width or height")]
    MissingDimensions,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Runs ffprobe with a bounded wait.
#[derive(Debug, Clone)]
pub struct VideoProber {
    program: PathBuf,
    timeout: Duration,
}

impl VideoProber {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Width and height of the first video stream in `path`.
    pub async fn dimensions(&self, path: &Path) -> Result<(u32, u32), ProbeError> {
        let mut command = Command::new(&self.program);
        command
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| ProbeError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        // Dropping the output future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProbeError::TimedOut(self.timeout))?
            .map_err(|source| self.wait_failed(source))?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_dimensions(&output.stdout)
    }

    fn wait_failed(&self, source: io::Error) -> ProbeError {
        ProbeError::Wait {
            program: self.program.display().to_string(),
            source,
        }
    }

    /// Classify the first video stream of `path`.
    pub async fn aspect_ratio(&self, path: &Path) -> Result<AspectRatio, ProbeError> {
        let (width, height) = self.dimensions(path).await?;
        let ratio = AspectRatio::from_dimensions(width, height);
        tracing::debug!(width, height, aspect_ratio = %ratio, path = %path.display(), "probed video");
        Ok(ratio)
    }
}

fn parse_dimensions(stdout: &[u8]) -> Result<(u32, u32), ProbeError> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout)?;
    let stream = parsed.streams.first().ok_or(ProbeError::NoStreams)?;
    match (stream.width, stream.height) {
        (Some(width), Some(height)) => Ok((width, height)),
        _ => Err(ProbeError::MissingDimensions),
    }
}
