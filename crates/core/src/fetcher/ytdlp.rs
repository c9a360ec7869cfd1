//! `yt-dlp` based fetcher implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::FetcherConfig;
use super::error::FetchError;
use super::traits::{FetchRequest, Fetcher};
use crate::job::ProcessRegistry;

/// Bytes of stderr kept for error reporting.
const STDERR_TAIL: usize = 2048;

/// Fetcher that shells out to `yt-dlp`.
pub struct YtDlpFetcher {
    config: FetcherConfig,
}

impl YtDlpFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FetcherConfig::default())
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Builds the argument list for one attempt.
    ///
    /// The output template keeps the requested stem and lets the tool pick
    /// the extension, which after extraction is the target format.
    fn build_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args: Vec<String> = self.config.extra_args.clone();

        args.extend([
            "-x".to_string(),
            "--audio-format".to_string(),
            request.format.extension().to_string(),
            "--audio-quality".to_string(),
            self.config.audio_quality.clone(),
            "--no-playlist".to_string(),
            "--add-metadata".to_string(),
            "-o".to_string(),
            output_template(&request.output_path),
        ]);

        if let Some(proxy) = &request.proxy {
            args.extend(["--proxy".to_string(), proxy.clone()]);
        }

        args.push(format!("ytsearch1:{}", request.query));
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> FetchError {
        if e.kind() == std::io::ErrorKind::NotFound {
            FetchError::BinaryNotFound {
                path: self.config.binary.clone(),
            }
        } else {
            FetchError::Io(e)
        }
    }

    async fn wait(child: &mut Child, deadline: Option<u64>) -> Result<ExitStatus, FetchError> {
        match deadline {
            Some(secs) => timeout(Duration::from_secs(secs), child.wait())
                .await
                .map_err(|_| FetchError::Timeout { timeout_secs: secs })?
                .map_err(FetchError::from),
            None => child.wait().await.map_err(FetchError::from),
        }
    }
}

fn output_template(output_path: &Path) -> String {
    output_path
        .with_extension("%(ext)s")
        .to_string_lossy()
        .to_string()
}

fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Reads `reader` to the end, replacing invalid UTF-8. A read error keeps
/// whatever arrived before it.
async fn read_lossy<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        debug!("Stopped reading fetch tool stderr: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        processes: &ProcessRegistry,
    ) -> Result<PathBuf, FetchError> {
        let args = self.build_args(request);
        debug!("Spawning {:?} for {:?}", self.config.binary, request.query);

        let mut child = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let switch = processes.register(child.id(), request.query.clone());

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            match stderr {
                Some(stderr) => read_lossy(stderr).await,
                None => String::new(),
            }
        });

        let outcome = tokio::select! {
            biased;
            _ = switch.killed() => None,
            status = Self::wait(&mut child, self.config.attempt_timeout_secs) => Some(status),
        };

        let status = match outcome {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                if let Err(kill_err) = child.kill().await {
                    debug!("Kill after failed wait: {}", kill_err);
                }
                stderr_task.abort();
                return Err(e);
            }
            None => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill fetch process {:?}: {}", child.id(), e);
                }
                stderr_task.abort();
                return Err(FetchError::Killed);
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(FetchError::exited(
                status.code(),
                tail(&stderr, STDERR_TAIL),
            ));
        }

        // A zero exit code alone does not prove the file was written.
        if !tokio::fs::try_exists(&request.output_path)
            .await
            .unwrap_or(false)
        {
            return Err(FetchError::OutputMissing {
                path: request.output_path.clone(),
            });
        }

        Ok(request.output_path.clone())
    }

    async fn validate(&self) -> Result<(), FetchError> {
        let output = Command::new(&self.config.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(FetchError::exited(
                output.status.code(),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        debug!(
            "{:?} version {}",
            self.config.binary,
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }
}
