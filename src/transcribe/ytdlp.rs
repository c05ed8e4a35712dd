use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{AudioFetcher, TranscribeError};
use crate::config::DownloaderConfig;

#[cfg(windows)]
const LOCAL_BINARY: &str = "yt-dlp.exe";
#[cfg(not(windows))]
const LOCAL_BINARY: &str = "yt-dlp";

#[cfg(windows)]
const INSTALL_GUIDANCE: &str = concat!(
    "Download yt-dlp.exe into the current directory: ",
    "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp.exe"
);
#[cfg(not(windows))]
const INSTALL_GUIDANCE: &str = "Install yt-dlp: https://github.com/yt-dlp/yt-dlp#installation";

/// Audio extraction using yt-dlp
pub struct YtDlp {
    command: String,
    audio_format: String,
    /// Directory searched for a standalone binary when the command is not runnable
    local_dir: PathBuf,
}

impl YtDlp {
    pub fn new(config: &DownloaderConfig) -> Self {
        Self {
            command: config.command.clone(),
            audio_format: config.audio_format.clone(),
            local_dir: config.local_dir.clone(),
        }
    }

    /// Find a runnable yt-dlp: the configured command first, then a binary in the local directory
    pub async fn locate(&self) -> Result<String, TranscribeError> {
        if check_command_available(&self.command).await {
            return Ok(self.command.clone());
        }

        let local = self.local_dir.join(LOCAL_BINARY);
        if local.is_file() && check_command_available(&local.to_string_lossy()).await {
            tracing::debug!("Using local downloader binary: {}", local.display());
            return Ok(local.to_string_lossy().into_owned());
        }

        Err(TranscribeError::ToolMissing {
            tool: self.command.clone(),
            guidance: INSTALL_GUIDANCE.to_string(),
        })
    }

    /// Arguments for audio-only, best-quality, single-video extraction
    pub fn build_args(&self, url: &str, dest: &Path) -> Vec<String> {
        // yt-dlp picks the final extension itself after conversion
        let template = dest.with_extension("%(ext)s");

        vec![
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.audio_format.clone(),
            "--audio-quality".to_string(),
            "0".to_string(),
            "--no-playlist".to_string(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl AudioFetcher for YtDlp {
    async fn fetch_audio(&self, url: &str, dest: &Path) -> Result<(), TranscribeError> {
        let program = self.locate().await?;
        let args = self.build_args(url, dest);
        tracing::debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(&program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let error = if error.is_empty() {
                format!("{} exited with {}", program, output.status)
            } else {
                error
            };
            return Err(TranscribeError::DownloadFailed(error));
        }

        Ok(())
    }

    fn extension(&self) -> &str {
        &self.audio_format
    }
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
