use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use uuid::Uuid;

pub mod whisper;
pub mod ytdlp;

pub use whisper::WhisperCli;
pub use ytdlp::YtDlp;

use crate::config::Config;

#[derive(thiserror::Error, Debug)]
pub enum TranscribeError {
    #[error("{tool} is not available. {guidance}")]
    ToolMissing { tool: String, guidance: String },

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Audio download failed: extracted file is missing or empty")]
    EmptyAudio,

    #[error("Speech model is not available: {0}")]
    ModelUnavailable(String),

    #[error("Speech recognition failed: {0}")]
    ModelFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of the audio stage; `text` holds the error description on failure
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// Transcribed text, or a description of what went wrong
    pub text: String,

    /// Wall-clock time spent in the stage
    pub elapsed: Duration,

    /// Size of the extracted audio, when it got that far
    pub audio_bytes: Option<u64>,

    /// Whether `text` is a transcript rather than an error message
    pub succeeded: bool,
}

impl TranscriptionResult {
    pub fn success(text: String, elapsed: Duration, audio_bytes: u64) -> Self {
        Self {
            text,
            elapsed,
            audio_bytes: Some(audio_bytes),
            succeeded: true,
        }
    }

    pub fn failure(error: &TranscribeError, elapsed: Duration) -> Self {
        Self {
            text: error.to_string(),
            elapsed,
            audio_bytes: None,
            succeeded: false,
        }
    }
}

/// Produces a transcript for a video URL. Never fails: errors come back as text.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    async fn transcribe(&self, url: &str) -> TranscriptionResult;
}

/// Extracts the audio track of a video URL into a local file
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Write the audio track to `dest`
    async fn fetch_audio(&self, url: &str, dest: &Path) -> Result<(), TranscribeError>;

    /// File extension of the produced audio
    fn extension(&self) -> &str;
}

/// Speech-to-text over a local audio file
#[async_trait]
pub trait SpeechModel: Send + Sync {
    async fn transcribe_file(&self, audio: &Path) -> Result<String, TranscribeError>;

    /// Get the model name for logging
    fn name(&self) -> &str;
}

/// Download-then-recognize pipeline over a scoped work directory
pub struct AudioTranscriber {
    fetcher: Box<dyn AudioFetcher>,
    model: Box<dyn SpeechModel>,
    work_root: Option<PathBuf>,
}

impl AudioTranscriber {
    pub fn new(fetcher: Box<dyn AudioFetcher>, model: Box<dyn SpeechModel>, work_root: Option<PathBuf>) -> Self {
        Self { fetcher, model, work_root }
    }

    /// yt-dlp + whisper as configured
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Box::new(YtDlp::new(&config.downloader)),
            Box::new(WhisperCli::new(&config.transcription)),
            config.downloader.work_dir.clone(),
        )
    }

    fn work_dir(&self) -> Result<TempDir, TranscribeError> {
        let dir = match &self.work_root {
            Some(root) => {
                fs_err::create_dir_all(root)?;
                tempfile::Builder::new().prefix("biliscribe-").tempdir_in(root)?
            }
            None => tempfile::Builder::new().prefix("biliscribe-").tempdir()?,
        };
        Ok(dir)
    }

    async fn run(&self, url: &str) -> Result<(String, u64), TranscribeError> {
        // Dropping the directory removes the audio on every error path
        let work_dir = self.work_dir()?;
        let audio_path = work_dir.path().join(format!(
            "audio_{}.{}",
            &Uuid::new_v4().simple().to_string()[..8],
            self.fetcher.extension()
        ));

        tracing::info!("Extracting audio to: {}", audio_path.display());
        self.fetcher.fetch_audio(url, &audio_path).await?;

        let size = match fs_err::metadata(&audio_path) {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => return Err(TranscribeError::EmptyAudio),
        };
        tracing::info!("Audio extracted: {} KB", size / 1024);

        tracing::info!("Running speech model '{}'", self.model.name());
        let text = self.model.transcribe_file(&audio_path).await?;

        work_dir.close()?;
        Ok((text, size))
    }
}

#[async_trait]
impl TranscriptionProvider for AudioTranscriber {
    async fn transcribe(&self, url: &str) -> TranscriptionResult {
        let started = Instant::now();

        match self.run(url).await {
            Ok((text, size)) => TranscriptionResult::success(text, started.elapsed(), size),
            Err(e) => {
                tracing::warn!("Transcription failed: {}", e);
                TranscriptionResult::failure(&e, started.elapsed())
            }
        }
    }
}
