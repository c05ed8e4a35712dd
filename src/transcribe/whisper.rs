use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::{SpeechModel, TranscribeError};
use crate::config::TranscriptionConfig;

const INSTALL_GUIDANCE: &str = "install it with `pip install openai-whisper`";

/// JSON written by the whisper CLI; only the full text is used
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
}

/// Local speech recognition through the `whisper` command
pub struct WhisperCli {
    command: String,
    model: String,
    language: Option<String>,
}

impl WhisperCli {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            command: config.command.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
        }
    }

    pub fn build_args(&self, audio: &Path, output_dir: &Path) -> Vec<String> {
        let mut args = vec![
            audio.to_string_lossy().into_owned(),
            "--model".to_string(),
            self.model.clone(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().into_owned(),
            "--verbose".to_string(),
            "False".to_string(),
        ];

        if let Some(language) = &self.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }

        args
    }
}

/// Read the `text` field of the JSON the CLI writes next to the audio
pub fn read_transcript(json_path: &Path) -> Result<String, TranscribeError> {
    let content = fs_err::read_to_string(json_path)
        .map_err(|e| TranscribeError::ModelFailed(format!("no transcript produced: {}", e)))?;

    let output: WhisperOutput = serde_json::from_str(&content)
        .map_err(|e| TranscribeError::ModelFailed(format!("unreadable transcript: {}", e)))?;

    Ok(output.text.trim().to_string())
}

#[async_trait]
impl SpeechModel for WhisperCli {
    async fn transcribe_file(&self, audio: &Path) -> Result<String, TranscribeError> {
        let output_dir = audio.parent().unwrap_or_else(|| Path::new("."));
        let args = self.build_args(audio, output_dir);
        tracing::debug!("Running {} {}", self.command, args.join(" "));

        let output = Command::new(&self.command)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => TranscribeError::ModelUnavailable(format!(
                    "`{}` not found, {}",
                    self.command, INSTALL_GUIDANCE
                )),
                _ => TranscribeError::Io(e),
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(TranscribeError::ModelFailed(error.trim().to_string()));
        }

        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        read_transcript(&output_dir.join(format!("{}.json", stem)))
    }

    fn name(&self) -> &str {
        &self.model
    }
}
