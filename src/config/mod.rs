use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Platform API settings
    pub api: ApiConfig,

    /// Identifier resolution settings
    pub resolver: ResolverConfig,

    /// Audio downloader settings
    pub downloader: DownloaderConfig,

    /// Speech model settings
    pub transcription: TranscriptionConfig,

    /// Console and file report settings
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the platform API
    pub base_url: String,

    /// Browser-like user agent; the API rejects requests without one
    pub user_agent: String,

    /// Referer header matching the site origin
    pub referer: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Number of hot comments to keep
    pub max_comments: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Timeout for the single short-link redirect request
    pub short_link_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Downloader command looked up on PATH
    pub command: String,

    /// Lossless container for the extracted audio
    pub audio_format: String,

    /// Parent directory for scoped work directories (system temp if unset)
    pub work_dir: Option<PathBuf>,

    /// Where to look for a standalone binary when `command` is not runnable
    pub local_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Speech model command
    pub command: String,

    /// Model variant
    pub model: String,

    /// Language hint (auto-detect if not set)
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Maximum transcript characters shown on the console
    pub preview_chars: usize,

    /// Directory for saved reports (current directory if unset)
    pub output_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bilibili.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            referer: "https://www.bilibili.com/".to_string(),
            timeout_secs: 15,
            max_comments: 20,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            short_link_timeout_secs: 10,
        }
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            command: "yt-dlp".to_string(),
            audio_format: "wav".to_string(),
            work_dir: None,
            local_dir: PathBuf::from("."),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            command: "whisper".to_string(),
            model: "small".to_string(),
            language: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            preview_chars: 5000,
            output_dir: None,
        }
    }
}

/// Containers yt-dlp can convert to without lossy re-encoding
pub const LOSSLESS_AUDIO_FORMATS: &[&str] = &["wav", "flac", "alac"];

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate a YAML config file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Existing config file, if any
    fn config_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("bili-scribe").join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }
        url::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url is not a valid URL: {}", self.api.base_url))?;

        if self.api.timeout_secs == 0 || self.resolver.short_link_timeout_secs == 0 {
            anyhow::bail!("Timeouts must be at least one second");
        }

        if self.api.max_comments == 0 {
            anyhow::bail!("api.max_comments must be at least 1");
        }

        if self.report.preview_chars == 0 {
            anyhow::bail!("report.preview_chars must be at least 1");
        }

        if !LOSSLESS_AUDIO_FORMATS.contains(&self.downloader.audio_format.as_str()) {
            anyhow::bail!(
                "downloader.audio_format must be one of {}, got '{}'",
                LOSSLESS_AUDIO_FORMATS.join(", "),
                self.downloader.audio_format
            );
        }

        if self.downloader.command.trim().is_empty() || self.transcription.command.trim().is_empty() {
            anyhow::bail!("Downloader and transcription commands must be configured");
        }

        Ok(())
    }

    pub fn short_link_timeout(&self) -> Duration {
        Duration::from_secs(self.resolver.short_link_timeout_secs)
    }
}
