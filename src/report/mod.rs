use anyhow::{Context, Result};
use console::style;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::api::{CommentSection, VideoMetadata};
use crate::resolver::Bvid;

/// Marker appended to a truncated console preview
pub const ELLIPSIS: &str = "...";

const RULE_WIDTH: usize = 50;

/// First `limit` characters of `text`, with an ellipsis marker if anything was cut
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Everything gathered for one video
#[derive(Debug, Clone)]
pub struct Report {
    pub bvid: Bvid,
    pub metadata: VideoMetadata,
    pub comments: CommentSection,
    pub transcript: String,
}

impl Report {
    /// `<identifier>_transcription.txt`
    pub fn file_name(&self) -> String {
        format!("{}_transcription.txt", self.bvid)
    }

    /// Plain-text file layout: title, description, comments, transcription
    pub fn render(&self) -> String {
        format!(
            "Title: {}\n\nDescription:\n{}\n\nTop comments:\n{}\n\nTranscription:\n{}",
            self.metadata.title, self.metadata.description, self.comments, self.transcript
        )
    }

    /// Write the untruncated report into `dir`, replacing any previous file
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        fs_err::write(&path, self.render()).context("Failed to write report file")?;
        tracing::info!("Report written to {}", path.display());
        Ok(path)
    }
}

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn print_metadata<W: Write>(out: &mut W, metadata: &VideoMetadata) -> Result<()> {
    writeln!(out, "\n{}", rule())?;
    writeln!(out, "{} {}", style("Title:").bold(), metadata.title)?;
    writeln!(out, "\n{}", style("Description:").bold())?;
    writeln!(out, "{}", metadata.description)?;
    writeln!(out, "{}", rule())?;
    Ok(())
}

pub fn print_comments<W: Write>(out: &mut W, comments: &CommentSection) -> Result<()> {
    writeln!(out, "\n{}", style("Top comments:").bold())?;
    writeln!(out, "{}", comments)?;
    writeln!(out, "{}", rule())?;
    Ok(())
}

pub fn print_transcript<W: Write>(out: &mut W, transcript: &str, limit: usize) -> Result<()> {
    writeln!(out, "\n{}", style("Transcription:").bold())?;
    writeln!(out, "{}", preview(transcript, limit))?;
    Ok(())
}
