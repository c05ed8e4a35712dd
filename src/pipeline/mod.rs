//! The interactive run: prompt, resolve, fetch, transcribe, report.
//!
//! Stages run strictly one after another. Metadata failure stops the run,
//! comment failure degrades to a placeholder, transcription failure is
//! reported as text in place of the transcript.

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::VideoApi;
use crate::cli;
use crate::config::Config;
use crate::report::{self, Report};
use crate::resolver::{Bvid, Resolver, VideoRef};
use crate::transcribe::TranscriptionProvider;
use crate::ScribeError;

/// What a completed run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub saved_to: Option<PathBuf>,
}

pub struct Pipeline {
    resolver: Resolver,
    api: Box<dyn VideoApi>,
    transcriber: Box<dyn TranscriptionProvider>,
    max_comments: usize,
    preview_chars: usize,
    output_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        resolver: Resolver,
        api: Box<dyn VideoApi>,
        transcriber: Box<dyn TranscriptionProvider>,
    ) -> Self {
        Self {
            resolver,
            api,
            transcriber,
            max_comments: config.api.max_comments,
            preview_chars: config.report.preview_chars,
            output_dir: config.report.output_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// One full interactive session over the given input and output
    pub async fn run<R: BufRead, W: Write>(&self, input: &mut R, out: &mut W) -> Result<RunOutcome> {
        writeln!(out, "{}", style("Bilibili video info extractor").bold())?;
        let url = cli::prompt(input, out, "Enter a Bilibili video link: ")?;

        let video = self.resolver.resolve_ref(&url).await;
        let Some(bvid) = video.bvid.clone() else {
            writeln!(out, "Could not extract a BV identifier from the link, please check its format")?;
            writeln!(out, "Original link: {}", url)?;
            return Err(ScribeError::UnresolvedUrl(url).into());
        };
        tracing::info!("Resolved {} from {}", bvid, url);

        writeln!(out, "\nFetching video info...")?;
        let spinner = start_spinner("Querying video info...");
        let metadata = self.api.fetch_metadata(&bvid).await;
        spinner.finish_and_clear();

        let metadata = match metadata {
            Ok(metadata) => metadata,
            Err(e) => {
                writeln!(out, "Failed to fetch video info: {}", e)?;
                writeln!(out, "Please check that the link is correct")?;
                return Err(ScribeError::Metadata(e).into());
            }
        };
        report::print_metadata(out, &metadata)?;

        writeln!(out, "\nFetching comments...")?;
        let spinner = start_spinner("Querying hot comments...");
        let comments = self.api.fetch_comments(&bvid, self.max_comments).await;
        spinner.finish_and_clear();
        report::print_comments(out, &comments)?;

        writeln!(out, "\nDownloading audio and running speech recognition...")?;
        writeln!(out, "(this can take several minutes, please wait)")?;
        let spinner = start_spinner("Transcribing audio...");
        let transcription = self.transcriber.transcribe(&download_url(&video, &bvid)).await;
        spinner.finish_and_clear();

        if let Some(bytes) = transcription.audio_bytes {
            writeln!(out, "Audio downloaded: {} KB", bytes / 1024)?;
        }
        if !transcription.succeeded {
            tracing::warn!("No transcript for {}, reporting the error instead", bvid);
            writeln!(out, "Transcription did not complete, the error is shown below")?;
        }
        writeln!(out, "\nDone (took {:.1}s)", transcription.elapsed.as_secs_f64())?;
        report::print_transcript(out, &transcription.text, self.preview_chars)?;

        let report = Report {
            bvid,
            metadata,
            comments,
            transcript: transcription.text,
        };

        let saved_to = if cli::confirm(input, out, "\nSave the full result to a file? (y/n): ")? {
            let path = report.save(&self.output_dir)?;
            writeln!(out, "Result saved to {}", path.display())?;
            Some(path)
        } else {
            None
        };

        Ok(RunOutcome { report, saved_to })
    }
}

/// The pasted link when it is a clean web URL, otherwise the canonical video page
pub fn download_url(video: &VideoRef, bvid: &Bvid) -> String {
    let raw = video.raw_url.trim();
    if raw.contains(char::is_whitespace) {
        // Share text around the link; the downloader would get the noise too
        return canonical_page(bvid);
    }

    match url::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url.to_string(),
        _ => canonical_page(bvid),
    }
}

fn canonical_page(bvid: &Bvid) -> String {
    format!("https://www.bilibili.com/video/{}", bvid)
}

fn start_spinner(message: &'static str) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}
