use anyhow::Result;
use clap::Parser;
use std::io::{BufRead, Write};

#[derive(Parser)]
#[command(
    name = "biliscribe",
    about = "Bilibili video info extractor - title, description, hot comments and a speech transcript",
    version,
    long_about = "Interactive tool: paste a Bilibili video link (full URL, BV identifier or b23.tv short link) \
and it prints the title, description and hot comments, then downloads the audio with yt-dlp and \
transcribes it with a local Whisper model. Settings are read from config.yaml."
)]
pub struct Cli {}

/// Print `message` and read one trimmed line. End of input yields an empty string.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, message: &str) -> Result<String> {
    write!(out, "{}", message)?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Yes/no question; only `y` or `yes` (any case) count as yes
pub fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, message: &str) -> Result<bool> {
    let answer = prompt(input, out, message)?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}
