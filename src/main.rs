use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bili_scribe::{
    AudioTranscriber, BiliApiClient, Cli, Config, HttpRedirectFollower, Pipeline, Resolver, ScribeError,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so they stay out of the interactive prompts
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bili_scribe=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let _cli = Cli::parse();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Run-ending failures were already explained to the user
            if e.downcast_ref::<ScribeError>().is_none() {
                eprintln!("Error: {:#}", e);
            }
            tracing::debug!("Run ended with failure: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::load()?;

    let resolver = Resolver::new(Box::new(HttpRedirectFollower::new(config.short_link_timeout())?));
    let api = BiliApiClient::new(&config.api)?;
    let transcriber = AudioTranscriber::from_config(&config);
    let pipeline = Pipeline::new(&config, resolver, Box::new(api), Box::new(transcriber));

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();

    let outcome = pipeline.run(&mut input, &mut out).await?;
    tracing::info!(
        "Finished {} (saved: {})",
        outcome.report.bvid,
        outcome.saved_to.is_some()
    );

    Ok(())
}
