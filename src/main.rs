use anyhow::Context;
use clap::{CommandFactory, Parser};
use std::io;
use std::process::ExitCode;
use tinypng_shrink::cli::Args;
use tinypng_shrink::logger::{set_quiet_mode, set_verbose_mode};
use tinypng_shrink::{
    collect_candidates, prompt_for_key, run_batch, CredentialStore, DispatchOptions,
    ServiceConfig, TinyPngClient,
};

fn main() -> ExitCode {
    let args = Args::parse();
    set_quiet_mode(args.quiet);
    set_verbose_mode(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tinypng_shrink::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let candidates = collect_candidates(args.input_files());
    if candidates.is_empty() {
        tinypng_shrink::error!("No PNG files to shrink");
        eprintln!("{}", Args::command().render_usage());
        return Ok(ExitCode::FAILURE);
    }

    let config = ServiceConfig::from_env().context("Invalid service configuration")?;

    let store = CredentialStore::default_location()?;
    let credential = store
        .resolve(args.key, prompt_for_key)
        .context("Cannot resolve the TinyPNG API key")?;
    tinypng_shrink::verbose!("API key source: {:?}", credential.source());
    tinypng_shrink::verbose!("Endpoint: {}", config.shrink_url());

    let client = TinyPngClient::new(config, credential)?;
    let options = DispatchOptions {
        download_dir: args.download,
        force_print: args.print,
    };

    let mut out = io::stdout().lock();
    run_batch(&client, &candidates, &options, &mut out).context("Aborting")?;

    Ok(ExitCode::SUCCESS)
}
