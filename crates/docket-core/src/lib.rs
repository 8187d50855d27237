pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod identity;
pub mod render;
pub mod session;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::info;

#[tracing::instrument(skip_all)]
pub async fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting docket CLI");

    let mut cfg = config::Config::load(cli.config.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .into_iter()
            .map(|kv| (kv.key, kv.value)),
    );
    if let Some(url) = cli.service {
        cfg.apply_overrides([("service.url".to_string(), url)]);
    }

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;
    let session_file = identity::SessionFile::open(&data_dir)
        .with_context(|| format!("failed to open session file in {}", data_dir.display()))?;

    let store = store::HttpRecordStore::new(&cfg.service_url(), cfg.service_timeout()?)
        .context("failed to configure the record store client")?;
    let mut session = session::Session::new(store);

    let mut renderer = render::Renderer::new(&cfg)?;
    let inv = cli::Invocation::parse(&cfg, cli.rest)?;

    commands::dispatch(&mut session, &session_file, &cfg, &mut renderer, inv).await?;

    info!("done");
    Ok(())
}
