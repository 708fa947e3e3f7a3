pub mod aggregate;
pub mod api;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datekey;
pub mod render;
pub mod session;
pub mod status;
pub mod views;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting shubhkarya CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;
  debug!(
    base_url = %cfg.api.base_url,
    timezone = %cfg.timezone(),
    "effective config"
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let sessions =
    session::SessionStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open session store \
         at {}",
        data_dir.display()
      )
    })?;

  let renderer =
    render::Renderer::new(&cfg);
  let ctx = commands::AppContext {
    cfg,
    sessions,
    renderer
  };

  commands::dispatch(
    &ctx,
    cli.command
  )?;

  info!("done");
  Ok(())
}
