pub mod cli;
pub mod config;
pub mod datetime;
pub mod form;
pub mod render;
pub mod session;
pub mod store;
pub mod task;
pub mod validate;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::info;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);
    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting deck session"
    );

    let mut cfg = config::Config::load(cli.deckrc.as_deref()).context("failed to load config")?;
    cfg.apply_overrides(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value)));

    let mut renderer = render::Renderer::new(&cfg)?;
    let mut session = session::Session::new(&cfg);
    session.run(&mut renderer)?;

    info!("done");
    Ok(())
}
