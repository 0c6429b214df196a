pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod form;
pub mod gate;
pub mod identity;
pub mod lists;
pub mod model;
pub mod render;
pub mod session;
pub mod state;
pub mod store;
pub mod tasks;
pub mod view;
pub mod workspace;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

use crate::identity::{
  IdentityError,
  LocalIdentity
};
use crate::session::SessionFile;
use crate::store::FileStore;

pub const STORE_FILE: &str =
  "store.json";
pub const ACCOUNTS_FILE: &str =
  "accounts.json";

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
    "starting shelf CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
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

  let store = FileStore::open(
    &data_dir.join(STORE_FILE)
  )
  .with_context(|| {
    format!(
      "failed to open task store in \
       {}",
      data_dir.display()
    )
  })?;
  let accounts = FileStore::open(
    &data_dir.join(ACCOUNTS_FILE)
  )
  .with_context(|| {
    format!(
      "failed to open accounts in {}",
      data_dir.display()
    )
  })?;

  let session_path =
    SessionFile::path(&data_dir);
  let mut session =
    SessionFile::load(&session_path)?;

  let mut gate = gate::AuthGate::new(
    LocalIdentity::new(accounts)
  );
  if let Some(user) =
    session.user.clone()
  {
    match gate
      .identity_mut()
      .resume(user)
    {
      | Ok(user) => {
        debug!(uid = %user.uid, "resumed session")
      }
      | Err(IdentityError::SessionExpired) => {
        warn!("stored session expired; signing out");
        session = SessionFile::default();
      }
      | Err(err) => return Err(err.into())
    }
  }

  let workspace =
    workspace::Workspace::new(
      store,
      cfg.default_view()
    );
  let renderer =
    render::Renderer::new(&cfg)?;
  let mut app = commands::App::new(
    gate,
    workspace,
    renderer,
    cfg.timezone()
  );
  if let Some(selection) =
    session.selection.take()
  {
    app.restore_selection(selection);
  }

  let result = app.execute(
    cli.command,
    &mut io::stdout().lock(),
    Utc::now()
  );

  let signed_in =
    app.gate.current_user().cloned();
  session = SessionFile {
    selection: signed_in.as_ref().map(
      |_| {
        app
          .workspace
          .state()
          .selection
          .clone()
      }
    ),
    user: signed_in
  };
  session
    .save(&session_path)
    .context(
      "failed to save session"
    )?;

  result?;
  info!("done");
  Ok(())
}
