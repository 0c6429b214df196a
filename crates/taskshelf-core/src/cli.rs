use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "shelf",
    version,
    about = "Personal task lists with Today, Upcoming, Calendar and Sticky Wall views"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account
    Signup { email: String, password: String },
    /// Sign in and keep the session for later commands
    Signin { email: String, password: String },
    /// Sign out and forget the session
    Signout,
    /// Show the signed-in account
    Whoami,
    /// Show lists with their open task counts
    Lists,
    /// Create a list
    ListAdd { name: String },
    /// Rename a list
    ListRename { name: String, new_name: String },
    /// Delete a list and every task in it
    ListRm { name: String },
    /// Add a task
    Add {
        title: String,
        #[arg(short, long)]
        list: Option<String>,
        #[arg(short, long)]
        due: Option<String>,
        #[arg(long = "desc")]
        description: Option<String>,
        /// Core view tag: Today, Upcoming, Calendar or Sticky Wall
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Show a view or list; the choice is remembered
    Show {
        target: Option<String>,
        /// Treat the target as a list name even if it names a view
        #[arg(long)]
        list: bool,
        /// Open a task in the detail panel
        #[arg(long, conflicts_with = "close")]
        task: Option<String>,
        /// Close the detail panel
        #[arg(long)]
        close: bool,
    },
    /// Show one task
    Info { id: String },
    /// Advance a task's status: Pending, In Progress, Done, Pending
    Cycle { id: String },
    /// Change a task's title
    Rename { id: String, title: String },
    /// Edit task fields
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long = "desc")]
        description: Option<String>,
        #[arg(long, conflicts_with = "no_due")]
        due: Option<String>,
        #[arg(long)]
        no_due: bool,
        #[arg(long)]
        list: Option<String>,
    },
    /// Move a task to another list
    Move { id: String, list: String },
    /// Delete a task
    Rm { id: String },
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, GlobalCli};

    #[test]
    fn parses_globals_after_subcommand() {
        let cli = GlobalCli::parse_from([
            "shelf",
            "add",
            "Write report",
            "--list",
            "Work",
            "--due",
            "today",
            "-vv",
            "--rc",
            "color=off",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "color");
        assert_eq!(
            cli.command,
            Some(Command::Add {
                title: "Write report".to_string(),
                list: Some("Work".to_string()),
                due: Some("today".to_string()),
                description: None,
                tag: None,
            })
        );
    }

    #[test]
    fn due_and_no_due_conflict() {
        assert!(
            GlobalCli::try_parse_from(["shelf", "edit", "abc", "--due", "today", "--no-due"])
                .is_err()
        );
    }
}
