//! CLI argument parsing for isomnt.

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{ArgAction, ArgGroup, CommandFactory, Parser};
use isomnt_hal::MatchPolicy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "isomnt", version)]
#[command(about = "Mount and unmount .iso images through loop devices")]
#[command(group(ArgGroup::new("action").required(true).args(["mount", "unmount"])))]
pub struct Cli {
    /// Mount an .iso image (requires BOTH arguments)
    #[arg(short = 'm', num_args = 2, value_names = ["ISO", "TARGET"], action = ArgAction::Set)]
    pub mount: Option<Vec<PathBuf>>,

    /// Unmount an .iso image (requires only the TARGET argument)
    #[arg(short = 'u', value_name = "TARGET")]
    pub unmount: Option<PathBuf>,

    /// Match mountpoints exactly instead of by path prefix
    #[arg(long)]
    pub exact: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Mount { image: PathBuf, target: PathBuf },
    Unmount { target: PathBuf },
}

impl Cli {
    pub fn action(&self) -> Option<Action> {
        match (self.mount.as_deref(), &self.unmount) {
            (Some([image, target]), None) => Some(Action::Mount {
                image: image.clone(),
                target: target.clone(),
            }),
            (None, Some(target)) => Some(Action::Unmount {
                target: target.clone(),
            }),
            _ => None,
        }
    }

    pub fn match_policy(&self) -> MatchPolicy {
        if self.exact {
            MatchPolicy::Exact
        } else {
            MatchPolicy::Prefix
        }
    }
}

pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

/// One-line reason printed above the usage text, or `None` for `--help` and
/// `--version`, which are not failures.
pub fn usage_reason(err: &clap::Error) -> Option<&'static str> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => None,
        ErrorKind::MissingRequiredArgument
        | ErrorKind::WrongNumberOfValues
        | ErrorKind::TooFewValues
        | ErrorKind::InvalidValue => Some("Not enough arguments"),
        ErrorKind::TooManyValues => Some("Too many arguments"),
        ErrorKind::UnknownArgument => match err.get(ContextKind::InvalidArg) {
            Some(ContextValue::String(arg)) if !arg.starts_with('-') => {
                Some("Too many arguments")
            }
            _ => Some("Invalid option"),
        },
        _ => Some("Invalid option"),
    }
}
