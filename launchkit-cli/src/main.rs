//! launchkit: self-updating application launcher.
//!
//! # Usage
//!
//! ```text
//! launchkit <package> [--app <name>] [--approot <dir>] [--gui Always|FirstLaunch|Never]
//!           [--cmd <relative launch command>] [--interval <minutes>] [--clean]
//!           [--workingdir <dir>] [--args "<arguments>"]
//!           [--feedurl <url|dir>] [--feeduser <user>] [--feedpassword <secret>]
//!           [--nuget <feed config file>] [--exportpath <dir>] [--print-state]
//! ```
//!
//! Single-dash spellings (`-package Contoso.Viewer`) are accepted as well.

mod commands;
mod console;

use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use commands::launch::LaunchArgs;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "launchkit",
    version,
    about = "Keep an application up to date from a package feed and launch it",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    launch: LaunchArgs,
}

/// Rewrite `-key` to `--key` so settings can be passed the way the
/// settings file names them. The value of `args` is passed through as is.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut normalized = Vec::new();
    let mut verbatim_next = false;
    for (index, arg) in args.into_iter().enumerate() {
        let Some(text) = arg.to_str() else {
            normalized.push(arg);
            continue;
        };
        if index == 0 || std::mem::take(&mut verbatim_next) {
            normalized.push(arg);
            continue;
        }

        let single_dash_word = text.len() > 2
            && text.starts_with('-')
            && !text.starts_with("--")
            && text[1..].starts_with(|c: char| c.is_ascii_alphabetic());
        let flag = if single_dash_word {
            format!("-{text}")
        } else {
            text.to_string()
        };
        verbatim_next = flag == "--args";
        normalized.push(OsString::from(flag));
    }
    normalized
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    cli.launch.run()
}
