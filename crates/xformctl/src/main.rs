use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_check;
mod cmd_controls;
mod cmd_fields;
mod cmd_text;
mod common;

#[derive(Parser, Debug)]
#[command(name = "xformctl", version, about = "XForm definition inspector")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Output JSON where applicable
    #[arg(long, global = true)]
    json: bool,
    /// Language used to resolve translated labels
    #[arg(long, global = true)]
    lang: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List instance fields with their bind properties
    Fields { file: PathBuf },
    /// Print the presentation control tree
    Controls { file: PathBuf },
    /// Look up one translated text entry
    Text {
        file: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "long")]
        form: String,
    },
    /// Load a form and report diagnostics
    Check { file: PathBuf },
}

fn main() -> Result<()> {
    let Cli {
        verbose,
        json,
        lang,
        cmd,
    } = Cli::parse();

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cmd {
        Cmd::Fields { file } => cmd_fields::run(&file, json)?,
        Cmd::Controls { file } => cmd_controls::run(&file, lang.as_deref(), json)?,
        Cmd::Text { file, id, form } => cmd_text::run(&file, &id, &form, lang.as_deref(), json)?,
        Cmd::Check { file } => cmd_check::run(&file, json)?,
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_defaults() {
        let cli = Cli::parse_from(["xformctl", "text", "form.xml", "--id", "/data/name:label"]);
        match cli.cmd {
            Cmd::Text { file, id, form } => {
                assert_eq!(file, PathBuf::from("form.xml"));
                assert_eq!(id, "/data/name:label");
                assert_eq!(form, "long");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert_eq!(cli.lang, None);
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "xformctl",
            "-vv",
            "controls",
            "survey.xml",
            "--lang",
            "Français",
            "--json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert_eq!(cli.lang.as_deref(), Some("Français"));
        assert!(matches!(cli.cmd, Cmd::Controls { .. }));
    }

    #[test]
    fn parse_requires_file() {
        assert!(Cli::try_parse_from(["xformctl", "check"]).is_err());
        let cli = Cli::parse_from(["xformctl", "check", "survey.xml"]);
        match cli.cmd {
            Cmd::Check { file } => assert_eq!(file, PathBuf::from("survey.xml")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
