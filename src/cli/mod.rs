use anyhow::{Context, bail};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing_subscriber::EnvFilter;

use crate::build::BuildOutcome;
use crate::build::toolchain::tool_path;
use crate::compile::{BuildOptions, Session};
use crate::config::{Settings, settings_path};
use crate::frontend::module::SOURCE_EXTENSION;

pub const LOG_ENV: &str = "JSC_LOG";

#[derive(Parser, Debug)]
#[command(name = "jsc")]
#[command(version = crate::VERSION)]
#[command(about = "Build a JSC script into a runnable jar and run it", long_about = None)]
struct Cli {
    /// Entry `.jsc` file
    #[arg(value_name = "FILE", required_unless_present_any = ["show_settings", "reset_settings"])]
    input: Option<PathBuf>,

    /// Arguments passed through to the program
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Build the archive but do not run it
    #[arg(long)]
    no_run: bool,

    /// Leave the staging directory in place
    #[arg(long)]
    keep_staging: bool,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    settings_file: Option<PathBuf>,

    /// Print the settings file location and contents
    #[arg(long)]
    show_settings: bool,

    /// Restore default settings
    #[arg(long)]
    reset_settings: bool,

    /// Do not ask before resetting settings
    #[arg(short, long)]
    yes: bool,

    /// Debug logging (overridden by JSC_LOG)
    #[arg(short, long)]
    verbose: bool,
}

pub fn run_cli<I>(args: I) -> i32
where
    I: IntoIterator<Item = String>,
{
    let argv = std::iter::once("jsc".to_string()).chain(args);
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };
    init_logging(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            1
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let path = settings_path(cli.settings_file.as_deref())?;
    if cli.reset_settings {
        if cli.yes || confirm("Reset all settings to defaults? (y/n): ")? {
            Settings::default().save(&path)?;
            println!("settings reset: {}", path.display());
        }
        return Ok(0);
    }

    let settings = Settings::load_or_init(&path)?;
    if cli.show_settings {
        println!("{}", path.display());
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(0);
    }

    let Some(input) = cli.input else {
        bail!("missing input file");
    };
    if input.extension().and_then(|s| s.to_str()) != Some(SOURCE_EXTENSION) {
        bail!("expected .{} source file: {}", SOURCE_EXTENSION, input.display());
    }

    let session = Session::new(settings)?;
    let toolchain = session.toolchain();
    let options = BuildOptions {
        keep_staging: cli.keep_staging,
    };
    let outcome = session.build_file(&input, &toolchain, &options)?;
    let runnable = outcome.is_runnable();
    match outcome {
        BuildOutcome::Failed { diagnostics } => {
            eprintln!("errors in {}:", input.display());
            eprintln!("{}", diagnostics);
            Ok(1)
        }
        BuildOutcome::Packaged {
            archive,
            compiler_errors,
            archiver_errors,
            ..
        } if !runnable => {
            eprintln!("errors while packaging {}:", archive.display());
            for line in compiler_errors.iter().chain(&archiver_errors) {
                eprintln!("{}", line);
            }
            Ok(1)
        }
        BuildOutcome::Packaged { archive, .. } if cli.no_run => {
            println!("{}", archive.display());
            Ok(0)
        }
        BuildOutcome::Packaged { archive, .. } => {
            let java = tool_path(&session.toolchain_root().join("bin"), "java");
            run_archive(&java, &archive, &cli.args)
        }
    }
}

/// Runs the packaged program with inherited stdio and returns its exit code.
fn run_archive(java: &Path, archive: &Path, args: &[String]) -> anyhow::Result<i32> {
    let status = Command::new(java)
        .arg("-jar")
        .arg(archive)
        .args(args)
        .status()
        .with_context(|| format!("failed to execute {}", java.display()))?;
    Ok(status.code().unwrap_or(1))
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::{Cli, run_cli};
    use crate::config::Settings;
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time drift")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("jsc-{}-{}-{}", prefix, std::process::id(), nonce));
        fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn program_arguments_follow_the_file() {
        let cli = Cli::try_parse_from(["jsc", "--no-run", "main.jsc", "a", "--flag", "-x"]).expect("parse");
        assert_eq!(cli.input, Some(PathBuf::from("main.jsc")));
        assert_eq!(cli.args, vec!["a", "--flag", "-x"]);
        assert!(cli.no_run);
    }

    #[test]
    fn file_is_required_unless_managing_settings() {
        assert!(Cli::try_parse_from(["jsc"]).is_err());
        assert!(Cli::try_parse_from(["jsc", "--show-settings"]).is_ok());
    }

    #[test]
    fn show_and_reset_settings() {
        let dir = temp_dir("cli-settings");
        let path = dir.join("settings.json");
        let path_arg = path.to_string_lossy().into_owned();

        assert_eq!(run_cli(args(&["--settings-file", &path_arg, "--show-settings"])), 0);
        assert_eq!(Settings::load_or_init(&path).expect("load"), Settings::default());

        let custom = Settings {
            archive_name: "custom.jar".into(),
            ..Settings::default()
        };
        custom.save(&path).expect("save");
        assert_eq!(run_cli(args(&["--settings-file", &path_arg, "--reset-settings", "--yes"])), 0);
        assert_eq!(Settings::load_or_init(&path).expect("reload"), Settings::default());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn rejects_non_jsc_input() {
        let dir = temp_dir("cli-ext");
        let path = dir.join("settings.json").to_string_lossy().into_owned();
        assert_eq!(run_cli(args(&["--settings-file", &path, "main.txt"])), 1);
        let _ = fs::remove_dir_all(dir);
    }
}
