// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result, TapCheckExitCode},
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
    reporter::{DiagnosticCounts, DiagnosticReporter, MessageFormat},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::time::Duration;
use tap_runner::{
    env::EnvironmentMap, mapper::DiagnosticMapper, program::TestProgramSpec, runner::LocalRunner,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run a test program that speaks TAP, and report failures.
///
/// The program's standard output is read as a TAP report. Failing tests,
/// tests marked TODO that pass, and anything the program writes to stderr are
/// reported as diagnostics.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style(), max_term_width = 100)]
pub struct TapCheckApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl TapCheckApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Run(opts) => opts.exec(output, output_writer),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a test program and print its diagnostics
    ///
    /// The program is taken from the arguments after `--`, or from the
    /// `program` key of a config file. Exits with 100 if any error
    /// diagnostics were produced.
    Run(RunOpts),
}

#[derive(Debug, Args)]
struct RunOpts {
    /// TOML file with `program` and `[environment]` keys
    #[arg(long, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Set an environment variable for the test program (may be repeated)
    ///
    /// Takes precedence over the config file and the inherited environment.
    #[arg(long = "env", short = 'e', value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    env: Vec<(String, String)>,

    /// Output format
    #[arg(
        long,
        value_enum,
        default_value_t,
        help_heading = "Output options",
        value_name = "FMT"
    )]
    message_format: MessageFormat,

    /// Exit with a failure code if warnings are produced
    #[arg(long, help_heading = "Output options")]
    deny_warnings: bool,

    /// Cancel the test program if it runs for longer than this
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Time a cancelled test program gets to exit before it is killed
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        default_value = "1s"
    )]
    grace_period: Duration,

    /// The test program and its arguments
    #[arg(last = true, value_name = "PROGRAM")]
    program: Vec<String>,
}

impl RunOpts {
    fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let spec = self.make_spec()?;
        debug!(program = ?spec.program(), "built test program spec");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|err| ExpectedError::RuntimeBuildError { err })?;

        let mapper = DiagnosticMapper::new(LocalRunner::new().with_grace_period(self.grace_period));
        let cancel = CancellationToken::new();
        let diagnostics = runtime.block_on(async {
            let trigger = tokio::spawn(cancel_on_interrupt(cancel.clone(), self.timeout));
            let diagnostics = mapper.evaluate(&spec, &cancel).await;
            trigger.abort();
            diagnostics
        });

        let counts = DiagnosticCounts::new(&diagnostics);
        let reporter = DiagnosticReporter::new(self.message_format, output.stdout_styles());
        reporter
            .write_diagnostics(&diagnostics, output_writer.stdout_writer())
            .map_err(|err| ExpectedError::WriteOutputError { err })?;
        reporter
            .write_summary(counts, output_writer.stderr_writer())
            .map_err(|err| ExpectedError::WriteOutputError { err })?;

        if counts.errors > 0 || (self.deny_warnings && counts.warnings > 0) {
            Ok(TapCheckExitCode::DIAGNOSTICS_FOUND)
        } else {
            Ok(TapCheckExitCode::OK)
        }
    }

    fn make_spec(&self) -> Result<TestProgramSpec> {
        let ConfigFile {
            program,
            mut environment,
        } = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        let program = if self.program.is_empty() {
            program.ok_or(ExpectedError::NoProgram)?
        } else {
            self.program.clone()
        };
        environment.extend(self.env.iter().cloned());

        Ok(TestProgramSpec::new(program, environment)?)
    }
}

/// The contents of a `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    program: Option<Vec<String>>,
    #[serde(default)]
    environment: EnvironmentMap,
}

impl ConfigFile {
    fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| ExpectedError::config_read_error(path, err))?;
        toml::from_str(&contents).map_err(|err| ExpectedError::config_parse_error(path, err))
    }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some(("", _)) => Err(format!("environment variable name is empty in `{s}`")),
        Some((key, value)) => Ok((key.to_owned(), value.to_owned())),
        None => Err(format!("expected KEY=VALUE, found `{s}`")),
    }
}

/// Cancels `cancel` on Ctrl-C, or once `timeout` has elapsed.
async fn cancel_on_interrupt(cancel: CancellationToken, timeout: Option<Duration>) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!("unable to listen for Ctrl-C: {error}");
            std::future::pending::<()>().await;
        }
    };
    let timeout_elapsed = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C, cancelling test program"),
        () = timeout_elapsed => {
            if let Some(timeout) = timeout {
                warn!(
                    "test program timed out after {}, cancelling",
                    humantime::format_duration(timeout),
                );
            }
        }
    }
    cancel.cancel();
}
