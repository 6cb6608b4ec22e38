//! # External tool invocation
//!
//! The registration itself is performed by opaque executables. This module builds
//! their command lines and runs them **synchronously**: the caller blocks until
//! the child exits. There is no timeout, no cancellation and no retry; a failed
//! invocation is reported once with the rendered command line.
//!
//! Command lines
//! -----------------
//! ```text
//! <SubSampleTubes> --samplingFactor <factor> <input_tubes> <output_tubes>
//! <Analysis> --parameterstore <config.json> <input_volume> <input_vessel> <output_transform>
//! ```
use std::{
    ffi::OsString,
    fmt,
    io::ErrorKind,
    process::{Command, ExitStatus},
};

use camino::Utf8Path;
use log::{debug, info};

use crate::tuner_errors::TunerError;

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        ExternalCommand {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Run the command, wait for it and check its exit status.
    ///
    /// Return
    /// ----------
    /// * `Ok(())` when the child exits with status 0.
    /// * [`TunerError::ExternalTool`] when the program cannot be spawned (missing,
    ///   not executable) or exits with a non-zero status / is killed by a signal.
    pub fn run(&self) -> Result<(), TunerError> {
        info!("Running {self}");
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|e| self.spawn_error(e))?;
        debug!("{} exited with {status}", self.program.to_string_lossy());
        self.check_status(status)
    }

    fn spawn_error(&self, err: std::io::Error) -> TunerError {
        let reason = match err.kind() {
            ErrorKind::NotFound => format!("executable not found ({err})"),
            ErrorKind::PermissionDenied => format!("executable not runnable ({err})"),
            _ => format!("unable to spawn ({err})"),
        };
        TunerError::ExternalTool {
            command: self.to_string(),
            reason,
        }
    }

    fn check_status(&self, status: ExitStatus) -> Result<(), TunerError> {
        if status.success() {
            return Ok(());
        }
        let reason = match status.code() {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by a signal".to_string(),
        };
        Err(TunerError::ExternalTool {
            command: self.to_string(),
            reason,
        })
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Build the subsampling command: `--samplingFactor <factor> <input> <output>`.
pub fn subsample_command(
    executable: &Utf8Path,
    sampling: &impl fmt::Display,
    input_tubes: &Utf8Path,
    output_tubes: &Utf8Path,
) -> ExternalCommand {
    ExternalCommand::new(executable.as_str())
        .arg("--samplingFactor")
        .arg(sampling.to_string())
        .arg(input_tubes.as_str())
        .arg(output_tubes.as_str())
}

/// Build the analysis command:
/// `--parameterstore <config> <volume> <vessel> <transform>`.
pub fn analysis_command(
    executable: &Utf8Path,
    config_path: &Utf8Path,
    input_volume: &Utf8Path,
    input_vessel: &Utf8Path,
    output_transform: &Utf8Path,
) -> ExternalCommand {
    ExternalCommand::new(executable.as_str())
        .arg("--parameterstore")
        .arg(config_path.as_str())
        .arg(input_volume.as_str())
        .arg(input_vessel.as_str())
        .arg(output_transform.as_str())
}
