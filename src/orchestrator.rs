//! # Registration run orchestration
//!
//! [`RunOrchestrator`] drives one tuning session against the external
//! executables declared in a [`TunerConfig`]:
//!
//! 1. **prepare** – optionally subsample the input tube tree once, into a
//!    temporary file owned by the orchestrator,
//! 2. **run** – write the configuration to a per-run temporary file, invoke the
//!    analysis executable on it, remove that file, then load the progression the
//!    analysis wrote,
//! 3. **teardown** – remove every temporary file still owned (also done on drop).
//!
//! ## Resource model
//! -----------------
//! * Each temporary file is a [`ScratchFile`] and is removed on every exit path,
//!   including when the external tool fails.
//! * `prepare` and `run` take `&mut self`, so runs of one orchestrator cannot
//!   overlap. Each call blocks until the external process exits; there is no
//!   timeout, cancellation or retry.
//! * A failed run returns an error and nothing else: traces loaded by earlier
//!   runs live in the callers' [`TraceHandle`]s and are left untouched.
use std::{
    fs::File,
    io::{BufWriter, Write},
};

use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};

use crate::{
    config::TunerConfig,
    constants::{RUN_CONFIG_SUFFIX, SUBSAMPLED_TUBES_SUFFIX},
    process::{analysis_command, subsample_command},
    scratch::ScratchFile,
    trace::{Trace, TraceHandle},
    tuner_errors::TunerError,
};

#[derive(Debug)]
pub struct RunOrchestrator {
    config: TunerConfig,
    subsampled_tubes: Option<ScratchFile>,
    prepared_tubes: Option<Utf8PathBuf>,
}

impl RunOrchestrator {
    /// Create an orchestrator for `config`.
    ///
    /// A `TubePointWeightsFile` left by a previous session is removed so that
    /// stale weights are never displayed against a new run.
    pub fn new(config: TunerConfig) -> Result<Self, TunerError> {
        if let Some(weights) = config.tube_point_weights_file() {
            if weights.exists() {
                info!("Removing previous tube point weights {weights}");
                std::fs::remove_file(weights)?;
            }
        }
        Ok(RunOrchestrator {
            config,
            subsampled_tubes: None,
            prepared_tubes: None,
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// Tube tree used for registration and display, once [`prepare`](Self::prepare)d.
    pub fn subsampled_tubes(&self) -> Option<&Utf8Path> {
        self.prepared_tubes.as_deref()
    }

    /// Make the input tubes ready for registration.
    ///
    /// With `SubSampleTubeTree.Sampling` configured, the subsampling executable is
    /// run once as `--samplingFactor <factor> <input_tubes> <tmp>`; later calls
    /// return the cached result. Without it, the configured input tubes are
    /// passed through unchanged.
    ///
    /// Return
    /// ----------
    /// * Path of the tubes to register.
    /// * [`TunerError::ExternalTool`] if the subsampling executable is missing or
    ///   fails; its temporary output is removed before returning.
    /// * [`TunerError::Config`] if a required key is absent.
    pub fn prepare(&mut self) -> Result<&Utf8Path, TunerError> {
        let prepared = match self.prepared_tubes.take() {
            Some(prepared) => prepared,
            None => {
                let prepared = self.subsample_tubes()?;
                info!("Registering tubes from {prepared}");
                prepared
            }
        };
        Ok(self.prepared_tubes.insert(prepared).as_path())
    }

    fn subsample_tubes(&mut self) -> Result<Utf8PathBuf, TunerError> {
        let input_tubes = self.config.input_tubes()?;
        let Some(sampling) = self.config.sampling() else {
            return Ok(input_tubes.to_owned());
        };
        let executable = self.config.subsample_executable()?;
        let scratch = ScratchFile::create(SUBSAMPLED_TUBES_SUFFIX)?;
        subsample_command(executable, sampling, input_tubes, scratch.path()).run()?;
        let path = scratch.path().to_owned();
        self.subsampled_tubes = Some(scratch);
        Ok(path)
    }

    fn write_run_config(&self) -> Result<ScratchFile, TunerError> {
        let scratch = ScratchFile::create(RUN_CONFIG_SUFFIX)?;
        let mut writer = BufWriter::new(File::create(scratch.path())?);
        self.config.write_json(&mut writer)?;
        writer.flush()?;
        Ok(scratch)
    }

    /// Run the analysis executable and load the progression it produced.
    ///
    /// The command line is
    /// `--parameterstore <tmp config> <input_volume> <tubes> <output_transform>`,
    /// where `<tubes>` is the result of [`prepare`](Self::prepare).
    ///
    /// Return
    /// ----------
    /// * A [`TraceHandle`] over the progression file declared in the configuration.
    /// * [`TunerError::ExternalTool`] if the analysis cannot be launched or exits
    ///   with a non-zero status.
    /// * [`TunerError::TraceFormat`] / [`TunerError::TraceEmpty`] if the
    ///   progression cannot be loaded.
    pub fn run(&mut self) -> Result<TraceHandle, TunerError> {
        let tubes = self.prepare()?.to_owned();
        let config = &self.config;
        let progression = config.progression_file()?;

        let mut run_config = self.write_run_config()?;
        let command = analysis_command(
            config.analysis_executable()?,
            run_config.path(),
            config.input_volume()?,
            &tubes,
            config.output_transform()?,
        );
        let outcome = command.run();
        let released = run_config.release();
        outcome?;
        released?;

        let trace = Trace::load(progression)?;
        Ok(TraceHandle::new(trace))
    }

    /// Remove every temporary file still owned. Safe to call more than once.
    pub fn teardown(&mut self) -> Result<(), TunerError> {
        self.prepared_tubes = None;
        match self.subsampled_tubes.take() {
            Some(mut scratch) => scratch.release(),
            None => Ok(()),
        }
    }
}

impl Drop for RunOrchestrator {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!("Failed to remove temporary files: {e}");
        }
    }
}
