//! # Tuner configuration
//!
//! Typed view over the JSON **parameter store** shared by the tuner and the
//! registration executable. The same document is read once at startup and later
//! serialized verbatim (unknown keys included) into the per-run configuration file
//! handed to the analysis executable with `--parameterstore`.
//!
//! ## Layout
//! -----------------
//! ```text
//! {
//!   "ParameterGroups": [
//!     { "Parameters": [ {"Value": <input volume>}, {"Value": <input tubes>},
//!                       {"Value": <output transform>}, {"Value": <progression file>} ] },
//!     { "Parameters": [ {"Value": <smoothing sigma>}, ... ] }
//!   ],
//!   "Executables": { "Analysis": <path>, "SubSampleTubes": <path> },
//!   "SubSampleTubeTree": { "Sampling": <factor> },          (optional)
//!   "TubePointWeightsFile": <path>,                          (optional)
//!   "UltrasoundProbeGeometryFile": <path>,                   (optional)
//!   "Visualization": { ... }                                 (optional, opaque)
//! }
//! ```
//!
//! ## Immutability
//! -----------------
//! A [`TunerConfig`] exposes no mutating method. Tuning a value goes through
//! [`TunerConfig::with_parameter`], which returns a **new** configuration; a new
//! orchestrator must then be built for the next run.
use std::io::{Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::tuner_errors::TunerError;

/// Position of the I/O group in `ParameterGroups`
const IO_GROUP: usize = 0;

/// Position of the algorithm tuning group in `ParameterGroups`
const TUNING_GROUP: usize = 1;

const INPUT_VOLUME: usize = 0;
const INPUT_TUBES: usize = 1;
const OUTPUT_TRANSFORM: usize = 2;
const PROGRESSION_FILE: usize = 3;

const SMOOTHING_SIGMA: usize = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "Value")]
    pub value: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    #[serde(rename = "Parameters")]
    pub parameters: Vec<Parameter>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Executables {
    #[serde(rename = "Analysis", skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Utf8PathBuf>,

    #[serde(rename = "SubSampleTubes", skip_serializing_if = "Option::is_none")]
    pub subsample_tubes: Option<Utf8PathBuf>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pre-processing request: subsample the input tube tree by `Sampling`.
///
/// The factor is kept as a raw JSON number so that it is passed to the
/// subsampling executable exactly as written in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSampleTubeTree {
    #[serde(rename = "Sampling")]
    pub sampling: Number,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full tuner configuration.
///
/// See the [module documentation](crate::config) for the JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TunerConfig {
    parameter_groups: Vec<ParameterGroup>,

    #[serde(default)]
    executables: Executables,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub_sample_tube_tree: Option<SubSampleTubeTree>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tube_point_weights_file: Option<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    ultrasound_probe_geometry_file: Option<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    visualization: Option<Value>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TunerConfig {
    /// Read a configuration from a JSON file.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: location of the JSON parameter store.
    ///
    /// Return
    /// ----------
    /// * The parsed configuration, or [`TunerError::Config`] if the file cannot be
    ///   opened or does not follow the expected layout.
    pub fn from_path(path: &Utf8Path) -> Result<Self, TunerError> {
        let file = std::fs::File::open(path)
            .map_err(|e| TunerError::Config(format!("cannot open {path}: {e}")))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| TunerError::Config(format!("{path}: {e}")))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TunerError> {
        let config: TunerConfig = serde_json::from_reader(reader)
            .map_err(|e| TunerError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, TunerError> {
        serde_json::from_str(json).map_err(|e| TunerError::Config(e.to_string()))
    }

    /// Serialize the full configuration (unknown keys included) as JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), TunerError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    fn parameter(&self, group: usize, index: usize) -> Result<&Value, TunerError> {
        self.parameter_groups
            .get(group)
            .and_then(|g| g.parameters.get(index))
            .map(|p| &p.value)
            .ok_or_else(|| {
                TunerError::Config(format!(
                    "missing ParameterGroups[{group}].Parameters[{index}].Value"
                ))
            })
    }

    fn path_parameter(&self, index: usize, what: &str) -> Result<&Utf8Path, TunerError> {
        match self.parameter(IO_GROUP, index)? {
            Value::String(s) => Ok(Utf8Path::new(s)),
            other => Err(TunerError::Config(format!(
                "{what} (ParameterGroups[{IO_GROUP}].Parameters[{index}]) must be a path, got {other}"
            ))),
        }
    }

    pub fn input_volume(&self) -> Result<&Utf8Path, TunerError> {
        self.path_parameter(INPUT_VOLUME, "input volume")
    }

    pub fn input_tubes(&self) -> Result<&Utf8Path, TunerError> {
        self.path_parameter(INPUT_TUBES, "input tubes")
    }

    pub fn output_transform(&self) -> Result<&Utf8Path, TunerError> {
        self.path_parameter(OUTPUT_TRANSFORM, "output transform")
    }

    pub fn progression_file(&self) -> Result<&Utf8Path, TunerError> {
        self.path_parameter(PROGRESSION_FILE, "progression file")
    }

    /// Gaussian smoothing applied to the fixed image by the analysis.
    pub fn smoothing_sigma(&self) -> Result<f64, TunerError> {
        self.parameter(TUNING_GROUP, SMOOTHING_SIGMA)?
            .as_f64()
            .ok_or_else(|| TunerError::Config("smoothing sigma must be a number".into()))
    }

    pub fn analysis_executable(&self) -> Result<&Utf8Path, TunerError> {
        self.executables
            .analysis
            .as_deref()
            .ok_or_else(|| TunerError::Config("missing Executables.Analysis".into()))
    }

    pub fn subsample_executable(&self) -> Result<&Utf8Path, TunerError> {
        self.executables
            .subsample_tubes
            .as_deref()
            .ok_or_else(|| TunerError::Config("missing Executables.SubSampleTubes".into()))
    }

    /// Subsampling factor, if the input tube tree must be subsampled first.
    pub fn sampling(&self) -> Option<&Number> {
        self.sub_sample_tube_tree.as_ref().map(|s| &s.sampling)
    }

    pub fn tube_point_weights_file(&self) -> Option<&Utf8Path> {
        self.tube_point_weights_file.as_deref()
    }

    pub fn ultrasound_probe_geometry_file(&self) -> Option<&Utf8Path> {
        self.ultrasound_probe_geometry_file.as_deref()
    }

    pub fn visualization(&self) -> Option<&Value> {
        self.visualization.as_ref()
    }

    pub fn parameter_groups(&self) -> &[ParameterGroup] {
        &self.parameter_groups
    }

    /// Return a copy of this configuration with one parameter value replaced.
    ///
    /// Arguments
    /// -----------------
    /// * `group`: index in `ParameterGroups`.
    /// * `index`: index in the group's `Parameters`.
    /// * `value`: new JSON value.
    ///
    /// Return
    /// ----------
    /// * A new [`TunerConfig`]; `self` is left untouched.
    /// * [`TunerError::Config`] if the slot does not exist.
    pub fn with_parameter(
        &self,
        group: usize,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<TunerConfig, TunerError> {
        let mut tuned = self.clone();
        let slot = tuned
            .parameter_groups
            .get_mut(group)
            .and_then(|g| g.parameters.get_mut(index))
            .ok_or_else(|| {
                TunerError::Config(format!(
                    "no parameter ParameterGroups[{group}].Parameters[{index}]"
                ))
            })?;
        slot.value = value.into();
        Ok(tuned)
    }
}
