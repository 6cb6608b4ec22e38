//! # Progression file reader
//!
//! Decodes the optimization progression written by the analysis executable.
//! The document mirrors the two groups of the executable's progression store:
//!
//! ```text
//! {
//!   "FixedParameters": [cx, cy, cz],
//!   "OptimizationParameterProgression": [
//!     { "Iteration": 0, "Parameters": [rx, ry, rz, tx, ty, tz], "CostFunctionValue": 1.25 },
//!     ...
//!   ]
//! }
//! ```
//!
//! Every field is decoded as optional first so that a missing one is reported by
//! name instead of as a generic deserialization failure.
use std::{fs::File, io::BufReader};

use camino::Utf8Path;
use log::debug;
use nalgebra::Point3;
use serde::Deserialize;

use crate::{
    constants::{Iteration, FIXED_PARAMETER_COUNT, RIGID_PARAMETER_COUNT},
    transform::RigidParameters,
    tuner_errors::TunerError,
};

use super::{IterationRecord, Trace};

#[derive(Debug, Deserialize)]
struct ProgressionDocument {
    #[serde(rename = "FixedParameters")]
    fixed_parameters: Option<Vec<f64>>,

    #[serde(rename = "OptimizationParameterProgression")]
    progression: Option<Vec<RawRecord>>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Iteration")]
    iteration: Option<i64>,

    #[serde(rename = "Parameters")]
    parameters: Option<Vec<f64>>,

    #[serde(rename = "CostFunctionValue")]
    cost_function_value: Option<f64>,
}

/// Read and validate a progression file.
///
/// Errors
/// ----------
/// * [`TunerError::TraceFormat`] – unreadable file, invalid JSON, missing group or
///   field, wrong vector length, negative or decreasing `Iteration`,
///   non-positive `CostFunctionValue`.
/// * [`TunerError::TraceEmpty`] – the progression holds no record.
pub(crate) fn read_progression(path: &Utf8Path) -> Result<Trace, TunerError> {
    let file = File::open(path).map_err(|e| TunerError::trace_format(path, e))?;
    let document: ProgressionDocument = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| TunerError::trace_format(path, e))?;

    let raw_records = document
        .progression
        .ok_or_else(|| TunerError::trace_format(path, "missing OptimizationParameterProgression"))?;

    let fixed = document
        .fixed_parameters
        .ok_or_else(|| TunerError::trace_format(path, "missing FixedParameters"))?;
    let center = fixed_parameters(&fixed).map_err(|reason| TunerError::trace_format(path, reason))?;

    let records = raw_records
        .into_iter()
        .enumerate()
        .map(|(row, raw)| {
            record_from_raw(raw).map_err(|reason| {
                TunerError::trace_format(path, format!("record {row}: {reason}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Read {} progression records from {path}", records.len());

    Trace::from_records(records, center).map_err(|err| match err {
        TunerError::TraceEmpty(_) => TunerError::TraceEmpty(path.to_string()),
        TunerError::TraceFormat { reason, .. } => TunerError::trace_format(path, reason),
        other => other,
    })
}

fn fixed_parameters(values: &[f64]) -> Result<Point3<f64>, String> {
    if values.len() != FIXED_PARAMETER_COUNT {
        return Err(format!(
            "FixedParameters has {} values, expected {FIXED_PARAMETER_COUNT}",
            values.len()
        ));
    }
    Ok(Point3::new(values[0], values[1], values[2]))
}

fn record_from_raw(raw: RawRecord) -> Result<IterationRecord, String> {
    let iteration = raw.iteration.ok_or("missing Iteration")?;
    let iteration = Iteration::try_from(iteration)
        .map_err(|_| format!("Iteration {iteration} is not a valid iteration index"))?;

    let values = raw.parameters.ok_or("missing Parameters")?;
    let parameters = RigidParameters::from_slice(&values).ok_or_else(|| {
        format!(
            "Parameters has {} values, expected {RIGID_PARAMETER_COUNT}",
            values.len()
        )
    })?;

    let cost_function_value = raw.cost_function_value.ok_or("missing CostFunctionValue")?;

    Ok(IterationRecord {
        iteration,
        parameters,
        cost_function_value,
    })
}

#[cfg(test)]
mod progression_reader_test {
    use std::io::Write;

    use camino::Utf8PathBuf;

    use super::*;

    fn write_tmp(content: &str) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("progression.json")).unwrap();
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_valid() {
        let (_dir, path) = write_tmp(
            r#"{
                "FixedParameters": [1.0, 2.0, 3.0],
                "OptimizationParameterProgression": [
                    { "Iteration": 0, "Parameters": [0, 0, 0, 0, 0, 0], "CostFunctionValue": 4.0 },
                    { "Iteration": 1, "Parameters": [0.1, 0, 0, 1, 0, 0], "CostFunctionValue": 2.0 }
                ]
            }"#,
        );
        let trace = read_progression(&path).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.iteration_count(), 1);
        assert_eq!(*trace.fixed_parameters(), Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_missing_fields() {
        let (_dir, path) = write_tmp(
            r#"{ "FixedParameters": [0, 0, 0],
                 "OptimizationParameterProgression": [ { "Iteration": 0, "Parameters": [0, 0, 0, 0, 0, 0] } ] }"#,
        );
        assert_eq!(
            read_progression(&path),
            Err(TunerError::trace_format(&path, "record 0: missing CostFunctionValue"))
        );

        let (_dir, path) = write_tmp(r#"{ "OptimizationParameterProgression": [] }"#);
        assert_eq!(
            read_progression(&path),
            Err(TunerError::trace_format(&path, "missing FixedParameters"))
        );
    }

    #[test]
    fn test_negative_iteration() {
        let (_dir, path) = write_tmp(
            r#"{ "FixedParameters": [0, 0, 0],
                 "OptimizationParameterProgression": [
                    { "Iteration": -1, "Parameters": [0, 0, 0, 0, 0, 0], "CostFunctionValue": 1.0 } ] }"#,
        );
        assert!(matches!(
            read_progression(&path),
            Err(TunerError::TraceFormat { .. })
        ));
    }

    #[test]
    fn test_bad_fixed_parameters() {
        let (_dir, path) = write_tmp(
            r#"{ "FixedParameters": [0, 0],
                 "OptimizationParameterProgression": [
                    { "Iteration": 0, "Parameters": [0, 0, 0, 0, 0, 0], "CostFunctionValue": 1.0 } ] }"#,
        );
        assert_eq!(
            read_progression(&path),
            Err(TunerError::trace_format(
                &path,
                "FixedParameters has 2 values, expected 3"
            ))
        );
    }

    #[test]
    fn test_not_json() {
        let (_dir, path) = write_tmp("HDF\u{1}\u{2}");
        assert!(matches!(
            read_progression(&path),
            Err(TunerError::TraceFormat { .. })
        ));
    }
}
