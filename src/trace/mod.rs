//! # Optimization trace
//!
//! In-memory, iteration-keyed view of the progression recorded by a registration
//! run: one [`IterationRecord`] per optimizer iteration plus the fixed rotation
//! center shared by all of them.
//!
//! ## Invariants
//! -----------------
//! * At least one record (empty progressions are rejected with
//!   [`TunerError::TraceEmpty`]).
//! * `Iteration` values are non-decreasing; the last one is the
//!   [`iteration_count`](Trace::iteration_count).
//! * Every `CostFunctionValue` is finite and strictly positive, so its inverse
//!   is always defined.
//! * A [`Trace`] is never mutated once built. It is `Send + Sync` and can be read
//!   from several threads through a [`TraceHandle`].
//!
//! ## Lookup
//! -----------------
//! Records are located by their `Iteration` key, not by their position in the
//! file. An iteration with no record of its own inside `[0, iteration_count]`
//! resolves to the most recent record before it; before the first record, the
//! zero transform (initial state) is returned.
//!
//! ## Derived series
//! -----------------
//! * [`Trace::metric_value_inverse`] – `1 / CostFunctionValue`, the plotted metric.
//! * [`Trace::translation_trail`] – path followed by the rotation center.
//! * [`Trace::write_csv`] – tabular export of the whole progression.
mod progression_reader;

use std::{io::Write, ops::Deref, sync::Arc};

use camino::Utf8Path;
use log::info;
use nalgebra::Point3;
use serde::Serialize;

use crate::{
    constants::{CostValue, Iteration},
    transform::{windowed_iterations, IterationWindow, RigidParameters},
    tuner_errors::TunerError,
};

/// State of the optimizer after one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub iteration: Iteration,
    pub parameters: RigidParameters,
    pub cost_function_value: CostValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    records: Vec<IterationRecord>,
    fixed_parameters: Point3<f64>,
}

impl Trace {
    /// Load a progression file written by the analysis executable.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: progression file declared in the configuration.
    ///
    /// Return
    /// ----------
    /// * The loaded [`Trace`].
    /// * [`TunerError::TraceFormat`] if the file cannot be opened or a required
    ///   field is absent or malformed.
    /// * [`TunerError::TraceEmpty`] if it holds no iteration.
    ///
    /// See also
    /// ------------
    /// * [`Trace::from_records`] – Same validation for in-memory records.
    pub fn load(path: &Utf8Path) -> Result<Self, TunerError> {
        let trace = progression_reader::read_progression(path)?;
        info!(
            "Loaded progression {path}: {} iterations, rotation center {:?}",
            trace.iteration_count(),
            trace.fixed_parameters.coords.as_slice()
        );
        Ok(trace)
    }

    /// Build a trace from records already in memory.
    pub fn from_records(
        records: Vec<IterationRecord>,
        fixed_parameters: Point3<f64>,
    ) -> Result<Self, TunerError> {
        if records.is_empty() {
            return Err(TunerError::TraceEmpty("<memory>".into()));
        }
        if let Some(pair) = records
            .windows(2)
            .find(|pair| pair[1].iteration < pair[0].iteration)
        {
            return Err(TunerError::trace_format(
                "<memory>",
                format!(
                    "Iteration decreases from {} to {}",
                    pair[0].iteration, pair[1].iteration
                ),
            ));
        }
        if let Some(record) = records
            .iter()
            .find(|r| !(r.cost_function_value.is_finite() && r.cost_function_value > 0.0))
        {
            return Err(TunerError::trace_format(
                "<memory>",
                format!(
                    "CostFunctionValue {} at iteration {} is not a positive number",
                    record.cost_function_value, record.iteration
                ),
            ));
        }
        Ok(Trace {
            records,
            fixed_parameters,
        })
    }

    /// Total number of completed iterations: the `Iteration` of the last record.
    pub fn iteration_count(&self) -> Iteration {
        self.records
            .last()
            .map(|r| r.iteration)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// Rotation center of the rigid transform, constant over the run.
    pub fn fixed_parameters(&self) -> &Point3<f64> {
        &self.fixed_parameters
    }

    fn check_range(&self, iteration: i64) -> Result<Iteration, TunerError> {
        let count = self.iteration_count();
        if iteration < 0 || iteration > i64::from(count) {
            return Err(TunerError::IndexOutOfRange {
                iteration,
                iteration_count: count,
            });
        }
        Ok(iteration as Iteration)
    }

    /// Record in effect at `iteration`, `None` before the first record.
    pub fn record_at(&self, iteration: Iteration) -> Result<Option<&IterationRecord>, TunerError> {
        let iteration = self.check_range(i64::from(iteration))?;
        let idx = self.records.partition_point(|r| r.iteration <= iteration);
        Ok(idx.checked_sub(1).map(|i| &self.records[i]))
    }

    /// Raw rigid parameters stored for `iteration`.
    ///
    /// Return
    /// ----------
    /// * The six stored values of that iteration.
    /// * [`TunerError::IndexOutOfRange`] if `iteration > iteration_count`.
    pub fn parameters_at(&self, iteration: Iteration) -> Result<RigidParameters, TunerError> {
        Ok(self
            .record_at(iteration)?
            .map(|r| r.parameters)
            .unwrap_or_else(RigidParameters::zero))
    }

    /// Signed variant of [`Trace::parameters_at`] for indices coming from
    /// untyped sources (sliders, spin boxes, command line).
    pub fn parameters_at_index(&self, iteration: i64) -> Result<RigidParameters, TunerError> {
        let iteration = self.check_range(iteration)?;
        self.parameters_at(iteration)
    }

    pub fn windowed_iterations(&self, current: Iteration, window_size: usize) -> IterationWindow {
        windowed_iterations(current, window_size, self.iteration_count())
    }

    pub fn iterations(&self) -> impl Iterator<Item = Iteration> + '_ {
        self.records.iter().map(|r| r.iteration)
    }

    pub fn cost_function_values(&self) -> impl Iterator<Item = CostValue> + '_ {
        self.records.iter().map(|r| r.cost_function_value)
    }

    /// `1 / CostFunctionValue` for every record, the quantity plotted against
    /// the iteration (higher is better).
    pub fn metric_value_inverse(&self) -> Vec<f64> {
        self.cost_function_values().map(|v| 1.0 / v).collect()
    }

    /// Position of the rotation center after each iteration:
    /// `translation + fixed_parameters`.
    pub fn translation_trail(&self) -> Vec<Point3<f64>> {
        self.records
            .iter()
            .map(|r| self.fixed_parameters + r.parameters.translation)
            .collect()
    }

    /// Record with the lowest cost function value.
    pub fn best_record(&self) -> &IterationRecord {
        // from_records guarantees at least one record
        self.records
            .iter()
            .min_by(|a, b| a.cost_function_value.total_cmp(&b.cost_function_value))
            .unwrap_or(&self.records[0])
    }

    /// Export the progression as CSV, one row per record.
    ///
    /// Columns: `Iteration, CostFunctionValue, MetricValueInverse, RotationX,
    /// RotationY, RotationZ, TranslationX, TranslationY, TranslationZ`.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TunerError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for record in &self.records {
            csv_writer.serialize(ProgressionRow::from(record))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ProgressionRow {
    iteration: Iteration,
    cost_function_value: CostValue,
    metric_value_inverse: f64,
    rotation_x: f64,
    rotation_y: f64,
    rotation_z: f64,
    translation_x: f64,
    translation_y: f64,
    translation_z: f64,
}

impl From<&IterationRecord> for ProgressionRow {
    fn from(record: &IterationRecord) -> Self {
        let [rx, ry, rz, tx, ty, tz] = record.parameters.to_array();
        ProgressionRow {
            iteration: record.iteration,
            cost_function_value: record.cost_function_value,
            metric_value_inverse: 1.0 / record.cost_function_value,
            rotation_x: rx,
            rotation_y: ry,
            rotation_z: rz,
            translation_x: tx,
            translation_y: ty,
            translation_z: tz,
        }
    }
}

/// Shared, immutable handle on a loaded [`Trace`].
#[derive(Debug, Clone, PartialEq)]
pub struct TraceHandle(Arc<Trace>);

impl TraceHandle {
    pub fn new(trace: Trace) -> Self {
        TraceHandle(Arc::new(trace))
    }
}

impl From<Trace> for TraceHandle {
    fn from(trace: Trace) -> Self {
        TraceHandle::new(trace)
    }
}

impl Deref for TraceHandle {
    type Target = Trace;

    fn deref(&self) -> &Trace {
        &self.0
    }
}
