//! # Rigid transform replay
//!
//! The analysis executable optimizes a 6-parameter rigid transform
//! `[rx, ry, rz, tx, ty, tz]` about a fixed rotation center `c` (the tube-set
//! centroid). This module reproduces that transform on arbitrary points so the
//! template tube geometry can be drawn at the pose of any iteration.
//!
//! ## Composition
//! -----------------
//! For a point `p`:
//!
//! ```text
//! p' = Rz(rz) · Ry(ry) · Rx(rx) · (p − c) + c + t
//! ```
//!
//! i.e. the point is moved to the rotation center, rotated about the **world** X
//! axis, then the world Y axis, then the world Z axis (extrinsic X→Y→Z), moved
//! back and finally translated. Angles are stored and consumed in **radians**.
//!
//! The order is load-bearing: it decides whether the replayed rotation center
//! matches the fixed parameters of the registration. It has never been checked
//! against the optimizer's own convention and is reproduced as recorded.
//!
//! ## Trail
//! -----------------
//! [`windowed_iterations`] yields the short history `current, current − 1, …`
//! drawn behind the current pose, and [`trail_alpha`] gives each one its fading
//! opacity.
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{Iteration, Radian, RIGID_PARAMETER_COUNT, TRAIL_DECAY_RATE},
    trace::Trace,
    tuner_errors::TunerError,
};

/// World axis of an elementary rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Elementary rotation of `angle` radians about a world axis.
pub fn axis_rotation(angle: Radian, axis: Axis) -> Rotation3<f64> {
    let axis = match axis {
        Axis::X => Vector3::x_axis(),
        Axis::Y => Vector3::y_axis(),
        Axis::Z => Vector3::z_axis(),
    };
    Rotation3::from_axis_angle(&axis, angle)
}

/// Optimized parameters of one iteration: three rotation angles (radians,
/// about X, Y, Z) followed by three translation offsets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidParameters {
    pub rotation: Vector3<Radian>,
    pub translation: Vector3<f64>,
}

impl Default for RigidParameters {
    fn default() -> Self {
        Self::zero()
    }
}

impl RigidParameters {
    pub fn new(rotation: Vector3<Radian>, translation: Vector3<f64>) -> Self {
        RigidParameters {
            rotation,
            translation,
        }
    }

    /// Identity rotation and null translation.
    ///
    /// This is the pose used whenever no progression is available yet.
    pub fn zero() -> Self {
        RigidParameters {
            rotation: Vector3::zeros(),
            translation: Vector3::zeros(),
        }
    }

    /// Build from the raw parameter vector `[rx, ry, rz, tx, ty, tz]`.
    ///
    /// Return
    /// ----------
    /// * `None` if `values` does not hold exactly six elements.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        if values.len() != RIGID_PARAMETER_COUNT {
            return None;
        }
        Some(RigidParameters {
            rotation: Vector3::new(values[0], values[1], values[2]),
            translation: Vector3::new(values[3], values[4], values[5]),
        })
    }

    pub fn to_array(&self) -> [f64; RIGID_PARAMETER_COUNT] {
        [
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
            self.translation.x,
            self.translation.y,
            self.translation.z,
        ]
    }

    /// Rotation part as a single matrix `Rz · Ry · Rx`.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        let rx = axis_rotation(self.rotation.x, Axis::X);
        let ry = axis_rotation(self.rotation.y, Axis::Y);
        let rz = axis_rotation(self.rotation.z, Axis::Z);
        (rz * ry * rx).into_inner()
    }

    /// Apply the transform to one point, rotating about `center`.
    ///
    /// Arguments
    /// -----------------
    /// * `point`: point in world coordinates.
    /// * `center`: rotation center (fixed parameters of the trace).
    ///
    /// Return
    /// ----------
    /// * `Rz·Ry·Rx·(point − center) + center + translation`
    pub fn apply(&self, point: &Point3<f64>, center: &Point3<f64>) -> Point3<f64> {
        self.apply_with(&self.rotation_matrix(), point, center)
    }

    fn apply_with(
        &self,
        rotation: &Matrix3<f64>,
        point: &Point3<f64>,
        center: &Point3<f64>,
    ) -> Point3<f64> {
        center + rotation * (point - center) + self.translation
    }

    /// Apply the transform to every point of `points`, returning new points.
    pub fn apply_all(&self, points: &[Point3<f64>], center: &Point3<f64>) -> Vec<Point3<f64>> {
        let rotation = self.rotation_matrix();
        points
            .iter()
            .map(|p| self.apply_with(&rotation, p, center))
            .collect()
    }
}

/// Transform `points` to their pose at `iteration` of `trace`.
///
/// Arguments
/// -----------------
/// * `trace`: loaded optimization progression.
/// * `iteration`: iteration to replay, within `[0, trace.iteration_count()]`.
/// * `points`: template geometry; left untouched.
/// * `center`: rotation center, usually [`Trace::fixed_parameters`].
///
/// Return
/// ----------
/// * The transformed copy of `points`, or [`TunerError::IndexOutOfRange`].
pub fn transform_point_set(
    trace: &Trace,
    iteration: Iteration,
    points: &[Point3<f64>],
    center: &Point3<f64>,
) -> Result<Vec<Point3<f64>>, TunerError> {
    let parameters = trace.parameters_at(iteration)?;
    Ok(parameters.apply_all(points, center))
}

/// Descending window of iterations ending at `current`, clipped to
/// `[0, iteration_count]`.
///
/// The iterator is finite and holds no hidden state beyond its position;
/// cloning it restarts the walk from the same point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationWindow {
    current: i64,
    offset: i64,
    window_size: i64,
    iteration_count: i64,
}

impl Iterator for IterationWindow {
    type Item = Iteration;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.window_size {
            let candidate = self.current - self.offset;
            self.offset += 1;
            if candidate < 0 {
                self.offset = self.window_size;
                return None;
            }
            if candidate <= self.iteration_count {
                return Some(candidate as Iteration);
            }
        }
        None
    }
}

/// `current, current − 1, …, current − window_size + 1`, clipped to
/// `[0, iteration_count]`.
pub fn windowed_iterations(
    current: Iteration,
    window_size: usize,
    iteration_count: Iteration,
) -> IterationWindow {
    IterationWindow {
        current: i64::from(current),
        offset: 0,
        window_size: i64::try_from(window_size).unwrap_or(i64::MAX),
        iteration_count: i64::from(iteration_count),
    }
}

/// Opacity of a trail entry: `exp(0.8 · (iteration − current))`.
///
/// The current iteration is fully opaque, older ones fade exponentially.
pub fn trail_alpha(iteration: Iteration, current: Iteration) -> f64 {
    (TRAIL_DECAY_RATE * (f64::from(iteration) - f64::from(current))).exp()
}
