//! # Tube geometry
//!
//! Template geometry of the vessel tree drawn over the fixed image: centerline
//! points with their radii, grouped by tube. The template is loaded once (from
//! the subsampled tubes when subsampling is configured) and never modified;
//! every replayed iteration works on a transformed **copy** obtained with
//! [`TubeGeometry::transformed`].
//!
//! ## Point weights
//! -----------------
//! Each point carries a display weight in `[0, 1]`:
//! - read from the `TubePointWeights` array of the configured
//!   `TubePointWeightsFile` when the registration produced one,
//! - otherwise derived from the radius as `2 / (1 + exp(−2 r))`,
//!
//! then min–max normalised.
mod tre_reader;

use std::{fs::File, io::BufReader, ops::Range};

use camino::Utf8Path;
use itertools::{Itertools, MinMaxResult};
use log::debug;
use nalgebra::Point3;
use serde::Deserialize;

use crate::{transform::RigidParameters, tuner_errors::TunerError};

#[derive(Debug, Clone, PartialEq)]
pub struct TubeGeometry {
    points: Vec<Point3<f64>>,
    radii: Vec<f64>,
    tubes: Vec<Range<usize>>,
}

#[derive(Debug, Deserialize)]
struct TubePointWeights {
    #[serde(rename = "TubePointWeights")]
    weights: Vec<f64>,
}

impl TubeGeometry {
    /// Build a single-tube geometry from points and radii.
    ///
    /// Return
    /// ----------
    /// * `None` if `points` and `radii` differ in length.
    pub fn from_points(points: Vec<Point3<f64>>, radii: Vec<f64>) -> Option<Self> {
        if points.len() != radii.len() {
            return None;
        }
        let tubes = if points.is_empty() {
            Vec::new()
        } else {
            vec![0..points.len()]
        };
        Some(TubeGeometry {
            points,
            radii,
            tubes,
        })
    }

    /// Read a MetaIO tube tree (`.tre`).
    ///
    /// Arguments
    /// -----------------
    /// * `path`: tube tree file, ASCII point data.
    ///
    /// Return
    /// ----------
    /// * The geometry of every `Tube` object of the file, in file order.
    /// * [`TunerError::TubeFormat`] if the file cannot be read or parsed.
    pub fn from_tre(path: &Utf8Path) -> Result<Self, TunerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| TunerError::tube_format(path, e))?;
        let raw = tre_reader::parse_tre(&content).map_err(|r| TunerError::tube_format(path, r))?;
        debug!(
            "Read {} tubes ({} points) from {path}",
            raw.tubes.len(),
            raw.points.len()
        );
        Ok(TubeGeometry {
            points: raw.points,
            radii: raw.radii,
            tubes: raw.tubes,
        })
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point ranges of the individual tubes.
    pub fn tubes(&self) -> &[Range<usize>] {
        &self.tubes
    }

    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / self.points.len() as f64))
    }

    /// Copy of this geometry with `parameters` applied about `center`.
    pub fn transformed(&self, parameters: &RigidParameters, center: &Point3<f64>) -> Self {
        TubeGeometry {
            points: parameters.apply_all(&self.points, center),
            radii: self.radii.clone(),
            tubes: self.tubes.clone(),
        }
    }

    /// Normalised display weight of every point.
    ///
    /// Arguments
    /// -----------------
    /// * `weights_file`: optional `TubePointWeightsFile`; ignored when it does not
    ///   exist (the registration has not written it yet).
    ///
    /// Return
    /// ----------
    /// * One weight per point in `[0, 1]`; all ones when every raw weight is equal.
    /// * [`TunerError::TubeFormat`] if the weights file is unreadable or its length
    ///   does not match the number of points.
    pub fn point_weights(&self, weights_file: Option<&Utf8Path>) -> Result<Vec<f64>, TunerError> {
        let raw = match weights_file.filter(|p| p.exists()) {
            Some(path) => {
                let file = File::open(path).map_err(|e| TunerError::tube_format(path, e))?;
                let TubePointWeights { weights } = serde_json::from_reader(BufReader::new(file))
                    .map_err(|e| TunerError::tube_format(path, e))?;
                if weights.len() != self.len() {
                    return Err(TunerError::tube_format(
                        path,
                        format!("{} weights for {} points", weights.len(), self.len()),
                    ));
                }
                weights
            }
            None => self
                .radii
                .iter()
                .map(|&r| 2.0 / (1.0 + (-2.0 * r).exp()))
                .collect(),
        };
        Ok(normalize_weights(raw))
    }
}

fn normalize_weights(mut weights: Vec<f64>) -> Vec<f64> {
    let (min, max) = match weights.iter().copied().minmax_by(f64::total_cmp) {
        MinMaxResult::NoElements => return weights,
        MinMaxResult::OneElement(w) => (w, w),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    let span = max - min;
    for w in weights.iter_mut() {
        *w = if span > 0.0 { (*w - min) / span } else { 1.0 };
    }
    weights
}
