//! # Constants and type definitions for regtuner
//!
//! This module centralizes the **layout constants** of the registration progression,
//! the **visualization defaults** used when replaying it, and the **common type
//! aliases** shared by the orchestrator, the trace reader and the replayer.
//!
//! ## Overview
//!
//! - Shape of the rigid parameter vector (3 rotations + 3 translations)
//! - Shape of the fixed parameters (rotation center)
//! - Fading history defaults for the overlay trail
//! - Suffixes of the temporary artifacts created by the orchestrator

// -------------------------------------------------------------------------------------------------
// Progression layout
// -------------------------------------------------------------------------------------------------

/// Number of optimized parameters per iteration: `[rx, ry, rz, tx, ty, tz]`
pub const RIGID_PARAMETER_COUNT: usize = 6;

/// Number of fixed parameters of the rigid transform (rotation center)
pub const FIXED_PARAMETER_COUNT: usize = 3;

/// Radians → degrees
pub const DEGREES_PER_RADIAN: f64 = 180.0 / std::f64::consts::PI;

// -------------------------------------------------------------------------------------------------
// Replay defaults
// -------------------------------------------------------------------------------------------------

/// Number of iterations drawn in the fading overlay trail (current one included)
pub const DEFAULT_TRAIL_LENGTH: usize = 4;

/// Exponential decay rate of the trail opacity per iteration of age
pub const TRAIL_DECAY_RATE: f64 = 0.8;

// -------------------------------------------------------------------------------------------------
// Temporary artifacts
// -------------------------------------------------------------------------------------------------

/// Suffix of the subsampled tube tree written by the subsampling executable
pub const SUBSAMPLED_TUBES_SUFFIX: &str = "SubsampledTubes.tre";

/// Suffix of the per-run configuration handed to the analysis executable
pub const RUN_CONFIG_SUFFIX: &str = "TunerConfig.json";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in radians
pub type Radian = f64;

/// Iteration index of the optimizer (0 is the initial state)
pub type Iteration = u32;

/// Value of the registration cost function (lower is better)
pub type CostValue = f64;
