//! # regtuner
//!
//! Core of a visual debugger for rigid image-to-tube registration: runs the
//! external registration executable, loads the per-iteration optimization
//! progression it records and replays the rigid transform of any iteration on
//! the tube geometry.
//!
//! ```rust,no_run
//! use camino::Utf8Path;
//! use regtuner::{RunOrchestrator, TunerConfig, TunerSession};
//!
//! # fn demo() -> Result<(), regtuner::TunerError> {
//! let config = TunerConfig::from_path(Utf8Path::new("tuner.json"))?;
//! let mut orchestrator = RunOrchestrator::new(config)?;
//! let trace = orchestrator.run()?;
//!
//! let mut session = TunerSession::new();
//! session.install_trace(trace);
//! session.set_iteration(3)?;
//! for frame in session.overlay_trail(4)? {
//!     println!("{} {:.3} {:?}", frame.iteration, frame.alpha, frame.parameters);
//! }
//! # Ok(()) }
//! ```
pub mod config;
pub mod constants;
pub mod orchestrator;
pub mod process;
pub mod scratch;
pub mod session;
pub mod trace;
pub mod transform;
pub mod tubes;
pub mod tuner_errors;

pub use config::TunerConfig;
pub use orchestrator::RunOrchestrator;
pub use session::{SessionEvent, SessionListener, TraceState, TunerSession};
pub use trace::{IterationRecord, Trace, TraceHandle};
pub use transform::{transform_point_set, windowed_iterations, RigidParameters};
pub use tubes::TubeGeometry;
pub use tuner_errors::TunerError;
