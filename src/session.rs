//! # Tuning session state
//!
//! [`TunerSession`] holds the piece of shared state a visualization layer
//! reacts to: the **current iteration** being examined, the number of iterations
//! of the loaded progression and the progression itself.
//!
//! Consumers either register a [`SessionListener`] and get pushed a
//! [`SessionEvent`] on every change, or pull what they need after each change
//! ([`TunerSession::overlay_trail`], [`TunerSession::current_parameters`]).
//! Events are delivered synchronously, in registration order.
//!
//! ## No trace yet
//! -----------------
//! Before the first successful run the session is in [`TraceState::NoTrace`].
//! Every parameter query then answers the zero transform and the rotation center
//! is the origin, so the template tubes are drawn untransformed.
use std::sync::mpsc::Sender;

use log::debug;
use nalgebra::Point3;

use crate::{
    constants::Iteration,
    transform::{trail_alpha, windowed_iterations, RigidParameters},
    trace::TraceHandle,
    tubes::TubeGeometry,
    tuner_errors::TunerError,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum TraceState {
    #[default]
    NoTrace,
    Loaded(TraceHandle),
}

impl TraceState {
    pub fn trace(&self) -> Option<&TraceHandle> {
        match self {
            TraceState::NoTrace => None,
            TraceState::Loaded(handle) => Some(handle),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    IterationChanged(Iteration),
    NumberOfIterationsChanged(Iteration),
    AnalysisRun,
}

pub trait SessionListener {
    fn notify(&mut self, event: &SessionEvent);
}

/// Forward events on a channel. A dropped receiver silently stops delivery.
impl SessionListener for Sender<SessionEvent> {
    fn notify(&mut self, event: &SessionEvent) {
        let _ = self.send(event.clone());
    }
}

/// One entry of the fading history drawn behind the current pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailFrame {
    pub iteration: Iteration,
    pub alpha: f64,
    pub parameters: RigidParameters,
}

#[derive(Default)]
pub struct TunerSession {
    state: TraceState,
    iteration: Iteration,
    number_of_iterations: Iteration,
    listeners: Vec<Box<dyn SessionListener>>,
}

impl std::fmt::Debug for TunerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunerSession")
            .field("state", &self.state)
            .field("iteration", &self.iteration)
            .field("number_of_iterations", &self.number_of_iterations)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TunerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl SessionListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: SessionEvent) {
        debug!("Session event {event:?}");
        for listener in self.listeners.iter_mut() {
            listener.notify(&event);
        }
    }

    pub fn state(&self) -> &TraceState {
        &self.state
    }

    pub fn iteration(&self) -> Iteration {
        self.iteration
    }

    pub fn number_of_iterations(&self) -> Iteration {
        self.number_of_iterations
    }

    /// Select the iteration to examine.
    ///
    /// Listeners are notified only when the value actually changes.
    ///
    /// Return
    /// ----------
    /// * [`TunerError::IndexOutOfRange`] if `iteration` exceeds the number of
    ///   iterations; the current iteration is then left as is.
    pub fn set_iteration(&mut self, iteration: Iteration) -> Result<(), TunerError> {
        if iteration > self.number_of_iterations {
            return Err(TunerError::IndexOutOfRange {
                iteration: i64::from(iteration),
                iteration_count: self.number_of_iterations,
            });
        }
        if iteration != self.iteration {
            self.iteration = iteration;
            self.emit(SessionEvent::IterationChanged(iteration));
        }
        Ok(())
    }

    fn set_number_of_iterations(&mut self, count: Iteration) {
        if count != self.number_of_iterations {
            self.number_of_iterations = count;
            self.emit(SessionEvent::NumberOfIterationsChanged(count));
        }
    }

    /// Adopt the progression of a completed run and jump to its last iteration.
    ///
    /// Notification order: number of iterations (if changed), analysis run,
    /// iteration (if changed).
    pub fn install_trace(&mut self, trace: TraceHandle) {
        let count = trace.iteration_count();
        self.set_number_of_iterations(count);
        self.state = TraceState::Loaded(trace);
        self.emit(SessionEvent::AnalysisRun);
        if count != self.iteration {
            self.iteration = count;
            self.emit(SessionEvent::IterationChanged(count));
        }
    }

    /// Rigid parameters at `iteration`; the zero transform without a trace.
    pub fn parameters_at(&self, iteration: Iteration) -> Result<RigidParameters, TunerError> {
        match &self.state {
            TraceState::NoTrace => Ok(RigidParameters::zero()),
            TraceState::Loaded(trace) => trace.parameters_at(iteration),
        }
    }

    pub fn current_parameters(&self) -> Result<RigidParameters, TunerError> {
        self.parameters_at(self.iteration)
    }

    /// Rotation center of the loaded trace; the origin without a trace.
    pub fn rotation_center(&self) -> Point3<f64> {
        self.state
            .trace()
            .map(|t| *t.fixed_parameters())
            .unwrap_or_else(Point3::origin)
    }

    /// `1 / CostFunctionValue` at the current iteration, if a trace is loaded.
    pub fn current_metric_value_inverse(&self) -> Option<f64> {
        let trace = self.state.trace()?;
        let record = trace.record_at(self.iteration).ok().flatten()?;
        Some(1.0 / record.cost_function_value)
    }

    /// Current iteration followed by up to `window_size − 1` older ones, each
    /// with its fading opacity and parameters.
    pub fn overlay_trail(&self, window_size: usize) -> Result<Vec<TrailFrame>, TunerError> {
        windowed_iterations(self.iteration, window_size, self.number_of_iterations)
            .map(|iteration| {
                Ok(TrailFrame {
                    iteration,
                    alpha: trail_alpha(iteration, self.iteration),
                    parameters: self.parameters_at(iteration)?,
                })
            })
            .collect()
    }

    /// Transformed copies of `template` for every frame of the overlay trail.
    pub fn overlay_tubes(
        &self,
        template: &TubeGeometry,
        window_size: usize,
    ) -> Result<Vec<(TrailFrame, TubeGeometry)>, TunerError> {
        let center = self.rotation_center();
        Ok(self
            .overlay_trail(window_size)?
            .into_iter()
            .map(|frame| {
                let tubes = template.transformed(&frame.parameters, &center);
                (frame, tubes)
            })
            .collect())
    }
}

#[cfg(test)]
mod session_test {
    use std::sync::mpsc::{channel, Receiver};

    use nalgebra::Vector3;

    use crate::trace::{IterationRecord, Trace};

    use super::*;

    fn handle(count: Iteration) -> TraceHandle {
        let records = (0..=count)
            .map(|i| IterationRecord {
                iteration: i,
                parameters: RigidParameters::new(
                    Vector3::zeros(),
                    Vector3::new(f64::from(i), 0.0, 0.0),
                ),
                cost_function_value: 1.0 + f64::from(i),
            })
            .collect();
        Trace::from_records(records, Point3::new(1.0, 1.0, 1.0))
            .unwrap()
            .into()
    }

    fn session_with_events() -> (TunerSession, Receiver<SessionEvent>) {
        let (tx, rx) = channel();
        let mut session = TunerSession::new();
        session.subscribe(tx);
        (session, rx)
    }

    #[test]
    fn test_no_trace_fallback() {
        let session = TunerSession::new();
        assert_eq!(session.state(), &TraceState::NoTrace);
        assert_eq!(session.current_parameters().unwrap(), RigidParameters::zero());
        assert_eq!(session.rotation_center(), Point3::origin());
        assert!(session.current_metric_value_inverse().is_none());

        let trail = session.overlay_trail(4).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].alpha, 1.0);
    }

    #[test]
    fn test_install_trace_events() {
        let (mut session, rx) = session_with_events();
        session.install_trace(handle(5));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SessionEvent::NumberOfIterationsChanged(5),
                SessionEvent::AnalysisRun,
                SessionEvent::IterationChanged(5),
            ]
        );
        assert_eq!(session.iteration(), 5);
        assert_eq!(session.current_metric_value_inverse(), Some(1.0 / 6.0));
    }

    #[test]
    fn test_set_iteration() {
        let (mut session, rx) = session_with_events();
        session.install_trace(handle(5));
        rx.try_iter().for_each(drop);

        session.set_iteration(2).unwrap();
        session.set_iteration(2).unwrap();
        assert_eq!(
            session.set_iteration(6),
            Err(TunerError::IndexOutOfRange {
                iteration: 6,
                iteration_count: 5
            })
        );
        assert_eq!(session.iteration(), 2);
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![SessionEvent::IterationChanged(2)]
        );
        assert_eq!(session.current_parameters().unwrap().translation.x, 2.0);
    }

    #[test]
    fn test_shorter_trace_clamps_iteration() {
        let mut session = TunerSession::new();
        session.install_trace(handle(8));
        session.install_trace(handle(3));
        assert_eq!(session.iteration(), 3);
        assert_eq!(session.number_of_iterations(), 3);
    }

    #[test]
    fn test_overlay_trail() {
        let mut session = TunerSession::new();
        session.install_trace(handle(5));
        session.set_iteration(1).unwrap();

        let trail = session.overlay_trail(4).unwrap();
        assert_eq!(trail.iter().map(|f| f.iteration).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(trail[0].alpha, 1.0);
        assert!(trail[1].alpha < 1.0);
        assert_eq!(trail[1].parameters.translation.x, 0.0);

        let template =
            TubeGeometry::from_points(vec![Point3::new(0.0, 0.0, 0.0)], vec![1.0]).unwrap();
        let overlay = session.overlay_tubes(&template, 4).unwrap();
        assert_eq!(overlay[0].1.points()[0], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(overlay[1].1.points()[0], Point3::new(0.0, 0.0, 0.0));
    }
}
