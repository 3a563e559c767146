//! Audio graph trait and a software gain stage.
//!
//! The host runtime owns the real gain node and media-element sources; the
//! controller drives them through [`AudioGraph`]. [`SoftwareGraph`] is a
//! concrete implementation that applies the gain to raw sample frames,
//! used by the host binary and the test suite.

use crate::error::{Result, VolumaError};
use std::collections::HashSet;

/// Handle to a media element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaElementId(pub u64);

impl std::fmt::Display for MediaElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Lifecycle state of the audio graph.
///
/// Backends may start suspended and only resume from a user-initiated
/// interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Suspended,
    Running,
}

/// Gain-staged audio graph.
///
/// One graph per tab; every media element on the page is routed through a
/// single gain stage.
pub trait AudioGraph: Send {
    /// Current gain multiplier.
    fn gain(&self) -> f32;

    /// Set the gain multiplier. Takes effect immediately.
    fn set_gain(&mut self, gain: f32);

    fn state(&self) -> GraphState;

    /// Resume a suspended graph. Backends may refuse outside a user gesture.
    fn resume(&mut self) -> Result<()>;

    /// Route a media element's output through the gain stage.
    ///
    /// Errors if the element is already bound (possibly by another agent) or
    /// carries no audio; the caller logs and leaves the element unbound.
    fn connect(&mut self, element: MediaElementId) -> Result<()>;
}

/// Software gain stage.
///
/// Starts suspended, like the browser graph it stands in for; `process`
/// produces silence until `resume` is called.
#[derive(Debug)]
pub struct SoftwareGraph {
    gain: f32,
    state: GraphState,
    connected: HashSet<MediaElementId>,
}

impl SoftwareGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            gain: 1.0,
            state: GraphState::Suspended,
            connected: HashSet::new(),
        }
    }

    /// Apply the gain stage to a frame of samples in place.
    pub fn process(&mut self, samples: &mut [f32]) {
        match self.state {
            GraphState::Suspended => samples.fill(0.0),
            GraphState::Running => {
                for sample in samples.iter_mut() {
                    *sample *= self.gain;
                }
            }
        }
    }

    /// Number of media elements routed through the gain stage.
    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.connected.len()
    }
}

impl Default for SoftwareGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGraph for SoftwareGraph {
    fn gain(&self) -> f32 {
        self.gain
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    fn state(&self) -> GraphState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        self.state = GraphState::Running;
        Ok(())
    }

    fn connect(&mut self, element: MediaElementId) -> Result<()> {
        if !self.connected.insert(element) {
            return Err(VolumaError::Audio(format!("{element} is already connected")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn suspended_graph_produces_silence() {
        let mut graph = SoftwareGraph::new();
        graph.set_gain(2.0);
        let mut frame = [0.5_f32, -0.5];
        graph.process(&mut frame);
        assert_eq!(frame, [0.0, 0.0]);
    }

    #[test]
    fn running_graph_multiplies_samples_by_gain() {
        let mut graph = SoftwareGraph::new();
        graph.resume().unwrap();
        graph.set_gain(1.5);
        let mut frame = [0.2_f32, -0.4];
        graph.process(&mut frame);
        assert!((frame[0] - 0.3).abs() < 1e-6);
        assert!((frame[1] + 0.6).abs() < 1e-6);
    }

    #[test]
    fn double_connect_is_rejected() {
        let mut graph = SoftwareGraph::new();
        graph.connect(MediaElementId(1)).unwrap();
        let err = graph.connect(MediaElementId(1)).unwrap_err();
        assert!(matches!(err, VolumaError::Audio(_)));
        assert_eq!(graph.connected_count(), 1);
    }
}
