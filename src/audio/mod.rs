//! Gain-staged audio at the Web-Audio collaborator boundary.

pub mod graph;

pub use graph::{AudioGraph, GraphState, MediaElementId, SoftwareGraph};
