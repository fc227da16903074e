//! Data structures flowing through the pacing engine
//!
//! - Segment: one finalized unit of recognized text from the upstream source
//! - PacedEmission: a segment (or word-prefix revision) plus its display duration

pub mod emission;
pub mod segment;

pub use emission::PacedEmission;
pub use segment::Segment;
