//! Host simulator for the double-buffered flush pipeline.
//!
//! Replaces the LTDC, the DMA2D and the panel with in-memory models so the
//! flip/copy/signal ordering can be exercised and inspected on a PC.

pub mod dump;
pub mod error;
pub mod runner;
pub mod sim;

pub use error::SimError;
pub use runner::{run, SimConfig, SimReport};
pub use sim::{LatencyEngine, SimPanel, SimTimingGenerator};
