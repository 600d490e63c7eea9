//! Foundation
//!
//! nalgebra aliases and transform helpers, frame timing and pacing, and the
//! env_logger setup shared by the engine and its binaries.

pub mod math;
pub mod time;
pub mod logging;
