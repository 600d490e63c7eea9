//! Camera controls

mod orbit;

pub use orbit::{OrbitControls, PointerButton};
