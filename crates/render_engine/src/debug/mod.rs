//! Debug tooling
//!
//! A keyboard-driven control panel with typed, live bindings into
//! application state, and an overlay that draws it over finished frames.

pub mod font;
pub mod overlay;
pub mod panel;

pub use font::{FontAtlas, FontError};
pub use overlay::{OverlayLine, OverlayRect, PanelOverlay};
pub use panel::{Constraint, DebugPanel, PanelEntry, PanelError, PanelValue};
