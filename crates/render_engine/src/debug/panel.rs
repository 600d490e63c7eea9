//! Typed live-binding control panel
//!
//! Each control is a descriptor `{ label, constraint, getter, setter }` over a
//! context type `C`. The panel never holds copies of the bound values: every
//! read goes through the getter and every write through the setter, so the
//! panel always reflects the current state of the context.

use std::fmt;

use thiserror::Error;

use crate::render::Color;

/// Panel errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PanelError {
    /// A control with this label already exists
    #[error("Duplicate panel control: {0}")]
    DuplicateLabel(String),

    /// No control has this label
    #[error("Unknown panel control: {0}")]
    UnknownControl(String),

    /// Range bounds or step are unusable
    #[error("Invalid range for {label}: min {min}, max {max}, step {step}")]
    InvalidRange {
        /// Control label
        label: String,
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
        /// Step
        step: f32,
    },

    /// A slider was handed NaN or an infinity
    #[error("Control {label} needs a finite number, got {value}")]
    NotFinite {
        /// Control label
        label: String,
        /// Rejected value
        value: f32,
    },

    /// A choice control was registered without options
    #[error("Choice control {0} has no options")]
    NoOptions(String),

    /// The value kind does not match the control
    #[error("Control {label} expects a {expected} value, got {found}")]
    TypeMismatch {
        /// Control label
        label: String,
        /// Kind the control accepts
        expected: &'static str,
        /// Kind that was supplied
        found: &'static str,
    },

    /// A choice index past the option list
    #[error("Choice {index} is out of range for {label} ({count} options)")]
    ChoiceOutOfRange {
        /// Control label
        label: String,
        /// Requested index
        index: usize,
        /// Number of options
        count: usize,
    },
}

/// Value read from or written to a control
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelValue {
    /// Slider value
    Number(f32),
    /// Checkbox state
    Toggle(bool),
    /// 24-bit sRGB colour, `0xRRGGBB`
    Color(u32),
    /// Index into a choice control's options
    Choice(usize),
}

impl PanelValue {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Toggle(_) => "toggle",
            Self::Color(_) => "color",
            Self::Choice(_) => "choice",
        }
    }
}

impl fmt::Display for PanelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value:.3}"),
            Self::Toggle(value) => write!(f, "{value}"),
            Self::Color(hex) => write!(f, "#{hex:06x}"),
            Self::Choice(index) => write!(f, "{index}"),
        }
    }
}

/// Structural constraint of a control
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Slider, values snapped to `step` and clamped to `[min, max]`
    Range {
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
        /// Increment
        step: f32,
    },
    /// Checkbox
    Toggle,
    /// Colour picker
    Color,
    /// Dropdown with named options
    Choice(Vec<String>),
}

impl Constraint {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Range { .. } => "number",
            Self::Toggle => "toggle",
            Self::Color => "color",
            Self::Choice(_) => "choice",
        }
    }
}

type Getter<C> = Box<dyn Fn(&C) -> PanelValue>;
type Setter<C> = Box<dyn Fn(&mut C, PanelValue)>;

struct Control<C> {
    label: String,
    constraint: Constraint,
    get: Getter<C>,
    set: Setter<C>,
}

/// Snapshot of one control for display
#[derive(Debug, Clone, PartialEq)]
pub struct PanelEntry {
    /// Control label
    pub label: String,
    /// Current value
    pub value: PanelValue,
    /// Constraint of the control
    pub constraint: Constraint,
    /// Whether the keyboard cursor is on this control
    pub selected: bool,
}

impl fmt::Display for PanelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cursor = if self.selected { '>' } else { ' ' };
        write!(f, "{cursor} {:<22}", self.label)?;
        match (&self.constraint, self.value) {
            (Constraint::Range { min, max, .. }, value) => write!(f, "{value}  [{min}, {max}]"),
            (Constraint::Choice(options), PanelValue::Choice(index)) => {
                let name = options.get(index).map_or("?", String::as_str);
                write!(f, "{name}  ({})", options.join(" | "))
            }
            (_, value) => write!(f, "{value}"),
        }
    }
}

/// Ordered collection of typed controls bound to a context `C`
pub struct DebugPanel<C> {
    title: String,
    controls: Vec<Control<C>>,
    selected: usize,
}

impl<C: 'static> fmt::Debug for DebugPanel<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugPanel")
            .field("title", &self.title)
            .field("controls", &self.labels().collect::<Vec<_>>())
            .field("selected", &self.selected)
            .finish()
    }
}

impl<C: 'static> DebugPanel<C> {
    /// Empty panel
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            controls: Vec::new(),
            selected: 0,
        }
    }

    /// Panel title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of controls
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    /// True when no control has been added
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Control labels in insertion order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.controls.iter().map(|c| c.label.as_str())
    }

    fn push(&mut self, label: String, constraint: Constraint, get: Getter<C>, set: Setter<C>) -> Result<(), PanelError> {
        if self.controls.iter().any(|c| c.label == label) {
            return Err(PanelError::DuplicateLabel(label));
        }
        log::debug!("Panel '{}': added {} control '{}'", self.title, constraint.kind(), label);
        self.controls.push(Control { label, constraint, get, set });
        Ok(())
    }

    /// Add a slider
    pub fn add_range(
        &mut self,
        label: impl Into<String>,
        min: f32,
        max: f32,
        step: f32,
        get: impl Fn(&C) -> f32 + 'static,
        set: impl Fn(&mut C, f32) + 'static,
    ) -> Result<(), PanelError> {
        let label = label.into();
        if !(min <= max) || !(step > 0.0) || !step.is_finite() {
            return Err(PanelError::InvalidRange { label, min, max, step });
        }
        self.push(
            label,
            Constraint::Range { min, max, step },
            Box::new(move |ctx| PanelValue::Number(get(ctx))),
            Box::new(move |ctx, value| {
                if let PanelValue::Number(value) = value {
                    set(ctx, value);
                }
            }),
        )
    }

    /// Add a checkbox
    pub fn add_toggle(
        &mut self,
        label: impl Into<String>,
        get: impl Fn(&C) -> bool + 'static,
        set: impl Fn(&mut C, bool) + 'static,
    ) -> Result<(), PanelError> {
        self.push(
            label.into(),
            Constraint::Toggle,
            Box::new(move |ctx| PanelValue::Toggle(get(ctx))),
            Box::new(move |ctx, value| {
                if let PanelValue::Toggle(value) = value {
                    set(ctx, value);
                }
            }),
        )
    }

    /// Add a colour picker working in `0xRRGGBB`
    pub fn add_color(
        &mut self,
        label: impl Into<String>,
        get: impl Fn(&C) -> u32 + 'static,
        set: impl Fn(&mut C, u32) + 'static,
    ) -> Result<(), PanelError> {
        self.push(
            label.into(),
            Constraint::Color,
            Box::new(move |ctx| PanelValue::Color(get(ctx))),
            Box::new(move |ctx, value| {
                if let PanelValue::Color(hex) = value {
                    set(ctx, hex);
                }
            }),
        )
    }

    /// Add a dropdown over named options, bound by index
    pub fn add_choice<S: AsRef<str>>(
        &mut self,
        label: impl Into<String>,
        options: &[S],
        get: impl Fn(&C) -> usize + 'static,
        set: impl Fn(&mut C, usize) + 'static,
    ) -> Result<(), PanelError> {
        let label = label.into();
        if options.is_empty() {
            return Err(PanelError::NoOptions(label));
        }
        let options = options.iter().map(|o| o.as_ref().to_string()).collect();
        self.push(
            label,
            Constraint::Choice(options),
            Box::new(move |ctx| PanelValue::Choice(get(ctx))),
            Box::new(move |ctx, value| {
                if let PanelValue::Choice(index) = value {
                    set(ctx, index);
                }
            }),
        )
    }

    fn index_of(&self, label: &str) -> Result<usize, PanelError> {
        self.controls
            .iter()
            .position(|c| c.label == label)
            .ok_or_else(|| PanelError::UnknownControl(label.to_string()))
    }

    /// Current value of a control, read through its getter
    pub fn value(&self, ctx: &C, label: &str) -> Result<PanelValue, PanelError> {
        let control = &self.controls[self.index_of(label)?];
        Ok((control.get)(ctx))
    }

    /// Write a value through a control's setter
    ///
    /// Numbers are snapped to the step and clamped to the range, colours are
    /// masked to 24 bits. Returns the value actually written.
    pub fn set(&self, ctx: &mut C, label: &str, value: PanelValue) -> Result<PanelValue, PanelError> {
        let index = self.index_of(label)?;
        self.apply(ctx, index, value)
    }

    fn apply(&self, ctx: &mut C, index: usize, value: PanelValue) -> Result<PanelValue, PanelError> {
        let control = &self.controls[index];
        let mismatch = || PanelError::TypeMismatch {
            label: control.label.clone(),
            expected: control.constraint.kind(),
            found: value.kind(),
        };

        let value = match (&control.constraint, value) {
            (Constraint::Range { min, max, step }, PanelValue::Number(v)) => {
                if !v.is_finite() {
                    return Err(PanelError::NotFinite {
                        label: control.label.clone(),
                        value: v,
                    });
                }
                PanelValue::Number(snap(v, *min, *max, *step))
            }
            (Constraint::Toggle, PanelValue::Toggle(_)) => value,
            (Constraint::Color, PanelValue::Color(hex)) => PanelValue::Color(hex & 0x00ff_ffff),
            (Constraint::Choice(options), PanelValue::Choice(i)) => {
                if i >= options.len() {
                    return Err(PanelError::ChoiceOutOfRange {
                        label: control.label.clone(),
                        index: i,
                        count: options.len(),
                    });
                }
                value
            }
            _ => return Err(mismatch()),
        };

        (control.set)(ctx, value);
        log::debug!("Panel: {} = {}", control.label, value);
        Ok(value)
    }

    /// Label of the control under the keyboard cursor
    pub fn selected(&self) -> Option<&str> {
        self.controls.get(self.selected).map(|c| c.label.as_str())
    }

    /// Move the cursor to the next control, wrapping
    pub fn select_next(&mut self) {
        if !self.controls.is_empty() {
            self.selected = (self.selected + 1) % self.controls.len();
        }
    }

    /// Move the cursor to the previous control, wrapping
    pub fn select_prev(&mut self) {
        if !self.controls.is_empty() {
            self.selected = (self.selected + self.controls.len() - 1) % self.controls.len();
        }
    }

    /// Step the selected control by `steps`
    ///
    /// Sliders move by whole steps, toggles flip on an odd count, choices
    /// cycle and colours rotate their hue by 1/120 turn per step.
    pub fn nudge(&self, ctx: &mut C, steps: i32) -> Result<Option<PanelValue>, PanelError> {
        let Some(control) = self.controls.get(self.selected) else {
            return Ok(None);
        };
        let current = (control.get)(ctx);
        let next = match (&control.constraint, current) {
            (Constraint::Range { step, .. }, PanelValue::Number(v)) => PanelValue::Number(v + step * steps as f32),
            (Constraint::Toggle, PanelValue::Toggle(on)) => PanelValue::Toggle(on ^ (steps % 2 != 0)),
            (Constraint::Choice(options), PanelValue::Choice(i)) => {
                let count = options.len() as i64;
                PanelValue::Choice((i as i64 + i64::from(steps)).rem_euclid(count) as usize)
            }
            (Constraint::Color, PanelValue::Color(hex)) => {
                let mut color = Color::from_hex(hex);
                color.offset_hsl(steps as f32 / 120.0, 0.0, 0.0);
                PanelValue::Color(color.to_hex())
            }
            _ => current,
        };
        self.apply(ctx, self.selected, next).map(Some)
    }

    /// Snapshot of every control
    pub fn entries(&self, ctx: &C) -> Vec<PanelEntry> {
        self.controls
            .iter()
            .enumerate()
            .map(|(i, c)| PanelEntry {
                label: c.label.clone(),
                value: (c.get)(ctx),
                constraint: c.constraint.clone(),
                selected: i == self.selected,
            })
            .collect()
    }

    /// Multi-line text rendition of the panel
    pub fn describe(&self, ctx: &C) -> String {
        let mut text = format!("[{}]\n", self.title);
        for entry in self.entries(ctx) {
            text.push_str(&entry.to_string());
            text.push('\n');
        }
        text
    }
}

fn snap(value: f32, min: f32, max: f32, step: f32) -> f32 {
    let snapped = (value / step).round() * step;
    // Recover from float noise such as 0.30000001
    let snapped = (snapped / step).round() * step;
    snapped.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct State {
        intensity: f32,
        shadows: bool,
        color: u32,
        mode: usize,
    }

    fn panel() -> DebugPanel<State> {
        let mut panel = DebugPanel::new("test");
        panel
            .add_range("intensity", 0.0, 10.0, 0.001, |s: &State| s.intensity, |s: &mut State, v| s.intensity = v)
            .unwrap();
        panel.add_toggle("shadows", |s: &State| s.shadows, |s: &mut State, v| s.shadows = v).unwrap();
        panel.add_color("color", |s: &State| s.color, |s: &mut State, v| s.color = v).unwrap();
        panel
            .add_choice("mode", &["a", "b", "c"], |s: &State| s.mode, |s: &mut State, v| s.mode = v)
            .unwrap();
        panel
    }

    #[test]
    fn test_reads_are_live() {
        let panel = panel();
        let mut state = State::default();
        state.intensity = 2.5;
        assert_eq!(panel.value(&state, "intensity"), Ok(PanelValue::Number(2.5)));
        state.intensity = 7.0;
        assert_eq!(panel.value(&state, "intensity"), Ok(PanelValue::Number(7.0)));
    }

    #[test]
    fn test_range_is_clamped_and_snapped() {
        let panel = panel();
        let mut state = State::default();

        panel.set(&mut state, "intensity", PanelValue::Number(42.0)).unwrap();
        assert_relative_eq!(state.intensity, 10.0);
        panel.set(&mut state, "intensity", PanelValue::Number(-1.0)).unwrap();
        assert_relative_eq!(state.intensity, 0.0);
        panel.set(&mut state, "intensity", PanelValue::Number(1.23456)).unwrap();
        assert_relative_eq!(state.intensity, 1.235, epsilon = 1e-5);
    }

    #[test]
    fn test_color_round_trip() {
        let panel = panel();
        let mut state = State::default();
        panel.set(&mut state, "color", PanelValue::Color(0xff00ff)).unwrap();
        assert_eq!(panel.value(&state, "color"), Ok(PanelValue::Color(0xff00ff)));
        let written = panel.set(&mut state, "color", PanelValue::Color(0xaa12_3456)).unwrap();
        assert_eq!(written, PanelValue::Color(0x12_3456));
    }

    #[test]
    fn test_errors() {
        let mut panel = panel();
        let mut state = State::default();

        assert!(matches!(
            panel.set(&mut state, "shadows", PanelValue::Number(1.0)),
            Err(PanelError::TypeMismatch { expected: "toggle", found: "number", .. })
        ));
        assert!(matches!(panel.value(&state, "nope"), Err(PanelError::UnknownControl(_))));
        state.intensity = 2.5;
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(matches!(
                panel.set(&mut state, "intensity", PanelValue::Number(bad)),
                Err(PanelError::NotFinite { .. })
            ));
        }
        assert_relative_eq!(state.intensity, 2.5);
        assert!(matches!(
            panel.set(&mut state, "mode", PanelValue::Choice(3)),
            Err(PanelError::ChoiceOutOfRange { count: 3, .. })
        ));
        assert!(matches!(
            panel.add_toggle("shadows", |_: &State| true, |_: &mut State, _| {}),
            Err(PanelError::DuplicateLabel(_))
        ));
        assert!(matches!(
            panel.add_range("bad", 1.0, 0.0, 0.1, |_: &State| 0.0, |_: &mut State, _| {}),
            Err(PanelError::InvalidRange { .. })
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(
            panel.add_choice("none", &empty, |_: &State| 0, |_: &mut State, _| {}),
            Err(PanelError::NoOptions(_))
        ));
    }

    #[test]
    fn test_selection_and_nudge() {
        let mut panel = panel();
        let mut state = State::default();

        assert_eq!(panel.selected(), Some("intensity"));
        panel.nudge(&mut state, 10).unwrap();
        assert_relative_eq!(state.intensity, 0.01, epsilon = 1e-6);

        panel.select_next();
        assert_eq!(panel.selected(), Some("shadows"));
        panel.nudge(&mut state, 1).unwrap();
        assert!(state.shadows);

        panel.select_prev();
        panel.select_prev();
        assert_eq!(panel.selected(), Some("mode"));
        panel.nudge(&mut state, -1).unwrap();
        assert_eq!(state.mode, 2);
    }

    #[test]
    fn test_describe_lists_every_control() {
        let panel = panel();
        let state = State { mode: 1, ..State::default() };
        let text = panel.describe(&state);
        assert!(text.starts_with("[test]"));
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("b  (a | b | c)"));
    }

    #[test]
    fn test_debug_output_lists_labels() {
        let text = format!("{:?}", panel());
        assert!(text.contains("\"intensity\", \"shadows\", \"color\", \"mode\""), "{text}");
    }
}
