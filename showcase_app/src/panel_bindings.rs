//! Debug panel controls
//!
//! Each group is registered at the bootstrap step that creates the object it
//! edits, so the panel lists controls in scene construction order.

use render_engine::debug::{DebugPanel, PanelError};
use render_engine::render::ToneMapping;

use crate::bootstrap::SceneState;

/// Slider resolution shared by every numeric control
const STEP: f32 = 0.001;

/// Panel type of the showcase
pub type ShowcasePanel = DebugPanel<SceneState>;

/// `environmentIntensity`
pub fn environment(panel: &mut ShowcasePanel) -> Result<(), PanelError> {
    panel.add_range(
        "environmentIntensity",
        0.0,
        10.0,
        STEP,
        |s: &SceneState| s.scene.environment_intensity,
        |s: &mut SceneState, v| s.scene.environment_intensity = v,
    )
}

/// `lightIntensity`, `lightX`, `lightY`, `lightZ` and `color`
pub fn light(panel: &mut ShowcasePanel) -> Result<(), PanelError> {
    panel.add_range(
        "lightIntensity",
        0.0,
        10.0,
        STEP,
        |s: &SceneState| s.light().map_or(0.0, |l| l.intensity),
        |s: &mut SceneState, v| {
            if let Some(light) = s.light_mut() {
                light.intensity = v;
            }
        },
    )?;

    for (axis, label) in ["lightX", "lightY", "lightZ"].into_iter().enumerate() {
        panel.add_range(
            label,
            -10.0,
            10.0,
            STEP,
            move |s: &SceneState| s.light_position()[axis],
            move |s: &mut SceneState, v| s.set_light_axis(axis, v),
        )?;
    }

    panel.add_color(
        "color",
        |s: &SceneState| s.light().map_or(0, |l| l.color.to_hex()),
        |s: &mut SceneState, hex| {
            if let Some(light) = s.light_mut() {
                light.color.set_hex(hex);
            }
        },
    )
}

/// `castShadow`, `normalBias` and `bias`
pub fn shadow(panel: &mut ShowcasePanel) -> Result<(), PanelError> {
    panel.add_toggle(
        "castShadow",
        |s: &SceneState| s.light().is_some_and(|l| l.cast_shadow),
        |s: &mut SceneState, on| {
            if let Some(light) = s.light_mut() {
                light.cast_shadow = on;
            }
        },
    )?;
    panel.add_range(
        "normalBias",
        -0.05,
        0.05,
        STEP,
        |s: &SceneState| s.light().map_or(0.0, |l| l.shadow.normal_bias),
        |s: &mut SceneState, v| {
            if let Some(light) = s.light_mut() {
                light.shadow.normal_bias = v;
            }
        },
    )?;
    panel.add_range(
        "bias",
        -0.05,
        0.05,
        STEP,
        |s: &SceneState| s.light().map_or(0.0, |l| l.shadow.bias),
        |s: &mut SceneState, v| {
            if let Some(light) = s.light_mut() {
                light.shadow.bias = v;
            }
        },
    )
}

/// `toneMapping` and `toneMappingExposure`
pub fn tone_mapping(panel: &mut ShowcasePanel) -> Result<(), PanelError> {
    let labels = ToneMapping::ALL.map(ToneMapping::label);
    panel.add_choice(
        "toneMapping",
        &labels,
        |s: &SceneState| s.renderer.tone_mapping.index(),
        |s: &mut SceneState, index| {
            if let Some(mode) = ToneMapping::from_index(index) {
                s.renderer.tone_mapping = mode;
            }
        },
    )?;
    panel.add_range(
        "toneMappingExposure",
        0.0,
        10.0,
        STEP,
        |s: &SceneState| s.renderer.tone_mapping_exposure,
        |s: &mut SceneState, v| s.renderer.tone_mapping_exposure = v,
    )
}
