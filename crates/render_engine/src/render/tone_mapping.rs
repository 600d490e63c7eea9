//! HDR to display tone mapping
//!
//! Operators map linear scene radiance into `[0, 1]` before sRGB encoding.
//! The curves match the ones commonly used by real-time web renderers so the
//! panel choices look the way artists expect.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat3, Vec3};
use crate::render::color::linear_to_srgb;

/// Tone mapping operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToneMapping {
    /// Pass through, clamped on output; exposure is ignored
    None,
    /// Exposure scale then clamp
    Linear,
    /// `c / (1 + c)`
    Reinhard,
    /// Optimized filmic curve (Hejl/Burgess-Dawson)
    Cineon,
    /// ACES RRT+ODT fit
    #[default]
    AcesFilmic,
}

impl ToneMapping {
    /// All operators, in panel order
    pub const ALL: [Self; 5] = [Self::None, Self::Linear, Self::Reinhard, Self::Cineon, Self::AcesFilmic];

    /// Panel label
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Linear => "Linear",
            Self::Reinhard => "Reinhard",
            Self::Cineon => "Cineon",
            Self::AcesFilmic => "ACESFilmic",
        }
    }

    /// Position in [`ALL`](Self::ALL)
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&m| m == self).unwrap_or(0)
    }

    /// Operator at `index` in [`ALL`](Self::ALL)
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Operator with the given panel label
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label().eq_ignore_ascii_case(label))
    }

    /// Map linear radiance to display-linear `[0, 1]`
    pub fn apply(self, color: Vec3, exposure: f32) -> Vec3 {
        let mapped = match self {
            Self::None => color,
            Self::Linear => color * exposure,
            Self::Reinhard => {
                let c = color * exposure;
                c.map(|x| x / (1.0 + x))
            }
            Self::Cineon => {
                let c = (color * exposure).map(|x| (x - 0.004).max(0.0));
                c.map(|x| ((x * (6.2 * x + 0.5)) / (x * (6.2 * x + 1.7) + 0.06)).powf(2.2))
            }
            Self::AcesFilmic => aces_filmic(color * (exposure / 0.6)),
        };
        mapped.map(|x| x.clamp(0.0, 1.0))
    }

    /// Tone map then encode to 8-bit sRGB
    pub fn resolve(self, color: Vec3, exposure: f32) -> [u8; 3] {
        let mapped = self.apply(color, exposure);
        let encode = |x: f32| (linear_to_srgb(x) * 255.0).round().clamp(0.0, 255.0) as u8;
        [encode(mapped.x), encode(mapped.y), encode(mapped.z)]
    }
}

impl fmt::Display for ToneMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn aces_filmic(color: Vec3) -> Vec3 {
    // sRGB => XYZ => D65_2_D60 => AP1 => RRT_SAT
    let input = Mat3::new(
        0.597_19, 0.354_58, 0.048_23,
        0.076_00, 0.908_34, 0.015_66,
        0.028_40, 0.133_83, 0.837_77,
    );
    // ODT_SAT => XYZ => D60_2_D65 => sRGB
    let output = Mat3::new(
        1.604_75, -0.531_08, -0.073_67,
        -0.102_08, 1.108_13, -0.006_05,
        -0.003_27, -0.072_76, 1.076_02,
    );

    let v = input * color;
    let fitted = v.map(|x| {
        let a = x * (x + 0.024_578_6) - 0.000_090_537;
        let b = x * (0.983_729 * x + 0.432_951) + 0.238_081;
        a / b
    });
    output * fitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_none_ignores_exposure() {
        let c = Vec3::new(0.25, 0.5, 2.0);
        assert_relative_eq!(ToneMapping::None.apply(c, 8.0), Vec3::new(0.25, 0.5, 1.0));
    }

    #[test]
    fn test_linear_scales_and_clamps() {
        let c = Vec3::new(0.1, 0.3, 0.6);
        assert_relative_eq!(ToneMapping::Linear.apply(c, 2.0), Vec3::new(0.2, 0.6, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_reinhard_half_at_one() {
        let mapped = ToneMapping::Reinhard.apply(Vec3::repeat(1.0), 1.0);
        assert_relative_eq!(mapped, Vec3::repeat(0.5), epsilon = 1e-6);
    }

    #[test]
    fn test_cineon_black_point() {
        assert_relative_eq!(ToneMapping::Cineon.apply(Vec3::repeat(0.004), 1.0), Vec3::zeros());
    }

    #[test]
    fn test_aces_is_monotonic_and_bounded() {
        let mut previous = -1.0;
        for step in 0..64 {
            let x = step as f32 * 0.25;
            let y = ToneMapping::AcesFilmic.apply(Vec3::repeat(x), 1.0).x;
            assert!(y >= previous, "ACES not monotonic at {x}");
            assert!((0.0..=1.0).contains(&y));
            previous = y;
        }
        assert!(ToneMapping::AcesFilmic.apply(Vec3::zeros(), 1.0).x < 0.01);
        assert!(ToneMapping::AcesFilmic.apply(Vec3::repeat(100.0), 1.0).x > 0.95);
    }

    #[test]
    fn test_panel_order_and_labels() {
        let labels: Vec<_> = ToneMapping::ALL.iter().map(|m| m.label()).collect();
        assert_eq!(labels, ["None", "Linear", "Reinhard", "Cineon", "ACESFilmic"]);
        for (i, mode) in ToneMapping::ALL.into_iter().enumerate() {
            assert_eq!(mode.index(), i);
            assert_eq!(ToneMapping::from_index(i), Some(mode));
            assert_eq!(ToneMapping::from_label(mode.label()), Some(mode));
        }
        assert_eq!(ToneMapping::from_index(5), None);
    }

    #[test]
    fn test_resolve_encodes_srgb() {
        assert_eq!(ToneMapping::Linear.resolve(Vec3::new(0.0, 1.0, 0.5), 1.0), [0, 255, 188]);
    }
}
