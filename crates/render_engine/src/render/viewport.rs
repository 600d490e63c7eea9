//! Output surface dimensions

/// Upper bound applied to the device pixel ratio
///
/// High-density displays report ratios of 3 or more; rendering beyond 2x
/// costs far more than it visibly adds.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Logical size of the output surface plus the display's pixel density
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Logical width in window units
    pub width: u32,
    /// Logical height in window units
    pub height: u32,
    /// Pixel ratio reported by the display (before capping)
    pub device_pixel_ratio: f32,
}

impl Viewport {
    /// Create a viewport; zero dimensions are raised to one so the aspect stays finite
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            device_pixel_ratio,
        }
    }

    /// Width divided by height
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Pixel ratio to render with
    pub fn pixel_ratio(&self) -> f32 {
        capped_pixel_ratio(self.device_pixel_ratio)
    }
}

/// Clamp a reported device pixel ratio to [`MAX_PIXEL_RATIO`]
///
/// Non-finite or non-positive reports fall back to 1.
pub fn capped_pixel_ratio(device_pixel_ratio: f32) -> f32 {
    if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio.min(MAX_PIXEL_RATIO)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_ratio_is_capped_at_two() {
        for ratio in [0.5_f32, 1.0, 1.25, 1.5, 2.0, 2.5, 3.0, 4.0] {
            assert_eq!(capped_pixel_ratio(ratio), ratio.min(2.0));
        }
    }

    #[test]
    fn test_invalid_ratio_falls_back() {
        assert_eq!(capped_pixel_ratio(0.0), 1.0);
        assert_eq!(capped_pixel_ratio(f32::NAN), 1.0);
        assert_eq!(capped_pixel_ratio(-2.0), 1.0);
    }

    #[test]
    fn test_aspect() {
        let viewport = Viewport::new(1920, 1080, 3.0);
        assert_eq!(viewport.aspect(), 1920.0 / 1080.0);
        assert_eq!(viewport.pixel_ratio(), 2.0);
    }
}
