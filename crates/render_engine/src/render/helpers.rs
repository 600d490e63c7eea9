//! Debug visualisation helpers

use crate::foundation::math::Vec3;
use crate::render::{camera::OrthographicCamera, Color};
use crate::scene::NodeId;

/// One coloured world-space line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    /// Segment start
    pub start: Vec3,
    /// Segment end
    pub end: Vec3,
    /// Line colour
    pub color: Color,
}

/// Outline of a directional light's shadow camera
///
/// The helper follows the light: its lines are rebuilt from the shadow
/// camera every frame, so moving the light or retargeting it moves the box.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraHelper {
    /// Scene node holding the directional light
    pub light: NodeId,
    /// Line colour
    pub color: Color,
}

/// Corner pairs of the view box, indices into [`OrthographicCamera::frustum_corners`]
const EDGES: [(usize, usize); 12] = [
    (0, 1), (1, 2), (2, 3), (3, 0),
    (4, 5), (5, 6), (6, 7), (7, 4),
    (0, 4), (1, 5), (2, 6), (3, 7),
];

impl CameraHelper {
    /// Helper for the light stored at `light`
    pub fn new(light: NodeId) -> Self {
        Self {
            light,
            color: Color::from_hex(0xffaa00),
        }
    }

    /// The twelve edges of the camera's view box
    pub fn lines(&self, camera: &OrthographicCamera) -> Vec<DebugLine> {
        let corners = camera.frustum_corners();
        EDGES
            .iter()
            .map(|&(a, b)| DebugLine {
                start: corners[a],
                end: corners[b],
                color: self.color,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_edges_follow_camera() {
        let helper = CameraHelper::new(NodeId::default());
        let mut camera = OrthographicCamera::new(-5.0, 5.0, 5.0, -5.0, 0.5, 15.0);
        camera.position = Vec3::new(0.0, 20.0, 0.0);
        camera.target = Vec3::zeros();
        camera.up = Vec3::z();

        let lines = helper.lines(&camera);
        assert_eq!(lines.len(), 12);

        // Near plane sits 0.5 below the light, far plane 15 below
        let near_y = lines[0].start.y;
        let far_y = lines[4].start.y;
        assert_relative_eq!(near_y, 19.5, epsilon = 1e-3);
        assert_relative_eq!(far_y, 5.0, epsilon = 1e-3);

        // Every edge is either 10 (box side) or 14.5 (depth) long
        for line in &lines {
            let length = (line.end - line.start).norm();
            assert!((length - 10.0).abs() < 1e-3 || (length - 14.5).abs() < 1e-3, "edge {length}");
        }
    }
}
