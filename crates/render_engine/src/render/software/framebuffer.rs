//! Colour + depth render target

/// RGBA8 colour buffer with a matching depth buffer
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<[u8; 4]>,
    depth: Vec<f32>,
}

impl Framebuffer {
    /// Allocate a cleared target; zero dimensions are raised to one
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let len = (width * height) as usize;
        Self {
            width,
            height,
            color: vec![[0, 0, 0, 255]; len],
            depth: vec![1.0; len],
        }
    }

    /// Reallocate when the size changes
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width.max(1), height.max(1)) != (self.width, self.height) {
            *self = Self::new(width, height);
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill colour and reset depth to the far plane
    pub fn clear(&mut self, color: [u8; 4]) {
        self.color.fill(color);
        self.depth.fill(1.0);
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) as usize)
    }

    /// Keep `depth` if it is nearer than what is stored; returns whether it passed
    pub fn depth_test(&mut self, x: u32, y: u32, depth: f32) -> bool {
        match self.index(x, y) {
            Some(i) if depth < self.depth[i] => {
                self.depth[i] = depth;
                true
            }
            _ => false,
        }
    }

    /// Stored depth
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        self.index(x, y).map(|i| self.depth[i])
    }

    /// Write a pixel, ignoring out-of-bounds coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if let Some(i) = self.index(x, y) {
            self.color[i] = color;
        }
    }

    /// Read a pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.index(x, y).map(|i| self.color[i])
    }

    /// Colour buffer as tightly packed RGBA8 bytes, row 0 at the top
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_test_keeps_nearest() {
        let mut target = Framebuffer::new(2, 2);
        assert!(target.depth_test(1, 1, 0.5));
        assert!(!target.depth_test(1, 1, 0.7));
        assert!(target.depth_test(1, 1, 0.2));
        assert_eq!(target.depth_at(1, 1), Some(0.2));
        assert!(!target.depth_test(5, 5, 0.0));
    }

    #[test]
    fn test_bytes_are_row_major_rgba() {
        let mut target = Framebuffer::new(2, 1);
        target.set_pixel(1, 0, [10, 20, 30, 40]);
        assert_eq!(target.as_bytes(), &[0, 0, 0, 255, 10, 20, 30, 40]);
    }
}
