//! Time management utilities

use std::time::{Duration, Instant};

/// High-precision timer for frame timing
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since timer creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

/// Paces a loop to a fixed refresh interval
///
/// Used where no swapchain vsync is available to throttle presentation.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    next_deadline: Instant,
}

impl FramePacer {
    /// Create a pacer for the given refresh rate in Hz (clamped to at least 1 Hz)
    pub fn from_refresh_rate(refresh_hz: u32) -> Self {
        let interval = Duration::from_secs_f64(1.0 / f64::from(refresh_hz.max(1)));
        Self {
            interval,
            next_deadline: Instant::now() + interval,
        }
    }

    /// Interval between two refresh signals
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the next refresh deadline
    ///
    /// If the caller is already late the deadline is re-anchored to now instead
    /// of trying to catch up with a burst of frames.
    pub fn wait_next(&mut self) {
        let now = Instant::now();
        if now < self.next_deadline {
            std::thread::sleep(self.next_deadline - now);
            self.next_deadline += self.interval;
        } else {
            self.next_deadline = now + self.interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_counts_frames() {
        let mut timer = Timer::new();
        timer.update();
        timer.update();
        assert_eq!(timer.frame_count(), 2);
        assert!(timer.total_time() >= 0.0);
    }

    #[test]
    fn test_pacer_interval() {
        let pacer = FramePacer::from_refresh_rate(50);
        assert_eq!(pacer.interval(), Duration::from_millis(20));

        let clamped = FramePacer::from_refresh_rate(0);
        assert_eq!(clamped.interval(), Duration::from_secs(1));
    }
}
