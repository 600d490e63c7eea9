//! Cooperative frame loop
//!
//! The loop runs one tick, checks the stop flag, then asks the host for the
//! next refresh. Hosts decide how a refresh is produced: a window waits on
//! vsync and pumps events, a headless host just counts frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What the host wants after a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSignal {
    /// Run another tick
    Continue,
    /// End the loop
    Stop,
}

/// Source of refresh signals
pub trait FrameHost<C> {
    /// Block until the next frame should run
    ///
    /// The host may update `ctx` here (input, resize) before the next tick.
    fn request_frame(&mut self, ctx: &mut C) -> FrameSignal;
}

/// Shared cancellation flag checked before each reschedule
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to finish after the current tick
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drive `tick` until the stop flag is set or the host stops
///
/// Returns the number of ticks run. An error from `tick` ends the loop and
/// is returned unchanged.
pub fn run_frame_loop<C, H, E>(
    host: &mut H,
    ctx: &mut C,
    stop: &StopFlag,
    mut tick: impl FnMut(&mut C) -> Result<(), E>,
) -> Result<u64, E>
where
    H: FrameHost<C>,
{
    let mut frames = 0_u64;
    log::info!("Frame loop started");
    loop {
        tick(ctx)?;
        frames += 1;
        log::trace!("Frame {} done", frames);

        if stop.is_stopped() {
            log::info!("Frame loop stopped by flag after {} frames", frames);
            break;
        }
        if host.request_frame(ctx) == FrameSignal::Stop {
            log::info!("Frame loop ended by host after {} frames", frames);
            break;
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Host that delivers a fixed number of refreshes
    struct Ticks {
        remaining: u32,
        requests: u32,
    }

    impl FrameHost<Vec<&'static str>> for Ticks {
        fn request_frame(&mut self, _ctx: &mut Vec<&'static str>) -> FrameSignal {
            self.requests += 1;
            if self.remaining == 0 {
                return FrameSignal::Stop;
            }
            self.remaining -= 1;
            FrameSignal::Continue
        }
    }

    #[test]
    fn test_each_tick_updates_then_renders() {
        let mut host = Ticks { remaining: 4, requests: 0 };
        let mut calls = Vec::new();
        let frames = run_frame_loop(&mut host, &mut calls, &StopFlag::new(), |calls| {
            calls.push("update");
            calls.push("render");
            Ok::<(), ()>(())
        })
        .unwrap();

        // Initial tick plus one per granted refresh
        assert_eq!(frames, 5);
        assert_eq!(calls.len(), 10);
        assert!(calls.chunks(2).all(|pair| pair == ["update", "render"]));
        assert_eq!(host.requests, 5);
    }

    #[test]
    fn test_stop_flag_is_checked_before_reschedule() {
        let mut host = Ticks { remaining: u32::MAX, requests: 0 };
        let stop = StopFlag::new();
        let remote = stop.clone();
        let mut calls = Vec::new();
        let frames = run_frame_loop(&mut host, &mut calls, &stop, |calls| {
            calls.push("tick");
            if calls.len() == 3 {
                remote.stop();
            }
            Ok::<(), ()>(())
        })
        .unwrap();

        assert_eq!(frames, 3);
        assert_eq!(host.requests, 2);
    }

    #[test]
    fn test_tick_error_ends_loop() {
        let mut host = Ticks { remaining: u32::MAX, requests: 0 };
        let mut calls = Vec::new();
        let result = run_frame_loop(&mut host, &mut calls, &StopFlag::new(), |calls| {
            calls.push("tick");
            if calls.len() == 2 {
                Err("boom")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("boom"));
    }
}
