use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Counts presented frames and reports the rate once per rolling one second
/// window.
pub struct FrameRate {
    frames: u32,
    window_start: Instant,
}

impl FrameRate {
    pub fn new(now: Instant) -> FrameRate {
        FrameRate {
            frames: 0,
            window_start: now,
        }
    }

    /// Records a frame presented at `now`. Once more than a second has passed
    /// since the window started, returns the frames per second over it and
    /// starts a new window.
    pub fn frame(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed <= WINDOW {
            return None;
        }
        let fps = self.frames as f64 / elapsed.as_secs_f64();
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}
