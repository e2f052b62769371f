use std::time::{Duration, Instant};
use winit::window::Window;

/// Caps scene ticks at the target rate. Time past a tick boundary is carried
/// into the next interval instead of being dropped, so the average rate holds
/// even when wakeups arrive late.
pub struct FrameTiming {
    frame_time: f32,
    pending: f32,
    last_wake: Option<Instant>,
    last_fps_time: Instant,
    tick_count: u32,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String, target_fps: f32) -> Self {
        Self {
            frame_time: 1.0 / target_fps.clamp(1.0, 1000.0),
            pending: 0.0,
            last_wake: None,
            last_fps_time: Instant::now(),
            tick_count: 0,
            base_title,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f32(self.frame_time)
    }

    /// Returns true when a scene tick is due at `now`.
    pub fn tick(&mut self, now: Instant) -> bool {
        let elapsed = match self.last_wake {
            Some(last) => now.saturating_duration_since(last).as_secs_f32(),
            None => self.frame_time,
        };
        self.last_wake = Some(now);
        self.pending += elapsed;
        if self.pending < self.frame_time {
            return false;
        }
        self.pending %= self.frame_time;
        self.tick_count = self.tick_count.saturating_add(1);
        true
    }

    pub fn update_title(&mut self, window: Option<&Window>, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed.as_secs_f32() < 0.5 {
            return;
        }
        let fps = self.tick_count as f32 / elapsed.as_secs_f32();
        if let Some(window) = window {
            window.set_title(&format!("{} - {:.1} fps", self.base_title, fps));
        }
        self.tick_count = 0;
        self.last_fps_time = now;
    }
}
