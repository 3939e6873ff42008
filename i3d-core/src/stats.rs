/// Frame telemetry
use std::fmt;

/// Optional per-frame telemetry sink, advanced last in every frame
pub trait Telemetry {
    fn update(&mut self, now_ms: f64);
}

/// Frames-per-second counter averaged over one-second windows
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    window_start: Option<f64>,
    frames: u32,
    fps: f32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn record(&mut self, now_ms: f64) {
        let start = *self.window_start.get_or_insert(now_ms);
        self.frames += 1;

        let elapsed = now_ms - start;
        if elapsed >= 1000.0 {
            self.fps = (self.frames as f64 * 1000.0 / elapsed) as f32;
            self.frames = 0;
            self.window_start = Some(now_ms);
        }
    }
}

impl Telemetry for FrameStats {
    fn update(&mut self, now_ms: f64) {
        self.record(now_ms);
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FPS: {:.1}", self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_window() {
        let mut stats = FrameStats::new();
        for frame in 0..=30 {
            stats.record(frame as f64 * 1000.0 / 30.0);
        }
        assert!((stats.fps() - 31.0).abs() < 0.5, "{}", stats.fps());
        assert_eq!(stats.to_string(), format!("FPS: {:.1}", stats.fps()));
    }

    #[test]
    fn test_no_fps_before_first_window() {
        let mut stats = FrameStats::new();
        stats.record(0.0);
        stats.record(500.0);
        assert_eq!(stats.fps(), 0.0);
    }
}
