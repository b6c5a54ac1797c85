//! Time management utilities

use std::time::{Duration, Instant};

/// Paces a frame loop towards a fixed target rate.
///
/// Call [`FramePacer::pace`] once per frame; it sleeps off whatever remains of
/// the current frame's time budget. Rendering that already took longer than
/// the budget is not penalized.
pub struct FramePacer {
    frame_budget: Duration,
    last: Instant,
}

impl FramePacer {
    /// Create a pacer for the given target frame rate.
    ///
    /// A target of zero is clamped to one frame per second.
    pub fn new(target_fps: u32) -> Self {
        Self {
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1))),
            last: Instant::now(),
        }
    }

    /// The time budget of a single frame.
    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    /// Sleep off the remainder of the current frame's budget.
    pub fn pace(&mut self) {
        let elapsed = self.last.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
        self.last = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_budget_matches_target_rate() {
        let pacer = FramePacer::new(60);
        let millis = pacer.frame_budget().as_secs_f64() * 1000.0;
        assert!((millis - 16.666).abs() < 0.1);
    }

    #[test]
    fn zero_target_is_clamped() {
        let pacer = FramePacer::new(0);
        assert_eq!(pacer.frame_budget(), Duration::from_secs(1));
    }

    #[test]
    fn pace_sleeps_off_the_budget() {
        let mut pacer = FramePacer::new(200);
        let start = Instant::now();
        pacer.pace();
        pacer.pace();
        // Two frames at 5 ms each; allow generous scheduling slack.
        assert!(start.elapsed() >= Duration::from_millis(8));
    }
}
