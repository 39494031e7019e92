//! Helpers that turn raw window-system input into camera events.

use instant::{Duration, Instant};

use crate::camera::{Camera, CameraMovement};

/// Converts absolute cursor positions into look deltas.
///
/// The first position only primes the tracker, otherwise the jump from the
/// initial position to wherever the cursor entered the window would whip the
/// camera around. Screen Y grows downwards, so the vertical delta is inverted.
#[derive(Debug, Clone, Default)]
pub struct CursorTracker {
    last: Option<(f32, f32)>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a known position (e.g. the window centre) instead of waiting for the first event.
    pub fn with_position(x: f32, y: f32) -> Self {
        Self { last: Some((x, y)) }
    }

    /// Returns the `(x_offset, y_offset)` since the previous call.
    pub fn offset(&mut self, x: f32, y: f32) -> (f32, f32) {
        let (last_x, last_y) = self.last.unwrap_or((x, y));
        self.last = Some((x, y));
        (x - last_x, last_y - y)
    }

    /// Feeds a cursor position straight into `camera` with pitch constrained.
    pub fn apply(&mut self, camera: &mut Camera, x: f32, y: f32) {
        let (x_offset, y_offset) = self.offset(x, y);
        camera.process_mouse_movement(x_offset, y_offset, true);
    }

    /// Forget the last position, e.g. after the cursor was released and recaptured.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Frame-to-frame timer feeding [`Camera::process_keyboard`].
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_frame: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
        }
    }

    /// Time elapsed since the previous tick (or since construction).
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        delta
    }

    /// Ticks and applies every held direction for the elapsed time.
    pub fn advance(&mut self, camera: &mut Camera, held: &[CameraMovement]) -> Duration {
        let delta = self.tick();
        for &direction in held {
            camera.process_keyboard(direction, delta.as_secs_f32());
        }
        delta
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cursor_event_produces_no_offset() {
        let mut tracker = CursorTracker::new();
        assert_eq!(tracker.offset(400.0, 300.0), (0.0, 0.0));
        assert_eq!(tracker.offset(410.0, 290.0), (10.0, 10.0));
        assert_eq!(tracker.offset(405.0, 300.0), (-5.0, -10.0));
    }

    #[test]
    fn seeded_tracker_reports_first_delta() {
        let mut tracker = CursorTracker::with_position(400.0, 300.0);
        assert_eq!(tracker.offset(420.0, 300.0), (20.0, 0.0));

        tracker.reset();
        assert_eq!(tracker.offset(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn cursor_moves_rotate_the_camera() {
        let mut camera = Camera::default();
        let mut tracker = CursorTracker::with_position(0.0, 0.0);

        tracker.apply(&mut camera, 100.0, -50.0);

        assert!((camera.yaw().0 - (-80.0)).abs() < 1e-4);
        assert!((camera.pitch().0 - 5.0).abs() < 1e-4);
    }

    #[test]
    fn clock_ticks_are_monotonic() {
        let mut clock = FrameClock::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let first = clock.tick();
        assert!(first >= Duration::from_millis(2));

        let mut camera = Camera::default();
        let start = camera.position;
        clock.advance(&mut camera, &[]);
        assert_eq!(camera.position, start);
    }
}
