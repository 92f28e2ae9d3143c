//! Terminal-geometry change detection.

use tether_core::TerminalSize;

/// Where the current terminal geometry comes from.
///
/// Returning `None` (geometry unavailable) skips the tick entirely —
/// it is not an error.
pub trait GeometrySource {
    fn current(&self) -> Option<TerminalSize>;
}

/// Reads geometry from the local terminal via crossterm.
pub struct LocalTerminal;

impl GeometrySource for LocalTerminal {
    fn current(&self) -> Option<TerminalSize> {
        if let Ok(ws) = crossterm::terminal::window_size() {
            return Some(TerminalSize::new(ws.rows, ws.columns, ws.width, ws.height));
        }
        // Some terminals report rows/cols but no pixel dimensions.
        crossterm::terminal::size()
            .ok()
            .map(|(cols, rows)| TerminalSize::new(rows, cols, 0, 0))
    }
}

/// Compares the current geometry against the last value sent to the
/// server and reports only genuine changes. Owns exactly one
/// "last-sent" snapshot for the session's lifetime.
#[derive(Debug, Default)]
pub struct ResizeDetector {
    last_sent: TerminalSize,
}

impl ResizeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new geometry if it differs from the last one sent,
    /// updating the snapshot; `None` when nothing changed.
    pub fn check(&mut self, current: TerminalSize) -> Option<TerminalSize> {
        if current == self.last_sent {
            return None;
        }
        self.last_sent = current;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_geometry_is_reported() {
        let mut detector = ResizeDetector::new();
        assert_eq!(
            detector.check(TerminalSize::new(24, 80, 0, 0)),
            Some(TerminalSize::new(24, 80, 0, 0))
        );
    }

    #[test]
    fn unchanged_geometry_is_silent() {
        let mut detector = ResizeDetector::new();
        let size = TerminalSize::new(24, 80, 0, 0);
        detector.check(size);
        for _ in 0..100 {
            assert_eq!(detector.check(size), None);
        }
    }

    #[test]
    fn reversion_is_a_change() {
        let mut detector = ResizeDetector::new();
        let small = TerminalSize::new(24, 80, 0, 0);
        let tall = TerminalSize::new(30, 80, 0, 0);

        detector.check(small);
        // Grow, then shrink back: both transitions must be reported.
        assert_eq!(detector.check(tall), Some(tall));
        assert_eq!(detector.check(small), Some(small));
        assert_eq!(detector.check(small), None);
    }

    #[test]
    fn pixel_only_change_counts() {
        let mut detector = ResizeDetector::new();
        detector.check(TerminalSize::new(24, 80, 0, 0));
        assert!(detector.check(TerminalSize::new(24, 80, 640, 480)).is_some());
    }
}
