//! Ready-edge detection.

/// Latches the first time a countdown is observed at zero.
///
/// A level check (`remaining == 0`) is true on every tick after completion;
/// this turns it into a single event per resource instance, however often the
/// poller ticks and even if the clock later steps backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadyEdge {
    fired: bool,
}

impl ReadyEdge {
    /// A detector that has not fired.
    #[must_use]
    pub const fn new() -> Self {
        Self { fired: false }
    }

    /// Feed one observation. Returns `true` exactly once: on the first
    /// observation at zero.
    pub fn observe(&mut self, remaining_ms: u64) -> bool {
        if remaining_ms == 0 && !self.fired {
            self.fired = true;
            true
        } else {
            false
        }
    }

    /// Whether the edge has already fired.
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_across_boundary() {
        let mut edge = ReadyEdge::new();
        let ticks = [3000, 2000, 1000, 0, 0, 0];
        let fired = ticks.iter().filter(|&&ms| edge.observe(ms)).count();
        assert_eq!(fired, 1);
        assert!(edge.has_fired());
    }

    #[test]
    fn test_fires_on_first_observation_when_already_done() {
        let mut edge = ReadyEdge::new();
        assert!(edge.observe(0));
        assert!(!edge.observe(0));
    }

    #[test]
    fn test_clock_stepping_back_does_not_refire() {
        let mut edge = ReadyEdge::new();
        assert!(edge.observe(0));
        assert!(!edge.observe(5000));
        assert!(!edge.observe(0));
    }

    #[test]
    fn test_silent_while_counting() {
        let mut edge = ReadyEdge::new();
        assert!(!edge.observe(10));
        assert!(!edge.has_fired());
    }
}
