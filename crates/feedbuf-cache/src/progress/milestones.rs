//! Progress milestones.

/// Default milestone spacing.
pub const DEFAULT_STEP_PERCENT: u8 = 25;

/// Milestone tracker for one download.
///
/// Reports a percentage only when a new multiple of the step has been
/// crossed. Downloads of unknown size never report.
#[derive(Debug, Clone)]
pub struct ProgressMilestones {
    step: u8,
    last: u8,
}

impl ProgressMilestones {
    /// Create a tracker with the given spacing.
    ///
    /// The spacing is clamped to `DEFAULT_STEP_PERCENT..=100`.
    pub fn new(step_percent: u8) -> Self {
        Self {
            step: step_percent.clamp(DEFAULT_STEP_PERCENT, 100),
            last: 0,
        }
    }

    /// Observe a progress sample and return the milestone it crossed, if any.
    pub fn observe(&mut self, downloaded: u64, total: Option<u64>) -> Option<u8> {
        let total = total.filter(|t| *t > 0)?;
        let percent = downloaded.saturating_mul(100) / total;
        let percent = u8::try_from(percent.min(100)).unwrap_or(100);
        let milestone = percent / self.step * self.step;

        if milestone > self.last {
            self.last = milestone;
            Some(milestone)
        } else {
            None
        }
    }

    /// The last reported milestone (0 before the first one).
    pub const fn last(&self) -> u8 {
        self.last
    }
}

impl Default for ProgressMilestones {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_PERCENT)
    }
}
