//! Kill-streak tracking with one-shot threshold notifications

use shared::streak_message;
use std::collections::BTreeSet;

/// A threshold reached for the first time in the current streak
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakMilestone {
    pub streak: u32,
    pub template: &'static str,
}

/// Consecutive kills without dying, plus the thresholds already announced
///
/// Thresholds are matched by exact value. A streak that jumps past a threshold
/// never announces it.
#[derive(Debug, Clone, Default)]
pub struct KillStreak {
    count: u32,
    notified: BTreeSet<u32>,
}

impl KillStreak {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Records one kill. Returns the milestone if the new count is an
    /// unannounced threshold, and marks it announced.
    pub fn add_kill(&mut self) -> Option<StreakMilestone> {
        self.count += 1;

        let template = streak_message(self.count)?;
        if !self.notified.insert(self.count) {
            return None;
        }

        Some(StreakMilestone {
            streak: self.count,
            template,
        })
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.notified.clear();
    }

    pub fn was_notified(&self, threshold: u32) -> bool {
        self.notified.contains(&threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_kills(streak: &mut KillStreak, kills: u32) -> Vec<u32> {
        (0..kills)
            .filter_map(|_| streak.add_kill())
            .map(|milestone| milestone.streak)
            .collect()
    }

    #[test]
    fn test_thresholds_fire_once_each() {
        let mut streak = KillStreak::new();
        let fired = run_kills(&mut streak, 12);
        assert_eq!(fired, vec![3, 5, 7, 9]);
        assert_eq!(streak.count(), 12);
    }

    #[test]
    fn test_reset_allows_threshold_again() {
        let mut streak = KillStreak::new();
        assert_eq!(run_kills(&mut streak, 3), vec![3]);
        assert!(streak.was_notified(3));

        streak.reset();
        assert_eq!(streak.count(), 0);
        assert!(!streak.was_notified(3));

        assert_eq!(run_kills(&mut streak, 3), vec![3]);
    }

    #[test]
    fn test_template_matches_threshold() {
        let mut streak = KillStreak::new();
        streak.add_kill();
        streak.add_kill();
        let milestone = streak.add_kill().unwrap();
        assert_eq!(milestone.streak, 3);
        assert_eq!(milestone.template, "is on a killing spree!");
    }

    #[test]
    fn test_no_milestone_between_thresholds() {
        let mut streak = KillStreak::new();
        assert!(streak.add_kill().is_none());
        assert!(streak.add_kill().is_none());
        assert!(streak.add_kill().is_some());
        assert!(streak.add_kill().is_none());
    }
}
