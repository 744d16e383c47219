use serde::{Deserialize, Serialize};

use crate::error::{DrillError, DrillResult};

/// A named proficiency tier reached at `threshold` consecutive correct answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub threshold: u32,
    pub name: String,
}

impl Tier {
    pub fn new(threshold: u32, name: impl Into<String>) -> Self {
        Self {
            threshold,
            name: name.into(),
        }
    }
}

pub fn default_tiers() -> Vec<Tier> {
    vec![
        Tier::new(0, "Beginner"),
        Tier::new(2, "Learner"),
        Tier::new(4, "Speller"),
        Tier::new(8, "Champion"),
    ]
}

/// Maps a streak to the tier with the greatest threshold not above it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTracker {
    tiers: Vec<Tier>,
}

impl LevelTracker {
    /// Tiers may come in any order but need a 0 threshold and no duplicates.
    pub fn new(mut tiers: Vec<Tier>) -> DrillResult<Self> {
        if tiers.is_empty() {
            return Err(DrillError::InvalidTiers("no tiers configured".into()));
        }
        tiers.sort_by_key(|t| t.threshold);
        if tiers[0].threshold != 0 {
            return Err(DrillError::InvalidTiers(
                "the first tier must start at streak 0".into(),
            ));
        }
        if let Some(pair) = tiers.windows(2).find(|w| w[0].threshold == w[1].threshold) {
            return Err(DrillError::InvalidTiers(format!(
                "'{}' and '{}' share threshold {}",
                pair[0].name, pair[1].name, pair[0].threshold
            )));
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier_for(&self, streak: u32) -> &Tier {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.threshold <= streak)
            .unwrap_or(&self.tiers[0])
    }

    /// Position of the current tier, 0 for the lowest
    pub fn rank(&self, streak: u32) -> usize {
        self.tiers
            .iter()
            .rposition(|t| t.threshold <= streak)
            .unwrap_or(0)
    }

    /// The next tier up and how many more correct answers it needs
    pub fn next_tier(&self, streak: u32) -> Option<(&Tier, u32)> {
        self.tiers
            .iter()
            .find(|t| t.threshold > streak)
            .map(|t| (t, t.threshold - streak))
    }

    /// The tier newly reached when the streak moves from `before` to `after`
    pub fn promotion(&self, before: u32, after: u32) -> Option<&Tier> {
        if self.rank(after) > self.rank(before) {
            Some(self.tier_for(after))
        } else {
            None
        }
    }
}

impl Default for LevelTracker {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
        }
    }
}
