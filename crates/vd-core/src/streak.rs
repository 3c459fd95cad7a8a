//! Daily streak engine.
//!
//! Streaks advance by at most one per calendar day. Milestones flip to
//! achieved once the count reaches their threshold and stay achieved, even
//! across a reset. All operations are pure: state goes in, new state comes
//! out, and the caller decides what to persist.

use crate::types::Category;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Horizon (days) used by both progress formulas.
const PROGRESS_HORIZON_DAYS: f32 = 365.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreakError {
    #[error("date of birth not set; the virgin streak starts from it")]
    BirthDateNotSet,
}

/// Streak count and last check-in for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub category: Category,
    pub count: u32,
    pub last_check_in: Option<NaiveDate>,
}

impl StreakState {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            count: 0,
            last_check_in: None,
        }
    }

    pub fn checked_in_on(&self, day: NaiveDate) -> bool {
        self.last_check_in == Some(day)
    }
}

/// A day-count threshold that unlocks a reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub threshold_days: u32,
    pub reward: String,
    #[serde(default)]
    pub achieved: bool,
}

impl Milestone {
    pub fn new(threshold_days: u32, reward: impl Into<String>) -> Self {
        Self {
            threshold_days,
            reward: reward.into(),
            achieved: false,
        }
    }
}

/// Outcome of [`advance_streak`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub state: StreakState,
    /// The full milestone list with updated `achieved` flags.
    pub milestones: Vec<Milestone>,
    /// Milestones crossed by this call, in catalog order.
    pub newly_achieved: Vec<Milestone>,
    /// False when `today` was already checked in.
    pub advanced: bool,
}

/// Advance a streak by one day.
///
/// A second call on the same calendar day returns the state and milestones
/// unchanged with nothing newly achieved.
pub fn advance_streak(state: &StreakState, today: NaiveDate, milestones: &[Milestone]) -> Advance {
    if state.checked_in_on(today) {
        tracing::debug!(category = %state.category, %today, "already checked in today");
        return Advance {
            state: state.clone(),
            milestones: milestones.to_vec(),
            newly_achieved: Vec::new(),
            advanced: false,
        };
    }

    let next = StreakState {
        category: state.category,
        count: state.count.saturating_add(1),
        last_check_in: Some(today),
    };

    let mut newly_achieved = Vec::new();
    let milestones: Vec<Milestone> = milestones
        .iter()
        .map(|m| {
            let mut m = m.clone();
            if !m.achieved && next.count >= m.threshold_days {
                m.achieved = true;
                newly_achieved.push(m.clone());
            }
            m
        })
        .collect();

    tracing::debug!(
        category = %next.category,
        count = next.count,
        newly_achieved = newly_achieved.len(),
        "streak advanced"
    );

    Advance {
        state: next,
        milestones,
        newly_achieved,
        advanced: true,
    }
}

/// A fresh streak for `category`. Milestone flags are not part of the state
/// and are left as they are.
pub fn reset_streak(category: Category) -> StreakState {
    StreakState::new(category)
}

/// Whole days elapsed since birth, never negative.
pub fn initial_streak(date_of_birth: NaiveDate, today: NaiveDate) -> u32 {
    let days = (today - date_of_birth).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// Progress toward the category's headline status, in `[0, 1]`.
///
/// The virgin horizon recedes with the count (`count / (count + 365)`); the
/// nofap horizon is a fixed 365 days.
pub fn progress(category: Category, state: &StreakState) -> f32 {
    let count = state.count as f32;
    match category {
        Category::Virgin => count / (count + PROGRESS_HORIZON_DAYS),
        Category::NoFap => (count / PROGRESS_HORIZON_DAYS).min(1.0),
    }
}

/// One category's streak plus its milestone list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub state: StreakState,
    pub milestones: Vec<Milestone>,
}

impl Track {
    pub fn new(category: Category, milestones: Vec<Milestone>) -> Self {
        Self {
            state: StreakState::new(category),
            milestones,
        }
    }

    pub fn achieved(&self) -> impl Iterator<Item = &Milestone> {
        self.milestones.iter().filter(|m| m.achieved)
    }
}

/// Both streak categories, owned by the caller and threaded through each
/// check-in or reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakBook {
    pub virgin: Track,
    pub nofap: Track,
    /// Set once the virgin streak has been seeded from a date of birth.
    #[serde(default)]
    pub birth_seeded: bool,
}

impl Default for StreakBook {
    fn default() -> Self {
        Self::new(
            crate::catalog::milestones_for(Category::Virgin),
            crate::catalog::milestones_for(Category::NoFap),
        )
    }
}

impl StreakBook {
    pub fn new(virgin: Vec<Milestone>, nofap: Vec<Milestone>) -> Self {
        Self {
            virgin: Track::new(Category::Virgin, virgin),
            nofap: Track::new(Category::NoFap, nofap),
            birth_seeded: false,
        }
    }

    pub fn track(&self, category: Category) -> &Track {
        match category {
            Category::Virgin => &self.virgin,
            Category::NoFap => &self.nofap,
        }
    }

    fn track_mut(&mut self, category: Category) -> &mut Track {
        match category {
            Category::Virgin => &mut self.virgin,
            Category::NoFap => &mut self.nofap,
        }
    }

    /// Seed the virgin streak from a date of birth.
    ///
    /// Only the first call has an effect; returns whether it seeded.
    pub fn seed_from_birth(&mut self, date_of_birth: NaiveDate, today: NaiveDate) -> bool {
        if self.birth_seeded {
            return false;
        }
        let days = initial_streak(date_of_birth, today);
        self.virgin.state.count = days;
        self.birth_seeded = true;
        tracing::info!(days, "virgin streak seeded from date of birth");
        true
    }

    /// Record today's check-in and return the milestones it unlocked.
    pub fn check_in(&mut self, category: Category, today: NaiveDate) -> Result<Advance, StreakError> {
        if category == Category::Virgin && !self.birth_seeded {
            return Err(StreakError::BirthDateNotSet);
        }
        let track = self.track_mut(category);
        let advance = advance_streak(&track.state, today, &track.milestones);
        track.state = advance.state.clone();
        track.milestones = advance.milestones.clone();
        Ok(advance)
    }

    /// Reset a category to zero, returning the count it had survived.
    pub fn reset(&mut self, category: Category) -> u32 {
        let track = self.track_mut(category);
        let survived = track.state.count;
        track.state = reset_streak(category);
        tracing::info!(%category, survived, "streak reset");
        survived
    }

    pub fn progress(&self, category: Category) -> f32 {
        progress(category, &self.track(category).state)
    }

    /// Progress line shown under the streak counter.
    pub fn progress_message(&self, category: Category) -> String {
        let pct = self.progress(category) * 100.0;
        match category {
            Category::Virgin if !self.birth_seeded => "Set your Date of Birth to begin".to_string(),
            Category::Virgin => {
                format!("{pct:.0}% to Ultimate Virgin Status in next 365 days")
            }
            Category::NoFap => format!("{pct:.0}% to Legendary NoFap Status"),
        }
    }
}
