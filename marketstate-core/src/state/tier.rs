//! The three EMA tiers and a small per-tier container.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Mini,
    Fast,
    Slow,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Mini, Tier::Fast, Tier::Slow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Mini => "mini",
            Tier::Fast => "fast",
            Tier::Slow => "slow",
        }
    }
}

/// One value per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierValues<T> {
    pub mini: T,
    pub fast: T,
    pub slow: T,
}

impl<T> TierValues<T> {
    pub fn new(mini: T, fast: T, slow: T) -> Self {
        Self { mini, fast, slow }
    }

    pub fn get(&self, tier: Tier) -> &T {
        match tier {
            Tier::Mini => &self.mini,
            Tier::Fast => &self.fast,
            Tier::Slow => &self.slow,
        }
    }

    pub fn get_mut(&mut self, tier: Tier) -> &mut T {
        match tier {
            Tier::Mini => &mut self.mini,
            Tier::Fast => &mut self.fast,
            Tier::Slow => &mut self.slow,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Tier, &T) -> U) -> TierValues<U> {
        TierValues {
            mini: f(Tier::Mini, &self.mini),
            fast: f(Tier::Fast, &self.fast),
            slow: f(Tier::Slow, &self.slow),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, &T)> {
        [
            (Tier::Mini, &self.mini),
            (Tier::Fast, &self.fast),
            (Tier::Slow, &self.slow),
        ]
        .into_iter()
    }
}

impl<T, E> TierValues<Result<T, E>> {
    /// All three tiers or the first error (mini, fast, slow order).
    pub fn transpose(self) -> Result<TierValues<T>, E> {
        Ok(TierValues {
            mini: self.mini?,
            fast: self.fast?,
            slow: self.slow?,
        })
    }
}
