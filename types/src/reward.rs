//! Reward bundles credited by tasks, city reveals and referrals.

use serde::{Deserialize, Serialize};

/// A bundle of currency deltas. All components are non-negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reward {
    #[serde(default)]
    pub keys: u32,
    #[serde(default)]
    pub tickets: u32,
    #[serde(default)]
    pub coins: u32,
}

impl Reward {
    pub const NONE: Self = Self {
        keys: 0,
        tickets: 0,
        coins: 0,
    };

    pub const fn new(keys: u32, tickets: u32, coins: u32) -> Self {
        Self {
            keys,
            tickets,
            coins,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}
