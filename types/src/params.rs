//! Deadpool consensus parameters and the announcement window rules.

use serde::{Deserialize, Serialize};

use crate::Amount;

/// Maximum size of a single script stack element, in bytes.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Smallest N (in bits) accepted in an entry or announcement.
pub const MIN_DEADPOOL_INTEGER_BITS: u64 = 160;

/// Default minimum burn for an announcement to ever become usable (0.01 coin).
pub const DEFAULT_MIN_ANNOUNCE_BURN: Amount = Amount::new(1_000_000);

/// Per-network deadpool parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Height from which the deadpool opcodes are valid.
    pub activation_height: u32,
    /// Confirmations after posting before an announcement may back a claim.
    pub announce_maturity: u32,
    /// Blocks after maturity during which an announcement stays usable.
    pub announce_expiry: u32,
    /// Burn below which an announcement is recorded but never usable.
    pub min_announce_burn: Amount,
}

/// Where an announcement sits in its lifecycle at a given height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementState {
    /// Posted, maturity height not yet reached.
    Immature,
    /// Inside the `[maturity, expiry)` window with a sufficient burn.
    Usable,
    /// At or past expiry.
    Expired,
    /// Burn below the minimum. Never usable.
    Unfunded,
}

impl ConsensusParams {
    pub fn main() -> Self {
        Self {
            activation_height: 155_000,
            announce_maturity: 100,
            announce_expiry: 672,
            min_announce_burn: DEFAULT_MIN_ANNOUNCE_BURN,
        }
    }

    pub fn test() -> Self {
        Self {
            activation_height: 0,
            announce_maturity: 5,
            announce_expiry: 100,
            min_announce_burn: DEFAULT_MIN_ANNOUNCE_BURN,
        }
    }

    pub fn regtest() -> Self {
        Self {
            activation_height: 4 * 144,
            announce_maturity: 5,
            announce_expiry: 100,
            min_announce_burn: DEFAULT_MIN_ANNOUNCE_BURN,
        }
    }

    /// Whether the deadpool opcodes are enabled at `height`.
    pub fn is_active(&self, height: u32) -> bool {
        height >= self.activation_height
    }

    pub fn maturity_height(&self, post_height: u32) -> u32 {
        post_height.saturating_add(self.announce_maturity)
    }

    pub fn expiry_height(&self, post_height: u32) -> u32 {
        self.maturity_height(post_height)
            .saturating_add(self.announce_expiry)
    }

    /// Heights whose posts are usable at `height`, as an inclusive range.
    ///
    /// `None` when no post height can be usable yet.
    pub fn usable_post_heights(&self, height: u32) -> Option<(u32, u32)> {
        let newest = height.checked_sub(self.announce_maturity)?;
        let window = self.announce_maturity.saturating_add(self.announce_expiry);
        // post + M + E > height  <=>  post >= height - (M + E) + 1
        let oldest = height.saturating_add(1).saturating_sub(window);
        (oldest <= newest).then_some((oldest, newest))
    }

    pub fn announcement_state(
        &self,
        post_height: u32,
        burn: Amount,
        height: u32,
    ) -> AnnouncementState {
        if burn < self.min_announce_burn {
            AnnouncementState::Unfunded
        } else if height < self.maturity_height(post_height) {
            AnnouncementState::Immature
        } else if height >= self.expiry_height(post_height) {
            AnnouncementState::Expired
        } else {
            AnnouncementState::Usable
        }
    }

    pub fn is_usable(&self, post_height: u32, burn: Amount, height: u32) -> bool {
        self.announcement_state(post_height, burn, height) == AnnouncementState::Usable
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::regtest()
    }
}
