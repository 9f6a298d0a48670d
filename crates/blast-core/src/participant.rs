use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::map::Location;
use crate::team::Team;

/// Unique identifier for a connected player.
pub type ParticipantId = Uuid;

/// Armor slots in their fixed removal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmorSlot {
    Head,
    Chest,
    Legs,
    Boots,
}

impl ArmorSlot {
    pub const ORDER: [ArmorSlot; 4] = [
        ArmorSlot::Head,
        ArmorSlot::Chest,
        ArmorSlot::Legs,
        ArmorSlot::Boots,
    ];
}

/// A participant's four armor slots. A fresh loadout fills all four; basic
/// hits peel one slot at a time in `ArmorSlot::ORDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorSet {
    pub head: bool,
    pub chest: bool,
    pub legs: bool,
    pub boots: bool,
}

impl ArmorSet {
    pub fn full() -> Self {
        Self {
            head: true,
            chest: true,
            legs: true,
            boots: true,
        }
    }

    pub fn empty() -> Self {
        Self {
            head: false,
            chest: false,
            legs: false,
            boots: false,
        }
    }

    fn slot_mut(&mut self, slot: ArmorSlot) -> &mut bool {
        match slot {
            ArmorSlot::Head => &mut self.head,
            ArmorSlot::Chest => &mut self.chest,
            ArmorSlot::Legs => &mut self.legs,
            ArmorSlot::Boots => &mut self.boots,
        }
    }

    /// Remove the first present piece in fixed order, returning which slot
    /// was peeled, or `None` when no armor remains.
    pub fn remove_next(&mut self) -> Option<ArmorSlot> {
        for slot in ArmorSlot::ORDER {
            let present = self.slot_mut(slot);
            if *present {
                *present = false;
                return Some(slot);
            }
        }
        None
    }

    /// Strip all four slots at once.
    pub fn wipe(&mut self) {
        *self = Self::empty();
    }

    pub fn pieces(&self) -> u8 {
        [self.head, self.chest, self.legs, self.boots]
            .iter()
            .filter(|p| **p)
            .count() as u8
    }
}

impl Default for ArmorSet {
    fn default() -> Self {
        Self::full()
    }
}

/// A connected player bound to one match and one team.
///
/// Created on match start, removed on quit or match end. The spawn index is
/// the participant's ordinal within their team and stays stable across
/// respawns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub team: Team,
    pub spawn_index: usize,
    /// Elimination tokens earned this match (shop currency).
    pub tokens: u32,
    /// Consecutive eliminations without being eliminated.
    pub streak: u32,
    /// In-world currency units held, consumed by powerup purchases.
    pub currency: u32,
    pub armor: ArmorSet,
    /// Set once the participant's team is out of lives; spectators take no
    /// further part in combat and never respawn.
    pub spectator: bool,
    /// Last location reported by the physics collaborator.
    pub location: Location,
}

impl Participant {
    pub fn new(id: ParticipantId, name: String, team: Team, spawn_index: usize) -> Self {
        Self {
            id,
            name,
            team,
            spawn_index,
            tokens: 0,
            streak: 0,
            currency: 0,
            armor: ArmorSet::full(),
            spectator: false,
            location: Location::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_order_is_head_chest_legs_boots() {
        let mut armor = ArmorSet::full();
        assert_eq!(armor.remove_next(), Some(ArmorSlot::Head));
        assert_eq!(armor.remove_next(), Some(ArmorSlot::Chest));
        assert_eq!(armor.remove_next(), Some(ArmorSlot::Legs));
        assert_eq!(armor.remove_next(), Some(ArmorSlot::Boots));
        assert_eq!(armor.remove_next(), None);
    }

    #[test]
    fn removal_skips_missing_pieces() {
        let mut armor = ArmorSet::full();
        armor.head = false;
        armor.legs = false;
        assert_eq!(armor.remove_next(), Some(ArmorSlot::Chest));
        assert_eq!(armor.remove_next(), Some(ArmorSlot::Boots));
        assert_eq!(armor.remove_next(), None);
    }

    #[test]
    fn wipe_clears_everything() {
        let mut armor = ArmorSet::full();
        armor.wipe();
        assert_eq!(armor.pieces(), 0);
        assert_eq!(armor.remove_next(), None);
    }

    #[test]
    fn fresh_participant_has_full_armor_and_no_tokens() {
        let p = Participant::new(Uuid::from_u128(1), "Blake".into(), Team::Red, 0);
        assert_eq!(p.armor.pieces(), 4);
        assert_eq!(p.tokens, 0);
        assert_eq!(p.streak, 0);
        assert!(!p.spectator);
    }
}
