use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::participant::ParticipantId;

/// Maximum stack level for any powerup.
pub const MAX_STACKS: u8 = 3;

/// Chance that a blind shot actually blinds the victim.
pub const BLIND_TRIGGER_CHANCE: f64 = 0.35;

/// The nine purchasable powerup kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupKind {
    Speed,
    Jump,
    BlastSpeed,
    BlasterDamage,
    Dash,
    Knockback,
    SlowShot,
    BlindShot,
    MarkTarget,
}

impl PowerupKind {
    pub const ALL: [PowerupKind; 9] = [
        PowerupKind::Speed,
        PowerupKind::Jump,
        PowerupKind::BlastSpeed,
        PowerupKind::BlasterDamage,
        PowerupKind::Dash,
        PowerupKind::Knockback,
        PowerupKind::SlowShot,
        PowerupKind::BlindShot,
        PowerupKind::MarkTarget,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PowerupKind::Speed => "speed",
            PowerupKind::Jump => "jump",
            PowerupKind::BlastSpeed => "blast_speed",
            PowerupKind::BlasterDamage => "blaster_damage",
            PowerupKind::Dash => "dash",
            PowerupKind::Knockback => "knockback",
            PowerupKind::SlowShot => "slow_shot",
            PowerupKind::BlindShot => "blind_shot",
            PowerupKind::MarkTarget => "mark_target",
        }
    }

    pub fn from_key(key: &str) -> Option<PowerupKind> {
        let k = key.trim().to_ascii_lowercase();
        PowerupKind::ALL.into_iter().find(|p| p.key() == k)
    }
}

/// Outcome of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseResult {
    Success,
    NoCurrency,
    Maxed,
}

/// Per-participant stack counters, always clamped to `[0, MAX_STACKS]`.
/// Cleared on match end and participant removal so nothing carries over
/// between matches.
#[derive(Debug, Default)]
pub struct StackStore {
    stacks: HashMap<ParticipantId, HashMap<PowerupKind, u8>>,
}

impl StackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ParticipantId, kind: PowerupKind) -> u8 {
        self.stacks
            .get(&id)
            .and_then(|m| m.get(&kind))
            .copied()
            .unwrap_or(0)
            .min(MAX_STACKS)
    }

    pub fn set(&mut self, id: ParticipantId, kind: PowerupKind, value: u8) {
        self.stacks
            .entry(id)
            .or_default()
            .insert(kind, value.min(MAX_STACKS));
    }

    /// Raise the stack one level. Returns `Maxed` (leaving the stack alone)
    /// when already at the cap; currency checks are the caller's concern.
    pub fn increment(&mut self, id: ParticipantId, kind: PowerupKind) -> PurchaseResult {
        let current = self.get(id, kind);
        if current >= MAX_STACKS {
            return PurchaseResult::Maxed;
        }
        self.set(id, kind, current + 1);
        PurchaseResult::Success
    }

    pub fn clear_participant(&mut self, id: ParticipantId) {
        self.stacks.remove(&id);
    }

    pub fn clear_all(&mut self) {
        self.stacks.clear();
    }
}

// Effect magnitude tables. Stack levels map deterministically onto effect
// strengths; a zero stack always means "no effect".

/// Passive speed amplifier (tier I..III) for the given stack level.
pub fn speed_amplifier(stacks: u8) -> Option<u8> {
    (stacks > 0).then(|| stacks.min(MAX_STACKS) - 1)
}

/// Passive jump-boost amplifier (tier II..IV) for the given stack level.
pub fn jump_amplifier(stacks: u8) -> Option<u8> {
    (stacks > 0).then(|| stacks.min(MAX_STACKS))
}

/// Blast speed: each stack shaves 200 ms off the base cooldown, floored at
/// 100 ms.
pub fn adjusted_cooldown_ms(stacks: u8, base_ms: u64) -> u64 {
    let reduction = u64::from(stacks.min(MAX_STACKS)) * 200;
    base_ms.saturating_sub(reduction).max(100)
}

/// Armor pieces removed by one basic hit: 1 plus one per damage stack.
pub fn armor_pieces_per_hit(stacks: u8) -> u8 {
    1 + stacks.min(MAX_STACKS)
}

/// Dash distance in blocks.
pub fn dash_distance_blocks(stacks: u8) -> u8 {
    match stacks.min(MAX_STACKS) {
        1 => 3,
        2 => 4,
        3 => 5,
        _ => 0,
    }
}

/// Knockback `(horizontal strength, vertical lift)` per stack level.
pub fn knockback_profile(stacks: u8) -> Option<(f64, f64)> {
    let s = stacks.min(MAX_STACKS);
    if s == 0 {
        return None;
    }
    let steps = f64::from(s - 1);
    Some((0.40 + steps * 0.20, 0.10 + steps * 0.05))
}

/// Slow-shot `(duration ticks, amplifier)` per stack level.
pub fn slow_profile(stacks: u8) -> Option<(u32, u8)> {
    match stacks.min(MAX_STACKS) {
        1 => Some((10, 0)),
        2 => Some((20, 1)),
        3 => Some((20, 3)),
        _ => None,
    }
}

/// Blindness duration in ticks, rolled against `BLIND_TRIGGER_CHANCE`.
pub fn blind_duration_ticks(stacks: u8) -> Option<u32> {
    match stacks.min(MAX_STACKS) {
        1 => Some(20),
        2 => Some(40),
        3 => Some(60),
        _ => None,
    }
}

/// Mark-target glow duration in ticks.
pub fn mark_duration_ticks(stacks: u8) -> Option<u32> {
    match stacks.min(MAX_STACKS) {
        1 => Some(60),
        2 => Some(100),
        3 => Some(160),
        _ => None,
    }
}
