//! Combat resolution: armor peeling, instant eliminations, area blasts, and
//! the shared respawn/elimination pipeline behind all three.
//!
//! Every entry point runs the same gate first. A rejected hit is a silent
//! no-op so a stray projectile can never corrupt match state, and friendly
//! fire is refused unconditionally.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use blast_core::cooldown::CooldownKind;
use blast_core::events::{EngineEvent, StatusEffect};
use blast_core::map::Location;
use blast_core::participant::ParticipantId;
use blast_core::powerup::{self, BLIND_TRIGGER_CHANCE, PowerupKind};
use blast_core::team::Team;

use crate::{MatchEngine, PICKUP_SUPPRESS_TICKS, PREFIX, STREAK_ANNOUNCE_INTERVAL};

/// What dealt the damage. Heavy ordnance punches through spawn protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    Default,
    StrikeBlaster,
    HomingMissile,
}

impl DamageKind {
    pub fn bypasses_protection(self) -> bool {
        matches!(self, DamageKind::StrikeBlaster | DamageKind::HomingMissile)
    }
}

/// Result of a basic hit, mostly for the host's hit feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Gate refused the hit; nothing changed.
    Ignored,
    /// Armor absorbed it.
    ArmorPeeled,
    /// The victim ran out of armor and was sent back to spawn.
    Eliminated,
}

impl MatchEngine {
    /// Gate shared by every combat entry point.
    fn combat_allowed(
        &self,
        attacker: ParticipantId,
        victim: ParticipantId,
        kind: DamageKind,
    ) -> bool {
        if !self.in_progress || attacker == victim {
            return false;
        }
        let (Some(a), Some(v)) = (self.participants.get(&attacker), self.participants.get(&victim))
        else {
            return false;
        };
        if a.spectator || v.spectator || a.team == v.team {
            return false;
        }
        if !kind.bypasses_protection() && self.protection.contains(v.team, &v.location) {
            return false;
        }
        true
    }

    /// A basic blaster hit: peels one armor piece per damage level, and
    /// eliminates once the peel count outruns the armor that is left.
    /// Any connecting hit interrupts the victim's charge wind-up and
    /// carries the attacker's on-hit powerups, eliminating or not.
    pub fn apply_hit(
        &mut self,
        attacker: ParticipantId,
        victim: ParticipantId,
        kind: DamageKind,
    ) -> HitOutcome {
        if !self.combat_allowed(attacker, victim, kind) {
            return HitOutcome::Ignored;
        }
        self.charges.request_cancel(victim);
        self.apply_on_hit_effects(attacker, victim);
        let pieces = powerup::armor_pieces_per_hit(self.stacks.get(attacker, PowerupKind::BlasterDamage));
        let mut out_of_armor = false;
        if let Some(v) = self.participants.get_mut(&victim) {
            for _ in 0..pieces {
                if v.armor.remove_next().is_none() {
                    out_of_armor = true;
                    break;
                }
            }
        }
        if out_of_armor {
            self.eliminate(attacker, victim);
            return HitOutcome::Eliminated;
        }
        HitOutcome::ArmorPeeled
    }

    /// A direct heavy hit: armor is irrelevant, the victim goes straight
    /// back to spawn.
    pub fn apply_instant_elim(
        &mut self,
        attacker: ParticipantId,
        victim: ParticipantId,
        kind: DamageKind,
    ) -> bool {
        if !self.combat_allowed(attacker, victim, kind) {
            return false;
        }
        self.charges.request_cancel(victim);
        self.apply_on_hit_effects(attacker, victim);
        if let Some(v) = self.participants.get_mut(&victim) {
            v.armor.wipe();
        }
        self.eliminate(attacker, victim);
        true
    }

    /// An area blast around `center`. Basic-hit logic runs once per caught
    /// enemy; `processed` carries victims already resolved by earlier
    /// overlapping blasts and picks up everyone this call resolves, so one
    /// salvo never multi-counts a victim.
    pub fn apply_aoe(
        &mut self,
        attacker: ParticipantId,
        center: &Location,
        radius: f64,
        processed: &mut HashSet<ParticipantId>,
        kind: DamageKind,
    ) -> usize {
        let radius_sq = radius * radius;
        let caught: SmallVec<[ParticipantId; 8]> = self
            .order
            .iter()
            .copied()
            .filter(|id| {
                !processed.contains(id)
                    && self.participants.get(id).is_some_and(|p| {
                        p.location.world == center.world
                            && p.location.distance_squared(center) <= radius_sq
                    })
            })
            .collect();
        let mut resolved = 0;
        for victim in caught {
            if self.apply_hit(attacker, victim, kind) != HitOutcome::Ignored {
                processed.insert(victim);
                resolved += 1;
            }
        }
        resolved
    }

    /// Check and arm an ability cooldown in one step. Blaster shots get the
    /// blast-speed stack discount; movement abilities use the base duration.
    pub fn try_begin_cooldown(
        &mut self,
        id: ParticipantId,
        kind: CooldownKind,
        base_ms: u64,
        now_ms: u64,
    ) -> bool {
        if !self.in_progress || !self.participants.contains_key(&id) {
            return false;
        }
        if !self.cooldowns.is_ready(id, kind, now_ms) {
            return false;
        }
        let duration = match kind {
            CooldownKind::Basic | CooldownKind::Big | CooldownKind::Scatter | CooldownKind::Range => {
                powerup::adjusted_cooldown_ms(self.stacks.get(id, PowerupKind::BlastSpeed), base_ms)
            }
            CooldownKind::Strike | CooldownKind::Dash => base_ms,
        };
        self.cooldowns.start(id, kind, duration, now_ms);
        true
    }

    /// Shared elimination pipeline: settle streaks and tokens, burn one
    /// team life, then respawn or finish off the team.
    fn eliminate(&mut self, attacker: ParticipantId, victim: ParticipantId) {
        let (attacker_name, attacker_streak) = match self.participants.get_mut(&attacker) {
            Some(a) => {
                a.tokens = a.tokens.saturating_add(1);
                a.streak = a.streak.saturating_add(1);
                (a.name.clone(), a.streak)
            }
            None => (String::new(), 0),
        };
        let Some(v) = self.participants.get_mut(&victim) else {
            return;
        };
        v.streak = 0;
        let victim_name = v.name.clone();
        let team = v.team;

        self.events.push(EngineEvent::broadcast(format!(
            "{PREFIX}§f{attacker_name} §esent §f{victim_name} §eback to spawn."
        )));
        if attacker_streak > 0 && attacker_streak % STREAK_ANNOUNCE_INTERVAL == 0 {
            self.events.push(EngineEvent::broadcast(format!(
                "{PREFIX}§f{attacker_name} §eis on a §f{attacker_streak} §eelimination streak!"
            )));
        }
        debug!(attacker = %attacker_name, victim = %victim_name, "elimination");

        let remaining = {
            let lives = self.lives.entry(team).or_insert(0);
            *lives = lives.saturating_sub(1);
            *lives
        };
        if remaining == 0 {
            self.eliminate_team(team);
        } else {
            self.respawn(victim);
        }
    }

    fn respawn(&mut self, victim: ParticipantId) {
        self.restock_armor(victim);
        let spawn = self
            .participants
            .get(&victim)
            .and_then(|p| self.spawn_location(p));
        if let Some(to) = spawn {
            if let Some(p) = self.participants.get_mut(&victim) {
                p.location = to.clone();
            }
            self.events.push(EngineEvent::Relocate {
                participant: victim,
                to,
            });
        }
        self.events.push(EngineEvent::GiveLoadout {
            participant: victim,
        });
        self.events.push(EngineEvent::SuppressPickup {
            participant: victim,
            duration_ticks: PICKUP_SUPPRESS_TICKS,
        });
        self.apply_passive_effects(victim);
    }

    /// A team out of lives leaves the match: every member becomes a
    /// spectator and the win check runs immediately.
    fn eliminate_team(&mut self, team: Team) {
        self.eliminated.insert(team);
        let members: Vec<ParticipantId> = self
            .order
            .iter()
            .copied()
            .filter(|id| {
                self.participants
                    .get(id)
                    .is_some_and(|p| p.team == team)
            })
            .collect();
        for id in members {
            if let Some(p) = self.participants.get_mut(&id) {
                p.spectator = true;
                p.streak = 0;
            }
            self.charges.request_cancel(id);
            self.events.push(EngineEvent::EnterSpectator { participant: id });
        }
        self.events.push(EngineEvent::broadcast(format!(
            "{PREFIX}{}{} team §fhas been eliminated!",
            team.color_code(),
            team.display_name()
        )));
        self.check_last_team_standing();
    }

    fn apply_on_hit_effects(&mut self, attacker: ParticipantId, victim: ParticipantId) {
        let knockback = powerup::knockback_profile(self.stacks.get(attacker, PowerupKind::Knockback));
        let slow = powerup::slow_profile(self.stacks.get(attacker, PowerupKind::SlowShot));
        let blind = powerup::blind_duration_ticks(self.stacks.get(attacker, PowerupKind::BlindShot));
        let mark = powerup::mark_duration_ticks(self.stacks.get(attacker, PowerupKind::MarkTarget));

        if let Some((horizontal, vertical)) = knockback {
            let from = self
                .participants
                .get(&attacker)
                .map(|a| a.location.clone());
            if let Some(from) = from {
                self.events.push(EngineEvent::Knockback {
                    participant: victim,
                    from,
                    horizontal,
                    vertical,
                });
            }
        }
        if let Some((duration_ticks, amplifier)) = slow {
            self.events.push(EngineEvent::ApplyEffect {
                participant: victim,
                effect: StatusEffect::Slowness {
                    duration_ticks,
                    amplifier,
                },
            });
        }
        if let Some(duration_ticks) = blind
            && self.rng.random_bool(BLIND_TRIGGER_CHANCE)
        {
            self.events.push(EngineEvent::ApplyEffect {
                participant: victim,
                effect: StatusEffect::Blindness { duration_ticks },
            });
        }
        if let Some(duration_ticks) = mark {
            self.events.push(EngineEvent::ApplyEffect {
                participant: victim,
                effect: StatusEffect::Glowing { duration_ticks },
            });
        }
    }

}
