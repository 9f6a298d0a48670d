use serde::{Deserialize, Serialize};

use crate::map::Location;
use crate::participant::ParticipantId;
use crate::team::Team;

/// Who a broadcast message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    All,
    Team(Team),
    Participant(ParticipantId),
}

/// Timed status effects the host applies to a participant's body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "effect")]
pub enum StatusEffect {
    Speed { amplifier: u8 },
    JumpBoost { amplifier: u8 },
    Slowness { duration_ticks: u32, amplifier: u8 },
    Blindness { duration_ticks: u32 },
    Glowing { duration_ticks: u32 },
}

/// How a finished match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Winner(Team),
    NoWinner,
    Aborted,
}

/// Side effects the engine asks its host to perform. The engine never touches
/// the world directly; every tick and combat call appends events here and the
/// host drains them in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Teleport a participant's body.
    Relocate {
        participant: ParticipantId,
        to: Location,
    },
    /// Chat line for the given audience. Text carries its own color codes.
    Message { audience: Audience, text: String },
    /// Reissue the standard kit: team-colored gear, full armor, weapons.
    GiveLoadout { participant: ParticipantId },
    /// Briefly ignore item pickups for a freshly respawned participant.
    SuppressPickup {
        participant: ParticipantId,
        duration_ticks: u32,
    },
    /// Shove a participant away from an attacker.
    Knockback {
        participant: ParticipantId,
        from: Location,
        horizontal: f64,
        vertical: f64,
    },
    ApplyEffect {
        participant: ParticipantId,
        effect: StatusEffect,
    },
    ClearEffects { participant: ParticipantId },
    /// Switch a participant's body into spectator presentation.
    EnterSpectator { participant: ParticipantId },
    /// A charged ability finished its wind-up; the host fires it now.
    ChargeComplete { participant: ParticipantId },
    /// Send a participant back to the neutral waiting area.
    ReturnToLobby { participant: ParticipantId },
    /// Place the team shop vendor at its map location.
    SpawnShopNpc { team: Team, at: Location },
    RemoveShopNpcs,
    MatchStarted {
        map: String,
        participants: Vec<ParticipantId>,
    },
    MatchEnded {
        outcome: MatchOutcome,
        reason: String,
        participants: Vec<ParticipantId>,
    },
}

impl EngineEvent {
    /// Convenience constructor for an all-chat line.
    pub fn broadcast(text: impl Into<String>) -> Self {
        EngineEvent::Message {
            audience: Audience::All,
            text: text.into(),
        }
    }
}
