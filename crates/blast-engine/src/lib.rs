pub mod charge;
pub mod combat;
pub mod queue;
pub mod win;

use std::collections::{HashMap, HashSet};
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use blast_core::cooldown::CooldownTracker;
use blast_core::events::{Audience, EngineEvent, MatchOutcome, StatusEffect};
use blast_core::map::{BlastMap, Location, MapStore};
use blast_core::participant::{ArmorSet, Participant, ParticipantId};
use blast_core::powerup::{self, PowerupKind, PurchaseResult, StackStore};
use blast_core::protection::ProtectionRegistry;
use blast_core::team::Team;

use charge::ChargeTable;
use win::{TeamStanding, time_limit_outcome};

/// Chat prefix for every engine-issued line.
pub const PREFIX: &str = "§e[BLAST] ";

/// Elimination streaks are announced at every multiple of this.
pub const STREAK_ANNOUNCE_INTERVAL: u32 = 5;

/// How long item pickups stay suppressed after a respawn.
pub const PICKUP_SUPPRESS_TICKS: u32 = 20;

/// Tunable match parameters. Defaults mirror the standard ruleset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub match_duration_secs: u64,
    pub starting_lives: u32,
    pub min_players: usize,
    pub max_players: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_duration_secs: 1_200,
            starting_lives: 80,
            min_players: 2,
            max_players: 16,
        }
    }
}

/// One player handed over from the queue at match start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: ParticipantId,
    pub name: String,
}

/// Why a start request was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartRefusal {
    AlreadyActive,
    NotEnoughPlayers { have: usize, need: usize },
    TooManyPlayers { have: usize, cap: usize },
    NoMap,
    MissingSpawns { map: String },
}

impl fmt::Display for StartRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartRefusal::AlreadyActive => write!(f, "a match is already in progress"),
            StartRefusal::NotEnoughPlayers { have, need } => {
                write!(f, "not enough players ({have} queued, {need} required)")
            }
            StartRefusal::TooManyPlayers { have, cap } => {
                write!(f, "too many players ({have} queued, cap is {cap})")
            }
            StartRefusal::NoMap => write!(f, "no playable map is configured"),
            StartRefusal::MissingSpawns { map } => {
                write!(f, "map '{map}' is missing team spawn points")
            }
        }
    }
}

impl std::error::Error for StartRefusal {}

/// The authoritative match state machine.
///
/// One engine instance runs at most one match at a time. All mutation happens
/// through its methods on a single thread; side effects accumulate as
/// [`EngineEvent`]s and are drained by the host with [`MatchEngine::take_events`].
pub struct MatchEngine {
    pub(crate) config: EngineConfig,
    pub(crate) map_store: MapStore,
    pub(crate) in_progress: bool,
    pub(crate) active_map: Option<BlastMap>,
    pub(crate) seconds_remaining: u64,
    pub(crate) participants: HashMap<ParticipantId, Participant>,
    /// Join order, for stable iteration and end-of-match reporting.
    pub(crate) order: Vec<ParticipantId>,
    pub(crate) lives: HashMap<Team, u32>,
    pub(crate) eliminated: HashSet<Team>,
    pub(crate) stacks: StackStore,
    pub(crate) cooldowns: CooldownTracker,
    pub(crate) protection: ProtectionRegistry,
    pub(crate) charges: ChargeTable,
    pub(crate) events: Vec<EngineEvent>,
    pub(crate) rng: StdRng,
}

impl MatchEngine {
    pub fn new(config: EngineConfig, map_store: MapStore) -> Self {
        Self::with_seed(config, map_store, rand::random())
    }

    /// Deterministic constructor for tests and replay.
    pub fn with_seed(config: EngineConfig, map_store: MapStore, seed: u64) -> Self {
        Self {
            config,
            map_store,
            in_progress: false,
            active_map: None,
            seconds_remaining: 0,
            participants: HashMap::new(),
            order: Vec::new(),
            lives: HashMap::new(),
            eliminated: HashSet::new(),
            stacks: StackStore::new(),
            cooldowns: CooldownTracker::new(),
            protection: ProtectionRegistry::new(),
            charges: ChargeTable::new(),
            events: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Start a match from the queued roster. On success every store is reset,
    /// teams are balanced, and the returned ids are the seated participants.
    pub fn start_from_roster(
        &mut self,
        roster: &[RosterEntry],
        map_name: &str,
    ) -> Result<Vec<ParticipantId>, StartRefusal> {
        if self.in_progress {
            return Err(StartRefusal::AlreadyActive);
        }
        // First occurrence wins for a duplicated id.
        let mut seen = HashSet::new();
        let roster: Vec<&RosterEntry> = roster.iter().filter(|e| seen.insert(e.id)).collect();
        if roster.len() < self.config.min_players {
            return Err(StartRefusal::NotEnoughPlayers {
                have: roster.len(),
                need: self.config.min_players,
            });
        }
        if roster.len() > self.config.max_players {
            return Err(StartRefusal::TooManyPlayers {
                have: roster.len(),
                cap: self.config.max_players,
            });
        }
        let map = self.map_store.resolve(map_name).ok_or(StartRefusal::NoMap)?;
        if !map.has_enough_spawns() {
            return Err(StartRefusal::MissingSpawns {
                map: map.name.clone(),
            });
        }
        let map = map.clone();

        self.reset_stores();
        self.protection = ProtectionRegistry::new();
        for (team, region) in &map.protection {
            self.protection.set(*team, region.clone());
        }
        self.in_progress = true;
        self.seconds_remaining = self.config.match_duration_secs;

        let mut team_counts: HashMap<Team, usize> = HashMap::new();
        for entry in &roster {
            let team = fewest_members_team(&team_counts);
            let seat = team_counts.entry(team).or_insert(0);
            let spawn_index = *seat;
            *seat += 1;
            let mut participant =
                Participant::new(entry.id, entry.name.clone(), team, spawn_index);
            if let Some(spawn) = map.spawn_for(team, spawn_index) {
                participant.location = spawn.clone();
                self.events.push(EngineEvent::Relocate {
                    participant: entry.id,
                    to: spawn.clone(),
                });
            }
            self.events.push(EngineEvent::GiveLoadout {
                participant: entry.id,
            });
            self.order.push(entry.id);
            self.participants.insert(entry.id, participant);
        }

        // Teams nobody landed on are out from the first second, so a
        // two-player match can still end by last-team-standing.
        for team in Team::ALL {
            let members = team_counts.get(&team).copied().unwrap_or(0);
            if members > 0 {
                self.lives.insert(team, self.config.starting_lives);
                if let Some(spawn) = map.spawn_for(team, 0) {
                    self.events.push(EngineEvent::SpawnShopNpc {
                        team,
                        at: spawn.clone(),
                    });
                }
            } else {
                self.lives.insert(team, 0);
                self.eliminated.insert(team);
            }
        }

        self.events.push(EngineEvent::MatchStarted {
            map: map.name.clone(),
            participants: self.order.clone(),
        });
        self.events.push(EngineEvent::broadcast(format!(
            "{PREFIX}§fThe match has started on §e{}§f!",
            map.name
        )));
        info!(
            map = %map.name,
            players = roster.len(),
            lives = self.config.starting_lives,
            "match started"
        );
        self.active_map = Some(map);
        Ok(self.order.clone())
    }

    /// Advance the match clock by one second. Announces each full minute
    /// remaining and resolves the outcome when the clock hits zero.
    pub fn tick_second(&mut self) {
        if !self.in_progress {
            return;
        }
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 {
            self.resolve_time_limit();
            return;
        }
        if self.seconds_remaining % 60 == 0 {
            let minutes = self.seconds_remaining / 60;
            let unit = if minutes == 1 { "minute" } else { "minutes" };
            self.events.push(EngineEvent::broadcast(format!(
                "{PREFIX}§f{minutes} {unit} remaining!"
            )));
        }
    }

    fn resolve_time_limit(&mut self) {
        let mut standings: Vec<TeamStanding> = Vec::new();
        for team in Team::ALL {
            if self.eliminated.contains(&team) {
                continue;
            }
            let tokens = self
                .participants
                .values()
                .filter(|p| p.team == team)
                .map(|p| p.tokens)
                .sum();
            standings.push(TeamStanding {
                team,
                tokens,
                lives: self.lives.get(&team).copied().unwrap_or(0),
            });
        }
        let outcome = time_limit_outcome(&standings);
        self.end_match(outcome, "Time limit reached.");
    }

    /// Finish the match. Safe to call when no match is active, and calling it
    /// twice settles on the first outcome.
    pub fn end_match(&mut self, outcome: MatchOutcome, reason: &str) {
        if !self.in_progress {
            return;
        }
        self.in_progress = false;
        let participants = std::mem::take(&mut self.order);

        self.events.push(EngineEvent::RemoveShopNpcs);
        let line = match outcome {
            MatchOutcome::Winner(team) => format!(
                "{PREFIX}{}{} team wins!",
                team.color_code(),
                team.display_name()
            ),
            MatchOutcome::NoWinner => format!("{PREFIX}§fThe match ends in a draw."),
            MatchOutcome::Aborted => format!("{PREFIX}§f{reason}"),
        };
        self.events.push(EngineEvent::broadcast(line));
        for id in &participants {
            self.events.push(EngineEvent::ReturnToLobby { participant: *id });
        }
        self.events.push(EngineEvent::MatchEnded {
            outcome,
            reason: reason.to_string(),
            participants,
        });
        info!(?outcome, reason, "match ended");

        self.participants.clear();
        self.lives.clear();
        self.eliminated.clear();
        self.active_map = None;
        self.seconds_remaining = 0;
        self.stacks.clear_all();
        self.cooldowns.clear_all();
        self.charges.clear_all();
    }

    /// Remove a disconnected participant. An emptied team is eliminated on
    /// the spot, and the match is aborted once fewer than two participants
    /// remain.
    pub fn handle_quit(&mut self, id: ParticipantId) {
        if !self.in_progress {
            return;
        }
        let Some(participant) = self.participants.remove(&id) else {
            return;
        };
        self.order.retain(|other| *other != id);
        self.stacks.clear_participant(id);
        self.cooldowns.clear_participant(id);
        self.charges.clear_participant(id);
        debug!(name = %participant.name, "participant quit");

        let team = participant.team;
        let team_empty = !self.participants.values().any(|p| p.team == team);
        if team_empty && !self.eliminated.contains(&team) {
            self.lives.insert(team, 0);
            self.eliminated.insert(team);
            self.events.push(EngineEvent::broadcast(format!(
                "{PREFIX}{}{} team §fhas been eliminated (no players remaining).",
                team.color_code(),
                team.display_name()
            )));
            self.check_last_team_standing();
        }
        if self.in_progress && self.participants.len() < self.config.min_players {
            self.end_match(MatchOutcome::Aborted, "Not enough players remaining.");
        }
    }

    /// End the match immediately if at most one team still has lives.
    pub(crate) fn check_last_team_standing(&mut self) {
        let mut survivors = Team::ALL
            .into_iter()
            .filter(|t| !self.eliminated.contains(t));
        match (survivors.next(), survivors.next()) {
            (Some(winner), None) => {
                self.end_match(MatchOutcome::Winner(winner), "Last team standing.");
            }
            (None, _) => {
                self.end_match(MatchOutcome::NoWinner, "All teams eliminated.");
            }
            _ => {}
        }
    }

    /// Grant extra shared lives to a surviving team (shop reward).
    pub fn add_team_lives(&mut self, team: Team, amount: u32) {
        if !self.in_progress || self.eliminated.contains(&team) || amount == 0 {
            return;
        }
        if let Some(lives) = self.lives.get_mut(&team) {
            *lives = lives.saturating_add(amount);
            self.events.push(EngineEvent::Message {
                audience: Audience::Team(team),
                text: format!("{PREFIX}§fYour team gained §e{amount} §flives!"),
            });
        }
    }

    /// Spend elimination tokens if the participant holds enough.
    pub fn try_spend_tokens(&mut self, id: ParticipantId, cost: u32) -> bool {
        if !self.in_progress {
            return false;
        }
        match self.participants.get_mut(&id) {
            Some(p) if p.tokens >= cost => {
                p.tokens -= cost;
                true
            }
            _ => false,
        }
    }

    pub fn add_currency(&mut self, id: ParticipantId, amount: u32) {
        if !self.in_progress {
            return;
        }
        if let Some(p) = self.participants.get_mut(&id) {
            p.currency = p.currency.saturating_add(amount);
        }
    }

    /// Buy one stack of a powerup with in-world currency. Spectators and
    /// outsiders are refused with `NoCurrency`.
    pub fn purchase_powerup(
        &mut self,
        id: ParticipantId,
        kind: PowerupKind,
        cost: u32,
    ) -> PurchaseResult {
        if !self.in_progress {
            return PurchaseResult::NoCurrency;
        }
        let Some(participant) = self.participants.get(&id) else {
            return PurchaseResult::NoCurrency;
        };
        if participant.spectator || participant.currency < cost {
            return PurchaseResult::NoCurrency;
        }
        let result = self.stacks.increment(id, kind);
        if result == PurchaseResult::Success {
            if let Some(p) = self.participants.get_mut(&id) {
                p.currency -= cost;
            }
            self.apply_passive_effects(id);
            self.events.push(EngineEvent::Message {
                audience: Audience::Participant(id),
                text: format!(
                    "{PREFIX}§fPurchased §e{} §f(level {}).",
                    kind.key(),
                    self.stacks.get(id, kind)
                ),
            });
        }
        result
    }

    /// Record the latest position reported by the physics collaborator.
    pub fn update_location(&mut self, id: ParticipantId, location: Location) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.location = location;
        }
    }

    /// Reissue passive effects from the current stack levels. Called after
    /// purchases and respawns so effect tiers always match the stacks.
    pub(crate) fn apply_passive_effects(&mut self, id: ParticipantId) {
        self.events.push(EngineEvent::ClearEffects { participant: id });
        if let Some(amplifier) = powerup::speed_amplifier(self.stacks.get(id, PowerupKind::Speed)) {
            self.events.push(EngineEvent::ApplyEffect {
                participant: id,
                effect: StatusEffect::Speed { amplifier },
            });
        }
        if let Some(amplifier) = powerup::jump_amplifier(self.stacks.get(id, PowerupKind::Jump)) {
            self.events.push(EngineEvent::ApplyEffect {
                participant: id,
                effect: StatusEffect::JumpBoost { amplifier },
            });
        }
    }

    /// Drain all pending side effects in emission order.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_active(&self) -> bool {
        self.in_progress
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.seconds_remaining
    }

    pub fn team_lives(&self, team: Team) -> u32 {
        self.lives.get(&team).copied().unwrap_or(0)
    }

    pub fn is_team_eliminated(&self, team: Team) -> bool {
        self.eliminated.contains(&team)
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn team_of(&self, id: ParticipantId) -> Option<Team> {
        self.participants.get(&id).map(|p| p.team)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn stacks(&self, id: ParticipantId, kind: PowerupKind) -> u8 {
        self.stacks.get(id, kind)
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn charges_mut(&mut self) -> &mut ChargeTable {
        &mut self.charges
    }

    /// Start a charged ability wind-up for an in-match participant.
    pub fn begin_charge(&mut self, id: ParticipantId, duration_ms: u64, now_ms: u64) -> bool {
        if !self.in_progress {
            return false;
        }
        let eligible = self
            .participants
            .get(&id)
            .is_some_and(|p| !p.spectator);
        eligible && self.charges.begin(id, duration_ms, now_ms)
    }

    /// Cancel a participant's wind-up (released early, switched weapons).
    /// Safe to call repeatedly or with no charge in flight.
    pub fn cancel_charge(&mut self, id: ParticipantId) {
        self.charges.request_cancel(id);
    }

    /// Advance every wind-up. Completed charges emit [`EngineEvent::ChargeComplete`]
    /// so the host can fire the ability; cancelled ones are settled silently.
    pub fn poll_completed_charges(&mut self, now_ms: u64) -> Vec<ParticipantId> {
        let mut completed = Vec::new();
        let ids: Vec<ParticipantId> = self.order.clone();
        for id in ids {
            match self.charges.poll(id, now_ms) {
                charge::ChargeState::Completed => {
                    if self.charges.consume(id) == Some(charge::ChargeState::Completed) {
                        self.events.push(EngineEvent::ChargeComplete { participant: id });
                        completed.push(id);
                    }
                }
                charge::ChargeState::Cancelled => {
                    self.charges.consume(id);
                }
                _ => {}
            }
        }
        completed
    }

    pub fn protection_mut(&mut self) -> &mut ProtectionRegistry {
        &mut self.protection
    }

    pub(crate) fn spawn_location(&self, participant: &Participant) -> Option<Location> {
        self.active_map
            .as_ref()
            .and_then(|m| m.spawn_for(participant.team, participant.spawn_index))
            .cloned()
    }

    fn reset_stores(&mut self) {
        self.participants.clear();
        self.order.clear();
        self.lives.clear();
        self.eliminated.clear();
        self.stacks.clear_all();
        self.cooldowns.clear_all();
        self.charges.clear_all();
    }

    pub(crate) fn restock_armor(&mut self, id: ParticipantId) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.armor = ArmorSet::full();
        }
    }
}

/// Balanced team pick: fewest current members, color order breaking ties.
fn fewest_members_team(counts: &HashMap<Team, usize>) -> Team {
    let mut best = Team::ALL[0];
    let mut best_count = counts.get(&best).copied().unwrap_or(0);
    for team in &Team::ALL[1..] {
        let count = counts.get(team).copied().unwrap_or(0);
        if count < best_count {
            best = *team;
            best_count = count;
        }
    }
    best
}
