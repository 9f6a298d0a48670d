pub mod cooldown;
pub mod events;
pub mod map;
pub mod participant;
pub mod powerup;
pub mod protection;
pub mod team;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::HashMap;

    use uuid::Uuid;

    use crate::map::{BlastMap, Location, MapStore, SPAWNS_PER_TEAM};
    use crate::participant::ParticipantId;
    use crate::team::Team;

    /// Deterministic participant id for tests.
    pub fn pid(n: u128) -> ParticipantId {
        Uuid::from_u128(n)
    }

    /// `n` roster entries with sequential ids starting at 1.
    pub fn make_roster(n: usize) -> Vec<(ParticipantId, String)> {
        (0..n)
            .map(|i| (pid(i as u128 + 1), format!("Player{}", i + 1)))
            .collect()
    }

    /// A map with the full complement of spawn points for every team, laid
    /// out on a simple grid so positions are predictable.
    pub fn playable_map(name: &str) -> BlastMap {
        let mut spawns = HashMap::new();
        for (ti, team) in Team::ALL.into_iter().enumerate() {
            let row: Vec<Location> = (0..SPAWNS_PER_TEAM)
                .map(|si| {
                    Location::new("arena", ti as f64 * 100.0, 64.0, si as f64 * 10.0)
                })
                .collect();
            spawns.insert(team, row);
        }
        BlastMap {
            name: name.to_string(),
            world: "arena".to_string(),
            start_spawn: Some(Location::new("arena", 0.0, 70.0, -50.0)),
            spawns,
            protection: HashMap::new(),
        }
    }

    /// A store holding a single playable map named `canyon`.
    pub fn single_map_store() -> MapStore {
        let mut store = MapStore::default();
        store.insert(playable_map("canyon"));
        store
    }
}
