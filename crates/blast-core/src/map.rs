use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::protection::ProtectionRegion;
use crate::team::Team;

/// How many valid spawn points each team needs before a map is playable.
pub const SPAWNS_PER_TEAM: usize = 4;

/// A point in a named world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn distance_squared(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// Static per-match map configuration: world identity plus up to four spawn
/// points per team. Immutable once a match starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastMap {
    pub name: String,
    pub world: String,
    #[serde(default, rename = "start-spawn")]
    pub start_spawn: Option<Location>,
    #[serde(default)]
    pub spawns: HashMap<Team, Vec<Location>>,
    /// Per-team spawn-protection boxes, loaded into the engine at match start.
    #[serde(default)]
    pub protection: HashMap<Team, ProtectionRegion>,
}

impl BlastMap {
    /// Spawn point for `(team, index)`: the exact index when present,
    /// otherwise the team's first valid spawn.
    pub fn spawn_for(&self, team: Team, index: usize) -> Option<&Location> {
        let list = self.spawns.get(&team)?;
        list.get(index).or_else(|| list.first())
    }

    pub fn spawn_count(&self, team: Team) -> usize {
        self.spawns.get(&team).map_or(0, |l| l.len())
    }

    /// Whether every team has its full complement of spawn points.
    pub fn has_enough_spawns(&self) -> bool {
        Team::ALL
            .iter()
            .all(|t| self.spawn_count(*t) >= SPAWNS_PER_TEAM)
    }
}

/// Named map collection loaded from `blast-maps.toml`. Map order in the file
/// is preserved so the first map can serve as the fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapStore {
    #[serde(default)]
    pub maps: Vec<BlastMap>,
}

impl MapStore {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let mut store: Self = toml::from_str(content)?;
        for map in &mut store.maps {
            map.name = map.name.trim().to_ascii_lowercase();
        }
        Ok(store)
    }

    pub fn get(&self, name: &str) -> Option<&BlastMap> {
        let wanted = name.trim().to_ascii_lowercase();
        self.maps.iter().find(|m| m.name == wanted)
    }

    /// Resolve the requested map, falling back to the first configured map
    /// when the name is empty or unknown.
    pub fn resolve(&self, name: &str) -> Option<&BlastMap> {
        if !name.trim().is_empty()
            && let Some(map) = self.get(name)
        {
            return Some(map);
        }
        self.maps.first()
    }

    pub fn insert(&mut self, mut map: BlastMap) {
        map.name = map.name.trim().to_ascii_lowercase();
        self.maps.retain(|m| m.name != map.name);
        self.maps.push(map);
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
