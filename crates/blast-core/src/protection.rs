use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::map::Location;
use crate::team::Team;

/// Axis-aligned box in one named world. Corner order doesn't matter; the
/// constructor normalizes min/max per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionRegion {
    pub world: String,
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl ProtectionRegion {
    pub fn new(world: impl Into<String>, a: [f64; 3], b: [f64; 3]) -> Self {
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for axis in 0..3 {
            min[axis] = a[axis].min(b[axis]);
            max[axis] = a[axis].max(b[axis]);
        }
        Self {
            world: world.into(),
            min,
            max,
        }
    }

    /// Inclusive containment test; a location in another world is never
    /// inside.
    pub fn contains(&self, location: &Location) -> bool {
        if location.world != self.world {
            return false;
        }
        let p = [location.x, location.y, location.z];
        (0..3).all(|axis| p[axis] >= self.min[axis] && p[axis] <= self.max[axis])
    }
}

/// Per-team spawn-protection boxes: at most one per team, `set` replaces.
#[derive(Debug, Clone, Default)]
pub struct ProtectionRegistry {
    regions: HashMap<Team, ProtectionRegion>,
}

impl ProtectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, team: Team, region: ProtectionRegion) {
        self.regions.insert(team, region);
    }

    pub fn get(&self, team: Team) -> Option<&ProtectionRegion> {
        self.regions.get(&team)
    }

    /// Whether `location` lies inside `team`'s protection box. No box
    /// configured means no protection.
    pub fn contains(&self, team: Team, location: &Location) -> bool {
        self.regions
            .get(&team)
            .is_some_and(|r| r.contains(location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_normalize() {
        let region = ProtectionRegion::new("arena", [10.0, 70.0, 10.0], [-10.0, 60.0, -10.0]);
        assert_eq!(region.min, [-10.0, 60.0, -10.0]);
        assert_eq!(region.max, [10.0, 70.0, 10.0]);
    }

    #[test]
    fn containment_is_inclusive() {
        let region = ProtectionRegion::new("arena", [0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        assert!(region.contains(&Location::new("arena", 10.0, 10.0, 10.0)));
        assert!(region.contains(&Location::new("arena", 0.0, 0.0, 0.0)));
        assert!(!region.contains(&Location::new("arena", 10.1, 5.0, 5.0)));
    }

    #[test]
    fn other_world_is_outside() {
        let region = ProtectionRegion::new("arena", [0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        assert!(!region.contains(&Location::new("lobby", 5.0, 5.0, 5.0)));
    }

    #[test]
    fn set_replaces_existing_region() {
        let mut registry = ProtectionRegistry::new();
        registry.set(
            Team::Red,
            ProtectionRegion::new("arena", [0.0; 3], [5.0; 3]),
        );
        registry.set(
            Team::Red,
            ProtectionRegion::new("arena", [100.0; 3], [105.0; 3]),
        );
        assert!(!registry.contains(Team::Red, &Location::new("arena", 2.0, 2.0, 2.0)));
        assert!(registry.contains(Team::Red, &Location::new("arena", 102.0, 102.0, 102.0)));
    }

    #[test]
    fn unconfigured_team_is_unprotected() {
        let registry = ProtectionRegistry::new();
        assert!(!registry.contains(Team::Blue, &Location::new("arena", 0.0, 0.0, 0.0)));
    }
}
