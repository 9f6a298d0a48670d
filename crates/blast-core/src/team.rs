use serde::{Deserialize, Serialize};

/// The four fixed BLAST teams, defined at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Team {
    /// Enumeration order. Round-robin assignment, balancing tie-breaks, and
    /// win-resolution tie enumeration all walk this order.
    pub const ALL: [Team; 4] = [Team::Red, Team::Green, Team::Yellow, Team::Blue];

    /// Stable lowercase key used in config and broadcasts.
    pub fn key(self) -> &'static str {
        match self {
            Team::Red => "red",
            Team::Green => "green",
            Team::Yellow => "yellow",
            Team::Blue => "blue",
        }
    }

    /// Legacy chat color code for player-facing messages.
    pub fn color_code(self) -> &'static str {
        match self {
            Team::Red => "§c",
            Team::Green => "§a",
            Team::Yellow => "§e",
            Team::Blue => "§9",
        }
    }

    /// Block material this team places and receives on spawn.
    pub fn block_material(self) -> &'static str {
        match self {
            Team::Red => "red_wool",
            Team::Green => "green_wool",
            Team::Yellow => "yellow_wool",
            Team::Blue => "blue_wool",
        }
    }

    /// Resolve a team from its key, case-insensitively.
    pub fn from_key(key: &str) -> Option<Team> {
        let k = key.trim().to_ascii_lowercase();
        Team::ALL.into_iter().find(|t| t.key() == k)
    }

    pub fn display_name(self) -> String {
        format!("{}{}", self.color_code(), self.key().to_ascii_uppercase())
    }
}
