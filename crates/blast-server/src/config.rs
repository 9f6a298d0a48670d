use serde::Deserialize;

use blast_engine::EngineConfig;
use blast_engine::queue::QueueConfig;

/// Top-level server configuration, loaded from `blast.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TOML file holding the map catalog.
    pub maps_file: String,
    pub match_settings: MatchSettings,
    pub queue: QueueSettings,
    pub stats: StatsSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            maps_file: "blast-maps.toml".to_string(),
            match_settings: MatchSettings::default(),
            queue: QueueSettings::default(),
            stats: StatsSettings::default(),
        }
    }
}

/// Match ruleset knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    pub duration_secs: u64,
    pub starting_lives: u32,
    pub min_players: usize,
    pub max_players: usize,
    /// Preferred map name; empty picks the first configured map.
    pub map: String,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            duration_secs: 1_200,
            starting_lives: 80,
            min_players: 2,
            max_players: 16,
            map: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub countdown_secs: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self { countdown_secs: 30 }
    }
}

/// Match history sink.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StatsSettings {
    pub enabled: bool,
    pub path: Option<String>,
}

impl ServerConfig {
    /// Validate configuration, exiting on values the engine cannot run with.
    pub fn validate(&self) {
        if self.match_settings.duration_secs == 0 {
            tracing::error!("match_settings.duration_secs must be > 0");
            std::process::exit(1);
        }
        if self.match_settings.starting_lives == 0 {
            tracing::error!("match_settings.starting_lives must be > 0");
            std::process::exit(1);
        }
        if self.match_settings.min_players < 2 {
            tracing::error!("match_settings.min_players must be at least 2");
            std::process::exit(1);
        }
        if self.match_settings.max_players < self.match_settings.min_players {
            tracing::error!("match_settings.max_players must be >= min_players");
            std::process::exit(1);
        }
        if self.queue.countdown_secs == 0 {
            tracing::error!("queue.countdown_secs must be > 0");
            std::process::exit(1);
        }
        if self.stats.enabled && self.stats.path.is_none() {
            tracing::warn!("stats enabled without a path, match history will be dropped");
        }
    }

    /// Load config from `blast.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("blast.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from blast.toml");
                    cfg
                }
                Err(e) => {
                    tracing::warn!("Failed to parse blast.toml: {e}, using defaults");
                    ServerConfig::default()
                }
            },
            Err(_) => {
                tracing::info!("No blast.toml found, using defaults");
                ServerConfig::default()
            }
        };

        if let Ok(path) = std::env::var("BLAST_MAPS_FILE")
            && !path.is_empty()
        {
            config.maps_file = path;
        }
        if let Ok(map) = std::env::var("BLAST_MAP")
            && !map.is_empty()
        {
            config.match_settings.map = map;
        }
        if let Ok(val) = std::env::var("BLAST_MATCH_DURATION_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.match_settings.duration_secs = n;
        }
        if let Ok(val) = std::env::var("BLAST_STARTING_LIVES")
            && let Ok(n) = val.parse::<u32>()
        {
            config.match_settings.starting_lives = n;
        }
        if let Ok(val) = std::env::var("BLAST_MIN_PLAYERS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.match_settings.min_players = n;
        }
        if let Ok(val) = std::env::var("BLAST_MAX_PLAYERS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.match_settings.max_players = n;
        }
        if let Ok(val) = std::env::var("BLAST_COUNTDOWN_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.queue.countdown_secs = n;
        }
        if let Ok(path) = std::env::var("BLAST_STATS_PATH")
            && !path.is_empty()
        {
            config.stats.enabled = true;
            config.stats.path = Some(path);
        }

        config
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            match_duration_secs: self.match_settings.duration_secs,
            starting_lives: self.match_settings.starting_lives,
            min_players: self.match_settings.min_players,
            max_players: self.match_settings.max_players,
        }
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            countdown_secs: self.queue.countdown_secs,
            min_players: self.match_settings.min_players,
            max_players: self.match_settings.max_players,
        }
    }
}
