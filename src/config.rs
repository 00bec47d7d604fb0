use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub location: LocationConfig,
    pub tracking: TrackingConfig,
    pub ui: UiConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,       // e.g. http://localhost:8001/api/v1
    pub timeout_seconds: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LocationConfig {
    pub auto_locate: bool, // Use IP geolocation if true
    pub manual_lat: f64,   // Coordinates used if auto_locate is false
    pub manual_lon: f64,
    pub search_radius_km: f64, // Radius for the nearby-spaces query
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrackingConfig {
    pub update_interval_seconds: u64,
    pub avg_speed_kmh: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UiConfig {
    pub default_view: String, // "Search", "Bookings", or "Vehicles"
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        let config_path = "config.toml";

        if let Ok(content) = fs::read_to_string(config_path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => warn!("Failed to parse config.toml: {}. Using defaults.", e),
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(config_path, toml_string).is_err() {
                    warn!("Could not write default config.toml to disk.");
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: "http://localhost:8001/api/v1".to_string(),
                timeout_seconds: 30,
            },
            location: LocationConfig {
                auto_locate: true,
                manual_lat: 12.9716,
                manual_lon: 77.5946,
                search_radius_km: 5.0,
            },
            tracking: TrackingConfig {
                update_interval_seconds: 30,
                avg_speed_kmh: 40.0,
            },
            ui: UiConfig {
                default_view: "Search".to_string(),
            },
        }
    }
}
