//! Location fixes for the active-booking tracker.
//!
//! The original platform asked the device GPS for a position; a terminal
//! client gets the same best-effort answer from IP geolocation (IpApi via
//! the `ipgeolocate` crate), or from fixed coordinates in config. Every call
//! requests a fresh fix; nothing is cached.

use chrono::{DateTime, Utc};
use ipgeolocate::{Locator, Service};
use std::future::Future;
use tracing::info;

use crate::config::LocationConfig;
use crate::error::AppError;

/// A single geolocation reading. Produced on demand, consumed immediately by
/// the tracking cycle, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated radius in metres. IP lookups are city-level at best.
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

/// Something that can produce a fresh [`LocationFix`].
///
/// Failures map to [`AppError::PositionUnavailable`] and are recoverable:
/// the tracking loop skips the cycle and tries again on the next tick.
pub trait LocationSource {
    fn current_fix(&self) -> impl Future<Output = Result<LocationFix, AppError>> + Send;
}

/// Production source: IP geolocation, or manual coordinates from config.
pub enum DeviceLocator {
    IpLookup,
    Manual { lat: f64, lon: f64 },
}

impl DeviceLocator {
    pub fn from_config(cfg: &LocationConfig) -> Self {
        if cfg.auto_locate {
            DeviceLocator::IpLookup
        } else {
            DeviceLocator::Manual {
                lat: cfg.manual_lat,
                lon: cfg.manual_lon,
            }
        }
    }
}

impl LocationSource for DeviceLocator {
    async fn current_fix(&self) -> Result<LocationFix, AppError> {
        match self {
            // Using IpApi as the service, it's pretty reliable.
            DeviceLocator::IpLookup => match Locator::get("1.1.1.1", Service::IpApi).await {
                Ok(loc) => {
                    let lat = loc.latitude.parse::<f64>().map_err(|e| {
                        AppError::PositionUnavailable(format!("bad latitude in response: {e}"))
                    })?;
                    let lon = loc.longitude.parse::<f64>().map_err(|e| {
                        AppError::PositionUnavailable(format!("bad longitude in response: {e}"))
                    })?;
                    info!("Geolocation successful - ({}, {})", lat, lon);
                    Ok(LocationFix {
                        latitude: lat,
                        longitude: lon,
                        accuracy: 5_000.0,
                        timestamp: Utc::now(),
                    })
                }
                Err(e) => Err(AppError::PositionUnavailable(e.to_string())),
            },
            DeviceLocator::Manual { lat, lon } => Ok(LocationFix {
                latitude: *lat,
                longitude: *lon,
                accuracy: 10.0,
                timestamp: Utc::now(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_locator_returns_configured_coordinates() {
        let source = DeviceLocator::Manual {
            lat: 12.9716,
            lon: 77.5946,
        };
        let fix = source.current_fix().await.unwrap();
        assert_eq!(fix.latitude, 12.9716);
        assert_eq!(fix.longitude, 77.5946);
    }

    #[test]
    fn from_config_honours_auto_locate_flag() {
        let cfg = LocationConfig {
            auto_locate: false,
            manual_lat: 1.0,
            manual_lon: 2.0,
            search_radius_km: 5.0,
        };
        match DeviceLocator::from_config(&cfg) {
            DeviceLocator::Manual { lat, lon } => {
                assert_eq!(lat, 1.0);
                assert_eq!(lon, 2.0);
            }
            DeviceLocator::IpLookup => panic!("expected manual locator"),
        }
    }
}
