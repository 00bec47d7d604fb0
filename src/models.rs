use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub user_type: UserType,
    #[serde(default)]
    pub owner_rating: f64,
    #[serde(default)]
    pub driver_rating: f64,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    User,
    Owner,
    Both,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub vehicle_number: String,
    pub vehicle_type: String,
    #[serde(default)]
    pub vehicle_model: String,
    #[serde(default)]
    pub vehicle_color: String,
    #[serde(default)]
    pub is_active: bool,
}

/// GeoJSON-style point as the API serves it: `coordinates` is `[lng, lat]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLocation {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoLocation {
    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    Garage,
    Open,
    Covered,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceStatus {
    Available,
    Booked,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingSpace {
    pub id: i64,
    pub owner: User,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub landmark: String,
    pub location: GeoLocation,
    pub space_type: SpaceType,
    pub total_spaces: u32,
    pub available_spaces: u32,
    pub price_per_day: f64,
    #[serde(default)]
    pub price_per_month: f64,
    #[serde(default)]
    pub has_security_camera: bool,
    #[serde(default)]
    pub has_lighting: bool,
    #[serde(default)]
    pub has_ev_charging: bool,
    #[serde(default)]
    pub has_24_7_access: bool,
    #[serde(default)]
    pub rating: f64,
    pub status: SpaceStatus,
    /// Distance from the search origin, filled in by the nearby endpoint.
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Booking lifecycle labels as the server issues them.
///
/// Transitions happen server-side via explicit status-update calls; the
/// client's only local rule is that a terminal booking is never mutated and
/// only an `Active` booking is location-tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Active,
    Arrived,
    Parked,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Completed and cancelled bookings are immutable.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Wire label, for error messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Arrived => "arrived",
            BookingStatus::Parked => "parked",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "Awaiting payment",
            BookingStatus::Confirmed => "Ready to start your journey",
            BookingStatus::Active => "You are on your way to the parking",
            BookingStatus::Arrived => "You've arrived at the destination",
            BookingStatus::Parked => "Your vehicle is parked",
            BookingStatus::Completed => "Booking completed",
            BookingStatus::Cancelled => "Booking cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationTracking {
    #[serde(default)]
    pub current_latitude: f64,
    #[serde(default)]
    pub current_longitude: f64,
    pub destination_latitude: f64,
    pub destination_longitude: f64,
    #[serde(default)]
    pub distance_remaining: f64,
    #[serde(default)]
    pub eta_minutes: u32,
    #[serde(default)]
    pub is_tracking_active: bool,
    #[serde(default)]
    pub reached_destination: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub driver: User,
    pub parking_space: ParkingSpace,
    pub vehicle: Vehicle,
    pub booking_type: BookingType,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub status: BookingStatus,
    pub base_price: f64,
    #[serde(default)]
    pub discount: f64,
    pub total_price: f64,
    #[serde(default)]
    pub special_instructions: String,
    pub location_tracking: LocationTracking,
    #[serde(default)]
    pub review: Option<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn sample_user() -> User {
        User {
            id: 1,
            username: "asha".into(),
            email: "asha@example.com".into(),
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            phone_number: "+911234567890".into(),
            user_type: UserType::User,
            owner_rating: 0.0,
            driver_rating: 4.8,
            is_verified: true,
        }
    }

    pub fn sample_space() -> ParkingSpace {
        ParkingSpace {
            id: 7,
            owner: sample_user(),
            title: "Covered spot near MG Road".into(),
            description: String::new(),
            address: "12 Brigade Rd".into(),
            city: "Bengaluru".into(),
            area: "Ashok Nagar".into(),
            landmark: String::new(),
            location: GeoLocation {
                kind: "Point".into(),
                coordinates: [77.6245, 12.9352],
            },
            space_type: SpaceType::Covered,
            total_spaces: 4,
            available_spaces: 1,
            price_per_day: 250.0,
            price_per_month: 5000.0,
            has_security_camera: true,
            has_lighting: true,
            has_ev_charging: false,
            has_24_7_access: true,
            rating: 4.5,
            status: SpaceStatus::Booked,
            distance: None,
        }
    }

    pub fn sample_booking(status: BookingStatus) -> Booking {
        Booking {
            id: 42,
            driver: sample_user(),
            parking_space: sample_space(),
            vehicle: Vehicle {
                id: 3,
                vehicle_number: "KA01AB1234".into(),
                vehicle_type: "car".into(),
                vehicle_model: "Swift".into(),
                vehicle_color: "white".into(),
                is_active: true,
            },
            booking_type: BookingType::Daily,
            start_datetime: Utc::now(),
            end_datetime: Utc::now() + chrono::Duration::hours(8),
            status,
            base_price: 250.0,
            discount: 0.0,
            total_price: 250.0,
            special_instructions: String::new(),
            location_tracking: LocationTracking {
                current_latitude: 0.0,
                current_longitude: 0.0,
                destination_latitude: 12.9352,
                destination_longitude: 77.6245,
                distance_remaining: 0.0,
                eta_minutes: 0,
                is_tracking_active: false,
                reached_destination: false,
                updated_at: None,
            },
            review: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_status_uses_snake_case_wire_labels() {
        let parsed: BookingStatus = serde_json::from_str("\"pending_payment\"").unwrap();
        assert_eq!(parsed, BookingStatus::PendingPayment);
        assert_eq!(
            serde_json::to_string(&BookingStatus::Active).unwrap(),
            "\"active\""
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(!BookingStatus::Parked.is_terminal());
        assert!(!BookingStatus::Active.is_terminal());
    }

    #[test]
    fn geolocation_coordinates_are_lng_lat() {
        let loc: GeoLocation =
            serde_json::from_str(r#"{"type":"Point","coordinates":[77.6245,12.9352]}"#).unwrap();
        assert_eq!(loc.lat(), 12.9352);
        assert_eq!(loc.lng(), 77.6245);
    }
}
