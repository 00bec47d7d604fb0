//! Thin client over the marketplace REST API.
//!
//! Every method is a single request/response pair; all business rules
//! (pricing, commission, payouts, dispute handling) live server-side and are
//! opaque here. Non-2xx responses are decoded into [`AppError::Api`] with
//! whatever message the server attached.

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::RwLock;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{
    AuthResponse, Booking, BookingStatus, BookingType, LocationTracking, ParkingSpace,
    SpaceStatus, User, Vehicle,
};
use crate::tracker::TrackingSync;

pub struct ApiClient {
    client: Client,
    base_url: String,
    // Set after login / session restore; read on every authenticated request.
    access_token: RwLock<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub user_type: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBooking {
    pub parking_space: i64,
    pub vehicle: i64,
    pub booking_type: BookingType,
    pub start_datetime: String,
    pub end_datetime: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub special_instructions: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSpace {
    pub title: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub area: String,
    pub location: crate::models::GeoLocation,
    pub space_type: crate::models::SpaceType,
    pub total_spaces: u32,
    pub price_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewVehicle {
    pub vehicle_number: String,
    pub vehicle_type: String,
    pub vehicle_model: String,
    pub vehicle_color: String,
}

/// Wrapper for list endpoints that paginate.
#[derive(Deserialize)]
struct Paged<T> {
    results: Vec<T>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: RwLock::new(None),
        })
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match self.access_token.read().ok().and_then(|t| t.clone()) {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-2xx response into `AppError::Api`, extracting the
    /// server's `error`/`detail` message when one is present.
    async fn check(resp: Response) -> Result<Response, AppError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = match resp.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("error")
                .or_else(|| body.get("detail"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string()),
            Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
        };
        Err(AppError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // --- auth ---

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, AppError> {
        let resp = self
            .client
            .post(self.url("/auth/login/"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = Self::check(resp).await?.json().await?;
        self.set_token(Some(auth.access.clone()));
        Ok(auth)
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, AppError> {
        let resp = self
            .client
            .post(self.url("/auth/register/"))
            .json(req)
            .send()
            .await?;
        let auth: AuthResponse = Self::check(resp).await?.json().await?;
        self.set_token(Some(auth.access.clone()));
        Ok(auth)
    }

    pub async fn update_profile(&self, fields: &serde_json::Value) -> Result<User, AppError> {
        let resp = self
            .authed(self.client.put(self.url("/auth/profile/")))
            .json(fields)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    // --- parking spaces ---

    pub async fn search_nearby(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> Result<Vec<ParkingSpace>, AppError> {
        let resp = self
            .authed(self.client.get(self.url("/parking-spaces/nearby/")))
            .query(&[("lat", lat), ("lng", lng), ("radius", radius_km)])
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn search_by_city(&self, city: &str) -> Result<Vec<ParkingSpace>, AppError> {
        let resp = self
            .authed(self.client.get(self.url("/parking-spaces/")))
            .query(&[("city", city), ("page_size", "20")])
            .send()
            .await?;
        let page: Paged<ParkingSpace> = Self::check(resp).await?.json().await?;
        Ok(page.results)
    }

    pub async fn space_details(&self, id: i64) -> Result<ParkingSpace, AppError> {
        let resp = self
            .authed(self.client.get(self.url(&format!("/parking-spaces/{id}/"))))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn my_spaces(&self) -> Result<Vec<ParkingSpace>, AppError> {
        let resp = self
            .authed(self.client.get(self.url("/parking-spaces/my_spaces/")))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn create_space(&self, space: &NewSpace) -> Result<ParkingSpace, AppError> {
        let resp = self
            .authed(self.client.post(self.url("/parking-spaces/")))
            .json(space)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn update_space_status(
        &self,
        id: i64,
        status: SpaceStatus,
    ) -> Result<(), AppError> {
        let resp = self
            .authed(
                self.client
                    .post(self.url(&format!("/parking-spaces/{id}/update_status/"))),
            )
            .json(&json!({ "status": status }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    // --- vehicles ---

    pub async fn my_vehicles(&self) -> Result<Vec<Vehicle>, AppError> {
        let resp = self
            .authed(self.client.get(self.url("/vehicles/")))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn register_vehicle(&self, vehicle: &NewVehicle) -> Result<Vehicle, AppError> {
        let resp = self
            .authed(self.client.post(self.url("/vehicles/")))
            .json(vehicle)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn delete_vehicle(&self, id: i64) -> Result<(), AppError> {
        let resp = self
            .authed(self.client.delete(self.url(&format!("/vehicles/{id}/"))))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    // --- bookings ---

    pub async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, AppError> {
        let resp = self
            .authed(self.client.post(self.url("/bookings/")))
            .json(booking)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn my_bookings(&self) -> Result<Vec<Booking>, AppError> {
        let resp = self
            .authed(self.client.get(self.url("/bookings/my_bookings/")))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn booking_details(&self, id: i64) -> Result<Booking, AppError> {
        let resp = self
            .authed(self.client.get(self.url(&format!("/bookings/{id}/"))))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn update_booking_status(
        &self,
        id: i64,
        status: BookingStatus,
    ) -> Result<Booking, AppError> {
        let resp = self
            .authed(
                self.client
                    .post(self.url(&format!("/bookings/{id}/update_status/"))),
            )
            .json(&json!({ "status": status }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn confirm_booking(&self, id: i64) -> Result<Booking, AppError> {
        let resp = self
            .authed(
                self.client
                    .post(self.url(&format!("/bookings/{id}/confirm_booking/"))),
            )
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn cancel_booking(&self, id: i64) -> Result<(), AppError> {
        let resp = self
            .authed(
                self.client
                    .post(self.url(&format!("/bookings/{id}/cancel_booking/"))),
            )
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn tracking_info(&self, id: i64) -> Result<LocationTracking, AppError> {
        let resp = self
            .authed(
                self.client
                    .get(self.url(&format!("/bookings/{id}/tracking_info/"))),
            )
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

impl TrackingSync for ApiClient {
    async fn update_location(
        &self,
        booking_id: i64,
        latitude: f64,
        longitude: f64,
        distance_remaining: f64,
        eta_minutes: u32,
    ) -> Result<(), AppError> {
        let resp = self
            .authed(
                self.client
                    .put(self.url(&format!("/bookings/{booking_id}/update_location/"))),
            )
            .json(&json!({
                "current_latitude": latitude,
                "current_longitude": longitude,
                "distance_remaining": distance_remaining,
                "eta_minutes": eta_minutes,
            }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let api = ApiClient::new("http://localhost:8001/api/v1/", 5).unwrap();
        assert_eq!(
            api.url("/bookings/7/update_location/"),
            "http://localhost:8001/api/v1/bookings/7/update_location/"
        );
    }

    #[test]
    fn new_booking_omits_empty_instructions() {
        let booking = NewBooking {
            parking_space: 7,
            vehicle: 3,
            booking_type: crate::models::BookingType::Daily,
            start_datetime: "2026-08-30T10:00:00Z".into(),
            end_datetime: "2026-08-31T10:00:00Z".into(),
            special_instructions: String::new(),
        };
        let body = serde_json::to_value(&booking).unwrap();
        assert!(body.get("special_instructions").is_none());
        assert_eq!(body["parking_space"], 7);
        assert_eq!(body["booking_type"], "daily");
    }
}
