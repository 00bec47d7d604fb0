//! Application state and key handling.
//!
//! `App` owns everything the UI renders: the signed-in user, search results,
//! bookings, and the live tracking snapshot. Key presses either mutate state
//! directly (navigation, prompts) or return an [`Action`] for the main loop
//! to dispatch as an API task; nothing in here blocks.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::api::{NewVehicle, RegisterRequest};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{Booking, ParkingSpace, User, Vehicle};
use crate::tracker::TrackingSnapshot;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ViewMode {
    Login,
    Register,
    Search,
    Bookings,
    ActiveBooking,
    Vehicles,
    AddVehicle,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum LoginField {
    Username,
    Password,
}

/// Account sign-up form. `focus` indexes the fields top to bottom.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub password: String,
    pub password_confirm: String,
    pub focus: usize,
}

impl RegisterForm {
    pub const FIELD_COUNT: usize = 7;

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            0 => &mut self.username,
            1 => &mut self.email,
            2 => &mut self.first_name,
            3 => &mut self.last_name,
            4 => &mut self.phone_number,
            5 => &mut self.password,
            _ => &mut self.password_confirm,
        }
    }
}

/// New-vehicle form, opened from the vehicles view.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VehicleForm {
    pub number: String,
    pub vehicle_type: String,
    pub model: String,
    pub color: String,
    pub focus: usize,
}

impl VehicleForm {
    pub const FIELD_COUNT: usize = 4;

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            0 => &mut self.number,
            1 => &mut self.vehicle_type,
            2 => &mut self.model,
            _ => &mut self.color,
        }
    }
}

/// Asynchronous work requested by a key press, executed by the main loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Login { username: String, password: String },
    Register(RegisterRequest),
    Logout,
    Refresh,
    BookSpace(i64),
    OpenBooking(i64),
    MarkParked(i64),
    CancelBooking(i64),
    AddVehicle(NewVehicle),
    DeleteVehicle(i64),
}

pub struct App {
    pub view_mode: ViewMode,
    pub config: Config,
    pub user: Option<User>,

    pub spaces: Vec<ParkingSpace>,
    pub selected_space: usize,
    pub bookings: Vec<Booking>,
    pub selected_booking: usize,
    pub vehicles: Vec<Vehicle>,
    pub selected_vehicle: usize,

    pub active_booking: Option<Booking>,
    pub snapshot: Option<TrackingSnapshot>,
    pub time_remaining: String,

    pub status_line: String,
    pub confirm_cancel: bool,
    pub should_quit: bool,
    pub tick_count: usize,

    // Login form
    pub username_input: String,
    pub password_input: String,
    pub login_focus: LoginField,

    pub register_form: RegisterForm,
    pub vehicle_form: VehicleForm,
}

impl App {
    pub fn new(config: Config, user: Option<User>) -> Self {
        let view_mode = if user.is_some() {
            match config.ui.default_view.as_str() {
                "Bookings" => ViewMode::Bookings,
                "Vehicles" => ViewMode::Vehicles,
                _ => ViewMode::Search,
            }
        } else {
            ViewMode::Login
        };

        Self {
            view_mode,
            config,
            user,
            spaces: Vec::new(),
            selected_space: 0,
            bookings: Vec::new(),
            selected_booking: 0,
            vehicles: Vec::new(),
            selected_vehicle: 0,
            active_booking: None,
            snapshot: None,
            time_remaining: String::new(),
            status_line: String::new(),
            confirm_cancel: false,
            should_quit: false,
            tick_count: 0,
            username_input: String::new(),
            password_input: String::new(),
            login_focus: LoginField::Username,
            register_form: RegisterForm::default(),
            vehicle_form: VehicleForm::default(),
        }
    }

    pub fn on_tick(&mut self) {
        self.tick_count += 1;
        if let Some(booking) = &self.active_booking {
            self.time_remaining = format_countdown(booking.end_datetime, Utc::now());
        }
    }

    pub fn selected_space_ref(&self) -> Option<&ParkingSpace> {
        self.spaces.get(self.selected_space)
    }

    pub fn selected_booking_ref(&self) -> Option<&Booking> {
        self.bookings.get(self.selected_booking)
    }

    /// Applies a booking returned by the server. Replaces the active booking
    /// when ids match and keeps the bookings list in step.
    pub fn apply_booking(&mut self, booking: Booking) {
        if let Some(entry) = self.bookings.iter_mut().find(|b| b.id == booking.id) {
            *entry = booking.clone();
        }
        match &self.active_booking {
            Some(active) if active.id == booking.id => {
                self.active_booking = Some(booking);
            }
            None if self.view_mode == ViewMode::ActiveBooking => {
                self.active_booking = Some(booking);
            }
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return None;
        }

        // Text-entry views take every key before the global bindings.
        match self.view_mode {
            ViewMode::Login => return self.handle_login_key(key),
            ViewMode::Register => return self.handle_register_key(key),
            ViewMode::AddVehicle => return self.handle_vehicle_form_key(key),
            _ => {}
        }

        if self.confirm_cancel {
            self.confirm_cancel = false;
            if key.code == KeyCode::Char('y') {
                if let Some(booking) = &self.active_booking {
                    return Some(Action::CancelBooking(booking.id));
                }
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Char('1') => {
                self.view_mode = ViewMode::Search;
                None
            }
            KeyCode::Char('2') => {
                self.view_mode = ViewMode::Bookings;
                None
            }
            KeyCode::Char('3') => {
                self.view_mode = ViewMode::Vehicles;
                None
            }
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('x') => Some(Action::Logout),
            _ => match self.view_mode {
                ViewMode::Search => self.handle_search_key(key),
                ViewMode::Bookings => self.handle_bookings_key(key),
                ViewMode::ActiveBooking => self.handle_active_key(key),
                ViewMode::Vehicles => self.handle_vehicles_key(key),
                _ => None,
            },
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('n') {
            self.register_form = RegisterForm::default();
            self.status_line.clear();
            self.view_mode = ViewMode::Register;
            return None;
        }
        match key.code {
            KeyCode::Tab | KeyCode::Down | KeyCode::Up => {
                self.login_focus = match self.login_focus {
                    LoginField::Username => LoginField::Password,
                    LoginField::Password => LoginField::Username,
                };
                None
            }
            KeyCode::Enter => {
                if self.username_input.is_empty() || self.password_input.is_empty() {
                    self.status_line = "Enter a username and password".to_string();
                    return None;
                }
                Some(Action::Login {
                    username: self.username_input.clone(),
                    password: self.password_input.clone(),
                })
            }
            KeyCode::Backspace => {
                match self.login_focus {
                    LoginField::Username => self.username_input.pop(),
                    LoginField::Password => self.password_input.pop(),
                };
                None
            }
            KeyCode::Char(c) => {
                match self.login_focus {
                    LoginField::Username => self.username_input.push(c),
                    LoginField::Password => self.password_input.push(c),
                };
                None
            }
            _ => None,
        }
    }

    fn handle_register_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.status_line.clear();
                self.view_mode = ViewMode::Login;
                None
            }
            KeyCode::Tab | KeyCode::Down => {
                self.register_form.focus =
                    (self.register_form.focus + 1) % RegisterForm::FIELD_COUNT;
                None
            }
            KeyCode::Up => {
                self.register_form.focus = self
                    .register_form
                    .focus
                    .checked_sub(1)
                    .unwrap_or(RegisterForm::FIELD_COUNT - 1);
                None
            }
            KeyCode::Enter => self.submit_registration(),
            KeyCode::Backspace => {
                self.register_form.focused_mut().pop();
                None
            }
            KeyCode::Char(c) => {
                self.register_form.focused_mut().push(c);
                None
            }
            _ => None,
        }
    }

    fn submit_registration(&mut self) -> Option<Action> {
        let form = &self.register_form;
        if form.username.is_empty() || form.email.is_empty() || form.password.is_empty() {
            self.status_line = "Username, email, and password are required".to_string();
            return None;
        }
        if form.password != form.password_confirm {
            self.status_line = "Passwords do not match".to_string();
            return None;
        }
        Some(Action::Register(RegisterRequest {
            username: form.username.clone(),
            email: form.email.clone(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            phone_number: form.phone_number.clone(),
            user_type: "user".to_string(),
            password: form.password.clone(),
            password_confirm: form.password_confirm.clone(),
        }))
    }

    fn handle_vehicle_form_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.status_line.clear();
                self.view_mode = ViewMode::Vehicles;
                None
            }
            KeyCode::Tab | KeyCode::Down => {
                self.vehicle_form.focus = (self.vehicle_form.focus + 1) % VehicleForm::FIELD_COUNT;
                None
            }
            KeyCode::Up => {
                self.vehicle_form.focus = self
                    .vehicle_form
                    .focus
                    .checked_sub(1)
                    .unwrap_or(VehicleForm::FIELD_COUNT - 1);
                None
            }
            KeyCode::Enter => {
                let form = &self.vehicle_form;
                if form.number.is_empty() || form.vehicle_type.is_empty() {
                    self.status_line = "Vehicle number and type are required".to_string();
                    return None;
                }
                let vehicle = NewVehicle {
                    vehicle_number: form.number.clone(),
                    vehicle_type: form.vehicle_type.clone(),
                    vehicle_model: form.model.clone(),
                    vehicle_color: form.color.clone(),
                };
                self.view_mode = ViewMode::Vehicles;
                Some(Action::AddVehicle(vehicle))
            }
            KeyCode::Backspace => {
                self.vehicle_form.focused_mut().pop();
                None
            }
            KeyCode::Char(c) => {
                self.vehicle_form.focused_mut().push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.spaces.is_empty() {
                    self.selected_space = (self.selected_space + 1) % self.spaces.len();
                }
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if !self.spaces.is_empty() {
                    self.selected_space = self
                        .selected_space
                        .checked_sub(1)
                        .unwrap_or(self.spaces.len() - 1);
                }
                None
            }
            KeyCode::Enter => {
                let space = self.selected_space_ref()?;
                if self.vehicles.iter().any(|v| v.is_active) {
                    Some(Action::BookSpace(space.id))
                } else {
                    self.status_line = "Register a vehicle before booking".to_string();
                    None
                }
            }
            _ => None,
        }
    }

    fn handle_bookings_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.bookings.is_empty() {
                    self.selected_booking = (self.selected_booking + 1) % self.bookings.len();
                }
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if !self.bookings.is_empty() {
                    self.selected_booking = self
                        .selected_booking
                        .checked_sub(1)
                        .unwrap_or(self.bookings.len() - 1);
                }
                None
            }
            KeyCode::Enter => {
                let booking = self.selected_booking_ref()?;
                let id = booking.id;
                self.view_mode = ViewMode::ActiveBooking;
                self.active_booking = None;
                self.snapshot = None;
                Some(Action::OpenBooking(id))
            }
            _ => None,
        }
    }

    fn handle_active_key(&mut self, key: KeyEvent) -> Option<Action> {
        // Esc works even while the booking is still loading.
        if key.code == KeyCode::Esc {
            self.view_mode = ViewMode::Bookings;
            return None;
        }
        let booking = self.active_booking.as_ref()?;
        match key.code {
            KeyCode::Char('p') => {
                if booking.status.is_terminal() {
                    self.status_line = AppError::InvalidBookingState {
                        id: booking.id,
                        status: booking.status.as_str().to_string(),
                    }
                    .to_string();
                    None
                } else {
                    Some(Action::MarkParked(booking.id))
                }
            }
            KeyCode::Char('c') => {
                if booking.status.is_terminal() {
                    self.status_line = AppError::InvalidBookingState {
                        id: booking.id,
                        status: booking.status.as_str().to_string(),
                    }
                    .to_string();
                } else {
                    self.confirm_cancel = true;
                }
                None
            }
            KeyCode::Char('m') => {
                let t = &booking.location_tracking;
                crate::launch::open_navigation(t.destination_latitude, t.destination_longitude);
                None
            }
            KeyCode::Char('o') => {
                let phone = &booking.parking_space.owner.phone_number;
                if phone.is_empty() {
                    self.status_line = "Owner has no phone number on file".to_string();
                } else {
                    crate::launch::dial(phone);
                }
                None
            }
            _ => None,
        }
    }

    fn handle_vehicles_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.vehicles.is_empty() {
                    self.selected_vehicle = (self.selected_vehicle + 1) % self.vehicles.len();
                }
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if !self.vehicles.is_empty() {
                    self.selected_vehicle = self
                        .selected_vehicle
                        .checked_sub(1)
                        .unwrap_or(self.vehicles.len() - 1);
                }
                None
            }
            KeyCode::Char('a') => {
                self.vehicle_form = VehicleForm::default();
                self.status_line.clear();
                self.view_mode = ViewMode::AddVehicle;
                None
            }
            KeyCode::Char('d') => {
                let vehicle = self.vehicles.get(self.selected_vehicle)?;
                Some(Action::DeleteVehicle(vehicle.id))
            }
            _ => None,
        }
    }
}

/// Countdown to the booking end, `Xh Ym Zs`, in the style of the booking
/// detail header.
pub fn format_countdown(end: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = end - now;
    if diff.num_seconds() <= 0 {
        return "Time's up!".to_string();
    }
    let hours = diff.num_hours();
    let minutes = diff.num_minutes() % 60;
    let seconds = diff.num_seconds() % 60;
    format!("{hours}h {minutes}m {seconds}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_booking;
    use crate::models::BookingStatus;
    use chrono::TimeZone;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn app_with_active(status: BookingStatus) -> App {
        let mut app = App::new(Config::default(), None);
        app.view_mode = ViewMode::ActiveBooking;
        app.active_booking = Some(sample_booking(status));
        app
    }

    #[test]
    fn countdown_formats_remaining_time() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 8, 30, 12, 30, 5).unwrap();
        assert_eq!(format_countdown(end, now), "2h 30m 5s");
        assert_eq!(format_countdown(now, end), "Time's up!");
    }

    #[test]
    fn parked_action_refused_on_terminal_booking() {
        let mut app = app_with_active(BookingStatus::Completed);
        assert_eq!(app.handle_key(key(KeyCode::Char('p'))), None);
        assert_eq!(app.status_line, "booking 42 is completed, not active");
    }

    #[test]
    fn esc_leaves_the_booking_view_before_it_loads() {
        let mut app = App::new(Config::default(), None);
        app.view_mode = ViewMode::ActiveBooking;
        assert_eq!(app.handle_key(key(KeyCode::Esc)), None);
        assert_eq!(app.view_mode, ViewMode::Bookings);
    }

    #[test]
    fn parked_action_allowed_while_active() {
        let mut app = app_with_active(BookingStatus::Active);
        assert_eq!(
            app.handle_key(key(KeyCode::Char('p'))),
            Some(Action::MarkParked(42))
        );
    }

    #[test]
    fn cancel_requires_confirmation() {
        let mut app = app_with_active(BookingStatus::Confirmed);
        assert_eq!(app.handle_key(key(KeyCode::Char('c'))), None);
        assert!(app.confirm_cancel);
        assert_eq!(
            app.handle_key(key(KeyCode::Char('y'))),
            Some(Action::CancelBooking(42))
        );
        assert!(!app.confirm_cancel);
    }

    #[test]
    fn cancel_prompt_dismissed_by_any_other_key() {
        let mut app = app_with_active(BookingStatus::Confirmed);
        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(app.handle_key(key(KeyCode::Esc)), None);
        assert!(!app.confirm_cancel);
    }

    #[test]
    fn booking_requires_an_active_vehicle() {
        let mut app = App::new(Config::default(), None);
        app.view_mode = ViewMode::Search;
        app.spaces = vec![sample_booking(BookingStatus::Active).parking_space];
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert!(app.status_line.contains("vehicle"));
    }

    #[test]
    fn login_form_collects_credentials() {
        let mut app = App::new(Config::default(), None);
        assert_eq!(app.view_mode, ViewMode::Login);
        for c in "asha".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Tab));
        for c in "pw".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            Some(Action::Login {
                username: "asha".to_string(),
                password: "pw".to_string(),
            })
        );
    }

    #[test]
    fn register_form_collects_account_details() {
        let mut app = App::new(Config::default(), None);
        app.handle_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL));
        assert_eq!(app.view_mode, ViewMode::Register);

        type_str(&mut app, "asha");
        app.handle_key(key(KeyCode::Tab));
        type_str(&mut app, "asha@example.com");
        for _ in 0..4 {
            app.handle_key(key(KeyCode::Tab));
        }
        type_str(&mut app, "pw1234");
        app.handle_key(key(KeyCode::Tab));
        type_str(&mut app, "pw1234");

        let Some(Action::Register(req)) = app.handle_key(key(KeyCode::Enter)) else {
            panic!("expected a register action");
        };
        assert_eq!(req.username, "asha");
        assert_eq!(req.email, "asha@example.com");
        assert_eq!(req.password, "pw1234");
        assert_eq!(req.user_type, "user");
    }

    #[test]
    fn register_rejects_mismatched_passwords() {
        let mut app = App::new(Config::default(), None);
        app.view_mode = ViewMode::Register;
        app.register_form.username = "asha".into();
        app.register_form.email = "asha@example.com".into();
        app.register_form.password = "one".into();
        app.register_form.password_confirm = "two".into();
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert!(app.status_line.contains("match"));
        assert_eq!(app.view_mode, ViewMode::Register);
    }

    #[test]
    fn vehicle_form_opens_and_submits() {
        let mut app = App::new(Config::default(), None);
        app.view_mode = ViewMode::Vehicles;
        app.handle_key(key(KeyCode::Char('a')));
        assert_eq!(app.view_mode, ViewMode::AddVehicle);

        type_str(&mut app, "KA05MN4321");
        app.handle_key(key(KeyCode::Tab));
        type_str(&mut app, "car");

        let Some(Action::AddVehicle(vehicle)) = app.handle_key(key(KeyCode::Enter)) else {
            panic!("expected an add-vehicle action");
        };
        assert_eq!(vehicle.vehicle_number, "KA05MN4321");
        assert_eq!(vehicle.vehicle_type, "car");
        assert_eq!(app.view_mode, ViewMode::Vehicles);
    }

    #[test]
    fn vehicle_form_requires_number_and_type() {
        let mut app = App::new(Config::default(), None);
        app.view_mode = ViewMode::AddVehicle;
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert!(app.status_line.contains("required"));
        assert_eq!(app.view_mode, ViewMode::AddVehicle);
    }

    #[test]
    fn apply_booking_replaces_active_and_list_entries() {
        let mut app = app_with_active(BookingStatus::Active);
        app.bookings = vec![sample_booking(BookingStatus::Active)];
        let mut updated = sample_booking(BookingStatus::Parked);
        updated.id = 42;
        app.apply_booking(updated);
        assert_eq!(
            app.active_booking.as_ref().unwrap().status,
            BookingStatus::Parked
        );
        assert_eq!(app.bookings[0].status, BookingStatus::Parked);
    }
}
