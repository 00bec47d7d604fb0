use color_eyre::Result;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc, time::Duration};

use parkly_tui::{
    api::{ApiClient, NewBooking},
    app::{Action, App, ViewMode},
    config::Config,
    events::{Event, EventHandler},
    location::{DeviceLocator, LocationSource},
    logging,
    models::{BookingStatus, BookingType},
    session::{Session, SessionStore},
    tracker::{self, TrackerHandle},
    ui,
};
use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging();
    install_panic_hook();
    color_eyre::install()?;

    let config = Config::load();
    let store = SessionStore::open("parkly_session.db")?;
    let session = store.load()?;

    let api = Arc::new(ApiClient::new(
        &config.api.base_url,
        config.api.timeout_seconds,
    )?);
    if let Some(s) = &session {
        api.set_token(Some(s.access_token.clone()));
    }

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut app = App::new(config.clone(), session.map(|s| s.user));
    let mut events = EventHandler::new(250);
    let mut tracker: Option<TrackerHandle> = None;

    if app.user.is_some() {
        spawn_refresh(api.clone(), &config, events.tx.clone());
    }

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(event) = events.next().await {
            match event {
                Event::Tick => {
                    app.on_tick();
                    // Latest tracking position, straight off the loop's
                    // watch channel.
                    if let Some(handle) = &tracker {
                        app.snapshot = handle.latest();
                    }
                }
                Event::Input(key) => {
                    if let Some(action) = app.handle_key(key) {
                        dispatch(action, &mut app, &store, &api, &config, &events.tx);
                    }
                }
                Event::LoggedIn(session) => {
                    if let Err(e) = store.save(&session) {
                        warn!(error = %e, "could not persist session");
                    }
                    app.user = Some(session.user);
                    app.view_mode = ViewMode::Search;
                    app.password_input.clear();
                    app.register_form = Default::default();
                    app.status_line.clear();
                    spawn_refresh(api.clone(), &config, events.tx.clone());
                }
                Event::SpacesUpdate(spaces) => {
                    app.spaces = spaces;
                    app.selected_space = 0;
                }
                Event::BookingsUpdate(bookings) => {
                    app.bookings = bookings;
                    if app.selected_booking >= app.bookings.len() {
                        app.selected_booking = 0;
                    }
                }
                Event::BookingUpdate(booking) => app.apply_booking(booking),
                Event::VehiclesUpdate(vehicles) => {
                    app.vehicles = vehicles;
                    if app.selected_vehicle >= app.vehicles.len() {
                        app.selected_vehicle = 0;
                    }
                }
                Event::ActionFailed(message) => app.status_line = message,
            }

            reconcile_tracker(&mut tracker, &app, &api, &config);
        }
    }

    if let Some(handle) = tracker.take() {
        handle.shutdown().await;
    }

    restore_terminal(terminal)?;
    Ok(())
}

/// Starts or stops the tracking loop so that it runs exactly while the
/// active-booking view shows a booking in `Active` status. Leaving the view
/// or any status change away from `Active` tears the loop down.
fn reconcile_tracker(
    tracker: &mut Option<TrackerHandle>,
    app: &App,
    api: &Arc<ApiClient>,
    config: &Config,
) {
    let trackable = app.view_mode == ViewMode::ActiveBooking
        && app
            .active_booking
            .as_ref()
            .is_some_and(|b| b.status == BookingStatus::Active);

    match (tracker.is_some(), trackable) {
        (false, true) => {
            if let Some(booking) = app.active_booking.as_ref() {
                *tracker = tracker::start(
                    booking,
                    DeviceLocator::from_config(&config.location),
                    api.clone(),
                    Duration::from_secs(config.tracking.update_interval_seconds),
                    config.tracking.avg_speed_kmh,
                );
            }
        }
        (true, false) => {
            if let Some(handle) = tracker.take() {
                handle.stop();
            }
        }
        _ => {}
    }
}

/// Runs a key-press action. Everything that talks to the API is spawned;
/// results come back through the event channel.
fn dispatch(
    action: Action,
    app: &mut App,
    store: &SessionStore,
    api: &Arc<ApiClient>,
    config: &Config,
    tx: &UnboundedSender<Event>,
) {
    match action {
        Action::Login { username, password } => {
            let api = api.clone();
            let tx = tx.clone();
            app.status_line = "Signing in...".to_string();
            tokio::spawn(async move {
                match api.login(&username, &password).await {
                    Ok(auth) => {
                        let _ = tx.send(Event::LoggedIn(Session {
                            access_token: auth.access,
                            refresh_token: auth.refresh,
                            user: auth.user,
                        }));
                    }
                    Err(e) => {
                        let _ = tx.send(Event::ActionFailed(format!("Sign-in failed: {e}")));
                    }
                }
            });
        }
        Action::Register(request) => {
            let api = api.clone();
            let tx = tx.clone();
            app.status_line = "Creating account...".to_string();
            tokio::spawn(async move {
                match api.register(&request).await {
                    Ok(auth) => {
                        let _ = tx.send(Event::LoggedIn(Session {
                            access_token: auth.access,
                            refresh_token: auth.refresh,
                            user: auth.user,
                        }));
                    }
                    Err(e) => {
                        let _ = tx.send(Event::ActionFailed(format!("Registration failed: {e}")));
                    }
                }
            });
        }
        Action::Logout => {
            if let Err(e) = store.clear() {
                warn!(error = %e, "could not clear session");
            }
            api.set_token(None);
            info!("signed out");
            *app = App::new(config.clone(), None);
        }
        Action::Refresh => {
            app.status_line.clear();
            spawn_refresh(api.clone(), config, tx.clone());
        }
        Action::BookSpace(space_id) => {
            let Some(vehicle) = app.vehicles.iter().find(|v| v.is_active) else {
                app.status_line = "Register a vehicle before booking".to_string();
                return;
            };
            let request = NewBooking {
                parking_space: space_id,
                vehicle: vehicle.id,
                booking_type: BookingType::Daily,
                start_datetime: Utc::now().to_rfc3339(),
                end_datetime: (Utc::now() + chrono::Duration::days(1)).to_rfc3339(),
                special_instructions: String::new(),
            };
            let api = api.clone();
            let tx = tx.clone();
            app.status_line = "Creating booking...".to_string();
            tokio::spawn(async move {
                match api.create_booking(&request).await {
                    Ok(booking) => {
                        let _ = tx.send(Event::BookingUpdate(booking));
                        if let Ok(bookings) = api.my_bookings().await {
                            let _ = tx.send(Event::BookingsUpdate(bookings));
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Event::ActionFailed(format!("Booking failed: {e}")));
                    }
                }
            });
        }
        Action::OpenBooking(id) => {
            let api = api.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                match api.booking_details(id).await {
                    Ok(booking) => {
                        let _ = tx.send(Event::BookingUpdate(booking));
                    }
                    Err(e) => {
                        let _ = tx.send(Event::ActionFailed(format!("Could not load booking: {e}")));
                    }
                }
            });
        }
        Action::MarkParked(id) => {
            let api = api.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                match api.update_booking_status(id, BookingStatus::Parked).await {
                    Ok(booking) => {
                        let _ = tx.send(Event::BookingUpdate(booking));
                    }
                    Err(e) => {
                        let _ = tx.send(Event::ActionFailed(format!("Status update failed: {e}")));
                    }
                }
            });
        }
        Action::CancelBooking(id) => {
            let api = api.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Err(e) = api.cancel_booking(id).await {
                    let _ = tx.send(Event::ActionFailed(format!("Cancellation failed: {e}")));
                    return;
                }
                if let Ok(booking) = api.booking_details(id).await {
                    let _ = tx.send(Event::BookingUpdate(booking));
                }
                if let Ok(bookings) = api.my_bookings().await {
                    let _ = tx.send(Event::BookingsUpdate(bookings));
                }
            });
        }
        Action::AddVehicle(vehicle) => {
            let api = api.clone();
            let tx = tx.clone();
            app.status_line = "Adding vehicle...".to_string();
            tokio::spawn(async move {
                match api.register_vehicle(&vehicle).await {
                    Ok(_) => {
                        if let Ok(vehicles) = api.my_vehicles().await {
                            let _ = tx.send(Event::VehiclesUpdate(vehicles));
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Event::ActionFailed(format!("Could not add vehicle: {e}")));
                    }
                }
            });
        }
        Action::DeleteVehicle(id) => {
            let api = api.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                match api.delete_vehicle(id).await {
                    Ok(()) => {
                        if let Ok(vehicles) = api.my_vehicles().await {
                            let _ = tx.send(Event::VehiclesUpdate(vehicles));
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Event::ActionFailed(format!("Delete failed: {e}")));
                    }
                }
            });
        }
    }
}

/// Background fetch of everything the main views render: nearby spaces
/// (around the current position), the driver's bookings, and vehicles.
fn spawn_refresh(api: Arc<ApiClient>, config: &Config, tx: UnboundedSender<Event>) {
    let locator = DeviceLocator::from_config(&config.location);
    let radius = config.location.search_radius_km;

    {
        let api = api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let fix = match locator.current_fix().await {
                Ok(fix) => fix,
                Err(e) => {
                    let _ = tx.send(Event::ActionFailed(format!("Location unavailable: {e}")));
                    return;
                }
            };
            match api.search_nearby(fix.latitude, fix.longitude, radius).await {
                Ok(spaces) => {
                    let _ = tx.send(Event::SpacesUpdate(spaces));
                }
                Err(e) => {
                    let _ = tx.send(Event::ActionFailed(format!("Search failed: {e}")));
                }
            }
        });
    }

    {
        let api = api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            match api.my_bookings().await {
                Ok(bookings) => {
                    let _ = tx.send(Event::BookingsUpdate(bookings));
                }
                Err(e) => {
                    let _ = tx.send(Event::ActionFailed(format!("Could not load bookings: {e}")));
                }
            }
        });
    }

    tokio::spawn(async move {
        match api.my_vehicles().await {
            Ok(vehicles) => {
                let _ = tx.send(Event::VehiclesUpdate(vehicles));
            }
            Err(e) => {
                let _ = tx.send(Event::ActionFailed(format!("Could not load vehicles: {e}")));
            }
        }
    });
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        )
        .ok();
        original_hook(panic_info);
    }));
}
