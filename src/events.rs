//! Event types and the input/tick pump for the Parkly TUI.
//!
//! The main loop in `main.rs` consumes a single stream of [`Event`]s:
//! keyboard input and ticks from the [`EventHandler`]'s background task, and
//! data updates posted by API tasks through cloned senders.

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::models::{Booking, ParkingSpace, Vehicle};
use crate::session::Session;

/// Events processed by the application event loop.
pub enum Event {
    /// Periodic tick used for UI refresh and the booking countdown.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// Login or registration succeeded; main loop persists the session.
    LoggedIn(Session),
    /// Nearby/city search results.
    SpacesUpdate(Vec<ParkingSpace>),
    /// The driver's bookings list.
    BookingsUpdate(Vec<Booking>),
    /// A single booking was created, refreshed, or mutated.
    BookingUpdate(Booking),
    /// The driver's registered vehicles.
    VehiclesUpdate(Vec<Vehicle>),
    /// A user-initiated API call failed; message goes to the status line.
    ActionFailed(String),
}

/// Multiplexes terminal input and ticks into a single event stream.
///
/// Holds an unbounded channel: the sender ([`tx`](EventHandler::tx)) can be
/// cloned and given to spawned API tasks, while the receiver is consumed by
/// [`next`](EventHandler::next) in the main loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// The task polls crossterm with a timeout of `tick_rate_ms`; key presses
    /// become [`Event::Input`] and elapsed intervals become [`Event::Tick`].
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));
                if event::poll(timeout).expect("Poll failed") {
                    if let CrosstermEvent::Key(key) = event::read().expect("Read failed") {
                        event_tx.send(Event::Input(key)).ok();
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    event_tx.send(Event::Tick).ok();
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// Receives the next event; `None` once all senders are gone.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
