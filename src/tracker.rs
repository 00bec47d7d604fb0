//! Active-booking location tracking.
//!
//! One recurring task per active booking view: every interval it acquires a
//! fresh location fix, computes distance remaining and ETA against the
//! booking's destination, and pushes the snapshot to the server. Failures at
//! any step skip the cycle; the loop itself only stops when the owning view
//! tears it down or the booking leaves the `Active` status.
//!
//! Cycles are strictly serialized: the task awaits each cycle to completion
//! before taking the next tick, so a slow fix or sync can never race a newer
//! one into a stale server-side write.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::geo;
use crate::location::LocationSource;
use crate::models::{Booking, BookingStatus};

/// Sink for computed tracking snapshots. Implemented by the API client;
/// mocked in tests.
pub trait TrackingSync {
    fn update_location(
        &self,
        booking_id: i64,
        latitude: f64,
        longitude: f64,
        distance_remaining: f64,
        eta_minutes: u32,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Latest computed position, shared with the rendering layer.
/// Last-writer-wins; staleness up to one interval is expected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingSnapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub distance_remaining_km: f64,
    pub eta_minutes: u32,
    pub at: DateTime<Utc>,
}

/// Handle to a running tracking task. Stopping (or dropping) the handle
/// cancels the task at its next await point; a cycle in flight is abandoned
/// before its sync call can land.
pub struct TrackerHandle {
    stop_tx: watch::Sender<bool>,
    position_rx: watch::Receiver<Option<TrackingSnapshot>>,
    task: JoinHandle<()>,
}

impl TrackerHandle {
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Last position published by the loop, if any cycle has completed.
    pub fn latest(&self) -> Option<TrackingSnapshot> {
        *self.position_rx.borrow()
    }

    /// Stops the task and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

/// Starts tracking for `booking` if and only if its status is `Active`.
///
/// Any other status returns `None`: a booking that is already parked,
/// finished, or not yet started has nothing to track, and this is not an
/// error condition.
pub fn start<S, Y>(
    booking: &Booking,
    source: S,
    sync: Arc<Y>,
    interval: Duration,
    avg_speed_kmh: f64,
) -> Option<TrackerHandle>
where
    S: LocationSource + Send + Sync + 'static,
    Y: TrackingSync + Send + Sync + 'static,
{
    if booking.status != BookingStatus::Active {
        debug!(
            booking_id = booking.id,
            status = ?booking.status,
            "booking not active; tracking loop not started"
        );
        return None;
    }

    let booking_id = booking.id;
    let dest_lat = booking.location_tracking.destination_latitude;
    let dest_lng = booking.location_tracking.destination_longitude;

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let (position_tx, position_rx) = watch::channel(None);

    let task = tokio::spawn(async move {
        info!(booking_id, "location tracking started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The immediate first tick: the loop runs its first cycle one full
        // interval after start, matching the original cadence.
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let cycle = run_cycle(
                        booking_id,
                        dest_lat,
                        dest_lng,
                        &source,
                        sync.as_ref(),
                        avg_speed_kmh,
                        &position_tx,
                    );
                    tokio::select! {
                        changed = stop_rx.changed() => {
                            if changed.is_err() || *stop_rx.borrow() {
                                break;
                            }
                        }
                        _ = cycle => {}
                    }
                }
            }
        }

        info!(booking_id, "location tracking stopped");
    });

    Some(TrackerHandle {
        stop_tx,
        position_rx,
        task,
    })
}

/// One tracking cycle: fix-acquire, compute, sync. Every failure is logged
/// and swallowed; the next tick retries from scratch.
async fn run_cycle<S, Y>(
    booking_id: i64,
    dest_lat: f64,
    dest_lng: f64,
    source: &S,
    sync: &Y,
    avg_speed_kmh: f64,
    position_tx: &watch::Sender<Option<TrackingSnapshot>>,
) where
    S: LocationSource,
    Y: TrackingSync,
{
    let fix = match source.current_fix().await {
        Ok(fix) => fix,
        Err(e) => {
            warn!(booking_id, error = %e, "skipping tracking cycle: no fix");
            return;
        }
    };

    let distance = geo::haversine_km(fix.latitude, fix.longitude, dest_lat, dest_lng);
    let eta = geo::eta_minutes(distance, avg_speed_kmh);

    let snapshot = TrackingSnapshot {
        latitude: fix.latitude,
        longitude: fix.longitude,
        distance_remaining_km: distance,
        eta_minutes: eta,
        at: fix.timestamp,
    };

    // Local state first: the marker moves even if the server write fails.
    let _ = position_tx.send(Some(snapshot));

    if let Err(e) = sync
        .update_location(booking_id, fix.latitude, fix.longitude, distance, eta)
        .await
    {
        warn!(booking_id, error = %e, "location sync failed; will retry next cycle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationFix;
    use crate::models::fixtures::sample_booking;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockSource {
        fixes: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl MockSource {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                fixes: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    impl LocationSource for Arc<MockSource> {
        async fn current_fix(&self) -> Result<LocationFix, AppError> {
            let n = self.fixes.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(n) {
                return Err(AppError::PositionUnavailable("gps timeout".into()));
            }
            Ok(LocationFix {
                latitude: 12.9716,
                longitude: 77.5946,
                accuracy: 10.0,
                timestamp: Utc::now(),
            })
        }
    }

    struct MockSync {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl MockSync {
        fn instant() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    impl TrackingSync for MockSync {
        async fn update_location(
            &self,
            _booking_id: i64,
            _latitude: f64,
            _longitude: f64,
            _distance_remaining: f64,
            _eta_minutes: u32,
        ) -> Result<(), AppError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn parked_booking_never_acquires_a_fix() {
        let source = Arc::new(MockSource::new(None));
        let sync = Arc::new(MockSync::instant());

        let handle = start(
            &sample_booking(BookingStatus::Parked),
            source.clone(),
            sync.clone(),
            Duration::from_secs(30),
            40.0,
        );
        assert!(handle.is_none());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(source.fixes.load(Ordering::SeqCst), 0);
        assert_eq!(sync.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn one_sync_per_interval_with_one_failed_fix() {
        let source = Arc::new(MockSource::new(Some(2)));
        let sync = Arc::new(MockSync::instant());

        let handle = start(
            &sample_booking(BookingStatus::Active),
            source.clone(),
            sync.clone(),
            Duration::from_secs(30),
            40.0,
        )
        .expect("active booking should start tracking");
        assert!(handle.latest().is_none());

        // 90-second window: cycles at t=30, 60, 90. The second fix fails,
        // so two snapshots reach the server and one cycle is skipped.
        tokio::time::sleep(Duration::from_secs(91)).await;

        assert_eq!(source.fixes.load(Ordering::SeqCst), 3);
        assert_eq!(sync.calls.load(Ordering::SeqCst), 2);

        let snapshot = handle.latest().expect("a cycle completed");
        assert!((snapshot.distance_remaining_km - 5.3).abs() < 0.2);
        assert_eq!(snapshot.eta_minutes, 8);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_mid_cycle_suppresses_the_sync_call() {
        let source = Arc::new(MockSource::new(None));
        let sync = Arc::new(MockSync::slow(Duration::from_secs(10)));

        let handle = start(
            &sample_booking(BookingStatus::Active),
            source.clone(),
            sync.clone(),
            Duration::from_secs(30),
            40.0,
        )
        .expect("active booking should start tracking");

        // First cycle starts at t=30 and its sync would land at t=40.
        // Stop at t=35, mid-flight.
        tokio::time::sleep(Duration::from_secs(35)).await;
        handle.stop();
        let TrackerHandle { task, .. } = handle;
        task.await.expect("tracking task exits cleanly");

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.fixes.load(Ordering::SeqCst), 1);
        assert_eq!(sync.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_loop() {
        let source = Arc::new(MockSource::new(None));
        let sync = Arc::new(MockSync::instant());

        let handle = start(
            &sample_booking(BookingStatus::Active),
            source.clone(),
            sync.clone(),
            Duration::from_secs(30),
            40.0,
        )
        .expect("active booking should start tracking");

        tokio::time::sleep(Duration::from_secs(31)).await;
        drop(handle);
        let after_drop = sync.calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sync.calls.load(Ordering::SeqCst), after_drop);
    }
}
