//! Fire-and-forget handoffs to other applications.
//!
//! The dialer and maps launches mirror the mobile app's `tel:` and Google
//! Maps URL intents. Nothing is awaited or read back; a failed spawn is
//! logged and ignored.

use std::process::Command;
use tracing::{info, warn};

pub fn maps_url(lat: f64, lng: f64) -> String {
    format!("https://maps.google.com/?q={lat},{lng}")
}

pub fn open_navigation(lat: f64, lng: f64) {
    open_external(&maps_url(lat, lng));
}

pub fn dial(phone_number: &str) {
    open_external(&format!("tel:{phone_number}"));
}

fn open_external(target: &str) {
    info!(target, "launching external handler");
    if let Err(e) = opener_command(target).spawn() {
        warn!(target, error = %e, "could not launch external handler");
    }
}

#[cfg(target_os = "macos")]
fn opener_command(target: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(target);
    cmd
}

#[cfg(target_os = "windows")]
fn opener_command(target: &str) -> Command {
    // `start` is a cmd builtin, not an executable
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", target]);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(target: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(target);
    cmd
}

#[cfg(test)]
mod tests {
    use super::maps_url;

    #[test]
    fn maps_url_embeds_coordinates() {
        assert_eq!(
            maps_url(12.9352, 77.6245),
            "https://maps.google.com/?q=12.9352,77.6245"
        );
    }
}
