use thiserror::Error;

/// Failure taxonomy for the client.
///
/// Nothing here is fatal to a running screen: tracking-cycle failures are
/// logged and the cycle is skipped, while user-action failures surface as a
/// status-line message.
#[derive(Debug, Error)]
pub enum AppError {
    /// The location provider denied the request or timed out.
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response with whatever message the server attached.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A status mutation or tracking start was attempted on a booking whose
    /// status does not allow it. The tracking loop treats this as "do not
    /// start", not as a user-visible failure.
    #[error("booking {id} is {status}, not active")]
    InvalidBookingState { id: i64, status: String },

    #[error("session store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),
}
