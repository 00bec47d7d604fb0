//! Local session persistence.
//!
//! The only state cached on device is the auth token pair and the signed-in
//! user's profile, in a small SQLite key/value table. Booking and parking
//! data always comes fresh from the API.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AppError;
use crate::models::User;

const ACCESS_TOKEN: &str = "access_token";
const REFRESH_TOKEN: &str = "refresh_token";
const USER_PROFILE: &str = "user";

#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(path: &str) -> Result<Self, AppError> {
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, AppError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    pub fn save(&self, session: &Session) -> Result<(), AppError> {
        let user_json = serde_json::to_string(&session.user)
            .map_err(|e| AppError::Config(format!("failed to serialize profile: {e}")))?;
        self.put(ACCESS_TOKEN, &session.access_token)?;
        self.put(REFRESH_TOKEN, &session.refresh_token)?;
        self.put(USER_PROFILE, &user_json)?;
        Ok(())
    }

    /// Restores the stored session, or `None` when signed out or when the
    /// cached profile no longer parses (schema drift is treated as signed
    /// out, not as an error).
    pub fn load(&self) -> Result<Option<Session>, AppError> {
        let (access, refresh, user_json) =
            match (self.get(ACCESS_TOKEN)?, self.get(REFRESH_TOKEN)?, self.get(USER_PROFILE)?) {
                (Some(a), Some(r), Some(u)) => (a, r, u),
                _ => return Ok(None),
            };
        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => Ok(Some(Session {
                access_token: access,
                refresh_token: refresh,
                user,
            })),
            Err(e) => {
                tracing::warn!("stored profile unreadable, treating as signed out: {e}");
                Ok(None)
            }
        }
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.conn.execute("DELETE FROM session", [])?;
        Ok(())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO session (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM session WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserType;

    fn sample_user() -> User {
        User {
            id: 9,
            username: "asha".into(),
            email: "asha@example.com".into(),
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            phone_number: "+911234567890".into(),
            user_type: UserType::Both,
            owner_rating: 4.2,
            driver_rating: 4.8,
            is_verified: true,
        }
    }

    #[test]
    fn session_round_trips() {
        let store = SessionStore::open_in_memory().unwrap();
        assert!(store.load().unwrap().is_none());

        store
            .save(&Session {
                access_token: "acc".into(),
                refresh_token: "ref".into(),
                user: sample_user(),
            })
            .unwrap();

        let restored = store.load().unwrap().expect("session persisted");
        assert_eq!(restored.access_token, "acc");
        assert_eq!(restored.refresh_token, "ref");
        assert_eq!(restored.user.username, "asha");
    }

    #[test]
    fn clear_signs_out() {
        let store = SessionStore::open_in_memory().unwrap();
        store
            .save(&Session {
                access_token: "acc".into(),
                refresh_token: "ref".into(),
                user: sample_user(),
            })
            .unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
