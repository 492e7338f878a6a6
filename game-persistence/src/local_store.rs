use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use game_core::PlayerHistory;
use game_types::{GameState, ResumeSession};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Result;

const GAME_STATE_FILE: &str = "game_state.json";
const RESUME_SESSION_FILE: &str = "resume_session.json";
const PLAYER_HISTORY_FILE: &str = "player_history.json";

/// How long a saved room session stays resumable
pub const RESUME_VALIDITY_HOURS: i64 = 24;

/// Single-device persistence: the current game, the room to reconnect to and
/// the cumulative player history, each as a JSON file in one directory
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save_game_state(&self, state: &GameState) -> Result<()> {
        self.write_json(GAME_STATE_FILE, state).await
    }

    /// A snapshot that no longer parses is discarded
    pub async fn load_game_state(&self) -> Result<Option<GameState>> {
        self.read_json_or_discard(GAME_STATE_FILE).await
    }

    pub async fn clear_game_state(&self) -> Result<()> {
        self.remove(GAME_STATE_FILE).await
    }

    pub async fn save_resume_session(&self, session: &ResumeSession) -> Result<()> {
        self.write_json(RESUME_SESSION_FILE, session).await
    }

    pub async fn load_resume_session(&self) -> Result<Option<ResumeSession>> {
        self.load_resume_session_at(Utc::now()).await
    }

    /// Expired or unreadable sessions are deleted and reported as absent
    pub async fn load_resume_session_at(&self, now: DateTime<Utc>) -> Result<Option<ResumeSession>> {
        let Some(session) = self
            .read_json_or_discard::<ResumeSession>(RESUME_SESSION_FILE)
            .await?
        else {
            return Ok(None);
        };

        if is_resume_valid(&session, now) {
            Ok(Some(session))
        } else {
            debug!(room_id = %session.room_id, "Discarding expired resume session");
            self.remove(RESUME_SESSION_FILE).await?;
            Ok(None)
        }
    }

    pub async fn clear_resume_session(&self) -> Result<()> {
        self.remove(RESUME_SESSION_FILE).await
    }

    pub async fn save_player_history(&self, history: &PlayerHistory) -> Result<()> {
        self.write_json(PLAYER_HISTORY_FILE, history).await
    }

    pub async fn load_player_history(&self) -> Result<PlayerHistory> {
        Ok(self
            .read_json_or_discard(PLAYER_HISTORY_FILE)
            .await?
            .unwrap_or_default())
    }

    async fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{}.tmp", file));

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read_json_or_discard<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.dir.join(file);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&contents) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(file, error = %e, "Discarding unreadable local file");
                self.remove(file).await?;
                Ok(None)
            }
        }
    }

    async fn remove(&self, file: &str) -> Result<()> {
        match tokio::fs::remove_file(self.dir.join(file)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn is_resume_valid(session: &ResumeSession, now: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(&session.timestamp)
        .map(|saved| {
            let age = now.signed_duration_since(saved.with_timezone(&Utc));
            age >= Duration::zero() && age < Duration::hours(RESUME_VALIDITY_HOURS)
        })
        .unwrap_or(false)
}
