//! Database module for Milo
//!
//! Provides persistence for sessions and messages, plus a per-session live
//! feed that republishes the full message list after every insert.

mod schema;

pub use schema::SCHEMA;

use crate::error::StoreError;
use crate::models::{BehavioralState, Emotion, Message, MessageRole, MoodPair, Session};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::broadcast;

const FEED_CHANNEL_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        StoreError::new(e.to_string())
    }
}

type FeedMap = HashMap<String, broadcast::Sender<Vec<Message>>>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    feeds: Arc<Mutex<FeedMap>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            feeds: Arc::new(Mutex::new(HashMap::new())),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn feeds(&self) -> DbResult<MutexGuard<'_, FeedMap>> {
        self.feeds.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ==================== Session Operations ====================

    /// Create a new session
    pub fn create_session(&self, id: &str, user_id: &str) -> DbResult<Session> {
        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO sessions (id, user_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![id, user_id, format_datetime(now)],
        )?;

        Ok(Session {
            id: id.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Get session by ID
    pub fn get_session(&self, id: &str) -> DbResult<Session> {
        let conn = self.conn()?;
        Self::find_session(&conn, id)?.ok_or_else(|| DbError::SessionNotFound(id.to_string()))
    }

    fn find_session(conn: &Connection, id: &str) -> DbResult<Option<Session>> {
        let session = conn
            .query_row(
                "SELECT id, user_id, created_at, updated_at FROM sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Session {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        created_at: parse_datetime(2, &row.get::<_, String>(2)?)?,
                        updated_at: parse_datetime(3, &row.get::<_, String>(3)?)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    // ==================== Message Operations ====================

    /// Add a user-authored message
    pub fn add_user_message(
        &self,
        message_id: &str,
        session_id: &str,
        content: &str,
        user_id: &str,
    ) -> DbResult<Message> {
        self.insert_message(NewMessage {
            id: message_id,
            session_id,
            role: MessageRole::User,
            content,
            user_id: Some(user_id),
            mood: None,
        })
    }

    /// Add a Milo-authored message with its mood
    pub fn add_ai_message(
        &self,
        message_id: &str,
        session_id: &str,
        content: &str,
        mood: MoodPair,
    ) -> DbResult<Message> {
        self.insert_message(NewMessage {
            id: message_id,
            session_id,
            role: MessageRole::Ai,
            content,
            user_id: None,
            mood: Some(mood),
        })
    }

    fn insert_message(&self, new: NewMessage<'_>) -> DbResult<Message> {
        let conn = self.conn()?;

        if Self::find_session(&conn, new.session_id)?.is_none() {
            return Err(DbError::SessionNotFound(new.session_id.to_string()));
        }

        let now = Utc::now();
        let sequence_id: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sequence_id), 0) + 1 FROM messages WHERE session_id = ?1",
            params![new.session_id],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO messages (id, session_id, sequence_id, role, content, user_id, emotion, behavioral_state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                new.id,
                new.session_id,
                sequence_id,
                new.role.to_string(),
                new.content,
                new.user_id,
                new.mood.map(|m| m.emotion.to_string()),
                new.mood.map(|m| m.state.to_string()),
                format_datetime(now),
            ],
        )?;

        // Update session timestamp
        conn.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
            params![format_datetime(now), new.session_id],
        )?;

        // Publish while still holding the connection so feed order matches insert order.
        // The row is committed at this point; a failed publish must not report it as unsaved.
        if let Err(e) = self.publish(&conn, new.session_id) {
            tracing::warn!(session_id = %new.session_id, error = %e, "Failed to publish message list");
        }

        Ok(Message {
            id: new.id.to_string(),
            session_id: new.session_id.to_string(),
            role: new.role,
            content: new.content.to_string(),
            timestamp: now,
            user_id: new.user_id.map(String::from),
            mood: new.mood,
        })
    }

    /// Get messages for a session, oldest first
    pub fn get_messages(&self, session_id: &str) -> DbResult<Vec<Message>> {
        let conn = self.conn()?;
        Self::query_messages(&conn, session_id)
    }

    fn query_messages(conn: &Connection, session_id: &str) -> DbResult<Vec<Message>> {
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, user_id, emotion, behavioral_state, created_at
             FROM messages WHERE session_id = ?1 ORDER BY created_at, sequence_id",
        )?;

        let messages = stmt
            .query_map(params![session_id], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    // ==================== Live Feed ====================

    /// Current message list plus a receiver for every list published afterwards
    pub fn subscribe_messages(
        &self,
        session_id: &str,
    ) -> DbResult<(Vec<Message>, broadcast::Receiver<Vec<Message>>)> {
        let conn = self.conn()?;
        if Self::find_session(&conn, session_id)?.is_none() {
            return Err(DbError::SessionNotFound(session_id.to_string()));
        }

        let current = Self::query_messages(&conn, session_id)?;
        let rx = self
            .feeds()?
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(FEED_CHANNEL_CAPACITY).0)
            .subscribe();

        Ok((current, rx))
    }

    fn publish(&self, conn: &Connection, session_id: &str) -> DbResult<()> {
        let mut feeds = self.feeds()?;
        let Some(tx) = feeds.get(session_id) else {
            return Ok(());
        };

        if tx.receiver_count() == 0 {
            feeds.remove(session_id);
            return Ok(());
        }

        let messages = Self::query_messages(conn, session_id)?;
        let _ = tx.send(messages);
        Ok(())
    }
}

struct NewMessage<'a> {
    id: &'a str,
    session_id: &'a str,
    role: MessageRole,
    content: &'a str,
    user_id: Option<&'a str>,
    mood: Option<MoodPair>,
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let role: MessageRole = parse_column(row, 2)?;
    let emotion: Option<String> = row.get(5)?;
    let state: Option<String> = row.get(6)?;

    let mood = match (emotion, state) {
        (Some(emotion), Some(state)) => Some(MoodPair::new(
            parse_text::<Emotion>(5, &emotion)?,
            parse_text::<BehavioralState>(6, &state)?,
        )),
        _ => None,
    };

    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role,
        content: row.get(3)?,
        user_id: row.get(4)?,
        mood,
        timestamp: parse_datetime(7, &row.get::<_, String>(7)?)?,
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    parse_text(idx, &text)
}

fn parse_text<T>(idx: usize, text: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Fixed-width timestamps so text ordering matches time ordering
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
