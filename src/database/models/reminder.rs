use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub message: String,
    /// Due time as a unix timestamp (seconds).
    pub remind_at: i64,
    pub created_at: i64,
    pub sent: bool,
}

const REMINDER_COLUMNS: &str = "id, user_id, chat_id, message, remind_at, created_at, sent";

impl Reminder {
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.remind_at, 0).single()
    }

    pub async fn create(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        chat_id: i64,
        message: &str,
        remind_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let id = sqlx::query(
            "INSERT INTO reminders (user_id, chat_id, message, remind_at) VALUES (?, ?, ?, ?)"
        )
        .bind(user_id)
        .bind(chat_id)
        .bind(message)
        .bind(remind_at.timestamp())
        .execute(pool)
        .await?
        .last_insert_rowid();

        sqlx::query_as::<_, Reminder>(&format!("SELECT {} FROM reminders WHERE id = ?", REMINDER_COLUMNS))
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Unsent reminders whose due time is at or before `now`, oldest first.
    pub async fn due_pending(
        pool: &sqlx::SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Reminder>(&format!(
            "SELECT {} FROM reminders WHERE sent = 0 AND remind_at <= ? ORDER BY remind_at, id",
            REMINDER_COLUMNS
        ))
        .bind(now.timestamp())
        .fetch_all(pool)
        .await
    }

    pub async fn mark_sent(pool: &sqlx::SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE reminders SET sent = 1 WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn list_pending_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Reminder>(&format!(
            "SELECT {} FROM reminders WHERE user_id = ? AND sent = 0 ORDER BY remind_at, id",
            REMINDER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Delete a reminder owned by `user_id`; returns the number of rows removed.
    pub async fn delete_owned(
        pool: &sqlx::SqlitePool,
        id: i64,
        user_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
