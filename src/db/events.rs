//! Calendar event row operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Stored event row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub department_id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub created_at: String,
}

/// New event fields
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub department_id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub end_date: Option<String>,
    pub location: Option<String>,
}

/// Updatable event fields
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
}

/// Event repository
pub struct EventRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> EventRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: &NewEvent) -> Result<Event> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO events (id, department_id, title, description, event_date, end_date, location, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.department_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.event_date)
        .bind(&new.end_date)
        .bind(&new.location)
        .bind(&created_at)
        .execute(self.pool)
        .await?;

        Ok(Event {
            id,
            department_id: new.department_id.clone(),
            title: new.title.clone(),
            description: new.description.clone(),
            event_date: new.event_date.clone(),
            end_date: new.end_date.clone(),
            location: new.location.clone(),
            created_at,
        })
    }

    /// List events, optionally scoped to a department and a date range.
    pub async fn list(
        &self,
        department_id: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, department_id, title, description, event_date, end_date, location, created_at
            FROM events
            WHERE (? IS NULL OR department_id = ?)
              AND (? IS NULL OR event_date >= ?)
              AND (? IS NULL OR event_date <= ?)
            ORDER BY event_date ASC
            "#,
        )
        .bind(department_id)
        .bind(department_id)
        .bind(from)
        .bind(from)
        .bind(to)
        .bind(to)
        .fetch_all(self.pool)
        .await?;

        Ok(events)
    }

    pub async fn get(&self, id: &str, department_id: &str) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, department_id, title, description, event_date, end_date, location, created_at
            FROM events
            WHERE id = ? AND department_id = ?
            "#,
        )
        .bind(id)
        .bind(department_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(event)
    }

    /// Apply a partial update; untouched fields keep their stored values.
    pub async fn update(
        &self,
        id: &str,
        department_id: &str,
        update: &EventUpdate,
    ) -> Result<Option<Event>> {
        let existing = match self.get(id, department_id).await? {
            Some(event) => event,
            None => return Ok(None),
        };

        sqlx::query(
            r#"
            UPDATE events
            SET title = ?, description = ?, event_date = ?, end_date = ?, location = ?
            WHERE id = ? AND department_id = ?
            "#,
        )
        .bind(update.title.as_deref().unwrap_or(&existing.title))
        .bind(update.description.as_deref().or(existing.description.as_deref()))
        .bind(update.event_date.as_deref().unwrap_or(&existing.event_date))
        .bind(update.end_date.as_deref().or(existing.end_date.as_deref()))
        .bind(update.location.as_deref().or(existing.location.as_deref()))
        .bind(id)
        .bind(department_id)
        .execute(self.pool)
        .await?;

        self.get(id, department_id).await
    }

    pub async fn delete(&self, id: &str, department_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ? AND department_id = ?")
            .bind(id)
            .bind(department_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
