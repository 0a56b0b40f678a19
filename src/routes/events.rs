//! Calendar event endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{Event, EventRepository, EventUpdate, NewEvent};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the events router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/:id", axum::routing::put(update_event).delete(delete_event))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    pub department_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// GET /events?departmentId=...&from=...&to=...
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<Event>>> {
    let events = EventRepository::new(state.db())
        .list(
            query.department_id.as_deref().filter(|s| !s.is_empty()),
            query.from.as_deref(),
            query.to.as_deref(),
        )
        .await?;

    Ok(Json(events))
}

/// POST /events
async fn create_event(
    State(state): State<AppState>,
    Json(new): Json<NewEvent>,
) -> Result<(StatusCode, Json<Event>)> {
    if new.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }
    if new.department_id.trim().is_empty() {
        return Err(AppError::InvalidInput("departmentId is required".to_string()));
    }

    let event = EventRepository::new(state.db()).insert(&new).await?;

    Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    #[serde(rename = "departmentId")]
    pub department_id: String,
}

/// PUT /events/:id?departmentId=...
async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(scope): Query<ScopeQuery>,
    Json(update): Json<EventUpdate>,
) -> Result<Json<Event>> {
    let event = EventRepository::new(state.db())
        .update(&id, &scope.department_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found or unauthorized".to_string()))?;

    Ok(Json(event))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
}

/// DELETE /events/:id?departmentId=...
async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<DeleteResponse>> {
    let deleted = EventRepository::new(state.db())
        .delete(&id, &scope.department_id)
        .await?;

    if !deleted {
        return Err(AppError::NotFound(
            "Event not found or unauthorized".to_string(),
        ));
    }

    Ok(Json(DeleteResponse {
        message: "Event deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    fn new_event(department: &str, title: &str, date: &str) -> NewEvent {
        NewEvent {
            department_id: department.to_string(),
            title: title.to_string(),
            description: None,
            event_date: date.to_string(),
            end_date: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_create_validates_required_fields() {
        let (state, _dir) = test_state().await;

        let err = create_event(
            State(state.clone()),
            Json(new_event("ceit", "  ", "2026-09-01T09:00:00Z")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let (status, Json(event)) = create_event(
            State(state),
            Json(new_event("ceit", "Orientation", "2026-09-01T09:00:00Z")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(event.title, "Orientation");
    }

    #[tokio::test]
    async fn test_list_respects_range_filter() {
        let (state, _dir) = test_state().await;
        create_event(
            State(state.clone()),
            Json(new_event("ceit", "Early", "2026-09-01T09:00:00Z")),
        )
        .await
        .unwrap();
        create_event(
            State(state.clone()),
            Json(new_event("ceit", "Late", "2026-12-01T09:00:00Z")),
        )
        .await
        .unwrap();

        let Json(events) = list_events(
            State(state),
            Query(EventQuery {
                department_id: None,
                from: Some("2026-11-01T00:00:00Z".to_string()),
                to: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Late");
    }
}
