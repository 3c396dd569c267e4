//! HTTP route handlers.

use std::convert::Infallible;
use std::sync::Arc;

use askama::Template;
use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::domain::{DomainError, Timeline, Trip, TripId, TripProgress, TripStatus};
use crate::notify::ScheduleError;
use crate::reminders::plan;
use crate::store::{Repository, StoreError};

use super::dto::*;
use super::state::{AppState, Rescheduled};
use super::templates::TimelineTemplate;

/// Snapshots buffered per progress stream before ticks are dropped.
const STREAM_BUFFER: usize = 8;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/trips", get(list_trips))
        .route(
            "/trips/:id",
            get(get_trip).put(save_trip).delete(delete_trip),
        )
        .route("/trips/:id/timeline", get(trip_timeline))
        .route("/trips/:id/reminders", get(preview_reminders))
        .route("/trips/:id/progress/stream", get(progress_stream))
        .route("/trips/:id/view", get(timeline_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// List stored trip ids.
async fn list_trips(State(state): State<AppState>) -> Result<Json<TripListResponse>, AppError> {
    let trips = state.trips.ids()?;
    Ok(Json(TripListResponse { trips }))
}

fn parse_id(raw: &str) -> Result<TripId, AppError> {
    Ok(TripId::parse(raw).map_err(DomainError::from)?)
}

fn load_trip(state: &AppState, id: &TripId) -> Result<Trip, AppError> {
    state.trips.get(id)?.ok_or_else(|| AppError::NotFound {
        message: format!("trip {id} not found"),
    })
}

async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(load_trip(&state, &id)?))
}

/// Create or replace a trip and reschedule its reminders.
///
/// A host failure does not fail the request: the trip is saved and the
/// response carries a warning and no scheduled reminders.
async fn save_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<SaveTripResponse>, AppError> {
    let id = parse_id(&id)?;

    // Parse JSON manually so we can log the body on failure
    let trip: Trip = serde_json::from_slice(&body).map_err(|e| {
        debug!(body = %String::from_utf8_lossy(&body), "rejected trip body");
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })?;

    if trip.id != id {
        return Err(DomainError::TripIdMismatch {
            path: id.to_string(),
            record: trip.id.to_string(),
        }
        .into());
    }
    trip.validate()?;

    let Rescheduled { specs, outcome } = state.save_trip(&trip).await?;
    let (scheduled, warning) = match outcome {
        Ok(handles) => {
            let scheduled = handles
                .into_iter()
                .zip(specs)
                .map(|(handle, reminder)| ScheduledReminder { handle, reminder })
                .collect();
            (scheduled, None)
        }
        Err(ScheduleError::Store(e)) => return Err(e.into()),
        Err(e) => {
            warn!(trip = %id, error = %e, "saved trip without reminders");
            (Vec::new(), Some(e.to_string()))
        }
    };

    Ok(Json(SaveTripResponse {
        trip_id: id,
        scheduled,
        warning,
    }))
}

/// Cancel a trip's reminders, then delete it.
async fn delete_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    let trip = load_trip(&state, &id)?;

    if !state.delete_trip(&trip).await? {
        return Err(AppError::NotFound {
            message: format!("trip {id} not found"),
        });
    }
    info!(trip = %id, "deleted trip");

    Ok(StatusCode::NO_CONTENT)
}

async fn trip_timeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TimelineResponse>, AppError> {
    let id = parse_id(&id)?;
    let trip = load_trip(&state, &id)?;

    let now = state.clock.now();
    let timeline = Timeline::build(&trip, now);
    let progress = timeline.progress_at(now);
    Ok(Json(TimelineResponse::new(&timeline, progress)))
}

/// Reminders the planner would schedule right now. No side effects.
async fn preview_reminders(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RemindersResponse>, AppError> {
    let id = parse_id(&id)?;
    let trip = load_trip(&state, &id)?;

    Ok(Json(RemindersResponse {
        trip_id: id,
        reminders: plan(&trip, state.clock.now()),
    }))
}

/// Server-sent progress snapshots, one per clock tick.
///
/// The stream ends after the first completed snapshot. When the client goes
/// away the stream is dropped, which drops the subscription and stops the
/// ticker.
async fn progress_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let id = parse_id(&id)?;
    let trip = load_trip(&state, &id)?;
    let timeline = Arc::new(Timeline::build(&trip, state.clock.now()));

    let (tx, rx) = mpsc::channel::<TripProgress>(STREAM_BUFFER);
    let subscription = state.clock.subscribe(timeline, move |progress| {
        // A slow client misses ticks rather than queueing them.
        let _ = tx.try_send(progress);
    });

    let events = stream::unfold(
        (rx, subscription, false),
        |(mut rx, subscription, finished)| async move {
            if finished {
                return None;
            }
            let progress = rx.recv().await?;
            let finished = progress.status == TripStatus::Completed;
            let event = Event::default()
                .event("progress")
                .json_data(&progress)
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
            Some((Ok(event), (rx, subscription, finished)))
        },
    );

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// HTML timeline page.
async fn timeline_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let id = parse_id(&id)?;
    let trip = load_trip(&state, &id)?;

    let now = state.clock.now();
    let timeline = Timeline::build(&trip, now);
    let progress = timeline.progress_at(now);

    let html = TimelineTemplate::new(&trip, &timeline, &progress)
        .render()
        .map_err(|e| AppError::Internal {
            message: format!("Template error: {e}"),
        })?;
    Ok(Html(html))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Forbidden { message: String },
    BadGateway { message: String },
    Internal { message: String },
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::PermissionDenied => AppError::Forbidden {
                message: e.to_string(),
            },
            ScheduleError::Host(_) => AppError::BadGateway {
                message: e.to_string(),
            },
            ScheduleError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Forbidden { message } => (StatusCode::FORBIDDEN, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, "{message}");
        } else {
            warn!(%status, "{message}");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
