use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trip_server::clock::{Clock, SystemClock, TripClock};
use trip_server::config::ServerConfig;
use trip_server::domain::Trip;
use trip_server::notify::{
    HostBackend, NotificationScheduler, RecordingHost, ScheduledNotificationSet, WebhookHost,
};
use trip_server::store::{JsonFileRepository, Repository};
use trip_server::web::{AppState, create_router};

/// How often the in-process host delivers due reminders.
const DELIVERY_INTERVAL: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trip_server=info")),
        )
        .init();

    let config = ServerConfig::from_env().expect("Invalid configuration");

    // Persistent stores
    let trips: Arc<dyn Repository<Trip>> = Arc::new(JsonFileRepository::new(config.trips_path()));
    let sets: Arc<dyn Repository<ScheduledNotificationSet>> =
        Arc::new(JsonFileRepository::new(config.notifications_path()));
    info!(data_dir = %config.data_dir().display(), "using data directory");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Notification host
    let in_process = config.webhook.is_none();
    let host = match &config.webhook {
        Some(webhook) => {
            info!(url = %webhook.base_url, "delivering reminders through webhook");
            HostBackend::Webhook(
                WebhookHost::new(webhook.clone()).expect("Failed to create webhook client"),
            )
        }
        None => {
            warn!("NOTIFY_WEBHOOK_URL not set, reminders will only be logged");
            let recorder = RecordingHost::new();
            spawn_delivery(recorder.clone(), Arc::clone(&clock));
            HostBackend::Recording(recorder)
        }
    };

    let scheduler = NotificationScheduler::new(host, sets);
    let trip_clock = TripClock::new(clock, &config.clock);

    let state = AppState::new(trips, scheduler, trip_clock);
    if in_process {
        // Pending reminders died with the previous process.
        state
            .resume_reminders()
            .await
            .expect("Failed to resume stored trips");
    }
    let app = create_router(state);

    let addr = config.addr;
    info!("Trip server listening on http://{addr}");
    info!("  GET    /health");
    info!("  GET    /trips");
    info!("  PUT    /trips/:id                  - save trip, schedule reminders");
    info!("  GET    /trips/:id");
    info!("  DELETE /trips/:id                  - cancel reminders, delete trip");
    info!("  GET    /trips/:id/timeline");
    info!("  GET    /trips/:id/reminders        - preview reminders");
    info!("  GET    /trips/:id/progress/stream  - live progress (SSE)");
    info!("  GET    /trips/:id/view             - timeline page");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app).await.expect("Server error");
}

/// Periodically "deliver" due reminders from the in-process host by logging
/// them.
fn spawn_delivery(host: RecordingHost, clock: Arc<dyn Clock>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(DELIVERY_INTERVAL);
        loop {
            interval.tick().await;
            host.fire_due(clock.now());
        }
    });
}
