//! End-to-end tests of the HTTP API against a loopback server.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Value, json};

use crate::clock::{ClockConfig, ManualClock, TripClock};
use crate::domain::{Trip, TripId};
use crate::notify::{HostBackend, NotificationScheduler, RecordingHost, ScheduledNotificationSet};
use crate::reminders::plan;
use crate::store::{MemoryRepository, Repository};

use super::{AppState, create_router};

struct TestServer {
    base: String,
    http: reqwest::Client,
    host: RecordingHost,
    clock: ManualClock,
    state: AppState,
    sets: Arc<dyn Repository<ScheduledNotificationSet>>,
}

impl TestServer {
    async fn start() -> Self {
        let host = RecordingHost::new();
        let clock = ManualClock::new(at(5, 1, 9, 0));

        let trips: Arc<dyn Repository<Trip>> = Arc::new(MemoryRepository::new());
        let sets: Arc<dyn Repository<ScheduledNotificationSet>> =
            Arc::new(MemoryRepository::new());
        let scheduler =
            NotificationScheduler::new(HostBackend::Recording(host.clone()), Arc::clone(&sets));
        let trip_clock = TripClock::new(Arc::new(clock.clone()), &ClockConfig::default());

        let state = AppState::new(trips, scheduler, trip_clock);
        let router = create_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            http: reqwest::Client::new(),
            host,
            clock,
            state,
            sets,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn put(&self, path: &str, body: Value) -> reqwest::Response {
        self.http.put(self.url(path)).json(&body).send().await.unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.http.get(self.url(path)).send().await.unwrap()
    }
}

fn at(month: u32, day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, month, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn flight(id: &str) -> Value {
    json!({
        "id": id,
        "type": "flight",
        "flightNumber": "LA2047",
        "airline": "LATAM",
        "origin": "Lima",
        "destination": "Cusco",
        "departureDate": "06/01/2030",
        "departureTime": "10:00 AM",
        "arrivalDate": "06/01/2030",
        "arrivalTime": "11:30 AM",
    })
}

#[tokio::test]
async fn health() {
    let server = TestServer::start().await;
    let resp = server.get("/health").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn save_schedules_reminders() {
    let server = TestServer::start().await;

    let resp = server.put("/trips/cusco", flight("cusco")).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    let scheduled = body["scheduled"].as_array().unwrap();
    assert!(!scheduled.is_empty());
    assert_eq!(scheduled[0]["key"], "cusco:confirmation");
    assert_eq!(server.host.pending_len(), scheduled.len());
    assert!(body.get("warning").is_none());

    let listed: Value = server.get("/trips").await.json().await.unwrap();
    assert_eq!(listed["trips"], json!(["cusco"]));

    let stored: Value = server.get("/trips/cusco").await.json().await.unwrap();
    assert_eq!(stored["flightNumber"], "LA2047");
}

#[tokio::test]
async fn saving_again_does_not_duplicate_reminders() {
    let server = TestServer::start().await;

    server.put("/trips/cusco", flight("cusco")).await;
    let first = server.host.pending_len();
    server.put("/trips/cusco", flight("cusco")).await;

    assert_eq!(server.host.pending_len(), first);
}

/// Pending reminders as sorted `(key, trigger)` pairs.
fn pending_triggers(host: &RecordingHost) -> Vec<(String, NaiveDateTime)> {
    let mut out: Vec<_> = host
        .pending()
        .into_iter()
        .map(|(_, r)| (r.key.to_string(), r.trigger_at))
        .collect();
    out.sort();
    out
}

fn planned_triggers(trip: &Trip, now: NaiveDateTime) -> Vec<(String, NaiveDateTime)> {
    let mut out: Vec<_> = plan(trip, now)
        .into_iter()
        .map(|s| (s.key.to_string(), s.trigger_at))
        .collect();
    out.sort();
    out
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_leave_reminders_for_the_stored_version() {
    let server = Arc::new(TestServer::start().await);

    let early = flight("cusco");
    let mut late = flight("cusco");
    late["departureDate"] = json!("06/03/2030");
    late["departureTime"] = json!("6:00 PM");
    late["arrivalDate"] = json!("06/03/2030");
    late["arrivalTime"] = json!("7:30 PM");

    let saves: Vec<_> = (0..12)
        .map(|i| {
            let server = Arc::clone(&server);
            let body = if i % 2 == 0 { early.clone() } else { late.clone() };
            tokio::spawn(async move { server.put("/trips/cusco", body).await.status() })
        })
        .collect();
    for save in saves {
        assert_eq!(save.await.unwrap(), 200);
    }

    let stored: Trip = server.get("/trips/cusco").await.json().await.unwrap();
    assert_eq!(
        pending_triggers(&server.host),
        planned_triggers(&stored, at(5, 1, 9, 0))
    );
}

#[tokio::test]
async fn restart_resumes_stored_trips() {
    let server = TestServer::start().await;
    server.put("/trips/cusco", flight("cusco")).await;
    server.put("/trips/puno", flight("puno")).await;

    // The next process gets an empty in-process host over the same stores.
    let host = RecordingHost::new();
    let scheduler =
        NotificationScheduler::new(HostBackend::Recording(host.clone()), Arc::clone(&server.sets));
    let trip_clock = TripClock::new(Arc::new(server.clock.clone()), &ClockConfig::default());
    let state = AppState::new(Arc::clone(&server.state.trips), scheduler, trip_clock);

    let resumed = state.resume_reminders().await.unwrap();
    assert_eq!(resumed, server.host.pending_len());

    let mut expected = Vec::new();
    for id in ["cusco", "puno"] {
        let trip = server.state.trips.get(&TripId::parse(id).unwrap()).unwrap().unwrap();
        expected.extend(planned_triggers(&trip, at(5, 1, 9, 0)));
    }
    expected.sort();
    assert_eq!(pending_triggers(&host), expected);

    // Deleting one trip leaves the other's resumed reminders alone.
    let cusco = server.state.trips.get(&TripId::parse("cusco").unwrap()).unwrap().unwrap();
    assert!(state.delete_trip(&cusco).await.unwrap());
    assert!(host.pending().iter().all(|(_, r)| r.key.as_str().starts_with("puno:")));
    assert!(host.pending_len() > 0);
}

#[tokio::test]
async fn rejects_bad_requests() {
    let server = TestServer::start().await;

    let resp = server.put("/trips/other", flight("cusco")).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("mismatch"));

    let resp = server
        .http
        .put(server.url("/trips/cusco"))
        .body("{")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let mut blank = flight("cusco");
    blank["origin"] = json!("  ");
    assert_eq!(server.put("/trips/cusco", blank).await.status(), 400);

    assert_eq!(server.get("/trips/bad%20id").await.status(), 400);
    assert_eq!(server.get("/trips/missing").await.status(), 404);
    assert_eq!(server.host.pending_len(), 0);
}

#[tokio::test]
async fn permission_denied_still_saves_trip() {
    let server = TestServer::start().await;
    server.host.deny_permission(true);

    let resp = server.put("/trips/cusco", flight("cusco")).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["scheduled"], json!([]));
    assert!(body["warning"].as_str().unwrap().contains("permission"));
    assert_eq!(server.get("/trips/cusco").await.status(), 200);
}

#[tokio::test]
async fn delete_cancels_reminders() {
    let server = TestServer::start().await;
    server.put("/trips/cusco", flight("cusco")).await;
    assert!(server.host.pending_len() > 0);

    let resp = server
        .http
        .delete(server.url("/trips/cusco"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(server.host.pending_len(), 0);
    assert_eq!(server.get("/trips/cusco").await.status(), 404);

    let resp = server
        .http
        .delete(server.url("/trips/cusco"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn timeline_follows_the_clock() {
    let server = TestServer::start().await;
    server.put("/trips/cusco", flight("cusco")).await;

    let body: Value = server.get("/trips/cusco/timeline").await.json().await.unwrap();
    assert_eq!(body["phases"].as_array().unwrap().len(), 7);
    assert_eq!(body["phases"][4]["id"], "departure");
    assert_eq!(body["progress"]["status"], "upcoming");

    server.clock.set(at(6, 1, 10, 30));
    let body: Value = server.get("/trips/cusco/timeline").await.json().await.unwrap();
    assert_eq!(body["progress"]["status"], "in-progress");
    assert_eq!(body["progress"]["currentPhaseIndex"], 4);
}

#[tokio::test]
async fn reminder_preview_has_no_side_effects() {
    let server = TestServer::start().await;
    server.put("/trips/cusco", flight("cusco")).await;
    let pending = server.host.pending_len();

    let body: Value = server.get("/trips/cusco/reminders").await.json().await.unwrap();
    let reminders = body["reminders"].as_array().unwrap();
    assert_eq!(reminders.len(), pending);
    assert!(reminders.iter().any(|r| r["rule"] == "boarding"));
    assert_eq!(server.host.pending_len(), pending);
    assert!(server.host.revoked().is_empty());
}

#[tokio::test]
async fn view_renders_html() {
    let server = TestServer::start().await;
    server.put("/trips/cusco", flight("cusco")).await;

    let resp = server.get("/trips/cusco/view").await;
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Lima → Cusco"));
    assert!(html.contains("Flight LA2047"));
}

#[tokio::test]
async fn progress_stream_ends_when_trip_completes() {
    let server = TestServer::start().await;
    server.put("/trips/cusco", flight("cusco")).await;
    server.clock.set(at(6, 2, 9, 0));

    let resp = server.get("/trips/cusco/progress/stream").await;
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let text = resp.text().await.unwrap();
    assert!(text.contains("event: progress"));
    assert!(text.contains("\"status\":\"completed\""));
}
