use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use tikvah_api::{AppState, AppStateInner, MailMessage, Notifier, router};
use tikvah_db::Database;
use tikvah_gateway::Dispatcher;

struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn send(&self, _db: &Database, _mail: &MailMessage) -> anyhow::Result<()> {
        anyhow::bail!("smtp relay unreachable")
    }
}

/// Holds every send until the test opens the gate.
struct GatedNotifier {
    gate: Mutex<Receiver<()>>,
    delivered: Mutex<Sender<String>>,
}

impl Notifier for GatedNotifier {
    fn send(&self, _db: &Database, mail: &MailMessage) -> anyhow::Result<()> {
        self.gate.lock().unwrap().recv()?;
        self.delivered.lock().unwrap().send(mail.to.clone())?;
        Ok(())
    }
}

fn app() -> (Router, AppState) {
    let db = Database::open_in_memory().unwrap();
    let state: AppState = Arc::new(AppStateInner::new(db, Dispatcher::new(), "http://portal.test", 7));
    (router(state.clone()), state)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn wait_for_outbox(state: &AppState, expected: usize) -> Vec<tikvah_db::OutboundMail> {
    for _ in 0..100 {
        let pending = state.db.pending_mail(10).unwrap();
        if pending.len() >= expected {
            return pending;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    state.db.pending_mail(10).unwrap()
}

async fn create_event(app: &Router) -> String {
    let (status, event) = call(app, "POST", "/events", Some(json!({ "name": "Purim Mixer" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    event["id"].as_str().unwrap().to_string()
}

async fn register(app: &Router, event_id: &str, name: &str, gender: &str, email: &str) -> String {
    let (status, p) = call(
        app,
        "POST",
        &format!("/events/{event_id}/participants"),
        Some(json!({ "name": name, "email": email, "phone": null, "gender": gender, "birth_date": null })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    p["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_event_uses_default_round_length() {
    let (app, _) = app();
    let (status, event) = call(&app, "POST", "/events", Some(json!({ "name": "Tu B'Av" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["round_duration_seconds"], 420);
    assert_eq!(event["active"], false);

    let id = event["id"].as_str().unwrap();
    let (status, fetched) = call(&app, "GET", &format!("/events/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["clock"]["phase"], "not_started");
}

#[tokio::test]
async fn create_event_rejects_bad_input() {
    let (app, _) = app();
    let (status, _) = call(&app, "POST", "/events", Some(json!({ "name": "x", "round_minutes": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "POST", "/events", Some(json!({ "name": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registration_needs_a_contact() {
    let (app, _) = app();
    let event_id = create_event(&app).await;
    let (status, _) = call(
        &app,
        "POST",
        &format!("/events/{event_id}/participants"),
        Some(json!({ "name": "Dina", "email": "", "phone": null, "gender": "woman", "birth_date": null })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registration_derives_age_from_birth_date() {
    let (app, _) = app();
    let event_id = create_event(&app).await;
    let (status, p) = call(
        &app,
        "POST",
        &format!("/events/{event_id}/participants"),
        Some(json!({
            "name": "Dina Katz",
            "email": "dina@example.com",
            "phone": null,
            "gender": "woman",
            "birth_date": "1990-01-01",
            "profile": { "subgroup": "yeshivish" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(p["profile"]["age"].as_u64().unwrap() >= 35);
    assert_eq!(p["profile"]["subgroup"], "yeshivish");
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let (app, _) = app();
    let ghost = uuid::Uuid::new_v4();
    let (status, _) = call(&app, "GET", &format!("/events/{ghost}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "GET", &format!("/events/{ghost}/participants"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "GET", &format!("/participants/{ghost}/live"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn self_check_in_is_idempotent_and_queues_mail() {
    let (app, state) = app();
    let event_id = create_event(&app).await;
    let leah = register(&app, &event_id, "Leah Gold", "woman", "leah@example.com").await;

    let uri = format!("/events/{event_id}/self-check-in");
    let (status, first) = call(&app, "POST", &uri, Some(json!({ "identifier": "LEAH@example.com" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["participant_id"], leah.as_str());
    assert_eq!(first["seat"], "G1");
    assert_eq!(first["already_checked_in"], false);

    let (status, second) = call(&app, "POST", &uri, Some(json!({ "identifier": "leah@example.com" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["seat"], "G1");
    assert_eq!(second["already_checked_in"], true);

    let outbox = wait_for_outbox(&state, 1).await;
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].to, "leah@example.com");
    assert!(outbox[0].html.contains(&format!("http://portal.test/checkin/{leah}")));

    let (status, _) = call(&app, "POST", &uri, Some(json!({ "identifier": "nobody@example.com" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mail_failure_does_not_fail_check_in() {
    let db = Database::open_in_memory().unwrap();
    let state: AppState = Arc::new(
        AppStateInner::new(db, Dispatcher::new(), "http://portal.test", 7).with_notifier(FailingNotifier),
    );
    let app = router(state);
    let event_id = create_event(&app).await;
    let id = register(&app, &event_id, "Shira", "woman", "shira@example.com").await;

    let (status, body) = call(&app, "POST", &format!("/participants/{id}/check-in"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seat"], "G1");
}

#[tokio::test]
async fn check_in_does_not_wait_for_mail() {
    let (open_gate, gate) = channel();
    let (delivered_tx, delivered) = channel();
    let notifier = GatedNotifier {
        gate: Mutex::new(gate),
        delivered: Mutex::new(delivered_tx),
    };
    let db = Database::open_in_memory().unwrap();
    let state: AppState =
        Arc::new(AppStateInner::new(db, Dispatcher::new(), "http://portal.test", 7).with_notifier(notifier));
    let app = router(state);
    let event_id = create_event(&app).await;
    let id = register(&app, &event_id, "Yael", "woman", "yael@example.com").await;

    let (status, body) = tokio::time::timeout(
        Duration::from_secs(5),
        call(&app, "POST", &format!("/participants/{id}/check-in"), None),
    )
    .await
    .expect("check-in should answer while mail is still pending");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seat"], "G1");

    open_gate.send(()).unwrap();
    let to = tokio::task::spawn_blocking(move || delivered.recv_timeout(Duration::from_secs(5)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(to, "yael@example.com");
}

#[tokio::test]
async fn toggle_flips_check_in_and_frees_the_seat() {
    let (app, _) = app();
    let event_id = create_event(&app).await;
    let a = register(&app, &event_id, "Avi", "man", "avi@example.com").await;
    let b = register(&app, &event_id, "Baruch", "man", "baruch@example.com").await;

    let (_, on) = call(&app, "POST", &format!("/participants/{a}/toggle"), None).await;
    assert_eq!(on["checked_in"], true);
    assert_eq!(on["seat"], "B1");

    let (_, off) = call(&app, "POST", &format!("/participants/{a}/toggle"), None).await;
    assert_eq!(off["checked_in"], false);
    assert_eq!(off["seat"], Value::Null);

    let (_, reused) = call(&app, "POST", &format!("/participants/{b}/check-in"), None).await;
    assert_eq!(reused["seat"], "B1");
}

#[tokio::test]
async fn launch_freezes_tables_and_starts_the_clock() {
    let (app, _) = app();
    let event_id = create_event(&app).await;
    let w1 = register(&app, &event_id, "Chana", "woman", "chana@example.com").await;
    let w2 = register(&app, &event_id, "Devorah", "woman", "devorah@example.com").await;
    let m1 = register(&app, &event_id, "Eli", "man", "eli@example.com").await;
    let m2 = register(&app, &event_id, "Moshe", "man", "moshe@example.com").await;
    for id in [&w1, &w2, &m1, &m2] {
        let (status, _) = call(&app, "POST", &format!("/participants/{id}/check-in"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, summary) = call(&app, "GET", &format!("/events/{event_id}/summary"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["women_checked_in"], 2);
    assert_eq!(summary["men_checked_in"], 2);
    assert_eq!(summary["capacity"]["kind"], "balanced");

    let (status, launched) = call(&app, "POST", &format!("/events/{event_id}/launch"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(launched["active"], true);
    assert_eq!(launched["total_tables"], 2);
    assert_eq!(launched["seats_assigned"], 4);

    let (status, _) = call(&app, "POST", &format!("/events/{event_id}/launch"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, view) = call(&app, "GET", &format!("/participants/{m2}/live"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["phase"], "starting");
    assert_eq!(view["next_table"], 2);
    assert_eq!(view["current_table"], Value::Null);

    // Women's seats are frozen while the event runs
    let (status, _) = call(&app, "POST", &format!("/participants/{w1}/check-out"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, stopped) = call(&app, "POST", &format!("/events/{event_id}/stop"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["active"], false);
    let (status, _) = call(&app, "POST", &format!("/events/{event_id}/stop"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
