//! End-to-end smoke tests for the full homerunnerd stack.
//!
//! Each test spins up the complete application (in-memory `SQLite`, real
//! repos, real hub client, real supervisor, real axum router) against a mock
//! hub bound on a local port. The debug API is exercised via
//! `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use homerunner_adapter_hass_reqwest::{HassClient, HassConfig};
use homerunner_adapter_http_axum::router;
use homerunner_adapter_http_axum::state::AppState;
use homerunner_adapter_storage_sqlite_sqlx::{
    Config, SqliteAutomationRepository, SqliteEventLog,
};
use homerunner_app::ports::{AutomationRepository, SystemClock};
use homerunner_app::runner::{RunnerConfig, RunnerContext};
use homerunner_app::supervisor::RunnerSupervisor;
use homerunner_domain::automation::{Automation, AutomationKind};

type Supervisor = RunnerSupervisor<HassClient, SqliteEventLog, SqliteAutomationRepository>;

/// Mutable state of the fake hub.
#[derive(Clone, Default)]
struct Hub {
    motion: Arc<Mutex<String>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Hub {
    fn set_motion(&self, state: &str) {
        *self.motion.lock().unwrap() = state.to_string();
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

async fn state_handler(
    State(hub): State<Hub>,
    Path(entity_id): Path<String>,
) -> Result<axum::Json<Value>, StatusCode> {
    if entity_id != "binary_sensor.hall" {
        return Err(StatusCode::NOT_FOUND);
    }
    let state = hub.motion.lock().unwrap().clone();
    Ok(axum::Json(json!({
        "entity_id": entity_id,
        "state": state,
        "attributes": {}
    })))
}

async fn service_handler(
    State(hub): State<Hub>,
    Path((domain, service)): Path<(String, String)>,
    axum::Json(body): axum::Json<Value>,
) -> StatusCode {
    let entity = body["entity_id"].as_str().unwrap_or_default().to_string();
    hub.calls
        .lock()
        .unwrap()
        .push(format!("{domain}.{service}({entity})"));
    StatusCode::OK
}

async fn start_hub() -> (String, Hub) {
    let hub = Hub::default();
    hub.set_motion("off");
    let app = Router::new()
        .route("/api/states/{entity_id}", get(state_handler))
        .route("/api/services/{domain}/{service}", post(service_handler))
        .with_state(hub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{addr}"), hub)
}

struct Stack {
    app: Router,
    hub: Hub,
    repo: Arc<SqliteAutomationRepository>,
    supervisor: Arc<Supervisor>,
}

/// Build a fully-wired stack backed by an in-memory `SQLite` database.
async fn stack() -> Stack {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise");
    let pool = db.pool().clone();

    let (base_url, hub) = start_hub().await;
    let client = HassClient::new(HassConfig {
        base_url,
        token: "test-token".to_string(),
        timeout_secs: 2,
    })
    .unwrap();

    let repo = Arc::new(SqliteAutomationRepository::new(pool.clone()));
    let ctx = RunnerContext::new(
        Arc::new(client),
        Arc::new(SqliteEventLog::new(pool)),
        Arc::clone(&repo),
        Arc::new(SystemClock),
    )
    .with_config(RunnerConfig {
        motion_poll_interval: Duration::from_millis(20),
        ..RunnerConfig::default()
    });
    let supervisor = Arc::new(RunnerSupervisor::new(ctx));
    let app = router::build(AppState::new(Arc::clone(&supervisor)));

    Stack {
        app,
        hub,
        repo,
        supervisor,
    }
}

fn hall_light() -> Automation {
    Automation::builder()
        .name("Hall light")
        .kind(AutomationKind::EdgeTriggered)
        .setting("motion_entity", "binary_sensor.hall")
        .setting("light_entity", "light.hall")
        .setting("delay_seconds", 60)
        .build()
        .unwrap()
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Poll `check` until it holds or a few seconds have passed.
async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..250 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let stack = stack().await;
    let response = stack
        .app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Runners
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn should_start_active_automations_from_storage() {
    let stack = stack().await;
    let auto = stack.repo.create(hall_light()).await.unwrap();
    stack
        .repo
        .create(
            Automation::builder()
                .name("Disabled")
                .kind(AutomationKind::EdgeTriggered)
                .setting("motion_entity", "binary_sensor.hall")
                .setting("light_entity", "light.hall")
                .active(false)
                .build()
                .unwrap(),
        )
        .await
        .unwrap();

    let started = stack.supervisor.start_all_active().await.unwrap();
    assert_eq!(started, 1);

    let (status, body) = get_json(&stack.app, "/api/runners").await;
    assert_eq!(status, StatusCode::OK);
    let runners = body.as_array().unwrap();
    assert_eq!(runners.len(), 1);
    assert_eq!(runners[0]["automationId"], auto.id.to_string());
    assert_eq!(runners[0]["isRunning"], true);

    stack.supervisor.stop_all().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn should_turn_light_on_when_motion_detected() {
    let stack = stack().await;
    let auto = stack.repo.create(hall_light()).await.unwrap();
    stack.supervisor.start_all_active().await.unwrap();

    let s = &stack;
    let runner_uri = &format!("/api/runners/{}", auto.id);
    let observed_off = eventually(move || async move {
        let (_, body) = get_json(&s.app, runner_uri).await;
        body["lastObservedState"] == "off"
    })
    .await;
    assert!(observed_off, "runner never observed the initial state");

    stack.hub.set_motion("on");
    let turned_on = eventually(move || async move {
        s.hub
            .calls()
            .contains(&"light.turn_on(light.hall)".to_string())
    })
    .await;
    assert!(turned_on, "light was never turned on");

    let id = auto.id;
    let recorded = eventually(move || async move {
        let stored = s.repo.get_by_id(id).await.unwrap().unwrap();
        stored.trigger_count >= 1 && stored.last_triggered.is_some()
    })
    .await;
    assert!(recorded, "trigger was never recorded");

    stack.supervisor.stop_all().await;

    let events_uri = format!("/api/automations/{}/events", auto.id);
    let (status, events) = get_json(&stack.app, &events_uri).await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["event_type"].as_str())
        .collect();
    assert_eq!(types.first(), Some(&"stopped"));
    assert_eq!(types.last(), Some(&"started"));
    assert!(types.contains(&"triggered"));
    assert!(types.contains(&"action_executed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn should_stop_runner_through_the_api() {
    let stack = stack().await;
    let auto = stack.repo.create(hall_light()).await.unwrap();
    stack.supervisor.start_all_active().await.unwrap();

    let response = stack
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/runners/{}/stop", auto.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, body) = get_json(&stack.app, "/api/runners").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}
