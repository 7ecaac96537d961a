mod common;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::{wait_terminal, with_timeout};
use runcast::exec::CommandSpec;
use runcast::registry::{ProcessRegistry, RegistryLimits, RunId};
use runcast::server::{AppState, ScriptCommand, cors_layer, router};
use runcast_test_utils::fake_runner::{FakeRunner, ScriptedRun};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(runner: Arc<FakeRunner>) -> (Router, ProcessRegistry) {
    let registry = ProcessRegistry::new(runner, RegistryLimits::default());
    let scripts = ScriptCommand {
        program: "runcast".to_string(),
        config: None,
        workdir: PathBuf::from("/ws"),
    };
    let state = AppState::new(registry.clone(), scripts);
    (router(state), registry)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = with_timeout(app.clone().oneshot(request)).await.unwrap();
    let status = response.status();
    let bytes = with_timeout(to_bytes(response.into_body(), usize::MAX))
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn process_id(body: &str) -> RunId {
    let value: Value = serde_json::from_str(body).unwrap();
    assert_eq!(value["success"], json!(true));
    value["processId"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_start_install_maps_request_to_subcommand() {
    let runner = Arc::new(FakeRunner::new());
    let (app, registry) = app(runner.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/api/scripts/install",
        Some(json!({
            "only": "node",
            "force": true,
            "dryRun": true,
            "pipIndex": "https://mirror.example/simple",
            "pm": "pnpm"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = process_id(&body);
    assert!(registry.get_run(&id).is_ok());

    let spec: CommandSpec = runner.launched()[0].clone();
    assert_eq!(spec.program, "runcast");
    assert_eq!(
        spec.args,
        vec![
            "install",
            "--only",
            "node",
            "--pm",
            "pnpm",
            "--force",
            "--dry-run",
            "--pip-index",
            "https://mirror.example/simple",
        ]
    );
    assert_eq!(spec.cwd, Some(PathBuf::from("/ws")));
    assert_eq!(spec.env.get("RUNCAST_LOG").map(String::as_str), Some("warn"));
}

#[tokio::test]
async fn test_start_update_with_defaults_and_alias() {
    let runner = Arc::new(FakeRunner::new());
    let (app, _) = app(runner.clone());

    let (status, _) = send(&app, "POST", "/api/scripts/update", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/scripts/update",
        Some(json!({ "mode": "force", "scope": "root", "install": "dependencies-only" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let lines = runner.launched_lines();
    assert_eq!(
        lines[0],
        "runcast update --mode safe --scope all --install node"
    );
    assert_eq!(
        lines[1],
        "runcast update --mode force --scope root --install node"
    );
}

#[tokio::test]
async fn test_start_update_forwards_only_a_requested_package_manager() {
    let runner = Arc::new(FakeRunner::new());
    let (app, _) = app(runner.clone());

    let (status, _) = send(
        &app,
        "POST",
        "/api/scripts/update",
        Some(json!({ "pm": "npm" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/api/scripts/update", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let lines = runner.launched_lines();
    assert_eq!(
        lines[0],
        "runcast update --mode safe --scope all --install node --pm npm"
    );
    assert!(!lines[1].contains("--pm"));
}

#[tokio::test]
async fn test_invalid_body_is_bad_request() {
    let runner = Arc::new(FakeRunner::new());
    let (app, _) = app(runner.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/api/scripts/update",
        Some(json!({ "mode": "sideways" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["success"], json!(false));
    assert_eq!(value["error"], json!("bad_request"));
    assert!(runner.launched().is_empty());
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
    let (app, _) = app(Arc::new(FakeRunner::new()));

    let (status, body) = send(&app, "GET", "/api/scripts/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("not_found"));

    let (status, _) = send(&app, "POST", "/api/scripts/nope/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/scripts/stream/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_snapshot_list_and_cancel_conflict() {
    let runner = Arc::new(FakeRunner::new().with_default(ScriptedRun::exits(0).chunk("hello\n")));
    let (app, registry) = app(runner);

    let (_, body) = send(&app, "POST", "/api/scripts/install", None).await;
    let id = process_id(&body);
    wait_terminal(&registry, &id).await;

    let (status, body) = send(&app, "GET", &format!("/api/scripts/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(snapshot["state"]["state"], json!("exited"));
    assert_eq!(snapshot["state"]["code"], json!(0));
    assert_eq!(
        snapshot["lines"],
        json!(["hello", "Process exited with code 0"])
    );

    let (status, body) = send(&app, "GET", "/api/scripts", None).await;
    assert_eq!(status, StatusCode::OK);
    let list: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, body) = send(&app, "POST", &format!("/api/scripts/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("invalid_state"));
}

#[tokio::test]
async fn test_cancel_running_run() {
    let runner = Arc::new(FakeRunner::new().with_default(ScriptedRun::until_cancel()));
    let (app, registry) = app(runner);

    let (_, body) = send(&app, "POST", "/api/scripts/update", None).await;
    let id = process_id(&body);

    let (status, _) = send(&app, "POST", &format!("/api/scripts/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    let state = wait_terminal(&registry, &id).await;
    assert_eq!(state.name(), "cancelled");
}

#[tokio::test]
async fn test_stream_replays_and_closes_after_exit() {
    let runner = Arc::new(
        FakeRunner::new().with_default(ScriptedRun::exits(0).chunk("one\n").chunk("two\n")),
    );
    let (app, registry) = app(runner);

    let (_, body) = send(&app, "POST", "/api/scripts/install", None).await;
    let id = process_id(&body);
    wait_terminal(&registry, &id).await;

    let (status, body) = send(&app, "GET", &format!("/api/scripts/stream/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"data: {"type":"output","op":"append","index":0,"data":"one"}"#));
    assert!(body.contains(r#"data: {"type":"output","op":"append","index":1,"data":"two"}"#));
    assert!(body.contains(r#"data: {"type":"exit","state":"exited","code":0}"#));

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/scripts/stream/{id}?cursor=2"),
        None,
    )
    .await;
    assert!(!body.contains(r#""data":"one""#));
    assert!(!body.contains(r#""data":"two""#));
    assert!(body.contains(r#""index":2,"data":"Process exited with code 0""#));
}

#[test]
fn test_cors_layer_accepts_wildcard_and_lists() {
    assert!(cors_layer("*").is_ok());
    assert!(cors_layer("http://localhost:5173, https://ui.example").is_ok());
    assert!(cors_layer("bad\norigin").is_err());
}
