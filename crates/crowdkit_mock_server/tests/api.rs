//! Request-level behavior of the mock backend.

use crowdkit_client::{BlockingTransport, Method, Request};
use crowdkit_mock_server::{BackendConfig, Fault, MockBackend};
use serde_json::{json, Value};

fn send(backend: &MockBackend, request: Request) -> (u16, Value) {
    let response = backend.send(&request).unwrap();
    let body = response.json_body().cloned().unwrap_or(Value::Null);
    (response.status, body)
}

fn query(request: Request, pairs: &[(&str, &str)]) -> Request {
    request.with_query(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
}

#[test]
fn search_pages_by_id_cursor() {
    let backend = MockBackend::with_config(BackendConfig::new().with_default_limit(2));
    for n in 0..5 {
        backend.insert("tasks", json!({"pool_id": "p", "input_values": {"n": n}}));
    }

    let (status, first) = send(&backend, query(Request::get("/v1/tasks"), &[("pool_id", "p")]));
    assert_eq!(status, 200);
    assert_eq!(first["has_more"], json!(true));
    let last = first["items"][1]["id"].as_str().unwrap().to_string();

    let (_, second) = send(
        &backend,
        query(
            Request::get("/v1/tasks"),
            &[("pool_id", "p"), ("id_gt", &last), ("limit", "10")],
        ),
    );
    assert_eq!(second["items"].as_array().unwrap().len(), 3);
    assert_eq!(second["has_more"], json!(false));
}

#[test]
fn operation_lifecycle() {
    let backend = MockBackend::with_config(BackendConfig::new().with_running_polls(1));
    let operation_id = "0b6b8a4e-7e0c-4a8e-9a0f-3d2b1c0a9e8f";
    let (status, started) = send(
        &backend,
        query(
            Request::post("/v1/task-suites", json!([{"pool_id": "p", "tasks": [{"input_values": {"x": 1}}]}])),
            &[("operation_id", operation_id)],
        ),
    );
    assert_eq!(status, 202);
    assert_eq!(started["type"], json!("TASK_SUITE.BATCH_CREATE"));

    let path = format!("/v1/operations/{operation_id}");
    let (_, running) = send(&backend, Request::get(path.clone()));
    assert_eq!(running["status"], json!("RUNNING"));
    let (_, done) = send(&backend, Request::get(path.clone()));
    assert_eq!(done["status"], json!("SUCCESS"));

    let (_, log) = send(&backend, Request::get(format!("{path}/log")));
    assert_eq!(log[0]["type"], json!("TASK_SUITE_CREATE"));
    assert_eq!(log[0]["input"]["pool_id"], json!("p"));
}

#[test]
fn invalid_query_parameters_are_rejected() {
    let backend = MockBackend::new();
    let (status, body) = send(
        &backend,
        query(Request::post("/v1/tasks", json!([])), &[("async_mode", "maybe")]),
    );
    assert_eq!(status, 400);
    assert_eq!(body["code"], json!("INCORRECT_ACTION"));

    let (status, _) = send(&backend, Request::post("/v1/tasks", json!("nope")));
    assert_eq!(status, 400);
}

#[test]
fn oversized_batch_is_rejected() {
    let backend = MockBackend::with_config(BackendConfig::new().with_max_batch_size(1));
    let (status, _) = send(
        &backend,
        Request::post("/v1/tasks", json!([{"pool_id": "p"}, {"pool_id": "p"}])),
    );
    assert_eq!(status, 400);
    assert_eq!(backend.count("tasks"), 0);
}

#[test]
fn faults_target_matching_requests_only() {
    let backend = MockBackend::new();
    backend.inject(Method::Get, "/v1/operations/", Fault::ServerError);

    let (status, _) = send(&backend, Request::get("/v1/tasks"));
    assert_eq!(status, 200);
    let (status, body) = send(&backend, Request::get("/v1/operations/x"));
    assert_eq!(status, 500);
    assert_eq!(body["code"], json!("INTERNAL_ERROR"));
    let (status, _) = send(&backend, Request::get("/v1/operations/x"));
    assert_eq!(status, 404);
}
