use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use talent_pipeline::{
    database::pool::{create_pool, run_migrations},
    routes,
    services::{
        record_store::RecordStore,
        simulator::{SimulatedGateway, SimulationProfile},
    },
    AppState,
};
use tower::ServiceExt;

async fn app() -> Router {
    let pool = create_pool("sqlite::memory:").await.expect("pool");
    run_migrations(&pool).await.expect("migrations");
    let gateway = SimulatedGateway::new(RecordStore::new(pool), SimulationProfile::instant());
    routes::router(AppState::new(Arc::new(gateway), 10))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn orders_by_title(jobs: &JsonValue) -> Vec<(String, i64)> {
    jobs.as_array()
        .unwrap()
        .iter()
        .map(|j| {
            (
                j["title"].as_str().unwrap().to_string(),
                j["order"].as_i64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn job_board_flow() {
    let app = app().await;

    for title in ["Backend Engineer", "Frontend Engineer", "Data Analyst", "SRE", "Designer"] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/jobs",
            Some(json!({ "title": title })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    let (status, body) = send(
        &app,
        "POST",
        "/api/jobs",
        Some(json!({ "title": "Backend Engineer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Job with this slug already exists");

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/jobs/reorder",
        Some(json!({ "from_order": 2, "to_order": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        orders_by_title(&body),
        vec![
            ("Backend Engineer".to_string(), 1),
            ("Data Analyst".to_string(), 2),
            ("SRE".to_string(), 3),
            ("Frontend Engineer".to_string(), 4),
            ("Designer".to_string(), 5),
        ]
    );

    let (status, _) = send(
        &app,
        "PATCH",
        "/api/jobs/reorder",
        Some(json!({ "from_order": 1, "to_order": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, page) = send(&app, "GET", "/api/jobs?search=engineer&page_size=1&page=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"][0]["title"], "Frontend Engineer");
    assert_eq!(page["items"][0]["order"], 4);

    let id = page["items"][0]["id"].as_str().unwrap().to_string();
    let (status, job) = send(&app, "POST", &format!("/api/jobs/{}/archive", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "archived");

    let (_, archived) = send(&app, "GET", "/api/jobs?status=archived", None).await;
    assert_eq!(archived["total"], 1);

    let (status, job) = send(
        &app,
        "PATCH",
        &format!("/api/jobs/{}", id),
        Some(json!({ "title": "Web Engineer", "slug": "web-engineer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["slug"], "web-engineer");
    assert_eq!(job["order"], 4);

    let (status, job) = send(&app, "POST", &format!("/api/jobs/{}/activate", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "active");
}

#[tokio::test]
async fn candidate_pipeline_flow() {
    let app = app().await;
    let (_, job) = send(&app, "POST", "/api/jobs", Some(json!({ "title": "Rust Engineer" }))).await;
    let job_id = job["id"].as_str().unwrap().to_string();

    let (status, candidate) = send(
        &app,
        "POST",
        "/api/candidates",
        Some(json!({ "job_id": job_id, "name": "Ada Lovelace", "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(candidate["stage"], "applied");
    let id = candidate["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/api/candidates",
        Some(json!({ "job_id": job_id, "name": "Ada", "email": "not-an-email" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stage_uri = format!("/api/candidates/{}/stage", id);
    let (status, moved) = send(&app, "PATCH", &stage_uri, Some(json!({ "stage": "tech" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["changed"], true);
    assert_eq!(moved["candidate"]["stage"], "tech");

    let (status, moved) = send(&app, "PATCH", &stage_uri, Some(json!({ "stage": "tech" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["changed"], false);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/candidates/{}/stage", uuid::Uuid::new_v4()),
        Some(json!({ "stage": "offer" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, noted) = send(
        &app,
        "POST",
        &format!("/api/candidates/{}/notes", id),
        Some(json!({ "author": "recruiter", "content": "Great call, looping in @grace" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(noted["notes"][0]["mentions"], json!(["grace"]));

    let (status, timeline) = send(&app, "GET", &format!("/api/candidates/{}/timeline", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = timeline
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["stage_change", "stage_change", "note"]);
    assert_eq!(timeline[0]["description"], "Applied for position");

    let (status, board) = send(&app, "GET", "/api/pipeline", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[2]["stage"], "tech");
    assert_eq!(board[2]["candidates"][0]["name"], "Ada Lovelace");

    let (status, page) = send(&app, "GET", "/api/candidates?search=lovelace&stage=tech", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/api/candidates/{}", id),
        Some(json!({ "location": "London", "skills": ["analysis", "engines"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["location"], "London");
    assert_eq!(updated["stage"], "tech");

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/candidates/{}", id),
        Some(json!({ "email": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn filtered_candidate_list_keeps_everyone_movable() {
    let app = app().await;
    let (_, job) = send(&app, "POST", "/api/jobs", Some(json!({ "title": "Compiler Engineer" }))).await;
    let job_id = job["id"].as_str().unwrap().to_string();

    let mut ids = Vec::new();
    for (name, email) in [("Ada", "ada@example.com"), ("Bob", "bob@example.com")] {
        let (status, candidate) = send(
            &app,
            "POST",
            "/api/candidates",
            Some(json!({ "job_id": job_id, "name": name, "email": email })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(candidate["id"].as_str().unwrap().to_string());
    }

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/candidates/{}/stage", ids[1]),
        Some(json!({ "stage": "hired" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, hired) = send(&app, "GET", "/api/candidates?stage=hired", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hired["total"], 1);
    assert_eq!(hired["items"][0]["name"], "Bob");

    let (status, moved) = send(
        &app,
        "PATCH",
        &format!("/api/candidates/{}/stage", ids[0]),
        Some(json!({ "stage": "screen" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", moved);
    assert_eq!(moved["candidate"]["stage"], "screen");

    let (_, board) = send(&app, "GET", "/api/pipeline", None).await;
    let count: usize = board
        .as_array()
        .unwrap()
        .iter()
        .map(|column| column["candidates"].as_array().unwrap().len())
        .sum();
    assert_eq!(count, 2);

    let (status, beyond) = send(
        &app,
        "GET",
        "/api/candidates?page=9223372036854775807&page_size=10",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(beyond["items"], json!([]));
    assert_eq!(beyond["total"], 2);

    let (status, jobs) = send(&app, "GET", "/api/jobs?page=9223372036854775807", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs["items"], json!([]));
}

#[tokio::test]
async fn assessment_flow() {
    let app = app().await;
    let (_, job) = send(&app, "POST", "/api/jobs", Some(json!({ "title": "Platform Engineer" }))).await;
    let job_id = job["id"].as_str().unwrap().to_string();
    let uri = format!("/api/assessments/{}", job_id);

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let assessment = json!({
        "title": "Platform screening",
        "sections": [{
            "id": "s1",
            "title": "Experience",
            "questions": [
                {
                    "id": "oncall",
                    "type": "single-choice",
                    "prompt": "Have you been on call?",
                    "required": true,
                    "options": ["yes", "no"]
                },
                {
                    "id": "pages",
                    "type": "numeric",
                    "prompt": "Pages per week?",
                    "required": true,
                    "min": 0,
                    "max": 100,
                    "condition": { "depends_on": "oncall", "condition": "equals", "value": "yes" }
                }
            ]
        }]
    });
    let (status, saved) = send(&app, "PUT", &uri, Some(assessment)).await;
    assert_eq!(status, StatusCode::OK, "{}", saved);
    assert_eq!(saved["sections"][0]["questions"].as_array().unwrap().len(), 2);

    let (status, fetched) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], saved["id"]);

    let (_, candidate) = send(
        &app,
        "POST",
        "/api/candidates",
        Some(json!({ "job_id": job_id, "name": "Grace Hopper", "email": "grace@example.com" })),
    )
    .await;
    let candidate_id = candidate["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &format!("{}/submit", uri),
        Some(json!({ "candidate_id": uuid::Uuid::new_v4(), "answers": { "oncall": "no" } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        &format!("{}/submit", uri),
        Some(json!({ "candidate_id": candidate_id, "answers": { "oncall": "yes", "pages": 250 } })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"]["pages"], "Value must be at most 100");

    let (status, body) = send(
        &app,
        "POST",
        &format!("{}/submit", uri),
        Some(json!({ "candidate_id": candidate_id, "answers": { "oncall": "no" } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["answers"], json!({ "oncall": "no" }));
}
