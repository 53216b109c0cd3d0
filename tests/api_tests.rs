// tests/api_tests.rs

use std::net::SocketAddr;
use std::sync::Arc;

use qa_board::{config::Config, routes, state::AppState, store::MemoryStore};
use serde_json::{Value, json};

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // In-memory store, no rate limiting
    spawn_app_with(Config::for_tests()).await
}

async fn spawn_app_with(config: Config) -> String {
    // 1. In-memory store
    let state = AppState::new(Arc::new(MemoryStore::new()), config);

    // 2. Create the router with the app state
    let app = routes::create_router(state);

    // 3. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 4. Spawn the server in the background; the rate limiter keys on the peer address
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    address
}

async fn create_course(client: &reqwest::Client, address: &str, code: &str) -> Value {
    let response = client
        .post(format!("{}/api/courses", address))
        .json(&json!({
            "title": "Operating Systems",
            "code": code,
            "instructor": "Dr. Rivera",
            "description": "Processes, memory and files"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    body["data"].clone()
}

async fn start_session(client: &reqwest::Client, address: &str, course_id: i64) -> Value {
    let response = client
        .post(format!("{}/api/sessions", address))
        .json(&json!({ "courseId": course_id, "instructor": "Dr. Rivera" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    body["data"].clone()
}

async fn post_question(
    client: &reqwest::Client,
    address: &str,
    session_id: &str,
    student: &str,
    content: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/api/questions", address))
        .json(&json!({
            "sessionId": session_id,
            "studentName": student,
            "content": content
        }))
        .send()
        .await
        .expect("Failed to execute request")
}

async fn set_status(client: &reqwest::Client, address: &str, id: i64, action: &str) -> reqwest::Response {
    client
        .put(format!("{}/api/questions/{}/status", address, id))
        .json(&json!({ "action": action }))
        .send()
        .await
        .expect("Failed to execute request")
}

fn is_session_id(value: &str) -> bool {
    value.len() == 9
        && value.starts_with("VV-")
        && value[3..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Route not found - /random_path_that_does_not_exist"
    );
}

#[tokio::test]
async fn health_and_security_headers() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn rate_limited_requests_get_json_429() {
    let address = spawn_app_with(Config {
        rate_limit_per_second: 60,
        rate_limit_burst: 1,
        ..Config::for_tests()
    })
    .await;
    let client = reqwest::Client::new();

    let first = client
        .get(format!("{}/api/courses", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(first.status().as_u16(), 200);

    let second = client
        .get(format!("{}/api/courses", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(second.status().as_u16(), 429);
    assert_eq!(second.headers()["content-type"], "application/json");

    let body: Value = second.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Too many requests from this IP. Please try again later."
    );
}

#[tokio::test]
async fn course_crud_normalizes_and_rejects_duplicate_codes() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let course = create_course(&client, &address, " cs301 ").await;
    assert_eq!(course["code"], "CS301");
    let id = course["id"].as_i64().unwrap();

    // Same code in another case is still a duplicate
    let response = client
        .post(format!("{}/api/courses", address))
        .json(&json!({ "title": "Other", "code": "Cs301", "instructor": "Someone" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // Partial update keeps untouched fields
    let response = client
        .put(format!("{}/api/courses/{}", address, id))
        .json(&json!({ "title": "Advanced Operating Systems" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Advanced Operating Systems");
    assert_eq!(body["data"]["code"], "CS301");
    assert_eq!(body["data"]["instructor"], "Dr. Rivera");

    let body: Value = client
        .get(format!("{}/api/courses", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 1);

    let response = client
        .delete(format!("{}/api/courses/{}", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(format!("{}/api/courses/{}", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn course_validation_errors_list_fields() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/courses", address))
        .json(&json!({ "title": "", "code": "", "instructor": "Dr. Rivera" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["code", "title"]);

    // Non-numeric id in the path
    let response = client
        .get(format!("{}/api/courses/abc", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn session_lifecycle_end_to_end() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let course = create_course(&client, &address, "CS301").await;
    let course_id = course["id"].as_i64().unwrap();

    // Start a session
    let session = start_session(&client, &address, course_id).await;
    let session_id = session["sessionId"].as_str().unwrap().to_string();
    assert!(is_session_id(&session_id), "{}", session_id);
    assert_eq!(session["isActive"], true);
    assert_eq!(session["questionCount"], 0);
    assert_eq!(session["course"]["code"], "CS301");

    // A second start is rejected and points at the running session
    let response = client
        .post(format!("{}/api/sessions", address))
        .json(&json!({ "courseId": course_id, "instructor": "Dr. Rivera" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["sessionId"], session_id.as_str());
    assert!(body["data"]["startTime"].is_string());

    // Active lookup
    let body: Value = client
        .get(format!("{}/api/sessions/course/{}/active", address, course_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["sessionId"], session_id.as_str());

    // Post a question and mark it important
    let response = post_question(
        &client,
        &address,
        &session_id,
        "Alice",
        "What is a page fault?",
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "unanswered");
    assert_eq!(body["data"]["course"]["code"], "CS301");
    let question_id = body["data"]["id"].as_i64().unwrap();

    let body: Value = set_status(&client, &address, question_id, "mark_important")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["status"], "important");

    // Answering keeps the derived status on important
    let body: Value = set_status(&client, &address, question_id, "toggle_answered")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["isAnswered"], true);
    assert_eq!(body["data"]["isImportant"], true);
    assert_eq!(body["data"]["status"], "important");

    // End the session; ending again is rejected
    let response = client
        .put(format!("{}/api/sessions/{}/end", address, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["isActive"], false);
    assert!(body["data"]["endTime"].is_string());
    assert_eq!(body["data"]["questionCount"], 1);

    let response = client
        .put(format!("{}/api/sessions/{}/end", address, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Session is already ended");

    // Ended sessions take no questions and no status changes
    let response = post_question(
        &client,
        &address,
        &session_id,
        "Bob",
        "Is this still open?",
    )
    .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = set_status(&client, &address, question_id, "toggle_important").await;
    assert_eq!(response.status().as_u16(), 400);

    // No active session any more
    let response = client
        .get(format!("{}/api/sessions/course/{}/active", address, course_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // History lists the ended session
    let body: Value = client
        .get(format!(
            "{}/api/sessions/course/{}?status=ended",
            address, course_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["sessionId"], session_id.as_str());
}

#[tokio::test]
async fn duplicate_questions_are_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let course = create_course(&client, &address, "CS302").await;
    let session = start_session(&client, &address, course["id"].as_i64().unwrap()).await;
    let session_id = session["sessionId"].as_str().unwrap();

    let response = post_question(&client, &address, session_id, "Alice", "What is a mutex?").await;
    assert_eq!(response.status().as_u16(), 201);

    // Surrounding whitespace is trimmed before the comparison
    let response =
        post_question(&client, &address, session_id, "Alice", "  What is a mutex?  ").await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "You have already posted this exact question");

    // Another student may ask the same thing
    let response = post_question(&client, &address, session_id, "Bob", "What is a mutex?").await;
    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn question_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Malformed session id
    let response = post_question(&client, &address, "ABC", "Alice", "Long enough question").await;
    assert_eq!(response.status().as_u16(), 400);

    // Too short
    let response = post_question(&client, &address, "VV-ABC123", "Alice", "Hey").await;
    assert_eq!(response.status().as_u16(), 400);

    // Well formed but unknown session
    let response =
        post_question(&client, &address, "VV-ZZZZZZ", "Alice", "Long enough question").await;
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .get(format!("{}/api/questions/session/not-an-id", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = set_status(&client, &address, 1, "explode").await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"][0]["field"], "action");

    let response = set_status(&client, &address, 999, "mark_answered").await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn listing_filters_and_groups() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let course = create_course(&client, &address, "CS303").await;
    let session = start_session(&client, &address, course["id"].as_i64().unwrap()).await;
    let session_id = session["sessionId"].as_str().unwrap().to_string();

    let mut ids = Vec::new();
    for (student, content) in [
        ("Alice", "First question here"),
        ("Alice", "Second question here"),
        ("Bob", "Third question here"),
    ] {
        let body: Value = post_question(&client, &address, &session_id, student, content)
            .await
            .json()
            .await
            .unwrap();
        ids.push(body["data"]["id"].as_i64().unwrap());
    }

    // Alice's first question: answered and important
    set_status(&client, &address, ids[0], "mark_answered").await;
    set_status(&client, &address, ids[0], "mark_important").await;
    // Bob's question: important only
    set_status(&client, &address, ids[2], "mark_important").await;

    let list = |query: &str| {
        let client = client.clone();
        let url = format!(
            "{}/api/questions/session/{}{}",
            address, session_id, query
        );
        async move {
            let response = client.get(url).send().await.unwrap();
            assert_eq!(response.status().as_u16(), 200);
            response.json::<Value>().await.unwrap()
        }
    };

    let body = list("").await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["total"], 3);
    assert_eq!(body["data"]["session"]["questionCount"], 3);
    // Newest first
    assert_eq!(body["data"]["questions"][0]["id"], ids[2]);

    // Filters look at the flags, not the derived status
    let body = list("?status=answered").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"]["questions"][0]["status"], "important");

    let body = list("?status=important").await;
    assert_eq!(body["total"], 2);

    let body = list("?status=unanswered").await;
    assert_eq!(body["total"], 2);

    let body = list("?student=ali").await;
    assert_eq!(body["total"], 2);
    assert_eq!(
        body["data"]["groupedByStudent"]["Alice"]
            .as_array()
            .unwrap()
            .len(),
        2
    );

    let body = list("?limit=2&page=2").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["page"], 2);
    assert_eq!(body["pages"], 2);
    assert_eq!(body["data"]["questions"][0]["id"], ids[0]);

    let response = client
        .get(format!(
            "{}/api/questions/session/{}?status=bogus",
            address, session_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Grouped view with per-student stats
    let body: Value = client
        .get(format!(
            "{}/api/questions/session/{}/by-student",
            address, session_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 2);
    assert_eq!(body["totalQuestions"], 3);
    let alice = &body["data"]["studentStats"]["Alice"];
    assert_eq!(alice["total"], 2);
    assert_eq!(alice["answered"], 1);
    assert_eq!(alice["unanswered"], 1);
    assert_eq!(alice["important"], 1);
    assert_eq!(body["data"]["studentStats"]["Bob"]["important"], 1);
}

#[tokio::test]
async fn deleting_a_question_updates_the_count() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let course = create_course(&client, &address, "CS304").await;
    let session = start_session(&client, &address, course["id"].as_i64().unwrap()).await;
    let session_id = session["sessionId"].as_str().unwrap().to_string();

    let body: Value = post_question(&client, &address, &session_id, "Alice", "Delete me please")
        .await
        .json()
        .await
        .unwrap();
    let question_id = body["data"]["id"].as_i64().unwrap();

    let response = client
        .delete(format!("{}/api/questions/{}", address, question_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["id"], question_id);

    let body: Value = client
        .get(format!("{}/api/sessions/{}", address, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["questionCount"], 0);

    let response = client
        .delete(format!("{}/api/questions/{}", address, question_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
