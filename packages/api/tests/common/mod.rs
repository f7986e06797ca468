// ABOUTME: Common test utilities for API integration tests
// ABOUTME: Spawns the router on a random port over in-memory SQLite and a scripted LLM

use std::sync::Arc;

use prdsmith_ai::testing::ScriptedClient;
use prdsmith_api::{create_router, AppState};
use prdsmith_prd::PrdWorkflow;
use prdsmith_storage::connect_in_memory;

pub const IDEA: &str = "AI-powered meeting summarizer for remote teams";

pub const PRD_REPLY: &str = r#"{
  "title": "Meeting Summarizer",
  "description": "Turns remote meetings into summaries and action items",
  "targetUsers": {"primary": ["Remote team leads"], "secondary": []},
  "painPoints": ["Notes are incomplete"],
  "coreValue": ["Never lose a decision"],
  "features": [
    {"id": "feature_1", "name": "Transcription", "description": "Speech to text",
     "priority": "high", "effort": 3, "value": 5, "acceptanceCriteria": ["90% accuracy"]}
  ],
  "successMetrics": ["Weekly active teams"],
  "techFeasibility": {"overall": "medium", "challenges": ["Accents"], "recommendations": []},
  "competitors": []
}"#;

pub const VALID_FLOW: &str = "graph TD\n    A[Client] --> B[API]";
pub const VALID_JOURNEY: &str = "journey\n  title Weekly sync\n  section Join\n    Open the app: 5: Lead";
pub const FINAL_MARKDOWN: &str =
    "# Meeting Summarizer\n\n## Background\n\nRemote teams need recaps.\n\n- Transcripts\n- Action items\n";

/// Test context containing server URL and the scripted model
pub struct TestContext {
    pub base_url: String,
    #[allow(dead_code)]
    pub client: Arc<ScriptedClient>,
}

/// Create a test server with an isolated database
pub async fn setup_test_server(client: ScriptedClient) -> TestContext {
    let client = Arc::new(client);
    let pool = connect_in_memory()
        .await
        .expect("Failed to create database pool");
    let workflow = PrdWorkflow::new(client.clone(), pool);
    let app = create_router(AppState::new(workflow));

    // Bind to random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    // Spawn server
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    TestContext { base_url, client }
}

/// Helper to make GET requests
pub async fn get(base_url: &str, path: &str) -> reqwest::Response {
    let client = reqwest::Client::new();
    client
        .get(format!("{}{}", base_url, path))
        .send()
        .await
        .expect("Failed to make GET request")
}

/// Helper to make POST requests with JSON body
pub async fn post_json<T: serde::Serialize>(
    base_url: &str,
    path: &str,
    body: &T,
) -> reqwest::Response {
    let client = reqwest::Client::new();
    client
        .post(format!("{}{}", base_url, path))
        .json(body)
        .send()
        .await
        .expect("Failed to make POST request")
}

/// Helper to make DELETE requests
#[allow(dead_code)]
pub async fn delete(base_url: &str, path: &str) -> reqwest::Response {
    let client = reqwest::Client::new();
    client
        .delete(format!("{}{}", base_url, path))
        .send()
        .await
        .expect("Failed to make DELETE request")
}

/// Generate a PRD through the API and return its session id
#[allow(dead_code)]
pub async fn create_session(ctx: &TestContext) -> String {
    let response = post_json(
        &ctx.base_url,
        "/api/prd/generate",
        &serde_json::json!({ "idea": IDEA }),
    )
    .await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    body["data"]["sessionId"].as_str().unwrap().to_string()
}
