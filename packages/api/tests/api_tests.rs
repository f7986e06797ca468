// ABOUTME: Integration tests for the prdsmith HTTP API
// ABOUTME: Exercises envelopes, status codes, export headers and session lifecycle over real HTTP

mod common;

use common::{
    create_session, delete, get, post_json, setup_test_server, FINAL_MARKDOWN, PRD_REPLY,
    VALID_FLOW, VALID_JOURNEY,
};
use pretty_assertions::assert_eq;
use prdsmith_ai::testing::ScriptedClient;
use serde_json::{json, Value};

#[tokio::test]
async fn test_health_check() {
    let ctx = setup_test_server(ScriptedClient::new()).await;

    let response = get(&ctx.base_url, "/api/health").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["data"]["timestamp"].is_string());
    assert!(body["data"]["version"].is_string());
}

#[tokio::test]
async fn test_generate_returns_session_and_prd() {
    let ctx = setup_test_server(ScriptedClient::with_replies([PRD_REPLY])).await;

    let response = post_json(
        &ctx.base_url,
        "/api/prd/generate",
        &json!({ "idea": "AI-powered meeting summarizer for remote teams" }),
    )
    .await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["data"]["sessionId"].is_string());
    assert!(body["data"]["prdId"].is_string());
    assert_eq!(body["data"]["prd"]["title"], "Meeting Summarizer");
    assert_eq!(body["data"]["prd"]["features"][0]["acceptanceCriteria"][0], "90% accuracy");
}

#[tokio::test]
async fn test_generate_rejects_short_idea() {
    let ctx = setup_test_server(ScriptedClient::new()).await;

    let response = post_json(&ctx.base_url, "/api/prd/generate", &json!({ "idea": "todo" })).await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("at least 10"));
    assert_eq!(ctx.client.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let ctx = setup_test_server(ScriptedClient::new()).await;

    let response = post_json(&ctx.base_url, "/api/prd/edit", &json!({ "sessionId": 42 })).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_model_failure_is_server_error() {
    let ctx = setup_test_server(ScriptedClient::with_replies(["not json at all"])).await;

    let response = post_json(
        &ctx.base_url,
        "/api/prd/generate",
        &json!({ "idea": "AI-powered meeting summarizer for remote teams" }),
    )
    .await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("malformed"));
}

#[tokio::test]
async fn test_edit_unknown_session_is_not_found() {
    let ctx = setup_test_server(ScriptedClient::new()).await;

    let response = post_json(
        &ctx.base_url,
        "/api/prd/edit",
        &json!({ "sessionId": "missing1", "instruction": "Shorter title" }),
    )
    .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_edit_returns_merged_prd() {
    let client = ScriptedClient::with_replies([PRD_REPLY, r#"{"title": "Minutes"}"#]);
    let ctx = setup_test_server(client).await;
    let session_id = create_session(&ctx).await;

    let response = post_json(
        &ctx.base_url,
        "/api/prd/edit",
        &json!({ "sessionId": session_id, "instruction": "Shorter title", "targetField": "title" }),
    )
    .await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["prd"]["title"], "Minutes");
    assert_eq!(body["data"]["prd"]["features"][0]["name"], "Transcription");
    assert_eq!(body["data"]["message"], "PRD updated");
}

#[tokio::test]
async fn test_export_before_finalize_is_rejected() {
    let ctx = setup_test_server(ScriptedClient::with_replies([PRD_REPLY])).await;
    let session_id = create_session(&ctx).await;

    let response = get(
        &ctx.base_url,
        &format!("/api/prd/export?sessionId={}&format=pdf", session_id),
    )
    .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("not been finalized"));
}

#[tokio::test]
async fn test_export_requires_known_format() {
    let ctx = setup_test_server(ScriptedClient::new()).await;

    let missing = get(&ctx.base_url, "/api/prd/export?sessionId=abc").await;
    assert_eq!(missing.status(), 400);

    let unknown = get(&ctx.base_url, "/api/prd/export?sessionId=abc&format=html").await;
    assert_eq!(unknown.status(), 400);
}

#[tokio::test]
async fn test_full_flow_with_exports() {
    let client = ScriptedClient::with_replies([
        PRD_REPLY,
        VALID_FLOW,
        VALID_JOURNEY,
        VALID_FLOW,
        VALID_FLOW,
        FINAL_MARKDOWN,
    ]);
    let ctx = setup_test_server(client).await;
    let session_id = create_session(&ctx).await;

    let diagrams = post_json(
        &ctx.base_url,
        "/api/diagrams/generate",
        &json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(diagrams.status(), 200);
    let body: Value = diagrams.json().await.unwrap();
    for kind in ["architecture", "journey", "features", "dataflow"] {
        assert!(!body["data"]["diagrams"][kind].as_str().unwrap().is_empty());
    }
    assert_eq!(body["data"]["validation"][1]["kind"], "journey");
    assert_eq!(body["data"]["validation"][1]["status"], "valid");

    let finalized = post_json(
        &ctx.base_url,
        "/api/prd/finalize",
        &json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(finalized.status(), 200);
    let body: Value = finalized.json().await.unwrap();
    assert!(body["data"]["markdown"]
        .as_str()
        .unwrap()
        .contains("Meeting Summarizer"));

    let markdown = get(
        &ctx.base_url,
        &format!("/api/prd/export?sessionId={}&format=md", session_id),
    )
    .await;
    assert_eq!(markdown.status(), 200);
    assert_eq!(
        markdown.headers()["content-disposition"],
        "attachment; filename*=UTF-8''Meeting_Summarizer_PRD.md"
    );
    assert_eq!(markdown.text().await.unwrap(), FINAL_MARKDOWN);

    let pdf = get(
        &ctx.base_url,
        &format!("/api/prd/export?sessionId={}&format=pdf", session_id),
    )
    .await;
    assert_eq!(pdf.status(), 200);
    assert_eq!(pdf.headers()["content-type"], "application/pdf");
    assert!(pdf.bytes().await.unwrap().starts_with(b"%PDF"));

    let docx = get(
        &ctx.base_url,
        &format!("/api/prd/export?sessionId={}&format=docx", session_id),
    )
    .await;
    assert_eq!(docx.status(), 200);
    assert!(docx.bytes().await.unwrap().starts_with(b"PK"));

    // Exports never call the model again
    assert_eq!(ctx.client.call_count(), 6);

    let detail: Value = get(&ctx.base_url, &format!("/api/sessions/{}", session_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["currentStep"], 3);
    assert_eq!(detail["data"]["prd"]["isFinal"], true);
    assert_eq!(detail["data"]["prd"]["finalContent"], FINAL_MARKDOWN);
}

#[tokio::test]
async fn test_diagram_edit_without_code_is_not_found() {
    let ctx = setup_test_server(ScriptedClient::with_replies([PRD_REPLY])).await;
    let session_id = create_session(&ctx).await;

    let response = post_json(
        &ctx.base_url,
        "/api/diagrams/edit",
        &json!({ "sessionId": session_id, "diagramType": "journey", "instruction": "Add a step" }),
    )
    .await;
    assert_eq!(response.status(), 404);

    let unknown_type = post_json(
        &ctx.base_url,
        "/api/diagrams/edit",
        &json!({ "sessionId": session_id, "diagramType": "mindmap", "instruction": "x" }),
    )
    .await;
    assert_eq!(unknown_type.status(), 400);
}

#[tokio::test]
async fn test_session_list_detail_and_delete() {
    let ctx = setup_test_server(ScriptedClient::with_replies([PRD_REPLY])).await;
    let session_id = create_session(&ctx).await;

    let list: Value = get(&ctx.base_url, "/api/sessions")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(list["data"][0]["id"], session_id.as_str());
    assert_eq!(list["data"][0]["prd"]["title"], "Meeting Summarizer");

    let detail: Value = get(&ctx.base_url, &format!("/api/sessions/{}", session_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["messages"].as_array().unwrap().len(), 2);
    assert_eq!(detail["data"]["prd"]["title"], "Meeting Summarizer");

    let deleted = delete(&ctx.base_url, &format!("/api/sessions/{}", session_id)).await;
    assert_eq!(deleted.status(), 200);

    let gone = get(&ctx.base_url, &format!("/api/sessions/{}", session_id)).await;
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn test_track_page_view() {
    let ctx = setup_test_server(ScriptedClient::new()).await;

    let response = post_json(
        &ctx.base_url,
        "/api/track/page-view",
        &json!({ "anonymousId": "anon-1", "path": "/" }),
    )
    .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let rejected = post_json(
        &ctx.base_url,
        "/api/track/page-view",
        &json!({ "anonymousId": " " }),
    )
    .await;
    assert_eq!(rejected.status(), 400);
}
