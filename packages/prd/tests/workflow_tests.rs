// ABOUTME: End-to-end tests for the PRD workflow against in-memory SQLite
// ABOUTME: Uses a scripted LLM client to drive generate, edit, diagrams and finalize

use std::sync::Arc;

use pretty_assertions::assert_eq;
use prdsmith_ai::testing::ScriptedClient;
use prdsmith_ai::AIServiceError;
use prdsmith_core::{DiagramKind, MessageRole, SessionStep};
use prdsmith_diagrams::DiagramStatus;
use prdsmith_prd::{PrdError, PrdWorkflow};
use prdsmith_storage::connect_in_memory;

const IDEA: &str = "AI-powered meeting summarizer for remote teams";

const PRD_REPLY: &str = r#"{
  "title": "Meeting Summarizer",
  "description": "Turns remote meetings into summaries and action items",
  "background": "Distributed teams lose decisions made on calls",
  "targetUsers": {"primary": ["Remote team leads"], "secondary": ["Project managers"]},
  "painPoints": ["Notes are incomplete"],
  "coreValue": ["Never lose a decision"],
  "features": [
    {"id": "feature_1", "name": "Transcription", "description": "Speech to text",
     "priority": "high", "effort": 3, "value": 5, "acceptanceCriteria": ["90% accuracy"]},
    {"id": "feature_2", "name": "Summaries", "description": "Key points per meeting",
     "priority": "medium", "effort": 2, "value": 4, "acceptanceCriteria": ["Ready in 1 minute"]}
  ],
  "successMetrics": ["Weekly active teams"],
  "techFeasibility": {"overall": "medium", "challenges": ["Accents"], "recommendations": ["Use a hosted ASR"]},
  "competitors": [{"name": "Otter", "features": ["Transcripts"], "differences": "We focus on action items"}]
}"#;

const ARCHITECTURE: &str = "```mermaid\ngraph TD\n    A[Client] --> B[API]\n    B --> C[(Database)]\n```";
const JOURNEY: &str = "journey\n  title Weekly sync\n  section Join\n    Open the app: 5: Lead";
const FEATURES: &str = "graph LR\n    M[Summarizer] --> T[Transcription]\n    M --> S[Summaries]";
const DATAFLOW: &str = "flowchart LR\n    Audio --> Transcript --> Summary";
const BROKEN: &str = "graph TD\n    A[Client --> B";
const FINAL_MARKDOWN: &str = "# Meeting Summarizer\n\n## Product background\n\nRemote teams need recaps.\n\n```mermaid\ngraph TD\n    A[Client] --> B[API]\n```\n";

async fn workflow(client: &Arc<ScriptedClient>) -> PrdWorkflow {
    let pool = connect_in_memory().await.unwrap();
    PrdWorkflow::new(client.clone(), pool)
}

fn upstream_error() -> AIServiceError {
    AIServiceError::Upstream {
        status: 503,
        body: "overloaded".into(),
    }
}

#[tokio::test]
async fn test_meeting_summarizer_end_to_end() {
    let client = Arc::new(ScriptedClient::with_replies([
        PRD_REPLY,
        ARCHITECTURE,
        JOURNEY,
        FEATURES,
        DATAFLOW,
        FINAL_MARKDOWN,
    ]));
    let workflow = workflow(&client).await;

    let generated = workflow.generate(IDEA, Some("anon-1")).await.unwrap();
    let title = generated.prd.title.to_lowercase();
    assert!(title.contains("meeting") || title.contains("summar"));
    assert!(!generated.prd.features.is_empty());

    let diagrams = workflow
        .generate_diagrams(&generated.session_id, None)
        .await
        .unwrap();
    assert!(!diagrams.diagrams.architecture.is_empty());
    assert!(!diagrams.diagrams.journey.is_empty());
    assert!(!diagrams.diagrams.features.is_empty());
    assert!(!diagrams.diagrams.dataflow.is_empty());
    assert!(diagrams
        .validation
        .iter()
        .all(|d| d.status == DiagramStatus::Valid));
    assert_eq!(client.call_count(), 5);

    let finalized = workflow.finalize(&generated.session_id).await.unwrap();
    assert!(finalized.markdown.contains(&generated.prd.title));
    assert_eq!(client.call_count(), 6);

    // Re-reading is served from storage
    let stored = workflow.get_final(&generated.session_id).await.unwrap();
    assert_eq!(stored.markdown, finalized.markdown);
    assert_eq!(stored.title, "Meeting Summarizer");
    let detail = workflow
        .get_session_detail(&generated.session_id)
        .await
        .unwrap();
    assert_eq!(client.call_count(), 6);

    let prd = detail.prd.unwrap();
    assert!(prd.is_final);
    assert_eq!(prd.final_content.as_deref(), Some(FINAL_MARKDOWN));
    assert_eq!(detail.session.current_step, SessionStep::Final);
    assert_eq!(detail.session.title, "Meeting Summarizer");

    let roles: Vec<MessageRole> = detail.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Assistant,
            MessageRole::Assistant,
        ]
    );
    assert!(detail.messages[3].content.contains("4 diagram"));

    let stats = workflow.analytics().today().await.unwrap();
    assert_eq!(stats.prd_total, 1);
    assert_eq!(stats.prd_success, 1);
}

#[tokio::test]
async fn test_short_idea_is_rejected_without_model_call() {
    let client = Arc::new(ScriptedClient::new());
    let workflow = workflow(&client).await;

    let result = workflow.generate("   too short  ", None).await;
    assert!(matches!(result, Err(PrdError::Validation(_))));
    assert_eq!(client.call_count(), 0);
    assert!(workflow.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_generate_recovers_json_wrapped_in_prose() {
    let reply = format!("Here is the PRD you asked for:\n```json\n{}\n```", PRD_REPLY);
    let client = Arc::new(ScriptedClient::with_replies([reply]));
    let workflow = workflow(&client).await;

    let generated = workflow.generate(IDEA, None).await.unwrap();
    assert_eq!(generated.prd.features.len(), 2);
}

#[tokio::test]
async fn test_generate_accepts_null_optional_fields() {
    let reply = r#"{"title": "Meeting Minutes", "description": "Summaries for remote teams",
        "painPoints": null, "coreValue": null, "successMetrics": null, "competitors": null,
        "features": [{"name": "Recap", "acceptanceCriteria": null}]}"#;
    let client = Arc::new(ScriptedClient::with_replies([reply]));
    let workflow = workflow(&client).await;

    let generated = workflow.generate(IDEA, None).await.unwrap();
    assert_eq!(generated.prd.title, "Meeting Minutes");
    assert!(generated.prd.competitors.is_empty());

    let detail = workflow
        .get_session_detail(&generated.session_id)
        .await
        .unwrap();
    let stored = detail.prd.unwrap().document;
    assert!(stored.pain_points.is_empty());
    assert!(stored.features[0].acceptance_criteria.is_empty());
}

#[tokio::test]
async fn test_malformed_generation_is_classified_and_counted() {
    let client = Arc::new(ScriptedClient::with_replies(["Sorry, I can't do that."]));
    let workflow = workflow(&client).await;

    let result = workflow.generate(IDEA, Some("anon-2")).await;
    assert!(matches!(result, Err(PrdError::MalformedResponse(_))));

    // The session and the idea are kept so the user can retry
    let sessions = workflow.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].prd.is_none());

    let stats = workflow.analytics().today().await.unwrap();
    assert_eq!(stats.prd_total, 1);
    assert_eq!(stats.prd_success, 0);
    assert_eq!(stats.error_count, 1);
}

#[tokio::test]
async fn test_incomplete_generation_names_missing_fields() {
    let client = Arc::new(ScriptedClient::with_replies([
        r#"{"title": "Meeting Summarizer", "features": []}"#,
    ]));
    let workflow = workflow(&client).await;

    match workflow.generate(IDEA, None).await {
        Err(PrdError::IncompleteDocument(fields)) => {
            assert_eq!(fields, vec!["description", "features"]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_upstream_failure_on_generate() {
    let client = Arc::new(ScriptedClient::new());
    client.push_error(upstream_error());
    let workflow = workflow(&client).await;

    let err = workflow.generate(IDEA, None).await.unwrap_err();
    assert!(matches!(err, PrdError::Upstream(ref msg) if msg.contains("503")));
}

#[tokio::test]
async fn test_partial_edit_merges_into_stored_prd() {
    let client = Arc::new(ScriptedClient::with_replies([
        PRD_REPLY,
        r#"{"title": "Meeting Summarizer Pro", "painPoints": ["Action items get lost"]}"#,
    ]));
    let workflow = workflow(&client).await;
    let generated = workflow.generate(IDEA, None).await.unwrap();

    let edited = workflow
        .edit(&generated.session_id, "Make it sound premium", Some("title"))
        .await
        .unwrap();

    assert_eq!(edited.prd.title, "Meeting Summarizer Pro");
    assert_eq!(edited.prd.pain_points, vec!["Action items get lost".to_string()]);
    assert_eq!(edited.prd.features.len(), 2);
    assert_eq!(edited.prd.competitors[0].name, "Otter");

    let requests = client.requests();
    assert!(requests[1].user_prompt.contains("Make it sound premium"));
    assert!(requests[1].user_prompt.contains("\"Transcription\""));

    let detail = workflow
        .get_session_detail(&generated.session_id)
        .await
        .unwrap();
    assert_eq!(detail.session.title, "Meeting Summarizer Pro");
    assert_eq!(detail.prd.unwrap().document, edited.prd);
    let last_two: Vec<&str> = detail.messages[2..]
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(
        last_two,
        vec!["Make it sound premium", "Updated the PRD: Make it sound premium"]
    );
}

#[tokio::test]
async fn test_edit_rejects_unknown_target_before_calling_model() {
    let client = Arc::new(ScriptedClient::with_replies([PRD_REPLY]));
    let workflow = workflow(&client).await;
    let generated = workflow.generate(IDEA, None).await.unwrap();

    let result = workflow
        .edit(&generated.session_id, "Change it", Some("mermaidJourney"))
        .await;
    assert!(matches!(result, Err(PrdError::Validation(_))));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_edit_unknown_session_is_not_found() {
    let client = Arc::new(ScriptedClient::new());
    let workflow = workflow(&client).await;

    let result = workflow.edit("missing1", "Change it", None).await;
    assert!(matches!(result, Err(PrdError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_diagram_is_stored_after_bounded_retries() {
    let client = Arc::new(ScriptedClient::with_replies([
        PRD_REPLY, BROKEN, BROKEN, JOURNEY, FEATURES, DATAFLOW,
    ]));
    let workflow = workflow(&client).await;
    let generated = workflow.generate(IDEA, None).await.unwrap();

    let result = workflow
        .generate_diagrams(&generated.session_id, None)
        .await
        .unwrap();

    assert_eq!(client.call_count(), 6);
    assert_eq!(result.diagrams.architecture, BROKEN);
    let architecture = &result.validation[0];
    assert_eq!(architecture.kind, DiagramKind::Architecture);
    assert_eq!(architecture.status, DiagramStatus::Invalid);
    assert_eq!(architecture.attempts, 2);
    assert!(architecture.error.is_some());

    let detail = workflow
        .get_session_detail(&generated.session_id)
        .await
        .unwrap();
    assert_eq!(detail.session.current_step, SessionStep::Diagrams);
}

#[tokio::test]
async fn test_upstream_error_aborts_diagrams_without_persisting() {
    let client = Arc::new(ScriptedClient::with_replies([PRD_REPLY, ARCHITECTURE]));
    client.push_error(upstream_error());
    let workflow = workflow(&client).await;
    let generated = workflow.generate(IDEA, None).await.unwrap();

    let result = workflow.generate_diagrams(&generated.session_id, None).await;
    assert!(matches!(result, Err(PrdError::Upstream(_))));
    assert_eq!(client.call_count(), 3);

    let detail = workflow
        .get_session_detail(&generated.session_id)
        .await
        .unwrap();
    let prd = detail.prd.unwrap();
    assert!(prd.diagrams.architecture.is_none());
    assert_eq!(detail.session.current_step, SessionStep::Draft);
}

#[tokio::test]
async fn test_single_kind_regeneration_keeps_other_diagrams() {
    let client = Arc::new(ScriptedClient::with_replies([
        PRD_REPLY,
        ARCHITECTURE,
        JOURNEY,
        FEATURES,
        DATAFLOW,
        "journey\n  title Onboarding\n  section Start\n    Sign up: 4: Lead",
    ]));
    let workflow = workflow(&client).await;
    let generated = workflow.generate(IDEA, None).await.unwrap();
    workflow
        .generate_diagrams(&generated.session_id, None)
        .await
        .unwrap();

    let regenerated = workflow
        .generate_diagrams(&generated.session_id, Some(DiagramKind::Journey))
        .await
        .unwrap();

    assert_eq!(regenerated.validation.len(), 1);
    assert!(regenerated.diagrams.journey.contains("Onboarding"));
    assert_eq!(regenerated.diagrams.features, FEATURES);
    assert!(regenerated.diagrams.architecture.starts_with("graph TD"));
}

#[tokio::test]
async fn test_diagram_edit_requires_existing_code() {
    let client = Arc::new(ScriptedClient::with_replies([PRD_REPLY]));
    let workflow = workflow(&client).await;
    let generated = workflow.generate(IDEA, None).await.unwrap();

    let result = workflow
        .edit_diagram(&generated.session_id, DiagramKind::Dataflow, "Add a cache")
        .await;
    assert!(matches!(result, Err(PrdError::NotFound(_))));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_diagram_edit_uses_one_call_and_records_history() {
    let client = Arc::new(ScriptedClient::with_replies([
        PRD_REPLY,
        ARCHITECTURE,
        JOURNEY,
        FEATURES,
        DATAFLOW,
        "flowchart LR\n    Audio --> Cache --> Transcript --> Summary",
    ]));
    let workflow = workflow(&client).await;
    let generated = workflow.generate(IDEA, None).await.unwrap();
    workflow
        .generate_diagrams(&generated.session_id, None)
        .await
        .unwrap();

    let edited = workflow
        .edit_diagram(&generated.session_id, DiagramKind::Dataflow, "Add a cache")
        .await
        .unwrap();

    assert!(edited.valid);
    assert!(edited.code.contains("Cache"));
    assert_eq!(client.call_count(), 6);

    let detail = workflow
        .get_session_detail(&generated.session_id)
        .await
        .unwrap();
    assert!(detail
        .prd
        .unwrap()
        .diagrams
        .dataflow
        .unwrap()
        .contains("Cache"));
    let last = detail.messages.last().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.content, "Updated the data flow diagram");
}

#[tokio::test]
async fn test_finalize_with_missing_diagrams_uses_placeholders() {
    let client = Arc::new(ScriptedClient::with_replies([PRD_REPLY, FINAL_MARKDOWN]));
    let workflow = workflow(&client).await;
    let generated = workflow.generate(IDEA, None).await.unwrap();

    workflow.finalize(&generated.session_id).await.unwrap();

    let prompt = &client.requests()[1].user_prompt;
    assert!(prompt.contains("%% no architecture diagram"));
    assert!(prompt.contains("Meeting Summarizer"));
}

#[tokio::test]
async fn test_get_final_before_finalize_is_rejected() {
    let client = Arc::new(ScriptedClient::with_replies([PRD_REPLY]));
    let workflow = workflow(&client).await;
    let generated = workflow.generate(IDEA, None).await.unwrap();

    let result = workflow.get_final(&generated.session_id).await;
    assert!(matches!(result, Err(PrdError::NotFinalized(_))));
}

#[tokio::test]
async fn test_delete_session_removes_everything() {
    let client = Arc::new(ScriptedClient::with_replies([PRD_REPLY]));
    let workflow = workflow(&client).await;
    let generated = workflow.generate(IDEA, None).await.unwrap();

    workflow.delete_session(&generated.session_id).await.unwrap();

    assert!(matches!(
        workflow.get_session_detail(&generated.session_id).await,
        Err(PrdError::NotFound(_))
    ));
    assert!(matches!(
        workflow.delete_session(&generated.session_id).await,
        Err(PrdError::NotFound(_))
    ));
    assert!(workflow.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_track_page_view_requires_anonymous_id() {
    let client = Arc::new(ScriptedClient::new());
    let workflow = workflow(&client).await;

    assert!(matches!(
        workflow.track_page_view("  ", None, Some("/")).await,
        Err(PrdError::Validation(_))
    ));
    workflow
        .track_page_view("anon-1", None, Some("/"))
        .await
        .unwrap();
    assert_eq!(workflow.analytics().today().await.unwrap().total_visits, 1);
}
