//! HTTP-level tests: a real axum server on an ephemeral port, a fake
//! reasoning capability and a wiremock target API.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use apiflow_core::workflow::{
    ActionDetails, ActionRequest, CapabilityError, ExtractionRequest, HttpMethod, Plan, PlanStep,
    ReasoningCapability, ReqwestDispatcher, WorkflowExecutor,
};
use apiflow_core::Settings;
use apiflow_server::state::AppStateInner;
use apiflow_server::{start_server_with_state, ServerConfig};
use async_trait::async_trait;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Plans a fixed list of steps and answers every step with the same request.
struct FixedReasoner {
    plan: Plan,
    action: Mutex<Option<ActionDetails>>,
}

#[async_trait]
impl ReasoningCapability for FixedReasoner {
    async fn plan(&self, _user_prompt: &str) -> Result<Plan, CapabilityError> {
        Ok(self.plan.clone())
    }

    async fn action_details(
        &self,
        _request: ActionRequest<'_>,
    ) -> Result<ActionDetails, CapabilityError> {
        self.action
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CapabilityError::Model("no action".to_string()))
    }

    async fn extraction(&self, _request: ExtractionRequest<'_>) -> Result<String, CapabilityError> {
        Ok(r#"{"data": {}}"#.to_string())
    }
}

fn test_settings() -> Settings {
    Settings::from_lookup(|key| match key {
        "LLM_API_KEY" => Some("test-key".to_string()),
        "CORS_ORIGIN" => Some("http://localhost:3000".to_string()),
        _ => None,
    })
    .unwrap()
}

async fn spawn_server(plan: Plan, action: Option<ActionDetails>) -> SocketAddr {
    let reasoner = Arc::new(FixedReasoner {
        plan,
        action: Mutex::new(action),
    });
    let executor = WorkflowExecutor::new(reasoner, Arc::new(ReqwestDispatcher::new()));
    let state = Arc::new(AppStateInner::new(executor, test_settings()));

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    start_server_with_state(config, state).await.unwrap()
}

/// Parse an SSE body into the JSON payload of each `data:` line.
fn sse_payloads(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

#[tokio::test]
async fn test_execute_stream_runs_workflow_over_sse() {
    let target = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&target)
        .await;

    let action = ActionDetails {
        url: format!("{}/posts", target.uri()),
        method: HttpMethod::Get,
        body: None,
        headers: None,
    };
    let addr = spawn_server(Plan::new(vec![PlanStep::api_call("List posts")]), Some(action)).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/v1/workflow/execute-stream", addr))
        .json(&json!({"prompt": "List all posts from the blog"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let events = sse_payloads(&response.text().await.unwrap());
    let names: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["plan_created", "api_call_completed", "end"]);

    assert_eq!(events[0]["data"]["steps"][0]["action_type"], "api_call");
    assert_eq!(events[1]["data"]["step_title"], "Step 1: List posts");
    assert_eq!(events[1]["data"]["response_details"], json!([{"id": 1}]));
    assert_eq!(events[1]["data"]["extracted_data"], Value::Null);
    assert_eq!(events[2]["data"]["message"], "Workflow finished.");
}

#[tokio::test]
async fn test_execute_stream_rejects_short_prompt() {
    let addr = spawn_server(Plan::default(), None).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/v1/workflow/execute-stream", addr))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"error": "Prompt is too short. Please provide more detailed instructions."})
    );
}

#[tokio::test]
async fn test_validate_endpoint() {
    let addr = spawn_server(Plan::default(), None).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/api/v1/workflow/validate", addr);

    let ok = client
        .post(&url)
        .json(&json!({"prompt": "Create a new user named Alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);
    assert_eq!(
        ok.json::<Value>().await.unwrap(),
        json!({"valid": true, "message": "Prompt is valid"})
    );

    let empty = client.post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(empty.status(), 400);
    assert_eq!(
        empty.json::<Value>().await.unwrap(),
        json!({"valid": false, "error": "Prompt cannot be empty"})
    );
}

#[tokio::test]
async fn test_health_and_test_endpoints() {
    let addr = spawn_server(Plan::default(), None).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("http://{}/api/v1/workflow/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "workflow");

    let test: Value = client
        .get(format!("http://{}/api/v1/test/test", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(test, json!({"message": "This is a test endpoint!"}));

    let root: Value = client
        .get(format!("http://{}/api/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(root["status"], "ok");
    assert_eq!(root["server"], "apiflow-server");
}
