use std::time::Duration;

use reqwest::StatusCode;
use sentry_api_client::resources::{CreateIssueAlertParams, ProjectScope};
use sentry_api_client::{ApiError, Client, Context, ContextError, PollPolicy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RULES_PATH: &str = "/api/0/projects/acme/api/rules/";
const TASK_PATH: &str = "/api/0/projects/acme/api/rule-task/abc123/";

fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .base_url(format!("{}/api/", server.uri()))
        .bearer_token("test-token")
        .poll_policy(PollPolicy {
            attempts: 5,
            interval: Duration::from_millis(10),
        })
        .build()
        .unwrap()
}

fn alert_params() -> CreateIssueAlertParams {
    CreateIssueAlertParams {
        action_match: "all".to_string(),
        frequency: 30,
        name: "Notify on new issues".to_string(),
        conditions: vec![serde_json::from_value(serde_json::json!({
            "id": "sentry.rules.conditions.first_seen_event.FirstSeenEventCondition"
        }))
        .unwrap()],
        actions: vec![serde_json::from_value(serde_json::json!({
            "id": "sentry.integrations.slack.notify_action.SlackNotifyServiceAction",
            "channel": "#alerts",
            "workspace": "1234"
        }))
        .unwrap()],
        ..Default::default()
    }
}

async fn mount_accepted(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({"uuid": "abc123"})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_immediate_create_skips_polling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "12345",
            "name": "Notify on new issues",
            "actionMatch": "all",
            "frequency": 30
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let scope = ProjectScope::new("acme", "api");
    let (alert, response) = client
        .issue_alerts()
        .create_deferred(&Context::background(), &scope, &alert_params())
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(alert.id, "12345");
    assert_eq!(alert.frequency, 30);
}

#[tokio::test]
async fn test_accepted_create_polls_until_success() {
    let mock_server = MockServer::start().await;
    mount_accepted(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": "pending", "error": null, "rule": null})),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "error": null,
            "rule": {
                "id": "12345",
                "name": "Notify on new issues",
                "actionMatch": "all",
                "frequency": 30,
                "actions": [{"id": "sentry.integrations.slack.notify_action.SlackNotifyServiceAction"}]
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let scope = ProjectScope::new("acme", "api");
    let (alert, _) = client
        .issue_alerts()
        .create_deferred(&Context::background(), &scope, &alert_params())
        .await
        .unwrap();

    assert_eq!(alert.id, "12345");
    assert_eq!(alert.actions.len(), 1);
}

#[tokio::test]
async fn test_task_not_found_after_pending_polls() {
    let mock_server = MockServer::start().await;
    mount_accepted(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "pending"})))
        .up_to_n_times(4)
        .expect(4)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"detail": "Not found"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let scope = ProjectScope::new("acme", "api");
    let err = client
        .issue_alerts()
        .create_deferred(&Context::background(), &scope, &alert_params())
        .await
        .unwrap_err();

    match err {
        ApiError::TaskNotFound {
            task_id,
            organization,
            project,
        } => {
            assert_eq!(task_id, "abc123");
            assert_eq!(organization, "acme");
            assert_eq!(project, "api");
        }
        other => panic!("expected TaskNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_task_failure_reports_server_error() {
    let mock_server = MockServer::start().await;
    mount_accepted(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "failed",
            "error": "Channel not found",
            "rule": null
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let scope = ProjectScope::new("acme", "api");
    let err = client
        .issue_alerts()
        .create_deferred(&Context::background(), &scope, &alert_params())
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        ApiError::TaskFailed { task_id, message } if task_id == "abc123" && message == "Channel not found"
    ));
}

#[tokio::test]
async fn test_task_still_pending_times_out() {
    let mock_server = MockServer::start().await;
    mount_accepted(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "pending"})))
        .expect(5)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let scope = ProjectScope::new("acme", "api");
    let err = client
        .issue_alerts()
        .create_deferred(&Context::background(), &scope, &alert_params())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::TaskTimedOut { attempts: 5, .. }));
    assert!(err.suggestion().is_some());
}

#[tokio::test]
async fn test_accepted_without_uuid_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RULES_PATH))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let scope = ProjectScope::new("acme", "api");
    let err = client
        .issue_alerts()
        .create_deferred(&Context::background(), &scope, &alert_params())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::MissingTaskId));
}

#[tokio::test]
async fn test_cancel_while_waiting_between_polls() {
    let mock_server = MockServer::start().await;
    mount_accepted(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "pending"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(format!("{}/api/", mock_server.uri()))
        .poll_policy(PollPolicy {
            attempts: 5,
            interval: Duration::from_secs(60),
        })
        .build()
        .unwrap();
    let scope = ProjectScope::new("acme", "api");
    let ctx = Context::with_timeout(Duration::from_millis(200));

    let err = client
        .issue_alerts()
        .create_deferred(&ctx, &scope, &alert_params())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Cancelled(ContextError::DeadlineExceeded)
    ));
}
