//! Wire-contract tests for the project backend client.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use verdigris::backend::ProjectApi;
use verdigris::review::RepositoryApi;

fn files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_diff_parses_pending_changes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/project/ws-1/repo/diff"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "hasPending": true,
            "changes": [{
                "filePath": "main.tf",
                "diff": "--- /dev/null\n+++ b/main.tf\n+resource {}\n",
                "additions": 1,
                "deletions": 0,
                "oldContent": null,
                "newContent": "resource {}",
            }],
        })))
        .mount(&server)
        .await;

    let api = ProjectApi::new(server.uri());
    let report = api.diff("ws-1").await.expect("diff");
    assert!(report.has_pending);
    assert_eq!(report.changes.len(), 1);
    assert_eq!(report.changes[0].file_path, "main.tf");
    assert_eq!(report.changes[0].old_content, None);
    assert_eq!(report.changes[0].additions, 1);
}

#[tokio::test]
async fn test_accept_all_sends_null_files() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/project/ws-1/repo/accept"))
        .and(body_json(json!({"files": null})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = ProjectApi::new(server.uri());
    api.accept("ws-1", None).await.expect("accept all");
}

#[tokio::test]
async fn test_accept_single_file_sends_path_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/project/ws-1/repo/accept"))
        .and(body_json(json!({"files": ["main.tf"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = ProjectApi::new(server.uri());
    api.accept("ws-1", Some(vec!["main.tf".to_string()]))
        .await
        .expect("accept file");
}

#[tokio::test]
async fn test_history_parses_commits_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/project/ws-1/repo/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "commits": [
                {
                    "hash": "abc1234",
                    "fullHash": "abc1234def",
                    "message": "Accept all agent changes",
                    "date": "2026-08-06T10:00:00Z",
                    "files": ["main.tf", "plan.md"],
                    "fileCount": 2,
                },
                {
                    "hash": "0000aaa",
                    "fullHash": "0000aaabbb",
                    "message": "initial",
                    "date": "2026-08-05T09:00:00Z",
                    "files": [],
                    "fileCount": 0,
                },
            ],
        })))
        .mount(&server)
        .await;

    let api = ProjectApi::new(server.uri());
    let commits = api.history("ws-1").await.expect("history");
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].hash, "abc1234");
    assert_eq!(commits[0].file_count, 2);
    assert_eq!(commits[1].message, "initial");
}

#[tokio::test]
async fn test_checkout_returns_restored_files() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/project/ws-1/repo/checkout"))
        .and(body_json(json!({"commitHash": "abc1234"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "files": {"main.tf": "resource {}", "plan.md": "# Plan"},
        })))
        .mount(&server)
        .await;

    let api = ProjectApi::new(server.uri());
    let restored = api.checkout("ws-1", "abc1234").await.expect("checkout");
    assert_eq!(restored.get("main.tf").map(String::as_str), Some("resource {}"));
    assert_eq!(restored.len(), 2);
}

#[tokio::test]
async fn test_plan_returns_executor_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tofu/plan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": "Plan: 3 to add, 0 to change, 0 to destroy.",
        })))
        .mount(&server)
        .await;

    let api = ProjectApi::new(server.uri());
    let output = api
        .plan("ws-1", &files(&[("main.tf", "resource {}")]))
        .await
        .expect("plan");
    assert_eq!(output, "Plan: 3 to add, 0 to change, 0 to destroy.");
}

#[tokio::test]
async fn test_plan_failure_surfaces_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tofu/plan"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "detail": "tofu init failed: no provider",
        })))
        .mount(&server)
        .await;

    let api = ProjectApi::new(server.uri());
    let err = api
        .plan("ws-1", &files(&[("main.tf", "broken")]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("tofu init failed"));
}

#[tokio::test]
async fn test_file_crud_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/project/ws-1/files"))
        .and(body_json(json!({"files": {"main.tf": "resource {}"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/project/ws-1/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": {"main.tf": "resource {}"},
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/project/ws-1/files"))
        .and(body_json(json!({"paths": ["main.tf"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "deleted": ["main.tf"],
        })))
        .mount(&server)
        .await;

    let api = ProjectApi::new(server.uri());
    api.save_files("ws-1", &files(&[("main.tf", "resource {}")]))
        .await
        .expect("save");
    let listed = api.list_files("ws-1").await.expect("list");
    assert_eq!(listed.len(), 1);
    let deleted = api
        .delete_paths("ws-1", &["main.tf".to_string()])
        .await
        .expect("delete");
    assert_eq!(deleted, vec!["main.tf"]);
}

#[tokio::test]
async fn test_network_failure_is_an_error() {
    // Nothing listening on this port.
    let api = ProjectApi::new("http://127.0.0.1:9");
    assert!(api.diff("ws-1").await.is_err());
}
