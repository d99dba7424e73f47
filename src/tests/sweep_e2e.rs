//! Full sweeps through the HTTP registry client and the CSV sink.
//!
//! A wiremock server stands in for the registry. Every mutating endpoint a
//! test does not expect to be hit is mounted with `expect(0)`, so the server
//! verifies on drop that untouched workers really were untouched.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use rstest::rstest;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path},
};

use crate::{
    config::SweeperConfig,
    export::CsvFileSink,
    prompt::AssumeYes,
    registry::HttpRegistryClient,
    sweep::{Sweep, SweepOutcome},
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn worker(sid: &str, days_idle: i64, attributes: Value) -> Value {
    json!({
        "sid": sid,
        "friendly_name": format!("agent-{sid}"),
        "account_sid": "AC123",
        "workspace_sid": "WS123",
        "activity_name": "Offline",
        "available": false,
        "attributes": attributes.to_string(),
        "date_status_changed": (now() - Duration::days(days_idle)).to_rfc3339(),
    })
}

fn epoch_ms(y: i32, m: u32, d: u32) -> i64 {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap().timestamp_millis()
}

struct Harness {
    server: MockServer,
    dir: TempDir,
}

impl Harness {
    async fn new(workers: Vec<Value>) -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2010-04-01/Accounts/AC123.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"sid": "AC123", "friendly_name": "Support Center"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/Workspaces/WS123/Workers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workers": workers,
                "meta": {"next_page_url": null}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Self {
            server,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self, selection: &str, sections: &str) -> SweeperConfig {
        SweeperConfig::from_str(&format!(
            r#"
            [registry]
            account_sid = "AC123"
            auth_token = "secret"
            workspace_sid = "WS123"
            api_url = "{uri}"
            taskrouter_url = "{uri}"

            [selection]
            max_days_since_last_status_change = 30
            {selection}

            [export]
            directory = '{dir}'
            fields = ["sid", "friendlyName"]
            attributes = ["date_left", "status"]

            {sections}
            "#,
            uri = self.server.uri(),
            dir = self.dir.path().display(),
        ))
        .unwrap()
    }

    async fn expect_update(&self, sid: &str, times: u64, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/Workspaces/WS123/Workers/{sid}")))
            .and(body_string_contains("archived"))
            .respond_with(if status < 400 {
                ResponseTemplate::new(status).set_body_json(json!({"sid": sid}))
            } else {
                ResponseTemplate::new(status).set_body_json(json!({
                    "code": 20500,
                    "message": "Internal Server Error",
                    "status": status
                }))
            })
            .expect(times)
            .mount(&self.server)
            .await;
    }

    async fn expect_delete(&self, sid: &str, times: u64) {
        Mock::given(method("DELETE"))
            .and(path(format!("/v1/Workspaces/WS123/Workers/{sid}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    async fn run(&self, config: &SweeperConfig) -> SweepOutcome {
        let registry = HttpRegistryClient::from_config(&config.registry).unwrap();
        let sink = CsvFileSink::new(
            &config.export.directory,
            &config.export.filename_prefix,
            Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        );
        Sweep::new(config, &registry, &sink, &AssumeYes)
            .run_at(now())
            .await
            .unwrap()
    }

    fn export_file(&self, suffix: &str) -> Option<PathBuf> {
        std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .find(|p| {
                let name = p.file_name().unwrap().to_string_lossy().to_string();
                name.ends_with(suffix) && (suffix != ".csv" || !name.ends_with("_errors.csv"))
            })
    }
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    csv::Reader::from_path(path)
        .unwrap()
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

fn read_header(path: &Path) -> Vec<String> {
    csv::Reader::from_path(path)
        .unwrap()
        .headers()
        .unwrap()
        .iter()
        .map(String::from)
        .collect()
}

#[rstest]
#[case::ascending("asc", ["WK_A", "WK_B"], "WK_C")]
#[case::descending("desc", ["WK_C", "WK_B"], "WK_A")]
#[tokio::test]
async fn test_cap_applies_after_sort(
    #[case] direction: &str,
    #[case] removed: [&str; 2],
    #[case] untouched: &str,
) {
    let harness = Harness::new(vec![
        worker("WK_C", 60, json!({"date_left": epoch_ms(2024, 3, 1)})),
        worker("WK_A", 60, json!({"date_left": epoch_ms(2024, 1, 1)})),
        worker("WK_B", 60, json!({"date_left": epoch_ms(2024, 2, 1)})),
    ])
    .await;
    for sid in removed {
        harness.expect_update(sid, 1, 200).await;
        harness.expect_delete(sid, 1).await;
    }
    harness.expect_update(untouched, 0, 200).await;
    harness.expect_delete(untouched, 0).await;

    let config = harness.config(
        &format!("sort_field = \"date_left\"\nsort_direction = \"{direction}\"\nmax_records = 2"),
        "[mutation]\npopulate = [\"status:archived\"]",
    );
    let outcome = harness.run(&config).await;

    let SweepOutcome::Completed(summary) = outcome else {
        panic!("expected completed run, got {outcome:?}");
    };
    assert_eq!((summary.processed, summary.removed, summary.failed), (2, 2, 0));

    let export = harness.export_file(".csv").unwrap();
    let sids: Vec<String> = read_rows(&export).into_iter().map(|r| r[0].clone()).collect();
    assert_eq!(sids, removed);
    assert!(harness.export_file("_errors.csv").is_none());
}

#[tokio::test]
async fn test_update_failure_is_reported_and_not_deleted() {
    let harness = Harness::new(vec![
        worker("WK_X", 45, json!({"status": "active"})),
        worker("WK_Z", 45, json!({"status": "active", "date_left": epoch_ms(2024, 4, 1)})),
        worker("WK_NEW", 2, json!({"status": "active"})),
    ])
    .await;
    harness.expect_update("WK_X", 1, 200).await;
    harness.expect_delete("WK_X", 1).await;
    harness.expect_update("WK_Z", 1, 500).await;
    harness.expect_delete("WK_Z", 0).await;
    harness.expect_update("WK_NEW", 0, 200).await;
    harness.expect_delete("WK_NEW", 0).await;

    let config = harness.config(
        "",
        "[mutation]\nclear = [\"status\"]\npopulate = [\"status:archived\"]",
    );
    let outcome = harness.run(&config).await;

    let SweepOutcome::Completed(summary) = outcome else {
        panic!("expected completed run, got {outcome:?}");
    };
    assert_eq!((summary.processed, summary.removed, summary.failed), (2, 1, 1));

    let errors = harness.export_file("_errors.csv").unwrap();
    assert_eq!(summary.failure_export.as_deref(), Some(errors.as_path()));
    assert_eq!(
        read_header(&errors),
        vec!["sid", "friendlyName", "date_left", "status", "error.status", "error.message"]
    );
    assert_eq!(
        read_rows(&errors),
        vec![vec![
            "WK_Z",
            "agent-WK_Z",
            "2024-04-01T00:00:00.000Z",
            "active",
            "500",
            "Internal Server Error",
        ]]
    );

    let export = harness.export_file(".csv").unwrap();
    assert_eq!(
        read_header(&export),
        vec!["sid", "friendlyName", "date_left", "status"]
    );
    assert_eq!(read_rows(&export).len(), 2);
}

#[tokio::test]
async fn test_dry_run_never_mutates() {
    let harness = Harness::new(vec![worker("WK1", 90, json!({"status": "active"}))]).await;
    harness.expect_update("WK1", 0, 200).await;
    harness.expect_delete("WK1", 0).await;

    let config = harness.config(
        "",
        "[mutation]\npopulate = [\"status:archived\"]\n[safety]\ndry_run = true",
    );
    let outcome = harness.run(&config).await;

    assert!(matches!(outcome, SweepOutcome::DryRun { selected: 1, .. }));
    let export = harness.export_file(".csv").unwrap();
    assert_eq!(read_rows(&export), vec![vec!["WK1", "agent-WK1", "", "active"]]);
}

#[tokio::test]
async fn test_nothing_stale() {
    let harness = Harness::new(vec![worker("WK1", 3, json!({}))]).await;
    harness.expect_delete("WK1", 0).await;

    let config = harness.config("", "");
    let outcome = harness.run(&config).await;

    assert_eq!(outcome, SweepOutcome::NoStaleWorkers { checked: 1 });
    assert!(harness.export_file(".csv").is_none());
}
