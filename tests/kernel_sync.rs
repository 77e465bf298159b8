//! Integration tests against a mocked Kernel API.
//!
//! The mock server stands in for the registry; assertions cover both the
//! reconcile protocol's request pattern (what was PUT/PATCHed and how many
//! times) and the reported outcomes.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Map, Value};
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kernel_gate::kernel::{KernelClient, BUNDLE_ENDPOINT, JOURNAL_ENDPOINT};
use kernel_gate::linker::{self, LinkOutcome};
use kernel_gate::reconcile::{reconcile, ReconcileOutcome};
use kernel_gate::{pipeline, Settings, TransportError};

fn settings_for(server: &MockServer) -> Settings {
    let mut settings = Settings::new(
        Url::parse(&server.uri()).unwrap(),
        PathBuf::from("title.json"),
        PathBuf::from("issue.json"),
    );
    settings.retry_backoff = Duration::from_millis(10);
    settings
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

/// Journal payload as the mapper emits it: every optional group rendered as
/// an empty container, never absent.
fn acta_payload() -> Map<String, Value> {
    object(json!({
        "mission": [],
        "title": "Acta X",
        "title_iso": "",
        "short_title": "",
        "acronym": "",
        "scielo_issn": "0001-3714",
        "print_issn": "",
        "electronic_issn": "",
        "status": {"status": "current"},
        "subject_areas": [],
        "sponsors": [],
        "subject_categories": [],
        "online_submission_url": "",
        "next_journal": {},
        "previous_journal": {},
        "contact": {}
    }))
}

fn acta_pruned() -> Value {
    json!({
        "title": "Acta X",
        "scielo_issn": "0001-3714",
        "status": {"status": "current"}
    })
}

#[tokio::test]
async fn reconcile_creates_once_then_noops() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": acta_pruned(),
            "items": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/journals/0001-3714"))
        .and(body_json(acta_pruned()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = KernelClient::new(&settings_for(&server)).unwrap();
    let payload = acta_payload();

    let first = reconcile(&client, JOURNAL_ENDPOINT, "0001-3714", &payload)
        .await
        .unwrap();
    assert_eq!(first, ReconcileOutcome::Created);

    let second = reconcile(&client, JOURNAL_ENDPOINT, "0001-3714", &payload)
        .await
        .unwrap();
    assert_eq!(second, ReconcileOutcome::Unchanged);
}

#[tokio::test]
async fn reconcile_patches_when_remote_lacks_a_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bundles/0001-3714-1998-v10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"volume": "10"},
            "items": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/bundles/0001-3714-1998-v10"))
        .and(body_json(json!({
            "volume": "10",
            "publication_season": [4, 6]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = KernelClient::new(&settings_for(&server)).unwrap();
    let payload = object(json!({
        "volume": "10",
        "number": "",
        "publication_season": [4, 6]
    }));

    let outcome = reconcile(&client, BUNDLE_ENDPOINT, "0001-3714-1998-v10", &payload)
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Updated);
}

#[tokio::test]
async fn reconcile_keeps_keys_the_remote_already_has() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"title": "Remote title", "acronym": "alb"},
            "items": []
        })))
        .mount(&server)
        .await;
    // The locally-empty title is retained in the patch because the remote
    // side has a value for that key; it is not dropped from the payload.
    Mock::given(method("PATCH"))
        .and(path("/journals/0001-3714"))
        .and(body_json(json!({"title": "", "acronym": "alb"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = KernelClient::new(&settings_for(&server)).unwrap();
    let payload = object(json!({"title": "", "acronym": "alb", "sponsors": []}));

    let outcome = reconcile(&client, JOURNAL_ENDPOINT, "0001-3714", &payload)
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Updated);
}

#[tokio::test]
async fn transient_server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": acta_pruned(),
            "items": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = KernelClient::new(&settings_for(&server)).unwrap();
    let outcome = reconcile(&client, JOURNAL_ENDPOINT, "0001-3714", &acta_payload())
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Unchanged);
}

#[tokio::test]
async fn client_errors_do_not_retry_and_surface() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;

    let client = KernelClient::new(&settings_for(&server)).unwrap();
    let err = reconcile(&client, JOURNAL_ENDPOINT, "0001-3714", &acta_payload())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransportError::UnexpectedStatus { status, .. } if status.as_u16() == 422
    ));
}

#[tokio::test]
async fn membership_skips_journals_missing_from_the_registry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = KernelClient::new(&settings_for(&server)).unwrap();
    let outcome = linker::reconcile_membership(
        &client,
        "0001-3714",
        &["0001-3714-1998-n1".to_string()],
    )
    .await
    .unwrap();
    assert_eq!(outcome, LinkOutcome::SkippedMissing);
}

#[tokio::test]
async fn membership_replaces_diverged_lists_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {},
            "items": ["0001-3714-1998-n1"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/journals/0001-3714/issues"))
        .and(body_json(json!([
            "0001-3714-1998-n1",
            "0001-3714-1998-n2"
        ])))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = KernelClient::new(&settings_for(&server)).unwrap();
    let desired = vec![
        "0001-3714-1998-n1".to_string(),
        "0001-3714-1998-n2".to_string(),
    ];
    let outcome = linker::reconcile_membership(&client, "0001-3714", &desired)
        .await
        .unwrap();
    assert_eq!(outcome, LinkOutcome::Updated);
}

#[tokio::test]
async fn membership_leaves_matching_lists_alone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {},
            "items": ["0001-3714-1998-n1"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = KernelClient::new(&settings_for(&server)).unwrap();
    let outcome = linker::reconcile_membership(
        &client,
        "0001-3714",
        &["0001-3714-1998-n1".to_string()],
    )
    .await
    .unwrap();
    assert_eq!(outcome, LinkOutcome::Unchanged);
}

#[tokio::test]
async fn full_pipeline_reports_per_kind_counts() {
    let server = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    let title_path = dir.path().join("title.json");
    let issue_path = dir.path().join("issue.json");

    std::fs::write(
        &title_path,
        serde_json::to_vec(&json!([{
            "v400": [{"_": "0001-3714"}],
            "v100": [{"_": "Acta X"}],
            "v51": [{"a": "1998-04-30", "b": "current"}]
        }]))
        .unwrap(),
    )
    .unwrap();

    // Two regular issues, one ahead-of-print (filtered before any request)
    // and one with an unparseable date (counted as failed, batch continues).
    std::fs::write(
        &issue_path,
        serde_json::to_vec(&json!([
            {
                "v35": [{"_": "0001-3714"}],
                "v36": [{"_": "0"}],
                "v32": [{"_": "1"}],
                "v65": [{"_": "1998-04"}]
            },
            {
                "v35": [{"_": "0001-3714"}],
                "v36": [{"_": "1"}],
                "v32": [{"_": "2"}],
                "v65": [{"_": "1998"}]
            },
            {
                "v35": [{"_": "0001-3714"}],
                "v36": [{"_": "2"}],
                "v32": [{"_": "ahead"}],
                "v65": [{"_": "1998"}]
            },
            {
                "v35": [{"_": "0001-3714"}],
                "v36": [{"_": "3"}],
                "v32": [{"_": "4"}],
                "v65": [{"_": "04/1998"}]
            }
        ]))
        .unwrap(),
    )
    .unwrap();

    // Journal: absent during the entity phase, present during the link phase.
    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/journals/0001-3714"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": acta_pruned(),
            "items": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/journals/0001-3714"))
        .and(body_json(acta_pruned()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bundles/0001-3714-1998-n1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bundles/0001-3714-1998-n2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bundles/0001-3714-1998-n1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bundles/0001-3714-1998-n2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/journals/0001-3714/issues"))
        .and(body_json(json!([
            "0001-3714-1998-n1",
            "0001-3714-1998-n2"
        ])))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.title_json_path = title_path;
    settings.issue_json_path = issue_path;

    let report = pipeline::run(&settings).await.unwrap();

    assert_eq!(report.journals.created, 1);
    assert_eq!(report.journals.failed, 0);
    assert_eq!(report.issues.created, 2);
    assert_eq!(report.issues.failed, 1);
    assert_eq!(report.issues.unchanged, 0);
    assert_eq!(report.links.updated, 1);
    assert_eq!(report.links.failed, 0);
    assert!(report.has_failures());
}
