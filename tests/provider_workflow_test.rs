//! Cross-provider workflows driven through the plugin host

mod common;

use chrono::Duration;
use common::*;
use ops_mock_providers::{build_host, Capability};
use serde_json::json;

#[tokio::test]
async fn test_incident_lifecycle_through_host() {
    let host = test_host();

    let created = call(
        &host,
        Capability::Incidents,
        "create",
        json!({
            "title": "Ledger writes timing out",
            "service": "payments",
            "severity": "Sev2",
            "tags": ["database"]
        }),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(id, "INC-1009");
    assert_eq!(created["status"], "Triggered");

    let acked = call(
        &host,
        Capability::Incidents,
        "acknowledge",
        json!({"id": id, "actor": "priya.nair"}),
    )
    .await;
    assert_eq!(acked["status"], "Acknowledged");
    assert_eq!(acked["assignee"], "priya.nair");

    call(
        &host,
        Capability::Incidents,
        "add_note",
        json!({"id": id, "author": "diego.santos", "body": "failing over to replica"}),
    )
    .await;
    let resolved = call(
        &host,
        Capability::Incidents,
        "resolve",
        json!({"id": id, "actor": "priya.nair", "note": "replica promoted"}),
    )
    .await;
    assert_eq!(resolved["status"], "Resolved");

    let timeline = call(&host, Capability::Incidents, "timeline", json!({"id": id})).await;
    assert_eq!(timeline.as_array().unwrap().len(), 4);

    assert_eq!(
        error_code(
            &host,
            Capability::Incidents,
            "acknowledge",
            json!({"id": id, "actor": "priya.nair"})
        )
        .await,
        "INVALID_STATE_TRANSITION"
    );
}

#[tokio::test]
async fn test_open_incidents_amplify_correlated_metrics() {
    let with_incidents = test_host();
    let without_incidents = build_host(&config_with(&[Capability::Metrics])).unwrap();
    let params = json!({"series_id": "payments.latency_p99_ms"});

    let loud = call(&with_incidents, Capability::Metrics, "latest", params.clone()).await;
    let quiet = call(&without_incidents, Capability::Metrics, "latest", params).await;

    let loud = loud["value"].as_f64().unwrap();
    let quiet = quiet["value"].as_f64().unwrap();
    // the open Sev1 on payments is past its ramp-in at the anchor
    assert!((loud - quiet * 3.5).abs() < 1e-6, "loud={} quiet={}", loud, quiet);

    // services without incidents are untouched
    let params = json!({"series_id": "auth.latency_p99_ms"});
    let a = call(&with_incidents, Capability::Metrics, "latest", params.clone()).await;
    let b = call(&without_incidents, Capability::Metrics, "latest", params).await;
    assert_eq!(a["value"], b["value"]);
}

#[tokio::test]
async fn test_alert_windows_carry_over_between_hosts() {
    let full = test_host();
    let metrics_only = build_host(&config_with(&[Capability::Metrics])).unwrap();

    let windows = call(&full, Capability::Incidents, "alert_windows", json!({})).await;
    assert_eq!(windows.as_array().unwrap().len(), 8);

    let stored = call(
        &metrics_only,
        Capability::Metrics,
        "set_alert_windows",
        json!({ "windows": windows }),
    )
    .await;
    assert_eq!(stored["windows"], 8);

    let params = json!({"series_id": "payments.latency_p99_ms"});
    let live = call(&full, Capability::Metrics, "latest", params.clone()).await;
    let copied = call(&metrics_only, Capability::Metrics, "latest", params).await;
    let live = live["value"].as_f64().unwrap();
    let copied = copied["value"].as_f64().unwrap();
    assert!((live - copied).abs() < 1e-6, "live={} copied={}", live, copied);
}

#[tokio::test]
async fn test_incident_windows_seed_error_bursts() {
    let host = test_host();
    let visa = call(&host, Capability::Incidents, "get", json!({"id": "INC-1008"})).await;
    assert_eq!(visa["service"], "payments");

    let start = anchor() - Duration::minutes(18);
    let errors = call(
        &host,
        Capability::Logs,
        "search",
        json!({
            "service": "payments",
            "min_level": "error",
            "start": start,
            "end": anchor(),
        }),
    )
    .await;
    assert!(errors.as_array().unwrap().len() >= 6);

    let counts = call(
        &host,
        Capability::Logs,
        "level_counts",
        json!({"service": "payments", "start": start, "end": anchor()}),
    )
    .await;
    assert!(counts["error"].as_u64().unwrap() >= 6);
}

#[tokio::test]
async fn test_follow_up_from_incident_to_owner() {
    let host = test_host();

    let tickets = call(
        &host,
        Capability::Tickets,
        "search",
        json!({"linked_incident": "INC-1003"}),
    )
    .await;
    let ticket = &tickets.as_array().unwrap()[0];
    assert_eq!(ticket["key"], "OPS-103");
    assert_eq!(ticket["status"], "Blocked");

    let incident = call(&host, Capability::Incidents, "get", json!({"id": "INC-1003"})).await;
    let service = incident["service"].as_str().unwrap();
    let owners = call(&host, Capability::Services, "owners", json!({"name": service})).await;
    assert_eq!(owners["oncall"], "sam.rivera");

    let channel = format!("{}-oncall", owners["team"].as_str().unwrap());
    let posted = call(
        &host,
        Capability::Messaging,
        "post",
        json!({
            "channel": channel,
            "author": "priya.nair",
            "text": "OPS-103 is blocked on DBA approval, can you help?"
        }),
    )
    .await;
    assert_eq!(posted["channel"], "identity-oncall");

    let history = call(
        &host,
        Capability::Messaging,
        "history",
        json!({"channel": "identity-oncall"}),
    )
    .await;
    let history = history.as_array().unwrap();
    assert_eq!(history.last().unwrap()["id"], posted["id"]);
}

#[tokio::test]
async fn test_blast_radius_and_secrets_scope() {
    let host = test_host();

    let upstream = call(
        &host,
        Capability::Services,
        "dependents",
        json!({"name": "payments"}),
    )
    .await;
    assert_eq!(upstream, json!(["checkout"]));

    let listed = call(
        &host,
        Capability::Secrets,
        "list",
        json!({"pattern": "prod/payments/*"}),
    )
    .await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|s| s.get("value").is_none()));

    let revealed = call(
        &host,
        Capability::Secrets,
        "get",
        json!({"path": "prod/payments/acquirer-api-key", "grants": ["prod/payments/*"]}),
    )
    .await;
    assert_eq!(revealed["version"], 2);

    assert_eq!(
        error_code(
            &host,
            Capability::Secrets,
            "get",
            json!({"path": "prod/payments/acquirer-api-key", "grants": ["staging/**"]})
        )
        .await,
        "ACCESS_DENIED"
    );
}
