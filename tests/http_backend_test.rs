use anyhow::Result;
use httpmock::prelude::*;
use opsboard::{AxisOrder, CommitOutcome, DashboardService, EntityKind, FilterSpec, HttpBackend, OpsError, Record};
use serde_json::json;
use std::time::Duration;

fn backend(server: &MockServer) -> Result<HttpBackend> {
    Ok(HttpBackend::new(server.base_url(), Duration::from_secs(5))?)
}

fn warranty_row(date: &str, product: &str, status: &str) -> Record {
    Record::from_pairs([
        ("date", json!(date)),
        ("customer_name", json!("Sari")),
        ("product_name", json!(product)),
        ("status", json!(status)),
    ])
}

#[tokio::test]
async fn test_warranty_pivot_over_http() -> Result<()> {
    let server = MockServer::start();
    let records_mock = server.mock(|when, then| {
        when.method(GET).path("/records/warranty");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!([
                {"row_index": 2, "date": "01 Jan 2026", "store": "Depok", "status": "Open"},
                {"row_index": 3, "date": 46024, "store": "Bogor", "status": "Open"},
                {"row_index": 4, "date": "2026-02-10", "store": "Depok", "status": "Closed"},
                {"row_index": 5, "date": "03/01/2026", "store": "", "status": "Closed"}
            ]));
    });

    let backend = backend(&server)?;
    let service = DashboardService::new(backend.clone(), backend);
    let filter = FilterSpec::new().date_to(opsboard::core::date::CanonicalDate::parse("31/01/2026")?);

    let report = service
        .pivot_report(EntityKind::Warranty, &filter, "status", "store", AxisOrder::Natural)
        .await?;

    records_mock.assert();
    assert_eq!(report.pivot.row_keys, vec!["Open"]);
    assert_eq!(report.pivot.column_keys, vec!["Bogor", "Depok"]);
    assert_eq!(report.pivot.grand_total, 2);
    Ok(())
}

#[tokio::test]
async fn test_upstream_outage_is_reported() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/records/chat-log");
        then.status(503);
    });

    let backend = backend(&server)?;
    let service = DashboardService::new(backend.clone(), backend);
    let err = service
        .pivot_report(EntityKind::ChatLog, &FilterSpec::new(), "intention", "channel", AxisOrder::Natural)
        .await
        .unwrap_err();

    assert!(matches!(err, OpsError::UpstreamFetchError { .. }));
    assert_eq!(err.severity(), opsboard::utils::error::ErrorSeverity::Medium);
    Ok(())
}

#[tokio::test]
async fn test_commit_over_http_counts_failed_rows() -> Result<()> {
    let server = MockServer::start();
    let master_mock = server.mock(|when, then| {
        when.method(GET).path("/master-data");
        then.status(200).json_body(json!({
            "status": ["Open", "Closed"],
            "store": ["Depok", "Bogor"]
        }));
    });
    let ok_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/records/warranty")
            .json_body_partial(r#"{"product_name": "Kettle"}"#);
        then.status(201);
    });
    let failing_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/records/warranty")
            .json_body_partial(r#"{"product_name": "Blender"}"#);
        then.status(500);
    });

    let backend = backend(&server)?;
    let service = DashboardService::new(backend.clone(), backend.clone());
    let rows = vec![
        warranty_row("01/01/2026", "Kettle", "Open"),
        warranty_row("02/01/2026", "Blender", "Closed"),
        warranty_row("03/01/2026", "Kettle", "Closed"),
    ];

    let outcome = service.commit_import(EntityKind::Warranty, &rows, &backend).await?;

    master_mock.assert();
    ok_mock.assert_hits(2);
    failing_mock.assert_hits(1);

    let CommitOutcome::Committed(report) = outcome else {
        panic!("expected committed outcome");
    };
    assert_eq!(report.success_count, 2);
    assert_eq!(report.fail_count, 1);
    assert_eq!(report.failures[0].row_number, 3);
    Ok(())
}

#[tokio::test]
async fn test_commit_rejected_by_master_data_makes_no_writes() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/master-data");
        then.status(200).json_body(json!({"status": ["Open", "Closed"]}));
    });
    let write_mock = server.mock(|when, then| {
        when.method(POST).path("/records/warranty");
        then.status(201);
    });

    let backend = backend(&server)?;
    let service = DashboardService::new(backend.clone(), backend.clone());
    let rows = vec![
        warranty_row("01/01/2026", "Kettle", "Open"),
        warranty_row("02/01/2026", "Blender", "Lost"),
    ];

    let outcome = service.commit_import(EntityKind::Warranty, &rows, &backend).await?;

    write_mock.assert_hits(0);
    assert_eq!(outcome.errors(), ["Row 3: Invalid status \"Lost\"".to_string()].as_slice());
    Ok(())
}
