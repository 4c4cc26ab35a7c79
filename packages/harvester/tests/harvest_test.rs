//! End-to-end harvests against a mock OAI-PMH repository.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use heritage_harvester::config::{HarvestConfig, HarvestSettings, SourceConfig};
use heritage_harvester::harvest::{
    FileStateStore, HarvestController, JsonLinesSink, MemoryStateStore, StateStore,
};
use heritage_harvester::http::HttpTransport;
use heritage_harvester::normalize::LidoNormalizer;
use heritage_harvester::types::{HarvestWindow, RawRecord, SinkOutcome};
use heritage_harvester::{HarvesterError, Result};

const STATE_KEY: &str = "Last Harvest Date museum";

/// The mock server runs on the runtime's worker threads while the blocking
/// harvest runs on the test thread.
fn start_server(rt: &Runtime) -> MockServer {
    rt.block_on(MockServer::start())
}

fn controller(
    config: &HarvestConfig,
    state: Arc<dyn StateStore + Send + Sync>,
) -> HarvestController {
    let source = config.source("museum").unwrap().clone();
    let transport = HttpTransport::new(config.harvesting.http_timeout()).unwrap();
    HarvestController::new(source, config.harvesting.clone(), transport, state).unwrap()
}

#[test]
fn test_harvest_pages_into_json_lines() {
    let rt = Runtime::new().unwrap();
    let server = start_server(&rt);
    rt.block_on(common::mount_two_pages(&server));

    let config = HarvestConfig::from_yaml_str(&common::sources_yaml(&server.uri())).unwrap();
    let state = Arc::new(MemoryStateStore::new());
    let harvester = controller(&config, state.clone());

    let source = config.source("museum").unwrap();
    let normalizer = LidoNormalizer::lido(source.driver_params.clone());
    let mut sink = JsonLinesSink::new(Vec::new(), "museum", normalizer);

    let window = HarvestWindow::new().with_until("2024-02-01");
    let summary = harvester.harvest(&window, &mut sink).unwrap();

    assert_eq!(summary.changed, 2);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.last_harvested.as_deref(), Some("2024-01-07"));
    assert_eq!(
        state.get_state(STATE_KEY).unwrap().as_deref(),
        Some("2024-01-07")
    );

    let output = String::from_utf8(sink.finish().unwrap()).unwrap();
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["oai_id"], "oai:museum:HK19670603:1");
    assert_eq!(lines[0]["fields"]["title"][0], "Keinutuoli");
    assert_eq!(lines[0]["fields"]["id"][0], "museum.HK19670603:1");
    assert_eq!(lines[1]["oai_id"], "oai:museum:HK19670603:2");
    assert_eq!(lines[1]["deleted"], true);
    assert_eq!(lines[2]["fields"]["title"][0], "Pirtinpöytä");

    let requests = rt.block_on(server.received_requests()).unwrap();
    assert_eq!(requests.len(), 2);
    let first_query: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(
        first_query,
        vec![
            ("verb".to_string(), "ListRecords".to_string()),
            ("metadataPrefix".to_string(), "lido".to_string()),
            ("until".to_string(), "2024-02-01".to_string()),
        ]
    );
}

#[test]
fn test_second_run_starts_from_stored_date() {
    let rt = Runtime::new().unwrap();
    let server = start_server(&rt);
    rt.block_on(common::mount_two_pages(&server));

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    std::fs::write(&state_path, r#"{"Last Harvest Date museum": "2024-01-01"}"#).unwrap();

    let config = HarvestConfig::from_yaml_str(&common::sources_yaml(&server.uri())).unwrap();
    let harvester = controller(&config, Arc::new(FileStateStore::new(&state_path)));
    let mut count = 0;
    let mut sink = |_: &RawRecord| -> Result<SinkOutcome> {
        count += 1;
        Ok(SinkOutcome::Changed)
    };
    harvester.harvest(&HarvestWindow::new(), &mut sink).unwrap();
    assert_eq!(count, 3);

    let requests = rt.block_on(server.received_requests()).unwrap();
    let from = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "from")
        .map(|(_, v)| v.into_owned());
    assert_eq!(from.as_deref(), Some("2024-01-01"));

    let reopened = FileStateStore::new(&state_path);
    assert_eq!(
        reopened.get_state(STATE_KEY).unwrap().as_deref(),
        Some("2024-01-07")
    );
}

#[test]
fn test_no_records_match_keeps_state() {
    let rt = Runtime::new().unwrap();
    let server = start_server(&rt);
    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/oai"))
            .respond_with(common::xml_response("oai/no_records.xml"))
            .mount(&server),
    );

    let config = HarvestConfig::from_yaml_str(&common::sources_yaml(&server.uri())).unwrap();
    let state = Arc::new(MemoryStateStore::with_value(STATE_KEY, "2024-01-01"));
    let harvester = controller(&config, state.clone());

    let mut sink = JsonLinesSink::new(
        Vec::new(),
        "museum",
        LidoNormalizer::lido(Default::default()),
    );
    let summary = harvester.harvest(&HarvestWindow::new(), &mut sink).unwrap();
    assert_eq!(summary.total(), 0);
    assert!(sink.finish().unwrap().is_empty());
    assert_eq!(
        state.get_state(STATE_KEY).unwrap().as_deref(),
        Some("2024-01-01")
    );
}

#[test]
fn test_server_error_is_retried() {
    let rt = Runtime::new().unwrap();
    let server = start_server(&rt);
    rt.block_on(async {
        Mock::given(method("GET"))
            .and(path("/oai"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        common::mount_two_pages(&server).await;
    });

    let config = HarvestConfig::from_yaml_str(&common::sources_yaml(&server.uri())).unwrap();
    let state = Arc::new(MemoryStateStore::new());
    let harvester = controller(&config, state.clone());
    let mut sink = |_: &RawRecord| -> Result<SinkOutcome> { Ok(SinkOutcome::Changed) };
    let summary = harvester.harvest(&HarvestWindow::new(), &mut sink).unwrap();

    assert_eq!(summary.changed + summary.deleted, 3);
    assert_eq!(rt.block_on(server.received_requests()).unwrap().len(), 3);
    assert_eq!(
        state.get_state(STATE_KEY).unwrap().as_deref(),
        Some("2024-01-07")
    );
}

#[test]
fn test_persistent_server_error_exhausts_retries() {
    let rt = Runtime::new().unwrap();
    let server = start_server(&rt);
    rt.block_on(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server),
    );

    let source = SourceConfig::new("museum", format!("{}/oai", server.uri()), "lido");
    let settings = HarvestSettings::default()
        .with_max_tries(3)
        .with_retry_wait_secs(0);
    let transport = HttpTransport::new(settings.http_timeout()).unwrap();
    let state = Arc::new(MemoryStateStore::with_value(STATE_KEY, "2024-01-01"));
    let harvester = HarvestController::new(source, settings, transport, state.clone()).unwrap();

    let mut sink = |_: &RawRecord| -> Result<SinkOutcome> { Ok(SinkOutcome::Changed) };
    let err = harvester
        .harvest(&HarvestWindow::new(), &mut sink)
        .unwrap_err();

    assert!(matches!(
        err,
        HarvesterError::RetriesExhausted { attempts: 3, .. }
    ));
    assert_eq!(rt.block_on(server.received_requests()).unwrap().len(), 3);
    assert_eq!(
        state.get_state(STATE_KEY).unwrap().as_deref(),
        Some("2024-01-01")
    );
}
