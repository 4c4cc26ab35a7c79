//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load fixture file content.
pub fn load_fixture(name: &str) -> String {
    let path = fixture_path(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}

pub fn xml_response(fixture: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(load_fixture(fixture), "text/xml")
}

/// Serve the two-page listing under `/oai`.
pub async fn mount_two_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", "ListRecords"))
        .and(query_param("metadataPrefix", "lido"))
        .respond_with(xml_response("oai/page1.xml"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", "ListRecords"))
        .and(query_param("resumptionToken", "page-2"))
        .respond_with(xml_response("oai/page2.xml"))
        .mount(server)
        .await;
}

/// A sources file pointing the `museum` source at `base_url`.
pub fn sources_yaml(base_url: &str) -> String {
    format!(
        r#"harvesting:
  max_tries: 2
  retry_wait_secs: 0
  http_timeout_secs: 10
sources:
  - id: museum
    url: {base_url}/oai
    metadata_prefix: lido
    granularity: day
    driver_params:
      free_online_default: false
"#
    )
}
