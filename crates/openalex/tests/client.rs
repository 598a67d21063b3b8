//! Integration tests for the OpenAlex client against a mock HTTP server.

use std::io::Write;
use std::time::Duration;

use aphrc_openalex::api::{OpenAlexApi, OpenAlexError};
use aphrc_openalex::extract::{extract_works, ExtractConfig, WorkSource};
use aphrc_openalex::harvest::{default_strategies, harvest_works, HarvestConfig, SearchStrategy};
use aphrc_openalex::institution::{resolve_institution, Resolution};
use aphrc_openalex::snapshot::{scan_snapshot, SnapshotConfig};
use assert_matches::assert_matches;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> OpenAlexApi {
    OpenAlexApi::new(server.uri(), server.uri())
}

fn fast_harvest() -> HarvestConfig {
    HarvestConfig {
        per_page: 2,
        page_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn work(id: &str) -> serde_json::Value {
    json!({
        "id": format!("https://openalex.org/{id}"),
        "title": format!("Work {id}"),
        "authorships": [{
            "author": {"display_name": "A. Author"},
            "institutions": [{
                "id": "https://openalex.org/I4210152772",
                "display_name": "African Population and Health Research Center"
            }]
        }]
    })
}

fn works_page(count: u64, page: u32, ids: &[&str]) -> serde_json::Value {
    json!({
        "meta": {"count": count, "page": page, "per_page": 2},
        "results": ids.iter().map(|id| work(id)).collect::<Vec<_>>(),
    })
}

// ---------------------------------------------------------------------------
// Institution resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolves_known_institution_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/institutions/I4210152772"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "https://openalex.org/I4210152772",
            "display_name": "African Population and Health Research Center"
        })))
        .mount(&server)
        .await;

    let resolved = resolve_institution(&api_for(&server)).await;
    assert_eq!(resolved.id, "I4210152772");
    assert_eq!(resolved.resolution, Resolution::KnownId);
}

#[tokio::test]
async fn falls_back_to_search_then_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/institutions"))
        .and(query_param("search", "African Population and Health Research Center"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": "https://openalex.org/I999", "display_name": "Somewhere else"},
                {"id": "https://openalex.org/I123", "display_name": "African Population and Health Research Center (Kenya)"}
            ]
        })))
        .mount(&server)
        .await;

    let resolved = resolve_institution(&api_for(&server)).await;
    assert_eq!(resolved.id, "I123");
    assert_eq!(resolved.resolution, Resolution::Search);

    // Nothing mounted at all: every lookup 404s.
    let empty = MockServer::start().await;
    let resolved = resolve_institution(&api_for(&empty)).await;
    assert_eq!(resolved.id, "I4210152772");
    assert_eq!(resolved.resolution, Resolution::Fallback);
}

#[tokio::test]
async fn non_success_status_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/institutions/I1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = api_for(&server).get_institution("I1").await.unwrap_err();
    assert_matches!(err, OpenAlexError::Api { status: 503, ref body } if body == "busy");
}

// ---------------------------------------------------------------------------
// Harvesting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pages_until_total_reached() {
    let server = MockServer::start().await;
    let filter = "institutions.id:I4210152772";

    // Probe.
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", filter))
        .and(query_param("per-page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(works_page(3, 1, &["W1"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", filter))
        .and(query_param("page", "1"))
        .and(query_param("per-page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(works_page(3, 1, &["W1", "W2"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", filter))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(works_page(3, 2, &["W3"])))
        .expect(1)
        .mount(&server)
        .await;

    let harvest = harvest_works(
        &api_for(&server),
        &default_strategies("I4210152772"),
        &fast_harvest(),
    )
    .await;

    assert_eq!(harvest.strategy, Some(SearchStrategy::InstitutionId("I4210152772".into())));
    assert_eq!(harvest.reported_count, 3);
    let ids: Vec<String> = harvest.works.iter().map(|w| w.short_id()).collect();
    assert_eq!(ids, ["W1", "W2", "W3"]);
}

#[tokio::test]
async fn implausible_counts_move_to_next_strategy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", "institutions.id:I1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(works_page(50_000, 1, &[])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("filter", "authorships.institutions.display_name:X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(works_page(1, 1, &["W9"])))
        .mount(&server)
        .await;

    let strategies = [
        SearchStrategy::InstitutionId("I1".into()),
        SearchStrategy::AffiliationText("X".into()),
    ];
    let harvest = harvest_works(&api_for(&server), &strategies, &fast_harvest()).await;

    assert_eq!(harvest.strategy, Some(SearchStrategy::AffiliationText("X".into())));
    assert_eq!(harvest.works.len(), 1);
}

// ---------------------------------------------------------------------------
// Snapshot and full extraction
// ---------------------------------------------------------------------------

fn gzip_lines(lines: &[serde_json::Value]) -> Vec<u8> {
    let text = lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(text.as_bytes()).unwrap();
    enc.finish().unwrap()
}

#[tokio::test]
async fn snapshot_scan_reads_manifest_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/works/manifest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                {"url": "s3://openalex/data/works/part_000.gz", "meta": {"record_count": 2}},
                {"url": "s3://openalex/data/works/part_001.gz"},
                {"url": "s3://openalex/data/works/part_002.gz"}
            ]
        })))
        .mount(&server)
        .await;
    let other = json!({"id": "W2", "authorships": [{"institutions": [{"id": "I5"}]}]});
    Mock::given(method("GET"))
        .and(path("/data/works/part_000.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip_lines(&[work("W1"), other])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/works/part_001.gz"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/works/part_002.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip_lines(&[work("W3")])))
        .expect(0)
        .mount(&server)
        .await;

    let config = SnapshotConfig {
        max_files: 2,
        concurrency: 2,
    };
    let works = scan_snapshot(&api_for(&server), "I4210152772", &config)
        .await
        .unwrap();

    let ids: Vec<String> = works.iter().map(|w| w.short_id()).collect();
    assert_eq!(ids, ["W1"]);
}

#[tokio::test]
async fn extraction_falls_back_to_sample_data() {
    // No routes mounted: institution lookups, work probes and the
    // manifest all fail.
    let server = MockServer::start().await;
    let config = ExtractConfig {
        harvest: fast_harvest(),
        ..Default::default()
    };

    let extraction = extract_works(&api_for(&server), &config).await;
    assert_eq!(extraction.source, WorkSource::Sample);
    assert_eq!(extraction.works.len(), 10);
}
