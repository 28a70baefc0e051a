//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small school directory and run the
//! full crawl cycle end-to-end: landing page, listing pages, detail pages
//! and the final results file.

use school_crawler::config::{parse_config, Config};
use school_crawler::crawler::crawl;
use school_crawler::output::{read_records, split_by_state};
use school_crawler::Record;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a configuration pointing at the mock server
fn create_test_config(server: &MockServer, dir: &TempDir, top: &str, filter: &str, site: &str) -> Config {
    parse_config(&format!(
        r#"thread_num = 3
{top}

[filter]
{filter}

[site]
base_url = "{uri}/search"
{site}

[fetch]
max_attempts = 3
backoff_initial_ms = 0
timeout_secs = 5

[output]
dir = "{dir}"
states_dir = "{dir}/states"
"#,
        uri = server.uri(),
        dir = dir.path().display(),
    ))
    .expect("test config should be valid")
}

fn school_block(id: u32, address: &str) -> String {
    format!(
        r#"<div class="row">
            <a href="/school-{id}"><h5>School {id}</h5></a>
            <p class="primary-site">{address}</p>
            <div><b>Level:</b> Primary School</div>
            <div><b>Sector:</b> Government</div>
        </div>"#
    )
}

const FILTERS: &str = r#"<form>
    <input name="sector_ids[]" value="1" data-url-part="government">
    <input name="sector_ids[]" value="3" data-url-part="catholic">
    <input name="school_level_ids[]" value="10" data-url-part="primary">
    <input name="school_level_ids[]" value="11" data-url-part="secondary">
</form>"#;

fn pagination(pages: u32) -> String {
    let items: String = (1..=pages)
        .map(|n| format!(r#"<li class="page-item"><a href="?page={n}">{n}</a></li>"#))
        .collect();
    format!(
        r#"<ul>{items}<li class="page-item"><a href="?page=2">Next</a></li></ul>"#
    )
}

fn listing_page(blocks: &[String], pages: u32) -> String {
    format!(
        r#"<html><body>{FILTERS}<div id="search-results">{}</div>{}</body></html>"#,
        blocks.concat(),
        pagination(pages)
    )
}

fn detail_page(address: &str) -> String {
    format!(r#"<html><body><span class="map-address" data-address="{address}"></span></body></html>"#)
}

async fn mount_page(server: &MockServer, slug: &str, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/search/{}", slug)))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn find<'a>(records: &'a [Record], id: &str) -> &'a Record {
    records
        .iter()
        .find(|record| record.id == id)
        .unwrap_or_else(|| panic!("record {} missing", id))
}

#[tokio::test]
async fn test_full_crawl_with_enrichment() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Landing page doubles as page 1
    mount_page(
        &server,
        "primary",
        1,
        listing_page(
            &[
                school_block(101, "1 Main St VIC 3000"),
                school_block(102, "2 High St NSW 2000"),
            ],
            3,
        ),
    )
    .await;

    // Later pages only answer when the derived level filter is present
    for (page, blocks) in [
        (
            2,
            vec![
                school_block(201, "3 Bay Rd QLD 4000"),
                school_block(101, "1 Main St VIC 3000"),
            ],
        ),
        (3, vec![school_block(301, "4 Hill Rd SA 5000")]),
    ] {
        Mock::given(method("GET"))
            .and(path("/search/primary"))
            .and(query_param("page", page.to_string()))
            .and(query_param("school_level_ids[0]", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&blocks, 3)))
            .mount(&server)
            .await;
    }

    for id in [101, 102, 201] {
        Mock::given(method("GET"))
            .and(path(format!("/school-{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(&format!(
                "{} Full Street, Suburb, VIC 3000",
                id
            ))))
            .mount(&server)
            .await;
    }
    // Detail page for 301 has no address attribute
    Mock::given(method("GET"))
        .and(path("/school-301"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir, "full_address = true", r#"levels = ["p"]"#, "");
    let report = crawl(config).await.expect("crawl should succeed");

    assert_eq!(report.passes_completed, 1);
    assert_eq!(report.passes_failed, 0);
    assert_eq!(report.records, 4);
    assert_eq!(report.enriched, 3);

    let records = read_records(&report.output_path).unwrap();
    assert_eq!(records.len(), 4);

    let enriched = find(&records, "101");
    assert_eq!(enriched.address, "101 Full Street, Suburb, VIC 3000");
    assert_eq!(enriched.city, "1 Main St");
    assert_eq!(enriched.level_code, "p");
    assert_eq!(enriched.category, "Government");

    let unenriched = find(&records, "301");
    assert_eq!(unenriched.address, "4 Hill Rd, SA, 5000");
}

#[tokio::test]
async fn test_failed_detail_fetch_keeps_listing_address() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "primary",
        1,
        listing_page(
            &[
                school_block(1, "1 Road VIC 3000"),
                school_block(2, "2 Road NSW 2000"),
                school_block(3, "3 Road QLD 4000"),
            ],
            1,
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/school-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    for id in [2, 3] {
        Mock::given(method("GET"))
            .and(path(format!("/school-{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(&format!(
                "{} Full Street, Suburb, NSW 2000",
                id
            ))))
            .mount(&server)
            .await;
    }

    let config = create_test_config(&server, &dir, "full_address = true", r#"levels = ["p"]"#, "");
    let report = crawl(config).await.expect("crawl should succeed");

    assert_eq!(report.passes_completed, 1);
    assert_eq!(report.records, 3);
    assert_eq!(report.enriched, 2);

    let records = read_records(&report.output_path).unwrap();
    assert_eq!(find(&records, "1").address, "1 Road, VIC, 3000");
    assert_eq!(find(&records, "2").address, "2 Full Street, Suburb, NSW 2000");
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "primary",
        1,
        listing_page(&[school_block(1, "1 Road VIC 3000")], 2),
    )
    .await;

    // Page 2 fails twice before succeeding
    Mock::given(method("GET"))
        .and(path("/search/primary"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "primary",
        2,
        listing_page(&[school_block(2, "2 Road VIC 3000")], 2),
    )
    .await;

    let config = create_test_config(&server, &dir, "", r#"levels = ["p"]"#, "");
    let report = crawl(config).await.unwrap();

    assert_eq!(report.records, 2);
    assert_eq!(report.enriched, 0);
}

#[tokio::test]
async fn test_catholic_sector_runs_second_pass() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "government/primary",
        1,
        listing_page(&[school_block(1, "1 Road VIC 3000")], 1),
    )
    .await;
    mount_page(
        &server,
        "catholic/primary",
        1,
        listing_page(
            &[
                school_block(1, "1 Road VIC 3000"),
                school_block(2, "2 Road WA 6000"),
            ],
            1,
        ),
    )
    .await;

    let config = create_test_config(
        &server,
        &dir,
        "",
        r#"levels = ["p"]
sectors = ["g", "c"]"#,
        "",
    );
    let report = crawl(config).await.unwrap();

    assert_eq!(report.passes_completed, 2);
    // School 1 appears in both passes but is stored once
    assert_eq!(report.records, 2);
}

#[tokio::test]
async fn test_failed_pass_does_not_stop_the_next() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search/government/primary"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "catholic/primary",
        1,
        listing_page(&[school_block(7, "7 Road TAS 7000")], 1),
    )
    .await;

    let config = create_test_config(
        &server,
        &dir,
        "",
        r#"levels = ["p"]
sectors = ["g", "c"]"#,
        "",
    );
    let report = crawl(config).await.unwrap();

    assert_eq!(report.passes_completed, 1);
    assert_eq!(report.passes_failed, 1);
    assert_eq!(report.records, 1);
}

#[tokio::test]
async fn test_single_sector_sends_distance_and_filters_blacklist() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let special = school_block(2, "2 Road VIC 3000").replace("Primary School", "Special School");

    Mock::given(method("GET"))
        .and(path("/search/government-and-catholic/primary"))
        .and(query_param("page", "1"))
        .and(query_param("distance", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(
            &[school_block(1, "1 Road VIC 3000"), special],
            1,
        )))
        .mount(&server)
        .await;

    let config = create_test_config(
        &server,
        &dir,
        r#"variant = "single-sector"
level_code_blacklist = ["Special School"]"#,
        r#"levels = ["p"]
sectors = ["g", "c"]"#,
        r#"distance = "25""#,
    );
    let report = crawl(config).await.unwrap();

    assert_eq!(report.passes_completed, 1);
    assert_eq!(report.records, 1);

    let records = read_records(&report.output_path).unwrap();
    // single-sector keeps the level code as listed
    assert_eq!(records[0].level_code, "Primary School");
}

#[tokio::test]
async fn test_split_results_by_state() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "primary",
        1,
        listing_page(
            &[
                school_block(1, "1 Road VIC 3000"),
                school_block(2, "2 Road NSW 2000"),
                school_block(3, "3 Road VIC 3001"),
            ],
            1,
        ),
    )
    .await;

    let config = create_test_config(&server, &dir, "", r#"levels = ["p"]"#, "");
    let states_dir = config.output.states_dir.clone();
    let report = crawl(config).await.unwrap();

    let counts = split_by_state(&report.output_path, &states_dir).await.unwrap();
    assert_eq!(counts.get("VIC"), Some(&2));
    assert_eq!(counts.get("NSW"), Some(&1));
    assert!(states_dir.join("VIC_combined_.csv").exists());
}
