use chrono::{Local, TimeZone};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};
use yori_core::report::{
    ReportData, ReportFormat, generate_csv_report, generate_json_report, generate_report,
    generate_text_report, write_report,
};
use yori_scanner::{DirectorySet, ExtensionSet, ScanConfig, ScanReport, Scanner, Wordlist};

async fn sample_report() -> (MockServer, ScanReport) {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("login form"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("listing"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let config = ScanConfig::new(mock_server.uri())
        .with_no_common(true)
        .with_wordlist(Wordlist::new(["admin", "private"]).unwrap())
        .with_extensions(ExtensionSet::new(["php"]))
        .with_directories(DirectorySet::new(["img"]))
        .with_timeout(Duration::from_secs(2));
    let report = Scanner::new(config).unwrap().scan().await.unwrap();
    (mock_server, report)
}

fn fixed_time() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap()
}

#[test]
fn test_report_format_from_str() {
    assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("csv"), Some(ReportFormat::Csv));
    assert_eq!(ReportFormat::from_str("html"), None);
}

#[tokio::test]
async fn test_report_data_lists_hits_only() {
    let (_server, report) = sample_report().await;
    let data = ReportData::gather(&report, fixed_time());

    // admin.php, img/ and the 403 on private
    assert_eq!(data.hits.len(), 3);
    assert!(data.errors.is_empty());
    assert_eq!(data.summary.misses, 2);
    assert!(data.generated_at.starts_with("2026-03-14T15:09:26"));

    let img = data.hits.iter().find(|f| f.url.ends_with("/img/")).unwrap();
    assert!(img.directory.is_some());
}

#[tokio::test]
async fn test_text_report() {
    let (_server, report) = sample_report().await;
    let text = generate_text_report(&ReportData::gather(&report, fixed_time()));

    assert!(text.contains("YORI FUZZ RESULTS"));
    assert!(text.contains("[200] Success (2 findings)"));
    assert!(text.contains("[403] Client Error (1 findings)"));
    assert!(text.contains("/img/ (7 bytes) [dir]"));
    assert!(text.contains("Misses:       2"));
    assert!(!text.contains("cancelled"));
    assert!(text.contains("/admin.php (10 bytes)"));
}

#[tokio::test]
async fn test_json_report() {
    let (_server, report) = sample_report().await;
    let json = generate_json_report(&ReportData::gather(&report, fixed_time())).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["hits"].as_array().unwrap().len(), 3);
    assert_eq!(value["summary"]["hits"], 3);
    assert_eq!(value["summary"]["cancelled"], false);
    assert!(value["target"].as_str().unwrap().ends_with('/'));
    assert!(value["warnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_csv_report() {
    let (_server, report) = sample_report().await;
    let csv = generate_csv_report(&ReportData::gather(&report, fixed_time()));
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(
        lines[0],
        "url,status,content_length,elapsed_ms,classification,depth,directory"
    );
    assert_eq!(lines.len(), 4);
    let private = lines.iter().find(|l| l.contains("/private,")).unwrap();
    assert!(private.contains(",403,0,"));
    assert!(private.ends_with(",hit,0,"));
}

#[tokio::test]
async fn test_generate_report_dispatches_on_format() {
    let (_server, report) = sample_report().await;
    let json = generate_report(&report, ReportFormat::Json).unwrap();
    assert!(json.trim_start().starts_with('{'));
    let csv = generate_report(&report, ReportFormat::Csv).unwrap();
    assert!(csv.starts_with("url,status"));
}

#[test]
fn test_write_report_creates_directories() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("out").join("report.txt");

    write_report(&path, "contents").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "contents");
}

#[test]
fn test_write_report_to_unwritable_path_fails() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("file");
    std::fs::write(&blocker, "x").unwrap();

    // A regular file cannot be used as a directory.
    let err = write_report(&blocker.join("report.txt"), "contents").unwrap_err();
    assert!(err.to_string().contains("Failed to"));
}
