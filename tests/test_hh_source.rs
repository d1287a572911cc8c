//! Integration tests for the hh.ru vacancy source
//!
//! Runs the source against a local mock API and checks request shape,
//! field mapping and how failures are classified.

use std::time::Duration;
use vacancy_broker::protocol::FailureKind;
use vacancy_broker::source::{FetchError, HhConfig, HhVacancySource, VacancySource};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> HhConfig {
    HhConfig {
        api_url: format!("{base_url}/vacancies"),
        user_agent: "vacancy-broker-tests".to_string(),
        max_vacancies: 2,
        area: 1,
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_fetch_maps_items_in_order() {
    let mock_server = MockServer::start().await;

    let body = serde_json::json!({
        "found": 2,
        "items": [
            {
                "name": "Python Developer",
                "employer": {"name": "Acme"},
                "salary": {"from": 150000, "to": 250000, "currency": "RUR"},
                "alternate_url": "https://hh.ru/vacancy/1",
                "snippet": {"requirement": "3+ years of <highlighttext>Python</highlighttext>"}
            },
            {
                "name": "Backend Engineer",
                "employer": {"name": "Globex"},
                "salary": null,
                "alternate_url": "https://hh.ru/vacancy/2",
                "snippet": {"requirement": null}
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/vacancies"))
        .and(query_param("text", "python"))
        .and(query_param("per_page", "2"))
        .and(query_param("area", "1"))
        .and(header("Accept", "application/json"))
        .and(header("User-Agent", "vacancy-broker-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = HhVacancySource::new(test_config(&mock_server.uri())).unwrap();
    let vacancies = source.fetch("python").await.unwrap();

    assert_eq!(vacancies.len(), 2);
    assert_eq!(vacancies[0].title, "Python Developer");
    assert_eq!(vacancies[0].company, "Acme");
    assert_eq!(vacancies[0].salary.as_deref(), Some("150000-250000 RUR"));
    assert_eq!(
        vacancies[0].description.as_deref(),
        Some("3+ years of <highlighttext>Python</highlighttext>...")
    );
    assert_eq!(vacancies[1].title, "Backend Engineer");
    assert_eq!(vacancies[1].salary, None);
    assert_eq!(vacancies[1].description, None);
}

#[tokio::test]
async fn test_empty_items_is_empty_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vacancies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .mount(&mock_server)
        .await;

    let source = HhVacancySource::new(test_config(&mock_server.uri())).unwrap();
    assert!(source.fetch("nothing").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_server_error_is_status_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vacancies"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let source = HhVacancySource::new(test_config(&mock_server.uri())).unwrap();
    let error = source.fetch("python").await.unwrap_err();

    match &error {
        FetchError::Status { status, message } => {
            assert_eq!(*status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(error.kind(), FailureKind::Status);
}

#[tokio::test]
async fn test_non_json_body_is_decode_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vacancies"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
        .mount(&mock_server)
        .await;

    let source = HhVacancySource::new(test_config(&mock_server.uri())).unwrap();
    let error = source.fetch("python").await.unwrap_err();

    assert_eq!(error.kind(), FailureKind::Decode);
}

#[tokio::test]
async fn test_slow_upstream_is_timeout_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vacancies"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"items": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.timeout = Duration::from_millis(100);
    let source = HhVacancySource::new(config).unwrap();

    let error = source.fetch("python").await.unwrap_err();
    assert_eq!(error.kind(), FailureKind::Timeout);
}

#[tokio::test]
async fn test_unreachable_host_is_network_failure() {
    // Nothing listens on port 1
    let uri = "http://127.0.0.1:1";

    let source = HhVacancySource::new(test_config(uri)).unwrap();
    let error = source.fetch("python").await.unwrap_err();

    assert_eq!(error.kind(), FailureKind::Network);
}
