//! Test helpers and utilities for integration tests

use std::sync::Arc;
use std::time::Duration;
use vacancy_broker::config::{BrokerConfig, DispatcherSection, ResultsSection};
use vacancy_broker::testing::MockVacancySource;
use vacancy_broker::VacancyBroker;

/// Create a configuration with short timings for integration tests
#[allow(dead_code)]
pub fn test_config() -> BrokerConfig {
    BrokerConfig {
        dispatcher: DispatcherSection {
            pool_size: 3,
            request_timeout_secs: 5,
            poll_interval_ms: 10,
        },
        results: ResultsSection {
            ttl_multiplier: 4,
            eviction_interval_secs: 30,
        },
        ..Default::default()
    }
}

/// Build and start a broker around a mock source
#[allow(dead_code)]
pub async fn started_broker(source: MockVacancySource) -> VacancyBroker {
    started_broker_with(test_config(), source).await
}

#[allow(dead_code)]
pub async fn started_broker_with(config: BrokerConfig, source: MockVacancySource) -> VacancyBroker {
    let broker = VacancyBroker::new(config, Arc::new(source)).expect("test config is valid");
    broker.start().await.expect("broker starts once");
    broker
}

/// Poll `condition` until it holds or `timeout` passes
#[allow(dead_code)]
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
