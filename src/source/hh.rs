//! hh.ru vacancy source
//!
//! Queries the public hh.ru vacancies API and maps each item into a
//! `VacancyRecord`.

use crate::config::SourceSection;
use crate::protocol::VacancyRecord;
use crate::source::{FetchError, VacancySource};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum characters of the requirement snippet kept as description
const DESCRIPTION_MAX_CHARS: usize = 100;

/// hh.ru source configuration
#[derive(Debug, Clone)]
pub struct HhConfig {
    pub api_url: String,
    pub user_agent: String,
    pub max_vacancies: u32,
    pub area: u32,
    pub timeout: Duration,
}

impl Default for HhConfig {
    fn default() -> Self {
        SourceSection::default().into()
    }
}

impl From<SourceSection> for HhConfig {
    fn from(section: SourceSection) -> Self {
        Self {
            api_url: section.api_url,
            user_agent: section.user_agent,
            max_vacancies: section.max_vacancies,
            area: section.area,
            timeout: Duration::from_secs(section.request_timeout_secs),
        }
    }
}

/// hh.ru vacancy source implementation
pub struct HhVacancySource {
    config: HhConfig,
    client: Client,
}

impl HhVacancySource {
    /// Create a new hh.ru source
    pub fn new(config: HhConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Map the `items` array of an API response (pure function)
    fn parse_items(body: &Value) -> Result<Vec<VacancyRecord>, FetchError> {
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::Decode("response has no items array".to_string()))?;

        Ok(items.iter().map(Self::map_item).collect())
    }

    /// Map a single API item, falling back to placeholders for missing fields
    fn map_item(item: &Value) -> VacancyRecord {
        let title = item
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Untitled");
        let company = item
            .pointer("/employer/name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        let url = item
            .get("alternate_url")
            .and_then(Value::as_str)
            .unwrap_or("#");

        VacancyRecord {
            title: title.to_string(),
            company: company.to_string(),
            salary: Self::format_salary(item.get("salary")),
            url: url.to_string(),
            description: item
                .pointer("/snippet/requirement")
                .and_then(Value::as_str)
                .map(Self::truncate_description),
        }
    }

    /// Render `{from}-{to} {currency}`; a missing bound renders empty
    fn format_salary(salary: Option<&Value>) -> Option<String> {
        let salary = salary.filter(|s| s.is_object())?;

        let bound = |key: &str| match salary.get(key) {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        let currency = salary
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or_default();

        Some(format!("{}-{} {}", bound("from"), bound("to"), currency))
    }

    fn truncate_description(requirement: &str) -> String {
        let truncated: String = requirement.chars().take(DESCRIPTION_MAX_CHARS).collect();
        format!("{truncated}...")
    }
}

#[async_trait]
impl VacancySource for HhVacancySource {
    fn name(&self) -> &str {
        "hh"
    }

    async fn fetch(&self, query: &str) -> Result<Vec<VacancyRecord>, FetchError> {
        debug!(query = %query, api_url = %self.config.api_url, "Querying hh.ru");

        let per_page = self.config.max_vacancies.to_string();
        let area = self.config.area.to_string();

        let response = self
            .client
            .get(&self.config.api_url)
            .header("Accept", "application/json")
            .query(&[
                ("text", query),
                ("per_page", per_page.as_str()),
                ("area", area.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "hh.ru returned non-success status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        let vacancies = Self::parse_items(&body)?;
        debug!(query = %query, vacancies = vacancies.len(), "hh.ru query complete");
        Ok(vacancies)
    }
}
