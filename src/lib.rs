//! Vacancy Broker
//!
//! An asynchronous request dispatcher with result rendezvous for job
//! vacancy searches. Callers submit a query, a bounded pool of workers
//! fetches matching vacancies from an external source, and the caller
//! waits on a shared result store until the answer arrives or a timeout
//! elapses.
//!
//! # Overview
//!
//! - Protocol types for requests, vacancy records and responses
//! - Agent registry, FIFO task queue and bounded worker pool
//! - Polling result store with a timeout sentinel and TTL eviction
//! - Pluggable vacancy sources, with an hh.ru implementation
//! - Structured logging, metrics and an HTTP status server
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vacancy_broker::{BrokerConfig, HhVacancySource, VacancyBroker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BrokerConfig::default();
//! let source = HhVacancySource::new(config.source.clone().into())?;
//! let broker = VacancyBroker::new(config, Arc::new(source))?;
//! broker.start().await?;
//!
//! let response = broker.handle_request("rust developer", 42).await;
//! if response.is_timeout() {
//!     println!("no answer in time");
//! } else {
//!     println!("{} vacancies", response.vacancies.len());
//! }
//!
//! broker.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod source;
pub mod testing;

pub use broker::VacancyBroker;
pub use config::*;
pub use error::{BrokerError, BrokerResult};
pub use protocol::*;
pub use source::{FetchError, HhConfig, HhVacancySource, VacancySource};
