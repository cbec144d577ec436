//! # superset-client
//!
//! Blocking client for the Superset REST API.
//!
//! Provides:
//! - Login with bearer tokens and token refresh
//! - Typed CRUD access to dashboards, charts, datasets, databases, saved
//!   queries and roles through one generic [`Factory`]
//! - Dashboard editing: the position tree from [`superset_layout`], the
//!   cross-filter metadata, and [`Dashboard::add_chart`]
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐   Factory<R>   ┌─────────────┐   ApiRequest   ┌───────────────┐
//! │ SupersetClient │───────────────►│  Resource   │───────────────►│   Transport   │
//! └────────────────┘                │ (Dashboard, │◄───────────────│ (HttpTransport│
//!                                   │  Chart, ..) │   ApiResponse  │  or a double) │
//!                                   └─────────────┘                └───────────────┘
//! ```
//!
//! Entities never talk HTTP directly; everything goes through
//! [`Transport`], which owns the host, the API prefix and the tokens.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chart;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod dataset;
pub mod error;
pub mod http;
pub mod json_field;
pub mod query;
pub mod resource;
pub mod role;
pub mod saved_query;
pub mod transport;

#[cfg(test)]
mod testing;

pub use chart::{Chart, Charts, DATASOURCE_TABLE};
pub use client::SupersetClient;
pub use config::{ClientConfig, DEFAULT_API_PREFIX, DEFAULT_PAGE_SIZE, DEFAULT_PROVIDER, join_url};
pub use dashboard::{
    ChartConfiguration, ChartPlacement, CrossFilters, Dashboard, DashboardMetadata, Dashboards,
    GlobalChartConfiguration, GlobalScope,
};
pub use database::{Database, Databases};
pub use dataset::{Dataset, Datasets};
pub use error::{ClientError, Result};
pub use http::HttpTransport;
pub use query::{Query, QueryFilter};
pub use resource::{Export, Factory, Resource};
pub use role::{Role, Roles};
pub use saved_query::{SavedQueries, SavedQuery};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, Transport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
