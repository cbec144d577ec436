//! Entry point bundling one transport with every resource factory.
//!
//! # Example
//!
//! ```rust,no_run
//! use superset_client::{ClientConfig, SupersetClient};
//!
//! # fn example() -> superset_client::Result<()> {
//! let config = ClientConfig::new("http://localhost:8088").with_credentials("admin", "admin");
//! let client = SupersetClient::connect(config)?;
//! let dashboard = client.dashboards().get(1)?;
//! println!("{}", dashboard.position);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::chart::Charts;
use crate::config::{ClientConfig, DEFAULT_PAGE_SIZE};
use crate::dashboard::Dashboards;
use crate::database::Databases;
use crate::dataset::Datasets;
use crate::error::Result;
use crate::http::HttpTransport;
use crate::resource::{Factory, Resource};
use crate::role::Roles;
use crate::saved_query::SavedQueries;
use crate::transport::Transport;

/// Superset API client.
#[derive(Clone)]
pub struct SupersetClient {
    transport: Arc<dyn Transport>,
    page_size: u32,
}

impl fmt::Debug for SupersetClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupersetClient")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl SupersetClient {
    /// Log in with `config` over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClientError::Config`] for invalid configuration and
    /// [`crate::ClientError::Auth`] when the login is rejected.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let page_size = config.page_size;
        let transport = HttpTransport::connect(config)?;
        Ok(Self::with_transport(Arc::new(transport), page_size))
    }

    /// Log in with configuration read from the environment.
    ///
    /// # Errors
    ///
    /// See [`SupersetClient::connect`].
    pub fn from_env() -> Result<Self> {
        Self::connect(ClientConfig::from_env())
    }

    /// Client over an existing transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>, page_size: u32) -> Self {
        let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        Self {
            transport,
            page_size,
        }
    }

    /// Underlying transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Factory for any resource type.
    #[must_use]
    pub fn factory<R: Resource>(&self) -> Factory<R> {
        Factory::new(Arc::clone(&self.transport), self.page_size)
    }

    /// Dashboards.
    #[must_use]
    pub fn dashboards(&self) -> Dashboards {
        self.factory()
    }

    /// Charts.
    #[must_use]
    pub fn charts(&self) -> Charts {
        self.factory()
    }

    /// Datasets.
    #[must_use]
    pub fn datasets(&self) -> Datasets {
        self.factory()
    }

    /// Database connections.
    #[must_use]
    pub fn databases(&self) -> Databases {
        self.factory()
    }

    /// Saved queries.
    #[must_use]
    pub fn saved_queries(&self) -> SavedQueries {
        self.factory()
    }

    /// Roles.
    #[must_use]
    pub fn roles(&self) -> Roles {
        self.factory()
    }
}
