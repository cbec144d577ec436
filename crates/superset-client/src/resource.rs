//! Generic CRUD access to REST resources.

use std::fmt;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::join_url;
use crate::error::{ClientError, Result};
use crate::query::Query;
use crate::transport::Transport;

/// A server-side object exposed under a REST endpoint.
pub trait Resource: Sized + Clone + fmt::Debug {
    /// Endpoint below the API base, e.g. `chart/`.
    const ENDPOINT: &'static str;

    /// Human-readable name used in errors and logs.
    const KIND: &'static str;

    /// Remote id, `None` until the object is saved.
    fn id(&self) -> Option<i64>;

    /// Record the remote id after creation.
    fn set_id(&mut self, id: i64);

    /// Decode one `result` object of a get or list response.
    fn from_result(value: Value) -> Result<Self>;

    /// Encode the body of a create or update request.
    fn to_payload(&self) -> Result<Value>;

    /// Check the object before it is sent.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// [`Resource::from_result`] for plain serde entities.
pub(crate) fn decode_result<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// [`Resource::to_payload`] for plain serde entities.
pub(crate) fn encode_payload<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Bundle returned by an export endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// `Content-Type` reported by the server.
    pub content_type: Option<String>,
    /// Raw bytes (usually a ZIP archive).
    pub data: Vec<u8>,
}

impl Export {
    /// Whether the bundle is a ZIP archive.
    #[must_use]
    pub fn is_zip(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().starts_with("application/zip"))
    }

    /// Write the bundle to `path`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from writing the file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        fs::write(path, &self.data)
    }
}

/// CRUD operations on one resource type.
#[derive(Debug, Clone)]
pub struct Factory<R> {
    transport: Arc<dyn Transport>,
    page_size: u32,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Factory<R> {
    /// Factory over `transport` listing `page_size` objects per page.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, page_size: u32) -> Self {
        Self {
            transport,
            page_size,
            _resource: PhantomData,
        }
    }

    /// Underlying transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Path of the collection.
    #[must_use]
    pub fn collection_path(&self) -> String {
        join_url("", R::ENDPOINT)
    }

    /// Path of one object.
    #[must_use]
    pub fn object_path(&self, id: i64) -> String {
        join_url(R::ENDPOINT, &id.to_string())
    }

    /// Fetch the object with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] if the server rejects the request and
    /// [`ClientError::Serialization`] if the result cannot be decoded.
    pub fn get(&self, id: i64) -> Result<R> {
        let body = self.transport.get(&self.object_path(id), &[])?.value()?;
        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| missing_field("result"))?;
        let mut object = R::from_result(result)?;
        object.set_id(id);
        debug!(kind = R::KIND, id, "fetched");
        Ok(object)
    }

    /// Replace `object` with the server's current copy.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Precondition`] if the object has no id.
    pub fn fetch(&self, object: &mut R) -> Result<()> {
        let id = object
            .id()
            .ok_or_else(|| ClientError::Precondition(format!("{} has no id, nothing to fetch", R::KIND)))?;
        *object = self.get(id)?;
        Ok(())
    }

    /// List the objects matching `query`.
    ///
    /// Uses the factory page size when the query sets none.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] if the server rejects the request and
    /// [`ClientError::Serialization`] if a result cannot be decoded.
    pub fn find(&self, query: &Query) -> Result<Vec<R>> {
        let mut query = query.clone();
        if query.page_size.is_none() {
            query.page_size = Some(self.page_size);
            query.page.get_or_insert(0);
        }
        let q = query.to_param()?;
        let body = self
            .transport
            .get(&self.collection_path(), &[("q", q)])?
            .value()?;
        let results = match body.get("result") {
            Some(Value::Array(items)) => items.clone(),
            _ => return Err(missing_field("result")),
        };
        debug!(kind = R::KIND, count = results.len(), "listed");
        results.into_iter().map(R::from_result).collect()
    }

    /// The single object matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for no match and
    /// [`ClientError::MultipleFound`] for more than one.
    pub fn find_one(&self, query: &Query) -> Result<R> {
        let mut objects = self.find(query)?;
        match objects.len() {
            0 => Err(ClientError::NotFound(format!("no {} matches the query", R::KIND))),
            1 => objects
                .pop()
                .ok_or_else(|| ClientError::NotFound(R::KIND.to_string())),
            n => Err(ClientError::MultipleFound(format!(
                "{n} {} objects match the query",
                R::KIND
            ))),
        }
    }

    /// Number of objects matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] if the server rejects the request.
    pub fn count(&self, query: &Query) -> Result<u64> {
        let query = query.clone().page(0, 1);
        let q = query.to_param()?;
        let body = self
            .transport
            .get(&self.collection_path(), &[("q", q)])?
            .value()?;
        body.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| missing_field("count"))
    }

    /// Create `object` on the server and record its new id.
    ///
    /// # Errors
    ///
    /// Returns the [`Resource::validate`] error for invalid objects and
    /// [`ClientError::Api`] if the server rejects the object.
    pub fn add(&self, object: &mut R) -> Result<i64> {
        object.validate()?;
        let payload = object.to_payload()?;
        let body = self
            .transport
            .post(&self.collection_path(), payload)?
            .value()?;
        let id = body
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| missing_field("id"))?;
        object.set_id(id);
        info!(kind = R::KIND, id, "created");
        Ok(id)
    }

    /// Save the fields of an existing object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Precondition`] if the object has no id and
    /// [`ClientError::Api`] if the server rejects the update.
    pub fn update(&self, object: &R) -> Result<()> {
        let id = object
            .id()
            .ok_or_else(|| ClientError::Precondition(format!("{} has no id, add it first", R::KIND)))?;
        object.validate()?;
        self.transport
            .put(&self.object_path(id), object.to_payload()?)?;
        info!(kind = R::KIND, id, "updated");
        Ok(())
    }

    /// Delete the object with `id`. Returns whether the server confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] if the server rejects the request.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let body = self.transport.delete(&self.object_path(id))?.value()?;
        info!(kind = R::KIND, id, "deleted");
        Ok(body.get("message").and_then(Value::as_str) == Some("OK"))
    }

    /// Export the objects with `ids` as an importable bundle.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] if the server rejects the request.
    pub fn export(&self, ids: &[i64]) -> Result<Export> {
        let ids = serde_json::to_string(ids)?;
        let path = join_url(R::ENDPOINT, "export/");
        let response = self.transport.get(&path, &[("q", ids)])?;
        debug!(kind = R::KIND, bytes = response.body.len(), "exported");
        Ok(Export {
            content_type: response.content_type,
            data: response.body,
        })
    }
}

fn missing_field(field: &str) -> ClientError {
    ClientError::Serialization(format!("response has no `{field}` field"))
}
