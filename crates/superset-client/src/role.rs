//! Security roles.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::resource::{Factory, Resource, decode_result, encode_payload};

/// A security role, used to restrict dashboard access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Remote id.
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    /// Role name.
    pub name: String,
}

impl Role {
    /// Unsaved role called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

impl Resource for Role {
    const ENDPOINT: &'static str = "security/roles/";
    const KIND: &'static str = "role";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn from_result(value: Value) -> Result<Self> {
        decode_result(value)
    }

    fn to_payload(&self) -> Result<Value> {
        encode_payload(self)
    }
}

/// Access to roles.
pub type Roles = Factory<Role>;

impl Roles {
    /// The role called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClientError::NotFound`] when no role has that name.
    pub fn by_name(&self, name: &str) -> Result<Role> {
        self.find_one(&crate::Query::new().eq("name", name))
    }
}
