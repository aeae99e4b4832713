use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A field of a partial update.
///
/// JSON `null` and an absent key are different things here: absent means
/// "leave unchanged", `null` means "set to nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }

    /// Outer `None` = untouched, `Some(None)` = cleared.
    pub fn into_change(self) -> Option<Option<T>> {
        match self {
            Patch::Unset => None,
            Patch::Null => Some(None),
            Patch::Value(v) => Some(Some(v)),
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|v| v.map_or(Patch::Null, Patch::Value))
    }
}

/// Body of `POST /api/v1/users`.
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub user: NewUserPayload,
}

/// Raw create input. Values stay untyped so that missing and mistyped fields
/// are all reported by validation in one go.
#[derive(Debug, Default, Deserialize)]
pub struct NewUserPayload {
    pub email: Option<Value>,
    pub username: Option<Value>,
    pub full_name: Option<Value>,
    pub is_active: Option<Value>,
    pub password: Option<Value>,
}

/// Body of `PUT /api/v1/users/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub user: UpdateUserPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserPayload {
    #[serde(default)]
    pub email: Patch<Value>,
    #[serde(default)]
    pub username: Patch<Value>,
    #[serde(default)]
    pub full_name: Patch<Value>,
    #[serde(default)]
    pub is_active: Patch<Value>,
}

/// Query of `GET /api/v1/users`, as sent. Parsed by validation.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub skip: Option<String>,
    pub limit: Option<String>,
    pub is_active: Option<String>,
}

/// Validated create input.
#[derive(Clone)]
pub struct UserCreate {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub password: String,
}

impl fmt::Debug for UserCreate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCreate")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .field("is_active", &self.is_active)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Validated update input. `None` / `Patch::Unset` leave a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Patch<String>,
    pub is_active: Option<bool>,
}
