use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An individual owned by a user account.
///
/// People are never owned by a lease. The same person may be a lessee on one
/// lease and an occupant on another; leases only hold their id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    /// Whether both an email and a phone number are on file.
    pub fn has_contact_info(&self) -> bool {
        is_present(&self.email) && is_present(&self.phone)
    }
}

/// A reference to a person in a lease payload: either someone already in the
/// directory, or the fields needed to create them on the spot.
///
/// Deserialized untagged, so `{"person_id": "..."}` selects [`PersonRef::Existing`]
/// and anything else is read as inline fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersonRef {
    Existing { person_id: Uuid },
    Inline(InlinePerson),
}

impl PersonRef {
    pub fn existing(person_id: Uuid) -> Self {
        Self::Existing { person_id }
    }
}

impl From<InlinePerson> for PersonRef {
    fn from(inline: InlinePerson) -> Self {
        Self::Inline(inline)
    }
}

/// Fields for creating a person inline.
///
/// Every field is optional on the wire so that missing values surface as
/// validation errors naming the field rather than as decode failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InlinePerson {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl InlinePerson {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn has_contact_info(&self) -> bool {
        is_present(&self.email) && is_present(&self.phone)
    }

    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self, require_contact: bool) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !is_present(&self.first_name) {
            missing.push("first_name");
        }
        if !is_present(&self.last_name) {
            missing.push("last_name");
        }
        if require_contact {
            if !is_present(&self.email) {
                missing.push("email");
            }
            if !is_present(&self.phone) {
                missing.push("phone");
            }
        }
        missing
    }
}

/// Blank strings count as absent.
pub(crate) fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
