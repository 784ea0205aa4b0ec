use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::person::{Person, PersonRef};

/// A person who signs a lease and bears its obligations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseLessee {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub person_id: Uuid,
    pub signed_date: Option<NaiveDate>,
    /// The linked person, hydrated on read.
    pub person: Person,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A person who lives at the property under a lease without signing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseOccupant {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub person_id: Uuid,
    /// Adult occupants must have an email and phone on file.
    pub is_adult: bool,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    /// The linked person, hydrated on read.
    pub person: Person,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A pet attached to a lease. Pets belong to the lease, not to a person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeasePet {
    pub id: Uuid,
    pub lease_id: Uuid,
    pub name: String,
    pub species: PetSpecies,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Species accepted on a lease.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PetSpecies {
    Cat,
    Dog,
}

impl PetSpecies {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cat => "cat",
            Self::Dog => "dog",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cat" => Some(Self::Cat),
            "dog" => Some(Self::Dog),
            _ => None,
        }
    }
}

/// A lessee in a create or add payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LesseeSpec {
    #[serde(flatten)]
    pub person: PersonRef,
    pub signed_date: Option<NaiveDate>,
}

impl LesseeSpec {
    pub fn new(person: impl Into<PersonRef>) -> Self {
        Self {
            person: person.into(),
            signed_date: None,
        }
    }
}

/// An occupant in a create or add payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupantSpec {
    #[serde(flatten)]
    pub person: PersonRef,
    #[serde(default)]
    pub is_adult: bool,
    pub move_in_date: Option<NaiveDate>,
}

impl OccupantSpec {
    pub fn child(person: impl Into<PersonRef>) -> Self {
        Self {
            person: person.into(),
            is_adult: false,
            move_in_date: None,
        }
    }

    pub fn adult(person: impl Into<PersonRef>) -> Self {
        Self {
            person: person.into(),
            is_adult: true,
            move_in_date: None,
        }
    }
}

/// Input for adding a pet to a lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPetInput {
    pub name: String,
    pub species: PetSpecies,
    pub notes: Option<String>,
}

/// A resolved lessee link, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLessee {
    pub person_id: Uuid,
    pub signed_date: Option<NaiveDate>,
}

/// A resolved occupant link, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOccupant {
    pub person_id: Uuid,
    pub is_adult: bool,
    pub move_in_date: Option<NaiveDate>,
}

impl From<&LeaseLessee> for NewLessee {
    fn from(lessee: &LeaseLessee) -> Self {
        Self {
            person_id: lessee.person_id,
            signed_date: lessee.signed_date,
        }
    }
}

/// Occupants carried into a replacement lease keep their person, adult flag
/// and move-in date. The move-out date is not carried.
impl From<&LeaseOccupant> for NewOccupant {
    fn from(occupant: &LeaseOccupant) -> Self {
        Self {
            person_id: occupant.person_id,
            is_adult: occupant.is_adult,
            move_in_date: occupant.move_in_date,
        }
    }
}
