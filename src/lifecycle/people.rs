//! Find-or-create resolution of lessees and occupants.
//!
//! Lease payloads name people either by id or inline. Both shapes go through
//! [`resolve_person`], so lease creation, lessee append and occupant append
//! apply exactly the same rules.

use std::collections::HashSet;

use uuid::Uuid;

use super::guard::authorize;
use super::ports::PersonDirectory;
use crate::error::{LeaseError, LeaseResult};
use crate::models::*;

/// The part a person plays on a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    Lessee,
    Occupant { is_adult: bool },
    /// A directory entry not yet attached to any lease.
    Unattached,
}

impl PartyRole {
    fn label(&self) -> &'static str {
        match self {
            Self::Lessee => "lessee",
            Self::Occupant { is_adult: true } => "adult occupant",
            Self::Occupant { is_adult: false } => "occupant",
            Self::Unattached => "person",
        }
    }

    /// Whether inline payloads for this role must carry email and phone.
    fn inline_needs_contact(&self) -> bool {
        match self {
            Self::Lessee => true,
            Self::Occupant { is_adult } => *is_adult,
            Self::Unattached => false,
        }
    }

    /// Whether an existing person must already have email and phone on file.
    fn record_needs_contact(&self) -> bool {
        matches!(self, Self::Occupant { is_adult: true })
    }
}

/// Field checks that need no directory access. Run before any write so a
/// malformed payload never creates anyone.
pub fn check_inline(person: &PersonRef, role: PartyRole) -> LeaseResult<()> {
    let PersonRef::Inline(inline) = person else {
        return Ok(());
    };
    let missing = inline.missing_fields(role.inline_needs_contact());
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LeaseError::validation(format!(
            "{} is missing {}",
            role.label(),
            missing.join(", ")
        )))
    }
}

/// Resolve a reference to a person owned by `caller`, creating it if inline.
pub fn resolve_person<D: PersonDirectory>(
    directory: &D,
    caller: Uuid,
    person: &PersonRef,
    role: PartyRole,
) -> LeaseResult<Person> {
    check_inline(person, role)?;
    match person {
        PersonRef::Existing { person_id } => {
            let found = authorize(directory.find_person(*person_id)?, *person_id, caller)?;
            if role.record_needs_contact() && !found.has_contact_info() {
                return Err(LeaseError::validation(format!(
                    "{} {} needs an email and phone number on file",
                    role.label(),
                    person_id
                )));
            }
            Ok(found)
        }
        PersonRef::Inline(inline) => directory.create_person(caller, inline),
    }
}

/// Check every spec of a lease payload without touching the directory.
pub fn check_specs(lessees: &[LesseeSpec], occupants: &[OccupantSpec]) -> LeaseResult<()> {
    if lessees.is_empty() {
        return Err(LeaseError::validation("at least one lessee is required"));
    }
    for spec in lessees {
        check_inline(&spec.person, PartyRole::Lessee)?;
    }
    for spec in occupants {
        check_inline(
            &spec.person,
            PartyRole::Occupant {
                is_adult: spec.is_adult,
            },
        )?;
    }

    let mut seen = HashSet::new();
    for spec in lessees {
        if let PersonRef::Existing { person_id } = spec.person {
            if !seen.insert(person_id) {
                return Err(LeaseError::validation(format!(
                    "person {} is listed more than once as a lessee",
                    person_id
                )));
            }
        }
    }
    Ok(())
}

pub fn resolve_lessee<D: PersonDirectory>(
    directory: &D,
    caller: Uuid,
    spec: &LesseeSpec,
) -> LeaseResult<NewLessee> {
    let person = resolve_person(directory, caller, &spec.person, PartyRole::Lessee)?;
    Ok(NewLessee {
        person_id: person.id,
        signed_date: spec.signed_date,
    })
}

pub fn resolve_occupant<D: PersonDirectory>(
    directory: &D,
    caller: Uuid,
    spec: &OccupantSpec,
) -> LeaseResult<NewOccupant> {
    let role = PartyRole::Occupant {
        is_adult: spec.is_adult,
    };
    let person = resolve_person(directory, caller, &spec.person, role)?;
    Ok(NewOccupant {
        person_id: person.id,
        is_adult: spec.is_adult,
        move_in_date: spec.move_in_date,
    })
}
