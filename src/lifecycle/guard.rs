//! Ownership and invariant checks shared by every lease operation.

use rust_decimal::Decimal;
use uuid::Uuid;

use super::ports::LeaseStore;
use crate::error::{LeaseError, LeaseResult};
use crate::models::*;

/// An entity owned by a user account.
pub trait Owned {
    const ENTITY: &'static str;

    fn owner_user_id(&self) -> Uuid;
}

impl Owned for Property {
    const ENTITY: &'static str = "property";

    fn owner_user_id(&self) -> Uuid {
        self.owner_user_id
    }
}

impl Owned for Person {
    const ENTITY: &'static str = "person";

    fn owner_user_id(&self) -> Uuid {
        self.owner_user_id
    }
}

impl Owned for LeaseDetails {
    const ENTITY: &'static str = "lease";

    fn owner_user_id(&self) -> Uuid {
        self.lease.owner_user_id
    }
}

/// Turn a lookup result into the entity, or `NotFound` if it is absent and
/// `Forbidden` if another user owns it.
pub fn authorize<T: Owned>(found: Option<T>, id: Uuid, caller: Uuid) -> LeaseResult<T> {
    let entity = found.ok_or(LeaseError::NotFound {
        entity: T::ENTITY,
        id,
    })?;
    if entity.owner_user_id() != caller {
        return Err(LeaseError::Forbidden {
            entity: T::ENTITY,
            id,
        });
    }
    Ok(entity)
}

/// Fail with `Conflict` if the property already has a lease in force.
pub fn ensure_property_vacant<S: LeaseStore>(store: &S, property_id: Uuid) -> LeaseResult<()> {
    match store.find_active_lease_for_property(property_id)? {
        Some(existing) => Err(LeaseError::conflict(format!(
            "property {} already has an active lease ({})",
            property_id, existing.id
        ))),
        None => Ok(()),
    }
}

/// Void+recreate only replaces a lease that is still in force.
pub fn ensure_in_force(lease: &Lease) -> LeaseResult<()> {
    if !lease.status.is_current() {
        return Err(LeaseError::validation(format!(
            "lease {} is {} and cannot be replaced",
            lease.id,
            lease.status.as_str()
        )));
    }
    Ok(())
}

/// Voided leases accept no further changes.
pub fn ensure_not_voided(lease: &Lease) -> LeaseResult<()> {
    if lease.status == LeaseStatus::Voided {
        return Err(LeaseError::validation(format!(
            "lease {} has been voided",
            lease.id
        )));
    }
    Ok(())
}

pub fn validate_terms(terms: &LeaseTerms) -> LeaseResult<()> {
    if let Some(rent) = terms.monthly_rent {
        if rent <= Decimal::ZERO {
            return Err(LeaseError::validation("monthly_rent must be greater than zero"));
        }
    }
    if let Some(deposit) = terms.security_deposit {
        if deposit < Decimal::ZERO {
            return Err(LeaseError::validation("security_deposit must not be negative"));
        }
    }
    if let Some(end) = terms.end_date {
        if end < terms.start_date {
            return Err(LeaseError::validation("end_date must not precede start_date"));
        }
    }
    Ok(())
}
