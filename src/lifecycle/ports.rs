//! Collaborator interfaces consumed by the lease engine.
//!
//! The engine never talks to storage directly. Every operation runs inside a
//! [`UnitOfWork`], which hands it a set of repositories that share one atomic
//! scope: either every write made through them commits, or none does.

use uuid::Uuid;

use super::cascade::CascadePolicy;
use crate::error::LeaseResult;
use crate::models::*;

/// Read access to properties.
pub trait PropertyDirectory {
    fn find_property(&self, id: Uuid) -> LeaseResult<Option<Property>>;
}

/// Storage for people. Soft-deleted people are invisible to `find_person`.
pub trait PersonDirectory {
    fn find_person(&self, id: Uuid) -> LeaseResult<Option<Person>>;

    /// Insert a person from inline fields. Callers validate the fields first.
    fn create_person(&self, owner_user_id: Uuid, input: &InlinePerson) -> LeaseResult<Person>;

    fn delete_person(&self, id: Uuid) -> LeaseResult<bool>;

    /// Whether the person holds a live lessee or occupant link on a
    /// non-deleted lease that is `Active` or `MonthToMonth`.
    fn has_active_membership(&self, id: Uuid) -> LeaseResult<bool>;
}

/// Storage for lease aggregates and their membership links.
///
/// There is no in-place lessee removal: dropping a lessee goes through
/// [`LeaseStore::void_lease`] followed by a fresh [`LeaseStore::insert_lease`].
pub trait LeaseStore {
    /// A non-deleted lease with its live links.
    fn find_lease(&self, id: Uuid) -> LeaseResult<Option<LeaseDetails>>;

    /// A lease regardless of deletion, with every link it ever had.
    fn find_lease_for_audit(&self, id: Uuid) -> LeaseResult<Option<LeaseDetails>>;

    /// The non-deleted `Active` or `MonthToMonth` lease on a property, if any.
    fn find_active_lease_for_property(&self, property_id: Uuid) -> LeaseResult<Option<Lease>>;

    /// Non-deleted leases on a property, newest first.
    fn list_leases_for_property(&self, property_id: Uuid) -> LeaseResult<Vec<Lease>>;

    /// Write a lease and its links. Returns the new lease id.
    fn insert_lease(&self, lease: &NewLease) -> LeaseResult<Uuid>;

    fn update_lease(&self, id: Uuid, changes: &LeaseChanges) -> LeaseResult<bool>;

    /// Mark the lease deleted and cascade to the link kinds the policy names.
    fn soft_delete_lease(&self, id: Uuid, policy: CascadePolicy) -> LeaseResult<bool>;

    fn void_lease(&self, id: Uuid, reason: &str) -> LeaseResult<bool>;

    fn add_lessee(&self, lease_id: Uuid, lessee: &NewLessee) -> LeaseResult<Uuid>;

    fn add_occupant(&self, lease_id: Uuid, occupant: &NewOccupant) -> LeaseResult<Uuid>;

    /// Soft-delete an occupant link. `false` if it is not a live link of the lease.
    fn remove_occupant(&self, lease_id: Uuid, occupant_id: Uuid) -> LeaseResult<bool>;

    fn add_pet(&self, lease_id: Uuid, pet: &AddPetInput) -> LeaseResult<Uuid>;

    /// Soft-delete a pet. `false` if it is not a live pet of the lease.
    fn remove_pet(&self, lease_id: Uuid, pet_id: Uuid) -> LeaseResult<bool>;
}

/// An atomic scope over all three collaborators.
pub trait UnitOfWork: Send + Sync {
    type Repos<'t>: LeaseStore + PersonDirectory + PropertyDirectory;

    /// Run `work` atomically. An `Err` from `work` discards every write it made.
    fn atomically<T, F>(&self, work: F) -> LeaseResult<T>
    where
        F: FnOnce(&Self::Repos<'_>) -> LeaseResult<T>;
}
