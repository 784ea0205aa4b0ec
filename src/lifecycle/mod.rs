//! The lease lifecycle engine.
//!
//! Every public operation takes the caller's user id, runs inside a single
//! [`UnitOfWork::atomically`] scope and returns a freshly read result, so a
//! caller never sees state that was not committed.
//!
//! The invariants kept here:
//!
//! - A property has at most one non-deleted lease that is `Active` or
//!   `MonthToMonth`.
//! - A lease that is neither voided nor deleted has at least one lessee.
//! - Adult occupants have an email and phone number.
//!
//! Lessees are appended in place but only removed through void+recreate:
//! the lease is voided and a replacement carrying the remaining lessees and
//! all occupants is created in the same unit.

pub mod cascade;
pub mod guard;
pub mod people;
pub mod ports;

use uuid::Uuid;

use crate::error::{LeaseError, LeaseResult};
use crate::models::*;

pub use cascade::{CascadePolicy, LeasePolicy, MemberKind};
pub use ports::{LeaseStore, PersonDirectory, PropertyDirectory, UnitOfWork};

use guard::{
    authorize, ensure_in_force, ensure_not_voided, ensure_property_vacant, validate_terms,
};
use people::PartyRole;

pub struct LeaseEngine<U> {
    store: U,
    policy: LeasePolicy,
}

impl<U: Clone> Clone for LeaseEngine<U> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy,
        }
    }
}

impl<U: UnitOfWork> LeaseEngine<U> {
    pub fn new(store: U) -> Self {
        Self::with_policy(store, LeasePolicy::default())
    }

    pub fn with_policy(store: U, policy: LeasePolicy) -> Self {
        Self { store, policy }
    }

    // ============================================================
    // Reads
    // ============================================================

    pub fn get_lease(&self, caller: Uuid, lease_id: Uuid) -> LeaseResult<LeaseDetails> {
        self.store
            .atomically(|repos| authorize(repos.find_lease(lease_id)?, lease_id, caller))
    }

    /// Read a lease even after soft deletion, with every link it ever had.
    pub fn audit_lease(&self, caller: Uuid, lease_id: Uuid) -> LeaseResult<LeaseDetails> {
        self.store.atomically(|repos| {
            authorize(repos.find_lease_for_audit(lease_id)?, lease_id, caller)
        })
    }

    pub fn property(&self, caller: Uuid, property_id: Uuid) -> LeaseResult<Property> {
        self.store.atomically(|repos| {
            authorize(repos.find_property(property_id)?, property_id, caller)
        })
    }

    pub fn property_leases(&self, caller: Uuid, property_id: Uuid) -> LeaseResult<Vec<Lease>> {
        self.store.atomically(|repos| {
            authorize(repos.find_property(property_id)?, property_id, caller)?;
            repos.list_leases_for_property(property_id)
        })
    }

    pub fn person(&self, caller: Uuid, person_id: Uuid) -> LeaseResult<Person> {
        self.store
            .atomically(|repos| authorize(repos.find_person(person_id)?, person_id, caller))
    }

    // ============================================================
    // People
    // ============================================================

    /// Add a person to the caller's directory. Only a name is required.
    pub fn create_person(&self, caller: Uuid, input: InlinePerson) -> LeaseResult<Person> {
        let person_ref = PersonRef::Inline(input);
        people::check_inline(&person_ref, PartyRole::Unattached)?;
        self.store.atomically(|repos| {
            people::resolve_person(repos, caller, &person_ref, PartyRole::Unattached)
        })
    }

    /// Soft-delete a person who is not on any lease in force.
    pub fn delete_person(&self, caller: Uuid, person_id: Uuid) -> LeaseResult<()> {
        self.store.atomically(|repos| {
            authorize(repos.find_person(person_id)?, person_id, caller)?;
            if repos.has_active_membership(person_id)? {
                return Err(LeaseError::validation(format!(
                    "person {} is still on an active lease",
                    person_id
                )));
            }
            repos.delete_person(person_id)?;
            Ok(())
        })
    }

    // ============================================================
    // Lease creation and updates
    // ============================================================

    pub fn create_lease(
        &self,
        caller: Uuid,
        input: CreateLeaseInput,
    ) -> LeaseResult<LeaseDetails> {
        let details = self.store.atomically(|repos| {
            authorize(
                repos.find_property(input.property_id)?,
                input.property_id,
                caller,
            )?;
            ensure_property_vacant(repos, input.property_id)?;
            validate_terms(&input.terms)?;
            people::check_specs(&input.lessees, &input.occupants)?;

            let lessees = input
                .lessees
                .iter()
                .map(|spec| people::resolve_lessee(repos, caller, spec))
                .collect::<LeaseResult<Vec<_>>>()?;
            let occupants = input
                .occupants
                .iter()
                .map(|spec| people::resolve_occupant(repos, caller, spec))
                .collect::<LeaseResult<Vec<_>>>()?;

            let lease_id = repos.insert_lease(&NewLease {
                owner_user_id: caller,
                property_id: input.property_id,
                terms: input.terms.clone(),
                lessees,
                occupants,
            })?;
            refetch(repos, lease_id)
        })?;

        tracing::info!(
            "Created lease {} on property {}",
            details.lease.id,
            details.lease.property_id
        );
        Ok(details)
    }

    /// Partially update terms and status. Status may move between `Active`
    /// and `MonthToMonth`, or to `Ended`; never to `Voided`.
    pub fn update_lease(
        &self,
        caller: Uuid,
        lease_id: Uuid,
        input: UpdateLeaseInput,
    ) -> LeaseResult<LeaseDetails> {
        self.store.atomically(|repos| {
            let details = authorize(repos.find_lease(lease_id)?, lease_id, caller)?;
            let lease = &details.lease;
            if input.status == Some(LeaseStatus::Voided) {
                return Err(LeaseError::validation(
                    "leases are voided by removing a lessee, not by update",
                ));
            }
            ensure_not_voided(lease)?;

            let status = input.status.unwrap_or(lease.status);
            if !lease.status.can_update_to(status) {
                return Err(LeaseError::validation(format!(
                    "cannot change lease status from {} to {}",
                    lease.status.as_str(),
                    status.as_str()
                )));
            }

            let terms = lease.terms().merged(&input);
            validate_terms(&terms)?;

            repos.update_lease(lease_id, &LeaseChanges { terms, status })?;
            refetch(repos, lease_id)
        })
    }

    /// Soft-delete a lease, cascading to its links per the engine policy.
    pub fn delete_lease(&self, caller: Uuid, lease_id: Uuid) -> LeaseResult<()> {
        self.store.atomically(|repos| {
            authorize(repos.find_lease(lease_id)?, lease_id, caller)?;
            repos.soft_delete_lease(lease_id, self.policy.cascade)?;
            Ok(())
        })?;

        tracing::info!("Soft-deleted lease {}", lease_id);
        Ok(())
    }

    // ============================================================
    // Membership
    // ============================================================

    /// Append a lessee to a lease in place.
    pub fn add_lessee(
        &self,
        caller: Uuid,
        lease_id: Uuid,
        spec: LesseeSpec,
    ) -> LeaseResult<LeaseDetails> {
        self.store.atomically(|repos| {
            let details = open_lease(repos, caller, lease_id)?;
            let lessee = people::resolve_lessee(repos, caller, &spec)?;
            if details.has_lessee(lessee.person_id) {
                return Err(LeaseError::conflict(format!(
                    "person {} is already a lessee on lease {}",
                    lessee.person_id, lease_id
                )));
            }
            repos.add_lessee(lease_id, &lessee)?;
            refetch(repos, lease_id)
        })
    }

    pub fn add_occupant(
        &self,
        caller: Uuid,
        lease_id: Uuid,
        spec: OccupantSpec,
    ) -> LeaseResult<LeaseDetails> {
        self.store.atomically(|repos| {
            let details = open_lease(repos, caller, lease_id)?;
            let occupant = people::resolve_occupant(repos, caller, &spec)?;
            if details.has_occupant(occupant.person_id) {
                return Err(LeaseError::conflict(format!(
                    "person {} is already an occupant on lease {}",
                    occupant.person_id, lease_id
                )));
            }
            repos.add_occupant(lease_id, &occupant)?;
            refetch(repos, lease_id)
        })
    }

    pub fn remove_occupant(
        &self,
        caller: Uuid,
        lease_id: Uuid,
        occupant_id: Uuid,
    ) -> LeaseResult<LeaseDetails> {
        self.store.atomically(|repos| {
            open_lease(repos, caller, lease_id)?;
            if !repos.remove_occupant(lease_id, occupant_id)? {
                return Err(LeaseError::not_found("occupant", occupant_id));
            }
            refetch(repos, lease_id)
        })
    }

    pub fn add_pet(
        &self,
        caller: Uuid,
        lease_id: Uuid,
        input: AddPetInput,
    ) -> LeaseResult<LeaseDetails> {
        self.store.atomically(|repos| {
            open_lease(repos, caller, lease_id)?;
            if input.name.trim().is_empty() {
                return Err(LeaseError::validation("pet name is required"));
            }
            repos.add_pet(lease_id, &input)?;
            refetch(repos, lease_id)
        })
    }

    pub fn remove_pet(
        &self,
        caller: Uuid,
        lease_id: Uuid,
        pet_id: Uuid,
    ) -> LeaseResult<LeaseDetails> {
        self.store.atomically(|repos| {
            open_lease(repos, caller, lease_id)?;
            if !repos.remove_pet(lease_id, pet_id)? {
                return Err(LeaseError::not_found("pet", pet_id));
            }
            refetch(repos, lease_id)
        })
    }

    // ============================================================
    // Void + recreate
    // ============================================================

    /// Remove a lessee by voiding the lease and creating its replacement.
    ///
    /// The replacement keeps the remaining lessees with their signed dates and
    /// every live occupant, and takes its terms from `input.new_lease`. Pets are
    /// carried only when the engine policy says so. Returns the new lease id.
    ///
    /// Only a lease in force can be replaced, and every carried person must
    /// still be in the directory. Removing the last lessee fails with
    /// `Validation` and leaves the original lease untouched.
    pub fn remove_lessee_via_void_recreate(
        &self,
        caller: Uuid,
        lease_id: Uuid,
        input: RemoveLesseeInput,
    ) -> LeaseResult<Uuid> {
        let new_lease_id = self.store.atomically(|repos| {
            let details = open_lease(repos, caller, lease_id)?;
            ensure_in_force(&details.lease)?;
            let reason = input.voided_reason.trim();
            if reason.is_empty() {
                return Err(LeaseError::validation("voided_reason is required"));
            }
            validate_terms(&input.new_lease)?;
            if !details.has_lessee(input.person_id) {
                return Err(LeaseError::not_found("lessee", input.person_id));
            }

            // The void has to land first: the replacement would otherwise
            // collide with this lease in the one-active-lease check.
            repos.void_lease(lease_id, reason)?;

            let lessees: Vec<NewLessee> = details
                .active_lessees()
                .filter(|l| l.person_id != input.person_id)
                .map(NewLessee::from)
                .collect();
            if lessees.is_empty() {
                return Err(LeaseError::validation("cannot remove last lessee"));
            }
            let occupants: Vec<NewOccupant> =
                details.active_occupants().map(NewOccupant::from).collect();

            // Carried people must still be in the directory.
            let carried = lessees
                .iter()
                .map(|l| l.person_id)
                .chain(occupants.iter().map(|o| o.person_id));
            for person_id in carried {
                if repos.find_person(person_id)?.is_none() {
                    return Err(LeaseError::validation(format!(
                        "person {} has been deleted and cannot be carried over",
                        person_id
                    )));
                }
            }

            ensure_property_vacant(repos, details.lease.property_id)?;
            let new_lease_id = repos.insert_lease(&NewLease {
                owner_user_id: details.lease.owner_user_id,
                property_id: details.lease.property_id,
                terms: input.new_lease.clone(),
                lessees,
                occupants,
            })?;

            if self.policy.carry_pets_on_replacement {
                for pet in details.pets.iter().filter(|p| p.deleted_at.is_none()) {
                    repos.add_pet(
                        new_lease_id,
                        &AddPetInput {
                            name: pet.name.clone(),
                            species: pet.species,
                            notes: pet.notes.clone(),
                        },
                    )?;
                }
            }
            Ok(new_lease_id)
        })?;

        tracing::info!(
            "Voided lease {} (removed lessee {}), replaced by {}",
            lease_id,
            input.person_id,
            new_lease_id
        );
        Ok(new_lease_id)
    }
}

/// Fetch a lease the caller owns and may still change.
fn open_lease<R: LeaseStore>(
    repos: &R,
    caller: Uuid,
    lease_id: Uuid,
) -> LeaseResult<LeaseDetails> {
    let details = authorize(repos.find_lease(lease_id)?, lease_id, caller)?;
    ensure_not_voided(&details.lease)?;
    Ok(details)
}

/// Re-read a lease after writing to it.
fn refetch<R: LeaseStore>(repos: &R, lease_id: Uuid) -> LeaseResult<LeaseDetails> {
    repos
        .find_lease(lease_id)?
        .ok_or(LeaseError::not_found("lease", lease_id))
}
