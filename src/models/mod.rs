//! Domain models for Leasehold.
//!
//! # Core Concepts
//!
//! ## Aggregates
//!
//! - [`Lease`]: A rental agreement scoped to one [`Property`] and one owning user.
//!   At most one lease per property is ever in force (`Active` or `MonthToMonth`).
//! - [`LeaseDetails`]: A lease hydrated with its membership links.
//!
//! ## Membership Links
//!
//! These rows are owned by their lease and are soft-deleted with it:
//!
//! - [`LeaseLessee`]: A [`Person`] who signs the lease.
//! - [`LeaseOccupant`]: A [`Person`] who lives at the property without signing.
//! - [`LeasePet`]: A pet attached to the lease itself.
//!
//! ## Referenced Entities
//!
//! - [`Person`]: An individual owned by a user account, referenced by id from any
//!   number of leases.
//! - [`Property`]: A rentable unit owned by a user account.

mod lease;
mod member;
mod person;
mod property;

pub use lease::*;
pub use member::*;
pub use person::*;
pub use property::*;
