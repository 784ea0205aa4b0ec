use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::member::{
    LeaseLessee, LeaseOccupant, LeasePet, LesseeSpec, NewLessee, NewOccupant, OccupantSpec,
};

/// A rental agreement scoped to one property and one owning user.
///
/// # Lifecycle
/// Leases are created `Active`. An explicit update may move them to
/// `MonthToMonth` or `Ended`. `Voided` is only reached through void+recreate,
/// which always records a reason. Soft deletion (`deleted_at`) is independent
/// of status and cascades to the lease's membership links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub property_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Option<Decimal>,
    pub security_deposit: Option<Decimal>,
    pub deposit_paid_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: LeaseStatus,
    /// Present if and only if the lease is `Voided`.
    pub voided_reason: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Lease {
    pub fn terms(&self) -> LeaseTerms {
        LeaseTerms {
            start_date: self.start_date,
            end_date: self.end_date,
            monthly_rent: self.monthly_rent,
            security_deposit: self.security_deposit,
            deposit_paid_date: self.deposit_paid_date,
            notes: self.notes.clone(),
        }
    }
}

/// The status of a lease.
///
/// - `Active`: In force for a fixed term
/// - `MonthToMonth`: In force, rolling monthly past its term
/// - `Ended`: No longer in force
/// - `Voided`: Replaced by another lease; irreversible
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Active,
    MonthToMonth,
    Ended,
    Voided,
}

impl LeaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::MonthToMonth => "month_to_month",
            Self::Ended => "ended",
            Self::Voided => "voided",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "month_to_month" => Some(Self::MonthToMonth),
            "ended" => Some(Self::Ended),
            "voided" => Some(Self::Voided),
            _ => None,
        }
    }

    /// Whether a lease in this status occupies its property's single
    /// in-force slot.
    pub fn is_current(&self) -> bool {
        matches!(self, Self::Active | Self::MonthToMonth)
    }

    /// Transitions reachable through a plain update. `Voided` is never one
    /// of them, and `Ended` is terminal.
    pub fn can_update_to(&self, next: LeaseStatus) -> bool {
        use LeaseStatus::*;
        match (self, next) {
            (_, Voided) | (Voided, _) => false,
            (current, next) if *current == next => true,
            (Active, MonthToMonth) | (MonthToMonth, Active) => true,
            (Active, Ended) | (MonthToMonth, Ended) => true,
            _ => false,
        }
    }
}

/// The financial and calendar terms of a lease.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaseTerms {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Must be positive when present.
    pub monthly_rent: Option<Decimal>,
    /// Must not be negative when present.
    pub security_deposit: Option<Decimal>,
    pub deposit_paid_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl LeaseTerms {
    pub fn starting(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date: None,
            monthly_rent: None,
            security_deposit: None,
            deposit_paid_date: None,
            notes: None,
        }
    }

    /// Apply a partial update. Absent fields keep their current value.
    pub fn merged(&self, update: &UpdateLeaseInput) -> Self {
        Self {
            start_date: self.start_date,
            end_date: update.end_date.or(self.end_date),
            monthly_rent: update.monthly_rent.or(self.monthly_rent),
            security_deposit: update.security_deposit.or(self.security_deposit),
            deposit_paid_date: update.deposit_paid_date.or(self.deposit_paid_date),
            notes: update.notes.clone().or_else(|| self.notes.clone()),
        }
    }
}

/// A lease together with its live membership links.
///
/// The `lease` fields are flattened into the JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseDetails {
    #[serde(flatten)]
    pub lease: Lease,
    pub lessees: Vec<LeaseLessee>,
    pub occupants: Vec<LeaseOccupant>,
    pub pets: Vec<LeasePet>,
}

impl LeaseDetails {
    /// Lessee links that have not been soft-deleted.
    pub fn active_lessees(&self) -> impl Iterator<Item = &LeaseLessee> {
        self.lessees.iter().filter(|l| l.deleted_at.is_none())
    }

    /// Occupant links that have not been soft-deleted.
    pub fn active_occupants(&self) -> impl Iterator<Item = &LeaseOccupant> {
        self.occupants.iter().filter(|o| o.deleted_at.is_none())
    }

    pub fn has_lessee(&self, person_id: Uuid) -> bool {
        self.active_lessees().any(|l| l.person_id == person_id)
    }

    pub fn has_occupant(&self, person_id: Uuid) -> bool {
        self.active_occupants().any(|o| o.person_id == person_id)
    }
}

/// Input for creating a lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeaseInput {
    pub property_id: Uuid,
    #[serde(flatten)]
    pub terms: LeaseTerms,
    /// At least one lessee is required.
    pub lessees: Vec<LesseeSpec>,
    #[serde(default)]
    pub occupants: Vec<OccupantSpec>,
}

/// Input for updating a lease. All fields are optional for partial updates.
///
/// The start date and lessee roster are not updatable; changing the roster
/// goes through void+recreate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLeaseInput {
    pub end_date: Option<NaiveDate>,
    pub monthly_rent: Option<Decimal>,
    pub security_deposit: Option<Decimal>,
    pub deposit_paid_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: Option<LeaseStatus>,
}

/// Input for removing a lessee by voiding the lease and recreating it
/// without them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveLesseeInput {
    pub person_id: Uuid,
    pub voided_reason: String,
    /// Terms of the replacement lease.
    pub new_lease: LeaseTerms,
}

/// Result of a void+recreate, as reported to API callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaseReplacement {
    pub voided_lease_id: Uuid,
    pub new_lease_id: Uuid,
}

/// A fully resolved lease, ready to be written in one unit.
#[derive(Debug, Clone)]
pub struct NewLease {
    pub owner_user_id: Uuid,
    pub property_id: Uuid,
    pub terms: LeaseTerms,
    pub lessees: Vec<NewLessee>,
    pub occupants: Vec<NewOccupant>,
}

/// Column-level changes applied by the store on update.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaseChanges {
    pub terms: LeaseTerms,
    pub status: LeaseStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_and_month_to_month_are_current() {
        assert!(LeaseStatus::Active.is_current());
        assert!(LeaseStatus::MonthToMonth.is_current());
        assert!(!LeaseStatus::Ended.is_current());
        assert!(!LeaseStatus::Voided.is_current());
    }

    #[test]
    fn updates_never_reach_or_leave_voided() {
        for status in [
            LeaseStatus::Active,
            LeaseStatus::MonthToMonth,
            LeaseStatus::Ended,
            LeaseStatus::Voided,
        ] {
            assert!(!status.can_update_to(LeaseStatus::Voided));
            assert!(!LeaseStatus::Voided.can_update_to(status));
        }
    }

    #[test]
    fn ended_is_terminal() {
        assert!(LeaseStatus::Active.can_update_to(LeaseStatus::Ended));
        assert!(LeaseStatus::MonthToMonth.can_update_to(LeaseStatus::Ended));
        assert!(!LeaseStatus::Ended.can_update_to(LeaseStatus::Active));
        assert!(!LeaseStatus::Ended.can_update_to(LeaseStatus::MonthToMonth));
        assert!(LeaseStatus::Ended.can_update_to(LeaseStatus::Ended));
    }

    #[test]
    fn status_strings_round_trip() {
        assert_eq!(
            LeaseStatus::from_str(LeaseStatus::MonthToMonth.as_str()),
            Some(LeaseStatus::MonthToMonth)
        );
        assert_eq!(LeaseStatus::from_str("pending"), None);
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let terms = LeaseTerms {
            monthly_rent: Some(Decimal::new(150000, 2)),
            notes: Some("corner unit".to_string()),
            ..LeaseTerms::starting(start)
        };

        let merged = terms.merged(&UpdateLeaseInput {
            monthly_rent: Some(Decimal::new(160000, 2)),
            ..UpdateLeaseInput::default()
        });

        assert_eq!(merged.start_date, start);
        assert_eq!(merged.monthly_rent, Some(Decimal::new(160000, 2)));
        assert_eq!(merged.notes.as_deref(), Some("corner unit"));
    }
}
