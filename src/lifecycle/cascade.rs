//! Policies deciding which membership rows follow their lease.

/// A kind of membership row owned by a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Lessee,
    Occupant,
    Pet,
}

impl MemberKind {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Lessee => "lease_lessees",
            Self::Occupant => "lease_occupants",
            Self::Pet => "lease_pets",
        }
    }
}

/// Which membership rows are soft-deleted together with their lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadePolicy {
    pub lessees: bool,
    pub occupants: bool,
    pub pets: bool,
}

impl CascadePolicy {
    /// People links follow the lease; pets stay untouched.
    pub const PEOPLE_ONLY: Self = Self {
        lessees: true,
        occupants: true,
        pets: false,
    };

    pub const ALL: Self = Self {
        lessees: true,
        occupants: true,
        pets: true,
    };

    pub fn targets(&self) -> Vec<MemberKind> {
        [
            (self.lessees, MemberKind::Lessee),
            (self.occupants, MemberKind::Occupant),
            (self.pets, MemberKind::Pet),
        ]
        .into_iter()
        .filter_map(|(enabled, kind)| enabled.then_some(kind))
        .collect()
    }
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self::PEOPLE_ONLY
    }
}

/// Membership policy applied by the lease engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeasePolicy {
    /// Rows soft-deleted with a lease.
    pub cascade: CascadePolicy,
    /// Whether void+recreate copies pets onto the replacement lease.
    pub carry_pets_on_replacement: bool,
}

impl Default for LeasePolicy {
    fn default() -> Self {
        Self {
            cascade: CascadePolicy::default(),
            carry_pets_on_replacement: false,
        }
    }
}
