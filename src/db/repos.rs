use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{LeaseError, LeaseResult};
use crate::lifecycle::{CascadePolicy, LeaseStore, PersonDirectory, PropertyDirectory};
use crate::models::*;

const LEASE_COLUMNS: &str = "id, owner_user_id, property_id, start_date, end_date, monthly_rent,
     security_deposit, deposit_paid_date, notes, status, voided_reason, voided_at,
     created_at, updated_at, deleted_at";

const PERSON_COLUMNS: &str = "p.id, p.owner_user_id, p.first_name, p.middle_name, p.last_name,
     p.email, p.phone, p.notes, p.created_at, p.updated_at";

/// Repositories bound to one open transaction.
pub struct SqliteRepos<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRepos<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert_property(
        &self,
        owner_user_id: Uuid,
        input: &CreatePropertyInput,
    ) -> LeaseResult<Property> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(LeaseError::validation("property name is required"));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO properties (id, owner_user_id, name, address, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                owner_user_id.to_string(),
                name,
                &input.address,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Property {
            id,
            owner_user_id,
            name: name.to_string(),
            address: input.address.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn load_details(&self, id: Uuid, include_deleted: bool) -> LeaseResult<Option<LeaseDetails>> {
        let lease_filter = if include_deleted {
            ""
        } else {
            " AND deleted_at IS NULL"
        };
        let lease = self
            .conn
            .query_row(
                &format!("SELECT {LEASE_COLUMNS} FROM leases WHERE id = ?{lease_filter}"),
                [id.to_string()],
                lease_from_row,
            )
            .optional()?;
        let Some(lease) = lease else {
            return Ok(None);
        };

        let link_filter = if include_deleted {
            ""
        } else {
            " AND l.deleted_at IS NULL"
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT l.id, l.lease_id, l.person_id, l.signed_date, l.created_at, l.deleted_at,
                    {PERSON_COLUMNS}
             FROM lease_lessees l JOIN people p ON p.id = l.person_id
             WHERE l.lease_id = ?{link_filter} ORDER BY l.rowid"
        ))?;
        let lessees = stmt
            .query_map([id.to_string()], |row| {
                Ok(LeaseLessee {
                    id: uuid_at(row, 0)?,
                    lease_id: uuid_at(row, 1)?,
                    person_id: uuid_at(row, 2)?,
                    signed_date: opt_date_at(row, 3)?,
                    created_at: timestamp_at(row, 4)?,
                    deleted_at: opt_timestamp_at(row, 5)?,
                    person: person_from_row(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT l.id, l.lease_id, l.person_id, l.is_adult, l.move_in_date, l.move_out_date,
                    l.created_at, l.deleted_at, {PERSON_COLUMNS}
             FROM lease_occupants l JOIN people p ON p.id = l.person_id
             WHERE l.lease_id = ?{link_filter} ORDER BY l.rowid"
        ))?;
        let occupants = stmt
            .query_map([id.to_string()], |row| {
                Ok(LeaseOccupant {
                    id: uuid_at(row, 0)?,
                    lease_id: uuid_at(row, 1)?,
                    person_id: uuid_at(row, 2)?,
                    is_adult: row.get(3)?,
                    move_in_date: opt_date_at(row, 4)?,
                    move_out_date: opt_date_at(row, 5)?,
                    created_at: timestamp_at(row, 6)?,
                    deleted_at: opt_timestamp_at(row, 7)?,
                    person: person_from_row(row, 8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT l.id, l.lease_id, l.name, l.species, l.notes, l.created_at, l.deleted_at
             FROM lease_pets l WHERE l.lease_id = ?{link_filter} ORDER BY l.rowid"
        ))?;
        let pets = stmt
            .query_map([id.to_string()], |row| {
                Ok(LeasePet {
                    id: uuid_at(row, 0)?,
                    lease_id: uuid_at(row, 1)?,
                    name: row.get(2)?,
                    species: parse_at(row, 3, |s| {
                        PetSpecies::from_str(s).ok_or_else(|| UnknownValue::new("species", s))
                    })?,
                    notes: row.get(4)?,
                    created_at: timestamp_at(row, 5)?,
                    deleted_at: opt_timestamp_at(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(LeaseDetails {
            lease,
            lessees,
            occupants,
            pets,
        }))
    }
}

// ============================================================
// Properties
// ============================================================

impl PropertyDirectory for SqliteRepos<'_> {
    fn find_property(&self, id: Uuid) -> LeaseResult<Option<Property>> {
        let property = self
            .conn
            .query_row(
                "SELECT id, owner_user_id, name, address, created_at, updated_at
                 FROM properties WHERE id = ?",
                [id.to_string()],
                |row| {
                    Ok(Property {
                        id: uuid_at(row, 0)?,
                        owner_user_id: uuid_at(row, 1)?,
                        name: row.get(2)?,
                        address: row.get(3)?,
                        created_at: timestamp_at(row, 4)?,
                        updated_at: timestamp_at(row, 5)?,
                    })
                },
            )
            .optional()?;
        Ok(property)
    }
}

// ============================================================
// People
// ============================================================

impl PersonDirectory for SqliteRepos<'_> {
    fn find_person(&self, id: Uuid) -> LeaseResult<Option<Person>> {
        let person = self
            .conn
            .query_row(
                &format!(
                    "SELECT {PERSON_COLUMNS} FROM people p
                     WHERE p.id = ? AND p.deleted_at IS NULL"
                ),
                [id.to_string()],
                |row| person_from_row(row, 0),
            )
            .optional()?;
        Ok(person)
    }

    fn create_person(&self, owner_user_id: Uuid, input: &InlinePerson) -> LeaseResult<Person> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let person = Person {
            id,
            owner_user_id,
            first_name: cleaned(&input.first_name).unwrap_or_default(),
            middle_name: cleaned(&input.middle_name),
            last_name: cleaned(&input.last_name).unwrap_or_default(),
            email: cleaned(&input.email),
            phone: cleaned(&input.phone),
            notes: cleaned(&input.notes),
            created_at: now,
            updated_at: now,
        };

        self.conn.execute(
            "INSERT INTO people (id, owner_user_id, first_name, middle_name, last_name, email,
                                 phone, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                owner_user_id.to_string(),
                &person.first_name,
                &person.middle_name,
                &person.last_name,
                &person.email,
                &person.phone,
                &person.notes,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(person)
    }

    fn delete_person(&self, id: Uuid) -> LeaseResult<bool> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE people SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            (&now, &now, id.to_string()),
        )?;
        Ok(rows > 0)
    }

    fn has_active_membership(&self, id: Uuid) -> LeaseResult<bool> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS (
                 SELECT 1 FROM lease_lessees l JOIN leases s ON s.id = l.lease_id
                 WHERE l.person_id = ?1 AND l.deleted_at IS NULL AND s.deleted_at IS NULL
                   AND s.status IN ('active', 'month_to_month')
                 UNION ALL
                 SELECT 1 FROM lease_occupants o JOIN leases s ON s.id = o.lease_id
                 WHERE o.person_id = ?1 AND o.deleted_at IS NULL AND s.deleted_at IS NULL
                   AND s.status IN ('active', 'month_to_month')
             )",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(found)
    }
}

// ============================================================
// Leases
// ============================================================

impl LeaseStore for SqliteRepos<'_> {
    fn find_lease(&self, id: Uuid) -> LeaseResult<Option<LeaseDetails>> {
        self.load_details(id, false)
    }

    fn find_lease_for_audit(&self, id: Uuid) -> LeaseResult<Option<LeaseDetails>> {
        self.load_details(id, true)
    }

    fn find_active_lease_for_property(&self, property_id: Uuid) -> LeaseResult<Option<Lease>> {
        let lease = self
            .conn
            .query_row(
                &format!(
                    "SELECT {LEASE_COLUMNS} FROM leases
                     WHERE property_id = ? AND deleted_at IS NULL
                       AND status IN ('active', 'month_to_month')"
                ),
                [property_id.to_string()],
                lease_from_row,
            )
            .optional()?;
        Ok(lease)
    }

    fn list_leases_for_property(&self, property_id: Uuid) -> LeaseResult<Vec<Lease>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LEASE_COLUMNS} FROM leases
             WHERE property_id = ? AND deleted_at IS NULL
             ORDER BY start_date DESC, rowid DESC"
        ))?;
        let leases = stmt
            .query_map([property_id.to_string()], lease_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(leases)
    }

    fn insert_lease(&self, lease: &NewLease) -> LeaseResult<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let terms = &lease.terms;

        self.conn
            .execute(
                "INSERT INTO leases (id, owner_user_id, property_id, start_date, end_date,
                                     monthly_rent, security_deposit, deposit_paid_date, notes,
                                     status, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?)",
                (
                    id.to_string(),
                    lease.owner_user_id.to_string(),
                    lease.property_id.to_string(),
                    terms.start_date.to_string(),
                    terms.end_date.map(|d| d.to_string()),
                    terms.monthly_rent.map(|d| d.to_string()),
                    terms.security_deposit.map(|d| d.to_string()),
                    terms.deposit_paid_date.map(|d| d.to_string()),
                    &terms.notes,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ),
            )
            .map_err(|e| exclusivity_violation(e, lease.property_id))?;

        for lessee in &lease.lessees {
            self.add_lessee(id, lessee)?;
        }
        for occupant in &lease.occupants {
            self.add_occupant(id, occupant)?;
        }

        Ok(id)
    }

    fn update_lease(&self, id: Uuid, changes: &LeaseChanges) -> LeaseResult<bool> {
        let terms = &changes.terms;
        let rows = self.conn.execute(
            "UPDATE leases SET end_date = ?, monthly_rent = ?, security_deposit = ?,
                               deposit_paid_date = ?, notes = ?, status = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL",
            (
                terms.end_date.map(|d| d.to_string()),
                terms.monthly_rent.map(|d| d.to_string()),
                terms.security_deposit.map(|d| d.to_string()),
                terms.deposit_paid_date.map(|d| d.to_string()),
                &terms.notes,
                changes.status.as_str(),
                Utc::now().to_rfc3339(),
                id.to_string(),
            ),
        )?;
        Ok(rows > 0)
    }

    fn soft_delete_lease(&self, id: Uuid, policy: CascadePolicy) -> LeaseResult<bool> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE leases SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            (&now, &now, id.to_string()),
        )?;
        if rows == 0 {
            return Ok(false);
        }

        for kind in policy.targets() {
            self.conn.execute(
                &format!(
                    "UPDATE {} SET deleted_at = ? WHERE lease_id = ? AND deleted_at IS NULL",
                    kind.table()
                ),
                (&now, id.to_string()),
            )?;
        }
        Ok(true)
    }

    fn void_lease(&self, id: Uuid, reason: &str) -> LeaseResult<bool> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE leases SET status = 'voided', voided_reason = ?, voided_at = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL AND status != 'voided'",
            (reason, &now, &now, id.to_string()),
        )?;
        Ok(rows > 0)
    }

    fn add_lessee(&self, lease_id: Uuid, lessee: &NewLessee) -> LeaseResult<Uuid> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO lease_lessees (id, lease_id, person_id, signed_date, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                lease_id.to_string(),
                lessee.person_id.to_string(),
                lessee.signed_date.map(|d| d.to_string()),
                Utc::now().to_rfc3339(),
            ),
        )?;
        Ok(id)
    }

    fn add_occupant(&self, lease_id: Uuid, occupant: &NewOccupant) -> LeaseResult<Uuid> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO lease_occupants (id, lease_id, person_id, is_adult, move_in_date,
                                          created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                lease_id.to_string(),
                occupant.person_id.to_string(),
                occupant.is_adult,
                occupant.move_in_date.map(|d| d.to_string()),
                Utc::now().to_rfc3339(),
            ),
        )?;
        Ok(id)
    }

    fn remove_occupant(&self, lease_id: Uuid, occupant_id: Uuid) -> LeaseResult<bool> {
        let rows = self.conn.execute(
            "UPDATE lease_occupants SET deleted_at = ?
             WHERE id = ? AND lease_id = ? AND deleted_at IS NULL",
            (
                Utc::now().to_rfc3339(),
                occupant_id.to_string(),
                lease_id.to_string(),
            ),
        )?;
        Ok(rows > 0)
    }

    fn add_pet(&self, lease_id: Uuid, pet: &AddPetInput) -> LeaseResult<Uuid> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO lease_pets (id, lease_id, name, species, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                lease_id.to_string(),
                pet.name.trim(),
                pet.species.as_str(),
                &pet.notes,
                Utc::now().to_rfc3339(),
            ),
        )?;
        Ok(id)
    }

    fn remove_pet(&self, lease_id: Uuid, pet_id: Uuid) -> LeaseResult<bool> {
        let rows = self.conn.execute(
            "UPDATE lease_pets SET deleted_at = ?
             WHERE id = ? AND lease_id = ? AND deleted_at IS NULL",
            (
                Utc::now().to_rfc3339(),
                pet_id.to_string(),
                lease_id.to_string(),
            ),
        )?;
        Ok(rows > 0)
    }
}

/// The partial unique index on current leases surfaces as a conflict.
fn exclusivity_violation(err: rusqlite::Error, property_id: Uuid) -> LeaseError {
    match &err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == ErrorCode::ConstraintViolation && msg.contains("leases.property_id") =>
        {
            LeaseError::conflict(format!(
                "property {} already has an active lease",
                property_id
            ))
        }
        _ => err.into(),
    }
}

fn cleaned(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================
// Row decoding
// ============================================================

fn lease_from_row(row: &Row<'_>) -> rusqlite::Result<Lease> {
    Ok(Lease {
        id: uuid_at(row, 0)?,
        owner_user_id: uuid_at(row, 1)?,
        property_id: uuid_at(row, 2)?,
        start_date: parse_at(row, 3, parse_date)?,
        end_date: opt_date_at(row, 4)?,
        monthly_rent: opt_decimal_at(row, 5)?,
        security_deposit: opt_decimal_at(row, 6)?,
        deposit_paid_date: opt_date_at(row, 7)?,
        notes: row.get(8)?,
        status: parse_at(row, 9, |s| {
            LeaseStatus::from_str(s).ok_or_else(|| UnknownValue::new("status", s))
        })?,
        voided_reason: row.get(10)?,
        voided_at: opt_timestamp_at(row, 11)?,
        created_at: timestamp_at(row, 12)?,
        updated_at: timestamp_at(row, 13)?,
        deleted_at: opt_timestamp_at(row, 14)?,
    })
}

/// Decode a person from the `PERSON_COLUMNS` block starting at `offset`.
fn person_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Person> {
    Ok(Person {
        id: uuid_at(row, offset)?,
        owner_user_id: uuid_at(row, offset + 1)?,
        first_name: row.get(offset + 2)?,
        middle_name: row.get(offset + 3)?,
        last_name: row.get(offset + 4)?,
        email: row.get(offset + 5)?,
        phone: row.get(offset + 6)?,
        notes: row.get(offset + 7)?,
        created_at: timestamp_at(row, offset + 8)?,
        updated_at: timestamp_at(row, offset + 9)?,
    })
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {column} value: {value}")]
struct UnknownValue {
    column: &'static str,
    value: String,
}

impl UnknownValue {
    fn new(column: &'static str, value: &str) -> Self {
        Self {
            column,
            value: value.to_string(),
        }
    }
}

fn parse_at<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| conversion_failure(idx, e))
}

fn parse_opt_at<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> rusqlite::Result<Option<T>>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| parse(&raw).map_err(|e| conversion_failure(idx, e)))
        .transpose()
}

fn conversion_failure<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    parse_at(row, idx, Uuid::parse_str)
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    parse_at(row, idx, parse_timestamp)
}

fn opt_timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    parse_opt_at(row, idx, parse_timestamp)
}

fn opt_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    parse_opt_at(row, idx, parse_date)
}

fn opt_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    parse_opt_at(row, idx, Decimal::from_str)
}
