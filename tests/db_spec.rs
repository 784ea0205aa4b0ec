use chrono::NaiveDate;
use leasehold::db::Database;
use leasehold::error::LeaseError;
use leasehold::lifecycle::{
    CascadePolicy, LeaseStore, PersonDirectory, PropertyDirectory, UnitOfWork,
};
use leasehold::models::*;
use rust_decimal::Decimal;
use speculate2::speculate;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn create_test_property(db: &Database, owner: Uuid) -> Property {
    db.create_property(
        owner,
        CreatePropertyInput {
            name: "12 Elm St, Unit 4".to_string(),
            address: Some("12 Elm St, Springfield".to_string()),
        },
    )
    .expect("Failed to create property")
}

fn create_test_person(db: &Database, owner: Uuid, first: &str) -> Person {
    db.atomically(|repos| {
        repos.create_person(
            owner,
            &InlinePerson::new(first, "Tester")
                .with_email(format!("{}@example.com", first.to_lowercase()))
                .with_phone("5551234567"),
        )
    })
    .expect("Failed to create person")
}

fn insert_test_lease(db: &Database, property: &Property, lessees: &[&Person]) -> Uuid {
    db.atomically(|repos| {
        repos.insert_lease(&NewLease {
            owner_user_id: property.owner_user_id,
            property_id: property.id,
            terms: LeaseTerms {
                monthly_rent: Some(Decimal::new(150000, 2)),
                ..LeaseTerms::starting(date(2024, 1, 1))
            },
            lessees: lessees
                .iter()
                .map(|p| NewLessee {
                    person_id: p.id,
                    signed_date: Some(date(2023, 12, 15)),
                })
                .collect(),
            occupants: vec![],
        })
    })
    .expect("Failed to insert lease")
}

fn count_rows(path: &std::path::Path, table: &str) -> i64 {
    let conn = rusqlite::Connection::open(path).expect("Failed to open database file");
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .expect("Count failed")
}

fn find(db: &Database, lease_id: Uuid) -> Option<LeaseDetails> {
    db.atomically(|repos| repos.find_lease(lease_id))
        .expect("Query failed")
}

fn audit(db: &Database, lease_id: Uuid) -> LeaseDetails {
    db.atomically(|repos| repos.find_lease_for_audit(lease_id))
        .expect("Query failed")
        .expect("Lease missing from audit read")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let owner = Uuid::new_v4();
    }

    describe "properties" {
        it "registers a property for its owner" {
            let property = create_test_property(&db, owner);

            let found = db
                .atomically(|repos| repos.find_property(property.id))
                .expect("Query failed")
                .expect("Property not found");
            assert_eq!(found.owner_user_id, owner);
            assert_eq!(found.name, "12 Elm St, Unit 4");
        }

        it "rejects a blank property name" {
            let result = db.create_property(owner, CreatePropertyInput {
                name: "   ".to_string(),
                address: None,
            });

            assert!(matches!(result, Err(LeaseError::Validation(_))));
        }

        it "returns None for an unknown property" {
            let found = db
                .atomically(|repos| repos.find_property(Uuid::new_v4()))
                .expect("Query failed");
            assert!(found.is_none());
        }
    }

    describe "people" {
        it "trims inline fields and drops blank ones" {
            let person = db
                .atomically(|repos| {
                    repos.create_person(owner, &InlinePerson {
                        first_name: Some("  Jane ".to_string()),
                        last_name: Some("Doe".to_string()),
                        middle_name: Some("   ".to_string()),
                        ..InlinePerson::default()
                    })
                })
                .expect("Failed to create person");

            assert_eq!(person.first_name, "Jane");
            assert!(person.middle_name.is_none());
        }

        it "hides soft-deleted people" {
            let person = create_test_person(&db, owner, "Jane");

            let deleted = db.atomically(|repos| repos.delete_person(person.id)).expect("Delete failed");
            assert!(deleted);

            let found = db.atomically(|repos| repos.find_person(person.id)).expect("Query failed");
            assert!(found.is_none());
        }

        it "reports membership only on leases in force" {
            let property = create_test_property(&db, owner);
            let jane = create_test_person(&db, owner, "Jane");
            let lease_id = insert_test_lease(&db, &property, &[&jane]);

            let member = db.atomically(|repos| repos.has_active_membership(jane.id)).expect("Query failed");
            assert!(member);

            db.atomically(|repos| repos.void_lease(lease_id, "roster change")).expect("Void failed");

            let member = db.atomically(|repos| repos.has_active_membership(jane.id)).expect("Query failed");
            assert!(!member);
        }
    }

    describe "leases" {
        describe "insert_lease" {
            it "hydrates lessees in insertion order" {
                let property = create_test_property(&db, owner);
                let jane = create_test_person(&db, owner, "Jane");
                let john = create_test_person(&db, owner, "John");

                let lease_id = insert_test_lease(&db, &property, &[&jane, &john]);
                let details = find(&db, lease_id).expect("Lease not found");

                assert_eq!(details.lease.status, LeaseStatus::Active);
                assert_eq!(details.lease.monthly_rent, Some(Decimal::new(150000, 2)));
                let names: Vec<&str> = details.lessees.iter().map(|l| l.person.first_name.as_str()).collect();
                assert_eq!(names, vec!["Jane", "John"]);
                assert_eq!(details.lessees[0].signed_date, Some(date(2023, 12, 15)));
            }

            it "surfaces a second current lease as a conflict" {
                let property = create_test_property(&db, owner);
                let jane = create_test_person(&db, owner, "Jane");
                insert_test_lease(&db, &property, &[&jane]);

                let result = db.atomically(|repos| {
                    repos.insert_lease(&NewLease {
                        owner_user_id: owner,
                        property_id: property.id,
                        terms: LeaseTerms::starting(date(2024, 6, 1)),
                        lessees: vec![],
                        occupants: vec![],
                    })
                });

                assert!(matches!(result, Err(LeaseError::Conflict(_))));
            }
        }

        describe "find_active_lease_for_property" {
            it "ignores ended leases" {
                let property = create_test_property(&db, owner);
                let jane = create_test_person(&db, owner, "Jane");
                let lease_id = insert_test_lease(&db, &property, &[&jane]);

                db.atomically(|repos| {
                    repos.update_lease(lease_id, &LeaseChanges {
                        terms: LeaseTerms::starting(date(2024, 1, 1)),
                        status: LeaseStatus::Ended,
                    })
                })
                .expect("Update failed");

                let current = db
                    .atomically(|repos| repos.find_active_lease_for_property(property.id))
                    .expect("Query failed");
                assert!(current.is_none());
            }
        }

        describe "void_lease" {
            it "records the reason once" {
                let property = create_test_property(&db, owner);
                let jane = create_test_person(&db, owner, "Jane");
                let lease_id = insert_test_lease(&db, &property, &[&jane]);

                let first = db.atomically(|repos| repos.void_lease(lease_id, "roster change")).expect("Void failed");
                let second = db.atomically(|repos| repos.void_lease(lease_id, "again")).expect("Void failed");

                assert!(first);
                assert!(!second);
                let lease = find(&db, lease_id).expect("Lease not found").lease;
                assert_eq!(lease.status, LeaseStatus::Voided);
                assert_eq!(lease.voided_reason.as_deref(), Some("roster change"));
                assert!(lease.voided_at.is_some());
            }
        }

        describe "soft_delete_lease" {
            it "cascades to people links but leaves pets by default" {
                let property = create_test_property(&db, owner);
                let jane = create_test_person(&db, owner, "Jane");
                let lease_id = insert_test_lease(&db, &property, &[&jane]);
                db.atomically(|repos| {
                    repos.add_pet(lease_id, &AddPetInput {
                        name: "Rex".to_string(),
                        species: PetSpecies::Dog,
                        notes: None,
                    })
                })
                .expect("Failed to add pet");

                let deleted = db
                    .atomically(|repos| repos.soft_delete_lease(lease_id, CascadePolicy::PEOPLE_ONLY))
                    .expect("Delete failed");
                assert!(deleted);

                assert!(find(&db, lease_id).is_none());
                let record = audit(&db, lease_id);
                assert!(record.lease.deleted_at.is_some());
                assert!(record.lessees[0].deleted_at.is_some());
                assert!(record.pets[0].deleted_at.is_none());
            }

            it "cascades to pets when the policy says so" {
                let property = create_test_property(&db, owner);
                let jane = create_test_person(&db, owner, "Jane");
                let lease_id = insert_test_lease(&db, &property, &[&jane]);
                db.atomically(|repos| {
                    repos.add_pet(lease_id, &AddPetInput {
                        name: "Tom".to_string(),
                        species: PetSpecies::Cat,
                        notes: None,
                    })
                })
                .expect("Failed to add pet");

                db.atomically(|repos| repos.soft_delete_lease(lease_id, CascadePolicy::ALL))
                    .expect("Delete failed");

                assert!(audit(&db, lease_id).pets[0].deleted_at.is_some());
            }

            it "returns false for a lease that is already deleted" {
                let property = create_test_property(&db, owner);
                let jane = create_test_person(&db, owner, "Jane");
                let lease_id = insert_test_lease(&db, &property, &[&jane]);

                db.atomically(|repos| repos.soft_delete_lease(lease_id, CascadePolicy::default()))
                    .expect("Delete failed");
                let again = db
                    .atomically(|repos| repos.soft_delete_lease(lease_id, CascadePolicy::default()))
                    .expect("Delete failed");

                assert!(!again);
            }
        }

        describe "list_leases_for_property" {
            it "lists newest first and skips deleted leases" {
                let property = create_test_property(&db, owner);
                let jane = create_test_person(&db, owner, "Jane");
                let first = insert_test_lease(&db, &property, &[&jane]);
                db.atomically(|repos| repos.void_lease(first, "replaced")).expect("Void failed");
                let second = db
                    .atomically(|repos| {
                        repos.insert_lease(&NewLease {
                            owner_user_id: owner,
                            property_id: property.id,
                            terms: LeaseTerms::starting(date(2024, 3, 1)),
                            lessees: vec![NewLessee { person_id: jane.id, signed_date: None }],
                            occupants: vec![],
                        })
                    })
                    .expect("Insert failed");
                let third = db
                    .atomically(|repos| {
                        repos.insert_lease(&NewLease {
                            owner_user_id: owner,
                            property_id: property.id,
                            terms: LeaseTerms::starting(date(2023, 1, 1)),
                            lessees: vec![NewLessee { person_id: jane.id, signed_date: None }],
                            occupants: vec![],
                        })
                    });
                assert!(matches!(third, Err(LeaseError::Conflict(_))));

                let leases = db
                    .atomically(|repos| repos.list_leases_for_property(property.id))
                    .expect("Query failed");
                let ids: Vec<Uuid> = leases.iter().map(|l| l.id).collect();
                assert_eq!(ids, vec![second, first]);
            }
        }

        describe "remove links" {
            it "only removes links that belong to the lease" {
                let property = create_test_property(&db, owner);
                let jane = create_test_person(&db, owner, "Jane");
                let kid = create_test_person(&db, owner, "Kid");
                let lease_id = insert_test_lease(&db, &property, &[&jane]);
                let occupant_id = db
                    .atomically(|repos| {
                        repos.add_occupant(lease_id, &NewOccupant {
                            person_id: kid.id,
                            is_adult: false,
                            move_in_date: None,
                        })
                    })
                    .expect("Failed to add occupant");

                let wrong_lease = db
                    .atomically(|repos| repos.remove_occupant(Uuid::new_v4(), occupant_id))
                    .expect("Query failed");
                let removed = db
                    .atomically(|repos| repos.remove_occupant(lease_id, occupant_id))
                    .expect("Query failed");
                let twice = db
                    .atomically(|repos| repos.remove_occupant(lease_id, occupant_id))
                    .expect("Query failed");

                assert!(!wrong_lease);
                assert!(removed);
                assert!(!twice);
                assert!(find(&db, lease_id).expect("Lease not found").occupants.is_empty());
            }
        }
    }

    describe "atomically" {
        it "discards every write when the unit fails" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("leasehold.db");
            let db = Database::open(path.clone()).expect("Failed to open database");
            db.migrate().expect("Failed to run migrations");

            let result: Result<(), LeaseError> = db.atomically(|repos| {
                repos.create_person(owner, &InlinePerson::new("Ghost", "Writer"))?;
                Err(LeaseError::validation("abort"))
            });

            assert!(result.is_err());
            assert_eq!(count_rows(&path, "people"), 0);
        }
    }

    describe "file-backed database" {
        it "persists across reopen" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("data").join("leasehold.db");

            let property = {
                let db = Database::open(path.clone()).expect("Failed to open database");
                db.migrate().expect("Failed to run migrations");
                create_test_property(&db, owner)
            };

            let reopened = Database::open(path).expect("Failed to reopen database");
            reopened.migrate().expect("Migrations should be idempotent");
            let found = reopened
                .atomically(|repos| repos.find_property(property.id))
                .expect("Query failed");
            assert!(found.is_some());
        }
    }
}
