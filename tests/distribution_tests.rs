#![allow(clippy::expect_used, clippy::panic)]

use anyhow::Result;
use secret_santa_bot::database::{connection::DatabaseManager, models::*};
use secret_santa_bot::pairing::{is_derangement, PairingSettings};
use secret_santa_bot::services::distribution::*;
use secret_santa_bot::services::registration::{create_event, join_event, set_registration};
use secret_santa_bot::utils::validation::parse_new_event;
use tempfile::{tempdir, TempDir};

const ADMIN: i64 = 1;

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

/// An event whose admin plus `extra_members` other users have joined.
async fn event_with_members(db: &DatabaseManager, extra_members: i64, close: bool) -> Result<Event> {
    User::upsert(&db.pool, ADMIN, None, "Admin".to_string(), None).await?;
    let (event, _) = create_event(&db.pool, ADMIN, parse_new_event("santa Office Party")?).await?;

    for user_id in 2..2 + extra_members {
        User::upsert(&db.pool, user_id, None, format!("Elf {user_id}"), None).await?;
        join_event(&db.pool, user_id, event.id).await?;
    }

    if close {
        set_registration(&db.pool, ADMIN, &[], event.id, false).await?;
    }
    Ok(event)
}

async fn participant_ids(db: &DatabaseManager, event_id: i64) -> Result<Vec<i64>> {
    Ok(Participant::find_by_event(&db.pool, event_id)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect())
}

#[tokio::test]
async fn test_distribution_stores_a_derangement() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let event = event_with_members(&db, 5, true).await?;

    let outcome = distribute_event(&db.pool, event.id, ADMIN, &[], &PairingSettings::default()).await?;
    match outcome {
        DistributionOutcome::Distributed { event: distributed, pairs, attempts } => {
            assert_eq!(distributed.status, EventStatus::ParticipantsDistributed);
            assert_eq!(pairs, 6);
            assert!(attempts >= 1);
        }
        other => panic!("expected a distribution, got {other:?}"),
    }

    let ids = participant_ids(&db, event.id).await?;
    let assignments = load_assignments(&db.pool, event.id).await?;
    assert!(is_derangement(&ids, &assignments));

    let stored = Event::find_by_id(&db.pool, event.id).await?.expect("event exists");
    assert_eq!(stored.status, EventStatus::ParticipantsDistributed);
    Ok(())
}

#[tokio::test]
async fn test_second_distribution_is_a_noop() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let event = event_with_members(&db, 3, true).await?;
    let settings = PairingSettings::default();

    distribute_event(&db.pool, event.id, ADMIN, &[], &settings).await?;
    let first = load_assignments(&db.pool, event.id).await?;

    let again = distribute_event(&db.pool, event.id, ADMIN, &[], &settings).await?;
    assert!(matches!(again, DistributionOutcome::AlreadyDistributed { .. }));
    assert_eq!(load_assignments(&db.pool, event.id).await?, first);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_triggers_distribute_once() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let event = event_with_members(&db, 7, true).await?;
    let settings = PairingSettings::default();

    let (left, right) = tokio::join!(
        distribute_event(&db.pool, event.id, ADMIN, &[], &settings),
        distribute_event(&db.pool, event.id, ADMIN, &[], &settings),
    );

    let outcomes = [left?, right?];
    let distributed = outcomes
        .iter()
        .filter(|o| matches!(o, DistributionOutcome::Distributed { .. }))
        .count();
    let noops = outcomes
        .iter()
        .filter(|o| matches!(o, DistributionOutcome::AlreadyDistributed { .. }))
        .count();
    assert_eq!((distributed, noops), (1, 1));

    let ids = participant_ids(&db, event.id).await?;
    assert!(is_derangement(&ids, &load_assignments(&db.pool, event.id).await?));
    Ok(())
}

#[tokio::test]
async fn test_distribution_requires_closed_registration() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let event = event_with_members(&db, 3, false).await?;

    let result = distribute_event(&db.pool, event.id, ADMIN, &[], &PairingSettings::default()).await;
    assert!(matches!(result, Err(DistributionError::RegistrationOpen)));
    assert!(load_assignments(&db.pool, event.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_too_few_participants_rolls_back() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let event = event_with_members(&db, 0, true).await?;

    let result = distribute_event(&db.pool, event.id, ADMIN, &[], &PairingSettings::default()).await;
    assert!(matches!(result, Err(DistributionError::TooFewParticipants { count: 1 })));

    // The status claim was rolled back, so the admin can reopen and retry.
    let stored = Event::find_by_id(&db.pool, event.id).await?.expect("event exists");
    assert_eq!(stored.status, EventStatus::RegisterClosed);
    Ok(())
}

#[tokio::test]
async fn test_distribution_permissions() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let event = event_with_members(&db, 2, true).await?;
    let settings = PairingSettings::default();

    let stranger = distribute_event(&db.pool, event.id, 3, &[], &settings).await;
    assert!(matches!(stranger, Err(DistributionError::NotAdmin)));

    let missing = distribute_event(&db.pool, 404, ADMIN, &[], &settings).await;
    assert!(matches!(missing, Err(DistributionError::EventNotFound(404))));

    let operator = distribute_event(&db.pool, event.id, 99, &[99], &settings).await?;
    assert!(matches!(operator, DistributionOutcome::Distributed { pairs: 3, .. }));
    Ok(())
}

#[tokio::test]
async fn test_two_participants_are_swapped() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let event = event_with_members(&db, 1, true).await?;

    distribute_event(&db.pool, event.id, ADMIN, &[], &PairingSettings::default()).await?;

    let ids = participant_ids(&db, event.id).await?;
    let assignments = load_assignments(&db.pool, event.id).await?;
    assert_eq!(assignments.get(&ids[0]), Some(&ids[1]));
    assert_eq!(assignments.get(&ids[1]), Some(&ids[0]));
    Ok(())
}
