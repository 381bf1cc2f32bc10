#![allow(clippy::expect_used)]

use anyhow::Result;
use secret_santa_bot::database::{connection::DatabaseManager, models::*};
use secret_santa_bot::utils::datetime::{cutoff_rfc3339, now_rfc3339};
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

async fn add_user(db: &DatabaseManager, id: i64, name: &str) -> Result<User> {
    Ok(User::upsert(&db.pool, id, Some(name.to_lowercase()), name.to_string(), None).await?)
}

async fn add_event(db: &DatabaseManager, admin_id: i64) -> Result<Event> {
    Ok(Event::create(
        &db.pool,
        admin_id,
        EventKind::Santa,
        "Office Party".to_string(),
        "Budget 20 EUR".to_string(),
    )
    .await?)
}

#[tokio::test]
async fn test_schema_has_all_tables() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let tables = db.table_names().await?;
    for expected in ["users", "events", "participants", "forward_messages", "pending_relays", "messages"] {
        assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
    }

    Ok(())
}

#[tokio::test]
async fn test_user_upsert_refreshes_profile() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let user = User::upsert(&db.pool, 100, None, "Rudolph".to_string(), Some("en".to_string())).await?;
    assert_eq!(user.display_name(), "Rudolph");
    assert!(user.bot_can_message);
    assert_eq!(user.active_participant_id, None);

    User::set_bot_can_message(&db.pool, 100, false).await?;
    let user = User::upsert(&db.pool, 100, Some("rudolph".to_string()), "Rudolph R.".to_string(), None).await?;
    assert_eq!(user.display_name(), "@rudolph");
    assert_eq!(user.full_name, "Rudolph R.");
    // Reachability is only changed by delivery attempts.
    assert!(!user.bot_can_message);

    assert!(User::find_by_id(&db.pool, 101).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_event_roundtrip_and_batch_lookup() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    add_user(&db, 1, "Admin").await?;

    let santa = add_event(&db, 1).await?;
    let nicholas = Event::create(
        &db.pool,
        1,
        EventKind::SaintNicholas,
        "School".to_string(),
        String::new(),
    )
    .await?;

    let found = Event::find_by_id(&db.pool, santa.id).await?.expect("event exists");
    assert_eq!(found, santa);
    assert_eq!(found.status, EventStatus::RegisterOpen);

    let both = Event::find_by_ids(&db.pool, &[nicholas.id, santa.id]).await?;
    assert_eq!(both.len(), 2);
    assert_eq!(both[1].kind, EventKind::SaintNicholas);
    assert!(Event::find_by_ids(&db.pool, &[]).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_event_transition_is_status_guarded() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    add_user(&db, 1, "Admin").await?;
    let event = add_event(&db, 1).await?;

    assert!(!Event::transition(&db.pool, event.id, EventStatus::RegisterClosed, EventStatus::ParticipantsDistributed).await?);
    assert!(Event::transition(&db.pool, event.id, EventStatus::RegisterOpen, EventStatus::RegisterClosed).await?);
    assert!(!Event::transition(&db.pool, event.id, EventStatus::RegisterOpen, EventStatus::RegisterClosed).await?);
    assert!(Event::transition(&db.pool, event.id, EventStatus::RegisterClosed, EventStatus::ParticipantsDistributed).await?);
    assert!(!Event::transition(&db.pool, event.id, EventStatus::RegisterClosed, EventStatus::ParticipantsDistributed).await?);

    let event = Event::find_by_id(&db.pool, event.id).await?.expect("event exists");
    assert_eq!(event.status, EventStatus::ParticipantsDistributed);
    Ok(())
}

#[tokio::test]
async fn test_participant_membership_rules() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    add_user(&db, 1, "Admin").await?;
    add_user(&db, 2, "Bob").await?;
    let event = add_event(&db, 1).await?;

    let bob = Participant::create_if_open(&db.pool, event.id, 2).await?.expect("registration is open");
    assert_eq!(bob.recipient_id, None);

    // One membership per user and event.
    assert!(Participant::create(&db.pool, event.id, 2).await.is_err());

    Event::transition(&db.pool, event.id, EventStatus::RegisterOpen, EventStatus::RegisterClosed).await?;
    add_user(&db, 3, "Carol").await?;
    assert!(Participant::create_if_open(&db.pool, event.id, 3).await?.is_none());
    assert!(Participant::create_if_open(&db.pool, 999, 3).await?.is_none());

    assert!(Participant::delete_before_distribution(&db.pool, event.id, 2).await?);
    assert!(Participant::find_by_event_and_user(&db.pool, event.id, 2).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_members_cannot_leave_after_distribution() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    add_user(&db, 1, "Admin").await?;
    add_user(&db, 2, "Bob").await?;
    let event = add_event(&db, 1).await?;
    Participant::create(&db.pool, event.id, 2).await?;

    Event::transition(&db.pool, event.id, EventStatus::RegisterOpen, EventStatus::RegisterClosed).await?;
    Event::transition(&db.pool, event.id, EventStatus::RegisterClosed, EventStatus::ParticipantsDistributed).await?;

    assert!(!Participant::delete_before_distribution(&db.pool, event.id, 2).await?);
    assert!(Participant::find_by_event_and_user(&db.pool, event.id, 2).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_reverse_lookup_and_recipient_constraints() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    for (id, name) in [(1, "Admin"), (2, "Bob"), (3, "Carol")] {
        add_user(&db, id, name).await?;
    }
    let event = add_event(&db, 1).await?;
    let a = Participant::create(&db.pool, event.id, 1).await?;
    let b = Participant::create(&db.pool, event.id, 2).await?;
    let c = Participant::create(&db.pool, event.id, 3).await?;

    for (giver, recipient) in [(&a, &b), (&b, &c), (&c, &a)] {
        sqlx::query("UPDATE participants SET recipient_id = ? WHERE id = ?")
            .bind(recipient.id)
            .bind(giver.id)
            .execute(&db.pool)
            .await?;
    }

    let a = Participant::find_by_id(&db.pool, a.id).await?.expect("participant exists");
    assert_eq!(a.recipient(&db.pool).await?.map(|p| p.id), Some(b.id));
    assert_eq!(a.santa(&db.pool).await?.map(|p| p.id), Some(c.id));

    // Nobody can be drawn twice, nobody can draw themselves.
    let duplicate = sqlx::query("UPDATE participants SET recipient_id = ? WHERE id = ?")
        .bind(b.id)
        .bind(c.id)
        .execute(&db.pool)
        .await;
    assert!(duplicate.is_err());
    let selfish = sqlx::query("UPDATE participants SET recipient_id = id WHERE id = ?")
        .bind(a.id)
        .execute(&db.pool)
        .await;
    assert!(selfish.is_err());

    let profiles = Participant::profiles_for_event(&db.pool, event.id).await?;
    assert_eq!(profiles.len(), 3);
    assert_eq!(profiles[1].display_name(), "@bob");
    Ok(())
}

#[tokio::test]
async fn test_pending_relay_slot_is_consumed_once() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    add_user(&db, 1, "Admin").await?;
    let event = add_event(&db, 1).await?;
    let admin = Participant::create(&db.pool, event.id, 1).await?;

    PendingRelay::bind(&db.pool, 1, admin.id, RelayRole::ToBuddy).await?;
    PendingRelay::bind(&db.pool, 1, admin.id, RelayRole::ToSanta).await?;

    let pending = PendingRelay::find(&db.pool, 1).await?.expect("slot is bound");
    assert_eq!(pending.role, RelayRole::ToSanta);

    let taken = PendingRelay::take(&db.pool, 1).await?.expect("slot is bound");
    assert_eq!(taken.participant_id, admin.id);
    assert!(PendingRelay::take(&db.pool, 1).await?.is_none());
    assert!(!PendingRelay::clear(&db.pool, 1).await?);

    Ok(())
}

#[tokio::test]
async fn test_pending_relay_expiry() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    add_user(&db, 1, "Admin").await?;
    add_user(&db, 2, "Bob").await?;
    let event = add_event(&db, 1).await?;
    let admin = Participant::create(&db.pool, event.id, 1).await?;
    let bob = Participant::create(&db.pool, event.id, 2).await?;

    PendingRelay::bind(&db.pool, 1, admin.id, RelayRole::ToBuddy).await?;
    sqlx::query("INSERT INTO pending_relays (user_id, participant_id, role, created_at) VALUES (?, ?, 'santa', ?)")
        .bind(2)
        .bind(bob.id)
        .bind(cutoff_rfc3339(48))
        .execute(&db.pool)
        .await?;

    let removed = PendingRelay::delete_older_than(&db.pool, &cutoff_rfc3339(24)).await?;
    assert_eq!(removed, 1);
    assert!(PendingRelay::find(&db.pool, 1).await?.is_some());
    assert!(PendingRelay::find(&db.pool, 2).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_forward_message_audit() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    add_user(&db, 1, "Admin").await?;
    add_user(&db, 2, "Bob").await?;
    let event = add_event(&db, 1).await?;
    let admin = Participant::create(&db.pool, event.id, 1).await?;
    let bob = Participant::create(&db.pool, event.id, 2).await?;

    let record = ForwardMessage::create(&db.pool, 777, RelayRole::ToBuddy, admin.id, bob.id).await?;
    assert!(!record.id.is_empty());
    assert!(record.created_at <= now_rfc3339());

    let sent = ForwardMessage::find_by_sender(&db.pool, admin.id).await?;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message_id, 777);
    assert_eq!(sent[0].role, RelayRole::ToBuddy);
    assert_eq!(sent[0].to_participant_id, bob.id);

    assert_eq!(ForwardMessage::count_for_event(&db.pool, event.id).await?, 1);
    Ok(())
}

fn inbound(message_id: Option<i64>, chat_id: i64, user_id: i64, event_id: Option<i64>) -> NewLoggedMessage {
    NewLoggedMessage {
        message_id,
        chat_id,
        user_id: Some(user_id),
        direction: MessageDirection::Inbound,
        content_type: "text".to_string(),
        event_id,
    }
}

#[tokio::test]
async fn test_message_log_keeps_metadata_per_event() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    add_user(&db, 1, "Admin").await?;
    add_user(&db, 2, "Bob").await?;
    let event = add_event(&db, 1).await?;
    let bob = Participant::create(&db.pool, event.id, 2).await?;

    // No active event yet and none given.
    assert!(LoggedMessage::record(&db.pool, &inbound(Some(10), 2, 2, None)).await?);

    // Falls back to the user's active event.
    User::set_active_participant(&db.pool, 2, Some(bob.id)).await?;
    assert!(LoggedMessage::record(&db.pool, &inbound(Some(11), 2, 2, None)).await?);

    // A button press names its event explicitly and has no message id.
    assert!(LoggedMessage::record(&db.pool, &inbound(None, 2, 2, Some(event.id))).await?);
    assert!(LoggedMessage::record(&db.pool, &inbound(None, 2, 2, Some(event.id))).await?);

    // A chat message is logged once.
    assert!(!LoggedMessage::record(&db.pool, &inbound(Some(11), 2, 2, None)).await?);

    let logged = LoggedMessage::find_by_user(&db.pool, 2).await?;
    assert_eq!(logged.len(), 4);
    assert_eq!(logged[0].event_id, None);
    assert_eq!(logged[1].event_id, Some(event.id));
    assert!(logged.iter().all(|m| m.direction == MessageDirection::Inbound && m.content_type == "text"));
    assert_eq!(LoggedMessage::count_for_event(&db.pool, event.id).await?, 3);
    Ok(())
}

#[tokio::test]
async fn test_message_log_tolerates_unknown_users_and_events() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let outbound = NewLoggedMessage {
        message_id: Some(5),
        chat_id: -100_200,
        user_id: Some(777),
        direction: MessageDirection::Outbound,
        content_type: "copy".to_string(),
        event_id: Some(404),
    };
    assert!(LoggedMessage::record(&db.pool, &outbound).await?);

    let (user_id, event_id): (Option<i64>, Option<i64>) =
        sqlx::query_as("SELECT user_id, event_id FROM messages WHERE chat_id = ?")
            .bind(-100_200_i64)
            .fetch_one(&db.pool)
            .await?;
    assert_eq!((user_id, event_id), (None, None));
    Ok(())
}
