//! Integration tests for `PgSessionRepository`.

use chrono::{Duration, TimeZone, Utc};
use duet_core::error::DomainError;
use duet_core::repository::{SessionRepository, StoredSession};
use duet_core::turn::{Role, StoredTurn, ThreadTag};
use duet_store::pg_session_repository::PgSessionRepository;
use sqlx::PgPool;
use uuid::Uuid;

async fn insert_user(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, handle) VALUES ($1, $2)")
        .bind(id)
        .bind(format!("player-{id}"))
        .execute(pool)
        .await
        .unwrap();
    id
}

fn make_session(owner_id: Uuid, hours_offset: i64) -> StoredSession {
    StoredSession {
        session_id: Uuid::new_v4(),
        owner_id,
        character_name: "Astarion".to_owned(),
        character_class: "rogue".to_owned(),
        character_race: "elf".to_owned(),
        strength: 5,
        dexterity: 9,
        intelligence: 6,
        prologue: "Baldur's Gate at night.".to_owned(),
        created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
            + Duration::hours(hours_offset),
    }
}

fn make_turn(session_id: Uuid, sequence_number: i64, thread: ThreadTag, role: Role) -> StoredTurn {
    StoredTurn {
        turn_id: Uuid::new_v4(),
        session_id,
        thread,
        role,
        content: format!("turn {sequence_number}"),
        sequence_number,
        occurred_at: Utc::now(),
    }
}

fn opening(session_id: Uuid) -> Vec<StoredTurn> {
    vec![
        make_turn(session_id, 1, ThreadTag::A, Role::Narrator),
        make_turn(session_id, 2, ThreadTag::B, Role::Narrator),
    ]
}

fn exchange(session_id: Uuid, after: i64) -> Vec<StoredTurn> {
    vec![
        make_turn(session_id, after + 1, ThreadTag::A, Role::User),
        make_turn(session_id, after + 2, ThreadTag::A, Role::Narrator),
        make_turn(session_id, after + 3, ThreadTag::B, Role::User),
        make_turn(session_id, after + 4, ThreadTag::B, Role::Narrator),
    ]
}

// --- create_session + load ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_and_load_session_round_trip(pool: PgPool) {
    let owner_id = insert_user(&pool).await;
    let repo = PgSessionRepository::new(pool);
    let session = make_session(owner_id, 0);

    repo.create_session(&session, &opening(session.session_id))
        .await
        .unwrap();

    let loaded = repo.load_session(session.session_id).await.unwrap();
    assert_eq!(loaded, Some(session.clone()));

    let turns = repo.load_turns(session.session_id).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].thread, ThreadTag::A);
    assert_eq!(turns[1].thread, ThreadTag::B);
    assert!(turns.iter().all(|t| t.role == Role::Narrator));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_session_returns_none_for_unknown_id(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);

    let loaded = repo.load_session(Uuid::new_v4()).await.unwrap();

    assert!(loaded.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_session_for_unknown_owner_fails_without_rows(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    let owner_id = Uuid::new_v4();
    let session = make_session(owner_id, 0);

    let result = repo
        .create_session(&session, &opening(session.session_id))
        .await;

    match result {
        Err(DomainError::OwnerNotFound(id)) => assert_eq!(id, owner_id),
        other => panic!("expected OwnerNotFound, got {other:?}"),
    }
    assert!(repo.load_turns(session.session_id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_session_rejects_attributes_over_the_point_cap(pool: PgPool) {
    let owner_id = insert_user(&pool).await;
    let repo = PgSessionRepository::new(pool);
    let mut session = make_session(owner_id, 0);
    session.strength = 10;
    session.dexterity = 10;
    session.intelligence = 10;

    let result = repo
        .create_session(&session, &opening(session.session_id))
        .await;

    assert!(matches!(result, Err(DomainError::Storage(_))));
    assert!(repo.load_session(session.session_id).await.unwrap().is_none());
}

// --- list_sessions ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_sessions_is_owner_scoped_and_newest_first(pool: PgPool) {
    let owner_id = insert_user(&pool).await;
    let other_owner = insert_user(&pool).await;
    let repo = PgSessionRepository::new(pool);
    let older = make_session(owner_id, 0);
    let newer = make_session(owner_id, 2);
    let foreign = make_session(other_owner, 1);
    for session in [&older, &newer, &foreign] {
        repo.create_session(session, &opening(session.session_id))
            .await
            .unwrap();
    }

    let listed = repo.list_sessions(owner_id).await.unwrap();

    let ids: Vec<Uuid> = listed.iter().map(|s| s.session_id).collect();
    assert_eq!(ids, [newer.session_id, older.session_id]);
}

// --- append_turns ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_sequential_appends_with_correct_expected_sequence(pool: PgPool) {
    let owner_id = insert_user(&pool).await;
    let repo = PgSessionRepository::new(pool);
    let session = make_session(owner_id, 0);
    let session_id = session.session_id;
    repo.create_session(&session, &opening(session_id)).await.unwrap();

    repo.append_turns(session_id, 2, &exchange(session_id, 2))
        .await
        .unwrap();
    repo.append_turns(session_id, 6, &exchange(session_id, 6))
        .await
        .unwrap();

    let loaded = repo.load_turns(session_id).await.unwrap();
    assert_eq!(loaded.len(), 10);
    for (i, turn) in loaded.iter().enumerate() {
        assert_eq!(turn.sequence_number, i64::try_from(i + 1).unwrap());
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_stale_expected_sequence_is_rejected(pool: PgPool) {
    let owner_id = insert_user(&pool).await;
    let repo = PgSessionRepository::new(pool);
    let session = make_session(owner_id, 0);
    let session_id = session.session_id;
    repo.create_session(&session, &opening(session_id)).await.unwrap();
    repo.append_turns(session_id, 2, &exchange(session_id, 2))
        .await
        .unwrap();

    // Sequence numbers don't collide, but the check must still reject.
    let result = repo
        .append_turns(session_id, 2, &exchange(session_id, 10))
        .await;

    match result {
        Err(DomainError::ConcurrencyConflict {
            session_id: conflict_id,
            expected,
            actual,
        }) => {
            assert_eq!(conflict_id, session_id);
            assert_eq!(expected, 2);
            assert_eq!(actual, 6);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    assert_eq!(repo.load_turns(session_id).await.unwrap().len(), 6);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_rolls_back_every_row_when_one_insert_fails(pool: PgPool) {
    let owner_id = insert_user(&pool).await;
    let repo = PgSessionRepository::new(pool);
    let session = make_session(owner_id, 0);
    let session_id = session.session_id;
    repo.create_session(&session, &opening(session_id)).await.unwrap();

    // The last turn reuses a sequence number, so the batch fails midway.
    let mut batch = exchange(session_id, 2);
    batch[3].sequence_number = 3;
    let result = repo.append_turns(session_id, 2, &batch).await;

    assert!(matches!(
        result,
        Err(DomainError::ConcurrencyConflict { .. })
    ));
    let loaded = repo.load_turns(session_id).await.unwrap();
    assert_eq!(loaded.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_append_to_unknown_session_returns_not_found(pool: PgPool) {
    let repo = PgSessionRepository::new(pool);
    let session_id = Uuid::new_v4();

    let result = repo
        .append_turns(session_id, 0, &exchange(session_id, 0))
        .await;

    match result {
        Err(DomainError::SessionNotFound(id)) => assert_eq!(id, session_id),
        other => panic!("expected SessionNotFound, got {other:?}"),
    }
}

// --- delete_session ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_session_cascades_to_turns(pool: PgPool) {
    let owner_id = insert_user(&pool).await;
    let repo = PgSessionRepository::new(pool);
    let session = make_session(owner_id, 0);
    let session_id = session.session_id;
    repo.create_session(&session, &opening(session_id)).await.unwrap();

    let deleted = repo.delete_session(session_id, owner_id).await.unwrap();

    assert!(deleted);
    assert!(repo.load_session(session_id).await.unwrap().is_none());
    assert!(repo.load_turns(session_id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_session_by_non_owner_deletes_nothing(pool: PgPool) {
    let owner_id = insert_user(&pool).await;
    let repo = PgSessionRepository::new(pool);
    let session = make_session(owner_id, 0);
    let session_id = session.session_id;
    repo.create_session(&session, &opening(session_id)).await.unwrap();

    let deleted = repo.delete_session(session_id, Uuid::new_v4()).await.unwrap();

    assert!(!deleted);
    assert!(repo.load_session(session_id).await.unwrap().is_some());
}

// --- timestamp precision ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_turn_timestamp_precision(pool: PgPool) {
    let owner_id = insert_user(&pool).await;
    let repo = PgSessionRepository::new(pool);
    let session = make_session(owner_id, 0);
    let turns = opening(session.session_id);
    let original = turns[0].occurred_at;
    repo.create_session(&session, &turns).await.unwrap();

    let loaded = repo.load_turns(session.session_id).await.unwrap();

    // PostgreSQL TIMESTAMPTZ has microsecond precision.
    assert_eq!(loaded[0].occurred_at.timestamp_micros(), original.timestamp_micros());
}
