// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn persistence, including the atomic admission transaction.

use rusqlite::{params, params_from_iter};

use parlance_core::{ConvTurn, ParlanceError, TurnStatus};

use crate::database::Database;

const TURN_COLUMNS: &str = "id, conversation_id, bot_id, app_id, user_identity, \
     request, response, status, created_at, updated_at";

fn map_turn(row: &rusqlite::Row<'_>) -> Result<ConvTurn, rusqlite::Error> {
    let code: i64 = row.get(7)?;
    let status = TurnStatus::try_from(code).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Integer, e.into())
    })?;
    Ok(ConvTurn {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        bot_id: row.get(2)?,
        app_id: row.get(3)?,
        user_identity: row.get(4)?,
        request: row.get(5)?,
        response: row.get(6)?,
        status,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Outcome of the admission transaction, resolved to an error by the caller.
enum Admission {
    Admitted(ConvTurn),
    Busy,
    NoConversation,
}

/// Admit a new Pending turn into a conversation.
///
/// Runs one transaction: read the conversation and its last turn's status,
/// reject while that turn is unprocessed, insert the new row, and advance
/// `last_turn_id`. The single writer thread makes the check-and-insert
/// race-free.
pub async fn create_turn(
    db: &Database,
    conversation_id: &str,
    request: &str,
) -> Result<ConvTurn, ParlanceError> {
    let conv_id = conversation_id.to_string();
    let request = request.to_string();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let conversation = {
                let mut stmt = tx.prepare(
                    "SELECT bot_id, app_id, user_identity, last_turn_id
                     FROM conversations WHERE id = ?1",
                )?;
                let result = stmt.query_row(params![conv_id], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                });
                match result {
                    Ok(conv) => conv,
                    Err(rusqlite::Error::QueryReturnedNoRows) => {
                        return Ok(Admission::NoConversation);
                    }
                    Err(e) => return Err(e),
                }
            };
            let (bot_id, app_id, user_identity, last_turn_id) = conversation;

            if let Some(last_id) = last_turn_id {
                let last_status: Option<i64> = {
                    let mut stmt =
                        tx.prepare("SELECT status FROM conv_turns WHERE id = ?1")?;
                    match stmt.query_row(params![last_id], |row| row.get(0)) {
                        Ok(status) => Some(status),
                        Err(rusqlite::Error::QueryReturnedNoRows) => None,
                        Err(e) => return Err(e),
                    }
                };
                if last_status
                    .is_some_and(|code| code < TurnStatus::Completed.code())
                {
                    return Ok(Admission::Busy);
                }
            }

            tx.execute(
                "INSERT INTO conv_turns
                     (conversation_id, bot_id, app_id, user_identity, request,
                      response, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, '', 0,
                         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![conv_id, bot_id, app_id, user_identity, request],
            )?;
            let turn_id = tx.last_insert_rowid();

            tx.execute(
                "UPDATE conversations
                 SET last_turn_id = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![turn_id, conv_id],
            )?;

            let turn = tx.query_row(
                &format!("SELECT {TURN_COLUMNS} FROM conv_turns WHERE id = ?1"),
                params![turn_id],
                map_turn,
            )?;

            tx.commit()?;
            Ok(Admission::Admitted(turn))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match outcome {
        Admission::Admitted(turn) => Ok(turn),
        Admission::Busy => Err(ParlanceError::Conflict(format!(
            "conversation {conversation_id} has an unprocessed turn"
        ))),
        Admission::NoConversation => Err(ParlanceError::NotFound {
            resource: "conversation",
            key: conversation_id.to_string(),
        }),
    }
}

/// Get a turn by ID.
pub async fn get_turn(db: &Database, id: i64) -> Result<Option<ConvTurn>, ParlanceError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {TURN_COLUMNS} FROM conv_turns WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], map_turn);
            match result {
                Ok(turn) => Ok(Some(turn)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the given turns, ordered by ID. Missing IDs are skipped.
pub async fn get_turns(db: &Database, ids: &[i64]) -> Result<Vec<ConvTurn>, ParlanceError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {TURN_COLUMNS} FROM conv_turns WHERE id IN ({placeholders}) ORDER BY id"
            ))?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), map_turn)?;
            let mut turns = Vec::new();
            for row in rows {
                turns.push(row?);
            }
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Write response text and status.
///
/// The `status < ?` guard makes the write monotone: terminal states are
/// idempotent and a late Processing write cannot clobber a terminal one.
pub async fn update_turn(
    db: &Database,
    id: i64,
    response: &str,
    status: TurnStatus,
) -> Result<(), ParlanceError> {
    let response = response.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conv_turns
                 SET response = ?1, status = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3 AND status < ?2",
                params![response, status.code(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use parlance_core::Conversation;

    use crate::queries::conversations;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn seed_conversation(db: &Database, id: &str) {
        conversations::create_conversation(
            db,
            &Conversation {
                id: id.to_string(),
                bot_id: 7,
                app_id: 3,
                user_identity: "user-1".to_string(),
                lang: "en".to_string(),
                last_turn_id: None,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
                updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn create_turn_inherits_conversation_fields() {
        let (db, _dir) = setup_db().await;
        seed_conversation(&db, "conv-1").await;

        let turn = create_turn(&db, "conv-1", "hello").await.unwrap();
        assert!(turn.id > 0);
        assert_eq!(turn.bot_id, 7);
        assert_eq!(turn.app_id, 3);
        assert_eq!(turn.user_identity, "user-1");
        assert_eq!(turn.request, "hello");
        assert_eq!(turn.response, "");
        assert_eq!(turn.status, TurnStatus::Pending);

        let conv = conversations::get_conversation(&db, "conv-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.last_turn_id, Some(turn.id));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = create_turn(&db, "conv-404", "hello").await.unwrap_err();
        assert!(matches!(
            err,
            ParlanceError::NotFound { resource: "conversation", .. }
        ));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unprocessed_last_turn_blocks_admission() {
        let (db, _dir) = setup_db().await;
        seed_conversation(&db, "conv-1").await;

        let first = create_turn(&db, "conv-1", "one").await.unwrap();
        let err = create_turn(&db, "conv-1", "two").await.unwrap_err();
        assert!(matches!(err, ParlanceError::Conflict(_)));

        // Still blocked while processing.
        update_turn(&db, first.id, "", TurnStatus::Processing)
            .await
            .unwrap();
        assert!(create_turn(&db, "conv-1", "two").await.is_err());

        // Terminal state admits again, for Completed and Error alike.
        update_turn(&db, first.id, "done", TurnStatus::Completed)
            .await
            .unwrap();
        let second = create_turn(&db, "conv-1", "two").await.unwrap();
        assert!(second.id > first.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_turn_is_monotone() {
        let (db, _dir) = setup_db().await;
        seed_conversation(&db, "conv-1").await;
        let turn = create_turn(&db, "conv-1", "hello").await.unwrap();

        update_turn(&db, turn.id, "answer", TurnStatus::Completed)
            .await
            .unwrap();

        // A late Processing write is a no-op.
        update_turn(&db, turn.id, "", TurnStatus::Processing)
            .await
            .unwrap();
        let current = get_turn(&db, turn.id).await.unwrap().unwrap();
        assert_eq!(current.status, TurnStatus::Completed);
        assert_eq!(current.response, "answer");

        // Re-writing the same terminal status is a no-op, not an error.
        update_turn(&db, turn.id, "other", TurnStatus::Completed)
            .await
            .unwrap();
        let current = get_turn(&db, turn.id).await.unwrap().unwrap();
        assert_eq!(current.response, "answer");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_turns_orders_by_id_and_skips_missing() {
        let (db, _dir) = setup_db().await;
        seed_conversation(&db, "conv-1").await;

        let first = create_turn(&db, "conv-1", "one").await.unwrap();
        update_turn(&db, first.id, "ok", TurnStatus::Completed)
            .await
            .unwrap();
        let second = create_turn(&db, "conv-1", "two").await.unwrap();

        let turns = get_turns(&db, &[second.id, 999, first.id]).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].id, first.id);
        assert_eq!(turns[1].id, second.id);

        assert!(get_turns(&db, &[]).await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn deleting_conversation_cascades_to_turns() {
        let (db, _dir) = setup_db().await;
        seed_conversation(&db, "conv-1").await;
        let turn = create_turn(&db, "conv-1", "hello").await.unwrap();

        conversations::delete_conversation(&db, "conv-1")
            .await
            .unwrap();
        assert!(get_turn(&db, turn.id).await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
