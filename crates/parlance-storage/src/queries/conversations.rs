// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use rusqlite::params;

use parlance_core::{Conversation, ParlanceError};

use crate::database::Database;

fn map_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        bot_id: row.get(1)?,
        app_id: row.get(2)?,
        user_identity: row.get(3)?,
        lang: row.get(4)?,
        last_turn_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Create a new conversation.
pub async fn create_conversation(
    db: &Database,
    conv: &Conversation,
) -> Result<(), ParlanceError> {
    let conv = conv.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations
                     (id, bot_id, app_id, user_identity, lang, last_turn_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    conv.id,
                    conv.bot_id,
                    conv.app_id,
                    conv.user_identity,
                    conv.lang,
                    conv.last_turn_id,
                    conv.created_at,
                    conv.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, ParlanceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, bot_id, app_id, user_identity, lang, last_turn_id,
                        created_at, updated_at
                 FROM conversations WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], map_conversation);
            match result {
                Ok(conv) => Ok(Some(conv)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a conversation; its turns cascade.
pub async fn delete_conversation(db: &Database, id: &str) -> Result<(), ParlanceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_conversation(id: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            bot_id: 1,
            app_id: 1,
            user_identity: "user-1".to_string(),
            lang: "en".to_string(),
            last_turn_id: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_get_conversation_roundtrips() {
        let (db, _dir) = setup_db().await;
        create_conversation(&db, &make_conversation("conv-1"))
            .await
            .unwrap();

        let retrieved = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(retrieved.id, "conv-1");
        assert_eq!(retrieved.bot_id, 1);
        assert_eq!(retrieved.lang, "en");
        assert_eq!(retrieved.last_turn_id, None);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_conversation_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_conversation(&db, "no-such").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_conversation_removes_row() {
        let (db, _dir) = setup_db().await;
        create_conversation(&db, &make_conversation("conv-del"))
            .await
            .unwrap();

        delete_conversation(&db, "conv-del").await.unwrap();
        assert!(get_conversation(&db, "conv-del").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
