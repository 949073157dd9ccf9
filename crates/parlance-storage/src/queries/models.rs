// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model catalog queries. Deletion is soft: `deleted_at` non-null rows are
//! invisible to every read.

use std::str::FromStr;

use rusqlite::params;

use parlance_core::{Model, ModelFunction, ParlanceError};

use crate::database::Database;

const MODEL_COLUMNS: &str = "id, provider, provider_model, max_token, prompt_price_usd, \
     completion_price_usd, price_usd, custom_config, function, created_at, deleted_at";

fn map_model(row: &rusqlite::Row<'_>) -> Result<Model, rusqlite::Error> {
    let function_text: String = row.get(8)?;
    let function = ModelFunction::from_str(&function_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let custom_config: Option<String> = row.get(7)?;
    let custom_config = match custom_config {
        Some(text) => Some(serde_json::from_str(&text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };
    Ok(Model {
        id: row.get(0)?,
        provider: row.get(1)?,
        provider_model: row.get(2)?,
        max_token: row.get(3)?,
        prompt_price_usd: row.get(4)?,
        completion_price_usd: row.get(5)?,
        price_usd: row.get(6)?,
        custom_config,
        function,
        created_at: row.get(9)?,
        deleted_at: row.get(10)?,
    })
}

/// Get a live model by its `provider:provider_model` name.
pub async fn get_model(db: &Database, name: &str) -> Result<Option<Model>, ParlanceError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MODEL_COLUMNS} FROM models
                 WHERE provider || ':' || provider_model = ?1 AND deleted_at IS NULL"
            ))?;
            let result = stmt.query_row(params![name], map_model);
            match result {
                Ok(model) => Ok(Some(model)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List live models, optionally filtered by function.
pub async fn get_models_by_function(
    db: &Database,
    function: Option<ModelFunction>,
) -> Result<Vec<Model>, ParlanceError> {
    let function = function.map(|f| f.to_string());
    db.connection()
        .call(move |conn| {
            let mut models = Vec::new();
            match &function {
                Some(function_filter) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MODEL_COLUMNS} FROM models
                         WHERE function = ?1 AND deleted_at IS NULL ORDER BY id"
                    ))?;
                    let rows = stmt.query_map(params![function_filter], map_model)?;
                    for row in rows {
                        models.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MODEL_COLUMNS} FROM models
                         WHERE deleted_at IS NULL ORDER BY id"
                    ))?;
                    let rows = stmt.query_map([], map_model)?;
                    for row in rows {
                        models.push(row?);
                    }
                }
            }
            Ok(models)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Outcome of the insert transaction.
enum Insertion {
    Created(Model),
    NameTaken,
}

/// Insert a model, assigning id and `created_at`.
pub async fn create_model(db: &Database, model: &Model) -> Result<Model, ParlanceError> {
    let model = model.clone();
    let name = model.name();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let taken: i64 = tx.query_row(
                "SELECT count(*) FROM models
                 WHERE provider = ?1 AND provider_model = ?2 AND deleted_at IS NULL",
                params![model.provider, model.provider_model],
                |row| row.get(0),
            )?;
            if taken > 0 {
                return Ok(Insertion::NameTaken);
            }

            let custom_config = model
                .custom_config
                .as_ref()
                .map(|value| value.to_string());
            tx.execute(
                "INSERT INTO models
                     (provider, provider_model, max_token, prompt_price_usd,
                      completion_price_usd, price_usd, custom_config, function, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![
                    model.provider,
                    model.provider_model,
                    model.max_token,
                    model.prompt_price_usd,
                    model.completion_price_usd,
                    model.price_usd,
                    custom_config,
                    model.function.to_string(),
                ],
            )?;
            let id = tx.last_insert_rowid();

            let created = tx.query_row(
                &format!("SELECT {MODEL_COLUMNS} FROM models WHERE id = ?1"),
                params![id],
                map_model,
            )?;

            tx.commit()?;
            Ok(Insertion::Created(created))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match outcome {
        Insertion::Created(created) => Ok(created),
        Insertion::NameTaken => Err(ParlanceError::Conflict(format!(
            "model {name} already registered"
        ))),
    }
}
