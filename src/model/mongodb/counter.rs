use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument},
    ClientSession,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::{errors::is_duplicate_key_error, Coll};

/// ID of the counter that orders categories.
pub const CATEGORY_POSITION_COUNTER_ID: &str = "category_position";

/// ID of the counter that orders candidates.
pub const CANDIDATE_POSITION_COUNTER_ID: &str = "candidate_position";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u64,
}

impl Counter {
    /// Create a new `Counter` with the given ID, starting at the given value.
    pub fn new(id: impl Into<String>, start: u64) -> Self {
        Self {
            id: id.into(),
            next: start,
        }
    }

    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u64> {
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, doc! { "$inc": { "next": 1 } }, next_options())
            .await?;
        Self::value_of(counter, id)
    }

    /// As [`Counter::next`], but as part of the given session's transaction.
    pub async fn next_with_session(
        counters: &Coll<Counter>,
        id: &str,
        session: &mut ClientSession,
    ) -> Result<u64> {
        let counter = counters
            .find_one_and_update_with_session(
                doc! { "_id": id },
                doc! { "$inc": { "next": 1 } },
                next_options(),
                session,
            )
            .await?;
        Self::value_of(counter, id)
    }

    fn value_of(counter: Option<Counter>, id: &str) -> Result<u64> {
        counter
            .map(|counter| counter.next)
            .ok_or_else(|| Error::not_found(format!("Counter with ID '{}'", id)))
    }
}

fn next_options() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::Before)
        .build()
}

/// Ensure the position counters exist, starting them at 1 if not.
///
/// This operation is idempotent.
pub async fn ensure_position_counters_exist(counters: &Coll<Counter>) -> Result<()> {
    for id in [CATEGORY_POSITION_COUNTER_ID, CANDIDATE_POSITION_COUNTER_ID] {
        let result = counters.insert_one(Counter::new(id, 1), None).await;
        if !is_duplicate_key_error(result.as_ref()) {
            result?;
        }
    }
    Ok(())
}
