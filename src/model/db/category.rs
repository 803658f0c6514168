use std::ops::{Deref, DerefMut};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::{
    is_duplicate_key_error, Coll, Counter, Id, CATEGORY_POSITION_COUNTER_ID,
};

/// Categories seeded on first launch, in ballot order.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["President", "Vice President", "Secretary", "Treasurer"];

/// Core category data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCore {
    pub name: String,
    /// Creation order; ballots list categories by ascending position.
    pub position: u64,
}

/// A category without an ID.
pub type NewCategory = CategoryCore;

/// A category from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub category: CategoryCore,
}

impl Deref for Category {
    type Target = CategoryCore;

    fn deref(&self) -> &Self::Target {
        &self.category
    }
}

impl DerefMut for Category {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.category
    }
}

/// If there are no categories at all, seed the [`DEFAULT_CATEGORIES`].
///
/// This operation is idempotent.
pub async fn ensure_categories_exist(
    categories: &Coll<NewCategory>,
    counters: &Coll<Counter>,
) -> Result<()> {
    if categories.count_documents(None, None).await? > 0 {
        return Ok(());
    }

    for name in DEFAULT_CATEGORIES {
        let position = Counter::next(counters, CATEGORY_POSITION_COUNTER_ID).await?;
        let category = NewCategory {
            name: name.to_string(),
            position,
        };
        let result = categories.insert_one(category, None).await;
        if !is_duplicate_key_error(result.as_ref()) {
            result?;
        }
    }
    info!("Seeded default categories: {}", DEFAULT_CATEGORIES.join(", "));
    Ok(())
}
