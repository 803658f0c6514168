use log::debug;
use mongodb::Database;

use crate::error::Result;
use crate::model::{
    db::{admin::ensure_admin_exists, category::ensure_categories_exist},
    mongodb::{ensure_indexes_exist, ensure_position_counters_exist, Coll},
};

/// Prepare the database for use: indexes, position counters, the default
/// admin if there is none, and the default categories if there are none.
///
/// This operation is idempotent and runs on every launch.
pub async fn bootstrap(db: &Database) -> Result<()> {
    debug!("Bootstrapping database {}", db.name());
    ensure_indexes_exist(db).await?;
    let counters = Coll::from_db(db);
    ensure_position_counters_exist(&counters).await?;
    ensure_admin_exists(&Coll::from_db(db)).await?;
    ensure_categories_exist(&Coll::from_db(db), &counters).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::db::{
        admin::{Admin, DEFAULT_ADMIN_USERNAME},
        category::{Category, DEFAULT_CATEGORIES},
    };
    use mongodb::bson::doc;
    use rocket::futures::TryStreamExt;

    #[backend_test]
    async fn bootstrap_is_idempotent(db: Database, admins: Coll<Admin>, categories: Coll<Category>) {
        // Setup already bootstrapped once.
        bootstrap(&db).await.unwrap();
        bootstrap(&db).await.unwrap();

        assert_eq!(admins.count_documents(None, None).await.unwrap(), 1);
        let admin = admins.find_one(None, None).await.unwrap().unwrap();
        assert_eq!(admin.username, DEFAULT_ADMIN_USERNAME);

        let names: Vec<String> = categories
            .find(None, None)
            .await
            .unwrap()
            .map_ok(|category| category.category.name)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(names.len(), DEFAULT_CATEGORIES.len());
        for name in DEFAULT_CATEGORIES {
            assert!(names.iter().any(|n| n == name));
        }
    }

    #[backend_test]
    async fn existing_categories_are_not_reseeded(db: Database, categories: Coll<Category>) {
        categories
            .delete_many(doc! { "name": { "$ne": "President" } }, None)
            .await
            .unwrap();
        bootstrap(&db).await.unwrap();
        assert_eq!(categories.count_documents(None, None).await.unwrap(), 1);
    }
}
