use mongodb::{
    bson::doc,
    options::{FindOptions, SessionOptions},
    Client, Database,
};

use crate::error::Result;
use crate::model::{
    db::{candidate::Candidate, category::Category},
    mongodb::{Coll, Id},
};

/// A category together with its candidates, both in creation order.
#[derive(Debug, Clone)]
pub struct CategoryListing {
    pub category: Category,
    pub candidates: Vec<Candidate>,
}

impl CategoryListing {
    /// Total votes cast for candidates in this category.
    pub fn total_votes(&self) -> u64 {
        self.candidates.iter().map(|candidate| candidate.votes).sum()
    }
}

/// Read every category and its candidates, ordered by creation.
///
/// Reads from a single snapshot, so vote counts are never seen half-updated.
pub async fn list_categories_with_candidates(
    db_client: &Client,
    db: &Database,
) -> Result<Vec<CategoryListing>> {
    let categories = Coll::<Category>::from_db(db);
    let candidates = Coll::<Candidate>::from_db(db);

    let session_options = SessionOptions::builder().snapshot(true).build();
    let mut session = db_client.start_session(Some(session_options)).await?;
    let by_position = || FindOptions::builder().sort(doc! { "position": 1 }).build();

    let mut listings = Vec::new();
    let mut category_cursor = categories
        .find_with_session(None, by_position(), &mut session)
        .await?;
    while let Some(category) = category_cursor.next(&mut session).await {
        listings.push(CategoryListing {
            category: category?,
            candidates: Vec::new(),
        });
    }

    let mut candidate_cursor = candidates
        .find_with_session(None, by_position(), &mut session)
        .await?;
    while let Some(candidate) = candidate_cursor.next(&mut session).await {
        let candidate = candidate?;
        // Every candidate's category exists, since categories are never deleted.
        if let Some(listing) = listings
            .iter_mut()
            .find(|listing| listing.category.id == candidate.category_id)
        {
            listing.candidates.push(candidate);
        }
    }

    Ok(listings)
}

/// Look up a single candidate.
pub async fn get_candidate(db: &Database, id: Id) -> Result<Candidate> {
    Candidate::get(&Coll::from_db(db), id).await
}
