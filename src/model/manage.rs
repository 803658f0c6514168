use log::{error, info, warn};
use mongodb::{Client, Database};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    db::{
        candidate::{Candidate, NewCandidate},
        category::Category,
    },
    mongodb::{retry_transient, Coll, Counter, Id, CANDIDATE_POSITION_COUNTER_ID},
};
use crate::photo::{photo_file_name, PhotoStore};

/// A validated-on-use request to add a candidate.
pub struct CandidateUpload<'a> {
    pub name: &'a str,
    pub category_id: Id,
    pub photo_bytes: &'a [u8],
    pub photo_file_name: &'a str,
}

/// Outcome of removing a candidate. The record is always gone; the photo may
/// not be.
#[derive(Debug, Deserialize, Serialize)]
pub struct CandidateRemoval {
    pub candidate: Id,
    pub photo_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_error: Option<String>,
}

/// Add a candidate with no votes to an existing category.
///
/// The photo is stored before the candidate is inserted, so a candidate is
/// never visible without its photo. If the insert fails, the photo is removed
/// again.
pub async fn add_candidate(
    db_client: &Client,
    db: &Database,
    photos: &PhotoStore,
    upload: CandidateUpload<'_>,
) -> Result<Candidate> {
    // Validate everything before touching storage.
    let name = upload.name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest("Candidate name must not be empty".to_string()));
    }
    let file_name = photo_file_name(upload.photo_file_name)?;
    if upload.photo_bytes.is_empty() {
        return Err(Error::InvalidPhoto("photo is empty".to_string()));
    }
    let categories = Coll::<Category>::from_db(db);
    if categories
        .find_one(upload.category_id.as_doc(), None)
        .await?
        .is_none()
    {
        return Err(Error::InvalidCategory(upload.category_id));
    }

    let photo = photos.save(upload.photo_bytes, &file_name).await?;
    match insert_candidate(db_client, db, name, &photo, upload.category_id).await {
        Ok(candidate) => {
            info!(
                "Added candidate {} '{}' to category {}",
                candidate.id, candidate.name, candidate.category_id
            );
            Ok(candidate)
        }
        Err(err) => {
            if let Err(cleanup_err) = photos.delete(&photo).await {
                error!("Failed to remove photo {photo} of rejected candidate: {cleanup_err}");
            }
            Err(err)
        }
    }
}

/// Assign the next position and insert the candidate, in one transaction.
///
/// Concurrent additions conflict on the position counter, so the transaction
/// is retried.
async fn insert_candidate(
    db_client: &Client,
    db: &Database,
    name: &str,
    photo: &str,
    category_id: Id,
) -> Result<Candidate> {
    let counters = Coll::<Counter>::from_db(db);
    let candidates = Coll::<Candidate>::from_db(db);
    retry_transient("candidate insert", || {
        try_insert_candidate(db_client, &counters, &candidates, name, photo, category_id)
    })
    .await
}

/// One attempt at the candidate insert transaction.
async fn try_insert_candidate(
    db_client: &Client,
    counters: &Coll<Counter>,
    candidates: &Coll<Candidate>,
    name: &str,
    photo: &str,
    category_id: Id,
) -> Result<Candidate> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let inserted = async {
        let position =
            Counter::next_with_session(counters, CANDIDATE_POSITION_COUNTER_ID, &mut session)
                .await?;
        let candidate = Candidate {
            id: Id::new(),
            candidate: NewCandidate::new(
                name.to_string(),
                photo.to_string(),
                category_id,
                position,
            ),
        };
        candidates
            .insert_one_with_session(&candidate, None, &mut session)
            .await?;
        Ok::<_, Error>(candidate)
    }
    .await;

    match inserted {
        Ok(candidate) => {
            session.commit_transaction().await?;
            Ok(candidate)
        }
        Err(err) => {
            if let Err(abort_err) = session.abort_transaction().await {
                warn!("Failed to abort candidate insert transaction: {abort_err}");
            }
            Err(err)
        }
    }
}

/// Remove a candidate, then its photo.
///
/// If the photo cannot be deleted, the removal still stands: the failure is
/// logged and reported in the returned [`CandidateRemoval`].
pub async fn remove_candidate(
    db: &Database,
    photos: &PhotoStore,
    candidate_id: Id,
) -> Result<CandidateRemoval> {
    let candidates = Coll::<Candidate>::from_db(db);
    let candidate = candidates
        .find_one_and_delete(candidate_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{}'", candidate_id)))?;
    info!("Removed candidate {} '{}'", candidate.id, candidate.name);

    let (photo_deleted, photo_error) = match photos.delete(&candidate.photo).await {
        Ok(true) => (true, None),
        Ok(false) => {
            warn!(
                "Photo {} of removed candidate {} was already missing",
                candidate.photo, candidate.id
            );
            (false, Some("photo was already missing".to_string()))
        }
        Err(err) => {
            error!(
                "Failed to delete photo {} of removed candidate {}: {err}",
                candidate.photo, candidate.id
            );
            (false, Some(err.to_string()))
        }
    };

    Ok(CandidateRemoval {
        candidate: candidate.id,
        photo_deleted,
        photo_error,
    })
}
