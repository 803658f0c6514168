use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::{Coll, Id};

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    /// File name of the candidate's photo, relative to the upload directory.
    pub photo: String,
    /// Only ever incremented, by the vote transaction.
    pub votes: u64,
    pub category_id: Id,
    /// Creation order within the ballot.
    pub position: u64,
}

impl CandidateCore {
    /// A candidate with no votes yet.
    pub fn new(name: String, photo: String, category_id: Id, position: u64) -> Self {
        Self {
            name,
            photo,
            votes: 0,
            category_id,
            position,
        }
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Candidate {
    /// Look up a single candidate.
    pub async fn get(candidates: &Coll<Candidate>, id: Id) -> Result<Self> {
        candidates
            .find_one(id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate with ID '{}'", id)))
    }
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}
