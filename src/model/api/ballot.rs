use serde::{Deserialize, Serialize};

use crate::model::{ballot::CategoryListing, db::candidate::Candidate, mongodb::Id};
use crate::photo::PHOTO_ROUTE;

/// A candidate as shown on the ballot: no vote counts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BallotCandidate {
    pub id: Id,
    pub name: String,
    /// URL of the candidate's photo.
    pub photo: String,
}

/// A category as shown on the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BallotCategory {
    pub id: Id,
    pub name: String,
    pub candidates: Vec<BallotCandidate>,
}

/// A candidate with their current vote count.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CandidateResult {
    pub id: Id,
    pub name: String,
    pub photo: String,
    pub votes: u64,
}

/// A category with its candidates' vote counts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryResults {
    pub id: Id,
    pub name: String,
    pub total_votes: u64,
    pub candidates: Vec<CandidateResult>,
}

fn photo_url(candidate: &Candidate) -> String {
    format!("{}/{}", PHOTO_ROUTE, candidate.photo)
}

impl From<&Candidate> for BallotCandidate {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name.clone(),
            photo: photo_url(candidate),
        }
    }
}

impl From<CategoryListing> for BallotCategory {
    fn from(listing: CategoryListing) -> Self {
        Self {
            id: listing.category.id,
            name: listing.category.category.name,
            candidates: listing.candidates.iter().map(Into::into).collect(),
        }
    }
}

impl From<&Candidate> for CandidateResult {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name.clone(),
            photo: photo_url(candidate),
            votes: candidate.votes,
        }
    }
}

impl From<CategoryListing> for CategoryResults {
    fn from(listing: CategoryListing) -> Self {
        let total_votes = listing.total_votes();
        Self {
            id: listing.category.id,
            name: listing.category.category.name,
            total_votes,
            candidates: listing.candidates.iter().map(Into::into).collect(),
        }
    }
}

/// A vote, as submitted by a student.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct VoteRequest {
    pub candidate: Id,
}
