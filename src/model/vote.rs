use log::{info, warn};
use mongodb::{bson::doc, Client, ClientSession, Database};

use crate::error::{Error, Result};
use crate::model::{
    db::{candidate::Candidate, student::Student},
    mongodb::{retry_transient, Coll, Id},
};

/// Record `student_id`'s vote for `candidate_id`.
///
/// The candidate's count goes up by one and the student is marked as voted,
/// in a single transaction: either both happen or neither does. A student can
/// only ever vote once; every later attempt fails with [`Error::AlreadyVoted`]
/// and changes nothing. An unknown candidate fails with
/// [`Error::InvalidCandidate`] and leaves the student free to vote.
pub async fn cast_vote(
    db_client: &Client,
    db: &Database,
    student_id: Id,
    candidate_id: Id,
) -> Result<()> {
    let students = Coll::<Student>::from_db(db);
    let candidates = Coll::<Candidate>::from_db(db);

    // A concurrent vote by the same student conflicts on the student document;
    // the retry sees whatever that vote committed.
    retry_transient("vote", || {
        try_cast_vote(db_client, &students, &candidates, student_id, candidate_id)
    })
    .await?;
    info!("Student {student_id} voted for candidate {candidate_id}");
    Ok(())
}

/// One attempt at the vote transaction.
async fn try_cast_vote(
    db_client: &Client,
    students: &Coll<Student>,
    candidates: &Coll<Candidate>,
    student_id: Id,
    candidate_id: Id,
) -> Result<()> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    match record_vote(&mut session, students, candidates, student_id, candidate_id).await {
        Ok(()) => {
            session.commit_transaction().await?;
            Ok(())
        }
        Err(err) => {
            if let Err(abort_err) = session.abort_transaction().await {
                warn!("Failed to abort vote transaction: {abort_err}");
            }
            Err(err)
        }
    }
}

/// The writes making up a vote, inside an open transaction.
async fn record_vote(
    session: &mut ClientSession,
    students: &Coll<Student>,
    candidates: &Coll<Candidate>,
    student_id: Id,
    candidate_id: Id,
) -> Result<()> {
    // Check-and-set: only matches if the student has not voted yet.
    let not_yet_voted = doc! {
        "_id": student_id,
        "voted": false,
    };
    let mark_voted = doc! {
        "$set": { "voted": true }
    };
    let flipped = students
        .update_one_with_session(not_yet_voted, mark_voted, None, session)
        .await?;
    if flipped.matched_count == 0 {
        let exists = students
            .find_one_with_session(student_id.as_doc(), None, session)
            .await?
            .is_some();
        return Err(if exists {
            Error::AlreadyVoted
        } else {
            Error::not_found(format!("Student with ID '{}'", student_id))
        });
    }

    let increment = doc! {
        "$inc": { "votes": 1 }
    };
    let incremented = candidates
        .update_one_with_session(candidate_id.as_doc(), increment, None, session)
        .await?;
    if incremented.matched_count == 0 {
        return Err(Error::InvalidCandidate(candidate_id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::local::asynchronous::Client;

    use crate::model::db::{
        candidate::NewCandidate,
        student::NewStudent,
    };
    use crate::test_support::{insert, mongo_client};

    /// Insert a candidate into the first default category.
    async fn candidate(db: &Database, example: fn(Id) -> NewCandidate) -> Id {
        let category = crate::test_support::first_category(db).await;
        insert(&Coll::<NewCandidate>::from_db(db), example(category)).await
    }

    async fn votes_of(db: &Database, id: Id) -> u64 {
        Candidate::get(&Coll::from_db(db), id).await.unwrap().votes
    }

    async fn has_voted(db: &Database, id: Id) -> bool {
        Coll::<Student>::from_db(db)
            .find_one(id.as_doc(), None)
            .await
            .unwrap()
            .unwrap()
            .voted
    }

    #[backend_test]
    async fn vote_counts_once(client: Client, db: Database, new_students: Coll<NewStudent>) {
        let mongo = mongo_client(&client);
        let ada = candidate(&db, NewCandidate::example).await;
        let alan = candidate(&db, NewCandidate::example2).await;
        let student = insert(&new_students, NewStudent::example()).await;

        cast_vote(&mongo, &db, student, ada).await.unwrap();
        assert!(has_voted(&db, student).await);
        assert_eq!(votes_of(&db, ada).await, 1);

        // Any second vote is rejected, for any candidate.
        for target in [ada, alan] {
            let result = cast_vote(&mongo, &db, student, target).await;
            assert!(matches!(result, Err(Error::AlreadyVoted)));
        }
        assert_eq!(votes_of(&db, ada).await, 1);
        assert_eq!(votes_of(&db, alan).await, 0);
    }

    #[backend_test]
    async fn distinct_students_add_up(client: Client, db: Database, new_students: Coll<NewStudent>) {
        const N: usize = 5;
        let mongo = mongo_client(&client);
        let ada = candidate(&db, NewCandidate::example).await;
        let alan = candidate(&db, NewCandidate::example2).await;

        for i in 0..N {
            let student = insert(&new_students, NewStudent::new(format!("s{i}"))).await;
            cast_vote(&mongo, &db, student, ada).await.unwrap();
        }

        assert_eq!(votes_of(&db, ada).await, N as u64);
        assert_eq!(votes_of(&db, alan).await, 0);
    }

    #[backend_test]
    async fn unknown_candidate_leaves_student_unvoted(
        client: Client,
        db: Database,
        new_students: Coll<NewStudent>,
    ) {
        let mongo = mongo_client(&client);
        let student = insert(&new_students, NewStudent::example()).await;
        let missing = Id::new();

        let result = cast_vote(&mongo, &db, student, missing).await;
        assert!(matches!(result, Err(Error::InvalidCandidate(id)) if id == missing));
        assert!(!has_voted(&db, student).await);

        // The student can still vote properly afterwards.
        let ada = candidate(&db, NewCandidate::example).await;
        cast_vote(&mongo, &db, student, ada).await.unwrap();
        assert_eq!(votes_of(&db, ada).await, 1);
    }

    #[backend_test]
    async fn unknown_student_is_not_found(client: Client, db: Database) {
        let mongo = mongo_client(&client);
        let ada = candidate(&db, NewCandidate::example).await;

        let result = cast_vote(&mongo, &db, Id::new(), ada).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(votes_of(&db, ada).await, 0);
    }

    #[backend_test]
    async fn concurrent_votes_by_one_student(
        client: Client,
        db: Database,
        new_students: Coll<NewStudent>,
    ) {
        let mongo = mongo_client(&client);
        let ada = candidate(&db, NewCandidate::example).await;
        let alan = candidate(&db, NewCandidate::example2).await;
        let student = insert(&new_students, NewStudent::example()).await;

        let (first, second) = rocket::tokio::join!(
            cast_vote(&mongo, &db, student, ada),
            cast_vote(&mongo, &db, student, alan),
        );

        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "results: {first:?}, {second:?}");
        assert!(
            matches!(first, Err(Error::AlreadyVoted)) || matches!(second, Err(Error::AlreadyVoted))
        );
        assert_eq!(votes_of(&db, ada).await + votes_of(&db, alan).await, 1);
        assert!(has_voted(&db, student).await);
    }
}
