use mongodb::{Client, Database};
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::ballot::{BallotCategory, CategoryResults},
        auth::AccessContext,
        ballot::list_categories_with_candidates,
    },
};

pub fn routes() -> Vec<Route> {
    routes![ballot, results]
}

#[get("/ballot")]
async fn ballot(
    ctx: AccessContext,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<Json<Vec<BallotCategory>>> {
    ctx.authenticated()?;
    let listings = list_categories_with_candidates(db_client, db).await?;
    Ok(Json(listings.into_iter().map(Into::into).collect()))
}

#[get("/results")]
async fn results(
    ctx: AccessContext,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<Json<Vec<CategoryResults>>> {
    ctx.authenticated()?;
    let listings = list_categories_with_candidates(db_client, db).await?;
    Ok(Json(listings.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use crate::model::{
        db::{candidate::NewCandidate, category::DEFAULT_CATEGORIES},
        mongodb::Coll,
    };
    use crate::test_support::first_category;

    use super::*;

    #[backend_test]
    async fn ballot_requires_session(client: Client) {
        let response = client.get(uri!(ballot)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
        let response = client.get(uri!(results)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(student)]
    async fn student_sees_ballot(client: Client, db: Database, candidates: Coll<NewCandidate>) {
        let president = first_category(&db).await;
        candidates
            .insert_one(NewCandidate::example(president), None)
            .await
            .unwrap();

        let response = client.get(uri!(ballot)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let ballot = response
            .into_json::<Vec<BallotCategory>>()
            .await
            .unwrap();

        let names = ballot
            .iter()
            .map(|category| category.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, DEFAULT_CATEGORIES);
        assert_eq!(ballot[0].id, president);
        assert_eq!(ballot[0].candidates.len(), 1);
        assert_eq!(ballot[0].candidates[0].name, "Ada Lovelace");
        assert_eq!(ballot[0].candidates[0].photo, "/static/img/ada.png");
    }

    #[backend_test(admin)]
    async fn admin_sees_results(client: Client, db: Database, candidates: Coll<NewCandidate>) {
        let president = first_category(&db).await;
        let mut ada = NewCandidate::example(president);
        ada.votes = 3;
        let mut alan = NewCandidate::example2(president);
        alan.votes = 1;
        candidates.insert_one(ada, None).await.unwrap();
        candidates.insert_one(alan, None).await.unwrap();

        let response = client.get(uri!(results)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let results = response
            .into_json::<Vec<CategoryResults>>()
            .await
            .unwrap();

        assert_eq!(results[0].total_votes, 4);
        assert_eq!(results[0].candidates[0].votes, 3);
        assert_eq!(results[0].candidates[1].votes, 1);
        assert!(results[1..].iter().all(|category| category.total_votes == 0));
    }
}
