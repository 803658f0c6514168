use mongodb::{Client, Database};
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{api::ballot::VoteRequest, auth::AccessContext, vote::cast_vote},
};

pub fn routes() -> Vec<Route> {
    routes![vote]
}

#[post("/vote", data = "<vote>", format = "json")]
async fn vote(
    ctx: AccessContext,
    vote: Json<VoteRequest>,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<()> {
    let student = ctx.student()?;
    cast_vote(db_client, db, student, vote.candidate).await
}
