use log::info;
use mongodb::{Client, Database};
use rocket::{
    form::{self, Form},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            ballot::{CandidateResult, CategoryResults},
            candidate::CandidateForm,
            student::{ProvisionSummary, StudentNumbers},
        },
        auth::{AccessContext, AdminSession},
        ballot::list_categories_with_candidates,
        db::student::{provision_students, NewStudent},
        manage::{add_candidate, remove_candidate, CandidateRemoval},
        mongodb::{Coll, Id},
    },
    photo::PhotoStore,
};

pub fn routes() -> Vec<Route> {
    routes![
        get_candidates,
        create_candidate,
        delete_candidate,
        create_students,
    ]
}

#[get("/admin/candidates")]
async fn get_candidates(
    ctx: AccessContext,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<Json<Vec<CategoryResults>>> {
    ctx.admin()?;
    let listings = list_categories_with_candidates(db_client, db).await?;
    Ok(Json(listings.into_iter().map(Into::into).collect()))
}

#[post("/admin/candidates", data = "<form>")]
async fn create_candidate(
    _admin: AdminSession,
    form: form::Result<'_, Form<CandidateForm>>,
    db_client: &State<Client>,
    db: &State<Database>,
    photos: &State<PhotoStore>,
) -> Result<Json<CandidateResult>> {
    let form = form.map_err(|errors| Error::BadRequest(errors.to_string()))?;
    let candidate = add_candidate(db_client, db, photos, form.as_upload()).await?;
    Ok(Json((&candidate).into()))
}

#[delete("/admin/candidates/<candidate_id>")]
async fn delete_candidate(
    ctx: AccessContext,
    candidate_id: Id,
    db: &State<Database>,
    photos: &State<PhotoStore>,
) -> Result<Json<CandidateRemoval>> {
    ctx.admin()?;
    let removal = remove_candidate(db, photos, candidate_id).await?;
    Ok(Json(removal))
}

#[post("/admin/students", data = "<numbers>", format = "json")]
async fn create_students(
    ctx: AccessContext,
    numbers: Json<StudentNumbers>,
    students: Coll<NewStudent>,
) -> Result<Json<ProvisionSummary>> {
    let admin = ctx.admin()?;
    let added = provision_students(&students, &numbers.student_numbers).await?;
    info!(
        "Admin {admin} registered {added} of {} submitted students",
        numbers.student_numbers.len()
    );
    Ok(Json(ProvisionSummary { added }))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json::json,
    };

    use crate::model::db::{
        candidate::{Candidate, NewCandidate},
        student::Student,
    };
    use crate::test_support::{first_category, insert, photo_store};

    use super::*;

    const BOUNDARY: &str = "candidate-form-boundary";

    /// Build a `multipart/form-data` body for the candidate form.
    fn multipart(name: &str, category: Id, file_name: &str, photo: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"name\"\r\n\r\n\
             {name}\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"category\"\r\n\r\n\
             {category}\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"photo\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(photo);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn upload<'c>(
        client: &'c Client,
        name: &str,
        category: Id,
        file_name: &str,
    ) -> LocalResponse<'c> {
        client
            .post(uri!(create_candidate))
            .header(ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY)))
            .body(multipart(name, category, file_name, b"not really a png"))
            .dispatch()
            .await
    }

    #[backend_test(admin)]
    async fn add_and_remove_candidate(client: Client, db: Database, candidates: Coll<Candidate>) {
        let president = first_category(&db).await;

        let response = upload(&client, "Ada Lovelace", president, "ada.png").await;
        assert_eq!(Status::Ok, response.status());
        let created = response.into_json::<CandidateResult>().await.unwrap();
        assert_eq!(created.name, "Ada Lovelace");
        assert_eq!(created.votes, 0);

        let stored = Candidate::get(&candidates, created.id).await.unwrap();
        assert_eq!(stored.category_id, president);
        assert_eq!(created.photo, format!("/static/img/{}", stored.photo));
        assert!(photo_store(&client).contains(&stored.photo).await);

        // The photo is served.
        let response = client.get(created.photo.clone()).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(
            response.into_bytes().await.unwrap(),
            b"not really a png".to_vec()
        );

        // The admin listing includes it.
        let listing = client
            .get(uri!(get_candidates))
            .dispatch()
            .await
            .into_json::<Vec<CategoryResults>>()
            .await
            .unwrap();
        assert_eq!(listing[0].candidates, vec![created.clone()]);

        let response = client
            .delete(uri!(delete_candidate(created.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let removal = response.into_json::<CandidateRemoval>().await.unwrap();
        assert_eq!(removal.candidate, created.id);
        assert!(removal.photo_deleted);
        assert!(!photo_store(&client).contains(&stored.photo).await);
        assert_eq!(candidates.count_documents(None, None).await.unwrap(), 0);

        // Already gone.
        let response = client
            .delete(uri!(delete_candidate(created.id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn upload_rejections(client: Client, db: Database, candidates: Coll<Candidate>) {
        let president = first_category(&db).await;

        let response = upload(&client, "Ada Lovelace", Id::new(), "ada.png").await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        let response = upload(&client, "Ada Lovelace", president, "ada.exe").await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY)))
            .body(format!("--{BOUNDARY}--\r\n"))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        assert_eq!(candidates.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(student)]
    async fn students_are_forbidden(client: Client, db: Database, candidates: Coll<NewCandidate>) {
        let president = first_category(&db).await;
        let ada = insert(&candidates, NewCandidate::example(president)).await;

        let response = client.get(uri!(get_candidates)).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());

        let response = upload(&client, "Alan Turing", president, "alan.png").await;
        assert_eq!(Status::Forbidden, response.status());
        assert_eq!(photo_store(&client).file_count().await, 0);

        let response = client.delete(uri!(delete_candidate(ada))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());

        let response = client
            .post(uri!(create_students))
            .header(ContentType::JSON)
            .body(json!({ "student_numbers": ["1"] }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        assert_eq!(candidates.count_documents(None, None).await.unwrap(), 1);
    }

    #[backend_test]
    async fn anonymous_is_unauthorized(client: Client) {
        let response = client.get(uri!(get_candidates)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());

        let response = upload(&client, "Alan Turing", Id::new(), "alan.png").await;
        assert_eq!(Status::Unauthorized, response.status());

        let response = client.delete(uri!(delete_candidate(Id::new()))).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(student)]
    async fn malformed_upload_is_refused_before_parsing(client: Client) {
        // Without an admin session the body is never read, so even garbage
        // gets the access status rather than a form error.
        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY)))
            .body("not a multipart body")
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
        assert_eq!(photo_store(&client).file_count().await, 0);
    }

    #[backend_test(admin)]
    async fn register_students(client: Client, students: Coll<Student>) {
        let response = client
            .post(uri!(create_students))
            .header(ContentType::JSON)
            .body(json!({ "student_numbers": ["20230001", " 20230002 ", "", "20230001"] }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let summary = response.into_json::<ProvisionSummary>().await.unwrap();
        assert_eq!(summary, ProvisionSummary { added: 2 });

        let response = client
            .post(uri!(create_students))
            .header(ContentType::JSON)
            .body(json!({ "student_numbers": ["20230002", "20230003"] }).to_string())
            .dispatch()
            .await;
        let summary = response.into_json::<ProvisionSummary>().await.unwrap();
        assert_eq!(summary, ProvisionSummary { added: 1 });

        assert_eq!(students.count_documents(None, None).await.unwrap(), 3);
    }
}
