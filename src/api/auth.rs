use log::{debug, info};
use rocket::{
    http::{Cookie, CookieJar},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::Result,
    model::{
        api::login::{LoginRequest, SessionInfo},
        auth::{AccessContext, AuthToken, AUTH_TOKEN_COOKIE},
        db::{admin::Admin, student::Student},
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![session, login, logout]
}

#[get("/auth")]
async fn session(ctx: AccessContext) -> Json<SessionInfo> {
    Json(SessionInfo {
        role: ctx.role().to_string(),
    })
}

#[post("/auth", data = "<request>", format = "json")]
async fn login(
    request: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    students: Coll<Student>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<Json<SessionInfo>> {
    let (token, role) = match request.into_inner() {
        LoginRequest::Student { student_number } => {
            let student = Student::authenticate(&students, student_number.trim()).await?;
            info!("Student {} logged in", student.id);
            (AuthToken::new(&student), "student")
        }
        LoginRequest::Admin(credentials) => {
            let admin = Admin::authenticate(&admins, &credentials).await?;
            info!("Admin '{}' logged in", admin.username);
            (AuthToken::new(&admin), "admin")
        }
    };
    cookies.add(token.into_cookie(config)?);

    Ok(Json(SessionInfo {
        role: role.to_string(),
    }))
}

#[delete("/auth")]
async fn logout(ctx: AccessContext, cookies: &CookieJar<'_>) -> Json<SessionInfo> {
    if ctx != AccessContext::Anonymous {
        debug!("Ending {} session", ctx.role());
    }
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Json(SessionInfo {
        role: AccessContext::Anonymous.role().to_string(),
    })
}
