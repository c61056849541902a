use actix_web::{get, http::StatusCode, post, put, web, HttpResponse};
use serde::Serialize;
use tracing::info;

use crate::{
    error::AppError,
    model::{InterestsRequest, NewUser, VisibilityRequest},
    users::Users,
};

#[derive(Serialize, Debug)]
struct Anonymity {
    anonymous: bool,
}

fn pretty_json<T: Serialize>(status: StatusCode, body: &T) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::build(status)
        .append_header(("Content-Type", "application/json"))
        .body(serde_json::to_string_pretty(body)?))
}

#[get("/users")]
pub async fn list_users(users: web::Data<Users>) -> Result<HttpResponse, AppError> {
    let all = users.list().await?;
    pretty_json(StatusCode::OK, &all)
}

#[get("/users/{id}")]
pub async fn get_user(
    users: web::Data<Users>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = users.get(&id).await?;
    pretty_json(StatusCode::OK, &user)
}

#[post("/users")]
pub async fn create_user(
    users: web::Data<Users>,
    body: web::Json<NewUser>,
) -> Result<HttpResponse, AppError> {
    let user = users.create(body.into_inner()).await?;
    pretty_json(StatusCode::CREATED, &user)
}

#[get("/users/{id}/matches")]
pub async fn get_matches(
    users: web::Data<Users>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let matches = users.find_matches(&id).await?;
    pretty_json(StatusCode::OK, &matches)
}

#[post("/users/{id}/visible")]
pub async fn make_visible(
    users: web::Data<Users>,
    id: web::Path<String>,
    body: web::Json<VisibilityRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.make_visible(&id, &body.other_users).await?;
    pretty_json(StatusCode::OK, &user)
}

#[post("/users/{id}/invisible")]
pub async fn make_invisible(
    users: web::Data<Users>,
    id: web::Path<String>,
    body: web::Json<VisibilityRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.make_invisible(&id, &body.other_users).await?;
    pretty_json(StatusCode::OK, &user)
}

#[post("/users/{id}/visibleToAll")]
pub async fn toggle_visible_to_all(
    users: web::Data<Users>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let anonymous = users.toggle_anonymous(&id).await?;
    info!("User {id} is now anonymous={anonymous}");
    pretty_json(StatusCode::OK, &Anonymity { anonymous })
}

#[put("/users/{id}/interests")]
pub async fn update_interests(
    users: web::Data<Users>,
    id: web::Path<String>,
    body: web::Json<InterestsRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users.set_interests(&id, body.into_inner().interests).await?;
    pretty_json(StatusCode::OK, &user)
}
