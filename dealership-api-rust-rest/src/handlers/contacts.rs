use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;

use super::parse_id;
use crate::auth::Admin;
use crate::error::{AppError, AppResult};
use crate::models::{Contact, ContactChanges, ContactView, NewContact};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts).post(create_contact))
        .route(
            "/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<NewContact>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Contact>)> {
    let contact = json_body(payload)?;
    let created = state.leads.create_contact(contact).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_contacts(
    State(state): State<AppState>,
    _admin: Admin,
) -> AppResult<Json<Vec<ContactView>>> {
    Ok(Json(state.leads.list_contacts().await?))
}

async fn get_contact(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<String>,
) -> AppResult<Json<ContactView>> {
    let id = parse_id(&id)?;
    Ok(Json(state.leads.get_contact(id).await?))
}

async fn update_contact(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<String>,
    payload: Result<Json<ContactChanges>, JsonRejection>,
) -> AppResult<Json<ContactView>> {
    let id = parse_id(&id)?;
    let changes = json_body(payload)?;
    Ok(Json(state.leads.update_contact(id, changes).await?))
}

async fn delete_contact(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    state.leads.delete_contact(id).await?;
    Ok(Json(json!({
        "message": "Contact deleted successfully",
        "id": id
    })))
}
