use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;

use super::parse_id;
use crate::auth::Admin;
use crate::constants::API_NAME;
use crate::error::{AppError, AppResult};
use crate::images::ImageUpload;
use crate::models::{Car, CarChanges, CarFilter, CarFilterQuery};
use crate::state::AppState;

const IMAGES_FIELD: &str = "images";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cars).post(create_car))
        .route(
            "/:id",
            get(get_car)
                .put(update_car)
                .patch(update_car)
                .delete(delete_car),
        )
}

async fn list_cars(
    State(state): State<AppState>,
    Query(query): Query<CarFilterQuery>,
) -> AppResult<Json<Vec<Car>>> {
    let filter = CarFilter::try_from(query).map_err(AppError::Validation)?;
    let cars = state.catalog.list_cars(&filter).await?;
    Ok(Json(cars))
}

async fn get_car(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Car>> {
    let id = parse_id(&id)?;
    Ok(Json(state.catalog.get_car(id).await?))
}

async fn create_car(
    State(state): State<AppState>,
    _admin: Admin,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Car>)> {
    let (fields, images) = read_car_form(multipart).await?;
    tracing::info!(
        "{} Received new car form with {} field(s) and {} image(s)",
        API_NAME,
        fields.len(),
        images.len()
    );

    let new_car = CarChanges::from_form(&fields)
        .and_then(CarChanges::into_new_car)
        .map_err(AppError::Validation)?;

    let car = state.catalog.create_car(new_car, images).await?;
    Ok((StatusCode::CREATED, Json(car)))
}

async fn update_car(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Json<Car>> {
    let id = parse_id(&id)?;
    let (fields, images) = read_car_form(multipart).await?;
    let changes = CarChanges::from_form(&fields).map_err(AppError::Validation)?;

    let car = state.catalog.update_car(id, changes, images).await?;
    Ok(Json(car))
}

async fn delete_car(
    State(state): State<AppState>,
    _admin: Admin,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    state.catalog.delete_car(id).await?;
    Ok(Json(json!({
        "message": "Car deleted successfully",
        "id": id
    })))
}

/// Splits a car form into its text fields and its `images` file parts,
/// keeping the file parts in submission order.
async fn read_car_form(
    mut multipart: Multipart,
) -> AppResult<(HashMap<String, String>, Vec<ImageUpload>)> {
    let mut fields = HashMap::new();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == IMAGES_FIELD || name == "images[]" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;

            // Browsers submit an empty, nameless part when no file was picked.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            images.push(ImageUpload::new(file_name, content_type, bytes));
        } else if !name.is_empty() {
            let value = field.text().await?;
            fields.insert(name, value);
        }
    }

    Ok((fields, images))
}
