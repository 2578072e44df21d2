use std::sync::Arc;

use crate::constants::API_NAME;
use crate::error::{AppError, AppResult};
use crate::images::{ImagePolicy, ImageStore, ImageUpload};
use crate::models::{Car, CarChanges, CarFilter, NewCar};
use crate::repository::CarRepository;

/// Car CRUD plus image association.
///
/// Images are validated as a batch before anything is written, stored before
/// the record, and discarded again if the record write does not land, so a
/// create or update either persists the record with every image or nothing.
#[derive(Clone)]
pub struct CatalogService {
    cars: Arc<dyn CarRepository>,
    images: Arc<dyn ImageStore>,
    image_policy: ImagePolicy,
}

impl CatalogService {
    pub fn new(
        cars: Arc<dyn CarRepository>,
        images: Arc<dyn ImageStore>,
        image_policy: ImagePolicy,
    ) -> Self {
        Self {
            cars,
            images,
            image_policy,
        }
    }

    pub fn image_policy(&self) -> ImagePolicy {
        self.image_policy
    }

    pub async fn create_car(&self, car: NewCar, uploads: Vec<ImageUpload>) -> AppResult<Car> {
        car.validate().map_err(AppError::Validation)?;
        self.image_policy.check(&uploads)?;

        let image_urls = self.images.store(uploads).await?;
        match self.cars.create(car, image_urls.clone()).await {
            Ok(created) => {
                tracing::info!(
                    "{} Created car {} ({} {}) with {} image(s)",
                    API_NAME,
                    created.id,
                    created.brand,
                    created.model,
                    created.image_urls.len()
                );
                Ok(created)
            }
            Err(e) => {
                self.images.discard(&image_urls).await;
                Err(e.into())
            }
        }
    }

    pub async fn get_car(&self, id: i64) -> AppResult<Car> {
        self.cars
            .find_by_id(id)
            .await?
            .ok_or_else(|| car_not_found(id))
    }

    /// Merges `changes` over the stored car. New images are appended after
    /// the existing ones; existing references are never dropped here.
    pub async fn update_car(
        &self,
        id: i64,
        changes: CarChanges,
        uploads: Vec<ImageUpload>,
    ) -> AppResult<Car> {
        changes.validate().map_err(AppError::Validation)?;
        self.image_policy.check(&uploads)?;

        // Avoid writing images for a car that is already gone.
        if self.cars.find_by_id(id).await?.is_none() {
            return Err(car_not_found(id));
        }

        let new_image_urls = self.images.store(uploads).await?;
        match self.cars.update(id, changes, new_image_urls.clone()).await {
            Ok(Some(updated)) => {
                tracing::info!(
                    "{} Updated car {} (+{} image(s))",
                    API_NAME,
                    id,
                    new_image_urls.len()
                );
                Ok(updated)
            }
            Ok(None) => {
                self.images.discard(&new_image_urls).await;
                Err(car_not_found(id))
            }
            Err(e) => {
                self.images.discard(&new_image_urls).await;
                Err(e.into())
            }
        }
    }

    pub async fn delete_car(&self, id: i64) -> AppResult<()> {
        let car = self.get_car(id).await?;
        if !self.cars.delete(id).await? {
            return Err(car_not_found(id));
        }
        self.images.discard(&car.image_urls).await;

        tracing::info!("{} Deleted car {} ({} {})", API_NAME, id, car.brand, car.model);
        Ok(())
    }

    pub async fn list_cars(&self, filter: &CarFilter) -> AppResult<Vec<Car>> {
        let cars = self.cars.list(filter).await?;
        tracing::debug!("{} Listed {} car(s) for {:?}", API_NAME, cars.len(), filter);
        Ok(cars)
    }
}

fn car_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Car with ID {} not found", id))
}
