use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing_test::traced_test;

use super::CatalogService;
use crate::error::AppError;
use crate::images::{ImageError, ImagePolicy, ImageStore, ImageUpload, InlineImageStore};
use crate::models::{Car, CarChanges, CarFilter, NewCar};
use crate::repository::{CarRepository, MemoryStore, RepositoryError, RepositoryResult};

fn policy() -> ImagePolicy {
    ImagePolicy {
        max_bytes: 1024,
        max_files: 5,
    }
}

fn civic() -> NewCar {
    NewCar {
        brand: "Honda".to_string(),
        model: "Civic".to_string(),
        year: 2020,
        price: Decimal::from(85_000),
        mileage: 30_000,
        color: "black".to_string(),
        fuel_type: "flex".to_string(),
        transmission: "automatic".to_string(),
        description: "One owner, full service history".to_string(),
    }
}

fn jpeg(name: &str) -> ImageUpload {
    ImageUpload::new(name, "image/jpeg", name.as_bytes().to_vec())
}

fn service() -> CatalogService {
    CatalogService::new(Arc::new(MemoryStore::new()), Arc::new(InlineImageStore), policy())
}

/// Hands out `ref-N` references and remembers what it was asked to discard.
#[derive(Default)]
struct RecordingImageStore {
    discarded: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageStore for RecordingImageStore {
    async fn store(&self, uploads: Vec<ImageUpload>) -> Result<Vec<String>, ImageError> {
        Ok(uploads.iter().map(|u| format!("ref-{}", u.file_name)).collect())
    }

    async fn discard(&self, references: &[String]) {
        self.discarded.lock().unwrap().extend_from_slice(references);
    }
}

/// A backend that refuses every write.
struct UnavailableCars;

#[async_trait]
impl CarRepository for UnavailableCars {
    async fn create(&self, _car: NewCar, _image_urls: Vec<String>) -> RepositoryResult<Car> {
        Err(RepositoryError::Backend("connection refused".to_string()))
    }

    async fn find_by_id(&self, _id: i64) -> RepositoryResult<Option<Car>> {
        Ok(None)
    }

    async fn update(
        &self,
        _id: i64,
        _changes: CarChanges,
        _new_image_urls: Vec<String>,
    ) -> RepositoryResult<Option<Car>> {
        Err(RepositoryError::Backend("connection refused".to_string()))
    }

    async fn delete(&self, _id: i64) -> RepositoryResult<bool> {
        Err(RepositoryError::Backend("connection refused".to_string()))
    }

    async fn list(&self, _filter: &CarFilter) -> RepositoryResult<Vec<Car>> {
        Err(RepositoryError::Backend("connection refused".to_string()))
    }
}

#[tokio::test]
#[traced_test]
async fn create_then_get_returns_the_submitted_fields() {
    let service = service();
    let created = service.create_car(civic(), vec![]).await.unwrap();
    let fetched = service.get_car(created.id).await.unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.brand, "Honda");
    assert_eq!(fetched.price, Decimal::from(85_000));
    assert_eq!(fetched.created_at, fetched.updated_at);
    assert!(fetched.image_urls.is_empty());
    assert!(logs_contain("Created car"));
}

#[tokio::test]
async fn three_images_keep_upload_order() {
    let service = service();
    let created = service
        .create_car(civic(), vec![jpeg("front"), jpeg("side"), jpeg("rear")])
        .await
        .unwrap();

    assert_eq!(created.image_urls.len(), 3);
    let expected: Vec<String> = ["front", "side", "rear"]
        .iter()
        .map(|n| {
            use base64::Engine;
            format!(
                "data:image/jpeg;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(n)
            )
        })
        .collect();
    assert_eq!(created.image_urls, expected);
}

#[tokio::test]
async fn invalid_image_rejects_the_whole_create() {
    let service = service();
    let err = service
        .create_car(
            civic(),
            vec![jpeg("ok"), ImageUpload::new("virus.exe", "application/octet-stream", vec![1])],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Image(ImageError::UnsupportedType { .. })));
    assert!(service.list_cars(&CarFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_record_write_discards_stored_images() {
    let images = Arc::new(RecordingImageStore::default());
    let service = CatalogService::new(Arc::new(UnavailableCars), images.clone(), policy());

    let err = service
        .create_car(civic(), vec![jpeg("a"), jpeg("b")])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Storage(RepositoryError::Backend(_))));
    assert_eq!(
        *images.discarded.lock().unwrap(),
        vec!["ref-a".to_string(), "ref-b".to_string()]
    );
}

#[tokio::test]
async fn invalid_fields_are_rejected_before_storage() {
    let service = service();
    let mut car = civic();
    car.mileage = -5;

    let err = service.create_car(car, vec![]).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn price_update_leaves_everything_else_and_advances_updated_at() {
    let service = service();
    let created = service.create_car(civic(), vec![jpeg("front")]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let updated = service
        .update_car(
            created.id,
            CarChanges {
                price: Some(Decimal::from(15_000)),
                ..Default::default()
            },
            vec![],
        )
        .await
        .unwrap();

    assert_eq!(updated.price, Decimal::from(15_000));
    assert_eq!(updated.brand, created.brand);
    assert_eq!(updated.model, created.model);
    assert_eq!(updated.year, created.year);
    assert_eq!(updated.mileage, created.mileage);
    assert_eq!(updated.description, created.description);
    assert_eq!(updated.image_urls, created.image_urls);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
}

#[tokio::test]
async fn update_appends_new_images() {
    let service = service();
    let created = service.create_car(civic(), vec![jpeg("front")]).await.unwrap();

    let updated = service
        .update_car(created.id, CarChanges::default(), vec![jpeg("interior"), jpeg("trunk")])
        .await
        .unwrap();

    assert_eq!(updated.image_urls.len(), 3);
    assert_eq!(updated.image_urls[0], created.image_urls[0]);
}

#[tokio::test]
async fn update_of_missing_car_stores_no_images() {
    let images = Arc::new(RecordingImageStore::default());
    let service = CatalogService::new(Arc::new(MemoryStore::new()), images.clone(), policy());

    let err = service
        .update_car(77, CarChanges::default(), vec![jpeg("a")])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(images.discarded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let service = service();
    let created = service.create_car(civic(), vec![]).await.unwrap();

    service.delete_car(created.id).await.unwrap();

    assert!(matches!(service.get_car(created.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(service.delete_car(created.id).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_discards_the_car_images() {
    let images = Arc::new(RecordingImageStore::default());
    let service = CatalogService::new(Arc::new(MemoryStore::new()), images.clone(), policy());
    let created = service.create_car(civic(), vec![jpeg("a")]).await.unwrap();

    service.delete_car(created.id).await.unwrap();

    assert_eq!(*images.discarded.lock().unwrap(), vec!["ref-a".to_string()]);
}

#[tokio::test]
async fn list_filters_by_brand_and_inclusive_price_range() {
    let service = service();
    for (brand, price) in [("Toyota", 10_000), ("toyota", 20_000), ("Toyota", 25_000), ("Fiat", 15_000)] {
        let mut car = civic();
        car.brand = brand.to_string();
        car.price = Decimal::from(price);
        service.create_car(car, vec![]).await.unwrap();
    }

    let by_brand = service
        .list_cars(&CarFilter::default().brand("TOYOTA"))
        .await
        .unwrap();
    assert_eq!(by_brand.len(), 3);
    assert!(by_brand.iter().all(|c| c.brand.eq_ignore_ascii_case("toyota")));

    let in_range = service
        .list_cars(
            &CarFilter::default()
                .price_between(Some(Decimal::from(10_000)), Some(Decimal::from(20_000))),
        )
        .await
        .unwrap();
    let prices: Vec<Decimal> = in_range.iter().map(|c| c.price).collect();
    assert_eq!(
        prices,
        vec![Decimal::from(15_000), Decimal::from(20_000), Decimal::from(10_000)]
    );
}
