use std::cmp::Reverse;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    CarRepository, ContactRepository, RepositoryError, RepositoryResult, StorageLifecycle,
};
use crate::models::{Car, CarChanges, CarFilter, Contact, ContactChanges, NewCar, NewContact};

#[derive(Default)]
struct Tables {
    cars: BTreeMap<i64, Car>,
    contacts: BTreeMap<i64, Contact>,
    last_car_id: i64,
    last_contact_id: i64,
}

/// Process-local backend. Both tables sit behind one lock so the
/// car-reference check and the lead insert are a single step, like the
/// foreign key in Postgres.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (chrono::DateTime<Utc>, i64),
{
    rows.sort_by_key(|row| Reverse(key(row)));
    rows
}

#[async_trait]
impl CarRepository for MemoryStore {
    async fn create(&self, car: NewCar, image_urls: Vec<String>) -> RepositoryResult<Car> {
        let mut tables = self.tables.write().await;
        tables.last_car_id += 1;
        let now = Utc::now();
        let created = Car {
            id: tables.last_car_id,
            brand: car.brand,
            model: car.model,
            year: car.year,
            price: car.price,
            mileage: car.mileage,
            color: car.color,
            fuel_type: car.fuel_type,
            transmission: car.transmission,
            description: car.description,
            image_urls,
            created_at: now,
            updated_at: now,
        };
        tables.cars.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Car>> {
        Ok(self.tables.read().await.cars.get(&id).cloned())
    }

    async fn update(
        &self,
        id: i64,
        changes: CarChanges,
        new_image_urls: Vec<String>,
    ) -> RepositoryResult<Option<Car>> {
        let mut tables = self.tables.write().await;
        let Some(car) = tables.cars.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(car);
        car.image_urls.extend(new_image_urls);
        car.updated_at = Utc::now();
        Ok(Some(car.clone()))
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.cars.remove(&id).is_none() {
            return Ok(false);
        }
        for contact in tables.contacts.values_mut() {
            if contact.car_id == Some(id) {
                contact.car_id = None;
            }
        }
        Ok(true)
    }

    async fn list(&self, filter: &CarFilter) -> RepositoryResult<Vec<Car>> {
        let tables = self.tables.read().await;
        let matching = tables
            .cars
            .values()
            .filter(|car| filter.matches(car))
            .cloned()
            .collect();
        Ok(newest_first(matching, |car| (car.created_at, car.id)))
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn create(&self, contact: NewContact) -> RepositoryResult<Contact> {
        let mut tables = self.tables.write().await;
        if let Some(car_id) = contact.car_id {
            if !tables.cars.contains_key(&car_id) {
                return Err(RepositoryError::MissingCarReference(car_id));
            }
        }

        tables.last_contact_id += 1;
        let now = Utc::now();
        let created = Contact {
            id: tables.last_contact_id,
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            message: contact.message,
            car_id: contact.car_id,
            created_at: now,
            updated_at: now,
        };
        tables.contacts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list(&self) -> RepositoryResult<Vec<Contact>> {
        let tables = self.tables.read().await;
        let all = tables.contacts.values().cloned().collect();
        Ok(newest_first(all, |contact| (contact.created_at, contact.id)))
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Contact>> {
        Ok(self.tables.read().await.contacts.get(&id).cloned())
    }

    async fn update(&self, id: i64, changes: ContactChanges) -> RepositoryResult<Option<Contact>> {
        let mut tables = self.tables.write().await;
        if let Some(car_id) = changes.car_id {
            if !tables.cars.contains_key(&car_id) {
                return Err(RepositoryError::MissingCarReference(car_id));
            }
        }
        let Some(contact) = tables.contacts.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(contact);
        contact.updated_at = Utc::now();
        Ok(Some(contact.clone()))
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        Ok(self.tables.write().await.contacts.remove(&id).is_some())
    }
}

#[async_trait]
impl StorageLifecycle for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn new_car(brand: &str, price: i64) -> NewCar {
        NewCar {
            brand: brand.to_string(),
            model: "Civic".to_string(),
            year: 2020,
            price: Decimal::from(price),
            mileage: 30_000,
            color: "black".to_string(),
            fuel_type: "flex".to_string(),
            transmission: "automatic".to_string(),
            description: "Well kept".to_string(),
        }
    }

    fn new_contact(car_id: Option<i64>) -> NewContact {
        NewContact {
            name: "Ana".to_string(),
            email: None,
            phone: "555-0100".to_string(),
            message: "Still available?".to_string(),
            car_id,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_equal_timestamps() {
        let store = MemoryStore::new();
        let first = CarRepository::create(&store, new_car("Honda", 1), vec![]).await.unwrap();
        let second = CarRepository::create(&store, new_car("Fiat", 2), vec![]).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test]
    async fn update_appends_images_and_refreshes_updated_at() {
        let store = MemoryStore::new();
        let car = CarRepository::create(&store, new_car("Honda", 1), vec!["a".into()])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let updated = CarRepository::update(&store, car.id, CarChanges::default(), vec!["b".into()])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.image_urls, vec!["a".to_string(), "b".to_string()]);
        assert!(updated.updated_at > car.updated_at);
        assert_eq!(updated.created_at, car.created_at);
    }

    #[tokio::test]
    async fn update_of_unknown_car_is_none() {
        let store = MemoryStore::new();
        let result = CarRepository::update(&store, 42, CarChanges::default(), vec![])
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryStore::new();
        for brand in ["A", "B", "C"] {
            CarRepository::create(&store, new_car(brand, 1), vec![]).await.unwrap();
        }
        let brands: Vec<String> = CarRepository::list(&store, &CarFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|car| car.brand)
            .collect();
        assert_eq!(brands, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn contact_with_unknown_car_is_rejected_and_not_stored() {
        let store = MemoryStore::new();
        let err = ContactRepository::create(&store, new_contact(Some(99))).await.unwrap_err();
        assert!(matches!(err, RepositoryError::MissingCarReference(99)));
        assert!(ContactRepository::list(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_car_detaches_its_leads() {
        let store = MemoryStore::new();
        let car = CarRepository::create(&store, new_car("Honda", 1), vec![]).await.unwrap();
        let contact = ContactRepository::create(&store, new_contact(Some(car.id)))
            .await
            .unwrap();

        assert!(CarRepository::delete(&store, car.id).await.unwrap());
        assert!(!CarRepository::delete(&store, car.id).await.unwrap());

        let contact = ContactRepository::find_by_id(&store, contact.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contact.car_id, None);
    }
}
