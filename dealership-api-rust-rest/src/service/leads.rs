use std::collections::HashMap;
use std::sync::Arc;

use validator::Validate;

use crate::constants::API_NAME;
use crate::error::{AppError, AppResult};
use crate::models::{CarSummary, Contact, ContactChanges, ContactView, NewContact};
use crate::repository::{CarRepository, ContactRepository};

/// Contact-form leads. A lead may point at a car, which must exist when the
/// lead is written.
#[derive(Clone)]
pub struct LeadService {
    contacts: Arc<dyn ContactRepository>,
    cars: Arc<dyn CarRepository>,
}

impl LeadService {
    pub fn new(contacts: Arc<dyn ContactRepository>, cars: Arc<dyn CarRepository>) -> Self {
        Self { contacts, cars }
    }

    pub async fn create_contact(&self, contact: NewContact) -> AppResult<Contact> {
        let contact = contact.normalized();
        contact.validate()?;
        if let Some(car_id) = contact.car_id {
            self.ensure_car_exists(car_id).await?;
        }

        let created = self.contacts.create(contact).await?;
        tracing::info!(
            "{} New lead {} from '{}' (car: {:?})",
            API_NAME,
            created.id,
            created.name,
            created.car_id
        );
        Ok(created)
    }

    pub async fn list_contacts(&self) -> AppResult<Vec<ContactView>> {
        let contacts = self.contacts.list().await?;

        let mut summaries: HashMap<i64, Option<CarSummary>> = HashMap::new();
        let mut views = Vec::with_capacity(contacts.len());
        for contact in contacts {
            let car = match contact.car_id {
                Some(car_id) => {
                    if !summaries.contains_key(&car_id) {
                        let summary = self.cars.find_by_id(car_id).await?.as_ref().map(CarSummary::from);
                        summaries.insert(car_id, summary);
                    }
                    summaries.get(&car_id).cloned().flatten()
                }
                None => None,
            };
            views.push(ContactView { contact, car });
        }
        Ok(views)
    }

    pub async fn get_contact(&self, id: i64) -> AppResult<ContactView> {
        let contact = self
            .contacts
            .find_by_id(id)
            .await?
            .ok_or_else(|| contact_not_found(id))?;
        self.view(contact).await
    }

    pub async fn update_contact(&self, id: i64, changes: ContactChanges) -> AppResult<ContactView> {
        let changes = changes.normalized();
        changes.validate()?;
        if let Some(car_id) = changes.car_id {
            self.ensure_car_exists(car_id).await?;
        }

        let updated = self
            .contacts
            .update(id, changes)
            .await?
            .ok_or_else(|| contact_not_found(id))?;
        tracing::info!("{} Updated lead {}", API_NAME, id);
        self.view(updated).await
    }

    pub async fn delete_contact(&self, id: i64) -> AppResult<()> {
        if !self.contacts.delete(id).await? {
            return Err(contact_not_found(id));
        }
        tracing::info!("{} Deleted lead {}", API_NAME, id);
        Ok(())
    }

    async fn ensure_car_exists(&self, car_id: i64) -> AppResult<()> {
        if self.cars.find_by_id(car_id).await?.is_none() {
            return Err(AppError::ReferenceViolation(car_id));
        }
        Ok(())
    }

    async fn view(&self, contact: Contact) -> AppResult<ContactView> {
        let car = match contact.car_id {
            Some(car_id) => self.cars.find_by_id(car_id).await?.as_ref().map(CarSummary::from),
            None => None,
        };
        Ok(ContactView { contact, car })
    }
}

fn contact_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Contact with ID {} not found", id))
}
