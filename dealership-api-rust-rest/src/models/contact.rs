use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::Car;

/// A visitor inquiry, optionally about a specific car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub message: String,
    #[serde(rename = "carId")]
    pub car_id: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Body of the public contact form.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct NewContact {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is not a valid address"))]
    #[serde(default)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 50, message = "phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, max = 5000, message = "message is required"))]
    pub message: String,
    #[serde(rename = "carId", default)]
    pub car_id: Option<i64>,
}

impl NewContact {
    /// Trims free-text fields so whitespace-only input fails validation.
    pub fn normalized(self) -> Self {
        NewContact {
            name: self.name.trim().to_string(),
            email: self
                .email
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
            phone: self.phone.trim().to_string(),
            message: self.message.trim().to_string(),
            car_id: self.car_id,
        }
    }
}

/// Admin edit of a lead. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct ContactChanges {
    #[validate(length(min = 1, max = 200, message = "name must not be blank"))]
    #[serde(default)]
    pub name: Option<String>,
    #[validate(email(message = "email is not a valid address"))]
    #[serde(default)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 50, message = "phone must not be blank"))]
    #[serde(default)]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "message must not be blank"))]
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "carId", default)]
    pub car_id: Option<i64>,
}

impl ContactChanges {
    pub fn normalized(self) -> Self {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        ContactChanges {
            name: trim(self.name),
            email: trim(self.email).map(|e| e.to_lowercase()),
            phone: trim(self.phone),
            message: trim(self.message),
            car_id: self.car_id,
        }
    }

    pub fn apply_to(&self, contact: &mut Contact) {
        if let Some(name) = &self.name {
            contact.name = name.clone();
        }
        if let Some(email) = &self.email {
            contact.email = Some(email.clone());
        }
        if let Some(phone) = &self.phone {
            contact.phone = phone.clone();
        }
        if let Some(message) = &self.message {
            contact.message = message.clone();
        }
        if let Some(car_id) = self.car_id {
            contact.car_id = Some(car_id);
        }
    }
}

/// The handful of car fields shown next to a lead in the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarSummary {
    pub id: i64,
    pub brand: String,
    pub model: String,
    pub year: i32,
}

impl From<&Car> for CarSummary {
    fn from(car: &Car) -> Self {
        CarSummary {
            id: car.id,
            brand: car.brand.clone(),
            model: car.model.clone(),
            year: car.year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactView {
    #[serde(flatten)]
    pub contact: Contact,
    pub car: Option<CarSummary>,
}
