use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Earliest model year accepted for a listing.
pub const MIN_MODEL_YEAR: i32 = 1886;

/// Prices are stored as `NUMERIC(12, 2)`.
pub const PRICE_SCALE: u32 = 2;
/// Exclusive upper bound for a price, 10,000,000,000.
pub const PRICE_LIMIT: i64 = 10_000_000_000;

/// A catalog entry describing one vehicle for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Car {
    pub id: i64,
    pub brand: String,
    pub model: String,
    pub year: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub mileage: i32,
    pub color: String,
    #[serde(rename = "fuelType")]
    pub fuel_type: String,
    pub transmission: String,
    pub description: String,
    /// Display order is insertion order.
    #[serde(rename = "imageUrls")]
    pub image_urls: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Every scalar field of a car, as submitted on creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCar {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: Decimal,
    pub mileage: i32,
    pub color: String,
    pub fuel_type: String,
    pub transmission: String,
    pub description: String,
}

/// A partial edit. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarChanges {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<Decimal>,
    pub mileage: Option<i32>,
    pub color: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub description: Option<String>,
}

impl CarChanges {
    /// Reads the scalar fields of a submitted car form. Keys use the JSON
    /// names (`fuelType`); unknown keys are ignored and blank values count
    /// as absent.
    pub fn from_form(fields: &HashMap<String, String>) -> Result<Self, String> {
        let text = |key: &str| {
            fields
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(CarChanges {
            brand: text("brand"),
            model: text("model"),
            year: parse_field(text("year"), "year")?,
            price: parse_field(text("price"), "price")?,
            mileage: parse_field(text("mileage"), "mileage")?,
            color: text("color"),
            fuel_type: text("fuelType"),
            transmission: text("transmission"),
            description: text("description"),
        })
    }

    /// Checks the supplied fields only.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("brand", &self.brand),
            ("model", &self.model),
            ("color", &self.color),
            ("fuelType", &self.fuel_type),
            ("transmission", &self.transmission),
            ("description", &self.description),
        ] {
            if let Some(value) = value {
                if value.trim().is_empty() {
                    return Err(format!("{} must not be blank", name));
                }
            }
        }

        if let Some(year) = self.year {
            let latest = Utc::now().year() + 1;
            if !(MIN_MODEL_YEAR..=latest).contains(&year) {
                return Err(format!("year must be between {} and {}", MIN_MODEL_YEAR, latest));
            }
        }
        if let Some(price) = self.price {
            if price.is_sign_negative() {
                return Err("price must not be negative".to_string());
            }
            if price.normalize().scale() > PRICE_SCALE {
                return Err(format!("price must have at most {} decimals", PRICE_SCALE));
            }
            if price >= Decimal::from(PRICE_LIMIT) {
                return Err("price must be below 10,000,000,000".to_string());
            }
        }
        if let Some(mileage) = self.mileage {
            if mileage < 0 {
                return Err("mileage must not be negative".to_string());
            }
        }
        Ok(())
    }

    /// Promotes a complete form to a new car, naming the first missing field.
    pub fn into_new_car(self) -> Result<NewCar, String> {
        fn required<T>(value: Option<T>, name: &str) -> Result<T, String> {
            value.ok_or_else(|| format!("{} is required", name))
        }

        Ok(NewCar {
            brand: required(self.brand, "brand")?,
            model: required(self.model, "model")?,
            year: required(self.year, "year")?,
            price: required(self.price, "price")?,
            mileage: required(self.mileage, "mileage")?,
            color: required(self.color, "color")?,
            fuel_type: required(self.fuel_type, "fuelType")?,
            transmission: required(self.transmission, "transmission")?,
            description: required(self.description, "description")?,
        })
    }

    /// Overwrites the fields of `car` that this edit supplies.
    pub fn apply_to(&self, car: &mut Car) {
        if let Some(brand) = &self.brand {
            car.brand = brand.clone();
        }
        if let Some(model) = &self.model {
            car.model = model.clone();
        }
        if let Some(year) = self.year {
            car.year = year;
        }
        if let Some(price) = self.price {
            car.price = price;
        }
        if let Some(mileage) = self.mileage {
            car.mileage = mileage;
        }
        if let Some(color) = &self.color {
            car.color = color.clone();
        }
        if let Some(fuel_type) = &self.fuel_type {
            car.fuel_type = fuel_type.clone();
        }
        if let Some(transmission) = &self.transmission {
            car.transmission = transmission.clone();
        }
        if let Some(description) = &self.description {
            car.description = description.clone();
        }
    }
}

impl NewCar {
    pub fn validate(&self) -> Result<(), String> {
        CarChanges::from(self.clone()).validate()
    }
}

impl From<NewCar> for CarChanges {
    fn from(car: NewCar) -> Self {
        CarChanges {
            brand: Some(car.brand),
            model: Some(car.model),
            year: Some(car.year),
            price: Some(car.price),
            mileage: Some(car.mileage),
            color: Some(car.color),
            fuel_type: Some(car.fuel_type),
            transmission: Some(car.transmission),
            description: Some(car.description),
        }
    }
}

fn parse_field<T: FromStr>(raw: Option<String>, name: &str) -> Result<Option<T>, String> {
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|_| format!("{} must be a number, got '{}'", name, value))
    })
    .transpose()
}

/// Catalog query string, as sent by the public site.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarFilterQuery {
    pub brand: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
    pub year: Option<String>,
}

/// Conjunctive catalog filter. Brand and model match as case-insensitive
/// substrings; price bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarFilter {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub year: Option<i32>,
}

impl TryFrom<CarFilterQuery> for CarFilter {
    type Error = String;

    fn try_from(query: CarFilterQuery) -> Result<Self, Self::Error> {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let filter = CarFilter {
            brand: clean(query.brand),
            model: clean(query.model),
            min_price: parse_field(clean(query.min_price), "minPrice")?,
            max_price: parse_field(clean(query.max_price), "maxPrice")?,
            year: parse_field(clean(query.year), "year")?,
        };

        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err("minPrice must not exceed maxPrice".to_string());
            }
        }
        Ok(filter)
    }
}

impl CarFilter {
    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn price_between(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn matches(&self, car: &Car) -> bool {
        fn contains_ci(haystack: &str, needle: &str) -> bool {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }

        self.brand.as_deref().map_or(true, |b| contains_ci(&car.brand, b))
            && self.model.as_deref().map_or(true, |m| contains_ci(&car.model, m))
            && self.min_price.map_or(true, |min| car.price >= min)
            && self.max_price.map_or(true, |max| car.price <= max)
            && self.year.map_or(true, |y| car.year == y)
    }
}
