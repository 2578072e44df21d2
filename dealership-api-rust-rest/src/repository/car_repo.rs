use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};

use super::{CarRepository, PgStore, RepositoryResult};
use crate::models::{Car, CarChanges, CarFilter, NewCar};

const CAR_COLUMNS: &str = "id, brand, model, year, price, mileage, color, fuel_type, \
     transmission, description, image_urls, created_at, updated_at";

#[async_trait]
impl CarRepository for PgStore {
    async fn create(&self, car: NewCar, image_urls: Vec<String>) -> RepositoryResult<Car> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO cars (brand, model, year, price, mileage, color, fuel_type, transmission, \
             description, image_urls, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11) \
             RETURNING {}",
            CAR_COLUMNS
        );

        let created = sqlx::query_as::<_, Car>(&query)
            .bind(&car.brand)
            .bind(&car.model)
            .bind(car.year)
            .bind(car.price)
            .bind(car.mileage)
            .bind(&car.color)
            .bind(&car.fuel_type)
            .bind(&car.transmission)
            .bind(&car.description)
            .bind(&image_urls)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Car>> {
        let query = format!("SELECT {} FROM cars WHERE id = $1", CAR_COLUMNS);
        let car = sqlx::query_as::<_, Car>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(car)
    }

    async fn update(
        &self,
        id: i64,
        changes: CarChanges,
        new_image_urls: Vec<String>,
    ) -> RepositoryResult<Option<Car>> {
        // Single statement: the merge and the image append land together.
        let query = format!(
            "UPDATE cars SET \
                brand = COALESCE($2, brand), \
                model = COALESCE($3, model), \
                year = COALESCE($4, year), \
                price = COALESCE($5, price), \
                mileage = COALESCE($6, mileage), \
                color = COALESCE($7, color), \
                fuel_type = COALESCE($8, fuel_type), \
                transmission = COALESCE($9, transmission), \
                description = COALESCE($10, description), \
                image_urls = image_urls || $11::text[], \
                updated_at = $12 \
             WHERE id = $1 \
             RETURNING {}",
            CAR_COLUMNS
        );

        let updated = sqlx::query_as::<_, Car>(&query)
            .bind(id)
            .bind(changes.brand)
            .bind(changes.model)
            .bind(changes.year)
            .bind(changes.price)
            .bind(changes.mileage)
            .bind(changes.color)
            .bind(changes.fuel_type)
            .bind(changes.transmission)
            .bind(changes.description)
            .bind(&new_image_urls)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        // contacts.car_id is ON DELETE SET NULL, so leads are detached here too.
        let result = sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &CarFilter) -> RepositoryResult<Vec<Car>> {
        let mut builder = filter_query(filter);
        let cars = builder
            .build_query_as::<Car>()
            .fetch_all(&self.pool)
            .await?;
        Ok(cars)
    }
}

/// Translates a [`CarFilter`] into SQL with the same semantics as
/// [`CarFilter::matches`].
fn filter_query(filter: &CarFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM cars WHERE TRUE", CAR_COLUMNS));

    if let Some(brand) = &filter.brand {
        builder
            .push(" AND position(lower(")
            .push_bind(brand.clone())
            .push(") in lower(brand)) > 0");
    }
    if let Some(model) = &filter.model {
        builder
            .push(" AND position(lower(")
            .push_bind(model.clone())
            .push(") in lower(model)) > 0");
    }
    if let Some(min_price) = filter.min_price {
        builder.push(" AND price >= ").push_bind(min_price);
    }
    if let Some(max_price) = filter.max_price {
        builder.push(" AND price <= ").push_bind(max_price);
    }
    if let Some(year) = filter.year {
        builder.push(" AND year = ").push_bind(year);
    }

    builder.push(" ORDER BY created_at DESC, id DESC");
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn empty_filter_only_orders() {
        let builder = filter_query(&CarFilter::default());
        let sql = builder.sql();
        assert!(sql.ends_with("WHERE TRUE ORDER BY created_at DESC, id DESC"));
    }

    #[test]
    fn each_predicate_gets_its_own_placeholder() {
        let filter = CarFilter::default()
            .brand("Toyota")
            .model("Corolla")
            .price_between(Some(Decimal::from(10_000)), Some(Decimal::from(20_000)))
            .year(2020);
        let builder = filter_query(&filter);
        let sql = builder.sql();

        assert!(sql.contains("position(lower($1) in lower(brand)) > 0"));
        assert!(sql.contains("position(lower($2) in lower(model)) > 0"));
        assert!(sql.contains("price >= $3"));
        assert!(sql.contains("price <= $4"));
        assert!(sql.contains("year = $5"));
    }
}
