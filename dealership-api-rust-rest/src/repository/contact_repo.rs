use async_trait::async_trait;
use chrono::Utc;

use super::{ContactRepository, PgStore, RepositoryError, RepositoryResult};
use crate::models::{Contact, ContactChanges, NewContact};

const CONTACT_COLUMNS: &str = "id, name, email, phone, message, car_id, created_at, updated_at";

fn map_reference_error(err: sqlx::Error, car_id: Option<i64>) -> RepositoryError {
    match car_id {
        Some(car_id) if RepositoryError::check_foreign_key_violation(&err) => {
            RepositoryError::MissingCarReference(car_id)
        }
        _ => RepositoryError::Database(err),
    }
}

#[async_trait]
impl ContactRepository for PgStore {
    async fn create(&self, contact: NewContact) -> RepositoryResult<Contact> {
        let query = format!(
            "INSERT INTO contacts (name, email, phone, message, car_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING {}",
            CONTACT_COLUMNS
        );

        sqlx::query_as::<_, Contact>(&query)
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(&contact.message)
            .bind(contact.car_id)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_reference_error(e, contact.car_id))
    }

    async fn list(&self) -> RepositoryResult<Vec<Contact>> {
        let query = format!(
            "SELECT {} FROM contacts ORDER BY created_at DESC, id DESC",
            CONTACT_COLUMNS
        );
        let contacts = sqlx::query_as::<_, Contact>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(contacts)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Contact>> {
        let query = format!("SELECT {} FROM contacts WHERE id = $1", CONTACT_COLUMNS);
        let contact = sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    async fn update(&self, id: i64, changes: ContactChanges) -> RepositoryResult<Option<Contact>> {
        let query = format!(
            "UPDATE contacts SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                phone = COALESCE($4, phone), \
                message = COALESCE($5, message), \
                car_id = COALESCE($6, car_id), \
                updated_at = $7 \
             WHERE id = $1 \
             RETURNING {}",
            CONTACT_COLUMNS
        );

        let car_id = changes.car_id;
        sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email)
            .bind(changes.phone)
            .bind(changes.message)
            .bind(changes.car_id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_reference_error(e, car_id))
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
