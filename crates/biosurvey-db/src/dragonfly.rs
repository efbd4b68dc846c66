//! `Dragonfly` (Redis-compatible) job status storage.
//!
//! Background job status is short-lived and polled frequently, so it lives
//! in `Dragonfly` with a TTL rather than in `PostgreSQL`.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `job:{id}:status` | JSON | Latest status of a background job (expires) |

use fred::prelude::*;
use fred::types::Expiration;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::DbError;

/// Build the status key for a job.
pub fn job_status_key(job_id: Uuid) -> String {
    format!("job:{job_id}:status")
}

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    // =========================================================================
    // Generic JSON get/set/delete
    // =========================================================================

    /// Serialize `value` as JSON and store it at `key`, expiring after
    /// `ttl_secs` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if serialization fails.
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn set_json_ex<T: Serialize>(&self, key: &str, value: &T, ttl_secs: i64) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let _: () = self
            .client
            .set(key, json.as_str(), Some(Expiration::EX(ttl_secs)), None, false)
            .await?;
        Ok(())
    }

    /// Read the value at `key` and deserialize from JSON. Missing keys
    /// (including expired ones) yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if deserialization fails.
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DbError> {
        let value: Option<String> = self.client.get(key).await?;
        value.map(|s| serde_json::from_str(&s)).transpose().map_err(DbError::from)
    }

    /// Delete a key from `Dragonfly`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    // =========================================================================
    // Job status -- job:{id}:status
    // =========================================================================

    /// Store the status of a job (`job:{id}:status`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if serialization or write fails.
    pub async fn set_job_status<T: Serialize>(&self, job_id: Uuid, status: &T, ttl_secs: i64) -> Result<(), DbError> {
        self.set_json_ex(&job_status_key(job_id), status, ttl_secs).await
    }

    /// Read the status of a job (`job:{id}:status`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or deserialization fails.
    pub async fn get_job_status<T: DeserializeOwned>(&self, job_id: Uuid) -> Result<Option<T>, DbError> {
        self.get_json(&job_status_key(job_id)).await
    }

    /// Check that the server answers by issuing a read.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the round trip fails.
    pub async fn ping(&self) -> Result<(), DbError> {
        let _: Option<String> = self.client.get("health:ping").await?;
        Ok(())
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the quit command fails.
    pub async fn quit(&self) -> Result<(), DbError> {
        self.client.quit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_key_format() {
        let id = Uuid::nil();
        assert_eq!(job_status_key(id), "job:00000000-0000-0000-0000-000000000000:status");
    }
}
