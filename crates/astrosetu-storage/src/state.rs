use aws_sdk_s3::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StorageError;
use crate::objects::{self, WriteCondition};

/// Load a JSON document from S3. Returns the deserialized value and its ETag.
pub async fn load_json<T: DeserializeOwned>(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<(T, String), StorageError> {
    let output = objects::get_object(client, bucket, key).await?;
    let value: T = serde_json::from_slice(&output.body)?;
    let etag = output.etag.unwrap_or_default();
    Ok((value, etag))
}

/// Like [`load_json`], but a missing object is `Ok(None)`.
pub async fn try_load_json<T: DeserializeOwned>(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<Option<(T, String)>, StorageError> {
    match load_json(client, bucket, key).await {
        Ok(loaded) => Ok(Some(loaded)),
        Err(StorageError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Save a JSON document to S3 under a write condition. Returns the new ETag.
pub async fn save_json<T: Serialize>(
    client: &Client,
    bucket: &str,
    key: &str,
    value: &T,
    condition: WriteCondition<'_>,
) -> Result<String, StorageError> {
    let body = serde_json::to_vec(value)?;
    objects::put_object(client, bucket, key, body, Some("application/json"), condition).await
}
