//! Upsert - Create, update and delete on top of a PATCH-only API
//!
//! PATCH on the Policy API creates the object when the id is unused and
//! replaces it otherwise, so create is guarded by an explicit existence check.
//! Every write is followed by a read to obtain the authoritative object.

use crate::provider::{ProviderError, ProviderResult};
use crate::remote::RemoteCollection;

/// Generate a fresh object id
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Whether an object with `id` exists. Errors other than not-found are fatal.
pub async fn exists<C: RemoteCollection>(collection: &C, id: &str) -> ProviderResult<bool> {
    match collection.get(id).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(ProviderError::read_failed(collection.kind(), id, e)),
    }
}

/// Create a new object under `local_id` (or a generated id)
///
/// Fails with `AlreadyExists` without writing when the id is taken. A failed
/// read-back leaves the object created remotely.
pub async fn create<C: RemoteCollection>(
    collection: &C,
    local_id: Option<&str>,
    desired: &C::Object,
) -> ProviderResult<(String, C::Object)> {
    let kind = collection.kind();
    let id = match local_id.filter(|s| !s.is_empty()) {
        Some(id) => id.to_string(),
        None => generate_id(),
    };

    if exists(collection, &id).await? {
        return Err(ProviderError::AlreadyExists {
            kind: kind.to_string(),
            id,
        });
    }

    log::info!("Creating {} with ID {}", kind, id);
    collection
        .patch(&id, desired)
        .await
        .map_err(|source| ProviderError::CreateFailed {
            kind: kind.to_string(),
            id: id.clone(),
            source,
        })?;

    let object = read_back(collection, &id).await?;
    Ok((id, object))
}

/// Replace the object under `id` with `desired`
pub async fn update<C: RemoteCollection>(
    collection: &C,
    id: &str,
    desired: &C::Object,
) -> ProviderResult<C::Object> {
    let kind = collection.kind();

    log::info!("Updating {} with ID {}", kind, id);
    collection
        .patch(id, desired)
        .await
        .map_err(|source| ProviderError::UpdateFailed {
            kind: kind.to_string(),
            id: id.to_string(),
            source,
        })?;

    read_back(collection, id).await
}

/// Delete the object under `id`. A missing object is an error too.
pub async fn delete<C: RemoteCollection>(collection: &C, id: &str) -> ProviderResult<()> {
    let kind = collection.kind();

    log::info!("Deleting {} with ID {}", kind, id);
    collection
        .delete(id)
        .await
        .map_err(|source| ProviderError::DeleteFailed {
            kind: kind.to_string(),
            id: id.to_string(),
            source,
        })
}

/// Verify that `id` is gone after a delete
///
/// Not-found is success; a successful read is `StillExists`; any other
/// error is returned as is rather than taken as proof of absence.
pub async fn ensure_absent<C: RemoteCollection>(collection: &C, id: &str) -> ProviderResult<()> {
    if exists(collection, id).await? {
        return Err(ProviderError::StillExists {
            kind: collection.kind().to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

async fn read_back<C: RemoteCollection>(collection: &C, id: &str) -> ProviderResult<C::Object> {
    collection
        .get(id)
        .await
        .map_err(|e| ProviderError::read_failed(collection.kind(), id, e))
}
