//! Second gate stage: is `(client-id, product-id)` a registered caller?

use std::{fmt, sync::Arc, time::Duration};

use crate::repos::IdentityLookup;

use super::types::{CallerIdentityKey, GateError};

#[derive(Clone)]
pub struct Authorizer {
    lookup: Arc<dyn IdentityLookup>,
    timeout: Duration,
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Authorizer {
    pub fn new(lookup: Arc<dyn IdentityLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    /// `Ok(true)` only when a record exists, both its fields are non-empty, and
    /// both equal the supplied values exactly. `Err` is reserved for a store
    /// that could not answer within the timeout.
    pub async fn check_authorization(
        &self,
        client_id: &str,
        product_id: &str,
    ) -> Result<bool, GateError> {
        let found = tokio::time::timeout(
            self.timeout,
            self.lookup
                .find_by_client_id_and_product_id(client_id, product_id),
        )
        .await
        .map_err(|_| GateError::LookupUnavailable("lookup timed out".into()))?
        .map_err(|err| GateError::LookupUnavailable(err.to_string()))?;

        let Some(record) = found else {
            tracing::debug!(%client_id, %product_id, "caller identity not found");
            return Ok(false);
        };

        if record.client_id.is_empty() || record.product_id.is_empty() {
            tracing::warn!(record_id = %record.id, "stored caller identity has empty fields");
            return Ok(false);
        }

        Ok(record.client_id == client_id && record.product_id == product_id)
    }

    pub async fn authorize(&self, key: &CallerIdentityKey) -> Result<(), GateError> {
        if self
            .check_authorization(&key.client_id, &key.product_id)
            .await?
        {
            Ok(())
        } else {
            Err(GateError::UnknownCaller)
        }
    }
}
