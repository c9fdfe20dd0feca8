//! API-key identity.
//!
//! Identity is an external collaborator configured statically: `API_KEYS`
//! maps each key to the owner it authenticates as. The core only ever
//! compares the resolved owner id for equality.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chunkvault_core::VaultError;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::HttpVaultError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Identity of the current caller, resolved from the `X-Api-Key` header.
#[derive(Debug, Clone, Copy)]
pub struct OwnerContext {
    pub owner_id: Uuid,
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

impl FromRequestParts<Arc<AppState>> for OwnerContext {
    type Rejection = HttpVaultError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                HttpVaultError(VaultError::Unauthorized(
                    "Missing X-Api-Key header".to_string(),
                ))
            })?;

        // Scan every entry even after a match would be possible; combined
        // with the constant-time comparison this keeps timing independent of
        // which configured key matched.
        let mut owner_id = None;
        for entry in state.config.api_keys() {
            if secure_compare(key, &entry.key) {
                owner_id = Some(entry.owner_id);
            }
        }

        owner_id.map(|owner_id| OwnerContext { owner_id }).ok_or_else(|| {
            tracing::debug!("Rejected request with unknown API key");
            HttpVaultError(VaultError::Unauthorized("Invalid API key".to_string()))
        })
    }
}
