//! The REST surface of the vault.
//!
//! Token extraction, status mapping, and the route table. Handlers live
//! in [`auth`] (identity lifecycle) and [`vault`] (resources). Internal
//! failures are logged here and leave the process as bare status text.

mod auth;
mod vault;

use crate::contract::Vault;
use crate::error::VaultError;
use crate::model::Token;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use lockbox_domain::config::CredentialPolicy;
use lockbox_domain::constants::PASSWORD_HEADER;
use std::sync::Arc;
use tracing::error;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Shared state of the vault routes.
#[derive(Clone)]
pub struct VaultState {
    keeper: Arc<dyn Vault>,
    policy: CredentialPolicy,
}

impl std::fmt::Debug for VaultState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultState").field("policy", &self.policy).finish_non_exhaustive()
    }
}

impl VaultState {
    #[must_use]
    pub fn new(keeper: Arc<dyn Vault>, policy: CredentialPolicy) -> Self {
        Self { keeper, policy }
    }

    pub(crate) fn keeper(&self) -> &dyn Vault {
        self.keeper.as_ref()
    }

    pub(crate) const fn policy(&self) -> &CredentialPolicy {
        &self.policy
    }
}

/// The vault route table.
pub fn vault_router() -> OpenApiRouter<VaultState> {
    OpenApiRouter::new()
        .routes(routes!(auth::register_handler))
        .routes(routes!(auth::login_handler))
        .routes(routes!(vault::list_handler))
        .routes(routes!(vault::delete_handler))
        .routes(routes!(vault::store_piece_handler))
        .routes(routes!(vault::restore_piece_handler))
        .routes(routes!(vault::store_blob_handler))
        .routes(routes!(vault::restore_blob_handler))
}

impl IntoResponse for VaultError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadCredential { .. } => StatusCode::UNAUTHORIZED,
            Self::DuplicateIdentity { .. } => StatusCode::CONFLICT,
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Corrupt { .. } | Self::Transient { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        };

        if status.is_server_error() {
            error!(error = %self, "Vault request failed");
        }

        // Clients get the status text; details stay in the logs.
        (status, status.canonical_reason().unwrap_or_default().to_owned()).into_response()
    }
}

/// Extracts the bearer token; a request without one is unauthenticated.
pub(crate) fn bearer(headers: &HeaderMap) -> Result<Token, VaultError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(VaultError::bad_credential)?;
    Ok(Token::new(raw.to_owned()))
}

/// Extracts the per-operation vault password header.
pub(crate) fn vault_password(headers: &HeaderMap) -> Result<String, VaultError> {
    headers
        .get(PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| VaultError::bad_request("missing vault password header"))
}
