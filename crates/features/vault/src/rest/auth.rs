//! Identity lifecycle endpoints: registration and login.

use super::VaultState;
use crate::error::VaultError;
use crate::model::Credential;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use lockbox_derive::{api_handler, api_model};
use lockbox_domain::constants::VAULT_TAG;

#[api_model]
pub(super) struct CredentialRequest {
    /// Identity name; also the vault owner key.
    username: String,
    /// Identity password.
    password: String,
}

impl CredentialRequest {
    /// Applies the configured minimum lengths before anything reaches the
    /// core.
    fn validated(self, state: &VaultState) -> Result<Credential, VaultError> {
        if self.username.chars().count() < state.policy().username_min_len {
            return Err(VaultError::bad_request("username is too short"));
        }
        if self.password.chars().count() < state.policy().password_min_len {
            return Err(VaultError::bad_request("password is too short"));
        }
        Ok(Credential { username: self.username, password: self.password })
    }
}

fn decode<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, VaultError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        VaultError::bad_request(format!("undecodable request body: {rejection}"))
    })
}

#[api_handler(
    post,
    path = "/register",
    request_body = CredentialRequest,
    responses(
        (status = CREATED, description = "Identity registered"),
        (status = BAD_REQUEST, description = "Malformed or too-short credential"),
        (status = CONFLICT, description = "Username is taken"),
    ),
    tag = VAULT_TAG,
)]
pub(super) async fn register_handler(
    State(state): State<VaultState>,
    payload: Result<Json<CredentialRequest>, JsonRejection>,
) -> Result<StatusCode, VaultError> {
    let credential = decode(payload)?.validated(&state)?;
    state.keeper().register(credential).await?;
    Ok(StatusCode::CREATED)
}

#[api_handler(
    post,
    path = "/login",
    request_body = CredentialRequest,
    responses(
        (status = OK, description = "Token issued in the Authorization response header"),
        (status = BAD_REQUEST, description = "Malformed credential"),
        (status = UNAUTHORIZED, description = "Unknown identity or wrong password"),
    ),
    tag = VAULT_TAG,
)]
pub(super) async fn login_handler(
    State(state): State<VaultState>,
    payload: Result<Json<CredentialRequest>, JsonRejection>,
) -> Result<impl IntoResponse, VaultError> {
    let request = decode(payload)?;
    let credential = Credential { username: request.username, password: request.password };

    let token = state.keeper().authenticate(credential).await?;
    let value = token
        .as_str()
        .parse::<axum::http::HeaderValue>()
        .map_err(|e| -> VaultError { format!("token is not a header value: {e}").into() })?;

    Ok((StatusCode::OK, [(header::AUTHORIZATION, value)]))
}
