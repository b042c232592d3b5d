//! Resource endpoints: listing, deletion, pieces, and blobs.

use super::{VaultState, bearer, vault_password};
use crate::error::VaultError;
use crate::model::{Blob, Piece, ResourceId};
use axum::Json;
use axum::body::Body;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use futures_util::TryStreamExt;
use lockbox_derive::{api_handler, api_model};
use lockbox_domain::constants::{META_HEADER, VAULT_TAG};
use tokio_util::io::{ReaderStream, StreamReader};

#[api_model]
pub(super) struct ResourceResponse {
    /// Resource id.
    rid: ResourceId,
    /// User-visible metadata.
    meta: String,
    /// Resource kind tag: 1 = piece, 2 = blob.
    #[serde(rename = "type")]
    kind: i64,
}

#[api_model]
pub(super) struct PieceRequest {
    /// User-visible metadata, stored inside the envelope.
    meta: String,
    /// Piece content, base64 (raw, unpadded, standard alphabet).
    content: String,
}

#[api_model]
pub(super) struct PieceResponse {
    /// User-visible metadata.
    meta: String,
    /// Piece content, base64 (raw, unpadded, standard alphabet).
    content: String,
}

#[api_model]
pub(super) struct StoredResponse {
    /// Id of the newly stored resource.
    rid: ResourceId,
}

fn parse_rid(rid: Result<Path<ResourceId>, PathRejection>) -> Result<ResourceId, VaultError> {
    rid.map(|Path(rid)| rid).map_err(|_| VaultError::bad_request("resource id must be an integer"))
}

#[api_handler(
    get,
    path = "/vault",
    responses(
        (status = OK, description = "All resources of the authenticated identity", body = [ResourceResponse]),
        (status = UNAUTHORIZED, description = "Missing, forged, or expired token"),
    ),
    tag = VAULT_TAG,
)]
pub(super) async fn list_handler(
    State(state): State<VaultState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ResourceResponse>>, VaultError> {
    let identity = state.keeper().identity(&bearer(&headers)?).await?;

    let resources = identity.list().await?;
    Ok(Json(
        resources
            .into_iter()
            .map(|resource| ResourceResponse {
                rid: resource.rid,
                meta: resource.meta,
                kind: resource.kind.tag(),
            })
            .collect(),
    ))
}

#[api_handler(
    delete,
    path = "/vault/{rid}",
    params(("rid" = i64, Path, description = "Resource id")),
    responses(
        (status = OK, description = "Resource deleted"),
        (status = BAD_REQUEST, description = "Non-integer resource id"),
        (status = UNAUTHORIZED, description = "Missing, forged, or expired token"),
        (status = NOT_FOUND, description = "No such resource for this identity"),
    ),
    tag = VAULT_TAG,
)]
pub(super) async fn delete_handler(
    State(state): State<VaultState>,
    headers: HeaderMap,
    rid: Result<Path<ResourceId>, PathRejection>,
) -> Result<StatusCode, VaultError> {
    let identity = state.keeper().identity(&bearer(&headers)?).await?;
    let rid = parse_rid(rid)?;

    identity.delete(rid).await?;
    Ok(StatusCode::OK)
}

#[api_handler(
    put,
    path = "/vault/piece",
    request_body = PieceRequest,
    responses(
        (status = CREATED, description = "Piece stored", body = StoredResponse),
        (status = BAD_REQUEST, description = "Malformed body or missing password header"),
        (status = UNAUTHORIZED, description = "Bad token or wrong vault password"),
    ),
    tag = VAULT_TAG,
)]
pub(super) async fn store_piece_handler(
    State(state): State<VaultState>,
    headers: HeaderMap,
    payload: Result<Json<PieceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredResponse>), VaultError> {
    let identity = state.keeper().identity(&bearer(&headers)?).await?;
    let password = vault_password(&headers)?;
    let request = payload
        .map(|Json(request)| request)
        .map_err(|rejection| VaultError::bad_request(format!("undecodable body: {rejection}")))?;

    let content = STANDARD_NO_PAD
        .decode(request.content)
        .map_err(|_| VaultError::bad_request("content is not raw base64"))?;

    let rid = identity.store_piece(Piece { meta: request.meta, content }, &password).await?;

    Ok((StatusCode::CREATED, Json(StoredResponse { rid })))
}

#[api_handler(
    get,
    path = "/vault/piece/{rid}",
    params(("rid" = i64, Path, description = "Resource id")),
    responses(
        (status = OK, description = "Decrypted piece", body = PieceResponse),
        (status = BAD_REQUEST, description = "Non-integer id or missing password header"),
        (status = UNAUTHORIZED, description = "Bad token or wrong vault password"),
        (status = NOT_FOUND, description = "No such piece for this identity"),
    ),
    tag = VAULT_TAG,
)]
pub(super) async fn restore_piece_handler(
    State(state): State<VaultState>,
    headers: HeaderMap,
    rid: Result<Path<ResourceId>, PathRejection>,
) -> Result<Json<PieceResponse>, VaultError> {
    let identity = state.keeper().identity(&bearer(&headers)?).await?;
    let password = vault_password(&headers)?;
    let rid = parse_rid(rid)?;

    let piece = identity.restore_piece(rid, &password).await?;
    Ok(Json(PieceResponse {
        meta: piece.meta,
        content: STANDARD_NO_PAD.encode(piece.content),
    }))
}

#[api_handler(
    put,
    path = "/vault/blob",
    responses(
        (status = CREATED, description = "Blob stored", body = StoredResponse),
        (status = BAD_REQUEST, description = "Missing password header"),
        (status = UNAUTHORIZED, description = "Bad token or wrong vault password"),
    ),
    tag = VAULT_TAG,
)]
pub(super) async fn store_blob_handler(
    State(state): State<VaultState>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<StoredResponse>), VaultError> {
    let identity = state.keeper().identity(&bearer(&headers)?).await?;
    let password = vault_password(&headers)?;
    let meta = headers
        .get(META_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let content = StreamReader::new(body.into_data_stream().map_err(std::io::Error::other));
    let blob = Blob { meta, content: Box::new(content) };

    let rid = identity.store_blob(blob, &password).await?;
    Ok((StatusCode::CREATED, Json(StoredResponse { rid })))
}

#[api_handler(
    get,
    path = "/vault/blob/{rid}",
    params(("rid" = i64, Path, description = "Resource id")),
    responses(
        (status = OK, description = "Decrypted blob bytes; meta in the X-Meta header"),
        (status = BAD_REQUEST, description = "Non-integer id or missing password header"),
        (status = UNAUTHORIZED, description = "Bad token or wrong vault password"),
        (status = NOT_FOUND, description = "No such blob for this identity"),
    ),
    tag = VAULT_TAG,
)]
pub(super) async fn restore_blob_handler(
    State(state): State<VaultState>,
    headers: HeaderMap,
    rid: Result<Path<ResourceId>, PathRejection>,
) -> Result<impl IntoResponse, VaultError> {
    let identity = state.keeper().identity(&bearer(&headers)?).await?;
    let password = vault_password(&headers)?;
    let rid = parse_rid(rid)?;

    let blob = identity.restore_blob(rid, &password).await?;
    let meta = blob
        .meta
        .parse::<axum::http::HeaderValue>()
        .map_err(|e| -> VaultError { format!("meta is not a header value: {e}").into() })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, axum::http::HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, axum::http::HeaderValue::from_static("attachment")),
            (axum::http::HeaderName::from_static("x-meta"), meta),
        ],
        Body::from_stream(ReaderStream::new(blob.content)),
    ))
}
