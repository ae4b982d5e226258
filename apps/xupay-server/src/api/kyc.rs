// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! KYC document endpoints. Documents are only visible to their owner.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::extract::ApiJson;
use crate::{
    auth::Auth,
    error::{ApiError, ErrorResponse},
    models::{KycDocumentResponse, UploadKycDocumentRequest},
    state::AppState,
};

/// Submit a document for review. Moves the caller's KYC status to pending.
#[utoipa::path(
    post,
    path = "/api/kyc/upload-document",
    tag = "KYC",
    security(("bearer_auth" = [])),
    request_body = UploadKycDocumentRequest,
    responses(
        (status = 201, description = "Document stored", body = KycDocumentResponse),
        (status = 400, description = "Invalid document data", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn upload_document(
    Auth(user): Auth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UploadKycDocumentRequest>,
) -> Result<(StatusCode, Json<KycDocumentResponse>), ApiError> {
    let document = state
        .store
        .write()
        .await
        .upload_kyc_document(&user.user_id, request)?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    get,
    path = "/api/kyc/documents",
    tag = "KYC",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's documents, newest first", body = [KycDocumentResponse]),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_documents(Auth(user): Auth, State(state): State<AppState>) -> Json<Vec<KycDocumentResponse>> {
    let documents = state.store.read().await.kyc_documents(&user.user_id);
    Json(documents)
}

#[utoipa::path(
    get,
    path = "/api/kyc/{document_id}",
    tag = "KYC",
    security(("bearer_auth" = [])),
    params(("document_id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document", body = KycDocumentResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Not found or owned by another user", body = ErrorResponse)
    )
)]
pub async fn get_document(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<KycDocumentResponse>, ApiError> {
    let document = state
        .store
        .read()
        .await
        .kyc_document(&user.user_id, &document_id)?;
    Ok(Json(document))
}
