//! Request handlers
//!
//! One handler per API route. Handlers only translate between HTTP and the
//! file gateway; every filesystem decision is made by the gateway.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::Response;
use log::debug;
use tokio::io::AsyncWriteExt;

use crate::api::requests::{
    DeleteRequest, DownloadQuery, ListQuery, MkdirRequest, QuotaRequest, RenameRequest,
    parse_body,
};
use crate::api::responses::{
    ApiError, ApiResponse, EmptyResponse, NameResponse, download_response, success,
};
use crate::error::GatewayError;
use crate::storage::{FileGateway, ListResult, QuotaReport, UploadResult};

/// Multipart field carrying uploaded files
const FILES_FIELD: &str = "files";
/// Multipart field naming the target directory
const DIR_PATH_FIELD: &str = "dirPath";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<FileGateway>,
    pub transfer_buffer_size: usize,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(inner)| inner)
        .map_err(|e| GatewayError::validation(e.body_text()).into())
}

/// GET /api/list
pub async fn list_entries(
    State(state): State<AppState>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<ListResult> {
    let params = query(params)?;
    let listing = state.gateway.list(params.path.as_deref()).await?;
    Ok(success(listing))
}

/// GET /api/quota
pub async fn get_quota(State(state): State<AppState>) -> ApiResult<QuotaReport> {
    Ok(success(state.gateway.quota_report().await))
}

/// POST /api/quota
pub async fn set_quota(State(state): State<AppState>, body: Bytes) -> ApiResult<QuotaReport> {
    let request: QuotaRequest = parse_body(&body)?;
    let report = state.gateway.set_quota(request.limit.as_ref()).await?;
    Ok(success(report))
}

/// POST /api/mkdir
pub async fn mkdir(State(state): State<AppState>, body: Bytes) -> ApiResult<NameResponse> {
    let request: MkdirRequest = parse_body(&body)?;
    let name = state
        .gateway
        .mkdir(request.dir_path.as_deref(), request.name.as_deref())
        .await?;
    Ok(success(NameResponse { name }))
}

/// POST /api/rename
pub async fn rename(State(state): State<AppState>, body: Bytes) -> ApiResult<NameResponse> {
    let request: RenameRequest = parse_body(&body)?;
    let name = state
        .gateway
        .rename(
            request.dir_path.as_deref(),
            request.old_name.as_deref(),
            request.new_name.as_deref(),
        )
        .await?;
    Ok(success(NameResponse { name }))
}

/// POST /api/delete
pub async fn delete(State(state): State<AppState>, body: Bytes) -> ApiResult<EmptyResponse> {
    let request: DeleteRequest = parse_body(&body)?;
    state
        .gateway
        .delete(request.dir_path.as_deref(), request.name.as_deref())
        .await?;
    Ok(success(EmptyResponse {}))
}

/// POST /api/upload
///
/// Each `files` part is streamed into the staging area as it arrives. If the
/// request fails or the client goes away, dropping the batch removes what
/// was staged.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadResult> {
    let mut multipart = multipart.map_err(|e| GatewayError::validation(e.body_text()))?;
    let mut batch = state.gateway.begin_upload();
    let mut dir_path: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some(FILES_FIELD) => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let mut staged = batch.create(&original_name).await?;
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    staged.write_all(&chunk).await.map_err(GatewayError::from)?;
                }
                staged.flush().await.map_err(GatewayError::from)?;
            }
            Some(DIR_PATH_FIELD) => {
                dir_path = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let result = state.gateway.upload(dir_path.as_deref(), batch).await?;
    Ok(success(result))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    GatewayError::validation(e.body_text()).into()
}

/// GET /api/download
pub async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let params = query(params)?;
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let download = state
        .gateway
        .download(params.file_path.as_deref(), range)
        .await?;
    Ok(download_response(download, state.transfer_buffer_size))
}
