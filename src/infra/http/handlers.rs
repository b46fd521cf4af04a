use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::application::campaigns::{CreateCampaign, MobileListing};
use crate::application::error::ErrorReport;
use crate::domain::entities::CampaignRecord;

use super::ApiState;
use super::error::ApiError;

/// Every success payload is wrapped in a `data` envelope.
#[derive(Debug, Serialize)]
pub struct DataBody<T> {
    pub data: T,
}

pub async fn list_campaigns(
    State(state): State<ApiState>,
) -> Result<Json<DataBody<Vec<CampaignRecord>>>, ApiError> {
    let campaigns = state.campaigns.list_campaigns().await?;
    Ok(Json(DataBody { data: campaigns }))
}

pub async fn list_for_mobile(
    State(state): State<ApiState>,
) -> Result<Json<DataBody<MobileListing>>, ApiError> {
    let listing = state.campaigns.list_for_mobile().await?;
    Ok(Json(DataBody { data: listing }))
}

pub async fn create_campaign(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Json<DataBody<i64>>, ApiError> {
    let mut product_id: Option<i64> = None;
    let mut story = String::new();
    let mut picture: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ApiError::bad_request("Malformed multipart body", Some(err.to_string()))
    })? {
        match field.name() {
            Some("product_id") => {
                let text = field.text().await.map_err(|err| {
                    ApiError::bad_request("Malformed multipart body", Some(err.to_string()))
                })?;
                let parsed = text.trim().parse::<i64>().map_err(|_| {
                    ApiError::bad_request("product_id must be an integer", Some(text))
                })?;
                product_id = Some(parsed);
            }
            Some("story") => {
                story = field.text().await.map_err(|err| {
                    ApiError::bad_request("Malformed multipart body", Some(err.to_string()))
                })?;
            }
            Some("picture") => {
                let file_name = field.file_name().unwrap_or("picture").to_string();
                let data = field.bytes().await.map_err(|err| {
                    ApiError::bad_request("Malformed multipart body", Some(err.to_string()))
                })?;
                if !data.is_empty() {
                    picture = Some((file_name, data));
                }
            }
            _ => {}
        }
    }

    let product_id =
        product_id.ok_or_else(|| ApiError::bad_request("product_id is required", None))?;

    // Existence gate: absent products are rejected before any side effect.
    if !state.campaigns.product_exists(product_id).await? {
        return Err(ApiError::bad_request("product not existed", None));
    }

    let picture_path = match picture {
        Some((file_name, data)) => {
            let stored = state
                .pictures
                .store(&file_name, data)
                .await
                .map_err(ApiError::upload)?;
            Some(stored.public_path())
        }
        None => None,
    };

    let campaign_id = state
        .campaigns
        .create_campaign(CreateCampaign {
            product_id,
            story,
            picture_path,
        })
        .await?;

    Ok(Json(DataBody { data: campaign_id }))
}

pub async fn serve_picture(
    State(state): State<ApiState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let data = state
        .pictures
        .read(&path)
        .await
        .map_err(|_| ApiError::not_found("Picture not found"))?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], data).into_response())
}

pub async fn health(State(state): State<ApiState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error("infra::http::health", StatusCode::SERVICE_UNAVAILABLE, &err)
                .attach(&mut response);
            response
        }
    }
}
