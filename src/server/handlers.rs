use super::error::ApiError;
use super::AppState;
use crate::media::{Container, DownloadRequest, Platform, Rendition, VideoInfo, VideoSource};
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct InfoRequest {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    platform: Platform,
    video_info: VideoInfo,
    formats: Vec<Rendition>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    url: Option<String>,
    format: Option<String>,
    quality: Option<String>,
    watermark: Option<String>,
}

pub async fn info(
    State(state): State<AppState>,
    request: Result<Json<InfoRequest>, JsonRejection>,
) -> Result<Json<InfoResponse>, ApiError> {
    // A body that is not JSON carries no usable URL either.
    let url = match request {
        Ok(Json(request)) => request.url,
        Err(rejection) => {
            warn!("Unreadable info request body: {}", rejection);
            None
        }
    };
    let source = VideoSource::parse(url.as_deref().unwrap_or_default())
        .map_err(|e| ApiError::from_service("Failed to fetch video information", e))?;

    let info = state.media.fetch_info(&source).await.map_err(|e| {
        ApiError::from_service(
            format!(
                "Failed to fetch {} video information",
                source.platform().display_name()
            ),
            e,
        )
    })?;

    Ok(Json(InfoResponse {
        platform: source.platform(),
        video_info: info.video,
        formats: info.formats,
    }))
}

pub async fn download_youtube(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    download(state, Platform::YouTube, query).await
}

pub async fn download_tiktok(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    download(state, Platform::TikTok, query).await
}

pub async fn download_facebook(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    download(state, Platform::Facebook, query).await
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running correctly"
    }))
}

fn download_request(platform: Platform, query: DownloadQuery) -> crate::media::Result<DownloadRequest> {
    let source = VideoSource::parse(query.url.as_deref().unwrap_or_default())?;
    if source.platform() != platform {
        return Err(crate::media::ServiceError::UnsupportedPlatform);
    }

    let format = match query.format.as_deref() {
        Some(raw) => raw.parse::<Container>()?,
        None => Container::Mp4,
    };
    let quality = query.quality.unwrap_or_else(|| match platform {
        Platform::YouTube => "720p".to_string(),
        _ => "hd".to_string(),
    });

    // Only TikTok offers watermark variants.
    let watermark = match platform {
        Platform::TikTok => DownloadRequest::parse_watermark(query.watermark.as_deref()),
        _ => None,
    };

    Ok(DownloadRequest {
        source,
        format,
        quality,
        watermark,
    })
}

async fn download(state: AppState, platform: Platform, query: DownloadQuery) -> Result<Response, ApiError> {
    let context = format!("Failed to download {} video", platform.display_name());
    let request =
        download_request(platform, query).map_err(|e| ApiError::from_service(&context, e))?;

    let download = state
        .media
        .download(&request)
        .await
        .map_err(|e| ApiError::from_service(&context, e))?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(download.content_type));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", download.filename))
            .map_err(|_| ApiError::internal("Failed to build download header"))?,
    );

    Ok((headers, Body::from_stream(download.body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(url: &str, format: Option<&str>) -> DownloadQuery {
        DownloadQuery {
            url: Some(url.to_string()),
            format: format.map(str::to_string),
            quality: None,
            watermark: None,
        }
    }

    #[test]
    fn test_download_request_defaults() {
        let request =
            download_request(Platform::YouTube, query("https://youtu.be/dQw4w9WgXcQ", None)).unwrap();
        assert_eq!(request.format, Container::Mp4);
        assert_eq!(request.quality, "720p");
        assert_eq!(request.watermark, None);

        let request = download_request(
            Platform::TikTok,
            query("https://www.tiktok.com/@user/video/1", Some("MP3")),
        )
        .unwrap();
        assert_eq!(request.format, Container::Mp3);
        assert_eq!(request.quality, "hd");
    }

    #[test]
    fn test_download_request_rejects_mismatched_platform() {
        let result = download_request(Platform::Facebook, query("https://youtu.be/dQw4w9WgXcQ", None));
        assert!(matches!(result, Err(crate::media::ServiceError::UnsupportedPlatform)));
    }

    #[test]
    fn test_download_request_rejects_unknown_format() {
        let result = download_request(
            Platform::YouTube,
            query("https://youtu.be/dQw4w9WgXcQ", Some("avi")),
        );
        assert!(matches!(
            result,
            Err(crate::media::ServiceError::InvalidParameter { name: "format", .. })
        ));
    }

    #[test]
    fn test_download_request_watermark() {
        let mut q = query("https://www.tiktok.com/@user/video/1", None);
        q.watermark = Some("true".to_string());
        let request = download_request(Platform::TikTok, q).unwrap();
        assert_eq!(request.watermark, Some(true));
    }

    #[test]
    fn test_download_request_drops_watermark_outside_tiktok() {
        let mut q = query("https://www.facebook.com/watch?v=42", Some("mp3"));
        q.quality = Some("High".to_string());
        q.watermark = Some("true".to_string());
        let request = download_request(Platform::Facebook, q).unwrap();
        assert_eq!(request.watermark, None);
        assert_eq!(request.attachment_name(), "facebook-High.mp3");
    }
}
