use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::extract_token;
use crate::models::{ErrorResponse, Role};
use crate::AppState;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    pub status: String,
    pub online_users: usize,
}

/// Live presence counters, for operators. Admin only.
pub async fn diagnostics(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DiagnosticsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let identity = match app
        .gate
        .authenticate(extract_token(&headers, None).as_deref())
    {
        Ok(identity) => identity,
        Err(e) => {
            error!("Diagnostics request rejected: {}", e);
            let status = StatusCode::UNAUTHORIZED;
            return Err((
                status,
                Json(ErrorResponse {
                    code: status.as_u16(),
                    status: status.to_string(),
                    error: e.to_string(),
                }),
            ));
        }
    };

    if identity.role != Role::Admin {
        let status = StatusCode::FORBIDDEN;
        return Err((
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: "Admin access required".to_string(),
            }),
        ));
    }

    Ok(Json(DiagnosticsResponse {
        status: "ok".to_string(),
        online_users: app.hub.count_online().await,
    }))
}
