use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use tracing::error;

use crate::auth::extract_token;
use crate::models::{ErrorResponse, Notification, NotificationTarget, Role};
use crate::AppState;

/// Body of a notification push from a backend service.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub target: NotificationTarget,
    pub title: String,
    pub message: String,
    pub kind: String,
}

/// Push a `notification:new` to a user, a role, or everyone. Admin only.
pub async fn push_notification(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NotifyRequest>,
) -> Result<Json<Notification>, (StatusCode, Json<ErrorResponse>)> {
    let identity = match app
        .gate
        .authenticate(extract_token(&headers, None).as_deref())
    {
        Ok(identity) => identity,
        Err(e) => {
            error!("Notification push rejected: {}", e);
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

    let notification = Notification::new(&request.title, &request.message, &request.kind);
    app.hub.notify(request.target, notification.clone());

    Ok(Json(notification))
}
