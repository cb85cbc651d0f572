//! HTTP handler functions for the `AlertaUTEC` API.

use actix_web::{HttpRequest, HttpResponse, web};
use alerta_analytics_models::Period;
use alerta_database::ScanFilter;
use alerta_lifecycle::NotificationEvent;
use alerta_report_models::{Identity, ImageUpload, NewReport, Report, Role, Sector};
use alerta_server_models::{
    AnalyticsQueryParams, ApiHealth, ApiImage, AssignReportRequest, CreateReportRequest,
    StatsQueryParams, TakeReportRequest, UpdateStatusRequest,
};
use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;

use crate::AppState;
use crate::error::ApiError;
use crate::identity::caller;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn decode_image(image: ApiImage) -> Result<ImageUpload, ApiError> {
    let bytes = general_purpose::STANDARD
        .decode(image.data.as_bytes())
        .map_err(|e| ApiError::bad_request(format!("Invalid image data: {e}")))?;

    Ok(ImageUpload {
        bytes,
        content_type: image.content_type,
    })
}

/// `POST /api/reports`
pub async fn create_report(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateReportRequest>,
) -> Result<HttpResponse, ApiError> {
    let author = caller(&req)?;
    let body = body.into_inner();

    let new_report = NewReport {
        place: body.place,
        description: body.description,
        urgency: body.urgency,
        image: body.image.map(decode_image).transpose()?,
    };

    let report = state.reports.submit(&author, new_report).await?;
    Ok(HttpResponse::Created().json(report))
}

/// Whether `identity` may read `report`: its author, an authority of its
/// sector, or any admin.
fn can_view(identity: &Identity, report: &Report) -> bool {
    match identity.role {
        Role::Admin => true,
        Role::Authority => identity.sector == Some(report.sector),
        Role::Student => report.author_id == identity.id,
    }
}

/// `GET /api/reports/{id}`
pub async fn get_report(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let identity = caller(&req)?;
    let report = state.reports.get(&path).await?;

    if !can_view(&identity, &report) {
        return Err(ApiError::forbidden("Not allowed to view this report"));
    }

    Ok(HttpResponse::Ok().json(report))
}

/// `POST /api/reports/{id}/take`
///
/// The body is optional.
pub async fn take_report(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<TakeReportRequest>>,
) -> Result<HttpResponse, ApiError> {
    let actor = caller(&req)?;
    let comment = body.and_then(|b| b.into_inner().comment);

    let report = state.reports.claim(&path, &actor, comment).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// `POST /api/reports/{id}/assign`
///
/// The assignee is taken from the body as an authority of
/// `targetSector`; no user directory is consulted, so the sector is
/// asserted by the calling admin. Assignment still fails if that sector
/// differs from the report's.
pub async fn assign_report(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AssignReportRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = caller(&req)?;
    let body = body.into_inner();
    let target = Identity::authority(body.target_id, body.target_sector);

    let report = state
        .reports
        .manual_assign(&path, &admin, &target, &body.status, body.comment)
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

/// `POST /api/reports/{id}/status`
pub async fn update_status(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let actor = caller(&req)?;
    let body = body.into_inner();

    let report = state
        .reports
        .update_status(&path, &actor, &body.status, body.comment)
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

/// `POST /api/classification/sweep`
///
/// Runs one classification pass immediately. Admin only.
pub async fn run_sweep(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let identity = caller(&req)?;
    if identity.role != Role::Admin {
        return Err(ApiError::forbidden("Only admins can run the sweep"));
    }

    let outcome = state.sweep.run_once().await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// `GET /api/analytics`
///
/// Authorities always see their own sector; admins may filter by any.
pub async fn analytics(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<AnalyticsQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let identity = caller(&req)?;
    let sector = match identity.role {
        Role::Authority => Some(
            identity
                .sector
                .ok_or_else(|| ApiError::forbidden("Authority has no sector"))?,
        ),
        Role::Admin => params
            .sector
            .as_deref()
            .map(|s| {
                s.parse::<Sector>()
                    .map_err(|_| ApiError::bad_request(format!("Unknown sector '{s}'")))
            })
            .transpose()?,
        Role::Student => {
            return Err(ApiError::forbidden("Analytics are for authorities and admins"));
        }
    };

    let now = Utc::now();
    let period = Period::parse_or_default(params.period.as_deref());
    let filter = ScanFilter {
        sector,
        created_since: Some(period.start(now)),
        ..ScanFilter::default()
    };
    let reports = state.reports.store().scan(&filter).await?;

    Ok(HttpResponse::Ok().json(alerta_analytics::aggregate(&reports, period, sector, now)))
}

/// `GET /api/stats`
pub async fn stats(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<StatsQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let identity = caller(&req)?;
    let now = Utc::now();
    let period = Period::parse_or_default(params.period.as_deref());
    let reports = state.reports.store().scan(&ScanFilter::default()).await?;

    let stats = alerta_analytics::stats::role_stats(&identity, &reports, period, now)
        .ok_or_else(|| ApiError::bad_request("Authority has no sector"))?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Encodes `event` as one SSE frame, or `None` if `identity` should not
/// receive it.
fn event_frame(event: &NotificationEvent, identity: &Identity) -> Option<web::Bytes> {
    if !event.visible_to(identity) {
        return None;
    }

    match serde_json::to_string(event) {
        Ok(json) => Some(web::Bytes::from(format!(
            "event: {}\ndata: {json}\n\n",
            event.kind()
        ))),
        Err(e) => {
            log::error!("Failed to serialize event: {e}");
            None
        }
    }
}

/// `GET /api/events`
///
/// Server-sent event stream of the notifications published after the
/// client connects, filtered to those the caller may see.
pub async fn events(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let identity = caller(&req)?;
    let mut rx = state.events.subscribe();
    log::info!(
        "Event stream opened for {} ({} subscribers)",
        identity.id,
        state.events.subscriber_count()
    );

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(frame) = event_frame(&event, &identity) {
                        yield Ok::<_, actix_web::Error>(frame);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Event stream for {} dropped {skipped} events", identity.id);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream))
}
