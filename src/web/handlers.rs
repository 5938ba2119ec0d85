use salvo::prelude::*;
use serde_json::json;

use crate::web::WebState;
use crate::web::metrics::{Metrics, format_prometheus};

fn render_error(res: &mut Response, status: StatusCode, message: &str) {
    res.status_code(status);
    res.render(Json(json!({ "error": message })));
}

#[handler]
pub async fn health(res: &mut Response) {
    res.render(Json(json!({
        "status": "running",
        "uptime_seconds": Metrics::uptime_seconds(),
        "version": env!("CARGO_PKG_VERSION"),
    })));
}

#[handler]
pub async fn metrics(res: &mut Response) {
    res.render(Text::Plain(format_prometheus()));
}

#[handler]
pub async fn recent_urls(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(state) = depot.obtain::<WebState>() else {
        render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "web state missing");
        return;
    };

    let limit = req
        .query::<u32>("limit")
        .unwrap_or(state.history_limit)
        .clamp(1, 100);

    match state.store.recent_distinct(i64::from(limit)).await {
        Ok(urls) => {
            let count = urls.len();
            res.render(Json(json!({
                "urls": urls,
                "count": count,
                "limit": limit,
            })));
        }
        Err(err) => {
            render_error(
                res,
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("database error: {}", err),
            );
        }
    }
}
