use crate::config::AppConfig;
use crate::db::connection::Database;
use crate::domain::alerts::PriceAlertInput;
use crate::domain::official::OfficialPriceInput;
use crate::domain::report::{PriceReportInput, ReportFilter, ReportStatus};
use crate::errors::{ResultResp, ServerError};
use crate::market::{alerts, analytics, official, BaselineTracker, ReportService};
use crate::responses::{empty_response, html_response, json_response};
use crate::templates::pages::{queue_page, QueueVm};
use astra::Request;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Everything a request handler needs. Shared read-only across workers.
pub struct App {
    pub db: Database,
    pub reports: ReportService,
}

impl App {
    pub fn new(db: Database, cfg: &AppConfig) -> Self {
        let tracker = BaselineTracker::new(cfg.baseline.clone());
        Self {
            db,
            reports: ReportService::new(tracker, cfg.reports.clone()),
        }
    }

    pub fn tracker(&self) -> &BaselineTracker {
        self.reports.tracker()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModeratorBody {
    #[serde(default)]
    moderator_id: String,
}

pub fn handle(mut req: Request, app: &App) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let query = parse_query(&req);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let now = Utc::now();

    debug!(%method, %path, "request");

    match (method.as_str(), segments.as_slice()) {
        ("GET", []) => {
            let vm = app.db.with_conn(|conn| {
                Ok(QueueVm {
                    counts: crate::db::reports::status_counts(conn, None, None)?,
                    pending: app
                        .reports
                        .list(conn, &ReportFilter::with_status(ReportStatus::Pending))?,
                })
            })?;
            html_response(queue_page(&vm))
        }

        // ----- Reports -----
        ("POST", ["api", "reports"]) => {
            let input: PriceReportInput = read_json(&mut req)?;
            let report = app
                .db
                .with_conn(|conn| app.reports.submit(conn, &input, now))?;
            json_response(201, &report)
        }
        ("GET", ["api", "reports"]) => {
            let filter = report_filter(&query)?;
            let reports = app.db.with_conn(|conn| app.reports.list(conn, &filter))?;
            json_response(200, &reports)
        }
        ("GET", ["api", "reports", id]) => {
            let report = app.db.with_conn(|conn| app.reports.get(conn, id))?;
            json_response(200, &report)
        }
        ("POST", ["api", "reports", id, "approve"]) => {
            let body: ModeratorBody = read_json(&mut req)?;
            let report = app
                .db
                .with_conn(|conn| app.reports.approve(conn, id, &body.moderator_id, now))?;
            json_response(200, &report)
        }
        ("POST", ["api", "reports", id, "reject"]) => {
            let body: ModeratorBody = read_json(&mut req)?;
            let report = app
                .db
                .with_conn(|conn| app.reports.reject(conn, id, &body.moderator_id, now))?;
            json_response(200, &report)
        }
        ("POST", ["api", "reports", id, "reset"]) => {
            let report = app.db.with_conn(|conn| app.reports.reset(conn, id))?;
            json_response(200, &report)
        }
        ("DELETE", ["api", "reports", id]) => {
            app.db.with_conn(|conn| app.reports.delete(conn, id))?;
            empty_response(204)
        }

        // ----- Baseline -----
        ("GET", ["api", "baseline"]) => {
            let crop = required(&query, "crop")?;
            let district = required(&query, "district")?;
            let stats = app
                .db
                .with_conn(|conn| app.tracker().get_stats(conn, crop, district))?;
            json_response(200, &stats)
        }
        ("GET", ["api", "baseline", "classify"]) => {
            let crop = required(&query, "crop")?;
            let district = required(&query, "district")?;
            let price: f64 = required(&query, "price")?
                .parse()
                .map_err(|_| ServerError::BadRequest("price must be a number".into()))?;
            let verdict = app
                .db
                .with_conn(|conn| app.tracker().classify(conn, crop, district, price))?;
            json_response(200, &verdict)
        }

        // ----- Official prices -----
        ("POST", ["api", "official-prices"]) => {
            let input: OfficialPriceInput = read_json(&mut req)?;
            let row = app.db.with_conn(|conn| {
                official::ingest_official_price(conn, app.tracker(), &input, now)
            })?;
            json_response(201, &row)
        }
        ("GET", ["api", "official-prices"]) => {
            let crop = required(&query, "crop")?;
            let district = optional(&query, "district");
            let mandi = optional(&query, "mandi");
            let rows = app
                .db
                .with_conn(|conn| official::list_official_prices(conn, crop, district, mandi))?;
            json_response(200, &rows)
        }

        // ----- Analytics -----
        ("GET", ["api", "analytics"]) => {
            let district = optional(&query, "district");
            let summary = app
                .db
                .with_conn(|conn| analytics::market_analytics(conn, district))?;
            json_response(200, &summary)
        }
        ("GET", ["api", "farmers", farmer_id, "trust"]) => {
            let trust = app
                .db
                .with_conn(|conn| analytics::farmer_trust(conn, farmer_id))?;
            json_response(200, &trust)
        }

        // ----- Alerts -----
        ("POST", ["api", "alerts"]) => {
            let input: PriceAlertInput = read_json(&mut req)?;
            let alert = app
                .db
                .with_conn(|conn| alerts::create_alert(conn, &input, now))?;
            json_response(201, &alert)
        }
        ("GET", ["api", "alerts"]) => {
            let user_id = required(&query, "userId")?;
            let list = app.db.with_conn(|conn| alerts::list_alerts(conn, user_id))?;
            json_response(200, &list)
        }
        ("POST", ["api", "alerts", "evaluate"]) => {
            let user_id = required(&query, "userId")?;
            let fired = app
                .db
                .with_conn(|conn| alerts::evaluate_alerts(conn, app.tracker(), user_id, now))?;
            json_response(200, &fired)
        }
        ("POST", ["api", "alerts", id, action @ ("enable" | "disable")]) => {
            let enabled = *action == "enable";
            let alert = app
                .db
                .with_conn(|conn| alerts::set_alert_enabled(conn, id, enabled))?;
            json_response(200, &alert)
        }
        ("DELETE", ["api", "alerts", id]) => {
            app.db.with_conn(|conn| alerts::delete_alert(conn, id))?;
            empty_response(204)
        }

        _ => Err(ServerError::NotFound),
    }
}

fn read_json<T: DeserializeOwned>(req: &mut Request) -> Result<T, ServerError> {
    serde_json::from_reader(req.body_mut().reader())
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))
}

fn parse_query(req: &Request) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Missing and blank parameters are treated alike.
fn optional<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn required<'a>(query: &'a HashMap<String, String>, key: &str) -> Result<&'a str, ServerError> {
    optional(query, key).ok_or_else(|| ServerError::BadRequest(format!("missing query parameter {key}")))
}

fn report_filter(query: &HashMap<String, String>) -> Result<ReportFilter, ServerError> {
    let status = match optional(query, "status") {
        None | Some("all") => None,
        Some(raw) => Some(
            ReportStatus::parse(raw)
                .ok_or_else(|| ServerError::BadRequest(format!("unknown status {raw:?}")))?,
        ),
    };

    Ok(ReportFilter {
        status,
        district: optional(query, "district").map(str::to_string),
        crop: optional(query, "crop").map(str::to_string),
        farmer_id: optional(query, "farmerId").map(str::to_string),
    })
}
