use crate::domain::report::ReportStatus;
use maud::{html, Markup};

pub fn card(title: &str, body: Markup) -> Markup {
    html! {
        div class="card" {
            h2 { (title) }
            div class="card-body" {
                (body)
            }
        }
    }
}

pub fn status_badge(status: ReportStatus) -> Markup {
    let color = match status {
        ReportStatus::Pending => "#d97706",
        ReportStatus::Approved => "#059669",
        ReportStatus::Rejected => "#dc2626",
    };
    html! {
        span class="badge" style=(format!("color: {color};")) { (status.as_str()) }
    }
}
