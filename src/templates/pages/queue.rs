use crate::domain::report::{PriceReport, ReportStatus};
use crate::templates::{card, desktop_layout, status_badge};
use maud::{html, Markup};
use std::collections::BTreeMap;

pub struct QueueVm {
    pub counts: BTreeMap<ReportStatus, i64>,
    pub pending: Vec<PriceReport>,
}

pub fn queue_page(vm: &QueueVm) -> Markup {
    desktop_layout(
        "Moderation Queue",
        html! {
            main class="container" {
                h1 { "Moderation Queue" }

                (card("Reports by status", html! {
                    ul {
                        @for (status, n) in &vm.counts {
                            li { (status_badge(*status)) " " (n) }
                        }
                    }
                }))

                (card("Pending reports", html! {
                    @if vm.pending.is_empty() {
                        p { "Nothing waiting for review." }
                    } @else {
                        table style="width: 100%; border-collapse: collapse;" {
                            thead {
                                tr {
                                    th { "Submitted" }
                                    th { "Crop" }
                                    th { "District" }
                                    th { "Mandi" }
                                    th { "Price (per qtl)" }
                                    th { "Quantity (qtl)" }
                                    th { "Flag" }
                                }
                            }
                            tbody {
                                @for r in &vm.pending {
                                    tr {
                                        td { (r.submitted_at.format("%Y-%m-%d %H:%M").to_string()) }
                                        td { (r.crop) }
                                        td { (r.district) }
                                        td { (r.mandi) }
                                        td { (format!("{:.2}", r.price)) }
                                        td { (format!("{:.1}", r.quantity)) }
                                        td {
                                            @if let Some(reason) = &r.anomaly_reason {
                                                span style="color: #b91c1c;" { (reason) }
                                            } @else {
                                                "-"
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }))
            }
        },
    )
}
