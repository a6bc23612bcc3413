use crate::config::AppConfig;
use crate::domain::baseline::REASON_LOWER;
use crate::domain::report::{PriceReport, ReportFilter, ReportStatus};
use crate::errors::ServerError;
use crate::market::reports::ReportConfig;
use crate::tests::utils::{
    days_ago, init_test_app, init_test_app_with, report_input, sample_count, seed_samples,
    test_now, TestEnv,
};
use chrono::{Duration, TimeZone, Utc};

fn submit(env: &TestEnv, crop: &str, district: &str, price: f64) -> PriceReport {
    env.app
        .db
        .with_conn(|conn| {
            env.app
                .reports
                .submit(conn, &report_input(crop, district, price), test_now())
        })
        .expect("Failed to submit report")
}

fn approve(env: &TestEnv, id: &str) -> Result<PriceReport, ServerError> {
    env.app
        .db
        .with_conn(|conn| env.app.reports.approve(conn, id, "admin-1", test_now()))
}

fn reject(env: &TestEnv, id: &str) -> Result<PriceReport, ServerError> {
    env.app
        .db
        .with_conn(|conn| env.app.reports.reject(conn, id, "admin-1", test_now()))
}

fn reset(env: &TestEnv, id: &str) -> Result<PriceReport, ServerError> {
    env.app.db.with_conn(|conn| env.app.reports.reset(conn, id))
}

#[test]
fn eluru_rice_scenario_is_flagged_low() {
    let env = init_test_app();
    // mean 2450, population stdDev 120
    seed_samples(&env, "Rice", "Eluru", &[2330.0, 2570.0]);

    let report = submit(&env, "Rice", "Eluru", 2150.0);

    assert_eq!(report.status, ReportStatus::Pending);
    assert!(report.anomaly_flag);
    assert_eq!(report.anomaly_reason.as_deref(), Some(REASON_LOWER));
    assert!(report.id.starts_with("rpt_"));
    assert_eq!(report.verified_by, None);
    // submissions do not feed the baseline
    assert_eq!(sample_count(&env, "Rice", "Eluru"), 2);
}

#[test]
fn cold_start_submission_is_not_flagged() {
    let env = init_test_app();
    let report = submit(&env, "Chillies", "Tuni", 50_000.0);
    assert!(!report.anomaly_flag);
    assert_eq!(report.anomaly_reason, None);
}

#[test]
fn invalid_submission_lists_fields_and_stores_nothing() {
    let env = init_test_app();
    let mut input = report_input("Rice", "Eluru", -5.0);
    input.mandi = "   ".into();
    input.transaction_date = Some(test_now().date_naive() + Duration::days(2));

    let err = env
        .app
        .db
        .with_conn(|conn| env.app.reports.submit(conn, &input, test_now()))
        .unwrap_err();

    let fields: Vec<_> = err.fields().iter().map(|f| f.field).collect();
    assert_eq!(fields, vec!["mandi", "price", "transactionDate"]);

    let all = env
        .app
        .db
        .with_conn(|conn| env.app.reports.list(conn, &ReportFilter::default()))
        .unwrap();
    assert!(all.is_empty());
}

#[test]
fn approve_twice_inserts_one_sample() {
    let env = init_test_app();
    let report = submit(&env, "Rice", "Eluru", 2400.0);
    assert_eq!(sample_count(&env, "Rice", "Eluru"), 0);

    let first = approve(&env, &report.id).unwrap();
    assert_eq!(first.status, ReportStatus::Approved);
    assert_eq!(first.verified_by.as_deref(), Some("admin-1"));
    assert!(first.verified_at.is_some());
    assert_eq!(sample_count(&env, "Rice", "Eluru"), 1);

    let later = test_now() + Duration::minutes(5);
    let second = env
        .app
        .db
        .with_conn(|conn| env.app.reports.approve(conn, &report.id, "admin-2", later))
        .unwrap();
    assert_eq!(second.status, ReportStatus::Approved);
    assert_eq!(second.verified_by.as_deref(), Some("admin-2"));
    assert_eq!(second.verified_at, Some(later));
    assert_eq!(sample_count(&env, "Rice", "Eluru"), 1);
}

#[test]
fn approval_feeds_the_baseline_used_by_later_submissions() {
    let env = init_test_app();
    let first = submit(&env, "Paddy", "Kovvur", 2000.0);
    approve(&env, &first.id).unwrap();

    let stats = env
        .app
        .db
        .with_conn(|conn| env.app.tracker().get_stats(conn, "Paddy", "Kovvur"))
        .unwrap();
    assert_eq!(stats.count, 1);
    assert_eq!(stats.mean, 2000.0);

    // a single-sample baseline has stdDev 0, so any difference is flagged
    let second = submit(&env, "Paddy", "Kovvur", 2010.0);
    assert!(second.anomaly_flag);
}

#[test]
fn reject_reset_approve_inserts_exactly_one_sample() {
    let env = init_test_app();
    let report = submit(&env, "Cotton", "Eluru", 6700.0);

    let rejected = reject(&env, &report.id).unwrap();
    assert_eq!(rejected.status, ReportStatus::Rejected);
    assert_eq!(sample_count(&env, "Cotton", "Eluru"), 0);

    let reopened = reset(&env, &report.id).unwrap();
    assert_eq!(reopened.status, ReportStatus::Pending);
    assert_eq!(reopened.verified_by, None);
    assert_eq!(reopened.verified_at, None);

    let approved = approve(&env, &report.id).unwrap();
    assert_eq!(approved.status, ReportStatus::Approved);
    assert_eq!(sample_count(&env, "Cotton", "Eluru"), 1);
}

#[test]
fn moderation_leaves_anomaly_classification_alone() {
    let env = init_test_app();
    seed_samples(&env, "Rice", "Eluru", &[2330.0, 2570.0]);
    let report = submit(&env, "Rice", "Eluru", 2150.0);

    let approved = approve(&env, &report.id).unwrap();
    assert!(approved.anomaly_flag);
    assert_eq!(approved.anomaly_reason, report.anomaly_reason);
    assert_eq!(approved.submitted_at, report.submitted_at);
}

#[test]
fn reset_keeps_sample_by_default() {
    let env = init_test_app();
    let report = submit(&env, "Maize", "Tanuku", 2100.0);
    approve(&env, &report.id).unwrap();

    reset(&env, &report.id).unwrap();
    assert_eq!(sample_count(&env, "Maize", "Tanuku"), 1);

    // approving again is a fresh transition into approved
    approve(&env, &report.id).unwrap();
    assert_eq!(sample_count(&env, "Maize", "Tanuku"), 2);
}

#[test]
fn reset_retracts_sample_when_configured() {
    let cfg = AppConfig {
        reports: ReportConfig {
            retract_sample_on_reset: true,
            ..ReportConfig::default()
        },
        ..AppConfig::default()
    };
    let env = init_test_app_with(cfg);
    let report = submit(&env, "Maize", "Tanuku", 2100.0);
    approve(&env, &report.id).unwrap();
    assert_eq!(sample_count(&env, "Maize", "Tanuku"), 1);

    reset(&env, &report.id).unwrap();
    assert_eq!(sample_count(&env, "Maize", "Tanuku"), 0);

    approve(&env, &report.id).unwrap();
    assert_eq!(sample_count(&env, "Maize", "Tanuku"), 1);
}

#[test]
fn delete_removes_report_but_not_its_sample() {
    let env = init_test_app();
    let report = submit(&env, "Banana", "Palakol", 1600.0);
    approve(&env, &report.id).unwrap();

    env.app
        .db
        .with_conn(|conn| env.app.reports.delete(conn, &report.id))
        .unwrap();

    let err = env
        .app
        .db
        .with_conn(|conn| env.app.reports.get(conn, &report.id))
        .unwrap_err();
    assert!(matches!(err, ServerError::NotFound));
    assert_eq!(sample_count(&env, "Banana", "Palakol"), 1);
}

#[test]
fn unknown_id_is_not_found_everywhere() {
    let env = init_test_app();
    let kept = submit(&env, "Rice", "Eluru", 2400.0);

    assert!(matches!(approve(&env, "rpt_missing"), Err(ServerError::NotFound)));
    assert!(matches!(reject(&env, "rpt_missing"), Err(ServerError::NotFound)));
    assert!(matches!(reset(&env, "rpt_missing"), Err(ServerError::NotFound)));
    let err = env
        .app
        .db
        .with_conn(|conn| env.app.reports.delete(conn, "rpt_missing"))
        .unwrap_err();
    assert!(matches!(err, ServerError::NotFound));

    // nothing else changed
    let all = env
        .app
        .db
        .with_conn(|conn| env.app.reports.list(conn, &ReportFilter::default()))
        .unwrap();
    assert_eq!(all, vec![kept]);
    assert_eq!(sample_count(&env, "Rice", "Eluru"), 0);
}

#[test]
fn blank_moderator_is_a_validation_error() {
    let env = init_test_app();
    let report = submit(&env, "Rice", "Eluru", 2400.0);

    let err = env
        .app
        .db
        .with_conn(|conn| env.app.reports.approve(conn, &report.id, " ", test_now()))
        .unwrap_err();
    assert_eq!(err.fields()[0].field, "moderatorId");
    assert_eq!(sample_count(&env, "Rice", "Eluru"), 0);
}

#[test]
fn list_filters_and_orders_newest_first() {
    let env = init_test_app();

    let mut ids = Vec::new();
    for (i, (crop, district)) in [("Rice", "Eluru"), ("Cotton", "Eluru"), ("Rice", "Tuni")]
        .iter()
        .enumerate()
    {
        let mut input = report_input(crop, district, 2000.0);
        input.farmer_id = format!("farmer-{}", i % 2);
        input.transaction_date = Some(days_ago(3));
        let at = test_now() + Duration::seconds(i as i64);
        let report = env
            .app
            .db
            .with_conn(|conn| env.app.reports.submit(conn, &input, at))
            .unwrap();
        ids.push(report.id);
    }
    approve(&env, &ids[0]).unwrap();

    let list = |filter: ReportFilter| {
        env.app
            .db
            .with_conn(|conn| env.app.reports.list(conn, &filter))
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect::<Vec<_>>()
    };

    assert_eq!(
        list(ReportFilter::default()),
        vec![ids[2].clone(), ids[1].clone(), ids[0].clone()]
    );
    assert_eq!(
        list(ReportFilter::with_status(ReportStatus::Pending)),
        vec![ids[2].clone(), ids[1].clone()]
    );
    assert_eq!(
        list(ReportFilter {
            district: Some("eluru".into()),
            ..ReportFilter::default()
        }),
        vec![ids[1].clone(), ids[0].clone()]
    );
    assert_eq!(
        list(ReportFilter {
            crop: Some("rice".into()),
            farmer_id: Some("farmer-0".into()),
            ..ReportFilter::default()
        }),
        vec![ids[2].clone(), ids[0].clone()]
    );
}

#[test]
fn concurrent_approvals_insert_one_sample() {
    let env = init_test_app();
    let report = submit(&env, "Groundnut", "Bhimavaram", 6000.0);

    std::thread::scope(|s| {
        for t in 0..4 {
            let db = env.app.db.clone();
            let reports = &env.app.reports;
            let id = report.id.clone();
            s.spawn(move || {
                db.with_conn(|conn| {
                    reports.approve(conn, &id, &format!("admin-{t}"), test_now())
                })
                .expect("approve under contention");
            });
        }
    });

    assert_eq!(sample_count(&env, "Groundnut", "Bhimavaram"), 1);
}

#[test]
fn concurrent_submits_all_succeed() {
    let env = init_test_app();
    seed_samples(&env, "Rice", "Eluru", &[2000.0, 2100.0, 2050.0]);

    std::thread::scope(|s| {
        for t in 0..8 {
            let env = &env;
            s.spawn(move || {
                for i in 0..10 {
                    let price = 2000.0 + f64::from(t * 10 + i);
                    env.app
                        .db
                        .with_conn(|conn| {
                            env.app
                                .reports
                                .submit(conn, &report_input("Rice", "Eluru", price), test_now())
                        })
                        .expect("submit under contention");
                }
            });
        }
    });

    let all = env
        .app
        .db
        .with_conn(|conn| env.app.reports.list(conn, &ReportFilter::default()))
        .unwrap();
    assert_eq!(all.len(), 80);
    // submissions never feed the baseline
    assert_eq!(sample_count(&env, "Rice", "Eluru"), 3);
}

#[test]
fn future_date_check_uses_market_calendar() {
    let env = init_test_app();
    // 01:30 IST on 11 December, still 10 December in UTC
    let now = Utc.with_ymd_and_hms(2025, 12, 10, 20, 0, 0).unwrap();
    let today_local = now.date_naive() + chrono::Days::new(1);

    let mut input = report_input("Rice", "Eluru", 2000.0);
    input.transaction_date = Some(today_local);
    let accepted = env
        .app
        .db
        .with_conn(|conn| env.app.reports.submit(conn, &input, now))
        .unwrap();
    assert_eq!(accepted.transaction_date, today_local);

    input.transaction_date = Some(today_local + chrono::Days::new(1));
    let err = env
        .app
        .db
        .with_conn(|conn| env.app.reports.submit(conn, &input, now))
        .unwrap_err();
    assert_eq!(err.fields()[0].field, "transactionDate");
}

#[test]
fn utc_calendar_when_offset_is_zero() {
    let cfg = ReportConfig {
        utc_offset_minutes: 0,
        ..ReportConfig::default()
    };
    let now = Utc.with_ymd_and_hms(2025, 12, 10, 20, 0, 0).unwrap();
    assert_eq!(cfg.local_date(now), now.date_naive());
    assert_eq!(
        ReportConfig::default().local_date(now),
        now.date_naive() + chrono::Days::new(1)
    );
}
