use crate::domain::alerts::{AlertCondition, PriceAlertInput};
use crate::errors::ServerError;
use crate::market::alerts::{create_alert, delete_alert, evaluate_alerts, list_alerts, set_alert_enabled};
use crate::tests::utils::{init_test_app, seed_samples, test_now, TestEnv};
use chrono::Duration;

fn alert(env: &TestEnv, condition: AlertCondition, target: f64) -> String {
    let input = PriceAlertInput {
        user_id: "farmer-1".into(),
        crop: "cotton".into(),
        district: "eluru".into(),
        condition: Some(condition),
        target_price: Some(target),
    };
    env.app
        .db
        .with_conn(|conn| create_alert(conn, &input, test_now()))
        .unwrap()
        .id
}

fn evaluate(env: &TestEnv) -> Vec<String> {
    env.app
        .db
        .with_conn(|conn| evaluate_alerts(conn, env.app.tracker(), "farmer-1", test_now()))
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect()
}

#[test]
fn alerts_fire_once_against_market_mean() {
    let env = init_test_app();
    let above = alert(&env, AlertCondition::Above, 6500.0);
    let below = alert(&env, AlertCondition::Below, 6500.0);

    // no baseline yet
    assert!(evaluate(&env).is_empty());

    seed_samples(&env, "Cotton", "Eluru", &[6600.0, 7000.0]);
    assert_eq!(evaluate(&env), vec![above.clone()]);
    assert!(evaluate(&env).is_empty());

    let stored = env
        .app
        .db
        .with_conn(|conn| list_alerts(conn, "farmer-1"))
        .unwrap();
    let fired = stored.iter().find(|a| a.id == above).unwrap();
    assert!(fired.triggered);
    assert_eq!(fired.triggered_at, Some(test_now()));
    let armed = stored.iter().find(|a| a.id == below).unwrap();
    assert!(!armed.triggered);
}

#[test]
fn disabled_alert_is_skipped() {
    let env = init_test_app();
    let id = alert(&env, AlertCondition::Above, 100.0);
    seed_samples(&env, "Cotton", "Eluru", &[6600.0]);

    let disabled = env
        .app
        .db
        .with_conn(|conn| set_alert_enabled(conn, &id, false))
        .unwrap();
    assert!(!disabled.enabled);
    assert!(evaluate(&env).is_empty());

    env.app
        .db
        .with_conn(|conn| set_alert_enabled(conn, &id, true))
        .unwrap();
    assert_eq!(evaluate(&env), vec![id]);
}

#[test]
fn listing_is_newest_first_and_delete_checks_existence() {
    let env = init_test_app();
    let older = alert(&env, AlertCondition::Above, 100.0);
    let input = PriceAlertInput {
        user_id: "farmer-1".into(),
        crop: "rice".into(),
        district: "eluru".into(),
        condition: Some(AlertCondition::Below),
        target_price: Some(2000.0),
    };
    let newer = env
        .app
        .db
        .with_conn(|conn| create_alert(conn, &input, test_now() + Duration::minutes(1)))
        .unwrap()
        .id;

    let ids: Vec<_> = env
        .app
        .db
        .with_conn(|conn| list_alerts(conn, "farmer-1"))
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![newer, older.clone()]);

    env.app.db.with_conn(|conn| delete_alert(conn, &older)).unwrap();
    let err = env
        .app
        .db
        .with_conn(|conn| delete_alert(conn, &older))
        .unwrap_err();
    assert!(matches!(err, ServerError::NotFound));
}
