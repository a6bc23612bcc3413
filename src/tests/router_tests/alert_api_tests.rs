use super::{body_json, call};
use crate::tests::utils::{init_test_app, seed_samples};
use serde_json::json;

#[test]
fn alert_lifecycle_over_http() {
    let env = init_test_app();
    let mut created = call(
        &env,
        "POST",
        "/api/alerts",
        Some(json!({
            "userId": "farmer-1",
            "crop": "cotton",
            "district": "eluru",
            "condition": "above",
            "targetPrice": 6500,
        })),
    );
    assert_eq!(created.status(), 201);
    let alert = body_json(&mut created);
    let id = alert["id"].as_str().unwrap().to_string();
    assert_eq!(alert["crop"], "Cotton");
    assert_eq!(alert["triggered"], false);

    seed_samples(&env, "Cotton", "Eluru", &[7000.0]);

    let mut fired = call(&env, "POST", "/api/alerts/evaluate?userId=farmer-1", None);
    let fired = body_json(&mut fired);
    assert_eq!(fired.as_array().unwrap().len(), 1);
    assert_eq!(fired[0]["id"], id.as_str());

    let mut disabled = call(&env, "POST", &format!("/api/alerts/{id}/disable"), None);
    assert_eq!(body_json(&mut disabled)["enabled"], false);

    let mut listed = call(&env, "GET", "/api/alerts?userId=farmer-1", None);
    assert_eq!(body_json(&mut listed)[0]["triggered"], true);

    assert_eq!(call(&env, "DELETE", &format!("/api/alerts/{id}"), None).status(), 204);
    assert_eq!(call(&env, "DELETE", &format!("/api/alerts/{id}"), None).status(), 404);
}

#[test]
fn invalid_alert_is_rejected() {
    let env = init_test_app();
    let resp = call(
        &env,
        "POST",
        "/api/alerts",
        Some(json!({ "userId": "farmer-1", "crop": "cotton", "district": "eluru", "targetPrice": -4 })),
    );
    assert_eq!(resp.status(), 422);

    let missing_user = call(&env, "GET", "/api/alerts", None);
    assert_eq!(missing_user.status(), 400);
}
