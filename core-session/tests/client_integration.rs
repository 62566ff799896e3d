mod common;

use bridge_traits::KeyValueStore;
use common::*;
use core_runtime::events::SessionEvent;
use core_session::{
    CreditHistoryQuery, InitOptions, InitState, LinkData, SessionData, SessionError, SmsOptions,
};
use core_transport::TransportError;
use serde_json::{json, Value};
use std::time::Duration;

#[tokio::test]
async fn test_install_returns_whitelisted_data() {
    let h = harness().await;
    h.http.route("/v1/install", 200, &install_body());

    let data = h.client.init(KEY, InitOptions::default()).await.unwrap();

    assert_eq!(
        serde_json::to_value(&data).unwrap(),
        json!({
            "data": "{\"campaign\":\"spring\"}",
            "referring_identity": null,
            "identity": null,
            "has_app": true,
            "referring_link": "https://bnc.lt/l/ref123",
        })
    );
    assert_eq!(h.client.init_state(), InitState::Succeeded);
    assert_eq!(h.client.session_id().as_deref(), Some(SESSION_ID));

    let body = h.http.body_of("/v1/install").unwrap();
    assert!(body.contains("os=Linux"));
    assert!(body.contains("is_referrable=1"));
    assert!(body.ends_with(&format!("branch_key={}", KEY)));

    let first = stored(&h.permanent_store).await;
    assert_eq!(first["identity_id"], json!(IDENTITY_ID));
    assert_eq!(first["click_id"], json!("ref123"));
    assert_eq!(stored(&h.session_store).await["session_id"], json!(SESSION_ID));
}

#[tokio::test]
async fn test_stored_session_resumes_without_network() {
    let h = harness().await;
    h.session_store
        .set(
            core_session::SESSION_KEY,
            &json!({"session_id": "123", "identity": "bob", "identity_id": "9"}).to_string(),
        )
        .await
        .unwrap();

    let data = h.client.init(KEY, InitOptions::default()).await.unwrap();

    assert!(h.http.requests().is_empty());
    assert_eq!(
        data,
        SessionData {
            identity: Some(json!("bob")),
            ..Default::default()
        }
    );
    assert!(h.client.is_initialized());
    assert_eq!(h.client.session_id().as_deref(), Some("123"));
}

#[tokio::test]
async fn test_known_device_calls_open() {
    let h = harness().await;
    h.permanent_store
        .set(
            core_session::SESSION_KEY,
            &json!({
                "identity_id": IDENTITY_ID,
                "device_fingerprint_id": FINGERPRINT_ID,
                "data": "{\"first\":true}",
            })
            .to_string(),
        )
        .await
        .unwrap();
    h.http.route(
        "/v1/open",
        200,
        &json!({
            "session_id": SESSION_ID,
            "identity_id": IDENTITY_ID,
            "device_fingerprint_id": FINGERPRINT_ID,
        })
        .to_string(),
    );

    h.client.init(KEY, InitOptions::default()).await.unwrap();

    assert_eq!(h.http.count("/v1/install"), 0);
    let body = h.http.body_of("/v1/open").unwrap();
    assert!(body.contains(&format!("identity_id={}", IDENTITY_ID)));
    assert!(body.contains(&format!("device_fingerprint_id={}", FINGERPRINT_ID)));

    // First-session data survives an open.
    let first = h.client.first().await;
    assert_eq!(first.data, Some(json!("{\"first\":true}")));
}

#[tokio::test]
async fn test_second_init_is_rejected() {
    let h = harness().await;
    h.http.route("/v1/install", 200, &install_body());

    let first = h.client.init(KEY, InitOptions::default());
    let pending = h.client.init(KEY, InitOptions::default()).await;
    assert!(matches!(pending, Err(SessionError::InitPending)));

    first.await.unwrap();
    let again = h.client.init(KEY, InitOptions::default()).await;
    assert!(matches!(again, Err(SessionError::AlreadyInitialized)));
    assert_eq!(h.http.count("/v1/install"), 1);
}

#[tokio::test]
async fn test_calls_before_init_send_nothing() {
    let h = harness().await;

    let err = h.client.redeem(5, "rubies").await.unwrap_err();
    assert_eq!(err.to_string(), "Branch SDK not initialized");

    h.http.route("/v1/install", 200, &install_body());
    let init = h.client.init(KEY, InitOptions::default());
    let tracked = h.client.track("purchase", None).await;
    assert!(matches!(tracked, Err(SessionError::InitPending)));

    init.await.unwrap();
    assert_eq!(h.http.count("/v1/redeem"), 0);
    assert_eq!(h.http.count("/v1/event"), 0);
}

#[tokio::test]
async fn test_uninitialized_client_rejects_links_before_validating_data() {
    let h = harness().await;

    let err = h
        .client
        .link(LinkData::new().with_data(json!("plain")))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotInitialized));

    let err = h
        .client
        .send_sms(
            "5555550100",
            LinkData::new().with_data(json!(5)),
            SmsOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotInitialized));
    assert!(h.http.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_init_can_be_retried() {
    let h = harness().await;
    let mut events = h.client.subscribe();
    h.http.route("/v1/install", 500, "");

    let err = h.client.init(KEY, InitOptions::default()).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Transport(TransportError::Api { status: 500 })
    ));
    assert_eq!(h.http.count("/v1/install"), 3);
    assert_eq!(h.client.init_state(), InitState::Failed);
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::InitFailed { .. }
    ));

    assert!(matches!(
        h.client.credits().await,
        Err(SessionError::InitFailed)
    ));
    assert_eq!(stored(&h.session_store).await, Value::Null);

    h.http.route("/v1/install", 200, &install_body());
    h.client.init(KEY, InitOptions::default()).await.unwrap();
    assert!(h.client.is_initialized());
}

#[tokio::test(start_paused = true)]
async fn test_network_phases_follow_call_order() {
    let h = initialized().await;
    h.http.route_with_delay(
        "/v1/url",
        200,
        r#"{"url":"https://bnc.lt/l/slow"}"#,
        Duration::from_millis(50),
    );
    h.http.route("/v1/event", 200, "{}");
    h.http.route_with_delay("/v1/credits", 200, r#"{"default":3}"#, Duration::from_millis(10));

    let link = h.client.link(LinkData::new());
    let track = h.client.track("viewed", Some(json!({"item": 1})));
    let credits = h.client.credits();

    // Awaited out of order on purpose.
    assert_eq!(credits.await.unwrap(), json!({"default": 3}));
    track.await.unwrap();
    assert_eq!(link.await.unwrap(), "https://bnc.lt/l/slow");

    let log: Vec<_> = h
        .http
        .log()
        .into_iter()
        .filter(|entry| !entry.contains("/v1/install"))
        .collect();
    assert_eq!(
        log,
        vec![
            "start /v1/url".to_string(),
            "end /v1/url".to_string(),
            "start /v1/event".to_string(),
            "end /v1/event".to_string(),
            format!("start /v1/credits/{}", IDENTITY_ID),
            format!("end /v1/credits/{}", IDENTITY_ID),
        ]
    );
}

#[tokio::test]
async fn test_link_with_non_object_data_sends_nothing() {
    let h = initialized().await;

    let err = h
        .client
        .link(LinkData::new().with_data(json!("not an object")))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Transport(TransportError::Validation(_))
    ));
    assert_eq!(h.http.count("/v1/url"), 0);
}

#[tokio::test]
async fn test_link_serializes_data() {
    let h = initialized().await;
    let mut events = h.client.subscribe();
    h.http.route("/v1/url", 200, r#"{"url":"https://bnc.lt/l/new"}"#);

    let url = h
        .client
        .link(
            LinkData::new()
                .with_channel("email")
                .with_tag("spring")
                .with_data(json!({"item": "shoes"})),
        )
        .await
        .unwrap();

    assert_eq!(url, "https://bnc.lt/l/new");
    let body = h.http.body_of("/v1/url").unwrap();
    assert!(body.contains("data=%7B%22item%22%3A%22shoes%22%7D"));
    assert!(body.contains("tags=spring"));
    assert!(body.contains(&format!("session_id={}", SESSION_ID)));
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LinkCreated { url }
    );
}

#[tokio::test]
async fn test_send_sms_creates_link_then_reuses_click_id() {
    let h = initialized().await;
    h.session_store
        .set(
            core_session::SESSION_KEY,
            &json!({"session_id": SESSION_ID}).to_string(),
        )
        .await
        .unwrap();
    h.http.route("/v1/url", 200, r#"{"url":"https://bnc.lt/l/abc"}"#);
    h.http.route("/l/abc", 200, r#"{"click_id":"xyz"}"#);
    h.http.route("/c/xyz", 200, "{}");

    h.client
        .send_sms("5551234567", LinkData::new(), SmsOptions::default())
        .await
        .unwrap();

    assert!(h.http.body_of("/v1/url").unwrap().contains("channel=sms"));
    let click = h
        .http
        .requests()
        .into_iter()
        .find(|r| r.url.contains("/l/abc"))
        .unwrap();
    assert_eq!(click.url, "https://bnc.lt/l/abc?click=click");
    assert!(h
        .http
        .body_of("/c/xyz")
        .unwrap()
        .contains("phone=5551234567"));
    assert_eq!(stored(&h.session_store).await["click_id"], json!("xyz"));
    assert_eq!(
        h.client.referring_link().await.as_deref(),
        Some("https://bnc.lt/c/xyz")
    );

    h.client
        .send_sms("5551234567", LinkData::new(), SmsOptions::default())
        .await
        .unwrap();
    assert_eq!(h.http.count("/v1/url"), 1);
    assert_eq!(h.http.count("/c/xyz"), 2);

    h.client
        .send_sms(
            "5551234567",
            LinkData::new(),
            SmsOptions {
                make_new_link: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(h.http.count("/v1/url"), 2);
}

#[tokio::test]
async fn test_set_identity_updates_session() {
    let h = initialized().await;
    let mut events = h.client.subscribe();
    h.http.route(
        "/v1/profile",
        200,
        &json!({
            "identity_id": 444444444444444u64,
            "identity": "alice",
            "link": "https://bnc.lt/i/alice",
            "referring_data": "{\"from\":\"bob\"}",
        })
        .to_string(),
    );

    let result = h.client.set_identity("alice").await.unwrap();

    assert_eq!(result.identity_id.as_deref(), Some("444444444444444"));
    assert_eq!(result.referring_data, Some(json!({"from": "bob"})));
    assert_eq!(h.client.identity_id().as_deref(), Some("444444444444444"));
    assert!(h.http.body_of("/v1/profile").unwrap().contains("identity=alice"));
    assert_eq!(h.client.data().await.identity, Some(json!("alice")));
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::IdentitySet {
            identity: "alice".into()
        }
    );
}

#[tokio::test]
async fn test_logout_issues_fresh_ids() {
    let h = initialized().await;
    h.http.route(
        "/v1/logout",
        200,
        r#"{"session_id":"555555555555555","identity_id":"666666666666666","link":"https://bnc.lt/i/new"}"#,
    );

    h.client.logout().await.unwrap();

    assert!(h.client.is_initialized());
    assert_eq!(h.client.session_id().as_deref(), Some("555555555555555"));
    let session = stored(&h.session_store).await;
    assert_eq!(session["identity_id"], json!("666666666666666"));
    assert!(session.get("data").is_none());
    let first = stored(&h.permanent_store).await;
    assert_eq!(first["identity_id"], json!("666666666666666"));
    assert!(first.get("data").is_none());
}

#[tokio::test]
async fn test_close_ends_session() {
    let h = initialized().await;
    h.http.route("/v1/close", 200, "{}");

    h.client.close().await.unwrap();

    assert_eq!(h.client.init_state(), InitState::Uninitialized);
    assert!(h.client.session_id().is_none());
    assert_eq!(stored(&h.session_store).await, Value::Null);
    assert!(matches!(
        h.client.credits().await,
        Err(SessionError::NotInitialized)
    ));
    let body = h.http.body_of("/v1/close").unwrap();
    assert!(body.contains(&format!("session_id={}", SESSION_ID)));
}

#[tokio::test]
async fn test_redeem_without_credits() {
    let h = initialized().await;
    h.http.route("/v1/redeem", 402, "");

    let err = h.client.redeem(5, "rubies").await.unwrap_err();

    assert_eq!(err.to_string(), "Not enough credits to redeem.");
    assert_eq!(h.http.count("/v1/redeem"), 1);
}

#[tokio::test]
async fn test_referral_codes_and_history() {
    let h = initialized().await;
    h.http.route("/v1/referralcode", 200, r#"{"referral_code":"ABC"}"#);
    h.http.route("/v1/applycode", 200, "{}");
    h.http.route("/v1/credithistory", 200, "[]");
    h.http.route("/v1/referrals", 200, r#"{"install":{"total":1}}"#);

    let code = h
        .client
        .get_code(core_session::ReferralCodeRequest {
            amount: 10,
            calculation_type: 1,
            location: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(code["referral_code"], json!("ABC"));
    let body = h.http.body_of("/v1/referralcode").unwrap();
    assert!(body.contains("type=credit"));
    assert!(body.contains("creation_type=2"));

    h.client.validate_code("ABC").await.unwrap();
    assert!(h
        .http
        .requests()
        .iter()
        .any(|r| r.url == "https://api.branch.io/v1/referralcode/ABC"));

    h.client.apply_code("ABC").await.unwrap();

    let history = h
        .client
        .credit_history(CreditHistoryQuery {
            length: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(history, json!([]));
    let request = h
        .http
        .requests()
        .into_iter()
        .find(|r| r.url.contains("/v1/credithistory"))
        .unwrap();
    assert!(request.url.contains("length=10"));

    let referrals = h.client.referrals().await.unwrap();
    assert_eq!(referrals["install"]["total"], json!(1));
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_releases_stalled_task() {
    let h = harness_with(|b| b.task_watchdog(Duration::from_millis(100))).await;
    h.http.route_with_delay(
        "/v1/install",
        200,
        &install_body(),
        Duration::from_secs(2),
    );

    let err = h.client.init(KEY, InitOptions::default()).await.unwrap_err();
    assert!(matches!(err, SessionError::TaskStalled("init")));
    assert_eq!(h.client.init_state(), InitState::Failed);

    // The queue is free again for later work.
    h.http.route("/v1/install", 200, &install_body());
    h.client.init(KEY, InitOptions::default()).await.unwrap();
    assert!(h.client.is_initialized());
}
