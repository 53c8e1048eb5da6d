//! End-to-end tests for the timeline walk and deletion pass against a
//! local mock of the v1.1 API.

use chrono::{Duration, Utc};
use ebb_common::EbbError;
use ebb_http::OAuth1Token;
use ebb_prune::{collect_history, prune};
use ebb_social::twitter::{TimelineQuery, TwitterApi, UserTimeline};
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMELINE_PATH: &str = "/1.1/statuses/user_timeline.json";

fn demo_token() -> OAuth1Token {
    OAuth1Token::new("ck", "cs", "at", "ats")
}

fn api_for(server: &MockServer) -> TwitterApi {
    TwitterApi::with_base_url(demo_token(), server.uri()).expect("mock server url")
}

/// One status in the v1.1 wire shape, `days_old` days in the past.
fn tweet_json(id: u64, days_old: i64) -> serde_json::Value {
    let stamp = (Utc::now() - Duration::days(days_old))
        .format("%a %b %d %H:%M:%S %z %Y")
        .to_string();
    json!({
        "created_at": stamp,
        "id": id,
        "id_str": id.to_string(),
        "text": format!("status {id}"),
        "user": {"id": 1, "screen_name": "whomever"}
    })
}

#[tokio::test]
async fn timeline_requests_carry_the_shaped_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param("screen_name", "whomever"))
        .and(query_param("count", "200"))
        .and(query_param("include_rts", "true"))
        .and(query_param_is_missing("max_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([tweet_json(10, 1)])))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    // 500 exceeds the API cap and must clamp to 200 on the wire.
    let query = TimelineQuery {
        count: 500,
        ..TimelineQuery::default()
    };
    let page = api.user_timeline("whomever", &query).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, 10);

    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0]
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(authorization.starts_with("OAuth "));
    assert!(authorization.contains(r#"oauth_consumer_key="ck""#));
}

#[tokio::test]
async fn retweet_exclusion_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param("include_rts", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let query = TimelineQuery {
        include_rts: false,
        ..TimelineQuery::default()
    };
    let page = api.user_timeline("whomever", &query).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn the_walk_steps_max_id_below_each_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param_is_missing("max_id"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(json!([tweet_json(300, 1), tweet_json(201, 2)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param("max_id", "200"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(json!([tweet_json(150, 3), tweet_json(101, 4)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param("max_id", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let timeline = UserTimeline::new(&api, "whomever").with_page_size(2);
    let collected = collect_history(&timeline).await.unwrap();

    let ids: Vec<u64> = collected.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![300, 201, 150, 101]);
}

#[tokio::test]
async fn a_full_pass_deletes_exactly_the_expired_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param_is_missing("max_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            tweet_json(300, 2),
            tweet_json(201, 9),
            tweet_json(101, 30),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param("max_id", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/statuses/destroy/201.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweet_json(201, 9)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/statuses/destroy/101.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweet_json(101, 30)))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let timeline = UserTimeline::new(&api, "whomever");
    let report = prune(&timeline, Duration::days(7), false).await.unwrap();

    assert_eq!(report.collected, 3);
    assert_eq!(report.expired, 2);
    assert_eq!(report.deleted, 2);
    assert!(!report.dry_run);
}

#[tokio::test]
async fn dry_run_walks_the_timeline_but_never_posts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param_is_missing("max_id"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(json!([tweet_json(300, 2), tweet_json(101, 30)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param("max_id", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let timeline = UserTimeline::new(&api, "whomever");
    let report = prune(&timeline, Duration::days(7), true).await.unwrap();

    assert_eq!(report.collected, 2);
    assert_eq!(report.expired, 1);
    assert_eq!(report.deleted, 0);
    assert!(report.dry_run);
}

#[tokio::test]
async fn auth_failures_surface_without_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"code": 89, "message": "Invalid or expired token."}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let timeline = UserTimeline::new(&api, "whomever");
    let err = prune(&timeline, Duration::days(7), false).await.unwrap_err();

    match err {
        EbbError::Api(inner) => {
            let message = inner.to_string();
            assert!(message.contains("401"), "unexpected message: {message}");
            assert!(message.contains("Invalid or expired token. (code 89)"));
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn a_deletion_failure_stops_the_pass() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param_is_missing("max_id"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(json!([tweet_json(201, 9), tweet_json(101, 30)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TIMELINE_PATH))
        .and(query_param("max_id", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    // First deletion is refused; the second must never be attempted.
    Mock::given(method("POST"))
        .and(path("/1.1/statuses/destroy/201.json"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errors": [{"code": 64, "message": "Your account is suspended."}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/statuses/destroy/101.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tweet_json(101, 30)))
        .expect(0)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let timeline = UserTimeline::new(&api, "whomever");
    let err = prune(&timeline, Duration::days(7), false).await.unwrap_err();
    assert!(matches!(err, EbbError::Api(_)));
}
