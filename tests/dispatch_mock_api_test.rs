//! Mock API tests for authenticated request dispatch.

use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxoa_rs::{Credentials, Error, OaClient, RequestOptions};

fn creds_for(server: &MockServer) -> Credentials {
    Credentials::new(server.uri(), "wx123", "secret")
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/cgi-bin/stable_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"errcode": 0, "access_token": token})),
        )
        .mount(server)
        .await;
}

fn query_of(req: &wiremock::Request) -> Vec<(String, String)> {
    req.url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[tokio::test]
async fn dispatch_returns_body_and_attaches_token() {
    let server = MockServer::start().await;
    mount_token(&server, "TOKEN_A").await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/user/info"))
        .and(query_param("openid", "o1"))
        .and(query_param("access_token", "TOKEN_A"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"errcode": 0, "nickname": "Alice"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let body = OaClient::default()
        .dispatch(
            &creds_for(&server),
            RequestOptions::get("/cgi-bin/user/info").query("openid", "o1"),
        )
        .await
        .unwrap();
    assert_eq!(body, json!({"errcode": 0, "nickname": "Alice"}));

    let requests = server.received_requests().await.unwrap();
    let call = requests
        .iter()
        .find(|r| r.url.path() == "/cgi-bin/user/info")
        .unwrap();
    let qs = query_of(call);
    assert!(qs.contains(&("openid".into(), "o1".into())));
    assert!(qs.contains(&("access_token".into(), "TOKEN_A".into())));
}

#[tokio::test]
async fn every_dispatch_uses_a_fresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/stable_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 0, "access_token": "TOKEN_A"})),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/stable_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 0, "access_token": "TOKEN_B"})),
        )
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/menu/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"menu": {}})))
        .mount(&server)
        .await;

    let client = OaClient::default();
    let creds = creds_for(&server);
    for _ in 0..2 {
        client
            .dispatch(&creds, RequestOptions::get("/cgi-bin/menu/get"))
            .await
            .unwrap();
    }

    let requests = server.received_requests().await.unwrap();
    let token_fetches = requests
        .iter()
        .filter(|r| r.url.path() == "/cgi-bin/stable_token")
        .count();
    assert_eq!(token_fetches, 2);

    let tokens: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() == "/cgi-bin/menu/get")
        .filter_map(|r| {
            query_of(r)
                .into_iter()
                .find(|(k, _)| k == "access_token")
                .map(|(_, v)| v)
        })
        .collect();
    assert_eq!(tokens, vec!["TOKEN_A".to_string(), "TOKEN_B".to_string()]);
}

#[tokio::test]
async fn caller_supplied_access_token_is_overwritten() {
    let server = MockServer::start().await;
    mount_token(&server, "TOKEN_A").await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/user/info"))
        .and(query_param("access_token", "TOKEN_A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"openid": "o1"})))
        .expect(1)
        .mount(&server)
        .await;

    OaClient::default()
        .dispatch(
            &creds_for(&server),
            RequestOptions::get("/cgi-bin/user/info")
                .query("openid", "o1")
                .query("access_token", "STALE"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn dispatch_surfaces_request_errcode() {
    let server = MockServer::start().await;
    mount_token(&server, "TOKEN_A").await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/custom/send"))
        .and(body_json(json!({"touser": "o1", "msgtype": "text", "text": {"content": "hi"}})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 45015, "errmsg": "response out of time limit"})),
        )
        .mount(&server)
        .await;

    let err = OaClient::default()
        .dispatch(
            &creds_for(&server),
            RequestOptions::post("/cgi-bin/message/custom/send")
                .json(json!({"touser": "o1", "msgtype": "text", "text": {"content": "hi"}})),
        )
        .await
        .unwrap_err();
    match err {
        Error::Request { code, message } => {
            assert_eq!(code, 45015);
            assert_eq!(message, "response out of time limit");
        }
        other => panic!("expected Request error, got {other:?}"),
    }
}

#[tokio::test]
async fn token_failure_stops_before_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/stable_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 40013, "errmsg": "invalid appid"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let err = OaClient::default()
        .dispatch(&creds_for(&server), RequestOptions::get("/cgi-bin/user/info"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TokenAcquisition { code: 40013, .. }));
}

#[tokio::test]
async fn text_bodies_are_parsed_as_json() {
    let server = MockServer::start().await;
    mount_token(&server, "TOKEN_A").await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/get_api_domain_ip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"ip_list":["101.226.103.0/25"]}"#, "text/plain"),
        )
        .mount(&server)
        .await;

    let body = OaClient::default()
        .dispatch(&creds_for(&server), RequestOptions::get("/cgi-bin/get_api_domain_ip"))
        .await
        .unwrap();
    assert_eq!(body["ip_list"][0], "101.226.103.0/25");
}

#[tokio::test]
async fn skip_token_bypasses_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/stable_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 0, "access_token": "TOKEN_A"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let body = OaClient::default()
        .dispatch(
            &creds_for(&server),
            RequestOptions::post("/cgi-bin/stable_token")
                .json(json!({"grant_type": "client_credential", "appid": "wx123", "secret": "secret"}))
                .skip_token(true),
        )
        .await
        .unwrap();
    assert_eq!(body["access_token"], "TOKEN_A");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(query_of(&requests[0]).is_empty());
}

#[tokio::test]
async fn form_and_raw_bodies() {
    let server = MockServer::start().await;
    mount_token(&server, "TOKEN_A").await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/form"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("a=1&b=two"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/media/upload"))
        .and(query_param("type", "image"))
        .and(header("content-type", "multipart/form-data; boundary=XYZ"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"type": "image", "media_id": "M1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OaClient::default();
    let creds = creds_for(&server);
    client
        .dispatch(
            &creds,
            RequestOptions::post("/cgi-bin/form")
                .form(vec![("a".into(), "1".into()), ("b".into(), "two".into())]),
        )
        .await
        .unwrap();

    let body = client
        .dispatch(
            &creds,
            RequestOptions::post("/cgi-bin/media/upload")
                .query("type", "image")
                .raw("multipart/form-data; boundary=XYZ", b"--XYZ--\r\n".to_vec()),
        )
        .await
        .unwrap();
    assert_eq!(body["media_id"], "M1");
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    openid: String,
    nickname: String,
}

#[tokio::test]
async fn dispatch_as_decodes_payload() {
    let server = MockServer::start().await;
    mount_token(&server, "TOKEN_A").await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"errcode": 0, "openid": "o1", "nickname": "Alice", "subscribe": 1}),
        ))
        .mount(&server)
        .await;

    let info: UserInfo = OaClient::default()
        .dispatch_as(
            &creds_for(&server),
            RequestOptions::get("/cgi-bin/user/info").query("openid", "o1"),
        )
        .await
        .unwrap();
    assert_eq!(info.openid, "o1");
    assert_eq!(info.nickname, "Alice");
}

#[tokio::test]
async fn origin_request_returns_raw_bytes() {
    let server = MockServer::start().await;
    mount_token(&server, "TOKEN_A").await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/media/get"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0xFFu8, 0xD8, 0xFF], "image/jpeg"))
        .mount(&server)
        .await;

    let raw = OaClient::default()
        .origin_request(
            &creds_for(&server),
            RequestOptions::get("/cgi-bin/media/get").query("media_id", "M1"),
        )
        .await
        .unwrap();
    assert_eq!(raw.status, 200);
    assert_eq!(raw.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(raw.body, vec![0xFF, 0xD8, 0xFF]);
}

#[tokio::test]
async fn http_error_status_without_errcode_fails() {
    let server = MockServer::start().await;
    mount_token(&server, "TOKEN_A").await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/user/info"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "internal error"})))
        .mount(&server)
        .await;

    let err = OaClient::default()
        .dispatch(
            &creds_for(&server),
            RequestOptions::get("/cgi-bin/user/info").query("openid", "o1"),
        )
        .await
        .unwrap_err();
    match err {
        Error::UnexpectedResponse { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.contains("internal error"));
        }
        other => panic!("expected UnexpectedResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn http_error_status_with_errcode_is_request_error() {
    let server = MockServer::start().await;
    mount_token(&server, "TOKEN_A").await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/user/info"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"errcode": -1, "errmsg": "system error"})),
        )
        .mount(&server)
        .await;

    let err = OaClient::default()
        .dispatch(&creds_for(&server), RequestOptions::get("/cgi-bin/user/info"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Request { code: -1, .. }));
}

#[tokio::test]
async fn transport_errors_do_not_leak_the_token() {
    let server = MockServer::start().await;
    mount_token(&server, "TOKEN_A").await;

    let err = OaClient::default()
        .dispatch(
            &creds_for(&server),
            RequestOptions::get("http://127.0.0.1:1/cgi-bin/user/info").query("openid", "o1"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    let text = err.to_string();
    assert!(!text.contains("TOKEN_A"), "token leaked: {text}");
    assert!(!text.contains("access_token"), "query leaked: {text}");
    assert!(!format!("{err:?}").contains("TOKEN_A"));
}
