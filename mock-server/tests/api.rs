use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_api_key, PASS_CONTENT_TYPE};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Form request carrying `payload` in the `json` field, encoded the way the
/// client encodes it.
fn form_request(method: &str, uri: &str, payload: &Value) -> Request<String> {
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("json", &payload.to_string())
        .finish();
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder().method(method).uri(uri).body(String::new()).unwrap()
}

/// Routers share their store through `Arc`, so a clone sees every earlier
/// mutation.
async fn call(router: &axum::Router, request: Request<String>) -> axum::response::Response {
    router.clone().oneshot(request).await.unwrap()
}

// --- templates ---

#[tokio::test]
async fn list_template_headers_empty() {
    let resp = app()
        .oneshot(empty_request("GET", "/template/headers"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"templateHeaders": []}));
}

#[tokio::test]
async fn create_template_returns_string_id() {
    let resp = app()
        .oneshot(form_request("POST", "/template/", &json!({"name": "Coupon", "fields": {}, "headers": {}})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["templateId"].as_str().unwrap().parse::<u64>().is_ok());
}

#[tokio::test]
async fn create_template_without_form_is_rejected() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/template/")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(r#"{"name":"x"}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn create_template_malformed_json_returns_400() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/template/")
                .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body("json=%7Bnot-json".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_template_not_found() {
    let resp = app().oneshot(empty_request("GET", "/template/999")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_template_bad_id_returns_400() {
    let resp = app().oneshot(empty_request("GET", "/template/abc")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_template_by_unknown_external_id() {
    let resp = app()
        .oneshot(empty_request("DELETE", "/template/id/nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn external_id_with_reserved_characters_is_one_segment() {
    let router = app();

    let resp = call(
        &router,
        form_request("POST", "/template/id/summer%20sale%231", &json!({"name": "Zoë's card"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&router, empty_request("GET", "/template/id/summer%20sale%231")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["templateHeader"]["externalId"], "summer sale#1");
    assert_eq!(body["templateHeader"]["name"], "Zoë's card");
}

// --- passes ---

#[tokio::test]
async fn create_pass_for_unknown_template_is_404() {
    let resp = app()
        .oneshot(form_request("POST", "/pass/41", &json!({"name": "Ada"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_unknown_pass_is_404() {
    let resp = app()
        .oneshot(empty_request("GET", "/pass/5/download"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- auth ---

#[tokio::test]
async fn api_key_is_enforced_when_configured() {
    let router = app_with_api_key(Some("secret".to_string()));

    let resp = call(&router, empty_request("GET", "/template/headers")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = call(&router, empty_request("GET", "/template/headers?api_key=wrong")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = call(&router, empty_request("GET", "/template/headers?api_key=secret")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- full lifecycle ---

#[tokio::test]
async fn template_and_pass_lifecycle() {
    let router = app();

    // create template with an external id
    let resp = call(
        &router,
        form_request(
            "POST",
            "/template/id/loyalty",
            &json!({
                "fields": {"points": {"value": 0, "label": "Points"}},
                "headers": {},
                "name": "Loyalty",
                "description": "Store card",
                "type": "storeCard"
            }),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let template_id = body_json(resp).await["templateId"].as_str().unwrap().to_string();

    // fetch by external id and by numeric id
    let resp = call(&router, empty_request("GET", "/template/id/loyalty")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let by_external = body_json(resp).await;
    assert_eq!(by_external["templateHeader"]["id"], template_id.as_str());
    assert_eq!(by_external["templateHeader"]["externalId"], "loyalty");
    assert_eq!(by_external["fieldsModel"]["points"]["label"], "Points");

    let resp = call(&router, empty_request("GET", &format!("/template/{template_id}"))).await;
    assert_eq!(body_json(resp).await, by_external);

    // header list
    let resp = call(&router, empty_request("GET", "/template/headers")).await;
    let headers = body_json(resp).await;
    assert_eq!(headers["templateHeaders"].as_array().unwrap().len(), 1);
    assert_eq!(headers["templateHeaders"][0]["name"], "Loyalty");

    // create pass
    let resp = call(
        &router,
        form_request("POST", &format!("/pass/{template_id}"), &json!({"points": 10, "name": "Ada"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let created = body_json(resp).await;
    let pass_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["passFields"], json!({"points": 10, "name": "Ada"}));
    let first_url = created["url"].as_str().unwrap().to_string();

    // update pass: new url, new fields
    let resp = call(
        &router,
        form_request("PUT", &format!("/pass/{pass_id}"), &json!({"points": 25, "name": "Ada"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_ne!(updated["url"].as_str().unwrap(), first_url);

    // get pass reflects update
    let resp = call(&router, empty_request("GET", &format!("/pass/{pass_id}"))).await;
    let fetched = body_json(resp).await;
    assert_eq!(fetched["templateId"], template_id.as_str());
    assert_eq!(fetched["passFields"]["points"], 25);
    assert_eq!(fetched["url"], updated["url"]);

    // download
    let resp = call(&router, empty_request("GET", &format!("/pass/{pass_id}/download"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], PASS_CONTENT_TYPE);
    let bytes = body_bytes(resp).await;
    assert!(bytes.starts_with(b"PK\x03\x04"));

    // duplicate, then delete both copies
    let resp = call(&router, empty_request("POST", "/template/duplicate/id/loyalty")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let copy_id = body_json(resp).await["templateId"].as_str().unwrap().to_string();
    assert_ne!(copy_id, template_id);

    let resp = call(&router, empty_request("DELETE", &format!("/template/{copy_id}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = call(&router, empty_request("DELETE", "/template/id/loyalty")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // gone
    let resp = call(&router, empty_request("GET", "/template/id/loyalty")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = call(&router, empty_request("GET", "/template/headers")).await;
    assert_eq!(body_json(resp).await, json!({"templateHeaders": []}));
}
