use super::*;
use crate::types::JobId;

async fn submit(app: &Router, n: u64, chunks: u32) -> JobId {
    let (status, body) = send(
        app,
        post_json(
            "/api/count-primes",
            &format!(r#"{{"n": {n}, "chunks": {chunks}}}"#),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    body["job_id"].as_str().unwrap().parse().unwrap()
}

async fn poll_until_done(app: &Router, job_id: JobId) -> serde_json::Value {
    for _ in 0..1000 {
        let (status, body) = send(app, get_request(&format!("/api/jobs/{job_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        if body["state"] == "SUCCESS" || body["state"] == "FAILURE" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish in time");
}

#[tokio::test]
async fn test_submit_returns_accepted_with_job_id() {
    let (app, _counter, _temp_dir) = test_app().await;

    let (status, body) = send(
        &app,
        post_json("/api/count-primes", r#"{"n": 10000, "chunks": 4}"#),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = body["job_id"].as_str().unwrap();
    assert!(job_id.parse::<JobId>().is_ok());
    assert_eq!(body.as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_poll_reaches_success_with_result() {
    let (app, _counter, _temp_dir) = test_app().await;
    let job_id = submit(&app, 10_000, 4).await;

    let body = poll_until_done(&app, job_id).await;

    assert_eq!(body["state"], "SUCCESS");
    assert_eq!(body["progress"]["completed"], 4);
    assert_eq!(body["progress"]["total"], 4);
    assert_eq!(body["result"]["prime_count"], 1229);
    assert_eq!(body["result"]["n"], 10000);
    assert!(body["result"]["duration_sec"].as_f64().unwrap() >= 0.0);
    assert!(body["error"].is_null());
}

#[tokio::test]
async fn test_in_flight_job_has_null_result() {
    let (app, _counter, _temp_dir) = test_app().await;
    let job_id = submit(&app, 200_000, 16).await;

    let (status, body) = send(&app, get_request(&format!("/api/jobs/{job_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    if body["state"] != "SUCCESS" {
        assert!(body["result"].is_null());
        assert!(body["error"].is_null());
    }

    let body = poll_until_done(&app, job_id).await;
    assert_eq!(body["result"]["prime_count"], 17984);
}

#[tokio::test]
async fn test_submit_rejects_small_n() {
    let (app, _counter, _temp_dir) = test_app().await;

    let (status, body) = send(
        &app,
        post_json("/api/count-primes", r#"{"n": 9999, "chunks": 4}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["details"]["field"], "n");
}

#[tokio::test]
async fn test_submit_rejects_chunk_count_out_of_range() {
    let (app, _counter, _temp_dir) = test_app().await;

    for chunks in [0, 129] {
        let (status, body) = send(
            &app,
            post_json(
                "/api/count-primes",
                &format!(r#"{{"n": 10000, "chunks": {chunks}}}"#),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "chunks={chunks}");
        assert_eq!(body["error"]["details"]["field"], "chunks");
    }
}

#[tokio::test]
async fn test_submit_rejects_non_integer_values() {
    let (app, _counter, _temp_dir) = test_app().await;

    for payload in [
        r#"{"n": "10000", "chunks": 4}"#,
        r#"{"n": 10000.5, "chunks": 4}"#,
        r#"{"n": 10000, "chunks": "four"}"#,
        r#"{"n": 10000}"#,
    ] {
        let (status, body) = send(&app, post_json("/api/count-primes", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["error"]["code"], "validation_error");
    }
}

#[tokio::test]
async fn test_submit_rejects_malformed_json() {
    let (app, _counter, _temp_dir) = test_app().await;

    let (status, body) = send(&app, post_json("/api/count-primes", "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], "body");
}

#[tokio::test]
async fn test_submit_without_content_type_is_bad_request() {
    let (app, _counter, _temp_dir) = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/count-primes")
        .body(Body::from(r#"{"n": 10000, "chunks": 4}"#))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_submit_after_shutdown_is_unavailable() {
    let (app, counter, _temp_dir) = test_app().await;
    counter.shutdown().await.unwrap();

    let (status, body) = send(
        &app,
        post_json("/api/count-primes", r#"{"n": 10000, "chunks": 4}"#),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "shutting_down");
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let (app, _counter, _temp_dir) = test_app().await;

    let (status, body) = send(&app, get_request(&format!("/api/jobs/{}", JobId::new()))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "job_not_found");
}

#[tokio::test]
async fn test_malformed_job_id_is_not_found() {
    let (app, _counter, _temp_dir) = test_app().await;

    let (status, body) = send(&app, get_request("/api/jobs/not-a-job")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "job_not_found");
    assert_eq!(body["error"]["details"]["job_id"], "not-a-job");
}
