mod support;

#[tokio::test]
async fn stats_route_reports_counts_and_limits() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base_url}/stats"))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = res.json().await.expect("stats body should be json");
    assert!(body["security"]["limit"].as_u64().is_some());
    assert!(body["stream"]["limit"].as_u64().is_some());
    assert!(body["security"]["count"].as_u64().is_some());
}
