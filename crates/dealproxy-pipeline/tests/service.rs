//! End-to-end `DealService` behaviour against one mocked upstream.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dealproxy_pipeline::{DealService, EnrichConfig, PipelineConfig, PipelineError};
use dealproxy_upstream::BackoffPolicy;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer, currencies: &[&str]) -> PipelineConfig {
    let mut config = PipelineConfig::new(&server.uri(), &server.uri());
    config.currencies = currencies.iter().map(|c| (*c).to_owned()).collect();
    config.enrich = EnrichConfig {
        policy: BackoffPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2)),
        item_delay: Duration::ZERO,
    };
    config
}

async fn mount_stores(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/stores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"storeID": "1", "storeName": "Steam", "isActive": 1},
            {"storeID": "11", "storeName": "Humble Store", "isActive": 1}
        ])))
        .mount(server)
        .await;
}

async fn mount_appdetails(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/appdetails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "620": {"success": true, "data": {"name": "Portal 2", "release_date": {"date": "18 Apr, 2011"}}}
        })))
        .mount(server)
        .await;
}

fn one_deal_page() -> serde_json::Value {
    json!([{"gameID": "g1", "storeID": "1", "salePrice": "4.99", "steamAppID": "620"}])
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not met within 5s");
}

#[tokio::test]
async fn empty_cache_read_returns_nothing_and_starts_one_refresh() {
    let server = MockServer::start().await;
    mount_stores(&server).await;
    mount_appdetails(&server).await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .and(query_param("currencyCode", "USD"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(one_deal_page())
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (service, _worker) = DealService::from_config(test_config(&server, &["usd"])).unwrap();

    let first = service.get_deals("usd").await;
    assert!(!first.cached);
    assert_eq!(first.count(), 0);
    assert!(first.timestamp().is_none());

    // A second read while the first refresh is running does not start another.
    let second = service.get_deals("USD").await;
    assert_eq!(second.count(), 0);
    assert_eq!(service.refresh_attempts(), 1);

    let svc = Arc::clone(&service);
    wait_until(move || {
        let svc = Arc::clone(&svc);
        async move { svc.cache().get("usd").await.is_some() }
    })
    .await;

    let third = service.get_deals("usd").await;
    assert!(third.cached);
    assert_eq!(third.count(), 1);
    assert_eq!(third.deals()[0].store_name, "steam");
    assert_eq!(service.refresh_attempts(), 1);
}

#[tokio::test]
async fn refresh_queues_enrichment_that_patches_the_cache() {
    let server = MockServer::start().await;
    mount_stores(&server).await;
    mount_appdetails(&server).await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_deal_page()))
        .mount(&server)
        .await;
    let (service, worker) = DealService::from_config(test_config(&server, &["usd"])).unwrap();

    assert_eq!(service.refresh("usd").await.unwrap(), 1);

    let svc = Arc::clone(&service);
    wait_until(move || {
        let svc = Arc::clone(&svc);
        async move {
            let entry = svc.cache().get("usd").await;
            entry.is_some_and(|e| e.deals[0].metadata.load().is_present())
        }
    })
    .await;
    assert_eq!(service.metadata().counts().await.present, 1);

    let json = serde_json::to_value(service.get_deals("usd").await).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["deals"][0]["sale_price"], "4.99");
    assert_eq!(json["deals"][0]["metadata"]["status"], "present");
    assert_eq!(json["deals"][0]["metadata"]["data"]["release_year"], "2011");

    worker.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn enrichment_keeps_running_after_worker_handle_is_dropped() {
    let server = MockServer::start().await;
    mount_stores(&server).await;
    mount_appdetails(&server).await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_deal_page()))
        .mount(&server)
        .await;
    let (service, worker) = DealService::from_config(test_config(&server, &["usd"])).unwrap();
    drop(worker);

    service.refresh("usd").await.unwrap();

    let svc = Arc::clone(&service);
    wait_until(move || {
        let svc = Arc::clone(&svc);
        async move { svc.metadata().is_present("620").await }
    })
    .await;
    let entry = service.cache().get("usd").await.unwrap();
    assert!(entry.deals[0].metadata.load().is_present());
}

#[tokio::test]
async fn failed_refresh_keeps_the_previous_entry() {
    let server = MockServer::start().await;
    mount_stores(&server).await;
    mount_appdetails(&server).await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_deal_page()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (service, _worker) = DealService::from_config(test_config(&server, &["usd"])).unwrap();

    service.refresh("usd").await.unwrap();
    let before = service.cache().get("usd").await.unwrap();

    let err = service.refresh("usd").await.unwrap_err();
    assert!(matches!(err, PipelineError::Upstream(_)));

    let after = service.cache().get("usd").await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(service.refresh_attempts(), 2);
}

#[tokio::test]
async fn no_accepted_store_means_no_deal_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"storeID": "5", "storeName": "Somewhere Else", "isActive": 1}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    let (service, _worker) = DealService::from_config(test_config(&server, &["usd"])).unwrap();

    let err = service.refresh("usd").await.unwrap_err();
    assert!(matches!(err, PipelineError::EmptyStoreSet { .. }));
    assert!(service.cache().get("usd").await.is_none());
}

#[tokio::test]
async fn prewarm_loads_every_currency_and_marks_ready() {
    let server = MockServer::start().await;
    mount_stores(&server).await;
    mount_appdetails(&server).await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .and(query_param("currencyCode", "USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_deal_page()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .and(query_param("currencyCode", "EUR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"gameID": "g1", "storeID": "11", "salePrice": "3.50", "steamAppID": "620"},
            {"gameID": "g2", "storeID": "1", "salePrice": "7.00", "steamAppID": "730"}
        ])))
        .mount(&server)
        .await;
    let (service, _worker) = DealService::from_config(test_config(&server, &["usd", "eur"])).unwrap();
    assert!(!service.is_ready());

    service.prewarm(3, Duration::from_millis(10)).await;

    assert!(service.is_ready());
    let status = service.status().await;
    assert_eq!(status.stores, 2);
    let counts: Vec<(&str, usize, bool)> = status
        .currencies
        .iter()
        .map(|c| (c.currency.as_str(), c.count, c.expired))
        .collect();
    assert_eq!(counts, vec![("usd", 1, false), ("eur", 2, false)]);
}

#[tokio::test]
async fn prewarm_retries_store_list_before_giving_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stores"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_stores(&server).await;
    Mock::given(method("GET"))
        .and(path("/deals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_deal_page()))
        .mount(&server)
        .await;
    mount_appdetails(&server).await;
    let (service, _worker) = DealService::from_config(test_config(&server, &["usd"])).unwrap();

    service.prewarm(3, Duration::from_millis(5)).await;

    assert_eq!(service.status().await.stores, 2);
    assert_eq!(service.cache().get("usd").await.unwrap().deals.len(), 1);
}
