use rentindex::indices::fetchers::BcraIclFetcher;
use rentindex::indices::{IndexFetcher, IndexType};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// Workbook parsing is covered by unit tests on the cell coercion helpers;
// a valid legacy BIFF workbook cannot reasonably be fabricated inline, so
// these tests pin down the failure modes of the download path.

#[tokio::test]
async fn missing_workbook_yields_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = BcraIclFetcher::new().with_url(format!("{}/diar_icl.xls", server.uri()));
    assert!(fetcher.fetch_all_historical().await.is_empty());
    assert!(fetcher.fetch_latest().await.is_empty());
}

#[tokio::test]
async fn non_workbook_body_yields_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>maintenance</html>", "text/html"),
        )
        .mount(&server)
        .await;

    let fetcher = BcraIclFetcher::new().with_url(format!("{}/diar_icl.xls", server.uri()));
    assert!(fetcher.fetch_all_historical().await.is_empty());
    assert!(fetcher.fetch_latest().await.is_empty());
}

#[test]
fn declares_rental_contract_capability() {
    let fetcher = BcraIclFetcher::new();
    assert_eq!(fetcher.country().as_str(), "AR");
    assert_eq!(fetcher.name(), "bcra.gob.ar");
    assert_eq!(fetcher.supported_index_types(), [IndexType::RentalContract]);
}
