//! HTTP client for the upstream catalog API.

use std::fmt::Debug;
use std::future::Future;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use async_stream::try_stream;
use enum_dispatch::enum_dispatch;
use futures::stream::Stream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{self, HeaderMap};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogClientConfig;
use crate::error::CatalogClientError;
use crate::mock::MockClient;
use crate::types::*;

/// Either a client for the actual catalog service,
/// or a mock client for testing.
#[derive(Debug)]
#[enum_dispatch(ClientTrait)]
pub enum Client {
    Catalog(CatalogClient),
    Mock(MockClient),
}

/// A client for the catalog service.
///
/// Every call is a single attempt: failures are returned to the caller as
/// [CatalogClientError] and never retried here.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: Url,
    config: CatalogClientConfig,
}

impl Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("catalog_url", &self.config.catalog_url)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client from configuration.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        // Url::join drops the last path segment unless the base ends in '/'
        let base = format!("{}/", config.catalog_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|source| CatalogClientError::InvalidUrl {
            url: config.catalog_url.clone(),
            source,
        })?;

        let client = build_http_client(&config)?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogClientError> {
        self.base_url
            .join(path)
            .map_err(|source| CatalogClientError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }

    /// Issue a GET request and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, CatalogClientError> {
        let url_str = url.to_string();
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| CatalogClientError::Transport {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url_str, %status, "catalog request unsuccessful");
            return Err(CatalogClientError::Status {
                url: url_str,
                status,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| CatalogClientError::Decode {
                url: url_str,
                source,
            })
    }
}

fn parse_ref(detail_ref: &str) -> Result<Url, CatalogClientError> {
    Url::from_str(detail_ref).map_err(|source| CatalogClientError::InvalidUrl {
        url: detail_ref.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Catalog trait
// ---------------------------------------------------------------------------

/// The catalog API interface.
///
/// This trait enables alternate implementations:
/// - **HTTP**: REST calls to the upstream API via [`CatalogClient`]
/// - **Mock**: Canned responses without HTTP via [`MockClient`]
#[enum_dispatch]
#[allow(async_fn_in_trait)]
pub trait ClientTrait {
    /// Fetch one page of the index. Pages are numbered from 1.
    async fn fetch_index_page(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<IndexPage, CatalogClientError>;

    /// Fetch the detail document an index entry refers to.
    async fn fetch_detail(&self, detail_ref: &str) -> Result<DetailPayload, CatalogClientError>;

    /// Fetch the detail document of an entry by its name.
    async fn fetch_detail_by_name(&self, name: &str) -> Result<DetailPayload, CatalogClientError>;

    /// Fetch the species document a detail payload refers to.
    async fn fetch_species(&self, species_ref: &str) -> Result<SpeciesPayload, CatalogClientError>;
}

impl ClientTrait for CatalogClient {
    #[instrument(skip(self))]
    async fn fetch_index_page(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<IndexPage, CatalogClientError> {
        // offsets of late pages exceed u32 for large page sizes
        let offset = u64::from(page_number.saturating_sub(1)) * u64::from(page_size);
        let url = self.endpoint("pokemon")?;
        let response: IndexResponse = self
            .get_json(url, &[
                ("limit", page_size.to_string()),
                ("offset", offset.to_string()),
            ])
            .await?;

        debug!(
            n_results = response.results.len(),
            has_next = response.next.is_some(),
            "received index page"
        );
        Ok(response.into())
    }

    #[instrument(skip(self))]
    async fn fetch_detail(&self, detail_ref: &str) -> Result<DetailPayload, CatalogClientError> {
        let url = parse_ref(detail_ref)?;
        self.get_json(url, &[]).await
    }

    #[instrument(skip(self))]
    async fn fetch_detail_by_name(&self, name: &str) -> Result<DetailPayload, CatalogClientError> {
        let url = self.endpoint(&format!("pokemon/{}", name.trim().to_lowercase()))?;
        self.get_json(url, &[]).await
    }

    #[instrument(skip(self))]
    async fn fetch_species(&self, species_ref: &str) -> Result<SpeciesPayload, CatalogClientError> {
        let url = parse_ref(species_ref)?;
        self.get_json(url, &[]).await
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// A stream of every index entry, walking pages until the index reports no
/// further page.
pub fn index_entries<C: ClientTrait>(
    client: &C,
    page_size: u32,
) -> impl Stream<Item = Result<IndexEntry, CatalogClientError>> + '_ {
    make_depaging_stream(
        move |page_number, page_size| async move {
            let page = client.fetch_index_page(page_number, page_size).await?;
            Ok::<_, CatalogClientError>((page.has_next, page.results))
        },
        page_size,
    )
}

/// Collects at most `limit` results of a stream.
pub async fn collect_with_limit<T, E>(
    stream: impl Stream<Item = Result<T, E>>,
    limit: Option<NonZeroUsize>,
) -> Result<Vec<T>, E> {
    let actual_limit = limit.map(NonZeroUsize::get).unwrap_or(usize::MAX);
    stream
        .take(actual_limit)
        .try_collect::<Vec<_>>()
        .await
}

/// Create a depaging stream from a page-fetching function.
///
/// Takes a function that returns `(has_next, items)` for a given page and
/// yields all items across pages. Pages are requested one after another and
/// the stream ends on the first page that reports no successor or is empty.
fn make_depaging_stream<T, E, Fut>(
    generator: impl Fn(u32, u32) -> Fut,
    page_size: u32,
) -> impl Stream<Item = Result<T, E>>
where
    Fut: Future<Output = Result<(bool, Vec<T>), E>>,
{
    try_stream! {
        let mut page_number = 1;

        loop {
            let (has_next, results) = generator(page_number, page_size).await?;
            let items_on_page = results.len();

            for result in results {
                yield result;
            }

            if !has_next || items_on_page == 0 {
                break;
            }
            page_number += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

/// Build HTTP client for the catalog API.
fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key).map_err(
                |e: reqwest::header::InvalidHeaderName| CatalogClientError::Other(e.to_string()),
            )?,
            header::HeaderValue::from_str(value).map_err(
                |e: reqwest::header::InvalidHeaderValue| CatalogClientError::Other(e.to_string()),
            )?,
        );
    }

    debug!(
        catalog_url = %config.catalog_url,
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60));

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder.user_agent(concat!("pokedex/", env!("CARGO_PKG_VERSION")))
    };

    client_builder
        .build()
        .map_err(|e| CatalogClientError::Other(e.to_string()))
}

#[cfg(test)]
pub mod tests {
    use std::collections::BTreeMap;

    use httpmock::MockServer;
    use proptest::prelude::*;
    use proptest::proptest;
    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;

    fn client_config(url: &str) -> CatalogClientConfig {
        CatalogClientConfig {
            catalog_url: url.to_string(),
            extra_headers: Default::default(),
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn index_page_requests_limit_and_offset() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.path("/pokemon")
                .query_param("limit", "20")
                .query_param("offset", "40");
            then.status(200).json_body(json!({
                "count": 1302,
                "next": "https://pokeapi.co/api/v2/pokemon?offset=60&limit=20",
                "previous": "https://pokeapi.co/api/v2/pokemon?offset=20&limit=20",
                "results": [
                    { "name": "nidoran-f", "url": "https://pokeapi.co/api/v2/pokemon/29/" }
                ]
            }));
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let page = client.fetch_index_page(3, 20).await.unwrap();
        mock.assert();
        assert!(page.has_next);
        assert_eq!(page.results[0].name, "nidoran-f");
    }

    #[tokio::test]
    async fn large_offsets_do_not_overflow() {
        let page_size = u32::MAX / 2;
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.path("/pokemon")
                .query_param("limit", page_size.to_string())
                .query_param("offset", (3 * u64::from(page_size)).to_string());
            then.status(200).json_body_obj(&IndexResponse::default());
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let page = client.fetch_index_page(4, page_size).await.unwrap();
        mock.assert();
        assert!(page.results.is_empty());
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn base_url_path_is_preserved() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.path("/api/v2/pokemon/pikachu");
            then.status(200)
                .json_body_obj(&DetailPayload::new_mock(25, "pikachu", 112, &["electric"]));
        });

        let client =
            CatalogClient::new(client_config(&format!("{}/api/v2/", server.base_url()))).unwrap();
        let detail = client.fetch_detail_by_name("Pikachu").await.unwrap();
        mock.assert();
        assert_eq!(detail.id, 25);
    }

    #[tokio::test]
    async fn detail_fetch_follows_reference() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.path("/pokemon/4/");
            then.status(200)
                .json_body_obj(&DetailPayload::new_mock(4, "charmander", 62, &["fire"]));
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let detail = client
            .fetch_detail(&server.url("/pokemon/4/"))
            .await
            .unwrap();
        mock.assert();
        assert_eq!(detail.name, "charmander");
        assert_eq!(detail.base_experience, Some(62));
    }

    #[tokio::test]
    async fn extra_headers_set_on_all_requests() {
        let mut extra_headers: BTreeMap<String, String> = BTreeMap::new();
        extra_headers.insert("pokedex-test".to_string(), "test-value".to_string());
        extra_headers.insert("pokedex-test2".to_string(), "test-value2".to_string());

        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.header("pokedex-test", "test-value")
                .header("pokedex-test2", "test-value2");
            then.status(200).json_body_obj(&IndexResponse::default());
        });

        let config = CatalogClientConfig {
            extra_headers,
            ..client_config(&server.base_url())
        };

        let client = CatalogClient::new(config).unwrap();
        let _ = client.fetch_index_page(1, 20).await;
        mock.assert();
    }

    #[tokio::test]
    async fn user_agent_set_on_all_requests() {
        let expected_agent = "my-custom-user-agent";

        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.header("user-agent", expected_agent);
            then.status(200).json_body_obj(&IndexResponse::default());
        });

        let config = CatalogClientConfig {
            user_agent: Some(expected_agent.to_owned()),
            ..client_config(&server.base_url())
        };

        let client = CatalogClient::new(config).unwrap();
        let _ = client.fetch_index_page(1, 20).await;
        mock.assert();
    }

    // region: Error response handling

    /// Non-success statuses are reported with their status code
    #[tokio::test]
    async fn unsuccessful_status_is_an_error() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|_, then| {
            then.status(503).body("upstream unavailable");
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let result = client.fetch_index_page(1, 20).await;
        assert!(
            matches!(result, Err(CatalogClientError::Status { status, .. }) if status == StatusCode::SERVICE_UNAVAILABLE),
            "expected CatalogClientError::Status, found: {result:?}"
        );
        mock.assert();
    }

    /// Bodies that don't match the expected schema fail to decode
    #[tokio::test]
    async fn unexpected_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|_, then| {
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "unknown": "ceramic" }));
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let result = client.fetch_detail(&server.url("/pokemon/1/")).await;
        assert!(
            matches!(result, Err(CatalogClientError::Decode { .. })),
            "expected CatalogClientError::Decode, found: {result:?}"
        );
        mock.assert();
    }

    #[tokio::test]
    async fn invalid_reference_is_rejected_before_sending() {
        let client = CatalogClient::new(client_config("http://localhost:1")).unwrap();
        let result = client.fetch_detail("not a url").await;
        assert!(
            matches!(result, Err(CatalogClientError::InvalidUrl { .. })),
            "expected CatalogClientError::InvalidUrl, found: {result:?}"
        );
    }

    // endregion

    /// make_depaging_stream collects items from multiple pages
    #[tokio::test]
    async fn depage_multiple_pages() {
        let results = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8]];
        let n_pages = results.len();
        let results = &results;
        let stream = make_depaging_stream(
            |page_number, _page_size| async move {
                let index = page_number as usize - 1;
                Ok::<_, CatalogClientError>((index + 1 < n_pages, results[index].clone()))
            },
            3,
        );

        let collected = stream.try_collect::<Vec<_>>().await.unwrap();
        assert_eq!(collected, (1..=8).collect::<Vec<_>>());
    }

    /// make_depaging_stream stops on an empty page even if more are announced
    #[tokio::test]
    async fn depage_stops_on_empty_page() {
        let stream = make_depaging_stream(
            |page_number, _page_size| async move {
                let items = if page_number == 1 { vec![1, 2] } else { vec![] };
                Ok::<_, CatalogClientError>((true, items))
            },
            2,
        );

        let collected: Vec<i32> = stream.try_collect().await.unwrap();
        assert_eq!(collected, vec![1, 2]);
    }

    /// make_depaging_stream surfaces errors from later pages
    #[tokio::test]
    async fn depage_propagates_errors() {
        let stream = make_depaging_stream(
            |page_number, _page_size| async move {
                if page_number == 2 {
                    return Err(CatalogClientError::Other("boom".into()));
                }
                Ok((true, vec![page_number]))
            },
            1,
        );

        let result: Result<Vec<u32>, _> = stream.try_collect().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn index_entries_walk_all_pages() {
        let mut client = MockClient::default();
        client.push_index_names(&["bulbasaur", "ivysaur"]);
        client.push_index_names(&["venusaur"]);

        let names = index_entries(&client, 2)
            .map_ok(|entry| entry.name)
            .try_collect::<Vec<_>>()
            .await
            .unwrap();
        assert_eq!(names, vec!["bulbasaur", "ivysaur", "venusaur"]);
    }

    proptest! {
        #[test]
        fn collects_correct_number_of_results(results in proptest::collection::vec(any::<i32>(), 0..10), raw_limit in 0..10_usize) {
            let results_ref = &results;
            let stream = async_stream::stream! {
                for item in results_ref.iter() {
                    yield Ok::<i32, String>(*item);
                }
            };
            let limit = NonZeroUsize::new(raw_limit); // None if raw_limit == 0
            let collected_results = tokio::runtime::Runtime::new()
                .unwrap()
                .block_on(collect_with_limit(stream, limit))
                .unwrap();

            let expected_results = if limit.is_some() {
                results.iter().copied().take(raw_limit).collect::<Vec<_>>()
            } else {
                results.clone()
            };
            prop_assert_eq!(expected_results, collected_results);
        }
    }
}
