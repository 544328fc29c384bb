//! Resolve index entries into catalog items.

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::client::ClientTrait;
use crate::error::CatalogClientError;
use crate::store::PageRequest;
use crate::types::{CatalogItem, IndexEntry, Page};

/// Fetch the details of every entry concurrently and keep the ones that
/// could be resolved.
///
/// All requests are awaited, a failure never cuts the others short.
/// Successful items are returned in the order of `entries`; failed entries
/// are logged and left out.
pub async fn aggregate_details<C: ClientTrait>(
    client: &C,
    entries: &[IndexEntry],
) -> Vec<CatalogItem> {
    let fetches = entries
        .iter()
        .map(|entry| async move { (entry, client.fetch_detail(&entry.detail_ref).await) });

    let settled = join_all(fetches).await;

    let mut failed = 0;
    let items = settled
        .into_iter()
        .filter_map(|(entry, result)| match result {
            Ok(payload) => Some(CatalogItem::from_detail(entry, payload)),
            Err(e) => {
                failed += 1;
                warn!(name = %entry.name, error = %e, "dropping entry with failed detail fetch");
                None
            },
        })
        .collect::<Vec<_>>();

    debug!(
        requested = entries.len(),
        resolved = items.len(),
        failed,
        "aggregated page details"
    );
    items
}

/// Fetch the index page named by `request` and resolve its entries.
///
/// Only a failure of the index fetch fails the page.
#[instrument(skip(client), fields(page = request.page_number))]
pub async fn fetch_page<C: ClientTrait>(
    client: &C,
    request: &PageRequest,
) -> Result<Page, CatalogClientError> {
    let index = client
        .fetch_index_page(request.page_number, request.page_size)
        .await?;
    let items = aggregate_details(client, &index.results).await;

    Ok(Page {
        page_number: request.page_number,
        items,
        has_next: index.has_next,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mock::MockClient;
    use crate::types::DetailPayload;

    fn names(items: &[CatalogItem]) -> Vec<&str> {
        items.iter().map(|item| item.name.as_str()).collect()
    }

    #[tokio::test]
    async fn failed_details_are_dropped() {
        let mut client = MockClient::default();
        client.push_index_names(&["bulbasaur", "ivysaur"]);
        client.insert_detail(DetailPayload::new_mock(1, "bulbasaur", 64, &["grass"]));

        let page = fetch_page(&client, &PageRequest::new(1, 20)).await.unwrap();
        assert_eq!(names(&page.items), vec!["bulbasaur"]);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn every_detail_is_requested_even_after_a_failure() {
        let mut client = MockClient::default();
        client.push_index_names(&["missingno", "bulbasaur", "ivysaur"]);
        client.insert_detail(DetailPayload::new_mock(1, "bulbasaur", 64, &["grass"]));
        client.insert_detail(DetailPayload::new_mock(2, "ivysaur", 142, &["grass"]));

        let page = fetch_page(&client, &PageRequest::new(1, 20)).await.unwrap();
        assert_eq!(names(&page.items), vec!["bulbasaur", "ivysaur"]);
        assert_eq!(client.requests().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn order_follows_index_not_completion() {
        let mut client = MockClient::default();
        client.push_index_names(&["bulbasaur", "ivysaur", "venusaur"]);
        for (id, name) in [(1, "bulbasaur"), (2, "ivysaur"), (3, "venusaur")] {
            client.insert_detail(DetailPayload::new_mock(id, name, 64, &["grass"]));
        }
        client.set_delay(MockClient::detail_ref("bulbasaur"), Duration::from_millis(300));
        client.set_delay(MockClient::detail_ref("ivysaur"), Duration::from_millis(200));

        let entries = client.fetch_index_page(1, 3).await.unwrap().results;
        let items = aggregate_details(&client, &entries).await;
        assert_eq!(names(&items), vec!["bulbasaur", "ivysaur", "venusaur"]);
    }

    #[tokio::test(start_paused = true)]
    async fn details_are_fetched_concurrently() {
        let mut client = MockClient::default();
        client.push_index_names(&["bulbasaur", "ivysaur"]);
        for (id, name) in [(1, "bulbasaur"), (2, "ivysaur")] {
            client.insert_detail(DetailPayload::new_mock(id, name, 64, &["grass"]));
            client.set_delay(MockClient::detail_ref(name), Duration::from_secs(1));
        }

        let entries = client.fetch_index_page(1, 2).await.unwrap().results;
        let start = tokio::time::Instant::now();
        let items = aggregate_details(&client, &entries).await;
        assert_eq!(items.len(), 2);
        assert!(start.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn index_failure_fails_the_page() {
        let client = MockClient::default();
        let result = fetch_page(&client, &PageRequest::new(1, 20)).await;
        assert!(result.is_err());
    }
}
