use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::GraphError;

/// One page of a Graph collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

#[async_trait(?Send)]
pub trait PageSource {
    async fn fetch_page(&self, url: &str) -> Result<Page, GraphError>;
}

/// Follows `@odata.nextLink` from `initial_url` until it is absent and
/// returns every item in arrival order. Any failed page fails the whole
/// drain; partial results are never returned.
pub async fn drain<S>(source: &S, initial_url: &str) -> Result<Vec<Value>, GraphError>
where
    S: PageSource + ?Sized,
{
    let mut items = Vec::new();
    let mut next_url = Some(initial_url.to_string());
    let mut page_number = 0usize;

    while let Some(url) = next_url.take() {
        let page = source.fetch_page(&url).await?;
        page_number += 1;
        debug!(page = page_number, items = page.value.len(), "drained graph page");

        items.extend(page.value);
        next_url = page.next_link.filter(|link| !link.trim().is_empty());
    }

    Ok(items)
}

/// [`drain`] followed by typed decoding of every item.
pub async fn drain_as<S, T>(source: &S, initial_url: &str) -> Result<Vec<T>, GraphError>
where
    S: PageSource + ?Sized,
    T: DeserializeOwned,
{
    drain(source, initial_url)
        .await?
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(GraphError::from))
        .collect()
}
