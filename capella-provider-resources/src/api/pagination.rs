use futures::stream::{self, Stream, TryStreamExt};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::api::client::{Client, EndpointCfg, Payload};
use crate::error::{ProviderError, Result};

pub const DEFAULT_PER_PAGE: i64 = 25;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pages {
    #[serde(default)]
    pub page: i64,
    /// Not set on the last page.
    #[serde(default)]
    pub next: i64,
    #[serde(default)]
    pub previous: i64,
    #[serde(default)]
    pub last: i64,
    #[serde(default)]
    pub per_page: i64,
    #[serde(default)]
    pub total_items: i64,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Cursor {
    #[serde(default)]
    pub pages: Pages,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub cursor: Option<Cursor>,
}

fn page_url(base: &str, page: i64, sort_by: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}page={page}&perPage={DEFAULT_PER_PAGE}&sortBy={sort_by}&sortDirection=asc")
}

/// Stream the pages of a list endpoint, following `cursor.pages.next`.
pub fn pages<'a, T>(
    client: &'a Client,
    cancel: &'a CancellationToken,
    token: &'a str,
    url: &'a str,
    sort_by: &'a str,
) -> impl Stream<Item = Result<Vec<T>>> + 'a
where
    T: DeserializeOwned + 'a,
{
    stream::try_unfold(Some(1), move |page| async move {
        let Some(page) = page else {
            return Ok::<_, ProviderError>(None);
        };

        let cfg = EndpointCfg::new(page_url(url, page, sort_by), Method::GET, StatusCode::OK);
        let response: Page<T> = client
            .execute_with_retry(cancel, &cfg, &Payload::Empty, token, &[])
            .await?
            .json()?;

        let next = response
            .cursor
            .map(|cursor| cursor.pages.next)
            .filter(|next| *next > page);

        Ok(Some((response.data, next)))
    })
}

/// Fetch every item of a list endpoint.
///
/// # Arguments
/// * `client` - The API client
/// * `cancel` - Cancellation of the surrounding operation
/// * `token` - Bearer token
/// * `url` - The list endpoint, without pagination parameters
/// * `sort_by` - Field the API sorts by so pages stay stable
///
/// # Returns
/// All items across all pages, in page order
pub async fn get_paginated<T: DeserializeOwned>(
    client: &Client,
    cancel: &CancellationToken,
    token: &str,
    url: &str,
    sort_by: &str,
) -> Result<Vec<T>> {
    pages(client, cancel, token, url, sort_by).try_concat().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_appends_parameters() {
        assert_eq!(
            page_url("http://h/v4/organizations/o/projects", 2, "id"),
            "http://h/v4/organizations/o/projects?page=2&perPage=25&sortBy=id&sortDirection=asc",
        );
        assert!(page_url("http://h/x?bucket=b", 1, "name").starts_with("http://h/x?bucket=b&page=1"));
    }
}
