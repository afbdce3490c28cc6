use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use tracing::debug;

use crate::context::Context;
use crate::error::Result;
use crate::request::ListCursorParams;
use crate::response::Response;

/// A list endpoint that pages with opaque cursors.
///
/// The first page is requested without any cursor parameter. Each following
/// page passes back the cursor of the previous [`Response`], until a response
/// carries none. Cursors are never inspected, and no page cap is applied.
#[async_trait]
pub trait CursorPaginator<T>: Sync {
    async fn fetch_page(
        &self,
        ctx: &Context,
        params: Option<&ListCursorParams>,
    ) -> Result<(Vec<T>, Response)>;

    async fn fetch_all(&self, ctx: &Context) -> Result<Vec<T>>
    where
        T: Send,
    {
        let mut all_items = Vec::new();
        let mut params: Option<ListCursorParams> = None;

        loop {
            debug!(cursor = ?params.as_ref().and_then(|p| p.cursor.as_deref()), "Fetching page");
            let (items, response) = self.fetch_page(ctx, params.as_ref()).await?;
            all_items.extend(items);

            match response.cursor {
                Some(cursor) => params = Some(ListCursorParams::new(cursor)),
                None => {
                    debug!(total_items = all_items.len(), "Finished pagination");
                    break;
                }
            }
        }

        Ok(all_items)
    }

    fn stream<'a>(
        &'a self,
        ctx: &'a Context,
    ) -> Pin<Box<dyn Stream<Item = Result<Vec<T>>> + Send + 'a>>
    where
        T: Send + 'a,
    {
        Box::pin(async_stream::stream! {
            let mut params: Option<ListCursorParams> = None;

            loop {
                debug!(cursor = ?params.as_ref().and_then(|p| p.cursor.as_deref()), "Fetching page in stream");
                match self.fetch_page(ctx, params.as_ref()).await {
                    Ok((items, response)) => {
                        yield Ok(items);

                        match response.cursor {
                            Some(cursor) => params = Some(ListCursorParams::new(cursor)),
                            None => break,
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        })
    }
}

/// Drain `paginator`, stopping early once `limit` items were collected.
pub async fn collect_pages<T, P: CursorPaginator<T>>(
    paginator: &P,
    ctx: &Context,
    limit: Option<usize>,
) -> Result<Vec<T>>
where
    T: Send,
{
    let mut stream = paginator.stream(ctx);
    let mut all_items = Vec::new();

    while let Some(result) = stream.next().await {
        let items = result?;
        all_items.extend(items);

        if let Some(limit) = limit {
            if all_items.len() >= limit {
                all_items.truncate(limit);
                break;
            }
        }
    }

    Ok(all_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::header::{HeaderMap, HeaderValue, LINK};
    use reqwest::{Method, StatusCode};
    use std::sync::Mutex;
    use url::Url;

    /// Serves `pages` in order, linking each to the next by index.
    struct FakeList {
        pages: Vec<Vec<u32>>,
        seen: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl CursorPaginator<u32> for FakeList {
        async fn fetch_page(
            &self,
            _ctx: &Context,
            params: Option<&ListCursorParams>,
        ) -> Result<(Vec<u32>, Response)> {
            let cursor = params.and_then(|p| p.cursor.clone());
            self.seen.lock().unwrap().push(cursor.clone());

            let index: usize = cursor.as_deref().map_or(0, |c| c.parse().unwrap());
            let mut headers = HeaderMap::new();
            if index + 1 < self.pages.len() {
                let link = format!(
                    "<https://sentry.io/api/0/x/>; rel=\"next\"; results=\"true\"; cursor=\"{}\"",
                    index + 1
                );
                headers.insert(LINK, HeaderValue::from_str(&link).unwrap());
            }

            let response = Response::new(
                Method::GET,
                Url::parse("https://sentry.io/api/0/x/").unwrap(),
                StatusCode::OK,
                headers,
                Bytes::new(),
            );
            Ok((self.pages[index].clone(), response))
        }
    }

    fn fake(pages: Vec<Vec<u32>>) -> FakeList {
        FakeList {
            pages,
            seen: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_fetch_all_follows_cursors() {
        let list = fake(vec![vec![1, 2], vec![3], vec![4, 5]]);
        let items = list.fetch_all(&Context::background()).await.unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            *list.seen.lock().unwrap(),
            vec![None, Some("1".to_string()), Some("2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_single_page_stops_after_one_call() {
        let list = fake(vec![vec![7, 8]]);
        let items = list.fetch_all(&Context::background()).await.unwrap();

        assert_eq!(items, vec![7, 8]);
        assert_eq!(list.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_collect_pages_respects_limit() {
        let list = fake(vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        let items = collect_pages(&list, &Context::background(), Some(3))
            .await
            .unwrap();

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(list.seen.lock().unwrap().len(), 2);
    }
}
