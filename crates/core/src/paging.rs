//! Continuation-token pagination as a lazy stream.
//!
//! Nothing is fetched until the consumer pulls the first item; each later
//! page is fetched only when the previous page's items are exhausted. The
//! stream is forward-only and safe to abandon mid-enumeration (there is no
//! server-side cursor to release).

use futures::stream::{self, Stream, TryStreamExt};
use horizon_domain::{HorizonError, Page, Result};
use std::future::Future;

enum PageCursor {
    Start,
    Next(String),
    Done,
}

/// Enumerate a token-paged listing as a flat stream of items.
///
/// `fetch` is invoked with `None` for the first page and `Some(token)` for
/// every following page; enumeration stops on the first page whose
/// continuation token is empty or absent.
pub fn paginate<T, F, Fut>(fetch: F) -> impl Stream<Item = Result<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    stream::try_unfold((fetch, PageCursor::Start), |(mut fetch, cursor)| async move {
        let token = match cursor {
            PageCursor::Start => None,
            PageCursor::Next(token) => Some(token),
            PageCursor::Done => return Ok::<_, HorizonError>(None),
        };
        let page = fetch(token).await?;
        let next = match page.continuation_token.as_deref() {
            Some(token) if !token.is_empty() => PageCursor::Next(token.to_string()),
            _ => PageCursor::Done,
        };
        let items = stream::iter(page.items.into_iter().map(Ok));
        Ok(Some((items, (fetch, next))))
    })
    .try_flatten()
}
