//! Lazy streams over paginated listings.
//!
//! [`paginate`] turns any "fetch one page for this token" function into a
//! [`Stream`] of items that only requests the next page once the current one
//! is drained. The listing helpers bind it to the three
//! [`ReservationService`] listing calls.
//!
//! ```
//! use bq_reservations_core::pagination::paginate;
//! use bq_reservations_core::{Page, ServiceError};
//! use futures::TryStreamExt;
//!
//! # tokio_test::block_on(async {
//! let items: Vec<u32> = paginate(|token: Option<String>| async move {
//!     Ok::<_, ServiceError>(match token.as_deref() {
//!         None => Page::new(vec![1, 2], Some("next".to_string())),
//!         _ => Page::last(vec![3]),
//!     })
//! })
//! .try_collect()
//! .await
//! .unwrap();
//! assert_eq!(items, vec![1, 2, 3]);
//! # });
//! ```

use crate::error::ServiceError;
use crate::service::ReservationService;
use crate::types::{Assignment, Commitment, Page, Reservation, Scope};
use async_stream::try_stream;
use futures::Stream;
use std::future::Future;

/// Stream every item of a paginated listing.
///
/// `fetch` is called with `None` for the first page and with the previous
/// page's `next_page_token` afterwards. An absent or empty token ends the
/// stream. The first error ends the stream after being yielded.
pub fn paginate<T, E, F, Fut>(mut fetch: F) -> impl Stream<Item = Result<T, E>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    try_stream! {
        let mut token: Option<String> = None;
        loop {
            let page = fetch(token.take()).await?;
            for item in page.items {
                yield item;
            }
            match page.next_page_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }
    }
}

/// Stream every commitment in `scope`.
pub fn commitments<'a, S: ReservationService>(
    service: &'a S,
    scope: &'a Scope,
) -> impl Stream<Item = Result<Commitment, ServiceError>> + Send + 'a {
    paginate(move |token: Option<String>| async move {
        service.list_commitments(scope, token.as_deref()).await
    })
}

/// Stream every reservation in `scope`.
pub fn reservations<'a, S: ReservationService>(
    service: &'a S,
    scope: &'a Scope,
) -> impl Stream<Item = Result<Reservation, ServiceError>> + Send + 'a {
    paginate(move |token: Option<String>| async move {
        service.list_reservations(scope, token.as_deref()).await
    })
}

/// Stream every assignment under `reservation_name`.
pub fn assignments<'a, S: ReservationService>(
    service: &'a S,
    reservation_name: &'a str,
) -> impl Stream<Item = Result<Assignment, ServiceError>> + Send + 'a {
    paginate(move |token: Option<String>| async move {
        service.list_assignments(reservation_name, token.as_deref()).await
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::{StreamExt, TryStreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn follows_tokens_until_last_page() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let items: Vec<u32> = paginate(move |token: Option<String>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, ServiceError>(match token.as_deref() {
                    None => Page::new(vec![1, 2], Some("a".to_string())),
                    Some("a") => Page::new(vec![3], Some("b".to_string())),
                    _ => Page::last(vec![4]),
                })
            }
        })
        .try_collect()
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_token_ends_stream() {
        let items: Vec<u32> = paginate(|_token: Option<String>| async {
            Ok::<_, ServiceError>(Page::new(vec![7], Some(String::new())))
        })
        .try_collect()
        .await
        .unwrap();

        assert_eq!(items, vec![7]);
    }

    #[tokio::test]
    async fn pages_are_fetched_lazily() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let stream = paginate(move |_token: Option<String>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ServiceError>(Page::new(vec![1, 2], Some("more".to_string()))) }
        });
        futures::pin_mut!(stream);

        assert_eq!(stream.next().await, Some(Ok(1)));
        assert_eq!(stream.next().await, Some(Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_is_yielded_and_ends_stream() {
        let stream = paginate(|token: Option<String>| async move {
            match token {
                None => Ok(Page::new(vec![1], Some("next".to_string()))),
                Some(_) => Err(ServiceError::Unavailable("down".to_string())),
            }
        });
        futures::pin_mut!(stream);

        assert_eq!(stream.next().await, Some(Ok(1)));
        assert_eq!(
            stream.next().await,
            Some(Err(ServiceError::Unavailable("down".to_string())))
        );
        assert_eq!(stream.next().await, None);
    }
}
