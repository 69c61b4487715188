//! Paged retrieval of one day's posts from a time-descending feed.
//!
//! # Architecture
//!
//! - [`FeedSource`]: trait for fetching one page at an offset
//! - [`HttpFeed`]: `reqwest` implementation against the public posts API
//! - [`fetch_window`]: the paginator, walking pages until it passes the window
//!
//! Pages are requested strictly one after another because the stop condition
//! depends on the oldest post of the page just received. There are no retries:
//! any failed page aborts the run.

use crate::error::{DigestError, Result};
use crate::models::{FeedPage, Post, Record, Window};
use itertools::Itertools;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// A feed ordered by descending creation time.
pub trait FeedSource {
    /// Fetch up to `limit` posts, skipping the first `offset`.
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Post>>;
}

/// HTTP feed queried with `sortBy=created&limit=..&skip=..`.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    base: Url,
}

impl HttpFeed {
    pub fn new(feed_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .timeout(timeout)
            .build()
            .map_err(|e| DigestError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(HttpFeed {
            client,
            base: Url::parse(feed_url)?,
        })
    }
}

impl FeedSource for HttpFeed {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Post>> {
        let res = self
            .client
            .get(self.base.clone())
            .query(&[
                ("sortBy", "created".to_string()),
                ("limit", limit.to_string()),
                ("skip", offset.to_string()),
            ])
            .send()
            .await
            .map_err(|e| DigestError::Upstream(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(DigestError::Upstream(format!(
                "unsupported status code {status} at offset {offset}"
            )));
        }

        let page = res
            .json::<FeedPage>()
            .await
            .map_err(|e| DigestError::Upstream(format!("malformed page at offset {offset}: {e}")))?;
        Ok(page.into_posts())
    }
}

/// Collect every post created inside `window`.
///
/// Paging continues while the oldest post of the last page is still inside or
/// after the window; the first page reaching past `window.start` (or an empty
/// page) ends it. The offset advances by the number of posts actually returned.
/// Posts seen twice because the feed shifted between requests are kept once.
///
/// # Arguments
///
/// * `feed` - Source of time-descending pages
/// * `window` - The half-open day to collect
/// * `page_size` - Number of posts requested per page
///
/// # Returns
///
/// Every in-window post as a [`Record`], in feed order.
///
/// # Errors
///
/// Returns [`DigestError::Upstream`] if any page fails to arrive or decode, or
/// if an in-window post carries an unparseable payout. Nothing collected so far
/// is returned in that case.
#[instrument(level = "info", skip_all, fields(start = %window.start, end = %window.end, page_size = page_size))]
pub async fn fetch_window<F: FeedSource>(
    feed: &F,
    window: &Window,
    page_size: usize,
) -> Result<Vec<Record>> {
    let mut offset = 0usize;
    let mut pages = 0usize;
    let mut in_window: Vec<Record> = Vec::new();

    loop {
        let posts = feed.fetch_page(offset, page_size).await?;
        pages += 1;

        let Some(oldest) = posts.iter().map(|p| p.created).min() else {
            debug!(offset, "Empty page; feed exhausted");
            break;
        };
        let returned = posts.len();

        let before = in_window.len();
        for post in posts.into_iter().filter(|p| window.contains(p.created)) {
            in_window.push(Record::try_from(post)?);
        }
        debug!(offset, returned, kept = in_window.len() - before, %oldest, "Fetched page");

        if oldest < window.start {
            break;
        }
        offset += returned;
    }

    let records = in_window
        .into_iter()
        .unique_by(|r| (r.author.clone(), r.permlink.clone()))
        .collect::<Vec<Record>>();

    info!(pages, offset, records = records.len(), "Pagination finished");
    Ok(records)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{parse_created, PostMetadata};
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use std::sync::Mutex;

    pub(crate) fn post(author: &str, created: DateTime<Utc>, category: &str, payout: &str) -> Post {
        Post {
            author: author.to_string(),
            permlink: format!("{author}-post"),
            url: format!("/utopian-io/@{author}/{author}-post"),
            title: format!("Post by {author}"),
            created,
            json_metadata: PostMetadata {
                category: Some(category.to_string()),
            },
            total_payout_value: payout.to_string(),
        }
    }

    /// In-memory feed; records every offset it was asked for.
    pub(crate) struct MockFeed {
        pub posts: Vec<Post>,
        pub requests: Mutex<Vec<usize>>,
        pub fail_at: Option<usize>,
    }

    impl MockFeed {
        pub(crate) fn new(mut posts: Vec<Post>) -> Self {
            posts.sort_by(|a, b| b.created.cmp(&a.created));
            MockFeed {
                posts,
                requests: Mutex::new(Vec::new()),
                fail_at: None,
            }
        }

        pub(crate) fn pages_fetched(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl FeedSource for MockFeed {
        async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Post>> {
            self.requests.lock().unwrap().push(offset);
            if self.fail_at == Some(offset) {
                return Err(DigestError::Upstream("unsupported status code 503".into()));
            }
            Ok(self.posts.iter().skip(offset).take(limit).cloned().collect())
        }
    }

    fn window() -> Window {
        Window::days_before(parse_created("2018-03-05T09:00:00").unwrap(), 0).unwrap()
    }

    /// One post every `step` minutes, going back from `from`.
    fn hourly_posts(from: &str, n: usize, step: i64) -> Vec<Post> {
        let from = parse_created(from).unwrap();
        (0..n)
            .map(|i| {
                let created = from - ChronoDuration::minutes(step * i as i64);
                post(&format!("user{i}"), created, "blog", "1.000 SBD")
            })
            .collect()
    }

    #[tokio::test]
    async fn test_collects_exactly_the_window() {
        let w = window();
        let posts = hourly_posts("2018-03-05T08:30:00", 80, 45);
        let expected: Vec<String> = posts
            .iter()
            .filter(|p| w.contains(p.created))
            .map(|p| p.author.clone())
            .collect();

        for page_size in [1, 3, 7, 32, 100] {
            let feed = MockFeed::new(posts.clone());
            let records = fetch_window(&feed, &w, page_size).await.unwrap();
            let got: Vec<String> = records.iter().map(|r| r.author.clone()).collect();
            assert_eq!(got, expected, "page_size {page_size}");
            assert!(records.iter().all(|r| w.contains(r.created)));
        }
    }

    #[tokio::test]
    async fn test_fetches_one_page_past_the_window() {
        let w = window();
        // Page 0: after the window. Page 1: inside, oldest at the window start.
        // Page 2: before the window.
        let mut posts = Vec::new();
        for i in 0..3 {
            posts.push(post(&format!("late{i}"), w.end + ChronoDuration::hours(i + 1), "blog", "1 SBD"));
        }
        posts.push(post("in0", w.start + ChronoDuration::hours(5), "blog", "1 SBD"));
        posts.push(post("in1", w.start + ChronoDuration::hours(2), "blog", "1 SBD"));
        posts.push(post("in2", w.start, "blog", "1 SBD"));
        for i in 0..3 {
            posts.push(post(&format!("early{i}"), w.start - ChronoDuration::hours(i + 1), "blog", "1 SBD"));
        }
        posts.push(post("ancient", w.start - ChronoDuration::days(3), "blog", "1 SBD"));

        let feed = MockFeed::new(posts);
        let records = fetch_window(&feed, &w, 3).await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(feed.pages_fetched(), 3);
        assert_eq!(*feed.requests.lock().unwrap(), vec![0, 3, 6]);
    }

    #[tokio::test]
    async fn test_empty_window_is_not_an_error() {
        let w = window();
        let posts = vec![
            post("late", w.end + ChronoDuration::hours(1), "blog", "1 SBD"),
            post("early", w.start - ChronoDuration::hours(1), "blog", "1 SBD"),
        ];
        let feed = MockFeed::new(posts);
        let records = fetch_window(&feed, &w, 10).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(feed.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_feed_stops_on_empty_page() {
        let w = window();
        let posts = vec![post("only", w.start + ChronoDuration::hours(1), "blog", "1 SBD")];
        let feed = MockFeed::new(posts);
        let records = fetch_window(&feed, &w, 1).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(feed.pages_fetched(), 2);
    }

    #[tokio::test]
    async fn test_upstream_error_aborts() {
        let w = window();
        let mut feed = MockFeed::new(hourly_posts("2018-03-05T08:30:00", 40, 45));
        feed.fail_at = Some(4);
        let err = fetch_window(&feed, &w, 2).await.unwrap_err();
        assert!(matches!(err, DigestError::Upstream(_)));
        assert_eq!(feed.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn test_shifted_feed_does_not_duplicate() {
        struct ShiftingFeed(MockFeed);

        impl FeedSource for ShiftingFeed {
            async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Post>> {
                // A new post arrived after the first request, pushing everything down by one.
                let offset = if offset == 0 { 0 } else { offset - 1 };
                self.0.fetch_page(offset, limit).await
            }
        }

        let w = window();
        let feed = ShiftingFeed(MockFeed::new(hourly_posts("2018-03-04T23:00:00", 10, 180)));
        let records = fetch_window(&feed, &w, 3).await.unwrap();
        let mut authors: Vec<&str> = records.iter().map(|r| r.author.as_str()).collect();
        let total = authors.len();
        authors.dedup();
        assert_eq!(authors.len(), total);
        assert_eq!(total, 8);
    }

    #[tokio::test]
    async fn test_bad_payout_in_window_is_upstream_error() {
        let w = window();
        let feed = MockFeed::new(vec![post("x", w.start + ChronoDuration::hours(1), "blog", "n/a SBD")]);
        let err = fetch_window(&feed, &w, 5).await.unwrap_err();
        assert!(matches!(err, DigestError::Upstream(_)));
    }
}
