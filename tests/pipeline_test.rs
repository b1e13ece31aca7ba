use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tunebridge::config::QuotaLimits;
use tunebridge::management::{CacheStore, ManualClock, QuotaTracker};
use tunebridge::types::{MatchCandidate, Track};
use tunebridge::utils;
use tunebridge::youtube::{ConversionError, Converter, ConverterOptions, SearchError, SearchProvider};

#[derive(Clone)]
enum Reply {
    Found(usize),
    Empty,
    Fail,
    QuotaDenied,
    Hang,
}

/// Answers by track name and charges quota the way the real client does.
struct MockProvider {
    quota: Arc<QuotaTracker>,
    replies: HashMap<String, Reply>,
    calls: AtomicUsize,
    searched: Mutex<Vec<String>>,
}

impl MockProvider {
    fn new(quota: Arc<QuotaTracker>) -> Self {
        Self {
            quota,
            replies: HashMap::new(),
            calls: AtomicUsize::new(0),
            searched: Mutex::new(Vec::new()),
        }
    }

    fn reply(mut self, name: &str, reply: Reply) -> Self {
        self.replies.insert(name.to_string(), reply);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn searched(&self) -> Vec<String> {
        self.searched.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockProvider {
    async fn search_single(
        &self,
        name: &str,
        _artists: &[String],
        max_results: u32,
    ) -> Result<Vec<MatchCandidate>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.searched.lock().unwrap().push(name.to_string());

        match self.replies.get(name).cloned().unwrap_or(Reply::Found(2)) {
            Reply::Found(n) => {
                self.quota
                    .record_usage(self.quota.limits().cost_per_search)
                    .await;
                Ok((0..n.min(max_results as usize))
                    .map(|i| video(name, i))
                    .collect())
            }
            Reply::Empty => {
                self.quota
                    .record_usage(self.quota.limits().cost_per_search)
                    .await;
                Ok(Vec::new())
            }
            Reply::Fail => Err(SearchError::Provider("(500) backend error".to_string())),
            Reply::QuotaDenied => {
                self.quota.mark_exceeded().await;
                Err(SearchError::QuotaExceeded("quotaExceeded".to_string()))
            }
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn search_batch(
        &self,
        _tracks: &[Track],
        _max_results: u32,
    ) -> Result<HashMap<String, Vec<MatchCandidate>>, SearchError> {
        Err(SearchError::Provider("batch search not used here".to_string()))
    }
}

fn video(name: &str, rank: usize) -> MatchCandidate {
    let id = format!("{}-{}", name.to_lowercase().replace(' ', "-"), rank);
    MatchCandidate {
        video_id: Some(id.clone()),
        title: format!("{} (Official Video {})", name, rank),
        channel_title: "Channel".to_string(),
        channel_id: Some("UC123".to_string()),
        thumbnail_url: None,
        published_at: None,
        url: utils::watch_url(&id),
        is_fallback: false,
    }
}

fn track(name: &str, artist: &str) -> Track {
    Track::new(name, vec![artist.to_string()])
}

fn quota(session_cap: u64) -> Arc<QuotaTracker> {
    let limits = QuotaLimits {
        daily_unit_limit: 10_000,
        max_searches_per_session: session_cap,
        cost_per_search: 100,
        ..QuotaLimits::default()
    };
    let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    Arc::new(QuotaTracker::with_clock(limits, Box::new(clock)))
}

fn options(batch_size: usize) -> ConverterOptions {
    ConverterOptions {
        max_results: 5,
        batch_size,
        throttle_delay: Duration::ZERO,
        search_timeout: Duration::from_secs(5),
    }
}

fn converter(
    provider: &Arc<MockProvider>,
    quota: &Arc<QuotaTracker>,
    batch_size: usize,
) -> Converter {
    Converter::new(
        Arc::clone(provider) as Arc<dyn SearchProvider>,
        Arc::new(CacheStore::new(Duration::from_secs(86_400))),
        Arc::clone(quota),
        options(batch_size),
    )
}

#[tokio::test]
async fn test_every_track_gets_a_result_in_order() {
    let quota = quota(90);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)));
    let converter = converter(&provider, &quota, 5);

    let tracks: Vec<Track> = (0..12)
        .map(|i| track(&format!("Song {}", i), "Artist"))
        .collect();
    let output = converter.convert(&tracks).await.unwrap();

    assert_eq!(output.results.len(), tracks.len());
    for (result, track) in output.results.iter().zip(&tracks) {
        assert_eq!(&result.original, track);
        let top = result.youtube.top_match.as_ref().unwrap();
        assert!(!top.is_fallback);
        assert_eq!(top, &result.youtube.matches[0]);
        assert_eq!(result.youtube.is_fallback, Some(false));
    }
    assert_eq!(provider.calls(), 12);
    assert_eq!(quota.units_used().await, 1_200);
}

#[tokio::test]
async fn test_duplicates_are_searched_once() {
    let quota = quota(90);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)));
    let converter = converter(&provider, &quota, 5);

    let a = track("Song A", "Artist");
    let b = track("Song B", "Artist");
    let a_loud = track("SONG A ", "artist");
    let output = converter
        .convert(&[a.clone(), b.clone(), a_loud.clone()])
        .await
        .unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(output.results.len(), 3);
    assert_eq!(output.results[0].youtube, output.results[2].youtube);
    // each slot keeps its own original
    assert_eq!(output.results[2].original, a_loud);
    assert_eq!(output.results[1].original, b);
}

#[tokio::test]
async fn test_second_conversion_is_served_from_cache() {
    let quota = quota(90);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)));
    let converter = converter(&provider, &quota, 5);
    let tracks = vec![track("Song A", "Artist"), track("Song B", "Artist")];

    let first = converter.convert(&tracks).await.unwrap();
    let used = quota.units_used().await;
    let second = converter.convert(&tracks).await.unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(quota.units_used().await, used);
    assert_eq!(first.results, second.results);

    let stats = converter.cache().stats().await;
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.keys, 2);
}

#[tokio::test]
async fn test_exhausted_quota_yields_fallbacks_without_searching() {
    let quota = quota(90);
    quota.record_usage(10_000).await;
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)));
    let converter = converter(&provider, &quota, 5);

    let tracks = vec![track("Song A", "Artist"), track("Song B", "Artist")];
    let output = converter.convert(&tracks).await.unwrap();

    assert_eq!(provider.calls(), 0);
    for (result, track) in output.results.iter().zip(&tracks) {
        let top = result.youtube.top_match.as_ref().unwrap();
        assert!(top.is_fallback);
        assert_eq!(top.url, utils::fallback_url(&track.name, &track.artists));
        assert_eq!(result.youtube.is_fallback, Some(true));
        assert_eq!(
            result.youtube.fallback_reason.as_deref(),
            Some("API quota reached")
        );
    }
    assert_eq!(output.summary.success_rate, "0.0%");
    assert_eq!(output.summary.successful, 2);
    assert_eq!(output.summary.fallbacks, 2);
}

#[tokio::test]
async fn test_cache_hits_do_not_need_budget() {
    let quota = quota(90);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)));
    let converter = converter(&provider, &quota, 5);
    let cached = track("Cached", "Artist");

    converter.convert(&[cached.clone()]).await.unwrap();
    quota.mark_exceeded().await;
    let output = converter
        .convert(&[cached, track("Fresh", "Artist")])
        .await
        .unwrap();

    assert_eq!(provider.calls(), 1);
    assert!(!output.results[0].youtube.top_match.as_ref().unwrap().is_fallback);
    assert!(output.results[1].youtube.top_match.as_ref().unwrap().is_fallback);
}

#[tokio::test]
async fn test_budget_limits_number_of_searches() {
    let quota = quota(3);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)));
    let converter = converter(&provider, &quota, 5);

    let tracks: Vec<Track> = (0..6)
        .map(|i| track(&format!("Song {}", i), "Artist"))
        .collect();
    let output = converter.convert(&tracks).await.unwrap();

    assert_eq!(provider.calls(), 3);
    let mut searched = provider.searched();
    searched.sort();
    assert_eq!(searched, vec!["Song 0", "Song 1", "Song 2"]);
    let reasons: Vec<Option<&str>> = output
        .results
        .iter()
        .map(|r| r.youtube.fallback_reason.as_deref())
        .collect();
    assert_eq!(
        reasons,
        vec![
            None,
            None,
            None,
            Some("API quota reached"),
            Some("API quota reached"),
            Some("API quota reached"),
        ]
    );
    assert_eq!(output.summary.matched, 3);
    assert_eq!(output.summary.success_rate, "50.0%");
}

#[tokio::test]
async fn test_quota_denial_stops_later_waves() {
    let quota = quota(90);
    let provider = Arc::new(
        MockProvider::new(Arc::clone(&quota)).reply("Song 1", Reply::QuotaDenied),
    );
    let converter = converter(&provider, &quota, 2);

    let tracks: Vec<Track> = (0..6)
        .map(|i| track(&format!("Song {}", i), "Artist"))
        .collect();
    let output = converter.convert(&tracks).await.unwrap();

    // first wave runs in full, nothing after it
    assert_eq!(provider.calls(), 2);
    assert!(!output.results[0].youtube.top_match.as_ref().unwrap().is_fallback);

    let denied = &output.results[1].youtube;
    assert_eq!(denied.fallback_reason.as_deref(), Some("API quota reached"));
    assert!(denied.error.as_deref().unwrap().contains("quotaExceeded"));

    for result in &output.results[2..] {
        assert_eq!(
            result.youtube.fallback_reason.as_deref(),
            Some("API quota reached")
        );
        assert!(result.youtube.top_match.as_ref().unwrap().is_fallback);
    }
}

#[tokio::test]
async fn test_failed_search_falls_back_and_is_not_cached() {
    let quota = quota(90);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)).reply("Broken", Reply::Fail));
    let converter = converter(&provider, &quota, 5);
    let tracks = vec![track("Broken", "Artist"), track("Fine", "Artist")];

    let output = converter.convert(&tracks).await.unwrap();
    let broken = &output.results[0].youtube;
    assert_eq!(broken.fallback_reason.as_deref(), Some("Search failed"));
    assert!(broken.error.as_deref().unwrap().contains("backend error"));
    assert!(broken.top_match.as_ref().unwrap().is_fallback);
    assert!(!output.results[1].youtube.top_match.as_ref().unwrap().is_fallback);

    // the failure is retried, the success is not
    converter.convert(&tracks).await.unwrap();
    let searched = provider.searched();
    assert_eq!(searched.len(), 3);
    assert_eq!(searched.iter().filter(|n| n.as_str() == "Broken").count(), 2);
}

#[tokio::test]
async fn test_no_matches_yields_fallback() {
    let quota = quota(90);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)).reply("Obscure", Reply::Empty));
    let converter = converter(&provider, &quota, 5);

    let output = converter
        .convert(&[track("Obscure", "Nobody")])
        .await
        .unwrap();
    let youtube = &output.results[0].youtube;
    assert_eq!(youtube.fallback_reason.as_deref(), Some("No matches found"));
    assert_eq!(youtube.error, None);
    assert_eq!(youtube.matches.len(), 1);
    assert!(youtube.matches[0].is_fallback);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_search_times_out() {
    let quota = quota(90);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)).reply("Slow", Reply::Hang));
    let converter = converter(&provider, &quota, 5);

    let output = converter
        .convert(&[track("Slow", "Artist"), track("Fast", "Artist")])
        .await
        .unwrap();

    assert_eq!(
        output.results[0].youtube.fallback_reason.as_deref(),
        Some("Search failed")
    );
    assert!(
        output.results[0]
            .youtube
            .error
            .as_deref()
            .unwrap()
            .contains("timed out")
    );
    assert!(!output.results[1].youtube.top_match.as_ref().unwrap().is_fallback);
}

#[tokio::test]
async fn test_cancelled_conversion_returns_fallbacks() {
    let quota = quota(90);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)));
    let converter = converter(&provider, &quota, 5);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let output = converter
        .convert_with_cancel(&[track("Song A", "Artist")], &cancel)
        .await
        .unwrap();

    assert_eq!(provider.calls(), 0);
    assert_eq!(
        output.results[0].youtube.fallback_reason.as_deref(),
        Some("Conversion cancelled")
    );
}

#[tokio::test]
async fn test_empty_input_is_rejected() {
    let quota = quota(90);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)));
    let converter = converter(&provider, &quota, 5);

    assert_eq!(
        converter.convert(&[]).await.unwrap_err(),
        ConversionError::EmptyInput
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_track_without_artists_is_rejected() {
    let quota = quota(90);
    let provider = Arc::new(MockProvider::new(Arc::clone(&quota)));
    let converter = converter(&provider, &quota, 5);

    let err = converter
        .convert(&[track("Fine", "Artist"), Track::new("Lonely", Vec::new())])
        .await
        .unwrap_err();
    assert!(matches!(err, ConversionError::InvalidInput { index: 1, .. }));
}

#[tokio::test]
async fn test_summary_counts_fallbacks_as_successful() {
    let quota = quota(90);
    let provider = Arc::new(
        MockProvider::new(Arc::clone(&quota))
            .reply("Broken", Reply::Fail)
            .reply("Obscure", Reply::Empty),
    );
    let converter = converter(&provider, &quota, 5);

    let output = converter
        .convert(&[
            track("Hit", "Artist"),
            track("Broken", "Artist"),
            track("Obscure", "Artist"),
        ])
        .await
        .unwrap();
    let summary = output.summary;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.successful, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.fallbacks, 2);
    assert_eq!(summary.success_rate, "33.3%");
    // Hit and Obscure were charged, Broken was not
    assert_eq!(summary.quota_used, 200);
    assert_eq!(summary.quota_limit, 10_000);
}

#[tokio::test]
async fn test_quota_denied_track_is_cached_as_empty() {
    let quota = quota(90);
    let provider = Arc::new(
        MockProvider::new(Arc::clone(&quota)).reply("Denied", Reply::QuotaDenied),
    );
    let converter = converter(&provider, &quota, 5);
    let denied = track("Denied", "Artist");

    converter.convert(&[denied.clone()]).await.unwrap();
    let key = utils::cache_key(&denied.name, &denied.artists);
    assert_eq!(converter.cache().get(&key).await, Some(Vec::new()));

    // after the daily reset the track is served from cache, not searched again
    quota.reset().await;
    let output = converter.convert(&[denied]).await.unwrap();
    assert_eq!(provider.calls(), 1);
    assert!(output.results[0].youtube.top_match.as_ref().unwrap().is_fallback);
    assert_eq!(
        output.results[0].youtube.fallback_reason.as_deref(),
        Some("No matches found")
    );
}
