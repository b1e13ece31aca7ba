use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::future::join_all;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    management::{CacheStore, QuotaTracker},
    types::{ConversionOutput, ConversionResult, ConversionSummary, MatchCandidate, Track, YouTubeMatch},
    utils,
    youtube::{SearchError, SearchProvider},
};

pub const QUOTA_REACHED_REASON: &str = "API quota reached";
pub const SEARCH_FAILED_REASON: &str = "Search failed";
pub const NO_MATCHES_REASON: &str = "No matches found";
pub const CANCELLED_REASON: &str = "Conversion cancelled";
pub const UNRESOLVED_REASON: &str = "No match available";

/// Searches run concurrently in waves of this many.
pub const DEFAULT_BATCH_SIZE: usize = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Tracks array is required and must not be empty")]
    EmptyInput,
    #[error("Invalid track at index {index}: {reason}")]
    InvalidInput { index: usize, reason: String },
}

#[derive(Debug, Clone, Copy)]
pub struct ConverterOptions {
    pub max_results: u32,
    pub batch_size: usize,
    /// Spacing between searches within a wave.
    pub throttle_delay: Duration,
    /// Upper bound for a single search, throttle delay excluded.
    pub search_timeout: Duration,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            batch_size: DEFAULT_BATCH_SIZE,
            throttle_delay: Duration::from_millis(50),
            search_timeout: Duration::from_secs(10),
        }
    }
}

impl ConverterOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_results: settings.max_results.max(1),
            batch_size: DEFAULT_BATCH_SIZE,
            throttle_delay: settings.throttle_delay,
            search_timeout: settings.http_timeout + Duration::from_secs(1),
        }
    }
}

/// Tracks sharing one identity; searched once, fanned out to every index.
struct UniqueTrack<'a> {
    track: &'a Track,
    cache_key: String,
    indices: Vec<usize>,
}

/// Turns tracks into YouTube matches: cache first, then quota-budgeted searches
/// in waves, and a fallback search link for everything that could not be matched.
pub struct Converter {
    provider: Arc<dyn SearchProvider>,
    cache: Arc<CacheStore>,
    quota: Arc<QuotaTracker>,
    options: ConverterOptions,
}

impl Converter {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        cache: Arc<CacheStore>,
        quota: Arc<QuotaTracker>,
        options: ConverterOptions,
    ) -> Self {
        Self {
            provider,
            cache,
            quota,
            options,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub async fn convert(&self, tracks: &[Track]) -> Result<ConversionOutput, ConversionError> {
        self.convert_with_cancel(tracks, &CancellationToken::new())
            .await
    }

    /// Like [`Converter::convert`], but stops launching searches once `cancel`
    /// fires. Tracks not reached get a fallback link.
    pub async fn convert_with_cancel(
        &self,
        tracks: &[Track],
        cancel: &CancellationToken,
    ) -> Result<ConversionOutput, ConversionError> {
        validate_tracks(tracks)?;

        let mut slots: Vec<Option<YouTubeMatch>> = vec![None; tracks.len()];
        let unique = dedupe(tracks);
        debug!(
            total = tracks.len(),
            unique = unique.len(),
            "starting YouTube conversion"
        );

        // cache pass
        let mut misses = Vec::new();
        for group in unique {
            match self.cache.get(&group.cache_key).await {
                Some(matches) => {
                    debug!(track = %group.track.name, "cache hit");
                    fill(&mut slots, &group.indices, found(group.track, matches));
                }
                None => misses.push(group),
            }
        }

        // budget pass
        self.quota.check_and_maybe_reset().await;
        let remaining = self.quota.remaining_searches().await as usize;
        let searchable_len = remaining.min(misses.len());
        let skipped = misses.split_off(searchable_len);
        if !skipped.is_empty() {
            info!(
                skipped = skipped.len(),
                remaining, "search budget too small, using fallback links"
            );
        }
        for group in &skipped {
            fill(
                &mut slots,
                &group.indices,
                fallback(group.track, QUOTA_REACHED_REASON, None),
            );
        }

        // searches in waves
        let batch_size = self.options.batch_size.max(1);
        let mut offset = 0;
        while offset < misses.len() {
            let stop_reason = if cancel.is_cancelled() {
                Some(CANCELLED_REASON)
            } else if self.quota.is_exhausted().await {
                Some(QUOTA_REACHED_REASON)
            } else {
                None
            };
            if let Some(reason) = stop_reason {
                info!(
                    unsearched = misses.len() - offset,
                    reason, "stopping searches early"
                );
                for group in &misses[offset..] {
                    fill(&mut slots, &group.indices, fallback(group.track, reason, None));
                }
                break;
            }

            let end = (offset + batch_size).min(misses.len());
            let wave = &misses[offset..end];
            let outcomes = join_all(
                wave.iter()
                    .enumerate()
                    .map(|(position, group)| self.search_one(group.track, position)),
            )
            .await;

            for (group, outcome) in wave.iter().zip(outcomes) {
                let result = match outcome {
                    Ok(matches) => {
                        self.cache.set(&group.cache_key, matches.clone()).await;
                        found(group.track, matches)
                    }
                    Err(SearchError::QuotaExceeded(message)) => {
                        warn!(track = %group.track.name, %message, "quota exceeded during search");
                        // cached as an empty result
                        self.cache.set(&group.cache_key, Vec::new()).await;
                        fallback(group.track, QUOTA_REACHED_REASON, Some(message))
                    }
                    Err(e) => {
                        warn!(track = %group.track.name, error = %e, "search failed");
                        fallback(group.track, SEARCH_FAILED_REASON, Some(e.to_string()))
                    }
                };
                fill(&mut slots, &group.indices, result);
            }
            offset = end;
        }

        let results = complete(tracks, slots);
        let summary = self.summarize(&results).await;
        info!(
            total = summary.total,
            matched = summary.matched,
            fallbacks = summary.fallbacks,
            quota_used = summary.quota_used,
            "YouTube conversion finished"
        );
        Ok(ConversionOutput { results, summary })
    }

    async fn search_one(
        &self,
        track: &Track,
        position: usize,
    ) -> Result<Vec<MatchCandidate>, SearchError> {
        sleep(self.options.throttle_delay * (position as u32 + 1)).await;

        let search = self
            .provider
            .search_single(&track.name, &track.artists, self.options.max_results);
        match timeout(self.options.search_timeout, search).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Provider("search timed out".to_string())),
        }
    }

    async fn summarize(&self, results: &[ConversionResult]) -> ConversionSummary {
        let total = results.len();
        let successful = results
            .iter()
            .filter(|r| r.youtube.top_match.is_some())
            .count();
        let matched = results
            .iter()
            .filter(|r| r.youtube.top_match.as_ref().is_some_and(|m| !m.is_fallback))
            .count();

        ConversionSummary {
            total,
            successful,
            failed: total - successful,
            success_rate: utils::format_success_rate(matched, total),
            matched,
            fallbacks: successful - matched,
            quota_used: self.quota.units_used().await,
            quota_limit: self.quota.limits().daily_unit_limit,
        }
    }
}

/// Rejects empty input and tracks without a name or artists.
pub fn validate_tracks(tracks: &[Track]) -> Result<(), ConversionError> {
    if tracks.is_empty() {
        return Err(ConversionError::EmptyInput);
    }

    for (index, track) in tracks.iter().enumerate() {
        if track.name.trim().is_empty() {
            return Err(ConversionError::InvalidInput {
                index,
                reason: "name must not be empty".to_string(),
            });
        }
        if track.artists.is_empty() || track.artists.iter().all(|a| a.trim().is_empty()) {
            return Err(ConversionError::InvalidInput {
                index,
                reason: "at least one artist is required".to_string(),
            });
        }
    }
    Ok(())
}

fn dedupe(tracks: &[Track]) -> Vec<UniqueTrack<'_>> {
    let mut unique: Vec<UniqueTrack<'_>> = Vec::new();
    let mut by_identity: HashMap<String, usize> = HashMap::new();

    for (index, track) in tracks.iter().enumerate() {
        let identity = utils::track_identity(track);
        match by_identity.get(&identity) {
            Some(&slot) => unique[slot].indices.push(index),
            None => {
                by_identity.insert(identity, unique.len());
                unique.push(UniqueTrack {
                    track,
                    cache_key: utils::cache_key(&track.name, &track.artists),
                    indices: vec![index],
                });
            }
        }
    }
    unique
}

fn fill(slots: &mut [Option<YouTubeMatch>], indices: &[usize], result: YouTubeMatch) {
    for &index in indices {
        slots[index] = Some(result.clone());
    }
}

fn found(track: &Track, matches: Vec<MatchCandidate>) -> YouTubeMatch {
    let Some(top) = matches.first().cloned() else {
        return fallback(track, NO_MATCHES_REASON, None);
    };
    YouTubeMatch {
        matches,
        top_match: Some(top),
        error: None,
        is_fallback: Some(false),
        fallback_reason: None,
    }
}

fn fallback(track: &Track, reason: &str, error: Option<String>) -> YouTubeMatch {
    let candidate = utils::fallback_candidate(track);
    YouTubeMatch {
        matches: vec![candidate.clone()],
        top_match: Some(candidate),
        error,
        is_fallback: Some(true),
        fallback_reason: Some(reason.to_string()),
    }
}

/// Pairs every slot with its original track. Any slot still without a top
/// match gets a fallback; that indicates a gap in the passes above.
fn complete(tracks: &[Track], slots: Vec<Option<YouTubeMatch>>) -> Vec<ConversionResult> {
    tracks
        .iter()
        .zip(slots)
        .map(|(track, slot)| {
            let youtube = match slot {
                Some(youtube) if youtube.top_match.is_some() => youtube,
                other => {
                    warn!(track = %track.name, "track reached completion without a top match");
                    let error = other.and_then(|y| y.error);
                    fallback(track, UNRESOLVED_REASON, error)
                }
            };
            ConversionResult {
                original: track.clone(),
                youtube,
            }
        })
        .collect()
}
