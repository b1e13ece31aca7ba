use std::sync::Arc;

use tabled::Table;

use crate::{
    error, info,
    management::{CacheStore, QuotaStateFile, QuotaTracker},
    success,
    types::{ConversionOutput, ConversionTableRow},
    utils, warning,
    youtube::{Converter, ConverterOptions, YouTubeClient},
};

pub async fn convert(url: String, limit: Option<usize>, json: bool) {
    let settings = super::load_settings();
    if settings.youtube_api_key.is_none() {
        warning!("YOUTUBE_API_KEY is not set, every track will get a search link");
    }

    let mut tracks = super::fetch::fetch_tracks(&settings, &url).await;
    if let Some(limit) = limit {
        tracks.truncate(limit);
    }
    if tracks.is_empty() {
        error!("Playlist has no tracks to convert");
    }

    let quota = Arc::new(QuotaTracker::new(settings.quota));
    let state_file = QuotaStateFile::default_location();
    if let Err(e) = state_file.restore_into(&quota).await {
        warning!("Ignoring unreadable quota state: {}", e);
    }

    let youtube = match YouTubeClient::from_settings(&settings, Arc::clone(&quota)) {
        Ok(client) => client,
        Err(e) => error!("{}", e),
    };
    let converter = Converter::new(
        Arc::new(youtube),
        Arc::new(CacheStore::new(settings.cache_ttl)),
        Arc::clone(&quota),
        ConverterOptions::from_settings(&settings),
    );

    info!("Converting {} tracks", tracks.len());
    let pb = super::spinner("Searching YouTube...");
    let result = converter.convert(&tracks).await;
    pb.finish_and_clear();

    if let Err(e) = state_file.persist(&quota).await {
        warning!("Cannot persist quota state: {}", e);
    }

    let output = match result {
        Ok(output) => output,
        Err(e) => error!("{}", e),
    };

    if json {
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Cannot serialize results: {}", e),
        }
        return;
    }

    print_output(&output);
}

fn print_output(output: &ConversionOutput) {
    let rows: Vec<ConversionTableRow> = output
        .results
        .iter()
        .map(|r| {
            let top = r.youtube.top_match.as_ref();
            let youtube = match (top, r.youtube.fallback_reason.as_deref()) {
                (Some(m), None) => utils::truncate(&m.title, 48),
                (_, Some(reason)) => format!("search link ({})", reason),
                (None, None) => String::new(),
            };
            ConversionTableRow {
                track: utils::truncate(&r.original.name, 40),
                artists: utils::truncate(&r.original.artists.join(", "), 32),
                youtube,
                url: top.map(|m| m.url.clone()).unwrap_or_default(),
            }
        })
        .collect();

    println!("{}", Table::new(rows));

    let summary = &output.summary;
    success!(
        "{} of {} tracks matched ({}), {} search links",
        summary.matched,
        summary.total,
        summary.success_rate,
        summary.fallbacks
    );
    info!(
        "Quota used today: {}/{} units",
        summary.quota_used, summary.quota_limit
    );
}
