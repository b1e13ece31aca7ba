use tabled::Table;

use crate::{
    config::Settings,
    error,
    spotify::SpotifyClient,
    success,
    types::{Track, TrackTableRow},
    utils,
};

pub async fn fetch(url: String) {
    let settings = super::load_settings();
    let tracks = fetch_tracks(&settings, &url).await;

    let rows: Vec<TrackTableRow> = tracks
        .iter()
        .map(|t| TrackTableRow {
            name: utils::truncate(&t.name, 48),
            artists: utils::truncate(&t.artists.join(", "), 40),
            album: utils::truncate(t.album.as_deref().unwrap_or(""), 40),
        })
        .collect();

    println!("{}", Table::new(rows));
    success!("Fetched {} tracks", tracks.len());
}

/// Fetches playlist tracks behind a spinner, exiting on failure.
pub(super) async fn fetch_tracks(settings: &Settings, url: &str) -> Vec<Track> {
    let client = match SpotifyClient::from_settings(settings) {
        Ok(client) => client,
        Err(e) => error!("{}", e),
    };

    let pb = super::spinner("Fetching Spotify playlist...");
    let result = client.get_playlist_tracks(url).await;
    pb.finish_and_clear();

    match result {
        Ok(tracks) => tracks,
        Err(e) => error!("{}", e),
    }
}
