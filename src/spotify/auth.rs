use chrono::Utc;
use reqwest::{Client, StatusCode};

use crate::{
    spotify::SpotifyError,
    types::{Token, TokenResponse},
};

/// Requests an app-only access token using the client-credentials grant.
///
/// # Errors
///
/// - [`SpotifyError::Auth`] if Spotify rejects the credentials (400/401)
/// - [`SpotifyError::Upstream`] for any other non-success status
/// - [`SpotifyError::Http`] for transport failures and timeouts
pub async fn request_client_token(
    http: &Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<Token, SpotifyError> {
    let response = http
        .post(token_url)
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    let status = response.status();
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
        return Err(SpotifyError::Auth(
            "Spotify rejected the client credentials. Check SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET"
                .to_string(),
        ));
    }
    if !status.is_success() {
        return Err(SpotifyError::Upstream(format!(
            "token request failed with HTTP {}",
            status
        )));
    }

    let json = response.json::<TokenResponse>().await?;
    Ok(Token {
        access_token: json.access_token,
        expires_in: json.expires_in.unwrap_or(3600),
        obtained_at: Utc::now().timestamp() as u64,
    })
}
