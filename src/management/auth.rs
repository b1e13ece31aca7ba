use chrono::Utc;
use reqwest::Client;

use crate::{
    spotify::{self, SpotifyError},
    types::Token,
};

/// Seconds before expiry at which a token is considered stale.
const EXPIRY_BUFFER_SECS: u64 = 240;

/// Holds the client-credentials token and requests a new one when it expires.
pub struct TokenManager {
    client_id: String,
    client_secret: String,
    token_url: String,
    token: Option<Token>,
}

impl TokenManager {
    pub fn new(client_id: &str, client_secret: &str, token_url: &str) -> Self {
        TokenManager {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_url: token_url.to_string(),
            token: None,
        }
    }

    pub async fn get_valid_token(&mut self, http: &Client) -> Result<String, SpotifyError> {
        if let Some(token) = self.token.as_ref().filter(|t| !is_expired(t)) {
            return Ok(token.access_token.clone());
        }

        let token = spotify::auth::request_client_token(
            http,
            &self.token_url,
            &self.client_id,
            &self.client_secret,
        )
        .await?;
        let access_token = token.access_token.clone();
        self.token = Some(token);
        Ok(access_token)
    }
}

fn is_expired(token: &Token) -> bool {
    let now = Utc::now().timestamp() as u64;
    now + EXPIRY_BUFFER_SECS >= token.obtained_at + token.expires_in
}
