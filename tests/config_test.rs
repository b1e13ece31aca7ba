use std::str::FromStr;

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tunebridge::config::{ConfigError, QuotaLimits, Settings, StorageBackend};
use tunebridge::management::SystemClock;

#[test]
fn test_defaults() {
    let settings = Settings::default();

    assert_eq!(settings.quota.daily_unit_limit, 10_000);
    assert_eq!(settings.quota.max_searches_per_session, 90);
    assert_eq!(settings.quota.cost_per_search, 100);
    assert_eq!(settings.max_results, 5);
    assert_eq!(settings.storage, StorageBackend::Memory);
    assert_eq!(settings.socket_addr().unwrap().port(), 3001);
}

#[test]
fn test_storage_backend_from_str() {
    assert_eq!(StorageBackend::from_str("memory"), Ok(StorageBackend::Memory));
    assert_eq!(StorageBackend::from_str(" FILE "), Ok(StorageBackend::File));
    assert!(StorageBackend::from_str("redis").is_err());
}

#[test]
fn test_quota_day_follows_pacific_time() {
    let limits = QuotaLimits::default();
    assert_eq!(limits.reset_timezone, chrono_tz::America::Los_Angeles);
    let clock = SystemClock::new(limits.reset_timezone);

    // 07:30 UTC is 00:30 PDT in summer, already the next quota day
    let summer = Utc.with_ymd_and_hms(2024, 7, 1, 7, 30, 0).unwrap();
    assert_eq!(clock.day_at(summer), NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());

    // and 23:30 PST the evening before in winter
    let winter = Utc.with_ymd_and_hms(2024, 1, 15, 7, 30, 0).unwrap();
    assert_eq!(clock.day_at(winter), NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
}

#[test]
fn test_timezone_from_str() {
    assert_eq!(
        Tz::from_str("Europe/Berlin").unwrap(),
        chrono_tz::Europe::Berlin
    );
    assert!(Tz::from_str("Mars/Olympus").is_err());
}

#[test]
fn test_missing_credentials() {
    let mut settings = Settings::default();
    assert_eq!(
        settings.require_credentials(),
        Err(ConfigError::Missing("YOUTUBE_API_KEY"))
    );

    settings.youtube_api_key = Some("key".to_string());
    assert_eq!(
        settings.require_credentials(),
        Err(ConfigError::Missing("SPOTIFY_CLIENT_ID"))
    );

    settings.spotify_client_id = Some("id".to_string());
    settings.spotify_client_secret = Some("secret".to_string());
    assert_eq!(settings.require_credentials(), Ok(()));
    assert_eq!(settings.spotify_credentials(), Ok(("id", "secret")));
}

#[test]
fn test_invalid_server_address() {
    let settings = Settings {
        server_address: "not-an-address".to_string(),
        ..Settings::default()
    };
    assert!(matches!(
        settings.socket_addr(),
        Err(ConfigError::Invalid { name: "SERVER_ADDRESS", .. })
    ));
}
