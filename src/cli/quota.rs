use crate::{
    error, info,
    management::{QuotaStateFile, QuotaTracker},
    success, warning,
};

pub async fn quota(reset: bool) {
    let settings = super::load_settings();
    let tracker = QuotaTracker::new(settings.quota);
    let state_file = QuotaStateFile::default_location();

    match state_file.restore_into(&tracker).await {
        Ok(true) => {}
        Ok(false) => info!("No quota recorded yet"),
        Err(e) => warning!("Ignoring unreadable quota state: {}", e),
    }

    if reset {
        let previous = tracker.reset().await;
        if let Err(e) = state_file.persist(&tracker).await {
            error!("Cannot persist quota state: {}", e);
        }
        success!("Quota reset (previous usage: {} units)", previous);
        return;
    }

    let status = tracker.status().await;
    info!(
        "Units: {}/{} used, {} remaining",
        status.quota_used, status.quota_limit, status.quota_remaining
    );
    info!(
        "Searches: {} used, {} remaining this session",
        status.searches_used, status.searches_remaining
    );
    info!("Last reset: {}", status.last_reset_date);
    if status.quota_exceeded {
        warning!("Quota exhausted; conversions will return search links only");
    }
}
