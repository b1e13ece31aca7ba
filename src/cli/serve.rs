use crate::{error, info, server};

pub async fn serve() {
    let settings = super::load_settings();

    // without credentials every request would fail, so refuse to start
    if let Err(e) = settings.require_credentials() {
        error!("Cannot start server: {}", e);
    }

    let state = match server::AppState::from_settings(&settings) {
        Ok(state) => state,
        Err(e) => error!("Cannot initialize services: {}", e),
    };

    info!("Starting TuneBridge API on {}", settings.server_address);
    if let Err(e) = server::start_api_server(&settings, state).await {
        error!("Server stopped with error: {}", e);
    }
}
