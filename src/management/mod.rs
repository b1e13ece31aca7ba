mod auth;
mod cache;
mod playlist;
mod quota;
mod state;

pub use auth::TokenManager;
pub use cache::CacheStore;
pub use playlist::{PlaylistStore, StorageError};
pub use quota::{DayClock, ManualClock, QuotaTracker, SystemClock};
pub use state::{QuotaStateFile, StateError};
