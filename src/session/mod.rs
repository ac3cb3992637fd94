pub mod extract;
pub mod layer;
pub mod store;

use crate::core::error::AppError;
use crate::models::user::Identity;
use crate::utils::time::current_timestamp;
use tower_sessions::Session;

/// Session key holding the `Identity` snapshot of a logged-in user
pub const IDENTITY_KEY: &str = "identity";

/// Session key holding the unix time of the last authenticated request
pub const LAST_SEEN_KEY: &str = "last_seen";

pub async fn current_identity(session: &Session) -> Result<Option<Identity>, AppError> {
    Ok(session.get::<Identity>(IDENTITY_KEY).await?)
}

/// Mark the session as used. The layer only re-saves modified sessions, and
/// a save is what pushes the idle deadline and the cookie expiry forward.
pub async fn touch(session: &Session) -> Result<(), AppError> {
    session.insert(LAST_SEEN_KEY, current_timestamp()).await?;
    Ok(())
}
