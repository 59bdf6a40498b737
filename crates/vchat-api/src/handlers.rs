//! API handlers.

pub mod ai;
pub mod health;
pub mod upload;
pub mod video;

use vchat_session::Session;

use crate::error::ApiResult;
use crate::state::AppState;

/// Point the shared session at a stored file, unless it already is.
///
/// Attaching resets the session, so a filename the session already holds
/// must not be re-attached mid-conversation.
pub(crate) async fn ensure_attached(
    state: &AppState,
    session: &mut Session,
    filename: &str,
) -> ApiResult<()> {
    if session.asset().map(|a| a.filename.as_str()) != Some(filename) {
        let asset = state.store.open(filename).await?;
        session.attach(asset);
    }
    Ok(())
}
