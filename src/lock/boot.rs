use super::store::LockStateStore;
use crate::device::Presenter;

/// First thing on every start: if the persisted record says locked,
/// present the lock surface before anything else initializes.
///
/// Returns the persisted flag. Read failures count as unlocked.
pub fn early_lock_check(store: &LockStateStore, presenter: &dyn Presenter) -> bool {
    let locked = match store.read() {
        Ok(locked) => locked,
        Err(e) => {
            tracing::error!(path = %store.path().display(), "cannot read lock state: {e}");
            return false;
        }
    };
    tracing::debug!(locked, shown = presenter.is_lock_surface_shown(), "early lock check");
    if locked
        && !presenter.is_lock_surface_shown()
        && let Err(e) = presenter.show_lock_surface()
    {
        tracing::error!("failed to present lock screen at boot: {e}");
    }
    locked
}
