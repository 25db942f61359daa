use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;

use crate::ConsentError;

pub const CONFIRMATION_DELAY: Duration = Duration::from_millis(2000);
pub const COPIED_MESSAGE: &str = "Copied to clipboard!";
pub const COPY_FAILED_MESSAGE: &str = "Could not copy to clipboard.";

/// An inline message shown next to the element that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub id: u64,
    pub anchor: String,
    pub message: String,
}

#[derive(Debug, Default)]
struct ConfirmationState {
    next_id: u64,
    visible: Vec<Confirmation>,
}

/// Transient confirmation messages.
///
/// Every call to [`Confirmations::show`] inserts its own message and starts its
/// own removal timer; clicks never share, queue or reset timers.
#[derive(Debug, Clone, Default)]
pub struct Confirmations {
    state: Arc<Mutex<ConfirmationState>>,
}

impl Confirmations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows `message` next to `anchor` and removes it after `delay`.
    ///
    /// The removal timer runs on the current Tokio runtime. Outside of one
    /// nothing is shown and [`ConsentError::Timer`] is returned.
    pub fn show(
        &self,
        anchor: impl Into<String>,
        message: impl Into<String>,
        delay: Duration,
    ) -> Result<u64, ConsentError> {
        let runtime = Handle::try_current().map_err(|err| ConsentError::Timer(err.to_string()))?;

        let confirmation = {
            let mut state = lock_state(&self.state);
            state.next_id += 1;
            let confirmation = Confirmation {
                id: state.next_id,
                anchor: anchor.into(),
                message: message.into(),
            };
            state.visible.push(confirmation.clone());
            confirmation
        };
        tracing::debug!(id = confirmation.id, anchor = %confirmation.anchor, "confirmation shown");

        let id = confirmation.id;
        let state = self.state.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            lock_state(&state).visible.retain(|shown| shown.id != id);
            tracing::debug!(id, "confirmation removed");
        });

        Ok(id)
    }

    pub fn visible(&self) -> Vec<Confirmation> {
        lock_state(&self.state).visible.clone()
    }

    pub fn is_visible(&self, id: u64) -> bool {
        self.visible().iter().any(|shown| shown.id == id)
    }
}

// The state stays consistent under a panic, so a poisoned lock is reused.
fn lock_state(state: &Mutex<ConfirmationState>) -> MutexGuard<'_, ConfirmationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
