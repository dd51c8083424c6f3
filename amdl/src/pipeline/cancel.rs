use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Cooperative cancellation handle given to a running job.
///
/// Stages poll it between steps; waits race it. It never interrupts an
/// external process that is already running.
#[derive(Debug, Clone, Default)]
pub struct CancelCheck {
    token: CancellationToken,
}

impl CancelCheck {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// A handle that is never canceled.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Return `Error::Canceled` if cancellation was requested.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_after_cancel() {
        let token = CancellationToken::new();
        let check = CancelCheck::new(token.clone());
        assert!(check.checkpoint().is_ok());
        token.cancel();
        assert!(matches!(check.checkpoint(), Err(Error::Canceled)));
    }

    #[test]
    fn test_never_is_not_canceled() {
        assert!(!CancelCheck::never().is_canceled());
    }
}
