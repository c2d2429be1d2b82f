//! Shared re-authentication state machine used by every broker client.
//!
//! `Disconnected -> Connecting -> Connected -> ReAuthing -> Connected|Failed`.
//! A request that fails authentication moves the client to `ReAuthing`,
//! attempts exactly one re-login, and either returns to `Connected` or falls
//! to `Failed` — it never retries the re-login itself, so a client stuck in
//! `Failed` needs an explicit `connect()` call (the worker's reconnect
//! policy does this after clearing the broker registry).

use parking_lot::Mutex;

use fiona_markets::{BrokerConnectionState, BrokerError};

pub struct ReauthState {
    state: Mutex<BrokerConnectionState>,
}

impl ReauthState {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BrokerConnectionState::Disconnected),
        }
    }

    pub fn get(&self) -> BrokerConnectionState {
        *self.state.lock()
    }

    pub fn set(&self, new_state: BrokerConnectionState) {
        *self.state.lock() = new_state;
    }

    /// Runs `op`; if it fails with `BrokerError::Authentication`, transitions
    /// through `ReAuthing`, calls `relogin` once, and retries `op` exactly
    /// once. Any other error, or a second failure, is returned as-is (with
    /// the state left `Failed` on a relogin or retry failure).
    pub async fn run_with_single_reauth<T, Op, OpFut, Relogin, ReloginFut>(
        &self,
        mut op: Op,
        relogin: Relogin,
    ) -> Result<T, BrokerError>
    where
        Op: FnMut() -> OpFut,
        OpFut: std::future::Future<Output = Result<T, BrokerError>>,
        Relogin: FnOnce() -> ReloginFut,
        ReloginFut: std::future::Future<Output = Result<(), BrokerError>>,
    {
        match op().await {
            Ok(value) => {
                self.set(BrokerConnectionState::Connected);
                Ok(value)
            }
            Err(BrokerError::Authentication(msg)) => {
                tracing::warn!(reason = %msg, "authentication failure, attempting single re-login");
                self.set(BrokerConnectionState::ReAuthing);
                match relogin().await {
                    Ok(()) => match op().await {
                        Ok(value) => {
                            self.set(BrokerConnectionState::Connected);
                            Ok(value)
                        }
                        Err(err) => {
                            self.set(BrokerConnectionState::Failed);
                            Err(err)
                        }
                    },
                    Err(err) => {
                        self.set(BrokerConnectionState::Failed);
                        Err(err)
                    }
                }
            }
            Err(err) => Err(err),
        }
    }
}

impl Default for ReauthState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn successful_op_never_triggers_reauth() {
        let state = ReauthState::new();
        let calls = AtomicUsize::new(0);
        let result = state
            .run_with_single_reauth(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, BrokerError>(42) }
                },
                || async { Ok(()) },
            )
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.get(), BrokerConnectionState::Connected);
    }

    #[tokio::test]
    async fn auth_failure_retries_once_after_relogin() {
        let state = ReauthState::new();
        let attempts = AtomicUsize::new(0);
        let result = state
            .run_with_single_reauth(
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            Err(BrokerError::Authentication("token expired".into()))
                        } else {
                            Ok(7)
                        }
                    }
                },
                || async { Ok(()) },
            )
            .await
            .unwrap();
        assert_eq!(result, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(state.get(), BrokerConnectionState::Connected);
    }

    #[tokio::test]
    async fn second_auth_failure_after_relogin_marks_failed() {
        let state = ReauthState::new();
        let result: Result<i32, _> = state
            .run_with_single_reauth(
                || async { Err(BrokerError::Authentication("still invalid".into())) },
                || async { Ok(()) },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(state.get(), BrokerConnectionState::Failed);
    }

    #[tokio::test]
    async fn relogin_failure_marks_failed_without_retrying_op() {
        let state = ReauthState::new();
        let attempts = AtomicUsize::new(0);
        let result: Result<i32, _> = state
            .run_with_single_reauth(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(BrokerError::Authentication("expired".into())) }
                },
                || async { Err(BrokerError::Authentication("relogin rejected".into())) },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(state.get(), BrokerConnectionState::Failed);
    }
}
