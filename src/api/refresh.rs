use crate::api::ClientInner;
use crate::error::{ApiError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Why a refresh could not produce a new token. The session is already gone
/// by the time waiters see this.
#[derive(Debug, Clone)]
pub(crate) struct RefreshFailed(pub(crate) String);

pub(crate) type RefreshOutcome = std::result::Result<String, RefreshFailed>;

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Single-flight guard over the refresh endpoint.
///
/// The first request to see a 401 stores the refresh future in the slot; any
/// request arriving before it resolves awaits a clone of the same future.
/// The future empties the slot itself before yielding its outcome, so a
/// finished refresh is never handed to a later request, whichever waiters
/// have been cancelled.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    in_flight: Mutex<Option<InFlight>>,
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let refreshing = self.in_flight.try_lock().map(|slot| slot.is_some()).ok();
        f.debug_struct("RefreshCoordinator").field("refreshing", &refreshing).finish()
    }
}

impl RefreshCoordinator {
    /// Returns a token to retry with after `stale` was rejected.
    ///
    /// # Errors
    /// Returns `SessionExpired` if the refresh failed or no session is left.
    pub(crate) async fn fresh_token(&self, client: &Arc<ClientInner>, stale: &str) -> Result<String> {
        let refresh = {
            let mut slot = self.in_flight.lock().await;
            if let Some(refresh) = slot.as_ref() {
                tracing::debug!("Token refresh already in flight, waiting");
                refresh.clone()
            } else {
                match client.current_token().await? {
                    None => return Err(ApiError::SessionExpired),
                    Some(current) if current != stale => {
                        // Another request finished a refresh while this one was on the wire.
                        tracing::debug!("Retrying with already refreshed token");
                        return Ok(current);
                    }
                    Some(_) => {}
                }

                let refresh = refresh_and_release(Arc::clone(client));
                *slot = Some(refresh.clone());
                refresh
            }
        };

        refresh.await.map_err(|RefreshFailed(reason)| {
            tracing::debug!(%reason, "Request abandoned after failed refresh");
            ApiError::SessionExpired
        })
    }
}

/// Runs one refresh. Only one can be in the slot at a time, so the slot holds
/// this very future when it is released.
fn refresh_and_release(inner: Arc<ClientInner>) -> InFlight {
    async move {
        let outcome = inner.refresh_session().await;
        inner.refresh.in_flight.lock().await.take();
        outcome
    }
    .boxed()
    .shared()
}
