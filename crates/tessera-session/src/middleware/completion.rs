//! Exactly-once request completion hook.

use crate::session::AuthSession;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stamps the session's last request time when the request completes.
///
/// `fire` is called when the response is produced; dropping the hook without
/// firing (the client went away and the response future was dropped) fires
/// it as well. Only the first of the two has an effect.
#[derive(Debug)]
pub struct CompletionHook {
    session: AuthSession,
    fired: AtomicBool,
}

impl CompletionHook {
    pub fn new(session: AuthSession) -> Self {
        Self {
            session,
            fired: AtomicBool::new(false),
        }
    }

    pub fn fire(&self) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            self.session.set_last_request();
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl Drop for CompletionHook {
    fn drop(&mut self) {
        self.fire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SessionAuthConfig,
        session::{AuthContext, ClientInfo, Clock, Login, ManualClock, MemoryStore},
    };
    use chrono::Duration;
    use std::sync::Arc;

    async fn logged_in_session() -> (AuthSession, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        let context = AuthContext::new(SessionAuthConfig::default())
            .unwrap()
            .with_clock(clock.clone());
        let store = Arc::new(MemoryStore::new());
        let session = AuthSession::new(store.open(None), Arc::new(context), ClientInfo::default());
        session.login(Login::default()).await.unwrap();
        (session, clock)
    }

    #[tokio::test]
    async fn test_fire_stamps_once() {
        let (session, clock) = logged_in_session().await;
        let hook = CompletionHook::new(session.clone());

        clock.advance(Duration::seconds(5));
        let first = clock.now();
        hook.fire();
        assert!(hook.has_fired());

        clock.advance(Duration::seconds(5));
        hook.fire();
        drop(hook);

        assert_eq!(session.handle().snapshot().last_request_at, Some(first));
    }

    #[tokio::test]
    async fn test_drop_fires_when_abandoned() {
        let (session, clock) = logged_in_session().await;
        let hook = CompletionHook::new(session.clone());

        clock.advance(Duration::seconds(30));
        drop(hook);

        assert_eq!(session.handle().snapshot().last_request_at, Some(clock.now()));
    }
}
