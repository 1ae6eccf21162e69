//! Unread-count badge
//!
//! [`BadgePoller`] is a background task that fetches the unread count right
//! away and then on a fixed interval. Fetches run as child tasks so a slow
//! response never delays the next tick; whichever response lands last wins.
//! Failures are logged and the last known count stays on the badge.
//!
//! The task stops on [`BadgePoller::stop`] or when the poller is dropped, and
//! takes every in-flight fetch with it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::NotificationApi;
use crate::session::Session;

/// Counts above this render as "99+"
const BADGE_MAX: u64 = 99;

/// `tokio::time::interval` panics on zero
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct BadgePoller {
    cancel_tx: watch::Sender<bool>,
    count_rx: watch::Receiver<u64>,
    handle: Option<JoinHandle<()>>,
}

impl BadgePoller {
    /// Spawn the poll loop on the current tokio runtime.
    pub fn start<A>(api: Arc<A>, session: Session, interval: Duration) -> Self
    where
        A: NotificationApi + 'static,
    {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (count_tx, count_rx) = watch::channel(0u64);

        debug!(user_id = session.user_id(), ?interval, "starting badge poller");
        let handle = tokio::spawn(run_badge_poll(
            api,
            session,
            interval,
            Arc::new(count_tx),
            cancel_rx,
        ));

        Self {
            cancel_tx,
            count_rx,
            handle: Some(handle),
        }
    }

    /// Last count received (0 until the first fetch succeeds)
    pub fn count(&self) -> u64 {
        *self.count_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.count_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the loop and wait for it to exit. Safe to call more than once.
    pub async fn stop(&mut self) {
        let _ = self.cancel_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!("badge poller exited abnormally: {}", err);
                }
            }
        }
    }
}

impl Drop for BadgePoller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_badge_poll<A>(
    api: Arc<A>,
    session: Session,
    interval: Duration,
    count_tx: Arc<watch::Sender<u64>>,
    mut cancel_rx: watch::Receiver<bool>,
) where
    A: NotificationApi + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut fetches = JoinSet::new();

    loop {
        tokio::select! {
            changed = cancel_rx.changed() => {
                if changed.is_err() || *cancel_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let api = api.clone();
                let session = session.clone();
                let count_tx = count_tx.clone();
                fetches.spawn(async move {
                    match api.unread_count(&session, session.user_id()).await {
                        Ok(count) => {
                            count_tx.send_replace(count);
                        }
                        Err(err) => warn!(error = %err, "failed to load unread count"),
                    }
                });
            }
            Some(_) = fetches.join_next(), if !fetches.is_empty() => {}
        }
    }

    fetches.abort_all();
    debug!("badge poller stopped");
}

/// Navbar badge scope: polls only while an identity is known.
pub struct UnreadBadge<A: NotificationApi + 'static> {
    api: Arc<A>,
    interval: Duration,
    poller: Option<BadgePoller>,
}

impl<A: NotificationApi + 'static> UnreadBadge<A> {
    pub fn new(api: Arc<A>, interval: Duration) -> Self {
        Self {
            api,
            interval,
            poller: None,
        }
    }

    /// Start polling for `session`, replacing any poller for a previous identity.
    pub fn activate(&mut self, session: Session) {
        // Dropping the old poller aborts it
        self.poller = Some(BadgePoller::start(
            self.api.clone(),
            session,
            self.interval,
        ));
    }

    /// Identity cleared or view closed.
    pub async fn deactivate(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop().await;
        }
    }

    pub fn is_active(&self) -> bool {
        self.poller.is_some()
    }

    pub fn count(&self) -> u64 {
        self.poller.as_ref().map(BadgePoller::count).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        self.poller.as_ref().map(BadgePoller::subscribe)
    }

    /// Badge text; hidden when nothing is unread.
    pub fn label(&self) -> Option<String> {
        badge_label(self.count())
    }
}

pub fn badge_label(count: u64) -> Option<String> {
    match count {
        0 => None,
        n if n > BADGE_MAX => Some(format!("{}+", BADGE_MAX)),
        n => Some(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{passenger_session, server_error, FakeNotifications};

    const INTERVAL: Duration = Duration::from_secs(30);

    fn fake(count: u64) -> Arc<FakeNotifications> {
        let api = Arc::new(FakeNotifications::with_pages(vec![]));
        api.set_count(Ok(count));
        api
    }

    /// Let the poller run up to (and including) `secs` of virtual time
    async fn advance(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs) + Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_immediately_then_on_interval() {
        let api = fake(3);
        let poller = BadgePoller::start(api.clone(), passenger_session(), INTERVAL);

        advance(0).await;
        assert_eq!(api.count_calls(), 1);
        assert_eq!(poller.count(), 3);

        api.set_count(Ok(5));
        advance(29).await;
        assert_eq!(api.count_calls(), 1);

        advance(1).await;
        assert_eq!(api.count_calls(), 2);
        assert_eq!(poller.count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fetch_after_stop() {
        let api = fake(1);
        let mut poller = BadgePoller::start(api.clone(), passenger_session(), INTERVAL);

        advance(30).await;
        assert_eq!(api.count_calls(), 2);

        poller.stop().await;
        assert!(!poller.is_running());

        advance(300).await;
        assert_eq!(api.count_calls(), 2);

        // A second stop is harmless
        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let api = fake(2);
        let poller = BadgePoller::start(api.clone(), passenger_session(), Duration::ZERO);

        advance(0).await;
        assert_eq!(api.count_calls(), 1);
        assert_eq!(poller.count(), 2);

        advance(1).await;
        assert_eq!(api.count_calls(), 2);
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let api = fake(1);
        let poller = BadgePoller::start(api.clone(), passenger_session(), INTERVAL);
        advance(0).await;
        drop(poller);

        advance(120).await;
        assert_eq!(api.count_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_count() {
        let api = fake(4);
        let poller = BadgePoller::start(api.clone(), passenger_session(), INTERVAL);
        advance(0).await;
        assert_eq!(poller.count(), 4);

        api.set_count(Err(server_error("boom")));
        advance(30).await;
        assert_eq!(api.count_calls(), 2);
        assert_eq!(poller.count(), 4);
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_updates() {
        let api = fake(7);
        let poller = BadgePoller::start(api.clone(), passenger_session(), INTERVAL);
        let mut rx = poller.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_badge_scope_follows_identity() {
        let api = fake(2);
        let mut badge = UnreadBadge::new(api.clone(), INTERVAL);
        assert!(!badge.is_active());
        assert_eq!(badge.label(), None);

        badge.activate(passenger_session());
        advance(0).await;
        assert_eq!(badge.count(), 2);
        assert_eq!(badge.label().as_deref(), Some("2"));

        badge.deactivate().await;
        assert!(!badge.is_active());
        assert_eq!(badge.count(), 0);

        let calls = api.count_calls();
        advance(90).await;
        assert_eq!(api.count_calls(), calls);
    }

    #[test]
    fn test_badge_label() {
        assert_eq!(badge_label(0), None);
        assert_eq!(badge_label(12).as_deref(), Some("12"));
        assert_eq!(badge_label(99).as_deref(), Some("99"));
        assert_eq!(badge_label(100).as_deref(), Some("99+"));
    }
}
