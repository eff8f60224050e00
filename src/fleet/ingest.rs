//! Push-event forwarders.
//!
//! One task per host channel. Each awaits its subscription, then relays
//! every delivered item into the fleet inbox until the view is torn down.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{FleetEvent, Inbox};
use crate::host::{Host, HostError, Subscription};

/// Subscribe to the lifecycle and sync-status channels.
pub fn spawn_forwarders(
    host: &Arc<dyn Host>,
    inbox: &Inbox,
    alive: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    let lifecycle_host = Arc::clone(host);
    let sync_host = Arc::clone(host);
    vec![
        spawn_forwarder(
            "lifecycle",
            async move { lifecycle_host.subscribe_lifecycle().await },
            FleetEvent::Lifecycle,
            inbox.clone(),
            alive.clone(),
        ),
        spawn_forwarder(
            "sync-status",
            async move { sync_host.subscribe_sync_status().await },
            FleetEvent::SyncStatus,
            inbox.clone(),
            alive.clone(),
        ),
    ]
}

fn spawn_forwarder<T, F>(
    channel: &'static str,
    setup: F,
    wrap: fn(T) -> FleetEvent,
    inbox: Inbox,
    alive: CancellationToken,
) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
    F: Future<Output = Result<Subscription<T>, HostError>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = tokio::select! {
            biased;
            _ = alive.cancelled() => {
                debug!(channel, "torn down before subscribing");
                return;
            }
            result = setup => result,
        };

        let mut subscription = match result {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(channel, error = %e, "subscription failed, push updates disabled");
                if !alive.is_cancelled() {
                    let _ = inbox.send(FleetEvent::SubscriptionFailed { channel });
                }
                return;
            }
        };
        if alive.is_cancelled() {
            debug!(channel, "subscription resolved after teardown");
            subscription.unsubscribe();
            return;
        }
        info!(channel, "subscribed");

        loop {
            tokio::select! {
                biased;
                _ = alive.cancelled() => break,
                item = subscription.recv() => match item {
                    Some(item) => {
                        if inbox.send(wrap(item)).is_err() {
                            break;
                        }
                    }
                    None => {
                        warn!(channel, "host closed the event channel");
                        let _ = inbox.send(FleetEvent::SubscriptionFailed { channel });
                        break;
                    }
                },
            }
        }
        subscription.unsubscribe();
        debug!(channel, "unsubscribed");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio::sync::mpsc;

    use super::*;
    use crate::host::fake::FakeHost;

    async fn wait_for_subscriber(host: &FakeHost) {
        while host.lifecycle_subscribers() == 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn forwards_lifecycle_and_sync_status() {
        let fake = Arc::new(FakeHost::with_profiles(2));
        let host: Arc<dyn Host> = fake.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let alive = CancellationToken::new();
        spawn_forwarders(&host, &tx, &alive);
        wait_for_subscriber(&fake).await;
        // Let the sync-status forwarder subscribe too.
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        fake.emit_lifecycle("p1", true);
        fake.emit_sync_status("p0", "syncing");

        let mut got_lifecycle = false;
        let mut got_sync = false;
        for _ in 0..2 {
            match rx.recv().await {
                Some(FleetEvent::Lifecycle(e)) => {
                    assert_eq!(e.id.as_str(), "p1");
                    assert!(e.is_running);
                    got_lifecycle = true;
                }
                Some(FleetEvent::SyncStatus(e)) => {
                    assert_eq!(e.status, "syncing");
                    got_sync = true;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(got_lifecycle && got_sync);
    }

    #[tokio::test]
    async fn teardown_unsubscribes() {
        let fake = Arc::new(FakeHost::with_profiles(1));
        let host: Arc<dyn Host> = fake.clone();
        let (tx, _rx) = mpsc::unbounded_channel();
        let alive = CancellationToken::new();
        let handles = spawn_forwarders(&host, &tx, &alive);
        wait_for_subscriber(&fake).await;

        alive.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(fake.lifecycle_subscribers(), 0);
    }

    #[tokio::test]
    async fn subscription_resolving_after_teardown_is_noop() {
        let fake = Arc::new(FakeHost::with_held_subscriptions(Vec::new()));
        let host: Arc<dyn Host> = fake.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let alive = CancellationToken::new();
        let handles = spawn_forwarders(&host, &tx, &alive);
        tokio::task::yield_now().await;

        alive.cancel();
        fake.release_subscriptions();
        for handle in handles {
            handle.await.unwrap();
        }
        fake.emit_lifecycle("p0", true);
        assert_eq!(fake.lifecycle_subscribers(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_subscription_reports_degraded() {
        let fake = Arc::new(FakeHost::with_profiles(1));
        fake.fail_lifecycle_subscription.store(true, Ordering::SeqCst);
        let host: Arc<dyn Host> = fake.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let alive = CancellationToken::new();
        spawn_forwarders(&host, &tx, &alive);

        match rx.recv().await {
            Some(FleetEvent::SubscriptionFailed { channel }) => assert_eq!(channel, "lifecycle"),
            other => panic!("unexpected event {other:?}"),
        }
        alive.cancel();
    }
}
