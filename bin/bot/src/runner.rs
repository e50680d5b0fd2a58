//! Receive loop and background sweeper.

use chronobot_conversation::{ConversationDriver, Inbound, Transport};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Pause after a failed receive before polling again.
pub const RECEIVE_BACKOFF: Duration = Duration::from_secs(5);

async fn reply(driver: ConversationDriver, transport: Arc<dyn Transport>, message: Inbound) {
    let Inbound { conversation, text } = message;
    let answer = driver.handle(&conversation, &text).await;
    if let Err(report) = transport.send(&conversation, &answer).await {
        warn!(%conversation, error = %report, "failed to deliver reply");
    }
}

/// Polls `transport` until `shutdown` resolves, handling each message in its
/// own task. In-flight messages are finished before returning.
pub async fn run(
    transport: Arc<dyn Transport>,
    driver: ConversationDriver,
    backoff: Duration,
    shutdown: impl Future<Output = ()>,
) {
    let mut tasks = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            batch = transport.receive() => match batch {
                Ok(messages) => {
                    for message in messages {
                        tasks.spawn(reply(driver.clone(), transport.clone(), message));
                    }
                }
                Err(report) => {
                    warn!(error = %report, "failed to receive messages");
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(backoff) => {}
                    }
                }
            },
        }

        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                warn!(error = %e, "message task panicked");
            }
        }
    }

    info!(in_flight = tasks.len(), "shutting down");
    while let Some(finished) = tasks.join_next().await {
        if let Err(e) = finished {
            warn!(error = %e, "message task panicked");
        }
    }
}

/// Spawns the periodic sweep of expired dialogue state.
pub fn spawn_sweeper(driver: ConversationDriver, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let expired = driver.sweep();
            if expired > 0 {
                debug!(expired, "periodic sweep");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chronobot_ai::{ClassifierError, Intent, IntentClassifier, IntentResult, Slots};
    use chronobot_conversation::{
        ActionDispatcher, ContextStore, DialogueEngine, PendingState, TransportError, messages,
    };
    use chronobot_core::ConversationId;
    use chronobot_integration::InMemoryCalendar;
    use rootcause::Report;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    struct UnknownClassifier;

    #[async_trait]
    impl IntentClassifier for UnknownClassifier {
        async fn classify(&self, _utterance: &str) -> Result<IntentResult, Report<ClassifierError>> {
            Ok(IntentResult::new(Intent::Unknown, 0.9, Slots::default()))
        }
    }

    /// Hands out scripted batches, then waits forever; records replies.
    #[derive(Default)]
    struct FakeTransport {
        batches: Mutex<VecDeque<Result<Vec<Inbound>, TransportError>>>,
        sent: Mutex<Vec<(ConversationId, String)>>,
        fail_sends_to: Option<ConversationId>,
        delivered: Notify,
    }

    impl FakeTransport {
        fn scripted(batches: impl IntoIterator<Item = Result<Vec<Inbound>, TransportError>>) -> Self {
            Self {
                batches: Mutex::new(batches.into_iter().collect()),
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<(ConversationId, String)> {
            self.sent.lock().expect("lock").clone()
        }

        async fn wait_for(&self, count: usize) {
            while self.sent().len() < count {
                self.delivered.notified().await;
            }
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn receive(&self) -> Result<Vec<Inbound>, Report<TransportError>> {
            let next = self.batches.lock().expect("lock").pop_front();
            match next {
                Some(Ok(messages)) => Ok(messages),
                Some(Err(e)) => Err(e.into()),
                None => std::future::pending().await,
            }
        }

        async fn send(
            &self,
            conversation: &ConversationId,
            text: &str,
        ) -> Result<(), Report<TransportError>> {
            let result = if self.fail_sends_to.as_ref() == Some(conversation) {
                Err(TransportError::SendFailed {
                    conversation: conversation.clone(),
                    reason: "blocked by user".to_string(),
                }
                .into())
            } else {
                self.sent
                    .lock()
                    .expect("lock")
                    .push((conversation.clone(), text.to_string()));
                Ok(())
            };
            self.delivered.notify_one();
            result
        }
    }

    fn driver() -> ConversationDriver {
        let dispatcher = ActionDispatcher::new(Arc::new(InMemoryCalendar::new()));
        ConversationDriver::new(DialogueEngine::new(
            Arc::new(UnknownClassifier),
            dispatcher,
            ContextStore::default(),
        ))
    }

    #[tokio::test]
    async fn replies_to_every_message() {
        let transport = Arc::new(FakeTransport::scripted([
            Ok(vec![
                Inbound::new(1_i64, "/start"),
                Inbound::new(2_i64, "что-нибудь"),
            ]),
            Ok(vec![]),
            Ok(vec![Inbound::new(1_i64, "/view")]),
        ]));

        let waiter = transport.clone();
        run(transport.clone(), driver(), Duration::ZERO, async move {
            waiter.wait_for(3).await;
        })
        .await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        for expected in [
            (ConversationId::from(1_i64), messages::GREETING.to_string()),
            (ConversationId::from(1_i64), messages::VIEW_USAGE.to_string()),
            (ConversationId::from(2_i64), messages::NOT_UNDERSTOOD.to_string()),
        ] {
            assert!(sent.contains(&expected), "missing {expected:?}");
        }
    }

    #[tokio::test]
    async fn receive_errors_do_not_stop_the_loop() {
        let transport = Arc::new(FakeTransport::scripted([
            Err(TransportError::ReceiveFailed {
                reason: "bad gateway".to_string(),
            }),
            Ok(vec![Inbound::new(1_i64, "/help")]),
        ]));

        let waiter = transport.clone();
        run(transport.clone(), driver(), Duration::ZERO, async move {
            waiter.wait_for(1).await;
        })
        .await;

        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_send_does_not_affect_other_conversations() {
        let transport = Arc::new(FakeTransport {
            fail_sends_to: Some(ConversationId::from(1_i64)),
            ..FakeTransport::scripted([Ok(vec![
                Inbound::new(1_i64, "/start"),
                Inbound::new(2_i64, "/start"),
            ])])
        });

        let waiter = transport.clone();
        run(transport.clone(), driver(), Duration::ZERO, async move {
            waiter.wait_for(1).await;
        })
        .await;

        assert_eq!(
            transport.sent(),
            [(ConversationId::from(2_i64), messages::GREETING.to_string())]
        );
    }

    #[tokio::test]
    async fn sweeper_prunes_expired_state() {
        let store = ContextStore::new(Duration::ZERO);
        let driver = ConversationDriver::new(DialogueEngine::new(
            Arc::new(UnknownClassifier),
            ActionDispatcher::new(Arc::new(InMemoryCalendar::new())),
            store.clone(),
        ));
        store.set(
            &ConversationId::from(1_i64),
            PendingState::AwaitingDeleteConfirmation {
                event_id: "e1".to_string(),
            },
        );
        assert_eq!(store.len(), 1);

        let handle = spawn_sweeper(driver, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.is_empty());
        handle.abort();
    }
}
