use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use caravan_types::{FeeSnapshot, Receipt};

use crate::fees::next_fees;
use crate::{ChainClient, ChainError, PollResult, TransactionRequest};

/// Policy constants for driving one on-chain submission to a terminal
/// state. These are configuration inputs, not hard-coded values.
#[derive(Debug, Clone)]
pub struct SupervisorPolicy {
    /// How often to poll for confirmation.
    pub poll_interval: Duration,

    /// How long a send may sit unconfirmed before a fee bump.
    pub stall_threshold: Duration,

    /// How many times a dropped transaction is resubmitted before the
    /// interaction is abandoned.
    pub max_drop_resends: u32,

    /// Absolute budget for the whole interaction, bumps included.
    pub interaction_timeout: Duration,

    /// Percentage increase applied on every resend of the same nonce.
    pub fee_bump_percent: u64,
}

impl Default for SupervisorPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            stall_threshold: Duration::from_secs(30),
            max_drop_resends: 3,
            interaction_timeout: Duration::from_secs(300),
            fee_bump_percent: 12,
        }
    }
}

/// Why a transaction is being (re)sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendKind {
    Initial,
    FeeBump,
    DropResend,
}

/// Terminal outcome of one supervised interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionOutcome {
    Confirmed(Receipt),

    /// Drop-retry bound or absolute budget exhausted.
    TimedOut,

    /// The nonce was consumed by a transaction this run never sent.
    ReplacedByUser { replacing_hash: String },
}

/// Callbacks recording supervisor progress as it happens, so a crash between
/// sends still leaves an accurate journal.
#[async_trait]
pub trait InteractionObserver: Send + Sync {
    async fn transaction_sent(
        &self,
        tx_hash: &str,
        fees: FeeSnapshot,
        kind: ResendKind,
    ) -> Result<(), ChainError>;

    async fn transaction_dropped(&self) -> Result<(), ChainError>;
}

/// Drive one submission through the network to a terminal state.
///
/// State machine: Building -> Sent -> PendingConfirmation, with fee bumps
/// looping back to Building, and Confirmed / ReplacedByUser / TimedOut as
/// terminal states. A dropped transaction is resubmitted (bounded); a stall
/// triggers a fee bump with strictly increasing fees; the absolute timeout
/// budget overrides everything.
pub async fn supervise_interaction(
    client: &dyn ChainClient,
    policy: &SupervisorPolicy,
    request: &TransactionRequest,
    nonce: u64,
    observer: &dyn InteractionObserver,
) -> Result<InteractionOutcome, ChainError> {
    let started = Instant::now();

    let mut fees = client.estimate_fees().await?;
    let mut tx_hash = client.submit(request, nonce, fees).await?;
    observer
        .transaction_sent(&tx_hash, fees, ResendKind::Initial)
        .await?;
    info!(nonce, tx_hash = %tx_hash, "transaction sent");

    let mut sent_hashes = vec![tx_hash.clone()];
    let mut last_send = Instant::now();
    let mut drop_resends = 0u32;

    loop {
        tokio::time::sleep(policy.poll_interval).await;

        if started.elapsed() >= policy.interaction_timeout {
            warn!(nonce, "interaction exceeded its timeout budget");
            return Ok(InteractionOutcome::TimedOut);
        }

        match client.poll(&tx_hash).await? {
            PollResult::Confirmed(receipt) => {
                info!(nonce, tx_hash = %tx_hash, "transaction confirmed");
                return Ok(InteractionOutcome::Confirmed(receipt));
            }

            PollResult::Replaced { by } => {
                if sent_hashes.contains(&by) {
                    // One of our own earlier sends won the race; follow it.
                    debug!(nonce, tx_hash = %by, "own resend confirmed instead");
                    tx_hash = by;
                    continue;
                }
                warn!(nonce, replacing_hash = %by, "nonce consumed by foreign transaction");
                return Ok(InteractionOutcome::ReplacedByUser { replacing_hash: by });
            }

            PollResult::Dropped => {
                observer.transaction_dropped().await?;
                drop_resends += 1;
                if drop_resends > policy.max_drop_resends {
                    warn!(nonce, drop_resends, "drop-resend bound exhausted");
                    return Ok(InteractionOutcome::TimedOut);
                }

                fees = next_fees(
                    client.estimate_fees().await.ok(),
                    fees,
                    policy.fee_bump_percent,
                );
                tx_hash = client.submit(request, nonce, fees).await?;
                observer
                    .transaction_sent(&tx_hash, fees, ResendKind::DropResend)
                    .await?;
                sent_hashes.push(tx_hash.clone());
                last_send = Instant::now();
                info!(nonce, tx_hash = %tx_hash, attempt = drop_resends, "dropped transaction resent");
            }

            PollResult::Pending => {
                if last_send.elapsed() >= policy.stall_threshold {
                    fees = next_fees(
                        client.estimate_fees().await.ok(),
                        fees,
                        policy.fee_bump_percent,
                    );
                    tx_hash = client.submit(request, nonce, fees).await?;
                    observer
                        .transaction_sent(&tx_hash, fees, ResendKind::FeeBump)
                        .await?;
                    sent_hashes.push(tx_hash.clone());
                    last_send = Instant::now();
                    info!(
                        nonce,
                        tx_hash = %tx_hash,
                        max_fee_per_gas = fees.max_fee_per_gas,
                        "fee bump resent"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravan_types::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Chain client scripted with a queue of poll results.
    struct ScriptedClient {
        polls: Mutex<VecDeque<PollResult>>,
        submissions: Mutex<Vec<(u64, FeeSnapshot)>>,
        next_hash: Mutex<u64>,
    }

    impl ScriptedClient {
        fn new(polls: Vec<PollResult>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
                submissions: Mutex::new(Vec::new()),
                next_hash: Mutex::new(0),
            }
        }

        fn submissions(&self) -> Vec<(u64, FeeSnapshot)> {
            self.submissions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainClient for ScriptedClient {
        async fn submit(
            &self,
            _request: &TransactionRequest,
            nonce: u64,
            fees: FeeSnapshot,
        ) -> Result<String, ChainError> {
            self.submissions.lock().unwrap().push((nonce, fees));
            let mut next = self.next_hash.lock().unwrap();
            *next += 1;
            Ok(format!("0xhash{next}"))
        }

        async fn poll(&self, _tx_hash: &str) -> Result<PollResult, ChainError> {
            Ok(self
                .polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(PollResult::Pending))
        }

        async fn estimate_fees(&self) -> Result<FeeSnapshot, ChainError> {
            Ok(FeeSnapshot {
                max_fee_per_gas: 100,
                max_priority_fee_per_gas: 10,
            })
        }

        async fn call(
            &self,
            _to: &str,
            _function: &str,
            _args: &[Value],
        ) -> Result<Value, ChainError> {
            unimplemented!()
        }

        async fn pending_nonce(&self, _account: &str) -> Result<u64, ChainError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        sent: Mutex<Vec<(String, FeeSnapshot, ResendKind)>>,
        dropped: Mutex<u32>,
    }

    #[async_trait]
    impl InteractionObserver for RecordingObserver {
        async fn transaction_sent(
            &self,
            tx_hash: &str,
            fees: FeeSnapshot,
            kind: ResendKind,
        ) -> Result<(), ChainError> {
            self.sent
                .lock()
                .unwrap()
                .push((tx_hash.to_string(), fees, kind));
            Ok(())
        }

        async fn transaction_dropped(&self) -> Result<(), ChainError> {
            *self.dropped.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn request() -> TransactionRequest {
        TransactionRequest::Send {
            to: "0xdest".to_string(),
            data: "0x".to_string(),
            value: 0,
        }
    }

    fn receipt() -> Receipt {
        Receipt {
            success: true,
            contract_address: None,
            logs: Vec::new(),
            revert_reason: None,
        }
    }

    fn fast_policy() -> SupervisorPolicy {
        SupervisorPolicy {
            poll_interval: Duration::from_millis(100),
            stall_threshold: Duration::from_millis(500),
            max_drop_resends: 2,
            interaction_timeout: Duration::from_secs(10),
            fee_bump_percent: 10,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirms_on_first_poll() {
        let client = ScriptedClient::new(vec![PollResult::Confirmed(receipt())]);
        let observer = RecordingObserver::default();

        let outcome =
            supervise_interaction(&client, &fast_policy(), &request(), 0, &observer)
                .await
                .unwrap();

        assert_eq!(outcome, InteractionOutcome::Confirmed(receipt()));
        assert_eq!(observer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_triggers_fee_bumps_with_increasing_fees() {
        // Never confirms: pending until the absolute budget runs out.
        let client = ScriptedClient::new(Vec::new());
        let observer = RecordingObserver::default();

        let outcome =
            supervise_interaction(&client, &fast_policy(), &request(), 0, &observer)
                .await
                .unwrap();

        assert_eq!(outcome, InteractionOutcome::TimedOut);

        let submissions = client.submissions();
        // Initial send plus one bump per elapsed stall interval.
        assert!(submissions.len() > 2, "expected fee bumps, got {submissions:?}");
        for pair in submissions.windows(2) {
            assert!(
                pair[1].1.max_fee_per_gas > pair[0].1.max_fee_per_gas,
                "fees must strictly increase"
            );
            assert!(pair[1].1.max_priority_fee_per_gas > pair[0].1.max_priority_fee_per_gas);
        }

        let sent = observer.sent.lock().unwrap();
        assert_eq!(sent[0].2, ResendKind::Initial);
        assert!(sent[1..].iter().all(|s| s.2 == ResendKind::FeeBump));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_transaction_is_resent_within_bound() {
        let client = ScriptedClient::new(vec![
            PollResult::Dropped,
            PollResult::Confirmed(receipt()),
        ]);
        let observer = RecordingObserver::default();

        let outcome =
            supervise_interaction(&client, &fast_policy(), &request(), 0, &observer)
                .await
                .unwrap();

        assert!(matches!(outcome, InteractionOutcome::Confirmed(_)));
        assert_eq!(*observer.dropped.lock().unwrap(), 1);
        assert_eq!(client.submissions().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_bound_exhaustion_times_out() {
        let client = ScriptedClient::new(vec![
            PollResult::Dropped,
            PollResult::Dropped,
            PollResult::Dropped,
        ]);
        let observer = RecordingObserver::default();

        let outcome =
            supervise_interaction(&client, &fast_policy(), &request(), 0, &observer)
                .await
                .unwrap();

        assert_eq!(outcome, InteractionOutcome::TimedOut);
        // max_drop_resends = 2: initial + two resends, then abandoned.
        assert_eq!(client.submissions().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_replacement_is_terminal() {
        let client = ScriptedClient::new(vec![PollResult::Replaced {
            by: "0xsomeoneelse".to_string(),
        }]);
        let observer = RecordingObserver::default();

        let outcome =
            supervise_interaction(&client, &fast_policy(), &request(), 0, &observer)
                .await
                .unwrap();

        assert_eq!(
            outcome,
            InteractionOutcome::ReplacedByUser {
                replacing_hash: "0xsomeoneelse".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_resend_confirmation_is_followed() {
        // First hash replaced by our own second send, which then confirms.
        let client = ScriptedClient::new(vec![
            PollResult::Dropped,
            PollResult::Replaced {
                by: "0xhash2".to_string(),
            },
            PollResult::Confirmed(receipt()),
        ]);
        let observer = RecordingObserver::default();

        let outcome =
            supervise_interaction(&client, &fast_policy(), &request(), 0, &observer)
                .await
                .unwrap();

        assert!(matches!(outcome, InteractionOutcome::Confirmed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_resends_after_timeout() {
        let client = ScriptedClient::new(Vec::new());
        let observer = RecordingObserver::default();
        let policy = SupervisorPolicy {
            interaction_timeout: Duration::from_millis(250),
            ..fast_policy()
        };

        supervise_interaction(&client, &policy, &request(), 0, &observer)
            .await
            .unwrap();

        // Only the initial submission: the budget elapsed before any stall.
        assert_eq!(client.submissions().len(), 1);
    }
}
