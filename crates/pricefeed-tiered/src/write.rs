//! Authorized writes to the authoritative source.

use pricefeed_core::{Answer, RoundRecord, SignerIdentity};
use pricefeed_storage::{DynCacheTier, DynOracleReader, DynOracleWriter, DynRoundStore, RecordKey};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::WriteError;
use crate::retry::{RetryError, RetryPolicy, retry};

/// Outcome of an accepted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub tx_reference: String,
    /// The round read back after the mutation, tagged with `tx_reference`.
    pub record: RoundRecord,
}

/// Submits new values on behalf of a single configured signer.
pub struct WriteCoordinator {
    writer: DynOracleWriter,
    reader: DynOracleReader,
    cache: DynCacheTier,
    store: DynRoundStore,
    signer: SignerIdentity,
    policy: RetryPolicy,
}

impl WriteCoordinator {
    pub fn new(
        writer: DynOracleWriter,
        reader: DynOracleReader,
        cache: DynCacheTier,
        store: DynRoundStore,
        signer: SignerIdentity,
    ) -> Self {
        Self {
            writer,
            reader,
            cache,
            store,
            signer,
            policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The identity this coordinator signs with.
    pub fn signer(&self) -> &SignerIdentity {
        &self.signer
    }

    /// Validate, authorize, submit and reconcile a new value.
    ///
    /// The steps run strictly in order:
    ///
    /// 1. `raw_value` is parsed; malformed input never reaches the source.
    /// 2. The authorized identity is read once, without retry, and compared
    ///    to the configured signer.
    /// 3. The value is submitted through the retry executor.
    /// 4. The new latest round is read back through the retry executor.
    /// 5. The cache entry for `latest` is removed and the refreshed round is
    ///    appended to the durable store with the transaction reference.
    ///
    /// Step 5 failures are logged and do not fail the write, and
    /// cancellation during step 5 skips what is left of it. If step 4 fails
    /// the mutation has already been accepted; the returned
    /// [`WriteError::Refresh`] carries its transaction reference and neither
    /// the cache nor the durable store is touched.
    pub async fn submit(
        &self,
        raw_value: &str,
        cancel: &CancellationToken,
    ) -> Result<WriteReceipt, WriteError> {
        let value = Answer::parse(raw_value)?;
        self.writer
            .check_value(&value)
            .map_err(WriteError::UnsupportedValue)?;

        self.authorize(cancel).await?;

        let tx_reference = match retry(&self.policy, cancel, || self.writer.submit(&value)).await {
            Ok(tx_reference) => tx_reference,
            Err(RetryError::Cancelled) => return Err(WriteError::Cancelled),
            Err(e) => return Err(WriteError::Submission(e)),
        };
        info!(%tx_reference, value = %value, "Value submitted");

        let refreshed = match retry(&self.policy, cancel, || self.reader.latest()).await {
            Ok(record) => record,
            Err(source) => {
                error!(
                    %tx_reference,
                    error = %source,
                    "Submitted value could not be read back; cache and durable store not updated"
                );
                return Err(WriteError::Refresh {
                    tx_reference,
                    source,
                });
            }
        };

        let record = refreshed.with_tx_reference(tx_reference.clone());
        self.reconcile(&record, cancel).await;

        Ok(WriteReceipt {
            tx_reference,
            record,
        })
    }

    async fn authorize(&self, cancel: &CancellationToken) -> Result<(), WriteError> {
        let authorized = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WriteError::Cancelled),
            identity = self.writer.current_authorized_identity() => identity,
        }
        .map_err(WriteError::AuthorizationCheck)?;

        if authorized != self.signer {
            warn!(
                signer = %self.signer,
                authorized = %authorized,
                "Write refused: signer is not the authorized writer"
            );
            return Err(WriteError::Unauthorized {
                signer: self.signer.clone(),
                authorized,
            });
        }
        Ok(())
    }

    // Both steps run even if the first fails. Cancellation stops the rest.
    async fn reconcile(&self, record: &RoundRecord, cancel: &CancellationToken) {
        let latest = RecordKey::Latest.cache_key();
        match unless_cancelled(cancel, self.cache.delete(&latest)).await {
            Some(Ok(())) => {}
            Some(Err(e)) => error!(
                key = %latest,
                backend = self.cache.backend_name(),
                error = %e,
                "Failed to invalidate cached latest record after write"
            ),
            None => return abandoned(record),
        }

        match unless_cancelled(cancel, self.store.insert(record)).await {
            Some(Ok(())) => {}
            Some(Err(e)) => error!(
                round_id = record.round_id,
                tx_reference = record.tx_reference.as_deref().unwrap_or_default(),
                backend = self.store.backend_name(),
                error = %e,
                "Failed to persist written record"
            ),
            None => abandoned(record),
        }
    }
}

async fn unless_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        value = fut => Some(value),
    }
}

fn abandoned(record: &RoundRecord) {
    error!(
        round_id = record.round_id,
        tx_reference = record.tx_reference.as_deref().unwrap_or_default(),
        "Reconciliation abandoned, request cancelled; fast tiers may be stale"
    );
}
