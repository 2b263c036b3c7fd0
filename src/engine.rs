//! The reprocessing engine.
//!
//! Selects stored messages, gates them on current status unless forced,
//! decodes each body, resolves the topic's handlers and invokes them in
//! order, writing a `Complete` status after every successful handler.
//!
//! Failure policy is asymmetric: decode failures and missing handlers are
//! per-message events that the loop records and skips past, while handler
//! resolution or invocation failures propagate and end the run.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    decode::MessageDecoder,
    error::Error,
    handler::{HandlerDescriptor, HandlerRegistry, TargetResolver},
    message::{MessageStatus, ReplaySelection},
    store::Store,
};

/// Outcome of one `reprocess` call.
///
/// `processed` counts every message the selection matched; the other
/// counters partition it. `status_writes` counts `Complete` writes: a topic
/// with N handlers writes N times per message, so this can exceed
/// `dispatched`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReprocessReport {
    pub processed: usize,
    pub skipped_not_new: usize,
    pub decode_failed: usize,
    pub no_handler: usize,
    pub dispatched: usize,
    pub status_writes: usize,
    pub dispatches: Vec<DispatchRecord>,
}

impl ReprocessReport {
    pub fn summary(&self) -> String {
        format!(
            "Processed {} message(s): {} dispatched, {} skipped (not new), {} decode failure(s), {} without handler",
            self.processed, self.dispatched, self.skipped_not_new, self.decode_failed, self.no_handler
        )
    }
}

/// Which handlers ran for a dispatched message.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchRecord {
    pub message_id: i64,
    pub handlers: Vec<HandlerDescriptor>,
}

/// Replays stored messages against their registered handlers.
#[derive(bon::Builder)]
pub struct Reprocessor {
    store: Store,
    decoder: Arc<dyn MessageDecoder>,
    registry: HandlerRegistry,
    targets: TargetResolver,
}

impl Reprocessor {
    /// Run the selection to completion and report what happened.
    ///
    /// Messages are visited in store order; no ordering is imposed here.
    /// There is no claim step between the status check and the `Complete`
    /// write: two concurrent runs can both observe a message as `New` and
    /// both dispatch it.
    ///
    /// Store failures and handler failures return `Err` immediately; decode
    /// failures and handlerless topics are recorded in the report and the
    /// loop continues.
    pub async fn reprocess(&self, selection: &ReplaySelection) -> Result<ReprocessReport, Error> {
        let messages = self.store.find_messages(selection).await?;

        let mut report = ReprocessReport::default();

        for message in messages {
            report.processed += 1;

            if !selection.force {
                let status = self.store.current_status(message.id).await?;
                if status != Some(MessageStatus::New.code()) {
                    report.skipped_not_new += 1;
                    continue;
                }
            }

            let decoded = match self.decoder.decode(&message.topic_name, &message.body) {
                Ok(decoded) => decoded,
                Err(err) => {
                    warn!(id = message.id, topic = %message.topic_name, %err, "skipping undecodable message");
                    report.decode_failed += 1;
                    continue;
                }
            };

            let handlers = self.registry.handlers_for_topic(&message.topic_name);

            if handlers.is_empty() {
                warn!(id = message.id, topic = %message.topic_name, "no handler found");
                report.no_handler += 1;
                continue;
            }

            let mut record = DispatchRecord {
                message_id: message.id,
                handlers: Vec::new(),
            };

            for descriptor in handlers {
                info!(id = message.id, handler = %descriptor, "dispatching message");

                let target = self.targets.resolve(&descriptor.target)?;

                target
                    .invoke(&descriptor.method, &decoded)
                    .await
                    .map_err(|source| Error::Dispatch {
                        target: descriptor.target.clone(),
                        method: descriptor.method.clone(),
                        message_id: message.id,
                        source: Some(source),
                    })?;

                self.store.mark_complete(message.id).await?;
                report.status_writes += 1;

                record.handlers.push(descriptor.clone());
            }

            report.dispatched += 1;
            report.dispatches.push(record);
        }

        Ok(report)
    }
}
