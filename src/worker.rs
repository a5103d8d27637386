//! The correlation worker service.
//!
//! Pairwise correlation is the one pipeline stage slow enough to leave the
//! caller's thread: [`CorrelationService`] owns a dedicated worker thread
//! and a request/response channel pair, so the embedding layer submits a
//! matrix and consumes replies as messages. Requests are independent:
//! submitting a new one never cancels a prior one; both resolve, and the
//! caller discards stale replies by comparing [`CorrelationRequest::
//! signature`] against the currently-desired inputs.
//!
//! The service is an explicit, lifecycle-managed object: construct it with
//! [`CorrelationService::start`], shut it down with
//! [`CorrelationService::dispose`]. Nothing here lives at module scope.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::{
    correlate::{compute_edges_cancellable, CorrelationParams, EdgeList},
    error::CorrNetError,
};

/// One unit of correlation work: a numeric matrix plus scan parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRequest {
    pub id: Uuid,
    pub rows: Vec<Vec<f64>>,
    pub params: CorrelationParams,
}

impl CorrelationRequest {
    /// Content hash of the inputs (matrix, method, cutoff, sign policy),
    /// independent of the request id. Two requests with equal signatures
    /// produce equal results, which is how callers detect stale replies.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        for row in &self.rows {
            hasher.update([0u8]);
            for value in row {
                hasher.update(value.to_bits().to_be_bytes());
            }
        }
        hasher.update(match self.params.method {
            crate::correlate::CorrelationMethod::Pearson => [1u8],
            crate::correlate::CorrelationMethod::Spearman => [2u8],
        });
        hasher.update(self.params.min_abs_corr.to_bits().to_be_bytes());
        hasher.update([self.params.take_abs as u8]);
        hex::encode(hasher.finalize())
    }
}

/// How a request resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CorrelationOutcome {
    Edges(EdgeList),
    /// The request was aborted before the scan finished.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReply {
    pub id: Uuid,
    pub outcome: CorrelationOutcome,
}

type AbortFlags = Arc<Mutex<HashMap<Uuid, Arc<AtomicBool>>>>;

/// Handle to the running worker. Dropping the handle without calling
/// [`dispose`](CorrelationService::dispose) also stops the worker (the
/// request channel closes), but dispose additionally joins the thread.
pub struct CorrelationService {
    requests: UnboundedSender<CorrelationRequest>,
    flags: AbortFlags,
    handle: Option<JoinHandle<()>>,
}

impl CorrelationService {
    /// Spawn the worker thread. Returns the service handle and the reply
    /// stream the caller consumes.
    pub fn start() -> Result<(CorrelationService, UnboundedReceiver<CorrelationReply>), CorrNetError>
    {
        let (requests, mut request_rx) = unbounded_channel::<CorrelationRequest>();
        let (reply_tx, replies) = unbounded_channel::<CorrelationReply>();
        let flags: AbortFlags = Arc::new(Mutex::new(HashMap::new()));

        let worker_flags = flags.clone();
        let handle = std::thread::Builder::new()
            .name("corrnet-correlation".to_string())
            .spawn(move || {
                while let Some(request) = request_rx.blocking_recv() {
                    let flag = worker_flags
                        .lock()
                        .get(&request.id)
                        .cloned()
                        .unwrap_or_default();
                    tracing::debug!(id = %request.id, rows = request.rows.len(), "correlation request");
                    let outcome =
                        match compute_edges_cancellable(&request.rows, &request.params, &flag) {
                            Some(edges) => CorrelationOutcome::Edges(edges),
                            None => CorrelationOutcome::Cancelled,
                        };
                    worker_flags.lock().remove(&request.id);
                    if reply_tx
                        .send(CorrelationReply {
                            id: request.id,
                            outcome,
                        })
                        .is_err()
                    {
                        tracing::debug!("reply receiver dropped, stopping correlation worker");
                        break;
                    }
                }
            })
            .map_err(|e| CorrNetError::Worker(format!("could not spawn worker thread: {e}")))?;

        Ok((
            CorrelationService {
                requests,
                flags,
                handle: Some(handle),
            },
            replies,
        ))
    }

    /// Queue a correlation run. The returned id ties the eventual reply
    /// back to this submission.
    pub fn submit(
        &self,
        rows: Vec<Vec<f64>>,
        params: CorrelationParams,
    ) -> Result<Uuid, CorrNetError> {
        let id = Uuid::new_v4();
        self.flags
            .lock()
            .insert(id, Arc::new(AtomicBool::new(false)));
        self.requests.send(CorrelationRequest { id, rows, params })?;
        Ok(id)
    }

    /// Abort a queued or running request. The request still resolves,
    /// with [`CorrelationOutcome::Cancelled`]. Unknown or already-finished
    /// ids are a no-op.
    pub fn abort(&self, id: Uuid) {
        if let Some(flag) = self.flags.lock().get(&id) {
            flag.store(true, Ordering::Relaxed);
            tracing::debug!(%id, "correlation request aborted");
        }
    }

    /// Requests submitted but not yet resolved.
    pub fn in_flight(&self) -> usize {
        self.flags.lock().len()
    }

    /// Abort everything outstanding, close the request channel and join
    /// the worker thread.
    pub fn dispose(mut self) {
        for flag in self.flags.lock().values() {
            flag.store(true, Ordering::Relaxed);
        }
        drop(self.requests);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("correlation worker thread panicked during shutdown");
            }
        }
    }
}
