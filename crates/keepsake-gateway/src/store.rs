//! Persistence adapter: add, delete and live ordered queries over the journal
//! collections.
//!
//! Writes go to SQLite off the async runtime, then a change notice is broadcast.
//! Every live query re-reads its full ordered result set when a notice for its
//! collection arrives, so subscribers always hold a consistent snapshot.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use keepsake_core::session::{IntoSnapshot, Snapshot};
use keepsake_db::{Database, Table};
use keepsake_types::collection::{
    DraftError, HiddenMessages, Letters, Memories, Reminders, Songs,
};
use keepsake_types::events::StoreEvent;
use keepsake_types::models::{CollectionKind, Principal, RecordMeta};

use crate::dispatcher::Dispatcher;

/// Buffered snapshots per live query before the producer waits.
const SNAPSHOT_BUFFER: usize = 16;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl Store {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Validate and store a draft written by `author`.
    pub async fn add<C: Table>(
        &self,
        author: &Principal,
        draft: C::Draft,
    ) -> Result<C::Record, StoreError> {
        let author_name = if author.display_name.trim().is_empty() {
            author.email.clone()
        } else {
            author.display_name.clone()
        };
        let meta = RecordMeta {
            id: Uuid::new_v4(),
            author_id: author.id,
            author_name,
            // stored with microsecond precision
            created_at: Utc::now().trunc_subsecs(6),
        };
        let id = meta.id;
        let record = C::build(draft, meta)?;

        let db = self.db.clone();
        let row = record.clone();
        tokio::task::spawn_blocking(move || db.insert_record::<C>(&row)).await??;

        info!("{} added {} to {}", author.email, id, C::KIND);
        self.dispatcher.broadcast(StoreEvent::Added { collection: C::KIND, id });
        Ok(record)
    }

    /// Returns false when the record was already gone.
    pub async fn delete<C: Table>(&self, id: Uuid) -> Result<bool, StoreError> {
        let db = self.db.clone();
        let deleted =
            tokio::task::spawn_blocking(move || db.delete_record::<C>(&id.to_string())).await??;

        if deleted {
            info!("deleted {} from {}", id, C::KIND);
            self.dispatcher.broadcast(StoreEvent::Deleted { collection: C::KIND, id });
        }
        Ok(deleted)
    }

    /// One-shot ordered read.
    pub async fn list<C: Table>(&self) -> Result<Vec<C::Record>, StoreError> {
        let db = self.db.clone();
        Ok(tokio::task::spawn_blocking(move || db.list_records::<C>()).await??)
    }

    /// [`Store::delete`] for a collection only known at runtime.
    pub async fn delete_kind(&self, kind: CollectionKind, id: Uuid) -> Result<bool, StoreError> {
        match kind {
            CollectionKind::Reminders => self.delete::<Reminders>(id).await,
            CollectionKind::Letters => self.delete::<Letters>(id).await,
            CollectionKind::HiddenMessages => self.delete::<HiddenMessages>(id).await,
            CollectionKind::Memories => self.delete::<Memories>(id).await,
            CollectionKind::Songs => self.delete::<Songs>(id).await,
        }
    }

    /// Live ordered query over one collection.
    pub fn subscribe<C: Table>(&self) -> LiveQuery<Vec<C::Record>> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let subscription = self.watch::<C, _>(tx, |records| records);
        LiveQuery { rx, subscription }
    }

    /// Live query for a collection only known at runtime, delivering into a
    /// channel shared with other subscriptions.
    pub fn subscribe_into(&self, kind: CollectionKind, tx: mpsc::Sender<Snapshot>) -> Subscription {
        match kind {
            CollectionKind::Reminders => self.watch_snapshots::<Reminders>(tx),
            CollectionKind::Letters => self.watch_snapshots::<Letters>(tx),
            CollectionKind::HiddenMessages => self.watch_snapshots::<HiddenMessages>(tx),
            CollectionKind::Memories => self.watch_snapshots::<Memories>(tx),
            CollectionKind::Songs => self.watch_snapshots::<Songs>(tx),
        }
    }

    fn watch_snapshots<C: Table + IntoSnapshot>(&self, tx: mpsc::Sender<Snapshot>) -> Subscription {
        self.watch::<C, _>(tx, C::snapshot)
    }

    fn watch<C, T>(&self, tx: mpsc::Sender<T>, map: fn(Vec<C::Record>) -> T) -> Subscription
    where
        C: Table,
        T: Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let db = self.db.clone();
        // subscribe before the first read so no change slips between the two
        let mut events = self.dispatcher.subscribe();

        tokio::spawn(async move {
            loop {
                let db = db.clone();
                let records = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    res = tokio::task::spawn_blocking(move || db.list_records::<C>()) => res,
                };

                match records {
                    Ok(Ok(records)) => {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            sent = tx.send(map(records)) => if sent.is_err() { break },
                        }
                    }
                    Ok(Err(e)) => warn!("live query on {} failed to read: {}", C::KIND, e),
                    Err(e) => warn!("live query on {} read task failed: {}", C::KIND, e),
                }

                // wait for the next change to this collection
                loop {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return,
                        event = events.recv() => match event {
                            Ok(event) if event.collection() == C::KIND => break,
                            Ok(_) => continue,
                            Err(RecvError::Lagged(n)) => {
                                warn!("live query on {} lagged by {} notices", C::KIND, n);
                                break;
                            }
                            Err(RecvError::Closed) => return,
                        },
                    }
                }
            }
            debug!("live query on {} stopped", C::KIND);
        });

        Subscription { cancel }
    }
}

/// Handle to a running live query. Cancels the query when dropped.
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
}

impl Subscription {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A typed live query: the current ordered result set first, then a fresh one
/// after every change, until cancelled.
pub struct LiveQuery<T> {
    rx: mpsc::Receiver<T>,
    subscription: Subscription,
}

impl<T> LiveQuery<T> {
    /// Next snapshot, or `None` once the query has stopped.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn cancel(&self) {
        self.subscription.cancel();
    }
}
