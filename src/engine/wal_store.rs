use std::io;
use std::path::Path;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::limits::WAL_CHANNEL_DEPTH;
use crate::model::*;
use crate::wal::Wal;

use super::store::{ReservationStore, StoreError, in_bucket, vendor_in_week};

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    Stats {
        response: oneshot::Sender<WalStats>,
    },
}

/// Counters kept by the writer task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalStats {
    /// Events appended since the log was last rewritten.
    pub appends_since_compact: u64,
    /// Batches committed, one fsync each.
    pub commits: u64,
}

type Pending = (Event, oneshot::Sender<io::Result<()>>);

/// Owns the log. Blocks for one append, drains whatever else is already
/// queued, then commits the whole batch with a single fsync.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    let mut commits = 0u64;
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_control(&mut wal, commits, other);
                continue;
            }
        };
        let mut batch: Vec<Pending> = vec![(event, response)];
        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    deferred = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }
        commit_batch(&mut wal, batch);
        commits += 1;
        if let Some(other) = deferred {
            handle_control(&mut wal, commits, other);
        }
    }
    tracing::debug!("WAL writer for {} stopped", wal.path().display());
}

fn commit_batch(wal: &mut Wal, batch: Vec<Pending>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();

    let mut result = Ok(());
    for (event, _) in &batch {
        if let Err(e) = wal.append_buffered(event) {
            result = Err(e);
            break;
        }
    }
    // Flush even after an append error so stray buffered bytes don't end up
    // in front of the next batch.
    let flushed = wal.flush_sync();
    if result.is_ok() {
        result = flushed;
    }
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());

    for (_, tx) in batch {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_control(wal: &mut Wal, commits: u64, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let _ = response.send(wal.compact(&events));
        }
        WalCommand::Stats { response } => {
            let _ = response.send(WalStats {
                appends_since_compact: wal.appends_since_compact(),
                commits,
            });
        }
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

/// Durable store: the reservation book in memory, every change written
/// ahead to an append-only log and replayed on open.
///
/// A mutation waits for its event to be fsynced before taking the book's
/// write lock to apply it, so concurrent mutations share one commit. A failed
/// write never shows up in memory. Mutations hold the commit gate shared from
/// append to apply; compaction holds it exclusively, so its snapshot never
/// misses an event that is already in the log.
pub struct WalStore {
    book: RwLock<ReservationBook>,
    commit_gate: RwLock<()>,
    wal_tx: mpsc::Sender<WalCommand>,
}

impl WalStore {
    /// Replay the log at `path` and spawn its writer task. Must be called
    /// inside a tokio runtime.
    pub fn open(path: &Path) -> io::Result<Self> {
        let replay = Wal::replay(path)?;
        let mut book = ReservationBook::new();
        for event in &replay.events {
            event.apply(&mut book);
        }
        tracing::info!(
            "replayed {} events from {}: {} live reservations",
            replay.events.len(),
            path.display(),
            book.len()
        );

        let wal = Wal::open(path)?;
        let (wal_tx, wal_rx) = mpsc::channel(WAL_CHANNEL_DEPTH);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        Ok(Self {
            book: RwLock::new(book),
            commit_gate: RwLock::new(()),
            wal_tx,
        })
    }

    async fn wal_append(&self, event: Event) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append { event, response: tx })
            .await
            .map_err(|_| StoreError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::Wal(e.to_string()))
    }

    /// Rewrite the log with one creation event per live reservation.
    pub async fn compact(&self) -> Result<(), StoreError> {
        // Held across the rewrite so no mutation can slip in between the
        // snapshot and the swap.
        let _gate = self.commit_gate.write().await;
        let events: Vec<Event> = self
            .book
            .read()
            .await
            .iter()
            .map(|r| Event::ReservationCreated {
                id: r.id,
                vendor: r.vendor.clone(),
                instant: r.instant,
            })
            .collect();

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| StoreError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::Wal(e.to_string()))
    }

    pub async fn stats(&self) -> WalStats {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::Stats { response: tx })
            .await
            .is_err()
        {
            return WalStats::default();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn appends_since_compact(&self) -> u64 {
        self.stats().await.appends_since_compact
    }

    pub async fn len(&self) -> usize {
        self.book.read().await.len()
    }
}

#[async_trait]
impl ReservationStore for WalStore {
    async fn find_all(&self) -> Result<Vec<Reservation>, StoreError> {
        Ok(self.book.read().await.iter().cloned().collect())
    }

    async fn find_by_vendor(&self, vendor: &str) -> Result<Vec<Reservation>, StoreError> {
        let book = self.book.read().await;
        Ok(book.iter().filter(|r| r.vendor == vendor).cloned().collect())
    }

    async fn find_by_vendor_in_week(
        &self,
        vendor: &str,
        week: IsoWeek,
    ) -> Result<Vec<Reservation>, StoreError> {
        Ok(vendor_in_week(&*self.book.read().await, vendor, week))
    }

    async fn find_by_day_or_shift(
        &self,
        day: NaiveDate,
        shift: Shift,
    ) -> Result<Vec<Reservation>, StoreError> {
        Ok(in_bucket(&*self.book.read().await, day, shift))
    }

    async fn find_exact(
        &self,
        vendor: &str,
        instant: NaiveDateTime,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self.book.read().await.find_exact(vendor, instant).cloned())
    }

    async fn insert(
        &self,
        vendor: &str,
        instant: NaiveDateTime,
    ) -> Result<ReservationId, StoreError> {
        let id = Ulid::new();
        let event = Event::ReservationCreated {
            id,
            vendor: vendor.to_string(),
            instant,
        };
        let _gate = self.commit_gate.read().await;
        self.wal_append(event.clone()).await?;
        event.apply(&mut *self.book.write().await);
        Ok(id)
    }

    async fn delete(&self, id: ReservationId) -> Result<bool, StoreError> {
        let _gate = self.commit_gate.read().await;
        if self.book.read().await.get(id).is_none() {
            return Ok(false);
        }
        self.wal_append(Event::ReservationDeleted { id }).await?;
        // A racing delete of the same id may have applied first; only one
        // caller reports the removal.
        Ok(self.book.write().await.remove(id).is_some())
    }
}
