//! Keyed single-flight table for load/generate tasks.
//!
//! The first request for a key spawns the task; every later request for
//! the same key subscribes to its broadcast channel, so all waiters
//! observe one identical outcome. Dropping a single waiter never cancels
//! the shared task; an explicit `clear` aborts everything and resolves
//! every waiter with `Cancelled`.

use std::future::Future;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::{MeshError, MeshResult};
use crate::mesh::MeshResource;

type LoadOutcome = MeshResult<Arc<MeshResource>>;

struct InflightTask {
    sender: broadcast::Sender<LoadOutcome>,
    handle: JoinHandle<()>,
}

pub(crate) struct InflightTable {
    tasks: Arc<DashMap<String, InflightTask>>,
}

impl InflightTable {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Await the in-flight task for `key`, starting one with `make` if
    /// none exists.
    pub async fn run<F>(&self, key: &str, make: impl FnOnce() -> F) -> LoadOutcome
    where
        F: Future<Output = LoadOutcome> + Send + 'static,
    {
        let mut receiver = match self.tasks.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.get().sender.subscribe(),
            Entry::Vacant(entry) => {
                // Only one outcome ever flows through the channel.
                let (sender, receiver) = broadcast::channel(1);
                let future = make();
                let tasks = Arc::clone(&self.tasks);
                let task_key = key.to_string();
                let task_sender = sender.clone();
                let handle = tokio::spawn(async move {
                    let outcome = future.await;
                    // Drop the table entry before broadcasting, so a
                    // request landing after the send starts fresh instead
                    // of subscribing to a finished channel.
                    tasks.remove(&task_key);
                    let _ = task_sender.send(outcome);
                });
                entry.insert(InflightTask { sender, handle });
                receiver
            }
        };

        match receiver.recv().await {
            Ok(outcome) => outcome,
            // Every sender dropped without a value: the task was aborted.
            Err(_) => Err(MeshError::Cancelled {
                source_id: key.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Abort every in-flight task and drop its table entry. Waiters
    /// resolve with `Cancelled` rather than hanging.
    pub fn clear(&self) {
        self.tasks.retain(|_, task| {
            task.handle.abort();
            false
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn mesh() -> Arc<MeshResource> {
        Arc::new(MeshResource::new(
            vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            None,
            vec![0, 1, 2],
        ))
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_task() {
        let table = Arc::new(InflightTable::new());
        let launches = Arc::new(AtomicUsize::new(0));

        let mut waiters = Vec::new();
        for _ in 0..16 {
            let table = Arc::clone(&table);
            let launches = Arc::clone(&launches);
            waiters.push(tokio::spawn(async move {
                table
                    .run("rock", move || async move {
                        launches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(mesh())
                    })
                    .await
            }));
        }

        let mut handles = Vec::new();
        for waiter in waiters {
            handles.push(waiter.await.unwrap().unwrap());
        }
        assert_eq!(launches.load(Ordering::SeqCst), 1);
        for pair in handles.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn failures_broadcast_to_every_waiter() {
        let table = Arc::new(InflightTable::new());

        let mut waiters = Vec::new();
        for _ in 0..4 {
            let table = Arc::clone(&table);
            waiters.push(tokio::spawn(async move {
                table
                    .run("broken", || async {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Err(MeshError::NoMeshFound {
                            source_id: "broken".to_string(),
                        })
                    })
                    .await
            }));
        }

        for waiter in waiters {
            assert!(matches!(
                waiter.await.unwrap(),
                Err(MeshError::NoMeshFound { .. })
            ));
        }
    }

    #[tokio::test]
    async fn clear_cancels_waiters() {
        let table = Arc::new(InflightTable::new());

        let waiter = {
            let table = Arc::clone(&table);
            tokio::spawn(async move {
                table
                    .run("slow", || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(mesh())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(table.len(), 1);
        table.clear();

        let outcome = waiter.await.unwrap();
        assert!(matches!(outcome, Err(MeshError::Cancelled { .. })));
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn dropping_one_waiter_leaves_the_task_running() {
        let table = Arc::new(InflightTable::new());

        let dropped = {
            let table = Arc::clone(&table);
            tokio::spawn(async move {
                table
                    .run("shared", || async {
                        tokio::time::sleep(Duration::from_millis(40)).await;
                        Ok(mesh())
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        dropped.abort();

        // If the shared task had died with its waiter, this closure would
        // run and the outcome would be an error.
        let survivor = table
            .run("shared", || async {
                Err(MeshError::NoMeshFound {
                    source_id: "restarted".to_string(),
                })
            })
            .await;
        assert!(survivor.is_ok());
    }
}
