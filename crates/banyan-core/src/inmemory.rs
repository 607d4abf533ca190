//! Deterministic in-memory backend for testing and simulation.
//!
//! [`DeterministicBackend`] implements every capability trait against a
//! process-local key space, mirroring the atomic script contracts of a real
//! Redis-compatible backend without network I/O:
//!
//! - TTLs are tracked as wall-clock deadlines and enforced lazily on access.
//! - The latch TTL refresh uses `PEXPIRE KEY TTL GT` semantics: a deadline never
//!   shrinks.
//! - Pub/sub is one broadcast channel per channel name; a publish with no
//!   subscriber is dropped, exactly like a Redis `PUBLISH` to nobody.
//!
//! Because several coordination instances in one test share a single
//! `Arc<DeterministicBackend>`, the backend behaves like one server observed
//! by many clients.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::error::BackendError;
use crate::traits::CountDownLatchBackend;
use crate::traits::LockBackend;
use crate::traits::SemaphoreBackend;

/// Capacity of each per-channel broadcast buffer.
const CHANNEL_CAPACITY: usize = 64;

/// Current Unix timestamp in milliseconds.
fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// A string value with an expiry deadline.
struct StringEntry {
    value: String,
    deadline_ms: u64,
}

/// A set with an optional whole-set expiry deadline.
#[derive(Default)]
struct SetEntry {
    members: HashSet<String>,
    deadline_ms: Option<u64>,
}

/// String and set keys, guarded together so every scripted operation is
/// atomic with respect to the others.
#[derive(Default)]
struct KeySpace {
    strings: HashMap<String, StringEntry>,
    sets: HashMap<String, SetEntry>,
}

impl KeySpace {
    /// Drop the string at `key` if its deadline has passed.
    fn purge_string(&mut self, key: &str, now: u64) {
        if let Some(entry) = self.strings.get(key)
            && entry.deadline_ms <= now
        {
            self.strings.remove(key);
        }
    }

    /// Drop the set at `key` if its deadline has passed.
    fn purge_set(&mut self, key: &str, now: u64) {
        if let Some(entry) = self.sets.get(key)
            && let Some(deadline) = entry.deadline_ms
            && deadline <= now
        {
            self.sets.remove(key);
        }
    }

    /// True when a live (unexpired) string exists at `key`.
    fn has_live_string(&mut self, key: &str, now: u64) -> bool {
        self.purge_string(key, now);
        self.strings.contains_key(key)
    }
}

/// In-memory implementation of all backend capability traits.
pub struct DeterministicBackend {
    keyspace: Mutex<KeySpace>,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl Default for DeterministicBackend {
    fn default() -> Self {
        Self {
            keyspace: Mutex::new(KeySpace::default()),
            channels: Mutex::new(HashMap::new()),
        }
    }
}

impl DeterministicBackend {
    /// Create a new in-memory backend wrapped in `Arc`.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver `message` to current subscribers of `channel`, if any.
    async fn publish(&self, channel: &str, message: &str) {
        let channels = self.channels.lock().await;
        if let Some(sender) = channels.get(channel) {
            // A send error just means nobody is subscribed right now.
            let delivered = sender.send(message.to_string()).unwrap_or(0);
            debug!(channel, message, delivered, "published");
        }
    }
}

#[async_trait]
impl LockBackend for DeterministicBackend {
    async fn set_lock(&self, key: &str, owner: &str, ttl: Duration) -> Result<Option<String>, BackendError> {
        let now = now_unix_ms();
        let mut guard = self.keyspace.lock().await;
        let space = &mut *guard;
        if space.has_live_string(key, now) {
            return Ok(None);
        }
        space.strings.insert(key.to_string(), StringEntry {
            value: owner.to_string(),
            deadline_ms: now + ttl.as_millis() as u64,
        });
        Ok(Some("OK".to_string()))
    }

    async fn remove_lock(&self, key: &str, owner: &str) -> Result<Option<String>, BackendError> {
        let now = now_unix_ms();
        let mut guard = self.keyspace.lock().await;
        let space = &mut *guard;
        space.purge_string(key, now);
        let owned = space.strings.get(key).is_some_and(|entry| entry.value == owner);
        if owned {
            space.strings.remove(key);
            Ok(Some("OK".to_string()))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl SemaphoreBackend for DeterministicBackend {
    async fn set_semaphore_lock(
        &self,
        leasers_key: &str,
        marker_prefix: &str,
        owner: &str,
        max_leases: u32,
        ttl: Duration,
    ) -> Result<Option<String>, BackendError> {
        let now = now_unix_ms();
        let deadline = now + ttl.as_millis() as u64;
        let mut guard = self.keyspace.lock().await;
        let space = &mut *guard;
        space.purge_set(leasers_key, now);

        let entry = space.sets.entry(leasers_key.to_string()).or_default();
        let added = entry.members.insert(owner.to_string());
        if entry.members.len() as u32 > max_leases {
            // Bound violated: roll back the add.
            if added {
                entry.members.remove(owner);
            }
            if entry.members.is_empty() {
                space.sets.remove(leasers_key);
            }
            return Ok(None);
        }
        entry.deadline_ms = Some(deadline);
        space.strings.insert(format!("{marker_prefix}:{owner}"), StringEntry {
            value: owner.to_string(),
            deadline_ms: deadline,
        });
        Ok(Some("OK".to_string()))
    }

    async fn remove_semaphore_lock(
        &self,
        leasers_key: &str,
        marker_prefix: &str,
        owner: &str,
    ) -> Result<Option<String>, BackendError> {
        let mut guard = self.keyspace.lock().await;
        let space = &mut *guard;
        space.strings.remove(&format!("{marker_prefix}:{owner}"));
        if let Some(entry) = space.sets.get_mut(leasers_key) {
            entry.members.remove(owner);
            if entry.members.is_empty() {
                space.sets.remove(leasers_key);
            }
        }
        Ok(Some("OK".to_string()))
    }

    async fn clean_up_expired_semaphore_locks(
        &self,
        leasers_key: &str,
        marker_prefix: &str,
    ) -> Result<Option<String>, BackendError> {
        let now = now_unix_ms();
        let mut guard = self.keyspace.lock().await;
        let space = &mut *guard;
        space.purge_set(leasers_key, now);

        let Some(entry) = space.sets.get(leasers_key) else {
            return Ok(Some("OK".to_string()));
        };
        let leasers: Vec<String> = entry.members.iter().cloned().collect();
        for leaser in leasers {
            let marker_key = format!("{marker_prefix}:{leaser}");
            if !space.has_live_string(&marker_key, now) {
                // Marker gone: the holder died without releasing.
                if let Some(entry) = space.sets.get_mut(leasers_key) {
                    entry.members.remove(&leaser);
                }
            }
        }
        if space.sets.get(leasers_key).is_some_and(|entry| entry.members.is_empty()) {
            space.sets.remove(leasers_key);
        }
        Ok(Some("OK".to_string()))
    }
}

#[async_trait]
impl CountDownLatchBackend for DeterministicBackend {
    async fn count(
        &self,
        latch_key: &str,
        channel: &str,
        client_id: &str,
        count: i64,
        initial_count: u32,
        ttl: Duration,
    ) -> Result<Option<String>, BackendError> {
        let now = now_unix_ms();
        let candidate = now + ttl.as_millis() as u64;
        let opened;
        {
            let mut space = self.keyspace.lock().await;
            space.purge_set(latch_key, now);

            let entry = space.sets.entry(latch_key.to_string()).or_default();
            entry.members.insert(format!("{client_id}:{count}"));
            // PEXPIRE KEY TTL GT: the latch deadline only ever grows.
            entry.deadline_ms = Some(match entry.deadline_ms {
                Some(existing) => existing.max(candidate),
                None => candidate,
            });
            opened = entry.members.len() as u32 >= initial_count;
        }
        if opened {
            self.publish(channel, "open").await;
        }
        Ok(Some("OK".to_string()))
    }

    async fn undo_count(&self, latch_key: &str, client_id: &str, count: i64) -> Result<Option<i64>, BackendError> {
        let now = now_unix_ms();
        let mut space = self.keyspace.lock().await;
        space.purge_set(latch_key, now);

        let removed = match space.sets.get_mut(latch_key) {
            Some(entry) => i64::from(entry.members.remove(&format!("{client_id}:{count}"))),
            None => 0,
        };
        Ok(Some(removed))
    }

    async fn check_count(&self, latch_key: &str) -> Result<Option<i64>, BackendError> {
        let now = now_unix_ms();
        let mut space = self.keyspace.lock().await;
        space.purge_set(latch_key, now);

        let cardinality = space.sets.get(latch_key).map_or(0, |entry| entry.members.len() as i64);
        Ok(Some(cardinality))
    }

    async fn listen(&self, channel: &str) -> Result<BoxStream<'static, String>, BackendError> {
        let mut channels = self.channels.lock().await;
        let sender = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        let receiver = sender.subscribe();
        // Lagged receivers skip dropped messages rather than erroring out.
        let stream = BroadcastStream::new(receiver).filter_map(|message| async move { message.ok() });
        Ok(stream.boxed())
    }
}
