//! Memory Transport
//!
//! In-process servers that answer requests with the same semantics as the
//! networked server, without any sockets.
//!
//! ## Server model
//! ```text
//!              request
//!                 │
//!          ┌──────▼──────┐
//!          │ Cache tier  │  bounded, oldest entry evicted first
//!          └──────┬──────┘
//!                 │ queued reads and writes (crossbeam channel, FIFO)
//!          ┌──────▼──────┐
//!          │ DB worker   │  background thread, optional delay per write
//!          └──────┬──────┘
//!          ┌──────▼──────┐
//!          │  Database   │  ordered map, source of key iteration
//!          └─────────────┘
//! ```
//!
//! - Plain writes are acknowledged once queued, SYNC writes once the writer
//!   thread applied them, CACHE_ONLY writes never reach the database.
//! - Reads check the cache first. A cache miss queues the database lookup
//!   behind the pending writes, so it sees them; a database hit is cached.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::DEFAULT_MAX_PAYLOAD_SIZE;
use crate::error::{ClientError, Result};
use crate::protocol::{Command, Reply, ReplyCode, Request, ServerError};
use crate::registry::{Endpoint, TransportKind};
use super::Transport;

/// Number of counters in a STATS reply:
/// requests, cache hits, cache misses, db hits, db misses, sets, deletes,
/// cas, incr
pub const STATS_COUNTERS: usize = 9;

/// Behaviour of the in-process servers
#[derive(Debug, Clone)]
pub struct MemoryOptions {
    /// Max cache entries (`None` = unbounded)
    pub cache_capacity: Option<usize>,

    /// Time the database worker spends on each write
    pub write_delay: Duration,

    /// Largest key + value payload accepted
    pub max_payload_size: usize,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            cache_capacity: None,
            write_delay: Duration::ZERO,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

// =============================================================================
// Cache tier
// =============================================================================

#[derive(Default)]
struct CacheTier {
    entries: HashMap<Vec<u8>, Vec<u8>>,
    /// Insertion order, oldest first
    order: VecDeque<Vec<u8>>,
    capacity: Option<usize>,
}

impl CacheTier {
    fn get(&self, key: &[u8]) -> Option<&Vec<u8>> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }

        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
    }

    fn remove(&mut self, key: &[u8]) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k.as_slice() != key);
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Database worker
// =============================================================================

enum DbOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
    Get { key: Vec<u8>, reply: Sender<Option<Vec<u8>>> },
    Barrier,
}

struct DbJob {
    op: DbOp,
    /// Signalled once the job is applied
    ack: Option<Sender<()>>,
}

type Database = Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>;

fn run_worker(db: Database, jobs: Receiver<DbJob>, delay: Duration) {
    for job in jobs.iter() {
        let is_write = matches!(job.op, DbOp::Put { .. } | DbOp::Delete { .. });
        if is_write && !delay.is_zero() {
            thread::sleep(delay);
        }

        match job.op {
            DbOp::Put { key, value } => {
                db.lock().insert(key, value);
            }
            DbOp::Delete { key } => {
                db.lock().remove(&key);
            }
            DbOp::Get { key, reply } => {
                let _ = reply.send(db.lock().get(&key).cloned());
            }
            DbOp::Barrier => {}
        }

        if let Some(ack) = job.ack {
            let _ = ack.send(());
        }
    }
}

// =============================================================================
// Server
// =============================================================================

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    db_hits: AtomicU64,
    db_misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    cas: AtomicU64,
    incr: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Vec<u64> {
        [
            &self.requests,
            &self.cache_hits,
            &self.cache_misses,
            &self.db_hits,
            &self.db_misses,
            &self.sets,
            &self.deletes,
            &self.cas,
            &self.incr,
        ]
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .collect()
    }
}

/// One in-process server
pub struct MemoryServer {
    cache: Mutex<CacheTier>,
    db: Database,
    writer: Option<Sender<DbJob>>,
    worker: Option<JoinHandle<()>>,
    reachable: AtomicBool,
    counters: Counters,
    max_payload_size: usize,
}

impl MemoryServer {
    /// Start a server (spawns its database worker thread)
    pub fn new(options: &MemoryOptions) -> Self {
        let db: Database = Arc::default();
        let (tx, rx) = channel::unbounded();

        let worker_db = Arc::clone(&db);
        let delay = options.write_delay;
        let worker = thread::spawn(move || run_worker(worker_db, rx, delay));

        Self {
            cache: Mutex::new(CacheTier {
                capacity: options.cache_capacity,
                ..CacheTier::default()
            }),
            db,
            writer: Some(tx),
            worker: Some(worker),
            reachable: AtomicBool::new(true),
            counters: Counters::default(),
            max_payload_size: options.max_payload_size,
        }
    }

    /// Answer one request
    pub fn handle(&self, request: &Request) -> Reply {
        Counters::bump(&self.counters.requests);

        let id = request.id;
        if request.command.payload_len() > self.max_payload_size {
            return Reply::error(id, ServerError::BrokenRequest);
        }

        let cache_only = request.flags.cache_only();
        let sync = request.flags.sync();

        match &request.command {
            Command::Get { key } => self.get(id, key, cache_only),
            Command::Set { key, value } => self.set(id, key, value, cache_only, sync),
            Command::Delete { key } => self.delete(id, key, cache_only, sync),
            Command::Cas { key, old, new } => self.cas(id, key, old, new, cache_only),
            Command::Incr { key, delta } => self.incr(id, key, *delta, cache_only),
            Command::Stats => Reply::stats(id, &self.counters.snapshot()),
            Command::FirstKey => {
                self.flush();
                let first = self.db.lock().keys().next().cloned();
                match first {
                    Some(key) => Reply::value(id, ReplyCode::Ok, &key),
                    None => Reply::mini(id, ReplyCode::NotIn),
                }
            }
            Command::NextKey { key } => {
                self.flush();
                let db = self.db.lock();
                let next = db
                    .range::<[u8], _>((Bound::Excluded(key.as_slice()), Bound::Unbounded))
                    .next();
                match next {
                    Some((next, _)) => Reply::value(id, ReplyCode::Ok, next),
                    None => Reply::mini(id, ReplyCode::NotIn),
                }
            }
        }
    }

    fn get(&self, id: u32, key: &[u8], cache_only: bool) -> Reply {
        if let Some(value) = self.cache.lock().get(key) {
            Counters::bump(&self.counters.cache_hits);
            return Reply::value(id, ReplyCode::CacheHit, value);
        }
        Counters::bump(&self.counters.cache_misses);

        if cache_only {
            return Reply::mini(id, ReplyCode::CacheMiss);
        }

        let stored = match self.lookup(key) {
            Ok(stored) => stored,
            Err(()) => return Reply::error(id, ServerError::Database),
        };
        match stored {
            Some(value) => {
                Counters::bump(&self.counters.db_hits);
                self.cache.lock().insert(key.to_vec(), value.clone());
                Reply::value(id, ReplyCode::Ok, &value)
            }
            None => {
                Counters::bump(&self.counters.db_misses);
                Reply::mini(id, ReplyCode::NotIn)
            }
        }
    }

    fn set(&self, id: u32, key: &[u8], value: &[u8], cache_only: bool, sync: bool) -> Reply {
        Counters::bump(&self.counters.sets);
        self.cache.lock().insert(key.to_vec(), value.to_vec());

        if cache_only {
            return Reply::mini(id, ReplyCode::Ok);
        }

        let op = DbOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        };
        self.queue_reply(id, op, sync)
    }

    fn delete(&self, id: u32, key: &[u8], cache_only: bool, sync: bool) -> Reply {
        Counters::bump(&self.counters.deletes);
        let in_cache = self.cache.lock().remove(key);

        if cache_only {
            let code = if in_cache { ReplyCode::Ok } else { ReplyCode::NotIn };
            return Reply::mini(id, code);
        }

        let in_db = match self.lookup(key) {
            Ok(stored) => stored.is_some(),
            Err(()) => return Reply::error(id, ServerError::Database),
        };
        if !in_cache && !in_db {
            return Reply::mini(id, ReplyCode::NotIn);
        }

        self.queue_reply(id, DbOp::Delete { key: key.to_vec() }, sync)
    }

    fn cas(&self, id: u32, key: &[u8], old: &[u8], new: &[u8], cache_only: bool) -> Reply {
        Counters::bump(&self.counters.cas);

        let mut cache = self.cache.lock();
        let current = match cache.get(key) {
            Some(value) => Some(value.clone()),
            None if cache_only => None,
            None => match self.lookup(key) {
                Ok(stored) => stored,
                Err(()) => return Reply::error(id, ServerError::Database),
            },
        };

        match current {
            None => Reply::mini(id, ReplyCode::NotIn),
            Some(value) if value != old => Reply::mini(id, ReplyCode::NoMatch),
            Some(_) => {
                cache.insert(key.to_vec(), new.to_vec());
                drop(cache);

                if cache_only {
                    return Reply::mini(id, ReplyCode::Ok);
                }
                let op = DbOp::Put {
                    key: key.to_vec(),
                    value: new.to_vec(),
                };
                self.queue_reply(id, op, false)
            }
        }
    }

    fn incr(&self, id: u32, key: &[u8], delta: i64, cache_only: bool) -> Reply {
        Counters::bump(&self.counters.incr);

        let mut cache = self.cache.lock();
        let current = match cache.get(key) {
            Some(value) => Some(value.clone()),
            None if cache_only => None,
            None => match self.lookup(key) {
                Ok(stored) => stored,
                Err(()) => return Reply::error(id, ServerError::Database),
            },
        };

        let current = match current {
            Some(value) => value,
            None => return Reply::mini(id, ReplyCode::NotIn),
        };

        let number = match parse_counter(&current) {
            Some(number) => number,
            None => return Reply::mini(id, ReplyCode::NoMatch),
        };

        let updated = number.wrapping_add(delta);
        let mut stored = updated.to_string().into_bytes();
        stored.push(0);

        cache.insert(key.to_vec(), stored.clone());
        drop(cache);

        if !cache_only {
            let op = DbOp::Put {
                key: key.to_vec(),
                value: stored,
            };
            if self.queue(op, false).is_err() {
                return Reply::error(id, ServerError::Database);
            }
        }

        Reply::counter(id, updated)
    }

    /// Queue a database write; wait for it when `sync`
    fn queue_reply(&self, id: u32, op: DbOp, sync: bool) -> Reply {
        match self.queue(op, sync) {
            Ok(()) => Reply::mini(id, ReplyCode::Ok),
            Err(_) => Reply::error(id, ServerError::Database),
        }
    }

    /// Database value of `key`, read in order with the queued writes
    fn lookup(&self, key: &[u8]) -> std::result::Result<Option<Vec<u8>>, ()> {
        let writer = self.writer.as_ref().ok_or(())?;

        let (reply_tx, reply_rx) = channel::bounded(1);
        let op = DbOp::Get {
            key: key.to_vec(),
            reply: reply_tx,
        };
        writer.send(DbJob { op, ack: None }).map_err(|_| ())?;
        reply_rx.recv().map_err(|_| ())
    }

    fn queue(&self, op: DbOp, wait: bool) -> std::result::Result<(), ()> {
        let writer = self.writer.as_ref().ok_or(())?;

        if !wait {
            return writer.send(DbJob { op, ack: None }).map_err(|_| ());
        }

        let (ack_tx, ack_rx) = channel::bounded(1);
        writer
            .send(DbJob {
                op,
                ack: Some(ack_tx),
            })
            .map_err(|_| ())?;
        ack_rx.recv().map_err(|_| ())
    }

    // =========================================================================
    // Inspection (tests and benchmarks)
    // =========================================================================

    /// Block until every queued database job is applied
    pub fn flush(&self) {
        let _ = self.queue(DbOp::Barrier, true);
    }

    /// Value in the database tier
    pub fn db_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.db.lock().get(key).cloned()
    }

    /// Value in the cache tier
    pub fn cache_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.cache.lock().get(key).cloned()
    }

    /// Drop a key from the cache tier, as an eviction would
    pub fn evict(&self, key: &[u8]) -> bool {
        self.cache.lock().remove(key)
    }

    /// Number of database entries
    pub fn db_len(&self) -> usize {
        self.db.lock().len()
    }

    /// Number of requests answered
    pub fn requests_served(&self) -> u64 {
        self.counters.requests.load(Ordering::Relaxed)
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new(&MemoryOptions::default())
    }
}

impl Drop for MemoryServer {
    fn drop(&mut self) {
        // Closing the channel ends the writer loop
        self.writer.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Parse a NUL-terminated decimal integer
fn parse_counter(value: &[u8]) -> Option<i64> {
    let (last, digits) = value.split_last()?;
    if *last != 0 {
        return None;
    }
    std::str::from_utf8(digits).ok()?.trim().parse().ok()
}

// =============================================================================
// Transport
// =============================================================================

/// Transport backed by in-process servers, one per registered endpoint
#[derive(Default)]
pub struct MemoryTransport {
    options: MemoryOptions,
    servers: Mutex<HashMap<Endpoint, Arc<MemoryServer>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MemoryOptions) -> Self {
        Self {
            options,
            servers: Mutex::new(HashMap::new()),
        }
    }

    /// Bound the cache tier of every server started from now on
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.options.cache_capacity = Some(capacity);
        self
    }

    /// Delay every database write of servers started from now on
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.options.write_delay = delay;
        self
    }

    /// The server behind `endpoint`, if one was started
    pub fn server(&self, endpoint: &Endpoint) -> Option<Arc<MemoryServer>> {
        self.servers.lock().get(endpoint).cloned()
    }

    /// Make an endpoint refuse (or accept again) connections
    pub fn set_reachable(&self, endpoint: &Endpoint, reachable: bool) -> bool {
        match self.server(endpoint) {
            Some(server) => {
                server.set_reachable(reachable);
                true
            }
            None => false,
        }
    }

    /// Requests answered by the server behind `endpoint`
    pub fn requests_served(&self, endpoint: &Endpoint) -> u64 {
        self.server(endpoint)
            .map(|server| server.requests_served())
            .unwrap_or(0)
    }
}

impl Transport for MemoryTransport {
    fn supports(&self, _kind: TransportKind) -> bool {
        true
    }

    fn prepare(&self, endpoint: &Endpoint) -> Result<()> {
        let mut servers = self.servers.lock();
        servers
            .entry(endpoint.clone())
            .or_insert_with(|| Arc::new(MemoryServer::new(&self.options)));
        Ok(())
    }

    fn round_trip(&self, endpoint: &Endpoint, request: &Request) -> Result<Reply> {
        let server = self.server(endpoint).filter(|s| s.is_reachable());
        match server {
            Some(server) => Ok(server.handle(request)),
            None => Err(ClientError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{} refused the connection", endpoint),
            ))),
        }
    }
}
