//! Scriptable collaborators shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::health::MetricsSource;
use crate::models::{Metric, MetricKind, RecordId, RemoteRecord, TimeRange};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ReadStart(MetricKind),
    ReadEnd(MetricKind),
    Query,
    Delete(usize),
    InsertStart,
    InsertEnd,
}

#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// `R` per read start and `I` per finished insert, e.g. `RRIRRI`.
    pub fn cycle_trace(&self) -> String {
        self.calls()
            .iter()
            .filter_map(|call| match call {
                Call::ReadStart(_) => Some('R'),
                Call::InsertEnd => Some('I'),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Value(f64),
    NoSamples,
    Fail(String),
}

struct MetricScript {
    available: bool,
    queued: VecDeque<Reading>,
    fallback: Reading,
    delay: Duration,
}

impl MetricScript {
    fn new(value: f64) -> Self {
        Self {
            available: true,
            queued: VecDeque::new(),
            fallback: Reading::Value(value),
            delay: Duration::ZERO,
        }
    }
}

pub struct FakeMetricsSource {
    scripts: Mutex<HashMap<MetricKind, MetricScript>>,
    reads: AtomicUsize,
    journal: Journal,
}

impl FakeMetricsSource {
    pub fn with_values(step_count: f64, stand_time: f64) -> Self {
        Self::with_journal(step_count, stand_time, Journal::default())
    }

    pub fn with_journal(step_count: f64, stand_time: f64, journal: Journal) -> Self {
        let mut scripts = HashMap::new();
        scripts.insert(MetricKind::StepCount, MetricScript::new(step_count));
        scripts.insert(MetricKind::StandTime, MetricScript::new(stand_time));
        Self {
            scripts: Mutex::new(scripts),
            reads: AtomicUsize::new(0),
            journal,
        }
    }

    /// Replaces the reading returned once the queue for `kind` is drained.
    pub fn script(&self, kind: MetricKind, reading: Reading) {
        self.with_script(kind, |script| script.fallback = reading);
    }

    /// Readings returned, in order, before falling back to the scripted one.
    pub fn queue(&self, kind: MetricKind, readings: impl IntoIterator<Item = Reading>) {
        self.with_script(kind, |script| script.queued.extend(readings));
    }

    pub fn set_available(&self, kind: MetricKind, available: bool) {
        self.with_script(kind, |script| script.available = available);
    }

    pub fn set_delay(&self, kind: MetricKind, delay: Duration) {
        self.with_script(kind, |script| script.delay = delay);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn with_script(&self, kind: MetricKind, f: impl FnOnce(&mut MetricScript)) {
        let mut scripts = self.scripts.lock().unwrap();
        if let Some(script) = scripts.get_mut(&kind) {
            f(script);
        }
    }
}

#[async_trait]
impl MetricsSource for FakeMetricsSource {
    fn is_available(&self, kind: MetricKind) -> bool {
        self.scripts
            .lock()
            .unwrap()
            .get(&kind)
            .map(|script| script.available)
            .unwrap_or(false)
    }

    async fn read_sum(&self, metric: &Metric, _window: TimeRange) -> Result<Option<f64>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.journal.push(Call::ReadStart(metric.kind));

        let (reading, delay) = {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts
                .get_mut(&metric.kind)
                .ok_or_else(|| anyhow!("unscripted metric"))?;
            let reading = script
                .queued
                .pop_front()
                .unwrap_or_else(|| script.fallback.clone());
            (reading, script.delay)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.journal.push(Call::ReadEnd(metric.kind));

        match reading {
            Reading::Value(value) => Ok(Some(value)),
            Reading::NoSamples => Ok(None),
            Reading::Fail(cause) => bail!(cause),
        }
    }

    async fn request_authorization(&self, kinds: &[MetricKind]) -> Result<bool> {
        Ok(kinds.iter().all(|kind| self.is_available(*kind)))
    }
}

#[derive(Default)]
struct StoreFaults {
    query: Option<String>,
    delete: Option<String>,
    insert: Option<String>,
}

#[derive(Default)]
pub struct FakeRecordStore {
    records: Mutex<Vec<(RecordId, RemoteRecord)>>,
    faults: Mutex<StoreFaults>,
    insert_delay: Mutex<Duration>,
    queries: AtomicUsize,
    deletes: AtomicUsize,
    insert_attempts: AtomicUsize,
    next_id: AtomicUsize,
    journal: Journal,
}

impl FakeRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn preload(&self, record: RemoteRecord) {
        let id = self.allocate_id();
        self.records.lock().unwrap().push((id, record));
    }

    pub fn fail_query(&self, cause: Option<&str>) {
        self.faults.lock().unwrap().query = cause.map(str::to_string);
    }

    pub fn fail_delete(&self, cause: Option<&str>) {
        self.faults.lock().unwrap().delete = cause.map(str::to_string);
    }

    pub fn fail_insert(&self, cause: Option<&str>) {
        self.faults.lock().unwrap().insert = cause.map(str::to_string);
    }

    pub fn set_insert_delay(&self, delay: Duration) {
        *self.insert_delay.lock().unwrap() = delay;
    }

    pub fn records(&self) -> Vec<RemoteRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> RecordId {
        format!("record-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn query_all(&self, record_type: &str) -> Result<Vec<RecordId>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.journal.push(Call::Query);
        if let Some(cause) = self.faults.lock().unwrap().query.clone() {
            bail!(cause);
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, record)| record.record_type == record_type)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn delete_all(&self, ids: &[RecordId]) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.journal.push(Call::Delete(ids.len()));
        if let Some(cause) = self.faults.lock().unwrap().delete.clone() {
            bail!(cause);
        }

        self.records
            .lock()
            .unwrap()
            .retain(|(id, _)| !ids.contains(id));
        Ok(())
    }

    async fn insert(&self, record: &RemoteRecord) -> Result<RecordId> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        self.journal.push(Call::InsertStart);

        let delay = *self.insert_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let fault = self.faults.lock().unwrap().insert.clone();
        self.journal.push(Call::InsertEnd);
        if let Some(cause) = fault {
            bail!(cause);
        }

        let id = self.allocate_id();
        self.records
            .lock()
            .unwrap()
            .push((id.clone(), record.clone()));
        Ok(id)
    }
}
