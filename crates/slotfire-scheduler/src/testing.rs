//! Test doubles shared by the engine, sync and dispatcher tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use slotfire_client::{
    ClientError, ClockError, ClockSource, ReservationClient, ReserveRequest, ReserveResponse,
};
use slotfire_core::{Catalog, TargetId};

use crate::offset::{ClockOffset, WallClock};

/// Wall clock that advances with the (paused) tokio clock.
pub struct PausedWallClock {
    base_ms: i64,
    origin: tokio::time::Instant,
}

impl PausedWallClock {
    pub fn starting_at(base_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            base_ms,
            origin: tokio::time::Instant::now(),
        })
    }
}

impl WallClock for PausedWallClock {
    fn now_millis(&self) -> i64 {
        self.base_ms + self.origin.elapsed().as_millis() as i64
    }
}

/// Clock source that replays a fixed script, then fails forever.
pub struct ScriptedClock {
    script: Mutex<VecDeque<Result<chrono::Duration, ()>>>,
    calls: AtomicUsize,
}

impl ScriptedClock {
    pub fn new(script: Vec<Result<chrono::Duration, ()>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClockSource for ScriptedClock {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn query_offset(&self) -> Result<chrono::Duration, ClockError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(offset)) => Ok(offset),
            _ => Err(ClockError::Timeout { ms: 0 }),
        }
    }
}

/// What a [`MockClient`] does with one request.
pub enum Reply {
    Code(i64),
    TransportError,
    Hang,
}

/// One observed reservation request.
#[derive(Debug, Clone)]
pub struct Call {
    pub target_id: TargetId,
    /// Corrected time (wall clock + offset) when the request arrived.
    pub at_ms: i64,
}

type Behaviour = dyn Fn(&ReserveRequest, i64) -> Reply + Send + Sync;

/// Reservation client driven by a closure of (request, corrected now).
pub struct MockClient {
    wall: Arc<dyn WallClock>,
    offset: ClockOffset,
    behaviour: Box<Behaviour>,
    calls: Mutex<Vec<Call>>,
}

impl MockClient {
    pub fn new(
        wall: Arc<dyn WallClock>,
        offset: ClockOffset,
        behaviour: impl Fn(&ReserveRequest, i64) -> Reply + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            wall,
            offset,
            behaviour: Box::new(behaviour),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, target_id: TargetId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.target_id == target_id)
            .count()
    }
}

#[async_trait]
impl ReservationClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn reserve(&self, req: &ReserveRequest) -> Result<ReserveResponse, ClientError> {
        let at_ms = self.wall.now_millis() + self.offset.millis();
        self.calls.lock().unwrap().push(Call {
            target_id: req.target_id,
            at_ms,
        });
        match (self.behaviour)(req, at_ms) {
            Reply::Code(code) => Ok(ReserveResponse {
                code,
                message: if code == 0 { "ok".into() } else { "rejected".into() },
            }),
            Reply::TransportError => Err(ClientError::Parse("connection reset".into())),
            Reply::Hang => std::future::pending().await,
        }
    }

    async fn fetch_catalog(&self, _token: &str) -> Result<Catalog, ClientError> {
        Ok(Catalog::default())
    }
}
