//! Scripted in-memory cluster used by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flexroute_core::{DriverError, HostSpec, RoleMode, RouterConfig};
use flexroute_router::{BoxConnection, ConnectOptions, Connection, Connector, MetadataInvalidator};

#[derive(Default)]
struct HostState {
    read_only: AtomicBool,
    down: AtomicBool,
    stalled: AtomicBool,
    connects: AtomicUsize,
    open: AtomicUsize,
    statements: Mutex<Vec<String>>,
}

/// A fake cluster whose hosts can change role, go down or hang at will.
#[derive(Clone, Default)]
pub struct ScriptedCluster {
    hosts: Arc<Mutex<HashMap<String, Arc<HostState>>>>,
}

impl ScriptedCluster {
    pub fn new(hosts: &[(&str, bool)]) -> Self {
        let cluster = Self::default();
        for (host, writable) in hosts {
            cluster.add(host, *writable);
        }
        cluster
    }

    pub fn add(&self, host: &str, writable: bool) {
        let state = HostState::default();
        state.read_only.store(!writable, Ordering::SeqCst);
        self.hosts
            .lock()
            .unwrap()
            .insert(host.to_string(), Arc::new(state));
    }

    fn state(&self, host: &str) -> Arc<HostState> {
        Arc::clone(
            self.hosts
                .lock()
                .unwrap()
                .get(host)
                .unwrap_or_else(|| panic!("unknown host {host}")),
        )
    }

    pub fn set_writable(&self, host: &str, writable: bool) {
        self.state(host).read_only.store(!writable, Ordering::SeqCst);
    }

    pub fn set_down(&self, host: &str, down: bool) {
        self.state(host).down.store(down, Ordering::SeqCst);
    }

    pub fn set_stalled(&self, host: &str, stalled: bool) {
        self.state(host).stalled.store(stalled, Ordering::SeqCst);
    }

    /// Connections ever opened to `host`; one per probe.
    pub fn connects(&self, host: &str) -> usize {
        self.state(host).connects.load(Ordering::SeqCst)
    }

    /// Connections to `host` currently open.
    pub fn open(&self, host: &str) -> usize {
        self.state(host).open.load(Ordering::SeqCst)
    }

    pub fn statements(&self, host: &str) -> Vec<String> {
        self.state(host).statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for ScriptedCluster {
    async fn connect(
        &self,
        host: &HostSpec,
        _options: &ConnectOptions,
    ) -> Result<BoxConnection, DriverError> {
        let state = {
            let hosts = self.hosts.lock().unwrap();
            hosts.get(&host.to_string()).cloned()
        };
        let state = state.ok_or_else(|| DriverError::Connect(format!("unknown host {host}")))?;

        if state.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if state.down.load(Ordering::SeqCst) {
            return Err(DriverError::Connect("connection refused".to_string()));
        }

        state.connects.fetch_add(1, Ordering::SeqCst);
        state.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            state,
            closed: false,
        }))
    }
}

struct ScriptedConnection {
    state: Arc<HostState>,
    closed: bool,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn read_only(&mut self) -> Result<bool, DriverError> {
        if self.state.down.load(Ordering::SeqCst) {
            return Err(DriverError::Query("server has gone away".to_string()));
        }
        Ok(self.state.read_only.load(Ordering::SeqCst))
    }

    async fn execute(&mut self, statement: &str) -> Result<u64, DriverError> {
        if self.state.down.load(Ordering::SeqCst) {
            return Err(DriverError::Query("server has gone away".to_string()));
        }
        self.state
            .statements
            .lock()
            .unwrap()
            .push(statement.to_string());
        Ok(1)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if !self.closed {
            self.closed = true;
            self.state.open.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Invalidator that counts its calls.
pub fn counting_invalidator() -> (Arc<dyn MetadataInvalidator>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let hook: Arc<dyn MetadataInvalidator> = {
        let calls = Arc::clone(&calls);
        Arc::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    (hook, calls)
}

pub fn config(hosts: &[&str], role: RoleMode, tx_hold_timeout: f64) -> RouterConfig {
    let mut config = RouterConfig::new(hosts.iter().copied(), role);
    config.tx_hold_timeout = tx_hold_timeout;
    config
}
