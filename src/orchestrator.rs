use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::models::{CanonicalResult, HealthStatus, InitializeSummary};
use crate::tasks::health::PollHandle;
use crate::tools::Gateway;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpState {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// The three independently tracked operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Health,
    Initialize,
    Query,
}

impl Category {
    fn slot(self) -> usize {
        match self {
            Category::Health => 0,
            Category::Initialize => 1,
            Category::Query => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// An initialize or query call is already in flight.
    Busy,
    EmptyQuery,
}

/// What became of one operation invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The outcome was written to the state store.
    Applied,
    /// A newer invocation of the same category started first; outcome dropped.
    Stale,
    Rejected(Rejection),
}

/// Snapshot of everything the UI renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    pub health: Option<HealthStatus>,
    pub last_health_check: Option<DateTime<Utc>>,
    pub health_op: OpState,
    pub initialize_op: OpState,
    pub query_op: OpState,
    /// True while initialize or query is pending.
    pub busy: bool,
    pub result: Option<CanonicalResult>,
    /// User-facing error for initialize/query. Health failures never land here.
    pub error: Option<String>,
    pub notice: Option<String>,
    pub last_initialized: Option<InitializeSummary>,
}

impl UiState {
    pub(crate) fn set_op(&mut self, category: Category, state: OpState) {
        match category {
            Category::Health => self.health_op = state,
            Category::Initialize => self.initialize_op = state,
            Category::Query => self.query_op = state,
        }
        self.busy =
            self.initialize_op == OpState::Pending || self.query_op == OpState::Pending;
    }
}

struct Store {
    ui: UiState,
    /// Latest sequence token issued per category.
    issued: [u64; 3],
}

/// Proof that an invocation entered Pending. Completion is applied only if
/// `seq` is still the latest token issued for its category.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ticket {
    category: Category,
    seq: u64,
}

pub(crate) struct Inner {
    pub(crate) gateway: Arc<dyn Gateway>,
    store: Mutex<Store>,
    updates: watch::Sender<UiState>,
    pub(crate) poller: Mutex<Option<PollHandle>>,
}

/// Owns the UI state store and runs health, initialize and query operations
/// against a [`Gateway`]. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (updates, _) = watch::channel(UiState::default());
        Self {
            inner: Arc::new(Inner {
                gateway,
                store: Mutex::new(Store {
                    ui: UiState::default(),
                    issued: [0; 3],
                }),
                updates,
                poller: Mutex::new(None),
            }),
        }
    }

    pub async fn snapshot(&self) -> UiState {
        self.inner.store.lock().await.ui.clone()
    }

    /// Receives a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.inner.updates.subscribe()
    }

    pub async fn is_busy(&self) -> bool {
        self.inner.store.lock().await.ui.busy
    }

    /// Clears the error and notice and returns finished user operations to idle.
    pub async fn dismiss(&self) {
        let mut store = self.inner.store.lock().await;
        let ui = &mut store.ui;
        ui.error = None;
        ui.notice = None;
        for category in [Category::Initialize, Category::Query] {
            let current = match category {
                Category::Initialize => ui.initialize_op,
                _ => ui.query_op,
            };
            if matches!(current, OpState::Succeeded | OpState::Failed) {
                ui.set_op(category, OpState::Idle);
            }
        }
        self.publish(&store.ui);
    }

    /// Enter Pending without the busy guard. Used by the health poll.
    pub(crate) async fn begin(
        &self,
        category: Category,
        prepare: impl FnOnce(&mut UiState),
    ) -> Ticket {
        let mut store = self.inner.store.lock().await;
        let ticket = Self::issue(&mut store, category, prepare);
        self.publish(&store.ui);
        ticket
    }

    /// Enter Pending only if no initialize/query call is in flight.
    pub(crate) async fn begin_exclusive(
        &self,
        category: Category,
        prepare: impl FnOnce(&mut UiState),
    ) -> Result<Ticket, Rejection> {
        let mut store = self.inner.store.lock().await;
        if store.ui.busy {
            return Err(Rejection::Busy);
        }
        let ticket = Self::issue(&mut store, category, prepare);
        self.publish(&store.ui);
        Ok(ticket)
    }

    pub(crate) async fn complete(
        &self,
        ticket: Ticket,
        apply: impl FnOnce(&mut UiState),
    ) -> Dispatch {
        let mut store = self.inner.store.lock().await;
        let latest = store.issued[ticket.category.slot()];
        if latest != ticket.seq {
            debug!(
                "Dropping stale {:?} completion (token {}, latest {})",
                ticket.category, ticket.seq, latest
            );
            return Dispatch::Stale;
        }
        apply(&mut store.ui);
        self.publish(&store.ui);
        Dispatch::Applied
    }

    /// Runs the network half of an operation on its own task. Dropping the
    /// caller's future leaves that task running to completion, so a Pending
    /// state is always resolved.
    pub(crate) async fn detach<F>(&self, category: Category, work: F) -> Dispatch
    where
        F: Future<Output = Dispatch> + Send + 'static,
    {
        match tokio::spawn(work).await {
            Ok(dispatch) => dispatch,
            Err(e) => {
                warn!("{:?} task ended abnormally: {}", category, e);
                Dispatch::Stale
            }
        }
    }

    fn issue(store: &mut Store, category: Category, prepare: impl FnOnce(&mut UiState)) -> Ticket {
        let slot = category.slot();
        store.issued[slot] += 1;
        store.ui.set_op(category, OpState::Pending);
        prepare(&mut store.ui);
        Ticket {
            category,
            seq: store.issued[slot],
        }
    }

    fn publish(&self, ui: &UiState) {
        self.inner.updates.send_replace(ui.clone());
    }
}
