//! Lazily started, shared derived state.
//!
//! A [`ReactiveAggregator`] combines several `watch` inputs into one value
//! computed by a caller-supplied function. Nothing runs until the first
//! [`Subscription`] exists. While subscribed, any input change recomputes
//! the value and every subscriber sees it. When the last subscription is
//! dropped the upstream work keeps running for a grace period, so a screen
//! that re-subscribes right away (a rotation, a quick back-and-forth) gets
//! the cached value instead of a restart.
//!
//! Stopping keeps the last value. A subscriber arriving after a stop sees it
//! at once, and the restarted upstream replaces it with a fresh one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use docshare_shared::constants::DEFAULT_AGGREGATOR_GRACE;

type ChangeStream = BoxStream<'static, ()>;
type InputFactory = Box<dyn Fn() -> ChangeStream + Send + Sync>;
type Compute<T> = Box<dyn Fn() -> T + Send + Sync>;

pub struct AggregatorBuilder {
    name: &'static str,
    grace: Duration,
    inputs: Vec<InputFactory>,
}

impl AggregatorBuilder {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            grace: DEFAULT_AGGREGATOR_GRACE,
            inputs: Vec::new(),
        }
    }

    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Recompute whenever `rx` publishes a new value. The compute function
    /// reads the value itself, usually from its own clone of `rx`.
    pub fn input<V>(mut self, rx: watch::Receiver<V>) -> Self
    where
        V: Send + Sync + 'static,
    {
        self.inputs.push(Box::new(move || {
            let mut rx = rx.clone();
            rx.borrow_and_update();
            stream::unfold(rx, |mut rx| async move {
                rx.changed().await.ok().map(|()| ((), rx))
            })
            .boxed()
        }));
        self
    }

    /// # Panics
    ///
    /// Must be called from within a Tokio runtime; the upstream task and
    /// grace timers are spawned on it.
    pub fn build<T, F>(self, compute: F) -> ReactiveAggregator<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let (output, _) = watch::channel(None);
        ReactiveAggregator {
            shared: Arc::new(Shared {
                name: self.name,
                grace: self.grace,
                inputs: self.inputs,
                compute: Box::new(compute),
                output,
                control: Mutex::new(Control::default()),
                starts: AtomicUsize::new(0),
                runtime: Handle::current(),
            }),
        }
    }
}

#[derive(Default)]
struct Control {
    subscribers: usize,
    /// Bumped on every subscribe so a stale grace timer can tell it lost.
    generation: u64,
    upstream: Option<JoinHandle<()>>,
}

struct Shared<T> {
    name: &'static str,
    grace: Duration,
    inputs: Vec<InputFactory>,
    compute: Compute<T>,
    output: watch::Sender<Option<Arc<T>>>,
    control: Mutex<Control>,
    starts: AtomicUsize,
    runtime: Handle,
}

impl<T: Send + Sync + 'static> Shared<T> {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn recompute(&self) {
        let value = (self.compute)();
        self.output.send_replace(Some(Arc::new(value)));
    }

    fn start(self: &Arc<Self>, control: &mut Control) {
        // Mark inputs as seen before computing so no change slips between.
        let changes = stream::select_all(self.inputs.iter().map(|make| make())).boxed();

        // First start computes inline. A restart replays the cached value and
        // refreshes it from the upstream task.
        let cached = self.output.borrow().is_some();
        if !cached {
            self.recompute();
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        debug!(aggregator = self.name, cached, "upstream started");

        let weak = Arc::downgrade(self);
        control.upstream = Some(self.runtime.spawn(run_upstream(weak, changes, cached)));
    }

    fn stop_if_idle(&self, generation: u64) {
        let mut control = self.control();
        if control.subscribers != 0 || control.generation != generation {
            return;
        }
        if let Some(task) = control.upstream.take() {
            task.abort();
            debug!(aggregator = self.name, "upstream stopped after grace period");
        }
    }
}

async fn run_upstream<T>(
    shared: Weak<Shared<T>>,
    mut changes: ChangeStream,
    recompute_first: bool,
) where
    T: Send + Sync + 'static,
{
    if recompute_first {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        // Waits for the subscribing caller to register its receiver, so it
        // observes this value as a change.
        let _control = shared.control();
        shared.recompute();
    }
    while changes.next().await.is_some() {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.recompute();
    }
}

pub struct ReactiveAggregator<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ReactiveAggregator<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> ReactiveAggregator<T> {
    /// Register a subscriber, starting the upstream work if it is not running.
    pub fn subscribe(&self) -> Subscription<T> {
        let mut control = self.shared.control();
        control.subscribers += 1;
        control.generation += 1;
        if control.upstream.is_none() {
            self.shared.start(&mut control);
        }
        let rx = self.shared.output.subscribe();
        drop(control);

        Subscription {
            shared: Arc::clone(&self.shared),
            rx,
        }
    }

    /// Latest value, `None` until the first subscriber started the upstream.
    pub fn current(&self) -> Option<Arc<T>> {
        self.shared.output.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.shared.control().upstream.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.control().subscribers
    }

    /// How many times the upstream work has been started.
    pub fn starts(&self) -> usize {
        self.shared.starts.load(Ordering::SeqCst)
    }
}

/// Keeps the aggregator running while alive.
pub struct Subscription<T: Send + Sync + 'static> {
    shared: Arc<Shared<T>>,
    rx: watch::Receiver<Option<Arc<T>>>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub fn current(&self) -> Option<Arc<T>> {
        self.rx.borrow().clone()
    }

    /// Wait for the next recomputed value.
    pub async fn next(&mut self) -> Option<Arc<T>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}

impl<T: Send + Sync + 'static> Drop for Subscription<T> {
    fn drop(&mut self) {
        let mut control = self.shared.control();
        control.subscribers = control.subscribers.saturating_sub(1);
        if control.subscribers > 0 {
            return;
        }

        let generation = control.generation;
        let shared = Arc::clone(&self.shared);
        let grace = shared.grace;
        drop(control);

        self.shared.runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            shared.stop_if_idle(generation);
        });
    }
}
