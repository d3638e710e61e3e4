//! Per-category generation sessions.
//!
//! Every generation action mints a new [`Epoch`] for its session, clears the
//! variant buffers and launches one task per active variant. Tasks append
//! fragments only while their epoch is still the session's current one; the
//! check and the append happen under the same lock, so output of a
//! superseded epoch never reaches a buffer.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use futures::future::join_all;
use futures::stream::{BoxStream, StreamExt};
use lyrics_core::catalog::{self, Archetype, Category, Rhythm};
use lyrics_core::Variant;
use rand::seq::SliceRandom;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::GenerationClient;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultiplexError {
    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("category {0} is a library view and cannot generate")]
    LibraryOnly(&'static str),
}

/// Identifier of one generation action. Minted from a global counter, so
/// later epochs compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Epoch(pub u64);

/// What a task does with its stream once its epoch is superseded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SupersedePolicy {
    /// Drop the stream as soon as the epoch is cancelled.
    #[default]
    Close,
    /// Keep reading the stream to its end without publishing.
    Drain,
}

impl FromStr for SupersedePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "close" => Ok(SupersedePolicy::Close),
            "drain" => Ok(SupersedePolicy::Drain),
            other => Err(format!("unknown supersede policy: {other}")),
        }
    }
}

/// Style selection, captured by value when a generation starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleSettings {
    pub rhythm: Option<Rhythm>,
    pub archetype: Archetype,
    pub zeus: bool,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            rhythm: None,
            archetype: catalog::default_archetype(),
            zeus: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantBuffer {
    pub text: String,
    /// The stream feeding this buffer has ended.
    pub complete: bool,
}

/// Published state of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub category: &'static str,
    pub label: &'static str,
    pub topic: String,
    pub loading: bool,
    pub epoch: Option<Epoch>,
    /// Variants launched by the current epoch.
    pub variants: Vec<Variant>,
    /// Indexed by [`Variant::index`].
    pub buffers: [VariantBuffer; 3],
}

impl SessionSnapshot {
    pub fn buffer(&self, variant: Variant) -> &VariantBuffer {
        &self.buffers[variant.index()]
    }
}

/// Handle on a launched generation.
#[derive(Debug)]
pub struct GenerationTicket {
    pub category: &'static str,
    pub topic: String,
    pub epoch: Epoch,
    pub variants: Vec<Variant>,
    settled: JoinHandle<()>,
}

impl GenerationTicket {
    /// Resolves once every stream of this epoch has ended.
    pub async fn settled(self) {
        if let Err(e) = self.settled.await {
            warn!("Settle task for epoch {} failed: {e}", self.epoch.0);
        }
    }
}

#[derive(Debug, Default)]
pub struct MultiplexStats {
    epochs_minted: AtomicU64,
    streams_launched: AtomicU64,
    fragments_appended: AtomicU64,
    fragments_discarded: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MultiplexStatsSnapshot {
    pub epochs_minted: u64,
    pub streams_launched: u64,
    pub fragments_appended: u64,
    pub fragments_discarded: u64,
}

impl MultiplexStats {
    pub fn snapshot(&self) -> MultiplexStatsSnapshot {
        MultiplexStatsSnapshot {
            epochs_minted: self.epochs_minted.load(Ordering::Relaxed),
            streams_launched: self.streams_launched.load(Ordering::Relaxed),
            fragments_appended: self.fragments_appended.load(Ordering::Relaxed),
            fragments_discarded: self.fragments_discarded.load(Ordering::Relaxed),
        }
    }
}

struct SessionState {
    topic: String,
    epoch: Option<Epoch>,
    loading: bool,
    variants: Vec<Variant>,
    buffers: [VariantBuffer; 3],
    cancel: Option<CancellationToken>,
}

struct SessionSlot {
    category: &'static Category,
    state: Mutex<SessionState>,
    published: watch::Sender<SessionSnapshot>,
}

impl SessionSlot {
    fn new(category: &'static Category) -> Self {
        let state = SessionState {
            topic: category.default_topic().to_string(),
            epoch: None,
            loading: false,
            variants: Vec::new(),
            buffers: Default::default(),
            cancel: None,
        };
        let (published, _) = watch::channel(Self::snapshot_of(category, &state));
        Self {
            category,
            state: Mutex::new(state),
            published,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_of(category: &'static Category, state: &SessionState) -> SessionSnapshot {
        SessionSnapshot {
            category: category.key,
            label: category.label,
            topic: state.topic.clone(),
            loading: state.loading,
            epoch: state.epoch,
            variants: state.variants.clone(),
            buffers: state.buffers.clone(),
        }
    }

    // Called with the lock held so snapshots go out in mutation order.
    fn publish(&self, state: &SessionState) {
        self.published.send_replace(Self::snapshot_of(self.category, state));
    }
}

struct Inner {
    client: GenerationClient,
    policy: SupersedePolicy,
    sessions: Vec<SessionSlot>,
    style: RwLock<StyleSettings>,
    next_epoch: AtomicU64,
    stats: MultiplexStats,
}

/// Owner of every session and of the style selection.
#[derive(Clone)]
pub struct Multiplexer {
    inner: Arc<Inner>,
}

impl Multiplexer {
    /// Creates one session per generatable category.
    pub fn new(client: GenerationClient, policy: SupersedePolicy) -> Self {
        let sessions = catalog::categories()
            .iter()
            .filter(|c| c.is_generatable())
            .map(SessionSlot::new)
            .collect();
        Self {
            inner: Arc::new(Inner {
                client,
                policy,
                sessions,
                style: RwLock::new(StyleSettings::default()),
                next_epoch: AtomicU64::new(0),
                stats: MultiplexStats::default(),
            }),
        }
    }

    pub fn policy(&self) -> SupersedePolicy {
        self.inner.policy
    }

    pub fn style(&self) -> StyleSettings {
        self.inner
            .style
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_style(&self, style: StyleSettings) {
        *self.inner.style.write().unwrap_or_else(PoisonError::into_inner) = style;
    }

    pub fn set_zeus(&self, zeus: bool) {
        self.inner
            .style
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .zeus = zeus;
    }

    pub fn stats(&self) -> MultiplexStatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn snapshot(&self, category: &str) -> Result<SessionSnapshot, MultiplexError> {
        Ok(self.inner.slot(category)?.published.borrow().clone())
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.inner
            .sessions
            .iter()
            .map(|slot| slot.published.borrow().clone())
            .collect()
    }

    /// Receiver that always holds the session's latest snapshot.
    pub fn subscribe(&self, category: &str) -> Result<watch::Receiver<SessionSnapshot>, MultiplexError> {
        Ok(self.inner.slot(category)?.published.subscribe())
    }

    pub fn random_topic(&self, category: &str) -> Result<&'static str, MultiplexError> {
        let slot = self.inner.slot(category)?;
        let topics = slot.category.topics;
        Ok(topics
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_else(|| slot.category.default_topic()))
    }

    /// Starts a generation for `topic`, superseding any in-flight one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run_generation(&self, category: &str, topic: &str) -> Result<GenerationTicket, MultiplexError> {
        let inner = &self.inner;
        let slot = inner.slot(category)?;
        let key = slot.category.key;
        let style = self.style();
        let variants = Variant::active(style.zeus);
        let token = CancellationToken::new();

        let epoch = {
            let mut state = slot.lock();
            // minted under the session lock so the stored epoch only moves forward
            let epoch = Epoch(inner.next_epoch.fetch_add(1, Ordering::SeqCst) + 1);
            if let Some(previous) = state.cancel.replace(token.clone()) {
                previous.cancel();
            }
            if let Some(previous) = state.epoch {
                debug!(category = key, "Epoch {} superseded by {}", previous.0, epoch.0);
            }
            state.epoch = Some(epoch);
            state.topic = topic.to_string();
            state.loading = true;
            state.variants = variants.clone();
            state.buffers = Default::default();
            slot.publish(&state);
            epoch
        };
        inner.stats.epochs_minted.fetch_add(1, Ordering::Relaxed);
        info!(
            category = key,
            epoch = epoch.0,
            zeus = style.zeus,
            "Generating \"{topic}\""
        );

        let rhythm = style.rhythm.as_ref().map(|r| r.name.as_str());
        let handles: Vec<JoinHandle<()>> = variants
            .iter()
            .map(|&variant| {
                let fragments = inner.client.stream(topic, key, variant, rhythm, &style.archetype);
                inner.stats.streams_launched.fetch_add(1, Ordering::Relaxed);
                tokio::spawn(pump(
                    self.inner.clone(),
                    key,
                    variant,
                    epoch,
                    token.clone(),
                    fragments,
                ))
            })
            .collect();

        let settle_inner = self.inner.clone();
        let settled = tokio::spawn(async move {
            for result in join_all(handles).await {
                if let Err(e) = result {
                    warn!(category = key, epoch = epoch.0, "Variant task failed: {e}");
                }
            }
            settle_inner.settle(key, epoch);
        });

        Ok(GenerationTicket {
            category: key,
            topic: topic.to_string(),
            epoch,
            variants,
            settled,
        })
    }

    /// Re-runs the session's current topic.
    pub fn rerun(&self, category: &str) -> Result<GenerationTicket, MultiplexError> {
        let topic = self.snapshot(category)?.topic;
        self.run_generation(category, &topic)
    }

    pub fn run_random(&self, category: &str) -> Result<GenerationTicket, MultiplexError> {
        let topic = self.random_topic(category)?;
        self.run_generation(category, topic)
    }
}

impl Inner {
    fn slot(&self, category: &str) -> Result<&SessionSlot, MultiplexError> {
        if let Some(slot) = self
            .sessions
            .iter()
            .find(|s| s.category.key.eq_ignore_ascii_case(category))
        {
            return Ok(slot);
        }
        match catalog::category(category) {
            Some(c) if !c.is_generatable() => Err(MultiplexError::LibraryOnly(c.key)),
            _ => Err(MultiplexError::UnknownSession(category.to_string())),
        }
    }

    /// Appends if `epoch` is still current. Returns whether it did.
    fn append(&self, key: &str, variant: Variant, epoch: Epoch, fragment: &str) -> bool {
        let Ok(slot) = self.slot(key) else {
            return false;
        };
        let mut state = slot.lock();
        if state.epoch != Some(epoch) {
            return false;
        }
        state.buffers[variant.index()].text.push_str(fragment);
        slot.publish(&state);
        true
    }

    fn complete(&self, key: &str, variant: Variant, epoch: Epoch) {
        let Ok(slot) = self.slot(key) else { return };
        let mut state = slot.lock();
        if state.epoch == Some(epoch) {
            state.buffers[variant.index()].complete = true;
            slot.publish(&state);
        }
    }

    fn settle(&self, key: &str, epoch: Epoch) {
        let Ok(slot) = self.slot(key) else { return };
        let mut state = slot.lock();
        if state.epoch != Some(epoch) {
            debug!(category = key, "Stale epoch {} settled", epoch.0);
            return;
        }
        state.loading = false;
        state.cancel = None;
        slot.publish(&state);
        info!(category = key, epoch = epoch.0, "Generation settled");
    }
}

async fn pump(
    inner: Arc<Inner>,
    key: &'static str,
    variant: Variant,
    epoch: Epoch,
    token: CancellationToken,
    mut fragments: BoxStream<'static, String>,
) {
    loop {
        let next = match inner.policy {
            SupersedePolicy::Close => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(category = key, %variant, "Closing superseded stream of epoch {}", epoch.0);
                    break;
                }
                next = fragments.next() => next,
            },
            SupersedePolicy::Drain => fragments.next().await,
        };
        let Some(fragment) = next else { break };

        if inner.append(key, variant, epoch, &fragment) {
            inner.stats.fragments_appended.fetch_add(1, Ordering::Relaxed);
        } else {
            inner.stats.fragments_discarded.fetch_add(1, Ordering::Relaxed);
        }
    }
    inner.complete(key, variant, epoch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FragmentStream, GenerationBackend};
    use crate::prompt::GenerationRequest;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Clone)]
    enum Step {
        Emit(&'static str),
        /// Blocks until the latch is cancelled.
        Wait(CancellationToken),
        Fail(&'static str),
    }

    /// Replays a script per (topic, variant); unscripted pairs end at once.
    #[derive(Default)]
    struct ScriptedBackend {
        scripts: Mutex<HashMap<(String, Variant), Vec<Step>>>,
        opened: Mutex<Vec<(String, Variant)>>,
    }

    impl ScriptedBackend {
        fn script(self: &Arc<Self>, topic: &str, variant: Variant, steps: Vec<Step>) -> Arc<Self> {
            self.scripts
                .lock()
                .unwrap()
                .insert((topic.to_string(), variant), steps);
            self.clone()
        }

        fn opened(&self) -> Vec<(String, Variant)> {
            self.opened.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn open_stream(&self, request: GenerationRequest) -> anyhow::Result<FragmentStream> {
            let key = (request.topic.clone(), request.variant);
            self.opened.lock().unwrap().push(key.clone());
            let steps = self.scripts.lock().unwrap().get(&key).cloned().unwrap_or_default();
            Ok(Box::pin(async_stream::stream! {
                for step in steps {
                    match step {
                        Step::Emit(text) => {
                            yield Ok(text.to_string());
                        }
                        Step::Wait(gate) => gate.cancelled().await,
                        Step::Fail(message) => {
                            yield Err(anyhow::anyhow!(message));
                            return;
                        }
                    }
                }
            }))
        }
    }

    fn multiplexer(backend: &Arc<ScriptedBackend>, policy: SupersedePolicy) -> Multiplexer {
        Multiplexer::new(GenerationClient::new(backend.clone()), policy)
    }

    const CAT: &str = "RAIZ_HIPHOP";

    #[tokio::test]
    async fn test_fragments_concatenate_in_order_per_variant() {
        let backend = Arc::new(ScriptedBackend::default())
            .script("Rua", Variant::Alfa, vec![Step::Emit("### BEAT\n"), Step::Emit("boom"), Step::Emit(" bap")])
            .script("Rua", Variant::Beta, vec![Step::Emit("b1"), Step::Emit("b2")]);
        let mux = multiplexer(&backend, SupersedePolicy::Close);

        mux.run_generation(CAT, "Rua").unwrap().settled().await;

        let snapshot = mux.snapshot(CAT).unwrap();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.topic, "Rua");
        assert_eq!(snapshot.buffer(Variant::Alfa).text, "### BEAT\nboom bap");
        assert_eq!(snapshot.buffer(Variant::Beta).text, "b1b2");
        assert!(snapshot.buffer(Variant::Alfa).complete);
        assert_eq!(mux.stats().fragments_appended, 5);
    }

    #[tokio::test]
    async fn test_zeus_off_launches_two_streams() {
        let backend = Arc::new(ScriptedBackend::default())
            .script("Trap Hype 333", Variant::Alfa, vec![Step::Emit("a")])
            .script("Trap Hype 333", Variant::Beta, vec![Step::Emit("b")]);
        let mux = multiplexer(&backend, SupersedePolicy::Close);
        let mut updates = mux.subscribe(CAT).unwrap();

        let ticket = mux.run_generation(CAT, "Trap Hype 333").unwrap();
        assert_eq!(ticket.variants, vec![Variant::Alfa, Variant::Beta]);

        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            assert!(snapshot.buffer(Variant::Zeus).text.is_empty());
            if !snapshot.loading {
                break;
            }
        }
        ticket.settled().await;

        let mut opened = backend.opened();
        opened.sort_by_key(|(_, v)| v.index());
        assert_eq!(
            opened,
            vec![
                ("Trap Hype 333".to_string(), Variant::Alfa),
                ("Trap Hype 333".to_string(), Variant::Beta),
            ]
        );
        assert_eq!(mux.stats().streams_launched, 2);
    }

    #[tokio::test]
    async fn test_loading_holds_until_slowest_variant_settles() {
        let gate = CancellationToken::new();
        let backend = Arc::new(ScriptedBackend::default())
            .script("Drill", Variant::Alfa, vec![Step::Emit("a")])
            .script("Drill", Variant::Beta, vec![Step::Emit("b")])
            .script("Drill", Variant::Zeus, vec![Step::Emit("z1"), Step::Wait(gate.clone()), Step::Emit("z2")]);
        let mux = multiplexer(&backend, SupersedePolicy::Close);
        mux.set_zeus(true);

        let ticket = mux.run_generation(CAT, "Drill").unwrap();
        assert_eq!(ticket.variants.len(), 3);

        let mut updates = mux.subscribe(CAT).unwrap();
        updates
            .wait_for(|s| s.buffer(Variant::Alfa).complete && s.buffer(Variant::Beta).complete && s.buffer(Variant::Zeus).text == "z1")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(mux.snapshot(CAT).unwrap().loading);

        gate.cancel();
        ticket.settled().await;

        let snapshot = mux.snapshot(CAT).unwrap();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.buffer(Variant::Zeus).text, "z1z2");
    }

    async fn assert_superseded_output_never_leaks(policy: SupersedePolicy) {
        let gate = CancellationToken::new();
        let backend = Arc::new(ScriptedBackend::default())
            .script("Velho", Variant::Alfa, vec![Step::Emit("v1"), Step::Wait(gate.clone()), Step::Emit("v2"), Step::Emit("v3")])
            .script("Velho", Variant::Beta, vec![Step::Wait(gate.clone()), Step::Emit("vb")])
            .script("Gangstar", Variant::Alfa, vec![Step::Emit("novo")]);
        let mux = multiplexer(&backend, policy);

        let stale = mux.run_generation(CAT, "Velho").unwrap();
        mux.subscribe(CAT)
            .unwrap()
            .wait_for(|s| s.buffer(Variant::Alfa).text == "v1")
            .await
            .unwrap();

        // a word click on "Gangstar" supersedes the running epoch
        let fresh = mux.run_generation(CAT, "Gangstar").unwrap();
        let fresh_epoch = fresh.epoch;
        assert!(fresh_epoch > stale.epoch);
        gate.cancel();
        stale.settled().await;
        fresh.settled().await;

        let snapshot = mux.snapshot(CAT).unwrap();
        assert_eq!(snapshot.epoch, Some(fresh_epoch));
        assert_eq!(snapshot.topic, "Gangstar");
        assert_eq!(snapshot.buffer(Variant::Alfa).text, "novo");
        assert_eq!(snapshot.buffer(Variant::Beta).text, "");
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_superseded_output_never_leaks_when_closing() {
        assert_superseded_output_never_leaks(SupersedePolicy::Close).await;
    }

    #[tokio::test]
    async fn test_superseded_output_never_leaks_when_draining() {
        assert_superseded_output_never_leaks(SupersedePolicy::Drain).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_triggers_keep_highest_epoch_current() {
        let backend = Arc::new(ScriptedBackend::default());
        let mux = multiplexer(&backend, SupersedePolicy::Close);
        let handle = tokio::runtime::Handle::current();

        for round in 0..500 {
            let barrier = Arc::new(std::sync::Barrier::new(2));
            let racers: Vec<_> = ["Um", "Dois"]
                .into_iter()
                .map(|topic| {
                    let (mux, handle, barrier) = (mux.clone(), handle.clone(), barrier.clone());
                    std::thread::spawn(move || {
                        let _runtime = handle.enter();
                        barrier.wait();
                        mux.run_generation(CAT, topic).unwrap().epoch
                    })
                })
                .collect();
            let highest = racers.into_iter().map(|r| r.join().unwrap()).max();

            let current = mux.snapshot(CAT).unwrap().epoch;
            assert_eq!(current, highest, "round {round}");
        }
    }

    #[tokio::test]
    async fn test_draining_counts_discarded_fragments() {
        let gate = CancellationToken::new();
        let backend = Arc::new(ScriptedBackend::default())
            .script("A", Variant::Alfa, vec![Step::Wait(gate.clone()), Step::Emit("x"), Step::Emit("y")]);
        let mux = multiplexer(&backend, SupersedePolicy::Drain);

        let stale = mux.run_generation(CAT, "A").unwrap();
        let fresh = mux.run_generation(CAT, "B").unwrap();
        fresh.settled().await;
        gate.cancel();
        stale.settled().await;

        assert_eq!(mux.stats().fragments_discarded, 2);
        assert_eq!(mux.snapshot(CAT).unwrap().buffer(Variant::Alfa).text, "");
    }

    #[tokio::test]
    async fn test_stale_settle_keeps_newer_epoch_loading() {
        let gate = CancellationToken::new();
        let backend = Arc::new(ScriptedBackend::default())
            .script("Novo", Variant::Alfa, vec![Step::Wait(gate.clone()), Step::Emit("fim")]);
        let mux = multiplexer(&backend, SupersedePolicy::Drain);

        let stale = mux.run_generation(CAT, "Velho").unwrap();
        let fresh = mux.run_generation(CAT, "Novo").unwrap();
        stale.settled().await;
        assert!(mux.snapshot(CAT).unwrap().loading);

        gate.cancel();
        fresh.settled().await;
        let snapshot = mux.snapshot(CAT).unwrap();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.buffer(Variant::Alfa).text, "fim");
    }

    #[tokio::test]
    async fn test_backend_failure_soft_fails_into_buffer() {
        let backend = Arc::new(ScriptedBackend::default())
            .script("Erro", Variant::Alfa, vec![Step::Emit("parcial "), Step::Fail("quota")]);
        let mux = multiplexer(&backend, SupersedePolicy::Close);

        mux.run_generation(CAT, "Erro").unwrap().settled().await;

        let snapshot = mux.snapshot(CAT).unwrap();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.buffer(Variant::Alfa).text, "parcial Erro Matrix: quota");
    }

    #[tokio::test]
    async fn test_style_is_captured_at_launch() {
        let gate = CancellationToken::new();
        let backend = Arc::new(ScriptedBackend::default())
            .script("T", Variant::Alfa, vec![Step::Wait(gate.clone())]);
        let mux = multiplexer(&backend, SupersedePolicy::Close);

        let ticket = mux.run_generation(CAT, "T").unwrap();
        mux.set_zeus(true);
        gate.cancel();
        ticket.settled().await;

        assert_eq!(mux.snapshot(CAT).unwrap().variants, vec![Variant::Alfa, Variant::Beta]);
        assert!(mux.style().zeus);
    }

    #[tokio::test]
    async fn test_rerun_and_random_use_session_topics() {
        let backend = Arc::new(ScriptedBackend::default());
        let mux = multiplexer(&backend, SupersedePolicy::Close);

        mux.run_generation(CAT, "Mesmo").unwrap().settled().await;
        mux.rerun(CAT).unwrap().settled().await;
        assert_eq!(mux.snapshot(CAT).unwrap().topic, "Mesmo");

        let category = catalog::category(CAT).unwrap();
        mux.run_random(CAT).unwrap().settled().await;
        let topic = mux.snapshot(CAT).unwrap().topic;
        assert!(category.topics.contains(&topic.as_str()));
        assert_eq!(mux.stats().epochs_minted, 3);
    }

    #[tokio::test]
    async fn test_unknown_and_library_sessions_are_rejected() {
        let mux = multiplexer(&Arc::new(ScriptedBackend::default()), SupersedePolicy::Close);
        assert_eq!(
            mux.run_generation("NADA", "x").unwrap_err(),
            MultiplexError::UnknownSession("NADA".to_string())
        );
        assert_eq!(
            mux.run_generation("ritmos", "x").unwrap_err(),
            MultiplexError::LibraryOnly("RITMOS")
        );
        assert!(mux.snapshots().iter().all(|s| s.category != "RITMOS"));
    }

    #[test]
    fn test_supersede_policy_parsing() {
        assert_eq!("drain".parse::<SupersedePolicy>(), Ok(SupersedePolicy::Drain));
        assert_eq!(" CLOSE ".parse::<SupersedePolicy>(), Ok(SupersedePolicy::Close));
        assert!("never".parse::<SupersedePolicy>().is_err());
    }
}
