//! Spawned-controller tests: the driver loop, its polls, and their
//! self-cancellation behavior, driven with short intervals.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voluma::Result;
use voluma::audio::{AudioGraph, GraphState, MediaElementId, SoftwareGraph};
use voluma::config::WatchConfig;
use voluma::controller::{MemoryLink, NoNotice, PageEvent, TabCommand, TabController, TabReply, spawn};
use voluma::memory::{MemoryRecord, SaveOutcome, SettingsStore};
use voluma::page::FixedPage;
use voluma::storage::MemoryKvStore;
use voluma::tabs::{NoBadge, TabId};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=Z0001";

/// Graph observable from outside the spawned controller task.
#[derive(Clone)]
struct SharedGraph(Arc<Mutex<SoftwareGraph>>);

impl SharedGraph {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(SoftwareGraph::new())))
    }

    fn connected_count(&self) -> usize {
        self.0.lock().expect("lock").connected_count()
    }
}

impl AudioGraph for SharedGraph {
    fn gain(&self) -> f32 {
        self.0.lock().expect("lock").gain()
    }

    fn set_gain(&mut self, gain: f32) {
        self.0.lock().expect("lock").set_gain(gain);
    }

    fn state(&self) -> GraphState {
        self.0.lock().expect("lock").state()
    }

    fn resume(&mut self) -> Result<()> {
        self.0.lock().expect("lock").resume()
    }

    fn connect(&mut self, element: MediaElementId) -> Result<()> {
        self.0.lock().expect("lock").connect(element)
    }
}

struct StoreLink {
    store: SettingsStore<Arc<MemoryKvStore>>,
    saves: AtomicUsize,
}

impl StoreLink {
    async fn enabled() -> Arc<Self> {
        let store = SettingsStore::new(Arc::new(MemoryKvStore::new()));
        store.set_memory_enabled(true).await.expect("toggle");
        Arc::new(Self {
            store,
            saves: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MemoryLink for StoreLink {
    async fn save(
        &self,
        url: &str,
        volume_percent: u32,
        is_muted: bool,
        title: Option<String>,
    ) -> Result<SaveOutcome> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.store.save(url, volume_percent, is_muted, title.as_deref()).await
    }

    async fn find(&self, url: &str) -> Result<Option<MemoryRecord>> {
        self.store.find(url).await
    }
}

fn fast_watch(max_attempts: u32) -> WatchConfig {
    WatchConfig {
        navigation_poll_ms: 10,
        element_poll_ms: 10,
        element_poll_max_attempts: max_attempts,
    }
}

fn spawn_controller(
    page: Arc<FixedPage>,
    link: Arc<StoreLink>,
    graph: SharedGraph,
    watch: WatchConfig,
) -> voluma::controller::ControllerHandle {
    spawn(TabController::new(
        TabId(1),
        graph,
        page,
        link,
        Arc::new(NoBadge),
        Arc::new(NoNotice),
        watch,
    ))
}

#[tokio::test]
async fn discovery_poll_binds_a_late_player_and_stops() {
    let page = Arc::new(FixedPage::new(WATCH_URL));
    let link = StoreLink::enabled().await;
    let graph = SharedGraph::new();
    let handle = spawn_controller(page.clone(), link, graph.clone(), fast_watch(200));

    assert_eq!(graph.connected_count(), 0);

    // The player renders late, with no creation hook; only the poll sees it.
    tokio::time::sleep(Duration::from_millis(30)).await;
    page.set_player(MediaElementId(42));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(graph.connected_count(), 1);

    handle.shutdown();
}

#[tokio::test]
async fn discovery_poll_gives_up_after_its_budget() {
    let page = Arc::new(FixedPage::new(WATCH_URL));
    let link = StoreLink::enabled().await;
    let graph = SharedGraph::new();
    let handle = spawn_controller(page.clone(), link, graph.clone(), fast_watch(3));

    // Let the attempt budget run out before the player ever appears.
    tokio::time::sleep(Duration::from_millis(120)).await;
    page.set_player(MediaElementId(42));
    tokio::time::sleep(Duration::from_millis(80)).await;

    // The poll cancelled itself, so the late player is never bound by it.
    assert_eq!(graph.connected_count(), 0);

    // A mutation event still binds it.
    handle.page_event(PageEvent::ElementAdded(MediaElementId(42)));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(graph.connected_count(), 1);

    handle.shutdown();
}

#[tokio::test]
async fn navigation_poll_primes_the_tracker_from_memory() {
    let page = Arc::new(FixedPage::new("https://www.youtube.com/watch?v=FIRST"));
    let link = StoreLink::enabled().await;
    let graph = SharedGraph::new();
    let handle = spawn_controller(page.clone(), link.clone(), graph, fast_watch(1));

    // A record exists for the video the page is about to navigate to.
    link.store.save(WATCH_URL, 150, false, None).await.expect("seed");

    page.navigate(WATCH_URL);
    tokio::time::sleep(Duration::from_millis(60)).await;

    // Re-applying the remembered value through the user path is treated as
    // unchanged: no save goes out.
    handle
        .command(TabCommand::SetVolume {
            volume: 1.5,
            show_notification: false,
            is_memory_apply: false,
        })
        .await
        .expect("command");
    assert_eq!(link.saves.load(Ordering::SeqCst), 0);

    handle.shutdown();
}

#[tokio::test]
async fn commands_round_trip_through_the_handle() {
    let page = Arc::new(FixedPage::new(WATCH_URL));
    page.set_candidates(vec!["A Proper Video Title".into()]);
    let link = StoreLink::enabled().await;
    let graph = SharedGraph::new();
    let handle = spawn_controller(page, link, graph, fast_watch(1));

    handle
        .command(TabCommand::SetVolume {
            volume: 1.5,
            show_notification: false,
            is_memory_apply: false,
        })
        .await
        .expect("set volume");

    let reply = handle
        .command(TabCommand::GetCurrentVolumeState)
        .await
        .expect("get state");
    match reply {
        TabReply::State(state) => {
            assert!((state.volume - 1.5).abs() < 1e-6);
            assert!(!state.is_muted);
        }
        other => panic!("unexpected reply: {other:?}"),
    }

    let reply = handle
        .command(TabCommand::GetCleanVideoTitle)
        .await
        .expect("get title");
    match reply {
        TabReply::Title { title } => assert_eq!(title, "A Proper Video Title"),
        other => panic!("unexpected reply: {other:?}"),
    }

    handle.shutdown();
}

#[tokio::test]
async fn shutdown_tears_the_controller_down() {
    let page = Arc::new(FixedPage::new(WATCH_URL));
    let link = StoreLink::enabled().await;
    let graph = SharedGraph::new();
    let handle = spawn_controller(page, link, graph, fast_watch(1));

    handle.shutdown();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let result = handle.command(TabCommand::GetCurrentVolumeState).await;
    assert!(result.is_err());
}
