// Headless monitor-room viewer: connects watch-only, keeps feeds and a bank
// of monitors in sync with server snapshots, and logs what each screen shows.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{error, info};

use surveillance_client::config;
use surveillance_client::feeds::{FeedRenderer, FeedView, RenderTarget, Scene, SceneEntity};
use surveillance_client::monitors::{MonitorBank, MonitorLayout};
use surveillance_client::protocol::{ClientMessage, Rotation, ServerMessage, Vec3};
use surveillance_client::session::{SessionRole, run_session};
use surveillance_client::snapshot::SnapshotCache;

/// Minimal scene: every entity named by a snapshot is considered present,
/// and rendering fills the target with a flat per-camera shade. Enough to
/// exercise the full feed pipeline without a GPU.
struct HeadlessScene;

impl Scene for HeadlessScene {
    fn set_visible(&mut self, _entity: &SceneEntity, _visible: bool) -> bool {
        true
    }

    fn render(&mut self, view: &FeedView, target: &mut RenderTarget) {
        let shade = view
            .camera_id
            .bytes()
            .fold(0u8, |acc, b| acc.wrapping_add(b));
        for pixel in target.pixels_mut().chunks_exact_mut(4) {
            pixel[0] = shade;
            pixel[1] = shade;
            pixel[2] = shade;
            pixel[3] = 0xff;
        }
    }
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    init_runtime();

    let url = config::server_url();
    let (request_tx, request_rx) = mpsc::channel::<ClientMessage>(32);
    let (event_tx, mut event_rx) = mpsc::channel::<ServerMessage>(64);

    let session = tokio::spawn(async move {
        if let Err(e) = run_session(&url, SessionRole::WatchOnly, request_rx, event_tx).await {
            error!(error = %e, "session ended");
        }
    });

    let mut cache = SnapshotCache::new();
    let mut feeds = FeedRenderer::new(config::feed_quality());
    let mut scene = HeadlessScene;

    let mut bank = MonitorBank::new();
    bank.create_monitors(
        Vec3::ZERO,
        Rotation::LEVEL,
        4,
        MonitorLayout::Grid { columns: 2 },
        (0, 0),
    );

    let mut tick = tokio::time::interval(Duration::from_millis(33));
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    ServerMessage::Snapshot(snapshot) => {
                        let applied = cache.apply(snapshot, Instant::now());
                        for id in &applied.removed {
                            feeds.dispose_feed(id);
                        }
                        for id in &applied.added {
                            if let Some(camera) = cache.get(id) {
                                feeds.ensure_feed(camera);
                            }
                        }
                        // Cycle new cameras onto free monitors.
                        for id in &applied.added {
                            if let Some(free) = bank
                                .monitors()
                                .iter()
                                .find(|m| m.bound_camera.is_none())
                                .map(|m| m.id.clone())
                            {
                                bank.bind(&free, Some(id.clone()), &feeds);
                                info!(monitor = %free, camera = %id, "monitor bound");
                            }
                        }
                    }
                    ServerMessage::Identity { participant_id } => {
                        info!(?participant_id, "connected");
                    }
                    other => {
                        info!(?other, "server message");
                    }
                }
            }
            _ = tick.tick() => {
                feeds.render_all(&mut scene, &cache, Instant::now(), false);
                bank.refresh_all(&feeds);
            }
        }
    }

    feeds.dispose_all();
    drop(request_tx);
    let _ = session.await;
}
