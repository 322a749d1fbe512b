//! Launch orchestration.
//!
//! [`Engine`] owns everything one data root needs and drives a launch
//! through its fixed order: ensure the asset, prepare the session, settle
//! the saves, start the emulator, and (once it exits) sync and clean up.

use crate::adapter::{Adapter, SessionInfo};
use crate::assets::{AssetCache, ProgressSink};
use crate::error::{ErrorKind, Result};
use crate::fsutil::{self, blocking};
use crate::layout::Layout;
use crate::recovery;
use crate::saves::{self, ChoiceRequest, LaunchState, Lifecycle, SaveCheck, SaveChoice, SyncReport};
use exn::ResultExt;
use romsync_cache::{Database, LocalAsset, Repository};
use romsync_config::{Config, EmulatorKind};
use romsync_remote::RemoteHandle;
use romsync_remote::models::GameAsset;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::process::Child;
use tokio::sync::{OnceCell, RwLock, RwLockWriteGuard, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, instrument};

type InFlight = Arc<Mutex<HashSet<u64>>>;

/// A running launch.
#[derive(Debug)]
pub struct Launched {
    pub pid: Option<u32>,
    /// Resolves once the emulator exited, saves were synced and the session
    /// was cleaned up.
    pub completion: JoinHandle<Result<LaunchOutcome>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchOutcome {
    pub asset_id: u64,
    pub exit_code: Option<i32>,
    pub choice: SaveChoice,
    /// `None` when syncing itself failed; see `sync_error`.
    pub sync: Option<SyncReport>,
    pub sync_error: Option<String>,
    /// The session directory is kept when its saves could not be mirrored,
    /// so the next crash recovery can still collect them.
    pub session_removed: bool,
}

pub struct Engine {
    config: Config,
    layout: Layout,
    remote: RemoteHandle,
    assets: AssetCache,
    flights: Flights,
    recovery: OnceCell<usize>,
}

impl Engine {
    /// Open the engine on `config.data_root`, creating it and the registry as
    /// needed.
    pub async fn new(config: Config, remote: RemoteHandle) -> Result<Self> {
        config.validate().or_raise(|| ErrorKind::Configuration)?;
        tokio::fs::create_dir_all(&config.data_root).await.or_raise(|| ErrorKind::Configuration)?;
        let database = Database::connect(Layout::new(&config.data_root).registry_path())
            .await
            .or_raise(|| ErrorKind::Registry)?;
        Ok(Self::with_database(config, remote, &database))
    }

    /// Use an already connected registry.
    pub fn with_database(config: Config, remote: RemoteHandle, database: &Database) -> Self {
        let layout = Layout::new(&config.data_root);
        let assets = AssetCache::new(layout.clone(), remote.clone(), Repository::from(database), config.hash_chunk_size);
        Self { config, layout, remote, assets, flights: Flights::default(), recovery: OnceCell::new() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    /// Refuses with [`ErrorKind::AlreadyRunning`] while the asset is being
    /// launched or played, or already being fetched.
    pub async fn ensure_available(&self, asset: &GameAsset, progress: &ProgressSink) -> Result<LocalAsset> {
        self.startup_recovery().await?;
        let _guard = FlightGuard::claim(&self.flights.active, asset.id)?;
        self.assets.ensure_available(asset, progress, None).await
    }

    pub async fn delete_cached(&self, id: u64) -> Result<bool> {
        self.startup_recovery().await?;
        let _guard = FlightGuard::claim(&self.flights.active, id)?;
        self.assets.delete_cached(id).await
    }

    pub async fn check_saves(&self, asset: &GameAsset) -> Result<SaveCheck> {
        let persistent = self.layout.save_dir(&asset.platform, asset.id);
        Ok(saves::compare_saves(&self.remote, asset.id, &persistent).await?.check())
    }

    /// Scan for orphaned sessions now. Sessions of launches already in
    /// flight are skipped; new launches wait until the scan is done.
    pub async fn recover_orphaned_saves(&self) -> Result<usize> {
        let recovered = self.scan_for_orphans().await?;
        // A manual scan also satisfies the startup gate.
        _ = self.recovery.set(recovered);
        Ok(recovered)
    }

    /// Open an emulator on its shared config template, without a game.
    #[instrument(skip_all, fields(emulator = %kind))]
    pub async fn configure_emulator(&self, kind: EmulatorKind) -> Result<Option<u32>> {
        let adapter = Adapter::new(kind, self.config.emulator(kind));
        let mut child = adapter.launch_configuration(&self.layout.emulator_config_dir(kind)).await?;
        let pid = child.id();
        tokio::spawn(
            async move {
                match child.wait().await {
                    Ok(status) => tracing::info!(code = status.code(), "Configuration session ended"),
                    Err(err) => tracing::warn!(error = %err, "Lost track of configuration session"),
                }
            }
            .in_current_span(),
        );
        Ok(pid)
    }

    /// Launch an asset, reconciling saves first.
    ///
    /// Returns as soon as the emulator is running. Sync and cleanup happen in
    /// the background and are reported through [`Launched::completion`].
    #[instrument(skip_all, fields(asset_id = asset.id, platform = %asset.platform))]
    pub async fn launch_with_reconciliation(
        &self,
        asset: &GameAsset,
        progress: ProgressSink,
        choices: Option<mpsc::Sender<ChoiceRequest>>,
    ) -> Result<Launched> {
        self.startup_recovery().await?;
        let guard = self.flights.claim(asset.id).await?;

        let adapter = Adapter::for_platform(&self.config, &asset.platform)?;
        adapter.executable()?;
        let local = self.assets.ensure_available(asset, &progress, None).await?;
        let payload = AssetCache::find_payload(&local)?;

        let session_dir = self.layout.session_dir(&asset.platform, asset.id);
        let persistent = self.layout.save_dir(&asset.platform, asset.id);
        let template = self.layout.emulator_config_dir(adapter.kind());
        let info = adapter.prepare_session_environment(&local.asset, &payload, &session_dir, &template).await?;

        let mut lifecycle = Lifecycle::new(asset.id);
        let started = self.settle_and_start(&adapter, asset.id, &info, &persistent, &payload, &mut lifecycle, choices).await;
        let (child, choice) = match started {
            Ok(started) => started,
            Err(err) => {
                // Nothing has run in the session yet; it holds no new saves.
                tracing::debug!(state = ?lifecycle.state(), "Launch aborted before the emulator started");
                discard_session(&info.session_dir).await;
                _ = lifecycle.advance(LaunchState::Cleaned);
                return Err(err);
            },
        };
        let pid = child.id();
        let remote = self.remote.clone();
        let completion = tokio::spawn(
            async move {
                let outcome = supervise(adapter, remote, child, info, persistent, lifecycle, choice).await;
                drop(guard);
                outcome
            }
            .in_current_span(),
        );
        Ok(Launched { pid, completion })
    }

    /// Runs the first recovery scan, once, before any asset id is claimed.
    async fn startup_recovery(&self) -> Result<()> {
        self.recovery.get_or_try_init(|| self.scan_for_orphans()).await?;
        Ok(())
    }

    async fn scan_for_orphans(&self) -> Result<usize> {
        let (_scan, active) = self.flights.exclusive().await;
        recovery::recover_orphaned_saves(&self.config, &self.layout, &active).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn settle_and_start(
        &self,
        adapter: &Adapter,
        asset_id: u64,
        info: &SessionInfo,
        persistent: &Path,
        payload: &Path,
        lifecycle: &mut Lifecycle,
        choices: Option<mpsc::Sender<ChoiceRequest>>,
    ) -> Result<(Child, SaveChoice)> {
        let comparison = saves::compare_saves(&self.remote, asset_id, persistent).await?;
        let choice = match saves::auto_choice(&comparison) {
            Some(choice) => choice,
            None => {
                lifecycle.advance(LaunchState::NeedsChoice)?;
                lifecycle.advance(LaunchState::AwaitingChoice)?;
                saves::request_choice(choices.as_ref(), asset_id, &comparison, self.config.choice_timeout()).await
            },
        };
        lifecycle.advance(LaunchState::Resolved)?;
        tracing::info!(?choice, "Save state resolved");
        saves::apply_choice(adapter, &self.remote, asset_id, choice, info, &comparison, persistent).await?;
        let child = adapter.launch(payload, &info.session_dir)?;
        lifecycle.advance(LaunchState::Running)?;
        Ok((child, choice))
    }
}

/// Wait for the emulator, then sync and clean up.
async fn supervise(
    adapter: Adapter,
    remote: RemoteHandle,
    mut child: Child,
    info: SessionInfo,
    persistent: PathBuf,
    mut lifecycle: Lifecycle,
    choice: SaveChoice,
) -> Result<LaunchOutcome> {
    let asset_id = lifecycle.asset_id();
    // Saves are synced whatever the exit status, even if waiting failed.
    let exit_code = match child.wait().await {
        Ok(status) => {
            tracing::info!(code = status.code(), "Emulator exited");
            status.code()
        },
        Err(err) => {
            tracing::warn!(error = %err, "Lost track of the emulator process");
            None
        },
    };
    lifecycle.advance(LaunchState::Syncing)?;
    let (sync, sync_error) = match saves::sync_after_exit(&adapter, &remote, asset_id, &info, &persistent).await {
        Ok(report) => {
            tracing::info!(result = %report.message(), "Save sync finished");
            (Some(report), None)
        },
        Err(err) => {
            tracing::warn!(error = ?err, "Saves could not be mirrored; keeping the session for recovery");
            (None, Some((*err).to_string()))
        },
    };
    let session_removed = sync.is_some() && discard_session(&info.session_dir).await;
    lifecycle.advance(LaunchState::Cleaned)?;
    Ok(LaunchOutcome { asset_id, exit_code, choice, sync, sync_error, session_removed })
}

async fn discard_session(session_dir: &Path) -> bool {
    let path = session_dir.to_path_buf();
    match blocking(move || fsutil::remove_path(&path)).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(path = %session_dir.display(), error = %err, "Failed to remove session directory");
            false
        },
    }
}

/// Asset ids with a launch or cache operation in flight, plus the gate that
/// keeps launches from starting while a recovery scan runs.
#[derive(Debug, Default)]
struct Flights {
    active: InFlight,
    scan: RwLock<()>,
}
impl Flights {
    /// Claim `id` for a launch, waiting for any running recovery scan.
    async fn claim(&self, id: u64) -> Result<FlightGuard> {
        let _scan = self.scan.read().await;
        FlightGuard::claim(&self.active, id)
    }

    /// Block new launch claims and snapshot the ids already claimed.
    async fn exclusive(&self) -> (RwLockWriteGuard<'_, ()>, HashSet<u64>) {
        let scan = self.scan.write().await;
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner).clone();
        (scan, active)
    }
}

/// Marks one asset id as busy until dropped.
#[derive(Debug)]
struct FlightGuard {
    id: u64,
    in_flight: InFlight,
}
impl FlightGuard {
    fn claim(in_flight: &InFlight, id: u64) -> Result<Self> {
        if !in_flight.lock().unwrap_or_else(PoisonError::into_inner).insert(id) {
            exn::bail!(ErrorKind::AlreadyRunning(id));
        }
        Ok(Self { id, in_flight: in_flight.clone() })
    }
}
impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.id);
    }
}
