//! Coordinator runtime — wires storage, settlement, the lifecycle
//! controller, the timeout sweeper, and the RPC/WebSocket servers into a
//! running daemon.

use crate::shutdown::ShutdownController;
use arena_coordinator::{CoordinatorConfig, LifecycleController, TimeoutSweeper};
use arena_rpc::RpcServer;
use arena_settlement::JournalSettlementClient;
use arena_store::ChallengeStore;
use arena_store_lmdb::LmdbEnvironment;
use arena_websocket::{WebSocketServer, WsState};
use arena_utils::format_duration;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info};

const STOP_GRACE: Duration = Duration::from_secs(5);

/// A fully wired coordinator instance.
pub struct CoordinatorRuntime {
    config: CoordinatorConfig,
    store: Arc<dyn ChallengeStore>,
    controller: Arc<LifecycleController>,
    shutdown: ShutdownController,
    task_handles: Vec<JoinHandle<()>>,
    started_at: Instant,
}

impl CoordinatorRuntime {
    /// Open storage and the settlement journal and build the controller.
    pub fn new(config: CoordinatorConfig) -> anyhow::Result<Self> {
        let env = LmdbEnvironment::open(&config.data_dir, 4, config.map_size)?;
        let store: Arc<dyn ChallengeStore> = Arc::new(env.challenge_store());

        let journal_path = config.data_dir.join("settlement.journal");
        let client = Arc::new(JournalSettlementClient::open(&journal_path)?);

        let controller = Arc::new(LifecycleController::new(
            Arc::clone(&store),
            client,
            config.params.clone(),
        ));

        Ok(Self {
            config,
            store,
            controller,
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
            started_at: Instant::now(),
        })
    }

    /// Start all subsystems and block until a shutdown signal arrives.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        // ── Timeout sweeper ───────────────────────────────────────────────
        let sweeper = TimeoutSweeper::new(Arc::clone(&self.controller), Arc::clone(&self.store));
        let sweeper_shutdown = self.shutdown.subscribe();
        let sweeper_handle = tokio::spawn(async move {
            sweeper.run(sweeper_shutdown).await;
        });
        self.task_handles.push(sweeper_handle);

        // ── WebSocket server (optional) ───────────────────────────────────
        if self.config.enable_websocket {
            let ws_state = Arc::new(WsState::new(256));
            let events = self.controller.subscribe();
            let bridge_state = Arc::clone(&ws_state);
            let bridge_handle = tokio::spawn(async move {
                bridge_state.forward_coordinator_events(events).await;
            });
            self.task_handles.push(bridge_handle);

            let ws_server = WebSocketServer::with_state(self.config.websocket_port, ws_state);
            let mut shutdown_rx_ws = self.shutdown.subscribe();
            let ws_handle = tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = shutdown_rx_ws.changed() => {
                        info!("WebSocket server shutting down");
                    }
                    result = ws_server.start() => {
                        match result {
                            Ok(()) => info!("WebSocket server exited"),
                            Err(e) => error!("WebSocket server error: {e}"),
                        }
                    }
                }
            });
            self.task_handles.push(ws_handle);
        }

        // ── RPC server (optional) ─────────────────────────────────────────
        if self.config.enable_rpc {
            let rpc_server = RpcServer::new(self.config.rpc_port, Arc::clone(&self.controller));
            let mut shutdown_rx_rpc = self.shutdown.subscribe();
            let rpc_handle = tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = shutdown_rx_rpc.changed() => {
                        info!("RPC server shutting down");
                    }
                    result = rpc_server.start() => {
                        match result {
                            Ok(()) => info!("RPC server exited"),
                            Err(e) => error!("RPC server error: {e}"),
                        }
                    }
                }
            });
            self.task_handles.push(rpc_handle);
        }

        info!("ARENA coordinator started — all subsystems running");

        self.shutdown.wait_for_signal().await;

        Ok(())
    }

    /// Stop the coordinator gracefully: signal all tasks, then wait for
    /// them to drain (with a timeout, aborting stragglers).
    pub async fn stop(&mut self) {
        info!("ARENA coordinator stopping");
        self.shutdown.shutdown();

        for handle in self.task_handles.drain(..) {
            let abort = handle.abort_handle();
            if tokio::time::timeout(STOP_GRACE, handle).await.is_err() {
                abort.abort();
            }
        }

        info!(
            "ARENA coordinator stopped (uptime {})",
            format_duration(self.started_at.elapsed().as_secs())
        );
    }
}
