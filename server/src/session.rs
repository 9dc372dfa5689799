//! The session: single owner of the authoritative state.
//!
//! Every mutation — scheduled ticks, transactions, point adjustments,
//! lifecycle transitions — goes through a method here, which takes the one
//! write lock, applies the engine function, drops the lock, and only then
//! broadcasts. Observers therefore never see a partially-applied state.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use actibourse_engine as engine;
use actibourse_engine::transaction::Executed;
use actibourse_types::api::{Action, Command, TransactionError, Update};
use actibourse_types::config::Config;
use actibourse_types::session::{Mode, SessionState};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::scheduler::Scheduler;

/// Capacity of the update fan-out channel. Slow observers that fall further
/// behind than this start losing updates (and are told so).
const UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// Handle to one running session. Cheap to clone; all clones share the same
/// state, scheduler and broadcast channel.
#[derive(Clone)]
pub struct Session {
    config: Arc<Config>,
    state: Arc<RwLock<SessionState>>,
    update_tx: broadcast::Sender<Update>,
    scheduler: Arc<Scheduler>,
}

/// Current unix time in milliseconds.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Session {
    pub fn new(config: Config) -> Self {
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let state = Arc::new(RwLock::new(SessionState::new(&config)));
        Self {
            config: Arc::new(config),
            state,
            update_tx,
            scheduler: Arc::new(Scheduler::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to the update stream. The full state arrives separately on
    /// connect via [`Session::snapshot`].
    pub fn subscribe(&self) -> broadcast::Receiver<Update> {
        self.update_tx.subscribe()
    }

    /// Consistent copy of the whole session state.
    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    // Engine mutations never panic between field writes, so a poisoned lock
    // still guards a coherent state and is safe to recover.
    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn broadcast(&self, update: Update) {
        if self.update_tx.send(update).is_err() {
            debug!("no observers subscribed");
        }
    }

    fn broadcast_state(&self) {
        let state = self.snapshot();
        self.broadcast(Update::State { state });
    }

    /// Start the session, or switch cadence while running. The old timer is
    /// always cleared before the new one is armed.
    pub fn start(&self, mode: Mode) {
        self.scheduler.disarm();
        let start_time = now_millis();
        {
            let mut state = self.write();
            engine::lifecycle::start(&mut state, mode, start_time);
        }
        self.scheduler.arm(self.clone(), mode);
        self.broadcast(Update::Started { start_time });
        info!(?mode, "session started");
    }

    /// Suspend the session. Idempotent: a second pause broadcasts nothing.
    pub fn pause(&self) {
        self.scheduler.disarm();
        let changed = {
            let mut state = self.write();
            engine::lifecycle::pause(&mut state, now_millis())
        };
        if changed {
            self.broadcast(Update::Paused);
            info!("session paused");
        }
    }

    /// Stop and rebuild everything from the configuration.
    pub fn reset(&self) {
        self.scheduler.disarm();
        {
            let mut state = self.write();
            engine::lifecycle::reset(&mut state, &self.config, now_millis());
        }
        self.broadcast(Update::Reset);
        self.broadcast_state();
        info!("session reset");
    }

    /// Run the price engine once, regardless of the running state.
    pub fn force_update(&self) {
        let stocks = {
            let mut state = self.write();
            let mut rng = rand::thread_rng();
            engine::price::update_all(&mut state, &self.config.price, &mut rng);
            state.stocks.clone()
        };
        self.broadcast(Update::Stocks { stocks });
        info!("forced price update");
    }

    /// One scheduler tick. Re-validates the lifecycle flags under the lock so
    /// a timer that fires just after a pause or reset is a safe no-op.
    /// Returns whether the timer chain should stay alive.
    pub(crate) fn tick(&self, expected: Mode) -> bool {
        let stocks = {
            let mut state = self.write();
            if !state.is_running || state.mode != expected {
                debug!(?expected, "stale timer tick ignored");
                return false;
            }
            let mut rng = rand::thread_rng();
            engine::price::update_all(&mut state, &self.config.price, &mut rng);
            state.stocks.clone()
        };
        self.broadcast(Update::Stocks { stocks });
        true
    }

    pub fn transaction(
        &self,
        team_id: &str,
        stock_id: &str,
        action: Action,
        quantity: u32,
    ) -> Result<Executed, TransactionError> {
        let result = {
            let mut state = self.write();
            engine::transaction::execute(&mut state, team_id, stock_id, action, quantity, now_millis())
        };
        match &result {
            Ok(receipt) => {
                self.broadcast_state();
                info!(
                    team = receipt.team_id,
                    stock = receipt.stock_id,
                    ?action,
                    quantity,
                    cost = receipt.total_cost,
                    "transaction executed"
                );
            }
            Err(err) => debug!(%err, "transaction rejected"),
        }
        result
    }

    pub fn adjust_points(&self, team_id: &str, delta: i64) -> Result<f64, TransactionError> {
        let result = {
            let mut state = self.write();
            engine::transaction::adjust_points(&mut state, team_id, delta, now_millis())
        };
        if result.is_ok() {
            self.broadcast_state();
            info!(team = team_id, delta, "points adjusted");
        }
        result
    }

    /// Apply one observer command. Used identically by the HTTP and
    /// WebSocket paths. `Ok(Some(_))` is a direct reply to the caller;
    /// broadcasts to everyone happen inside the individual methods.
    pub fn apply(&self, command: Command) -> Result<Option<Update>, TransactionError> {
        match command {
            Command::Start { mode } => {
                self.start(mode);
                Ok(None)
            }
            Command::Pause => {
                self.pause();
                Ok(None)
            }
            Command::Reset => {
                self.reset();
                Ok(None)
            }
            Command::ForceUpdate => {
                self.force_update();
                Ok(None)
            }
            Command::Transaction {
                team_id,
                stock_id,
                action,
                quantity,
            } => {
                self.transaction(&team_id, &stock_id, action, quantity)?;
                Ok(None)
            }
            Command::AdjustPoints { team_id, delta } => {
                self.adjust_points(&team_id, delta)?;
                Ok(None)
            }
            Command::RequestState => Ok(Some(Update::State {
                state: self.snapshot(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    fn test_config() -> Config {
        Config {
            test_update_interval_ms: 10_000,
            // Equal bounds make the game-mode delay deterministic.
            game_min_interval_ms: 60_000,
            game_max_interval_ms: 60_000,
            ..Config::default()
        }
    }

    /// Count the stock-only updates currently buffered for this receiver.
    fn drain_stock_updates(rx: &mut broadcast::Receiver<Update>) -> usize {
        let mut count = 0;
        while let Ok(update) = rx.try_recv() {
            if matches!(update, Update::Stocks { .. }) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test(start_paused = true)]
    async fn test_test_mode_fires_on_fixed_interval() {
        let session = Session::new(test_config());
        let mut rx = session.subscribe();

        session.start(Mode::Test);
        sleep(Duration::from_millis(35_000)).await;
        assert_eq!(drain_stock_updates(&mut rx), 3);

        session.pause();
        sleep(Duration::from_millis(60_000)).await;
        assert_eq!(drain_stock_updates(&mut rx), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_mode_rearms_itself() {
        let session = Session::new(test_config());
        let mut rx = session.subscribe();

        session.start(Mode::Game);
        // Delay is pinned to 60s; three chained one-shots fit in 185s.
        sleep(Duration::from_millis(185_000)).await;
        assert_eq!(drain_stock_updates(&mut rx), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_leaves_one_timer() {
        let session = Session::new(test_config());
        let mut rx = session.subscribe();

        session.start(Mode::Test);
        session.start(Mode::Test);
        sleep(Duration::from_millis(25_000)).await;
        // Two timers would produce four updates here.
        assert_eq!(drain_stock_updates(&mut rx), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_switch_swaps_cadence() {
        let session = Session::new(test_config());
        let mut rx = session.subscribe();

        session.start(Mode::Test);
        sleep(Duration::from_millis(15_000)).await;
        assert_eq!(drain_stock_updates(&mut rx), 1);

        // Switch to game cadence: the 10s timer must die with it.
        session.start(Mode::Game);
        sleep(Duration::from_millis(125_000)).await;
        assert_eq!(drain_stock_updates(&mut rx), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_tick_is_a_noop() {
        let session = Session::new(test_config());
        let mut rx = session.subscribe();

        session.start(Mode::Test);
        session.pause();
        // A tick raced past the pause: it must neither mutate nor broadcast.
        assert!(!session.tick(Mode::Test));
        // A tick armed under the other mode is equally stale.
        session.start(Mode::Game);
        assert!(!session.tick(Mode::Test));
        assert_eq!(drain_stock_updates(&mut rx), 0);

        let state = session.snapshot();
        for stock in state.stocks.values() {
            assert_eq!(stock.history.len(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_broadcasts_once() {
        let session = Session::new(test_config());
        let mut rx = session.subscribe();

        session.start(Mode::Test);
        session.pause();
        session.pause();

        let mut paused = 0;
        while let Ok(update) = rx.try_recv() {
            if matches!(update, Update::Paused) {
                paused += 1;
            }
        }
        assert_eq!(paused, 1);
        assert_eq!(session.snapshot().history.len(), 2);
    }

    #[tokio::test]
    async fn test_transaction_broadcasts_full_state() {
        let session = Session::new(test_config());
        let mut rx = session.subscribe();

        session
            .transaction("panda", "benco", Action::Buy, 5)
            .unwrap();
        match rx.try_recv().unwrap() {
            Update::State { state } => {
                assert_eq!(state.teams["panda"].points, 250.0);
                assert_eq!(state.teams["panda"].portfolio["benco"], 5);
            }
            other => panic!("expected full state, got {other:?}"),
        }

        // A rejected transaction broadcasts nothing.
        let err = session
            .transaction("panda", "benco", Action::Buy, 1_000)
            .unwrap_err();
        assert!(matches!(err, TransactionError::InsufficientFunds { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reset_restores_initial_state() {
        let session = Session::new(test_config());
        session.start(Mode::Test);
        session
            .transaction("panda", "benco", Action::Buy, 5)
            .unwrap();
        session.adjust_points("canard", -1_000).unwrap();

        session.reset();
        let state = session.snapshot();
        assert!(!state.is_running);
        assert_eq!(state.start_time, None);
        assert_eq!(state.teams["panda"].points, 500.0);
        assert_eq!(state.teams["canard"].points, 500.0);
        assert_eq!(state.investments["benco"], 0);
    }
}
