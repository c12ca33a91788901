//! The director: owns every resource, provisions the second desk, stimulates
//! temporary leaves, watches the capacity invariant and orchestrates
//! shutdown.
//!
//! The director never sits on the data path. Its run loop is three interval
//! cadences plus the shutdown triggers:
//!
//! - every 100 ms: second-desk provisioning and the duration check,
//! - every 1 s: a 5% chance of sending one random specialist on a
//!   temporary leave,
//! - every 5 s: a monitor line and the optional waiting-room reconcile.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sorsim_config::SimConfig;
use sorsim_protocol::{
    ActorId, EventRecord, Role, SimLogRecord, Specialty, LOG_END_SENTINEL,
};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::actors::{
    GeneratorActor, LoggerActor, RegistrationActor, SpecialistActor, TriageActor,
};
use crate::channel::{KeyedChannel, DEFAULT_CHANNEL_CAPACITY};
use crate::clock::SimClock;
use crate::error::{KernelError, Result};
use crate::ids::IdAllocator;
use crate::journal::{Journal, LogHub, MetricsContext, LOG_KEY};
use crate::rng::SimRng;
use crate::signal::Stimulus;
use crate::state::{SharedState, StateInner};
use crate::summary;
use crate::waiting_room::WaitingRoom;

const PROVISION_PERIOD: Duration = Duration::from_millis(100);
const LEAVE_STIMULUS_PERIOD: Duration = Duration::from_secs(1);
const MONITOR_PERIOD: Duration = Duration::from_secs(5);
/// Upper bound on joining any single actor during shutdown.
const JOIN_DEADLINE: Duration = Duration::from_secs(5);
/// Chance per stimulus tick of sending one specialist on leave, percent.
const LEAVE_CHANCE_PERCENT: u32 = 5;

/// Why the simulation came down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl-C / interrupt.
    Interrupt,
    /// External evacuation order ([`ShutdownHandle::evacuate`] or SIGTERM).
    Evacuation,
    /// The configured wall-clock duration elapsed.
    DurationReached,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownReason::Interrupt => "interrupt",
            ShutdownReason::Evacuation => "evacuation",
            ShutdownReason::DurationReached => "durationReached",
        })
    }
}

/// Second-desk provisioning decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeskAction {
    Open,
    Close,
}

/// Pure provisioning policy: open the second desk at `open_at`, close it
/// below `close_below`. The gap between the two gives the hysteresis that
/// keeps the desk from flapping.
pub fn provisioning_action(
    reg_len: u32,
    desk_open: bool,
    open_at: u32,
    close_below: u32,
) -> Option<DeskAction> {
    if !desk_open && reg_len >= open_at {
        Some(DeskAction::Open)
    } else if desk_open && reg_len < close_below {
        Some(DeskAction::Close)
    } else {
        None
    }
}

/// External trigger for a cooperative shutdown.
#[derive(Clone)]
pub struct ShutdownHandle(Stimulus);

impl ShutdownHandle {
    pub fn evacuate(&self) {
        self.0.raise();
    }
}

/// What a completed run looked like.
#[derive(Debug)]
pub struct RunReport {
    pub reason: ShutdownReason,
    pub state: StateInner,
    pub log_path: PathBuf,
    pub summary_path: PathBuf,
}

struct ActorHandle {
    id: ActorId,
    stop: Stimulus,
    leave: Option<Stimulus>,
    join: JoinHandle<()>,
}

impl ActorHandle {
    fn is_live(&self) -> bool {
        !self.join.is_finished()
    }
}

/// Everything the spawn helpers need, assembled once at bootstrap.
struct Resources {
    config: SimConfig,
    reg_chan: KeyedChannel<EventRecord>,
    triage_chan: KeyedChannel<EventRecord>,
    spec_chans: [KeyedChannel<EventRecord>; Specialty::COUNT],
    log_chan: KeyedChannel<SimLogRecord>,
    waiting: Arc<WaitingRoom>,
    state: Arc<SharedState>,
    clock: Arc<SimClock>,
    hub: LogHub,
    ids: IdAllocator,
}

impl Resources {
    fn spawn_registration(&self, role: Role) -> ActorHandle {
        let id = self.ids.next();
        let stop = Stimulus::new();
        let actor = RegistrationActor {
            reg_chan: self.reg_chan.clone(),
            triage_chan: self.triage_chan.clone(),
            waiting: Arc::clone(&self.waiting),
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            journal: self.hub.journal(id, role),
            stop: stop.clone(),
            service_ms: self.config.registration_service_ms,
        };
        ActorHandle {
            id,
            stop,
            leave: None,
            join: tokio::spawn(actor.run()),
        }
    }

    fn spawn_triage(&self, rng: SimRng) -> ActorHandle {
        let id = self.ids.next();
        let stop = Stimulus::new();
        let actor = TriageActor {
            triage_chan: self.triage_chan.clone(),
            spec_chans: self.spec_chans.clone(),
            waiting: Arc::clone(&self.waiting),
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            journal: self.hub.journal(id, Role::Triage),
            stop: stop.clone(),
            rng,
            service_ms: self.config.triage_service_ms,
        };
        ActorHandle {
            id,
            stop,
            leave: None,
            join: tokio::spawn(actor.run()),
        }
    }

    fn spawn_specialist(&self, specialty: Specialty, rng: SimRng) -> ActorHandle {
        let id = self.ids.next();
        let stop = Stimulus::new();
        let leave = Stimulus::new();
        let actor = SpecialistActor {
            specialty,
            chan: self.spec_chans[specialty.index()].clone(),
            waiting: Arc::clone(&self.waiting),
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            journal: self.hub.journal(id, Role::Specialist),
            stop: stop.clone(),
            leave: leave.clone(),
            rng,
            exam_ms: (
                self.config.specialist_exam_min_ms,
                self.config.specialist_exam_max_ms,
            ),
            leave_ms: (
                self.config.specialist_leave_min_ms,
                self.config.specialist_leave_max_ms,
            ),
        };
        ActorHandle {
            id,
            stop,
            leave: Some(leave),
            join: tokio::spawn(actor.run()),
        }
    }

    fn spawn_generator(&self, rng: SimRng) -> ActorHandle {
        let id = self.ids.next();
        let stop = Stimulus::new();
        let actor = GeneratorActor {
            reg_chan: self.reg_chan.clone(),
            waiting: Arc::clone(&self.waiting),
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            hub: self.hub.clone(),
            ids: self.ids.clone(),
            journal: self.hub.journal(id, Role::PatientGen),
            stop: stop.clone(),
            rng,
            gen_ms: (self.config.patient_gen_min_ms, self.config.patient_gen_max_ms),
            vip_percent: 10,
        };
        ActorHandle {
            id,
            stop,
            leave: None,
            join: tokio::spawn(actor.run()),
        }
    }
}

pub struct Director {
    config: SimConfig,
    log_path: PathBuf,
    summary_path: PathBuf,
    evacuation: Stimulus,
    os_signals: bool,
}

impl Director {
    /// A director for a validated config, writing to timestamped default
    /// paths in the working directory.
    pub fn new(config: SimConfig) -> Director {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Director {
            config,
            log_path: PathBuf::from(format!("sor_run_{}.log", epoch)),
            summary_path: PathBuf::from(format!("sor_summary_{}.txt", epoch)),
            evacuation: Stimulus::new(),
            os_signals: true,
        }
    }

    pub fn with_log_path(mut self, path: impl AsRef<Path>) -> Director {
        self.log_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_summary_path(mut self, path: impl AsRef<Path>) -> Director {
        self.summary_path = path.as_ref().to_path_buf();
        self
    }

    /// Skip installing Ctrl-C / SIGTERM listeners; shutdown then comes only
    /// from the [`ShutdownHandle`] or the duration bound. Used by tests.
    pub fn without_os_signals(mut self) -> Director {
        self.os_signals = false;
        self
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.evacuation.clone())
    }

    /// Bootstrap, supervise, shut down. Returns once nothing is left
    /// running and all channels are closed.
    pub async fn run(self) -> Result<RunReport> {
        let config = self.config.clone();
        let n = config.n_waiting_room;
        let k = config.k_registration_threshold;
        let close_below = n / 3;

        // Bootstrap: every resource is created before any actor spawns. An
        // unwritable log path fails the whole run here.
        let log_file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .map_err(|error| {
                KernelError::Bootstrap(format!(
                    "cannot open log file {}: {}",
                    self.log_path.display(),
                    error
                ))
            })?;

        let reg_chan = KeyedChannel::bounded(DEFAULT_CHANNEL_CAPACITY);
        let triage_chan = KeyedChannel::bounded(DEFAULT_CHANNEL_CAPACITY);
        let spec_chans: [KeyedChannel<EventRecord>; Specialty::COUNT] =
            std::array::from_fn(|_| KeyedChannel::bounded(DEFAULT_CHANNEL_CAPACITY));
        let log_chan: KeyedChannel<SimLogRecord> = KeyedChannel::bounded(DEFAULT_CHANNEL_CAPACITY);
        let waiting = WaitingRoom::new(n);
        let state = SharedState::new(n);
        let clock = Arc::new(SimClock::start(&config));

        let metrics = MetricsContext {
            state: Arc::clone(&state),
            waiting: Arc::clone(&waiting),
            reg_chan: reg_chan.clone(),
            triage_chan: triage_chan.clone(),
            spec_chans: spec_chans.clone(),
        };
        let hub = LogHub::new(log_chan.clone(), Arc::clone(&clock), metrics);
        let ids = IdAllocator::new();

        let rt = Resources {
            config: config.clone(),
            reg_chan,
            triage_chan,
            spec_chans,
            log_chan: log_chan.clone(),
            waiting: Arc::clone(&waiting),
            state: Arc::clone(&state),
            clock: Arc::clone(&clock),
            hub: hub.clone(),
            ids: ids.clone(),
        };

        // Logger first, so every later line has somewhere to go.
        let logger_join = tokio::spawn(LoggerActor::new(log_chan.clone(), log_file).run());

        let director_id = ids.next();
        state.lock().director_id = Some(director_id);
        let journal = hub.journal(director_id, Role::Director);
        journal.log(format!(
            "Director: resources initialized, log={}",
            self.log_path.display()
        ));
        journal.log(format!(
            "Simulation config N={} K={} durationMinutes={} msPerMinute={} seed={}",
            n, k, config.simulation_duration_minutes, config.time_scale_ms_per_sim_minute,
            config.random_seed
        ));

        // Deterministic per-actor RNG streams off the root seed.
        let mut root_rng = SimRng::new(config.random_seed);
        let triage_rng = root_rng.child(1);
        let specialist_rngs: Vec<SimRng> = (0..Specialty::COUNT as u64)
            .map(|idx| root_rng.child(2 + idx))
            .collect();
        let generator_rng = root_rng.child(10);
        let mut director_rng = root_rng.child(11);

        let reg1 = rt.spawn_registration(Role::Reg1);
        state.lock().reg1_id = Some(reg1.id);
        journal.log("Registration1 spawned");

        let triage = rt.spawn_triage(triage_rng);
        state.lock().triage_id = Some(triage.id);
        journal.log("Triage spawned");

        let generator = rt.spawn_generator(generator_rng);
        journal.log("Patient generator spawned");

        let mut specialists = Vec::with_capacity(Specialty::COUNT);
        for (specialty, rng) in Specialty::ALL.into_iter().zip(specialist_rngs) {
            let handle = rt.spawn_specialist(specialty, rng);
            state.lock().specialist_ids[specialty.index()] = Some(handle.id);
            journal.log(format!("Specialist spawned type={}", specialty));
            specialists.push(handle);
        }

        // Optional OS signal listeners, kept so they can be torn down.
        let interrupt = Stimulus::new();
        let mut signal_tasks: Vec<JoinHandle<()>> = Vec::new();
        if self.os_signals {
            let flag = interrupt.clone();
            signal_tasks.push(tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    flag.raise();
                }
            }));
            #[cfg(unix)]
            {
                let flag = self.evacuation.clone();
                signal_tasks.push(tokio::spawn(async move {
                    use tokio::signal::unix::{signal, SignalKind};
                    match signal(SignalKind::terminate()) {
                        Ok(mut term) => {
                            term.recv().await;
                            flag.raise();
                        }
                        Err(error) => tracing::warn!(%error, "cannot listen for SIGTERM"),
                    }
                }));
            }
        }

        let mut provision = interval(PROVISION_PERIOD);
        provision.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stimulus = interval(LEAVE_STIMULUS_PERIOD);
        stimulus.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut monitor = interval(MONITOR_PERIOD);
        monitor.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut reg2: Option<ActorHandle> = None;

        let reason = loop {
            tokio::select! {
                _ = interrupt.wait() => break ShutdownReason::Interrupt,
                _ = self.evacuation.wait() => break ShutdownReason::Evacuation,
                _ = provision.tick() => {
                    if clock.duration_reached() {
                        break ShutdownReason::DurationReached;
                    }
                    provision_tick(&rt, &mut reg2, k, close_below, &journal).await;
                }
                _ = stimulus.tick() => {
                    leave_stimulus(&specialists, &mut director_rng, &journal);
                }
                _ = monitor.tick() => {
                    monitor_tick(&rt, &reg1, reg2.as_ref(), &triage, &config, &journal);
                }
            }
        };

        journal.log(format!("Director initiating shutdown (reason={})", reason));

        // Stop broadcast, then bounded joins in a fixed order.
        reg1.stop.raise();
        if let Some(handle) = &reg2 {
            handle.stop.raise();
        }
        triage.stop.raise();
        for handle in &specialists {
            handle.stop.raise();
        }
        generator.stop.raise();

        join_with_deadline(reg1.join, "registration1", &journal).await;
        if let Some(handle) = reg2.take() {
            join_with_deadline(handle.join, "registration2", &journal).await;
            let mut st = state.lock();
            st.reg2_active = false;
            st.reg2_id = None;
        }
        join_with_deadline(triage.join, "triage", &journal).await;
        for handle in specialists {
            join_with_deadline(handle.join, "specialist", &journal).await;
        }
        join_with_deadline(generator.join, "patient_generator", &journal).await;

        // Best-effort summary from the final state.
        let snapshot = state.snapshot();
        let simulated = clock.simulated_seconds(clock.elapsed());
        if let Err(error) =
            tokio::fs::write(&self.summary_path, summary::render(&snapshot, simulated)).await
        {
            tracing::error!(%error, path = %self.summary_path.display(), "summary write failed");
        }

        // Sentinel, then wait for the logger to drain and stop.
        let sentinel = SimLogRecord {
            sim_minute: clock.sim_minutes(),
            source: director_id,
            metrics: None,
            role: Role::Director,
            text: LOG_END_SENTINEL.to_string(),
        };
        // Bounded: a dead logger with a full channel must not wedge the
        // director.
        let _ = timeout(JOIN_DEADLINE, log_chan.send_backoff(LOG_KEY, sentinel)).await;
        join_with_deadline(logger_join, "logger", &journal).await;

        // Dismantle: close every channel, drop the signal listeners.
        rt.reg_chan.close();
        rt.triage_chan.close();
        for chan in &rt.spec_chans {
            chan.close();
        }
        rt.log_chan.close();
        for task in signal_tasks {
            task.abort();
        }

        Ok(RunReport {
            reason,
            state: snapshot,
            log_path: self.log_path,
            summary_path: self.summary_path,
        })
    }
}

async fn provision_tick(
    rt: &Resources,
    reg2: &mut Option<ActorHandle>,
    open_at: u32,
    close_below: u32,
    journal: &Journal,
) {
    // The channel's own depth is authoritative; the shared counter is a
    // diagnostic fallback that may lag on failure paths.
    let depth = rt.reg_chan.depth() as u32;
    let shared_len = rt.state.lock().registration_queue_len;
    let reg_len = depth.max(shared_len);

    match provisioning_action(reg_len, reg2.is_some(), open_at, close_below) {
        Some(DeskAction::Open) => {
            let handle = rt.spawn_registration(Role::Reg2);
            {
                let mut st = rt.state.lock();
                st.reg2_active = true;
                st.reg2_id = Some(handle.id);
                st.reg2_history.push(handle.id);
            }
            journal.log(format!(
                "Registration2 opened (regQ={} threshold={})",
                reg_len, open_at
            ));
            *reg2 = Some(handle);
        }
        Some(DeskAction::Close) => {
            if let Some(handle) = reg2.take() {
                journal.log(format!("Registration2 closing (regQ={})", reg_len));
                handle.stop.raise();
                join_with_deadline(handle.join, "registration2", journal).await;
                let mut st = rt.state.lock();
                st.reg2_active = false;
                st.reg2_id = None;
            }
        }
        None => {}
    }
}

fn leave_stimulus(specialists: &[ActorHandle], rng: &mut SimRng, journal: &Journal) {
    if specialists.is_empty() || rng.percent_roll() >= LEAVE_CHANCE_PERCENT {
        return;
    }
    let idx = rng.gen_range(0..specialists.len());
    let target = &specialists[idx];
    if let Some(leave) = &target.leave {
        leave.raise();
        journal.log(format!(
            "Director sent temporary-leave to specialist={} id={}",
            Specialty::ALL[idx], target.id
        ));
    }
}

fn monitor_tick(
    rt: &Resources,
    reg1: &ActorHandle,
    reg2: Option<&ActorHandle>,
    triage: &ActorHandle,
    config: &SimConfig,
    journal: &Journal,
) {
    fn liveness(live: bool) -> &'static str {
        if live {
            "up"
        } else {
            "down"
        }
    }

    let wait_sem = rt.waiting.available();
    let reg_depth = rt.reg_chan.depth();
    let triage_depth = rt.triage_chan.depth();
    let inside = rt.state.lock().inside_waiting_room;
    let reg2_state = reg2.map(|h| liveness(h.is_live())).unwrap_or("none");
    journal.log(format!(
        "MON wSem={} regQ={} triQ={} inside={} reg1={} reg2={} triage={}",
        wait_sem,
        reg_depth,
        triage_depth,
        inside,
        liveness(reg1.is_live()),
        reg2_state,
        liveness(triage.is_live()),
    ));

    let expected_free = config.n_waiting_room.saturating_sub(inside);
    let missing = i64::from(expected_free) - i64::from(wait_sem);
    if missing > 0 {
        if config.reconcile_wait_sem {
            rt.waiting.release(missing as u32);
            journal.log(format!(
                "ERROR MON RECONCILE restored={} expectedFree={} wSem={} inside={}",
                missing, expected_free, wait_sem, inside
            ));
        } else {
            journal.log(format!(
                "MON waitSem drift missing={} expectedFree={} wSem={}",
                missing, expected_free, wait_sem
            ));
        }
    }
}

async fn join_with_deadline(join: JoinHandle<()>, name: &str, journal: &Journal) {
    let mut join = join;
    match timeout(JOIN_DEADLINE, &mut join).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::warn!(%error, name, "actor task failed"),
        Err(_elapsed) => {
            join.abort();
            journal.log(format!("Force stopped {}", name));
            let _ = join.await;
        }
    }
}
