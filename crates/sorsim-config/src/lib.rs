//! `sorsim-config` — simulation configuration.
//!
//! The config file is plain `key=value` text with `#` comments:
//!
//! ```text
//! # waiting room
//! N_waitingRoom=10
//! K_registrationThreshold=0      # 0 derives N/2
//! simulationDurationMinutes=60
//! timeScaleMsPerSimMinute=20
//! randomSeed=12345
//! ```
//!
//! Loading goes parse → override → validate, and a config that survives
//! [`SimConfig::validate`] is immutable for the rest of the run. The
//! `SORSIM_RECONCILE_WAITSEM=1` environment variable forces the reconcile
//! guardrail on regardless of the file.

use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected key=value, got `{text}`")]
    Malformed { line: usize, text: String },

    #[error("line {line}: unknown key `{key}`")]
    UnknownKey { line: usize, key: String },

    #[error("line {line}: invalid value for `{key}`: `{value}`")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variable that forces `reconcile_wait_sem` on.
pub const RECONCILE_ENV_VAR: &str = "SORSIM_RECONCILE_WAITSEM";

/// Reference time scale the service/interval parameters are expressed at;
/// durations scale linearly with `time_scale_ms_per_sim_minute / 20`.
pub const REFERENCE_SCALE_MS: u64 = 20;

/// Immutable simulation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Waiting-room capacity N (seats).
    pub n_waiting_room: u32,
    /// Second-desk open threshold K. 0 in the file derives N/2; validation
    /// clamps anything below N/2 up to N/2.
    pub k_registration_threshold: u32,
    /// Total run length in wall-clock minutes; 0 means run until signaled.
    pub simulation_duration_minutes: u32,
    /// Wall-clock milliseconds per simulated minute.
    pub time_scale_ms_per_sim_minute: u64,
    pub random_seed: u64,
    pub visualizer_render_interval_ms: u64,
    pub registration_service_ms: u64,
    pub triage_service_ms: u64,
    pub specialist_exam_min_ms: u64,
    pub specialist_exam_max_ms: u64,
    pub specialist_leave_min_ms: u64,
    pub specialist_leave_max_ms: u64,
    pub patient_gen_min_ms: u64,
    pub patient_gen_max_ms: u64,
    /// When on, the director forcibly re-aligns the waiting-room semaphore
    /// to `N - inside` on observed drift.
    pub reconcile_wait_sem: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            n_waiting_room: 10,
            k_registration_threshold: 5,
            simulation_duration_minutes: 60,
            time_scale_ms_per_sim_minute: REFERENCE_SCALE_MS,
            random_seed: 12345,
            visualizer_render_interval_ms: 200,
            registration_service_ms: 30,
            triage_service_ms: 20,
            specialist_exam_min_ms: 10,
            specialist_exam_max_ms: 40,
            specialist_leave_min_ms: 100,
            specialist_leave_max_ms: 500,
            patient_gen_min_ms: 30,
            patient_gen_max_ms: 120,
            reconcile_wait_sem: false,
        }
    }
}

impl SimConfig {
    /// Load from a `key=value` file, apply the environment override, and
    /// validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SimConfig> {
        let contents = fs::read_to_string(path)?;
        let mut config = SimConfig::parse(&contents)?;
        config.apply_env_override();
        config.validate()?;
        Ok(config)
    }

    /// Build from the positional CLI form `N K DURATION MS_PER_MIN SEED`
    /// with defaults for everything else.
    pub fn from_positional(
        n: u32,
        k: u32,
        duration_minutes: u32,
        ms_per_minute: u64,
        seed: u64,
    ) -> Result<SimConfig> {
        let mut config = SimConfig {
            n_waiting_room: n,
            k_registration_threshold: k,
            simulation_duration_minutes: duration_minutes,
            time_scale_ms_per_sim_minute: ms_per_minute,
            random_seed: seed,
            ..SimConfig::default()
        };
        config.apply_env_override();
        config.validate()?;
        Ok(config)
    }

    /// Parse file contents without validating. Unknown keys are rejected so
    /// that a typo does not silently fall back to a default.
    pub fn parse(contents: &str) -> Result<SimConfig> {
        let mut config = SimConfig::default();

        for (idx, raw_line) in contents.lines().enumerate() {
            let line_no = idx + 1;
            let line = match raw_line.split_once('#') {
                Some((before, _comment)) => before.trim(),
                None => raw_line.trim(),
            };
            if line.is_empty() {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::Malformed {
                line: line_no,
                text: line.to_string(),
            })?;
            let key = key.trim();
            let value = value.trim();
            config.set(key, value, line_no)?;
        }

        Ok(config)
    }

    fn set(&mut self, key: &str, value: &str, line: usize) -> Result<()> {
        fn num<T: std::str::FromStr>(
            key: &str,
            value: &str,
            line: usize,
        ) -> Result<T> {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                line,
                key: key.to_string(),
                value: value.to_string(),
            })
        }

        match key {
            "N_waitingRoom" => self.n_waiting_room = num(key, value, line)?,
            "K_registrationThreshold" => self.k_registration_threshold = num(key, value, line)?,
            "simulationDurationMinutes" => {
                // Negative means "unbounded" in the original front-end; fold
                // it into 0 here.
                let signed: i64 = num(key, value, line)?;
                self.simulation_duration_minutes = signed.max(0) as u32;
            }
            "timeScaleMsPerSimMinute" => self.time_scale_ms_per_sim_minute = num(key, value, line)?,
            "randomSeed" => self.random_seed = num(key, value, line)?,
            "visualizerRenderIntervalMs" => {
                self.visualizer_render_interval_ms = num(key, value, line)?
            }
            "registrationServiceMs" => self.registration_service_ms = num(key, value, line)?,
            "triageServiceMs" => self.triage_service_ms = num(key, value, line)?,
            "specialistExamMinMs" => self.specialist_exam_min_ms = num(key, value, line)?,
            "specialistExamMaxMs" => self.specialist_exam_max_ms = num(key, value, line)?,
            "specialistLeaveMinMs" => self.specialist_leave_min_ms = num(key, value, line)?,
            "specialistLeaveMaxMs" => self.specialist_leave_max_ms = num(key, value, line)?,
            "patientGenMinMs" => self.patient_gen_min_ms = num(key, value, line)?,
            "patientGenMaxMs" => self.patient_gen_max_ms = num(key, value, line)?,
            "reconcileWaitSem" => {
                let flag: u8 = num(key, value, line)?;
                self.reconcile_wait_sem = flag != 0;
            }
            _ => {
                return Err(ConfigError::UnknownKey {
                    line,
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Fold `SORSIM_RECONCILE_WAITSEM=1` into the toggle.
    pub fn apply_env_override(&mut self) {
        if let Ok(value) = std::env::var(RECONCILE_ENV_VAR) {
            if value == "1" {
                self.reconcile_wait_sem = true;
            }
        }
    }

    /// Check the invariants and derive K where the file left it to us.
    pub fn validate(&mut self) -> Result<()> {
        if self.n_waiting_room == 0 {
            return Err(ConfigError::Invalid("N_waitingRoom must be > 0".into()));
        }
        if self.time_scale_ms_per_sim_minute == 0 {
            return Err(ConfigError::Invalid(
                "timeScaleMsPerSimMinute must be > 0".into(),
            ));
        }
        if self.visualizer_render_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "visualizerRenderIntervalMs must be > 0".into(),
            ));
        }

        let floor = self.n_waiting_room / 2;
        if self.k_registration_threshold == 0 {
            self.k_registration_threshold = floor.max(1);
        } else if self.k_registration_threshold < floor {
            tracing::warn!(
                requested = self.k_registration_threshold,
                clamped = floor,
                "K_registrationThreshold below N/2, clamping"
            );
            self.k_registration_threshold = floor.max(1);
        }

        if self.specialist_exam_min_ms == 0
            || self.specialist_exam_max_ms < self.specialist_exam_min_ms
        {
            return Err(ConfigError::Invalid(
                "specialistExamMinMs/MaxMs must be > 0 with min <= max".into(),
            ));
        }
        if self.specialist_leave_min_ms == 0
            || self.specialist_leave_max_ms < self.specialist_leave_min_ms
        {
            return Err(ConfigError::Invalid(
                "specialistLeaveMinMs/MaxMs must be > 0 with min <= max".into(),
            ));
        }
        if self.patient_gen_max_ms < self.patient_gen_min_ms {
            return Err(ConfigError::Invalid(
                "patientGenMinMs must not exceed patientGenMaxMs".into(),
            ));
        }
        Ok(())
    }

    /// `true` when the wall-clock stop condition is disabled.
    pub fn runs_until_signaled(&self) -> bool {
        self.simulation_duration_minutes == 0
    }
}
