//! Cadence temps réel
//!
//! Participant planifié à intervalle régulier de temps émulé. À chaque
//! rappel il compare le temps émulé écoulé au temps réel écoulé et dort si
//! l'émulation est en avance. Il ne modifie jamais la chronologie virtuelle.

use std::thread;
use std::time::{Duration, Instant};

use log::warn;

use crate::config::RealTimeConfig;
use crate::error::EmuError;
use crate::scheduler::{Schedulable, SyncContext};
use crate::time::{EmuDuration, EmuTime};

/// Décision de cadence pour un intervalle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// L'émulation est en avance : attendre
    Sleep(Duration),
    /// Dans les temps ou légèrement en retard
    OnTime,
    /// Retard excessif : on repart d'une nouvelle référence
    Resync,
}

/// Régulateur de vitesse d'émulation
#[derive(Debug)]
pub struct RealTime {
    enabled: bool,
    speed_percent: u32,
    interval: EmuDuration,
    max_lag: Duration,

    /// Référence émulée et réelle de la dernière resynchronisation
    emu_ref: EmuTime,
    wall_ref: Instant,

    pub syncs: u64,
    pub sleeps: u64,
    pub resyncs: u64,
}

impl RealTime {
    pub fn new(config: &RealTimeConfig) -> Result<Self, EmuError> {
        if config.sync_interval_ms == 0 {
            return Err(EmuError::ZeroPeriod);
        }
        if config.speed_percent == 0 {
            return Err(EmuError::ZeroSpeed);
        }
        Ok(Self {
            enabled: config.enabled,
            speed_percent: config.speed_percent,
            interval: EmuDuration::from_millis(config.sync_interval_ms),
            max_lag: Duration::from_millis(config.max_lag_ms),
            emu_ref: EmuTime::ZERO,
            wall_ref: Instant::now(),
            syncs: 0,
            sleeps: 0,
            resyncs: 0,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn interval(&self) -> EmuDuration {
        self.interval
    }

    /// Prend les références à `time` et arme le premier rappel
    pub fn start(&mut self, time: EmuTime, sync: &mut SyncContext<'_>) {
        self.resync(time);
        sync.remove_sync_points();
        sync.set_sync_point(time + self.interval, 0);
    }

    fn resync(&mut self, time: EmuTime) {
        self.emu_ref = time;
        self.wall_ref = Instant::now();
    }

    /// Temps réel que devrait durer `emu_elapsed` à la vitesse configurée
    fn wall_target(&self, emu_elapsed: EmuDuration) -> Duration {
        let seconds = emu_elapsed.to_seconds_f64().max(0.0) * 100.0 / f64::from(self.speed_percent);
        Duration::from_secs_f64(seconds)
    }

    /// Décide de la cadence à partir des temps écoulés depuis la référence
    pub fn pacing(&self, emu_elapsed: EmuDuration, wall_elapsed: Duration) -> Pacing {
        let target = self.wall_target(emu_elapsed);
        if target > wall_elapsed {
            Pacing::Sleep(target - wall_elapsed)
        } else if wall_elapsed - target > self.max_lag {
            Pacing::Resync
        } else {
            Pacing::OnTime
        }
    }

    /// Synchronise le temps réel sur le temps émulé `time`
    pub fn sync(&mut self, time: EmuTime) {
        self.syncs += 1;
        if !self.enabled {
            return;
        }
        match self.pacing(time - self.emu_ref, self.wall_ref.elapsed()) {
            Pacing::Sleep(delay) => {
                self.sleeps += 1;
                thread::sleep(delay);
            }
            Pacing::OnTime => {}
            Pacing::Resync => {
                self.resyncs += 1;
                warn!("émulation en retard sur le temps réel à {time}, resynchronisation");
                self.resync(time);
            }
        }
    }
}

impl Schedulable for RealTime {
    fn execute_until(&mut self, time: EmuTime, _user_data: i32, sync: &mut SyncContext<'_>) {
        self.sync(time);
        sync.set_sync_point(time + self.interval, 0);
    }

    fn schedulable_name(&self) -> &str {
        "realtime"
    }
}
