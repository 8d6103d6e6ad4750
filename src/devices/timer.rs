//! Minuteur périodique (battement de la machine)
//!
//! Typiquement l'interruption de fin de trame du VDP à 50 ou 60 Hz : il
//! garantit qu'au moins un point de synchronisation est toujours en attente.

use std::any::Any;

use log::debug;

use super::MsxDevice;
use crate::error::EmuError;
use crate::scheduler::{Schedulable, SyncContext};
use crate::time::{EmuDuration, EmuTime};

/// Nombre d'étiquettes tournantes par défaut
const DEFAULT_PHASES: i32 = 2;

/// Périphérique qui se replanifie toutes les `period`
#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    name: String,
    period: EmuDuration,

    /// Les étiquettes `user_data` tournent sur `0..phases`
    phases: i32,

    running: bool,
    fired: u64,
    last_fired: Option<EmuTime>,

    /// Ligne d'interruption levée à chaque battement, acquittée par le CPU
    irq_pending: bool,
}

impl PeriodicTimer {
    /// Crée un minuteur de période `period`
    ///
    /// Une période nulle ou négative est refusée : le minuteur se
    /// replanifierait indéfiniment au même instant.
    pub fn new(name: impl Into<String>, period: EmuDuration) -> Result<Self, EmuError> {
        if period.is_zero() || period.is_negative() {
            return Err(EmuError::ZeroPeriod);
        }
        Ok(Self {
            name: name.into(),
            period,
            phases: DEFAULT_PHASES,
            running: false,
            fired: 0,
            last_fired: None,
            irq_pending: false,
        })
    }

    pub fn from_frequency(name: impl Into<String>, freq: u64) -> Result<Self, EmuError> {
        Self::new(name, EmuDuration::from_frequency(freq)?)
    }

    /// Nombre d'étiquettes tournantes (au moins 1)
    pub fn with_phases(mut self, phases: i32) -> Self {
        self.phases = phases.max(1);
        self
    }

    pub fn period(&self) -> EmuDuration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    pub fn last_fired(&self) -> Option<EmuTime> {
        self.last_fired
    }

    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    pub fn acknowledge_irq(&mut self) {
        self.irq_pending = false;
    }

    /// Arme le minuteur à partir de `time`
    pub fn start(&mut self, time: EmuTime, sync: &mut SyncContext<'_>) {
        sync.remove_sync_points();
        sync.set_sync_point(time + self.period, 0);
        self.running = true;
    }

    pub fn stop(&mut self, sync: &mut SyncContext<'_>) {
        sync.remove_sync_points();
        self.running = false;
    }
}

impl Schedulable for PeriodicTimer {
    fn execute_until(&mut self, time: EmuTime, user_data: i32, sync: &mut SyncContext<'_>) {
        self.fired += 1;
        self.last_fired = Some(time);
        self.irq_pending = true;
        sync.set_sync_point(time + self.period, (user_data + 1) % self.phases);
    }

    fn schedulable_name(&self) -> &str {
        &self.name
    }
}

impl MsxDevice for PeriodicTimer {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self, time: EmuTime, sync: &mut SyncContext<'_>) {
        debug!("{}: reset à {time}", self.name);
        self.fired = 0;
        self.last_fired = None;
        self.irq_pending = false;
        self.start(time, sync);
    }

    fn power_down(&mut self, _time: EmuTime) {
        self.running = false;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
