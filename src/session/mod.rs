//! Session d'émulation
//!
//! Point d'entrée de l'application : la session possède le scheduler, la
//! carte mère, les voyants, la cadence temps réel et le CPU, et les
//! transmet explicitement à qui en a besoin. Aucun état global.

use anyhow::Result;
use log::info;

use crate::config::EmulatorConfig;
use crate::cpu::{CpuInterface, NopCpu};
use crate::devices::{DeviceId, MsxDevice, PeriodicTimer};
use crate::error::EmuError;
use crate::leds::Leds;
use crate::motherboard::MotherBoard;
use crate::realtime::RealTime;
use crate::scheduler::{Scheduler, SchedulerState, SyncContext, SyncDispatcher, SyncPoint, SyncTarget};
use crate::time::{EmuDuration, EmuTime};

/// Nom du minuteur de trame installé par défaut
pub const VSYNC_DEVICE: &str = "vdp-vsync";

/// Aiguilleur des points de synchronisation vers les participants
struct Participants<'a> {
    board: &'a mut MotherBoard,
    realtime: &'a mut RealTime,
}

impl SyncDispatcher for Participants<'_> {
    fn dispatch(&mut self, point: SyncPoint, scheduler: &mut Scheduler) {
        match point.target {
            SyncTarget::MotherBoard => point.deliver(&mut *self.board, scheduler),
            SyncTarget::RealTime => point.deliver(&mut *self.realtime, scheduler),
            SyncTarget::Device(id) => self.board.dispatch_device(id, point, scheduler),
        }
    }
}

/// Machine MSX complète et sa boucle d'émulation
pub struct EmulationSession {
    config: EmulatorConfig,
    scheduler: Scheduler,
    board: MotherBoard,
    leds: Leds,
    realtime: RealTime,
    cpu: Box<dyn CpuInterface>,

    /// Minuteur de trame garantissant la progression
    vsync: DeviceId,
}

impl EmulationSession {
    /// Crée une session avec le CPU de remplacement
    pub fn new(config: EmulatorConfig) -> Result<Self> {
        let cpu = NopCpu::new(EmuTime::ZERO, config.machine.cpu_frequency_hz)?;
        Self::with_cpu(config, Box::new(cpu))
    }

    /// Crée une session autour d'un moteur CPU fourni
    pub fn with_cpu(config: EmulatorConfig, cpu: Box<dyn CpuInterface>) -> Result<Self> {
        let mut scheduler = Scheduler::new();
        let mut board = MotherBoard::new();
        let realtime = RealTime::new(&config.realtime)?;
        let vsync = Self::install_vsync(&config, &mut board, &mut scheduler)?;

        info!(
            "Session {} créée (CPU {} Hz, trame {} Hz)",
            config.machine.name, config.machine.cpu_frequency_hz, config.machine.vsync_frequency_hz
        );
        Ok(Self {
            config,
            scheduler,
            board,
            leds: Leds::new(),
            realtime,
            cpu,
            vsync,
        })
    }

    /// Enregistre le minuteur de trame qui garantit la progression
    fn install_vsync(
        config: &EmulatorConfig,
        board: &mut MotherBoard,
        scheduler: &mut Scheduler,
    ) -> Result<DeviceId, EmuError> {
        let timer = PeriodicTimer::from_frequency(VSYNC_DEVICE, config.machine.vsync_frequency_hz)?;
        Ok(board.add_device(Box::new(timer), scheduler))
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn board(&self) -> &MotherBoard {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut MotherBoard {
        &mut self.board
    }

    pub fn leds(&self) -> &Leds {
        &self.leds
    }

    pub fn realtime(&self) -> &RealTime {
        &self.realtime
    }

    pub fn vsync_device(&self) -> DeviceId {
        self.vsync
    }

    pub fn current_time(&self) -> EmuTime {
        self.scheduler.get_current_time()
    }

    /// Ajoute un périphérique (alimenté immédiatement si la machine tourne)
    pub fn add_device(&mut self, device: Box<dyn MsxDevice>) -> DeviceId {
        self.board.add_device(device, &mut self.scheduler)
    }

    /// Détache un périphérique après annulation de ses points en attente
    pub fn remove_device(&mut self, id: DeviceId) -> Result<Box<dyn MsxDevice>, EmuError> {
        self.board.remove_device(id, &mut self.scheduler)
    }

    /// Mise sous tension : passage du scheduler en `Running`
    ///
    /// L'extinction détache tous les périphériques ; le minuteur de trame est
    /// réinstallé s'il a disparu, sans quoi plus rien ne garantirait la
    /// progression.
    pub fn power_on(&mut self) -> Result<(), EmuError> {
        if self.board.device(self.vsync).is_none() {
            self.vsync = Self::install_vsync(&self.config, &mut self.board, &mut self.scheduler)?;
        }
        let time = self.scheduler.get_current_time();
        self.board.start_msx(&mut self.scheduler, &mut self.leds);
        let mut sync = SyncContext::new(&mut self.scheduler, SyncTarget::RealTime);
        self.realtime.start(time, &mut sync);
        Ok(())
    }

    /// Extinction : détache tous les périphériques, scheduler en `Idle`
    pub fn power_off(&mut self) {
        self.scheduler.remove_sync_points(SyncTarget::RealTime);
        self.board.destroy_msx(&mut self.scheduler, &mut self.leds);
    }

    /// Fait avancer la machine jusqu'à `limit`
    ///
    /// Échoue avec [`EmuError::PoweredOff`] si la machine n'est pas sous
    /// tension.
    pub fn run_until(&mut self, limit: EmuTime) -> Result<EmuTime> {
        if self.scheduler.state() != SchedulerState::Running {
            return Err(EmuError::PoweredOff.into());
        }
        let mut participants = Participants {
            board: &mut self.board,
            realtime: &mut self.realtime,
        };
        self.scheduler
            .schedule(limit, self.cpu.as_mut(), &mut participants)
    }

    /// Fait avancer la machine de `duration`
    pub fn run_for(&mut self, duration: EmuDuration) -> Result<EmuTime> {
        let limit = self.current_time() + duration;
        self.run_until(limit)
    }

    /// Exécute une commande de console
    ///
    /// `reset` planifie un point ASAP sur la carte mère plutôt que de
    /// modifier l'état directement.
    pub fn execute_command(&mut self, tokens: &[&str]) -> Result<String, EmuError> {
        match tokens {
            ["reset", ..] => {
                self.board.request_reset(&mut self.scheduler);
                Ok(String::new())
            }
            ["help"] => Ok("Commandes disponibles: help, reset".to_string()),
            ["help", "reset", ..] => Ok("Resets the MSX.".to_string()),
            ["help", other, ..] => Err(EmuError::UnknownCommand((*other).to_string())),
            [other, ..] => Err(EmuError::UnknownCommand((*other).to_string())),
            [] => Err(EmuError::UnknownCommand(String::new())),
        }
    }
}
