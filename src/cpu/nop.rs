//! CPU de remplacement exécutant un flot continu de NOP

use anyhow::Result;
use log::trace;

use super::CpuInterface;
use crate::error::EmuError;
use crate::time::{DynamicClock, EmuTime};

/// Durée d'un NOP Z80 en T-states
pub const Z80_NOP_CYCLES: u64 = 4;

/// Z80 n'exécutant que des NOP, cadencé par une `DynamicClock`
#[derive(Debug, Clone)]
pub struct NopCpu {
    /// Horloge T-states, ancrée sur la fin de la dernière instruction
    clock: DynamicClock,

    /// T-states par instruction
    cycles_per_instruction: u64,

    /// Compteur d'instructions exécutées
    pub instructions: u64,
}

impl NopCpu {
    /// Crée un CPU démarrant à `start` à la fréquence `freq`
    pub fn new(start: EmuTime, freq: u64) -> Result<Self, EmuError> {
        Ok(Self {
            clock: DynamicClock::new(start, freq)?,
            cycles_per_instruction: Z80_NOP_CYCLES,
            instructions: 0,
        })
    }

    /// Fin de la dernière instruction complète
    pub fn instruction_boundary(&self) -> EmuTime {
        self.clock.get_time()
    }

    pub fn frequency(&self) -> u64 {
        self.clock.get_frequency()
    }

    /// Change la fréquence du CPU à partir de `now` (mode turbo)
    pub fn set_frequency(&mut self, freq: u64, now: EmuTime) -> Result<(), EmuError> {
        self.clock.set_frequency_at(freq, now)
    }

    /// Réinitialise le compteur et réaligne l'horloge
    pub fn reset(&mut self, time: EmuTime) {
        self.clock.reset(time);
        self.instructions = 0;
    }
}

impl CpuInterface for NopCpu {
    fn execute(&mut self, limit: EmuTime) -> Result<EmuTime> {
        let cycles = self.clock.get_ticks_till(limit);
        let count = cycles / self.cycles_per_instruction;
        self.clock.advance(count * self.cycles_per_instruction);
        self.instructions += count;
        trace!("{count} NOP exécutés jusqu'à {limit}");
        Ok(limit)
    }
}
