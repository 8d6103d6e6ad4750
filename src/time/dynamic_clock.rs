//! Horloge de périphérique à fréquence variable

use std::ops::AddAssign;

use log::trace;

use super::emu_time::{EmuDuration, EmuTime};
use crate::error::EmuError;

/// Générateur de ticks périodiques ancré sur un `EmuTime`
///
/// L'ancre (`last_tick`) est toujours alignée sur un tick de l'horloge. Les
/// conversions se font uniquement en arithmétique entière, il n'y a donc
/// aucune dérive quel que soit le nombre d'appels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicClock {
    /// Instant du dernier tick consommé
    last_tick: EmuTime,

    /// Période d'un tick en ticks de base
    step: EmuDuration,

    /// Fréquence demandée en Hz
    freq: u64,
}

impl DynamicClock {
    /// Crée une horloge ancrée à `time` et cadencée à `freq` Hz
    pub fn new(time: EmuTime, freq: u64) -> Result<Self, EmuError> {
        let step = EmuDuration::from_frequency(freq)?;
        Ok(Self {
            last_tick: time,
            step,
            freq,
        })
    }

    /// Instant du dernier tick consommé
    pub fn get_time(&self) -> EmuTime {
        self.last_tick
    }

    pub fn get_frequency(&self) -> u64 {
        self.freq
    }

    pub fn get_period(&self) -> EmuDuration {
        self.step
    }

    /// Change la fréquence en ré-ancrant l'horloge à `now`
    ///
    /// Les ticks entiers écoulés avant `now` gardent l'ancienne période ;
    /// seuls les ticks suivants utilisent la nouvelle. La fréquence est validée
    /// avant toute modification de l'état.
    pub fn set_frequency_at(&mut self, freq: u64, now: EmuTime) -> Result<(), EmuError> {
        let step = EmuDuration::from_frequency(freq)?;
        self.advance_to(now);
        trace!(
            "horloge ré-ancrée à {}: {} Hz -> {} Hz",
            self.last_tick,
            self.freq,
            freq
        );
        self.step = step;
        self.freq = freq;
        Ok(())
    }

    /// Repositionne l'ancre sur `time`
    pub fn reset(&mut self, time: EmuTime) {
        self.last_tick = time;
    }

    /// Nombre de ticks entiers écoulés entre l'ancre et `time`
    ///
    /// Un tick tombant exactement sur `time` est compté.
    ///
    /// # Panics
    ///
    /// Si `time` précède l'ancre : le temps ne recule jamais.
    pub fn get_ticks_till(&self, time: EmuTime) -> u64 {
        assert!(
            time >= self.last_tick,
            "requête dans le passé: {time} < {}",
            self.last_tick
        );
        (time - self.last_tick).div_duration(self.step)
    }

    /// Comme [`get_ticks_till`](Self::get_ticks_till), arrondi au tick supérieur
    pub fn get_ticks_till_up(&self, time: EmuTime) -> u64 {
        let whole = self.get_ticks_till(time);
        if self.get_fast_add(whole) == time {
            whole
        } else {
            whole + 1
        }
    }

    /// Instant du `n`-ième tick après l'ancre, sans déplacer l'ancre
    pub fn get_fast_add(&self, n: u64) -> EmuTime {
        self.last_tick + self.step.mul(n)
    }

    /// Consomme `n` ticks
    pub fn advance(&mut self, n: u64) {
        self.last_tick += self.step.mul(n);
    }

    /// Avance l'ancre jusqu'au dernier tick entier <= `time`
    pub fn advance_to(&mut self, time: EmuTime) {
        let ticks = self.get_ticks_till(time);
        self.advance(ticks);
    }
}

impl AddAssign<u64> for DynamicClock {
    fn add_assign(&mut self, n: u64) {
        self.advance(n);
    }
}
