//! Temps virtuel de la machine émulée
//!
//! Un `EmuTime` est un nombre entier de ticks à la fréquence de base
//! [`MAIN_FREQ`]. Toutes les opérations sont exactes : aucune valeur
//! flottante n'intervient dans la chronologie, donc deux périphériques à des
//! fréquences différentes restent synchronisés indéfiniment.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::error::EmuError;

/// Fréquence de base en ticks par seconde
///
/// Cristal du Z80 MSX (3.579545 MHz) multiplié par 960, de sorte que les
/// horloges courantes (CPU, VDP, PSG, FM) en soient des diviseurs exacts.
pub const MAIN_FREQ: u64 = 3_579_545 * 960;

/// Instant de la chronologie virtuelle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EmuTime(u64);

/// Écart signé entre deux instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EmuDuration(i64);

impl EmuTime {
    /// Origine de la chronologie
    pub const ZERO: Self = Self(0);

    /// Borne supérieure utilisée comme « pas de limite »
    pub const INFINITY: Self = Self(u64::MAX);

    /// Crée un instant à partir d'un nombre de ticks de base
    pub const fn from_base_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Nombre de ticks de base depuis l'origine
    pub const fn base_ticks(self) -> u64 {
        self.0
    }

    /// Instant après `duration`
    ///
    /// # Panics
    ///
    /// Un dépassement de capacité, dans un sens comme dans l'autre, est fatal.
    pub fn add(self, duration: EmuDuration) -> Self {
        let ticks = if duration.0 >= 0 {
            self.0.checked_add(duration.0.unsigned_abs())
        } else {
            self.0.checked_sub(duration.0.unsigned_abs())
        };
        Self(ticks.unwrap_or_else(|| panic!("dépassement de EmuTime: {self} + {duration}")))
    }

    /// Écart `self - earlier`
    ///
    /// # Panics
    ///
    /// Si l'écart ne tient pas dans un `i64` (plus de 80 ans de temps émulé).
    pub fn subtract(self, earlier: EmuTime) -> EmuDuration {
        let delta = i128::from(self.0) - i128::from(earlier.0);
        let delta = i64::try_from(delta)
            .unwrap_or_else(|_| panic!("écart hors limites entre {self} et {earlier}"));
        EmuDuration(delta)
    }

    /// Comparaison totale entre deux instants
    pub fn compare(self, other: EmuTime) -> Ordering {
        self.0.cmp(&other.0)
    }

    /// Temps écoulé depuis l'origine, en secondes (affichage et cadence réelle)
    pub fn to_seconds_f64(self) -> f64 {
        self.0 as f64 / MAIN_FREQ as f64
    }
}

impl EmuDuration {
    pub const ZERO: Self = Self(0);

    pub const fn from_base_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn base_ticks(self) -> i64 {
        self.0
    }

    /// Durée d'une période à la fréquence donnée
    ///
    /// La période est arrondie à l'entier inférieur quand `freq` ne divise pas
    /// [`MAIN_FREQ`] ; l'erreur reste locale au périphérique et ne s'accumule
    /// pas dans la chronologie partagée.
    pub fn from_frequency(freq: u64) -> Result<Self, EmuError> {
        if freq == 0 {
            return Err(EmuError::ZeroFrequency);
        }
        if freq > MAIN_FREQ {
            return Err(EmuError::FrequencyTooHigh { freq, max: MAIN_FREQ });
        }
        Ok(Self((MAIN_FREQ / freq) as i64))
    }

    /// Conversion approchée depuis des secondes
    ///
    /// Réservée à la cadence temps réel, jamais à la chronologie émulée.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        Self((seconds * MAIN_FREQ as f64).round() as i64)
    }

    pub fn to_seconds_f64(self) -> f64 {
        self.0 as f64 / MAIN_FREQ as f64
    }

    pub fn from_millis(ms: u64) -> Self {
        let ticks = u128::from(ms) * u128::from(MAIN_FREQ) / 1000;
        let ticks = i64::try_from(ticks)
            .unwrap_or_else(|_| panic!("durée de {ms} ms hors limites"));
        Self(ticks)
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Durée multipliée par un nombre de périodes
    pub fn mul(self, count: u64) -> Self {
        let ticks = i64::try_from(count)
            .ok()
            .and_then(|c| self.0.checked_mul(c))
            .unwrap_or_else(|| panic!("dépassement de EmuDuration: {self} * {count}"));
        Self(ticks)
    }

    /// Nombre de périodes `period` entières contenues dans cette durée
    pub fn div_duration(self, period: EmuDuration) -> u64 {
        assert!(period.0 > 0, "division par une période non positive: {period}");
        assert!(self.0 >= 0, "division d'une durée négative: {self}");
        (self.0 / period.0) as u64
    }
}

impl Add<EmuDuration> for EmuTime {
    type Output = EmuTime;

    fn add(self, rhs: EmuDuration) -> EmuTime {
        EmuTime::add(self, rhs)
    }
}

impl AddAssign<EmuDuration> for EmuTime {
    fn add_assign(&mut self, rhs: EmuDuration) {
        *self = EmuTime::add(*self, rhs);
    }
}

impl Sub<EmuDuration> for EmuTime {
    type Output = EmuTime;

    fn sub(self, rhs: EmuDuration) -> EmuTime {
        EmuTime::add(self, -rhs)
    }
}

impl Sub<EmuTime> for EmuTime {
    type Output = EmuDuration;

    fn sub(self, rhs: EmuTime) -> EmuDuration {
        self.subtract(rhs)
    }
}

impl Add for EmuDuration {
    type Output = EmuDuration;

    fn add(self, rhs: EmuDuration) -> EmuDuration {
        let ticks = self
            .0
            .checked_add(rhs.0)
            .unwrap_or_else(|| panic!("dépassement de EmuDuration: {self} + {rhs}"));
        EmuDuration(ticks)
    }
}

impl Sub for EmuDuration {
    type Output = EmuDuration;

    fn sub(self, rhs: EmuDuration) -> EmuDuration {
        self + -rhs
    }
}

impl SubAssign for EmuDuration {
    fn sub_assign(&mut self, rhs: EmuDuration) {
        *self = *self - rhs;
    }
}

impl std::ops::Neg for EmuDuration {
    type Output = EmuDuration;

    fn neg(self) -> EmuDuration {
        let ticks = self
            .0
            .checked_neg()
            .unwrap_or_else(|| panic!("dépassement de EmuDuration: -{self}"));
        EmuDuration(ticks)
    }
}

impl fmt::Display for EmuTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == EmuTime::INFINITY {
            write!(f, "∞")
        } else {
            write!(f, "{}t", self.0)
        }
    }
}

impl fmt::Display for EmuDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}t", self.0)
    }
}
