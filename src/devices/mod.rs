//! Périphériques MSX pilotés par le scheduler
//!
//! Les périphériques concrets (mappers mémoire, puces sonores, VDP...) vivent
//! hors de ce noyau ; ils implémentent [`MsxDevice`] et sont adressés par un
//! [`DeviceId`] stable attribué par la carte mère.

pub mod timer;

use std::any::Any;
use std::fmt;

pub use timer::*;

use crate::scheduler::{Schedulable, SyncContext};
use crate::time::EmuTime;

/// Handle stable vers un emplacement de l'arène de périphériques
///
/// La génération distingue un emplacement réutilisé de son ancien occupant :
/// un handle périmé ne résout jamais vers le nouveau périphérique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId {
    index: u32,
    generation: u32,
}

impl DeviceId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Périphérique enregistré auprès de la carte mère
pub trait MsxDevice: Schedulable + Any {
    /// Nom du périphérique
    fn name(&self) -> &str;

    /// Reset matériel à `time`
    fn reset(&mut self, time: EmuTime, sync: &mut SyncContext<'_>);

    /// Mise sous tension ; par défaut identique à un reset
    fn power_up(&mut self, time: EmuTime, sync: &mut SyncContext<'_>) {
        self.reset(time, sync);
    }

    /// Mise hors tension, avant détachement
    fn power_down(&mut self, _time: EmuTime) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
