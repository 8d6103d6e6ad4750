//! Points de synchronisation en attente

use std::fmt;

use log::trace;

use super::schedulable::{Schedulable, SyncContext};
use super::Scheduler;
use crate::devices::DeviceId;
use crate::time::EmuTime;

/// Destinataire d'un point de synchronisation
///
/// Le scheduler ne détient jamais de référence vers ses participants : il
/// stocke un identifiant stable que l'aiguilleur résout au moment de
/// l'appel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTarget {
    /// Carte mère (reset global)
    MotherBoard,
    /// Cadence temps réel
    RealTime,
    /// Périphérique enregistré auprès de la carte mère
    Device(DeviceId),
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTarget::MotherBoard => write!(f, "motherboard"),
            SyncTarget::RealTime => write!(f, "realtime"),
            SyncTarget::Device(id) => write!(f, "device {id}"),
        }
    }
}

/// Évènement planifié : (instant, destinataire, étiquette)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPoint {
    pub time: EmuTime,
    pub target: SyncTarget,
    pub user_data: i32,
    /// Inséré via `set_asap_sync_point`
    pub(crate) asap: bool,
}

impl SyncPoint {
    pub fn new(time: EmuTime, target: SyncTarget, user_data: i32) -> Self {
        Self {
            time,
            target,
            user_data,
            asap: false,
        }
    }

    pub fn is_asap(&self) -> bool {
        self.asap
    }

    /// Remet le point à son participant, avec un contexte limité à sa cible
    pub fn deliver<S>(self, participant: &mut S, scheduler: &mut Scheduler)
    where
        S: Schedulable + ?Sized,
    {
        trace!(
            "rappel de {} ({}) à {}{}",
            participant.schedulable_name(),
            self.user_data,
            self.time,
            if self.is_asap() { " [ASAP]" } else { "" }
        );
        let mut sync = SyncContext::new(scheduler, self.target);
        participant.execute_until(self.time, self.user_data, &mut sync);
    }

    pub(crate) fn matches(&self, target: SyncTarget, user_data: Option<i32>) -> bool {
        self.target == target && user_data.map_or(true, |data| data == self.user_data)
    }
}
