//! Contrat des participants planifiables

use super::sync_point::{SyncPoint, SyncTarget};
use super::Scheduler;
use crate::time::EmuTime;

/// Composant pouvant recevoir un rappel à un instant donné
///
/// `execute_until` est appelé exactement quand `time` est atteint. Le rappel
/// s'exécute jusqu'au bout, sans suspension ; il peut replanifier le même
/// composant via `sync`. Un composant incapable de traiter son rappel est
/// dans un état incohérent et doit paniquer.
pub trait Schedulable {
    fn execute_until(&mut self, time: EmuTime, user_data: i32, sync: &mut SyncContext<'_>);

    /// Nom utilisé dans les traces
    fn schedulable_name(&self) -> &str;
}

/// Accès au scheduler restreint à un participant
///
/// Construit par l'aiguilleur pour chaque rappel (et pour les resets ou mises
/// sous tension), il connaît l'identité du participant, qui n'a donc pas
/// besoin de la mémoriser.
pub struct SyncContext<'a> {
    scheduler: &'a mut Scheduler,
    target: SyncTarget,
}

impl<'a> SyncContext<'a> {
    pub fn new(scheduler: &'a mut Scheduler, target: SyncTarget) -> Self {
        Self { scheduler, target }
    }

    pub fn target(&self) -> SyncTarget {
        self.target
    }

    pub fn current_time(&self) -> EmuTime {
        self.scheduler.get_current_time()
    }

    /// Planifie un rappel de ce participant à `time`
    pub fn set_sync_point(&mut self, time: EmuTime, user_data: i32) {
        self.scheduler.set_sync_point(time, self.target, user_data);
    }

    /// Planifie un rappel de ce participant avant tout autre point en attente
    pub fn set_asap_sync_point(&mut self, user_data: i32) {
        self.scheduler.set_asap_sync_point(self.target, user_data);
    }

    pub fn remove_sync_point(&mut self, user_data: i32) -> bool {
        self.scheduler.remove_sync_point(self.target, user_data)
    }

    pub fn remove_sync_points(&mut self) -> usize {
        self.scheduler.remove_sync_points(self.target)
    }

    pub fn pending_sync_point(&self, user_data: i32) -> bool {
        self.scheduler.pending_sync_point(self.target, user_data)
    }

    /// Accès complet, pour les participants qui pilotent d'autres cibles
    pub fn scheduler(&mut self) -> &mut Scheduler {
        &mut *self.scheduler
    }
}

/// Résolution d'un `SyncTarget` vers le participant concerné
pub trait SyncDispatcher {
    fn dispatch(&mut self, point: SyncPoint, scheduler: &mut Scheduler);
}
