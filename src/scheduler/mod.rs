//! Scheduler évènementiel de l'émulation
//!
//! Le scheduler maintient l'unique ordre global des évènements futurs de la
//! machine. La boucle principale alterne entre :
//! - l'exécution du CPU jusqu'au prochain point de synchronisation (jamais
//!   au-delà, pour que le CPU observe l'état d'avant l'évènement) ;
//! - la distribution de tous les points dus à l'instant courant, dans l'ordre
//!   d'insertion, avant que le CPU ne reprenne.

pub mod schedulable;
pub mod sync_point;

use std::collections::VecDeque;

use anyhow::{ensure, Result};
use log::{debug, info, trace};

pub use schedulable::*;
pub use sync_point::*;

use crate::cpu::CpuInterface;
use crate::time::EmuTime;

/// État de la boucle d'émulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Aucune exécution CPU en cours
    Idle,
    /// Le CPU exécute jusqu'au prochain point de synchronisation
    Running,
    /// Un rappel de point de synchronisation est en cours
    Dispatching,
}

/// File ordonnée des points de synchronisation et boucle principale
#[derive(Debug)]
pub struct Scheduler {
    /// Points en attente, triés par instant puis par ordre d'insertion
    queue: VecDeque<SyncPoint>,

    /// Instant déjà atteint par l'exécution
    current_time: EmuTime,

    state: SchedulerState,

    /// Arrêt demandé, pris en compte au prochain tour de boucle
    stop_requested: bool,

    /// Nombre total de points distribués
    dispatched: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::starting_at(EmuTime::ZERO)
    }

    /// Crée un scheduler dont la chronologie démarre à `time`
    pub fn starting_at(time: EmuTime) -> Self {
        Self {
            queue: VecDeque::new(),
            current_time: time,
            state: SchedulerState::Idle,
            stop_requested: false,
            dispatched: 0,
        }
    }

    pub fn get_current_time(&self) -> EmuTime {
        self.current_time
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn dispatched_count(&self) -> u64 {
        self.dispatched
    }

    /// Planifie un rappel de `target` à `time`
    ///
    /// Pour des instants identiques, l'ordre de distribution est l'ordre
    /// d'insertion.
    ///
    /// # Panics
    ///
    /// Planifier dans le passé est une violation de contrat.
    pub fn set_sync_point(&mut self, time: EmuTime, target: SyncTarget, user_data: i32) {
        assert!(
            time >= self.current_time,
            "point de synchronisation dans le passé pour {target}: {time} < {}",
            self.current_time
        );
        let index = self.queue.partition_point(|sp| sp.time <= time);
        self.queue
            .insert(index, SyncPoint::new(time, target, user_data));
        trace!("sync point {target}/{user_data} à {time}");
    }

    /// Planifie un rappel « dès que possible »
    ///
    /// Le point est placé à l'instant courant, avant tout autre point en
    /// attente (mais après les points ASAP déjà présents).
    pub fn set_asap_sync_point(&mut self, target: SyncTarget, user_data: i32) {
        let index = self.queue.partition_point(|sp| sp.asap);
        let mut point = SyncPoint::new(self.current_time, target, user_data);
        point.asap = true;
        self.queue.insert(index, point);
        trace!("sync point ASAP {target}/{user_data} à {}", self.current_time);
    }

    /// Annule les points de `target` portant l'étiquette `user_data`
    ///
    /// Retourne `false` si aucun point ne correspondait ; ce n'est pas une
    /// erreur.
    pub fn remove_sync_point(&mut self, target: SyncTarget, user_data: i32) -> bool {
        self.remove_matching(target, Some(user_data)) > 0
    }

    /// Annule tous les points de `target`, quelle que soit leur étiquette
    pub fn remove_sync_points(&mut self, target: SyncTarget) -> usize {
        self.remove_matching(target, None)
    }

    fn remove_matching(&mut self, target: SyncTarget, user_data: Option<i32>) -> usize {
        let before = self.queue.len();
        self.queue.retain(|sp| !sp.matches(target, user_data));
        let removed = before - self.queue.len();
        if removed > 0 {
            trace!("{removed} sync point(s) annulé(s) pour {target}");
        }
        removed
    }

    pub fn pending_sync_point(&self, target: SyncTarget, user_data: i32) -> bool {
        self.queue.iter().any(|sp| sp.matches(target, Some(user_data)))
    }

    /// Instant du prochain point, `None` si la file est vide
    pub fn next_sync_point(&self) -> Option<EmuTime> {
        self.queue.front().map(|sp| sp.time)
    }

    /// Borne supérieure jusqu'à laquelle le CPU peut exécuter
    ///
    /// # Panics
    ///
    /// Une file vide signifie qu'aucun battement périodique ne garantit la
    /// progression : l'application est mal configurée.
    pub fn time_of_next_sync_point(&self) -> EmuTime {
        match self.next_sync_point() {
            Some(time) => time,
            None => panic!(
                "file de synchronisation vide à {} (aucun battement périodique)",
                self.current_time
            ),
        }
    }

    /// Signale que le CPU a atteint `time`
    ///
    /// # Panics
    ///
    /// Si le temps recule ou si `time` dépasse le prochain point en attente.
    pub fn notify_time_reached(&mut self, time: EmuTime) {
        assert!(
            time >= self.current_time,
            "le temps recule: {time} < {}",
            self.current_time
        );
        if let Some(next) = self.next_sync_point() {
            assert!(
                time <= next,
                "le CPU a dépassé le point de synchronisation {next} (atteint {time})"
            );
        }
        self.current_time = time;
    }

    /// Passe de `Idle` à `Running`
    pub fn schedule_emulation(&mut self) {
        if self.state == SchedulerState::Idle {
            info!("Démarrage de l'émulation à {}", self.current_time);
            self.state = SchedulerState::Running;
            self.stop_requested = false;
        }
    }

    /// Demande le retour à `Idle`
    ///
    /// Effectif immédiatement hors de la boucle, ou au prochain tour si un
    /// rappel est en cours.
    pub fn stop_emulation(&mut self) {
        match self.state {
            SchedulerState::Idle => {}
            SchedulerState::Running => {
                info!("Arrêt de l'émulation à {}", self.current_time);
                self.state = SchedulerState::Idle;
            }
            SchedulerState::Dispatching => self.stop_requested = true,
        }
    }

    /// Fait avancer la machine jusqu'à `limit`
    ///
    /// Tous les points dus à `limit` ou avant sont distribués avant le retour.
    /// Retourne l'instant atteint, inférieur à `limit` uniquement si un arrêt a
    /// été demandé.
    ///
    /// # Panics
    ///
    /// Si le scheduler n'est pas `Running` (en particulier en cas d'appel
    /// réentrant depuis un rappel) ou si la file se vide.
    pub fn schedule(
        &mut self,
        limit: EmuTime,
        cpu: &mut dyn CpuInterface,
        dispatcher: &mut dyn SyncDispatcher,
    ) -> Result<EmuTime> {
        assert_eq!(
            self.state,
            SchedulerState::Running,
            "schedule() appelé hors de l'état Running"
        );
        loop {
            if self.state == SchedulerState::Idle {
                break;
            }
            let next = self.time_of_next_sync_point();
            if next <= self.current_time {
                self.dispatch_due(dispatcher);
                continue;
            }
            if self.current_time >= limit {
                break;
            }
            let target = next.min(limit);
            let reached = cpu.execute(target)?;
            ensure!(
                reached > self.current_time,
                "le CPU n'a pas progressé depuis {} (limite {target})",
                self.current_time
            );
            self.notify_time_reached(reached);
        }
        Ok(self.current_time)
    }

    /// Distribue tous les points dus à l'instant courant
    ///
    /// Un point inséré pendant un rappel pour l'instant courant est distribué
    /// dans cette même passe, après ceux déjà en attente.
    fn dispatch_due(&mut self, dispatcher: &mut dyn SyncDispatcher) {
        self.state = SchedulerState::Dispatching;
        while self
            .queue
            .front()
            .is_some_and(|sp| sp.time <= self.current_time)
        {
            let Some(point) = self.queue.pop_front() else {
                break;
            };
            trace!(
                "distribution {}/{} à {}",
                point.target,
                point.user_data,
                self.current_time
            );
            self.dispatched += 1;
            dispatcher.dispatch(point, self);
        }
        if self.stop_requested {
            debug!("arrêt demandé pendant la distribution");
            self.stop_requested = false;
            self.state = SchedulerState::Running;
            self.stop_emulation();
        } else {
            self.state = SchedulerState::Running;
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceId;
    use crate::time::EmuDuration;

    fn at(ticks: u64) -> EmuTime {
        EmuTime::from_base_ticks(ticks)
    }

    fn device(index: u32) -> SyncTarget {
        SyncTarget::Device(DeviceId::new(index, 0))
    }

    /// CPU qui atteint toujours la limite demandée
    struct JumpCpu {
        calls: Vec<EmuTime>,
    }

    impl CpuInterface for JumpCpu {
        fn execute(&mut self, limit: EmuTime) -> Result<EmuTime> {
            self.calls.push(limit);
            Ok(limit)
        }
    }

    /// CPU qui avance par tranches fixes
    struct ChunkCpu {
        now: EmuTime,
        chunk: u64,
    }

    impl CpuInterface for ChunkCpu {
        fn execute(&mut self, limit: EmuTime) -> Result<EmuTime> {
            let next = self.now + EmuDuration::from_base_ticks(self.chunk as i64);
            self.now = next.min(limit);
            Ok(self.now)
        }
    }

    struct StalledCpu;

    /// CPU qui dépasse systématiquement la borne d'un tick
    struct OverrunCpu;

    impl CpuInterface for OverrunCpu {
        fn execute(&mut self, limit: EmuTime) -> Result<EmuTime> {
            Ok(limit + EmuDuration::from_base_ticks(1))
        }
    }

    impl CpuInterface for StalledCpu {
        fn execute(&mut self, _limit: EmuTime) -> Result<EmuTime> {
            Ok(EmuTime::ZERO)
        }
    }

    /// Journal des rappels, avec réactions optionnelles
    #[derive(Default)]
    struct Recorder {
        log: Vec<(SyncTarget, u64, i32)>,
        /// (cible, période) : la cible se replanifie à chaque rappel
        periodic: Option<(SyncTarget, u64)>,
        /// Nombre de replanifications au même instant restant à faire
        same_instant: u32,
        stop_on: Option<SyncTarget>,
    }

    impl SyncDispatcher for Recorder {
        fn dispatch(&mut self, point: SyncPoint, scheduler: &mut Scheduler) {
            self.log
                .push((point.target, point.time.base_ticks(), point.user_data));
            if let Some((target, period)) = self.periodic {
                if target == point.target {
                    let next = point.time + EmuDuration::from_base_ticks(period as i64);
                    scheduler.set_sync_point(next, target, (point.user_data + 1) % 4);
                }
            }
            if self.same_instant > 0 && point.target == device(9) {
                self.same_instant -= 1;
                scheduler.set_sync_point(point.time, point.target, point.user_data + 1);
            }
            if self.stop_on == Some(point.target) {
                scheduler.stop_emulation();
            }
        }
    }

    fn running() -> Scheduler {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_emulation();
        scheduler
    }

    #[test]
    fn test_dispatch_order_time_then_insertion() {
        let mut scheduler = running();
        let (a, b, c) = (device(1), device(2), device(3));
        scheduler.set_sync_point(at(100), a, 0);
        scheduler.set_sync_point(at(100), b, 0);
        scheduler.set_sync_point(at(50), c, 0);
        scheduler.set_sync_point(at(1000), device(99), 0);

        let mut cpu = JumpCpu { calls: Vec::new() };
        let mut recorder = Recorder::default();
        let reached = scheduler.schedule(at(200), &mut cpu, &mut recorder).unwrap();

        assert_eq!(reached, at(200));
        assert_eq!(recorder.log, vec![(c, 50, 0), (a, 100, 0), (b, 100, 0)]);
        // Le CPU s'arrête à chaque point, jamais au-delà
        assert_eq!(cpu.calls, vec![at(50), at(100), at(200)]);
    }

    #[test]
    fn test_asap_goes_before_pending_points() {
        let mut scheduler = Scheduler::starting_at(at(200));
        scheduler.schedule_emulation();
        scheduler.set_sync_point(at(200), device(1), 0);
        scheduler.set_sync_point(at(500), device(2), 0);
        scheduler.set_sync_point(at(10_000), device(99), 0);
        scheduler.set_asap_sync_point(SyncTarget::MotherBoard, 0);
        scheduler.set_asap_sync_point(SyncTarget::MotherBoard, 1);
        assert!(scheduler.queue[0].is_asap() && scheduler.queue[1].is_asap());
        assert!(!scheduler.queue[2].is_asap());

        let mut cpu = JumpCpu { calls: Vec::new() };
        let mut recorder = Recorder::default();
        scheduler.schedule(at(500), &mut cpu, &mut recorder).unwrap();

        assert_eq!(
            recorder.log,
            vec![
                (SyncTarget::MotherBoard, 200, 0),
                (SyncTarget::MotherBoard, 200, 1),
                (device(1), 200, 0),
                (device(2), 500, 0),
            ]
        );
    }

    #[test]
    fn test_remove_sync_point_is_idempotent() {
        let mut scheduler = Scheduler::new();
        scheduler.set_sync_point(at(10), device(1), 3);
        scheduler.set_sync_point(at(20), device(1), 4);

        assert!(scheduler.remove_sync_point(device(1), 3));
        assert!(!scheduler.remove_sync_point(device(1), 3));
        assert!(!scheduler.remove_sync_point(device(2), 0));
        assert!(scheduler.pending_sync_point(device(1), 4));
        assert_eq!(scheduler.remove_sync_points(device(1)), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_periodic_resubmission() {
        let mut scheduler = running();
        let timer = device(5);
        scheduler.set_sync_point(at(300), timer, 0);

        let mut cpu = JumpCpu { calls: Vec::new() };
        let mut recorder = Recorder {
            periodic: Some((timer, 300)),
            ..Recorder::default()
        };
        scheduler.schedule(at(1200), &mut cpu, &mut recorder).unwrap();

        assert_eq!(
            recorder.log,
            vec![(timer, 300, 0), (timer, 600, 1), (timer, 900, 2), (timer, 1200, 3)]
        );
        assert!(scheduler.pending_sync_point(timer, 0));
        assert_eq!(scheduler.next_sync_point(), Some(at(1500)));
    }

    #[test]
    fn test_same_instant_resubmission_is_drained_before_cpu_resumes() {
        let mut scheduler = running();
        scheduler.set_sync_point(at(300), device(9), 0);
        scheduler.set_sync_point(at(300), device(1), 0);
        scheduler.set_sync_point(at(400), device(2), 0);
        scheduler.set_sync_point(at(10_000), device(99), 0);

        let mut cpu = JumpCpu { calls: Vec::new() };
        let mut recorder = Recorder {
            same_instant: 2,
            ..Recorder::default()
        };
        scheduler.schedule(at(400), &mut cpu, &mut recorder).unwrap();

        assert_eq!(
            recorder.log,
            vec![
                (device(9), 300, 0),
                (device(1), 300, 0),
                (device(9), 300, 1),
                (device(9), 300, 2),
                (device(2), 400, 0),
            ]
        );
        assert_eq!(cpu.calls, vec![at(300), at(400)]);
    }

    #[test]
    fn test_partial_cpu_progress() {
        let mut scheduler = running();
        scheduler.set_sync_point(at(100), device(1), 0);
        scheduler.set_sync_point(at(1000), device(2), 0);

        let mut cpu = ChunkCpu {
            now: EmuTime::ZERO,
            chunk: 30,
        };
        let mut recorder = Recorder::default();
        let reached = scheduler.schedule(at(250), &mut cpu, &mut recorder).unwrap();

        assert_eq!(reached, at(250));
        assert_eq!(recorder.log, vec![(device(1), 100, 0)]);
    }

    #[test]
    fn test_points_due_at_limit_are_dispatched() {
        let mut scheduler = running();
        scheduler.set_sync_point(at(100), device(1), 0);
        scheduler.set_sync_point(at(900), device(2), 0);

        let mut cpu = JumpCpu { calls: Vec::new() };
        let mut recorder = Recorder::default();
        scheduler.schedule(at(100), &mut cpu, &mut recorder).unwrap();
        assert_eq!(recorder.log, vec![(device(1), 100, 0)]);
        assert_eq!(scheduler.get_current_time(), at(100));
    }

    #[test]
    fn test_stop_from_callback() {
        let mut scheduler = running();
        scheduler.set_sync_point(at(100), device(1), 0);
        scheduler.set_sync_point(at(200), device(2), 0);

        let mut cpu = JumpCpu { calls: Vec::new() };
        let mut recorder = Recorder {
            stop_on: Some(device(1)),
            ..Recorder::default()
        };
        let reached = scheduler.schedule(at(1000), &mut cpu, &mut recorder).unwrap();

        assert_eq!(reached, at(100));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    #[should_panic(expected = "dépassé le point de synchronisation")]
    fn test_cpu_running_past_sync_point_is_fatal() {
        let mut scheduler = running();
        scheduler.set_sync_point(at(100), device(1), 0);
        let mut recorder = Recorder::default();
        let _ = scheduler.schedule(at(1000), &mut OverrunCpu, &mut recorder);
    }

    #[test]
    fn test_stop_while_running_is_immediate() {
        let mut scheduler = running();
        scheduler.set_sync_point(at(100), device(1), 0);

        scheduler.stop_emulation();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        // Arrêt idempotent
        scheduler.stop_emulation();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.pending_count(), 1);

        // Relance : la file est intacte
        scheduler.schedule_emulation();
        let mut cpu = JumpCpu { calls: Vec::new() };
        let mut recorder = Recorder::default();
        scheduler.set_sync_point(at(500), device(2), 0);
        scheduler.schedule(at(200), &mut cpu, &mut recorder).unwrap();
        assert_eq!(recorder.log, vec![(device(1), 100, 0)]);
    }

    #[test]
    fn test_stalled_cpu_is_an_error() {
        let mut scheduler = running();
        scheduler.set_sync_point(at(100), device(1), 0);
        let mut recorder = Recorder::default();
        assert!(scheduler
            .schedule(at(100), &mut StalledCpu, &mut recorder)
            .is_err());
    }

    #[test]
    #[should_panic]
    fn test_sync_point_in_the_past_is_fatal() {
        let mut scheduler = Scheduler::starting_at(at(100));
        scheduler.set_sync_point(at(99), device(1), 0);
    }

    #[test]
    #[should_panic]
    fn test_empty_queue_while_running_is_fatal() {
        let mut scheduler = running();
        let mut cpu = JumpCpu { calls: Vec::new() };
        let _ = scheduler.schedule(at(100), &mut cpu, &mut Recorder::default());
    }

    #[test]
    #[should_panic]
    fn test_schedule_while_idle_is_fatal() {
        let mut scheduler = Scheduler::new();
        scheduler.set_sync_point(at(100), device(1), 0);
        let mut cpu = JumpCpu { calls: Vec::new() };
        let _ = scheduler.schedule(at(100), &mut cpu, &mut Recorder::default());
    }
}
