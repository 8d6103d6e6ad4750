//! Tests d'ordonnancement à travers une session complète
//!
//! Des périphériques témoins enregistrent chaque rappel reçu ; on vérifie
//! l'ordre de distribution vu de l'extérieur du scheduler.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use msx_emu_rust::*;

type Journal = Rc<RefCell<Vec<(String, u64, i32)>>>;

/// Périphérique qui journalise ses rappels
struct Witness {
    name: String,
    journal: Journal,
    /// Replanification périodique après chaque rappel
    period: Option<u64>,
}

impl Witness {
    fn boxed(name: &str, journal: &Journal) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            journal: Rc::clone(journal),
            period: None,
        })
    }
}

impl Schedulable for Witness {
    fn execute_until(&mut self, time: EmuTime, user_data: i32, sync: &mut SyncContext<'_>) {
        self.journal
            .borrow_mut()
            .push((self.name.clone(), time.base_ticks(), user_data));
        if let Some(period) = self.period {
            let next = time + EmuDuration::from_base_ticks(period as i64);
            sync.set_sync_point(next, (user_data + 1) % 2);
        }
    }

    fn schedulable_name(&self) -> &str {
        &self.name
    }
}

impl MsxDevice for Witness {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self, _time: EmuTime, _sync: &mut SyncContext<'_>) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn at(ticks: u64) -> EmuTime {
    EmuTime::from_base_ticks(ticks)
}

fn entries(journal: &Journal) -> Vec<(String, u64, i32)> {
    journal.borrow().clone()
}

fn started_session() -> EmulationSession {
    let mut session = EmulationSession::new(EmulatorConfig::headless()).unwrap();
    session.power_on().unwrap();
    session
}

#[test]
fn test_equal_times_dispatch_in_insertion_order() {
    let journal = Journal::default();
    let mut session = started_session();
    let a = session.add_device(Witness::boxed("A", &journal));
    let b = session.add_device(Witness::boxed("B", &journal));
    let c = session.add_device(Witness::boxed("C", &journal));

    let scheduler = session.scheduler_mut();
    scheduler.set_sync_point(at(100), SyncTarget::Device(a), 0);
    scheduler.set_sync_point(at(100), SyncTarget::Device(b), 0);
    scheduler.set_sync_point(at(50), SyncTarget::Device(c), 0);

    session.run_until(at(200)).unwrap();

    assert_eq!(
        entries(&journal),
        vec![
            ("C".to_string(), 50, 0),
            ("A".to_string(), 100, 0),
            ("B".to_string(), 100, 0),
        ]
    );
}

#[test]
fn test_asap_before_later_pending_point() {
    let journal = Journal::default();
    let mut session = started_session();
    let a = session.add_device(Witness::boxed("A", &journal));
    let b = session.add_device(Witness::boxed("B", &journal));

    session.run_until(at(200)).unwrap();
    let scheduler = session.scheduler_mut();
    scheduler.set_sync_point(at(500), SyncTarget::Device(a), 0);
    scheduler.set_asap_sync_point(SyncTarget::Device(b), 7);

    session.run_until(at(600)).unwrap();

    assert_eq!(
        entries(&journal),
        vec![("B".to_string(), 200, 7), ("A".to_string(), 500, 0)]
    );
}

#[test]
fn test_periodic_device_keeps_firing() {
    let journal = Journal::default();
    let mut session = started_session();
    let mut witness = Witness::boxed("T", &journal);
    witness.period = Some(1_000);
    let t = session.add_device(witness);

    session
        .scheduler_mut()
        .set_sync_point(at(1_000), SyncTarget::Device(t), 0);
    session.run_until(at(3_500)).unwrap();

    assert_eq!(
        entries(&journal),
        vec![
            ("T".to_string(), 1_000, 0),
            ("T".to_string(), 2_000, 1),
            ("T".to_string(), 3_000, 0),
        ]
    );
    assert!(session
        .scheduler()
        .pending_sync_point(SyncTarget::Device(t), 1));
}

#[test]
fn test_cancellation_before_dispatch() {
    let journal = Journal::default();
    let mut session = started_session();
    let a = session.add_device(Witness::boxed("A", &journal));

    let scheduler = session.scheduler_mut();
    scheduler.set_sync_point(at(100), SyncTarget::Device(a), 1);
    scheduler.set_sync_point(at(200), SyncTarget::Device(a), 2);
    assert!(scheduler.remove_sync_point(SyncTarget::Device(a), 1));
    assert!(!scheduler.remove_sync_point(SyncTarget::Device(a), 1));

    session.run_until(at(300)).unwrap();
    assert_eq!(entries(&journal), vec![("A".to_string(), 200, 2)]);

    // Déjà distribué : l'annulation ne trouve plus rien
    assert!(!session
        .scheduler_mut()
        .remove_sync_point(SyncTarget::Device(a), 2));
}

#[test]
fn test_removed_device_receives_nothing() {
    let journal = Journal::default();
    let mut session = started_session();
    let a = session.add_device(Witness::boxed("A", &journal));
    session
        .scheduler_mut()
        .set_sync_point(at(100), SyncTarget::Device(a), 0);

    let removed = session.remove_device(a).unwrap();
    assert_eq!(removed.name(), "A");
    assert!(!session
        .scheduler()
        .pending_sync_point(SyncTarget::Device(a), 0));

    session.run_until(at(1_000)).unwrap();
    assert!(entries(&journal).is_empty());
}

#[test]
fn test_cpu_never_runs_past_a_sync_point() {
    /// CPU qui mémorise chaque borne reçue
    struct BoundCpu {
        limits: Rc<RefCell<Vec<EmuTime>>>,
    }

    impl CpuInterface for BoundCpu {
        fn execute(&mut self, limit: EmuTime) -> anyhow::Result<EmuTime> {
            self.limits.borrow_mut().push(limit);
            Ok(limit)
        }
    }

    let limits = Rc::new(RefCell::new(Vec::new()));
    let cpu = BoundCpu {
        limits: Rc::clone(&limits),
    };
    let mut session =
        EmulationSession::with_cpu(EmulatorConfig::headless(), Box::new(cpu)).unwrap();
    session.power_on().unwrap();

    let journal = Journal::default();
    let a = session.add_device(Witness::boxed("A", &journal));
    session
        .scheduler_mut()
        .set_sync_point(at(12_345), SyncTarget::Device(a), 0);
    session.run_until(at(20_000)).unwrap();

    assert_eq!(*limits.borrow(), vec![at(12_345), at(20_000)]);
}
