//! Carte mère MSX : gestionnaire des périphériques
//!
//! La carte mère possède l'arène des périphériques, le registre de slots
//! primaires, et pilote reset, mise sous tension et extinction. Elle est
//! elle-même planifiable : un reset demandé depuis la console devient un
//! point de synchronisation ASAP qui lui est adressé.

use log::{debug, info, warn};

use crate::devices::{DeviceId, MsxDevice};
use crate::error::EmuError;
use crate::leds::{LedEvent, Leds};
use crate::scheduler::{Schedulable, Scheduler, SyncContext, SyncPoint, SyncTarget};
use crate::time::EmuTime;

/// Emplacement de l'arène
struct Slot {
    generation: u32,
    device: Option<Box<dyn MsxDevice>>,
}

/// Carte mère et registre des périphériques
pub struct MotherBoard {
    slots: Vec<Slot>,

    /// Emplacements libres, réutilisés en priorité
    free: Vec<u32>,

    /// Registre des slots primaires (port A8h)
    primary_slots: u8,

    powered: bool,

    /// Nombre de resets effectués
    pub reset_count: u64,
}

impl MotherBoard {
    /// Étiquette du point de synchronisation de reset
    pub const RESET: i32 = 0;

    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            primary_slots: 0,
            powered: false,
            reset_count: 0,
        }
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn primary_slots(&self) -> u8 {
        self.primary_slots
    }

    pub fn set_primary_slots(&mut self, value: u8) {
        self.primary_slots = value;
    }

    /// Enregistre un périphérique et retourne son handle
    ///
    /// Si la machine est déjà sous tension, le périphérique est alimenté
    /// immédiatement.
    pub fn add_device(
        &mut self,
        device: Box<dyn MsxDevice>,
        scheduler: &mut Scheduler,
    ) -> DeviceId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.device = Some(device);
                DeviceId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    device: Some(device),
                });
                DeviceId::new(index, 0)
            }
        };
        if self.powered {
            let time = scheduler.get_current_time();
            let mut sync = SyncContext::new(scheduler, SyncTarget::Device(id));
            if let Some(device) = self.device_mut(id) {
                device.power_up(time, &mut sync);
            }
        }
        info!("Périphérique {} ajouté ({id})", self.device_name(id));
        id
    }

    /// Détache un périphérique et le rend à l'appelant
    ///
    /// Tous ses points de synchronisation en attente sont annulés avant le
    /// retrait ; le handle devient invalide.
    pub fn remove_device(
        &mut self,
        id: DeviceId,
        scheduler: &mut Scheduler,
    ) -> Result<Box<dyn MsxDevice>, EmuError> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .ok_or(EmuError::UnknownDevice(id))?;
        let device = slot.device.take().ok_or(EmuError::UnknownDevice(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index() as u32);

        let cancelled = scheduler.remove_sync_points(SyncTarget::Device(id));
        info!(
            "Périphérique {} retiré ({id}, {cancelled} sync point(s) annulé(s))",
            device.name()
        );
        Ok(device)
    }

    pub fn device(&self, id: DeviceId) -> Option<&dyn MsxDevice> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.device.as_deref())
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut (dyn MsxDevice + 'static)> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.device.as_deref_mut())
    }

    /// Accès typé à un périphérique
    pub fn device_as<T: MsxDevice>(&self, id: DeviceId) -> Option<&T> {
        self.device(id).and_then(|device| device.as_any().downcast_ref::<T>())
    }

    pub fn device_as_mut<T: MsxDevice>(&mut self, id: DeviceId) -> Option<&mut T> {
        self.device_mut(id)
            .and_then(|device| device.as_any_mut().downcast_mut::<T>())
    }

    pub fn device_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.device.is_some()).count()
    }

    /// Handles des périphériques vivants, par ordre d'emplacement
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.device.is_some())
            .map(|(index, slot)| DeviceId::new(index as u32, slot.generation))
            .collect()
    }

    fn device_name(&self, id: DeviceId) -> String {
        self.device(id)
            .map_or_else(|| "<absent>".to_string(), |device| device.name().to_string())
    }

    /// Applique `f` à chaque périphérique avec son contexte de synchronisation
    fn for_each_device<F>(&mut self, scheduler: &mut Scheduler, mut f: F)
    where
        F: FnMut(&mut dyn MsxDevice, &mut SyncContext<'_>),
    {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let id = DeviceId::new(index as u32, slot.generation);
            if let Some(device) = slot.device.as_deref_mut() {
                let mut sync = SyncContext::new(scheduler, SyncTarget::Device(id));
                f(device, &mut sync);
            }
        }
    }

    /// Reset de toute la machine à `time`
    pub fn reset_msx(&mut self, time: EmuTime, scheduler: &mut Scheduler) {
        info!("Reset MSX à {time}");
        self.set_primary_slots(0);
        self.reset_count += 1;
        self.for_each_device(scheduler, |device, sync| device.reset(time, sync));
    }

    /// Mise sous tension et démarrage de l'émulation
    pub fn start_msx(&mut self, scheduler: &mut Scheduler, leds: &mut Leds) {
        let time = scheduler.get_current_time();
        info!("Mise sous tension à {time}");
        self.set_primary_slots(0);
        leds.set_led(LedEvent::PowerOn);
        self.powered = true;
        self.for_each_device(scheduler, |device, sync| device.power_up(time, sync));
        scheduler.schedule_emulation();
    }

    /// Extinction : tous les périphériques sont mis hors tension puis détachés
    pub fn destroy_msx(&mut self, scheduler: &mut Scheduler, leds: &mut Leds) {
        let time = scheduler.get_current_time();
        info!("Extinction à {time}");
        scheduler.stop_emulation();
        for id in self.device_ids() {
            if let Some(device) = self.device_mut(id) {
                device.power_down(time);
            }
            if let Err(err) = self.remove_device(id, scheduler) {
                warn!("détachement impossible: {err}");
            }
        }
        scheduler.remove_sync_points(SyncTarget::MotherBoard);
        self.powered = false;
        leds.set_led(LedEvent::PowerOff);
    }

    /// Demande un reset, exécuté dès que possible par le scheduler
    pub fn request_reset(&self, scheduler: &mut Scheduler) {
        debug!("reset demandé à {}", scheduler.get_current_time());
        scheduler.set_asap_sync_point(SyncTarget::MotherBoard, Self::RESET);
    }

    /// Transmet un point de synchronisation au périphérique visé
    ///
    /// # Panics
    ///
    /// Un point visant un périphérique détaché signifie que le contrat de
    /// détachement a été violé.
    pub fn dispatch_device(&mut self, id: DeviceId, point: SyncPoint, scheduler: &mut Scheduler) {
        let device = match self.device_mut(id) {
            Some(device) => device,
            None => panic!("point de synchronisation pour un périphérique détaché: {id}"),
        };
        point.deliver(device, scheduler);
    }
}

impl Default for MotherBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedulable for MotherBoard {
    fn execute_until(&mut self, time: EmuTime, user_data: i32, sync: &mut SyncContext<'_>) {
        match user_data {
            Self::RESET => self.reset_msx(time, sync.scheduler()),
            other => panic!("étiquette de carte mère inconnue: {other}"),
        }
    }

    fn schedulable_name(&self) -> &str {
        "motherboard"
    }
}
