//! Voyants de la façade MSX

use bitflags::bitflags;
use log::debug;

bitflags! {
    /// Voyants allumés
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LedState: u8 {
        const POWER = 0x01;
        const CAPS  = 0x02;
        const KANA  = 0x04;
        const PAUSE = 0x08;
        const TURBO = 0x10;
        const FDD   = 0x20;
    }
}

/// Changement d'état d'un voyant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedEvent {
    PowerOn,
    PowerOff,
    CapsOn,
    CapsOff,
    KanaOn,
    KanaOff,
    PauseOn,
    PauseOff,
    TurboOn,
    TurboOff,
    FddOn,
    FddOff,
}

impl LedEvent {
    fn decode(self) -> (LedState, bool) {
        match self {
            LedEvent::PowerOn => (LedState::POWER, true),
            LedEvent::PowerOff => (LedState::POWER, false),
            LedEvent::CapsOn => (LedState::CAPS, true),
            LedEvent::CapsOff => (LedState::CAPS, false),
            LedEvent::KanaOn => (LedState::KANA, true),
            LedEvent::KanaOff => (LedState::KANA, false),
            LedEvent::PauseOn => (LedState::PAUSE, true),
            LedEvent::PauseOff => (LedState::PAUSE, false),
            LedEvent::TurboOn => (LedState::TURBO, true),
            LedEvent::TurboOff => (LedState::TURBO, false),
            LedEvent::FddOn => (LedState::FDD, true),
            LedEvent::FddOff => (LedState::FDD, false),
        }
    }
}

/// État des voyants, détenu par la session d'émulation
#[derive(Debug, Clone, Default)]
pub struct Leds {
    state: LedState,
    /// Nombre de changements effectifs, pour l'affichage
    changes: u64,
}

impl Leds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applique un évènement ; retourne `true` si l'état a changé
    pub fn set_led(&mut self, event: LedEvent) -> bool {
        let (led, on) = event.decode();
        if self.state.contains(led) == on {
            return false;
        }
        self.state.set(led, on);
        self.changes += 1;
        debug!("voyant {led:?} {}", if on { "allumé" } else { "éteint" });
        true
    }

    pub fn is_on(&self, led: LedState) -> bool {
        self.state.contains(led)
    }

    pub fn state(&self) -> LedState {
        self.state
    }

    pub fn change_count(&self) -> u64 {
        self.changes
    }
}
