//! MSX Emu Rust - Noyau d'émulation MSX
//!
//! Cette bibliothèque fournit le cœur temporel de l'émulateur : temps virtuel
//! exact, horloges de périphériques, scheduler évènementiel et carte mère
//! qui enregistre les périphériques pilotés par ce scheduler.

pub mod config;
pub mod cpu;
pub mod devices;
pub mod error;
pub mod leds;
pub mod motherboard;
pub mod realtime;
pub mod scheduler;
pub mod session;
pub mod time;

pub use config::*;
pub use cpu::*;
pub use devices::*;
pub use error::*;
pub use leds::*;
pub use motherboard::*;
pub use realtime::*;
pub use scheduler::*;
pub use session::*;
pub use time::*;

/// Version de l'émulateur
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fréquence du CPU principal (Z80) en Hz
pub const MSX_CPU_FREQUENCY: u64 = 3_579_545; // 3.58MHz

/// Fréquence de trame NTSC
pub const NTSC_FRAME_RATE: u64 = 60;

/// Fréquence de trame PAL
pub const PAL_FRAME_RATE: u64 = 50;
