//! Représentation du temps émulé
//!
//! Tous les composants partagent une même unité : le tick de base à
//! [`MAIN_FREQ`] Hz.

pub mod dynamic_clock;
pub mod emu_time;

pub use dynamic_clock::*;
pub use emu_time::*;
