//! Configuration de l'émulateur

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Configuration principale de l'émulateur
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulatorConfig {
    pub machine: MachineConfig,
    pub realtime: RealTimeConfig,
    pub emulation: EmulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub name: String,
    /// Fréquence du Z80 en Hz
    pub cpu_frequency_hz: u64,
    /// Fréquence de l'interruption de trame (50 PAL, 60 NTSC)
    pub vsync_frequency_hz: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealTimeConfig {
    pub enabled: bool,
    /// Vitesse relative en pourcent (100 = temps réel)
    pub speed_percent: u32,
    /// Intervalle de temps émulé entre deux synchronisations
    pub sync_interval_ms: u64,
    /// Retard au-delà duquel on abandonne le rattrapage
    pub max_lag_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulationConfig {
    /// Durée de la session de démonstration, en ms de temps émulé
    pub run_time_ms: u64,
    pub debug_mode: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            machine: MachineConfig {
                name: "MSX1 NTSC".to_string(),
                cpu_frequency_hz: crate::MSX_CPU_FREQUENCY,
                vsync_frequency_hz: 60,
            },
            realtime: RealTimeConfig {
                enabled: true,
                speed_percent: 100,
                sync_interval_ms: 10,
                max_lag_ms: 200,
            },
            emulation: EmulationConfig {
                run_time_ms: 1000,
                debug_mode: false,
            },
        }
    }
}

impl EmulatorConfig {
    /// Charge une configuration TOML
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("lecture de {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("configuration invalide dans {}", path.display()))?;
        info!("Configuration chargée depuis {}", path.display());
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).with_context(|| format!("écriture de {}", path.display()))?;
        Ok(())
    }

    /// Charge `path`, ou la configuration par défaut si le fichier est
    /// absent ou illisible (l'erreur est journalisée)
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(err) => {
                warn!("{err:#}, configuration par défaut utilisée");
                Self::default()
            }
        }
    }

    /// Configuration sans cadence temps réel, pour les tests et benchmarks
    pub fn headless() -> Self {
        let mut config = Self::default();
        config.realtime.enabled = false;
        config
    }
}
