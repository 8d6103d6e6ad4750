//! Erreurs typées du noyau d'émulation
//!
//! Seules les erreurs de validation aux frontières sont représentées ici.
//! Les violations de contrat internes (point de synchronisation dans le passé,
//! file vide en cours d'exécution...) restent des `panic!`.

use thiserror::Error;

use crate::devices::DeviceId;

/// Erreurs retournées par les constructeurs et les points d'entrée publics
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmuError {
    /// Une fréquence nulle n'a pas de période
    #[error("fréquence nulle invalide")]
    ZeroFrequency,

    /// La période serait plus courte qu'un tick de base
    #[error("fréquence {freq} Hz supérieure à la fréquence de base {max} Hz")]
    FrequencyTooHigh { freq: u64, max: u64 },

    /// Un minuteur périodique de période nulle bouclerait indéfiniment
    #[error("période de minuteur nulle")]
    ZeroPeriod,

    /// Une vitesse d'émulation nulle ne progresse jamais
    #[error("vitesse d'émulation nulle")]
    ZeroSpeed,

    /// Le handle ne désigne aucun périphérique vivant
    #[error("périphérique inconnu: {0}")]
    UnknownDevice(DeviceId),

    /// La machine n'est pas sous tension
    #[error("machine éteinte: émulation impossible")]
    PoweredOff,

    /// Commande de console non reconnue
    #[error("commande inconnue: {0}")]
    UnknownCommand(String),
}
