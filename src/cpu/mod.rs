//! Frontière avec le moteur d'exécution CPU
//!
//! Le scheduler ne connaît du CPU que sa capacité à exécuter des
//! instructions jusqu'à une borne. Le décodage Z80 proprement dit vit en
//! dehors de ce noyau ; [`NopCpu`] sert de remplaçant cadencé.

pub mod nop;

use anyhow::Result;

pub use nop::*;

use crate::time::EmuTime;

/// Moteur d'exécution piloté par le scheduler
pub trait CpuInterface {
    /// Exécute des instructions sans jamais dépasser `limit`
    ///
    /// Retourne l'instant atteint, qui doit être strictement postérieur au
    /// temps courant du scheduler et au plus égal à `limit`. Une instruction
    /// commencée mais non terminée à `limit` reste due et sera achevée lors de
    /// l'appel suivant.
    fn execute(&mut self, limit: EmuTime) -> Result<EmuTime>;
}
