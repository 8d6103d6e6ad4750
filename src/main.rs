use anyhow::Result;
use log::info;
use msx_emu_rust::*;
use std::env;

fn main() -> Result<()> {
    // Initialiser le logging
    env_logger::init();
    info!("Démarrage de MSX Emu Rust v{}", VERSION);

    // Traitement simple des arguments
    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<String> = None;
    let mut run_ms: Option<u64> = None;
    let mut headless = false;
    for i in 1..args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => config_path = Some(args[i + 1].clone()),
            "--run-ms" if i + 1 < args.len() => run_ms = Some(args[i + 1].parse()?),
            "--headless" => headless = true,
            _ => {}
        }
    }

    let mut config = match &config_path {
        Some(path) => EmulatorConfig::load_from_file(path)?,
        None => EmulatorConfig::default(),
    };
    if headless {
        config.realtime.enabled = false;
    }
    let run_ms = run_ms.unwrap_or(config.emulation.run_time_ms);

    println!("🎮 MSX Emu Rust v{}", VERSION);
    println!("================================");
    println!("Machine: {}", config.machine.name);

    let mut session = EmulationSession::new(config)?;
    session.power_on()?;

    // Première moitié, reset via la console, puis seconde moitié
    let half = EmuDuration::from_millis(run_ms / 2);
    session.run_for(half)?;
    session.execute_command(&["reset"])?;
    let reached = session.run_for(half)?;

    let vsync = session
        .board()
        .device_as::<PeriodicTimer>(session.vsync_device())
        .map_or(0, |timer| timer.fired_count());

    println!("✅ Émulation terminée à {:.3} s", reached.to_seconds_f64());
    println!("   - Points de synchronisation distribués: {}", session.scheduler().dispatched_count());
    println!("   - Trames depuis le dernier reset: {}", vsync);
    println!("   - Resets: {}", session.board().reset_count);
    println!(
        "   - Cadence: {} synchronisations, {} attentes, {} resynchronisations",
        session.realtime().syncs,
        session.realtime().sleeps,
        session.realtime().resyncs
    );

    session.power_off();
    Ok(())
}
