use std::process::ExitCode;

use texel_particles::{SimulationConfig, DEFAULT_CAPACITY};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional first argument: particle capacity (a perfect square)
    let capacity = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<u32>() {
            Ok(capacity) => capacity,
            Err(err) => {
                log::error!("Invalid capacity {arg:?}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => DEFAULT_CAPACITY,
    };

    match texel_particles::run(SimulationConfig::new().with_capacity(capacity)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
