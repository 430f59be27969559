use std::{path::PathBuf, process::ExitCode};

use meshbake::{bake, helpers::init_profiling, load_config, Config};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init();
    init_profiling();

    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: baker <scene.gltf|scene.glb>");
        return ExitCode::from(2);
    };

    let config = load_config().unwrap_or_else(|e| {
        log::warn!("Falling back to default config: {}", e);
        Config::default()
    });

    match bake(&path, &config) {
        Ok(output) => {
            log::info!(
                "Wrote {} and {}",
                output.gltf_path.display(),
                output.bin_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to bake {}: {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}
