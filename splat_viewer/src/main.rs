//! Splat viewer
//!
//! Shows the configured OBJ meshes as lit point splats.
//!
//! Controls: F1..Fn select a mesh, S/L halve or double the splat size,
//! left drag rotates the mesh, right drag orbits the light, scroll zooms,
//! Escape quits.

use splat_engine::foundation::logging;
use splat_engine::prelude::*;

fn main() -> Result<(), AppError> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {}", panic_info);

        if let Some(location) = panic_info.location() {
            eprintln!("Panic location: {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    logging::init();
    log::info!("Starting splat viewer");

    if let Ok(cwd) = std::env::current_dir() {
        log::debug!("Working directory: {}", cwd.display());
    }

    let config = ViewerConfig::default();
    let mut app = match ViewerApp::new(&config) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Startup failed: {}", e);
            return Err(e);
        }
    };

    let result = app.run();
    // Scene, shader, device and window are released in that order.
    drop(app);

    match &result {
        Ok(()) => log::info!("Splat viewer finished"),
        Err(e) => log::error!("Splat viewer stopped: {}", e),
    }
    result
}
