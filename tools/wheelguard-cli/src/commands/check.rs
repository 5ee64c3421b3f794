//! Check system capabilities.

use std::path::Path;

use wheelguard_hook::capabilities::{check_capabilities, print_capability_report};

pub fn run(config_path: &Path) -> anyhow::Result<()> {
    println!("Wheelguard System Check");
    println!("{}", "=".repeat(50));

    // Configuration
    if config_path.exists() {
        match super::load_config(config_path).and_then(|config| Ok(config.validate()?)) {
            Ok(()) => println!("[OK]   Config: {}", config_path.display()),
            Err(e) => println!("[FAIL] Config: {e}"),
        }
    } else {
        println!(
            "[OK]   Config: defaults ({} not created yet)",
            config_path.display()
        );
    }

    // Permissions and devices
    let capabilities = check_capabilities();
    println!();
    print_capability_report(&capabilities);

    let all_required_ok = capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available);

    println!();
    if all_required_ok {
        println!("All required capabilities are available. Wheelguard is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
        println!("Replay and calibrate work without a live device.");
    }

    Ok(())
}
