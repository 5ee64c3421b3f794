//! Capability detection and guidance.
//!
//! Live filtering and calibration capture need read access to a wheel
//! device; replay and analysis work everywhere.

/// A system capability Wheelguard may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities and report status.
pub fn check_capabilities() -> Vec<Capability> {
    platform::checks()
}

/// Print a capability report to stdout.
pub fn print_capability_report(capabilities: &[Capability]) {
    for capability in capabilities {
        let status = match (capability.available, capability.required) {
            (true, _) => "[OK]  ",
            (false, true) => "[FAIL]",
            (false, false) => "[WARN]",
        };
        println!("{status} {}: {}", capability.name, capability.description);
        if !capability.available {
            if let Some(fix) = &capability.fix_instructions {
                println!("       Fix: {fix}");
            }
        }
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::Capability;
    use crate::sources::list_wheel_devices;

    pub(super) fn checks() -> Vec<Capability> {
        vec![check_input_group(), check_wheel_devices()]
    }

    fn check_input_group() -> Capability {
        let in_input_group = std::process::Command::new("groups")
            .output()
            .map(|o| {
                String::from_utf8_lossy(&o.stdout)
                    .split_whitespace()
                    .any(|g| g == "input")
            })
            .unwrap_or(false);
        let root = unsafe { libc::geteuid() } == 0;

        Capability {
            name: "Input Group".to_string(),
            description: "Membership in the 'input' group for /dev/input access".to_string(),
            available: in_input_group || root,
            required: false,
            fix_instructions: Some(
                "Add user to input group: sudo usermod -aG input $USER (logout required)"
                    .to_string(),
            ),
        }
    }

    fn check_wheel_devices() -> Capability {
        let devices = list_wheel_devices();
        let description = if devices.is_empty() {
            "Readable input device with a scroll wheel".to_string()
        } else {
            let names: Vec<String> = devices
                .iter()
                .map(|d| format!("{} ({})", d.name, d.path.display()))
                .collect();
            format!("Wheel devices: {}", names.join(", "))
        };

        Capability {
            name: "Wheel Device".to_string(),
            description,
            available: !devices.is_empty(),
            required: true,
            fix_instructions: Some(
                "Connect a mouse and make sure /dev/input/event* is readable".to_string(),
            ),
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use super::Capability;

    pub(super) fn checks() -> Vec<Capability> {
        vec![Capability {
            name: "Live Wheel Source".to_string(),
            description: "Native wheel capture for this platform".to_string(),
            available: false,
            required: true,
            fix_instructions: Some(
                "Live capture is only implemented for Linux; replay and calibrate still work"
                    .to_string(),
            ),
        }]
    }
}
