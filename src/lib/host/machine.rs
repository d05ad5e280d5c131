use std::path::Path;

use super::types::{HostError, HostResult};

const MACHINE_ID_PATHS: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Stable identity of this machine, read from the systemd/dbus machine id.
pub fn machine_id() -> HostResult<String> {
    read_machine_id(&MACHINE_ID_PATHS.map(Path::new))
}

/// First non-empty id found among `paths`.
pub fn read_machine_id(paths: &[&Path]) -> HostResult<String> {
    let mut last_err = String::from("no machine id file found");

    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let id = contents.trim();
                if !id.is_empty() {
                    return Ok(id.to_string());
                }
                last_err = format!("{} is empty", path.display());
            }
            Err(err) => last_err = format!("{}: {err}", path.display()),
        }
    }

    Err(HostError::MachineId(last_err))
}
