//! Serial port enumeration

/// Serial device names visible to the host, in OS order.
///
/// Enumeration failures are logged and yield an empty list.
pub fn list_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            log::warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    }
}

/// Initial selector value: the first port, or blank
pub fn default_port(ports: &[String]) -> String {
    ports.first().cloned().unwrap_or_default()
}

/// Keep `current` if it is still listed, otherwise fall back to the default
pub fn reselect(ports: &[String], current: &str) -> String {
    if ports.iter().any(|p| p == current) {
        current.to_string()
    } else {
        default_port(ports)
    }
}
