// Port file module
// Publishes the port the content service actually bound, for local clients
// that discover it by reading a file

use std::io;
use std::path::Path;

use crate::logger;

/// Write `port` to `path` and announce it on stdout.
///
/// An empty `path` skips the file but still prints the port.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be written.
pub fn publish_port(path: &str, port: u16) -> io::Result<()> {
    if !path.is_empty() {
        std::fs::write(Path::new(path), port.to_string())?;
        logger::log_debug(&format!("Port {port} written to {path}"));
    }
    println!("Running on port {port}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_port_writes_bare_number() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("flask_port.txt");

        publish_port(file.to_str().unwrap(), 51234).unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "51234");

        // overwritten, not appended
        publish_port(file.to_str().unwrap(), 8080).unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "8080");
    }

    #[test]
    fn test_empty_path_disables_file() {
        assert!(publish_port("", 8080).is_ok());
    }

    #[test]
    fn test_unwritable_path_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("missing-dir/port.txt");
        assert!(publish_port(file.to_str().unwrap(), 8080).is_err());
    }
}
