use std::io;

use crate::overlay::PopupOptions;

/// Reads popup options from a JSON file. Missing keys keep their defaults.
pub fn read_popup_options(path: &str) -> io::Result<PopupOptions> {
    let contents = crate::io::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn write_popup_options(path: &str, options: &PopupOptions) -> io::Result<()> {
    let json = serde_json::to_string_pretty(options).map_err(io::Error::other)?;
    crate::io::write_string(path, &json)
}
