//! Global hotkey parsing on top of the core Config.

use std::str::FromStr;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use tracing::warn;

use crate::Config;

/// Default hotkey: Ctrl+R
pub fn default_hotkey() -> HotKey {
    HotKey::new(Some(Modifiers::CONTROL), Code::KeyR)
}

/// Parse an accelerator string such as `"ctrl+shift+KeyD"`.
pub fn parse_hotkey(value: &str) -> Result<HotKey, String> {
    HotKey::from_str(value.trim()).map_err(|e| e.to_string())
}

/// Extension trait for Config to handle hotkeys.
pub trait ConfigExt {
    /// Get the hotkey, parsing from config or using default.
    fn hotkey_binding(&self) -> HotKey;
}

impl ConfigExt for Config {
    fn hotkey_binding(&self) -> HotKey {
        match parse_hotkey(self.hotkey()) {
            Ok(hotkey) => hotkey,
            Err(e) => {
                warn!(hotkey = self.hotkey(), "Invalid hotkey, using default: {}", e);
                default_hotkey()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_string_matches_default_hotkey() {
        assert_eq!(
            parse_hotkey(voxpaste_core::DEFAULT_HOTKEY).unwrap(),
            default_hotkey()
        );
        assert_eq!(Config::default().hotkey_binding(), default_hotkey());
    }

    #[test]
    fn test_parse_custom_hotkey() {
        let hotkey = parse_hotkey(" ctrl+shift+KeyD ").unwrap();
        assert_eq!(
            hotkey,
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::KeyD)
        );
    }

    #[test]
    fn test_invalid_hotkey_falls_back() {
        let config = Config {
            hotkey: Some("ctrl+notakey".to_string()),
            ..Default::default()
        };
        assert!(parse_hotkey(config.hotkey()).is_err());
        assert_eq!(config.hotkey_binding(), default_hotkey());
    }
}
