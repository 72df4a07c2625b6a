//! Inserting transcripts at the cursor via the clipboard.

use std::thread::sleep;
use std::time::Duration;

use anyhow::Context;
use arboard::Clipboard;
use enigo::Direction::{Click, Press, Release};
use enigo::{Enigo, Key, Keyboard};
use tracing::{info, warn};

use crate::Config;

const KEY_DELAY: Duration = Duration::from_millis(10);
/// Time the target application gets to read the clipboard before it is
/// restored.
const RESTORE_DELAY: Duration = Duration::from_millis(150);

/// How a transcript should be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOptions {
    pub auto_paste: bool,
    pub restore_clipboard: bool,
}

impl InsertOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auto_paste: config.auto_paste(),
            restore_clipboard: config.restore_clipboard(),
        }
    }

    /// Restoring only makes sense when we pasted ourselves.
    fn should_restore(&self) -> bool {
        self.auto_paste && self.restore_clipboard
    }
}

/// Owns the clipboard and the keyboard simulator. Both must live on the main
/// thread, and the clipboard must stay alive for its contents to persist on
/// some platforms.
pub struct Inserter {
    clipboard: Clipboard,
    enigo: Enigo,
}

impl Inserter {
    pub fn new() -> anyhow::Result<Self> {
        let clipboard = Clipboard::new().context("Failed to open clipboard")?;
        let enigo = Enigo::new(&enigo::Settings::default())
            .context("Failed to create keyboard simulator")?;
        Ok(Self { clipboard, enigo })
    }

    /// Copy the text to the clipboard and, if enabled, paste it into the
    /// focused application.
    pub fn insert(&mut self, text: &str, options: InsertOptions) {
        info!(
            auto_paste = options.auto_paste,
            restore_clipboard = options.restore_clipboard,
            "Handling transcription"
        );

        let previous = if options.should_restore() {
            match self.clipboard.get_text() {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("Failed to get clipboard text: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if let Err(e) = self.clipboard.set_text(text) {
            warn!("Failed to set clipboard text: {}", e);
            return;
        }
        info!("Transcription copied to clipboard");

        if !options.auto_paste {
            return;
        }

        if let Err(e) = paste(&mut self.enigo) {
            warn!("Failed to paste transcription: {}", e);
        }
        if let Some(previous) = previous {
            sleep(RESTORE_DELAY);
            if let Err(e) = self.clipboard.set_text(previous) {
                warn!("Failed to restore clipboard text: {}", e);
            }
        }
    }

    /// Copy arbitrary text, used by the tray menu.
    pub fn copy(&mut self, text: String) -> Result<(), arboard::Error> {
        self.clipboard.set_text(text)
    }
}

/// The modifier of the platform's paste chord.
pub fn paste_modifier() -> Key {
    #[cfg(target_os = "macos")]
    let paste_modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let paste_modifier = Key::Control;
    paste_modifier
}

fn paste(enigo: &mut Enigo) -> anyhow::Result<()> {
    let modifier = paste_modifier();

    enigo.key(modifier, Press)?;
    sleep(KEY_DELAY);
    let clicked = enigo.key(Key::Unicode('v'), Click);
    sleep(KEY_DELAY);
    // Always release the modifier, even if the click failed.
    enigo.key(modifier, Release)?;
    clicked?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_requires_auto_paste() {
        let options = InsertOptions {
            auto_paste: false,
            restore_clipboard: true,
        };
        assert!(!options.should_restore());

        let options = InsertOptions {
            auto_paste: true,
            restore_clipboard: true,
        };
        assert!(options.should_restore());
    }

    #[test]
    fn test_options_follow_config() {
        let config = Config {
            restore_clipboard: true,
            auto_paste: false,
            ..Default::default()
        };
        assert_eq!(
            InsertOptions::from_config(&config),
            InsertOptions {
                auto_paste: false,
                restore_clipboard: true,
            }
        );
    }

    #[test]
    fn test_platform_paste_modifier() {
        #[cfg(target_os = "macos")]
        assert_eq!(paste_modifier(), Key::Meta);
        #[cfg(not(target_os = "macos"))]
        assert_eq!(paste_modifier(), Key::Control);
    }
}
