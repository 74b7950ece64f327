use std::path::{Path, PathBuf};

use crate::error::{Result, ShortcutError};

/// The current user's desktop directory.
pub fn desktop_dir() -> Result<PathBuf> {
    dirs::desktop_dir().ok_or_else(|| ShortcutError::Config("Failed to find desktop directory".to_string()))
}

/// Default location of the TOML settings file used outside packaged settings.
pub fn default_settings_file() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .ok_or_else(|| ShortcutError::Config("Could not find local AppData directory".to_string()))?;
    Ok(base.join("desktop-shortcut-installer").join("settings.toml"))
}

/// `<desktop>/<display name>.lnk`
pub fn shortcut_path(desktop_dir: &Path, display_name: &str) -> PathBuf {
    desktop_dir.join(format!("{}.lnk", shortcut_file_stem(display_name)))
}

/// Makes a display name usable as a Windows file name.
pub fn shortcut_file_stem(display_name: &str) -> String {
    let replaced: String = display_name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_kept() {
        assert_eq!(
            shortcut_path(Path::new("/home/me/Desktop"), "Sample App"),
            PathBuf::from("/home/me/Desktop/Sample App.lnk")
        );
    }

    #[test]
    fn reserved_characters_are_replaced() {
        assert_eq!(shortcut_file_stem("A/B\\C:D"), "A_B_C_D");
        assert_eq!(shortcut_file_stem("What? <Now>*"), "What_ _Now__");
        assert_eq!(shortcut_file_stem("Tabs\there"), "Tabs_here");
    }

    #[test]
    fn trailing_dots_and_spaces_are_trimmed() {
        assert_eq!(shortcut_file_stem("Sample App. "), "Sample App");
        assert_eq!(shortcut_file_stem("..."), "_");
    }
}
