//! Desktop wallpaper application.

use std::path::Path;

use tracing::debug;

use crate::error::{Result, SyncError};

pub trait WallpaperSetter {
    /// `image` is expected to be an existing, absolute file path.
    fn set_wallpaper(&self, image: &Path) -> Result<()>;
}

/// Sets the wallpaper of the current desktop session through the `wallpaper` crate,
/// which picks the platform mechanism (Windows, macOS, GNOME, KDE, ...).
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopWallpaper;

impl WallpaperSetter for DesktopWallpaper {
    fn set_wallpaper(&self, image: &Path) -> Result<()> {
        let path = image
            .to_str()
            .ok_or_else(|| SyncError::Wallpaper(format!("path is not valid UTF-8: {image:?}")))?;
        debug!(path, "setting desktop wallpaper");
        wallpaper::set_from_path(path).map_err(|err| SyncError::Wallpaper(err.to_string()))
    }
}
