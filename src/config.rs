use std::fs;
use std::path::{Path, PathBuf};

use config::Config;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SyncError};

pub const ENV_DOWNLOAD_FOLDER: &str = "PICTURE_DOWNLOAD_FOLDER";
pub const ENV_UHD: &str = "WALLPAPER_UHD";

const DEFAULT_CONFIG_FILE: &str = "./config.toml";
const DEFAULT_ENV_FILE: &str = "./.env";

#[derive(clap::Parser, Debug, Default)]
#[command(author, version, about = "Set today's Bing image as the desktop wallpaper", long_about = None)]
pub struct Cli {
    /// Use the UHD image instead of 1920x1080 (default: true)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub uhd: Option<bool>,
    /// Directory the images are downloaded to
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// TOML config file; unlike ./config.toml it must exist
    #[arg(long)]
    pub config_path: Option<PathBuf>,
    /// Environment file to load; unlike ./.env it must exist
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

/// Contents of the optional `config.toml`.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct FileConfig {
    pub dir: Option<String>,
    pub uhd: Option<bool>,
}

impl FileConfig {
    /// An explicit path must exist; the default `./config.toml` is optional.
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig> {
        let (path, required) = match config_path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if required {
                return Err(SyncError::Config(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            return Ok(FileConfig::default());
        }
        debug!(path = %path.display(), "loading config file");
        Config::builder()
            .add_source(config::File::from(path))
            .build()
            .and_then(|settings| settings.try_deserialize::<FileConfig>())
            .map_err(|err| {
                SyncError::Config(format!("fail to load config file {}: {err}", path.display()))
            })
    }
}

/// Values taken from the process environment, read once at startup.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnvOverrides {
    pub download_dir: Option<PathBuf>,
    pub uhd: Option<bool>,
}

impl EnvOverrides {
    pub fn from_env() -> EnvOverrides {
        let download_dir = std::env::var_os(ENV_DOWNLOAD_FOLDER)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let uhd = std::env::var(ENV_UHD)
            .ok()
            .map(|v| v.trim().eq_ignore_ascii_case("yes"));
        EnvOverrides { download_dir, uhd }
    }
}

/// Populate the process environment from a `.env` style file.
///
/// Variables already set in the environment win over the file.
pub fn load_env_file(env_file: Option<&Path>) -> Result<()> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path).map_err(|err| {
                SyncError::Config(format!("error loading env file {}: {err}", path.display()))
            })?;
            debug!(path = %path.display(), "loaded env file");
        }
        None => {
            let path = Path::new(DEFAULT_ENV_FILE);
            if path.is_file() {
                dotenvy::from_path(path).map_err(|err| {
                    SyncError::Config(format!("error loading env file {}: {err}", path.display()))
                })?;
                debug!(path = %path.display(), "loaded env file");
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageResolution {
    Uhd,
    Standard,
}

impl ImageResolution {
    pub fn from_high_res(use_high_res: bool) -> Self {
        if use_high_res {
            ImageResolution::Uhd
        } else {
            ImageResolution::Standard
        }
    }

    /// Tag appended to both the download URL and the local file name.
    pub fn suffix(&self) -> &'static str {
        match self {
            ImageResolution::Uhd => "UHD",
            ImageResolution::Standard => "1920x1080",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub download_dir: PathBuf,
    pub use_high_res: bool,
}

impl RunConfig {
    /// Load everything the run needs: env file, config file, environment,
    /// then the platform default directory when nothing else names one.
    pub fn load(cli: &Cli) -> Result<RunConfig> {
        load_env_file(cli.env_file.as_deref())?;
        let file = FileConfig::load(cli.config_path.as_deref())?;
        let env = EnvOverrides::from_env();
        let needs_default = cli.dir.is_none()
            && env.download_dir.is_none()
            && file.dir.as_deref().map_or(true, str::is_empty);
        let default_dir = if needs_default {
            default_download_dir()?
        } else {
            PathBuf::new()
        };
        Ok(RunConfig::resolve(cli, &env, &file, default_dir))
    }

    /// Per field: command line, then environment, then config file, then default.
    pub fn resolve(
        cli: &Cli,
        env: &EnvOverrides,
        file: &FileConfig,
        default_dir: PathBuf,
    ) -> RunConfig {
        let download_dir = cli
            .dir
            .clone()
            .or_else(|| env.download_dir.clone())
            .or_else(|| file.dir.as_ref().filter(|d| !d.is_empty()).map(PathBuf::from))
            .unwrap_or(default_dir);
        let download_dir = if download_dir.as_os_str().is_empty() {
            PathBuf::from("./")
        } else {
            download_dir
        };
        let use_high_res = cli.uhd.or(env.uhd).or(file.uhd).unwrap_or(true);
        RunConfig {
            download_dir,
            use_high_res,
        }
    }

    pub fn resolution(&self) -> ImageResolution {
        ImageResolution::from_high_res(self.use_high_res)
    }

    pub fn ensure_download_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.download_dir)
            .map_err(|err| SyncError::fs(&self.download_dir, err))
    }
}

/// Where images go when nothing configures a directory.
#[cfg(windows)]
pub fn default_download_dir() -> Result<PathBuf> {
    Ok(registry::my_pictures()?.join("BingWallpaper"))
}

#[cfg(not(windows))]
pub fn default_download_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SyncError::Config("cannot determine home directory".to_string()))?;
    Ok(platform_pictures_dir(&home))
}

/// Empty outside macOS: images land in the current directory.
#[cfg(not(windows))]
fn platform_pictures_dir(home: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        home.join("Pictures").join("Bing")
    } else {
        PathBuf::new()
    }
}

#[cfg(windows)]
mod registry {
    use std::path::PathBuf;

    use winreg::enums::{HKEY_CURRENT_USER, KEY_QUERY_VALUE};
    use winreg::RegKey;

    use crate::error::{Result, SyncError};

    const SHELL_FOLDERS: &str =
        "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Explorer\\User Shell Folders";

    pub fn my_pictures() -> Result<PathBuf> {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let folders = hkcu
            .open_subkey_with_flags(SHELL_FOLDERS, KEY_QUERY_VALUE)
            .map_err(|err| SyncError::Config(format!("open registry key: {err}")))?;
        let value: String = folders
            .get_value("My Pictures")
            .map_err(|err| SyncError::Config(format!("read My Pictures folder: {err}")))?;
        Ok(PathBuf::from(super::expand_env_vars(&value)))
    }
}

/// Expand `%NAME%` references the way REG_EXPAND_SZ values expect.
/// Unknown names are left untouched.
#[cfg_attr(not(windows), allow(dead_code))]
fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('%') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match std::env::var(name) {
            Ok(v) if !name.is_empty() => out.push_str(&v),
            _ => {
                out.push('%');
                out.push_str(name);
                out.push('%');
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
