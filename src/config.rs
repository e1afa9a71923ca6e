use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::error::Error;
use crate::state::{Channel, ChannelValues};

/// Environment variable naming the picture directory.
pub const PICTURES_ENV: &str = "SPOT_LIGHT_PICTURES";
/// OneDrive root; pictures live under `Pictures/DesktopPictures` inside it.
pub const ONEDRIVE_ENV: &str = "OneDriveConsumer";
const ONEDRIVE_PICTURES: &str = "Pictures/DesktopPictures";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Directory holding candidate photos. Falls back to the environment.
    pub picture_dir: Option<PathBuf>,
    /// Preferred file name inside `picture_dir`; random pick if absent or missing.
    pub image_name: Option<String>,
    /// Title the window opens with before the first frame.
    pub window_title: String,
    /// Width the source image is resized to.
    pub working_width: u32,
    /// Initial spotlight radius as a fraction of `working_width`.
    pub radius_fraction: f32,
    /// Radius change per click or `+`/`-` press.
    pub radius_step: i32,
    /// Channels the user can switch between.
    pub channels: Vec<Channel>,
    pub initial_channel: Channel,
    pub initial_values: ChannelValues,
    /// Optional deterministic seed for the random image pick.
    pub seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            picture_dir: None,
            image_name: None,
            window_title: Self::default_window_title(),
            working_width: 800,
            radius_fraction: 0.2,
            radius_step: 10,
            channels: Channel::ALL.to_vec(),
            initial_channel: Channel::Lightness,
            initial_values: ChannelValues::default(),
            seed: None,
        }
    }
}

impl Configuration {
    fn default_window_title() -> String {
        "Image".to_string()
    }

    /// Parse a YAML config file.
    ///
    /// # Errors
    /// [`Error::Io`] if the file cannot be read, [`Error::Config`] if it is
    /// not a valid configuration document.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(self.working_width > 0, "working-width must be greater than zero");
        ensure!(self.radius_step > 0, "radius-step must be greater than zero");
        ensure!(
            self.radius_fraction.is_finite() && self.radius_fraction > 0.0,
            "radius-fraction must be a positive number"
        );
        ensure!(!self.channels.is_empty(), "channels must not be empty");
        ensure!(
            self.channels.contains(&self.initial_channel),
            "initial-channel {} is not listed in channels",
            self.initial_channel
        );
        if self.window_title.trim().is_empty() {
            self.window_title = Self::default_window_title();
        }
        self.channels = Channel::ALL
            .into_iter()
            .filter(|c| self.channels.contains(c))
            .collect();
        Ok(self)
    }

    /// Resolve the picture directory from config or the process environment.
    ///
    /// # Errors
    /// [`Error::EnvironmentMissing`] if neither source names a directory.
    pub fn resolve_picture_dir(&self) -> Result<PathBuf, Error> {
        self.resolve_picture_dir_with(|key| std::env::var_os(key))
    }

    /// As [`Self::resolve_picture_dir`], reading variables through `env`.
    pub fn resolve_picture_dir_with<F>(&self, env: F) -> Result<PathBuf, Error>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(dir) = &self.picture_dir {
            return Ok(dir.clone());
        }
        if let Some(dir) = env(PICTURES_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(root) = env(ONEDRIVE_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(root).join(ONEDRIVE_PICTURES));
        }
        Err(Error::EnvironmentMissing(format!(
            "set picture-dir, --dir, ${PICTURES_ENV} or ${ONEDRIVE_ENV}"
        )))
    }
}
