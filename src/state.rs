//! Mutable edit parameters driven by user input and read once per frame.

use std::fmt;

use serde::Deserialize;

use crate::config::Configuration;
use crate::processing::color::ColorSpace;

/// Smallest spotlight radius that survives normalization.
pub const MIN_MASK_RADIUS: i32 = 10;
/// Channel values are clamped into `0..=MAX_CHANNEL_VALUE`.
pub const MAX_CHANNEL_VALUE: i32 = 255;

/// Derived color axis being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    Lightness,
    Saturation,
    Illumination,
}

/// Where a channel lives and how input moves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub channel: Channel,
    pub space: ColorSpace,
    /// Plane index inside `space`.
    pub plane: usize,
    /// Amount one scroll notch adds or removes.
    pub step: i32,
    pub name: &'static str,
    /// Key that selects this channel.
    pub key: char,
}

// Table order doubles as the tab-cycle order.
static CHANNEL_TABLE: [ChannelInfo; 3] = [
    ChannelInfo {
        channel: Channel::Lightness,
        space: ColorSpace::Hls,
        plane: 1,
        step: 10,
        name: "Lightness",
        key: 'l',
    },
    ChannelInfo {
        channel: Channel::Saturation,
        space: ColorSpace::Hls,
        plane: 2,
        step: 10,
        name: "Saturation",
        key: 's',
    },
    ChannelInfo {
        channel: Channel::Illumination,
        space: ColorSpace::Luv,
        plane: 0,
        step: 10,
        name: "Illumination",
        key: 'i',
    },
];

impl Channel {
    pub const ALL: [Self; 3] = [Self::Lightness, Self::Saturation, Self::Illumination];

    const fn table_index(self) -> usize {
        match self {
            Self::Lightness => 0,
            Self::Saturation => 1,
            Self::Illumination => 2,
        }
    }

    pub fn info(self) -> &'static ChannelInfo {
        &CHANNEL_TABLE[self.table_index()]
    }

    /// Channel bound to a selection key, if any.
    pub fn from_key(key: char) -> Option<Self> {
        CHANNEL_TABLE
            .iter()
            .find(|info| info.key == key)
            .map(|info| info.channel)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}

/// One target value per channel, tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ChannelValues {
    pub lightness: i32,
    pub saturation: i32,
    pub illumination: i32,
}

impl Default for ChannelValues {
    fn default() -> Self {
        Self {
            lightness: 122,
            saturation: 255,
            illumination: 100,
        }
    }
}

impl ChannelValues {
    pub fn get(&self, channel: Channel) -> i32 {
        match channel {
            Channel::Lightness => self.lightness,
            Channel::Saturation => self.saturation,
            Channel::Illumination => self.illumination,
        }
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut i32 {
        match channel {
            Channel::Lightness => &mut self.lightness,
            Channel::Saturation => &mut self.saturation,
            Channel::Illumination => &mut self.illumination,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    active: Channel,
    /// Supported channels, in table order.
    supported: Vec<Channel>,
    pub channel_values: ChannelValues,
    /// Spotlight center in image pixel coordinates.
    pub mask_center: (i32, i32),
    pub mask_radius: i32,
    radius_step: i32,
}

impl EditState {
    /// All channels supported, default values, radius at 20% of `working_width`.
    pub fn new(working_width: u32) -> Self {
        Self {
            active: Channel::Lightness,
            supported: Channel::ALL.to_vec(),
            channel_values: ChannelValues::default(),
            mask_center: (0, 0),
            mask_radius: initial_radius(working_width, 0.2),
            radius_step: 10,
        }
    }

    pub fn from_config(cfg: &Configuration) -> Self {
        let state = Self {
            active: cfg.initial_channel,
            supported: Channel::ALL.to_vec(),
            channel_values: cfg.initial_values,
            mask_center: (0, 0),
            mask_radius: initial_radius(cfg.working_width, cfg.radius_fraction),
            radius_step: cfg.radius_step,
        };
        state.with_channels(&cfg.channels)
    }

    /// Restrict the supported channel set. Order follows the channel table
    /// regardless of the order given. An empty set is ignored.
    pub fn with_channels(mut self, channels: &[Channel]) -> Self {
        let supported: Vec<Channel> = Channel::ALL
            .into_iter()
            .filter(|c| channels.contains(c))
            .collect();
        if supported.is_empty() {
            return self;
        }
        if !supported.contains(&self.active) {
            self.active = supported[0];
        }
        self.supported = supported;
        self
    }

    pub fn active_channel(&self) -> Channel {
        self.active
    }

    pub fn active_value(&self) -> i32 {
        self.channel_values.get(self.active)
    }

    pub fn supported_channels(&self) -> &[Channel] {
        &self.supported
    }

    pub fn supports(&self, channel: Channel) -> bool {
        self.supported.contains(&channel)
    }

    /// Make `channel` active. Returns `false` if it is not supported.
    pub fn select(&mut self, channel: Channel) -> bool {
        if !self.supports(channel) {
            return false;
        }
        self.active = channel;
        true
    }

    /// Advance to the next supported channel in cyclic order.
    pub fn cycle_channel(&mut self) {
        let next = match self.supported.iter().position(|c| *c == self.active) {
            Some(idx) => self.supported[(idx + 1) % self.supported.len()],
            None => self.supported[0],
        };
        self.active = next;
    }

    pub fn grow_mask(&mut self) {
        self.mask_radius = self.mask_radius.saturating_add(self.radius_step);
    }

    pub fn shrink_mask(&mut self) {
        self.mask_radius = self.mask_radius.saturating_sub(self.radius_step);
    }

    pub fn raise_value(&mut self) {
        let step = self.active.info().step;
        let value = self.channel_values.get_mut(self.active);
        *value = value.saturating_add(step);
    }

    pub fn lower_value(&mut self) {
        let step = self.active.info().step;
        let value = self.channel_values.get_mut(self.active);
        *value = value.saturating_sub(step);
    }

    /// Clamp every channel value into `0..=255` and floor the radius at 10.
    pub fn normalize(&mut self) {
        for channel in Channel::ALL {
            let value = self.channel_values.get_mut(channel);
            *value = (*value).clamp(0, MAX_CHANNEL_VALUE);
        }
        self.mask_radius = self.mask_radius.max(MIN_MASK_RADIUS);
    }

    pub fn is_normalized(&self) -> bool {
        Channel::ALL
            .into_iter()
            .all(|c| (0..=MAX_CHANNEL_VALUE).contains(&self.channel_values.get(c)))
            && self.mask_radius >= MIN_MASK_RADIUS
    }

    /// Window title text, e.g. `Lightness: 122`.
    pub fn title(&self) -> String {
        format!("{}: {}", self.active, self.active_value())
    }
}

fn initial_radius(working_width: u32, fraction: f32) -> i32 {
    let radius = (working_width as f32 * fraction).round();
    (radius as i32).max(MIN_MASK_RADIUS)
}
