use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sound {
    #[default]
    Default,
    /// Plays even when the device is muted; volume in 0.0..=1.0.
    DefaultCritical { volume: f32 },
    /// Sound file bundled with the host application.
    Named { file: String },
    #[cfg(feature = "ringtone")]
    Ringtone { name: String },
    Silent,
}

/// Sound in the shape the OS store accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformSound {
    Default,
    Critical { file: Option<String>, volume: f32 },
    File { name: String },
    #[cfg(feature = "ringtone")]
    Ringtone { name: String },
}

pub trait SoundResolver: Send + Sync {
    /// `None` means "no sound" or a variant this platform cannot play.
    fn resolve(&self, sound: &Sound) -> Option<PlatformSound>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardSoundResolver;

impl SoundResolver for StandardSoundResolver {
    fn resolve(&self, sound: &Sound) -> Option<PlatformSound> {
        match sound {
            Sound::Default => Some(PlatformSound::Default),
            Sound::DefaultCritical { volume } => Some(PlatformSound::Critical {
                file: None,
                volume: volume.clamp(0.0, 1.0),
            }),
            Sound::Named { file } if file.trim().is_empty() => None,
            Sound::Named { file } => Some(PlatformSound::File { name: file.clone() }),
            #[cfg(feature = "ringtone")]
            Sound::Ringtone { name } => Some(PlatformSound::Ringtone { name: name.clone() }),
            Sound::Silent => None,
        }
    }
}
