use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The volume state of a playback, consisting of a mute flag and a linear volume level.
///
/// Muting never erases the stored volume level, so un-muting restores the previous level.
#[derive(Debug, Display, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[display("mute: {}, volume: {}", mute, volume)]
pub struct VolumeInfo {
    mute: bool,
    volume: f32,
}

impl VolumeInfo {
    /// Create a new volume info, the volume level is clamped to `[0, 1]`.
    pub fn new(mute: bool, volume: f32) -> Self {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };

        Self { mute, volume }
    }

    /// Indicates if the volume is muted.
    pub fn is_muted(&self) -> bool {
        self.mute
    }

    /// The stored linear volume level.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// The volume which should be applied to the audio output.
    pub fn effective_volume(&self) -> f32 {
        if self.mute {
            0.0
        } else {
            self.volume
        }
    }

    /// Get a muted copy of this volume info, keeping the volume level.
    pub fn muted(&self) -> Self {
        Self::new(true, self.volume)
    }

    /// Get an un-muted copy of this volume info, keeping the volume level.
    pub fn unmuted(&self) -> Self {
        Self::new(false, self.volume)
    }
}

impl Default for VolumeInfo {
    fn default() -> Self {
        Self::new(false, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_volume() {
        assert_eq!(1.0, VolumeInfo::new(false, 1.7).volume());
        assert_eq!(0.0, VolumeInfo::new(false, -0.2).volume());
        assert_eq!(0.0, VolumeInfo::new(false, f32::NAN).volume());
    }

    #[test]
    fn test_effective_volume_muted() {
        let info = VolumeInfo::new(true, 0.7);

        assert_eq!(0.0, info.effective_volume());
        assert_eq!(0.7, info.volume());
    }

    #[test]
    fn test_unmuted_restores_volume() {
        let info = VolumeInfo::new(false, 0.7).muted();

        let result = info.unmuted();

        assert_eq!(VolumeInfo::new(false, 0.7), result);
        assert_eq!(0.7, result.effective_volume());
    }

    #[test]
    fn test_eq_is_structural() {
        assert_eq!(VolumeInfo::new(false, 0.5), VolumeInfo::new(false, 0.5));
        assert_ne!(VolumeInfo::new(true, 0.5), VolumeInfo::new(false, 0.5));
    }
}
