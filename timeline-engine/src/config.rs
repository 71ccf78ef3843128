use anyhow::Context;
use base::tracing_util::ok_or_log_as_warn;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;

/// Snap preferences as seen by the engine.
pub trait SnapConfigSource {
    fn snap_to_grid(&self) -> bool;

    fn snap_to_marks(&self) -> bool;

    fn snap_to_region_start(&self) -> bool;

    fn snap_to_region_end(&self) -> bool;

    fn snap_to_region_sync(&self) -> bool;

    /// Magnetic threshold in pixels.
    fn snap_threshold_pixels(&self) -> u32;

    fn rulers_follow_grid(&self) -> bool;
}

/// User configuration of the editor, stored as INI file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    snap: SnapConfig,
}

impl EditorConfig {
    /// `<config dir>/timeline/editor.ini`
    pub fn default_file_path() -> Option<Utf8PathBuf> {
        let dir = dirs::config_dir()?;
        let dir = Utf8PathBuf::from_path_buf(dir).ok()?;
        Some(dir.join("timeline").join("editor.ini"))
    }

    pub fn load(path: &Utf8Path) -> anyhow::Result<EditorConfig> {
        let ini_content = fs::read_to_string(path)
            .with_context(|| format!("couldn't read config file '{path}'"))?;
        let mut config: EditorConfig =
            serde_ini::from_str(&ini_content).context("couldn't parse config file")?;
        config.sanitize();
        Ok(config)
    }

    /// Falls back to the defaults if the file is missing or broken.
    pub fn load_or_default(path: &Utf8Path) -> EditorConfig {
        if !path.exists() {
            return EditorConfig::default();
        }
        ok_or_log_as_warn(Self::load(path)).unwrap_or_default()
    }

    pub fn save(&self, path: &Utf8Path) -> anyhow::Result<()> {
        let ini_content = serde_ini::to_string(self).context("couldn't serialize config")?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("couldn't create configuration directory '{dir}'"))?;
        }
        fs::write(path, ini_content)
            .with_context(|| format!("couldn't write config file '{path}'"))?;
        Ok(())
    }

    pub fn set_snap_to_grid(&mut self, value: bool) {
        self.snap.snap_to_grid = value.into();
    }

    pub fn set_snap_to_marks(&mut self, value: bool) {
        self.snap.snap_to_marks = value.into();
    }

    pub fn set_snap_to_region_start(&mut self, value: bool) {
        self.snap.snap_to_region_start = value.into();
    }

    pub fn set_snap_to_region_end(&mut self, value: bool) {
        self.snap.snap_to_region_end = value.into();
    }

    pub fn set_snap_to_region_sync(&mut self, value: bool) {
        self.snap.snap_to_region_sync = value.into();
    }

    pub fn set_snap_threshold_pixels(&mut self, value: u32) {
        self.snap.snap_threshold = value;
        self.sanitize();
    }

    pub fn set_rulers_follow_grid(&mut self, value: bool) {
        self.snap.rulers_follow_grid = value.into();
    }

    fn sanitize(&mut self) {
        let threshold = self.snap.snap_threshold;
        if !(MIN_SNAP_THRESHOLD..=MAX_SNAP_THRESHOLD).contains(&threshold) {
            let clamped = threshold.clamp(MIN_SNAP_THRESHOLD, MAX_SNAP_THRESHOLD);
            tracing::warn!(
                msg = "Snap threshold out of range, clamping",
                threshold,
                clamped
            );
            self.snap.snap_threshold = clamped;
        }
    }
}

impl SnapConfigSource for EditorConfig {
    fn snap_to_grid(&self) -> bool {
        self.snap.snap_to_grid > 0
    }

    fn snap_to_marks(&self) -> bool {
        self.snap.snap_to_marks > 0
    }

    fn snap_to_region_start(&self) -> bool {
        self.snap.snap_to_region_start > 0
    }

    fn snap_to_region_end(&self) -> bool {
        self.snap.snap_to_region_end > 0
    }

    fn snap_to_region_sync(&self) -> bool {
        self.snap.snap_to_region_sync > 0
    }

    fn snap_threshold_pixels(&self) -> u32 {
        self.snap.snap_threshold
    }

    fn rulers_follow_grid(&self) -> bool {
        self.snap.rulers_follow_grid > 0
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapConfig {
    #[serde(
        default = "default_snap_to_grid",
        skip_serializing_if = "is_default_snap_to_grid"
    )]
    snap_to_grid: u8,
    #[serde(
        default = "default_snap_to_marks",
        skip_serializing_if = "is_default_snap_to_marks"
    )]
    snap_to_marks: u8,
    #[serde(
        default = "default_snap_to_region_start",
        skip_serializing_if = "is_default_snap_to_region_start"
    )]
    snap_to_region_start: u8,
    #[serde(
        default = "default_snap_to_region_end",
        skip_serializing_if = "is_default_snap_to_region_end"
    )]
    snap_to_region_end: u8,
    #[serde(default, skip_serializing_if = "is_default")]
    snap_to_region_sync: u8,
    #[serde(
        default = "default_snap_threshold",
        skip_serializing_if = "is_default_snap_threshold"
    )]
    snap_threshold: u32,
    #[serde(default, skip_serializing_if = "is_default")]
    rulers_follow_grid: u8,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_to_grid: DEFAULT_SNAP_TO_GRID,
            snap_to_marks: DEFAULT_SNAP_TO_MARKS,
            snap_to_region_start: DEFAULT_SNAP_TO_REGION_START,
            snap_to_region_end: DEFAULT_SNAP_TO_REGION_END,
            snap_to_region_sync: 0,
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
            rulers_follow_grid: 0,
        }
    }
}

const DEFAULT_SNAP_TO_GRID: u8 = 1;
const DEFAULT_SNAP_TO_MARKS: u8 = 1;
const DEFAULT_SNAP_TO_REGION_START: u8 = 1;
const DEFAULT_SNAP_TO_REGION_END: u8 = 1;
const DEFAULT_SNAP_THRESHOLD: u32 = 25;
const MIN_SNAP_THRESHOLD: u32 = 1;
const MAX_SNAP_THRESHOLD: u32 = 500;

fn default_snap_to_grid() -> u8 {
    DEFAULT_SNAP_TO_GRID
}

fn is_default_snap_to_grid(v: &u8) -> bool {
    *v == DEFAULT_SNAP_TO_GRID
}

fn default_snap_to_marks() -> u8 {
    DEFAULT_SNAP_TO_MARKS
}

fn is_default_snap_to_marks(v: &u8) -> bool {
    *v == DEFAULT_SNAP_TO_MARKS
}

fn default_snap_to_region_start() -> u8 {
    DEFAULT_SNAP_TO_REGION_START
}

fn is_default_snap_to_region_start(v: &u8) -> bool {
    *v == DEFAULT_SNAP_TO_REGION_START
}

fn default_snap_to_region_end() -> u8 {
    DEFAULT_SNAP_TO_REGION_END
}

fn is_default_snap_to_region_end(v: &u8) -> bool {
    *v == DEFAULT_SNAP_TO_REGION_END
}

fn default_snap_threshold() -> u32 {
    DEFAULT_SNAP_THRESHOLD
}

fn is_default_snap_threshold(v: &u32) -> bool {
    *v == DEFAULT_SNAP_THRESHOLD
}

fn is_default<T: Default + PartialEq>(v: &T) -> bool {
    *v == T::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn defaults() {
        let config = EditorConfig::default();
        assert!(config.snap_to_grid());
        assert!(config.snap_to_marks());
        assert!(config.snap_to_region_start());
        assert!(config.snap_to_region_end());
        assert!(!config.snap_to_region_sync());
        assert!(!config.rulers_follow_grid());
        assert_eq!(config.snap_threshold_pixels(), 25);
    }

    #[test]
    fn parse_partial_ini() {
        // Given
        let ini = "[snap]\nsnap_to_marks=0\nsnap_threshold=40\n";
        // When
        let config: EditorConfig = serde_ini::from_str(ini).unwrap();
        // Then
        assert!(!config.snap_to_marks());
        assert!(config.snap_to_grid());
        assert_eq!(config.snap_threshold_pixels(), 40);
    }

    #[test]
    #[traced_test]
    fn clamp_threshold() {
        // Given
        let mut config = EditorConfig::default();
        // When
        config.set_snap_threshold_pixels(100_000);
        // Then
        assert_eq!(config.snap_threshold_pixels(), MAX_SNAP_THRESHOLD);
        assert!(logs_contain("Snap threshold out of range"));
    }

    #[test]
    fn save_and_load() {
        // Given
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("sub").join("editor.ini")).unwrap();
        let mut config = EditorConfig::default();
        config.set_snap_to_region_sync(true);
        config.set_rulers_follow_grid(true);
        config.set_snap_to_grid(false);
        // When
        config.save(&path).unwrap();
        let loaded = EditorConfig::load(&path).unwrap();
        // Then
        assert!(loaded.snap_to_region_sync());
        assert!(loaded.rulers_follow_grid());
        assert!(!loaded.snap_to_grid());
        assert!(loaded.snap_to_marks());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nope.ini")).unwrap();
        let config = EditorConfig::load_or_default(&path);
        assert_eq!(config.snap_threshold_pixels(), DEFAULT_SNAP_THRESHOLD);
        assert!(EditorConfig::load(&path).is_err());
    }
}
