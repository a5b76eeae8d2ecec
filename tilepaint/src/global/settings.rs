use tilepaint_core::config::Settings;

const DOCUMENTATION: &str = r#"# Tilepaint settings. You may edit this file, but be aware that formatting and comments will not
# be preserved. Missing keys take their default values.

# Examples:
# default_tool = "Brush"
# [tools]
# brush_radius = 4
# color = [255, 0, 0, 255]
# [execution]
# progress_poll_ms = 50
# history_limit = 100
# [messages]
# out_of_memory = "Not enough memory for {name}."

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

pub struct UserSettings {
    failed_to_load: bool,
    pub settings: Settings,
}
impl UserSettings {
    const FILENAME: &'static str = "settings.toml";
    /// Shared global settings, saved and loaded from user preferences.
    /// (Or defaulted, if unavailable for some reason)
    #[must_use]
    pub fn get() -> &'static Self {
        static GLOBAL_SETTINGS: std::sync::OnceLock<UserSettings> = std::sync::OnceLock::new();

        GLOBAL_SETTINGS.get_or_init(|| {
            let mut dir = preferences_dir();
            match dir.as_mut() {
                None => Self::no_path(),
                Some(dir) => {
                    dir.push(Self::FILENAME);
                    Self::load_or_default(dir)
                }
            }
        })
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Settings weren't available, defaulting.");
        Self {
            failed_to_load: true,
            settings: Settings::default(),
        }
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<Settings> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let settings : Settings = toml::from_str(&string)?;

            Ok(settings)
        };

        match settings {
            Ok(settings) => Self {
                failed_to_load: false,
                settings,
            },
            Err(e) => {
                log::debug!("Failed to load {path:?}: {e:#}");
                Self::no_path()
            }
        }
    }
    /// Whether the settings file couldn't be loaded, so defaults are in use.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Only our own folder is created, never its parents.
        // Usually fails because it already exists, and the write reports anything worse.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        let body = toml::ser::to_string_pretty(&self.settings)?;
        std::fs::write(preferences, format!("{DOCUMENTATION}{body}"))?;
        Ok(())
    }
}
