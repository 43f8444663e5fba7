use crate::browser;
use crate::engine::{Color, Size};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::str::FromStr;

const SETTINGS_PATH: &str = "settings.json";
const STAGE_PARAM: &str = "stage";

/// One step of the tour. Every stage keeps what the previous ones added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    OpenWindow,
    CloseWindow,
    Background,
    Colors,
    CreateText,
    SoundEffects,
    MusicAndIcon,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::OpenWindow,
        Stage::CloseWindow,
        Stage::Background,
        Stage::Colors,
        Stage::CreateText,
        Stage::SoundEffects,
        Stage::MusicAndIcon,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Stage::OpenWindow => "Open Window",
            Stage::CloseWindow => "Close Window",
            Stage::Background => "Background",
            Stage::Colors => "Colors",
            Stage::CreateText => "Create Text",
            Stage::SoundEffects => "Sound Effects and Music",
            Stage::MusicAndIcon => "Music and Icon",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::OpenWindow => "open_window",
            Stage::CloseWindow => "close_window",
            Stage::Background => "background",
            Stage::Colors => "colors",
            Stage::CreateText => "create_text",
            Stage::SoundEffects => "sound_effects",
            Stage::MusicAndIcon => "music_and_icon",
        }
    }

    /// Escape/quit handling, a running loop
    pub fn polls_events(&self) -> bool {
        *self >= Stage::CloseWindow
    }

    pub fn has_background(&self) -> bool {
        *self >= Stage::Background
    }

    /// Space picks a random clear color
    pub fn has_colors(&self) -> bool {
        *self >= Stage::Colors
    }

    pub fn has_text(&self) -> bool {
        *self >= Stage::CreateText
    }

    /// Bouncing label, sprite, effects, music, icon
    pub fn has_motion_and_audio(&self) -> bool {
        *self >= Stage::SoundEffects
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> Result<Self> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == name)
            .ok_or_else(|| anyhow!("Unknown stage '{}'", name))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Assets {
    pub background: String,
    /// Doubles as the sprite
    pub icon: String,
    pub font: String,
    pub key_sound: String,
    pub bounce_sound: String,
    pub music: String,
}

impl Default for Assets {
    fn default() -> Self {
        Assets {
            background: "images/background.png".to_string(),
            icon: "images/Cpp-logo.png".to_string(),
            font: "fonts/freesansbold.ttf".to_string(),
            key_sound: "sounds/Cpp.ogg".to_string(),
            bounce_sound: "sounds/SDL.ogg".to_string(),
            music: "music/freesoftwaresong-8bit.ogg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stage: Stage,
    pub width: i32,
    pub height: i32,
    pub text: String,
    pub font_size: i32,
    pub font_color: Color,
    pub text_speed: i32,
    pub sprite_speed: i32,
    pub assets: Assets,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            stage: Stage::MusicAndIcon,
            width: 800,
            height: 600,
            text: "SDL".to_string(),
            font_size: 80,
            font_color: Color::WHITE,
            text_speed: 3,
            sprite_speed: 5,
            assets: Assets::default(),
        }
    }
}

impl Settings {
    /// `settings.json` if it can be fetched, defaults otherwise, then the
    /// `?stage=` query parameter on top
    pub async fn load() -> Self {
        let fetched = browser::fetch_json::<Settings>(SETTINGS_PATH)
            .await
            .and_then(|settings| settings.validate().map(|()| settings));
        let mut settings = match fetched {
            Ok(settings) => settings,
            Err(err) => {
                log!("Using default settings, {} unusable : {:#}", SETTINGS_PATH, err);
                Settings::default()
            }
        };

        match browser::query_param(STAGE_PARAM) {
            Ok(Some(name)) => {
                if let Err(err) = settings.override_stage(&name) {
                    log!("{:#}", err);
                }
            }
            Ok(None) => {}
            Err(err) => log!("{:#}", err),
        }
        settings
    }

    /// Sizes and speeds must be positive
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("font_size", self.font_size),
            ("text_speed", self.text_speed),
            ("sprite_speed", self.sprite_speed),
        ] {
            if value <= 0 {
                return Err(anyhow!("{} must be positive, got {}", name, value));
            }
        }
        Ok(())
    }

    pub fn override_stage(&mut self, name: &str) -> Result<()> {
        self.stage = name.parse()?;
        Ok(())
    }

    pub fn window_size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_accumulate_features() {
        assert!(!Stage::OpenWindow.polls_events());
        assert!(Stage::CloseWindow.polls_events());
        assert!(!Stage::CloseWindow.has_background());
        assert!(Stage::Background.has_background());
        assert!(!Stage::Background.has_colors());
        assert!(Stage::Colors.has_colors());
        assert!(!Stage::Colors.has_text());
        assert!(Stage::CreateText.has_text());
        assert!(!Stage::CreateText.has_motion_and_audio());

        let last = Stage::MusicAndIcon;
        assert!(
            last.polls_events()
                && last.has_background()
                && last.has_colors()
                && last.has_text()
                && last.has_motion_and_audio()
        );
    }

    #[test]
    fn stage_names_round_trip_through_from_str() {
        for stage in Stage::ALL {
            assert_eq!(stage.name().parse::<Stage>().unwrap(), stage);
        }
        assert!("video9".parse::<Stage>().is_err());
    }

    #[test]
    fn empty_settings_file_gives_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.stage.title(), "Music and Icon");
        assert_eq!(
            settings.window_size(),
            Size {
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn partial_settings_keep_remaining_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "stage": "create_text",
                "font_color": { "r": 255, "g": 0, "b": 0 },
                "assets": { "font": "fonts/other.ttf" }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.stage, Stage::CreateText);
        assert_eq!(settings.font_color, Color::rgb(255, 0, 0));
        assert_eq!(settings.assets.font, "fonts/other.ttf");
        assert_eq!(settings.assets.music, Assets::default().music);
        assert_eq!(settings.text, "SDL");
    }

    #[test]
    fn shipped_settings_match_defaults() {
        let settings: Settings =
            serde_json::from_str(include_str!("../static/settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn non_positive_sizes_and_speeds_are_rejected() {
        assert!(Settings::default().validate().is_ok());

        for field in ["width", "height", "font_size", "text_speed", "sprite_speed"] {
            for value in [0, -3] {
                let settings: Settings =
                    serde_json::from_str(&format!(r#"{{ "{}": {} }}"#, field, value)).unwrap();
                let err = settings.validate().unwrap_err();
                assert!(err.to_string().starts_with(field), "{}", err);
            }
        }
    }

    #[test]
    fn unknown_stage_override_keeps_current_stage() {
        let mut settings = Settings::default();
        assert!(settings.override_stage("nope").is_err());
        assert_eq!(settings.stage, Stage::MusicAndIcon);

        settings.override_stage("colors").unwrap();
        assert_eq!(settings.stage, Stage::Colors);
    }
}
