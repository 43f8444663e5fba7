use crate::engine::input::KeyState;
use crate::engine::{self, Color, Flow, Game, Label, Rect, Renderer, Size};
use crate::motion::{Bouncer, Mover};
use crate::settings::{Settings, Stage};
use crate::sound::{Audio, Sound};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::join;
use web_sys::HtmlImageElement;

/// TABLE
/// ┌────────────────────── Showcase Overview ─────────────────────────┐
/// │                                                                  │
/// │  Loading(Settings) ── initialize() ──► Loaded(Scene)             │
/// │                       ├─ open window (size, title, icon)         │
/// │                       └─ load what the stage needs               │
/// │                                                                  │
/// │  per step  : presses ─► quit / recolor / pause music             │
/// │              label   ─► bounce, one effect per edge hit          │
/// │              sprite  ─► held keys                                │
/// │  per frame : clear ─► background ─► label ─► sprite              │
/// │                                                                  │
/// └──────────────────────────────────────────────────────────────────┘
pub enum Showcase {
    /// Nothing on screen yet, only what to load
    Loading(Settings),

    Loaded(Scene),
}

impl Showcase {
    pub fn new(settings: Settings) -> Self {
        Showcase::Loading(settings)
    }
}

#[async_trait(?Send)]
impl Game for Showcase {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            Showcase::Loading(settings) => {
                let scene = Scene::load(settings).await?;
                Ok(Box::new(Showcase::Loaded(scene)))
            }
            Showcase::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, keystate: &mut KeyState) -> Flow {
        match self {
            Showcase::Loaded(scene) => scene.update(keystate),
            Showcase::Loading(_) => Flow::Continue,
        }
    }

    fn draw(&self, renderer: &Renderer) -> Result<()> {
        match self {
            Showcase::Loaded(scene) => scene.draw(renderer),
            Showcase::Loading(_) => Ok(()),
        }
    }

    fn shutdown(&mut self) {
        if let Showcase::Loaded(scene) = self {
            scene.shutdown();
        }
    }
}

// the first stage just shows the window for 5 seconds at 60 steps a second
const OPEN_WINDOW_STEPS: u32 = 5 * 60;
const FONT_FAMILY: &str = "showcase-label";

mod keys {
    pub const QUIT: &str = "Escape";
    pub const RECOLOR: &str = "Space";
    pub const PAUSE_MUSIC: &str = "KeyM";
}

pub struct Scene {
    stage: Stage,
    window: Size,
    clear_color: Color,
    steps: u32,
    background: Option<HtmlImageElement>,
    label: Option<Label>,
    label_motion: Option<Bouncer>,
    sprite: Option<(HtmlImageElement, Mover)>,
    sounds: Option<SceneAudio>,
}

struct SceneAudio {
    audio: Audio,
    key_press: Sound,
    bounce: Sound,
}

impl Scene {
    async fn load(settings: &Settings) -> Result<Self> {
        let stage = settings.stage;
        let assets = &settings.assets;
        log!("Loading stage '{}'", stage.name());

        let icon = stage
            .has_motion_and_audio()
            .then_some(assets.icon.as_str());
        engine::open_window(stage.title(), settings.window_size(), icon)
            .context("Error creating Window")?;

        let background = if stage.has_background() {
            Some(load_texture(&assets.background).await?)
        } else {
            None
        };

        let (label, label_motion) = if stage.has_text() {
            let font = engine::load_font(FONT_FAMILY, &assets.font, settings.font_size)
                .await
                .with_context(|| format!("Error creating Font: {}", assets.font))?;
            let label = Label::render(&settings.text, &font, &settings.font_color)
                .context("Error creating text Surface")?;
            let bouncer = Bouncer::new(label.size(), settings.text_speed);
            (Some(label), Some(bouncer))
        } else {
            (None, None)
        };

        let (sprite, sounds) = if stage.has_motion_and_audio() {
            let image = load_texture(&assets.icon).await?;
            let mover = Mover::new(engine::image_size(&image), settings.sprite_speed);

            let mut audio = Audio::new().context("Error Opening Audio")?;
            let (key_press, bounce, music) = join!(
                audio.load_sound(&assets.key_sound),
                audio.load_sound(&assets.bounce_sound),
                audio.load_music(&assets.music),
            );
            let (key_press, bounce, music) = (key_press?, bounce?, music?);
            audio
                .music()
                .play(&music)
                .context("Error playing Music")?;

            (
                Some((image, mover)),
                Some(SceneAudio {
                    audio,
                    key_press,
                    bounce,
                }),
            )
        } else {
            (None, None)
        };

        log!("Stage '{}' ready", stage.name());
        Ok(Scene {
            stage,
            window: settings.window_size(),
            clear_color: Color::BLACK,
            steps: 0,
            background,
            label,
            label_motion,
            sprite,
            sounds,
        })
    }

    fn update(&mut self, keystate: &mut KeyState) -> Flow {
        if !self.stage.polls_events() {
            self.steps += 1;
            return if self.steps >= OPEN_WINDOW_STEPS {
                Flow::Quit
            } else {
                Flow::Continue
            };
        }

        if keystate.quit_requested() {
            return Flow::Quit;
        }

        while let Some(code) = keystate.next_press() {
            if let Some(sounds) = &self.sounds {
                sounds.audio.unlock();
            }
            match code.as_str() {
                keys::QUIT => return Flow::Quit,
                keys::RECOLOR if self.stage.has_colors() => self.recolor(),
                keys::PAUSE_MUSIC => self.toggle_music(),
                _ => {}
            }
        }

        self.update_label();
        if let Some((_, mover)) = &mut self.sprite {
            mover.step(keystate);
        }
        Flow::Continue
    }

    fn recolor(&mut self) {
        match Color::random() {
            Ok(color) => self.clear_color = color,
            Err(err) => error!("{:#}", err),
        }
        if let Some(sounds) = &self.sounds {
            if let Err(err) = sounds.audio.play_sound(&sounds.key_press) {
                error!("{:#}", err);
            }
        }
    }

    fn toggle_music(&mut self) {
        if let Some(sounds) = &mut self.sounds {
            if let Err(err) = sounds.audio.music().toggle_pause() {
                error!("{:#}", err);
            }
        }
    }

    fn update_label(&mut self) {
        if !self.stage.has_motion_and_audio() {
            return;
        }
        if let Some(bouncer) = &mut self.label_motion {
            let hits = bouncer.step(self.window);
            if let Some(sounds) = &self.sounds {
                for _ in 0..hits {
                    if let Err(err) = sounds.audio.play_sound(&sounds.bounce) {
                        error!("{:#}", err);
                    }
                }
            }
        }
    }

    fn draw(&self, renderer: &Renderer) -> Result<()> {
        let screen = Rect::from_size(self.window);
        // Draw order matters : background -> foreground
        renderer.clear(&screen, &self.clear_color);
        if let Some(background) = &self.background {
            renderer.draw_image(background, &screen)?;
        }
        if let (Some(label), Some(bouncer)) = (&self.label, &self.label_motion) {
            renderer.draw_label(label, bouncer.rect())?;
        }
        if let Some((image, mover)) = &self.sprite {
            renderer.draw_image(image, mover.rect())?;
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(sounds) = &mut self.sounds {
            sounds.audio.halt();
        }
        log!("Stage '{}' closed", self.stage.name());
    }
}

async fn load_texture(path: &str) -> Result<HtmlImageElement> {
    engine::load_image(path)
        .await
        .with_context(|| format!("Error loading Texture: {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::InputEvent;
    use crate::engine::Point;

    const WINDOW: Size = Size {
        width: 800,
        height: 600,
    };

    /// A scene with its behaviour but none of its browser media
    fn scene(stage: Stage) -> Scene {
        Scene {
            stage,
            window: WINDOW,
            clear_color: Color::BLACK,
            steps: 0,
            background: None,
            label: None,
            label_motion: stage
                .has_text()
                .then(|| Bouncer::new(Size { width: 120, height: 90 }, 3)),
            sprite: None,
            sounds: None,
        }
    }

    fn press(keystate: &mut KeyState, code: &str) {
        keystate.apply(InputEvent::KeyDown {
            code: code.to_string(),
        });
    }

    fn label_position(scene: &Scene) -> Point {
        scene.label_motion.as_ref().unwrap().rect().position
    }

    #[test]
    fn clear_color_starts_black() {
        for stage in Stage::ALL {
            assert_eq!(scene(stage).clear_color, Color::BLACK);
        }
    }

    #[test]
    fn open_window_ignores_input_and_quits_after_five_seconds() {
        let mut scene = scene(Stage::OpenWindow);
        let mut keystate = KeyState::new();
        press(&mut keystate, keys::QUIT);

        for _ in 0..OPEN_WINDOW_STEPS - 1 {
            assert_eq!(scene.update(&mut keystate), Flow::Continue);
        }
        assert_eq!(scene.update(&mut keystate), Flow::Quit);
    }

    #[test]
    fn escape_quits() {
        let mut scene = scene(Stage::CloseWindow);
        let mut keystate = KeyState::new();
        assert_eq!(scene.update(&mut keystate), Flow::Continue);

        press(&mut keystate, keys::QUIT);
        assert_eq!(scene.update(&mut keystate), Flow::Quit);
    }

    #[test]
    fn leaving_the_page_quits() {
        let mut scene = scene(Stage::MusicAndIcon);
        let mut keystate = KeyState::new();
        keystate.apply(InputEvent::Quit);
        assert_eq!(scene.update(&mut keystate), Flow::Quit);
    }

    #[test]
    fn space_recolors_only_from_colors_stage() {
        let mut scene_without = scene(Stage::Background);
        let mut keystate = KeyState::new();
        press(&mut keystate, keys::RECOLOR);
        scene_without.update(&mut keystate);
        assert_eq!(scene_without.clear_color, Color::BLACK);

        // each repeat of a held Space recolors again
        let mut scene_with = scene(Stage::Colors);
        let mut seen = Vec::new();
        for _ in 0..20 {
            press(&mut keystate, keys::RECOLOR);
            scene_with.update(&mut keystate);
            seen.push(scene_with.clear_color);
        }
        assert!(seen.iter().any(|color| *color != Color::BLACK));
        assert!(seen.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn music_key_is_harmless_without_audio() {
        let mut scene = scene(Stage::CreateText);
        let mut keystate = KeyState::new();
        press(&mut keystate, keys::PAUSE_MUSIC);
        assert_eq!(scene.update(&mut keystate), Flow::Continue);
        assert!(scene.sounds.is_none());
    }

    #[test]
    fn label_stays_put_before_sound_effects() {
        let mut scene = scene(Stage::CreateText);
        let mut keystate = KeyState::new();
        for _ in 0..10 {
            scene.update(&mut keystate);
        }
        assert_eq!(label_position(&scene), Point { x: 0, y: 0 });
    }

    #[test]
    fn label_bounces_from_sound_effects_on() {
        for stage in [Stage::SoundEffects, Stage::MusicAndIcon] {
            let mut scene = scene(stage);
            let mut keystate = KeyState::new();
            for _ in 0..10 {
                scene.update(&mut keystate);
            }
            assert_eq!(label_position(&scene), Point { x: 30, y: 30 });
        }
    }
}
