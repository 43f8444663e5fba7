use crate::browser;
use anyhow::{anyhow, Context, Result};
use js_sys::ArrayBuffer;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioBufferSourceNode, AudioContext, AudioContextState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Looping {
    No,
    Yes,
}

/// Decoded clip, playable any number of times
#[derive(Clone)]
pub struct Sound {
    buffer: AudioBuffer,
}

/// ┌──────────────────── Audio Routing ───────────────────┐
/// │ effects context ── one source per play() ──► output  │
/// │                    (overlapping, fire and forget)    │
/// │ music context   ── one looping source    ──► output  │
/// │                    (suspend/resume = pause/unpause)  │
/// └──────────────────────────────────────────────────────┘
pub struct Audio {
    effects: AudioContext,
    music: Music,
}

impl Audio {
    pub fn new() -> Result<Self> {
        Ok(Audio {
            effects: create_audio_context()?,
            music: Music {
                context: create_audio_context()?,
                source: None,
                paused: false,
            },
        })
    }

    pub async fn load_sound(&self, source: &str) -> Result<Sound> {
        let array_buffer = browser::fetch_array_buffer(source).await?;
        let buffer = decode_audio_data(&self.effects, &array_buffer)
            .await
            .with_context(|| format!("Error loading Chunk: {}", source))?;
        Ok(Sound { buffer })
    }

    pub async fn load_music(&self, source: &str) -> Result<Sound> {
        let array_buffer = browser::fetch_array_buffer(source).await?;
        let buffer = decode_audio_data(&self.music.context, &array_buffer)
            .await
            .with_context(|| format!("Error loading Music: {}", source))?;
        Ok(Sound { buffer })
    }

    /// Fire and forget; plays alongside anything already sounding.
    /// Skipped until the effects context runs, a suspended one queues every
    /// start() and fires them together on unlock.
    pub fn play_sound(&self, sound: &Sound) -> Result<()> {
        if !is_running(self.effects.state()) {
            return Ok(());
        }
        play(&self.effects, &sound.buffer, Looping::No).map(|_| ())
    }

    pub fn music(&mut self) -> &mut Music {
        &mut self.music
    }

    /// Browsers hold new contexts suspended until the user interacts with
    /// the page. Call on user input.
    pub fn unlock(&self) {
        if self.effects.state() == AudioContextState::Suspended {
            resume(&self.effects);
        }
        if !self.music.is_paused() && self.music.context.state() == AudioContextState::Suspended {
            resume(&self.music.context);
        }
    }

    /// Stop music and every effect channel, then release both contexts
    pub fn halt(&mut self) {
        self.music.halt();
        for context in [&self.effects, &self.music.context] {
            if let Err(err) = context.close() {
                log!("Error closing audio context : {:#?}", err);
            }
        }
    }
}

pub struct Music {
    context: AudioContext,
    source: Option<AudioBufferSourceNode>,
    paused: bool,
}

impl Music {
    /// Start `sound` looping forever, replacing whatever was playing
    pub fn play(&mut self, sound: &Sound) -> Result<()> {
        self.halt();
        self.source = Some(play(&self.context, &sound.buffer, Looping::Yes)?);
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn toggle_pause(&mut self) -> Result<()> {
        let pending = if self.paused {
            self.context.resume()
        } else {
            self.context.suspend()
        }
        .map_err(|err| anyhow!("Error toggling music : {:#?}", err))?;
        self.paused = !self.paused;
        browser::spawn_local(async move {
            if let Err(err) = JsFuture::from(pending).await {
                log!("Music pause/resume failed : {:#?}", err);
            }
        });
        Ok(())
    }

    pub fn halt(&mut self) {
        if let Some(source) = self.source.take() {
            if let Err(err) = source.stop() {
                log!("Error stopping music : {:#?}", err);
            }
        }
    }
}

pub fn create_audio_context() -> Result<AudioContext> {
    AudioContext::new().map_err(|err| anyhow!("Could not create audio context: {:#?}", err))
}

fn create_buffer_source(ctx: &AudioContext) -> Result<AudioBufferSourceNode> {
    ctx.create_buffer_source()
        .map_err(|err| anyhow!("Error creating buffer source {:#?}", err))
}

fn create_track_source(ctx: &AudioContext, buffer: &AudioBuffer) -> Result<AudioBufferSourceNode> {
    let track_source = create_buffer_source(ctx)?;
    track_source.set_buffer(Some(buffer));
    track_source
        .connect_with_audio_node(&ctx.destination())
        .map_err(|err| anyhow!("Error connecting audio source to destination {:#?}", err))?;
    Ok(track_source)
}

fn play(ctx: &AudioContext, buffer: &AudioBuffer, looping: Looping) -> Result<AudioBufferSourceNode> {
    let track_source = create_track_source(ctx, buffer)?;
    if looping == Looping::Yes {
        track_source.set_loop(true);
    }
    track_source
        .start()
        .map_err(|err| anyhow!("Could not start sound! {:#?}", err))?;
    Ok(track_source)
}

fn is_running(state: AudioContextState) -> bool {
    state == AudioContextState::Running
}

fn resume(ctx: &AudioContext) {
    match ctx.resume() {
        Ok(pending) => browser::spawn_local(async move {
            if let Err(err) = JsFuture::from(pending).await {
                log!("Audio context did not resume : {:#?}", err);
            }
        }),
        Err(err) => log!("Error resuming audio context : {:#?}", err),
    }
}

async fn decode_audio_data(ctx: &AudioContext, array_buffer: &ArrayBuffer) -> Result<AudioBuffer> {
    JsFuture::from(
        ctx.decode_audio_data(array_buffer)
            .map_err(|err| anyhow!("Could not decode audio from array buffer {:#?}", err))?,
    )
    .await
    .map_err(|err| anyhow!("Could not convert promise to future {:#?}", err))?
    .dyn_into()
    .map_err(|err| anyhow!("Could not cast into AudioBuffer {:#?}", err))
}
