use crate::browser;
use anyhow::{anyhow, Error, Result};
// ELI5: web assembly is a single threaded environment, so Rc RefCell > Mutex
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref (unsafe) cast from Javascript type to Rust type
    // - because we control the closure creation and specify the expected type,
    // in principle this should be generally safe (unsafe) code
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

pub mod input;

use self::input::KeyState;

/// Whether the loop should keep scheduling frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    fn update(&mut self, keystate: &mut KeyState) -> Flow;
    fn draw(&self, renderer: &Renderer) -> Result<()>;
    /// Called once, after the last update
    fn shutdown(&mut self);
}

// length of a frame in milliseconds
const FRAME_SIZE: f32 = 1.0 / 60.0 * 1000.0;
// a backgrounded tab stops animation frames, don't replay all of it on return
const MAX_STEPS_PER_FRAME: u32 = 10;

/// Fixed timestep accumulator
/// - real time in, whole 60Hz steps out
/// - remainder carries over to the next frame
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    last_frame: f64,
    accumulated_delta: f32,
}

impl FrameClock {
    pub fn new(now: f64) -> Self {
        FrameClock {
            last_frame: now,
            accumulated_delta: 0.0,
        }
    }

    /// How many fixed steps to run for a frame at `now` (milliseconds)
    pub fn advance(&mut self, now: f64) -> u32 {
        self.accumulated_delta += (now - self.last_frame) as f32;
        self.last_frame = now;

        let mut steps = 0;
        while self.accumulated_delta > FRAME_SIZE {
            self.accumulated_delta -= FRAME_SIZE;
            steps += 1;
        }
        if steps > MAX_STEPS_PER_FRAME {
            steps = MAX_STEPS_PER_FRAME;
        }
        steps
    }

    pub fn accumulated(&self) -> f32 {
        self.accumulated_delta
    }
}

pub struct GameLoop {
    clock: FrameClock,
    running: bool,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let mut keyevent_receiver = input::prepare_input()?;
        let mut game = game.initialize().await?;
        let mut game_loop = GameLoop {
            clock: FrameClock::new(browser::now()?),
            running: true,
        };
        let renderer = Renderer::new(browser::context()?);
        let mut keystate = KeyState::new();

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            if !game_loop.running {
                return;
            }
            input::process_input(&mut keystate, &mut keyevent_receiver);

            for _ in 0..game_loop.clock.advance(perf) {
                if game.update(&mut keystate) == Flow::Quit {
                    game_loop.running = false;
                    break;
                }
            }

            if game_loop.running {
                if let Err(err) = game.draw(&renderer) {
                    error!("{:#}", err);
                    game_loop.running = false;
                }
            }

            if !game_loop.running {
                // no further frames are requested, the closure stays parked
                game.shutdown();
                log!("Game loop stopped");
                return;
            }

            if let Some(callback) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(callback) {
                    error!("{:#}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }
}

// ==================== Geometry ====================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub fn from_size(size: Size) -> Self {
        Rect {
            position: Point::default(),
            size,
        }
    }

    pub fn x(&self) -> i32 {
        self.position.x
    }

    pub fn y(&self) -> i32 {
        self.position.y
    }

    pub fn right(&self) -> i32 {
        self.position.x + self.size.width
    }

    pub fn bottom(&self) -> i32 {
        self.position.y + self.size.height
    }
}

// ==================== Color ====================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "Color::opaque")]
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    fn opaque() -> u8 {
        255
    }

    /// Fully opaque, each channel uniform over 0..=255
    pub fn random() -> Result<Self> {
        let mut channels = [0u8; 3];
        getrandom::getrandom(&mut channels)
            .map_err(|err| anyhow!("Could not generate random color : {}", err))?;
        Ok(Color::rgb(channels[0], channels[1], channels[2]))
    }

    pub fn to_css(&self) -> String {
        format!(
            "rgba({}, {}, {}, {})",
            self.r,
            self.g,
            self.b,
            f64::from(self.a) / 255.0
        )
    }
}

// ==================== Rendering ====================
pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(context: CanvasRenderingContext2d) -> Self {
        Renderer { context }
    }

    /// Fill the whole `rect` with `color`, replacing what was there
    pub fn clear(&self, rect: &Rect, color: &Color) {
        let (x, y, w, h) = Self::to_canvas(rect);
        self.context.clear_rect(x, y, w, h);
        self.context.set_fill_style_str(&color.to_css());
        self.context.fill_rect(x, y, w, h);
    }

    /// Whole image, scaled to `destination`
    pub fn draw_image(&self, image: &HtmlImageElement, destination: &Rect) -> Result<()> {
        let (x, y, w, h) = Self::to_canvas(destination);
        self.context
            .draw_image_with_html_image_element_and_dw_and_dh(image, x, y, w, h)
            .map_err(|err| anyhow!("Error drawing image : {:#?}", err))
    }

    pub fn draw_label(&self, label: &Label, destination: &Rect) -> Result<()> {
        let (x, y, w, h) = Self::to_canvas(destination);
        self.context
            .draw_image_with_html_canvas_element_and_dw_and_dh(&label.canvas, x, y, w, h)
            .map_err(|err| anyhow!("Error drawing label : {:#?}", err))
    }

    fn to_canvas(rect: &Rect) -> (f64, f64, f64, f64) {
        (
            rect.x().into(),
            rect.y().into(),
            rect.size.width.into(),
            rect.size.height.into(),
        )
    }
}

/// Size the page canvas, name the tab and optionally set its icon.
/// The canvas plays the role of the fixed-size window.
pub fn open_window(title: &str, size: Size, icon: Option<&str>) -> Result<()> {
    let canvas = browser::canvas()?;
    canvas.set_width(dimension(size.width)?);
    canvas.set_height(dimension(size.height)?);
    browser::set_title(title)?;
    if let Some(icon) = icon {
        browser::set_icon(icon)?;
    }
    Ok(())
}

fn dimension(value: i32) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| anyhow!("Window dimension must be positive, got {}", value))
}

// ==================== Assets ====================
/// Natural pixel size of a loaded image
pub fn image_size(image: &HtmlImageElement) -> Size {
    Size {
        width: image.natural_width() as i32,
        height: image.natural_height() as i32,
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!("Error loading image {:#?}", err)));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // ?? - Result<Result<(), Error>, oneshot::Canceled>
    // - first ? yields channel result
    // - second ? yields image load result
    rx.await??;

    Ok(image)
}

/// Font registered with the page under `family`
#[derive(Debug, Clone)]
pub struct Font {
    family: String,
    size: i32,
}

impl Font {
    /// A family the page can already draw with, e.g. "sans-serif"
    pub fn new(family: &str, size: i32) -> Self {
        Font {
            family: family.to_string(),
            size,
        }
    }

    pub fn css(&self) -> String {
        format!("{}px \"{}\"", self.size, self.family)
    }
}

pub async fn load_font(family: &str, source: &str, size: i32) -> Result<Font> {
    browser::load_font_face(family, source).await?;
    Ok(Font::new(family, size))
}

/// Text rasterised once into its own canvas, blitted every frame
pub struct Label {
    canvas: HtmlCanvasElement,
    size: Size,
}

impl Label {
    pub fn render(text: &str, font: &Font, color: &Color) -> Result<Self> {
        // measure on a scratch canvas, the real one needs the size up front
        let scratch = browser::context_of(&browser::new_canvas(1, 1)?)?;
        scratch.set_font(&font.css());
        let metrics = scratch
            .measure_text(text)
            .map_err(|err| anyhow!("Error measuring text : {:#?}", err))?;
        let ascent = metrics.font_bounding_box_ascent();
        let height = ascent + metrics.font_bounding_box_descent();
        let size = Size {
            width: metrics.width().ceil() as i32,
            height: height.ceil() as i32,
        };

        let canvas = browser::new_canvas(dimension(size.width)?, dimension(size.height)?)?;
        let context = browser::context_of(&canvas)?;
        // resizing resets the context state, so the font goes on after
        context.set_font(&font.css());
        context.set_fill_style_str(&color.to_css());
        context
            .fill_text(text, 0.0, ascent)
            .map_err(|err| anyhow!("Error rendering text : {:#?}", err))?;

        Ok(Label { canvas, size })
    }

    pub fn size(&self) -> Size {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clock_runs_whole_steps_and_keeps_remainder() {
        let mut clock = FrameClock::new(0.0);
        // 2.5 frames worth of time
        let steps = clock.advance(f64::from(FRAME_SIZE) * 2.5);
        assert_eq!(steps, 2);
        assert_relative_eq!(clock.accumulated(), FRAME_SIZE * 0.5, epsilon = 1e-3);

        // the carried half frame completes the next one
        let steps = clock.advance(f64::from(FRAME_SIZE) * 3.1);
        assert_eq!(steps, 1);
        assert_relative_eq!(clock.accumulated(), FRAME_SIZE * 0.1, epsilon = 1e-3);
    }

    #[test]
    fn clock_runs_nothing_for_short_frames() {
        let mut clock = FrameClock::new(100.0);
        assert_eq!(clock.advance(105.0), 0);
        assert_relative_eq!(clock.accumulated(), 5.0, epsilon = 1e-4);
    }

    #[test]
    fn clock_caps_catch_up_after_a_long_pause() {
        let mut clock = FrameClock::new(0.0);
        assert_eq!(clock.advance(60_000.0), MAX_STEPS_PER_FRAME);
    }

    #[test]
    fn rect_edges() {
        let rect = Rect::new(
            Point { x: 10, y: 20 },
            Size {
                width: 30,
                height: 40,
            },
        );
        assert_eq!(rect.right(), 40);
        assert_eq!(rect.bottom(), 60);
    }

    #[test]
    fn color_to_css() {
        assert_eq!(Color::WHITE.to_css(), "rgba(255, 255, 255, 1)");
        let half = Color {
            r: 1,
            g: 2,
            b: 3,
            a: 0,
        };
        assert_eq!(half.to_css(), "rgba(1, 2, 3, 0)");
    }

    #[test]
    fn window_dimensions_must_be_positive() {
        assert_eq!(dimension(800).unwrap(), 800);
        assert!(dimension(0).is_err());
        assert!(dimension(-1).is_err());
    }
}
