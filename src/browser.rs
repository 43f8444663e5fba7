use anyhow::{anyhow, Result};
use js_sys::ArrayBuffer;
use serde::de::DeserializeOwned;
use std::future::Future;
use wasm_bindgen::closure::{Closure, WasmClosure, WasmClosureFnOnce};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

#[rustfmt::skip]
use web_sys::{
    Document,
    Window,
    CanvasRenderingContext2d,
    FontFace,
    HtmlCanvasElement,
    HtmlImageElement,
    HtmlLinkElement,
    Response,
    UrlSearchParams,
};

// ==================== Logging ====================
macro_rules! log {
    ($($t:tt)*) => {
        web_sys::console::log_1(&format!($($t)*).into())
    }
}

macro_rules! error {
    ($($t:tt)*) => {
        web_sys::console::error_1(&format!($($t)*).into())
    }
}

// ==================== Constants ====================
// Constants related to HTML elements
mod html {
    pub const CANVAS_ID: &str = "canvas";
    pub const CONTEXT_2D: &str = "2d";
    pub const CANVAS_TAG: &str = "canvas";
    pub const LINK_TAG: &str = "link";
    pub const ICON_SELECTOR: &str = "link[rel~='icon']";
}

pub type LoopClosure = Closure<dyn FnMut(f64)>;

pub fn new_image() -> Result<HtmlImageElement> {
    HtmlImageElement::new()
        .map_err(|err| anyhow!("Could not create image element : {:#?}", err))
}

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("Window not found"))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| anyhow!("No Document Found"))
}

pub fn canvas() -> Result<HtmlCanvasElement> {
    document()?
        .get_element_by_id(html::CANVAS_ID)
        .ok_or_else(|| anyhow!("No Canvas Element found with ID : '{:#?}'", html::CANVAS_ID))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))
}

/// Detached canvas, used to rasterise things once and blit them every frame
pub fn new_canvas(width: u32, height: u32) -> Result<HtmlCanvasElement> {
    let canvas = document()?
        .create_element(html::CANVAS_TAG)
        .map_err(|err| anyhow!("Could not create canvas element : {:#?}", err))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))?;
    canvas.set_width(width);
    canvas.set_height(height);
    Ok(canvas)
}

pub fn context() -> Result<CanvasRenderingContext2d> {
    context_of(&canvas()?)
}

pub fn context_of(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
    // get_context is Result<Option<Object>, JsValue>
    // - JsValue error -> anyhow
    // - None -> anyhow
    canvas
        .get_context(html::CONTEXT_2D)
        .map_err(|js_value| anyhow!("Error getting context : {:#?}", js_value))?
        .ok_or_else(|| anyhow!("No 2d context found"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|element| {
            anyhow!(
                "Error converting {:#?} to CanvasRenderingContext2d",
                element
            )
        })
}

pub fn set_title(title: &str) -> Result<()> {
    document()?.set_title(title);
    Ok(())
}

/// Point the page icon at `href`, creating the `<link rel="icon">` if the
/// page has none
pub fn set_icon(href: &str) -> Result<()> {
    let document = document()?;
    let existing = document
        .query_selector(html::ICON_SELECTOR)
        .map_err(|err| anyhow!("Error querying icon link : {:#?}", err))?;

    let link = match existing {
        Some(element) => element
            .dyn_into::<HtmlLinkElement>()
            .map_err(|element| anyhow!("Error converting {:#?} to HtmlLinkElement", element))?,
        None => {
            let link = document
                .create_element(html::LINK_TAG)
                .map_err(|err| anyhow!("Could not create link element : {:#?}", err))?
                .dyn_into::<HtmlLinkElement>()
                .map_err(|element| anyhow!("Error converting {:#?} to HtmlLinkElement", element))?;
            link.set_rel("icon");
            document
                .head()
                .ok_or_else(|| anyhow!("No Head Found"))?
                .append_child(&link)
                .map_err(|err| anyhow!("Could not append icon link : {:#?}", err))?;
            link
        }
    };
    link.set_href(href);
    Ok(())
}

/// Value of `name` in the page's query string, if present
pub fn query_param(name: &str) -> Result<Option<String>> {
    let search = window()?
        .location()
        .search()
        .map_err(|err| anyhow!("Could not read location search : {:#?}", err))?;
    let params = UrlSearchParams::new_with_str(&search)
        .map_err(|err| anyhow!("Could not parse query string '{}' : {:#?}", search, err))?;
    Ok(params.get(name))
}

pub fn now() -> Result<f64> {
    Ok(window()?
        .performance()
        .ok_or_else(|| anyhow!("Performance object not found"))?
        .now())
}

pub fn closure_once<F, A, R>(f: F) -> Closure<F::FnMut>
where
    F: 'static + WasmClosureFnOnce<A, R>,
{
    Closure::once(f)
}

pub fn closure_wrap<T: WasmClosure + ?Sized>(data: Box<T>) -> Closure<T> {
    Closure::wrap(data)
}

pub fn create_raf_closure(f: impl FnMut(f64) + 'static) -> LoopClosure {
    closure_wrap(Box::new(f))
}

pub fn request_animation_frame(callback: &LoopClosure) -> Result<i32> {
    window()?
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot request animation frame {:#?}", err))
}

pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

pub async fn fetch_json<T>(json_path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let resp = fetch_response(json_path).await?;
    let json = resp
        .json()
        .map_err(|err| anyhow!("Could not get JSON from response [{:#?}]", err))?;

    let json_value = JsFuture::from(json)
        .await
        .map_err(|err| anyhow!("error fetching [{:#?}]", err))?;

    serde_wasm_bindgen::from_value(json_value)
        .map_err(|err| anyhow!("error converting response : {:#?}", err))
}

pub async fn fetch_array_buffer(resource: &str) -> Result<ArrayBuffer> {
    let resp = fetch_response(resource).await?;
    let array_buffer = resp
        .array_buffer()
        .map_err(|err| anyhow!("Could not get ArrayBuffer from response [{:#?}]", err))?;

    JsFuture::from(array_buffer)
        .await
        .map_err(|err| anyhow!("error fetching [{:#?}]", err))?
        .dyn_into()
        .map_err(|err| anyhow!("error converting [{:#?}] to ArrayBuffer", err))
}

/// Register `source` as font `family` and wait until it is usable by the
/// canvas
pub async fn load_font_face(family: &str, source: &str) -> Result<FontFace> {
    let face = FontFace::new_with_str(family, &font_source(source))
        .map_err(|err| anyhow!("Could not create font face : {:#?}", err))?;
    let loading = face
        .load()
        .map_err(|err| anyhow!("Could not start loading font : {:#?}", err))?;
    JsFuture::from(loading)
        .await
        .map_err(|err| anyhow!("{:#?}", err))?;
    document()?
        .fonts()
        .add(&face)
        .map_err(|err| anyhow!("Could not add font to document : {:#?}", err))?;
    Ok(face)
}

/// CSS `src` descriptor for a font file, quoted so any path survives
fn font_source(path: &str) -> String {
    format!("url(\"{}\")", path.replace('\\', "\\\\").replace('"', "\\\""))
}

async fn fetch_response(resource: &str) -> Result<Response> {
    let resp_value = fetch_with_str(resource).await?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|element| anyhow!("error converting [{:#?}] to Response", element))?;
    if !resp.ok() {
        return Err(anyhow!("{} returned status {}", resource, resp.status()));
    }
    Ok(resp)
}

async fn fetch_with_str(resource: &str) -> Result<JsValue> {
    let resp = window()?.fetch_with_str(resource);

    JsFuture::from(resp)
        .await
        .map_err(|err| anyhow!("error fetching : {:#?}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_source_is_quoted() {
        assert_eq!(
            font_source("fonts/free sans (bold).ttf"),
            r#"url("fonts/free sans (bold).ttf")"#
        );
        assert_eq!(font_source(r#"odd"name.ttf"#), r#"url("odd\"name.ttf")"#);
    }
}
