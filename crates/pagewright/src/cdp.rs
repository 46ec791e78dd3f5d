//! Chromium backend over the DevTools protocol.
//!
//! [`CdpDocument`] implements [`Document`] by evaluating generated
//! JavaScript in the page. Elements returned by `query` are stamped with a
//! `data-pw-handle` attribute; the stamp is the handle id, so a handle whose
//! element disappeared (or whose page navigated away) is reported as
//! [`PagewrightError::StaleElement`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SuiteConfig;
use crate::document::{BoundingBox, BoundingState, ClickMode, Document, ElementHandle};
use crate::readiness::LoadState;
use crate::result::{PagewrightError, PagewrightResult};
use crate::scenarios::DocumentFactory;
use crate::selector::{js_string, SelectorSpec};

/// Launched Chromium process
pub struct CdpBrowser {
    inner: Arc<Mutex<Browser>>,
    handler: JoinHandle<()>,
}

impl fmt::Debug for CdpBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdpBrowser").finish_non_exhaustive()
    }
}

impl CdpBrowser {
    /// Launch Chromium as described by `config`
    pub async fn launch(config: &SuiteConfig) -> PagewrightResult<Self> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|message| PagewrightError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            Browser::launch(cdp_config)
                .await
                .map_err(|e| PagewrightError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        info!(headless = config.headless, "browser launched");

        Ok(Self {
            inner: Arc::new(Mutex::new(browser)),
            handler,
        })
    }

    /// Open a blank page as a fresh document
    pub async fn new_document(&self) -> PagewrightResult<CdpDocument> {
        let browser = self.inner.lock().await;
        let page = browser.new_page("about:blank").await.map_err(driver)?;
        Ok(CdpDocument::new(page))
    }

    /// Close the browser and stop the event handler
    pub async fn close(self) -> PagewrightResult<()> {
        let mut browser = self.inner.lock().await;
        let _ = browser.close().await.map_err(driver)?;
        let _ = browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl DocumentFactory for CdpBrowser {
    async fn open(&self) -> PagewrightResult<Arc<dyn Document>> {
        Ok(Arc::new(self.new_document().await?))
    }
}

fn driver(error: impl fmt::Display) -> PagewrightError {
    PagewrightError::driver(error.to_string())
}

/// JavaScript expression yielding the stamped element, or `null`
fn element_expr(handle: &ElementHandle) -> String {
    format!(
        "document.querySelector({})",
        js_string(&format!("[data-pw-handle=\"{}\"]", handle.id))
    )
}

/// Wraps `body` so it runs with `el` bound, yielding a [`Probe`]
fn with_element(handle: &ElementHandle, body: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el || !el.isConnected) return {{ stale: true }}; \
         return {{ stale: false, value: (() => {{ {body} }})() }}; }})()",
        element_expr(handle)
    )
}

const VISIBLE_JS: &str = "const r = el.getBoundingClientRect(); \
     const s = getComputedStyle(el); \
     const visible = r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none' && s.opacity !== '0'; \
     const enabled = !el.disabled && el.getAttribute('aria-disabled') !== 'true';";

const DESCRIBE_JS: &str = "const describe = (n) => n.tagName.toLowerCase() + (n.id ? '#' + n.id : '') + \
     (typeof n.className === 'string' && n.className.trim() ? '.' + n.className.trim().split(/\\s+/).join('.') : '');";

const LOAD_STATE_JS: &str = "new Promise((resolve) => { \
     const settle = () => { \
       if (document.readyState !== 'complete') return resolve('domcontentloaded'); \
       const last = performance.getEntriesByType('resource').reduce((m, e) => Math.max(m, e.responseEnd), 0); \
       resolve(performance.now() - last >= 500 ? 'networkidle' : 'load'); \
     }; \
     if (document.readyState === 'loading') document.addEventListener('DOMContentLoaded', settle, { once: true }); \
     else settle(); \
   })";

#[derive(Debug, Deserialize)]
struct RawElement {
    id: String,
    tag: String,
    text: String,
    bbox: Option<BoundingBox>,
}

impl From<RawElement> for ElementHandle {
    fn from(raw: RawElement) -> Self {
        let mut handle = Self::new(raw.id, raw.tag);
        handle.text_content = Some(raw.text);
        handle.bounding_box = raw.bbox;
        handle
    }
}

#[derive(Debug, Deserialize)]
struct Probe<T> {
    #[serde(default)]
    stale: bool,
    value: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum HitTest {
    Ok,
    Hidden,
    Disabled,
    Intercepted { by: String },
}

/// A browser tab driven through generated JavaScript
#[derive(Debug, Clone)]
pub struct CdpDocument {
    page: Page,
    session: String,
}

impl CdpDocument {
    /// Wrap an open page
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self {
            page,
            session: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Underlying page
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> PagewrightResult<T> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(driver)?;
        let result = self.page.evaluate_expression(params).await.map_err(driver)?;
        result.into_value().map_err(driver)
    }

    /// Evaluate `body` against the element; `null` results come back as `None`
    async fn eval_on<T: DeserializeOwned>(
        &self,
        handle: &ElementHandle,
        body: &str,
    ) -> PagewrightResult<Option<T>> {
        let probe: Probe<T> = self.eval(with_element(handle, body)).await?;
        if probe.stale {
            return Err(PagewrightError::StaleElement {
                handle: handle.id.clone(),
            });
        }
        Ok(probe.value)
    }

    async fn require_interactable(&self, handle: &ElementHandle) -> PagewrightResult<()> {
        let state = self.state(handle).await?;
        if !state.attached {
            return Err(PagewrightError::StaleElement {
                handle: handle.id.clone(),
            });
        }
        if !state.visible || !state.enabled {
            return Err(PagewrightError::NotInteractable {
                handle: handle.id.clone(),
                message: if state.visible {
                    "element is disabled".to_string()
                } else {
                    "element is not visible".to_string()
                },
            });
        }
        Ok(())
    }

    async fn native(&self, handle: &ElementHandle) -> PagewrightResult<Element> {
        self.page
            .find_element(format!("[data-pw-handle=\"{}\"]", handle.id))
            .await
            .map_err(|_| PagewrightError::StaleElement {
                handle: handle.id.clone(),
            })
    }
}

#[async_trait]
impl Document for CdpDocument {
    async fn query(
        &self,
        spec: &SelectorSpec,
        within: Option<&ElementHandle>,
    ) -> PagewrightResult<Vec<ElementHandle>> {
        let root = within.map_or_else(|| "document".to_string(), element_expr);
        let script = format!(
            "(() => {{ \
               const root = {root}; \
               if (!root) return {{ stale: true }}; \
               const prefix = {session}; \
               const value = ({query}).map((el) => {{ \
                 if (!el.dataset.pwHandle) {{ \
                   window.__pagewrightSeq = (window.__pagewrightSeq || 0) + 1; \
                   el.dataset.pwHandle = prefix + '-' + window.__pagewrightSeq; \
                 }} \
                 const r = el.getBoundingClientRect(); \
                 return {{ \
                   id: el.dataset.pwHandle, \
                   tag: el.tagName.toLowerCase(), \
                   text: (el.innerText || el.textContent || '').trim(), \
                   bbox: r.width > 0 && r.height > 0 ? {{ x: r.x, y: r.y, width: r.width, height: r.height }} : null, \
                 }}; \
               }}); \
               return {{ stale: false, value }}; \
             }})()",
            session = js_string(&self.session),
            query = spec.to_query("root"),
        );
        let found: Probe<Vec<RawElement>> = self.eval(script).await?;
        if found.stale {
            return Err(PagewrightError::StaleElement {
                handle: within.map_or_else(|| "document".to_string(), |h| h.id.clone()),
            });
        }
        Ok(found
            .value
            .unwrap_or_default()
            .into_iter()
            .map(ElementHandle::from)
            .collect())
    }

    async fn state(&self, handle: &ElementHandle) -> PagewrightResult<BoundingState> {
        let body = format!("{VISIBLE_JS} return {{ visible, attached: true, enabled }};");
        match self.eval_on::<BoundingState>(handle, &body).await {
            Ok(state) => Ok(state.unwrap_or_default()),
            Err(PagewrightError::StaleElement { .. }) => Ok(BoundingState::default()),
            Err(e) => Err(e),
        }
    }

    async fn attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> PagewrightResult<Option<String>> {
        let body = format!("return el.getAttribute({});", js_string(name));
        self.eval_on(handle, &body).await
    }

    async fn inner_text(&self, handle: &ElementHandle) -> PagewrightResult<String> {
        Ok(self
            .eval_on(handle, "return el.innerText || el.textContent || '';")
            .await?
            .unwrap_or_default())
    }

    async fn input_value(&self, handle: &ElementHandle) -> PagewrightResult<String> {
        Ok(self
            .eval_on(handle, "return String(el.value ?? '');")
            .await?
            .unwrap_or_default())
    }

    async fn click(&self, handle: &ElementHandle, mode: ClickMode) -> PagewrightResult<()> {
        match mode {
            ClickMode::Dispatch => {
                debug!(%handle, "dispatching click");
                let _ = self.eval_on::<bool>(handle, "el.click(); return true;").await?;
                Ok(())
            }
            ClickMode::Normal => {
                let body = format!(
                    "el.scrollIntoView({{ block: 'center', inline: 'center' }}); \
                     {VISIBLE_JS} {DESCRIBE_JS} \
                     if (!visible) return {{ status: 'hidden' }}; \
                     if (!enabled) return {{ status: 'disabled' }}; \
                     const hit = document.elementFromPoint(r.x + r.width / 2, r.y + r.height / 2); \
                     if (hit && hit !== el && !el.contains(hit)) return {{ status: 'intercepted', by: describe(hit) }}; \
                     return {{ status: 'ok' }};"
                );
                let hit = self
                    .eval_on::<HitTest>(handle, &body)
                    .await?
                    .ok_or_else(|| PagewrightError::driver("hit test returned nothing"))?;
                match hit {
                    HitTest::Ok => {
                        let _ = self.native(handle).await?.click().await.map_err(driver)?;
                        Ok(())
                    }
                    HitTest::Hidden => Err(PagewrightError::NotInteractable {
                        handle: handle.id.clone(),
                        message: "element is not visible".to_string(),
                    }),
                    HitTest::Disabled => Err(PagewrightError::NotInteractable {
                        handle: handle.id.clone(),
                        message: "element is disabled".to_string(),
                    }),
                    HitTest::Intercepted { by } => Err(PagewrightError::ClickIntercepted {
                        handle: handle.id.clone(),
                        by,
                    }),
                }
            }
        }
    }

    async fn fill(&self, handle: &ElementHandle, text: &str) -> PagewrightResult<()> {
        self.require_interactable(handle).await?;
        let body = format!(
            "el.focus(); \
             const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
             const setter = Object.getOwnPropertyDescriptor(proto, 'value'); \
             if (setter && setter.set) setter.set.call(el, {text}); else el.value = {text}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;",
            text = js_string(text)
        );
        let _ = self.eval_on::<bool>(handle, &body).await?;
        Ok(())
    }

    async fn press(&self, handle: &ElementHandle, key: &str) -> PagewrightResult<()> {
        self.require_interactable(handle).await?;
        let element = self.native(handle).await?;
        let _ = element.focus().await.map_err(driver)?;
        let _ = element.press_key(key).await.map_err(driver)?;
        Ok(())
    }

    async fn hover(&self, handle: &ElementHandle) -> PagewrightResult<()> {
        self.require_interactable(handle).await?;
        let _ = self.native(handle).await?.hover().await.map_err(driver)?;
        Ok(())
    }

    async fn goto(&self, url: &str) -> PagewrightResult<()> {
        debug!(url, "goto");
        let _ = self.page.goto(url).await.map_err(driver)?;
        Ok(())
    }

    async fn current_url(&self) -> PagewrightResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(driver)?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn title(&self) -> PagewrightResult<String> {
        Ok(self.page.get_title().await.map_err(driver)?.unwrap_or_default())
    }

    async fn load_state(&self) -> PagewrightResult<LoadState> {
        let state: String = self.eval(LOAD_STATE_JS.to_string()).await?;
        Ok(match state.as_str() {
            "networkidle" => LoadState::NetworkIdle,
            "load" => LoadState::Load,
            _ => LoadState::DomContentLoaded,
        })
    }
}
