//! Chromium driver over the DevTools protocol.
//!
//! With the `browser` feature, [`ChromiumDriver`] launches Chromium (or
//! attaches to a running one via `BROWSER_WS_URL`) with chromiumoxide and
//! implements [`crate::UiDriver`] on a single page.
//!
//! Element handles live in a per-driver registry inside the page. A handle is
//! an id into that registry. Once its node leaves the document, or the page
//! navigates and the registry is gone, operations on it report
//! [`crate::HarnessError::Stale`].

#![cfg_attr(not(feature = "browser"), allow(dead_code))]

use crate::driver::ElementHandle;
use crate::locator::Selector;
use crate::result::{HarnessError, HarnessResult};
use serde_json::Value;

/// Page scripts for the element registry. Every script evaluates to
/// `{ok: value}` or `{stale: true}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegistryScripts {
    key: String,
}

impl RegistryScripts {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn quoted(value: &str) -> String {
        Value::String(value.to_string()).to_string()
    }

    fn registry(&self) -> String {
        let key = Self::quoted(&self.key);
        format!("(window[{key}] || (window[{key}] = {{ next: 0, els: new Map() }}))")
    }

    /// Resolve every match of `selector` under `scope` (or the document)
    pub(crate) fn find_all(&self, scope: Option<&ElementHandle>, selector: &Selector) -> String {
        let scope = scope.map_or_else(|| "null".to_string(), |s| Self::quoted(&s.id));
        let css = Self::quoted(&selector.to_css());
        let key = Self::quoted(&self.key);
        format!(
            "(() => {{ \
               const r = {registry}; \
               let root = document; \
               const scope = {scope}; \
               if (scope !== null) {{ \
                 root = r.els.get(scope); \
                 if (!root || !root.isConnected) return {{ stale: true }}; \
               }} \
               const found = Array.from(root.querySelectorAll({css})).map(el => {{ \
                 if (!el[{key}]) {{ el[{key}] = 'e' + (r.next++); r.els.set(el[{key}], el); }} \
                 return {{ id: el[{key}], tag: el.tagName }}; \
               }}); \
               return {{ ok: found }}; \
             }})()",
            registry = self.registry(),
        )
    }

    /// Evaluate `body` (an expression over `el`) against a registered element
    pub(crate) fn on_element(&self, element: &ElementHandle, body: &str) -> String {
        let key = Self::quoted(&self.key);
        let id = Self::quoted(&element.id);
        format!(
            "(() => {{ \
               const r = window[{key}]; \
               const el = r && r.els.get({id}); \
               if (!el || !el.isConnected) return {{ stale: true }}; \
               return {{ ok: ({body}) }}; \
             }})()"
        )
    }

    pub(crate) fn text(&self, element: &ElementHandle) -> String {
        self.on_element(element, "(el.innerText || el.textContent || '').trim()")
    }

    pub(crate) fn attribute(&self, element: &ElementHandle, name: &str) -> String {
        self.on_element(element, &format!("el.getAttribute({})", Self::quoted(name)))
    }

    pub(crate) fn is_displayed(&self, element: &ElementHandle) -> String {
        self.on_element(
            element,
            "!!(el.offsetWidth || el.offsetHeight || el.getClientRects().length) \
             && getComputedStyle(el).visibility !== 'hidden'",
        )
    }

    pub(crate) fn click(&self, element: &ElementHandle) -> String {
        self.on_element(element, "(el.scrollIntoView({ block: 'center' }), el.click(), true)")
    }

    pub(crate) fn focus(&self, element: &ElementHandle) -> String {
        self.on_element(element, "(el.focus(), true)")
    }

    pub(crate) fn select_all(&self, element: &ElementHandle) -> String {
        self.on_element(
            element,
            "(el.focus(), typeof el.select === 'function' \
               ? el.select() : document.execCommand('selectAll'), true)",
        )
    }
}

/// Unwrap a registry script reply
pub(crate) fn unwrap_reply(reply: Value, element: Option<&ElementHandle>) -> HarnessResult<Value> {
    if reply.get("stale").and_then(Value::as_bool) == Some(true) {
        let detail = element.map_or_else(
            || "scope element".to_string(),
            |e| format!("<{}> {}", e.tag_name, e.id),
        );
        return Err(HarnessError::stale(format!("{detail} is no longer attached")));
    }
    match reply {
        Value::Object(mut map) => map
            .remove("ok")
            .ok_or_else(|| HarnessError::driver("malformed registry reply")),
        other => Err(HarnessError::driver(format!("unexpected registry reply {other}"))),
    }
}

/// Handles from a `find_all` reply value
pub(crate) fn parse_handles(value: Value) -> HarnessResult<Vec<ElementHandle>> {
    #[derive(serde::Deserialize)]
    struct Found {
        id: String,
        tag: String,
    }
    let found: Vec<Found> = serde_json::from_value(value)?;
    Ok(found
        .into_iter()
        .map(|f| ElementHandle::new(f.id, f.tag))
        .collect())
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;

#[cfg(feature = "browser")]
mod cdp {
    use super::{parse_handles, unwrap_reply, RegistryScripts};
    use crate::config::{HarnessConfig, MAXIMIZED_VIEWPORT};
    use crate::driver::{ElementHandle, UiDriver};
    use crate::locator::Selector;
    use crate::result::{HarnessError, HarnessResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
    use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tracing::{debug, info};

    /// Opens DevTools alongside each tab
    const DEVTOOLS_ARG: &str = "--auto-open-devtools-for-tabs";

    fn driver_err(e: impl std::fmt::Display) -> HarnessError {
        HarnessError::driver(e.to_string())
    }

    /// Chromium session driving a single page
    #[derive(Debug)]
    pub struct ChromiumDriver {
        browser: Arc<Mutex<CdpBrowser>>,
        page: CdpPage,
        scripts: RegistryScripts,
        #[allow(dead_code)]
        handle: tokio::task::JoinHandle<()>,
    }

    impl ChromiumDriver {
        /// Launch Chromium, or attach when `browser_ws_url` is set
        ///
        /// # Errors
        ///
        /// Returns error if the browser cannot be launched or reached
        pub async fn start(config: &HarnessConfig) -> HarnessResult<Self> {
            let launch_err = |e: &dyn std::fmt::Display| HarnessError::BrowserLaunch {
                message: e.to_string(),
            };

            let (browser, mut handler) = if let Some(url) = &config.browser_ws_url {
                info!(url, "attaching to remote browser");
                CdpBrowser::connect(url.as_str())
                    .await
                    .map_err(|e| launch_err(&e))?
            } else {
                let mut builder = CdpConfig::builder().window_size(MAXIMIZED_VIEWPORT.0, MAXIMIZED_VIEWPORT.1);
                if !config.headless {
                    builder = builder.with_head();
                }
                if config.show_devtools {
                    builder = builder.arg(DEVTOOLS_ARG);
                }
                if let Some(path) = &config.chromium_path {
                    builder = builder.chrome_executable(path);
                }
                let cdp_config = builder.build().map_err(|e| launch_err(&e))?;
                info!(headless = config.headless, devtools = config.show_devtools, "launching chromium");
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| launch_err(&e))?
            };

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| launch_err(&e))?;

            Ok(Self {
                browser: Arc::new(Mutex::new(browser)),
                page,
                scripts: RegistryScripts::new(format!("__harness_{}", uuid::Uuid::new_v4().simple())),
                handle,
            })
        }

        async fn evaluate(&self, script: String) -> HarnessResult<Value> {
            let result = self.page.evaluate(script).await.map_err(driver_err)?;
            Ok(result.value().cloned().unwrap_or(Value::Null))
        }

        async fn element_op(&self, element: &ElementHandle, script: String) -> HarnessResult<Value> {
            unwrap_reply(self.evaluate(script).await?, Some(element))
        }
    }

    #[async_trait]
    impl UiDriver for ChromiumDriver {
        async fn navigate(&self, url: &str) -> HarnessResult<()> {
            debug!(url, "navigate");
            self.page.goto(url).await.map_err(driver_err)?;
            Ok(())
        }

        async fn title(&self) -> HarnessResult<String> {
            Ok(self
                .page
                .get_title()
                .await
                .map_err(driver_err)?
                .unwrap_or_default())
        }

        async fn find_all(
            &self,
            scope: Option<&ElementHandle>,
            selector: &Selector,
        ) -> HarnessResult<Vec<ElementHandle>> {
            let reply = self.evaluate(self.scripts.find_all(scope, selector)).await?;
            parse_handles(unwrap_reply(reply, scope)?)
        }

        async fn text(&self, element: &ElementHandle) -> HarnessResult<String> {
            let value = self.element_op(element, self.scripts.text(element)).await?;
            Ok(value.as_str().unwrap_or_default().to_string())
        }

        async fn attribute(
            &self,
            element: &ElementHandle,
            name: &str,
        ) -> HarnessResult<Option<String>> {
            let value = self
                .element_op(element, self.scripts.attribute(element, name))
                .await?;
            Ok(value.as_str().map(str::to_string))
        }

        async fn is_displayed(&self, element: &ElementHandle) -> HarnessResult<bool> {
            let value = self
                .element_op(element, self.scripts.is_displayed(element))
                .await?;
            Ok(value.as_bool().unwrap_or(false))
        }

        async fn click(&self, element: &ElementHandle) -> HarnessResult<()> {
            self.element_op(element, self.scripts.click(element)).await?;
            Ok(())
        }

        async fn send_keys(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
            self.element_op(element, self.scripts.focus(element)).await?;
            self.page
                .execute(InsertTextParams::new(text))
                .await
                .map_err(driver_err)?;
            Ok(())
        }

        async fn select_all(&self, element: &ElementHandle) -> HarnessResult<()> {
            self.element_op(element, self.scripts.select_all(element)).await?;
            Ok(())
        }

        async fn execute_script(&self, script: &str) -> HarnessResult<Value> {
            self.evaluate(script.to_string()).await
        }

        async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let screenshot = self.page.execute(params).await.map_err(driver_err)?;

            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(driver_err)
        }

        async fn set_window_size(&self, width: u32, height: u32) -> HarnessResult<()> {
            let params = SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(width))
                .height(i64::from(height))
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(HarnessError::driver)?;
            self.page.execute(params).await.map_err(driver_err)?;
            Ok(())
        }

        async fn maximize(&self) -> HarnessResult<()> {
            let (width, height) = MAXIMIZED_VIEWPORT;
            self.set_window_size(width, height).await
        }

        async fn close(&self) -> HarnessResult<()> {
            let mut browser = self.browser.lock().await;
            browser.close().await.map_err(driver_err)?;
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scripts() -> RegistryScripts {
        RegistryScripts::new("__harness_test")
    }

    mod script_tests {
        use super::*;

        #[test]
        fn test_find_all_embeds_quoted_selector() {
            let script = scripts().find_all(None, &Selector::test_id(r#"a"b"#));
            assert!(script.contains(r#"querySelectorAll("[data-testid=\"a\\\"b\"]")"#));
            assert!(script.contains("const scope = null;"));
        }

        #[test]
        fn test_scoped_find_checks_attachment() {
            let scope = ElementHandle::new("e4", "tr");
            let script = scripts().find_all(Some(&scope), &Selector::tag("td"));
            assert!(script.contains(r#"const scope = "e4";"#));
            assert!(script.contains("isConnected"));
        }

        #[test]
        fn test_attribute_name_is_quoted() {
            let el = ElementHandle::new("e1", "th");
            let script = scripts().attribute(&el, "data-testid");
            assert!(script.contains(r#"el.getAttribute("data-testid")"#));
            assert!(script.contains(r#"r.els.get("e1")"#));
        }
    }

    mod reply_tests {
        use super::*;

        #[test]
        fn test_stale_reply_is_stale_error() {
            let el = ElementHandle::new("e9", "td");
            let err = unwrap_reply(json!({"stale": true}), Some(&el)).unwrap_err();
            assert!(err.is_stale());
            assert!(err.to_string().contains("e9"));
        }

        #[test]
        fn test_ok_reply_may_be_null() {
            assert_eq!(unwrap_reply(json!({"ok": null}), None).unwrap(), Value::Null);
        }

        #[test]
        fn test_malformed_reply_is_driver_error() {
            assert!(unwrap_reply(json!(3), None).is_err());
            assert!(unwrap_reply(json!({}), None).is_err());
        }

        #[test]
        fn test_parse_handles_normalizes_tag() {
            let handles = parse_handles(json!([{"id": "e0", "tag": "INPUT"}])).unwrap();
            assert_eq!(handles, vec![ElementHandle::new("e0", "input")]);
            assert!(handles[0].is_input());
        }
    }
}
