//! Page and element helpers
//!
//! The consumer layer on top of the dispatcher: selector-based element
//! lookup plus typed wrappers for the catalogued operations. Every remote
//! interaction here flows through [`dispatch_on_element`] or
//! [`dispatch_on_page`]; nothing bypasses the catalogs.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{json, Value};

use crate::cdp::Session;
use crate::dispatch::{dispatch_on_element, dispatch_on_page};
use crate::error::{Error, Result};

/// Scroll offset of the page's viewport
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

/// Inner size of the page's viewport
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

/// Bounding rectangle of an element, in viewport coordinates
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A browser page backed by an attached CDP session
pub struct Page {
    session: Session,
}

impl Page {
    /// Wrap an attached session
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Get the underlying CDP session
    pub fn session(&self) -> &Session {
        &self.session
    }

    // =========================================================================
    // Element Finding
    // =========================================================================

    /// Find an element by CSS selector
    pub async fn find(&self, selector: &str) -> Result<Element<'_>> {
        let doc = self.session.get_document(Some(0)).await?;
        let node_id = self.session.query_selector(doc.node_id, selector).await?;

        if node_id == 0 {
            return Err(Error::ElementNotFound(selector.to_string()));
        }

        Ok(Element {
            page: self,
            node_id,
        })
    }

    /// Find all elements matching a CSS selector
    pub async fn find_all(&self, selector: &str) -> Result<Vec<Element<'_>>> {
        let doc = self.session.get_document(Some(0)).await?;
        let node_ids = self
            .session
            .query_selector_all(doc.node_id, selector)
            .await?;

        Ok(node_ids
            .into_iter()
            .filter(|&id| id != 0)
            .map(|node_id| Element {
                page: self,
                node_id,
            })
            .collect())
    }

    /// Check if an element exists
    #[must_use = "returns true if element exists"]
    pub async fn exists(&self, selector: &str) -> bool {
        self.find(selector).await.is_ok()
    }

    /// Wait for an element to appear in the DOM
    pub async fn wait_for(&self, selector: &str, timeout_ms: u64) -> Result<Element<'_>> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            if let Ok(element) = self.find(selector).await {
                return Ok(element);
            }

            if start.elapsed() > timeout {
                return Err(Error::Timeout(format!(
                    "element '{selector}' not found within {timeout_ms}ms"
                )));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    // =========================================================================
    // Page Operations
    // =========================================================================

    /// Current document readiness ("loading", "interactive" or "complete")
    pub async fn ready_state(&self) -> Result<String> {
        let value = dispatch_on_page(&self.session, "readyState", &[]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Wait until the document is fully loaded
    pub async fn wait_for_ready(&self, timeout_ms: u64) -> Result<()> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            // readyState can be briefly unavailable mid-navigation; keep polling
            if let Ok(state) = self.ready_state().await {
                if state == "complete" {
                    return Ok(());
                }
            }

            if start.elapsed() > timeout {
                return Err(Error::Timeout(format!(
                    "document not ready within {timeout_ms}ms"
                )));
            }

            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Current scroll offset of the viewport
    pub async fn scroll_position(&self) -> Result<ScrollPosition> {
        from_value(dispatch_on_page(&self.session, "scrollPosition", &[]).await?)
    }

    /// Scroll the viewport to the given offset
    pub async fn scroll_to(&self, x: f64, y: f64) -> Result<()> {
        dispatch_on_page(&self.session, "scrollTo", &[json!(x), json!(y)]).await?;
        Ok(())
    }

    /// Inner size of the viewport
    pub async fn viewport_size(&self) -> Result<ViewportSize> {
        from_value(dispatch_on_page(&self.session, "viewportSize", &[]).await?)
    }
}

/// An element on the page
pub struct Element<'a> {
    page: &'a Page,
    node_id: i32,
}

impl Element<'_> {
    /// The CDP node id backing this element
    pub fn node_id(&self) -> i32 {
        self.node_id
    }

    async fn op(&self, operation: &str, params: &[Value]) -> Result<Value> {
        dispatch_on_element(&self.page.session, self.node_id, operation, params).await
    }

    /// Click this element
    pub async fn click(&self) -> Result<()> {
        self.op("click", &[]).await?;
        Ok(())
    }

    /// Focus this element
    pub async fn focus(&self) -> Result<()> {
        self.op("focus", &[]).await?;
        Ok(())
    }

    /// Set an input's value.
    ///
    /// The text is delivered as a call argument and assigned as data on the
    /// remote side, so quotes and markup in `value` arrive verbatim.
    pub async fn set_value(&self, value: &str) -> Result<()> {
        self.op("setValue", &[json!(value)]).await?;
        Ok(())
    }

    /// Get inner text
    pub async fn text(&self) -> Result<String> {
        let value = self.op("getText", &[]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Get the value of an input element
    pub async fn value(&self) -> Result<String> {
        let value = self.op("getValue", &[]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Get an attribute value, or None if the attribute is absent
    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let value = self.op("getAttribute", &[json!(name)]).await?;
        Ok(value.as_str().map(String::from))
    }

    /// Set an attribute value
    pub async fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        self.op("setAttribute", &[json!(name), json!(value)]).await?;
        Ok(())
    }

    /// Check if the element is rendered and not hidden by CSS
    #[must_use = "returns visibility state"]
    pub async fn is_visible(&self) -> Result<bool> {
        let value = self.op("isVisible", &[]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Check if the element is enabled (not disabled)
    pub async fn is_enabled(&self) -> Result<bool> {
        let value = self.op("isEnabled", &[]).await?;
        Ok(value.as_bool().unwrap_or(true))
    }

    /// Check if a checkbox/radio is checked
    pub async fn is_checked(&self) -> Result<bool> {
        let value = self.op("isChecked", &[]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Select the option with the given value on a select element
    pub async fn select_option(&self, value: &str) -> Result<()> {
        self.op("selectOption", &[json!(value)]).await?;
        Ok(())
    }

    /// Extract named field values from a form element
    pub async fn form_data(&self) -> Result<HashMap<String, String>> {
        from_value(self.op("formData", &[]).await?)
    }

    /// Scroll this element into view
    pub async fn scroll_into_view(&self) -> Result<()> {
        self.op("scrollIntoView", &[]).await?;
        Ok(())
    }

    /// Bounding rectangle in viewport coordinates
    pub async fn rect(&self) -> Result<Rect> {
        from_value(self.op("getRect", &[]).await?)
    }

    /// Dispatch a `dragstart` event on this element
    pub async fn drag_start(&self) -> Result<()> {
        self.op("dragStart", &[]).await?;
        Ok(())
    }

    /// Dispatch a `drop` event on this element
    pub async fn drag_drop(&self) -> Result<()> {
        self.op("drop", &[]).await?;
        Ok(())
    }

    /// Dispatch a `keydown` event with the given key
    pub async fn key_down(&self, key: &str) -> Result<()> {
        self.op("keyDown", &[json!(key)]).await?;
        Ok(())
    }

    /// Dispatch a `keyup` event with the given key
    pub async fn key_up(&self, key: &str) -> Result<()> {
        self.op("keyUp", &[json!(key)]).await?;
        Ok(())
    }
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}
