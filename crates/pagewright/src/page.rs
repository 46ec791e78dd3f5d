//! Page Object Model support
//!
//! A page object exposes semantic operations over one page of the site and
//! declares how to tell that the page is ready. Raw selectors stay private to
//! the page object.
//!
//! ## Toyota Way Application:
//! - **Poka-Yoke**: Readiness is declared once, checked the same way everywhere
//! - **Muda**: Page logic lives in one place instead of every scenario
//!
//! # Example
//!
//! ```ignore
//! struct WhereToBuyPage {
//!     ctx: Arc<PageContext>,
//!     ready: ReadinessSet,
//! }
//!
//! #[async_trait]
//! impl PageObject for WhereToBuyPage {
//!     fn name(&self) -> &str {
//!         "where to buy"
//!     }
//!
//!     fn context(&self) -> &PageContext {
//!         &self.ctx
//!     }
//!
//!     fn readiness(&self) -> &ReadinessSet {
//!         &self.ready
//!     }
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::context::PageContext;
use crate::readiness::{Readiness, ReadinessSet};
use crate::result::PagewrightResult;

/// A page (or page region) of the site under test
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Page name for logging
    fn name(&self) -> &str;

    /// Session the page acts on
    fn context(&self) -> &PageContext;

    /// Signals that the page is ready
    fn readiness(&self) -> &ReadinessSet;

    /// Whether every readiness condition must hold, instead of any one
    fn requires_all(&self) -> bool {
        false
    }

    /// Budget for [`Self::is_loaded`]
    fn load_timeout(&self) -> Duration {
        self.context().timeouts().expect()
    }

    /// Wait until the page is ready, reporting which signal fired
    async fn wait_until_loaded(&self) -> PagewrightResult<Readiness> {
        let detector = self.context().detector();
        let ready = if self.requires_all() {
            detector.await_all(self.readiness(), self.load_timeout()).await
        } else {
            detector.await_ready(self.readiness(), self.load_timeout()).await
        };
        if let Ok(ready) = &ready {
            debug!(page = self.name(), fired = %ready.fired, "page loaded");
        }
        ready
    }

    /// Whether the page becomes ready within its budget; always terminates
    async fn is_loaded(&self) -> bool {
        self.wait_until_loaded().await.is_ok()
    }
}
