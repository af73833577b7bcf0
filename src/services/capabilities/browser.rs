//! Browser Capability
//!
//! `DisabledBrowser` is the default: it reports no sessions and refuses to open
//! one. The real implementation, `CdpBrowser`, drives Chromium over the
//! DevTools protocol and is gated behind `#[cfg(feature = "browser")]` to
//! avoid pulling in chromiumoxide by default.

use async_trait::async_trait;
use serde_json::Value;

use automation_hub_core::{
    BrowserCapability, BrowserSession, CoreError, CoreResult, SessionOptions,
};

#[cfg(feature = "browser")]
pub use cdp::CdpBrowser;

const DISABLED: &str = "browser automation is not enabled in this build";

/// Browser capability used when no browser backend is compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBrowser;

#[async_trait]
impl BrowserCapability for DisabledBrowser {
    async fn create_session(&self, _options: SessionOptions) -> CoreResult<String> {
        Err(CoreError::unavailable(DISABLED))
    }

    async fn navigate_to(&self, _session_id: &str, _url: &str) -> CoreResult<()> {
        Err(CoreError::unavailable(DISABLED))
    }

    async fn run_script(&self, _session_id: &str, _script: &str) -> CoreResult<Value> {
        Err(CoreError::unavailable(DISABLED))
    }

    async fn take_screenshot(&self, _session_id: &str, _full_page: bool) -> CoreResult<Vec<u8>> {
        Err(CoreError::unavailable(DISABLED))
    }

    async fn close_session(&self, session_id: &str) -> CoreResult<()> {
        Err(CoreError::not_found(format!("Browser session {session_id}")))
    }

    async fn list_sessions(&self) -> CoreResult<Vec<BrowserSession>> {
        Ok(Vec::new())
    }
}

#[cfg(feature = "browser")]
mod cdp {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::page::ScreenshotParams;
    use chromiumoxide::Page;
    use futures::StreamExt;
    use serde_json::Value;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;
    use tracing::{debug, warn};
    use uuid::Uuid;

    use automation_hub_core::{
        BrowserCapability, BrowserSession, CoreError, CoreResult, SessionOptions,
    };

    struct CdpSession {
        browser: Browser,
        page: Page,
        handler: JoinHandle<()>,
        current_url: Option<String>,
    }

    /// Chromium sessions over the DevTools protocol. One browser process per session.
    #[derive(Default)]
    pub struct CdpBrowser {
        sessions: Mutex<HashMap<String, CdpSession>>,
    }

    impl CdpBrowser {
        pub fn new() -> Self {
            Self::default()
        }
    }

    fn cdp_error(e: impl std::fmt::Display) -> CoreError {
        CoreError::browser(e.to_string())
    }

    fn unknown(session_id: &str) -> CoreError {
        CoreError::not_found(format!("Browser session {session_id}"))
    }

    #[async_trait]
    impl BrowserCapability for CdpBrowser {
        async fn create_session(&self, options: SessionOptions) -> CoreResult<String> {
            let mut builder =
                BrowserConfig::builder().window_size(options.viewport_width, options.viewport_height);
            if !options.headless {
                builder = builder.with_head();
            }
            let config = builder.build().map_err(CoreError::browser)?;

            let (browser, mut events) = Browser::launch(config).await.map_err(cdp_error)?;
            let handler = tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            let page = browser.new_page("about:blank").await.map_err(cdp_error)?;

            let id = format!("session-{}", Uuid::new_v4());
            debug!(session_id = %id, "Browser session created");
            self.sessions.lock().await.insert(
                id.clone(),
                CdpSession {
                    browser,
                    page,
                    handler,
                    current_url: None,
                },
            );
            Ok(id)
        }

        async fn navigate_to(&self, session_id: &str, url: &str) -> CoreResult<()> {
            let mut sessions = self.sessions.lock().await;
            let session = sessions.get_mut(session_id).ok_or_else(|| unknown(session_id))?;
            session.page.goto(url).await.map_err(cdp_error)?;
            session.current_url = Some(url.to_string());
            Ok(())
        }

        async fn run_script(&self, session_id: &str, script: &str) -> CoreResult<Value> {
            let sessions = self.sessions.lock().await;
            let session = sessions.get(session_id).ok_or_else(|| unknown(session_id))?;
            let result = session.page.evaluate(script).await.map_err(cdp_error)?;
            Ok(result.into_value::<Value>().unwrap_or(Value::Null))
        }

        async fn take_screenshot(&self, session_id: &str, full_page: bool) -> CoreResult<Vec<u8>> {
            let sessions = self.sessions.lock().await;
            let session = sessions.get(session_id).ok_or_else(|| unknown(session_id))?;
            session
                .page
                .screenshot(ScreenshotParams::builder().full_page(full_page).build())
                .await
                .map_err(cdp_error)
        }

        async fn close_session(&self, session_id: &str) -> CoreResult<()> {
            let mut session = self
                .sessions
                .lock()
                .await
                .remove(session_id)
                .ok_or_else(|| unknown(session_id))?;
            if let Err(e) = session.browser.close().await {
                warn!(session_id = %session_id, error = %e, "Browser did not close cleanly");
            }
            session.handler.abort();
            Ok(())
        }

        async fn list_sessions(&self) -> CoreResult<Vec<BrowserSession>> {
            Ok(self
                .sessions
                .lock()
                .await
                .iter()
                .map(|(id, s)| BrowserSession {
                    id: id.clone(),
                    current_url: s.current_url.clone(),
                })
                .collect())
        }
    }
}
