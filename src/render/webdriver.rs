use crate::config::{Browser, CrawlConfig, Viewport};
use crate::render::{PageRenderer, RenderError, RenderedPage};
use async_trait::async_trait;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::wd::{TimeoutConfiguration, WindowHandle};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::path::Path;
use std::time::{Duration, Instant};

/// How often the readiness probe samples the page
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Consecutive identical samples needed to call the network idle
const IDLE_STABLE_SAMPLES: u32 = 2;

/// Extra time granted to the driver to report its own page-load timeout
const NAVIGATION_GRACE: Duration = Duration::from_secs(5);

const NETWORK_STATE_JS: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";

const PAGE_SIZE_JS: &str = "const d = document.documentElement; const b = document.body; \
     return [Math.max(d.scrollHeight, b ? b.scrollHeight : 0), \
     window.outerHeight - window.innerHeight];";

/// Renders pages through a WebDriver server (chromedriver, geckodriver, ...)
///
/// One browser session lives for the whole run. Every page session is a new
/// tab that is closed again when the page is done, while the initial tab
/// stays open so the session survives.
pub struct WebDriverRenderer {
    client: Client,
    home: WindowHandle,
    viewport: Viewport,
}

impl WebDriverRenderer {
    /// Connects to the WebDriver instance and prepares the browser window
    pub async fn connect(config: &CrawlConfig) -> Result<Self, RenderError> {
        let client = connect_to_webdriver(&config.webdriver_url, capabilities(config)).await?;

        client
            .set_window_size(config.viewport.width, config.viewport.height)
            .await?;
        client
            .update_timeouts(driver_timeouts(config.page_timeout()))
            .await?;
        let home = client.window().await?;

        ::log::info!(
            "Browser session ready ({:?}, viewport {}, mobile: {})",
            config.browser,
            config.viewport,
            config.mobile
        );

        Ok(Self {
            client,
            home,
            viewport: config.viewport,
        })
    }
}

#[async_trait]
impl PageRenderer for WebDriverRenderer {
    async fn new_page(&self) -> Result<Box<dyn RenderedPage>, RenderError> {
        let handle = open_tab(&self.client, &self.home).await?;

        Ok(Box::new(WebDriverPage {
            client: self.client.clone(),
            handle,
            home: self.home.clone(),
            viewport: self.viewport,
        }))
    }

    async fn shutdown(&self) -> Result<(), RenderError> {
        self.client.clone().close().await?;
        ::log::debug!("Closed browser session");
        Ok(())
    }
}

/// A browser tab owned by one capture or link-discovery pass
struct WebDriverPage {
    client: Client,
    handle: WindowHandle,
    home: WindowHandle,
    viewport: Viewport,
}

#[async_trait]
impl RenderedPage for WebDriverPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        // The driver aborts navigation itself after the page-load timeout set
        // in `connect`; this guard only covers a driver that never answers.
        match tokio::time::timeout(timeout + NAVIGATION_GRACE, self.client.goto(url)).await {
            Ok(result) => result.map_err(|e| command_error(e, timeout)),
            Err(_) => Err(RenderError::Timeout(timeout)),
        }
    }

    async fn wait_ready(
        &mut self,
        selector: Option<&str>,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        wait_for_network_idle(&self.client, timeout).await?;

        if let Some(selector) = selector {
            self.client
                .wait()
                .at_most(timeout)
                .for_element(Locator::Css(selector))
                .await
                .map_err(|e| command_error(e, timeout))?;
        }
        Ok(())
    }

    async fn visible_heading(&mut self) -> Result<Option<String>, RenderError> {
        let Some(heading) = found(self.client.find(Locator::Css("h1")).await)? else {
            return Ok(None);
        };

        if !heading.is_displayed().await? {
            return Ok(None);
        }
        Ok(Some(heading.text().await?))
    }

    async fn title(&mut self) -> Result<String, RenderError> {
        Ok(self.client.title().await?)
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), RenderError> {
        // WebDriver only captures the viewport, so the window is grown to the
        // document height for the shot and restored afterwards.
        let size = self.client.execute(PAGE_SIZE_JS, vec![]).await?;
        let doc_height = json_u32(&size[0]).unwrap_or(self.viewport.height);
        let chrome_height = json_u32(&size[1]).unwrap_or(0);
        let full_height = doc_height.max(self.viewport.height) + chrome_height;

        self.client
            .set_window_size(self.viewport.width, full_height)
            .await?;
        let shot = self.client.screenshot().await;
        self.client
            .set_window_size(self.viewport.width, self.viewport.height)
            .await?;

        tokio::fs::write(path, shot?)
            .await
            .map_err(|source| RenderError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        Ok(self.client.source().await?)
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        release_tab(&self.client, &self.handle, &self.home).await
    }
}

/// The window operations used to manage page tabs
#[async_trait]
trait Tabs: Sync {
    async fn open(&self) -> Result<WindowHandle, CmdError>;
    async fn current(&self) -> Result<WindowHandle, CmdError>;
    async fn switch_to(&self, handle: WindowHandle) -> Result<(), CmdError>;
    async fn close_current(&self) -> Result<(), CmdError>;
}

#[async_trait]
impl Tabs for Client {
    async fn open(&self) -> Result<WindowHandle, CmdError> {
        Ok(self.new_window(true).await?.handle)
    }

    async fn current(&self) -> Result<WindowHandle, CmdError> {
        self.window().await
    }

    async fn switch_to(&self, handle: WindowHandle) -> Result<(), CmdError> {
        self.switch_to_window(handle).await
    }

    async fn close_current(&self) -> Result<(), CmdError> {
        self.close_window().await
    }
}

/// Opens a tab and focuses it. A tab that cannot be focused is closed again.
async fn open_tab<T: Tabs + ?Sized>(
    tabs: &T,
    home: &WindowHandle,
) -> Result<WindowHandle, RenderError> {
    let handle = tabs.open().await?;
    if let Err(e) = tabs.switch_to(handle.clone()).await {
        if let Err(close_error) = release_tab(tabs, &handle, home).await {
            ::log::warn!("Failed to close unused tab: {}", close_error);
        }
        return Err(e.into());
    }
    Ok(handle)
}

/// Closes `handle` and focuses the home tab again
async fn release_tab<T: Tabs + ?Sized>(
    tabs: &T,
    handle: &WindowHandle,
    home: &WindowHandle,
) -> Result<(), RenderError> {
    if tabs.current().await? != *handle {
        tabs.switch_to(handle.clone()).await?;
    }
    tabs.close_current().await?;
    tabs.switch_to(home.clone()).await?;
    Ok(())
}

/// Session timeouts: navigation gives up after `page_timeout`, element lookups
/// never wait implicitly
fn driver_timeouts(page_timeout: Duration) -> TimeoutConfiguration {
    TimeoutConfiguration::new(None, Some(page_timeout), Some(Duration::ZERO))
}

/// Turns a "no such element" answer into `None`
fn found<T>(result: Result<T, CmdError>) -> Result<Option<T>, RenderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_no_such_element() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Polls until the document has loaded and no new resources are being fetched
async fn wait_for_network_idle(client: &Client, timeout: Duration) -> Result<(), RenderError> {
    let deadline = Instant::now() + timeout;
    let mut last_count = None;
    let mut stable = 0;

    loop {
        let state = client.execute(NETWORK_STATE_JS, vec![]).await?;
        let complete = state[0].as_str() == Some("complete");
        let count = state[1].as_u64();

        if complete && count.is_some() && count == last_count {
            stable += 1;
            if stable >= IDLE_STABLE_SAMPLES {
                return Ok(());
            }
        } else {
            stable = 0;
        }
        last_count = count;

        if Instant::now() + IDLE_POLL_INTERVAL > deadline {
            return Err(RenderError::Timeout(timeout));
        }
        tokio::time::sleep(IDLE_POLL_INTERVAL).await;
    }
}

/// Maps WebDriver timeouts onto [`RenderError::Timeout`]
fn command_error(error: CmdError, timeout: Duration) -> RenderError {
    match error {
        CmdError::WaitTimeout => RenderError::Timeout(timeout),
        CmdError::Standard(ref e)
            if matches!(e.error, ErrorStatus::Timeout | ErrorStatus::ScriptTimeout) =>
        {
            RenderError::Timeout(timeout)
        }
        e => RenderError::WebDriver(e),
    }
}

fn json_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|v| u32::try_from(v).ok())
}

/// Builds the session capabilities for the configured browser
pub fn capabilities(config: &CrawlConfig) -> Map<String, Value> {
    let mut caps = Map::new();
    match config.browser {
        Browser::Chrome => {
            let mut args = vec![
                "--disable-gpu".to_string(),
                "--hide-scrollbars".to_string(),
                format!(
                    "--window-size={},{}",
                    config.viewport.width, config.viewport.height
                ),
            ];
            if config.headless {
                args.push("--headless=new".to_string());
            }
            if let Some(user_agent) = &config.user_agent {
                args.push(format!("--user-agent={user_agent}"));
            }

            let mut options = json!({ "args": args });
            if config.mobile {
                let mut emulation = json!({
                    "deviceMetrics": {
                        "width": config.viewport.width,
                        "height": config.viewport.height,
                        "pixelRatio": 3.0,
                        "touch": true,
                    }
                });
                if let Some(user_agent) = &config.user_agent {
                    emulation["userAgent"] = json!(user_agent);
                }
                options["mobileEmulation"] = emulation;
            }

            caps.insert("browserName".to_string(), json!("chrome"));
            caps.insert("goog:chromeOptions".to_string(), options);
        }
        Browser::Firefox => {
            if config.mobile {
                ::log::warn!("Mobile emulation is not supported by firefox, ignoring");
            }
            let mut options = json!({ "args": [] });
            if config.headless {
                options["args"] = json!(["-headless"]);
            }
            if let Some(user_agent) = &config.user_agent {
                options["prefs"] = json!({ "general.useragent.override": user_agent });
            }

            caps.insert("browserName".to_string(), json!("firefox"));
            caps.insert("moz:firefoxOptions".to_string(), options);
        }
    }
    caps
}

/// Connects to the WebDriver instance, trying the usual local ports if the
/// configured endpoint does not answer
async fn connect_to_webdriver(
    webdriver_url: &str,
    caps: Map<String, Value>,
) -> Result<Client, RenderError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(caps);

    let first_error = match builder.connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            e
        }
    };

    let fallback_urls = [
        "http://localhost:9515", // ChromeDriver default
        "http://localhost:4444", // geckodriver / Selenium default
        "http://127.0.0.1:4444", // Try with IP instead of localhost
    ];

    for url in fallback_urls.iter() {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = builder.connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(first_error.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fantoccini::error::WebDriver;
    use std::sync::Mutex;

    #[test]
    fn test_chrome_capabilities() {
        let mut config = CrawlConfig::new("https://example.com");
        config.mobile = true;
        config.user_agent = Some("TestAgent/1.0".to_string());

        let caps = capabilities(&config);
        assert_eq!(caps["browserName"], "chrome");

        let options = &caps["goog:chromeOptions"];
        let args: Vec<&str> = options["args"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|a| a.as_str())
            .collect();
        assert!(args.contains(&"--headless=new"));
        assert!(args.contains(&"--user-agent=TestAgent/1.0"));
        assert!(args.contains(&"--window-size=1440,900"));
        assert_eq!(options["mobileEmulation"]["deviceMetrics"]["width"], 1440);
        assert_eq!(options["mobileEmulation"]["userAgent"], "TestAgent/1.0");
    }

    #[test]
    fn test_firefox_capabilities() {
        let mut config = CrawlConfig::new("https://example.com");
        config.browser = Browser::Firefox;
        config.headless = false;
        config.user_agent = Some("TestAgent/1.0".to_string());

        let caps = capabilities(&config);
        assert_eq!(caps["browserName"], "firefox");
        let options = &caps["moz:firefoxOptions"];
        assert_eq!(options["args"], json!([]));
        assert_eq!(
            options["prefs"]["general.useragent.override"],
            "TestAgent/1.0"
        );
    }

    #[test]
    fn test_wait_timeout_maps_to_timeout() {
        let error = command_error(CmdError::WaitTimeout, Duration::from_secs(3));
        assert!(error.is_timeout());
    }

    fn driver_error(status: ErrorStatus) -> CmdError {
        CmdError::Standard(WebDriver::new(status, "driver error"))
    }

    #[test]
    fn test_driver_page_load_timeout_maps_to_timeout() {
        let timeout = Duration::from_secs(3);
        assert!(command_error(driver_error(ErrorStatus::Timeout), timeout).is_timeout());
        assert!(command_error(driver_error(ErrorStatus::ScriptTimeout), timeout).is_timeout());
        assert!(!command_error(driver_error(ErrorStatus::UnknownError), timeout).is_timeout());
    }

    #[test]
    fn test_driver_timeouts_bound_navigation() {
        let timeouts = driver_timeouts(Duration::from_secs(45));
        assert_eq!(timeouts.page_load(), Some(Duration::from_secs(45)));
        assert_eq!(timeouts.implicit(), Some(Duration::ZERO));
        assert_eq!(timeouts.script(), None);
    }

    #[test]
    fn test_missing_element_is_none() {
        let missing: Result<(), CmdError> = Err(driver_error(ErrorStatus::NoSuchElement));
        assert!(matches!(found(missing), Ok(None)));

        assert!(matches!(found(Ok::<_, CmdError>(7)), Ok(Some(7))));

        let stale: Result<(), CmdError> = Err(driver_error(ErrorStatus::StaleElementReference));
        assert!(matches!(found(stale), Err(RenderError::WebDriver(_))));
    }

    fn handle(name: &str) -> WindowHandle {
        WindowHandle::try_from(name.to_string()).unwrap()
    }

    /// Scripted window state; `refused_switches` switches fail before any succeeds
    struct FakeTabs {
        state: Mutex<TabState>,
    }

    struct TabState {
        open: Vec<WindowHandle>,
        current: WindowHandle,
        refused_switches: usize,
        next_id: usize,
    }

    impl FakeTabs {
        fn new(refused_switches: usize) -> Self {
            Self {
                state: Mutex::new(TabState {
                    open: vec![handle("home")],
                    current: handle("home"),
                    refused_switches,
                    next_id: 1,
                }),
            }
        }

        fn open_tabs(&self) -> Vec<WindowHandle> {
            self.state.lock().unwrap().open.clone()
        }

        fn current_tab(&self) -> WindowHandle {
            self.state.lock().unwrap().current.clone()
        }
    }

    #[async_trait]
    impl Tabs for FakeTabs {
        async fn open(&self) -> Result<WindowHandle, CmdError> {
            let mut state = self.state.lock().unwrap();
            let tab = handle(&format!("tab-{}", state.next_id));
            state.next_id += 1;
            state.open.push(tab.clone());
            Ok(tab)
        }

        async fn current(&self) -> Result<WindowHandle, CmdError> {
            Ok(self.current_tab())
        }

        async fn switch_to(&self, target: WindowHandle) -> Result<(), CmdError> {
            let mut state = self.state.lock().unwrap();
            if state.refused_switches > 0 {
                state.refused_switches -= 1;
                return Err(driver_error(ErrorStatus::NoSuchWindow));
            }
            state.current = target;
            Ok(())
        }

        async fn close_current(&self) -> Result<(), CmdError> {
            let mut state = self.state.lock().unwrap();
            let current = state.current.clone();
            state.open.retain(|tab| *tab != current);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_tab_lifecycle() {
        let tabs = FakeTabs::new(0);
        let home = handle("home");

        let tab = open_tab(&tabs, &home).await.unwrap();
        assert_eq!(tabs.current_tab(), tab);
        assert_eq!(tabs.open_tabs().len(), 2);

        release_tab(&tabs, &tab, &home).await.unwrap();
        assert_eq!(tabs.open_tabs(), vec![home.clone()]);
        assert_eq!(tabs.current_tab(), home);
    }

    #[tokio::test]
    async fn test_unfocused_tab_is_closed() {
        let tabs = FakeTabs::new(1);
        let home = handle("home");

        let result = open_tab(&tabs, &home).await;
        assert!(matches!(result, Err(RenderError::WebDriver(_))));
        assert_eq!(tabs.open_tabs(), vec![home.clone()]);
        assert_eq!(tabs.current_tab(), home);
    }
}
