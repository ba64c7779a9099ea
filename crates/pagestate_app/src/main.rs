//! Demo shell: pages through an in-memory list with a threaded driver.
mod config;
mod list;
mod source;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pagestate_core::{Page, PageStateTag};
use pagestate_engine::{
    AsyncPageSource, DriverSettings, DriverSnapshot, PageStateDriver, ReachabilityGate, RetryOnce,
    StaticReachability,
};
use pagestate_logging::{ps_error, ps_info};

use crate::config::{load_config, AppConfig, DEFAULT_CONFIG_FILENAME};
use crate::list::ListCollector;
use crate::source::InMemorySource;

type DemoPage = Page<u32>;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));
    let config = load_config(&config_path).context("loading demo configuration")?;
    if !pagestate_logging::initialize(config.log_destination(), config.log_level()) {
        eprintln!("Warning: logging is disabled");
    }
    ps_info!("Using configuration from {:?}", config_path);

    let list = Arc::new(ListCollector::default());
    let snapshot = run(&config, &list)?;

    println!("state:        {}", snapshot.state);
    println!("current page: {}", snapshot.current_page);
    println!("no more:      {}", snapshot.no_more);
    println!("rows:         {}", list.rows().len());
    if let Some(err) = snapshot.state.error() {
        println!("error:        {err}");
    }
    Ok(())
}

fn build_source(config: &AppConfig) -> Arc<dyn AsyncPageSource<DemoPage>> {
    let source = InMemorySource::new(
        config.total_items,
        config.page_size,
        config.cursor.page_base(),
        Duration::from_millis(config.latency_ms),
    )
    .with_flaky_page(config.flaky_page);
    let gated = ReachabilityGate::new(source, Arc::new(StaticReachability::new(config.online)));
    if config.retry {
        Arc::new(RetryOnce::new(gated))
    } else {
        Arc::new(gated)
    }
}

/// Loads the first page, then more pages until the list settles.
fn run(config: &AppConfig, list: &Arc<ListCollector>) -> anyhow::Result<DriverSnapshot<DemoPage>> {
    let settings = DriverSettings {
        guard_in_flight: config.guard_in_flight,
    };
    let driver = PageStateDriver::new(build_source(config), config.cursor, settings)?;
    driver.subscribe(list)?;
    let wait = Duration::from_secs(config.wait_secs);

    let mut before = driver.snapshot();
    driver.start_loading()?;
    loop {
        let snapshot = settle(&driver, &before, wait)?;
        match snapshot.state.tag() {
            PageStateTag::NoMore | PageStateTag::Empty => break,
            PageStateTag::Error => {
                ps_error!("Stopping after a failed load");
                break;
            }
            _ => {}
        }
        before = snapshot;
        driver.load_more()?;
    }

    let snapshot = driver.snapshot();
    driver.shutdown()?;
    Ok(snapshot)
}

/// Waits for the command sent after `before` to finish: nothing in flight and
/// either a new state or a moved cursor.
fn settle(
    driver: &PageStateDriver<DemoPage>,
    before: &DriverSnapshot<DemoPage>,
    wait: Duration,
) -> anyhow::Result<DriverSnapshot<DemoPage>> {
    driver
        .wait_for(wait, |snapshot| {
            snapshot.in_flight == 0
                && !snapshot.state.is_loading()
                && (snapshot.state.tag() != before.state.tag()
                    || snapshot.current_page != before.current_page)
        })
        .with_context(|| format!("no page state change within {wait:?}"))
}
