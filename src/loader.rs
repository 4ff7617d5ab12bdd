use crate::browser::PageDriver;
use crate::config::Settings;
use log::{debug, info};
use std::collections::HashSet;
use std::time::Duration;

/// Where incremental loading of one listing page ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLoadState {
    /// Distinct record identifiers materialized in the feed.
    pub loaded_count: usize,
    /// Consecutive loading rounds that produced no new identifiers.
    pub stable_rounds: u32,
}

fn distinct_count(ids: &[String]) -> usize {
    ids.iter().collect::<HashSet<_>>().len()
}

/// Drive the feed until its content stops growing.
///
/// Termination, first match wins:
/// - `stable_rounds` hits `stability_threshold` with the count already at
///   `early_exit_min_count` or more,
/// - `stable_rounds` hits `stability_cap` regardless of count,
/// - the count reaches `page_size_hint`,
/// - `scroll_max_attempts` is exhausted.
///
/// Never fails: any interaction error ends loading with whatever is already
/// materialized, as if the feed had gone stable.
pub async fn load_all<D: PageDriver>(driver: &D, settings: &Settings) -> PageLoadState {
    let settle = Duration::from_millis(settings.scroll_settle_ms);

    let mut loaded_count = match driver.card_ids().await {
        Ok(ids) => distinct_count(&ids),
        Err(e) => {
            debug!("Initial card count failed, treating feed as stable: {e:#}");
            return PageLoadState { loaded_count: 0, stable_rounds: 0 };
        }
    };
    debug!("Initial card count: {loaded_count}");

    if loaded_count >= settings.page_size_hint {
        info!("Feed already at page size hint ({loaded_count}), not scrolling");
        return PageLoadState { loaded_count, stable_rounds: 0 };
    }

    let mut stable_rounds = 0u32;

    for attempt in 1..=settings.scroll_max_attempts {
        if let Err(e) = driver.scroll_feed().await {
            debug!("Scroll failed, treating feed as stable: {e:#}");
            break;
        }
        driver.settle(settle).await;

        let count = match driver.card_ids().await {
            Ok(ids) => distinct_count(&ids),
            Err(e) => {
                debug!("Card recount failed, treating feed as stable: {e:#}");
                break;
            }
        };
        debug!("After scroll {attempt}: {count} cards");

        if count == loaded_count {
            stable_rounds += 1;
            if stable_rounds >= settings.stability_threshold
                && count >= settings.early_exit_min_count
            {
                info!("Feed stable for {stable_rounds} rounds at {count} cards, stopping early");
                break;
            }
            if stable_rounds >= settings.stability_cap {
                info!("Feed stable for {stable_rounds} rounds, stopping");
                break;
            }
        } else {
            stable_rounds = 0;
            loaded_count = count;
        }

        if loaded_count >= settings.page_size_hint {
            info!("Feed reached page size hint ({loaded_count} cards), stopping");
            break;
        }
    }

    PageLoadState { loaded_count, stable_rounds }
}
