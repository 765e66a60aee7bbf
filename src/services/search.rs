use crate::configuration::{SearchSettings, Settings};
use crate::domain::{QueryKind, SearchOutcome, SearchQuery};
use crate::services::captcha::{resolve_captcha, ChallengeResolver};
use crate::services::droid::Droid;
use crate::services::error::SearchError;
use crate::services::results::{await_results, parse_detail, parse_summaries, results_container_id};

/// Runs one full search against the portal: open session, submit query,
/// clear the CAPTCHA, extract by query kind. The browser session is torn
/// down on every exit path, including CAPTCHA exhaustion.
pub async fn search_company(
    query: SearchQuery,
    settings: &Settings,
    resolver: &mut impl ChallengeResolver,
) -> Result<SearchOutcome, SearchError> {
    let droid = Droid::new(&settings.webdriver, settings.search.element_wait()).await?;

    let result = run_search(&droid, &query, &settings.search, resolver).await;

    if let Err(e) = droid.quit().await {
        log::error!("Failed to close the browser session: {}", e);
    }

    result
}

async fn run_search(
    droid: &Droid,
    query: &SearchQuery,
    search: &SearchSettings,
    resolver: &mut impl ChallengeResolver,
) -> Result<SearchOutcome, SearchError> {
    droid.open_and_search(query).await?;

    resolve_captcha(
        droid,
        resolver,
        search.captcha_settle(),
        search.max_captcha_attempts,
    )
    .await?;

    // Let the results render before snapshotting the page: the lookup
    // polls under the implicit wait, so the snapshot is taken from a
    // settled page (or a legitimate zero-results one)
    await_results(droid, results_container_id(query.kind())).await?;

    let html = droid.page_source().await?;

    let outcome = match query.kind() {
        QueryKind::Nire => match parse_detail(&html)? {
            Some(detail) => SearchOutcome::Detail(detail),
            None => SearchOutcome::NoResults,
        },
        QueryKind::Name => match parse_summaries(&html)? {
            Some(summaries) => SearchOutcome::Summaries(summaries),
            None => SearchOutcome::NoResults,
        },
    };

    Ok(outcome)
}
