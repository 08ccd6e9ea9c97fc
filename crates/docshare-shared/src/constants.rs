use std::time::Duration;

/// How old the local catalog may get before a refresh is due (5 minutes)
pub const DEFAULT_STALENESS_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Upper bound on a single catalog fetch; a hung fetch releases the refresh gate after this
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// How long an aggregator keeps upstream work alive with zero subscribers
pub const DEFAULT_AGGREGATOR_GRACE: Duration = Duration::from_millis(5_000);

/// Interval between staleness checks in the headless sync agent
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Settings key holding the last successful refresh time (epoch millis)
pub const KEY_LAST_REFRESH_AT: &str = "catalog.last_refresh_at";

/// Category tag of exam papers
pub const DOC_TYPE_EXAM: &str = "exam";

/// Number of records in the "new documents" subset
pub const NEW_DOCUMENTS_LIMIT: usize = 10;
