//! Key namespace, polling defaults and well-known task identifiers.

/// Prefix shared by every pending task key in the store.
///
/// Records live under `<namespace>.<task-id>`, keeping them apart from
/// unrelated keys in the same origin-scoped store.
///
/// # Examples
///
/// ```
/// use pending_tasks::DEFAULT_NAMESPACE;
///
/// assert_eq!(DEFAULT_NAMESPACE, "__fxa_pending_tasks");
/// ```
pub const DEFAULT_NAMESPACE: &str = "__fxa_pending_tasks";

/// Separator between the namespace and the task id in a storage key.
pub const KEY_SEPARATOR: char = '.';

/// Delay between polls while another live tab owns a task, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// How long a tab may go without a heartbeat before it is considered gone,
/// in milliseconds.
pub const DEFAULT_TAB_TIMEOUT_MS: u64 = 20_000;

/// Task that finishes an OAuth flow once the user's email is verified.
///
/// The sign-up tab creates it; whichever tab retrieves it first (the
/// sign-up tab polling for verification, or the tab opened from the
/// verification link) sends the completion event.
pub const COMPLETE_OAUTH_FLOW_TASK: &str = "complete-oauth-flow";

/// Data key holding the key-fetch token for reliers that want keys.
pub const KEY_FETCH_TOKEN: &str = "keyFetchToken";

/// Data key holding the key used to unwrap `kB` for reliers that want keys.
pub const UNWRAP_B_KEY: &str = "unwrapBKey";
