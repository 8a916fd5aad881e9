/// Default interval between file-list polls (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default location of the JSON user store
pub const DEFAULT_USERS_FILE: &str = "./data/users.json";

/// Default file delivered by the write-flow demo
pub const DEFAULT_PUSH_FILE: &str = "./assets/receipt.json";

// =============================================================================
// Error Messages
// =============================================================================

/// Error message when a route requires a userId query parameter
pub const ERR_MISSING_USER_ID: &str = "A userId query parameter is required";

/// Error message when a user has no stored record
pub const ERR_UNKNOWN_USER: &str = "No record exists for this user";

/// Error message when a push is attempted without a registered postbox
pub const ERR_NO_POSTBOX: &str = "No postbox is registered for this user";
