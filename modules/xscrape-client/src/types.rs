use serde::{Deserialize, Serialize};

/// One search to run. `category` selects the timeline product
/// ("Top", "Latest", "People", "Photos", "Videos").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchInput {
    pub category: String,
    pub query: String,
}

/// Account credentials for the fallback login flow.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub username: String,
    pub password: String,
}
