//! Default User-Agent for crawler traffic.
//!
//! Polite crawling: the default identifies the tool, its version and a
//! contact URL so origin operators can tell who is fetching their reports.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/pdf-harvester";

/// Default User-Agent for page fetches, probes and downloads.
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("pdf-harvester/{version} (research-crawler; +{PROJECT_UA_URL})")
}
