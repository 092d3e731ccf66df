//! Browser usage report: requests grouped by the browser of their session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Number of requests issued by one `(browser, major version)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserUsage {
    pub browser: String,
    pub major_version: i32,
    pub count: u64,
}

impl BrowserUsage {
    /// Display label, e.g. `Firefox, version 3`.
    pub fn label(&self) -> String {
        format!("{}, version {}", self.browser, self.major_version)
    }
}

/// Counts pairs and orders the groups by descending count.
///
/// Ties are ordered by browser name, then version, so the output is stable.
pub fn tally<I>(pairs: I) -> Vec<BrowserUsage>
where
    I: IntoIterator<Item = (String, i32)>,
{
    let mut counts: HashMap<(String, i32), u64> = HashMap::new();
    for pair in pairs {
        *counts.entry(pair).or_default() += 1;
    }
    rank(
        counts
            .into_iter()
            .map(|((browser, major_version), count)| BrowserUsage {
                browser,
                major_version,
                count,
            }),
    )
}

/// Orders already-counted groups by descending count.
pub fn rank<I>(groups: I) -> Vec<BrowserUsage>
where
    I: IntoIterator<Item = BrowserUsage>,
{
    let mut groups: Vec<_> = groups.into_iter().collect();
    groups.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.browser.cmp(&b.browser))
            .then_with(|| a.major_version.cmp(&b.major_version))
    });
    groups
}
