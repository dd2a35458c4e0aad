//! Probe targets and scrape query parsing.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::TargetError;

/// Query keys carrying targets.
const TARGET_KEYS: [&str; 2] = ["target", "target[]"];

/// Query keys carrying metric name filters.
const NAME_KEYS: [&str; 2] = ["name[]", "name"];

/// A single NFS export to check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    /// NFS server host name or IPv4 address.
    pub host: String,
    /// Exported path on that server.
    pub path: String,
}

impl Target {
    /// Create a target from its parts.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }

    /// NFSv4 URI understood by `nfs-ls`.
    pub fn nfs_uri(&self) -> String {
        format!("nfs://{}{}?version=4", self.host, self.path)
    }
}

impl FromStr for Target {
    type Err = TargetError;

    /// Parse `host:path`. Exactly one `:` is allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(host), Some(path), None) if !host.is_empty() => Ok(Self::new(host, path)),
            _ => Err(TargetError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.path)
    }
}

/// Required export paths grouped by host.
///
/// Iteration order over hosts is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    hosts: HashMap<String, HashSet<String>>,
}

impl TargetSet {
    /// Group targets by host, deduplicating paths.
    pub fn from_targets(targets: &[Target]) -> Self {
        let mut hosts: HashMap<String, HashSet<String>> = HashMap::new();
        for target in targets {
            hosts
                .entry(target.host.clone())
                .or_default()
                .insert(target.path.clone());
        }
        Self { hosts }
    }

    /// Iterate over `(host, required paths)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<String>)> {
        self.hosts.iter().map(|(h, p)| (h.as_str(), p))
    }

    /// Number of distinct hosts.
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Required paths for a host, if any.
    pub fn paths(&self, host: &str) -> Option<&HashSet<String>> {
        self.hosts.get(host)
    }
}

/// Metric families selected by `name[]` query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NameFilter {
    /// No filter requested: every family is exposed.
    #[default]
    All,
    /// Only these families are exposed.
    Only(HashSet<String>),
}

impl NameFilter {
    /// Whether the family `name` should be exposed.
    pub fn allows(&self, name: &str) -> bool {
        match self {
            NameFilter::All => true,
            NameFilter::Only(names) => names.contains(name),
        }
    }
}

/// A parsed scrape query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    /// Targets in the order they were supplied.
    pub targets: Vec<Target>,
    /// Requested metric families.
    pub names: NameFilter,
}

impl ScrapeRequest {
    /// Build a request from decoded query pairs. Repeated keys are kept.
    pub fn from_pairs<K, V>(pairs: &[(K, V)]) -> Result<Self, TargetError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut targets = Vec::new();
        let mut names: Option<HashSet<String>> = None;

        for (key, value) in pairs {
            let key = key.as_ref();
            if TARGET_KEYS.contains(&key) {
                targets.push(value.as_ref().parse()?);
            } else if NAME_KEYS.contains(&key) {
                names
                    .get_or_insert_with(HashSet::new)
                    .insert(value.as_ref().to_string());
            }
        }

        if targets.is_empty() {
            return Err(TargetError::Missing);
        }

        Ok(Self {
            targets,
            names: names.map_or(NameFilter::All, NameFilter::Only),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_target() {
        let target: Target = "filer01:/export/home".parse().unwrap();
        assert_eq!(target, Target::new("filer01", "/export/home"));
        assert_eq!(target.to_string(), "filer01:/export/home");
    }

    #[test]
    fn test_parse_target_rejects_bad_separators() {
        assert_eq!(
            "filer01".parse::<Target>(),
            Err(TargetError::Malformed("filer01".to_string()))
        );
        assert!("filer01:/a:/b".parse::<Target>().is_err());
        assert!("".parse::<Target>().is_err());
        assert!(":/export".parse::<Target>().is_err());
    }

    #[test]
    fn test_nfs_uri() {
        let target = Target::new("10.0.0.5", "/srv/data");
        assert_eq!(target.nfs_uri(), "nfs://10.0.0.5/srv/data?version=4");
    }

    #[test]
    fn test_target_set_groups_by_host() {
        let targets = vec![
            Target::new("a", "/x"),
            Target::new("b", "/y"),
            Target::new("a", "/z"),
            Target::new("a", "/x"),
        ];
        let set = TargetSet::from_targets(&targets);

        assert_eq!(set.host_count(), 2);
        let a = set.paths("a").unwrap();
        assert_eq!(a.len(), 2);
        assert!(a.contains("/x") && a.contains("/z"));
        assert_eq!(set.paths("b").unwrap().len(), 1);
        assert!(set.paths("c").is_none());
    }

    #[test]
    fn test_scrape_request_keeps_target_order() {
        let request = ScrapeRequest::from_pairs(&pairs(&[
            ("target", "h2:/b"),
            ("target", "h1:/a"),
            ("target[]", "h3:/c"),
        ]))
        .unwrap();

        assert_eq!(
            request.targets,
            vec![
                Target::new("h2", "/b"),
                Target::new("h1", "/a"),
                Target::new("h3", "/c"),
            ]
        );
        assert_eq!(request.names, NameFilter::All);
    }

    #[test]
    fn test_scrape_request_names() {
        let request = ScrapeRequest::from_pairs(&pairs(&[
            ("target", "h:/a"),
            ("name[]", "probe_success"),
            ("unrelated", "x"),
        ]))
        .unwrap();

        assert!(request.names.allows("probe_success"));
        assert!(!request.names.allows("probe_duration_seconds"));
    }

    #[test]
    fn test_scrape_request_missing_target() {
        let result = ScrapeRequest::from_pairs(&pairs(&[("name[]", "probe_success")]));
        assert_eq!(result, Err(TargetError::Missing));

        let empty: Vec<(String, String)> = Vec::new();
        assert_eq!(ScrapeRequest::from_pairs(&empty), Err(TargetError::Missing));
    }

    #[test]
    fn test_scrape_request_malformed_target() {
        let result = ScrapeRequest::from_pairs(&pairs(&[("target", "h:/a"), ("target", "oops")]));
        assert_eq!(result, Err(TargetError::Malformed("oops".to_string())));
    }
}
