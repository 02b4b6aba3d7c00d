//! Parsing of `--remotes` URIs into backend instances.
//!
//! Two schemes are recognized: `path://DIR?max_size=BYTES&max_part=BYTES`
//! for a disk-backed remote and `mem://NAME?max_size=BYTES&max_part=BYTES`
//! for an in-memory one. The grammar is small enough that a hand-rolled
//! parser with a typed error reads more honestly than routing it through a
//! deserializer.
//!
//! Each remote parses to a raw, `max_size`-capped [`SharedBackend`] plus an
//! optional `max_part` hint; [`assemble`] fans every remote into a single
//! [`CompositeFs`] and wraps that in the one [`PartedFs`] the whole run
//! shares, following the `lock -> composite -> parted` layering the stack
//! is built on.

use std::sync::Arc;

use cuckoo_backend::{LocalBackend, MemoryBackend, SharedBackend, SizedBackend};
use cuckoo_composite::CompositeFs;
use cuckoo_parted::PartedFs;
use thiserror::Error;

/// Everything that can go wrong turning `--remotes` arguments into a usable store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The URI has no recognized `scheme://` prefix.
    #[error("remote {uri:?} has no recognized scheme (expected path:// or mem://)")]
    UnknownScheme {
        /// The offending URI, verbatim.
        uri: String,
    },
    /// A `path://` remote was missing its directory component.
    #[error("remote {uri:?} is missing a directory")]
    MissingPath {
        /// The offending URI, verbatim.
        uri: String,
    },
    /// A `mem://` remote was missing its name component.
    #[error("remote {uri:?} is missing a name")]
    MissingName {
        /// The offending URI, verbatim.
        uri: String,
    },
    /// A query parameter value failed to parse as an integer.
    #[error("remote {uri:?} has an invalid value for {key}: {value:?}")]
    InvalidQueryValue {
        /// The offending URI, verbatim.
        uri: String,
        /// The offending key.
        key: String,
        /// The offending value.
        value: String,
    },
    /// No `--remotes` argument carried a `max_part`, and the whole run needs exactly one.
    #[error("no remote specified max_part; at least one --remotes URI must set it")]
    MissingMaxPart,
    /// `--watch` was requested; no filesystem-watcher daemon exists.
    #[error("--watch is not implemented")]
    WatchUnsupported,
    /// No `--remotes` argument was given at all.
    #[error("at least one --remotes URI is required")]
    NoRemotes,
    /// Constructing the backend itself failed (e.g. the directory is unusable).
    #[error("remote {uri:?} could not be opened: {source}")]
    Backend {
        /// The offending URI, verbatim.
        uri: String,
        /// The underlying failure.
        #[source]
        source: cuckoo_backend::BackendError,
    },
}

/// A parsed `max_size`/`max_part` query pair.
#[derive(Debug, Default, Clone, Copy)]
struct Limits {
    max_size: Option<u64>,
    max_part: Option<u64>,
}

fn parse_query(uri: &str, query: &str) -> Result<Limits, ConfigError> {
    let mut limits = Limits::default();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let parsed: u64 = value.parse().map_err(|_| ConfigError::InvalidQueryValue {
            uri: uri.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })?;
        match key {
            "max_size" => limits.max_size = Some(parsed),
            "max_part" => limits.max_part = Some(parsed),
            _ => {}
        }
    }
    Ok(limits)
}

fn split_uri<'a>(uri: &'a str, scheme: &str) -> (&'a str, &'a str) {
    let rest = &uri[scheme.len()..];
    rest.split_once('?').unwrap_or((rest, ""))
}

/// One `--remotes` argument, parsed into its raw backend and size hints.
struct Remote {
    backend: SharedBackend,
    max_part: Option<u64>,
}

fn parse_remote(uri: &str) -> Result<Remote, ConfigError> {
    if uri.strip_prefix("path://").is_some() {
        let (dir, query) = split_uri(uri, "path://");
        if dir.is_empty() {
            return Err(ConfigError::MissingPath { uri: uri.to_string() });
        }
        let limits = parse_query(uri, query)?;
        let backend = LocalBackend::new(dir.to_string(), dir.to_string())
            .map_err(|source| ConfigError::Backend { uri: uri.to_string(), source })?;
        Ok(Remote { backend: wrap_with_limit(backend, limits), max_part: limits.max_part })
    } else if uri.strip_prefix("mem://").is_some() {
        let (name, query) = split_uri(uri, "mem://");
        if name.is_empty() {
            return Err(ConfigError::MissingName { uri: uri.to_string() });
        }
        let limits = parse_query(uri, query)?;
        let backend = MemoryBackend::new(name);
        Ok(Remote { backend: wrap_with_limit(backend, limits), max_part: limits.max_part })
    } else {
        Err(ConfigError::UnknownScheme { uri: uri.to_string() })
    }
}

fn wrap_with_limit<B>(backend: B, limits: Limits) -> SharedBackend
where
    B: cuckoo_backend::Backend + Send + Sync + 'static,
{
    match limits.max_size {
        Some(cap) => Arc::new(SizedBackend::new(backend, cap, 0)),
        None => Arc::new(backend),
    }
}

/// Turns every `--remotes` URI into the one store a sync run writes to: a
/// fan-out composite over all of them, capped into parts by the first
/// `max_part` any of them specified.
pub fn assemble(uris: &[String]) -> Result<PartedFs, ConfigError> {
    if uris.is_empty() {
        return Err(ConfigError::NoRemotes);
    }
    let remotes: Vec<Remote> = uris.iter().map(|uri| parse_remote(uri)).collect::<Result<_, _>>()?;
    let max_part = remotes.iter().find_map(|r| r.max_part).ok_or(ConfigError::MissingMaxPart)?;
    let backends: Vec<SharedBackend> = remotes.into_iter().map(|r| r.backend).collect();
    let composite: SharedBackend = Arc::new(CompositeFs::new("cuckoodrive", backends));
    Ok(PartedFs::new(composite, max_part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuckoo_backend::Backend;

    #[test]
    fn assembles_single_memory_remote() {
        let fs = assemble(&["mem://a?max_size=1000&max_part=100".to_string()]).unwrap();
        assert!(!fs.exists("/missing"));
    }

    #[test]
    fn assembles_multiple_remotes_into_one_composite() {
        let fs = assemble(&[
            "mem://a?max_size=1000&max_part=64".to_string(),
            "mem://b?max_size=2000".to_string(),
        ])
        .unwrap();
        assert_eq!(fs.max_part_size(), 64);
    }

    #[test]
    fn rejects_empty_remotes() {
        let err = assemble(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::NoRemotes));
    }

    #[test]
    fn rejects_missing_max_part_everywhere() {
        let err = assemble(&["mem://a".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingMaxPart));
    }

    #[test]
    fn rejects_unknown_scheme() {
        let err = assemble(&["ftp://host?max_part=1".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownScheme { .. }));
    }

    #[test]
    fn rejects_missing_name() {
        let err = assemble(&["mem://?max_part=1".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingName { .. }));
    }

    #[test]
    fn rejects_invalid_query_value() {
        let err = assemble(&["mem://a?max_size=nope".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidQueryValue { .. }));
    }
}
