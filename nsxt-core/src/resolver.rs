//! Resolver - Find exactly one remote object by id or display name
//!
//! Lookup by id is a direct fetch. Lookup by name lists the whole collection
//! and prefers an exact display name match over a prefix match; more than one
//! candidate in the winning partition is an error.

use crate::provider::{MatchKind, ProviderError, ProviderResult};
use crate::remote::{RemoteCollection, RemoteObject};

/// What a data source was asked to find. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

impl Lookup {
    pub fn new(id: Option<&str>, display_name: Option<&str>) -> Self {
        Self {
            id: id.filter(|s| !s.is_empty()).map(str::to_string),
            display_name: display_name.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new(Some(&id.into()), None)
    }

    pub fn by_name(display_name: impl Into<String>) -> Self {
        Self::new(None, Some(&display_name.into()))
    }
}

/// Candidates of a name lookup, partitioned in listing order
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSet<T> {
    pub perfect: Vec<T>,
    pub prefix: Vec<T>,
}

impl<T: RemoteObject + Clone> MatchSet<T> {
    /// Test every object against `query`. An exact match is also a prefix
    /// match and lands in both partitions.
    pub fn partition(objects: impl IntoIterator<Item = T>, query: &str) -> Self {
        let mut perfect = Vec::new();
        let mut prefix = Vec::new();

        for object in objects {
            let Some(name) = object.display_name() else {
                continue;
            };
            if name == query {
                perfect.push(object.clone());
            }
            if name.starts_with(query) {
                prefix.push(object);
            }
        }

        Self { perfect, prefix }
    }

    /// Pick the single winner, perfect matches first
    pub fn select(mut self, kind: &str, query: &str) -> ProviderResult<T> {
        let ambiguous = |match_kind| ProviderError::AmbiguousName {
            kind: kind.to_string(),
            name: query.to_string(),
            match_kind,
        };

        match (self.perfect.len(), self.prefix.len()) {
            (n, _) if n > 1 => Err(ambiguous(MatchKind::Exact)),
            (1, _) => Ok(self.perfect.remove(0)),
            (_, n) if n > 1 => Err(ambiguous(MatchKind::Prefix)),
            (_, 1) => Ok(self.prefix.remove(0)),
            _ => Err(ProviderError::NotFound {
                kind: kind.to_string(),
                subject: query.to_string(),
            }),
        }
    }
}

/// Resolve a lookup against a collection
pub async fn resolve<C: RemoteCollection>(
    collection: &C,
    lookup: &Lookup,
) -> ProviderResult<C::Object> {
    let kind = collection.kind();

    if let Some(id) = &lookup.id {
        return collection.get(id).await.map_err(|e| {
            if e.is_not_found() {
                ProviderError::not_found(kind, id.as_str())
            } else {
                ProviderError::read_failed(kind, id.as_str(), e)
            }
        });
    }

    let Some(name) = &lookup.display_name else {
        return Err(ProviderError::invalid_query(
            kind,
            format!("error obtaining {} ID or name during read", kind),
        ));
    };

    log::debug!("Looking up {} by name '{}'", kind, name);
    let objects = collection
        .list()
        .await
        .map_err(|source| ProviderError::ListFailed {
            kind: kind.to_string(),
            source,
        })?;

    MatchSet::partition(objects, name).select(kind, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ApiError;
    use crate::remote::memory::{MemoryCollection, Object};

    fn collection(names: &[(&str, &str)]) -> MemoryCollection {
        MemoryCollection::with_objects(
            names
                .iter()
                .map(|(id, name)| Object::named(id, name))
                .collect(),
        )
    }

    #[tokio::test]
    async fn exact_match_wins_over_prefix_matches() {
        let c = collection(&[("1", "web"), ("2", "web-2")]);
        let found = resolve(&c, &Lookup::by_name("web")).await.unwrap();
        assert_eq!(found.id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn exact_match_wins_regardless_of_listing_order() {
        let c = collection(&[("2", "web-2"), ("3", "web-3"), ("1", "web")]);
        let found = resolve(&c, &Lookup::by_name("web")).await.unwrap();
        assert_eq!(found.id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn single_prefix_match_is_returned() {
        let c = collection(&[("1", "db"), ("2", "web-a")]);
        let found = resolve(&c, &Lookup::by_name("web")).await.unwrap();
        assert_eq!(found.id.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn two_prefix_matches_are_ambiguous() {
        let c = collection(&[("1", "web-a"), ("2", "web-b")]);
        let err = resolve(&c, &Lookup::by_name("web")).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::AmbiguousName {
                match_kind: MatchKind::Prefix,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn duplicate_exact_names_are_ambiguous_even_with_unique_prefix() {
        let c = collection(&[("1", "web"), ("2", "web"), ("3", "web-x")]);
        let err = resolve(&c, &Lookup::by_name("web")).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::AmbiguousName {
                match_kind: MatchKind::Exact,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn no_match_is_not_found() {
        let empty = collection(&[]);
        let err = resolve(&empty, &Lookup::by_name("web")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));

        let others = collection(&[("1", "db"), ("2", "my-web")]);
        let err = resolve(&others, &Lookup::by_name("web")).await.unwrap_err();
        assert_eq!(err.to_string(), "Widget 'web' was not found");
    }

    #[tokio::test]
    async fn objects_without_display_name_never_match() {
        let c = MemoryCollection::with_objects(vec![Object {
            id: Some("1".to_string()),
            display_name: None,
            description: None,
        }]);
        let err = resolve(&c, &Lookup::by_name("w")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn empty_query_fails_without_remote_calls() {
        let c = collection(&[("1", "web")]);
        let err = resolve(&c, &Lookup::new(Some(""), Some("")))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidQuery { .. }));
        assert_eq!(c.calls(), 0);
    }

    #[tokio::test]
    async fn id_lookup_fetches_directly() {
        let c = collection(&[("1", "web"), ("2", "web")]);
        let found = resolve(&c, &Lookup::new(Some("2"), Some("ignored")))
            .await
            .unwrap();
        assert_eq!(found.id.as_deref(), Some("2"));
        assert_eq!(c.calls(), 1);

        let err = resolve(&c, &Lookup::by_id("3")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_failure_is_reported() {
        let c = MemoryCollection::failing(ApiError::Transport("timed out".to_string()));
        let err = resolve(&c, &Lookup::by_name("web")).await.unwrap_err();
        assert!(matches!(err, ProviderError::ListFailed { .. }));
    }
}
