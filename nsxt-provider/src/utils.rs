//! Policy path helpers
//!
//! Import ids and several attributes are policy paths. These helpers take
//! them apart into the scope values the collections are built from.

use crate::collections::{EnforcementPointScope, IpBlockScope, ProjectScope};

/// Match `path` against `pattern`, where `{}` stands for one non-empty
/// segment. Returns the captured segments in order.
pub fn match_path<'a>(pattern: &str, path: &'a str) -> Option<Vec<&'a str>> {
    let path = path.strip_prefix('/')?;
    let pattern = pattern.strip_prefix('/')?;

    let segments: Vec<&str> = path.split('/').collect();
    let expected: Vec<&str> = pattern.split('/').collect();
    if segments.len() != expected.len() {
        return None;
    }

    let mut captured = Vec::new();
    for (segment, want) in segments.iter().zip(&expected) {
        if segment.is_empty() {
            return None;
        }
        if *want == "{}" {
            captured.push(*segment);
        } else if segment != want {
            return None;
        }
    }
    Some(captured)
}

/// `/orgs/<org>/projects/<project>/vpcs/<id>`
pub fn parse_vpc_path(path: &str) -> Option<(ProjectScope, String)> {
    let parts = match_path("/orgs/{}/projects/{}/vpcs/{}", path)?;
    Some((ProjectScope::new(parts[0], parts[1]), parts[2].to_string()))
}

/// `/infra/ip-blocks/<id>`, `/orgs/<org>/projects/<project>/infra/ip-blocks/<id>`
/// or a bare id in the default tenant
pub fn parse_ip_block_path(path: &str) -> Option<(IpBlockScope, String)> {
    if !path.is_empty() && !path.contains('/') {
        return Some((IpBlockScope::Infra, path.to_string()));
    }
    if let Some(parts) = match_path("/infra/ip-blocks/{}", path) {
        return Some((IpBlockScope::Infra, parts[0].to_string()));
    }
    let parts = match_path("/orgs/{}/projects/{}/infra/ip-blocks/{}", path)?;
    Some((
        IpBlockScope::Project(ProjectScope::new(parts[0], parts[1])),
        parts[2].to_string(),
    ))
}

/// `/infra/sites/<site>/enforcement-points/<ep>/host-transport-nodes/<id>`
pub fn parse_host_transport_node_path(path: &str) -> Option<(EnforcementPointScope, String)> {
    let parts = match_path(
        "/infra/sites/{}/enforcement-points/{}/host-transport-nodes/{}",
        path,
    )?;
    Some((
        EnforcementPointScope {
            site_id: parts[0].to_string(),
            enforcement_point_id: parts[1].to_string(),
        },
        parts[2].to_string(),
    ))
}

/// Site id of a site path (`/infra/sites/<site>`)
pub fn site_id(site_path: &str) -> Option<&str> {
    match_path("/infra/sites/{}", site_path).map(|parts| parts[0])
}

/// Site path of any path below a site's enforcement point
pub fn site_path_of(path: &str) -> Option<&str> {
    let (site_path, _) = path.split_once("/enforcement-points/")?;
    site_id(site_path).map(|_| site_path)
}

/// Enforcement point id of any path below an enforcement point
pub fn enforcement_point_of(path: &str) -> Option<&str> {
    let (_, rest) = path.split_once("/enforcement-points/")?;
    let id = rest.split('/').next()?;
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_path_captures_segments() {
        assert_eq!(
            match_path("/orgs/{}/projects/{}", "/orgs/default/projects/p1"),
            Some(vec!["default", "p1"])
        );
        assert_eq!(match_path("/orgs/{}", "/orgs/"), None);
        assert_eq!(match_path("/orgs/{}", "/orgs/a/b"), None);
        assert_eq!(match_path("/orgs/{}", "orgs/a"), None);
        assert_eq!(match_path("/orgs/{}", "/tenants/a"), None);
    }

    #[test]
    fn vpc_import_path() {
        let (scope, id) = parse_vpc_path("/orgs/default/projects/p1/vpcs/v1").unwrap();
        assert_eq!(scope, ProjectScope::new("default", "p1"));
        assert_eq!(id, "v1");

        assert!(parse_vpc_path("/orgs/default/projects/p1/vpcs").is_none());
        assert!(parse_vpc_path("v1").is_none());
    }

    #[test]
    fn ip_block_import_accepts_paths_and_bare_ids() {
        assert_eq!(
            parse_ip_block_path("/infra/ip-blocks/b1"),
            Some((IpBlockScope::Infra, "b1".to_string()))
        );
        assert_eq!(
            parse_ip_block_path("b1"),
            Some((IpBlockScope::Infra, "b1".to_string()))
        );
        assert_eq!(
            parse_ip_block_path("/orgs/default/projects/p1/infra/ip-blocks/b1"),
            Some((
                IpBlockScope::Project(ProjectScope::new("default", "p1")),
                "b1".to_string()
            ))
        );
        assert!(parse_ip_block_path("").is_none());
        assert!(parse_ip_block_path("/infra/ip-pools/b1").is_none());
    }

    #[test]
    fn host_transport_node_import_path() {
        let (scope, id) = parse_host_transport_node_path(
            "/infra/sites/default/enforcement-points/ep1/host-transport-nodes/h1",
        )
        .unwrap();
        assert_eq!(scope.site_id, "default");
        assert_eq!(scope.enforcement_point_id, "ep1");
        assert_eq!(id, "h1");
    }

    #[test]
    fn site_and_enforcement_point_from_parent_path() {
        let parent = "/infra/sites/s1/enforcement-points/ep1";
        assert_eq!(site_path_of(parent), Some("/infra/sites/s1"));
        assert_eq!(enforcement_point_of(parent), Some("ep1"));
        assert_eq!(site_id("/infra/sites/s1"), Some("s1"));

        assert_eq!(site_path_of("/infra/ip-blocks/b1"), None);
        assert_eq!(enforcement_point_of("/infra/sites/s1/enforcement-points/"), None);
    }
}
