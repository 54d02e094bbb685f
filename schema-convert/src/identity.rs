//! Resource identity resolution for references and canonical documents.

use serde::Serialize;
use serde_json::Value as Json;

/// Identity of a cloud resource as far as references can tell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceIdentity {
    /// Path starting at `projects/`, when the reference carried one.
    pub relative_name: Option<String>,
    /// Last path segment.
    pub short_name: String,
}

/// Supplies identities for references and addresses for documents.
pub trait IdentityResolver: Send + Sync {
    /// Identity of a self link, relative resource name or short name.
    fn identity(&self, reference: &str) -> Option<ResourceIdentity>;

    /// Fully-qualified address of the resource a canonical document describes.
    fn address(&self, document: &Json) -> Option<String>;

    /// Whether two references name the same resource. A short name matches
    /// any qualified reference ending in it; two qualified references must
    /// agree on their relative names.
    fn same_resource(&self, left: &str, right: &str) -> bool {
        let (Some(l), Some(r)) = (self.identity(left), self.identity(right)) else {
            return false;
        };
        match (&l.relative_name, &r.relative_name) {
            (Some(a), Some(b)) => a == b,
            _ => l.short_name == r.short_name,
        }
    }
}

/// Resolver for Google-style self links
/// (`https://<service>/<version>/projects/p/locations/l/clusters/c`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfLinkResolver;

impl IdentityResolver for SelfLinkResolver {
    fn identity(&self, reference: &str) -> Option<ResourceIdentity> {
        let trimmed = reference.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        let short_name = trimmed.rsplit('/').next().unwrap_or(trimmed).to_string();
        let relative_name = if trimmed.contains('/') {
            trimmed
                .find("projects/")
                .map(|idx| trimmed[idx..].to_string())
        } else {
            None
        };
        Some(ResourceIdentity {
            relative_name,
            short_name,
        })
    }

    fn address(&self, document: &Json) -> Option<String> {
        ["selfLink", "name"].iter().find_map(|key| {
            let raw = document.get(*key)?.as_str()?;
            let identity = self.identity(raw)?;
            Some(identity.relative_name.unwrap_or(identity.short_name))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{IdentityResolver, SelfLinkResolver};

    const SELF_LINK: &str =
        "https://container.googleapis.com/v1/projects/my-project/locations/us-central1/clusters/primary";

    #[test]
    fn self_link_reduces_to_relative_name() {
        let identity = SelfLinkResolver.identity(SELF_LINK).expect("identity");
        assert_eq!(
            identity.relative_name.as_deref(),
            Some("projects/my-project/locations/us-central1/clusters/primary")
        );
        assert_eq!(identity.short_name, "primary");
    }

    #[test]
    fn short_names_match_qualified_references() {
        let resolver = SelfLinkResolver;
        assert!(resolver.same_resource(SELF_LINK, "primary"));
        assert!(resolver.same_resource(
            SELF_LINK,
            "projects/my-project/locations/us-central1/clusters/primary"
        ));
        assert!(!resolver.same_resource(
            SELF_LINK,
            "projects/other-project/locations/us-central1/clusters/primary"
        ));
        assert!(!resolver.same_resource(SELF_LINK, "secondary"));
        assert!(!resolver.same_resource("", "primary"));
    }

    #[test]
    fn address_prefers_self_link() {
        let resolver = SelfLinkResolver;
        assert_eq!(
            resolver.address(&json!({"name": "primary", "selfLink": SELF_LINK})),
            Some("projects/my-project/locations/us-central1/clusters/primary".to_string())
        );
        assert_eq!(
            resolver.address(&json!({"name": "primary"})),
            Some("primary".to_string())
        );
        assert_eq!(resolver.address(&json!({})), None);
    }
}
