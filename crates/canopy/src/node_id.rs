//! Node addressing: an opaque string, unique among siblings, optionally
//! dotted (`a.b.c`) to address a descendant from some ancestor's scope.

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolve a resume/fail target list against one child on the path.
///
/// `ids` is empty ⇒ unconditional descent (`Some(vec![])`): the spec defines
/// empty `nodeIDs` as "resume the first waiting descendant", which is
/// exactly how an empty list behaves at every level of recursion. A bare
/// name with no dot might address a deeper descendant, so it is forwarded
/// unchanged rather than rejected. Returns `None` only when none of `ids`
/// could possibly apply to `child_id` -- the caller treats that as a no-op.
pub fn resolve_for_child(ids: &[NodeId], child_id: &NodeId) -> Option<Vec<NodeId>> {
    if ids.is_empty() {
        return Some(Vec::new());
    }

    let mut remainder = Vec::new();
    let mut matched = false;

    for id in ids {
        let s = id.as_str();
        let c = child_id.as_str();

        if s == c {
            matched = true;
            continue;
        }

        if let Some(rest) = s.strip_prefix(c).and_then(|r| r.strip_prefix('.')) {
            matched = true;
            remainder.push(NodeId::new(rest));
            continue;
        }

        if !s.contains('.') {
            // Bare name: might match a descendant deeper than `child_id`.
            matched = true;
            remainder.push(id.clone());
        }
    }

    matched.then_some(remainder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ids_descend_unconditionally() {
        assert_eq!(resolve_for_child(&[], &NodeId::new("a")), Some(vec![]));
    }

    #[test]
    fn exact_match_is_terminal() {
        let ids = vec![NodeId::new("a")];
        assert_eq!(resolve_for_child(&ids, &NodeId::new("a")), Some(vec![]));
    }

    #[test]
    fn dotted_prefix_forwards_remainder() {
        let ids = vec![NodeId::new("a.b.c")];
        assert_eq!(
            resolve_for_child(&ids, &NodeId::new("a")),
            Some(vec![NodeId::new("b.c")])
        );
    }

    #[test]
    fn bare_name_forwards_unchanged() {
        let ids = vec![NodeId::new("deep")];
        assert_eq!(
            resolve_for_child(&ids, &NodeId::new("a")),
            Some(vec![NodeId::new("deep")])
        );
    }

    #[test]
    fn unrelated_dotted_path_is_no_match() {
        let ids = vec![NodeId::new("x.y")];
        assert_eq!(resolve_for_child(&ids, &NodeId::new("a")), None);
    }
}
