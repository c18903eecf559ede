use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use shared::domain::ScopeId;

static NEXT_SCOPE_ID: AtomicI64 = AtomicI64::new(1);

/// Explicit handle for looking up the nearest active auth controller.
///
/// Scopes form a tree; a lookup starts at the given scope and walks up
/// through its ancestors.
#[derive(Debug, Clone)]
pub struct Scope {
    node: Arc<ScopeNode>,
}

#[derive(Debug)]
struct ScopeNode {
    id: ScopeId,
    parent: Option<Scope>,
}

impl Scope {
    pub fn root() -> Self {
        Self::with_parent(None)
    }

    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    fn with_parent(parent: Option<Scope>) -> Self {
        Self {
            node: Arc::new(ScopeNode {
                id: ScopeId(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed)),
                parent,
            }),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.node.id
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.node.parent.as_ref()
    }

    /// This scope followed by its ancestors, nearest first.
    pub fn lineage(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self), |scope| scope.parent())
    }
}
