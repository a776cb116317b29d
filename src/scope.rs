//! Scope context for tree walks
//!
//! Both passes track two named slots while descending: the enclosing class and
//! the enclosing function. The context is an immutable value; entering a
//! declaration derives a new context for the subtree and the caller's copy is
//! untouched, so nothing needs restoring on the way out.

use crate::syntax::{NodeKind, SyntaxId, SyntaxNode};

#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeContext<'t> {
    class: Option<&'t str>,
    function: Option<(&'t str, SyntaxId)>,
}

impl<'t> ScopeContext<'t> {
    /// Context at module level.
    pub fn module() -> Self {
        Self::default()
    }

    pub fn enter_type(&self, name: &'t str) -> Self {
        Self { class: Some(name), ..*self }
    }

    pub fn enter_callable(&self, name: &'t str, id: SyntaxId) -> Self {
        Self { function: Some((name, id)), ..*self }
    }

    /// Context for the children of `node`.
    pub fn enter(&self, node: &'t SyntaxNode) -> Self {
        match &node.kind {
            NodeKind::Type { name } => self.enter_type(name),
            NodeKind::Callable { name } => self.enter_callable(name, node.id),
            _ => *self,
        }
    }

    /// Enclosing class name, empty at module level.
    pub fn class_name(&self) -> &'t str {
        self.class.unwrap_or("")
    }

    pub fn function(&self) -> Option<(&'t str, SyntaxId)> {
        self.function
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::TreeBuilder;

    #[test]
    fn test_enter_does_not_mutate_parent() {
        let module = ScopeContext::module();
        let class = module.enter_type("Circle");
        let method = class.enter_callable("area", SyntaxId(3));

        assert_eq!(module.class_name(), "");
        assert!(module.function().is_none());
        assert_eq!(class.class_name(), "Circle");
        assert_eq!(method.class_name(), "Circle");
        assert_eq!(method.function(), Some(("area", SyntaxId(3))));
    }

    #[test]
    fn test_nested_function_keeps_class() {
        let mut b = TreeBuilder::new();
        let inner = b.function("inner", vec![]);
        let outer = b.function("outer", vec![inner]);
        let class = b.class("Shape", vec![outer]);

        let ctx = ScopeContext::module().enter(&class);
        let ctx = ctx.enter(&class.children[0]);
        let ctx = ctx.enter(&class.children[0].children[0]);
        assert_eq!(ctx.class_name(), "Shape");
        assert_eq!(ctx.function().map(|(n, _)| n), Some("inner"));
    }
}
