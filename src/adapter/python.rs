//! Python language adapter
//!
//! Parses Python source with tree-sitter and lowers the concrete tree into a
//! [`SyntaxTree`] of imports, classes, functions and calls.

use super::framework::LanguageAdapter;
use crate::syntax::{NodeKind, Receiver, SyntaxNode, SyntaxTree, TreeBuilder};
use crate::{Error, Result};
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Python language adapter
pub struct PythonAdapter;

impl PythonAdapter {
    /// Create a new Python adapter
    pub fn new() -> Self {
        Self
    }

    /// Lower `node` into `out`. Irrelevant syntax is transparent.
    fn lower(&self, node: Node, src: &[u8], b: &mut TreeBuilder, out: &mut Vec<SyntaxNode>) {
        match node.kind() {
            "import_statement" => {
                // import foo, bar.baz as qux
                for child in named_children(node) {
                    if let Some(module) = imported_name(child, src) {
                        out.push(b.import(module));
                    }
                }
            }
            "import_from_statement" => {
                // from foo.bar import baz / from .foo import bar / from . import bar
                let module = node.child_by_field_name("module_name").and_then(|m| match m.kind() {
                    "dotted_name" => text(m, src),
                    "relative_import" => Some(
                        named_children(m)
                            .into_iter()
                            .find(|c| c.kind() == "dotted_name")
                            .and_then(|c| text(c, src))
                            .unwrap_or(""),
                    ),
                    _ => None,
                });
                let Some(module) = module else { return };

                let mut cursor = node.walk();
                let members: Vec<&str> = node
                    .children_by_field_name("name", &mut cursor)
                    .filter_map(|n| imported_name(n, src))
                    .collect();
                if !module.is_empty() || !members.is_empty() {
                    out.push(b.import_from(module, &members));
                }
            }
            "class_definition" => {
                let Some(name) = node.child_by_field_name("name").and_then(|n| text(n, src)) else {
                    return;
                };
                let body = self.lower_except_name(node, src, b);
                out.push(b.class(name, body));
            }
            "function_definition" => {
                let Some(name) = node.child_by_field_name("name").and_then(|n| text(n, src)) else {
                    return;
                };
                let body = self.lower_except_name(node, src, b);
                out.push(b.function(name, body));
            }
            "call" => out.push(self.lower_call(node, src, b)),
            _ => {
                for child in named_children(node) {
                    self.lower(child, src, b, out);
                }
            }
        }
    }

    fn lower_except_name(&self, node: Node, src: &[u8], b: &mut TreeBuilder) -> Vec<SyntaxNode> {
        let name_id = node.child_by_field_name("name").map(|n| n.id());
        let mut body = Vec::new();
        for child in named_children(node) {
            if Some(child.id()) != name_id {
                self.lower(child, src, b, &mut body);
            }
        }
        body
    }

    fn lower_call(&self, node: Node, src: &[u8], b: &mut TreeBuilder) -> SyntaxNode {
        let mut children = Vec::new();
        let (callee, receiver) = match node.child_by_field_name("function") {
            Some(func) if func.kind() == "identifier" => (text(func, src), Receiver::None),
            Some(func) if func.kind() == "attribute" => {
                let callee = func.child_by_field_name("attribute").and_then(|a| text(a, src));
                let receiver = match func.child_by_field_name("object") {
                    Some(obj) if obj.kind() == "identifier" => {
                        text(obj, src).map_or(Receiver::Unnamed, |r| Receiver::Named(r.to_string()))
                    }
                    Some(obj) => {
                        self.lower(obj, src, b, &mut children);
                        Receiver::Unnamed
                    }
                    None => Receiver::Unnamed,
                };
                (callee, receiver)
            }
            Some(func) => {
                self.lower(func, src, b, &mut children);
                (None, Receiver::Unnamed)
            }
            None => (None, Receiver::Unnamed),
        };
        if let Some(args) = node.child_by_field_name("arguments") {
            self.lower(args, src, b, &mut children);
        }
        b.node(
            NodeKind::Call { callee: callee.map(str::to_string), receiver },
            children,
        )
    }
}

impl Default for PythonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language_name(&self) -> &str {
        "Python"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn parse(&self, path: &Path, content: &str) -> Result<SyntaxTree> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| Error::Adapter(format!("Failed to set language: {}", e)))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| Error::Adapter(format!("Failed to parse {}", path.display())))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(Error::MalformedSyntax { path: path.to_path_buf() });
        }

        let mut builder = TreeBuilder::new();
        let mut children = Vec::new();
        for child in named_children(root) {
            self.lower(child, content.as_bytes(), &mut builder, &mut children);
        }
        Ok(builder.finish(path, children))
    }
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

/// Dotted name of an import target, looking through `as` aliases.
fn imported_name<'s>(node: Node, src: &'s [u8]) -> Option<&'s str> {
    match node.kind() {
        "dotted_name" => text(node, src),
        "aliased_import" => node.child_by_field_name("name").and_then(|n| text(n, src)),
        _ => None,
    }
}

fn text<'s>(node: Node, src: &'s [u8]) -> Option<&'s str> {
    node.utf8_text(src).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SyntaxTree {
        PythonAdapter::new()
            .parse(Path::new("sample.py"), source)
            .expect("Failed to parse")
    }

    fn kinds(tree: &SyntaxTree) -> Vec<NodeKind> {
        tree.root.walk().skip(1).map(|n| n.kind.clone()).collect()
    }

    #[test]
    fn test_declarations_and_calls() {
        let tree = parse(
            r#"
import os
from testers import tester2

def function1():
    print("function1")
    tester2.t2function1()

class TestClass:
    def method2(self):
        self.method3()
"#,
        );
        let kinds = kinds(&tree);

        assert!(kinds.contains(&NodeKind::Import { module: "os".into(), members: vec![] }));
        assert!(kinds.contains(&NodeKind::Import {
            module: "testers".into(),
            members: vec!["tester2".into()],
        }));
        assert!(kinds.contains(&NodeKind::Callable { name: "function1".into() }));
        assert!(kinds.contains(&NodeKind::Type { name: "TestClass".into() }));
        assert!(kinds.contains(&NodeKind::Call {
            callee: Some("print".into()),
            receiver: Receiver::None,
        }));
        assert!(kinds.contains(&NodeKind::Call {
            callee: Some("t2function1".into()),
            receiver: Receiver::Named("tester2".into()),
        }));
        assert!(kinds.contains(&NodeKind::Call {
            callee: Some("method3".into()),
            receiver: Receiver::Named("self".into()),
        }));
    }

    #[test]
    fn test_nesting_is_preserved() {
        let tree = parse(
            r#"
def outer_function():
    def inner_function():
        function2()
    inner_function()
"#,
        );
        let outer = &tree.root.children[0];
        assert_eq!(outer.kind, NodeKind::Callable { name: "outer_function".into() });
        let inner = &outer.children[0];
        assert_eq!(inner.kind, NodeKind::Callable { name: "inner_function".into() });
        assert!(matches!(&inner.children[0].kind, NodeKind::Call { callee: Some(c), .. } if c == "function2"));
        assert!(matches!(&outer.children[1].kind, NodeKind::Call { callee: Some(c), .. } if c == "inner_function"));
    }

    #[test]
    fn test_compound_receiver_is_unnamed() {
        let tree = parse("a.b.run()\nmake().go()\n");
        let calls: Vec<_> = kinds(&tree)
            .into_iter()
            .filter_map(|k| match k {
                NodeKind::Call { callee, receiver } => Some((callee, receiver)),
                _ => None,
            })
            .collect();

        assert!(calls.contains(&(Some("run".into()), Receiver::Unnamed)));
        assert!(calls.contains(&(Some("go".into()), Receiver::Unnamed)));
        // the inner call of `make().go()` is still seen
        assert!(calls.contains(&(Some("make".into()), Receiver::None)));
    }

    #[test]
    fn test_relative_and_aliased_imports() {
        let tree = parse(
            "import numpy as np\nfrom .helpers import util\nfrom . import sibling\nfrom os.path import join as j, exists\nfrom typing import *\n",
        );
        let imports: Vec<_> = kinds(&tree)
            .into_iter()
            .filter_map(|k| match k {
                NodeKind::Import { module, members } => Some((module, members)),
                _ => None,
            })
            .collect();
        let expected: Vec<(String, Vec<String>)> = vec![
            ("numpy".into(), vec![]),
            ("helpers".into(), vec!["util".into()]),
            ("".into(), vec!["sibling".into()]),
            ("os.path".into(), vec!["join".into(), "exists".into()]),
            ("typing".into(), vec![]),
        ];
        assert_eq!(imports, expected);
    }

    #[test]
    fn test_async_def_is_callable() {
        let tree = parse("async def fetch():\n    await go()\n");
        assert!(kinds(&tree).contains(&NodeKind::Callable { name: "fetch".into() }));
    }

    #[test]
    fn test_malformed_source() {
        let err = PythonAdapter::new()
            .parse(Path::new("bad.py"), "def broken(:\n    pass\n")
            .unwrap_err();
        assert!(matches!(err, Error::MalformedSyntax { .. }));
    }
}
