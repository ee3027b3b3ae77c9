//! Type-indexed traversal of a shape hierarchy.

use super::shape::{Shape, ShapeKind};

/// Depth-first iterator over the sub-shapes of one kind.
///
/// Every occurrence is yielded with its orientation composed along the path;
/// a shape reached through several parents comes out several times. The walk
/// does not descend below shapes of the requested kind.
pub struct ShapeExplorer {
    kind: ShapeKind,
    stack: Vec<Shape>,
}

impl ShapeExplorer {
    pub fn new(root: &Shape, kind: ShapeKind) -> Self {
        ShapeExplorer {
            kind,
            stack: vec![root.clone()],
        }
    }
}

impl Iterator for ShapeExplorer {
    type Item = Shape;

    fn next(&mut self) -> Option<Shape> {
        while let Some(s) = self.stack.pop() {
            if s.kind() == self.kind {
                return Some(s);
            }
            // Kinds below the target cannot contain it.
            if s.kind() > self.kind {
                continue;
            }
            let children: Vec<Shape> = s.children().collect();
            self.stack.extend(children.into_iter().rev());
        }
        None
    }
}
