//! Leaf positions inside a paragraph's inline tree.
//!
//! A [`LeafPos`] is a path of child indices from the paragraph root. Moving
//! forward or backward returns a new path computed by re-descending from the
//! root; nothing stores parent pointers and nothing is mutated in place.

use crate::model::{Font, Inline, LinkTarget};

/// Path of child indices from the paragraph content root to a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafPos(pub Vec<usize>);

/// The node a path points to.
pub fn node<'a>(content: &'a [Inline], pos: &LeafPos) -> Option<&'a Inline> {
    let (first, rest) = pos.0.split_first()?;
    let mut current = content.get(*first)?;
    for idx in rest {
        current = current.children()?.get(*idx)?;
    }
    Some(current)
}

/// Children of the container at `path` (the root for an empty path).
fn children_at<'a>(content: &'a [Inline], path: &[usize]) -> Option<&'a [Inline]> {
    let mut list = content;
    for idx in path {
        list = list.get(*idx)?.children()?;
    }
    Some(list)
}

/// First leaf at or below `list[start..]`, descending into containers.
fn first_leaf_from(list: &[Inline], start: usize, prefix: &mut Vec<usize>) -> bool {
    for (i, inline) in list.iter().enumerate().skip(start) {
        prefix.push(i);
        match inline.children() {
            None => return true,
            Some(children) => {
                if first_leaf_from(children, 0, prefix) {
                    return true;
                }
            }
        }
        prefix.pop();
    }
    false
}

/// Last leaf at or below `list[..end]`.
fn last_leaf_before(list: &[Inline], end: usize, prefix: &mut Vec<usize>) -> bool {
    for i in (0..end.min(list.len())).rev() {
        prefix.push(i);
        match list[i].children() {
            None => return true,
            Some(children) => {
                if last_leaf_before(children, children.len(), prefix) {
                    return true;
                }
            }
        }
        prefix.pop();
    }
    false
}

pub fn first_leaf(content: &[Inline]) -> Option<LeafPos> {
    let mut path = Vec::new();
    first_leaf_from(content, 0, &mut path).then_some(LeafPos(path))
}

pub fn last_leaf(content: &[Inline]) -> Option<LeafPos> {
    let mut path = Vec::new();
    last_leaf_before(content, content.len(), &mut path).then_some(LeafPos(path))
}

/// The leaf after `pos` in document order. Empty containers are skipped.
pub fn next_leaf(content: &[Inline], pos: &LeafPos) -> Option<LeafPos> {
    let mut path = pos.0.clone();
    while let Some(idx) = path.pop() {
        let siblings = children_at(content, &path)?;
        let mut candidate = path.clone();
        if first_leaf_from(siblings, idx + 1, &mut candidate) {
            return Some(LeafPos(candidate));
        }
    }
    None
}

/// The leaf before `pos` in document order.
pub fn previous_leaf(content: &[Inline], pos: &LeafPos) -> Option<LeafPos> {
    let mut path = pos.0.clone();
    while let Some(idx) = path.pop() {
        let siblings = children_at(content, &path)?;
        let mut candidate = path.clone();
        if last_leaf_before(siblings, idx, &mut candidate) {
            return Some(LeafPos(candidate));
        }
    }
    None
}

/// The font in effect at `pos`: the innermost formatted-text font, or the
/// paragraph font.
pub fn font_for<'a>(content: &'a [Inline], pos: &LeafPos, base: &'a Font) -> &'a Font {
    let mut font = base;
    let mut list = content;
    for idx in &pos.0 {
        let Some(inline) = list.get(*idx) else {
            break;
        };
        if let Inline::FormattedText(ft) = inline {
            font = &ft.font;
        }
        match inline.children() {
            Some(children) => list = children,
            None => break,
        }
    }
    font
}

/// The innermost hyperlink enclosing `pos`.
pub fn hyperlink_for<'a>(content: &'a [Inline], pos: &LeafPos) -> Option<&'a LinkTarget> {
    let mut target = None;
    let mut list = content;
    for idx in &pos.0 {
        let inline = list.get(*idx)?;
        if let Inline::Hyperlink(h) = inline {
            target = Some(&h.target);
        }
        match inline.children() {
            Some(children) => list = children,
            None => break,
        }
    }
    target
}
