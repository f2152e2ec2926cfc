//! Focus groups.
//!
//! A focus group is an ordered ring of focusable widgets driven by
//! keypad or encoder navigation. Exactly one member is current at a
//! time (or none, when the group is empty). Navigation wraps at both
//! ends and is a no-op on an empty group.
//!
//! Groups hold plain widget handles; [`FocusGroup::prune`] drops members
//! whose widgets have been destroyed so a stale handle never stays
//! focused.

use crate::tree::{WidgetId, WidgetTree};

/// Handle to a focus group registered with the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FocusGroupId(pub(crate) usize);

/// An ordered ring of focusable widgets.
#[derive(Default)]
pub struct FocusGroup {
    members: Vec<WidgetId>,
    current: Option<usize>,
}

/// Result of a navigation step: the member losing focus and the member
/// gaining it, for Defocused/Focused event emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    pub from: Option<WidgetId>,
    pub to: WidgetId,
}

impl FocusGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(&self) -> &[WidgetId] {
        &self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The currently focused member, if any.
    pub fn current(&self) -> Option<WidgetId> {
        self.current.map(|i| self.members[i])
    }

    /// Append a widget to the ring. The first member added becomes
    /// current. Adding a widget twice is a no-op.
    pub fn add(&mut self, widget: WidgetId) {
        if self.members.contains(&widget) {
            return;
        }
        self.members.push(widget);
        if self.current.is_none() {
            self.current = Some(self.members.len() - 1);
        }
    }

    /// Remove a widget from the ring. If it was current, focus moves to
    /// the next member (or clears if the group empties).
    pub fn remove(&mut self, widget: WidgetId) {
        let Some(pos) = self.members.iter().position(|m| *m == widget) else {
            return;
        };
        self.members.remove(pos);

        let Some(cur) = self.current else {
            return;
        };
        if self.members.is_empty() {
            self.current = None;
        } else if cur == pos {
            // The focused member went away: its successor takes over.
            self.current = Some(pos % self.members.len());
        } else if cur > pos {
            self.current = Some(cur - 1);
        }
    }

    /// Advance focus to the next member, wrapping past the end.
    pub fn next(&mut self) -> Option<FocusChange> {
        self.step(1)
    }

    /// Move focus to the previous member, wrapping past the start.
    pub fn prev(&mut self) -> Option<FocusChange> {
        self.step(-1)
    }

    fn step(&mut self, dir: isize) -> Option<FocusChange> {
        let len = self.members.len();
        if len == 0 {
            return None;
        }
        let cur = self.current.unwrap_or(0);
        let next = (cur as isize + dir).rem_euclid(len as isize) as usize;
        let from = self.current.map(|i| self.members[i]);
        self.current = Some(next);
        Some(FocusChange {
            from,
            to: self.members[next],
        })
    }

    /// Drop members whose widgets no longer exist, preserving the
    /// current member where possible.
    pub fn prune(&mut self, tree: &WidgetTree) {
        let dead: Vec<WidgetId> = self
            .members
            .iter()
            .copied()
            .filter(|m| !tree.is_alive(*m))
            .collect();
        for widget in dead {
            self.remove(widget);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WidgetKind;

    fn three_buttons() -> (WidgetTree, [WidgetId; 3]) {
        let mut tree = WidgetTree::new();
        let a = tree.create(None, WidgetKind::Button).unwrap();
        let b = tree.create(None, WidgetKind::Button).unwrap();
        let c = tree.create(None, WidgetKind::Button).unwrap();
        (tree, [a, b, c])
    }

    #[test]
    fn test_first_member_becomes_current() {
        let (_, [a, b, _]) = three_buttons();
        let mut group = FocusGroup::new();
        assert_eq!(group.current(), None);
        group.add(a);
        assert_eq!(group.current(), Some(a));
        group.add(b);
        assert_eq!(group.current(), Some(a));
    }

    #[test]
    fn test_next_wraps() {
        let (_, [a, b, c]) = three_buttons();
        let mut group = FocusGroup::new();
        group.add(a);
        group.add(b);
        group.add(c);

        assert_eq!(group.next().unwrap().to, b);
        assert_eq!(group.next().unwrap().to, c);
        let wrap = group.next().unwrap();
        assert_eq!(wrap.from, Some(c));
        assert_eq!(wrap.to, a);
    }

    #[test]
    fn test_prev_wraps() {
        let (_, [a, _, c]) = three_buttons();
        let mut group = FocusGroup::new();
        group.add(a);
        group.add(c);

        let change = group.prev().unwrap();
        assert_eq!(change.from, Some(a));
        assert_eq!(change.to, c);
    }

    #[test]
    fn test_empty_group_navigation_is_noop() {
        let mut group = FocusGroup::new();
        assert!(group.next().is_none());
        assert!(group.prev().is_none());
        assert_eq!(group.current(), None);
    }

    #[test]
    fn test_exactly_one_current_after_any_sequence() {
        let (_, [a, b, c]) = three_buttons();
        let mut group = FocusGroup::new();
        group.add(a);
        group.add(b);
        group.add(c);
        group.next();
        group.remove(b);
        group.prev();
        group.prev();

        let current = group.current().unwrap();
        assert!(group.members().contains(&current));
    }

    #[test]
    fn test_remove_focused_member_advances() {
        let (_, [a, b, c]) = three_buttons();
        let mut group = FocusGroup::new();
        group.add(a);
        group.add(b);
        group.add(c);
        group.next();
        assert_eq!(group.current(), Some(b));

        group.remove(b);
        assert_eq!(group.current(), Some(c));

        group.remove(c);
        group.remove(a);
        assert_eq!(group.current(), None);
    }

    #[test]
    fn test_prune_drops_destroyed_members() {
        let (mut tree, [a, b, c]) = three_buttons();
        let mut group = FocusGroup::new();
        group.add(a);
        group.add(b);
        group.add(c);
        group.next();
        assert_eq!(group.current(), Some(b));

        tree.destroy(b).unwrap();
        group.prune(&tree);

        assert_eq!(group.members(), &[a, c]);
        assert_eq!(group.current(), Some(c));
    }
}
