/// Identifier of a renderable node in the host environment. The layout
/// assigns these in sibling order, but the tracker only ever goes
/// through [`SelectionHost`] to interpret them.
pub type NodeId = usize;

/// An active selection range as reported by the host: anchor and focus
/// node plus char offsets within each. Anchor and focus may be in
/// either order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub anchor: NodeId,
    pub focus: NodeId,
    pub anchor_offset: usize,
    pub focus_offset: usize,
}

impl SelectionRange {
    /// A range covering all `len` chars of a single node.
    pub fn whole_node(node: NodeId, len: usize) -> Self {
        Self {
            anchor: node,
            focus: node,
            anchor_offset: 0,
            focus_offset: len,
        }
    }
}

/// The slice of the host environment the tracker needs: the current
/// range, node text lengths, each node's 0-based ordinal among its
/// siblings, and whether a node sits inside the color picker's subtree.
pub trait SelectionHost {
    fn active_range(&self) -> Option<SelectionRange>;
    fn node_text_len(&self, node: NodeId) -> usize;
    fn node_ordinal(&self, node: NodeId) -> usize;
    fn picker_contains(&self, node: NodeId) -> bool;
}

/// Reduces host selection-change notifications to "exactly one whole
/// word token is selected" or nothing.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    selected: Option<usize>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Recompute the selection from the host's current range. A range
    /// anchored inside the picker subtree is ignored outright, keeping
    /// the previous selection; a range that covers exactly one whole
    /// node selects that node's ordinal; anything else (cross-node,
    /// partial, collapsed, no range) clears the selection. Returns true
    /// if the selection changed.
    pub fn on_selection_change(&mut self, host: &dyn SelectionHost) -> bool {
        let next = match host.active_range() {
            Some(range) if host.picker_contains(range.anchor) => return false,
            Some(range) => resolve(range, host),
            None => None,
        };
        let changed = next != self.selected;
        self.selected = next;
        changed
    }
}

fn resolve(range: SelectionRange, host: &dyn SelectionHost) -> Option<usize> {
    if range.anchor != range.focus {
        return None;
    }
    let len = host.node_text_len(range.anchor);
    let lo = range.anchor_offset.min(range.focus_offset);
    let hi = range.anchor_offset.max(range.focus_offset);
    if hi - lo == len && len > 0 {
        Some(host.node_ordinal(range.anchor))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeId, SelectionHost, SelectionRange, SelectionTracker};

    struct FakeHost {
        nodes: Vec<&'static str>,
        picker: Vec<NodeId>,
        range: Option<SelectionRange>,
    }

    impl FakeHost {
        fn new(nodes: Vec<&'static str>) -> Self {
            Self {
                nodes,
                picker: Vec::new(),
                range: None,
            }
        }

        fn with_range(mut self, range: SelectionRange) -> Self {
            self.range = Some(range);
            self
        }
    }

    impl SelectionHost for FakeHost {
        fn active_range(&self) -> Option<SelectionRange> {
            self.range
        }

        fn node_text_len(&self, node: NodeId) -> usize {
            self.nodes.get(node).map_or(0, |t| t.chars().count())
        }

        fn node_ordinal(&self, node: NodeId) -> usize {
            node
        }

        fn picker_contains(&self, node: NodeId) -> bool {
            self.picker.contains(&node)
        }
    }

    fn nodes() -> Vec<&'static str> {
        vec!["The", " ", "cat", " ", "sat"]
    }

    #[test]
    fn whole_node_selection_yields_its_ordinal() {
        let host = FakeHost::new(nodes()).with_range(SelectionRange::whole_node(2, 3));
        let mut tracker = SelectionTracker::new();
        assert!(tracker.on_selection_change(&host));
        assert_eq!(tracker.selected(), Some(2));
    }

    #[test]
    fn reversed_offsets_still_count_as_whole_node() {
        let host = FakeHost::new(nodes()).with_range(SelectionRange {
            anchor: 2,
            focus: 2,
            anchor_offset: 3,
            focus_offset: 0,
        });
        let mut tracker = SelectionTracker::new();
        tracker.on_selection_change(&host);
        assert_eq!(tracker.selected(), Some(2));
    }

    #[test]
    fn partial_selection_clears() {
        let host = FakeHost::new(nodes()).with_range(SelectionRange {
            anchor: 2,
            focus: 2,
            anchor_offset: 0,
            focus_offset: 2,
        });
        let mut tracker = SelectionTracker::new();
        tracker.on_selection_change(&host);
        assert_eq!(tracker.selected(), None);
    }

    #[test]
    fn cross_node_selection_clears() {
        let host = FakeHost::new(nodes()).with_range(SelectionRange {
            anchor: 0,
            focus: 2,
            anchor_offset: 0,
            focus_offset: 3,
        });
        let mut tracker = SelectionTracker::new();
        tracker.on_selection_change(&host);
        assert_eq!(tracker.selected(), None);
    }

    #[test]
    fn collapsed_selection_clears() {
        let whole = FakeHost::new(nodes()).with_range(SelectionRange::whole_node(2, 3));
        let mut tracker = SelectionTracker::new();
        tracker.on_selection_change(&whole);
        assert_eq!(tracker.selected(), Some(2));

        let collapsed = FakeHost::new(nodes()).with_range(SelectionRange {
            anchor: 2,
            focus: 2,
            anchor_offset: 1,
            focus_offset: 1,
        });
        tracker.on_selection_change(&collapsed);
        assert_eq!(tracker.selected(), None);
    }

    #[test]
    fn no_range_clears() {
        let whole = FakeHost::new(nodes()).with_range(SelectionRange::whole_node(4, 3));
        let mut tracker = SelectionTracker::new();
        tracker.on_selection_change(&whole);
        assert_eq!(tracker.selected(), Some(4));

        let empty = FakeHost::new(nodes());
        assert!(tracker.on_selection_change(&empty));
        assert_eq!(tracker.selected(), None);
    }

    #[test]
    fn range_inside_picker_is_ignored_entirely() {
        let whole = FakeHost::new(nodes()).with_range(SelectionRange::whole_node(2, 3));
        let mut tracker = SelectionTracker::new();
        tracker.on_selection_change(&whole);
        assert_eq!(tracker.selected(), Some(2));

        let mut in_picker = FakeHost::new(nodes()).with_range(SelectionRange::whole_node(0, 3));
        in_picker.picker = vec![0];
        assert!(!tracker.on_selection_change(&in_picker));
        assert_eq!(tracker.selected(), Some(2));
    }

    #[test]
    fn unknown_node_never_selects() {
        let host = FakeHost::new(nodes()).with_range(SelectionRange::whole_node(42, 0));
        let mut tracker = SelectionTracker::new();
        tracker.on_selection_change(&host);
        assert_eq!(tracker.selected(), None);
    }
}
