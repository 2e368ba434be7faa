//! Read-only view of the node graph the router draws wires for.
//!
//! The router never touches host types directly. A host implements
//! [`HostGraph`] over whatever it owns; [`GraphSnapshot`] is an owned
//! implementation for callers that just want to hand over plain data.

use indexmap::{IndexMap, IndexSet};

use crate::geometry::{Point, Rect};

pub type NodeId = u64;
pub type LinkId = u64;

/// Vertical spacing between consecutive slots on a node.
pub const SLOT_HEIGHT: f64 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Input,
    Output,
}

/// Source and target of a link, as stored in the host link table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LinkEndpoints {
    pub origin_id: NodeId,
    pub origin_slot: usize,
    pub target_id: NodeId,
    pub target_slot: usize,
}

pub trait HostGraph {
    /// Node ids in execution order.
    fn execution_order(&self) -> Vec<NodeId>;

    /// Bounding box of the node as drawn, `None` for unknown ids.
    fn node_bounds(&self, node: NodeId) -> Option<Rect>;

    /// Canvas position where a link attaches to the given slot.
    fn slot_position(&self, node: NodeId, kind: SlotKind, slot: usize) -> Option<Point>;

    /// Links leaving an output slot.
    fn output_links(&self, node: NodeId, slot: usize) -> Option<&[LinkId]>;

    /// The link attached to an input slot, if any.
    fn input_link(&self, node: NodeId, slot: usize) -> Option<LinkId>;

    fn output_count(&self, node: NodeId) -> usize;

    /// The link table, or `None` while the host has not set one up yet.
    fn links(&self) -> Option<Vec<(LinkId, LinkEndpoints)>>;

    fn link(&self, link: LinkId) -> Option<LinkEndpoints>;

    fn is_selected(&self, node: NodeId) -> bool;

    /// Stroke colour for a link, falling back to the default for its
    /// connection type.
    fn link_color(&self, link: LinkId) -> Option<&str>;

    /// True when the source node lists `link` on one of its outputs.
    fn owns_output_link(&self, node: NodeId, link: LinkId) -> bool {
        (0..self.output_count(node)).any(|slot| {
            self.output_links(node, slot)
                .map_or(false, |links| links.contains(&link))
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
struct SnapshotNode {
    bounds: Rect,
    inputs: Vec<Option<LinkId>>,
    outputs: Vec<Vec<LinkId>>,
}

impl SnapshotNode {
    fn slot_position(&self, kind: SlotKind, slot: usize) -> Option<Point> {
        let count = match kind {
            SlotKind::Input => self.inputs.len(),
            SlotKind::Output => self.outputs.len(),
        };
        if slot >= count {
            return None;
        }
        let y = self.bounds.top + SLOT_HEIGHT * (slot as f64 + 0.5);
        let x = match kind {
            SlotKind::Input => self.bounds.left,
            SlotKind::Output => self.bounds.right,
        };
        Some(Point::new(x, y))
    }
}

#[derive(Clone, Debug, PartialEq)]
struct SnapshotLink {
    endpoints: LinkEndpoints,
    connection_type: String,
}

/// Owned graph with a conventional slot layout: inputs on the left edge,
/// outputs on the right, one slot every [`SLOT_HEIGHT`] units from the top.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    nodes: IndexMap<NodeId, SnapshotNode>,
    links: Option<IndexMap<LinkId, SnapshotLink>>,
    selected: IndexSet<NodeId>,
    type_colors: IndexMap<String, String>,
    default_color: Option<String>,
    next_link: LinkId,
}

impl GraphSnapshot {
    pub fn new() -> Self {
        GraphSnapshot {
            links: Some(IndexMap::new()),
            next_link: 1,
            ..Default::default()
        }
    }

    /// A snapshot whose host has not created a link table yet.
    pub fn without_link_table() -> Self {
        GraphSnapshot {
            next_link: 1,
            ..Default::default()
        }
    }

    /// Adds or replaces a node. Existing slot connections are kept when the
    /// slot counts allow it.
    pub fn add_node(&mut self, id: NodeId, bounds: Rect, inputs: usize, outputs: usize) -> &mut Self {
        let previous = self.nodes.get(&id);
        let mut input_slots = vec![None; inputs];
        let mut output_slots = vec![Vec::new(); outputs];
        if let Some(previous) = previous {
            for (slot, link) in previous.inputs.iter().enumerate().take(inputs) {
                input_slots[slot] = *link;
            }
            for (slot, links) in previous.outputs.iter().enumerate().take(outputs) {
                output_slots[slot] = links.clone();
            }
        }
        self.nodes.insert(
            id,
            SnapshotNode {
                bounds,
                inputs: input_slots,
                outputs: output_slots,
            },
        );
        self
    }

    pub fn move_node(&mut self, id: NodeId, bounds: Rect) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.bounds = bounds;
        }
        self
    }

    /// Removes a node and every link attached to it.
    pub fn remove_node(&mut self, id: NodeId) -> &mut Self {
        if let Some(node) = self.nodes.shift_remove(&id) {
            let attached: Vec<LinkId> = node
                .outputs
                .iter()
                .flatten()
                .copied()
                .chain(node.inputs.iter().flatten().copied())
                .collect();
            for link in attached {
                self.remove_link(link);
            }
        }
        self.selected.shift_remove(&id);
        self
    }

    /// Connects an output slot to an input slot and returns the new link id.
    /// An input already connected is disconnected first, as a node editor does.
    pub fn connect(
        &mut self,
        origin_id: NodeId,
        origin_slot: usize,
        target_id: NodeId,
        target_slot: usize,
    ) -> LinkId {
        let id = self.next_link;
        self.connect_with_id(id, origin_id, origin_slot, target_id, target_slot);
        id
    }

    pub fn connect_with_id(
        &mut self,
        id: LinkId,
        origin_id: NodeId,
        origin_slot: usize,
        target_id: NodeId,
        target_slot: usize,
    ) -> &mut Self {
        self.next_link = self.next_link.max(id + 1);
        let existing = self
            .nodes
            .get(&target_id)
            .and_then(|node| node.inputs.get(target_slot).copied().flatten());
        if let Some(existing) = existing {
            self.remove_link(existing);
        }

        if let Some(slot) = self
            .nodes
            .get_mut(&origin_id)
            .and_then(|node| node.outputs.get_mut(origin_slot))
        {
            slot.push(id);
        }
        if let Some(slot) = self
            .nodes
            .get_mut(&target_id)
            .and_then(|node| node.inputs.get_mut(target_slot))
        {
            *slot = Some(id);
        }

        let endpoints = LinkEndpoints {
            origin_id,
            origin_slot,
            target_id,
            target_slot,
        };
        self.links.get_or_insert_with(IndexMap::new).insert(
            id,
            SnapshotLink {
                endpoints,
                connection_type: String::new(),
            },
        );
        self
    }

    pub fn set_link_type(&mut self, link: LinkId, connection_type: &str) -> &mut Self {
        if let Some(entry) = self.links.as_mut().and_then(|links| links.get_mut(&link)) {
            entry.connection_type = connection_type.to_string();
        }
        self
    }

    pub fn set_type_color(&mut self, connection_type: &str, color: &str) -> &mut Self {
        self.type_colors
            .insert(connection_type.to_string(), color.to_string());
        self
    }

    pub fn set_default_color(&mut self, color: &str) -> &mut Self {
        self.default_color = Some(color.to_string());
        self
    }

    /// Drops a link from the link table and from both slots it occupies.
    pub fn remove_link(&mut self, link: LinkId) -> &mut Self {
        let Some(removed) = self.links.as_mut().and_then(|links| links.shift_remove(&link)) else {
            return self;
        };
        let endpoints = removed.endpoints;
        if let Some(slot) = self
            .nodes
            .get_mut(&endpoints.origin_id)
            .and_then(|node| node.outputs.get_mut(endpoints.origin_slot))
        {
            slot.retain(|id| *id != link);
        }
        if let Some(slot) = self
            .nodes
            .get_mut(&endpoints.target_id)
            .and_then(|node| node.inputs.get_mut(endpoints.target_slot))
        {
            if *slot == Some(link) {
                *slot = None;
            }
        }
        self
    }

    /// Removes a link from its source node's output list while leaving it
    /// in the link table, the way a half-applied host edit can.
    pub fn detach_output(&mut self, link: LinkId) -> &mut Self {
        for node in self.nodes.values_mut() {
            for slot in node.outputs.iter_mut() {
                slot.retain(|id| *id != link);
            }
        }
        self
    }

    pub fn select(&mut self, node: NodeId) -> &mut Self {
        self.selected.insert(node);
        self
    }

    pub fn clear_selection(&mut self) -> &mut Self {
        self.selected.clear();
        self
    }
}

impl HostGraph for GraphSnapshot {
    fn execution_order(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn node_bounds(&self, node: NodeId) -> Option<Rect> {
        self.nodes.get(&node).map(|node| node.bounds)
    }

    fn slot_position(&self, node: NodeId, kind: SlotKind, slot: usize) -> Option<Point> {
        self.nodes.get(&node)?.slot_position(kind, slot)
    }

    fn output_links(&self, node: NodeId, slot: usize) -> Option<&[LinkId]> {
        self.nodes
            .get(&node)?
            .outputs
            .get(slot)
            .map(|links| links.as_slice())
    }

    fn input_link(&self, node: NodeId, slot: usize) -> Option<LinkId> {
        self.nodes.get(&node)?.inputs.get(slot).copied().flatten()
    }

    fn output_count(&self, node: NodeId) -> usize {
        self.nodes.get(&node).map_or(0, |node| node.outputs.len())
    }

    fn links(&self) -> Option<Vec<(LinkId, LinkEndpoints)>> {
        self.links.as_ref().map(|links| {
            links
                .iter()
                .map(|(id, link)| (*id, link.endpoints))
                .collect()
        })
    }

    fn link(&self, link: LinkId) -> Option<LinkEndpoints> {
        self.links.as_ref()?.get(&link).map(|link| link.endpoints)
    }

    fn is_selected(&self, node: NodeId) -> bool {
        self.selected.contains(&node)
    }

    fn link_color(&self, link: LinkId) -> Option<&str> {
        let link = self.links.as_ref()?.get(&link)?;
        self.type_colors
            .get(&link.connection_type)
            .or(self.default_color.as_ref())
            .map(|color| color.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_nodes() -> GraphSnapshot {
        let mut graph = GraphSnapshot::new();
        graph
            .add_node(1, Rect::from_xywh(0.0, 0.0, 100.0, 60.0), 0, 2)
            .add_node(2, Rect::from_xywh(300.0, 0.0, 100.0, 60.0), 2, 0);
        graph
    }

    #[test]
    fn slots_follow_the_default_layout() {
        let graph = two_nodes();
        assert_eq!(
            graph.slot_position(1, SlotKind::Output, 1),
            Some(Point::new(100.0, 30.0))
        );
        assert_eq!(
            graph.slot_position(2, SlotKind::Input, 0),
            Some(Point::new(300.0, 10.0))
        );
        assert_eq!(graph.slot_position(2, SlotKind::Input, 2), None);
    }

    #[test]
    fn reconnecting_an_input_replaces_the_old_link() {
        let mut graph = two_nodes();
        let first = graph.connect(1, 0, 2, 0);
        let second = graph.connect(1, 1, 2, 0);
        assert_eq!(graph.link(first), None);
        assert_eq!(graph.input_link(2, 0), Some(second));
        assert!(graph.owns_output_link(1, second));
        assert!(!graph.owns_output_link(1, first));
    }

    #[test]
    fn removing_a_node_drops_its_links() {
        let mut graph = two_nodes();
        let link = graph.connect(1, 0, 2, 1);
        graph.remove_node(2);
        assert_eq!(graph.link(link), None);
        assert_eq!(graph.output_links(1, 0), Some(&[][..]));
    }

    #[test]
    fn link_colour_falls_back_to_default() {
        let mut graph = two_nodes();
        let typed = graph.connect(1, 0, 2, 0);
        let plain = graph.connect(1, 1, 2, 1);
        graph
            .set_link_type(typed, "IMAGE")
            .set_type_color("IMAGE", "#64b5f6")
            .set_default_color("#9a9");
        assert_eq!(graph.link_color(typed), Some("#64b5f6"));
        assert_eq!(graph.link_color(plain), Some("#9a9"));
    }
}
