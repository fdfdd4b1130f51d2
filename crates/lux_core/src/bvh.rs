//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! The tree lives in a flat arena: leaves occupy the first slots (one per
//! primitive, in input order) and internal nodes are appended behind them
//! during construction. Children are referenced by index, so the tree is
//! cheap to clone, trivially `Send + Sync`, and cannot contain cycles.
//!
//! The same structure serves both levels of the scene: one BVH per mesh over
//! triangle bounds, and one BVH per scene over object world bounds.

use lux_math::{Aabb, DVec3};

/// Padding applied to every leaf so flat primitives (axis-aligned
/// triangles) still have a box with volume.
pub const BVH_CONSTRUCTION_EPSILON: f64 = 0.0001;

/// A node of the arena.
///
/// Leaves carry the index of the primitive they bound; internal nodes carry
/// both children. A single-primitive tree is just its leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub center: DVec3,
    pub leaf_index: Option<u32>,
    pub left: Option<u32>,
    pub right: Option<u32>,
}

impl BvhNode {
    /// Create a leaf for primitive `index`, inflating its bounds.
    ///
    /// The center is taken after inflation, which leaves it unchanged.
    pub fn leaf(bounds: Aabb, index: u32) -> Self {
        let bounds = bounds.inflate(BVH_CONSTRUCTION_EPSILON);
        Self {
            bounds,
            center: bounds.center(),
            leaf_index: Some(index),
            left: None,
            right: None,
        }
    }

    fn internal(bounds: Aabb) -> Self {
        Self {
            bounds,
            center: bounds.center(),
            leaf_index: None,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.leaf_index.is_some()
    }
}

/// Binary BVH stored as an arena of [`BvhNode`]s.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    root: Option<u32>,
}

impl Bvh {
    /// Build a tree over one bounding box per primitive.
    ///
    /// The leaf index of each box is its position in the iterator. An empty
    /// input produces an empty tree (no root).
    pub fn from_bounds(bounds: impl IntoIterator<Item = Aabb>) -> Self {
        let leaves = bounds
            .into_iter()
            .enumerate()
            .map(|(i, b)| BvhNode::leaf(b, i as u32));
        Self::build(leaves.collect())
    }

    /// Build a tree from prepared leaf nodes.
    pub fn build(leaves: Vec<BvhNode>) -> Self {
        let leaf_count = leaves.len();
        let mut builder = Builder {
            items: (0..leaf_count as u32).collect(),
            nodes: leaves,
        };
        // Internal node count of a binary tree is leaves - 1
        builder.nodes.reserve(leaf_count.saturating_sub(1));

        let root = builder.construct_node(0, leaf_count);
        let bvh = Self {
            nodes: builder.nodes,
            root,
        };

        log::debug!(
            "Built BVH: {} leaves, {} nodes, depth {}",
            leaf_count,
            bvh.nodes.len(),
            bvh.depth()
        );

        bvh
    }

    /// Index of the root node, `None` for an empty tree.
    #[inline]
    pub fn root_index(&self) -> Option<u32> {
        self.root
    }

    /// The root node, `None` for an empty tree.
    pub fn root(&self) -> Option<&BvhNode> {
        self.root.map(|i| &self.nodes[i as usize])
    }

    /// Look up a node by arena index.
    #[inline]
    pub fn node(&self, index: u32) -> &BvhNode {
        &self.nodes[index as usize]
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of levels from the root to the deepest leaf (0 when empty).
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };

        let mut max_depth = 0;
        let mut stack = vec![(root, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            let node = self.node(index);
            for child in [node.left, node.right].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }
        max_depth
    }
}

struct Builder {
    nodes: Vec<BvhNode>,
    /// Arena indices of the leaves, partitioned in place during construction.
    items: Vec<u32>,
}

impl Builder {
    /// Build the subtree over `items[start..end]` and return its arena index.
    ///
    /// An empty range yields `None`; a single item is returned as-is, with no
    /// wrapper node.
    fn construct_node(&mut self, start: usize, end: usize) -> Option<u32> {
        if start >= end {
            return None;
        }
        if end - start == 1 {
            return Some(self.items[start]);
        }

        let bounds = self.items[start..end]
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| acc.union(&self.nodes[i as usize].bounds));
        let axis = bounds.largest_axis();

        // Median split on the center coordinate
        let mid = (start + end) / 2;
        let nodes = &self.nodes;
        self.items[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            let a_val = nodes[a as usize].center[axis];
            let b_val = nodes[b as usize].center[axis];
            a_val
                .partial_cmp(&b_val)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let index = self.nodes.len() as u32;
        self.nodes.push(BvhNode::internal(bounds));

        let left = self.construct_node(start, mid);
        let right = self.construct_node(mid, end);

        let node = &mut self.nodes[index as usize];
        node.left = left;
        node.right = right;

        Some(index)
    }
}
