//! The SS-tree itself: node arena, insertion engine, and k-NN query engine.
//!
//! Points are grouped into nested bounding spheres. Every node caches its
//! centroid, a radius bounding every point transitively beneath it, and
//! loose per-axis variance estimates used only to pick split axes. Insertion
//! descends to the leaf with the nearest centroid and splits overflowing
//! nodes bottom-up, the way a B-tree propagates splits, so the tree stays
//! balanced. Queries run best-first branch-and-bound over the spheres.

use crate::bound_queue::BoundQueue;
use crate::candidates::CandidateHeap;
use crate::{Error, Result};
use itertools::Itertools;
use log::trace;

/// An input record: a 2-D position plus opaque application data.
///
/// The tree never inspects the payload; it only stores and returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Point<T> {
    pub x: f64,
    pub y: f64,
    pub payload: T,
}

impl<T> Point<T> {
    pub fn new(x: f64, y: f64, payload: T) -> Self {
        Self { x, y, payload }
    }
}

#[derive(Debug)]
enum NodeKind<T> {
    /// Stores points directly, in insertion order.
    Leaf(Vec<Point<T>>),
    /// Stores arena indices of child nodes.
    Inner(Vec<u32>),
}

/// A tree node plus its cached geometric summaries. The summaries are kept
/// consistent with the node's contents after every public operation.
#[derive(Debug)]
struct Node<T> {
    /// Centroid: unweighted mean of the member points (leaf) or of the
    /// children's centroids (inner).
    x: f64,
    y: f64,
    /// Upper bound on the distance from the centroid to every point
    /// transitively stored beneath this node.
    radius: f64,
    /// Per-axis variance proxies: max squared axis distance from the
    /// centroid to a member (plus the member's squared radius for inner
    /// nodes). Loose upper bounds, only used to choose a split axis.
    x_var: f64,
    y_var: f64,
    /// Back-reference into the arena; `None` for the root.
    parent: Option<u32>,
    kind: NodeKind<T>,
}

impl<T> Node<T> {
    fn leaf(points: Vec<Point<T>>) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            radius: 0.0,
            x_var: 0.0,
            y_var: 0.0,
            parent: None,
            kind: NodeKind::Leaf(points),
        }
    }

    fn inner(children: Vec<u32>) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            radius: 0.0,
            x_var: 0.0,
            y_var: 0.0,
            parent: None,
            kind: NodeKind::Inner(children),
        }
    }
}

fn dist2(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = ax - bx;
    let dy = ay - by;
    dx * dx + dy * dy
}

fn points_centroid<T>(points: &[Point<T>]) -> (f64, f64) {
    let n = points.len() as f64;
    let (mut cx, mut cy) = (0.0, 0.0);
    for point in points {
        cx += point.x;
        cy += point.y;
    }
    (cx / n, cy / n)
}

/// A similarity-search tree over 2-D points.
///
/// `max_elements_per_cluster` bounds both the number of points per leaf and
/// the number of children per inner node; splits divide an overflowing node
/// at `split_size = max_elements_per_cluster / 2`.
pub struct SsTree<T> {
    /// Bump-allocated node storage; `u32` child and parent links are indices
    /// into this vector. A node replaced by a split simply goes unreferenced
    /// and is released with the rest when the tree is dropped.
    nodes: Vec<Node<T>>,
    root: u32,
    count: usize,
    max_per_node: usize,
    split_size: usize,
}

impl<T> SsTree<T> {
    /// Makes an empty tree whose leaves hold at most
    /// `max_elements_per_cluster` points and whose inner nodes hold at most
    /// that many children.
    ///
    /// Fails with [`Error::InvalidArgument`] when the bound is less than 2.
    ///
    /// ```
    /// # use sstree::SsTree;
    /// let tree = SsTree::<u32>::new(4).unwrap();
    /// assert!(tree.is_empty());
    /// assert!(SsTree::<u32>::new(1).is_err());
    /// ```
    pub fn new(max_elements_per_cluster: usize) -> Result<Self> {
        if max_elements_per_cluster < 2 {
            return Err(Error::InvalidArgument(
                "max_elements_per_cluster must be at least 2",
            ));
        }
        Ok(Self {
            nodes: vec![Node::leaf(Vec::new())],
            root: 0,
            count: 0,
            max_per_node: max_elements_per_cluster,
            split_size: max_elements_per_cluster / 2,
        })
    }

    /// Gets the number of points in the tree.
    ///
    /// ```
    /// # use sstree::{Point, SsTree};
    /// let mut tree = SsTree::new(4).unwrap();
    /// tree.insert(Point::new(1.0, 2.0, "a"));
    /// assert_eq!(tree.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.count
    }

    /// Checks if the tree is empty.
    ///
    /// ```
    /// # use sstree::SsTree;
    /// let tree = SsTree::<u32>::new(4).unwrap();
    /// assert!(tree.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The capacity bound fixed at construction.
    pub fn max_elements_per_cluster(&self) -> usize {
        self.max_per_node
    }

    /// How many members the first half of a split receives.
    pub fn split_size(&self) -> usize {
        self.split_size
    }

    /// Iterates over every point in the tree, depth-first.
    pub fn points(&self) -> Points<'_, T> {
        Points {
            tree: self,
            stack: vec![self.root],
            current: [].iter(),
        }
    }

    /// Inserts a point, splitting overflowing nodes bottom-up as needed.
    /// Every node on the path from the insertion leaf to the root ends the
    /// call with consistent centroid, radius, and variance summaries.
    ///
    /// ```
    /// # use sstree::{Point, SsTree};
    /// let mut tree = SsTree::new(2).unwrap();
    /// tree.insert(Point::new(0.0, 0.0, "a"));
    /// tree.insert(Point::new(10.0, 10.0, "b"));
    /// tree.insert(Point::new(1.0, 1.0, "c"));
    /// assert_eq!(tree.len(), 3);
    /// ```
    pub fn insert(&mut self, point: Point<T>) {
        // No matter what we will insert the point, so increase the count now.
        self.count += 1;
        let leaf = self.nearest_leaf(point.x, point.y);
        let room = match &self.nodes[leaf as usize].kind {
            NodeKind::Leaf(points) => points.len() < self.max_per_node,
            NodeKind::Inner(_) => unreachable!("descent must end at a leaf"),
        };

        if room {
            if let NodeKind::Leaf(points) = &mut self.nodes[leaf as usize].kind {
                points.push(point);
            }
            self.refresh_leaf(leaf);
            // Propagate the centroid change upward; each ancestor is
            // refreshed from its immediate children only, keeping this
            // O(depth) rather than O(size).
            let mut up = self.nodes[leaf as usize].parent;
            while let Some(index) = up {
                self.refresh_inner(index);
                up = self.nodes[index as usize].parent;
            }
            return;
        }

        trace!("splitting leaf({}) at capacity({})", leaf, self.max_per_node);
        let parent = self.nodes[leaf as usize].parent;
        let (primary, secondary) = self.split_leaf(leaf, point);
        let mut node = match parent {
            None => {
                self.raise_root(primary, secondary);
                return;
            }
            Some(parent) => {
                self.replace_child(parent, leaf, primary);
                parent
            }
        };

        // Walk upward carrying the half that still needs a home. Once it is
        // absorbed, the remaining ancestors only need their summaries
        // refreshed.
        let mut pending = Some(secondary);
        loop {
            if let Some(extra) = pending.take() {
                let at_capacity = match &self.nodes[node as usize].kind {
                    NodeKind::Inner(children) => children.len() >= self.max_per_node,
                    NodeKind::Leaf(_) => {
                        unreachable!("ancestor of a split node must be an inner node")
                    }
                };
                if at_capacity {
                    trace!("cascading split of inner node({})", node);
                    let parent = self.nodes[node as usize].parent;
                    let (primary, secondary) = self.split_inner(node, extra);
                    match parent {
                        None => {
                            self.raise_root(primary, secondary);
                            return;
                        }
                        Some(parent) => {
                            self.replace_child(parent, node, primary);
                            pending = Some(secondary);
                            node = parent;
                            // Both halves already carry final summaries.
                            continue;
                        }
                    }
                } else {
                    self.attach_child(node, extra);
                }
            }
            self.refresh_inner(node);
            match self.nodes[node as usize].parent {
                Some(parent) => node = parent,
                None => return,
            }
        }
    }

    /// Finds up to `k` payloads ordered by ascending Euclidean distance to
    /// `query` (fewer than `k` if the tree holds fewer points).
    ///
    /// Fails with [`Error::InvalidArgument`] when `k` is zero. Querying an
    /// empty tree returns an empty vector.
    ///
    /// ```
    /// # use sstree::{Point, SsTree};
    /// let mut tree = SsTree::new(4).unwrap();
    /// tree.insert(Point::new(0.0, 0.0, "origin"));
    /// tree.insert(Point::new(3.0, 4.0, "near"));
    /// tree.insert(Point::new(50.0, 50.0, "far"));
    /// let found = tree.k_nearest((1.0, 1.0), 2).unwrap();
    /// assert_eq!(found, vec!["origin", "near"]);
    /// ```
    pub fn k_nearest(&self, query: (f64, f64), k: usize) -> Result<Vec<T>>
    where
        T: Clone,
    {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be positive"));
        }
        let (qx, qy) = query;
        let mut best = CandidateHeap::new(k)?;
        trace!("k_nearest query({}, {}) k({})", qx, qy, k);

        match &self.nodes[self.root as usize].kind {
            NodeKind::Leaf(points) => {
                // The tree is a single leaf; every point must be examined.
                for point in points {
                    best.push(dist2(point.x, point.y, qx, qy).sqrt(), point.payload.clone());
                }
            }
            NodeKind::Inner(children) => {
                let mut queue = BoundQueue::new();
                for &child in children {
                    queue.push(self.lower_bound(child, qx, qy), child);
                }
                while let Some((bound, index)) = queue.pop() {
                    trace!("expanding node({}) bound({})", index, bound);
                    match &self.nodes[index as usize].kind {
                        NodeKind::Leaf(points) => {
                            for point in points {
                                best.push(
                                    dist2(point.x, point.y, qx, qy).sqrt(),
                                    point.payload.clone(),
                                );
                            }
                        }
                        NodeKind::Inner(children) => {
                            for &child in children {
                                queue.push(self.lower_bound(child, qx, qy), child);
                            }
                        }
                    }
                    if let Some(worst) = best.worst() {
                        queue.prune(worst);
                    }
                }
            }
        }
        Ok(best.into_sorted())
    }

    /// A provable floor on the distance from the query point to any point
    /// under `index`: zero when the query lies inside the bounding ball.
    fn lower_bound(&self, index: u32, qx: f64, qy: f64) -> f64 {
        let node = &self.nodes[index as usize];
        let centroid_dist = dist2(node.x, node.y, qx, qy).sqrt();
        if centroid_dist <= node.radius {
            0.0
        } else {
            centroid_dist - node.radius
        }
    }

    /// Descends from the root to the leaf whose centroid is nearest to
    /// `(x, y)`; ties keep the first-encountered child.
    fn nearest_leaf(&self, x: f64, y: f64) -> u32 {
        let mut node = self.root;
        loop {
            match &self.nodes[node as usize].kind {
                NodeKind::Leaf(_) => return node,
                NodeKind::Inner(children) => {
                    let mut best = children[0];
                    let mut best_dist = {
                        let child = &self.nodes[best as usize];
                        dist2(child.x, child.y, x, y)
                    };
                    for &candidate in &children[1..] {
                        let child = &self.nodes[candidate as usize];
                        let dist = dist2(child.x, child.y, x, y);
                        if dist < best_dist {
                            best = candidate;
                            best_dist = dist;
                        }
                    }
                    node = best;
                }
            }
        }
    }

    fn allocate(&mut self, node: Node<T>) -> u32 {
        let index = self.nodes.len() as u32;
        assert!(index < std::u32::MAX);
        self.nodes.push(node);
        index
    }

    fn new_leaf(&mut self, points: Vec<Point<T>>) -> u32 {
        let index = self.allocate(Node::leaf(points));
        self.refresh_leaf(index);
        index
    }

    fn new_inner(&mut self, children: Vec<u32>) -> u32 {
        let index = self.nodes.len() as u32;
        for &child in &children {
            self.nodes[child as usize].parent = Some(index);
        }
        self.allocate(Node::inner(children));
        self.refresh_inner(index);
        index
    }

    /// Recomputes a leaf's summaries from scratch over its points. An empty
    /// leaf (only the root before the first insertion) keeps zeroed
    /// summaries.
    fn refresh_leaf(&mut self, index: u32) {
        let node = &mut self.nodes[index as usize];
        let points = match &node.kind {
            NodeKind::Leaf(points) => points,
            NodeKind::Inner(_) => unreachable!("refresh_leaf on an inner node"),
        };
        if points.is_empty() {
            return;
        }
        let (cx, cy) = points_centroid(points);
        let mut radius2 = 0.0f64;
        let mut x_var = 0.0f64;
        let mut y_var = 0.0f64;
        for point in points {
            let dx = (cx - point.x) * (cx - point.x);
            let dy = (cy - point.y) * (cy - point.y);
            radius2 = radius2.max(dx + dy);
            x_var = x_var.max(dx);
            y_var = y_var.max(dy);
        }
        node.x = cx;
        node.y = cy;
        node.radius = radius2.sqrt();
        node.x_var = x_var;
        node.y_var = y_var;
    }

    /// Recomputes an inner node's summaries from its immediate children:
    /// the centroid is the mean of the child centroids, and the radius must
    /// reach past each child's own radius so it bounds every point
    /// transitively contained.
    fn refresh_inner(&mut self, index: u32) {
        let children = match &self.nodes[index as usize].kind {
            NodeKind::Inner(children) => children.clone(),
            NodeKind::Leaf(_) => unreachable!("refresh_inner on a leaf"),
        };
        let (cx, cy) = self.children_centroid(&children);
        let mut radius = 0.0f64;
        let mut x_var = 0.0f64;
        let mut y_var = 0.0f64;
        for &child in &children {
            let child = &self.nodes[child as usize];
            let dx = (cx - child.x) * (cx - child.x);
            let dy = (cy - child.y) * (cy - child.y);
            radius = radius.max((dx + dy).sqrt() + child.radius);
            x_var = x_var.max(dx + child.radius * child.radius);
            y_var = y_var.max(dy + child.radius * child.radius);
        }
        let node = &mut self.nodes[index as usize];
        node.x = cx;
        node.y = cy;
        node.radius = radius;
        node.x_var = x_var;
        node.y_var = y_var;
    }

    fn children_centroid(&self, children: &[u32]) -> (f64, f64) {
        let n = children.len() as f64;
        let (mut cx, mut cy) = (0.0, 0.0);
        for &child in children {
            let child = &self.nodes[child as usize];
            cx += child.x;
            cy += child.y;
        }
        (cx / n, cy / n)
    }

    /// Splits a full leaf along its widest axis and inserts `new_point` into
    /// the half whose centroid sits closer to the centroid the leaf had
    /// before the split. Returns `(primary, secondary)` where `primary` is
    /// that closer half.
    fn split_leaf(&mut self, leaf: u32, new_point: Point<T>) -> (u32, u32) {
        let node = &mut self.nodes[leaf as usize];
        let (ox, oy) = (node.x, node.y);
        let by_x = node.x_var >= node.y_var;
        let points = match &mut node.kind {
            NodeKind::Leaf(points) => std::mem::replace(points, Vec::new()),
            NodeKind::Inner(_) => unreachable!("split_leaf on an inner node"),
        };
        let mut first: Vec<Point<T>> = if by_x {
            points.into_iter().sorted_by(|a, b| a.x.total_cmp(&b.x)).collect()
        } else {
            points.into_iter().sorted_by(|a, b| a.y.total_cmp(&b.y)).collect()
        };
        let second = first.split_off(self.split_size);

        let (ax, ay) = points_centroid(&first);
        let (bx, by) = points_centroid(&second);
        let first_primary = dist2(ox, oy, ax, ay) <= dist2(ox, oy, bx, by);
        let (mut primary_points, secondary_points) = if first_primary {
            (first, second)
        } else {
            (second, first)
        };
        primary_points.push(new_point);

        let primary = self.new_leaf(primary_points);
        let secondary = self.new_leaf(secondary_points);
        (primary, secondary)
    }

    /// Splits a full inner node the same way, except the members are child
    /// nodes and the pending `extra` child takes the place of the new point.
    /// The split axis comes from the node's cached variances, read before
    /// anything moves.
    fn split_inner(&mut self, index: u32, extra: u32) -> (u32, u32) {
        let node = &self.nodes[index as usize];
        let (ox, oy) = (node.x, node.y);
        let by_x = node.x_var >= node.y_var;
        let children = match &node.kind {
            NodeKind::Inner(children) => children.clone(),
            NodeKind::Leaf(_) => unreachable!("split_inner on a leaf"),
        };
        let mut first: Vec<u32> = if by_x {
            children
                .into_iter()
                .sorted_by(|&a, &b| self.nodes[a as usize].x.total_cmp(&self.nodes[b as usize].x))
                .collect()
        } else {
            children
                .into_iter()
                .sorted_by(|&a, &b| self.nodes[a as usize].y.total_cmp(&self.nodes[b as usize].y))
                .collect()
        };
        let second = first.split_off(self.split_size);

        let (ax, ay) = self.children_centroid(&first);
        let (bx, by) = self.children_centroid(&second);
        let first_primary = dist2(ox, oy, ax, ay) <= dist2(ox, oy, bx, by);
        let (mut primary_children, secondary_children) = if first_primary {
            (first, second)
        } else {
            (second, first)
        };
        primary_children.push(extra);

        let primary = self.new_inner(primary_children);
        let secondary = self.new_inner(secondary_children);
        (primary, secondary)
    }

    /// Swaps a split node out of its parent's child list for `new`, which is
    /// appended at the end. Only the node that was split leaves the parent.
    fn replace_child(&mut self, parent: u32, old: u32, new: u32) {
        if let NodeKind::Inner(children) = &mut self.nodes[parent as usize].kind {
            children.retain(|&child| child != old);
            children.push(new);
        }
        self.nodes[new as usize].parent = Some(parent);
    }

    fn attach_child(&mut self, parent: u32, child: u32) {
        if let NodeKind::Inner(children) = &mut self.nodes[parent as usize].kind {
            children.push(child);
        }
        self.nodes[child as usize].parent = Some(parent);
    }

    /// A root split grows the tree by one level: the two halves become the
    /// children of a fresh root.
    fn raise_root(&mut self, primary: u32, secondary: u32) {
        trace!("root split, tree grows a level");
        self.root = self.new_inner(vec![primary, secondary]);
    }
}

/// Depth-first iterator over every point in the tree, returned by
/// [`SsTree::points`].
pub struct Points<'a, T> {
    tree: &'a SsTree<T>,
    stack: Vec<u32>,
    current: std::slice::Iter<'a, Point<T>>,
}

impl<'a, T> Iterator for Points<'a, T> {
    type Item = &'a Point<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(point) = self.current.next() {
                return Some(point);
            }
            let index = self.stack.pop()?;
            match &self.tree.nodes[index as usize].kind {
                NodeKind::Leaf(points) => self.current = points.iter(),
                NodeKind::Inner(children) => self.stack.extend(children.iter().rev().cloned()),
            }
        }
    }
}
