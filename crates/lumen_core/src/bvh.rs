//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! The tree is stored flat: a node array with the root at index 0 and a
//! permutation array mapping each leaf's contiguous range back to the
//! original primitive indices. Construction is breadth-first, so the two
//! children of a branch are always adjacent in the node array.
//!
//! The same tree type serves both levels of the scene: one per shape over
//! its points, lines or triangles, and one per scene over object instances.

use std::collections::VecDeque;

use lumen_math::{Aabb, Ray, Vec3};

/// Maximum primitives per leaf node before splitting.
pub const BVH_MAX_PRIMS: usize = 4;

/// Capacity of the traversal stack.
pub const BVH_STACK_SIZE: usize = 128;

/// Depth after which midpoint splits give way to index half-splits.
///
/// Half-splits halve the range every level, which caps the total depth well
/// below the traversal stack capacity even for adversarial inputs.
const MIDPOINT_DEPTH_LIMIT: usize = 64;

/// A primitive as seen by the builder.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BvhPrimitive {
    pub bbox: Aabb,
    pub center: Vec3,
    /// Index of the primitive in its owner (element or object index).
    pub index: usize,
}

impl BvhPrimitive {
    pub fn new(index: usize, bbox: Aabb) -> Self {
        Self {
            bbox,
            center: bbox.centroid(),
            index,
        }
    }
}

/// BVH node - either a branch with two adjacent children or a leaf with a
/// range of primitives.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BvhNode {
    /// Internal node. Children live at `children` and `children + 1`.
    Branch { bbox: Aabb, axis: u8, children: u32 },
    /// Leaf covering `primitives[start..start + count]`.
    Leaf { bbox: Aabb, start: u32, count: u32 },
}

impl BvhNode {
    pub fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Branch { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }

    fn placeholder() -> Self {
        BvhNode::Leaf {
            bbox: Aabb::EMPTY,
            start: 0,
            count: 0,
        }
    }
}

/// A flat binary BVH.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    primitives: Vec<usize>,
}

/// A pending range of primitives waiting to become a node.
struct BuildTask {
    node: usize,
    start: usize,
    end: usize,
    depth: usize,
}

impl Bvh {
    /// Build a tree over `primitives`. An empty input gives an empty tree.
    pub fn build(mut primitives: Vec<BvhPrimitive>) -> Self {
        if primitives.is_empty() {
            return Self::default();
        }

        let mut nodes = Vec::with_capacity(primitives.len() * 2);
        nodes.push(BvhNode::placeholder());

        let mut queue = VecDeque::new();
        queue.push_back(BuildTask {
            node: 0,
            start: 0,
            end: primitives.len(),
            depth: 0,
        });

        while let Some(task) = queue.pop_front() {
            let range = &mut primitives[task.start..task.end];
            let bbox = range
                .iter()
                .fold(Aabb::EMPTY, |acc, prim| Aabb::surrounding(&acc, &prim.bbox));

            if range.len() <= BVH_MAX_PRIMS {
                nodes[task.node] = BvhNode::Leaf {
                    bbox,
                    start: task.start as u32,
                    count: range.len() as u32,
                };
                continue;
            }

            let (split, axis) = split_middle(range, task.depth);
            let mid = task.start + split;

            let children = nodes.len();
            nodes.push(BvhNode::placeholder());
            nodes.push(BvhNode::placeholder());
            nodes[task.node] = BvhNode::Branch {
                bbox,
                axis: axis as u8,
                children: children as u32,
            };

            queue.push_back(BuildTask {
                node: children,
                start: task.start,
                end: mid,
                depth: task.depth + 1,
            });
            queue.push_back(BuildTask {
                node: children + 1,
                start: mid,
                end: task.end,
                depth: task.depth + 1,
            });
        }

        Self {
            nodes,
            primitives: primitives.iter().map(|prim| prim.index).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Leaf permutation: original primitive indices in leaf order.
    pub fn primitives(&self) -> &[usize] {
        &self.primitives
    }

    /// Bounding box of the whole tree, empty for an empty tree.
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map(|root| *root.bbox()).unwrap_or(Aabb::EMPTY)
    }

    /// Walk the tree front to back, calling `hit_primitive` for every
    /// primitive in a leaf the ray reaches.
    ///
    /// The callback receives the ray with `tmax` shrunk to the closest hit
    /// found so far and returns the hit payload plus its distance. Returns
    /// the closest hit, or the first one found when `find_any` is set.
    pub fn intersect<H, F>(&self, ray: &Ray, find_any: bool, mut hit_primitive: F) -> Option<H>
    where
        F: FnMut(&Ray, usize) -> Option<(H, f32)>,
    {
        if self.nodes.is_empty() {
            return None;
        }

        let mut ray = *ray;
        let inv_dir = ray.inv_direction();
        let dir_is_neg = [
            ray.direction.x < 0.0,
            ray.direction.y < 0.0,
            ray.direction.z < 0.0,
        ];

        let mut stack = [0u32; BVH_STACK_SIZE];
        let mut top = 1;
        let mut closest = None;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];
            if !node.bbox().hit_inv(&ray, inv_dir) {
                continue;
            }

            match *node {
                BvhNode::Branch { axis, children, .. } => {
                    debug_assert!(top + 2 <= BVH_STACK_SIZE, "BVH traversal stack overflow");
                    // push the far child first so the near one is popped next
                    if dir_is_neg[axis as usize] {
                        stack[top] = children;
                        stack[top + 1] = children + 1;
                    } else {
                        stack[top] = children + 1;
                        stack[top + 1] = children;
                    }
                    top += 2;
                }
                BvhNode::Leaf { start, count, .. } => {
                    let start = start as usize;
                    for &prim in &self.primitives[start..start + count as usize] {
                        if let Some((hit, t)) = hit_primitive(&ray, prim) {
                            ray.tmax = t;
                            closest = Some(hit);
                            if find_any {
                                return closest;
                            }
                        }
                    }
                }
            }
        }

        closest
    }
}

/// Split a range at the geometric midpoint of its centers' widest axis.
///
/// Returns the split position within `range` and the chosen axis. Falls back
/// to halving the range when the centers have no extent, when every center
/// lands on one side, or once the tree is too deep.
fn split_middle(range: &mut [BvhPrimitive], depth: usize) -> (usize, usize) {
    let centers = range
        .iter()
        .fold(Aabb::EMPTY, |acc, prim| acc.include_point(prim.center));
    let axis = centers.longest_axis();
    let half = range.len() / 2;

    if depth >= MIDPOINT_DEPTH_LIMIT || centers.size()[axis] <= 0.0 {
        return (half, axis);
    }

    let middle = centers.centroid()[axis];
    let split = partition(range, |prim| prim.center[axis] < middle);
    if split == 0 || split == range.len() {
        return (half, axis);
    }

    (split, axis)
}

/// Reorder `items` so those matching `pred` come first; returns their count.
fn partition<T>(items: &mut [T], pred: impl Fn(&T) -> bool) -> usize {
    let mut first = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(first, i);
            first += 1;
        }
    }
    first
}
