//! An SS-tree: a similarity-search tree over 2-D points.
//!
//! The tree organizes points into nested bounding spheres, each described by
//! a centroid and a radius, rather than bounding boxes. Insertion descends
//! to the leaf whose centroid is nearest to the new point and splits
//! overflowing nodes bottom-up along their widest axis, so the tree stays
//! balanced as it grows. [`SsTree::k_nearest`] runs a best-first
//! branch-and-bound search over the spheres: a subtree is discarded as soon
//! as the floor `max(0, distance(query, centroid) - radius)` exceeds the
//! current k-th best candidate distance, which never loses a true nearest
//! neighbor.
//!
//! ```
//! use sstree::{Point, SsTree};
//!
//! let mut tree = SsTree::new(4).unwrap();
//! tree.insert(Point::new(0.0, 0.0, "origin"));
//! tree.insert(Point::new(3.0, 4.0, "near"));
//! tree.insert(Point::new(50.0, 50.0, "far"));
//!
//! let found = tree.k_nearest((1.0, 1.0), 2).unwrap();
//! assert_eq!(found, vec!["origin", "near"]);
//! ```
//!
//! The tree is a single-threaded, in-memory structure: queries take `&self`
//! and never mutate, while insertion can restructure arbitrary ancestors and
//! even replace the root, so concurrent use requires external locking.

mod bound_queue;
mod candidates;
mod error;
mod tree;

pub use crate::candidates::CandidateHeap;
pub use crate::error::{Error, Result};
pub use crate::tree::{Point, Points, SsTree};
