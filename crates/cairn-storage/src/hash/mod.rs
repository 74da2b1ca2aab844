//! Hash containers used by the buffer pool.
//!
//! The page table maps resident page IDs to frame IDs through an
//! [`ExtendibleHashTable`]: a directory of `2^global_depth` slots pointing
//! into a set of fixed-capacity buckets. Several slots may share one bucket;
//! a full bucket splits in two and only the slots that pointed at it move.
//!
//! ```text
//!   directory (global depth 2)        buckets
//!   ┌────┐
//!   │ 00 │──────────────┐
//!   ├────┤              ├──────▶ [ local depth 1 | k0 k4 ]
//!   │ 10 │──────────────┘
//!   ├────┤
//!   │ 01 │─────────────────────▶ [ local depth 2 | k1 k5 ]
//!   ├────┤
//!   │ 11 │─────────────────────▶ [ local depth 2 | k3 ]
//!   └────┘
//! ```

mod extendible;

pub use extendible::ExtendibleHashTable;
