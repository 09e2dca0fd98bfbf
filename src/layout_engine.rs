//! Geometry strategies. Each (output, workspace) pair owns one instance of
//! every strategy and the active layout mode selects which one arranges it.

mod graph;
pub mod systems;

pub use graph::{Direction, Orientation};
pub use systems::{
    BspLayoutSystem, FloatingLayoutSystem, LayoutHandle, LayoutInputs, LayoutSystem,
    LayoutSystemKind, LayoutSystems, MasterStackLayoutSystem, NodeId,
};
