pub mod depth;
pub mod edge_router;
pub mod graph;
pub mod layout;
pub mod relations;
pub mod style;

pub use depth::{DepthDiagnostic, DepthTable};
pub use edge_router::{CubicBezier, LinkPath};
pub use graph::{FamilyGraph, GraphDiagnostic, MemberIndex, Vec2};
pub use layout::force::{ForceLayouter, ForceSettings, ForceSimulation};
pub use layout::hierarchical::{HierarchicalLayout, HierarchicalLayouter, HierarchicalSettings};
pub use layout::{
    LayoutError, LayoutOutput, LayoutPosition, Layouter, LinkView, NodeView, Viewport,
};
pub use relations::{RelationQuery, RelationSet};
pub use style::{Color, EdgeStyle, NodeCategory, NodeColors, get_link_style, get_node_colors};
