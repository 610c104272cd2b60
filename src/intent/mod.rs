pub mod dialect;
pub mod intent_model;
pub mod normalize;

pub use dialect::{Dialect, SyntaxFamily, TestKind};
pub use intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, BddPhase, HttpMethod, Locator,
    LocatorStrategy, Node, NodeRef, OwnedNode, ProgramNode, SemanticTags, SourceRef, TestIntent,
    Value,
};
