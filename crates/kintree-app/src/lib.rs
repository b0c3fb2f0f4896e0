use kintree_core::MemberId;
use kintree_graph::LayoutError;
use kintree_store::StoreError;
use thiserror::Error;

mod controller;
pub mod settings;

pub use controller::{FrameTicket, Placeholder, Scene, TreeViewController};
pub use settings::Settings;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Layout failed: {0}")]
    Layout(#[from] LayoutError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Member {0} is not in the current tree")]
    UnknownMember(MemberId),
    #[error("No configuration directory available")]
    NoConfigDir,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
