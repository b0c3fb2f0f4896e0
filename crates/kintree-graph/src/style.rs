//! Display styles for members and links.
//!
//! The renderer decides how to paint; this module only maps domain data to a
//! small palette so every adapter colours members the same way.

use kintree_core::{Gender, LayoutMode, Member};
use serde::{Deserialize, Serialize};

/// RGB color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Gender-derived display category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Male,
    Female,
    Other,
    Unspecified,
}

impl NodeCategory {
    pub fn of(member: &Member) -> Self {
        match member.gender {
            Some(Gender::Male) => Self::Male,
            Some(Gender::Female) => Self::Female,
            Some(Gender::Other) => Self::Other,
            None => Self::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeColors {
    pub fill: Color,
    pub border: Color,
    pub text: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub color: Color,
    pub width: f32,
    pub curved: bool,
}

const NAVY: Color = Color::rgb(0x1A, 0x1F, 0x2C);
const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
const LINK_GRAY: Color = Color::rgb(0x8E, 0x91, 0x96);

pub fn get_node_colors(category: NodeCategory) -> NodeColors {
    let fill = match category {
        NodeCategory::Male => Color::rgb(0x1E, 0x4E, 0x8C),
        NodeCategory::Female => Color::rgb(0x9B, 0x2C, 0x5E),
        NodeCategory::Other => Color::rgb(0x4A, 0x6B, 0x3D),
        NodeCategory::Unspecified => NAVY,
    };
    NodeColors {
        fill,
        border: WHITE,
        text: WHITE,
    }
}

pub fn get_link_style(mode: LayoutMode) -> EdgeStyle {
    EdgeStyle {
        color: LINK_GRAY,
        width: 1.5,
        curved: mode == LayoutMode::Hierarchical,
    }
}
