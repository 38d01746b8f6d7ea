//! Language and theme definitions used to colour previews, and the loader
//! that fetches them from an asset host on demand.
pub mod bridge;
pub mod builtin;
pub mod highlight;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use bridge::{AssetBridge, AssetRequest, AssetResponse, AssetTransport, ChannelTransport};
pub use builtin::{language_id_for_path, AssetCatalog};
pub use highlight::{HighlightedLine, Highlighter, RenderedDocument, Segment};
pub use loader::GrammarAssetLoader;

pub const PLAINTEXT: &str = "plaintext";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Language,
    Theme,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Language => write!(f, "language"),
            AssetKind::Theme => write!(f, "theme"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Plain,
    Keyword,
    String,
    Comment,
    Number,
    Punctuation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageDefinition {
    pub id: String,
    pub keywords: Vec<String>,
    pub line_comment: Option<String>,
    pub string_quotes: Vec<char>,
}

impl LanguageDefinition {
    pub fn plaintext() -> Self {
        Self {
            id: PLAINTEXT.to_string(),
            keywords: Vec::new(),
            line_comment: None,
            string_quotes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeDefinition {
    pub id: String,
    pub foreground: Rgb,
    /// Background of the emphasized line.
    pub emphasis: Rgb,
    pub tokens: HashMap<TokenKind, Rgb>,
}

impl ThemeDefinition {
    pub fn color(&self, kind: TokenKind) -> Rgb {
        self.tokens.get(&kind).copied().unwrap_or(self.foreground)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssetDefinition {
    Language(LanguageDefinition),
    Theme(ThemeDefinition),
}

impl AssetDefinition {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetDefinition::Language(_) => AssetKind::Language,
            AssetDefinition::Theme(_) => AssetKind::Theme,
        }
    }
}

/// A loaded definition, cached by (kind, id) for the life of the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarAsset {
    pub id: String,
    pub kind: AssetKind,
    pub definition: AssetDefinition,
    pub loaded: bool,
}

impl GrammarAsset {
    pub fn as_language(&self) -> Option<&LanguageDefinition> {
        match &self.definition {
            AssetDefinition::Language(language) => Some(language),
            AssetDefinition::Theme(_) => None,
        }
    }

    pub fn as_theme(&self) -> Option<&ThemeDefinition> {
        match &self.definition {
            AssetDefinition::Theme(theme) => Some(theme),
            AssetDefinition::Language(_) => None,
        }
    }
}
