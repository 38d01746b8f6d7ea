//! Bundled languages and themes, and the task that serves them over a
//! [`ChannelTransport`](super::ChannelTransport).
use super::bridge::{AssetBridge, AssetRequest, AssetResponse, ChannelTransport};
use super::{AssetDefinition, AssetKind, LanguageDefinition, Rgb, ThemeDefinition, TokenKind, PLAINTEXT};
use log::debug;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;

const EXTENSIONS: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("py", "python"),
    ("js", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("go", "go"),
    ("json", "json"),
    ("toml", "toml"),
    ("md", "markdown"),
    ("markdown", "markdown"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
];

pub fn language_id_for_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return PLAINTEXT;
    };
    EXTENSIONS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, language)| *language)
        .unwrap_or(PLAINTEXT)
}

#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    languages: HashMap<String, LanguageDefinition>,
    themes: HashMap<String, ThemeDefinition>,
}

fn language(id: &str, keywords: &str, line_comment: Option<&str>, quotes: &[char]) -> LanguageDefinition {
    LanguageDefinition {
        id: id.to_string(),
        keywords: keywords.split_whitespace().map(str::to_string).collect(),
        line_comment: line_comment.map(str::to_string),
        string_quotes: quotes.to_vec(),
    }
}

fn theme(id: &str, foreground: Rgb, emphasis: Rgb, tokens: &[(TokenKind, Rgb)]) -> ThemeDefinition {
    ThemeDefinition {
        id: id.to_string(),
        foreground,
        emphasis,
        tokens: tokens.iter().copied().collect(),
    }
}

impl AssetCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for definition in [
            language(
                "rust",
                "as async await break const continue crate dyn else enum extern false fn for if impl in let loop match mod move mut pub ref return self Self static struct super trait true type unsafe use where while",
                Some("//"),
                &['"'],
            ),
            language(
                "python",
                "and as assert async await break class continue def del elif else except False finally for from global if import in is lambda None nonlocal not or pass raise return True try while with yield",
                Some("#"),
                &['"', '\''],
            ),
            language(
                "javascript",
                "async await break case catch class const continue default delete do else export extends false finally for function if import in instanceof let new null return static super switch this throw true try typeof undefined var void while yield",
                Some("//"),
                &['"', '\'', '`'],
            ),
            language(
                "typescript",
                "abstract as async await break case catch class const continue declare default do else enum export extends false finally for function if implements import in interface keyof let new null private protected public readonly return static super switch this throw true try type typeof undefined var void while",
                Some("//"),
                &['"', '\'', '`'],
            ),
            language(
                "go",
                "break case chan const continue default defer else fallthrough false for func go goto if import interface map nil package range return select struct switch true type var",
                Some("//"),
                &['"', '`'],
            ),
            language("json", "true false null", None, &['"']),
            language("toml", "true false", Some("#"), &['"', '\'']),
            language("markdown", "", None, &['`']),
            language(
                "shell",
                "case do done elif else esac export fi for function if in local return then until while",
                Some("#"),
                &['"', '\''],
            ),
            LanguageDefinition::plaintext(),
        ] {
            catalog.add_language(definition);
        }

        catalog.add_theme(theme(
            "dark",
            Rgb(212, 212, 212),
            Rgb(58, 61, 65),
            &[
                (TokenKind::Keyword, Rgb(86, 156, 214)),
                (TokenKind::String, Rgb(206, 145, 120)),
                (TokenKind::Comment, Rgb(106, 153, 85)),
                (TokenKind::Number, Rgb(181, 206, 168)),
                (TokenKind::Punctuation, Rgb(150, 150, 150)),
            ],
        ));
        catalog.add_theme(theme(
            "light",
            Rgb(36, 41, 46),
            Rgb(255, 248, 197),
            &[
                (TokenKind::Keyword, Rgb(215, 58, 73)),
                (TokenKind::String, Rgb(3, 47, 98)),
                (TokenKind::Comment, Rgb(106, 115, 125)),
                (TokenKind::Number, Rgb(0, 92, 197)),
                (TokenKind::Punctuation, Rgb(88, 96, 105)),
            ],
        ));
        catalog
    }

    pub fn add_language(&mut self, definition: LanguageDefinition) {
        self.languages.insert(definition.id.clone(), definition);
    }

    pub fn add_theme(&mut self, definition: ThemeDefinition) {
        self.themes.insert(definition.id.clone(), definition);
    }

    pub fn lookup(&self, kind: AssetKind, id: &str) -> Result<AssetDefinition, String> {
        let found = match kind {
            AssetKind::Language => self.languages.get(id).cloned().map(AssetDefinition::Language),
            AssetKind::Theme => self.themes.get(id).cloned().map(AssetDefinition::Theme),
        };
        found.ok_or_else(|| format!("no {kind} named '{id}'"))
    }

    pub fn theme_ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.themes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Answers requests from `requests` out of `catalog` until the channel
/// closes or the bridge is dropped.
pub async fn serve_catalog(
    mut requests: mpsc::UnboundedReceiver<AssetRequest>,
    bridge: Weak<AssetBridge>,
    catalog: AssetCatalog,
) {
    while let Some(request) = requests.recv().await {
        let Some(bridge) = bridge.upgrade() else {
            break;
        };
        let response = AssetResponse {
            request_id: request.request_id,
            result: catalog.lookup(request.kind, &request.id),
        };
        if !bridge.resolve(response) {
            debug!("Nobody waiting for {} '{}'", request.kind, request.id);
        }
    }
}

/// Bridge wired to a spawned host task serving `catalog`.
///
/// Must be called from within a Tokio runtime.
pub fn catalog_bridge(catalog: AssetCatalog, timeout: Duration) -> Arc<AssetBridge> {
    let (sender, receiver) = mpsc::unbounded_channel();
    let bridge = Arc::new(AssetBridge::new(
        Arc::new(ChannelTransport::new(sender)),
        timeout,
    ));
    tokio::spawn(serve_catalog(receiver, Arc::downgrade(&bridge), catalog));
    bridge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_for_path() {
        assert_eq!(language_id_for_path(Path::new("src/main.RS")), "rust");
        assert_eq!(language_id_for_path(Path::new("app.tsx")), "typescript");
        assert_eq!(language_id_for_path(Path::new("LICENSE")), PLAINTEXT);
        assert_eq!(language_id_for_path(Path::new("data.bin")), PLAINTEXT);
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = AssetCatalog::builtin();
        assert_eq!(catalog.lookup(AssetKind::Theme, "dark").unwrap().kind(), AssetKind::Theme);
        assert!(catalog.lookup(AssetKind::Language, "dark").is_err());
        assert_eq!(catalog.theme_ids(), vec!["dark", "light"]);
    }

    #[tokio::test]
    async fn test_catalog_bridge_round_trip() {
        let bridge = catalog_bridge(AssetCatalog::builtin(), Duration::from_millis(500));
        match bridge.request(AssetKind::Language, "python").await.unwrap() {
            AssetDefinition::Language(language) => {
                assert_eq!(language.line_comment.as_deref(), Some("#"))
            }
            other => panic!("unexpected asset {other:?}"),
        }
        assert!(bridge.request(AssetKind::Theme, "solarized").await.is_err());
    }
}
