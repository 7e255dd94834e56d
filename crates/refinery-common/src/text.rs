//! Text normalization helpers for term names and gene set slugs

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::unwrap_used)]
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

#[allow(clippy::unwrap_used)]
static TOKEN_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s_]+").unwrap());

#[allow(clippy::unwrap_used)]
static SLUG_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Normalize an ontology term name into a single lowercase token.
///
/// Characters other than word characters, whitespace, hyphens and underscores
/// become underscores, then runs of hyphens, whitespace and underscores
/// collapse into one underscore.
///
/// ```
/// use refinery_common::text::token_name;
/// assert_eq!(token_name("Premier League"), "premier_league");
/// assert_eq!(token_name("GPI-anchor (transamidase) complex"), "gpi_anchor_transamidase_complex");
/// ```
pub fn token_name(name: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    let replaced = NON_WORD.replace_all(&joined, "_");
    let lowered = replaced.trim().to_lowercase();
    TOKEN_SEPARATORS.replace_all(&lowered, "_").into_owned()
}

/// Django-style slug: drop non-word characters, lowercase, hyphenate whitespace.
///
/// ```
/// use refinery_common::text::slugify;
/// assert_eq!(slugify("DOID:0014667-Homo sapiens"), "doid0014667-homo-sapiens");
/// ```
pub fn slugify(value: &str) -> String {
    let stripped = NON_WORD.replace_all(value, "");
    let lowered = stripped.trim().to_lowercase();
    SLUG_SEPARATORS.replace_all(&lowered, "-").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_name_collapses_separators() {
        assert_eq!(token_name("la liga"), "la_liga");
        assert_eq!(token_name("mitochondrion  inheritance"), "mitochondrion_inheritance");
        assert_eq!(token_name("alpha-beta__gamma"), "alpha_beta_gamma");
        assert_eq!(token_name("Zn2+ transport"), "zn2_transport");
        assert_eq!(token_name("sarcoma (soft tissue)"), "sarcoma_soft_tissue_");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("GO:0000005-Homo sapiens"), "go0000005-homo-sapiens");
        assert_eq!(slugify("  Mixed   Case -- Words "), "mixed-case-words");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
    }
}
