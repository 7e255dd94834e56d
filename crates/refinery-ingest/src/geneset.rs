//! Gene set records built from annotated ontology terms

use std::collections::{BTreeMap, BTreeSet};

use refinery_common::text::slugify;
use refinery_ontology::Term;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// One publishable gene set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneSet {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub organism: String,
    pub xrdb: String,
    pub slug: String,
    /// Gene id to the PubMed ids supporting it
    pub annotations: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl GeneSet {
    pub fn gene_count(&self) -> usize {
        self.annotations.len()
    }
}

/// Short code used in GO gene set titles
pub fn go_namespace_code(namespace: &str) -> Option<&'static str> {
    match namespace {
        "biological_process" => Some("BP"),
        "molecular_function" => Some("MF"),
        "cellular_component" => Some("CC"),
        _ => None,
    }
}

/// Numeric part of a prefixed id (`GO:0008150` gives `0008150`)
fn local_id(id: &str) -> &str {
    id.split_once(':').map_or(id, |(_, local)| local)
}

fn full_name(term: &Term) -> &str {
    term.full_name().unwrap_or_else(|| term.display_name())
}

/// Join items as prose: `A`, `A or B`, `A, B or C`
fn prose_list(items: &[String], conjunction: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} {} {}", init.join(", "), conjunction, last),
    }
}

/// `GO-<BP|MF|CC>-<digits>:<full name>`
pub fn go_title(term: &Term) -> Result<String> {
    let namespace = term.namespace().unwrap_or_default();
    let code = go_namespace_code(namespace).ok_or_else(|| IngestError::UnsupportedNamespace {
        term_id: term.id().to_string(),
        namespace: namespace.to_string(),
    })?;
    Ok(format!("GO-{}-{}:{}", code, local_id(term.id()), full_name(term)))
}

/// Sentence naming the accepted evidence codes, empty when all are accepted
pub fn evidence_clause(codes: &[String]) -> String {
    if codes.is_empty() {
        return String::new();
    }
    format!(
        " Only annotations with evidence coded as {} are included.",
        prose_list(codes, "or")
    )
}

/// Term definition followed by the propagation and evidence sentences.
///
/// Terms without a definition get no abstract.
pub fn go_abstract(term: &Term, evidence_codes: &[String]) -> Option<String> {
    let description = term.description()?;
    Some(format!(
        "{} Annotations are propagated through transitive closure as recommended by the GO Consortium.{}",
        description,
        evidence_clause(evidence_codes)
    ))
}

/// `DO-<digits>:<full name>`
pub fn do_title(term: &Term) -> String {
    format!("DO-{}:{}", local_id(term.id()), full_name(term))
}

/// Definition (when present) followed by propagation, OMIM source and
/// confidence sentences
pub fn do_abstract(term: &Term, omim_ids: &[String], confidence: &[String]) -> String {
    let mut text = term.description().unwrap_or_default().to_string();
    text.push_str(" Annotations from child terms in the disease ontology are propagated through transitive closure.");

    match omim_ids {
        [] => {},
        [only] => text.push_str(&format!(
            " Annotations directly to this term are provided by the OMIM disease ID {}.",
            only
        )),
        many => text.push_str(&format!(
            " Annotations directly to this term are provided by the OMIM disease IDs {}.",
            prose_list(many, "and")
        )),
    }

    if !confidence.is_empty() {
        text.push_str(&format!(
            " Only annotations with confidence labeled {} by OMIM have been added.",
            prose_list(confidence, "or")
        ));
    }
    text
}

/// `slugify("<id>-<organism>")`
pub fn gene_set_slug(term_id: &str, organism: &str) -> String {
    slugify(&format!("{}-{}", term_id, organism))
}

/// Group a term's annotations by gene, keeping every distinct reference
pub fn annotations_by_gene(term: &Term) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for annotation in term.annotations() {
        let references = grouped.entry(annotation.gene_id().to_string()).or_default();
        if let Some(reference) = annotation.reference() {
            references.insert(reference.to_string());
        }
    }
    grouped
        .into_iter()
        .map(|(gene, references)| (gene, references.into_iter().collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use refinery_ontology::{Annotation, Ontology};

    const OBO: &str = r#"[Term]
id: GO:0000005
name: Premier League
namespace: biological_process
def: "Association football league." [GOC:test]

[Term]
id: GO:0000007
name: La Liga
namespace: external_league

[Term]
id: DOID:9351
name: diabetes mellitus
def: "A glucose metabolism disease." [url:test]
"#;

    fn ontology() -> Ontology {
        Ontology::from_obo_str(OBO).unwrap()
    }

    fn codes(items: &[&str]) -> Vec<String> {
        items.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_go_title() {
        let ontology = ontology();
        let term = ontology.get_term("GO:0000005").unwrap();
        assert_eq!(go_title(term).unwrap(), "GO-BP-0000005:Premier League");

        let foreign = ontology.get_term("GO:0000007").unwrap();
        assert!(matches!(
            go_title(foreign),
            Err(IngestError::UnsupportedNamespace { .. })
        ));
    }

    #[test]
    fn test_evidence_clause() {
        assert_eq!(evidence_clause(&[]), "");
        assert_eq!(
            evidence_clause(&codes(&["IDA"])),
            " Only annotations with evidence coded as IDA are included."
        );
        assert_eq!(
            evidence_clause(&codes(&["EXP", "IDA", "IPI", "IMP", "IGI", "IEP"])),
            " Only annotations with evidence coded as EXP, IDA, IPI, IMP, IGI or IEP are included."
        );
    }

    #[test]
    fn test_go_abstract() {
        let ontology = ontology();
        let term = ontology.get_term("GO:0000005").unwrap();
        assert_eq!(
            go_abstract(term, &codes(&["IDA", "IMP"])).unwrap(),
            "Association football league. Annotations are propagated through transitive \
             closure as recommended by the GO Consortium. Only annotations with evidence \
             coded as IDA or IMP are included."
        );

        let undocumented = ontology.get_term("GO:0000007").unwrap();
        assert!(go_abstract(undocumented, &[]).is_none());
    }

    #[test]
    fn test_do_title_and_abstract() {
        let ontology = ontology();
        let term = ontology.get_term("DOID:9351").unwrap();
        assert_eq!(do_title(term), "DO-9351:diabetes mellitus");

        let text = do_abstract(term, &codes(&["222100", "125853", "601283"]), &codes(&["C", "P"]));
        assert_eq!(
            text,
            "A glucose metabolism disease. Annotations from child terms in the disease \
             ontology are propagated through transitive closure. Annotations directly to \
             this term are provided by the OMIM disease IDs 222100, 125853 and 601283. \
             Only annotations with confidence labeled C or P by OMIM have been added."
        );

        let single = do_abstract(term, &codes(&["222100"]), &[]);
        assert!(single.ends_with("provided by the OMIM disease ID 222100."));
    }

    #[test]
    fn test_slug() {
        assert_eq!(gene_set_slug("DOID:9351", "Homo sapiens"), "doid9351-homo-sapiens");
    }

    #[test]
    fn test_annotations_by_gene_keeps_all_references() {
        let mut ontology = ontology();
        for (gene, reference) in [("7157", "111"), ("7157", "222"), ("672", "333")] {
            ontology.add_annotation(
                "DOID:9351",
                Annotation::builder(gene).reference(reference).direct(true).build(),
            );
        }
        ontology.add_annotation("DOID:9351", Annotation::builder("5728").direct(true).build());

        let grouped = annotations_by_gene(ontology.get_term("DOID:9351").unwrap());
        assert_eq!(grouped["7157"], vec!["111", "222"]);
        assert_eq!(grouped["672"], vec!["333"]);
        assert!(grouped["5728"].is_empty());
    }

    #[test]
    fn test_gene_set_serializes_abstract_key() {
        let set = GeneSet {
            title: "DO-9351:diabetes mellitus".to_string(),
            abstract_text: None,
            organism: "Homo sapiens".to_string(),
            xrdb: "Entrez".to_string(),
            slug: "doid9351-homo-sapiens".to_string(),
            annotations: BTreeMap::new(),
            tags: Vec::new(),
        };
        let value = serde_json::to_value(&set).unwrap();
        assert!(value.get("abstract").is_some());
        assert!(value.get("tags").is_none());
    }
}
