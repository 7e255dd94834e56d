// Ontology engine integration test
//
// Runs a small Gene Ontology extract through parsing, association loading,
// propagation, taxon restriction, summaries and slim reduction.

use std::io::Write;

use refinery_ontology::slim::read_slim_ids;
use refinery_ontology::{
    Annotation, GafReader, IdMap, Ontology, OntologyError, TaxonRelationship, TaxonomyTree,
};

const GO_OBO: &str = r#"format-version: 1.2
data-version: releases/2026-01-01

[Term]
id: GO:0008150
name: biological_process
namespace: biological_process
def: "A biological process represents a specific objective that the organism is genetically programmed to achieve." [GOC:pdt]

[Term]
id: GO:0000003
name: reproduction
namespace: biological_process
alt_id: GO:0019952
alt_id: GO:0050876
def: "The production of new individuals that contain some portion of genetic material inherited from one or more parent organisms." [GOC:go_curators]
is_a: GO:0008150 ! biological_process

[Term]
id: GO:0000005
name: Premier League
namespace: biological_process
def: "Fixture process used to check title formatting." [GOC:test]
is_a: GO:0000003 ! reproduction

[Term]
id: GO:0019953
name: sexual reproduction
namespace: biological_process
is_a: GO:0000003 ! reproduction

[Term]
id: GO:0007276
name: gamete generation
namespace: biological_process
relationship: part_of GO:0019953 ! sexual reproduction

[Term]
id: GO:2000241
name: regulation of reproductive process
namespace: biological_process
relationship: regulates GO:0019953 ! sexual reproduction

[Term]
id: GO:0000006
name: high-affinity zinc transmembrane transporter activity
namespace: molecular_function
is_obsolete: true

[Term]
id: GO:0003674
name: molecular_function
namespace: molecular_function

[Typedef]
id: part_of
name: part of
"#;

const GAF: &str = "!gaf-version: 2.2
MGI\tMGI:1\tGene1\t\tGO:0000005\tPMID:1001\tIDA\t\tP\t\t\tprotein\ttaxon:10090\t20200101\tMGI
MGI\tMGI:2\tGene2\t\tGO:0050876\tGO_REF:0000024|PMID:1002\tIMP\t\tP\t\t\tprotein\ttaxon:10090\t20200101\tMGI
MGI\tMGI:3\tGene3\tNOT\tGO:0007276\tPMID:1003\tIDA\t\tP\t\t\tprotein\ttaxon:10090\t20200101\tMGI
MGI\tMGI:4\tGene4\t\tGO:0007276\tPMID:1004\tIGI\t\tP\t\t\tprotein\ttaxon:10090\t20200101\tMGI
MGI\tMGI:5\tGene5\t\tGO:2000241\tPMID:1005\tEXP\t\tP\t\t\tprotein\ttaxon:10090\t20200101\tMGI
MGI\tMGI:6\tGene6\t\tGO:0000006\tPMID:1006\tIDA\t\tF\t\t\tprotein\ttaxon:10090\t20200101\tMGI
MGI\tMGI:7\tGene7\t\tGO:0019953\tPMID:1007\tIEA\t\tP\t\t\tprotein\ttaxon:10090\t20200101\tMGI
";

const EVIDENCE: [&str; 6] = ["EXP", "IDA", "IPI", "IMP", "IGI", "IEP"];

fn loaded() -> Ontology {
    let mut ontology = Ontology::from_obo_str(GO_OBO).unwrap();
    let records = GafReader::new()
        .with_evidence_codes(EVIDENCE)
        .read(GAF.as_bytes())
        .unwrap();
    ontology.populate_annotations(records);
    ontology
}

#[test]
fn test_parse_go_extract() {
    let ontology = Ontology::from_obo_str(GO_OBO).unwrap();

    assert_eq!(ontology.len(), 7);
    let heads: Vec<&str> = ontology.head_ids().iter().map(String::as_str).collect();
    assert_eq!(heads, vec!["GO:0008150", "GO:0003674"]);

    let premier = ontology.get_term("GO:0000005").unwrap();
    assert_eq!(premier.full_name(), Some("Premier League"));
    assert_eq!(premier.name(), Some("premier_league"));
}

#[test]
fn test_obsolete_term_not_returned() {
    let ontology = Ontology::from_obo_str(GO_OBO).unwrap();
    assert!(ontology.get_term("GO:0000006").is_none());
}

#[test]
fn test_alt_ids_resolve_to_canonical() {
    let ontology = Ontology::from_obo_str(GO_OBO).unwrap();

    for alt in ["GO:0019952", "GO:0050876"] {
        let term = ontology.get_term(alt).unwrap();
        assert!(std::ptr::eq(term, ontology.get_term("GO:0000003").unwrap()));
    }
}

#[test]
fn test_annotation_loading_filters() {
    let ontology = loaded();

    // NOT line and IEA line dropped, obsolete term unknown
    assert_eq!(ontology.get_term("GO:0007276").unwrap().gene_ids().len(), 1);
    assert!(ontology.get_term("GO:0019953").unwrap().annotations().is_empty());

    let reproduction = ontology.get_term("GO:0000003").unwrap();
    let annotation = reproduction.annotations().iter().next().unwrap();
    assert_eq!(annotation.gene_id(), "MGI:2");
    assert_eq!(annotation.reference(), Some("1002"));
    assert!(annotation.is_direct());
}

#[test]
fn test_full_propagation() {
    let mut ontology = loaded();
    ontology.propagate().unwrap();

    let sexual = ontology.get_term("GO:0019953").unwrap();
    let genes: Vec<&str> = sexual.gene_ids().into_iter().collect();
    assert_eq!(genes, vec!["MGI:4", "MGI:5"]);

    let root = ontology.get_term("GO:0008150").unwrap();
    let genes: Vec<&str> = root.gene_ids().into_iter().collect();
    assert_eq!(genes, vec!["MGI:1", "MGI:2", "MGI:4", "MGI:5"]);
    assert!(root.annotations().iter().all(|a| !a.is_direct()));

    // regulates and part_of crossings are flagged
    assert!(sexual.annotations().iter().all(Annotation::is_ready_regulates_cutoff));

    // direct entries stay on the annotated term
    let premier = ontology.get_term("GO:0000005").unwrap();
    assert!(premier.annotations().iter().all(Annotation::is_direct));
}

#[test]
fn test_taxon_restriction_marks_subtree() {
    let mut taxonomy = TaxonomyTree::new();
    taxonomy.insert("1", "1");
    taxonomy.insert("2759", "1");
    taxonomy.insert("10090", "2759");
    taxonomy.insert("2", "1");

    let mut ontology = loaded();
    ontology.set_organism_taxon("10090", &taxonomy).unwrap();
    ontology
        .restrict_taxon(
            &["2".to_string()],
            "GO:0019953",
            TaxonRelationship::OnlyIn,
            &taxonomy,
        )
        .unwrap();

    for id in ["GO:0019953", "GO:0007276", "GO:2000241"] {
        assert!(!ontology.get_term(id).unwrap().is_valid(), "{} still valid", id);
    }
    assert!(ontology.get_term("GO:0000003").unwrap().is_valid());
    // nothing was removed
    assert_eq!(ontology.len(), 7);
}

#[test]
fn test_summaries_and_json() {
    let mut ontology = loaded();
    ontology.propagate().unwrap();
    ontology.summarize("mouse");

    let tree = ontology.to_json_tree(Some("GO:0008150")).unwrap();
    assert_eq!(tree["name"], "biological_process");
    assert_eq!(tree["summary"]["organisms"]["mouse"]["t"], 4);
    assert_eq!(tree["summary"]["organisms"]["mouse"]["d"], 0);
}

#[test]
fn test_slim_workflow() {
    let mut ontology = loaded();

    ontology.vote(&["GO:0000005".to_string(), "GO:0019953".to_string()], "curator_a");
    ontology.vote(&["GO:0019952".to_string()], "curator_b");

    let mut out = Vec::new();
    ontology.write_slim("GO:0008150", 1, &mut out).unwrap();
    let slim_text = String::from_utf8(out).unwrap();
    assert_eq!(slim_text, "reproduction\tGO:0000003\n");

    let slim = read_slim_ids(slim_text.as_bytes()).unwrap();
    assert!(ontology.check_fringe(&slim, Some("biological_process")).unwrap());

    let partial = vec!["GO:0000005".to_string(), "GO:0019953".to_string()];
    assert!(ontology.check_fringe(&partial, Some("biological_process")).unwrap());

    let gap = vec!["GO:0000005".to_string()];
    assert!(!ontology.check_fringe(&gap, Some("biological_process")).unwrap());
}

#[test]
fn test_prune_by_annotation_count() {
    let mut ontology = loaded();
    ontology.propagate().unwrap();

    let report = ontology.prune(|m| m.total == 0 && m.child_count == 0, None);

    assert!(report.removed.is_empty());

    // drop leaves carrying a single direct annotation
    let report = ontology.prune(|m| m.total == 1 && m.direct == 1 && m.child_count == 0, None);
    assert_eq!(report.removed.len(), 3);
    assert!(ontology.get_term("GO:0000005").is_none());
    assert!(ontology.get_term("GO:0019953").is_some());
}

#[test]
fn test_map_genes_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mgi_to_entrez.txt");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "mgi:1\t11001").unwrap();
    writeln!(file, "MGI:2\t11002\t11003").unwrap();

    let id_map = IdMap::from_path(&path).unwrap();
    let mut ontology = loaded();
    ontology.map_genes(&id_map);

    let reproduction = ontology.get_term("GO:0000003").unwrap();
    let genes: Vec<&str> = reproduction.gene_ids().into_iter().collect();
    assert_eq!(genes, vec!["11002", "11003"]);
    // MGI:4 had no mapping
    assert!(ontology.get_term("GO:0007276").unwrap().annotations().is_empty());
}

#[test]
fn test_load_obo_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("go-basic.obo");
    std::fs::write(&path, GO_OBO).unwrap();

    let ontology = Ontology::load_obo_file(&path).unwrap();
    assert_eq!(ontology.len(), 7);

    let missing = Ontology::load_obo_file(dir.path().join("absent.obo")).unwrap_err();
    assert!(matches!(missing, OntologyError::SourceUnavailable { .. }));
}
