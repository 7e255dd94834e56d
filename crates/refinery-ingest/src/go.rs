//! Gene Ontology pipeline: load, annotate, propagate, restrict, format

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use refinery_ontology::{GafReader, IdMap, Ontology, OntologyError, TaxonReport, TaxonomyTree};
use tracing::{info, warn};

use crate::config::RefineryConfig;
use crate::downloader::Downloader;
use crate::error::{IngestError, Result};
use crate::geneset::{annotations_by_gene, gene_set_slug, go_abstract, go_title, GeneSet};
use crate::tags::TagMap;

/// Association reader honoring the configured evidence codes
pub fn gaf_reader(config: &RefineryConfig) -> GafReader {
    if config.evidence_codes.is_empty() {
        GafReader::new()
    } else {
        GafReader::new().with_evidence_codes(config.evidence_codes.iter().cloned())
    }
}

/// Load the GO graph, attach the association file, remap gene ids and
/// propagate. Taxon restriction runs afterwards when configured.
pub async fn build_go_ontology(config: &RefineryConfig, downloader: &Downloader) -> Result<Ontology> {
    let mut ontology = downloader.load_ontology(&config.go_obo_source).await?;

    match &config.association_file {
        Some(source) => {
            let content = downloader.read_source(source).await?;
            let records = gaf_reader(config).read(content.as_slice())?;
            ontology.populate_annotations(records);
        },
        None => warn!("No association file configured, gene sets will be empty"),
    }

    if let Some(path) = &config.id_map_file {
        let id_map = IdMap::from_path(path)?;
        ontology.map_genes(&id_map);
    }

    ontology.propagate()?;
    restrict_to_organism(&mut ontology, config)?;
    Ok(ontology)
}

/// Load NCBI `nodes.dmp` and, when given, `names.dmp`
pub fn load_taxonomy(nodes: &Path, names: Option<&Path>) -> Result<TaxonomyTree> {
    let mut tree = TaxonomyTree::from_nodes_dmp(BufReader::new(open(nodes)?))?;
    if let Some(names) = names {
        tree.load_names_dmp(BufReader::new(open(names)?))?;
    }
    info!("Loaded taxonomy with {} nodes", tree.len());
    Ok(tree)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        IngestError::from(OntologyError::SourceUnavailable {
            location: path.display().to_string(),
            reason: e.to_string(),
        })
    })
}

/// Invalidate terms that cannot apply to the configured organism.
///
/// Needs a taxon id, the taxonomy nodes and a constraint file; returns
/// `None` when any of them is missing.
pub fn restrict_to_organism(
    ontology: &mut Ontology,
    config: &RefineryConfig,
) -> Result<Option<TaxonReport>> {
    let (Some(taxon_id), Some(nodes), Some(constraints)) = (
        config.taxon_id.as_deref(),
        config.taxonomy_nodes.as_deref(),
        config.taxon_constraints.as_deref(),
    ) else {
        return Ok(None);
    };

    let taxonomy = load_taxonomy(nodes, config.taxonomy_names.as_deref())?;
    ontology.set_organism_taxon(taxon_id, &taxonomy)?;
    let report = ontology.apply_taxon_constraints(BufReader::new(open(constraints)?), &taxonomy)?;
    Ok(Some(report))
}

/// One gene set per valid, annotated GO term
pub fn go_gene_sets(
    ontology: &Ontology,
    config: &RefineryConfig,
    tags: Option<&TagMap>,
) -> Vec<GeneSet> {
    let mut gene_sets = Vec::new();
    let mut skipped_invalid = 0usize;

    for (term_id, term) in ontology.terms() {
        if term.annotations().is_empty() {
            continue;
        }
        if !term.is_valid() {
            skipped_invalid += 1;
            continue;
        }

        let title = match go_title(term) {
            Ok(title) => title,
            Err(IngestError::UnsupportedNamespace { namespace, .. }) => {
                warn!("Skipping {} with namespace '{}'", term_id, namespace);
                continue;
            },
            Err(e) => {
                warn!("Skipping {}: {}", term_id, e);
                continue;
            },
        };

        gene_sets.push(GeneSet {
            title,
            abstract_text: go_abstract(term, &config.evidence_codes),
            organism: config.organism.clone(),
            xrdb: config.xrdb.clone(),
            slug: gene_set_slug(term_id, &config.organism),
            annotations: annotations_by_gene(term),
            tags: tags.map(|t| t.get(term_id).to_vec()).unwrap_or_default(),
        });
    }

    info!(
        "Built {} GO gene sets ({} annotated terms invalid for {})",
        gene_sets.len(),
        skipped_invalid,
        config.organism
    );
    gene_sets
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const OBO: &str = r#"[Term]
id: GO:0008150
name: biological_process
namespace: biological_process

[Term]
id: GO:0000005
name: Premier League
namespace: biological_process
def: "Fixture process." [GOC:test]
is_a: GO:0008150 ! biological_process

[Term]
id: GO:0000009
name: Serie A
namespace: biological_process
is_a: GO:0008150 ! biological_process
"#;

    #[test]
    fn test_gaf_reader_accepts_all_without_codes() {
        let line = "MGI\tMGI:1\tG\t\tGO:0000005\tPMID:1\tIEA\t\tP\t\t\tprotein\ttaxon:10090\t20200101\tMGI";

        let open = RefineryConfig::builder().evidence_codes(Vec::<String>::new()).build();
        assert!(gaf_reader(&open).parse_line(line).unwrap().is_some());

        let strict = RefineryConfig::default();
        assert!(gaf_reader(&strict).parse_line(line).unwrap().is_none());
    }

    #[test]
    fn test_go_gene_sets_skip_unannotated_and_invalid() {
        let mut ontology = Ontology::from_obo_str(OBO).unwrap();
        let gaf = "MGI\tMGI:1\tG\t\tGO:0000005\tPMID:10\tIDA\t\tP\t\t\tprotein\ttaxon:10090\t20200101\tMGI\n\
                   MGI\tMGI:2\tG\t\tGO:0000009\tPMID:11\tIDA\t\tP\t\t\tprotein\ttaxon:10090\t20200101\tMGI\n";
        let config = RefineryConfig::mouse();
        ontology.populate_annotations(gaf_reader(&config).read(gaf.as_bytes()).unwrap());
        ontology.propagate().unwrap();

        let mut taxonomy = TaxonomyTree::new();
        taxonomy.insert("1", "1");
        taxonomy.insert("10090", "1");
        taxonomy.insert("4932", "1");
        ontology.set_organism_taxon("10090", &taxonomy).unwrap();
        let constraints = "[Term]\nid: GO:0000009\nrelationship: only_in_taxon NCBITaxon:4932\n";
        ontology
            .apply_taxon_constraints(constraints.as_bytes(), &taxonomy)
            .unwrap();

        let sets = go_gene_sets(&ontology, &config, None);
        let titles: Vec<&str> = sets.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["GO-BP-0000005:Premier League", "GO-BP-0008150:biological_process"]
        );

        let premier = &sets[0];
        assert_eq!(premier.annotations["MGI:1"], vec!["10"]);
        assert_eq!(premier.organism, "Mus musculus");
        assert_eq!(premier.slug, "go0000005-mus-musculus");
        assert!(premier.abstract_text.as_deref().unwrap().starts_with("Fixture process."));
        // the root has no definition
        assert!(sets[1].abstract_text.is_none());
        assert_eq!(sets[1].gene_count(), 2);
    }

    #[test]
    fn test_restrict_to_organism_needs_all_inputs() {
        let mut ontology = Ontology::from_obo_str(OBO).unwrap();
        let config = RefineryConfig::default();
        assert!(restrict_to_organism(&mut ontology, &config).unwrap().is_none());
    }

    #[test]
    fn test_load_taxonomy_from_dmp_files() {
        let dir = tempfile::tempdir().unwrap();
        let nodes = dir.path().join("nodes.dmp");
        let names = dir.path().join("names.dmp");
        std::fs::write(&nodes, "1\t|\t1\t|\tno rank\t|\n10090\t|\t1\t|\tspecies\t|\n").unwrap();
        std::fs::write(
            &names,
            "10090\t|\tMus musculus\t|\t\t|\tscientific name\t|\n",
        )
        .unwrap();

        let tree = load_taxonomy(&nodes, Some(&names)).unwrap();
        assert_eq!(tree.len(), 2);

        let err = load_taxonomy(&dir.path().join("absent.dmp"), None).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Ontology(OntologyError::SourceUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_build_go_ontology_from_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let obo = dir.path().join("go-basic.obo");
        let gaf = dir.path().join("assoc.gaf");
        std::fs::write(&obo, OBO).unwrap();
        std::fs::write(
            &gaf,
            "!gaf-version: 2.2\nMGI\tMGI:1\tG\t\tGO:0000005\tPMID:10\tIDA\t\tP\t\t\tprotein\ttaxon:10090\t20200101\tMGI\n",
        )
        .unwrap();

        let config = RefineryConfig::builder()
            .go_obo_source(obo.to_str().unwrap())
            .association_file(gaf.to_str().unwrap())
            .build();
        let downloader = Downloader::new(&config).unwrap();

        let ontology = build_go_ontology(&config, &downloader).await.unwrap();
        let root = ontology.get_term("GO:0008150").unwrap();
        assert_eq!(root.gene_ids().into_iter().collect::<Vec<_>>(), vec!["MGI:1"]);
    }
}
