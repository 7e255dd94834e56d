//! Gene set refinery - build gene sets from ontology sources

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use refinery_common::logging::{init_logging, LogConfig, LogLevel};
use refinery_ingest::config::parse_code_list;
use refinery_ingest::output::write_records;
use refinery_ingest::{disease, go, DiseaseGeneTable, Downloader, RefineryConfig, TagColumns, TagMap};
use refinery_ontology::slim::read_slim_ids;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "refinery")]
#[command(author, version, about = "Build gene sets from GO and DO sources")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every remote source into the download folder
    Download {
        /// Download folder
        #[arg(short, long, env = "REFINERY_DOWNLOAD_FOLDER")]
        folder: Option<PathBuf>,
    },

    /// Build Gene Ontology gene sets
    Go {
        #[command(flatten)]
        common: CommonArgs,

        /// GAF association file (path or URL)
        #[arg(short, long)]
        assoc: Option<String>,

        /// Accepted evidence codes, comma separated
        #[arg(short, long)]
        evidence: Option<String>,

        /// Gene id mapping file applied to the associations
        #[arg(long)]
        id_map: Option<PathBuf>,

        /// NCBI taxon id of the organism
        #[arg(long)]
        taxon_id: Option<String>,

        /// NCBI taxonomy nodes.dmp
        #[arg(long)]
        taxonomy_nodes: Option<PathBuf>,

        /// NCBI taxonomy names.dmp
        #[arg(long)]
        taxonomy_names: Option<PathBuf>,

        /// Taxon constraint OBO file
        #[arg(long)]
        taxon_constraints: Option<PathBuf>,
    },

    /// Build Disease Ontology gene sets
    Do {
        #[command(flatten)]
        common: CommonArgs,

        /// `omim_id<TAB>gene_id` table
        #[arg(short = 'g', long)]
        disease_genes: PathBuf,

        /// OMIM confidence labels admitted by the gene table
        #[arg(long, default_value = "C,P")]
        confidence: String,
    },

    /// Vote for terms from slim lists and write the reduced slim
    Slim {
        /// OBO file (path or URL)
        #[arg(long)]
        obo: String,

        /// Slim lists (`name<TAB>id`), one voter per file
        #[arg(required = true)]
        votes: Vec<PathBuf>,

        /// Root term of the slim
        #[arg(short, long)]
        root: String,

        /// Minimum votes for a term to be kept
        #[arg(short, long, default_value_t = 1)]
        min_votes: usize,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that a slim covers every leaf of a namespace
    CheckFringe {
        /// OBO file (path or URL)
        #[arg(long)]
        obo: String,

        /// Slim list (`name<TAB>id`)
        slim: PathBuf,

        /// Namespace to check
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// List the descendants of a term within its namespace
    Descendants {
        /// OBO file (path or URL)
        #[arg(long)]
        obo: String,

        /// Term id (alternate ids resolve)
        term: String,
    },

    /// Write the annotated hierarchy as a JSON tree with per-term summaries
    Tree {
        #[command(flatten)]
        common: CommonArgs,

        /// GAF association file (path or URL)
        #[arg(short, long)]
        assoc: Option<String>,

        /// Head term; every head when omitted
        #[arg(long)]
        head: Option<String>,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// OBO file (path or URL)
    #[arg(long)]
    obo: Option<String>,

    /// Scientific name of the organism
    #[arg(long)]
    organism: Option<String>,

    /// Tab-separated term to tag mapping
    #[arg(long)]
    tags: Option<PathBuf>,

    /// The tag mapping file starts with a header row
    #[arg(long)]
    tags_header: bool,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl CommonArgs {
    fn apply(&self, config: &mut RefineryConfig) {
        if let Some(organism) = &self.organism {
            config.organism = organism.clone();
        }
        if let Some(path) = &self.tags {
            config.tag_mapping_file = Some(path.clone());
        }
        if let Some(path) = &self.output {
            config.output = Some(path.clone());
        }
    }

    fn tags(&self, config: &RefineryConfig) -> Result<Option<TagMap>> {
        config
            .tag_mapping_file
            .as_ref()
            .map(|path| {
                TagMap::from_path(path, TagColumns::default(), self.tags_header)
                    .with_context(|| format!("reading tag mapping {}", path.display()))
            })
            .transpose()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("refinery")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    let mut config = RefineryConfig::from_env();

    match cli.command {
        Command::Download { folder } => {
            if let Some(folder) = folder {
                config.download_folder = folder;
            }
            let downloader = Downloader::new(&config)?;
            let saved = downloader.download_sources(&config).await?;
            info!("Downloaded {} files to {}", saved.len(), config.download_folder.display());
        },
        Command::Go {
            common,
            assoc,
            evidence,
            id_map,
            taxon_id,
            taxonomy_nodes,
            taxonomy_names,
            taxon_constraints,
        } => {
            common.apply(&mut config);
            if let Some(obo) = &common.obo {
                config.go_obo_source = obo.clone();
            }
            if assoc.is_some() {
                config.association_file = assoc;
            }
            if let Some(codes) = evidence {
                config.evidence_codes = parse_code_list(&codes);
            }
            config.id_map_file = id_map.or(config.id_map_file);
            config.taxon_id = taxon_id.or(config.taxon_id);
            config.taxonomy_nodes = taxonomy_nodes.or(config.taxonomy_nodes);
            config.taxonomy_names = taxonomy_names.or(config.taxonomy_names);
            config.taxon_constraints = taxon_constraints.or(config.taxon_constraints);

            info!("Building GO gene sets for {}", config.organism);
            let downloader = Downloader::new(&config)?;
            let ontology = go::build_go_ontology(&config, &downloader)
                .await
                .context("building the GO graph")?;
            let tags = common.tags(&config)?;
            let gene_sets = go::go_gene_sets(&ontology, &config, tags.as_ref());
            write_records(config.output.as_deref(), &gene_sets)?;
        },
        Command::Do {
            common,
            disease_genes,
            confidence,
        } => {
            common.apply(&mut config);
            if let Some(obo) = &common.obo {
                config.do_obo_source = obo.clone();
            }

            info!("Building DO gene sets for {}", config.organism);
            let downloader = Downloader::new(&config)?;
            let ontology = downloader.load_ontology(&config.do_obo_source).await?;
            let table = DiseaseGeneTable::from_reader(BufReader::new(open(&disease_genes)?))?
                .with_confidence(parse_code_list(&confidence));
            let tags = common.tags(&config)?;
            let gene_sets = disease::disease_gene_sets(ontology, &table, &config, tags.as_ref())?;
            write_records(config.output.as_deref(), &gene_sets)?;
        },
        Command::Slim {
            obo,
            votes,
            root,
            min_votes,
            output,
        } => {
            let downloader = Downloader::new(&config)?;
            let mut ontology = downloader.load_ontology(&obo).await?;
            for path in &votes {
                let ids = read_slim_ids(BufReader::new(open(path)?))?;
                let voter = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                ontology.vote(&ids, &voter);
            }

            let written = match output {
                Some(path) => {
                    let mut out = BufWriter::new(File::create(&path)?);
                    let written = ontology.write_slim(&root, min_votes, &mut out)?;
                    out.flush()?;
                    written
                },
                None => ontology.write_slim(&root, min_votes, &mut io::stdout().lock())?,
            };
            info!("Slim under {} has {} terms", root, written);
        },
        Command::CheckFringe {
            obo,
            slim,
            namespace,
        } => {
            let downloader = Downloader::new(&config)?;
            let ontology = downloader.load_ontology(&obo).await?;
            let ids = read_slim_ids(BufReader::new(open(&slim)?))?;
            if !ontology.check_fringe(&ids, namespace.as_deref())? {
                bail!("slim {} leaves some leaf terms uncovered", slim.display());
            }
            info!("Slim {} covers every leaf", slim.display());
        },
        Command::Descendants { obo, term } => {
            let downloader = Downloader::new(&config)?;
            let ontology = downloader.load_ontology(&obo).await?;
            if !ontology.contains(&term) {
                bail!("unknown term {}", term);
            }
            let mut out = io::stdout().lock();
            for id in ontology.get_descendants(&term) {
                writeln!(out, "{}", id)?;
            }
        },
        Command::Tree { common, assoc, head } => {
            common.apply(&mut config);
            if let Some(obo) = &common.obo {
                config.go_obo_source = obo.clone();
            }
            if assoc.is_some() {
                config.association_file = assoc;
            }

            let downloader = Downloader::new(&config)?;
            let mut ontology = go::build_go_ontology(&config, &downloader).await?;
            ontology.summarize(&config.organism);
            let tree = ontology.to_json_tree(head.as_deref())?;
            write_records(config.output.as_deref(), &[tree])?;
        },
    }

    info!("Done");
    Ok(())
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}
