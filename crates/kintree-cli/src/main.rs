use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use kintree_app::Settings;
use kintree_core::{LayoutMode, Member, MemberId};
use kintree_graph::{
    DepthTable, FamilyGraph, ForceLayouter, HierarchicalLayouter, LayoutOutput, Layouter,
    RelationQuery, Viewport,
};
use kintree_store::MemberStore;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON tree document
    #[arg(short, long)]
    file: PathBuf,

    /// Settings file; defaults to the per-user config location
    #[arg(short, long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List members without known parents
    Roots,
    /// Print the relation set of one member as JSON
    Relations { id: String },
    /// List the stories tagged with one member
    Stories { id: String },
    /// Print generation numbers, for one member or the whole tree
    Depth { id: Option<String> },
    /// Compute a layout and print it as JSON
    Layout {
        #[arg(long)]
        width: Option<f32>,
        #[arg(long)]
        height: Option<f32>,
        /// hierarchical or force
        #[arg(long)]
        mode: Option<LayoutMode>,
        /// Emit SVG path data instead of the full JSON
        #[arg(long)]
        svg: bool,
    },
    /// Report dropped parent references, cycles and stale story tags
    Diagnostics,
}

struct Loaded {
    store: MemberStore,
    graph: FamilyGraph,
    depths: DepthTable,
}

impl Loaded {
    fn open(path: &Path) -> Result<Self> {
        let store = MemberStore::open(path)
            .with_context(|| format!("Failed to open tree document {}", path.display()))?;
        let graph = FamilyGraph::build(&store.snapshot());
        let depths = DepthTable::compute(&graph);
        tracing::debug!(
            "Loaded tree {} with {} members and {} edges",
            store.tree().name,
            graph.len(),
            graph.edge_count()
        );
        Ok(Self {
            store,
            graph,
            depths,
        })
    }
}

fn roots(loaded: &Loaded) -> String {
    let mut out = String::new();
    for idx in loaded.graph.roots() {
        let member = &loaded.graph[*idx];
        let _ = writeln!(out, "{}\t{}", member.id, member.display_name());
    }
    out
}

fn relations(loaded: &Loaded, id: &str) -> Result<String> {
    let query = RelationQuery::new(&loaded.graph, &loaded.depths);
    let Some(relations) = query.relations(&MemberId::from(id)) else {
        bail!("Member {id} is not in this tree");
    };
    Ok(serde_json::to_string_pretty(&relations)?)
}

fn stories(loaded: &Loaded, id: &str) -> Result<String> {
    let member = MemberId::from(id);
    if !loaded.graph.contains(&member) {
        bail!("Member {id} is not in this tree");
    }
    let mut out = String::new();
    for story in loaded.store.stories_involving(&member) {
        let others: Vec<String> = loaded
            .store
            .related_members(story)
            .into_iter()
            .filter(|m| m.id != member)
            .map(Member::display_name)
            .collect();
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            story.id,
            story.date.as_deref().unwrap_or("-"),
            story.title,
            others.join(", ")
        );
    }
    Ok(out)
}

fn depth(loaded: &Loaded, id: Option<&str>) -> Result<String> {
    let mut out = String::new();
    match id {
        Some(id) => {
            let Some(depth) = loaded.depths.depth_of(&loaded.graph, &MemberId::from(id)) else {
                bail!("Member {id} is not in this tree");
            };
            let _ = writeln!(out, "{depth}");
        }
        None => {
            for (generation, level) in loaded.depths.levels().iter().enumerate() {
                for idx in level {
                    let member = &loaded.graph[*idx];
                    let _ = writeln!(out, "{generation}\t{}\t{}", member.id, member.display_name());
                }
            }
        }
    }
    Ok(out)
}

fn layout(
    loaded: &Loaded,
    settings: &Settings,
    mode: LayoutMode,
    viewport: Viewport,
) -> Result<LayoutOutput> {
    let output = match mode {
        LayoutMode::Hierarchical => HierarchicalLayouter {
            settings: settings.hierarchical_settings(),
        }
        .execute(&loaded.graph, &loaded.depths, viewport)?,
        LayoutMode::Force => ForceLayouter {
            settings: settings.force_settings(),
        }
        .execute(&loaded.graph, &loaded.depths, viewport)?,
    };
    Ok(output)
}

fn svg_paths(output: &LayoutOutput) -> String {
    let mut out = String::new();
    for link in &output.links {
        let _ = writeln!(out, "{}\t{}\t{}", link.source, link.target, link.path.to_svg());
    }
    out
}

fn diagnostics(loaded: &Loaded) -> Result<String> {
    let stale_tags: Vec<_> = loaded
        .store
        .dangling_story_refs()
        .into_iter()
        .map(|(story, member)| serde_json::json!({ "story": story, "member": member }))
        .collect();
    let report = serde_json::json!({
        "graph": loaded.graph.diagnostics(),
        "depth": loaded.depths.diagnostics(),
        "stories": stale_tags,
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let loaded = Loaded::open(&args.file)?;

    let text = match args.command {
        Command::Roots => roots(&loaded),
        Command::Relations { id } => relations(&loaded, &id)?,
        Command::Stories { id } => stories(&loaded, &id)?,
        Command::Depth { id } => depth(&loaded, id.as_deref())?,
        Command::Layout {
            width,
            height,
            mode,
            svg,
        } => {
            let viewport = Viewport::new(
                width.unwrap_or(settings.min_width),
                height.unwrap_or(settings.min_height),
            );
            let output = layout(
                &loaded,
                &settings,
                mode.unwrap_or(settings.layout_mode),
                viewport,
            )?;
            if svg {
                svg_paths(&output)
            } else {
                serde_json::to_string_pretty(&output)?
            }
        }
        Command::Diagnostics => diagnostics(&loaded)?,
    };
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
    Ok(())
}
