//! `rtk fmea` command - FMEA tree management and analysis

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{find_project, fmea_report, resolve_format, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::path::{Level, NodeKey};
use crate::core::Config;
use crate::entities::FmeaEntity;
use crate::fmea::{FmeaController, FmeaModel, Node};

#[derive(Subcommand, Debug)]
pub enum FmeaCommands {
    /// Show the FMEA tree of a function or hardware item
    Show(ShowArgs),

    /// Add a mode, mechanism, cause, control or action
    Add(AddArgs),

    /// Remove an item and everything beneath it
    Rm(RmArgs),

    /// Set item attributes (KEY=VALUE ...)
    Set(SetArgs),

    /// Calculate RPN for every mechanism and cause under a node
    Rpn(RpnArgs),

    /// Calculate MIL-STD-1629A criticality for every failure mode
    Crit(CritArgs),
}

/// Analysis subject shared by every subcommand
#[derive(clap::Args, Debug)]
pub struct SubjectArgs {
    /// Function or hardware item id the FMEA belongs to
    pub subject: i64,

    /// Functional FMEA (controls and actions under modes)
    #[arg(long)]
    pub functional: bool,

    /// Hardware FMEA (controls and actions under causes)
    #[arg(long, conflicts_with = "functional")]
    pub hardware: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,

    /// Show only this node and its descendants (e.g. 0.1.2)
    #[arg(long, short = 'n')]
    pub node: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,

    /// Level of the new item (mode, mechanism, cause, control, action)
    #[arg(long, short = 'l')]
    pub level: String,

    /// Node to add under (0 = FMEA root)
    #[arg(long, short = 'p', default_value = "0")]
    pub parent: String,

    /// Description (recommended action text for actions)
    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,

    /// Node to remove (e.g. 0.1.2)
    pub node: String,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,

    /// Node to edit (e.g. 0.1.2.1.1c)
    pub node: String,

    /// Attribute assignments, e.g. rpn_occurrence=7 single_point=true description="Fatigue"
    #[arg(required = true)]
    pub values: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct RpnArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,

    /// Node whose mechanisms and causes are rated (usually a mode)
    pub node: String,

    /// Severity rating (1-10)
    #[arg(long, short = 's')]
    pub severity: i32,

    /// Severity rating after recommended actions (1-10)
    #[arg(long)]
    pub severity_new: i32,
}

#[derive(clap::Args, Debug)]
pub struct CritArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,

    /// Item hazard rate (failures per hour)
    #[arg(long = "item-hr")]
    pub item_hr: f64,
}

pub fn run(cmd: FmeaCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        FmeaCommands::Show(args) => run_show(args, global),
        FmeaCommands::Add(args) => run_add(args, global),
        FmeaCommands::Rm(args) => run_rm(args, global),
        FmeaCommands::Set(args) => run_set(args, global),
        FmeaCommands::Rpn(args) => run_rpn(args, global),
        FmeaCommands::Crit(args) => run_crit(args, global),
    }
}

/// Open the project database and select the subject's FMEA
fn open(subject: &SubjectArgs, global: &GlobalOpts) -> Result<(FmeaController, Config)> {
    let project = find_project(global)?;
    let config = Config::load_for(Some(&project));
    let db = project
        .open_database(config.database.as_deref())
        .map_err(|e| miette::miette!("{}", e))?;

    let mut controller = FmeaController::new(FmeaModel::new(db));
    if global.verbose {
        controller.bus_mut().subscribe(|event| {
            eprintln!("{} {}", style("event").dim(), style(event.name()).magenta());
        });
    }

    let functional = subject.functional || (!subject.hardware && config.functional());
    controller
        .request_select_all(subject.subject, functional)
        .map_err(fmea_report)?;
    Ok((controller, config))
}

fn parse_node(text: &str) -> Result<NodeKey> {
    text.parse()
        .map_err(|e| miette::miette!("Invalid node id '{}': {}", text, e))
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (controller, config) = open(&args.subject, global)?;
    let start = match &args.node {
        Some(text) => parse_node(text)?,
        None => NodeKey::root(),
    };

    let tree = controller.model().tree();
    if !tree.contains(&start) {
        return Err(miette::miette!("No node {} in this FMEA", start));
    }
    let nodes: Vec<&Node> = tree.subtree(&start).collect();
    let rows: Vec<FmeaRow> = nodes.iter().filter_map(|n| FmeaRow::from_node(n)).collect();

    match resolve_format(global, &config, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&nodes).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&nodes).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for row in &rows {
                writer.serialize(row).into_diagnostic()?;
            }
            writer.flush().into_diagnostic()?;
        }
        OutputFormat::Tsv => {
            println!("node\tlevel\tid\tdescription\trpn\trpn_new");
            for row in &rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    row.node,
                    row.level,
                    row.id,
                    row.description.replace(['\t', '\n'], " "),
                    row.rpn.map_or(String::new(), |r| r.to_string()),
                    row.rpn_new.map_or(String::new(), |r| r.to_string())
                );
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["Node", "Level", "Description", "RPN", "RPN (new)"]);
            for row in &rows {
                builder.push_record([
                    row.node.clone(),
                    row.level.to_string(),
                    row.description.clone(),
                    row.rpn.map_or("-".to_string(), |r| r.to_string()),
                    row.rpn_new.map_or("-".to_string(), |r| r.to_string()),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Id => {
            for row in &rows {
                println!("{}", row.node);
            }
        }
        OutputFormat::Auto => print_tree(&nodes, start.depth(), global.quiet),
    }

    Ok(())
}

fn print_tree(nodes: &[&Node], base_depth: usize, quiet: bool) {
    for node in nodes {
        let indent = "  ".repeat(node.key.depth().saturating_sub(base_depth));
        let Some(entity) = &node.data else {
            println!("{}{}", indent, style(node.tag()).bold());
            continue;
        };

        let level = match entity.level() {
            Level::Mode => style(entity.level().as_str()).red(),
            Level::Mechanism | Level::Cause => style(entity.level().as_str()).yellow(),
            Level::Control | Level::Action => style(entity.level().as_str()).green(),
        };
        let rpn = match entity.rpn() {
            Some((rpn, rpn_new)) if rpn > 0 => {
                let rpn_str = rpn.to_string();
                let rpn_display = match rpn {
                    r if r > 400 => style(rpn_str).red().to_string(),
                    r if r > 150 => style(rpn_str).yellow().to_string(),
                    _ => rpn_str,
                };
                format!("  RPN {} → {}", rpn_display, rpn_new)
            }
            _ => String::new(),
        };

        println!(
            "{}{} {} {}{}",
            indent,
            style(&node.key).cyan(),
            level,
            truncate_str(node.tag(), 60),
            rpn
        );
    }

    if !quiet && nodes.len() <= 1 {
        println!();
        println!(
            "{}",
            style("No failure modes yet. Use 'rtk fmea add <SUBJECT> --level mode' to add one.").dim()
        );
    }
}

/// One flattened row of tabular output
#[derive(Debug, Serialize)]
struct FmeaRow {
    node: String,
    level: Level,
    id: i64,
    description: String,
    rpn: Option<i32>,
    rpn_new: Option<i32>,
}

impl FmeaRow {
    fn from_node(node: &Node) -> Option<Self> {
        let entity = node.data.as_ref()?;
        let rpn = entity.rpn();
        Some(Self {
            node: node.key.to_string(),
            level: entity.level(),
            id: entity.id(),
            description: entity.description().to_string(),
            rpn: rpn.map(|(r, _)| r),
            rpn_new: rpn.map(|(_, r)| r),
        })
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let (mut controller, _) = open(&args.subject, global)?;
    let parent = parse_node(&args.parent)?;
    let entity_id = parent.entity_id().unwrap_or(args.subject.subject);

    let key = controller
        .request_insert(entity_id, &parent, &args.level)
        .map_err(fmea_report)?;

    if let Some(description) = &args.description {
        if let Some(entity) = controller.model_mut().select_mut(&key) {
            let attribute = description_attribute(entity);
            entity
                .set_attribute(attribute, description)
                .map_err(|e| fmea_report(e.into()))?;
        }
        controller.request_update(&key).map_err(fmea_report)?;
    }

    if global.quiet || global.format == OutputFormat::Id {
        println!("{}", key);
    } else {
        println!(
            "{} Added {} {}",
            style("✓").green(),
            args.level.to_lowercase(),
            style(&key).cyan()
        );
    }
    Ok(())
}

/// Attribute holding the text shown as the node tag
fn description_attribute(entity: &FmeaEntity) -> &'static str {
    match entity {
        FmeaEntity::Action(_) => "action_recommended",
        _ => "description",
    }
}

fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let (mut controller, _) = open(&args.subject, global)?;
    let key = parse_node(&args.node)?;
    let removed = controller.model().tree().subtree(&key).count();

    controller.request_delete(&key).map_err(fmea_report)?;

    if !global.quiet {
        println!(
            "{} Removed {} ({} item(s))",
            style("✓").green(),
            style(&key).cyan(),
            removed
        );
    }
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let (mut controller, _) = open(&args.subject, global)?;
    let key = parse_node(&args.node)?;
    let assignments = args
        .values
        .iter()
        .map(|v| parse_assignment(v))
        .collect::<Result<Vec<_>>>()?;

    let entity = controller
        .model_mut()
        .select_mut(&key)
        .ok_or_else(|| miette::miette!("No node {} in this FMEA", key))?;
    for (name, value) in &assignments {
        entity
            .set_attribute(name, value)
            .map_err(|e| fmea_report(e.into()))?;
    }
    controller.request_update(&key).map_err(fmea_report)?;

    if !global.quiet {
        for (name, value) in &assignments {
            println!(
                "{} Set {} {} = {}",
                style("✓").green(),
                style(&key).cyan(),
                style(name).cyan(),
                style(value).yellow()
            );
        }
    }
    Ok(())
}

fn parse_assignment(text: &str) -> Result<(String, String)> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| miette::miette!("Expected KEY=VALUE, got '{}'", text))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(miette::miette!("Expected KEY=VALUE, got '{}'", text));
    }
    Ok((name.to_string(), value.to_string()))
}

fn run_rpn(args: RpnArgs, global: &GlobalOpts) -> Result<()> {
    let (mut controller, _) = open(&args.subject, global)?;
    let key = parse_node(&args.node)?;

    controller
        .request_calculate_rpn(&key, args.severity, args.severity_new)
        .map_err(fmea_report)?;
    controller.request_update_all().map_err(fmea_report)?;

    if global.quiet {
        return Ok(());
    }
    for node in controller.model().tree().subtree(&key) {
        if let Some((rpn, rpn_new)) = node.data.as_ref().and_then(FmeaEntity::rpn) {
            println!(
                "{:<16} {:<10} RPN {:>4}  new {:>4}",
                style(&node.key).cyan(),
                node.key.level().map_or("", |l| l.as_str()),
                rpn,
                rpn_new
            );
        }
    }
    Ok(())
}

fn run_crit(args: CritArgs, global: &GlobalOpts) -> Result<()> {
    let (mut controller, _) = open(&args.subject, global)?;

    let count = controller
        .request_calculate_criticality(args.item_hr)
        .map_err(fmea_report)?;
    controller.request_update_all().map_err(fmea_report)?;

    if global.quiet {
        return Ok(());
    }
    for node in controller.model().tree().nodes() {
        if let Some(mode) = node.data.as_ref().and_then(FmeaEntity::as_mode) {
            println!(
                "{:<8} λm = {:<12.6e} Cm = {:.6e}  {}",
                style(&node.key).cyan(),
                mode.mode_hazard_rate,
                mode.mode_criticality,
                truncate_str(&mode.description, 40)
            );
        }
    }
    println!();
    println!(
        "{} Calculated criticality for {} failure mode(s)",
        style("✓").green(),
        style(count).cyan()
    );
    Ok(())
}
