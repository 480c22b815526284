//! Subcommand implementations.

use std::path::Path;

use anyhow::{bail, Context, Result};
use editmark_otio::{write_to_file, OtioExporter};
use editmark_publish::{
    collect_comments, collect_tag_tasks, render_sequence_as_quicktime, CreateContext,
    CreateOptions, EditorialPackageCreator, EffectCollector, Instance, InstanceCreator,
    JobFileExporter, ProductKind, QuicktimeExport, Settings, ShotClipCreator, WorkContext,
    WorkfileCreator,
};
use editmark_timeline::{Project, ProjectFile, Sequence, TimelineItem};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::cli::{
    CollectArgs, CreateArgs, ExportOtioArgs, PackageArgs, RemoveArgs, RenderArgs, UpdateArgs,
    WorkfileArgs,
};

/// Load a snapshot and make `sequence` active when given.
pub fn load_snapshot(path: &Path, sequence: Option<&str>) -> Result<ProjectFile> {
    let mut file = ProjectFile::load_from_file(path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
    if let Some(name) = sequence {
        file.project.activate(name)?;
    }
    Ok(file)
}

fn save_snapshot(file: &ProjectFile, path: &Path) -> Result<()> {
    file.save_to_file(path)
        .with_context(|| format!("Failed to save snapshot {}", path.display()))?;
    info!(path = %path.display(), "saved snapshot");
    Ok(())
}

fn active_sequence(file: &mut ProjectFile) -> Result<&mut Sequence> {
    file.project
        .active_sequence_mut()
        .context("Snapshot has no active sequence")
}

// ── Create ──────────────────────────────────────────────────────

/// Create options from settings with the command line overrides applied.
pub fn create_options(settings: &Settings, args: &CreateArgs) -> Result<CreateOptions> {
    let mut options = ShotClipCreator::new(settings).default_options();
    options.use_selection = !args.all;
    options.export_audio |= args.audio;
    if args.no_rename {
        options.clip_rename = false;
    }
    if let Some(hierarchy) = &args.hierarchy {
        options = options.with_hierarchy(hierarchy.clone());
    }
    if let Some(clip_name) = &args.clip_name {
        options.clip_name = clip_name.clone();
    }
    if let Some(track) = &args.hero_track {
        options = options.with_hero_track(track.clone());
    }
    if let Some(track) = &args.review_track {
        options = options.with_review_track(track.clone());
    }
    if let Some(variant) = &args.variant {
        options = options.with_variant(variant.clone());
    }
    for (key, value) in &args.tokens {
        apply_token(&mut options, key, value)?;
    }
    Ok(options)
}

fn apply_token(options: &mut CreateOptions, key: &str, value: &str) -> Result<()> {
    let parse = |v: &str| -> Result<i64> {
        v.parse()
            .with_context(|| format!("`{key}` expects an integer, got `{v}`"))
    };
    match key {
        "folder" => options.folder = value.to_string(),
        "episode" => options.episode = value.to_string(),
        "sequence" => options.sequence = value.to_string(),
        "track" => options.track = value.to_string(),
        "shot" => options.shot = value.to_string(),
        "count_from" => options.count_from = parse(value)?,
        "count_steps" => options.count_steps = parse(value)?,
        "workfile_frame_start" => options.workfile_frame_start = parse(value)?,
        "handle_start" => options.handle_start = parse(value)?,
        "handle_end" => options.handle_end = parse(value)?,
        other => bail!("Unknown token `{other}`"),
    }
    Ok(())
}

pub fn create(settings: &Settings, args: &CreateArgs, sequence: Option<&str>) -> Result<()> {
    let options = create_options(settings, args)?;
    let mut file = load_snapshot(&args.project, sequence)?;
    let mut ctx = CreateContext::new();
    let created = {
        let sequence = active_sequence(&mut file)?;
        let creator = ShotClipCreator::new(settings);
        // Instances already on the timeline let re-creation replace them.
        creator.collect_instances(sequence, &mut ctx)?;
        creator.create(sequence, &mut ctx, &options)?
    };
    save_snapshot(&file, &args.project)?;

    for instance in &created {
        println!("{}\t{}\t{}", instance.instance_id, instance.product_name, instance.label);
    }
    info!(instances = created.len(), "create finished");
    Ok(())
}

// ── Project products ────────────────────────────────────────────

pub fn create_workfile(args: &WorkfileArgs) -> Result<()> {
    let mut file = load_snapshot(&args.project, None)?;
    let creator = WorkfileCreator::new(WorkContext::new(args.folder.clone(), args.task.clone()));
    match creator.create(&mut file.project, &mut CreateContext::new())? {
        Some(instance) => {
            save_snapshot(&file, &args.project)?;
            println!("{}\t{}\t{}", instance.instance_id, instance.product_name, instance.label);
        }
        None => println!("workfile instance already stored"),
    }
    Ok(())
}

pub fn create_package(args: &PackageArgs, sequence: Option<&str>) -> Result<()> {
    let mut file = load_snapshot(&args.project, sequence)?;
    let creator =
        EditorialPackageCreator::new(WorkContext::new(args.folder.clone(), args.task.clone()));
    let instance = creator.create(&mut file.project, &mut CreateContext::new(), &args.variant, args.review)?;
    save_snapshot(&file, &args.project)?;
    println!("{}\t{}\t{}", instance.instance_id, instance.product_name, instance.label);
    Ok(())
}

/// Workfile and editorial package instances stored in project tags.
pub fn collect_project_instances(project: &Project, ctx: &mut CreateContext) -> Result<Vec<Instance>> {
    let context = WorkContext::default();
    let mut instances: Vec<Instance> = WorkfileCreator::new(context.clone())
        .collect_instances(project, ctx)?
        .into_iter()
        .collect();
    instances.extend(EditorialPackageCreator::new(context).collect_instances(project, ctx)?);
    Ok(instances)
}

fn ids_of_kind(ctx: &CreateContext, ids: &[String], kind: ProductKind) -> Vec<String> {
    ids.iter()
        .filter(|id| ctx.get(id).and_then(Instance::kind) == Some(kind))
        .cloned()
        .collect()
}

// ── Collect ─────────────────────────────────────────────────────

/// Instance report with tasks, comments and effects of its clip.
pub fn instance_details(
    settings: &Settings,
    sequence: &Sequence,
    instance: &Instance,
) -> Result<Value> {
    let mut report = Map::new();
    report.insert("instance".into(), serde_json::to_value(instance)?);
    if let Some(item) = sequence.find_item(&instance.clip_index) {
        report.insert("tasks".into(), serde_json::to_value(collect_tag_tasks(item.tags()))?);
        report.insert("comments".into(), json!(collect_comments(&item)));
    }
    let effects = EffectCollector::new(&settings.collect).collect(sequence, instance)?;
    report.insert("effects".into(), serde_json::to_value(effects)?);
    Ok(Value::Object(report))
}

pub fn collect(settings: &Settings, args: &CollectArgs, sequence: Option<&str>) -> Result<()> {
    let mut settings = settings.clone();
    settings.collect.collect_selected_instances |= args.selected;

    let mut file = load_snapshot(&args.project, sequence)?;
    let mut ctx = CreateContext::new();
    let sequence = active_sequence(&mut file)?;
    let instances = ShotClipCreator::new(&settings).collect_instances(sequence, &mut ctx)?;
    let sequence: &Sequence = sequence;

    let mut report = if args.details {
        instances
            .iter()
            .map(|instance| instance_details(&settings, sequence, instance))
            .collect::<Result<Vec<_>>>()?
    } else {
        instances
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?
    };
    for instance in collect_project_instances(&file.project, &mut ctx)? {
        report.push(serde_json::to_value(instance)?);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.save {
        save_snapshot(&file, &args.project)?;
    }
    Ok(())
}

// ── Update / Remove ─────────────────────────────────────────────

/// Parse `key=<json>` changes. Values that are not JSON are taken as
/// strings.
pub fn parse_changes(changes: &[(String, String)]) -> Map<String, Value> {
    changes
        .iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            (key.clone(), value)
        })
        .collect()
}

pub fn update(settings: &Settings, args: &UpdateArgs, sequence: Option<&str>) -> Result<()> {
    let mut file = load_snapshot(&args.project, sequence)?;
    let mut ctx = CreateContext::new();
    ShotClipCreator::new(settings).collect_instances(active_sequence(&mut file)?, &mut ctx)?;
    collect_project_instances(&file.project, &mut ctx)?;
    let kind = ctx
        .get(&args.id)
        .and_then(Instance::kind)
        .with_context(|| format!("Unknown instance `{}`", args.id))?;
    let updates = [(args.id.clone(), parse_changes(&args.changes))];
    match kind {
        ProductKind::Workfile => WorkfileCreator::new(WorkContext::default())
            .update_instances(&mut file.project, &mut ctx, &updates)?,
        ProductKind::EditorialPackage => EditorialPackageCreator::new(WorkContext::default())
            .update_instances(&mut file.project, &mut ctx, &updates)?,
        kind => InstanceCreator::new(kind).update_instances(
            active_sequence(&mut file)?,
            &mut ctx,
            &updates,
        )?,
    }
    save_snapshot(&file, &args.project)?;
    println!("updated {}", args.id);
    Ok(())
}

pub fn remove(settings: &Settings, args: &RemoveArgs, sequence: Option<&str>) -> Result<()> {
    let mut file = load_snapshot(&args.project, sequence)?;
    let mut ctx = CreateContext::new();
    let creator = ShotClipCreator::new(settings);
    creator.collect_instances(active_sequence(&mut file)?, &mut ctx)?;
    collect_project_instances(&file.project, &mut ctx)?;

    let workfiles = ids_of_kind(&ctx, &args.ids, ProductKind::Workfile);
    let packages = ids_of_kind(&ctx, &args.ids, ProductKind::EditorialPackage);
    let clip_products: Vec<String> = args
        .ids
        .iter()
        .filter(|id| !workfiles.contains(id) && !packages.contains(id))
        .cloned()
        .collect();
    WorkfileCreator::new(WorkContext::default()).remove_instances(&mut file.project, &mut ctx, &workfiles)?;
    EditorialPackageCreator::new(WorkContext::default()).remove_instances(&mut file.project, &mut ctx, &packages)?;
    creator.remove_instances(active_sequence(&mut file)?, &mut ctx, &clip_products)?;
    save_snapshot(&file, &args.project)?;
    println!("removed {} instance(s)", args.ids.len());
    Ok(())
}

// ── Export ──────────────────────────────────────────────────────

pub fn export_otio(args: &ExportOtioArgs, sequence: Option<&str>) -> Result<()> {
    let file = load_snapshot(&args.project, sequence)?;
    let mut exporter = OtioExporter::for_project(&file.project)?
        .include_tags(!args.no_tags)
        .image_sequences(!args.no_image_sequences);
    if let Some(timecode) = &args.start_timecode {
        exporter = exporter
            .with_start_timecode(timecode)
            .with_context(|| format!("Invalid start timecode `{timecode}`"))?;
    }
    let timeline = exporter.export()?;
    write_to_file(&timeline, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(output = %args.output.display(), tracks = timeline.tracks.children.len(), "exported timeline");
    Ok(())
}

pub fn render(args: &RenderArgs, sequence: Option<&str>) -> Result<()> {
    let file = load_snapshot(&args.project, None)?;
    let export = QuicktimeExport::new(&args.output).with_audio(!args.no_audio);
    let mut exporter = JobFileExporter::new(&args.job);
    render_sequence_as_quicktime(&file.project, sequence, &export, &mut exporter)?;
    println!("{}", exporter.job_path().display());
    Ok(())
}
