mod init;
pub use init::cmd_init;

use std::path::PathBuf;
use std::sync::Mutex;

use crate::board::BoardState;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::model::config::BoardConfig;
use crate::model::entity::EntitySeed;
use crate::model::form;
use crate::model::history::FieldValue;
use crate::model::stage::{PipelineKind, StageIndex};
use crate::model::workflow::{Advance, SubRecord, WorkshopRoute};
use crate::ops::transition::{Begun, CommitOutcome, Coordinator};
use crate::ops::{reorder, stage_ops, undo, workflow_ops};
use crate::store::{JsonStore, PipelineStore};
use crate::util::text::normalize_key;

/// Global override for the board directory (set by the -C flag)
static BOARD_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

type CliError = Box<dyn std::error::Error>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), CliError> {
    let json = cli.json;

    if let Some(ref dir) = cli.board_dir {
        let abs = std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        BOARD_DIR_OVERRIDE.lock().unwrap().replace(abs);
    }

    match cli.command {
        None => {
            eprintln!("no subcommand (try `tb --help`)");
            Ok(())
        }
        Some(cmd) => match cmd {
            // Init is handled in main.rs before board discovery
            Commands::Init(args) => cmd_init(args, None),

            Commands::Stages(args) => cmd_stages(args, json),
            Commands::List(args) => cmd_list(args, json),
            Commands::Show(args) => cmd_show(args, json),
            Commands::History(args) => cmd_history(args, json),
            Commands::New(args) => cmd_new(args, json),
            Commands::Mv(args) => cmd_mv(args, json),
            Commands::Reorder(args) => cmd_reorder(args, json),
            Commands::Undo(args) => cmd_undo(args, json),
            Commands::Record(args) => cmd_record(args, json),
            Commands::Delete(args) => cmd_delete(args),
            Commands::Stage(args) => cmd_stage(args, json),
        },
    }
}

// ---------------------------------------------------------------------------
// Plumbing
// ---------------------------------------------------------------------------

fn board_root() -> Result<PathBuf, CliError> {
    if let Some(dir) = BOARD_DIR_OVERRIDE.lock().unwrap().clone() {
        return Ok(dir);
    }
    let cwd = std::env::current_dir()?;
    Ok(JsonStore::discover(&cwd)?)
}

fn open_store() -> Result<JsonStore, CliError> {
    Ok(JsonStore::open(&board_root()?)?)
}

fn parse_pipeline(s: &str) -> Result<PipelineKind, CliError> {
    match s {
        "quotes" | "q" => Ok(PipelineKind::Quotes),
        "projects" | "p" => Ok(PipelineKind::Projects),
        other => Err(format!("unknown pipeline '{other}' (use quotes or projects)").into()),
    }
}

fn board_for(store: &JsonStore, kind: PipelineKind) -> Result<BoardState, CliError> {
    Ok(BoardState::new(
        kind,
        store.list_stages(kind)?,
        store.list_entities(kind)?,
    ))
}

/// Which pipeline an entity id lives in.
fn find_entity_kind(store: &JsonStore, id: &str) -> Result<PipelineKind, CliError> {
    for kind in [PipelineKind::Quotes, PipelineKind::Projects] {
        if store.list_entities(kind)?.iter().any(|e| e.id == id) {
            return Ok(kind);
        }
    }
    Err(format!("entity not found: {id}").into())
}

/// Resolve a stage argument: exact id first, then accent-insensitive
/// display-name lookup within the given pipeline.
fn resolve_stage(config: &BoardConfig, kind: PipelineKind, arg: &str) -> Result<String, CliError> {
    let stages = config.stages(kind);
    if stages.iter().any(|s| s.id == arg) {
        return Ok(arg.to_string());
    }
    let index = StageIndex::build(&stages);
    index
        .resolve(arg)
        .map(str::to_string)
        .ok_or_else(|| format!("stage not found: {arg}").into())
}

fn stage_name(config: &BoardConfig, stage_id: &str) -> String {
    config
        .find_stage(stage_id)
        .map(|(_, sc)| sc.stage.name.clone())
        .unwrap_or_else(|| stage_id.to_string())
}

fn parse_set(pairs: &[String]) -> Result<Vec<(String, String)>, CliError> {
    let mut out = Vec::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("--set needs KEY=VALUE, got '{pair}'"))?;
        out.push((key.trim().to_string(), value.to_string()));
    }
    Ok(out)
}

fn print_move(config: &BoardConfig, outcome: &CommitOutcome, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&MoveJson::from_outcome(outcome)).unwrap()
        );
        return;
    }
    println!(
        "moved {}: {} -> {}",
        outcome.entity_id,
        stage_name(config, &outcome.from),
        stage_name(config, &outcome.to)
    );
    if let Some(amount) = outcome.new_amount {
        println!("amount is now {amount}");
    }
    if let Some(line) = describe_side_effect(&outcome.side_effect) {
        println!("{line}");
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_stages(args: StagesArgs, json: bool) -> Result<(), CliError> {
    let kind = parse_pipeline(&args.pipeline)?;
    let store = open_store()?;
    let board = board_for(&store, kind)?;

    if json {
        let stages: Vec<StageJson> = board
            .display_stages()
            .into_iter()
            .map(|s| StageJson::from_stage(s, board.lane(&s.id).len()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&stages)?);
        return Ok(());
    }
    for stage in board.display_stages() {
        let mut flags = String::new();
        if stage.locked {
            flags.push_str(" [locked]");
        }
        if stage.terminal {
            flags.push_str(" [terminal]");
        }
        println!(
            "{:<20} {:<18} {}{}",
            stage.name,
            format!("({})", stage.id),
            board.lane(&stage.id).len(),
            flags
        );
    }
    Ok(())
}

fn cmd_list(args: ListArgs, json: bool) -> Result<(), CliError> {
    let kind = parse_pipeline(&args.pipeline)?;
    let store = open_store()?;
    let board = board_for(&store, kind)?;
    let only = match &args.stage {
        Some(arg) => Some(resolve_stage(store.config(), kind, arg)?),
        None => None,
    };

    if json {
        let stages: Vec<StageEntitiesJson> = board
            .display_stages()
            .into_iter()
            .filter(|s| only.as_deref().is_none_or(|o| o == s.id))
            .map(|s| StageEntitiesJson {
                stage: StageJson::from_stage(s, board.lane(&s.id).len()),
                entities: board
                    .lane(&s.id)
                    .iter()
                    .filter_map(|id| board.entity(id))
                    .map(EntityJson::from_entity)
                    .collect(),
            })
            .collect();
        let out = BoardJson {
            pipeline: kind.to_string(),
            stages,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for stage in board.display_stages() {
        if let Some(only) = &only
            && only != &stage.id
        {
            continue;
        }
        println!("## {} ({})", stage.name, board.lane(&stage.id).len());
        for id in board.lane(&stage.id) {
            if let Some(entity) = board.entity(id) {
                println!("  {:<8} {:<24} {}", entity.id, entity.client, entity.amount);
            }
        }
    }
    Ok(())
}

fn cmd_show(args: ShowArgs, json: bool) -> Result<(), CliError> {
    let store = open_store()?;
    let kind = find_entity_kind(&store, &args.id)?;
    let entity = store
        .list_entities(kind)?
        .into_iter()
        .find(|e| e.id == args.id)
        .ok_or_else(|| format!("entity not found: {}", args.id))?;

    if json {
        let out = serde_json::json!({
            "entity": EntityJson::from_entity(&entity),
            "history": entity.history.iter().map(HistoryEntryJson::from_entry).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{}  {}  [{}]",
        entity.id,
        entity.client,
        stage_name(store.config(), &entity.stage_id)
    );
    println!("amount: {}", entity.amount);
    if let Some(assignee) = &entity.assignee {
        println!("assignee: {assignee}");
    }
    if let Some(detail) = &entity.detail {
        println!("detail: {detail}");
    }
    if let Some(source) = &entity.source_quote {
        println!("source quote: {source}");
    }
    if !entity.attachments.is_empty() {
        println!("attachments: {}", entity.attachments.join(", "));
    }
    for (stage_id, record) in &entity.sub_records {
        let mut parts = Vec::new();
        if !record.fields.is_empty() {
            parts.push(format!("{} fields", record.fields.len()));
        }
        if !record.attachments.is_empty() {
            parts.push(format!("{} attachments", record.attachments.len()));
        }
        if let Some(route) = record.route {
            parts.push(format!("route: {route}"));
        }
        println!(
            "record {}: {}",
            stage_name(store.config(), stage_id),
            if parts.is_empty() { "empty".to_string() } else { parts.join(", ") }
        );
    }
    Ok(())
}

fn cmd_history(args: HistoryArgs, json: bool) -> Result<(), CliError> {
    let store = open_store()?;
    let kind = find_entity_kind(&store, &args.id)?;
    let entity = store
        .list_entities(kind)?
        .into_iter()
        .find(|e| e.id == args.id)
        .ok_or_else(|| format!("entity not found: {}", args.id))?;

    if json {
        let entries: Vec<HistoryEntryJson> = entity
            .history
            .iter()
            .map(HistoryEntryJson::from_entry)
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in &entity.history {
        let mut line = format!(
            "{}  {}",
            entry.at.format("%Y-%m-%d %H:%M"),
            stage_name(store.config(), &entry.stage_id)
        );
        if !entry.snapshot.is_empty() {
            let fields: Vec<String> = entry
                .snapshot
                .iter()
                .map(|(k, v)| format!("{k}={}", field_value_text(v)))
                .collect();
            line.push_str(&format!("  ({})", fields.join(", ")));
        }
        println!("{line}");
    }
    Ok(())
}

fn field_value_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Flag(b) => b.to_string(),
        FieldValue::List(items) => items.join("|"),
    }
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_new(args: NewArgs, json: bool) -> Result<(), CliError> {
    let kind = parse_pipeline(&args.pipeline)?;
    let mut store = open_store()?;
    let seed = EntitySeed {
        client: args.client,
        amount: args.amount,
        assignee: args.assignee,
        detail: args.detail,
        source_quote: None,
    };
    let entity = store.create_entity(kind, seed)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&EntityJson::from_entity(&entity))?
        );
    } else {
        println!(
            "created {} in {}",
            entity.id,
            stage_name(store.config(), &entity.stage_id)
        );
    }
    Ok(())
}

fn cmd_mv(args: MvArgs, json: bool) -> Result<(), CliError> {
    let mut store = open_store()?;
    let kind = find_entity_kind(&store, &args.id)?;
    let dest = resolve_stage(store.config(), kind, &args.stage)?;
    let config = store.config().clone();
    let mut board = board_for(&store, kind)?;

    let mut coordinator = Coordinator::new();
    match coordinator.begin(&mut board, &mut store, &config, &args.id, &dest)? {
        Begun::Committed(outcome) => {
            print_move(&config, &outcome, json);
        }
        Begun::NeedsInput => {
            let pending = coordinator
                .pending()
                .expect("awaiting input after NeedsInput")
                .clone();
            let mut values = pending.defaults.clone();
            for (key, raw) in parse_set(&args.set)? {
                let normalized = normalize_key(&key);
                let field = pending
                    .fields
                    .iter()
                    .find(|f| f.key() == normalized)
                    .ok_or_else(|| {
                        format!("stage {} has no field '{}'", stage_name(&config, &dest), key)
                    })?;
                match form::parse_value(field, &raw)? {
                    Some(value) => {
                        values.insert(field.key(), value);
                    }
                    None => {
                        values.shift_remove(&field.key());
                    }
                }
            }
            let outcome = coordinator.submit(&mut board, &mut store, &config, values)?;
            print_move(&config, &outcome, json);
        }
    }
    Ok(())
}

fn cmd_reorder(args: ReorderArgs, json: bool) -> Result<(), CliError> {
    let mut store = open_store()?;
    let config = store.config().clone();
    let mut found = None;
    for kind in [PipelineKind::Quotes, PipelineKind::Projects] {
        if let Ok(id) = resolve_stage(&config, kind, &args.stage) {
            found = Some((kind, id));
            break;
        }
    }
    let (kind, stage_id) =
        found.ok_or_else(|| format!("stage not found: {}", args.stage))?;
    let mut board = board_for(&store, kind)?;

    reorder::reorder(&mut board, &mut store, &stage_id, args.ids.clone())?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "stage": stage_id, "order": args.ids })
        );
    } else {
        println!("reordered {}", stage_name(&config, &stage_id));
    }
    Ok(())
}

fn cmd_undo(args: UndoArgs, json: bool) -> Result<(), CliError> {
    let mut store = open_store()?;
    let kind = find_entity_kind(&store, &args.id)?;
    let config = store.config().clone();
    let mut board = board_for(&store, kind)?;

    let outcome = undo::undo(&mut board, &mut store, &args.id)?;
    match outcome {
        undo::UndoOutcome::Reverted { from, to } => {
            if json {
                let out = UndoJson {
                    id: args.id.clone(),
                    reverted: true,
                    from: Some(from),
                    to: Some(to),
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!(
                    "{} returned to {}",
                    args.id,
                    stage_name(&config, &to)
                );
            }
        }
        undo::UndoOutcome::NothingToUndo => {
            if json {
                let out = UndoJson {
                    id: args.id.clone(),
                    reverted: false,
                    from: None,
                    to: None,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("nothing to undo for {} (no prior stage)", args.id);
            }
        }
    }
    Ok(())
}

fn cmd_record(args: RecordArgs, json: bool) -> Result<(), CliError> {
    let mut store = open_store()?;
    let config = store.config().clone();
    let stage_id = resolve_stage(&config, PipelineKind::Projects, &args.stage)?;
    let mut board = board_for(&store, PipelineKind::Projects)?;

    // start from the existing record and fold the edits in
    let mut record = board
        .entity(&args.id)
        .and_then(|e| e.sub_record(&stage_id))
        .cloned()
        .unwrap_or_default();
    for (key, raw) in parse_set(&args.set)? {
        let value = match raw.parse::<i64>() {
            Ok(n) => FieldValue::Number(n),
            Err(_) => FieldValue::Text(raw),
        };
        record.fields.insert(normalize_key(&key), value);
    }
    record.attachments.extend(args.attach.iter().cloned());
    if let Some(assignee) = args.assignee {
        record.assignee = Some(assignee);
    }
    if let Some(advance) = &args.advance {
        record.advance = Advance::parse(advance)
            .ok_or_else(|| format!("--advance must be yes, no, or in-review, got '{advance}'"))?;
    }
    if let Some(route) = &args.route {
        record.route = Some(
            WorkshopRoute::parse(route)
                .ok_or_else(|| format!("unknown route '{route}'"))?,
        );
    }

    let outcome =
        workflow_ops::save_sub_record(&mut board, &mut store, &config, &args.id, &stage_id, record)?;
    match outcome {
        workflow_ops::SaveOutcome::Saved => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "id": args.id, "stage": stage_id, "advanced": false })
                );
            } else {
                println!("saved {} record for {}", stage_name(&config, &stage_id), args.id);
            }
        }
        workflow_ops::SaveOutcome::Advanced { commit, .. } => {
            if !json {
                println!("saved {} record for {}", stage_name(&config, &stage_id), args.id);
            }
            print_move(&config, &commit, json);
        }
    }
    Ok(())
}

fn cmd_delete(args: DeleteArgs) -> Result<(), CliError> {
    let mut store = open_store()?;
    store.delete_entity(&args.id)?;
    println!("deleted {}", args.id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Stage management
// ---------------------------------------------------------------------------

fn cmd_stage(args: StageCmd, json: bool) -> Result<(), CliError> {
    let mut store = open_store()?;
    match args.command {
        StageCommands::Add { pipeline, id, name } => {
            let kind = parse_pipeline(&pipeline)?;
            let mut board = board_for(&store, kind)?;
            let stage = stage_ops::create_stage(&mut board, &mut store, &id, &name)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&StageJson::from_stage(&stage, 0))?
                );
            } else {
                println!("created stage {} ({})", stage.name, stage.id);
            }
        }
        StageCommands::Rename { id, name } => {
            let kind = store
                .config()
                .find_stage(&id)
                .map(|(k, _)| k)
                .ok_or_else(|| format!("stage not found: {id}"))?;
            let mut board = board_for(&store, kind)?;
            stage_ops::rename_stage(&mut board, &mut store, &id, &name)?;
            println!("renamed {id} to {name}");
        }
        StageCommands::Mv { pipeline, ids } => {
            let kind = parse_pipeline(&pipeline)?;
            let mut board = board_for(&store, kind)?;
            stage_ops::reorder_stages(&mut board, &mut store, &ids)?;
            println!("reordered {} stages", kind);
        }
        StageCommands::Rm { id } => {
            let kind = store
                .config()
                .find_stage(&id)
                .map(|(k, _)| k)
                .ok_or_else(|| format!("stage not found: {id}"))?;
            let mut board = board_for(&store, kind)?;
            stage_ops::delete_stage(&mut board, &mut store, &id)?;
            println!("deleted stage {id}");
        }
    }
    Ok(())
}
