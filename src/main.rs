mod app;
mod cli;
mod db;
mod entities;
mod error;
mod generator;
mod model;
mod transfer;
mod util;

use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::cli::{
    BattleAdd, BattleCommand, BattleFromCombo, BattleList, BattlePick, BattleUpdate, Cli,
    ComboAdd, ComboCommand, ComboGenerate, ComboGenerateStructured, ComboList, ComboSetMoves,
    ComboSetTags, ComboStatusArg, ComboUpdate, Command, DataCommand, EnergyArg, GoalAdd,
    GoalCommand, GoalList, GoalUpdate, IdList, MoveAdd, MoveCommand, MoveList, MoveRename,
    MoveSetTags, MoveTagArgs, SaveArgs, StageAdd, StageCommand, StageProgress, StageUpdate,
    TagCommand, TagMatchArg,
};
use crate::error::AppError;
use crate::generator::{GeneratedCombo, RandomRequest};
use crate::model::{
    BattleComboChanges, BattleComboInput, BattleQuery, ComboChanges, ComboInput, ComboQuery,
    ComboStatus, Energy, GoalChanges, GoalInput, MoveQuery, StageChanges, StageInput, TagMatch,
};
use crate::util::{
    format_battle_detail, format_battle_line, format_combo_detail, format_combo_line,
    format_goal_detail, format_goal_line, format_move_detail, format_move_line,
    format_move_sequence, format_stage_line, format_tag_line,
};

const HOME_DIR_NAME: &str = ".breakbook";
const LOG_ENV: &str = "BREAKBOOK_LOG";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let Cli {
        home,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);

    let home = resolve_home(home)?;
    let db_path = db::resolve_db_path(&home);
    db::ensure_parent_dir(&db_path)?;
    let mut lock = db::open_lock(&db_path)?;
    let _guard = lock.write()?;

    let db = db::connect(&db_path).await?;
    db::ensure_schema(&db).await?;
    let app = App::new(db);

    match command {
        Command::Move(command) => handle_move(&app, command).await,
        Command::Tag(command) => handle_tag(&app, command).await,
        Command::Combo(command) => handle_combo(&app, command).await,
        Command::Battle(command) => handle_battle(&app, command).await,
        Command::Goal(command) => handle_goal(&app, command).await,
        Command::Stage(command) => handle_stage(&app, command).await,
        Command::Data(command) => handle_data(&app, command).await,
    }
}

fn init_tracing(verbose: u8) {
    let filter = match std::env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => EnvFilter::new(value),
        _ => EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn resolve_home(flag: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(home) = flag {
        return Ok(home);
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home).join(HOME_DIR_NAME));
        }
    }
    Err(AppError::InvalidInput(
        "unable to resolve data directory; pass --home or set BREAKBOOK_HOME".to_string(),
    ))
}

async fn handle_move(app: &App, command: MoveCommand) -> Result<(), AppError> {
    match command {
        MoveCommand::Add(args) => handle_move_add(app, args).await,
        MoveCommand::List(args) => handle_move_list(app, args).await,
        MoveCommand::Show(args) => {
            let detail = app.get_move_detail(args.id).await?;
            println!("{}", format_move_detail(&detail));
            Ok(())
        }
        MoveCommand::Rename(args) => handle_move_rename(app, args).await,
        MoveCommand::Remove(args) => {
            let deleted = app.delete_moves(&args.ids).await?;
            if deleted == 1 {
                println!("Move ID: {} removed.", args.ids[0]);
            } else {
                println!("Removed {} moves.", deleted);
            }
            Ok(())
        }
        MoveCommand::Tag(args) => handle_move_tag(app, args, true).await,
        MoveCommand::Untag(args) => handle_move_tag(app, args, false).await,
        MoveCommand::SetTags(args) => handle_move_set_tags(app, args).await,
    }
}

async fn handle_move_add(app: &App, args: MoveAdd) -> Result<(), AppError> {
    let MoveAdd { names, tags } = args;
    if tags.is_empty() {
        for created in app.add_moves_batch(names).await? {
            println!("Created move ID: {}: {}", created.id, created.name);
        }
        return Ok(());
    }
    for detail in app.add_moves_with_tags(names, tags).await? {
        println!(
            "Created move ID: {}: {}",
            detail.dance_move.id, detail.dance_move.name
        );
    }
    Ok(())
}

async fn handle_move_list(app: &App, args: MoveList) -> Result<(), AppError> {
    let moves = app
        .list_moves(&MoveQuery {
            search: args.search,
            tags: args.tags,
            tag_match: tag_match_from_arg(args.tag_match),
        })
        .await?;
    if moves.is_empty() {
        println!("No moves found.");
        return Ok(());
    }
    for detail in &moves {
        println!("{}", format_move_line(detail));
    }
    Ok(())
}

async fn handle_move_rename(app: &App, args: MoveRename) -> Result<(), AppError> {
    let updated = app.rename_move(args.id, args.name).await?;
    println!("Renamed move ID: {} to {}", updated.id, updated.name);
    Ok(())
}

async fn handle_move_tag(app: &App, args: MoveTagArgs, link: bool) -> Result<(), AppError> {
    let detail = if link {
        app.tag_move(args.id, &args.tags).await?
    } else {
        app.untag_move(args.id, &args.tags).await?
    };
    println!("{}", format_move_line(&detail));
    Ok(())
}

async fn handle_move_set_tags(app: &App, args: MoveSetTags) -> Result<(), AppError> {
    let detail = app.set_move_tags(args.id, &args.tags).await?;
    println!("{}", format_move_line(&detail));
    Ok(())
}

async fn handle_tag(app: &App, command: TagCommand) -> Result<(), AppError> {
    match command {
        TagCommand::Add(args) => {
            for name in args.names {
                let tag = app.add_tag(name).await?;
                println!("Created tag ID: {}: {}", tag.id, tag.name);
            }
            Ok(())
        }
        TagCommand::List => {
            let tags = app.list_tags().await?;
            if tags.is_empty() {
                println!("No tags found.");
                return Ok(());
            }
            for summary in &tags {
                println!("{}", format_tag_line(summary));
            }
            Ok(())
        }
        TagCommand::Rename(args) => {
            let tag = app.rename_tag(args.id, args.name).await?;
            println!("Renamed tag ID: {} to {}", tag.id, tag.name);
            Ok(())
        }
        TagCommand::Remove(args) => {
            let tag = app.get_tag(args.id).await?;
            app.delete_tag(tag.id).await?;
            println!("Tag ID: {} removed: {}", tag.id, tag.name);
            Ok(())
        }
    }
}

async fn handle_combo(app: &App, command: ComboCommand) -> Result<(), AppError> {
    match command {
        ComboCommand::Add(args) => handle_combo_add(app, args).await,
        ComboCommand::List(args) => handle_combo_list(app, args).await,
        ComboCommand::Show(args) => {
            let detail = app.get_combo_detail(args.id).await?;
            println!("{}", format_combo_detail(&detail));
            Ok(())
        }
        ComboCommand::Update(args) => handle_combo_update(app, args).await,
        ComboCommand::SetMoves(args) => handle_combo_set_moves(app, args).await,
        ComboCommand::SetTags(args) => handle_combo_set_tags(app, args).await,
        ComboCommand::Remove(args) => {
            app.delete_combo(args.id).await?;
            println!("Combo ID: {} removed.", args.id);
            Ok(())
        }
        ComboCommand::Generate(args) => handle_combo_generate(app, args).await,
        ComboCommand::GenerateStructured(args) => {
            handle_combo_generate_structured(app, args).await
        }
    }
}

async fn handle_combo_add(app: &App, args: ComboAdd) -> Result<(), AppError> {
    let detail = app
        .add_combo(ComboInput {
            name: args.name,
            description: args.description,
            energy: energy_from_arg(args.energy),
            status: status_from_arg(args.status),
            move_ids: args.move_ids,
            tags: args.tags,
        })
        .await?;
    println!(
        "Created combo ID: {}: {} ({})",
        detail.combo.id,
        detail.combo.name,
        format_move_sequence(&detail.moves)
    );
    Ok(())
}

async fn handle_combo_list(app: &App, args: ComboList) -> Result<(), AppError> {
    let combos = app
        .list_combos(&ComboQuery {
            tags: args.tags,
            tag_match: tag_match_from_arg(args.tag_match),
            energy: args.energy.map(energy_from_arg),
            status: args.status.map(status_from_arg),
        })
        .await?;
    if combos.is_empty() {
        println!("No combos found.");
        return Ok(());
    }
    for detail in &combos {
        println!("{}", format_combo_line(detail));
    }
    Ok(())
}

async fn handle_combo_update(app: &App, args: ComboUpdate) -> Result<(), AppError> {
    let combo = app
        .update_combo(
            args.id,
            ComboChanges {
                name: args.name,
                description: args.description,
                energy: args.energy.map(energy_from_arg),
                status: args.status.map(status_from_arg),
            },
        )
        .await?;
    println!("Updated combo ID: {}: {}", combo.id, combo.name);
    Ok(())
}

async fn handle_combo_set_moves(app: &App, args: ComboSetMoves) -> Result<(), AppError> {
    let detail = app.set_combo_moves(args.id, &args.move_ids).await?;
    println!("{}", format_combo_line(&detail));
    Ok(())
}

async fn handle_combo_set_tags(app: &App, args: ComboSetTags) -> Result<(), AppError> {
    let detail = app.set_combo_tags(args.id, &args.tags).await?;
    println!("{}", format_combo_detail(&detail));
    Ok(())
}

async fn handle_combo_generate(app: &App, args: ComboGenerate) -> Result<(), AppError> {
    let mut rng = rng_from_seed(args.save.seed);
    let generated = app
        .generate_random_combo(
            &args.tags,
            tag_match_from_arg(args.tag_match),
            &RandomRequest {
                length: args.length,
                allow_repeats: args.repeats,
            },
            &mut rng,
        )
        .await?;
    print_generated(app, &generated, args.save).await
}

async fn handle_combo_generate_structured(
    app: &App,
    args: ComboGenerateStructured,
) -> Result<(), AppError> {
    let mut rng = rng_from_seed(args.save.seed);
    let generated = app
        .generate_structured_combo(&args.sequence, &mut rng)
        .await?;
    print_generated(app, &generated, args.save).await
}

async fn print_generated(
    app: &App,
    generated: &GeneratedCombo,
    save: SaveArgs,
) -> Result<(), AppError> {
    for warning in &generated.warnings {
        warn!("{warning}");
    }
    if generated.moves.is_empty() {
        println!("No moves generated.");
        return Ok(());
    }
    println!("{}", format_move_sequence(&generated.moves));
    if let Some(name) = save.save {
        let detail = app.save_generated(name, generated, save.save_tags).await?;
        println!("Saved combo ID: {}: {}", detail.combo.id, detail.combo.name);
    }
    Ok(())
}

async fn handle_battle(app: &App, command: BattleCommand) -> Result<(), AppError> {
    match command {
        BattleCommand::Add(args) => handle_battle_add(app, args).await,
        BattleCommand::FromCombo(args) => handle_battle_from_combo(app, args).await,
        BattleCommand::List(args) => handle_battle_list(app, args).await,
        BattleCommand::Update(args) => handle_battle_update(app, args).await,
        BattleCommand::Used(args) => handle_battle_used(app, args, true).await,
        BattleCommand::Unused(args) => handle_battle_used(app, args, false).await,
        BattleCommand::Reset => {
            let count = app.reset_battle_used().await?;
            println!("Reset {} battle combos.", count);
            Ok(())
        }
        BattleCommand::Pick(args) => handle_battle_pick(app, args).await,
        BattleCommand::Remove(args) => {
            let deleted = app.delete_battle_combos(&args.ids).await?;
            if deleted == 1 {
                println!("Battle combo ID: {} removed.", args.ids[0]);
            } else {
                println!("Removed {} battle combos.", deleted);
            }
            Ok(())
        }
    }
}

async fn handle_battle_add(app: &App, args: BattleAdd) -> Result<(), AppError> {
    let detail = app
        .add_battle_combo(BattleComboInput {
            description: args.description,
            energy: energy_from_arg(args.energy),
            status: status_from_arg(args.status),
            moves: args.moves,
        })
        .await?;
    println!(
        "Created battle combo ID: {}: {}",
        detail.combo.id, detail.combo.description
    );
    Ok(())
}

async fn handle_battle_from_combo(app: &App, args: BattleFromCombo) -> Result<(), AppError> {
    let detail = app
        .battle_from_combo(
            args.combo_id,
            args.energy.map(energy_from_arg),
            args.status.map(status_from_arg),
        )
        .await?;
    println!(
        "Created battle combo ID: {} from combo ID: {}",
        detail.combo.id, args.combo_id
    );
    Ok(())
}

async fn handle_battle_list(app: &App, args: BattleList) -> Result<(), AppError> {
    let used = match (args.used, args.unused) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    let combos = app
        .list_battle_combos(&BattleQuery {
            energy: args.energy.map(energy_from_arg),
            status: args.status.map(status_from_arg),
            used,
        })
        .await?;
    if combos.is_empty() {
        println!("No battle combos found.");
        return Ok(());
    }
    for detail in &combos {
        println!("{}", format_battle_line(detail));
    }
    Ok(())
}

async fn handle_battle_update(app: &App, args: BattleUpdate) -> Result<(), AppError> {
    let moves = if args.moves.is_empty() {
        None
    } else {
        Some(args.moves)
    };
    let detail = app
        .update_battle_combo(
            args.id,
            BattleComboChanges {
                description: args.description,
                energy: args.energy.map(energy_from_arg),
                status: args.status.map(status_from_arg),
                moves,
            },
        )
        .await?;
    println!("{}", format_battle_line(&detail));
    Ok(())
}

async fn handle_battle_used(app: &App, args: IdList, used: bool) -> Result<(), AppError> {
    let ids = app.set_battle_used(&args.ids, used).await?;
    let label = if used { "used" } else { "unused" };
    if ids.len() == 1 {
        println!("Battle combo ID: {} marked {}.", ids[0], label);
    } else {
        println!("Marked {} battle combos {}.", ids.len(), label);
    }
    Ok(())
}

async fn handle_battle_pick(app: &App, args: BattlePick) -> Result<(), AppError> {
    let mut rng = rng_from_seed(args.seed);
    let picked = app
        .pick_battle_combo(args.energy.map(energy_from_arg), !args.keep, &mut rng)
        .await?;
    match picked {
        Some(detail) => println!("{}", format_battle_detail(&detail)),
        None => println!("No ready battle combos left."),
    }
    Ok(())
}

async fn handle_goal(app: &App, command: GoalCommand) -> Result<(), AppError> {
    match command {
        GoalCommand::Add(args) => handle_goal_add(app, args).await,
        GoalCommand::List(args) => handle_goal_list(app, args).await,
        GoalCommand::Show(args) => {
            let detail = app.get_goal_detail(args.id).await?;
            println!("{}", format_goal_detail(&detail));
            Ok(())
        }
        GoalCommand::Update(args) => handle_goal_update(app, args).await,
        GoalCommand::Archive(args) => {
            let goal = app.set_goal_archived(args.id, true).await?;
            println!("Goal ID: {} archived.", goal.id);
            Ok(())
        }
        GoalCommand::Unarchive(args) => {
            let goal = app.set_goal_archived(args.id, false).await?;
            println!("Goal ID: {} restored.", goal.id);
            Ok(())
        }
        GoalCommand::Remove(args) => {
            app.delete_goal(args.id).await?;
            println!("Goal ID: {} removed.", args.id);
            Ok(())
        }
    }
}

async fn handle_goal_add(app: &App, args: GoalAdd) -> Result<(), AppError> {
    let mut stages = Vec::with_capacity(args.stages.len());
    for value in &args.stages {
        stages.push(parse_stage_arg(value)?);
    }
    let detail = app
        .add_goal(GoalInput {
            title: args.title,
            description: args.description,
            stages,
        })
        .await?;
    println!(
        "Created goal ID: {}: {} (stages: {})",
        detail.goal.id,
        detail.goal.title,
        detail.stages.len()
    );
    Ok(())
}

async fn handle_goal_list(app: &App, args: GoalList) -> Result<(), AppError> {
    let archived = if args.all {
        None
    } else {
        Some(args.archived)
    };
    let goals = app.list_goals(archived).await?;
    if goals.is_empty() {
        println!("No goals found.");
        return Ok(());
    }
    for detail in &goals {
        println!("{}", format_goal_line(detail));
    }
    Ok(())
}

async fn handle_goal_update(app: &App, args: GoalUpdate) -> Result<(), AppError> {
    let goal = app
        .update_goal(
            args.id,
            GoalChanges {
                title: args.title,
                description: args.description,
            },
        )
        .await?;
    println!("Updated goal ID: {}: {}", goal.id, goal.title);
    Ok(())
}

async fn handle_stage(app: &App, command: StageCommand) -> Result<(), AppError> {
    match command {
        StageCommand::Add(args) => handle_stage_add(app, args).await,
        StageCommand::Update(args) => handle_stage_update(app, args).await,
        StageCommand::Progress(args) => handle_stage_progress(app, args).await,
        StageCommand::Remove(args) => {
            app.delete_stage(args.id).await?;
            println!("Stage ID: {} removed.", args.id);
            Ok(())
        }
    }
}

async fn handle_stage_add(app: &App, args: StageAdd) -> Result<(), AppError> {
    let stage = app
        .add_stage(
            args.goal_id,
            StageInput {
                name: args.name,
                target_count: args.target,
                unit: args.unit,
            },
        )
        .await?;
    println!(
        "Created stage ID: {} for goal ID: {}",
        stage.id, stage.goal_id
    );
    Ok(())
}

async fn handle_stage_update(app: &App, args: StageUpdate) -> Result<(), AppError> {
    let stage = app
        .update_stage(
            args.id,
            StageChanges {
                name: args.name,
                target_count: args.target,
                current_count: args.current,
                unit: args.unit,
            },
        )
        .await?;
    println!("{}", format_stage_line(&stage));
    Ok(())
}

async fn handle_stage_progress(app: &App, args: StageProgress) -> Result<(), AppError> {
    let stage = app.adjust_stage_progress(args.id, args.delta).await?;
    println!("{}", format_stage_line(&stage));
    Ok(())
}

async fn handle_data(app: &App, command: DataCommand) -> Result<(), AppError> {
    match command {
        DataCommand::Export(args) => {
            let snapshot = app.export_data().await?;
            transfer::write_snapshot(&args.path, &snapshot)?;
            println!(
                "Exported {} rows to {}",
                snapshot.row_count(),
                args.path.display()
            );
            Ok(())
        }
        DataCommand::Import(args) => {
            let snapshot = transfer::read_snapshot(&args.path)?;
            let rows = snapshot.row_count();
            app.import_data(snapshot).await?;
            println!("Imported {} rows from {}", rows, args.path.display());
            Ok(())
        }
    }
}

fn parse_stage_arg(value: &str) -> Result<StageInput, AppError> {
    let mut parts = value.splitn(3, ':');
    let name = parts.next().unwrap_or("").trim();
    let target = parts.next().map(str::trim).unwrap_or("");
    let unit = parts.next().map(str::trim).unwrap_or("reps");
    if name.is_empty() || target.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "invalid stage '{value}', expected NAME:TARGET[:UNIT]"
        )));
    }
    let target_count = target.parse::<i32>().map_err(|_| {
        AppError::InvalidInput(format!("invalid stage target '{target}' in '{value}'"))
    })?;
    Ok(StageInput {
        name: name.to_string(),
        target_count,
        unit: unit.to_string(),
    })
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn energy_from_arg(value: EnergyArg) -> Energy {
    match value {
        EnergyArg::Low => Energy::Low,
        EnergyArg::Medium => Energy::Medium,
        EnergyArg::High => Energy::High,
    }
}

fn status_from_arg(value: ComboStatusArg) -> ComboStatus {
    match value {
        ComboStatusArg::Training => ComboStatus::Training,
        ComboStatusArg::Ready => ComboStatus::Ready,
    }
}

fn tag_match_from_arg(value: Option<TagMatchArg>) -> TagMatch {
    match value {
        Some(TagMatchArg::All) => TagMatch::All,
        Some(TagMatchArg::Any) | None => TagMatch::Any,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_arg_defaults_unit() {
        let stage = parse_stage_arg("Circles:20").expect("stage");
        assert_eq!(stage.name, "Circles");
        assert_eq!(stage.target_count, 20);
        assert_eq!(stage.unit, "reps");

        let stage = parse_stage_arg("Hold : 30 : seconds").expect("stage");
        assert_eq!(stage.unit, "seconds");
    }

    #[test]
    fn stage_arg_rejects_bad_input() {
        assert!(parse_stage_arg("Circles").is_err());
        assert!(parse_stage_arg("Circles:many").is_err());
        assert!(parse_stage_arg(":5").is_err());
    }

    #[test]
    fn home_flag_wins() {
        let home = resolve_home(Some(PathBuf::from("/tmp/bb"))).expect("home");
        assert_eq!(home, PathBuf::from("/tmp/bb"));
    }
}
