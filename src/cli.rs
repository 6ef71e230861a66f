use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "breakbook",
    version,
    about = "Catalog break-dance moves, generate combos and track goals with SQLite"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "BREAKBOOK_HOME",
        help = "Data directory (defaults to ~/.breakbook)"
    )]
    pub home: Option<PathBuf>,
    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Raise log verbosity (-v info, -vv debug, -vvv trace)"
    )]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Move(MoveCommand),
    #[command(subcommand)]
    Tag(TagCommand),
    #[command(subcommand)]
    Combo(ComboCommand),
    #[command(subcommand)]
    Battle(BattleCommand),
    #[command(subcommand)]
    Goal(GoalCommand),
    #[command(subcommand)]
    Stage(StageCommand),
    #[command(subcommand)]
    Data(DataCommand),
}

#[derive(Subcommand, Debug)]
pub enum MoveCommand {
    Add(MoveAdd),
    List(MoveList),
    Show(MoveShow),
    Rename(MoveRename),
    Remove(IdList),
    Tag(MoveTagArgs),
    Untag(MoveTagArgs),
    #[command(name = "set-tags")]
    SetTags(MoveSetTags),
}

#[derive(Subcommand, Debug)]
pub enum TagCommand {
    Add(TagAdd),
    List,
    Rename(TagRename),
    Remove(TagRemove),
}

#[derive(Subcommand, Debug)]
pub enum ComboCommand {
    Add(ComboAdd),
    List(ComboList),
    Show(ComboShow),
    Update(ComboUpdate),
    #[command(name = "set-moves")]
    SetMoves(ComboSetMoves),
    #[command(name = "set-tags")]
    SetTags(ComboSetTags),
    Remove(ComboShow),
    Generate(ComboGenerate),
    #[command(name = "generate-structured")]
    GenerateStructured(ComboGenerateStructured),
}

#[derive(Subcommand, Debug)]
pub enum BattleCommand {
    Add(BattleAdd),
    #[command(name = "from-combo")]
    FromCombo(BattleFromCombo),
    List(BattleList),
    Update(BattleUpdate),
    Used(IdList),
    Unused(IdList),
    Reset,
    Pick(BattlePick),
    Remove(IdList),
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Add(GoalAdd),
    List(GoalList),
    Show(GoalShow),
    Update(GoalUpdate),
    Archive(GoalShow),
    Unarchive(GoalShow),
    Remove(GoalShow),
}

#[derive(Subcommand, Debug)]
pub enum StageCommand {
    Add(StageAdd),
    Update(StageUpdate),
    Progress(StageProgress),
    Remove(StageRemove),
}

#[derive(Subcommand, Debug)]
pub enum DataCommand {
    Export(DataPath),
    Import(DataPath),
}

#[derive(Args, Debug)]
pub struct IdList {
    #[arg(value_name = "ID", num_args = 1..)]
    pub ids: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct MoveAdd {
    #[arg(value_name = "NAME", num_args = 1..)]
    pub names: Vec<String>,
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct MoveList {
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    #[arg(long, value_enum)]
    pub tag_match: Option<TagMatchArg>,
}

#[derive(Args, Debug)]
pub struct MoveShow {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct MoveRename {
    pub id: i64,
    pub name: String,
}

#[derive(Args, Debug)]
pub struct MoveTagArgs {
    pub id: i64,
    #[arg(value_name = "TAG", num_args = 1..)]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct MoveSetTags {
    pub id: i64,
    #[arg(value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TagAdd {
    #[arg(value_name = "NAME", num_args = 1..)]
    pub names: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TagRename {
    pub id: i64,
    pub name: String,
}

#[derive(Args, Debug)]
pub struct TagRemove {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct ComboAdd {
    pub name: String,
    #[arg(value_name = "MOVE_ID", num_args = 1..)]
    pub move_ids: Vec<i64>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_enum, default_value = "medium")]
    pub energy: EnergyArg,
    #[arg(long, value_enum, default_value = "training")]
    pub status: ComboStatusArg,
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ComboList {
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    #[arg(long, value_enum)]
    pub tag_match: Option<TagMatchArg>,
    #[arg(long, value_enum)]
    pub energy: Option<EnergyArg>,
    #[arg(long, value_enum)]
    pub status: Option<ComboStatusArg>,
}

#[derive(Args, Debug)]
pub struct ComboShow {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct ComboUpdate {
    pub id: i64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_enum)]
    pub energy: Option<EnergyArg>,
    #[arg(long, value_enum)]
    pub status: Option<ComboStatusArg>,
}

#[derive(Args, Debug)]
pub struct ComboSetMoves {
    pub id: i64,
    #[arg(value_name = "MOVE_ID", num_args = 1..)]
    pub move_ids: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct ComboSetTags {
    pub id: i64,
    #[arg(value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SaveArgs {
    #[arg(long, value_name = "NAME", help = "Save the generated combo under this name")]
    pub save: Option<String>,
    #[arg(long = "save-tag", value_name = "TAG", requires = "save")]
    pub save_tags: Vec<String>,
    #[arg(long, value_name = "SEED", help = "Seed the generator for repeatable output")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ComboGenerate {
    #[arg(long, value_name = "N", help = "Number of moves (random 2-5 when omitted)")]
    pub length: Option<usize>,
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    #[arg(long, value_enum)]
    pub tag_match: Option<TagMatchArg>,
    #[arg(long, help = "Allow the same move more than once")]
    pub repeats: bool,
    #[command(flatten)]
    pub save: SaveArgs,
}

#[derive(Args, Debug)]
pub struct ComboGenerateStructured {
    #[arg(value_name = "TAG", num_args = 1.., help = "One tag per slot, in order")]
    pub sequence: Vec<String>,
    #[command(flatten)]
    pub save: SaveArgs,
}

#[derive(Args, Debug)]
pub struct BattleAdd {
    pub description: String,
    #[arg(value_name = "MOVE", num_args = 1..)]
    pub moves: Vec<String>,
    #[arg(long, value_enum, default_value = "medium")]
    pub energy: EnergyArg,
    #[arg(long, value_enum, default_value = "training")]
    pub status: ComboStatusArg,
}

#[derive(Args, Debug)]
pub struct BattleFromCombo {
    pub combo_id: i64,
    #[arg(long, value_enum)]
    pub energy: Option<EnergyArg>,
    #[arg(long, value_enum)]
    pub status: Option<ComboStatusArg>,
}

#[derive(Args, Debug)]
pub struct BattleList {
    #[arg(long, value_enum)]
    pub energy: Option<EnergyArg>,
    #[arg(long, value_enum)]
    pub status: Option<ComboStatusArg>,
    #[arg(long, conflicts_with = "unused")]
    pub used: bool,
    #[arg(long)]
    pub unused: bool,
}

#[derive(Args, Debug)]
pub struct BattleUpdate {
    pub id: i64,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_enum)]
    pub energy: Option<EnergyArg>,
    #[arg(long, value_enum)]
    pub status: Option<ComboStatusArg>,
    #[arg(long = "move", value_name = "MOVE", help = "Replace the move list")]
    pub moves: Vec<String>,
}

#[derive(Args, Debug)]
pub struct BattlePick {
    #[arg(long, value_enum)]
    pub energy: Option<EnergyArg>,
    #[arg(long, help = "Leave the picked combo unused")]
    pub keep: bool,
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct GoalAdd {
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(
        long = "stage",
        value_name = "NAME:TARGET[:UNIT]",
        help = "Add a stage; repeat for more"
    )]
    pub stages: Vec<String>,
}

#[derive(Args, Debug)]
pub struct GoalList {
    #[arg(long, conflicts_with = "all")]
    pub archived: bool,
    #[arg(long, help = "Include archived goals")]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct GoalShow {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct GoalUpdate {
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct StageAdd {
    pub goal_id: i64,
    pub name: String,
    pub target: i32,
    #[arg(long, default_value = "reps")]
    pub unit: String,
}

#[derive(Args, Debug)]
pub struct StageUpdate {
    pub id: i64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub target: Option<i32>,
    #[arg(long)]
    pub current: Option<i32>,
    #[arg(long)]
    pub unit: Option<String>,
}

#[derive(Args, Debug)]
pub struct StageProgress {
    pub id: i64,
    #[arg(allow_negative_numbers = true, help = "Amount to add; negative to subtract")]
    pub delta: i32,
}

#[derive(Args, Debug)]
pub struct StageRemove {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct DataPath {
    pub path: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum EnergyArg {
    Low,
    Medium,
    High,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ComboStatusArg {
    Training,
    Ready,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TagMatchArg {
    Any,
    All,
}
