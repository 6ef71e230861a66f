use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, Statement};
use serde_json::Value;
use tempfile::TempDir;
use url::Url;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_breakbook"))
}

fn run_cmd(home: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(bin_path());
    cmd.arg("--home").arg(home);
    cmd.args(args);
    cmd.env_remove("BREAKBOOK_HOME");
    cmd.env_remove("BREAKBOOK_LOG");
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.output().expect("run command")
}

fn output_stdout(output: Output) -> String {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout utf8")
}

fn output_stderr(output: Output) -> String {
    assert!(!output.status.success(), "command unexpectedly succeeded");
    assert_eq!(output.status.code(), Some(1));
    String::from_utf8(output.stderr).expect("stderr utf8")
}

fn parse_created_id(stdout: &str, prefix: &str) -> i64 {
    let line = stdout
        .lines()
        .find(|line| line.starts_with(prefix))
        .expect("created line");
    let rest = line.strip_prefix(prefix).expect("prefix");
    let id_str = rest
        .split(|c: char| c == ':' || c.is_whitespace())
        .next()
        .expect("id");
    id_str.trim().parse().expect("id parse")
}

fn add_move(home: &Path, name: &str, tags: &[&str]) -> i64 {
    let mut args = vec!["move", "add", name];
    for tag in tags {
        args.push("--tag");
        args.push(tag);
    }
    let stdout = output_stdout(run_cmd(home, &args));
    parse_created_id(&stdout, "Created move ID: ")
}

fn seed_catalog(home: &Path) -> (i64, i64, i64) {
    output_stdout(run_cmd(home, &["tag", "add", "Power", "Freeze"]));
    let windmill = add_move(home, "Windmill", &["Power"]);
    let flare = add_move(home, "Flare", &["power"]);
    let chair = add_move(home, "Chair", &["Freeze"]);
    (windmill, flare, chair)
}

#[test]
fn move_and_tag_lifecycle() {
    let dir = TempDir::new().expect("temp dir");
    let (windmill, _, _) = seed_catalog(dir.path());

    let stdout = output_stdout(run_cmd(dir.path(), &["move", "list", "--tag", "power"]));
    assert!(stdout.contains("Windmill [Power]"));
    assert!(stdout.contains("Flare [Power]"));
    assert!(!stdout.contains("Chair"));

    let stdout = output_stdout(run_cmd(dir.path(), &["tag", "list"]));
    assert!(stdout.contains("Power (2 moves)"));
    assert!(stdout.contains("Freeze (1 move)"));

    let stderr = output_stderr(run_cmd(dir.path(), &["tag", "add", "FREEZE"]));
    assert!(stderr.starts_with("Error: Invalid input"));

    output_stdout(run_cmd(
        dir.path(),
        &["move", "remove", &windmill.to_string()],
    ));
    let stdout = output_stdout(run_cmd(dir.path(), &["tag", "list"]));
    assert!(stdout.contains("Power (1 move)"));
}

#[test]
fn generate_and_save_combo() {
    let dir = TempDir::new().expect("temp dir");
    seed_catalog(dir.path());

    let stdout = output_stdout(run_cmd(
        dir.path(),
        &[
            "combo", "generate", "--tag", "Power", "--length", "2", "--seed", "7", "--save",
            "Power pair",
        ],
    ));
    let sequence = stdout.lines().next().expect("sequence");
    assert!(sequence.contains("Windmill"));
    assert!(sequence.contains("Flare"));
    assert!(sequence.contains(" -> "));
    let combo_id = parse_created_id(&stdout, "Saved combo ID: ");

    let stdout = output_stdout(run_cmd(
        dir.path(),
        &["combo", "show", &combo_id.to_string()],
    ));
    assert!(stdout.contains("Name: Power pair"));
    assert!(stdout.contains("Energy: medium"));
    assert!(stdout.contains("1. "));
    assert!(stdout.contains("2. "));
}

#[test]
fn generate_warns_when_pool_is_small() {
    let dir = TempDir::new().expect("temp dir");
    seed_catalog(dir.path());

    let output = run_cmd(
        dir.path(),
        &["combo", "generate", "--tag", "Freeze", "--length", "4", "--seed", "1"],
    );
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let stdout = output_stdout(output);
    assert_eq!(stdout.trim(), "Chair");
    assert!(stderr.contains("only 1 distinct moves available"));
}

#[test]
fn structured_generation_follows_sequence() {
    let dir = TempDir::new().expect("temp dir");
    seed_catalog(dir.path());

    let stdout = output_stdout(run_cmd(
        dir.path(),
        &[
            "combo",
            "generate-structured",
            "Freeze",
            "Toprock",
            "Freeze",
            "--seed",
            "3",
        ],
    ));
    assert_eq!(stdout.trim(), "Chair -> Chair");
}

#[test]
fn battle_pick_marks_combo_used() {
    let dir = TempDir::new().expect("temp dir");
    let stdout = output_stdout(run_cmd(
        dir.path(),
        &[
            "battle", "add", "Closer", "Flare", "Freeze", "--energy", "high", "--status",
            "ready",
        ],
    ));
    let battle_id = parse_created_id(&stdout, "Created battle combo ID: ");

    let stdout = output_stdout(run_cmd(dir.path(), &["battle", "pick", "--seed", "2"]));
    assert!(stdout.contains(&format!("Battle Combo ID: {battle_id}")));
    assert!(stdout.contains("Used: yes"));

    let stdout = output_stdout(run_cmd(dir.path(), &["battle", "pick"]));
    assert_eq!(stdout.trim(), "No ready battle combos left.");

    let stdout = output_stdout(run_cmd(dir.path(), &["battle", "reset"]));
    assert_eq!(stdout.trim(), "Reset 1 battle combos.");
}

#[test]
fn goal_progress_is_clamped() {
    let dir = TempDir::new().expect("temp dir");
    let stdout = output_stdout(run_cmd(
        dir.path(),
        &["goal", "add", "Airflare", "--stage", "Circles:10", "--stage", "Hold:5:seconds"],
    ));
    let goal_id = parse_created_id(&stdout, "Created goal ID: ");
    assert!(stdout.contains("(stages: 2)"));

    let stdout = output_stdout(run_cmd(dir.path(), &["goal", "show", &goal_id.to_string()]));
    let stage_line = stdout
        .lines()
        .find(|line| line.contains("Circles"))
        .expect("stage line");
    let stage_id = stage_line
        .trim_end_matches(')')
        .rsplit(' ')
        .next()
        .expect("stage id")
        .to_string();

    let stdout = output_stdout(run_cmd(dir.path(), &["stage", "progress", &stage_id, "25"]));
    assert!(stdout.contains("Circles 10/10 reps"));
    let stdout = output_stdout(run_cmd(dir.path(), &["stage", "progress", &stage_id, "-3"]));
    assert!(stdout.contains("Circles 7/10 reps"));

    let stderr = output_stderr(run_cmd(
        dir.path(),
        &["stage", "update", &stage_id, "--current", "11"],
    ));
    assert!(stderr.contains("between 0 and 10"));
}

#[test]
fn export_then_import_restores_data() {
    let dir = TempDir::new().expect("temp dir");
    seed_catalog(dir.path());
    let export_path = dir.path().join("backup.json");
    let export_str = export_path.to_string_lossy().to_string();

    let stdout = output_stdout(run_cmd(dir.path(), &["data", "export", &export_str]));
    assert!(stdout.starts_with("Exported "));
    let text = fs::read_to_string(&export_path).expect("read export");
    let json: Value = serde_json::from_str(&text).expect("export json");
    assert_eq!(json["format_version"], 1);
    assert_eq!(json["moves"].as_array().expect("moves").len(), 3);
    assert_eq!(json["move_tags"].as_array().expect("links").len(), 3);

    let other = TempDir::new().expect("temp dir");
    add_move(other.path(), "Headspin", &[]);
    output_stdout(run_cmd(other.path(), &["data", "import", &export_str]));
    let stdout = output_stdout(run_cmd(other.path(), &["move", "list"]));
    assert!(stdout.contains("Windmill"));
    assert!(!stdout.contains("Headspin"));
}

#[test]
fn failed_export_and_import_are_logged() {
    let dir = TempDir::new().expect("temp dir");
    seed_catalog(dir.path());
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").expect("write blocker");
    let export_str = blocker.join("out.json").to_string_lossy().to_string();
    let stderr = output_stderr(run_cmd(dir.path(), &["data", "export", &export_str]));
    assert!(stderr.contains("ERROR"), "stderr: {stderr}");
    assert!(stderr.contains("failed to write export file"));
    assert!(stderr.contains("Error: io error"));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ not json").expect("write broken");
    let broken_str = broken.to_string_lossy().to_string();
    let stderr = output_stderr(run_cmd(dir.path(), &["data", "import", &broken_str]));
    assert!(stderr.contains("failed to read export file"));
    assert!(stderr.contains("Error: json error"));

    let export_path = dir.path().join("backup.json");
    let export_str = export_path.to_string_lossy().to_string();
    output_stdout(run_cmd(dir.path(), &["data", "export", &export_str]));
    let mut json: Value =
        serde_json::from_str(&fs::read_to_string(&export_path).expect("read")).expect("json");
    json["tags"]
        .as_array_mut()
        .expect("tags")
        .push(serde_json::json!({
            "id": 99,
            "name": "power",
            "created_at": "2024-01-01T00:00:00Z"
        }));
    fs::write(&export_path, json.to_string()).expect("rewrite export");
    let stderr = output_stderr(run_cmd(dir.path(), &["data", "import", &export_str]));
    assert!(stderr.contains("import rejected"));
    assert!(stderr.contains("duplicates tag"));

    let stdout = output_stdout(run_cmd(dir.path(), &["tag", "list"]));
    assert!(!stdout.contains("power"));
}

#[test]
fn tagged_move_add_creates_nothing_on_bad_name() {
    let dir = TempDir::new().expect("temp dir");
    output_stdout(run_cmd(dir.path(), &["tag", "add", "Power"]));
    let stderr = output_stderr(run_cmd(
        dir.path(),
        &["move", "add", "Windmill", " ", "--tag", "Power"],
    ));
    assert!(stderr.contains("move name"));
    let stdout = output_stdout(run_cmd(dir.path(), &["move", "list"]));
    assert!(!stdout.contains("Windmill"));
}

#[test]
fn unknown_ids_exit_with_error() {
    let dir = TempDir::new().expect("temp dir");
    let stderr = output_stderr(run_cmd(dir.path(), &["combo", "show", "42"]));
    assert_eq!(stderr.trim(), "Error: Not found: combo id 42");
}

#[tokio::test]
async fn schema_version_is_recorded() {
    let dir = TempDir::new().expect("temp dir");
    output_stdout(run_cmd(dir.path(), &["tag", "list"]));

    let db_path = dir.path().join("breakbook.db");
    assert!(db_path.exists());
    let url = Url::from_file_path(&db_path).expect("db url");
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    let db = Database::connect(&sqlite_url).await.expect("connect");
    let row = db
        .query_one(Statement::from_string(
            DatabaseBackend::Sqlite,
            "PRAGMA user_version;",
        ))
        .await
        .expect("query")
        .expect("row");
    let version: i32 = row.try_get_by_index(0).expect("version");
    assert_eq!(version, 2);
}
