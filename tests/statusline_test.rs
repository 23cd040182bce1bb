//! End-to-end rendering from a stdin payload

mod common;

use ccline::cli::LineSelection;
use ccline::statusline;
use ccline_terminal::{DisplayMode, strip_ansi};
use common::{active_session_dir, at, test_config};
use serde_json::json;
use tempfile::TempDir;

fn payload(claude_dir: &std::path::Path, cwd: &std::path::Path) -> String {
    json!({
        "session_id": "session-a",
        "transcript_path": claude_dir.join("projects/-home-me-proj/session-a.jsonl"),
        "cwd": cwd,
        "model": {"id": "claude-sonnet-4-5-20250929", "display_name": "Sonnet 4.5"},
        "workspace": {"current_dir": cwd},
        "cost": {"total_cost_usd": 0.42, "total_lines_added": 0, "total_lines_removed": 0},
        "context_window": {"context_window_size": 200000}
    })
    .to_string()
}

#[tokio::test]
async fn test_full_statusline() {
    let dir = active_session_dir();
    let workspace = TempDir::new().unwrap();
    let config = test_config(dir.path(), DisplayMode::Full, 121);

    let lines = statusline::generate(&config, &payload(dir.path(), workspace.path()), at(11, 0))
        .await
        .unwrap();
    assert_eq!(lines.len(), 4);

    let workspace_name = workspace.path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(lines[0].starts_with("[Sonnet 4.5] | "), "{}", lines[0]);
    assert!(lines[0].contains(&format!("📁 {workspace_name}")));
    assert!(lines[0].contains("💬 4"));
    assert!(lines[0].ends_with("💰 $0.420"));

    assert!(lines[1].starts_with("Compact: "));
    assert!(lines[1].ends_with("[22%] 43.5K/200.0K ♻️ 91% cached"), "{}", lines[1]);

    assert!(lines[2].starts_with("Session: "));
    assert!(lines[2].ends_with("[40%] 2h/5h 11:00 (09:00 to 14:00)"), "{}", lines[2]);

    assert!(lines[3].starts_with("Burn:    "));
    assert!(lines[3].ends_with("45.0K token(w/cache), Rate: 375 t/m"), "{}", lines[3]);

    // No escape codes with color disabled
    for line in &lines {
        assert_eq!(&strip_ansi(line), line);
    }
}

#[tokio::test]
async fn test_compact_statusline() {
    let dir = active_session_dir();
    let workspace = TempDir::new().unwrap();
    let config = test_config(dir.path(), DisplayMode::Compact, 60);

    let lines = statusline::generate(&config, &payload(dir.path(), workspace.path()), at(11, 0))
        .await
        .unwrap();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("C: "));
    assert!(lines[1].ends_with("[22%] 43.5K/200K"), "{}", lines[1]);
    assert!(lines[2].ends_with("[40%] 2h/5h"), "{}", lines[2]);
    assert!(lines[3].ends_with(" 45.0K"), "{}", lines[3]);
}

#[tokio::test]
async fn test_line_selection_limits_output() {
    let dir = active_session_dir();
    let workspace = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), DisplayMode::Full, 121);
    config.lines = "2,4".parse::<LineSelection>().unwrap();

    let lines = statusline::generate(&config, &payload(dir.path(), workspace.path()), at(11, 0))
        .await
        .unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Compact:"));
    assert!(lines[1].starts_with("Burn:"));
}

#[tokio::test]
async fn test_minimal_payload() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), DisplayMode::Full, 121);

    let lines = statusline::generate(&config, "{}", at(11, 0)).await.unwrap();
    // Without a session there is no window, so no session or burn line
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[Unknown]"));
    assert!(lines[1].ends_with("[0%] 0/200.0K"), "{}", lines[1]);
}

#[tokio::test]
async fn test_reported_percentage_wins() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), DisplayMode::Full, 121);
    let payload = json!({
        "model": {"display_name": "Opus 4.6"},
        "context_window": {"context_window_size": 1000000, "used_percentage": 12.4}
    })
    .to_string();

    let lines = statusline::generate(&config, &payload, at(11, 0)).await.unwrap();
    assert!(lines[0].starts_with("[Opus 4.6]"));
    assert!(lines[1].ends_with("[12%] 0/1.0M"), "{}", lines[1]);
}

#[tokio::test]
async fn test_invalid_payload_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), DisplayMode::Full, 121);

    let err = statusline::generate(&config, "{\"session_id\": ", at(11, 0))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("not valid JSON"));
}
