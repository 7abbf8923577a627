//! Board store persistence across agent restarts.

use genius_dashboard_agent::catalog::widget_def;
use genius_dashboard_agent::{BoardPatch, Dashboard, DashboardConfig, SqliteStore, WidgetPatch};
use std::collections::BTreeMap;
use std::path::Path;

fn sqlite_config(path: &Path) -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.persistence.store_type = "sqlite".to_string();
    config.persistence.db_path = path.to_path_buf();
    config
}

#[test]
fn boards_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("boards.db");

    {
        let store = SqliteStore::open(&db_path).unwrap();
        let mut boards = store.load().unwrap().unwrap_or_default();
        boards.set_board("Teleop", BoardPatch::default());
        boards.set_current_board("Teleop");

        let chooser = widget_def("chooser").unwrap().new_widget(
            "auto",
            BTreeMap::from([("data".to_string(), "/SmartDashboard/Auto".to_string())]),
        );
        boards.add_widget("Teleop", chooser).unwrap();
        boards
            .set_widget(
                "Teleop",
                "auto",
                WidgetPatch {
                    size: Some((4, 2)),
                    ..WidgetPatch::default()
                },
            )
            .unwrap();
        store.save(&boards).unwrap();
    }

    let dashboard = Dashboard::new(sqlite_config(&db_path)).unwrap();
    let board = dashboard.boards().current().unwrap();
    let widget = board.widget("auto").unwrap();

    assert_eq!(board.name, "Teleop");
    assert_eq!(widget.display, "chooser");
    assert_eq!((widget.width, widget.height), (4, 2));
    assert_eq!(widget.sources["data"], "/SmartDashboard/Auto");
}

#[test]
fn board_override_does_not_touch_stored_boards() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("boards.db");

    {
        let store = SqliteStore::open(&db_path).unwrap();
        let mut boards = store.load().unwrap().unwrap_or_default();
        boards.set_board("Teleop", BoardPatch::default());
        boards.set_current_board("Teleop");
        store.save(&boards).unwrap();
    }

    let mut config = sqlite_config(&db_path);
    config.current_board = Some("Pit".to_string());
    let dashboard = Dashboard::new(config).unwrap();

    assert_eq!(dashboard.boards().current_board, "Pit");
    assert!(dashboard.boards().current().is_none());
    assert!(dashboard.boards().boards.contains_key("Teleop"));

    let stored = SqliteStore::open(&db_path).unwrap().load().unwrap().unwrap();
    assert_eq!(stored.current_board, "Teleop");
}
