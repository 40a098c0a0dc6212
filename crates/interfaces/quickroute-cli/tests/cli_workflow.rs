use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use camino::Utf8PathBuf;
use serde_json::{json, Value};
use tempfile::TempDir;

use quickroute_cli::{build_kernel, commands, CliServiceAction, Settings};
use quickroute_core::RoutingMode;
use quickroute_infra::{HelperCommands, StateFile};

#[derive(Clone)]
struct Engine {
    mode: Arc<Mutex<String>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Engine {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

async fn start_mock_engine() -> (SocketAddr, Engine) {
    let engine = Engine {
        mode: Arc::new(Mutex::new("rule".into())),
        calls: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route(
            "/configs",
            get(|State(e): State<Engine>| async move {
                let mode = e.mode.lock().unwrap().clone();
                Json(json!({ "mode": mode }))
            })
            .patch(|State(e): State<Engine>, Json(body): Json<Value>| async move {
                e.calls.lock().unwrap().push(format!("PATCH {body}"));
                if let Some(m) = body.get("mode").and_then(Value::as_str) {
                    *e.mode.lock().unwrap() = m.to_string();
                }
                StatusCode::NO_CONTENT
            })
            .put(|State(e): State<Engine>, Json(body): Json<Value>| async move {
                e.calls.lock().unwrap().push(format!("PUT {body}"));
                StatusCode::NO_CONTENT
            }),
        )
        .route(
            "/connections",
            delete(|State(e): State<Engine>| async move {
                e.calls.lock().unwrap().push("DELETE /connections".into());
                StatusCode::NO_CONTENT
            }),
        )
        .route("/sub.yaml", get(|| async { "proxies: []\n" }))
        .with_state(engine.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, engine)
}

fn settings(addr: SocketAddr, helper: HelperCommands, credential: Option<&str>) -> (TempDir, Settings) {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let settings = Settings {
        controller: format!("http://{addr}"),
        secret: None,
        state_dir,
        helper,
        credential: credential.map(str::to_string),
        interactive: false,
    };
    (dir, settings)
}

#[tokio::test]
async fn import_select_and_switch_mode() {
    let (addr, engine) = start_mock_engine().await;
    let (_dir, settings) = settings(addr, HelperCommands::default(), None);
    let kernel = build_kernel(&settings).unwrap();

    commands::cmd_profile_import(&kernel, format!("http://{addr}/sub.yaml"))
        .await
        .unwrap();
    let uid = kernel.profiles.list().first_remote().unwrap().uid.clone();

    commands::cmd_profile_select(&kernel, uid.clone(), false)
        .await
        .unwrap();
    let state = StateFile::in_dir(&settings.state_dir).load().await.unwrap();
    assert_eq!(state.profiles.current_uid(), uid);
    assert_eq!(state.logs[&uid][0].0, "info");

    let calls = engine.calls();
    assert_eq!(calls.iter().filter(|c| c.starts_with("PUT")).count(), 2);
    assert!(calls.iter().any(|c| c == "DELETE /connections"));

    commands::cmd_mode(&kernel, Some("global".into())).await.unwrap();
    assert_eq!(kernel.mode.current().as_deref(), Some("global"));
    let state = StateFile::in_dir(&settings.state_dir).load().await.unwrap();
    assert_eq!(state.engine.mode, Some(RoutingMode::Global));

    assert!(commands::cmd_mode(&kernel, Some("script".into())).await.is_err());
    assert_eq!(kernel.mode.current().as_deref(), Some("global"));
}

#[tokio::test]
async fn quick_connect_without_profiles_is_refused() {
    let (addr, _engine) = start_mock_engine().await;
    let (_dir, settings) = settings(addr, HelperCommands::default(), None);
    let kernel = build_kernel(&settings).unwrap();

    assert!(commands::cmd_quick(&kernel, true).await.is_err());
    let state = StateFile::in_dir(&settings.state_dir).load().await.unwrap();
    assert!(!state.flags.enable_tun_mode);
    assert!(!state.flags.enable_system_proxy);
}

#[cfg(unix)]
#[tokio::test]
async fn quick_connect_installs_helper_then_sets_switches() {
    let (addr, _engine) = start_mock_engine().await;
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("svc");
    let marker = marker.to_str().unwrap();
    let status_log = dir.path().join("status.log");
    let status_log = status_log.to_str().unwrap();
    let status_calls = || {
        std::fs::read_to_string(status_log)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    };
    let helper = HelperCommands {
        status: Some(format!(
            "sh -c \"echo x >> '{status_log}'; cat '{marker}' 2>/dev/null || echo uninstalled\""
        )),
        install: Some(format!(
            "sh -c \"read pw; test \\\"$pw\\\" = pw && echo installed > '{marker}'\""
        )),
        uninstall: Some(format!("sh -c \"rm -f '{marker}'\"")),
    };
    let (_state, settings) = settings(addr, helper, Some("pw"));
    let kernel = build_kernel(&settings).unwrap();

    commands::cmd_profile_import(&kernel, format!("http://{addr}/sub.yaml"))
        .await
        .unwrap();
    commands::cmd_quick(&kernel, true).await.unwrap();

    assert!(kernel.quick.is_connected());
    assert_eq!(std::fs::read_to_string(marker).unwrap().trim(), "installed");
    let flags = StateFile::in_dir(&settings.state_dir).load().await.unwrap().flags;
    assert!(flags.enable_service_mode && flags.enable_tun_mode && flags.enable_system_proxy);

    commands::cmd_quick(&kernel, false).await.unwrap();
    assert!(!kernel.quick.is_connected());

    let before = status_calls();
    commands::cmd_service(&kernel, CliServiceAction::Uninstall)
        .await
        .unwrap();
    assert!(!std::path::Path::new(marker).exists());
    // Startup fetch, the fetch right after uninstalling, then the delayed one.
    assert_eq!(status_calls() - before, 3);
}
