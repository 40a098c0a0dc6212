//! Plain-text output for the terminal.

use quickroute_app_core::{Notice, NoticeLevel, SagaReport, UiState};
use quickroute_core::ProfileCollection;

pub fn print_notices(notices: &[Notice]) {
    for n in notices {
        match n.level {
            NoticeLevel::Success => println!(":: {}", n.message),
            NoticeLevel::Error => eprintln!("!! {}", n.message),
        }
    }
}

/// Selectable profiles in display order; `*` marks the current one.
pub fn profile_table(collection: &ProfileCollection) -> String {
    let mut out = String::new();
    if !collection.has_selectable() {
        out.push_str("No profiles found.\n");
        return out;
    }
    out.push_str(&format!("  {:<36} {:<8} {:<32}\n", "UID", "TYPE", "NAME"));
    out.push_str(&format!("  {:-<36} {:-<8} {:-<32}\n", "", "", ""));
    for p in collection.selectable() {
        let marker = if collection.is_current(&p.uid) { '*' } else { ' ' };
        out.push_str(&format!(
            "{marker} {:<36} {:<8} {:<32}\n",
            p.uid,
            p.kind.as_str(),
            p.display_name()
        ));
    }
    out
}

pub fn status_report(state: &UiState, collection: &ProfileCollection) -> String {
    let current = match collection.active() {
        Some(p) => p.display_name().to_string(),
        None => "(none)".into(),
    };
    let mode = state
        .engine
        .as_ref()
        .map(|e| e.mode_lowercase())
        .unwrap_or_else(|| "(unreachable)".into());
    let on_off = |b: bool| if b { "on" } else { "off" };

    let mut out = String::from(":: Status\n");
    out.push_str(&format!("   Profile:       {current}\n"));
    out.push_str(&format!("   Mode:          {mode}\n"));
    out.push_str(&format!("   Service:       {}\n", state.service_status));
    out.push_str(&format!("   Service mode:  {}\n", on_off(state.flags.enable_service_mode)));
    out.push_str(&format!("   TUN mode:      {}\n", on_off(state.flags.enable_tun_mode)));
    out.push_str(&format!("   System proxy:  {}\n", on_off(state.flags.enable_system_proxy)));
    out.push_str(&format!("   Quick connect: {}\n", on_off(state.quick_connected)));
    out
}

pub fn saga_summary(report: &SagaReport) -> String {
    let verb = if report.enabled { "enable" } else { "disable" };
    let mut out = format!(":: Quick connect ({verb})\n");
    for s in &report.steps {
        match &s.error {
            None => out.push_str(&format!("   {:<14} ok\n", s.step.to_string())),
            Some(e) => out.push_str(&format!("   {:<14} failed: {e}\n", s.step.to_string())),
        }
    }
    out
}
