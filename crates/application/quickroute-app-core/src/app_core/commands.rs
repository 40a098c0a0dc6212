use quickroute_core::ProfileUid;

#[derive(Debug, Clone)]
pub enum AppCommand {
    // Boot
    Load,

    // Profiles
    Activate { uid: ProfileUid, force: bool },
    Reactivate,
    Delete(ProfileUid),
    Reorder { source: ProfileUid, target: ProfileUid },
    Import(String),
    ProfileEdited { uid: ProfileUid, changed: bool },

    // Engine
    SetMode(String),

    // Service
    InstallOrEnableService,
    UninstallService,
    RefreshServiceStatus,

    // Quick connect
    EnableQuickConnect,
    DisableQuickConnect,
    RefreshFlags,
}
