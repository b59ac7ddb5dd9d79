//! Configuration Vault – reads/writes `~/.sticky/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use sticky_types::{AnchorConfig, TerminalPolicy};

/// Nominal frame period used by `sticky replay` when a scenario does not set
/// its own.
pub const DEFAULT_TICK_MS: f64 = 16.666;

/// One anchor of the replay stage: a name and the marker index it follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorEntry {
    pub name: String,
    pub target: u32,
}

/// Persisted configuration stored in `~/.sticky/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Frame period for scenario replay, in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: f64,

    /// Anchors on the replay stage.
    #[serde(default = "default_anchors")]
    pub anchors: Vec<AnchorEntry>,

    /// Stabilization and presence settings shared by every anchor.
    #[serde(default)]
    pub anchor: AnchorConfig,
}

fn default_tick_ms() -> f64 {
    DEFAULT_TICK_MS
}

fn default_anchors() -> Vec<AnchorEntry> {
    vec![AnchorEntry {
        name: "poster".to_string(),
        target: 0,
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            anchors: default_anchors(),
            anchor: AnchorConfig::default(),
        }
    }
}

/// Return the path to `~/.sticky/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".sticky").join("config.toml")
}

/// The configuration a command should run with: the file at `path` (or the
/// default location) if it exists, defaults otherwise, then `STICKY_*`
/// environment overrides.
pub fn effective(path: Option<&Path>) -> Result<Config, String> {
    let default_path = config_path();
    let path = path.unwrap_or(&default_path);
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path. Returns `None` if the file does not
/// exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `STICKY_*` environment variable overrides to `cfg`.
///
/// Unparseable values are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `STICKY_HOLD_MS` | `anchor.hold_ms` |
/// | `STICKY_TERMINAL_POLICY` | `anchor.terminal_policy` (`hide` / `freeze`) |
/// | `STICKY_FACE_VIEWER` | `anchor.face_viewer` (`true` / `false` / `1` / `0`) |
/// | `STICKY_ANCHORS` | `anchors`, as `name:target[,name:target…]` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("STICKY_HOLD_MS")
        && let Ok(ms) = v.trim().parse::<f64>()
    {
        cfg.anchor.hold_ms = ms;
    }
    if let Ok(v) = std::env::var("STICKY_TERMINAL_POLICY")
        && let Some(policy) = parse_policy(&v)
    {
        cfg.anchor.terminal_policy = policy;
    }
    if let Ok(v) = std::env::var("STICKY_FACE_VIEWER")
        && let Some(flag) = parse_flag(&v)
    {
        cfg.anchor.face_viewer = flag;
    }
    if let Ok(v) = std::env::var("STICKY_ANCHORS")
        && let Some(anchors) = parse_anchor_list(&v)
    {
        cfg.anchors = anchors;
    }
}

fn parse_policy(v: &str) -> Option<TerminalPolicy> {
    match v.trim().to_ascii_lowercase().as_str() {
        "hide" => Some(TerminalPolicy::Hide),
        "freeze" => Some(TerminalPolicy::Freeze),
        _ => None,
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `name:target,name:target`. Returns `None` if any entry is malformed
/// or the list is empty.
pub(crate) fn parse_anchor_list(v: &str) -> Option<Vec<AnchorEntry>> {
    let anchors = v
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (name, target) = entry.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(AnchorEntry {
                name: name.to_string(),
                target: target.trim().parse().ok()?,
            })
        })
        .collect::<Option<Vec<_>>>()?;
    (!anchors.is_empty()).then_some(anchors)
}

/// Save the config to a specific path, creating its directory if needed.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Owner-only directory (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Owner-only file (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sticky_types::ReparentFrame;

    #[test]
    fn config_path_points_to_sticky_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".sticky"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.tick_ms, DEFAULT_TICK_MS);
        assert_eq!(loaded.anchors, default_anchors());
        assert_eq!(loaded.anchor, AnchorConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [anchor]
            hold_ms = 3000
            terminal_policy = "freeze"
            freeze_frame = "world-fixed"
            "#,
        )
        .expect("write");

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.anchor.hold_ms, 3000.0);
        assert_eq!(cfg.anchor.terminal_policy, TerminalPolicy::Freeze);
        assert_eq!(cfg.anchor.freeze_frame, ReparentFrame::WorldFixed);
        assert_eq!(cfg.anchor.rot_gain, 0.20);
        assert_eq!(cfg.anchors.len(), 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "tick_ms = \"fast\"").expect("write");
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let parent = path.parent().expect("parent dir");
        let dir_mode = fs::metadata(parent).expect("dir metadata").permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn anchor_list_parsing() {
        assert_eq!(
            parse_anchor_list("poster:0, menu:3"),
            Some(vec![
                AnchorEntry { name: "poster".into(), target: 0 },
                AnchorEntry { name: "menu".into(), target: 3 },
            ])
        );
        assert_eq!(parse_anchor_list(""), None);
        assert_eq!(parse_anchor_list("poster"), None);
        assert_eq!(parse_anchor_list("poster:x"), None);
        assert_eq!(parse_anchor_list(":1"), None);
    }

    #[test]
    fn policy_and_flag_parsing() {
        assert_eq!(parse_policy("Freeze"), Some(TerminalPolicy::Freeze));
        assert_eq!(parse_policy("hide"), Some(TerminalPolicy::Hide));
        assert_eq!(parse_policy("explode"), None);
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    // All STICKY_* variables are exercised in one test so that no two tests
    // race on the process environment.
    #[test]
    fn apply_env_overrides_reads_all_variables() {
        // SAFETY: the only test in this crate touching these variables.
        unsafe {
            std::env::set_var("STICKY_HOLD_MS", "2500");
            std::env::set_var("STICKY_TERMINAL_POLICY", "freeze");
            std::env::set_var("STICKY_FACE_VIEWER", "true");
            std::env::set_var("STICKY_ANCHORS", "a:1,b:2");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.anchor.hold_ms, 2500.0);
        assert_eq!(cfg.anchor.terminal_policy, TerminalPolicy::Freeze);
        assert!(cfg.anchor.face_viewer);
        assert_eq!(cfg.anchors.len(), 2);

        unsafe { std::env::set_var("STICKY_HOLD_MS", "soon") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.anchor.hold_ms, 10_000.0, "invalid value is ignored");

        unsafe {
            std::env::remove_var("STICKY_HOLD_MS");
            std::env::remove_var("STICKY_TERMINAL_POLICY");
            std::env::remove_var("STICKY_FACE_VIEWER");
            std::env::remove_var("STICKY_ANCHORS");
        }
    }
}
