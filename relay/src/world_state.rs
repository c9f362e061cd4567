//! World-state JSON document: default shape, corruption-tolerant load, atomic
//! commit, and allowlisted path mutation.
//!
//! `/project`, `/identity/user_location`, `/identity/user_name` and
//! `/identity/agent_name` are scalar fields (`set` only); `/rules` and
//! `/goals` are lists (`set`, `add`, `remove`). An `add`/`remove` against a
//! scalar allowlisted path is `WORLD_OP_INVALID` even though the path itself
//! is allowed.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::error::EngineError;

/// One mutation against the world-state document.
#[derive(Clone, Debug)]
pub struct WorldOp {
    pub path: String,
    pub kind: WorldOpKind,
    pub value: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldOpKind {
    Set,
    Add,
    Remove,
}

const SCALAR_PATHS: &[&str] = &[
    "/project",
    "/identity/user_location",
    "/identity/user_name",
    "/identity/agent_name",
];
const LIST_PATHS: &[&str] = &["/rules", "/goals"];

fn is_scalar_path(path: &str) -> bool {
    SCALAR_PATHS.contains(&path)
}

fn is_list_path(path: &str) -> bool {
    LIST_PATHS.contains(&path)
}

fn is_allowed_path(path: &str) -> bool {
    is_scalar_path(path) || is_list_path(path)
}

/// Default shape for a freshly-initialized world document.
pub fn default_world() -> Value {
    json!({
        "updated_at": "",
        "tz": "",
        "project": "",
        "topics": [],
        "goals": [],
        "rules": [],
        "identity": {
            "user_name": "",
            "session_user_name": "",
            "agent_name": "",
            "user_location": "",
        },
    })
}

/// On-disk, JSON-document world state with atomic commits.
pub struct WorldStateStore {
    path: PathBuf,
}

impl WorldStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the document, creating it with defaults if missing and
    /// overwriting it with defaults if it fails to parse. On success, stamps
    /// `updated_at` (when `now_iso` is given) and fills in `tz` if absent.
    pub fn load(&self, now_iso: Option<&str>, tz: &str) -> Value {
        let mut doc = match std::fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str::<Value>(&text).unwrap_or_else(|_| default_world()),
            Err(_) => default_world(),
        };
        if let Some(now_iso) = now_iso {
            doc["updated_at"] = json!(now_iso);
        }
        if doc.get("tz").and_then(|v| v.as_str()).unwrap_or("").is_empty() {
            doc["tz"] = json!(tz);
        }
        doc
    }

    /// Atomically replaces the file's contents with `doc`, via a same-directory
    /// temp file and rename so readers never observe a partial write.
    pub fn commit(&self, doc: &Value) -> Result<(), EngineError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        let pretty = serde_json::to_string_pretty(doc)?;
        std::io::Write::write_all(&mut tmp, pretty.as_bytes())?;
        std::io::Write::write_all(&mut tmp, b"\n")?;
        tmp.persist(&self.path)
            .map_err(|e| EngineError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Applies one allowlisted operation to an in-memory copy of `doc`, returning
/// the updated document. Disk commit happens separately, at turn boundaries.
pub fn apply_op(doc: &Value, op: &WorldOp) -> Result<Value, EngineError> {
    if !is_allowed_path(&op.path) {
        return Err(EngineError::WorldOpInvalid(format!(
            "path not allowed: {}",
            op.path
        )));
    }
    if is_scalar_path(&op.path) && op.kind != WorldOpKind::Set {
        return Err(EngineError::WorldOpInvalid(format!(
            "{:?} not supported on scalar path {}",
            op.kind, op.path
        )));
    }

    let mut doc = doc.clone();
    let pointer = op.path.as_str();
    match op.kind {
        WorldOpKind::Set => {
            set_pointer(&mut doc, pointer, op.value.clone())?;
        }
        WorldOpKind::Add => {
            let list = get_list_mut(&mut doc, pointer)?;
            if !list.contains(&op.value) {
                list.push(op.value.clone());
            }
        }
        WorldOpKind::Remove => {
            let list = get_list_mut(&mut doc, pointer)?;
            if let Some(pos) = list.iter().position(|existing| existing == &op.value) {
                list.remove(pos);
            }
        }
    }
    Ok(doc)
}

fn set_pointer(doc: &mut Value, pointer: &str, value: Value) -> Result<(), EngineError> {
    let target = doc.pointer_mut(pointer).ok_or_else(|| {
        EngineError::WorldOpInvalid(format!("path does not exist in document: {pointer}"))
    })?;
    *target = value;
    Ok(())
}

fn get_list_mut<'a>(doc: &'a mut Value, pointer: &str) -> Result<&'a mut Vec<Value>, EngineError> {
    doc.pointer_mut(pointer)
        .and_then(|v| v.as_array_mut())
        .ok_or_else(|| EngineError::WorldOpInvalid(format!("not a list path: {pointer}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_on_scalar_path_replaces_value() {
        let doc = default_world();
        let op = WorldOp {
            path: "/project".to_string(),
            kind: WorldOpKind::Set,
            value: json!("loom rebuild"),
        };
        let out = apply_op(&doc, &op).unwrap();
        assert_eq!(out["project"], "loom rebuild");
    }

    #[test]
    fn add_on_scalar_path_is_invalid() {
        let doc = default_world();
        let op = WorldOp {
            path: "/project".to_string(),
            kind: WorldOpKind::Add,
            value: json!("x"),
        };
        let err = apply_op(&doc, &op).unwrap_err();
        assert!(matches!(err, EngineError::WorldOpInvalid(_)));
    }

    #[test]
    fn add_on_identity_scalar_subpath_is_invalid() {
        let doc = default_world();
        let op = WorldOp {
            path: "/identity/user_name".to_string(),
            kind: WorldOpKind::Add,
            value: json!("x"),
        };
        assert!(matches!(
            apply_op(&doc, &op).unwrap_err(),
            EngineError::WorldOpInvalid(_)
        ));
    }

    #[test]
    fn add_is_idempotent_and_remove_undoes_it() {
        let doc = default_world();
        let added = apply_op(
            &doc,
            &WorldOp {
                path: "/rules".to_string(),
                kind: WorldOpKind::Add,
                value: json!("be concise"),
            },
        )
        .unwrap();
        let added_twice = apply_op(
            &added,
            &WorldOp {
                path: "/rules".to_string(),
                kind: WorldOpKind::Add,
                value: json!("be concise"),
            },
        )
        .unwrap();
        assert_eq!(added_twice["rules"], json!(["be concise"]));

        let removed = apply_op(
            &added_twice,
            &WorldOp {
                path: "/rules".to_string(),
                kind: WorldOpKind::Remove,
                value: json!("be concise"),
            },
        )
        .unwrap();
        assert_eq!(removed["rules"], json!([]));
    }

    #[test]
    fn unlisted_path_is_invalid() {
        let doc = default_world();
        let op = WorldOp {
            path: "/not/allowed".to_string(),
            kind: WorldOpKind::Set,
            value: json!(1),
        };
        assert!(matches!(
            apply_op(&doc, &op).unwrap_err(),
            EngineError::WorldOpInvalid(_)
        ));
    }

    #[test]
    fn load_falls_back_to_default_on_corrupted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = WorldStateStore::new(&path);
        let doc = store.load(None, "UTC");
        assert_eq!(doc["project"], "");
        assert_eq!(doc["tz"], "UTC");
    }

    #[test]
    fn load_stamps_updated_at_and_fills_missing_tz() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        let store = WorldStateStore::new(&path);
        let doc = store.load(Some("2026-07-28T00:00:00Z"), "Africa/Windhoek");
        assert_eq!(doc["updated_at"], "2026-07-28T00:00:00Z");
        assert_eq!(doc["tz"], "Africa/Windhoek");
    }

    #[test]
    fn commit_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("world.json");
        let store = WorldStateStore::new(&path);
        let mut doc = default_world();
        doc["project"] = json!("committed");
        store.commit(&doc).unwrap();
        assert_eq!(store.load(None, "UTC")["project"], "committed");
    }
}
