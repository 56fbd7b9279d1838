// src/event.rs
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::actions::{lookup, Action, LinuxChange, Platform};
use crate::alert::{LinuxAlert, RawAlert, WindowsAlert};
use crate::path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectCategory {
    File,
    Directory,
}

/// A platform-independent filesystem change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEvent {
    pub action: Action,
    pub change_type: &'static str,
    pub object_category: ObjectCategory,
    pub object_path: String,
    pub file_name: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Value>,
    #[serde(flatten)]
    pub stats: Option<StatFields>,
}

/// Fields that only exist when the collector could stat the object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatFields {
    pub object_id: Value,
    pub file_acl: Value,
    pub file_create_time: Value,
    pub file_modify_time: Value,
    /// Kilobytes.
    pub file_size: f64,
    pub user: Value,
    pub group: Value,
    /// Files only.
    #[serde(flatten)]
    pub hash: Option<FileHash>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileHash {
    pub file_hash: String,
    pub file_hash_type: String,
}

/// Normalize one alert. `None` means the alert is suppressed.
pub fn normalize(alert: &RawAlert) -> Option<CanonicalEvent> {
    match alert {
        RawAlert::Linux(a) => normalize_linux(a),
        RawAlert::Windows(a) => Some(normalize_windows(a)),
    }
}

fn normalize_linux(alert: &LinuxAlert) -> Option<CanonicalEvent> {
    let segments: Vec<&str> = alert.change.split('|').collect();
    let code = segments[0];
    if LinuxChange::parse(code) == Some(LinuxChange::Ignored) {
        debug!(path = %alert.path, "skipping IN_IGNORED alert");
        return None;
    }

    let object_category = if segments.len() == 2 {
        ObjectCategory::Directory
    } else {
        ObjectCategory::File
    };

    let stats = alert.stats.as_ref().map(|s| StatFields {
        object_id: s.inode.clone(),
        file_acl: s.mode.clone(),
        file_create_time: s.ctime.clone(),
        file_modify_time: s.mtime.clone(),
        file_size: s.size / 1024.0,
        user: s.user.clone(),
        group: s.group.clone(),
        hash: match (object_category, &alert.checksum, &alert.checksum_type) {
            (ObjectCategory::File, Some(hash), Some(kind)) => Some(FileHash {
                file_hash: hash.clone(),
                file_hash_type: kind.clone(),
            }),
            _ => None,
        },
    });

    Some(CanonicalEvent {
        action: lookup(Platform::Linux, code),
        change_type: crate::CHANGE_TYPE,
        object_category,
        object_path: alert.path.clone(),
        file_name: alert.name.clone(),
        file_path: alert.tag.clone(),
        contents: alert.contents.clone(),
        stats,
    })
}

fn normalize_windows(alert: &WindowsAlert) -> CanonicalEvent {
    let object_category = if alert.hash == crate::WIN_DIRECTORY_HASH {
        ObjectCategory::Directory
    } else {
        ObjectCategory::File
    };
    let (file_path, file_name) = path::split(&alert.object_name);

    CanonicalEvent {
        action: lookup(Platform::Windows, &alert.accesses),
        change_type: crate::CHANGE_TYPE,
        object_category,
        object_path: alert.object_name.clone(),
        file_name,
        file_path,
        contents: None,
        stats: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STAT_KEYS: [&str; 7] = [
        "object_id",
        "file_acl",
        "file_create_time",
        "file_modify_time",
        "file_size",
        "user",
        "group",
    ];

    fn norm(raw: Value) -> Option<CanonicalEvent> {
        normalize(&RawAlert::from_value(&raw).unwrap())
    }

    fn linux_with_stats(change: &str, size: u64) -> Value {
        json!({
            "change": change,
            "path": "/etc/foo",
            "name": "foo",
            "tag": "/etc",
            "stats": {"inode": 1, "mode": "644", "ctime": 0, "mtime": 0, "size": size, "user": "root", "group": "root"},
            "checksum": "abc",
            "checksum_type": "sha256"
        })
    }

    #[test]
    fn linux_file_create_with_stats() {
        let event = norm(linux_with_stats("IN_CREATE", 2048)).unwrap();
        assert_eq!(event.action, Action::Created);
        assert_eq!(event.object_category, ObjectCategory::File);
        let stats = event.stats.as_ref().unwrap();
        assert_eq!(stats.file_size, 2.0);
        assert_eq!(stats.hash.as_ref().unwrap().file_hash, "abc");

        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(
            wire,
            json!({
                "action": "created",
                "change_type": "filesystem",
                "object_category": "file",
                "object_path": "/etc/foo",
                "file_name": "foo",
                "file_path": "/etc",
                "object_id": 1,
                "file_acl": "644",
                "file_create_time": 0,
                "file_modify_time": 0,
                "file_size": 2.0,
                "user": "root",
                "group": "root",
                "file_hash": "abc",
                "file_hash_type": "sha256"
            })
        );
    }

    #[test]
    fn linux_size_is_not_rounded() {
        let event = norm(linux_with_stats("IN_MODIFY", 1000)).unwrap();
        assert_eq!(event.stats.unwrap().file_size, 1000.0 / 1024.0);
    }

    #[test]
    fn linux_directory_delete_has_no_stats() {
        let event = norm(json!({
            "change": "IN_DELETE|IN_ISDIR", "path": "/etc/foo", "name": "foo", "tag": "/etc", "stats": null
        }))
        .unwrap();
        assert_eq!(event.action, Action::Deleted);
        assert_eq!(event.object_category, ObjectCategory::Directory);
        let wire = serde_json::to_value(&event).unwrap();
        for key in STAT_KEYS.iter().chain(&["file_hash", "file_hash_type", "contents"]) {
            assert!(wire.get(key).is_none(), "{key} should be absent");
        }
    }

    #[test]
    fn linux_directory_with_stats_has_no_hash() {
        let event = norm(linux_with_stats("IN_ATTRIB|IN_ISDIR", 4096)).unwrap();
        assert_eq!(event.action, Action::AclModified);
        let wire = serde_json::to_value(&event).unwrap();
        for key in STAT_KEYS {
            assert!(wire.get(key).is_some(), "{key} should be present");
        }
        assert!(wire.get("file_hash").is_none());
        assert!(wire.get("file_hash_type").is_none());
    }

    #[test]
    fn linux_ignored_is_suppressed() {
        assert!(norm(linux_with_stats("IN_IGNORED", 0)).is_none());
        assert!(norm(linux_with_stats("IN_IGNORED|IN_ISDIR", 0)).is_none());
    }

    #[test]
    fn linux_category_follows_separator_count() {
        let file = norm(linux_with_stats("IN_OPEN", 1)).unwrap();
        let dir = norm(linux_with_stats("IN_OPEN|IN_ISDIR", 1)).unwrap();
        let odd = norm(linux_with_stats("IN_OPEN|IN_ISDIR|X", 1)).unwrap();
        assert_eq!(file.object_category, ObjectCategory::File);
        assert_eq!(dir.object_category, ObjectCategory::Directory);
        assert_eq!(odd.object_category, ObjectCategory::File);
    }

    #[test]
    fn linux_contents_copied_when_present() {
        let mut raw = linux_with_stats("IN_CLOSE_WRITE", 10);
        raw["contents"] = json!("nameserver 10.0.0.2\n");
        let wire = serde_json::to_value(norm(raw).unwrap()).unwrap();
        assert_eq!(wire["contents"], json!("nameserver 10.0.0.2\n"));
        assert_eq!(wire["action"], json!("read"));
    }

    #[test]
    fn linux_null_contents_are_kept() {
        let mut raw = linux_with_stats("IN_MODIFY", 10);
        raw["contents"] = Value::Null;
        let wire = serde_json::to_value(norm(raw).unwrap()).unwrap();
        assert_eq!(wire.get("contents"), Some(&Value::Null));
    }

    #[test]
    fn linux_numeric_owner_ids_pass_through() {
        let mut raw = linux_with_stats("IN_CREATE", 10);
        raw["stats"]["user"] = json!(1001);
        raw["stats"]["group"] = json!(1001);
        let wire = serde_json::to_value(norm(raw).unwrap()).unwrap();
        assert_eq!(wire["user"], json!(1001));
        assert_eq!(wire["group"], json!(1001));
    }

    #[test]
    fn windows_directory_delete() {
        let event = norm(json!({
            "Accesses": "Delete", "Hash": "Item is a directory", "Object Name": "C:\\Users\\x"
        }))
        .unwrap();
        assert_eq!(event.action, Action::Deleted);
        assert_eq!(event.object_category, ObjectCategory::Directory);
        assert_eq!(event.object_path, "C:\\Users\\x");
        assert_eq!(event.file_name, "x");
        assert_eq!(event.file_path, "C:\\Users");
        assert!(event.stats.is_none());
    }

    #[test]
    fn windows_file_never_has_stats() {
        let event = norm(json!({
            "Accesses": "Write Data", "Hash": "9f86d081884c7d65", "Object Name": "C:/inetpub/wwwroot/web.config"
        }))
        .unwrap();
        assert_eq!(event.action, Action::Modified);
        assert_eq!(event.object_category, ObjectCategory::File);
        assert_eq!(event.file_name, "web.config");
        assert_eq!(event.file_path, "C:/inetpub/wwwroot");
        let wire = serde_json::to_value(&event).unwrap();
        for key in STAT_KEYS {
            assert!(wire.get(key).is_none());
        }
    }

    #[test]
    fn unmapped_codes_become_unknown() {
        let linux = norm(linux_with_stats("IN_UNMOUNT", 1)).unwrap();
        let windows = norm(json!({"Accesses": "Take Ownership", "Hash": "h", "Object Name": "C:\\a"})).unwrap();
        assert_eq!(linux.action, Action::Unknown);
        assert_eq!(windows.action, Action::Unknown);
    }
}
