// src/actions.rs
use serde::Serialize;

/// Canonical action vocabulary shared by every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    AclModified,
    Created,
    Deleted,
    Modified,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
}

/// Inotify change codes reported by the Linux watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinuxChange {
    Access,
    Attrib,
    CloseNowrite,
    CloseWrite,
    Create,
    Delete,
    DeleteSelf,
    Modify,
    MoveSelf,
    MovedFrom,
    MovedTo,
    Open,
    Move,
    Close,
    Ignored,
}

impl LinuxChange {
    pub fn parse(code: &str) -> Option<Self> {
        let change = match code {
            "IN_ACCESS" => LinuxChange::Access,
            "IN_ATTRIB" => LinuxChange::Attrib,
            "IN_CLOSE_NOWRITE" => LinuxChange::CloseNowrite,
            "IN_CLOSE_WRITE" => LinuxChange::CloseWrite,
            "IN_CREATE" => LinuxChange::Create,
            "IN_DELETE" => LinuxChange::Delete,
            "IN_DELETE_SELF" => LinuxChange::DeleteSelf,
            "IN_MODIFY" => LinuxChange::Modify,
            "IN_MOVE_SELF" => LinuxChange::MoveSelf,
            "IN_MOVED_FROM" => LinuxChange::MovedFrom,
            "IN_MOVED_TO" => LinuxChange::MovedTo,
            "IN_OPEN" => LinuxChange::Open,
            "IN_MOVE" => LinuxChange::Move,
            "IN_CLOSE" => LinuxChange::Close,
            "IN_IGNORED" => LinuxChange::Ignored,
            _ => return None,
        };
        Some(change)
    }

    /// `IN_IGNORED` is watcher bookkeeping and never becomes an event.
    pub fn action(self) -> Option<Action> {
        let action = match self {
            LinuxChange::Access
            | LinuxChange::CloseNowrite
            | LinuxChange::CloseWrite
            | LinuxChange::Open
            | LinuxChange::Close => Action::Read,
            LinuxChange::Attrib => Action::AclModified,
            LinuxChange::Create => Action::Created,
            LinuxChange::Delete | LinuxChange::DeleteSelf => Action::Deleted,
            LinuxChange::Modify
            | LinuxChange::MoveSelf
            | LinuxChange::MovedFrom
            | LinuxChange::MovedTo
            | LinuxChange::Move => Action::Modified,
            LinuxChange::Ignored => return None,
        };
        Some(action)
    }
}

/// Access-right names reported by the Windows object-access audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowsAccess {
    Delete,
    ReadControl,
    WriteDac,
    WriteOwner,
    Synchronize,
    AccessSysSec,
    ReadData,
    WriteData,
    AppendData,
    ReadEa,
    WriteEa,
    ExecuteTraverse,
    ReadAttributes,
    WriteAttributes,
    QueryKeyValue,
    SetKeyValue,
    CreateSubKey,
    EnumerateSubKeys,
    NotifyAboutChangesToKeys,
    CreateLink,
    Print,
}

impl WindowsAccess {
    pub fn parse(name: &str) -> Option<Self> {
        let access = match name {
            "Delete" => WindowsAccess::Delete,
            "Read Control" => WindowsAccess::ReadControl,
            "Write DAC" => WindowsAccess::WriteDac,
            "Write Owner" => WindowsAccess::WriteOwner,
            "Synchronize" => WindowsAccess::Synchronize,
            "Access Sys Sec" => WindowsAccess::AccessSysSec,
            "Read Data" => WindowsAccess::ReadData,
            "Write Data" => WindowsAccess::WriteData,
            "Append Data" => WindowsAccess::AppendData,
            "Read EA" => WindowsAccess::ReadEa,
            "Write EA" => WindowsAccess::WriteEa,
            "Execute/Traverse" => WindowsAccess::ExecuteTraverse,
            "Read Attributes" => WindowsAccess::ReadAttributes,
            "Write Attributes" => WindowsAccess::WriteAttributes,
            "Query Key Value" => WindowsAccess::QueryKeyValue,
            "Set Key Value" => WindowsAccess::SetKeyValue,
            "Create Sub Key" => WindowsAccess::CreateSubKey,
            "Enumerate Sub-Keys" => WindowsAccess::EnumerateSubKeys,
            "Notify About Changes to Keys" => WindowsAccess::NotifyAboutChangesToKeys,
            "Create Link" => WindowsAccess::CreateLink,
            "Print" => WindowsAccess::Print,
            _ => return None,
        };
        Some(access)
    }

    pub fn action(self) -> Action {
        match self {
            WindowsAccess::Delete => Action::Deleted,
            WindowsAccess::ReadControl
            | WindowsAccess::AccessSysSec
            | WindowsAccess::ReadData
            | WindowsAccess::ReadEa
            | WindowsAccess::ExecuteTraverse
            | WindowsAccess::ReadAttributes
            | WindowsAccess::QueryKeyValue
            | WindowsAccess::EnumerateSubKeys
            | WindowsAccess::NotifyAboutChangesToKeys
            | WindowsAccess::Print => Action::Read,
            WindowsAccess::WriteDac | WindowsAccess::WriteAttributes => Action::AclModified,
            WindowsAccess::WriteOwner
            | WindowsAccess::Synchronize
            | WindowsAccess::WriteData
            | WindowsAccess::AppendData
            | WindowsAccess::WriteEa
            | WindowsAccess::SetKeyValue => Action::Modified,
            WindowsAccess::CreateSubKey | WindowsAccess::CreateLink => Action::Created,
        }
    }
}

/// Resolve a raw platform code to its canonical action.
///
/// Unmapped codes resolve to `Action::Unknown`. `IN_IGNORED` has no action of
/// its own and also lands on `Unknown` here; suppressing it is the
/// normalizer's job.
pub fn lookup(platform: Platform, code: &str) -> Action {
    match platform {
        Platform::Linux => LinuxChange::parse(code).and_then(LinuxChange::action),
        Platform::Windows => WindowsAccess::parse(code).map(WindowsAccess::action),
    }
    .unwrap_or(Action::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_table_matches_wire_codes() {
        let expected = [
            ("IN_ACCESS", Action::Read),
            ("IN_ATTRIB", Action::AclModified),
            ("IN_CLOSE_NOWRITE", Action::Read),
            ("IN_CLOSE_WRITE", Action::Read),
            ("IN_CREATE", Action::Created),
            ("IN_DELETE", Action::Deleted),
            ("IN_DELETE_SELF", Action::Deleted),
            ("IN_MODIFY", Action::Modified),
            ("IN_MOVE_SELF", Action::Modified),
            ("IN_MOVED_FROM", Action::Modified),
            ("IN_MOVED_TO", Action::Modified),
            ("IN_OPEN", Action::Read),
            ("IN_MOVE", Action::Modified),
            ("IN_CLOSE", Action::Read),
        ];
        for (code, action) in expected {
            assert_eq!(lookup(Platform::Linux, code), action, "{code}");
        }
    }

    #[test]
    fn windows_table_matches_wire_names() {
        let expected = [
            ("Delete", Action::Deleted),
            ("Read Control", Action::Read),
            ("Write DAC", Action::AclModified),
            ("Write Owner", Action::Modified),
            ("Synchronize", Action::Modified),
            ("Access Sys Sec", Action::Read),
            ("Read Data", Action::Read),
            ("Write Data", Action::Modified),
            ("Append Data", Action::Modified),
            ("Read EA", Action::Read),
            ("Write EA", Action::Modified),
            ("Execute/Traverse", Action::Read),
            ("Read Attributes", Action::Read),
            ("Write Attributes", Action::AclModified),
            ("Query Key Value", Action::Read),
            ("Set Key Value", Action::Modified),
            ("Create Sub Key", Action::Created),
            ("Enumerate Sub-Keys", Action::Read),
            ("Notify About Changes to Keys", Action::Read),
            ("Create Link", Action::Created),
            ("Print", Action::Read),
        ];
        for (name, action) in expected {
            assert_eq!(lookup(Platform::Windows, name), action, "{name}");
        }
    }

    #[test]
    fn unmapped_codes_are_unknown() {
        assert_eq!(lookup(Platform::Linux, "IN_UNMOUNT"), Action::Unknown);
        assert_eq!(lookup(Platform::Linux, ""), Action::Unknown);
        assert_eq!(lookup(Platform::Windows, "Take Ownership"), Action::Unknown);
        // tables are per platform
        assert_eq!(lookup(Platform::Windows, "IN_CREATE"), Action::Unknown);
        assert_eq!(lookup(Platform::Linux, "Delete"), Action::Unknown);
    }

    #[test]
    fn ignored_has_no_action() {
        assert_eq!(LinuxChange::parse("IN_IGNORED"), Some(LinuxChange::Ignored));
        assert_eq!(LinuxChange::Ignored.action(), None);
    }

    #[test]
    fn action_serializes_as_wire_string() {
        let wire = [
            (Action::Read, "read"),
            (Action::AclModified, "acl_modified"),
            (Action::Created, "created"),
            (Action::Deleted, "deleted"),
            (Action::Modified, "modified"),
            (Action::Unknown, "unknown"),
        ];
        for (action, name) in wire {
            assert_eq!(serde_json::to_value(action).unwrap(), serde_json::json!(name));
        }
    }
}
