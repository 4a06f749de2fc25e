//! The static message registry.
//!
//! One table maps wire names to message ids and the minimum protocol
//! version each message requires. The table is kept sorted by name so
//! lookups are a binary search; the rare id-to-name lookup is a linear scan
//! of the same table.

/// Every message the protocol knows, plus [`MsgId::Unknown`] for names that
/// miss the table (only ever seen by the default handler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgId {
    AddManyFiles,
    AddOneFile,
    Automap,
    Autostart,
    BadFormat,
    Directory,
    DownLimit,
    Encryption,
    Failed,
    GetAutomap,
    GetAutostart,
    GetDirectory,
    GetDownLimit,
    GetEncryption,
    GetInfo,
    GetInfoAll,
    GetPex,
    GetPort,
    GetStatus,
    GetStatusAll,
    GetSupported,
    GetUpLimit,
    Info,
    Lookup,
    Noop,
    NotSupported,
    Pex,
    Port,
    Quit,
    Remove,
    RemoveAll,
    Start,
    StartAll,
    Status,
    Stop,
    StopAll,
    Succeeded,
    Supported,
    UpLimit,
    Version,
    Unknown,
}

/// Number of real message ids; sizes the handler table.
pub const MSG_COUNT: usize = MsgId::Unknown as usize;

impl MsgId {
    pub(crate) fn index(self) -> Option<usize> {
        match self {
            MsgId::Unknown => None,
            id => Some(id as usize),
        }
    }
}

pub struct MsgSpec {
    pub name: &'static str,
    pub id: MsgId,
    pub min_version: u32,
}

const fn msg(name: &'static str, id: MsgId, min_version: u32) -> MsgSpec {
    MsgSpec {
        name,
        id,
        min_version,
    }
}

/// Sorted by name; `lookup` relies on the ordering.
static MESSAGES: [MsgSpec; MSG_COUNT] = [
    msg("addfile-detailed", MsgId::AddOneFile, 2),
    msg("addfiles", MsgId::AddManyFiles, 1),
    msg("automap", MsgId::Automap, 2),
    msg("autostart", MsgId::Autostart, 2),
    msg("bad-format", MsgId::BadFormat, 2),
    msg("directory", MsgId::Directory, 2),
    msg("downlimit", MsgId::DownLimit, 2),
    msg("encryption", MsgId::Encryption, 2),
    msg("failed", MsgId::Failed, 2),
    msg("get-automap", MsgId::GetAutomap, 2),
    msg("get-autostart", MsgId::GetAutostart, 2),
    msg("get-directory", MsgId::GetDirectory, 2),
    msg("get-downlimit", MsgId::GetDownLimit, 2),
    msg("get-encryption", MsgId::GetEncryption, 2),
    msg("get-info", MsgId::GetInfo, 2),
    msg("get-info-all", MsgId::GetInfoAll, 2),
    msg("get-pex", MsgId::GetPex, 2),
    msg("get-port", MsgId::GetPort, 2),
    msg("get-status", MsgId::GetStatus, 2),
    msg("get-status-all", MsgId::GetStatusAll, 2),
    msg("get-supported", MsgId::GetSupported, 2),
    msg("get-uplimit", MsgId::GetUpLimit, 2),
    msg("info", MsgId::Info, 2),
    msg("lookup", MsgId::Lookup, 2),
    msg("noop", MsgId::Noop, 2),
    msg("not-supported", MsgId::NotSupported, 2),
    msg("pex", MsgId::Pex, 2),
    msg("port", MsgId::Port, 2),
    msg("quit", MsgId::Quit, 1),
    msg("remove", MsgId::Remove, 2),
    msg("remove-all", MsgId::RemoveAll, 2),
    msg("start", MsgId::Start, 2),
    msg("start-all", MsgId::StartAll, 2),
    msg("status", MsgId::Status, 2),
    msg("stop", MsgId::Stop, 2),
    msg("stop-all", MsgId::StopAll, 2),
    msg("succeeded", MsgId::Succeeded, 2),
    msg("supported", MsgId::Supported, 2),
    msg("uplimit", MsgId::UpLimit, 2),
    msg("version", MsgId::Version, 1),
];

/// Finds a message by wire name.
pub fn lookup(name: &[u8]) -> Option<&'static MsgSpec> {
    MESSAGES
        .binary_search_by(|m| m.name.as_bytes().cmp(name))
        .ok()
        .map(|i| &MESSAGES[i])
}

/// The canonical wire name for `id`.
pub fn name_of(id: MsgId) -> Option<&'static str> {
    MESSAGES.iter().find(|m| m.id == id).map(|m| m.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_by_name() {
        for pair in MESSAGES.windows(2) {
            assert!(
                pair[0].name < pair[1].name,
                "{} >= {}",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(lookup(b"version").unwrap().id, MsgId::Version);
        assert_eq!(lookup(b"version").unwrap().min_version, 1);
        assert_eq!(lookup(b"get-info-all").unwrap().id, MsgId::GetInfoAll);
        assert_eq!(lookup(b"uplimit").unwrap().min_version, 2);
        assert!(lookup(b"no-such-message").is_none());
        assert!(lookup(b"").is_none());
    }

    #[test]
    fn test_reverse_lookup() {
        assert_eq!(name_of(MsgId::AddManyFiles), Some("addfiles"));
        assert_eq!(name_of(MsgId::GetStatusAll), Some("get-status-all"));
        assert_eq!(name_of(MsgId::Unknown), None);
    }

    #[test]
    fn test_every_id_has_a_unique_slot() {
        for (i, m) in MESSAGES.iter().enumerate() {
            let idx = m.id.index().unwrap();
            assert!(idx < MSG_COUNT);
            assert_eq!(
                MESSAGES.iter().filter(|o| o.id == m.id).count(),
                1,
                "duplicate id at entry {i}"
            );
        }
        assert!(MsgId::Unknown.index().is_none());
    }
}
