use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::document::MindDocument;

/// Newest autosave artifacts kept on disk; older ones are pruned.
pub const AUTOSAVE_KEEP: usize = 10;

const AUTOSAVE_PREFIX: &str = "autosave-";
const DEFAULT_SAVE_NAME: &str = "untitled.json";

/// Tri-state result for operations that can be dismissed by the user.
/// Cancellation is a normal outcome, never an error.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Canceled,
    Failure(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OpenedFile {
    pub path: PathBuf,
    pub document: MindDocument,
}

/// File-picker surface the GUI shell plugs in. Tests script it.
pub trait DialogPort: Send + Sync {
    fn pick_open_path(&self) -> Outcome<PathBuf>;
    fn pick_save_path(&self, suggested_name: &str) -> Outcome<PathBuf>;
}

/// Everything the session core needs from the platform to persist documents.
pub trait PersistencePort: Send + Sync {
    fn prompt_open(&self) -> Outcome<OpenedFile>;
    /// Write to `path`, or prompt for a destination when absent.
    fn save(&self, path: Option<&Path>, document: &MindDocument) -> Outcome<PathBuf>;
    fn save_as(&self, document: &MindDocument) -> Outcome<PathBuf>;
    /// `data_uri` carries a MIME prefix and base64 payload.
    fn export_image(&self, data_uri: &str, format: ImageFormat) -> Outcome<PathBuf>;
    /// Never prompts; writes to a deterministic location and prunes old
    /// artifacts. Failures are for the caller to log, not to surface.
    fn auto_save(&self, document: &MindDocument) -> Result<PathBuf, String>;
    fn user_storage_root(&self) -> Result<PathBuf, String>;
}

/// Filesystem-backed gateway. Dialog prompting is injected; everything else
/// is plain fs work under the resolved storage root.
pub struct FileGateway {
    dialogs: Box<dyn DialogPort>,
    storage_root: PathBuf,
}

impl FileGateway {
    pub fn new(dialogs: Box<dyn DialogPort>) -> Self {
        let storage_root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mindmark");
        Self::with_storage_root(dialogs, storage_root)
    }

    pub fn with_storage_root(dialogs: Box<dyn DialogPort>, storage_root: PathBuf) -> Self {
        FileGateway { dialogs, storage_root }
    }

    // write via tmp sibling + rename so a crash mid-write never truncates an
    // existing file
    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("mkdir {}: {}", parent.display(), e))?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| format!("write {}: {}", tmp.display(), e))?;
        fs::rename(&tmp, path).map_err(|e| format!("rename to {}: {}", path.display(), e))
    }

    fn write_document(path: &Path, document: &MindDocument) -> Result<(), String> {
        let json = document.to_pretty_json()?;
        Self::write_atomic(path, json.as_bytes())
    }

    fn autosave_dir(&self) -> PathBuf {
        self.storage_root.join("autosave")
    }

    /// Delete autosave artifacts beyond the newest `AUTOSAVE_KEEP`, oldest
    /// first by write time.
    fn prune_autosaves(&self) {
        let dir = self.autosave_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => return,
        };
        let mut artifacts: Vec<(std::time::SystemTime, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.starts_with(AUTOSAVE_PREFIX) || !name.ends_with(".json") {
                    return None;
                }
                let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
                Some((modified, path))
            })
            .collect();
        if artifacts.len() <= AUTOSAVE_KEEP {
            return;
        }
        // newest first; the artifact name embeds the write timestamp, which
        // breaks ties when the clock is coarse
        artifacts.sort_by(|a, b| b.cmp(a));
        for (_, path) in artifacts.into_iter().skip(AUTOSAVE_KEEP) {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("prune autosave {}: {}", path.display(), e);
            }
        }
    }
}

impl PersistencePort for FileGateway {
    fn prompt_open(&self) -> Outcome<OpenedFile> {
        let path = match self.dialogs.pick_open_path() {
            Outcome::Success(p) => p,
            Outcome::Canceled => return Outcome::Canceled,
            Outcome::Failure(e) => return Outcome::Failure(e),
        };
        let raw = match fs::read_to_string(&path) {
            Ok(r) => r,
            Err(e) => return Outcome::Failure(format!("read {}: {}", path.display(), e)),
        };
        match MindDocument::from_json(&raw) {
            Ok(document) => Outcome::Success(OpenedFile { path, document }),
            Err(e) => Outcome::Failure(e),
        }
    }

    fn save(&self, path: Option<&Path>, document: &MindDocument) -> Outcome<PathBuf> {
        match path {
            Some(path) => match Self::write_document(path, document) {
                Ok(()) => Outcome::Success(path.to_path_buf()),
                Err(e) => Outcome::Failure(e),
            },
            None => self.save_as(document),
        }
    }

    fn save_as(&self, document: &MindDocument) -> Outcome<PathBuf> {
        let path = match self.dialogs.pick_save_path(DEFAULT_SAVE_NAME) {
            Outcome::Success(p) => p,
            Outcome::Canceled => return Outcome::Canceled,
            Outcome::Failure(e) => return Outcome::Failure(e),
        };
        match Self::write_document(&path, document) {
            Ok(()) => Outcome::Success(path),
            Err(e) => Outcome::Failure(e),
        }
    }

    fn export_image(&self, data_uri: &str, format: ImageFormat) -> Outcome<PathBuf> {
        // strip "data:image/png;base64," or similar
        let payload = match data_uri.split_once("base64,") {
            Some((_, p)) => p,
            None => data_uri,
        };
        let bytes = match base64::engine::general_purpose::STANDARD.decode(payload.trim()) {
            Ok(b) => b,
            Err(e) => return Outcome::Failure(format!("base64 decode: {}", e)),
        };
        let suggested = format!(
            "mindmap-{}.{}",
            Utc::now().format("%Y%m%d-%H%M%S"),
            format.extension()
        );
        let path = match self.dialogs.pick_save_path(&suggested) {
            Outcome::Success(p) => p,
            Outcome::Canceled => return Outcome::Canceled,
            Outcome::Failure(e) => return Outcome::Failure(e),
        };
        match Self::write_atomic(&path, &bytes) {
            Ok(()) => Outcome::Success(path),
            Err(e) => Outcome::Failure(e),
        }
    }

    fn auto_save(&self, document: &MindDocument) -> Result<PathBuf, String> {
        let stamp = Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let path = self.autosave_dir().join(format!("{}{}.json", AUTOSAVE_PREFIX, stamp));
        Self::write_document(&path, document)?;
        self.prune_autosaves();
        Ok(path)
    }

    fn user_storage_root(&self) -> Result<PathBuf, String> {
        fs::create_dir_all(&self.storage_root)
            .map_err(|e| format!("mkdir {}: {}", self.storage_root.display(), e))?;
        Ok(self.storage_root.clone())
    }
}

/// Scripted dialog port: pops pre-loaded outcomes in order.
#[cfg(test)]
pub(crate) struct ScriptedDialogs {
    replies: parking_lot::Mutex<std::collections::VecDeque<Outcome<PathBuf>>>,
}

#[cfg(test)]
impl ScriptedDialogs {
    pub(crate) fn new(replies: Vec<Outcome<PathBuf>>) -> Box<Self> {
        Box::new(ScriptedDialogs { replies: parking_lot::Mutex::new(replies.into()) })
    }

    fn pop(&self) -> Outcome<PathBuf> {
        self.replies
            .lock()
            .pop_front()
            .unwrap_or(Outcome::Failure("no scripted reply".into()))
    }
}

#[cfg(test)]
impl DialogPort for ScriptedDialogs {
    fn pick_open_path(&self) -> Outcome<PathBuf> {
        self.pop()
    }

    fn pick_save_path(&self, _suggested_name: &str) -> Outcome<PathBuf> {
        self.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let n = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut p = std::env::temp_dir();
        p.push(format!("mindmark_test_{}_{}", std::process::id(), n));
        let _ = fs::remove_dir_all(&p); // clean stale
        let _ = fs::create_dir_all(&p);
        p
    }

    fn cleanup(dir: &PathBuf) {
        let _ = fs::remove_dir_all(dir);
    }

    fn doc(topic: &str) -> MindDocument {
        let mut d = MindDocument::new_empty();
        d.root.topic = topic.into();
        d
    }

    #[test]
    fn save_then_open_round_trips() {
        let dir = temp_dir();
        let target = dir.join("map.json");
        let gateway = FileGateway::with_storage_root(
            ScriptedDialogs::new(vec![Outcome::Success(target.clone())]),
            dir.clone(),
        );

        let original = doc("round trip");
        assert_eq!(gateway.save(Some(&target), &original), Outcome::Success(target.clone()));

        let opened = match gateway.prompt_open() {
            Outcome::Success(o) => o,
            other => panic!("open failed: {:?}", other),
        };
        assert_eq!(opened.path, target);
        assert_eq!(opened.document, original);
        cleanup(&dir);
    }

    #[test]
    fn save_without_path_prompts() {
        let dir = temp_dir();
        let target = dir.join("picked.json");
        let gateway = FileGateway::with_storage_root(
            ScriptedDialogs::new(vec![Outcome::Success(target.clone())]),
            dir.clone(),
        );
        assert_eq!(gateway.save(None, &doc("x")), Outcome::Success(target.clone()));
        assert!(target.exists());
        cleanup(&dir);
    }

    #[test]
    fn canceled_dialog_is_not_an_error() {
        let dir = temp_dir();
        let gateway = FileGateway::with_storage_root(
            ScriptedDialogs::new(vec![Outcome::Canceled, Outcome::Canceled]),
            dir.clone(),
        );
        assert_eq!(gateway.save_as(&doc("x")), Outcome::Canceled);
        assert_eq!(gateway.prompt_open(), Outcome::Canceled);
        cleanup(&dir);
    }

    #[test]
    fn open_unparseable_file_fails() {
        let dir = temp_dir();
        let bad = dir.join("bad.json");
        fs::write(&bad, "not json").unwrap();
        let gateway = FileGateway::with_storage_root(
            ScriptedDialogs::new(vec![Outcome::Success(bad)]),
            dir.clone(),
        );
        assert!(matches!(gateway.prompt_open(), Outcome::Failure(_)));
        cleanup(&dir);
    }

    #[test]
    fn export_image_decodes_data_uri() {
        let dir = temp_dir();
        let target = dir.join("map.png");
        let gateway = FileGateway::with_storage_root(
            ScriptedDialogs::new(vec![Outcome::Success(target.clone())]),
            dir.clone(),
        );
        let payload = base64::engine::general_purpose::STANDARD.encode(b"fake png bytes");
        let uri = format!("data:image/png;base64,{}", payload);

        assert_eq!(
            gateway.export_image(&uri, ImageFormat::Png),
            Outcome::Success(target.clone())
        );
        assert_eq!(fs::read(&target).unwrap(), b"fake png bytes");
        cleanup(&dir);
    }

    #[test]
    fn export_image_rejects_garbage_payload() {
        let dir = temp_dir();
        let gateway = FileGateway::with_storage_root(
            ScriptedDialogs::new(vec![]),
            dir.clone(),
        );
        let result = gateway.export_image("data:image/png;base64,@@@not-base64@@@", ImageFormat::Png);
        assert!(matches!(result, Outcome::Failure(_)));
        cleanup(&dir);
    }

    #[test]
    fn autosave_writes_named_artifact() {
        let dir = temp_dir();
        let gateway = FileGateway::with_storage_root(ScriptedDialogs::new(vec![]), dir.clone());
        let path = gateway.auto_save(&doc("saved")).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("autosave-"));
        assert!(name.ends_with(".json"));
        // the cleaned ISO stamp carries no ':' or '.' besides the extension
        assert!(!name.trim_end_matches(".json").contains([':', '.']));

        let reread = MindDocument::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reread.root.topic, "saved");
        cleanup(&dir);
    }

    #[test]
    fn autosave_retains_newest_ten() {
        let dir = temp_dir();
        let gateway = FileGateway::with_storage_root(ScriptedDialogs::new(vec![]), dir.clone());

        let mut last = PathBuf::new();
        for i in 0..(AUTOSAVE_KEEP + 3) {
            last = gateway.auto_save(&doc(&i.to_string())).unwrap();
            // distinct millisecond stamps per artifact
            std::thread::sleep(std::time::Duration::from_millis(3));
        }

        let remaining: Vec<_> = fs::read_dir(dir.join("autosave"))
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("autosave-") && n.ends_with(".json"))
            .collect();
        assert_eq!(remaining.len(), AUTOSAVE_KEEP);
        // the newest artifact survived pruning
        assert!(remaining.contains(&last.file_name().unwrap().to_string_lossy().to_string()));
        cleanup(&dir);
    }

    #[test]
    fn user_storage_root_is_created() {
        let mut dir = temp_dir();
        dir.push("nested");
        let gateway = FileGateway::with_storage_root(ScriptedDialogs::new(vec![]), dir.clone());
        let root = gateway.user_storage_root().unwrap();
        assert!(root.is_dir());
        cleanup(&dir);
    }
}
