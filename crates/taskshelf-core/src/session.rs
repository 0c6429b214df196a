use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::model::{Selection, User};

pub const SESSION_FILE: &str = "session.json";

/// What survives between CLI invocations: who is signed in and what they
/// were looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl SessionFile {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(SESSION_FILE)
    }

    #[tracing::instrument(skip(path))]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", path.display()))?;
        debug!(file = %path.display(), "loaded session");
        Ok(parsed)
    }

    #[tracing::instrument(skip(self, path))]
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, self)?;
        writeln!(temp)?;
        temp.flush()?;
        temp.persist(path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::SessionFile;
    use crate::model::{CoreView, Selection, User};

    #[test]
    fn missing_or_blank_file_means_signed_out() {
        let dir = tempdir().expect("tempdir");
        let path = SessionFile::path(dir.path());
        assert_eq!(SessionFile::load(&path).expect("load"), SessionFile::default());

        fs::write(&path, "  \n").expect("write");
        assert_eq!(SessionFile::load(&path).expect("load"), SessionFile::default());
    }

    #[test]
    fn save_then_load_keeps_user_and_selection() {
        let dir = tempdir().expect("tempdir");
        let path = SessionFile::path(dir.path());
        let session = SessionFile {
            user: Some(User {
                uid: "u1".to_string(),
                email: "ada@example.com".to_string(),
            }),
            selection: Some(Selection::View(CoreView::StickyWall)),
        };

        session.save(&path).expect("save");
        assert_eq!(SessionFile::load(&path).expect("load"), session);
    }
}
