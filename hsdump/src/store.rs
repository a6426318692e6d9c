use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::debug;

use crate::error::{Error, Result};
use crate::models::{Conversation, Token};

pub const DEFAULT_TOKEN_FILE: &str = ".helpscout_token.json";

/// On-disk cache for the OAuth access token. The file is disposable: anything
/// unreadable is treated as "no token".
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<Token> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("no cached token at {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                debug!("ignoring malformed token cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let content = serde_json::to_string(token)?;
        fs::write(&self.path, content).map_err(|e| Error::io(&self.path, e))?;
        debug!("token cached to {}", self.path.display());
        Ok(())
    }
}

/// Writes one pretty-printed JSON file per conversation.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    dir: PathBuf,
}

impl ConversationStore {
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, conversation_id: u64) -> PathBuf {
        self.dir
            .join(format!("conversation_{}.json", conversation_id))
    }

    pub fn save(&self, conversation: &Conversation) -> Result<PathBuf> {
        let path = self.path_for(conversation.id);
        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, conversation)?;
        writer.flush().map_err(|e| Error::io(&path, e))?;
        debug!("saved conversation {} to {}", conversation.id, path.display());
        Ok(path)
    }
}
