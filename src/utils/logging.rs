use crate::core::message::{Message, Role};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Plain-text transcript of the conversation, appended as messages are
/// finalized. System messages are never written.
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
    is_active: bool,
}

impl TranscriptLog {
    pub fn disabled() -> Self {
        Self {
            file_path: None,
            is_active: false,
        }
    }

    pub fn new(log_file: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut log = Self::disabled();
        if let Some(path) = log_file {
            log.set_log_file(path)?;
        }
        Ok(log)
    }

    pub fn set_log_file(&mut self, path: PathBuf) -> Result<String, Box<dyn std::error::Error>> {
        // Fail early if the file cannot be created or appended to.
        Self::test_file_access(&path)?;

        let status = format!("Logging enabled to: {}", path.display());
        self.file_path = Some(path);
        self.is_active = true;
        Ok(status)
    }

    pub fn toggle_logging(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        match &self.file_path {
            Some(path) => {
                self.is_active = !self.is_active;
                if self.is_active {
                    Ok(format!("Logging resumed to: {}", path.display()))
                } else {
                    Ok(format!("Logging paused (file: {})", path.display()))
                }
            }
            None => Err("No log file specified. Use --log <file> to enable logging.".into()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active && self.file_path.is_some()
    }

    /// Write a `## ` header line, e.g. when a session starts.
    pub fn log_marker(&self, marker: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.write_lines(&format!("## {marker}"))
    }

    pub fn log_message(&self, message: &Message) -> Result<(), Box<dyn std::error::Error>> {
        match message.role {
            Role::System => Ok(()),
            Role::User => self.write_lines(&format!("You: {}", message.content)),
            Role::Assistant if message.content.is_empty() => Ok(()),
            Role::Assistant => self.write_lines(&message.content),
        }
    }

    fn write_lines(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(path) = self.file_path.as_ref().filter(|_| self.is_active) else {
            return Ok(());
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between entries, matching the on-screen layout.
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn status(&self) -> String {
        let name = |path: &Path| {
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        };
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", name(path)),
            (Some(path), false) => format!("paused ({})", name(path)),
        }
    }

    fn test_file_access(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}
