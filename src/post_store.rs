use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::{fs, io};

use spdlog::{debug, info, warn};

use crate::error::{CmsError, Result};
use crate::frontmatter::{self, DatePolicy, Frontmatter};
use crate::post_list::PostSummary;
use crate::util::path_safety::{has_post_extension, resolve};
use crate::util::slug::title_to_filename;

/// Markdown posts under one content directory, addressed by their path
/// relative to it (`note/a.md`).
pub struct PostStore {
    pub root_dir: PathBuf,
}

fn not_found(post_id: &str, e: io::Error) -> CmsError {
    if e.kind() == ErrorKind::NotFound {
        CmsError::NotFound(post_id.to_string())
    } else {
        CmsError::Io(e)
    }
}

impl PostStore {
    pub fn new(root_dir: PathBuf) -> Self {
        PostStore { root_dir }
    }

    /// Every `.md`/`.mdx` file below the root, sorted by relative path so the
    /// enumeration order is stable between runs. Hidden entries are skipped.
    pub fn retrieve_files(&self) -> io::Result<Vec<String>> {
        let mut posts = vec![];
        Self::collect_files(&self.root_dir, "", &mut posts)?;
        posts.sort();
        Ok(posts)
    }

    fn collect_files(dir: &Path, prefix: &str, posts: &mut Vec<String>) -> io::Result<()> {
        let entries = fs::read_dir(dir)?;
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                warn!("Skipping non UTF-8 file name in {}", dir.display());
                continue;
            };
            if file_name.starts_with('.') {
                continue;
            }

            let relative = format!("{}{}", prefix, file_name);
            if file_type.is_dir() {
                Self::collect_files(&entry.path(), &format!("{}/", relative), posts)?;
            } else if file_type.is_file() && has_post_extension(file_name) {
                posts.push(relative);
            }
        }
        Ok(())
    }

    pub fn read(&self, post_id: &str) -> Result<(Frontmatter, String)> {
        let path = resolve(&self.root_dir, post_id)?;
        let text = fs::read_to_string(&path).map_err(|e| not_found(post_id, e))?;
        let (mapping, body) = frontmatter::parse(&text)?;
        let frontmatter = Frontmatter::from_mapping(mapping, DatePolicy::Lenient, post_id)?;
        Ok((frontmatter, body))
    }

    /// Overwrites the post. Concurrent writers are not detected: last one wins.
    pub fn write(&self, post_id: &str, frontmatter: &Frontmatter, body: &str) -> Result<()> {
        let path = resolve(&self.root_dir, post_id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = frontmatter::serialize(frontmatter, body)?;
        fs::write(&path, text)?;
        debug!("Post {} written", post_id);
        Ok(())
    }

    /// Creates `<title-slug>.md` at the root. Fails with `Conflict` instead of
    /// replacing an existing file.
    pub fn create(&self, frontmatter: &Frontmatter, body: &str) -> Result<String> {
        let post_id = format!("{}.md", title_to_filename(&frontmatter.title));
        let path = resolve(&self.root_dir, &post_id)?;
        fs::create_dir_all(&self.root_dir)?;

        let text = frontmatter::serialize(frontmatter, body)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(CmsError::Conflict(post_id)),
            Err(e) => return Err(e.into()),
        };
        file.write_all(text.as_bytes())?;

        info!("Post {} created", post_id);
        Ok(post_id)
    }

    pub fn toggle_draft(&self, post_id: &str) -> Result<bool> {
        let (mut frontmatter, body) = self.read(post_id)?;
        frontmatter.draft = !frontmatter.draft;
        self.write(post_id, &frontmatter, &body)?;
        Ok(frontmatter.draft)
    }

    pub fn toggle_sticky(&self, post_id: &str) -> Result<bool> {
        let (mut frontmatter, body) = self.read(post_id)?;
        let sticky = !frontmatter.is_sticky();
        frontmatter.sticky = Some(sticky);
        self.write(post_id, &frontmatter, &body)?;
        Ok(sticky)
    }

    /// Parses every post. A file that fails is logged and left out, the rest
    /// are still returned.
    pub fn load_summaries(&self) -> io::Result<Vec<PostSummary>> {
        let files = self.retrieve_files()?;
        let mut summaries = Vec::with_capacity(files.len());
        for post_id in files {
            match self.read(&post_id) {
                Ok((frontmatter, _)) => summaries.push(PostSummary::from_frontmatter(&post_id, &frontmatter)),
                Err(e) => warn!("Skipping post {}: {}", post_id, e),
            }
        }
        Ok(summaries)
    }
}
