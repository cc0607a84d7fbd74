//! Mapping of note queries onto files.

use crate::note::Note;
use adapters::Clock;
use chrono::NaiveDate;
use config::NoteCategory;
use errors::ServiceError;
use std::path::Path;
use std::sync::LazyLock;
use tracing::trace;

static NOTE_NAME: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(.*)-([0-9]{4})([0-9]{2})([0-9]{2})(\.\w+)$")
        .unwrap_or_else(|e| panic!("invalid note name pattern: {e}"))
});

const VERSION_FORMAT: &str = "%Y-%m-%d";
const FILE_VERSION_FORMAT: &str = "%Y%m%d";

/// How a resolve request picks among the versions of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSpec {
    /// Today's version in exactly one category, whether or not it exists.
    New,
    /// The newest existing version.
    Latest,
    /// Exactly this date.
    Exact(NaiveDate),
}

impl VersionSpec {
    /// Parses `""`/`"latest"`, `"new"` or a `YYYY-MM-DD` date.
    pub fn parse(version: &str) -> Result<Self, ServiceError> {
        match version {
            "" | "latest" => Ok(Self::Latest),
            "new" => Ok(Self::New),
            v => NaiveDate::parse_from_str(v, VERSION_FORMAT)
                .map(Self::Exact)
                .map_err(|e| ServiceError::invalid_request(format!("invalid version {v:?}: {e}"))),
        }
    }
}

/// Splits a trailing extension (with its dot) off `tag`.
pub fn split_ext(tag: &str) -> (&str, &str) {
    match tag.rfind('.') {
        Some(i) => tag.split_at(i),
        None => (tag, ""),
    }
}

/// Resolves note queries against a set of categories.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Lists note files matching a tag, a category and a version pattern, and
/// resolves a query to exactly one note using the `new`, `latest` and
/// exact-date rules.
///
/// ## Tags
/// A tag may carry an extension (`meeting.md`), which restricts matches to
/// that suffix. The part before the extension may be a glob. Tags never
/// contain `/`.
///
/// ## Usage
/// ```rust,no_run
/// use adapters::SystemClock;
/// use config::NoteCategory;
/// use notes::NoteResolver;
///
/// let categories = vec![NoteCategory::new("work", "/home/me/notes/work", ".txt")];
/// let resolver = NoteResolver::new(&categories, &SystemClock);
/// let today = resolver.resolve("standup", "work", "new").unwrap();
/// println!("{}", today.path.display());
/// ```
pub struct NoteResolver<'a> {
    categories: &'a [NoteCategory],
    clock: &'a dyn Clock,
}

impl<'a> NoteResolver<'a> {
    pub fn new(categories: &'a [NoteCategory], clock: &'a dyn Clock) -> Self {
        Self { categories, clock }
    }

    /// The named category, or all of them for an empty name.
    fn select(&self, name: &str) -> Result<Vec<&'a NoteCategory>, ServiceError> {
        if name.is_empty() {
            return Ok(self.categories.iter().collect());
        }
        self.categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| vec![c])
            .ok_or_else(|| ServiceError::invalid_request(format!("invalid category: {name:?}")))
    }

    /// Lists matching notes in ascending order.
    ///
    /// ## Error Handling
    /// `InvalidRequest` for an unknown category, a tag containing `/`, or a
    /// malformed tag or version pattern. A missing category directory
    /// contributes no notes.
    pub fn list(&self, tag: &str, category: &str, version: &str) -> Result<Vec<Note>, ServiceError> {
        check_tag(tag)?;
        let categories = self.select(category)?;
        let version = if version.is_empty() {
            None
        } else {
            Some(glob::Pattern::new(version).map_err(|e| {
                ServiceError::invalid_request(format!("invalid version pattern {version:?}: {e}"))
            })?)
        };
        self.filter_and_sort(tag, version.as_ref(), &categories)
    }

    fn filter_and_sort(
        &self,
        tag: &str,
        version: Option<&glob::Pattern>,
        categories: &[&NoteCategory],
    ) -> Result<Vec<Note>, ServiceError> {
        let (base, ext) = split_ext(tag);
        let base = if base.is_empty() {
            None
        } else {
            Some(glob::Pattern::new(base).map_err(|e| {
                ServiceError::invalid_request(format!("invalid tag pattern {base:?}: {e}"))
            })?)
        };

        let mut matched = Vec::new();
        for category in categories {
            for note in scan(category)? {
                if base.as_ref().is_some_and(|p| !p.matches(&note.tag)) {
                    continue;
                }
                if version.is_some_and(|p| !p.matches(&note.version)) {
                    continue;
                }
                if !ext.is_empty() && note.suffix != ext {
                    continue;
                }
                matched.push(note);
            }
        }
        matched.sort();
        Ok(matched)
    }

    /// Resolves a query to a single note.
    ///
    /// - `new`: today's file in the single selected category; the file need
    ///   not exist, and repeated calls on one day agree.
    /// - `""` or `latest`: the existing note with the greatest version.
    /// - `YYYY-MM-DD`: the unique existing note with that version.
    ///
    /// ## Error Handling
    /// - `InvalidRequest`: empty tag, `/` in tag, unknown category, `new`
    ///   without exactly one category, unparsable version
    /// - `NotFound`: nothing matches
    /// - `Ambiguous`: an exact version matches more than one note
    pub fn resolve(&self, tag: &str, category: &str, version: &str) -> Result<Note, ServiceError> {
        let categories = self.select(category)?;
        if tag.is_empty() {
            return Err(ServiceError::invalid_request("missing base note name"));
        }
        check_tag(tag)?;
        let (base, ext) = split_ext(tag);

        match VersionSpec::parse(version)? {
            VersionSpec::New => {
                let [category] = categories.as_slice() else {
                    return Err(ServiceError::invalid_request(
                        "a new note requires exactly one category",
                    ));
                };
                let today = self.clock.today();
                let path = category.file_path(
                    base,
                    &today.format(FILE_VERSION_FORMAT).to_string(),
                    Some(ext),
                );
                let suffix = if ext.is_empty() {
                    category.effective_suffix()
                } else {
                    ext.to_string()
                };
                Ok(Note {
                    tag: base.to_string(),
                    version: today.format(VERSION_FORMAT).to_string(),
                    category: category.name.clone(),
                    suffix,
                    path,
                })
            }
            VersionSpec::Latest => self
                .filter_and_sort(tag, None, &categories)?
                .into_iter()
                .max_by(|a, b| a.version.cmp(&b.version))
                .ok_or_else(|| ServiceError::not_found(format!("no notes matching {tag:?}"))),
            VersionSpec::Exact(date) => {
                let version = date.format(VERSION_FORMAT).to_string();
                let pattern = glob::Pattern::new(&glob::Pattern::escape(&version))
                    .map_err(|e| ServiceError::internal("building version pattern", e))?;
                let mut notes = self.filter_and_sort(tag, Some(&pattern), &categories)?;
                match notes.len() {
                    0 => Err(ServiceError::not_found(format!(
                        "no notes matching version {version} of {tag:?}"
                    ))),
                    1 => Ok(notes.remove(0)),
                    n => Err(ServiceError::ambiguous(format!(
                        "multiple notes ({n}) matching version {version} of {tag:?}"
                    ))),
                }
            }
        }
    }
}

fn check_tag(tag: &str) -> Result<(), ServiceError> {
    if tag.contains('/') {
        return Err(ServiceError::invalid_request("tag may not contain '/'"));
    }
    Ok(())
}

/// Reads every note file in the category directory.
fn scan(category: &NoteCategory) -> Result<Vec<Note>, ServiceError> {
    let dir = category.expanded_dir();
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            trace!(category = %category.name, dir = %dir.display(), "Category directory missing");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(ServiceError::internal(
                format!("reading {}", dir.display()),
                e,
            ));
        }
    };

    let mut notes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ServiceError::internal(format!("reading {}", dir.display()), e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(note) = parse_note_name(name, &category.name, &dir) {
            notes.push(note);
        }
    }
    Ok(notes)
}

fn parse_note_name(name: &str, category: &str, dir: &Path) -> Option<Note> {
    let caps = NOTE_NAME.captures(name)?;
    Some(Note {
        tag: caps[1].to_string(),
        version: format!("{}-{}-{}", &caps[2], &caps[3], &caps[4]),
        category: category.to_string(),
        suffix: caps[5].to_string(),
        path: dir.join(name),
    })
}
