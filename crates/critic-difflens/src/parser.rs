use std::fmt;

use critic_core::CriticError;

/// Path GitHub and git use for the missing side of an added or deleted file.
pub const DEV_NULL: &str = "/dev/null";

/// Kind of a single line inside a hunk.
///
/// # Examples
///
/// ```
/// use critic_difflens::parser::LineKind;
///
/// assert_eq!(LineKind::Added.marker(), '+');
/// assert_eq!(LineKind::Context.marker(), ' ');
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Present only in the new revision.
    Added,
    /// Present only in the old revision.
    Removed,
    /// Unchanged line shown for context.
    Context,
}

impl LineKind {
    /// The unified-diff marker character for this kind.
    pub fn marker(self) -> char {
        match self {
            LineKind::Added => '+',
            LineKind::Removed => '-',
            LineKind::Context => ' ',
        }
    }
}

/// One line of a hunk with both line-number and diff-position coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    /// Added, removed or context.
    pub kind: LineKind,
    /// Line text without the leading marker.
    pub content: String,
    /// Line number in the old file (removed and context lines).
    pub old_line: Option<u32>,
    /// Line number in the new file (added and context lines).
    pub new_line: Option<u32>,
    /// GitHub review position, counted from the file's first hunk header.
    pub position: u32,
}

impl DiffLine {
    /// New-file line number when present, otherwise the old-file one.
    ///
    /// # Examples
    ///
    /// ```
    /// use critic_difflens::parser::{DiffLine, LineKind};
    ///
    /// let removed = DiffLine {
    ///     kind: LineKind::Removed,
    ///     content: "old()".into(),
    ///     old_line: Some(7),
    ///     new_line: None,
    ///     position: 3,
    /// };
    /// assert_eq!(removed.line_number(), Some(7));
    /// ```
    pub fn line_number(&self) -> Option<u32> {
        self.new_line.or(self.old_line)
    }
}

/// A contiguous hunk of a file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffChunk {
    /// Raw `@@ -a,b +c,d @@ ...` header line.
    pub header: String,
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
    /// Parsed body lines in diff order.
    pub lines: Vec<DiffLine>,
}

impl DiffChunk {
    /// First and last diff position covered by this hunk's lines.
    pub fn position_range(&self) -> Option<(u32, u32)> {
        let first = self.lines.first()?.position;
        let last = self.lines.last()?.position;
        Some((first, last))
    }

    /// Whether `position` addresses one of this hunk's lines.
    ///
    /// Positions inside a hunk are contiguous, so this is a range check.
    ///
    /// # Examples
    ///
    /// ```
    /// use critic_difflens::parser::parse_unified_diff;
    ///
    /// let diff = "--- a/f.rs\n+++ b/f.rs\n@@ -1 +1,2 @@\n a\n+b\n@@ -9 +10 @@\n z\n";
    /// let file = &parse_unified_diff(diff).unwrap()[0];
    /// assert!(file.chunks[0].has_position(2));
    /// assert!(!file.chunks[0].has_position(0));
    /// assert!(!file.chunks[0].has_position(4));
    /// assert!(file.chunks[1].has_position(4));
    /// ```
    pub fn has_position(&self, position: u32) -> bool {
        self.position_range()
            .is_some_and(|(first, last)| (first..=last).contains(&position))
    }
}

/// A complete diff for a single file, containing zero or more hunks.
///
/// # Examples
///
/// ```
/// use critic_difflens::parser::parse_unified_diff;
///
/// let diff = "diff --git a/hello.rs b/hello.rs\n\
///             --- a/hello.rs\n\
///             +++ b/hello.rs\n\
///             @@ -1,2 +1,3 @@\n\
///             \x20fn main() {\n\
///             +    println!(\"hello\");\n\
///             \x20}\n";
/// let files = parse_unified_diff(diff).unwrap();
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].chunks[0].lines[1].position, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    /// Path in the old version, `/dev/null` for added files.
    pub old_path: Option<String>,
    /// Path in the new version, `/dev/null` for deleted files.
    pub new_path: Option<String>,
    /// Parsed hunks for this file.
    pub chunks: Vec<DiffChunk>,
    /// Whether this is a newly created file.
    pub is_new_file: bool,
    /// Whether this file was deleted.
    pub is_deleted_file: bool,
    /// Whether this file was renamed.
    pub is_rename: bool,
}

impl FileDiff {
    /// The reviewable path: the new-side path when it is present and non-empty.
    pub fn path(&self) -> Option<&str> {
        self.new_path.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether the file no longer exists in the new revision.
    pub fn is_deleted(&self) -> bool {
        self.is_deleted_file || self.new_path.as_deref() == Some(DEV_NULL)
    }
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} hunks)",
            self.new_path.as_deref().unwrap_or("<unknown>"),
            self.chunks.len()
        )
    }
}

/// Running coordinates for the hunk being parsed.
#[derive(Default)]
struct Cursor {
    old_line: u32,
    new_line: u32,
    old_remaining: u32,
    new_remaining: u32,
    position: u32,
}

impl Cursor {
    fn expects_more(&self) -> bool {
        self.old_remaining > 0 || self.new_remaining > 0
    }

    /// Step past one body line and return its `(old, new)` line numbers.
    fn advance(&mut self, kind: LineKind) -> (Option<u32>, Option<u32>) {
        self.position = self.position.saturating_add(1);
        let old = matches!(kind, LineKind::Removed | LineKind::Context).then(|| {
            self.old_remaining = self.old_remaining.saturating_sub(1);
            let line = self.old_line;
            self.old_line = line.saturating_add(1);
            line
        });
        let new = matches!(kind, LineKind::Added | LineKind::Context).then(|| {
            self.new_remaining = self.new_remaining.saturating_sub(1);
            let line = self.new_line;
            self.new_line = line.saturating_add(1);
            line
        });
        (old, new)
    }
}

/// One side of a hunk header, `-a,b` or `+c,d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkRange {
    start: u32,
    len: u32,
}

#[derive(Default)]
struct ParseState {
    files: Vec<FileDiff>,
    file: Option<FileDiff>,
    chunk: Option<DiffChunk>,
    cursor: Cursor,
    binary: bool,
}

impl ParseState {
    fn close_chunk(&mut self) {
        if let (Some(chunk), Some(file)) = (self.chunk.take(), self.file.as_mut()) {
            file.chunks.push(chunk);
        }
    }

    fn close_file(&mut self) {
        self.close_chunk();
        if let Some(file) = self.file.take() {
            if !self.binary {
                self.files.push(file);
            }
        }
        self.binary = false;
        self.cursor = Cursor::default();
    }

    fn open_file(&mut self, file: FileDiff) {
        self.close_file();
        self.file = Some(file);
    }

    fn open_chunk(&mut self, header: &str) -> Result<(), CriticError> {
        self.close_chunk();
        let (old, new) = parse_hunk_header(header)?;

        // The first header sits at position 0; later ones take a position each.
        if self.file.as_ref().is_some_and(|f| !f.chunks.is_empty()) {
            self.cursor.position = self.cursor.position.saturating_add(1);
        }
        self.cursor.old_line = old.start;
        self.cursor.new_line = new.start;
        self.cursor.old_remaining = old.len;
        self.cursor.new_remaining = new.len;

        self.chunk = Some(DiffChunk {
            header: header.to_string(),
            old_start: old.start,
            old_lines: old.len,
            new_start: new.start,
            new_lines: new.len,
            lines: Vec::new(),
        });
        Ok(())
    }

    fn push_line(&mut self, kind: LineKind, raw: &str) {
        let (old_line, new_line) = self.cursor.advance(kind);
        if let Some(chunk) = self.chunk.as_mut() {
            chunk.lines.push(DiffLine {
                kind,
                content: raw.get(1..).unwrap_or_default().to_string(),
                old_line,
                new_line,
                position: self.cursor.position,
            });
        }
    }

    /// Whether a `---` line should begin a new file rather than name the
    /// old side of the current one.
    fn starts_plain_patch(&self) -> bool {
        self.file
            .as_ref()
            .map_or(true, |f| !f.chunks.is_empty() || self.chunk.is_some())
    }
}

/// Parse a unified diff string (as produced by `git diff` or the GitHub diff
/// media type) into structured [`FileDiff`] entries.
///
/// Handles new, deleted, renamed and binary files (binary files are skipped)
/// and assigns every body line its GitHub review position.
///
/// # Errors
///
/// Returns [`CriticError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use critic_difflens::parser::parse_unified_diff;
///
/// let files = parse_unified_diff("").unwrap();
/// assert!(files.is_empty());
/// ```
pub fn parse_unified_diff(input: &str) -> Result<Vec<FileDiff>, CriticError> {
    let mut state = ParseState::default();

    for line in input.lines() {
        if state.chunk.is_some() {
            if line.starts_with("\\ ") {
                continue;
            }
            if let Some(kind) = body_line_kind(line, &state.cursor) {
                state.push_line(kind, line);
                continue;
            }
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            let (old_path, new_path) = parse_git_header(rest).unzip();
            state.open_file(FileDiff {
                old_path,
                new_path,
                ..FileDiff::default()
            });
            continue;
        }

        if line.starts_with("--- ") && state.starts_plain_patch() {
            state.open_file(FileDiff::default());
        }

        if line.starts_with("@@ ") {
            if state.file.is_some() {
                state.open_chunk(line)?;
            }
            continue;
        }

        let Some(file) = state.file.as_mut() else {
            continue;
        };

        if line.starts_with("Binary files ") && line.ends_with(" differ") {
            state.binary = true;
        } else if apply_extended_header(file, line) {
            continue;
        } else if let Some(path) = line.strip_prefix("--- ") {
            file.old_path = Some(parse_path(path));
        } else if let Some(path) = line.strip_prefix("+++ ") {
            let path = parse_path(path);
            file.is_deleted_file |= path == DEV_NULL;
            file.new_path = Some(path);
        }
    }

    state.close_file();
    Ok(state.files)
}

/// Record a git extended header (`new file mode`, `rename from`, ...) on
/// `file`. Returns `false` when `line` is not one of them.
fn apply_extended_header(file: &mut FileDiff, line: &str) -> bool {
    let flag = match line {
        l if l.starts_with("new file mode") => &mut file.is_new_file,
        l if l.starts_with("deleted file mode") => &mut file.is_deleted_file,
        l if l.starts_with("rename from ") || l.starts_with("rename to ") => &mut file.is_rename,
        _ => return false,
    };
    *flag = true;
    true
}

/// Classify `line` as a hunk body line, or `None` when it belongs to a header.
///
/// While the hunk header's counts say lines are still expected, any marker is
/// body text (so a removed `--- x` line is not a file header). Past the counts,
/// marked lines are still accepted unless they look like file headers.
fn body_line_kind(line: &str, cursor: &Cursor) -> Option<LineKind> {
    let expecting = cursor.expects_more();
    if !expecting && (line.starts_with("--- ") || line.starts_with("+++ ")) {
        return None;
    }
    match line.chars().next() {
        Some('+') => Some(LineKind::Added),
        Some('-') => Some(LineKind::Removed),
        Some(' ') => Some(LineKind::Context),
        None if expecting => Some(LineKind::Context),
        _ => None,
    }
}

fn parse_git_header(rest: &str) -> Option<(String, String)> {
    let (old, new) = rest
        .rsplit_once(" b/")
        .map(|(old, new)| (old.to_string(), format!("b/{new}")))
        .or_else(|| {
            rest.rsplit_once(" \"b/")
                .map(|(old, new)| (old.to_string(), format!("\"b/{new}")))
        })?;
    Some((parse_path(&old), parse_path(&new)))
}

fn parse_path(raw: &str) -> String {
    // GitHub appends a tab and timestamp to some `---`/`+++` lines.
    let raw = raw.split('\t').next().unwrap_or(raw);
    let unquoted = raw.trim_matches('"');

    if unquoted == DEV_NULL {
        return DEV_NULL.to_string();
    }

    unquoted
        .strip_prefix("a/")
        .or_else(|| unquoted.strip_prefix("b/"))
        .unwrap_or(unquoted)
        .to_string()
}

fn parse_hunk_header(line: &str) -> Result<(HunkRange, HunkRange), CriticError> {
    let malformed = || CriticError::Parse(format!("invalid hunk header: {line}"));

    let (ranges, _section) = line
        .strip_prefix("@@ ")
        .and_then(|s| s.split_once(" @@"))
        .ok_or_else(malformed)?;
    let (old, new) = ranges.split_once(' ').ok_or_else(malformed)?;

    let old = old
        .strip_prefix('-')
        .and_then(parse_range)
        .ok_or_else(malformed)?;
    let new = new
        .strip_prefix('+')
        .and_then(parse_range)
        .ok_or_else(malformed)?;
    Ok((old, new))
}

/// `start,len` or a bare `start`, which means one line. The range must end
/// within `u32`.
fn parse_range(range: &str) -> Option<HunkRange> {
    let (start, len): (u32, u32) = match range.split_once(',') {
        Some((start, len)) => (start.parse().ok()?, len.parse().ok()?),
        None => (range.parse().ok()?, 1),
    };
    start.checked_add(len)?;
    Some(HunkRange { start, len })
}
