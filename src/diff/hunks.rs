use super::filter::FileFilter;
use super::header_path;
use crate::types::DiffHunk;

/// Cuts a commit's diff into one hunk per included file
///
/// A hunk body is the file's `+`/`-` change lines in original order, markers
/// kept. File headers, `@@` range lines and `\ No newline` notices belong to
/// no hunk. `---`/`+++` lines are file markers only before a file's first
/// `@@` line; after it they are content like any other change line.
#[derive(Debug, Clone, Default)]
pub struct HunkSplitter {
    filter: FileFilter,
}

impl HunkSplitter {
    pub fn new(filter: FileFilter) -> Self {
        Self { filter }
    }

    pub fn split(&self, diff: &str) -> Vec<DiffHunk> {
        let mut hunks = Vec::new();
        let mut current: Option<String> = None;
        let mut in_hunk = false;
        let mut buffer = String::new();

        for line in diff.lines() {
            if line.starts_with("diff --git") {
                flush(&mut hunks, current.take(), &mut buffer);
                current = header_path(line).filter(|path| self.filter.should_include(path));
                in_hunk = false;
                continue;
            }
            if current.is_none() {
                continue;
            }
            if line.starts_with("@@") {
                in_hunk = true;
                continue;
            }

            if in_hunk && (line.starts_with('+') || line.starts_with('-')) {
                buffer.push_str(line);
                buffer.push('\n');
            }
        }
        flush(&mut hunks, current, &mut buffer);

        hunks
    }
}

fn flush(hunks: &mut Vec<DiffHunk>, file: Option<String>, buffer: &mut String) {
    if let Some(file_path) = file
        && !buffer.is_empty()
    {
        hunks.push(DiffHunk {
            file_path,
            content: std::mem::take(buffer),
        });
    }
    buffer.clear();
}
