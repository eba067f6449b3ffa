//! Tab-separated persistence for the tidy dataset.
//!
//! Field escaping: `\` -> `\\`, TAB -> `\t`, LF -> `\n`, CR -> `\r`. Nothing
//! else is quoted. Booleans are written `True`/`False`; missing cells are empty.

use crate::dedupe::dedupe_by_id;
use crate::references::TidyRecord;
use crate::util::{append_with_backoff, create_with_backoff, open_with_backoff, replace_file_atomic_backoff};
use anyhow::{bail, Context, Result};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 6] = ["id", "created_at", "in_reply_to_ons", "repliedto_tweet", "quoted_tweet", "text"];
pub const DEFAULT_WRITE_BUFFER: usize = 64 * 1024;

pub fn escape_field(s: &str) -> Cow<'_, str> {
    if !s.contains(['\\', '\t', '\n', '\r']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Inverse of `escape_field`. Unknown escapes are kept verbatim.
pub fn unescape_field(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Cow::Owned(out)
}

fn format_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn opt_cell(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(unescape_field(s).into_owned()) }
}

/// Buffered TSV writer. Call `finish` to flush.
pub struct TsvWriter {
    path: PathBuf,
    w: Option<BufWriter<File>>,
}

impl TsvWriter {
    pub fn create(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = create_with_backoff(path)?;
        Ok(Self { path: path.to_path_buf(), w: Some(BufWriter::with_capacity(buf_bytes.max(8 * 1024), f)) })
    }

    pub fn append(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = append_with_backoff(path)?;
        Ok(Self { path: path.to_path_buf(), w: Some(BufWriter::with_capacity(buf_bytes.max(8 * 1024), f)) })
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.write_row(&HEADER)
    }

    pub fn write_record(&mut self, r: &TidyRecord) -> io::Result<()> {
        let row = [
            escape_field(&r.id),
            escape_field(&r.created_at),
            Cow::Borrowed(format_bool(r.in_reply_to_target)),
            escape_field(r.replied_to_tweet.as_deref().unwrap_or("")),
            escape_field(r.quoted_tweet.as_deref().unwrap_or("")),
            escape_field(&r.text),
        ];
        self.write_row(&row)
    }

    /// Terminate a final line left without a newline.
    fn end_line(&mut self) -> io::Result<()> {
        match &mut self.w {
            Some(w) => w.write_all(b"\n"),
            None => Ok(()),
        }
    }

    fn write_row<S: AsRef<str>>(&mut self, cells: &[S]) -> io::Result<()> {
        if let Some(w) = &mut self.w {
            for (i, c) in cells.iter().enumerate() {
                if i > 0 {
                    w.write_all(b"\t")?;
                }
                w.write_all(c.as_ref().as_bytes())?;
            }
            w.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// Line reader that validates the header and yields parsed rows.
pub struct TsvReader {
    path: PathBuf,
    rdr: BufReader<File>,
    line_no: usize,
    skipped: usize,
}

impl TsvReader {
    pub fn open(path: &Path) -> Result<Self> {
        let f = open_with_backoff(path).with_context(|| format!("open {}", path.display()))?;
        let mut me = Self { path: path.to_path_buf(), rdr: BufReader::new(f), line_no: 0, skipped: 0 };
        let mut first = String::new();
        if me.read_line(&mut first)? == 0 {
            bail!("{} is empty (no header)", path.display());
        }
        let got: Vec<&str> = first.split('\t').collect();
        if got != HEADER {
            bail!("{}: unexpected header {:?}", path.display(), got);
        }
        Ok(me)
    }

    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        buf.clear();
        let n = self.rdr.read_line(buf)?;
        if n == 0 { return Ok(0); }
        self.line_no += 1;
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') { buf.pop(); }
        }
        Ok(n)
    }

    /// Malformed rows skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Next well-formed row. Blank and malformed lines are skipped with a warning.
    pub fn next_record(&mut self) -> Result<Option<TidyRecord>> {
        let mut line = String::new();
        loop {
            if self.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if line.is_empty() {
                continue;
            }
            match parse_row(&line) {
                Some(r) => return Ok(Some(r)),
                None => {
                    self.skipped += 1;
                    tracing::warn!(path = %self.path.display(), line = self.line_no, "skipping malformed TSV row");
                }
            }
        }
    }
}

fn parse_row(line: &str) -> Option<TidyRecord> {
    let cells: Vec<&str> = line.split('\t').collect();
    if cells.len() != HEADER.len() || cells[0].is_empty() {
        return None;
    }
    Some(TidyRecord {
        id: unescape_field(cells[0]).into_owned(),
        created_at: unescape_field(cells[1]).into_owned(),
        in_reply_to_target: parse_bool(cells[2])?,
        replied_to_tweet: opt_cell(cells[3]),
        quoted_tweet: opt_cell(cells[4]),
        text: unescape_field(cells[5]).into_owned(),
    })
}

/// Read a whole dataset file.
pub fn read_dataset(path: &Path) -> Result<Vec<TidyRecord>> {
    read_dataset_counting(path).map(|(rows, _)| rows)
}

/// Read a whole dataset file, also returning how many malformed rows were skipped.
pub fn read_dataset_counting(path: &Path) -> Result<(Vec<TidyRecord>, usize)> {
    let mut rdr = TsvReader::open(path)?;
    let mut out = Vec::new();
    while let Some(r) = rdr.next_record()? {
        out.push(r);
    }
    Ok((out, rdr.skipped()))
}

/// True when the file is empty or its last byte is a newline.
fn ends_with_newline(path: &Path) -> io::Result<bool> {
    let mut f = open_with_backoff(path)?;
    let len = f.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    f.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    f.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Whether `write_dataset` created the file or appended to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Append,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteStats {
    pub mode: WriteMode,
    pub written: usize,
    pub skipped_duplicates: usize,
}

/// Create `path` with a header, or append to it without one. Ids already
/// present in the file (or repeated within `dataset`) are not written again.
/// An existing zero-length file is treated as new.
pub fn write_dataset(dataset: &[TidyRecord], path: &Path, buf_bytes: usize) -> Result<WriteStats> {
    let exists = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);

    let mut seen: HashSet<String> = HashSet::new();
    if exists {
        let mut rdr = TsvReader::open(path)?;
        while let Some(r) = rdr.next_record()? {
            seen.insert(r.id);
        }
    } else if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }

    let (fresh, skipped_duplicates) = dedupe_by_id(dataset, &mut seen);

    let (mode, mut w) = if exists {
        let terminated = ends_with_newline(path).with_context(|| format!("inspect {}", path.display()))?;
        let mut w = TsvWriter::append(path, buf_bytes).with_context(|| format!("append {}", path.display()))?;
        if !terminated {
            w.end_line()?;
        }
        (WriteMode::Append, w)
    } else {
        let mut w = TsvWriter::create(path, buf_bytes).with_context(|| format!("create {}", path.display()))?;
        w.write_header()?;
        (WriteMode::Create, w)
    };
    for r in &fresh {
        w.write_record(r)?;
    }
    w.finish()?;

    Ok(WriteStats { mode, written: fresh.len(), skipped_duplicates })
}

/// Write a complete file (header + rows) to a temp sibling and promote it over `path`.
pub fn replace_dataset(dataset: &[TidyRecord], path: &Path, buf_bytes: usize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".inprogress");
    let tmp = path.with_file_name(tmp_name);

    let mut w = TsvWriter::create(&tmp, buf_bytes).with_context(|| format!("create {}", tmp.display()))?;
    w.write_header()?;
    for r in dataset {
        w.write_record(r)?;
    }
    w.finish()?;
    replace_file_atomic_backoff(&tmp, path)
}
