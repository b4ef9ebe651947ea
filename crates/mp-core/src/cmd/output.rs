//! Captured output of a child process or file, with an optional line index.

use std::fs::File;
use std::io::{self, Read};
use std::ops::Range;
use std::path::Path;

/// Size of each read from a pipe or file.
pub const CHUNK_SIZE: usize = 4096;

/// Initial right-shift factor for sizing the line index. It is decremented
/// before first use, so the first allocation is `len >> 5` entries.
const INITIAL_SHIFT: u32 = 6;

/// How captured bytes are post-processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureFlags {
    /// Keep the raw buffer only; build no line index.
    pub no_arrays: bool,
    /// Index a private copy so the raw buffer keeps its newlines.
    pub no_assoc: bool,
}

impl CaptureFlags {
    pub const NONE: CaptureFlags = CaptureFlags {
        no_arrays: false,
        no_assoc: false,
    };
    pub const NO_ARRAYS: CaptureFlags = CaptureFlags {
        no_arrays: true,
        no_assoc: false,
    };
    pub const NO_ASSOC: CaptureFlags = CaptureFlags {
        no_arrays: false,
        no_assoc: true,
    };
}

/// Bytes read from one stream plus the spans of its lines.
///
/// By default lines are split in place: each `\n` in [`Output::buf`] is
/// overwritten with a NUL and the line spans point into that same buffer.
/// With [`CaptureFlags::no_assoc`] the split happens on a private copy and
/// `buf` is left exactly as read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    buf: Vec<u8>,
    split: Option<Vec<u8>>,
    lines: Vec<Range<usize>>,
}

impl Output {
    /// Build from raw bytes, indexing lines unless `flags.no_arrays`.
    pub fn from_bytes(buf: Vec<u8>, flags: CaptureFlags) -> Self {
        let mut out = Output {
            buf,
            split: None,
            lines: Vec::new(),
        };
        if flags.no_arrays || out.buf.is_empty() {
            return out;
        }
        if flags.no_assoc {
            let mut copy = out.buf.clone();
            out.lines = index_lines(&mut copy);
            out.split = Some(copy);
        } else {
            out.lines = index_lines(&mut out.buf);
        }
        out
    }

    /// The captured buffer.
    pub fn buf(&self) -> &[u8] {
        &self.buf
    }

    /// Captured length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of indexed lines (0 when built with `no_arrays`).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Bytes of line `i`, without its terminator.
    pub fn line(&self, i: usize) -> Option<&[u8]> {
        let backing = self.split.as_deref().unwrap_or(&self.buf);
        self.lines.get(i).map(|span| &backing[span.clone()])
    }

    /// Line `i` as text, lossily decoded.
    pub fn line_str(&self, i: usize) -> Option<std::borrow::Cow<'_, str>> {
        self.line(i).map(String::from_utf8_lossy)
    }

    /// Length of line `i`.
    pub fn line_len(&self, i: usize) -> Option<usize> {
        self.lines.get(i).map(|span| span.len())
    }

    pub fn lines(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.lines.len()).filter_map(move |i| self.line(i))
    }

    /// Take the raw buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Split `buf` at `\n`, replacing each terminator with NUL.
///
/// A final segment without a terminator still counts as a line. The index
/// grows in proportion to the buffer (`len >> shift`, shift shrinking on
/// each growth) instead of one entry at a time.
fn index_lines(buf: &mut [u8]) -> Vec<Range<usize>> {
    let len = buf.len();
    let mut lines: Vec<Range<usize>> = Vec::new();
    let mut shift = INITIAL_SHIFT;
    let mut i = 0;

    while i < len {
        if lines.len() >= lines.capacity() {
            let mut target = 0;
            while target <= lines.len() && shift > 0 {
                shift -= 1;
                target = len >> shift;
            }
            lines.reserve_exact(target.max(lines.len() + 1) - lines.len());
        }

        let start = i;
        while i < len && buf[i] != b'\n' {
            i += 1;
        }
        if i < len {
            buf[i] = 0;
        }
        lines.push(start..i);
        i += 1;
    }

    lines
}

/// Read `reader` to EOF in [`CHUNK_SIZE`] chunks, retrying interrupted reads.
pub fn fetch_output<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(buf),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Capture a regular file the same way a child's stdout is captured.
pub fn read_file_output(path: &Path, flags: CaptureFlags) -> io::Result<Output> {
    let mut file = File::open(path)?;
    let bytes = fetch_output(&mut file)?;
    Ok(Output::from_bytes(bytes, flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lines_of(out: &Output) -> Vec<String> {
        (0..out.line_count())
            .map(|i| out.line_str(i).expect("line").into_owned())
            .collect()
    }

    // ── Line indexing ───────────────────────────────────────────────

    #[test]
    fn empty_buffer_has_no_lines() {
        let out = Output::from_bytes(Vec::new(), CaptureFlags::NONE);
        assert_eq!(out.line_count(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn trailing_newline_does_not_add_a_line() {
        let out = Output::from_bytes(b"one\ntwo\n".to_vec(), CaptureFlags::NONE);
        assert_eq!(lines_of(&out), ["one", "two"]);
        assert_eq!(out.line_len(1), Some(3));
    }

    #[test]
    fn unterminated_last_line_counts() {
        let out = Output::from_bytes(b"one\ntwo".to_vec(), CaptureFlags::NONE);
        assert_eq!(lines_of(&out), ["one", "two"]);
    }

    #[test]
    fn blank_lines_are_kept() {
        let out = Output::from_bytes(b"a\n\n\nb\n".to_vec(), CaptureFlags::NONE);
        assert_eq!(lines_of(&out), ["a", "", "", "b"]);
    }

    #[test]
    fn many_lines_grow_the_index() {
        let text: String = (0..5000).map(|i| format!("{i}\n")).collect();
        let out = Output::from_bytes(text.into_bytes(), CaptureFlags::NONE);
        assert_eq!(out.line_count(), 5000);
        assert_eq!(out.line_str(4999).as_deref(), Some("4999"));
    }

    #[test]
    fn single_byte_lines() {
        let out = Output::from_bytes(b"\n\n".to_vec(), CaptureFlags::NONE);
        assert_eq!(lines_of(&out), ["", ""]);
    }

    // ── Flags ───────────────────────────────────────────────────────

    #[test]
    fn default_split_rewrites_buffer() {
        let out = Output::from_bytes(b"x\ny\n".to_vec(), CaptureFlags::NONE);
        assert_eq!(out.buf(), b"x\0y\0");
    }

    #[test]
    fn no_assoc_leaves_buffer_intact() {
        let out = Output::from_bytes(b"x\ny\n".to_vec(), CaptureFlags::NO_ASSOC);
        assert_eq!(out.buf(), b"x\ny\n");
        assert_eq!(lines_of(&out), ["x", "y"]);
    }

    #[test]
    fn no_arrays_skips_index() {
        let out = Output::from_bytes(b"x\ny\n".to_vec(), CaptureFlags::NO_ARRAYS);
        assert_eq!(out.line_count(), 0);
        assert_eq!(out.len(), 4);
        assert_eq!(out.buf(), b"x\ny\n");
        assert!(out.line(0).is_none());
    }

    // ── Reading ─────────────────────────────────────────────────────

    struct Interrupting<'a> {
        data: &'a [u8],
        interrupted: bool,
    }

    impl Read for Interrupting<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn fetch_retries_interrupted_reads() {
        let mut r = Interrupting {
            data: b"abc",
            interrupted: false,
        };
        assert_eq!(fetch_output(&mut r).unwrap(), b"abc");
    }

    #[test]
    fn fetch_spans_many_chunks() {
        let data = vec![b'z'; CHUNK_SIZE * 3 + 17];
        let got = fetch_output(&mut data.as_slice()).unwrap();
        assert_eq!(got.len(), data.len());
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn fetch_propagates_read_errors() {
        assert!(fetch_output(&mut Broken).is_err());
    }

    #[test]
    fn read_file_output_indexes_lines() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "first").expect("write");
        writeln!(file, "second").expect("write");
        let out = read_file_output(file.path(), CaptureFlags::NONE).expect("read");
        assert_eq!(lines_of(&out), ["first", "second"]);
    }

    #[test]
    fn read_file_output_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(read_file_output(&dir.path().join("absent"), CaptureFlags::NONE).is_err());
    }
}
