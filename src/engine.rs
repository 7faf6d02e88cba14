use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::parse::Instruction;
use crate::EditError;

/// Byte count used by `p` when the script supplies no count (or zero).
pub const DEFAULT_PRINT_LEN: u64 = 100;

/// Chunk size for the forward scan `l` performs when counting newlines.
const LINE_SCAN_CHUNK: usize = 4096;

/// Execution context for one run: the open file whose seek position is the
/// script's cursor, plus a grow-only scratch buffer reused across reads.
///
/// The scratch buffer carries no state between instructions — every read
/// overwrites it. It only ever grows, so a long script settles into a single
/// allocation.
pub struct Session<F> {
    file: F,
    scratch: Vec<u8>,
}

impl<F: Read + Write + Seek> Session<F> {
    pub fn new(file: F) -> Self {
        Self {
            file,
            scratch: Vec::new(),
        }
    }

    /// Give the file handle back, cursor wherever the last instruction left it.
    pub fn into_inner(self) -> F {
        self.file
    }

    /// Execute `program` strictly in order against the file.
    ///
    /// Stops at the first failing instruction or at `q`; a `q` reached without
    /// prior failure is overall success and later instructions are never
    /// evaluated. `p` payloads are written to `out`, one single-quoted line
    /// each. On failure the cursor is not rolled back — it reflects exactly
    /// the bytes consumed or produced before the failure was detected.
    pub fn run(&mut self, program: &[Instruction], out: &mut impl Write) -> Result<(), EditError> {
        for instruction in program {
            match instruction {
                Instruction::Print(count) => self.eval_print(*count, out)?,
                Instruction::GotoByte(offset) => self.eval_goto_byte(*offset)?,
                Instruction::GotoLine(line) => self.eval_goto_line(*line)?,
                Instruction::Expect(expected) => self.eval_expect(expected)?,
                Instruction::Write(data) => self.eval_write(data)?,
                Instruction::Quit => break,
            }
        }
        Ok(())
    }

    fn eval_print(&mut self, count: Option<u64>, out: &mut impl Write) -> Result<(), EditError> {
        let want = match count {
            Some(0) | None => DEFAULT_PRINT_LEN,
            Some(n) => n,
        } as usize;
        self.grow_scratch(want);
        // Reading fewer than `want` bytes at end of file is not an error.
        let nr = read_up_to(&mut self.file, &mut self.scratch[..want])?;
        let payload = String::from_utf8_lossy(&self.scratch[..nr]);
        writeln!(out, "'{payload}'")?;
        Ok(())
    }

    fn eval_goto_byte(&mut self, offset: u64) -> Result<(), EditError> {
        // Seeking past end of file is permitted by the Seek contract: a later
        // read returns nothing, a later write extends the file.
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Seek to the start of 1-indexed `line`, scanning for bare `\n`
    /// boundaries from the start of the file. Line n exists iff the file
    /// contains at least n-1 newlines; otherwise fails, leaving the cursor
    /// wherever the scan stopped.
    fn eval_goto_line(&mut self, line: u64) -> Result<(), EditError> {
        if line == 0 {
            return Err(EditError::LineOutOfRange { line });
        }
        self.file.seek(SeekFrom::Start(0))?;
        if line == 1 {
            return Ok(());
        }

        self.grow_scratch(LINE_SCAN_CHUNK);
        let mut offset: u64 = 0;
        let mut remaining = line - 1;
        loop {
            let nr = match self.file.read(&mut self.scratch[..LINE_SCAN_CHUNK]) {
                Ok(0) => return Err(EditError::LineOutOfRange { line }),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            for (i, &b) in self.scratch[..nr].iter().enumerate() {
                if b == b'\n' {
                    remaining -= 1;
                    if remaining == 0 {
                        self.file.seek(SeekFrom::Start(offset + i as u64 + 1))?;
                        return Ok(());
                    }
                }
            }
            offset += nr as u64;
        }
    }

    fn eval_expect(&mut self, expected: &[u8]) -> Result<(), EditError> {
        let len = expected.len();
        self.grow_scratch(len);
        // The cursor advances by the bytes actually read whether or not the
        // comparison succeeds.
        let nr = read_up_to(&mut self.file, &mut self.scratch[..len])?;
        if nr != len {
            return Err(EditError::ShortRead {
                expected: len,
                actual: nr,
            });
        }
        if &self.scratch[..len] != expected {
            return Err(EditError::ExpectMismatch {
                expected: String::from_utf8_lossy(expected).into_owned(),
                actual: String::from_utf8_lossy(&self.scratch[..len]).into_owned(),
            });
        }
        Ok(())
    }

    fn eval_write(&mut self, data: &[u8]) -> Result<(), EditError> {
        self.file.write_all(data)?;
        Ok(())
    }

    fn grow_scratch(&mut self, len: usize) {
        if self.scratch.len() < len {
            self.scratch.resize(len, 0);
        }
    }
}

/// Read until `buf` is full or the source is exhausted. Unlike
/// `read_exact`, a short count is reported, not an error.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn run_on(content: &[u8], program: &[Instruction]) -> (Result<(), EditError>, Cursor<Vec<u8>>, Vec<u8>) {
        let mut session = Session::new(Cursor::new(content.to_vec()));
        let mut out = Vec::new();
        let res = session.run(program, &mut out);
        (res, session.into_inner(), out)
    }

    #[test]
    fn write_then_verify_round_trips() {
        let program = vec![
            Instruction::GotoByte(2),
            Instruction::Write(b"hello".to_vec()),
            Instruction::GotoByte(2),
            Instruction::Expect(b"hello".to_vec()),
            Instruction::Quit,
        ];
        let (res, file, _) = run_on(b"xxxxxxxxxx", &program);
        res.unwrap();
        assert_eq!(file.into_inner(), b"xxhelloxxx");
    }

    #[test]
    fn print_without_count_prints_remaining_bytes() {
        let (res, _, out) = run_on(b"hi", &[Instruction::Print(None), Instruction::Quit]);
        res.unwrap();
        assert_eq!(out, b"'hi'\n");
    }

    #[test]
    fn print_zero_count_uses_default() {
        // 0 means "no argument" in the language, so the 100-byte default applies.
        let (res, _, out) = run_on(b"abc", &[Instruction::Print(Some(0))]);
        res.unwrap();
        assert_eq!(out, b"'abc'\n");
    }

    #[test]
    fn print_advances_cursor_by_bytes_read() {
        let program = vec![
            Instruction::Print(Some(3)),
            Instruction::Expect(b"def".to_vec()),
        ];
        let (res, _, out) = run_on(b"abcdef", &program);
        res.unwrap();
        assert_eq!(out, b"'abc'\n");
    }

    #[test]
    fn expect_mismatch_reports_both_sides_and_advances_cursor() {
        let (res, file, _) = run_on(b"xyzrest", &[Instruction::Expect(b"abc".to_vec())]);
        match res.unwrap_err() {
            EditError::ExpectMismatch { expected, actual } => {
                assert_eq!(expected, "abc");
                assert_eq!(actual, "xyz");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
        // Cursor sits exactly after the 3 bytes that were read.
        assert_eq!(file.position(), 3);
    }

    #[test]
    fn expect_short_read_reports_counts() {
        let (res, file, _) = run_on(b"ab", &[Instruction::Expect(b"abc".to_vec())]);
        match res.unwrap_err() {
            EditError::ShortRead { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected short read, got {other:?}"),
        }
        assert_eq!(file.position(), 2);
    }

    #[test]
    fn goto_byte_past_eof_then_write_extends_file() {
        let program = vec![
            Instruction::GotoByte(5),
            Instruction::Write(b"XY".to_vec()),
        ];
        let (res, file, _) = run_on(b"abc", &program);
        res.unwrap();
        assert_eq!(file.into_inner(), b"abc\0\0XY");
    }

    #[test]
    fn goto_line_seeks_to_line_starts() {
        let content = b"a\nbb\nccc\n";
        for (line, offset) in [(1u64, 0u64), (2, 2), (3, 5), (4, 9)] {
            let (res, file, _) = run_on(content, &[Instruction::GotoLine(line)]);
            res.unwrap();
            assert_eq!(file.position(), offset, "line {line}");
        }
    }

    #[test]
    fn goto_line_past_last_line_fails() {
        let (res, _, _) = run_on(b"a\nbb\nccc\n", &[Instruction::GotoLine(5)]);
        assert!(matches!(res, Err(EditError::LineOutOfRange { line: 5 })));
    }

    #[test]
    fn goto_line_zero_fails() {
        let (res, _, _) = run_on(b"a\n", &[Instruction::GotoLine(0)]);
        assert!(matches!(res, Err(EditError::LineOutOfRange { line: 0 })));
    }

    #[test]
    fn goto_line_then_print_reads_that_line() {
        let program = vec![Instruction::GotoLine(2), Instruction::Print(Some(2))];
        let (res, _, out) = run_on(b"a\nbb\nccc\n", &program);
        res.unwrap();
        assert_eq!(out, b"'bb'\n");
    }

    #[test]
    fn quit_stops_evaluation_of_later_instructions() {
        let program = vec![
            Instruction::Quit,
            Instruction::Expect(b"neverseen".to_vec()),
        ];
        let (res, file, _) = run_on(b"short", &program);
        res.unwrap();
        assert_eq!(file.position(), 0);
    }

    #[test]
    fn first_failure_short_circuits() {
        let program = vec![
            Instruction::Expect(b"nope".to_vec()),
            Instruction::Write(b"XXXX".to_vec()),
        ];
        let (res, file, _) = run_on(b"data", &program);
        assert!(res.is_err());
        // The write after the failed expect never ran.
        assert_eq!(file.into_inner(), b"data");
    }

    #[test]
    fn print_payload_is_lossy_for_non_utf8() {
        let (res, _, out) = run_on(&[0xff, 0xfe], &[Instruction::Print(Some(2))]);
        res.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with('\'') && text.ends_with("'\n"));
    }
}
