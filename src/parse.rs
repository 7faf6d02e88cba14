use crate::ScriptError;

/// One parsed, executable script step.
///
/// Each variant carries exactly the payload its command requires, so a
/// constructed instruction can never pair a command with the wrong argument
/// shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `p`/`pN` — print up to N bytes from the cursor. `None` means no count
    /// was given and the default applies.
    Print(Option<u64>),
    /// `lN` — seek to the start of line N (1-indexed).
    GotoLine(u64),
    /// `bN` — seek to absolute byte offset N.
    GotoByte(u64),
    /// `e/str/` — read and compare bytes at the cursor.
    Expect(Vec<u8>),
    /// `w/str/` — write bytes at the cursor.
    Write(Vec<u8>),
    /// `q` — stop executing; overall success.
    Quit,
}

/// Parse a full script into its instruction sequence.
///
/// Command letters are case-insensitive. Whitespace is insignificant except
/// that a newline terminates a `#` comment. Append order is execution order;
/// if the script does not end with an explicit `q`, a terminal [`Instruction::Quit`]
/// is appended. Parsing is all-or-nothing — the first error aborts with no
/// partial sequence.
pub fn parse_script(source: &str) -> Result<Vec<Instruction>, ScriptError> {
    let src = source.as_bytes();
    let mut program = Vec::new();
    let mut idx = 0usize;

    while idx < src.len() {
        match src[idx] {
            b'p' | b'P' => {
                idx += 1;
                program.push(Instruction::Print(parse_number(src, &mut idx)?));
            }
            b'b' | b'B' => {
                let cmd = src[idx] as char;
                idx += 1;
                program.push(Instruction::GotoByte(require_number(src, &mut idx, cmd)?));
            }
            b'l' | b'L' => {
                let cmd = src[idx] as char;
                idx += 1;
                program.push(Instruction::GotoLine(require_number(src, &mut idx, cmd)?));
            }
            b'e' | b'E' => {
                let cmd = src[idx] as char;
                idx += 1;
                program.push(Instruction::Expect(parse_delimited(src, &mut idx, cmd)?));
            }
            b'w' | b'W' => {
                let cmd = src[idx] as char;
                idx += 1;
                program.push(Instruction::Write(parse_delimited(src, &mut idx, cmd)?));
            }
            b'q' | b'Q' => {
                idx += 1;
                program.push(Instruction::Quit);
            }
            b'#' => skip_comment(src, &mut idx),
            b' ' | b'\t' | b'\n' => idx += 1,
            other => {
                return Err(ScriptError::InvalidCharacter {
                    ch: other as char,
                    offset: idx,
                })
            }
        }
    }

    // End of script is an implicit quit.
    if program.last() != Some(&Instruction::Quit) {
        program.push(Instruction::Quit);
    }
    Ok(program)
}

/// Consume a maximal run of ASCII digits at `idx` as a base-10 number.
/// `None` if there are no digits at `idx`.
fn parse_number(src: &[u8], idx: &mut usize) -> Result<Option<u64>, ScriptError> {
    let start = *idx;
    let mut value: u64 = 0;
    while *idx < src.len() && src[*idx].is_ascii_digit() {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(src[*idx] - b'0')))
            .ok_or(ScriptError::NumberOutOfRange { offset: start })?;
        *idx += 1;
    }
    if *idx == start {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

fn require_number(src: &[u8], idx: &mut usize, cmd: char) -> Result<u64, ScriptError> {
    match parse_number(src, idx)? {
        Some(n) => Ok(n),
        None => Err(ScriptError::MissingNumber { cmd, offset: *idx }),
    }
}

/// Consume a delimited string argument at `idx`.
///
/// The first byte is the delimiter — canonically `/`, but any non-whitespace
/// byte is accepted and defines its own closing match. Content runs literally
/// up to the next occurrence of that byte; there is no escape mechanism, so
/// the content can never contain the delimiter itself.
fn parse_delimited(src: &[u8], idx: &mut usize, cmd: char) -> Result<Vec<u8>, ScriptError> {
    let open = *idx;
    let delim = match src.get(*idx) {
        Some(&d) if !d.is_ascii_whitespace() => d,
        _ => return Err(ScriptError::MissingDelimiter { cmd, offset: *idx }),
    };
    *idx += 1;

    let start = *idx;
    while *idx < src.len() {
        if src[*idx] == delim {
            let content = src[start..*idx].to_vec();
            *idx += 1;
            return Ok(content);
        }
        *idx += 1;
    }
    Err(ScriptError::UnterminatedString { offset: open })
}

/// Consume a `#` comment up to (not past) the terminating newline.
fn skip_comment(src: &[u8], idx: &mut usize) {
    while *idx < src.len() && src[*idx] != b'\n' {
        *idx += 1;
    }
}
