//! Text capture of a controller session.
//!
//! One directive per line. Hex byte lines are operational register snapshots
//! that each feed one attention cycle; `startup`, `suspend` and `resume`
//! replay lifecycle notifications and `cover <n>` writes the cover toggle.
//! Everything after `#` is a comment.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Packet(Vec<u8>),
    Startup,
    Suspend,
    Resume,
    Cover(String),
}

#[derive(Debug, Clone, Default)]
pub struct Capture {
    pub directives: Vec<Directive>,
}

impl Capture {
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut directives = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            directives.push(parse_line(idx + 1, line)?);
        }
        Ok(Self { directives })
    }
}

fn parse_line(line_no: usize, line: &str) -> Result<Directive> {
    let mut words = line.split_whitespace();
    match words.next() {
        Some("startup") => Ok(Directive::Startup),
        Some("suspend") => Ok(Directive::Suspend),
        Some("resume") => Ok(Directive::Resume),
        Some("cover") => {
            let value = words.next().ok_or_else(|| Error::Capture {
                line: line_no,
                reason: "cover needs a value".to_string(),
            })?;
            Ok(Directive::Cover(value.to_string()))
        }
        _ => parse_hex(line_no, line).map(Directive::Packet),
    }
}

fn parse_hex(line_no: usize, line: &str) -> Result<Vec<u8>> {
    let digits: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if !digits.is_ascii() {
        return Err(Error::Capture {
            line: line_no,
            reason: "non-ASCII character in hex line".to_string(),
        });
    }
    if digits.len() % 2 != 0 {
        return Err(Error::Capture {
            line: line_no,
            reason: format!("odd number of hex digits ({})", digits.len()),
        });
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|e| Error::Capture {
                line: line_no,
                reason: format!("bad byte {:?}: {}", &digits[i..i + 2], e),
            })
        })
        .collect()
}
