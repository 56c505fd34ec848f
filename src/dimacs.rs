//! DIMACS CNF reader, gzip-aware. Adapted from the teacher's
//! `sat/dimacs.rs`: same character-stream parser shape, modernised to
//! snake_case and `io::Result`-based `?` propagation, and simplified since
//! this format's variables are dense `1..=n` (no sparse id remapping needed).

use std::io::Read;
use std::{fs, io, path};

use flate2::read::GzDecoder;

use crate::formula::{Lit, Var};

pub struct ParsedCnf {
    pub num_vars: usize,
    pub clauses: Vec<Vec<Lit>>,
}

pub fn parse_file<P: AsRef<path::Path>>(path: P, strict: bool) -> io::Result<ParsedCnf> {
    let bytes = fs::read(path)?;

    let mut text = String::new();
    let mut gz = GzDecoder::new(&bytes[..]);
    if gz.read_to_string(&mut text).is_err() {
        text = String::from_utf8_lossy(&bytes).into_owned();
    }

    parse_str(&text, strict)
}

pub fn parse_str(text: &str, strict: bool) -> io::Result<ParsedCnf> {
    let mut p = DimacsParser::new(text);
    p.next();
    p.parse(strict)
}

fn err(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

struct DimacsParser<'p> {
    reader: std::str::Chars<'p>,
    cur: Option<char>,
    max_var_seen: usize,
    clauses_seen: usize,
}

impl<'p> DimacsParser<'p> {
    fn new(text: &'p str) -> Self {
        DimacsParser {
            reader: text.chars(),
            cur: None,
            max_var_seen: 0,
            clauses_seen: 0,
        }
    }

    fn parse(&mut self, strict: bool) -> io::Result<ParsedCnf> {
        let mut num_vars = None;
        let mut num_clauses = None;
        let mut clauses = Vec::new();

        loop {
            self.skip_whitespace();
            match self.cur {
                Some('c') => self.skip_line(),
                Some('p') if num_vars.is_none() => {
                    self.consume("p cnf")?;
                    num_vars = Some(self.next_uint()?);
                    num_clauses = Some(self.next_uint()?);
                }
                None => break,
                _ if num_vars.is_none() => {
                    return Err(err("PARSE ERROR! expected 'p cnf <vars> <clauses>' header"));
                }
                _ => {
                    let raw = self.parse_clause()?;
                    let lits: Vec<Lit> = raw
                        .into_iter()
                        .map(|id| Var::from_index((id.unsigned_abs() - 1) as usize).lit(id < 0))
                        .collect();
                    clauses.push(lits);
                }
            }
        }

        let num_vars = num_vars.ok_or_else(|| err("PARSE ERROR! missing 'p cnf' header"))?;
        let num_clauses = num_clauses.unwrap();

        if strict {
            if num_clauses != self.clauses_seen {
                return Err(err(format!(
                    "PARSE ERROR! DIMACS header mismatch: {} clauses declared, {} found",
                    num_clauses, self.clauses_seen
                )));
            }
            if num_vars < self.max_var_seen {
                return Err(err(format!(
                    "PARSE ERROR! DIMACS header mismatch: {} vars declared, variable {} referenced",
                    num_vars, self.max_var_seen
                )));
            }
        }

        Ok(ParsedCnf {
            num_vars: num_vars.max(self.max_var_seen),
            clauses,
        })
    }

    fn parse_clause(&mut self) -> io::Result<Vec<i32>> {
        let mut lits = Vec::new();
        loop {
            let lit = self.next_int()?;
            if lit == 0 {
                self.clauses_seen += 1;
                return Ok(lits);
            }
            self.max_var_seen = self.max_var_seen.max(lit.unsigned_abs() as usize);
            lits.push(lit);
        }
    }

    fn next(&mut self) {
        self.cur = self.reader.next();
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.cur, Some(c) if c.is_whitespace()) {
            self.next();
        }
    }

    fn skip_line(&mut self) {
        loop {
            match self.cur {
                None => break,
                Some('\n') => {
                    self.next();
                    break;
                }
                _ => self.next(),
            }
        }
    }

    fn consume(&mut self, target: &str) -> io::Result<()> {
        for tc in target.chars() {
            match self.cur {
                Some(c) if c == tc => self.next(),
                _ => return Err(err(format!("PARSE ERROR! expected '{}'", target))),
            }
        }
        Ok(())
    }

    fn read_uint_body(&mut self) -> io::Result<usize> {
        let mut len = 0usize;
        let mut value = 0usize;
        loop {
            match self.cur.and_then(|c| c.to_digit(10)) {
                Some(d) => {
                    value = value * 10 + d as usize;
                    len += 1;
                    self.next();
                }
                _ if len > 0 => return Ok(value),
                _ => return Err(err("PARSE ERROR! integer expected")),
            }
        }
    }

    fn next_int(&mut self) -> io::Result<i32> {
        self.skip_whitespace();
        let sign = match self.cur {
            Some('+') => {
                self.next();
                1
            }
            Some('-') => {
                self.next();
                -1
            }
            _ => 1,
        };
        let val = self.read_uint_body()?;
        Ok(sign * val as i32)
    }

    fn next_uint(&mut self) -> io::Result<usize> {
        self.skip_whitespace();
        if self.cur == Some('+') {
            self.next();
        }
        self.read_uint_body()
    }
}

/// Writes a satisfying assignment as DIMACS expects on stdout: one line of
/// signed variable ids terminated by `0`.
pub fn write_model<W: io::Write>(out: &mut W, model: &[Lit]) -> io::Result<()> {
    for &lit in model {
        let id = lit.var().index() as i32 + 1;
        write!(out, "{} ", if lit.sign() { -id } else { id })?;
    }
    writeln!(out, "0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_clauses() {
        let cnf = parse_str("c a comment\np cnf 3 2\n1 2 0\n-1 3 0\n", true).unwrap();
        assert_eq!(cnf.num_vars, 3);
        assert_eq!(cnf.clauses.len(), 2);
    }

    #[test]
    fn strict_mode_rejects_clause_count_mismatch() {
        let result = parse_str("p cnf 2 2\n1 2 0\n", true);
        assert!(result.is_err());
    }

    #[test]
    fn zero_clause_formula_parses_with_only_vars_declared() {
        let cnf = parse_str("p cnf 2 0\n", true).unwrap();
        assert_eq!(cnf.num_vars, 2);
        assert!(cnf.clauses.is_empty());
    }
}
