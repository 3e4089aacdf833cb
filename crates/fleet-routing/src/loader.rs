//! Map and roster loaders.
//!
//! # File format
//!
//! Both files are sequences of brace/bracket terms, each terminated by `.`:
//!
//! ```text
//! % map: {{Name, {X, Y}}, [Neighbor, ...]}.
//! {{"Node1", {250,50}},["Node2","Node3"]}.
//! {{"Node2", {250,150}},["Node4"]}.
//!
//! % roster: {Id, Speed, StartNode}.
//! {1, 30, "Node1"}.
//! ```
//!
//! `%` starts a comment that runs to end of line.  Names may be quoted
//! strings or bare identifiers.  Records may span lines; errors report the
//! line on which the offending record starts.

use std::io::Read;
use std::path::Path;

use fleet_core::{Point2, VehicleId};

use crate::network::{NetworkGraph, NetworkGraphBuilder};
use crate::roster::{FleetRoster, VehicleSpec};
use crate::LoadError;

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a map file and build the weighted graph with `salt`.
pub fn load_network(path: &Path, salt: u64) -> Result<NetworkGraph, LoadError> {
    let file = std::fs::File::open(path)?;
    load_network_reader(file, salt)
}

/// Like [`load_network`] but accepts any `Read` source.
pub fn load_network_reader<R: Read>(mut reader: R, salt: u64) -> Result<NetworkGraph, LoadError> {
    let mut src = String::new();
    reader.read_to_string(&mut src)?;

    let mut builder = NetworkGraphBuilder::new();
    for (line, term) in parse_terms(&src)? {
        let (name, pos, neighbors) = node_record(term)
            .ok_or_else(|| syntax(line, "expected {{Name, {X, Y}}, [Neighbors]}"))?;
        builder.add_node(name.clone(), pos);
        for neighbor in neighbors {
            builder.add_link(name.clone(), neighbor);
        }
    }
    Ok(builder.build(salt))
}

/// Load a roster file and validate it against `network`.
pub fn load_roster(path: &Path, network: &NetworkGraph) -> Result<FleetRoster, LoadError> {
    let file = std::fs::File::open(path)?;
    load_roster_reader(file, network)
}

/// Like [`load_roster`] but accepts any `Read` source.
pub fn load_roster_reader<R: Read>(mut reader: R, network: &NetworkGraph) -> Result<FleetRoster, LoadError> {
    let mut src = String::new();
    reader.read_to_string(&mut src)?;

    let mut vehicles = Vec::new();
    for (line, term) in parse_terms(&src)? {
        let spec = vehicle_record(term)
            .ok_or_else(|| syntax(line, "expected {Id, Speed, StartNode}"))?;
        vehicles.push(spec);
    }
    Ok(FleetRoster::new(vehicles, network)?)
}

// ── Record shapes ─────────────────────────────────────────────────────────────

fn node_record(term: Term) -> Option<(String, Point2, Vec<String>)> {
    let [head, neighbors] = term.into_tuple::<2>()?;
    let [name, coords] = head.into_tuple::<2>()?;
    let [x, y] = coords.into_tuple::<2>()?;
    let pos = Point2::new(x.as_num()?, y.as_num()?);
    if !(pos.x.is_finite() && pos.y.is_finite()) {
        return None;
    }
    let neighbors = neighbors
        .into_list()?
        .into_iter()
        .map(Term::into_name)
        .collect::<Option<Vec<_>>>()?;
    Some((name.into_name()?, pos, neighbors))
}

fn vehicle_record(term: Term) -> Option<VehicleSpec> {
    let [id, speed, start] = term.into_tuple::<3>()?;
    let id = id.as_num()?;
    if id.fract() != 0.0 || !(0.0..=u32::MAX as f64).contains(&id) {
        return None;
    }
    Some(VehicleSpec::new(VehicleId(id as u32), speed.as_num()?, start.into_name()?))
}

fn syntax(line: usize, msg: &str) -> LoadError {
    LoadError::Syntax { line, msg: msg.to_owned() }
}

// ── Term parser ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Tuple(Vec<Term>),
    List(Vec<Term>),
    Str(String),
    Num(f64),
}

impl Term {
    fn into_tuple<const N: usize>(self) -> Option<[Term; N]> {
        match self {
            Term::Tuple(items) => items.try_into().ok(),
            _ => None,
        }
    }

    fn into_list(self) -> Option<Vec<Term>> {
        match self {
            Term::List(items) => Some(items),
            _ => None,
        }
    }

    fn into_name(self) -> Option<String> {
        match self {
            Term::Str(s) => Some(s),
            _ => None,
        }
    }

    fn as_num(&self) -> Option<f64> {
        match self {
            Term::Num(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(char),
    Close(char),
    Comma,
    Dot,
    Str(String),
    Num(f64),
}

/// Split `src` into `(line, token)` pairs.
fn tokenize(src: &str) -> Result<Vec<(usize, Token)>, LoadError> {
    let mut out = Vec::new();
    let mut chars = src.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '%' => {
                while chars.next_if(|&c| c != '\n').is_some() {}
            }
            '{' | '[' => out.push((line, Token::Open(c))),
            '}' | ']' => out.push((line, Token::Close(c))),
            ',' => out.push((line, Token::Comma)),
            '.' => out.push((line, Token::Dot)),
            '"' => {
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(esc) => s.push(esc),
                            None => return Err(syntax(line, "unterminated string")),
                        },
                        Some('\n') | None => return Err(syntax(line, "unterminated string")),
                        Some(ch) => s.push(ch),
                    }
                }
                out.push((line, Token::Str(s)));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut s = String::from(c);
                while let Some(&next) = chars.peek() {
                    let is_fraction_dot = next == '.' && {
                        // A '.' belongs to the number only when a digit follows;
                        // otherwise it terminates the record.
                        let mut look = chars.clone();
                        look.next();
                        look.peek().is_some_and(|d| d.is_ascii_digit())
                    };
                    if next.is_ascii_digit() || is_fraction_dot || matches!(next, 'e' | 'E') {
                        s.push(next);
                        chars.next();
                        if matches!(next, 'e' | 'E') {
                            if let Some(sign) = chars.next_if(|&c| c == '-' || c == '+') {
                                s.push(sign);
                            }
                        }
                    } else {
                        break;
                    }
                }
                let n = s
                    .parse::<f64>()
                    .map_err(|_| syntax(line, &format!("invalid number {s:?}")))?;
                out.push((line, Token::Num(n)));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut s = String::from(c);
                while let Some(ch) = chars.next_if(|&ch| ch.is_alphanumeric() || ch == '_') {
                    s.push(ch);
                }
                out.push((line, Token::Str(s)));
            }
            other => return Err(syntax(line, &format!("unexpected character {other:?}"))),
        }
    }
    Ok(out)
}

/// Parse every `.`-terminated term in `src`, tagged with its starting line.
fn parse_terms(src: &str) -> Result<Vec<(usize, Term)>, LoadError> {
    let tokens = tokenize(src)?;
    let mut pos = 0;
    let mut terms = Vec::new();
    while pos < tokens.len() {
        let line = tokens[pos].0;
        let term = parse_term(&tokens, &mut pos)?;
        match tokens.get(pos) {
            Some((_, Token::Dot)) => pos += 1,
            Some((l, _)) => return Err(syntax(*l, "expected '.' after record")),
            None => return Err(syntax(line, "record not terminated by '.'")),
        }
        terms.push((line, term));
    }
    Ok(terms)
}

fn parse_term(tokens: &[(usize, Token)], pos: &mut usize) -> Result<Term, LoadError> {
    let Some((line, token)) = tokens.get(*pos) else {
        let line = tokens.last().map_or(1, |(l, _)| *l);
        return Err(syntax(line, "unexpected end of input"));
    };
    *pos += 1;
    match token {
        Token::Str(s) => Ok(Term::Str(s.clone())),
        Token::Num(n) => Ok(Term::Num(*n)),
        Token::Open(open) => {
            let close = if *open == '{' { '}' } else { ']' };
            let mut items = Vec::new();
            if matches!(tokens.get(*pos), Some((_, Token::Close(c))) if *c == close) {
                *pos += 1;
            } else {
                loop {
                    items.push(parse_term(tokens, pos)?);
                    match tokens.get(*pos) {
                        Some((_, Token::Comma)) => *pos += 1,
                        Some((_, Token::Close(c))) if *c == close => {
                            *pos += 1;
                            break;
                        }
                        Some((l, _)) => return Err(syntax(*l, &format!("expected ',' or '{close}'"))),
                        None => return Err(syntax(*line, &format!("unclosed '{open}'"))),
                    }
                }
            }
            Ok(if *open == '{' { Term::Tuple(items) } else { Term::List(items) })
        }
        Token::Close(c) => Err(syntax(*line, &format!("unexpected '{c}'"))),
        Token::Comma => Err(syntax(*line, "unexpected ','")),
        Token::Dot => Err(syntax(*line, "unexpected '.'")),
    }
}
