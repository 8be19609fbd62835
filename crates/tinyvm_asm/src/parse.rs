//! Stage 1 (line classification, label collection, data image assembly) and
//! stage 2 (argument type-checking and label resolution) of the assembler.
//!
//! Grounded on the reference translator's `translate_stage_1`/
//! `translate_stage_2`: a single pass over source lines builds a symbolic
//! command list and a flat data image while recording label addresses: a
//! second pass intersects each argument's candidate types against the
//! mnemonic's template and substitutes resolved label addresses.

use std::collections::HashMap;

use crate::isa::{self, ArgKind, DATA_SIZE, CODE_SIZE};
use crate::ir::{DataItem, Line, RawArg, RawCommand, ResolvedArg, ResolvedOperand, Section};
use crate::lex::{Lexer, Token, TokenKind};
use crate::Error;

pub struct ParsedCommand {
    pub opcode: isa::Opcode,
    pub args: Vec<ResolvedOperand>,
    pub line: usize,
}

pub struct ParsedProgram {
    pub data: Vec<u32>,
    pub code: Vec<ParsedCommand>,
    pub entry_point: u32,
}

struct Stage1 {
    section: Section,
    data: Vec<DataItem>,
    data_address: u32,
    data_labels: HashMap<String, u32>,
    code: Vec<RawCommand>,
    code_address: u32,
    code_labels: HashMap<String, u32>,
    entry_point: Option<u32>,
}

fn split_lines(tokens: Vec<Token>) -> Vec<(Vec<Token>, usize)> {
    let mut lines = Vec::new();
    let mut current = Vec::new();
    let mut line_no = 1;
    for tok in tokens {
        match tok.kind {
            TokenKind::Newline => {
                lines.push((std::mem::take(&mut current), line_no));
                line_no = tok.line + 1;
            }
            _ => current.push(tok),
        }
    }
    if !current.is_empty() {
        lines.push((current, line_no));
    }
    lines
}

fn parse_raw_arg(tokens: &[Token], start: usize) -> Result<(RawArg, usize), Error> {
    match &tokens[start].kind {
        TokenKind::LBracket => {
            let (inner, next) = parse_raw_arg(tokens, start + 1)?;
            match tokens.get(next).map(|t| &t.kind) {
                Some(TokenKind::RBracket) => Ok((RawArg::Indirect(Box::new(inner)), next + 1)),
                _ => Err(Error { line: tokens[start].line, message: "unterminated '['".into() }),
            }
        }
        TokenKind::Ident(name) => Ok((RawArg::Ident(name.clone()), start + 1)),
        TokenKind::Number(n) => Ok((RawArg::Number(*n), start + 1)),
        other => Err(Error {
            line: tokens[start].line,
            message: format!("expected an operand, found {other:?}"),
        }),
    }
}

fn parse_args(tokens: &[Token], mut pos: usize, line: usize) -> Result<Vec<RawArg>, Error> {
    let mut args = Vec::new();
    if pos >= tokens.len() {
        return Ok(args);
    }
    loop {
        let (arg, next) = parse_raw_arg(tokens, pos)?;
        args.push(arg);
        pos = next;
        match tokens.get(pos).map(|t| &t.kind) {
            Some(TokenKind::Comma) => pos += 1,
            Some(other) => {
                return Err(Error { line, message: format!("unexpected token {other:?} after operand") })
            }
            None => break,
        }
    }
    Ok(args)
}

impl Stage1 {
    fn new() -> Self {
        Stage1 {
            section: Section::Data,
            data: Vec::new(),
            data_address: 0,
            data_labels: HashMap::new(),
            code: Vec::new(),
            code_address: 0,
            code_labels: HashMap::new(),
            entry_point: None,
        }
    }

    fn classify(&self, tokens: &[Token]) -> Line {
        if tokens.is_empty() {
            return Line::Empty;
        }
        if tokens.len() == 2 {
            if let (TokenKind::Ident(name), TokenKind::Colon) = (&tokens[0].kind, &tokens[1].kind) {
                return Line::Label(name.clone());
            }
        }
        if matches!(self.section, Section::Text) {
            return Line::Command(RawCommand {
                mnemonic: String::new(),
                args: Vec::new(),
                line: 0,
            });
        }
        if let TokenKind::Ident(name) = &tokens[0].kind {
            if name == "section" {
                return Line::Section(Section::Data);
            }
            if matches!(name.as_str(), "db" | "dd" | "qword") {
                return Line::Data(Vec::new());
            }
        }
        Line::Command(RawCommand { mnemonic: "__unknown__".into(), args: Vec::new(), line: 0 })
    }

    fn process_line(&mut self, tokens: Vec<Token>, line: usize) -> Result<(), Error> {
        match self.classify(&tokens) {
            Line::Empty => {}
            Line::Label(name) => {
                match self.section {
                    Section::Text => {
                        if self.code_labels.contains_key(&name) {
                            return Err(Error { line, message: format!("duplicate label '{name}'") });
                        }
                        if name == "_start" {
                            self.entry_point = Some(self.code_address);
                        }
                        self.code_labels.insert(name, self.code_address);
                    }
                    Section::Data => {
                        if self.data_labels.contains_key(&name) {
                            return Err(Error { line, message: format!("duplicate label '{name}'") });
                        }
                        self.data_labels.insert(name, self.data_address);
                    }
                }
            }
            Line::Section(_) => {
                let ident = match &tokens.last().map(|t| &t.kind) {
                    Some(TokenKind::Ident(s)) => s.clone(),
                    _ => return Err(Error { line, message: "malformed section directive".into() }),
                };
                self.section = match ident.as_str() {
                    ".text" => Section::Text,
                    ".data" => Section::Data,
                    other => return Err(Error { line, message: format!("unknown section '{other}'") }),
                };
            }
            Line::Data(_) => {
                // tokens[0] is the directive keyword (db/dd/qword); the rest
                // is a comma-separated mix of number literals and string
                // literals. Matching the reference translator, every number
                // is appended to the data image first, in source order, then
                // every string's characters follow, string by string.
                for tok in tokens.iter().skip(1) {
                    if let TokenKind::Number(n) = tok.kind {
                        self.data.push(DataItem::Word(n));
                        self.data_address += 1;
                    } else if !matches!(tok.kind, TokenKind::Comma | TokenKind::Str(_)) {
                        return Err(Error { line, message: "expected a number or string in data directive".into() });
                    }
                }
                for tok in &tokens {
                    if let TokenKind::Str(s) = &tok.kind {
                        for ch in s.chars() {
                            self.data.push(DataItem::Chars(ch.to_string()));
                            self.data_address += 1;
                        }
                    }
                }
            }
            Line::Command(_) => {
                let TokenKind::Ident(mnemonic) = &tokens[0].kind else {
                    return Err(Error { line, message: "expected an instruction mnemonic".into() });
                };
                let args = parse_args(&tokens, 1, line)?;
                self.code.push(RawCommand { mnemonic: mnemonic.to_lowercase(), args, line });
                self.code_address += 1;
            }
        }
        Ok(())
    }
}

fn arg_candidates(
    arg: &RawArg,
    data_labels: &HashMap<String, u32>,
    code_labels: &HashMap<String, u32>,
) -> Result<Vec<(ArgKind, ResolvedArg)>, String> {
    match arg {
        RawArg::Indirect(inner) => arg_candidates(inner, data_labels, code_labels),
        RawArg::Ident(name) => {
            if let Some(reg) = isa::is_register_name(name) {
                return Ok(vec![(ArgKind::Register, ResolvedArg::Register(reg))]);
            }
            if let Some(&addr) = data_labels.get(name) {
                return Ok(vec![(ArgKind::DataLabel, ResolvedArg::Value(addr))]);
            }
            if let Some(&addr) = code_labels.get(name) {
                return Ok(vec![(ArgKind::CodeLabel, ResolvedArg::Value(addr))]);
            }
            Err(format!("undefined name '{name}'"))
        }
        RawArg::Number(n) => {
            let value = *n as u32;
            let mut candidates = vec![(ArgKind::Constant, ResolvedArg::Value(value))];
            if *n >= 0 && (*n as usize) < DATA_SIZE {
                candidates.push((ArgKind::DataAddress, ResolvedArg::Value(value)));
            }
            if *n >= 0 && (*n as usize) < CODE_SIZE {
                candidates.push((ArgKind::CodeAddress, ResolvedArg::Value(value)));
            }
            Ok(candidates)
        }
    }
}

fn resolve_command(
    cmd: &RawCommand,
    data_labels: &HashMap<String, u32>,
    code_labels: &HashMap<String, u32>,
) -> Result<(isa::Opcode, Vec<ResolvedOperand>), Error> {
    let template = isa::template(&cmd.mnemonic).ok_or_else(|| Error {
        line: cmd.line,
        message: format!("unknown instruction '{}'", cmd.mnemonic),
    })?;
    if cmd.args.len() != template.arg_kinds.len() {
        return Err(Error {
            line: cmd.line,
            message: format!(
                "wrong number of arguments for '{}': expected {}, found {}",
                cmd.mnemonic,
                template.arg_kinds.len(),
                cmd.args.len()
            ),
        });
    }
    let mut resolved = Vec::with_capacity(cmd.args.len());
    for (arg, allowed) in cmd.args.iter().zip(template.arg_kinds.iter()) {
        let candidates = arg_candidates(arg, data_labels, code_labels)
            .map_err(|message| Error { line: cmd.line, message })?;
        let chosen = candidates
            .into_iter()
            .find(|(kind, _)| allowed.contains(kind))
            .ok_or_else(|| Error {
                line: cmd.line,
                message: format!("wrong argument type for '{}'", cmd.mnemonic),
            })?;
        let indirect = matches!(arg, RawArg::Indirect(_));
        let display = display_arg(arg, chosen.0, chosen.1);
        resolved.push(ResolvedOperand { arg: chosen.1, indirect, display });
    }
    Ok((template.opcode, resolved))
}

/// Renders an operand the way the assembler log shows it: registers and
/// literal numbers print as written in the source, while a label prints as
/// the hexadecimal address it resolved to.
fn display_arg(arg: &RawArg, kind: ArgKind, resolved: ResolvedArg) -> String {
    match arg {
        RawArg::Indirect(inner) => format!("[{}]", display_arg(inner, kind, resolved)),
        RawArg::Ident(name) => match kind {
            ArgKind::DataLabel | ArgKind::CodeLabel => match resolved {
                ResolvedArg::Value(addr) => format!("{addr:#x}"),
                ResolvedArg::Register(idx) => format!("r{idx}"),
            },
            _ => name.clone(),
        },
        RawArg::Number(n) => n.to_string(),
    }
}

pub fn parse(source: &str) -> Result<ParsedProgram, Error> {
    let tokens = Lexer::new(source).tokenize();
    let lines = split_lines(tokens);

    let mut stage1 = Stage1::new();
    for (tokens, line) in lines {
        stage1.process_line(tokens, line)?;
    }

    let entry_point = stage1.entry_point.ok_or_else(|| Error {
        line: 0,
        message: "missing '_start' label".into(),
    })?;

    let mut code = Vec::with_capacity(stage1.code.len());
    for cmd in &stage1.code {
        let (opcode, args) = resolve_command(cmd, &stage1.data_labels, &stage1.code_labels)?;
        code.push(ParsedCommand { opcode, args, line: cmd.line });
    }

    let data = stage1
        .data
        .into_iter()
        .map(|item| match item {
            DataItem::Word(n) => n as u32,
            DataItem::Chars(c) => c.chars().next().map(|c| c as u32).unwrap_or(0),
        })
        .collect();

    Ok(ParsedProgram { data, code, entry_point })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hello_data_and_labels() {
        let src = "section .data\nmsg:\ndb 'hi',0\nsection .text\n_start:\nhlt\n";
        let program = parse(src).unwrap();
        assert_eq!(program.data, vec![0, 'h' as u32, 'i' as u32]);
        assert_eq!(program.entry_point, 0);
        assert_eq!(program.code.len(), 1);
    }

    #[test]
    fn undefined_label_errors() {
        let src = "section .text\n_start:\njmp nowhere\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn wrong_arity_errors() {
        let src = "section .text\n_start:\nadd r0, r1\n";
        assert!(parse(src).is_err());
    }
}
