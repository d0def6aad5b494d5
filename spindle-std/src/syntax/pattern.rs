//! Pattern compiler.
//!
//! Grammar:
//!
//! | Syntax          | Meaning                                              |
//! |-----------------|------------------------------------------------------|
//! | `word`          | literal, matched case-insensitively                  |
//! | `(a\|b\|c)`     | exactly one alternative                              |
//! | `[...]`         | optional group, may also hold alternatives           |
//! | `%type%`        | typed slot; the plural type name makes it plural     |
//! | `%-type%`       | slot without a default expression                    |
//! | `%*type%`       | slot accepting literals only                         |
//! | `tag:`          | at the start of a group branch, tags that branch     |
//! | `\c`            | the character `c` as a literal                       |

use super::tokenizer::{TokenKind, tokenize};
use crate::types::TypeRegistry;
use spindle_core::{RegistrationError, TypeKey};

/// A typed slot in a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Position among the pattern's slots, in order of appearance.
    pub index: usize,
    /// Type name as written in the pattern.
    pub type_name: String,
    /// Resolved type, set when the registry freezes.
    pub key: Option<TypeKey>,
    /// Whether the plural type name was used.
    pub plural: bool,
    /// `%-type%`: never fill with a default expression.
    pub no_default: bool,
    /// `%*type%`: accept literals only.
    pub literal_only: bool,
}

/// One alternative of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Branch {
    pub tag: Option<String>,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Literal(String),
    Choice(Vec<Branch>),
    Optional(Branch),
    Slot(Slot),
}

impl Node {
    fn collect_slots<'a>(&'a self, out: &mut Vec<&'a Slot>) {
        match self {
            Node::Literal(_) => {}
            Node::Choice(branches) => branches.iter().for_each(|b| b.collect_slots(out)),
            Node::Optional(branch) => branch.collect_slots(out),
            Node::Slot(slot) => out.push(slot),
        }
    }

    fn resolve(&mut self, types: &TypeRegistry, source: &str) -> Result<(), RegistrationError> {
        match self {
            Node::Literal(_) => Ok(()),
            Node::Choice(branches) => branches.iter_mut().try_for_each(|b| b.resolve(types, source)),
            Node::Optional(branch) => branch.resolve(types, source),
            Node::Slot(slot) => {
                let (info, plural) =
                    types
                        .lookup(&slot.type_name)
                        .ok_or_else(|| RegistrationError::UnknownType {
                            name: slot.type_name.clone(),
                            pattern: source.to_owned(),
                        })?;
                slot.key = Some(info.key());
                slot.plural = plural;
                Ok(())
            }
        }
    }
}

impl Branch {
    pub(crate) fn collect_slots<'a>(&'a self, out: &mut Vec<&'a Slot>) {
        self.nodes.iter().for_each(|n| n.collect_slots(out));
    }

    fn resolve(&mut self, types: &TypeRegistry, source: &str) -> Result<(), RegistrationError> {
        self.nodes
            .iter_mut()
            .try_for_each(|n| n.resolve(types, source))
    }
}

/// A compiled grammar rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    nodes: Vec<Node>,
    slot_count: usize,
}

impl Pattern {
    /// Compile a pattern string.
    pub fn compile(source: &str) -> Result<Self, RegistrationError> {
        let mut compiler = Compiler {
            source,
            chars: source.chars().collect(),
            pos: 0,
            slots: 0,
        };
        let nodes = compiler.sequence(&[])?;
        if let Some(c) = compiler.peek() {
            return Err(compiler.error(format!("unexpected `{c}`")));
        }
        if nodes.is_empty() {
            return Err(compiler.error("empty pattern"));
        }
        Ok(Self {
            source: source.to_owned(),
            nodes,
            slot_count: compiler.slots,
        })
    }

    /// Resolve every slot's type name against `types`.
    pub fn resolve(&mut self, types: &TypeRegistry) -> Result<(), RegistrationError> {
        let source = self.source.clone();
        self.nodes
            .iter_mut()
            .try_for_each(|n| n.resolve(types, &source))
    }

    /// The pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Every slot, in index order.
    pub fn slots(&self) -> Vec<&Slot> {
        let mut out = Vec::with_capacity(self.slot_count);
        self.nodes.iter().for_each(|n| n.collect_slots(&mut out));
        out
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

struct Compiler<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    slots: usize,
}

impl Compiler<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, reason: impl Into<String>) -> RegistrationError {
        RegistrationError::InvalidPattern {
            pattern: self.source.to_owned(),
            reason: reason.into(),
        }
    }

    fn sequence(&mut self, terminators: &[char]) -> Result<Vec<Node>, RegistrationError> {
        let mut nodes = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.peek() {
            if terminators.contains(&c) {
                break;
            }
            match c {
                '\\' => {
                    self.pos += 1;
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error("dangling escape at end of pattern"))?;
                    if escaped.is_alphanumeric() {
                        literal.push(escaped);
                    } else {
                        flush(&mut literal, &mut nodes);
                        nodes.push(Node::Literal(escaped.to_string()));
                    }
                }
                '(' => {
                    flush(&mut literal, &mut nodes);
                    self.pos += 1;
                    let branches = self.branches(')')?;
                    nodes.push(Node::Choice(branches));
                }
                '[' => {
                    flush(&mut literal, &mut nodes);
                    self.pos += 1;
                    let mut branches = self.branches(']')?;
                    let branch = if branches.len() == 1 {
                        branches.remove(0)
                    } else {
                        Branch {
                            tag: None,
                            nodes: vec![Node::Choice(branches)],
                        }
                    };
                    nodes.push(Node::Optional(branch));
                }
                '%' => {
                    flush(&mut literal, &mut nodes);
                    self.pos += 1;
                    let slot = self.slot()?;
                    nodes.push(Node::Slot(slot));
                }
                ')' | ']' | '|' => return Err(self.error(format!("unbalanced `{c}`"))),
                _ => {
                    self.pos += 1;
                    literal.push(c);
                }
            }
        }

        flush(&mut literal, &mut nodes);
        Ok(nodes)
    }

    fn branches(&mut self, close: char) -> Result<Vec<Branch>, RegistrationError> {
        let mut branches = Vec::new();
        loop {
            let tag = self.tag();
            let nodes = self.sequence(&['|', close])?;
            branches.push(Branch { tag, nodes });
            match self.bump() {
                Some('|') => continue,
                Some(c) if c == close => return Ok(branches),
                _ => return Err(self.error(format!("missing `{close}`"))),
            }
        }
    }

    fn tag(&mut self) -> Option<String> {
        let len = self.chars[self.pos..]
            .iter()
            .take_while(|c| c.is_alphanumeric() || **c == '_')
            .count();
        if len == 0 || self.chars.get(self.pos + len) != Some(&':') {
            return None;
        }
        let tag: String = self.chars[self.pos..self.pos + len].iter().collect();
        self.pos += len + 1;
        Some(tag.to_lowercase())
    }

    fn slot(&mut self) -> Result<Slot, RegistrationError> {
        let mut no_default = false;
        let mut literal_only = false;
        let mut name = String::new();

        loop {
            match self.bump() {
                Some('%') => break,
                Some('-') if name.is_empty() => no_default = true,
                Some('*') if name.is_empty() => literal_only = true,
                Some(c) => name.push(c),
                None => return Err(self.error("unterminated `%` slot")),
            }
        }

        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(self.error("slot without a type"));
        }

        let index = self.slots;
        self.slots += 1;
        Ok(Slot {
            index,
            type_name: name,
            key: None,
            plural: false,
            no_default,
            literal_only,
        })
    }
}

fn flush(literal: &mut String, nodes: &mut Vec<Node>) {
    if literal.is_empty() {
        return;
    }
    for token in tokenize(literal) {
        let text = match token.kind {
            TokenKind::Quoted => format!("\"{}\"", token.text),
            _ => token.text.to_lowercase(),
        };
        nodes.push(Node::Literal(text));
    }
    literal.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str) -> Node {
        Node::Literal(text.into())
    }

    #[test]
    fn literals_are_tokenized_and_lowercased() {
        let pattern = Pattern::compile("Player Join").unwrap();
        assert_eq!(pattern.nodes(), [literal("player"), literal("join")]);
    }

    #[test]
    fn groups_and_tags() {
        let pattern = Pattern::compile("(message|send) %strings% [recipients:to %players%]").unwrap();
        assert_eq!(pattern.slot_count(), 2);

        let Node::Optional(branch) = &pattern.nodes()[2] else {
            panic!("expected optional group");
        };
        assert_eq!(branch.tag.as_deref(), Some("recipients"));
        assert_eq!(branch.nodes[0], literal("to"));
    }

    #[test]
    fn optional_alternatives_become_a_choice() {
        let pattern = Pattern::compile("[a|b] c").unwrap();
        let Node::Optional(branch) = &pattern.nodes()[0] else {
            panic!("expected optional group");
        };
        assert!(matches!(&branch.nodes[0], Node::Choice(b) if b.len() == 2));
    }

    #[test]
    fn slot_flags() {
        let pattern = Pattern::compile("%-number% %*strings%").unwrap();
        let slots = pattern.slots();
        assert!(slots[0].no_default && !slots[0].literal_only);
        assert!(slots[1].literal_only && !slots[1].no_default);
        assert_eq!(slots[1].index, 1);
        assert_eq!(slots[1].type_name, "strings");
    }

    #[test]
    fn escapes_produce_literals() {
        let pattern = Pattern::compile(r"100\% \(sure\)").unwrap();
        assert_eq!(
            pattern.nodes(),
            [
                literal("100"),
                literal("%"),
                literal("("),
                literal("sure"),
                literal(")")
            ]
        );
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        for source in ["(a|b", "a]", "%number", "%%", "", "trailing\\", "[x"] {
            assert!(
                matches!(
                    Pattern::compile(source),
                    Err(RegistrationError::InvalidPattern { .. })
                ),
                "{source:?} should not compile"
            );
        }
    }
}
