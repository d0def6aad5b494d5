//! Recursive-descent matcher.
//!
//! A pattern is matched against a token window with explicit success or
//! failure. Alternatives are tried in order, optional groups are tried taken
//! before skipped, and a slot tries its end positions shortest first. For
//! each end position the remainder of the pattern is matched *before* the
//! slot's own text is parsed, so a slot never swallows text the rest of the
//! pattern needs. Once a slot's text parsed it is committed; failure after
//! that point abandons the pattern rather than re-reading the slot.

use super::{
    EventMatch, ListExpression, Literal, ParseOptions, ParseResult,
    exprs::{ConvertedExpression, EventValueExpression},
    pattern::{Branch, Node, Pattern, Slot},
    tokenizer::{Token, TokenKind, tokenize},
};
use crate::{context::Registries, types::DefaultSource};
use spindle_core::{Effect, Expression, ParseContext, TypeKey, Value};
use std::sync::Arc;

const MAX_DEPTH: usize = 16;

/// Parse an effect.
pub(crate) fn parse_effect(
    registries: &Registries,
    input: &str,
    options: ParseOptions,
) -> Option<Box<dyn Effect>> {
    let tokens = tokenize(input);
    let session = Session::new(registries, input, &tokens, options);

    for entry in registries.syntax().effects() {
        for (index, pattern) in entry.patterns.iter().enumerate() {
            let Some(result) = session.try_pattern(pattern, index) else {
                continue;
            };
            if let Some(effect) = (entry.factory)(result) {
                tracing::trace!(target: "spindle::syntax", entry = %entry.name, input, "parsed effect");
                return Some(effect);
            }
        }
    }
    None
}

/// Parse an expression whose values fill a slot of `return_type`.
pub(crate) fn parse_expression(
    registries: &Registries,
    input: &str,
    return_type: TypeKey,
    options: ParseOptions,
) -> Option<Box<dyn Expression>> {
    let tokens = tokenize(input);
    Session::new(registries, input, &tokens, options).expression(return_type)
}

/// Parse an event pattern.
pub(crate) fn parse_event(registries: &Registries, input: &str) -> Option<EventMatch> {
    let tokens = tokenize(input);
    let session = Session::new(
        registries,
        input,
        &tokens,
        ParseOptions::new(ParseContext::Event),
    );

    registries.wrappers().entries().iter().find_map(|entry| {
        entry
            .patterns()
            .iter()
            .enumerate()
            .find_map(|(index, pattern)| session.try_pattern(pattern, index))
            .map(|result| EventMatch {
                event: entry.wrapper(),
                name: entry.name().to_owned(),
                result,
            })
    })
}

/// Bindings collected while a successful match unwinds.
#[derive(Default)]
struct State {
    exprs: Vec<Option<Box<dyn Expression>>>,
    tags: Vec<String>,
    skipped: Vec<usize>,
}

impl State {
    fn bind(&mut self, index: usize, expr: Box<dyn Expression>) {
        if self.exprs.len() <= index {
            self.exprs.resize_with(index + 1, || None);
        }
        self.exprs[index] = Some(expr);
    }
}

/// What remains to be matched after the current node list.
enum Cont<'a> {
    Done,
    Then(&'a [Node], &'a Cont<'a>),
}

#[derive(Clone, Copy)]
struct Session<'r> {
    registries: &'r Registries,
    source: &'r str,
    tokens: &'r [Token],
    options: ParseOptions,
    depth: usize,
}

impl<'r> Session<'r> {
    fn new(
        registries: &'r Registries,
        source: &'r str,
        tokens: &'r [Token],
        options: ParseOptions,
    ) -> Self {
        Self {
            registries,
            source,
            tokens,
            options,
            depth: 0,
        }
    }

    fn window(&self, start: usize, end: usize) -> Session<'r> {
        Session {
            tokens: &self.tokens[start..end],
            depth: self.depth + 1,
            ..*self
        }
    }

    fn text(&self) -> &'r str {
        match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => &self.source[first.start..last.end],
            _ => "",
        }
    }

    fn try_pattern(&self, pattern: &Pattern, index: usize) -> Option<ParseResult> {
        let mut state = self.run(pattern.nodes(), &Cont::Done, 0)?;
        state.exprs.resize_with(pattern.slot_count(), || None);

        let slots = pattern.slots();
        for &skipped in &state.skipped {
            let slot = slots[skipped];
            if state.exprs[skipped].is_none() && !slot.no_default {
                state.exprs[skipped] = self.default_for(slot);
            }
        }
        state.tags.reverse();

        Some(ParseResult {
            matched_pattern: index,
            exprs: state.exprs,
            tags: state.tags,
            text: self.text().to_owned(),
            context: self.options.context,
            event: self.options.event,
        })
    }

    fn default_for(&self, slot: &Slot) -> Option<Box<dyn Expression>> {
        let key = slot.key?;
        let info = self.registries.types().get(key)?;
        match info.default_source() {
            DefaultSource::None => None,
            DefaultSource::EventValue => {
                let event = self.options.event?;
                let values = self.registries.event_values();
                values.provides(event, key).then(|| {
                    Box::new(EventValueExpression::new(
                        key,
                        Arc::clone(values),
                        info.name(),
                    )) as Box<dyn Expression>
                })
            }
            DefaultSource::Custom(supplier) => supplier(),
        }
    }

    fn run_cont(&self, cont: &Cont<'_>, pos: usize) -> Option<State> {
        match cont {
            Cont::Done => (pos == self.tokens.len()).then(State::default),
            Cont::Then(nodes, rest) => self.run(nodes, rest, pos),
        }
    }

    fn run(&self, nodes: &[Node], rest: &Cont<'_>, pos: usize) -> Option<State> {
        let Some((node, tail)) = nodes.split_first() else {
            return self.run_cont(rest, pos);
        };
        let next = Cont::Then(tail, rest);

        match node {
            Node::Literal(literal) => {
                let token = self.tokens.get(pos)?;
                if token.is_literal(literal) {
                    self.run_cont(&next, pos + 1)
                } else {
                    None
                }
            }
            Node::Choice(branches) => branches
                .iter()
                .find_map(|branch| self.run_branch(branch, &next, pos)),
            Node::Optional(branch) => self.run_branch(branch, &next, pos).or_else(|| {
                let mut state = self.run_cont(&next, pos)?;
                let mut slots = Vec::new();
                branch.collect_slots(&mut slots);
                state.skipped.extend(slots.iter().map(|s| s.index));
                Some(state)
            }),
            Node::Slot(slot) => (pos + 1..=self.tokens.len()).find_map(|end| {
                let mut state = self.run_cont(&next, end)?;
                let expr = self.parse_slot(slot, pos, end)?;
                state.bind(slot.index, expr);
                Some(state)
            }),
        }
    }

    fn run_branch(&self, branch: &Branch, next: &Cont<'_>, pos: usize) -> Option<State> {
        let mut state = self.run(&branch.nodes, next, pos)?;
        if let Some(tag) = &branch.tag {
            state.tags.push(tag.clone());
        }
        Some(state)
    }

    fn parse_slot(&self, slot: &Slot, start: usize, end: usize) -> Option<Box<dyn Expression>> {
        let key = slot.key?;
        let window = self.window(start, end);
        if let Some(expr) = window.item(slot, key) {
            return Some(expr);
        }
        if !slot.plural {
            return None;
        }

        let items = window
            .split_list()?
            .into_iter()
            .map(|(s, e)| window.window(s, e).item(slot, key))
            .collect::<Option<Vec<_>>>()?;
        Some(Box::new(ListExpression::new(items, key)))
    }

    /// A single slot value: literal, quoted string, then registered expression.
    fn item(&self, slot: &Slot, key: TypeKey) -> Option<Box<dyn Expression>> {
        if self.tokens.is_empty() || self.depth > MAX_DEPTH {
            return None;
        }
        let types = self.registries.types();
        let text = self.text();

        if let Some(value) = types
            .get(key)
            .and_then(|info| info.parse(text, self.options.context))
        {
            return Some(Box::new(Literal::new(value, text)));
        }

        if let [token] = self.tokens {
            if token.kind == TokenKind::Quoted {
                if let Some(value) = types.convert(&Value::new(token.text.clone()), key) {
                    return Some(Box::new(Literal::new(value, text)));
                }
            }
        }

        if slot.literal_only {
            return None;
        }
        self.expression(key)
    }

    fn expression(&self, target: TypeKey) -> Option<Box<dyn Expression>> {
        if self.tokens.is_empty() || self.depth > MAX_DEPTH {
            return None;
        }
        let types = self.registries.types();

        for entry in self.registries.syntax().expressions() {
            if !types.converts(entry.return_type, target) {
                continue;
            }
            for (index, pattern) in entry.patterns.iter().enumerate() {
                let Some(result) = self.try_pattern(pattern, index) else {
                    continue;
                };
                let Some(expr) = (entry.factory)(result) else {
                    continue;
                };
                let found = expr.return_type();
                if found == target {
                    return Some(expr);
                }
                if let Some(converter) = types.converter(found, target) {
                    return Some(Box::new(ConvertedExpression::new(
                        expr,
                        target,
                        Arc::clone(converter),
                    )));
                }
            }
        }
        None
    }

    /// Split `a, b and c` at the top level of parentheses.
    fn split_list(&self) -> Option<Vec<(usize, usize)>> {
        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;

        for (i, token) in self.tokens.iter().enumerate() {
            let separator = match token.kind {
                TokenKind::Punct if token.text == "(" => {
                    depth += 1;
                    false
                }
                TokenKind::Punct if token.text == ")" => {
                    depth = depth.checked_sub(1)?;
                    false
                }
                TokenKind::Punct => depth == 0 && token.text == ",",
                TokenKind::Word => depth == 0 && token.is_literal("and"),
                TokenKind::Quoted => false,
            };
            if !separator {
                continue;
            }
            if i == start {
                // `a, b, and c`
                let after_comma = i > 0 && self.tokens[i - 1].text == ",";
                if !(after_comma && token.is_literal("and")) {
                    return None;
                }
            } else {
                parts.push((start, i));
            }
            start = i + 1;
        }

        if start >= self.tokens.len() {
            return None;
        }
        parts.push((start, self.tokens.len()));
        (parts.len() >= 2).then_some(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::ContextBuilder,
        types::{Parser, TypeInfo},
        wrappers::WrapperSpec,
    };
    use spindle_core::{EvalError, EventWrapper, RenderFlags, ScriptEvent, script_event};
    use std::sync::Mutex;

    struct Hello {
        name: String,
    }

    script_event! {
        struct Greet(Hello);
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Name(String);

    struct Numbers;

    impl Parser<f64> for Numbers {
        fn parse(&self, text: &str, _context: ParseContext) -> Option<f64> {
            text.parse().ok()
        }

        fn render(&self, value: &f64, _flags: RenderFlags) -> String {
            value.to_string()
        }
    }

    #[derive(Debug)]
    struct Noop;

    impl Effect for Noop {
        fn execute(&self, _event: &dyn ScriptEvent) -> Result<(), EvalError> {
            Ok(())
        }
    }

    type Captured = Arc<Mutex<Option<ParseResult>>>;

    fn registries(patterns: &[&str]) -> (Arc<Registries>, Captured) {
        let captured: Captured = Arc::default();
        let sink = Arc::clone(&captured);

        let mut builder = ContextBuilder::new();
        builder
            .types()
            .register(TypeInfo::builder::<f64>("number").parser(Numbers).build())
            .unwrap();
        builder
            .types()
            .register(TypeInfo::builder::<Name>("name").event_value_default().build())
            .unwrap();
        builder
            .wrappers()
            .register::<Greet>(WrapperSpec::new("greet").pattern("greeting"))
            .unwrap();
        builder
            .event_values()
            .register_for::<Greet, Name, _>(|greet| Some(Name(greet.native().name.clone())));
        builder
            .syntax()
            .expression_fn::<f64, _>("twelve", &["twelve"], |_| {
                Some(Box::new(Literal::new(Value::new(12.0f64), "twelve")) as Box<dyn Expression>)
            })
            .unwrap();
        builder
            .syntax()
            .effect_fn("capture", patterns, move |result| {
                *sink.lock().unwrap() = Some(result);
                Some(Box::new(Noop) as Box<dyn Effect>)
            })
            .unwrap();

        let sealed = builder.seal().unwrap();
        (Arc::clone(sealed.registries()), captured)
    }

    fn greet(name: &str) -> Greet {
        Greet::wrap(Arc::new(Hello { name: name.into() }))
    }

    fn numbers(result: &ParseResult, slot: usize) -> Vec<f64> {
        result
            .expr(slot)
            .expect("slot is bound")
            .all::<f64>(&greet("x"))
            .unwrap()
    }

    #[test]
    fn slots_leave_room_for_the_rest_of_the_pattern() {
        let (registries, captured) = registries(&["add %numbers% to %number%"]);
        let options = ParseOptions::default();

        assert!(registries.parse_effect("ADD 1, 2 and 3 to 4", options).is_some());
        let result = captured.lock().unwrap().take().unwrap();
        assert_eq!(numbers(&result, 0), [1.0, 2.0, 3.0]);
        assert_eq!(numbers(&result, 1), [4.0]);
        assert_eq!(result.text, "ADD 1, 2 and 3 to 4");

        assert!(registries.parse_effect("add 1 to", options).is_none());
        assert!(registries.parse_effect("add 1 to 2 please", options).is_none());
    }

    #[test]
    fn singular_slots_do_not_take_lists() {
        let (registries, _) = registries(&["set %number%"]);
        let options = ParseOptions::default();

        assert!(registries.parse_effect("set 1", options).is_some());
        assert!(registries.parse_effect("set 1 and 2", options).is_none());
    }

    #[test]
    fn matched_pattern_and_tags_are_reported() {
        let (registries, captured) = registries(&["wave", "(nod|bow:bow) [deep:deeply]"]);
        let options = ParseOptions::default();

        registries.parse_effect("bow deeply", options).unwrap();
        let result = captured.lock().unwrap().take().unwrap();
        assert_eq!(result.matched_pattern, 1);
        assert!(result.has_tag("bow") && result.has_tag("DEEP"));

        registries.parse_effect("nod", options).unwrap();
        let result = captured.lock().unwrap().take().unwrap();
        assert!(result.tags.is_empty());
    }

    #[test]
    fn skipped_slots_default_to_the_event_value() {
        let (registries, captured) = registries(&["greet [%name%]", "hail [%-name%]"]);
        let in_greet = ParseOptions::default().in_event(TypeKey::of::<Greet>());

        registries.parse_effect("greet", in_greet).unwrap();
        let result = captured.lock().unwrap().take().unwrap();
        let name = result.expr(0).expect("defaulted").require::<Name>(&greet("ann"));
        assert_eq!(name, Ok(Name("ann".into())));

        registries.parse_effect("greet", ParseOptions::default()).unwrap();
        assert!(captured.lock().unwrap().take().unwrap().expr(0).is_none());

        registries.parse_effect("hail", in_greet).unwrap();
        assert!(captured.lock().unwrap().take().unwrap().expr(0).is_none());
    }

    #[test]
    fn literal_only_slots_skip_expressions() {
        let (registries, captured) = registries(&["count %*number%", "tally %number%"]);
        let options = ParseOptions::default();

        assert!(registries.parse_effect("count twelve", options).is_none());
        assert!(registries.parse_effect("count 12", options).is_some());

        registries.parse_effect("tally twelve", options).unwrap();
        let result = captured.lock().unwrap().take().unwrap();
        assert_eq!(numbers(&result, 0), [12.0]);
    }

    #[test]
    fn event_patterns_match_wrappers() {
        let (registries, _) = registries(&["wave"]);

        let matched = registries.parse_event("Greeting").unwrap();
        assert_eq!(matched.event, TypeKey::of::<Greet>());
        assert_eq!(matched.name, "greet");
        assert!(registries.parse_event("farewell").is_none());
    }
}
