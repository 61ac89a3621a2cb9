//! Content expressions and the automata compiled from them.
//!
//! A content expression such as `"paragraph block*"` or `"heading{1,2} (paragraph | list)+"`
//! is parsed into an expression tree, compiled to an NFA, and then turned
//! into a DFA whose states are [`MatchState`]s stored in the schema. A
//! [`ContentMatch`] is a cursor into that DFA.

use std::collections::HashMap;
use std::collections::VecDeque;

use super::node::{Fragment, Node};
use super::node_type::{NodeType, NodeTypeId};
use super::schema::Schema;
use crate::error::{Error, Result};

/// Index of a DFA state in [`Schema`]'s state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchId(pub u32);

/// A DFA state.
#[derive(Debug, Clone, Default)]
pub struct MatchState {
    /// Whether the content seen so far is complete.
    pub valid_end: bool,
    /// Outgoing transitions, in expression order.
    pub next: Vec<MatchEdge>,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchEdge {
    pub node_type: NodeTypeId,
    pub next: MatchId,
}

/// Cursor into a content automaton.
#[derive(Clone, Copy)]
pub struct ContentMatch<'s> {
    schema: &'s Schema,
    id: MatchId,
}

impl std::fmt::Debug for ContentMatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let next: Vec<_> = self
            .state()
            .next
            .iter()
            .map(|e| self.schema.node_type(e.node_type).name())
            .collect();
        f.debug_struct("ContentMatch")
            .field("id", &self.id.0)
            .field("valid_end", &self.valid_end())
            .field("next", &next)
            .finish()
    }
}

impl PartialEq for ContentMatch<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.id == other.id
    }
}

impl<'s> ContentMatch<'s> {
    pub(crate) fn new(schema: &'s Schema, id: MatchId) -> Self {
        Self { schema, id }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    fn state(&self) -> &'s MatchState {
        self.schema.match_state(self.id)
    }

    fn at(&self, id: MatchId) -> Self {
        Self::new(self.schema, id)
    }

    /// True when the content matched so far may end here.
    pub fn valid_end(&self) -> bool {
        self.state().valid_end
    }

    pub fn edge_count(&self) -> usize {
        self.state().next.len()
    }

    /// The `n`th outgoing edge as (node type, next state).
    pub fn edge(&self, n: usize) -> Option<(&'s NodeType, ContentMatch<'s>)> {
        self.state()
            .next
            .get(n)
            .map(|e| (self.schema.node_type(e.node_type), self.at(e.next)))
    }

    /// Follow the edge for `node_type`, if there is one.
    pub fn match_type(&self, node_type: NodeTypeId) -> Option<ContentMatch<'s>> {
        self.state()
            .next
            .iter()
            .find(|e| e.node_type == node_type)
            .map(|e| self.at(e.next))
    }

    /// Match every node of `fragment` from `start` on.
    pub fn match_fragment(&self, fragment: &Fragment, start: usize) -> Option<ContentMatch<'s>> {
        self.match_nodes(fragment.children().get(start..).unwrap_or(&[]))
    }

    pub fn match_nodes(&self, nodes: &[Node]) -> Option<ContentMatch<'s>> {
        let mut cur = *self;
        for node in nodes {
            cur = cur.match_type(node.type_id())?;
        }
        Some(cur)
    }

    /// Whether the node types accepted here are inline.
    pub fn inline_content(&self) -> bool {
        self.state()
            .next
            .first()
            .is_some_and(|e| self.schema.node_type(e.node_type).is_inline())
    }

    /// The first node type that can be created here without extra input.
    pub fn default_type(&self) -> Option<&'s NodeType> {
        self.state()
            .next
            .iter()
            .map(|e| self.schema.node_type(e.node_type))
            .find(|t| !(t.is_text() || t.has_required_attrs()))
    }

    /// Whether both states accept some node type in common.
    pub fn compatible(&self, other: &ContentMatch<'_>) -> bool {
        self.state().next.iter().any(|a| {
            other
                .state()
                .next
                .iter()
                .any(|b| a.node_type == b.node_type)
        })
    }

    /// Nodes that would have to be inserted before `after` so that it
    /// matches, and (with `to_end`) so that the result is a valid end.
    ///
    /// Returns `None` when no such filling exists.
    pub fn fill_before(&self, after: &Fragment, to_end: bool, start: usize) -> Option<Fragment> {
        let mut seen = vec![self.id];
        self.search_fill(after, to_end, start, &mut Vec::new(), &mut seen)
    }

    fn search_fill(
        &self,
        after: &Fragment,
        to_end: bool,
        start: usize,
        types: &mut Vec<NodeTypeId>,
        seen: &mut Vec<MatchId>,
    ) -> Option<Fragment> {
        if let Some(finished) = self.match_fragment(after, start)
            && (!to_end || finished.valid_end())
        {
            let nodes = types
                .iter()
                .map(|&t| self.schema.create_and_fill(t))
                .collect::<Option<Vec<_>>>()?;
            return Some(Fragment::from_nodes(nodes));
        }

        for edge in &self.state().next {
            let node_type = self.schema.node_type(edge.node_type);
            if !(node_type.is_text() || node_type.has_required_attrs()) && !seen.contains(&edge.next)
            {
                seen.push(edge.next);
                types.push(edge.node_type);
                let found = self.at(edge.next).search_fill(after, to_end, start, types, seen);
                types.pop();
                if found.is_some() {
                    return found;
                }
            }
        }
        None
    }

    /// The shortest chain of wrapper node types that, opened here, lets a
    /// node of `target` be placed. An empty chain means it fits directly.
    pub fn find_wrapping(&self, target: NodeTypeId) -> Option<Vec<NodeTypeId>> {
        struct Step {
            state: MatchId,
            node_type: Option<NodeTypeId>,
            via: Option<usize>,
        }

        let mut steps = vec![Step {
            state: self.id,
            node_type: None,
            via: None,
        }];
        let mut active = VecDeque::from([0usize]);
        let mut seen: Vec<NodeTypeId> = Vec::new();

        while let Some(index) = active.pop_front() {
            let current = self.at(steps[index].state);
            if current.match_type(target).is_some() {
                let mut result = Vec::new();
                let mut cursor = Some(index);
                while let Some(i) = cursor {
                    if let Some(t) = steps[i].node_type {
                        result.push(t);
                    }
                    cursor = steps[i].via;
                }
                result.reverse();
                return Some(result);
            }

            for edge in &current.state().next {
                let node_type = self.schema.node_type(edge.node_type);
                if !node_type.is_leaf()
                    && !node_type.has_required_attrs()
                    && !seen.contains(&edge.node_type)
                    && (steps[index].node_type.is_none() || self.at(edge.next).valid_end())
                {
                    seen.push(edge.node_type);
                    steps.push(Step {
                        state: node_type.content_match_id(),
                        node_type: Some(edge.node_type),
                        via: Some(index),
                    });
                    active.push_back(steps.len() - 1);
                }
            }
        }
        None
    }
}

// ============================================================================
// Expression parsing
// ============================================================================

#[derive(Debug, Clone)]
enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Plus(Box<Expr>),
    Star(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        min: usize,
        max: Option<usize>,
        expr: Box<Expr>,
    },
    Name(NodeTypeId),
}

struct TokenStream<'a> {
    source: &'a str,
    tokens: Vec<&'a str>,
    pos: usize,
    types: &'a [NodeType],
    inline: Option<bool>,
}

fn tokenize(source: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        if c.is_alphanumeric() || c == '_' {
            let mut end = start + c.len_utf8();
            while let Some(&(i, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(&source[start..end]);
        } else {
            tokens.push(&source[start..start + c.len_utf8()]);
        }
    }
    tokens
}

impl<'a> TokenStream<'a> {
    fn new(source: &'a str, types: &'a [NodeType]) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            types,
            inline: None,
        }
    }

    fn next(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.next() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::content_expr(self.source, message)
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut exprs = vec![self.parse_seq()?];
        while self.eat("|") {
            exprs.push(self.parse_seq()?);
        }
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Choice(exprs)
        })
    }

    fn parse_seq(&mut self) -> Result<Expr> {
        let mut exprs = vec![self.parse_subscript()?];
        while let Some(next) = self.next()
            && next != ")"
            && next != "|"
        {
            exprs.push(self.parse_subscript()?);
        }
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Seq(exprs)
        })
    }

    fn parse_subscript(&mut self) -> Result<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat("+") {
                expr = Expr::Plus(Box::new(expr));
            } else if self.eat("*") {
                expr = Expr::Star(Box::new(expr));
            } else if self.eat("?") {
                expr = Expr::Opt(Box::new(expr));
            } else if self.eat("{") {
                expr = self.parse_range(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_num(&mut self) -> Result<usize> {
        let token = self.next().unwrap_or("");
        let value = token
            .parse::<usize>()
            .map_err(|_| self.err(format!("Expected number, got '{token}'")))?;
        self.pos += 1;
        Ok(value)
    }

    fn parse_range(&mut self, expr: Expr) -> Result<Expr> {
        let min = self.parse_num()?;
        let mut max = Some(min);
        if self.eat(",") {
            max = if self.next() != Some("}") {
                Some(self.parse_num()?)
            } else {
                None
            };
        }
        if !self.eat("}") {
            return Err(self.err("Unclosed braced range"));
        }
        Ok(Expr::Range {
            min,
            max,
            expr: Box::new(expr),
        })
    }

    fn resolve_name(&self, name: &str) -> Result<Vec<&'a NodeType>> {
        if let Some(t) = self.types.iter().find(|t| t.name() == name) {
            return Ok(vec![t]);
        }
        let group: Vec<_> = self.types.iter().filter(|t| t.is_in_group(name)).collect();
        if group.is_empty() {
            return Err(self.err(format!("No node type or group '{name}' found")));
        }
        Ok(group)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        if self.eat("(") {
            let expr = self.parse_expr()?;
            if !self.eat(")") {
                return Err(self.err("Missing closing paren"));
            }
            return Ok(expr);
        }

        let Some(token) = self.next() else {
            return Err(self.err("Unexpected end of expression"));
        };
        if !token.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(self.err(format!("Unexpected token '{token}'")));
        }

        let mut exprs = Vec::new();
        for node_type in self.resolve_name(token)? {
            match self.inline {
                None => self.inline = Some(node_type.is_inline()),
                Some(inline) if inline != node_type.is_inline() => {
                    return Err(self.err("Mixing inline and block content"));
                }
                Some(_) => {}
            }
            exprs.push(Expr::Name(node_type.id()));
        }
        self.pos += 1;
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Choice(exprs)
        })
    }
}

// ============================================================================
// NFA / DFA construction
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct NfaEdge {
    term: Option<NodeTypeId>,
    to: Option<usize>,
}

/// Reference to an edge whose target is filled in later.
type Dangling = (usize, usize);

#[derive(Default)]
struct Nfa {
    states: Vec<Vec<NfaEdge>>,
}

impl Nfa {
    fn build(expr: &Expr) -> Self {
        let mut nfa = Nfa {
            states: vec![Vec::new()],
        };
        let out = nfa.compile(expr, 0);
        let accept = nfa.node();
        nfa.connect(&out, accept);
        nfa
    }

    fn node(&mut self) -> usize {
        self.states.push(Vec::new());
        self.states.len() - 1
    }

    fn edge(&mut self, from: usize, to: Option<usize>, term: Option<NodeTypeId>) -> Dangling {
        self.states[from].push(NfaEdge { term, to });
        (from, self.states[from].len() - 1)
    }

    fn connect(&mut self, edges: &[Dangling], to: usize) {
        for &(state, index) in edges {
            self.states[state][index].to = Some(to);
        }
    }

    fn compile(&mut self, expr: &Expr, from: usize) -> Vec<Dangling> {
        match expr {
            Expr::Choice(exprs) => exprs
                .iter()
                .flat_map(|e| self.compile(e, from))
                .collect(),
            Expr::Seq(exprs) => {
                let mut from = from;
                let mut out = Vec::new();
                for (i, e) in exprs.iter().enumerate() {
                    out = self.compile(e, from);
                    if i + 1 < exprs.len() {
                        from = self.node();
                        self.connect(&out, from);
                    }
                }
                out
            }
            Expr::Star(inner) => {
                let lp = self.node();
                self.edge(from, Some(lp), None);
                let out = self.compile(inner, lp);
                self.connect(&out, lp);
                vec![self.edge(lp, None, None)]
            }
            Expr::Plus(inner) => {
                let lp = self.node();
                let first = self.compile(inner, from);
                self.connect(&first, lp);
                let again = self.compile(inner, lp);
                self.connect(&again, lp);
                vec![self.edge(lp, None, None)]
            }
            Expr::Opt(inner) => {
                let mut out = vec![self.edge(from, None, None)];
                out.extend(self.compile(inner, from));
                out
            }
            Expr::Range { min, max, expr } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let out = self.compile(expr, cur);
                    self.connect(&out, next);
                    cur = next;
                }
                match max {
                    None => {
                        let out = self.compile(expr, cur);
                        self.connect(&out, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(cur, Some(next), None);
                            let out = self.compile(expr, cur);
                            self.connect(&out, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None, None)]
            }
            Expr::Name(node_type) => vec![self.edge(from, None, Some(*node_type))],
        }
    }

    /// States reachable from `node` through epsilon edges, sorted.
    fn null_from(&self, node: usize) -> Vec<usize> {
        let mut result = Vec::new();
        self.scan(node, &mut result);
        result.sort_unstable();
        result
    }

    fn scan(&self, node: usize, result: &mut Vec<usize>) {
        let edges = &self.states[node];
        if let [only] = edges.as_slice()
            && only.term.is_none()
            && let Some(to) = only.to
        {
            return self.scan(to, result);
        }
        result.push(node);
        for edge in edges {
            if edge.term.is_none()
                && let Some(to) = edge.to
                && !result.contains(&to)
            {
                self.scan(to, result);
            }
        }
    }
}

struct DfaBuilder<'a> {
    nfa: &'a Nfa,
    base: u32,
    labeled: HashMap<Vec<usize>, u32>,
    states: Vec<MatchState>,
}

impl DfaBuilder<'_> {
    fn explore(&mut self, nfa_states: Vec<usize>) -> u32 {
        let mut out: Vec<(NodeTypeId, Vec<usize>)> = Vec::new();
        for &node in &nfa_states {
            for edge in &self.nfa.states[node] {
                let (Some(term), Some(to)) = (edge.term, edge.to) else {
                    continue;
                };
                let slot = match out.iter().position(|(t, _)| *t == term) {
                    Some(i) => i,
                    None => {
                        out.push((term, Vec::new()));
                        out.len() - 1
                    }
                };
                for reached in self.nfa.null_from(to) {
                    if !out[slot].1.contains(&reached) {
                        out[slot].1.push(reached);
                    }
                }
            }
        }

        let accept = self.nfa.states.len() - 1;
        let index = self.base + self.states.len() as u32;
        self.states.push(MatchState {
            valid_end: nfa_states.contains(&accept),
            next: Vec::new(),
        });
        self.labeled.insert(nfa_states, index);

        for (term, mut targets) in out {
            targets.sort_unstable();
            let next = match self.labeled.get(&targets) {
                Some(&existing) => existing,
                None => self.explore(targets),
            };
            self.states[(index - self.base) as usize].next.push(MatchEdge {
                node_type: term,
                next: MatchId(next),
            });
        }
        index
    }
}

/// Compile `source` against `types`. State ids start at `base`; the first
/// returned state is the start state.
///
/// An empty expression yields a single accepting state with no edges.
pub(crate) fn compile_content(
    source: &str,
    types: &[NodeType],
    base: u32,
) -> Result<Vec<MatchState>> {
    let mut stream = TokenStream::new(source, types);
    if stream.next().is_none() {
        return Ok(vec![MatchState {
            valid_end: true,
            next: Vec::new(),
        }]);
    }

    let expr = stream.parse_expr()?;
    if let Some(extra) = stream.next() {
        return Err(stream.err(format!("Unexpected trailing text '{extra}'")));
    }

    let nfa = Nfa::build(&expr);
    let mut dfa = DfaBuilder {
        nfa: &nfa,
        base,
        labeled: HashMap::new(),
        states: Vec::new(),
    };
    let start = nfa.null_from(0);
    dfa.explore(start);

    check_for_dead_ends(&dfa.states, types, source)?;
    Ok(dfa.states)
}

fn check_for_dead_ends(states: &[MatchState], types: &[NodeType], source: &str) -> Result<()> {
    for state in states {
        if state.valid_end {
            continue;
        }
        let generatable = state.next.iter().any(|e| {
            let t = &types[e.node_type.0 as usize];
            !(t.is_text() || t.has_required_attrs())
        });
        if !generatable {
            let names: Vec<_> = state
                .next
                .iter()
                .map(|e| types[e.node_type.0 as usize].name())
                .collect();
            return Err(Error::content_expr(
                source,
                format!(
                    "Only non-generatable nodes ({}) in a required position",
                    names.join(", ")
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeSpec, OrderedMap, Schema, SchemaSpec};

    fn schema() -> Schema {
        let nodes: OrderedMap<NodeSpec> = [
            ("doc", NodeSpec::new().content("block+")),
            (
                "paragraph",
                NodeSpec::new().content("inline*").group("block"),
            ),
            ("heading", NodeSpec::new().content("inline*").group("block")),
            ("rule", NodeSpec::new().group("block")),
            ("quote", NodeSpec::new().content("block+").group("block")),
            ("list", NodeSpec::new().content("item+").group("block")),
            ("item", NodeSpec::new().content("paragraph block*")),
            ("text", NodeSpec::new().group("inline")),
            ("image", NodeSpec::new().inline().group("inline")),
        ]
        .into_iter()
        .collect();
        Schema::new(SchemaSpec::new(nodes, OrderedMap::new())).unwrap()
    }

    fn types(schema: &Schema, names: &str) -> Vec<NodeTypeId> {
        names
            .split_whitespace()
            .map(|n| schema.node_type_by_name(n).unwrap().id())
            .collect()
    }

    fn matches(schema: &Schema, expr: &str, names: &str) -> bool {
        let states = compile_content(expr, schema.node_types(), 0).unwrap();
        let mut state = 0usize;
        for t in types(schema, names) {
            match states[state].next.iter().find(|e| e.node_type == t) {
                Some(e) => state = e.next.0 as usize,
                None => return false,
            }
        }
        states[state].valid_end
    }

    #[test]
    fn test_star_and_plus() {
        let s = schema();
        assert!(matches(&s, "image*", ""));
        assert!(matches(&s, "image*", "image image"));
        assert!(!matches(&s, "image+", ""));
        assert!(matches(&s, "image+", "image"));
        assert!(!matches(&s, "image+", "text"));
    }

    #[test]
    fn test_sequence_and_optional() {
        let s = schema();
        assert!(matches(&s, "heading paragraph?", "heading"));
        assert!(matches(&s, "heading paragraph?", "heading paragraph"));
        assert!(!matches(&s, "heading paragraph?", "paragraph"));
        assert!(matches(&s, "paragraph block*", "paragraph rule list"));
    }

    #[test]
    fn test_choice_and_group() {
        let s = schema();
        assert!(matches(&s, "(heading | rule)+", "rule heading rule"));
        assert!(matches(&s, "block+", "quote paragraph"));
        assert!(!matches(&s, "block+", "item"));
    }

    #[test]
    fn test_ranges() {
        let s = schema();
        assert!(!matches(&s, "rule{2}", "rule"));
        assert!(matches(&s, "rule{2}", "rule rule"));
        assert!(!matches(&s, "rule{2}", "rule rule rule"));
        assert!(matches(&s, "rule{1,3}", "rule rule rule"));
        assert!(!matches(&s, "rule{1,3}", "rule rule rule rule"));
        assert!(matches(&s, "rule{2,}", "rule rule rule rule"));
    }

    #[test]
    fn test_errors() {
        let s = schema();
        let err = compile_content("nothing", s.node_types(), 0).unwrap_err();
        assert!(err.to_string().contains("No node type or group 'nothing'"));

        let err = compile_content("paragraph image", s.node_types(), 0).unwrap_err();
        assert!(err.to_string().contains("Mixing inline and block"));

        let err = compile_content("(rule", s.node_types(), 0).unwrap_err();
        assert!(err.to_string().contains("Missing closing paren"));

        let err = compile_content("rule{x}", s.node_types(), 0).unwrap_err();
        assert!(err.to_string().contains("Expected number"));

        let err = compile_content("text", s.node_types(), 0).unwrap_err();
        assert!(err.to_string().contains("non-generatable"));
    }

    #[test]
    fn test_fill_before_creates_required_nodes() {
        let s = schema();
        let doc = s.content_match(s.top_node_type().id());
        let filled = doc.fill_before(&Fragment::empty(), true, 0).unwrap();
        assert_eq!(filled.child_count(), 1);
        assert_eq!(s.node_type(filled.child(0).unwrap().type_id()).name(), "paragraph");

        let item = s.content_match(s.node_type_by_name("item").unwrap().id());
        let rule = s.node("rule", None, Fragment::empty(), vec![]).unwrap();
        let filled = item
            .fill_before(&Fragment::from_nodes(vec![rule]), true, 0)
            .unwrap();
        assert_eq!(filled.child_count(), 1);
    }

    #[test]
    fn test_find_wrapping() {
        let s = schema();
        let doc = s.content_match(s.top_node_type().id());
        let text = s.text_type().id();
        let wrap = doc.find_wrapping(text).unwrap();
        assert_eq!(wrap, types(&s, "paragraph"));

        let item = s.node_type_by_name("item").unwrap().id();
        assert_eq!(doc.find_wrapping(item).unwrap(), types(&s, "list"));

        let paragraph = s.node_type_by_name("paragraph").unwrap().id();
        assert_eq!(doc.find_wrapping(paragraph).unwrap(), vec![]);
    }

    #[test]
    fn test_default_type_and_inline_content() {
        let s = schema();
        let doc = s.content_match(s.top_node_type().id());
        assert_eq!(doc.default_type().unwrap().name(), "paragraph");
        assert!(!doc.inline_content());

        let para = s.content_match(s.node_type_by_name("paragraph").unwrap().id());
        assert!(para.inline_content());
        assert!(para.valid_end());
        assert!(para.default_type().is_some_and(|t| t.name() == "image"));
    }
}
