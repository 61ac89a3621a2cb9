//! Inline `style` attribute parsing.
//!
//! Style rules in a parse table look at individual declarations of an
//! element's `style` attribute, so the attribute is split into an ordered
//! list of `property: value` pairs with cssparser.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
};

/// One declaration from an inline style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDeclaration {
    /// Property name, ASCII-lowercased.
    pub property: String,
    /// Value text with `!important` removed, trimmed and ASCII-lowercased.
    pub value: String,
    /// Whether the declaration carried `!important`.
    pub important: bool,
}

/// Parse the contents of a `style` attribute.
///
/// Malformed declarations are skipped; later declarations of the same
/// property are kept alongside earlier ones, in source order.
pub fn parse_inline_style(css: &str) -> Vec<StyleDeclaration> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut declarations = Vec::new();
    let mut decl_parser = InlineStyleParser {
        declarations: &mut declarations,
    };

    for result in RuleBodyParser::new(&mut parser, &mut decl_parser) {
        let _ = result;
    }

    declarations
}

/// Resolved value of `property`, mirroring how a browser's
/// `element.style[property]` resolves duplicates: the last `!important`
/// declaration wins, otherwise the last declaration.
pub fn style_value<'a>(declarations: &'a [StyleDeclaration], property: &str) -> Option<&'a str> {
    let mut matching = declarations.iter().rev().filter(|d| d.property == property);
    let last = matching.clone().next()?;
    matching
        .find(|d| d.important)
        .or(Some(last))
        .map(|d| d.value.as_str())
}

struct InlineStyleParser<'a> {
    declarations: &'a mut Vec<StyleDeclaration>,
}

impl<'i> AtRuleParser<'i> for InlineStyleParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> QualifiedRuleParser<'i> for InlineStyleParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> DeclarationParser<'i> for InlineStyleParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        let mut end = start;
        let mut important = false;
        while !input.is_exhausted() {
            if input.try_parse(cssparser::parse_important).is_ok() {
                important = true;
                break;
            }
            input.next()?;
            end = input.position();
        }

        let raw = input.slice(start..end).trim();
        if raw.is_empty() {
            return Err(input.new_custom_error(()));
        }

        self.declarations.push(StyleDeclaration {
            property: name.to_ascii_lowercase(),
            value: raw.to_ascii_lowercase(),
            important,
        });
        Ok(())
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for InlineStyleParser<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}
