//! Pest front-end for the filter query grammar.
//!
//! Parses query text with the pest grammar and replays the resulting pair
//! tree as [`QueryListener`] events.

use pest::error::{InputLocation, LineColLocation};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::listener::{Production, QueryListener, Token};
use crate::error::SyntaxError;

#[derive(Parser)]
#[grammar = "parser/grammar.pest"]
struct QueryGrammar;

/// Parses `text` and feeds the parse tree to `listener`.
///
/// Events are only emitted for syntactically valid text. With `trace` set,
/// every event is logged at trace level.
///
/// # Errors
///
/// Returns the syntax errors found in `text`.
pub fn walk_query(
    text: &str,
    listener: &mut dyn QueryListener,
    trace: bool,
) -> std::result::Result<(), Vec<SyntaxError>> {
    let mut pairs =
        QueryGrammar::parse(Rule::query, text).map_err(|e| vec![syntax_error(text, e)])?;
    let Some(root) = pairs.next() else {
        return Err(vec![SyntaxError {
            line: 1,
            col: 1,
            token: "<EOF>".into(),
            message: "no query found".into(),
        }]);
    };

    let mut walker = Walker { listener, trace };
    walker.walk(root);
    Ok(())
}

/// Checks `text` against the grammar without building anything.
///
/// Empty text is the match-all query and has no errors.
#[must_use]
pub fn check_syntax(text: &str) -> Vec<SyntaxError> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    match QueryGrammar::parse(Rule::query, text) {
        Ok(_) => Vec::new(),
        Err(e) => vec![syntax_error(text, e)],
    }
}

fn syntax_error(text: &str, e: pest::error::Error<Rule>) -> SyntaxError {
    let (line, col) = match e.line_col {
        LineColLocation::Pos((l, c)) | LineColLocation::Span((l, c), _) => (l, c),
    };
    let pos = match e.location {
        InputLocation::Pos(p) | InputLocation::Span((p, _)) => p,
    };
    let e = e.renamed_rules(describe_rule);
    SyntaxError {
        line,
        col,
        token: offending_token(text, pos),
        message: e.variant.message().to_string(),
    }
}

fn offending_token(text: &str, pos: usize) -> String {
    let rest = text.get(pos..).unwrap_or("");
    let token: String = rest
        .trim_start()
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    if token.is_empty() {
        "<EOF>".into()
    } else {
        token
    }
}

fn describe_rule(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of query".into(),
        Rule::comparison_op => "comparison operator".into(),
        Rule::identifier => "symbol".into(),
        Rule::string_literal => "string".into(),
        Rule::int_literal | Rule::float_literal | Rule::unsigned_int => "number".into(),
        Rule::datetime_literal => "datetime".into(),
        Rule::bool_literal => "true or false".into(),
        Rule::null_literal => "null".into(),
        Rule::in_op | Rule::not_in_op => "in".into(),
        Rule::between_op | Rule::not_between_op => "between".into(),
        Rule::contains_op | Rule::not_contains_op => "contains".into(),
        Rule::and_kw => "and".into(),
        Rule::or_kw => "or".into(),
        Rule::sort_kw => "sort".into(),
        Rule::skip_kw => "skip".into(),
        Rule::limit_kw => "limit".into(),
        other => format!("{other:?}"),
    }
}

struct Walker<'l> {
    listener: &'l mut dyn QueryListener,
    trace: bool,
}

impl Walker<'_> {
    fn walk(&mut self, pair: Pair<'_, Rule>) {
        let rule = pair.as_rule();
        if let Some(token) = token_for(rule) {
            self.terminal(token, pair.as_str());
            return;
        }
        match rule {
            Rule::expression => self.walk_chain(pair, Production::Or),
            Rule::and_expr => self.walk_chain(pair, Production::And),
            _ => match production_for(&pair) {
                Some(production) => {
                    self.enter(production);
                    for inner in pair.into_inner() {
                        self.walk(inner);
                    }
                    self.exit(production);
                }
                None => {
                    for inner in pair.into_inner() {
                        self.walk(inner);
                    }
                }
            },
        }
    }

    /// Emits a left-associative chain: the first operand, then for each
    /// following operand the operand and the closing production.
    fn walk_chain(&mut self, pair: Pair<'_, Rule>, production: Production) {
        let mut operands = pair
            .into_inner()
            .filter(|p| !matches!(p.as_rule(), Rule::and_kw | Rule::or_kw));
        if let Some(first) = operands.next() {
            self.walk(first);
        }
        for operand in operands {
            self.enter(production);
            self.walk(operand);
            self.exit(production);
        }
    }

    fn enter(&mut self, production: Production) {
        if self.trace {
            log::trace!("enter {production}");
        }
        self.listener.enter(production);
    }

    fn exit(&mut self, production: Production) {
        if self.trace {
            log::trace!("exit {production}");
        }
        self.listener.exit(production);
    }

    fn terminal(&mut self, token: Token, text: &str) {
        if self.trace {
            log::trace!("terminal {token} {text:?}");
        }
        self.listener.terminal(token, text);
    }
}

fn production_for(pair: &Pair<'_, Rule>) -> Option<Production> {
    let production = match pair.as_rule() {
        Rule::query => Production::Query,
        Rule::binary_expr | Rule::contains_expr => Production::BinaryExpr,
        Rule::in_expr => Production::InArrayExpr,
        Rule::between_expr => Production::BetweenExpr,
        Rule::set_function => Production::SetFunction,
        Rule::count_function | Rule::is_empty_expr => {
            let filtered = pair
                .clone()
                .into_inner()
                .any(|p| p.as_rule() == Rule::expression);
            if filtered {
                Production::FilteredSetFunction
            } else {
                Production::SetFunction
            }
        }
        Rule::string_array => Production::StringArray,
        Rule::number_array => Production::NumberArray,
        Rule::datetime_array => Production::DatetimeArray,
        Rule::not_expr => Production::Not,
        Rule::sort_clause => Production::SortBy,
        Rule::sort_field => Production::SortField,
        Rule::skip_clause => Production::Skip,
        Rule::limit_clause => Production::Limit,
        _ => return None,
    };
    Some(production)
}

fn token_for(rule: Rule) -> Option<Token> {
    let token = match rule {
        Rule::identifier => Token::Identifier,
        Rule::int_literal | Rule::unsigned_int => Token::Integer,
        Rule::float_literal => Token::Float,
        Rule::string_literal => Token::String,
        Rule::datetime_literal => Token::Datetime,
        Rule::bool_literal => Token::Bool,
        Rule::null_literal => Token::Null,
        Rule::comparison_op => Token::Comparison,
        Rule::in_op => Token::In,
        Rule::not_in_op => Token::NotIn,
        Rule::between_op => Token::Between,
        Rule::not_between_op => Token::NotBetween,
        Rule::contains_op => Token::Contains,
        Rule::not_contains_op => Token::NotContains,
        Rule::all_of_kw => Token::AllOf,
        Rule::any_of_kw => Token::AnyOf,
        Rule::none_of_kw => Token::NoneOf,
        Rule::count_kw => Token::Count,
        Rule::is_empty_kw => Token::IsEmpty,
        Rule::asc_kw => Token::Asc,
        Rule::desc_kw => Token::Desc,
        Rule::limit_none => Token::LimitNone,
        _ => return None,
    };
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl QueryListener for Recorder {
        fn enter(&mut self, production: Production) {
            self.events.push(format!("+{production}"));
        }

        fn exit(&mut self, production: Production) {
            self.events.push(format!("-{production}"));
        }

        fn terminal(&mut self, token: Token, text: &str) {
            self.events.push(format!("{token}:{text}"));
        }
    }

    fn events(text: &str) -> Vec<String> {
        let mut recorder = Recorder::default();
        walk_query(text, &mut recorder, false).unwrap();
        recorder.events
    }

    #[test]
    fn test_simple_comparison_events() {
        assert_eq!(
            events("a = 1"),
            vec![
                "+Query",
                "+BinaryExpr",
                "Identifier:a",
                "Comparison:=",
                "Integer:1",
                "-BinaryExpr",
                "-Query",
            ]
        );
    }

    #[test]
    fn test_and_chain_is_left_associative() {
        let events = events("a = 1 and b = 2 and c = 3");
        let ands: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.as_str() == "-And")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(ands.len(), 2);
        // The first And closes right after b = 2.
        assert_eq!(events[ands[0] - 1], "-BinaryExpr");
        assert_eq!(events[ands[0] - 2], "Integer:2");
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let events = events("A = 1 AND NOT b != 2 SORT BY a DESC LIMIT NONE");
        assert!(events.contains(&"+Not".to_string()));
        assert!(events.contains(&"Desc:DESC".to_string()));
        assert!(events.contains(&"LimitNone:NONE".to_string()));
    }

    #[test]
    fn test_symbol_prefixed_with_keyword() {
        let events = events("notes = 1 or order = 2");
        assert!(events.contains(&"Identifier:notes".to_string()));
        assert!(events.contains(&"Identifier:order".to_string()));
        assert!(events.contains(&"-Or".to_string()));
    }

    #[test]
    fn test_filtered_count() {
        let events = events("count(links where weight > 3) > 1");
        assert!(events.contains(&"+FilteredSetFunction".to_string()));
        assert!(events.contains(&"Count:count".to_string()));
    }

    #[test]
    fn test_not_in_operator_token() {
        let events = events(r#"tag not  in ("a", "b")"#);
        assert!(events.contains(&"NotIn:not  in".to_string()));
        assert!(events.contains(&"+StringArray".to_string()));
    }

    #[test]
    fn test_syntax_error_position() {
        let errors = check_syntax("a = = 1");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[0].col, 5);
        assert_eq!(errors[0].token, "=");
    }

    #[test]
    fn test_syntax_error_at_end() {
        let errors = check_syntax("a =");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].token, "<EOF>");
    }
}
