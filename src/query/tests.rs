use super::*;
use crate::credential::{
    builtin, AttributeValue, Credential, CredentialKind, CredentialScope, KindRegistry,
    UsernamePasswordCredentials,
};
use crate::error::CredentialsError;
use crate::matchers::CredentialsMatcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

#[derive(Debug, Default)]
struct Probe {
    properties: HashMap<String, AttributeValue>,
}

impl Probe {
    fn with(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }
}

impl Credential for Probe {
    fn kind(&self) -> &CredentialKind {
        &builtin::CREDENTIALS
    }

    fn property(&self, name: &str) -> Option<AttributeValue> {
        self.properties.get(name).cloned()
    }
}

fn probe(a: i32, b: i32, c: i32) -> Probe {
    Probe::default().with("a", a).with("b", b).with("c", c)
}

#[test_case("42", AttributeValue::Int(42) ; "decimal")]
#[test_case("-42", AttributeValue::Int(-42) ; "negated decimal")]
#[test_case("1_000_000", AttributeValue::Int(1_000_000) ; "underscores")]
#[test_case("0x1F", AttributeValue::Int(31) ; "hex")]
#[test_case("0xFFFFFFFF", AttributeValue::Int(-1) ; "hex all bits")]
#[test_case("017", AttributeValue::Int(15) ; "octal")]
#[test_case("0b101", AttributeValue::Int(5) ; "binary")]
#[test_case("3000000000L", AttributeValue::Int(3_000_000_000) ; "long")]
#[test_case("-2147483648", AttributeValue::Int(-2_147_483_648) ; "int min")]
#[test_case("1.5", AttributeValue::Float(1.5) ; "decimal float")]
#[test_case(".5", AttributeValue::Float(0.5) ; "leading dot")]
#[test_case("1e3", AttributeValue::Float(1000.0) ; "exponent")]
#[test_case("2f", AttributeValue::Float(2.0) ; "float suffix")]
#[test_case("1.5D", AttributeValue::Float(1.5) ; "double suffix")]
#[test_case("0x1.8p1", AttributeValue::Float(3.0) ; "hex float")]
#[test_case("'a'", AttributeValue::Char('a') ; "char")]
#[test_case(r"'\n'", AttributeValue::Char('\n') ; "char escape")]
#[test_case(r"'\101'", AttributeValue::Char('A') ; "octal escape")]
#[test_case(r"'\u0041'", AttributeValue::Char('A') ; "unicode escape")]
#[test_case(r"'\uu0041'", AttributeValue::Char('A') ; "repeated u")]
#[test_case(r#""tab\there""#, AttributeValue::from("tab\there") ; "string escape")]
#[test_case(r#""\uD83D\uDE00""#, AttributeValue::from("\u{1F600}") ; "surrogate pair")]
#[test_case(r#""""#, AttributeValue::from("") ; "empty string")]
#[test_case("true", AttributeValue::Bool(true) ; "boolean")]
#[test_case("null", AttributeValue::Null ; "null")]
#[test_case("CredentialsScope.GLOBAL", AttributeValue::from(CredentialScope::Global) ; "enum")]
fn test_literal_forms(literal: &str, expected: AttributeValue) {
    let matcher = parse(&format!("value == {}", literal)).unwrap();
    assert!(matcher.matches(&Probe::default().with("value", expected)));
    assert!(!matcher.matches(&Probe::default().with("value", "something else")));
}

#[test]
fn test_absent_property_does_not_match_null() {
    let matcher = parse("value == null").unwrap();
    assert!(!matcher.matches(&Probe::default()));
}

#[test]
fn test_tokens() {
    let kinds: Vec<TokenKind> = Lexer::new("a.b.C.D==-1L")
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Name("a.b.C.D".to_string()),
            TokenKind::EqEq,
            TokenKind::Minus,
            TokenKind::Number(NumberLiteral::Integer {
                radix: 10,
                digits: "1".to_string(),
                long: true,
            }),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    let matcher = parse("a == 1 || b == 1 && c == 1").unwrap();
    assert!(matcher.matches(&probe(1, 0, 0)));
    assert!(matcher.matches(&probe(0, 1, 1)));
    assert!(!matcher.matches(&probe(0, 1, 0)));
    assert_eq!(
        matcher.describe().as_deref(),
        Some("(a == 1 || (b == 1 && c == 1))")
    );
}

#[test]
fn test_parentheses_override_precedence() {
    let matcher = parse("(a == 1 || b == 1) && c == 1").unwrap();
    assert!(!matcher.matches(&probe(1, 0, 0)));
    assert!(matcher.matches(&probe(1, 0, 1)));
}

#[test]
fn test_same_operator_chains_are_flattened() {
    let matcher = parse("a == 1 && b == 2 && c == 3").unwrap();
    assert_eq!(
        matcher.describe().as_deref(),
        Some("(a == 1 && b == 2 && c == 3)")
    );
    assert!(matcher.matches(&probe(1, 2, 3)));

    let matcher = parse("a == 1 || (b == 2) || c == 3").unwrap();
    assert_eq!(
        matcher.describe().as_deref(),
        Some("(a == 1 || b == 2 || c == 3)")
    );
}

#[test]
fn test_whitespace_insensitive() {
    let compact = parse(r#"id=="a"&&(true)"#).unwrap();
    let spaced = parse("  id  ==\t\"a\"\n&& ( true )  ").unwrap();
    assert_eq!(compact.describe(), spaced.describe());
}

#[test]
fn test_negation_and_constants() {
    assert!(parse("true").unwrap().matches(&Probe::default()));
    assert!(!parse("false").unwrap().matches(&Probe::default()));
    assert!(parse("!false").unwrap().matches(&Probe::default()));
    assert!(parse("!!true").unwrap().matches(&Probe::default()));
    assert_eq!(parse("!(a == 1)").unwrap().describe().as_deref(), Some("!(a == 1)"));
}

#[test_case("username = \"bob\"", 9 ; "single equals")]
#[test_case("username == ", 12 ; "missing literal")]
#[test_case("(id == \"a\"", 10 ; "unclosed group")]
#[test_case("id == \"a\" )", 10 ; "trailing token")]
#[test_case("id == bob", 6 ; "bare identifier literal")]
#[test_case("x == 08", 5 ; "bad octal")]
#[test_case("x == 12abc", 5 ; "number followed by letters")]
#[test_case("é == 'ab'", 5 ; "offset counts characters")]
#[test_case("x == 2147483648", 5 ; "int overflow")]
#[test_case("x == 1e400", 5 ; "double overflow")]
#[test_case("x == \"open", 5 ; "unterminated string")]
#[test_case(r"x == '\q'", 5 ; "bad escape")]
#[test_case("instanceof", 10 ; "missing type")]
#[test_case("a.b == 1", 0 ; "dotted property")]
#[test_case("x == - \"a\"", 7 ; "minus before string")]
#[test_case("a == 1 & b == 2", 7 ; "single ampersand")]
#[test_case("!", 1 ; "dangling negation")]
#[test_case("", 0 ; "empty query")]
fn test_syntax_error_offsets(query: &str, offset: usize) {
    let err = parse(query).unwrap_err();
    assert!(
        matches!(err, CredentialsError::QuerySyntax { .. }),
        "unexpected error {:?}",
        err
    );
    assert_eq!(err.offset(), Some(offset), "{}", err);
}

#[test]
fn test_username_and_not_instance_of() {
    let matcher = parse(r#"(username == "bob") && !(instanceof LegacyCredential)"#).unwrap();

    let bob = UsernamePasswordCredentials::new(CredentialScope::Global, "b", "bob", "pw");
    let alice = UsernamePasswordCredentials::new(CredentialScope::Global, "a", "alice", "pw");
    assert!(matcher.matches(&bob));
    assert!(!matcher.matches(&alice));
}

#[test]
fn test_instance_of_checks_ancestors() {
    let creds = UsernamePasswordCredentials::new(CredentialScope::Global, "b", "bob", "pw");
    assert!(parse("instanceof StandardCredentials").unwrap().matches(&creds));
    assert!(parse("instanceof credscope.UsernameCredentials").unwrap().matches(&creds));
    assert!(!parse("instanceof CertificateCredentials").unwrap().matches(&creds));
}

#[test]
fn test_scope_enum_literal() {
    let matcher = parse("scope == CredentialsScope.SYSTEM").unwrap();
    let system = UsernamePasswordCredentials::new(CredentialScope::System, "s", "svc", "pw");
    let global = UsernamePasswordCredentials::new(CredentialScope::Global, "g", "svc", "pw");
    assert!(matcher.matches(&system));
    assert!(!matcher.matches(&global));
}

#[test]
fn test_nesting_limit() {
    let compiler = QueryCompiler::new(QueryConfig {
        max_nesting_depth: 3,
        ..QueryConfig::default()
    });
    assert!(compiler.compile("(((true)))").is_ok());
    assert!(matches!(
        compiler.compile("((((true))))"),
        Err(CredentialsError::QueryTooComplex { .. })
    ));
    assert!(matches!(
        compiler.compile("!!!!true"),
        Err(CredentialsError::QueryTooComplex { .. })
    ));

    let deep = format!("{}true{}", "(".repeat(100), ")".repeat(100));
    assert!(matches!(
        parse(&deep),
        Err(CredentialsError::QueryTooComplex { .. })
    ));
}

#[test]
fn test_length_limit() {
    let compiler = QueryCompiler::new(QueryConfig {
        max_query_length: 10,
        ..QueryConfig::default()
    });
    assert!(compiler.compile("true").is_ok());
    assert!(matches!(
        compiler.compile(r#"username == "bob""#),
        Err(CredentialsError::QueryTooComplex { .. })
    ));
}

#[test]
fn test_registry_canonicalizes_instance_of() {
    let compiler =
        QueryCompiler::default().with_registry(Arc::new(KindRegistry::with_builtins()));

    let matcher = compiler.compile("instanceof UsernamePasswordCredentials").unwrap();
    assert_eq!(
        matcher.describe().as_deref(),
        Some("instanceof credscope.UsernamePasswordCredentials")
    );

    let err = compiler.compile("instanceof LegacyCredential").unwrap_err();
    assert_eq!(err.offset(), Some(11));
}

#[test]
fn test_cache_stats() {
    let compiler = QueryCompiler::default();

    compiler.compile("id == \"a\"").unwrap();
    compiler.compile("id == \"a\"").unwrap();

    let stats = compiler.get_stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.hit_count, 1);
    assert_eq!(stats.miss_count, 1);
    assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);

    assert!(compiler.compile("id ==").is_err());
    assert_eq!(compiler.get_stats().size, 1);

    compiler.clear_cache();
    let stats = compiler.get_stats();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.hit_count, 0);
    assert_eq!(stats.miss_count, 0);
    assert_eq!(stats.hit_rate, 0.0);
}

#[test]
fn test_cached_matcher_is_shared() {
    let compiler = QueryCompiler::default();
    let first = compiler.compile("true").unwrap();
    let second = compiler.compile("true").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_expired_entries_are_recompiled() {
    let compiler = QueryCompiler::new(QueryConfig {
        cache_ttl: Duration::ZERO,
        ..QueryConfig::default()
    });
    compiler.compile("true").unwrap();
    compiler.compile("true").unwrap();

    let stats = compiler.get_stats();
    assert_eq!(stats.hit_count, 0);
    assert_eq!(stats.miss_count, 2);
}

#[test]
fn test_cache_size_is_bounded() {
    let compiler = QueryCompiler::new(QueryConfig {
        max_cache_size: 2,
        ..QueryConfig::default()
    });
    for i in 0..5 {
        compiler.compile(&format!("a == {}", i)).unwrap();
    }
    assert!(compiler.get_stats().size <= 2);
}
