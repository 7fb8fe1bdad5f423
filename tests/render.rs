//! End-to-end rendering: literals, echo tags, expressions, and the
//! scanner's whitespace rules.

use pretty_assertions::assert_eq;
use weft::{render, UserMap, UserValue};

fn seed(pairs: &[(&str, UserValue)]) -> UserMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn literal_text_round_trips() {
    let src = "hello world\nsecond line\n";
    let (out, diags) = render(src, UserMap::default());
    assert_eq!(out, src);
    assert!(diags.is_empty());
}

#[test]
fn echo_evaluates_arithmetic_with_precedence() {
    let (out, diags) = render("{= 2 + 3 * 4 =}", UserMap::default());
    assert_eq!(out, "14");
    assert!(diags.is_empty());
}

#[test]
fn numbers_render_signed() {
    let (out, _) = render("{= 0 - 2 =}", UserMap::default());
    assert_eq!(out, "-2");

    let (out, _) = render("{= - 7 + 10 =}", UserMap::default());
    assert_eq!(out, "3");
}

#[test]
fn strings_concatenate_and_compare() {
    let env = seed(&[("name", "world".into())]);
    let (out, diags) = render("{= \"hello \" + name =}", env);
    assert_eq!(out, "hello world");
    assert!(diags.is_empty());

    let (out, _) = render("{= \"abc\" lt \"abd\" =}", UserMap::default());
    assert_eq!(out, "true");
}

#[test]
fn booleans_render_as_words() {
    let (out, _) = render("{= true =}/{= not true =}", UserMap::default());
    assert_eq!(out, "true/false");
}

#[test]
fn division_by_zero_emits_null_and_logs() {
    let (out, diags) = render("{= 5 / 0 =}", UserMap::default());
    assert_eq!(out, "<null>");
    assert!(diags.any_contains("divide"));
}

#[test]
fn mismatched_operand_types_emit_null_and_log() {
    let (out, diags) = render("{= 1 + \"a\" =}", UserMap::default());
    assert_eq!(out, "<null>");
    assert!(diags.any_contains("mismatched"));
}

#[test]
fn undefined_identifier_prints_null() {
    let (out, diags) = render("[{= nope =}]", UserMap::default());
    assert_eq!(out, "[<null>]");
    assert_eq!(diags.len(), 1);
}

#[test]
fn list_and_map_indexing() {
    let env = seed(&[
        ("nums", vec![10u64, 20, 30].into()),
        ("ages", {
            let mut m = std::collections::BTreeMap::new();
            m.insert("bob".to_string(), 44u64);
            m.into()
        }),
    ]);
    let (out, diags) = render("{= nums[1] =} {= ages[\"bob\"] =}", env);
    assert_eq!(out, "20 44");
    assert!(diags.is_empty());
}

#[test]
fn out_of_range_index_prints_null() {
    let env = seed(&[("nums", vec![1u64].into())]);
    let (out, diags) = render("{= nums[9] =}", env);
    assert_eq!(out, "<null>");
    assert!(diags.any_contains("out of range"));
}

#[test]
fn missing_map_key_prints_null() {
    let env = seed(&[("ages", {
        let mut m = std::collections::BTreeMap::new();
        m.insert("ann".to_string(), 30u64);
        m.into()
    })]);
    let (out, diags) = render("{= ages[\"zed\"] =}", env);
    assert_eq!(out, "<null>");
    assert!(diags.any_contains("not found"));
}

#[test]
fn whitespace_only_lines_are_compacted() {
    let (out, _) = render("x\n   \ny\n", UserMap::default());
    assert_eq!(out, "x\n\ny\n");
}

#[test]
fn whitespace_survives_before_an_echo_tag() {
    let (out, _) = render("   {= 1 =}", UserMap::default());
    assert_eq!(out, "   1");
}

#[test]
fn statement_tags_swallow_their_newline() {
    let (out, diags) = render("{% if true %}\nA\n{% endif %}\n", UserMap::default());
    assert_eq!(out, "A\n");
    assert!(diags.is_empty());
}

#[test]
fn tag_without_mandatory_space_stays_literal() {
    let src = "{%no space%}";
    let (out, _) = render(src, UserMap::default());
    assert_eq!(out, src);
}

#[test]
fn tag_with_mismatched_closer_stays_literal() {
    let src = "{% if x =}";
    let (out, diags) = render(src, UserMap::default());
    assert_eq!(out, src);
    assert!(diags.any_contains("malformed"));
}

#[test]
fn untokenizable_tag_is_skipped_entirely() {
    let (out, diags) = render("a{% if @ %}b", UserMap::default());
    assert_eq!(out, "ab");
    assert!(diags.any_contains("unexpected character"));
}

#[test]
fn wrapping_arithmetic_does_not_panic() {
    let (out, diags) = render("{= 0 - 1 =}", UserMap::default());
    assert_eq!(out, "-1");
    assert!(diags.is_empty());
}
