//! Tests for the editor schema: parse rules, output templates, lists and
//! the JSON form.

use richtext_schema::{Fragment, Node, ParseOptions, WhitespaceMode, editor};
use serde_json::{Value, json};

fn parse(html: &str) -> Node {
    editor::parser()
        .parse(html, &ParseOptions::default())
        .expect("parse")
}

fn parse_json(html: &str) -> Value {
    parse(html).to_json(editor::schema()).expect("to_json")
}

fn render(doc: &Node) -> String {
    editor::serializer().to_html(doc.content()).expect("to_html")
}

fn doc(blocks: Vec<Value>) -> Value {
    json!({ "type": "doc", "content": blocks })
}

fn p(content: Vec<Value>) -> Value {
    json!({ "type": "paragraph", "content": content })
}

fn text(s: &str) -> Value {
    json!({ "type": "text", "text": s })
}

fn marked(s: &str, marks: &[&str]) -> Value {
    let marks: Vec<Value> = marks.iter().map(|m| json!({ "type": m })).collect();
    json!({ "type": "text", "marks": marks, "text": s })
}

fn from_json(value: &Value) -> Node {
    editor::schema().node_from_json(value).expect("from_json")
}

// ============================================================================
// Node rules
// ============================================================================

#[test]
fn test_paragraph() {
    assert_eq!(parse_json("<p>Hello</p>"), doc(vec![p(vec![text("Hello")])]));
}

#[test]
fn test_horizontal_rule() {
    assert_eq!(
        parse_json("<p>a</p><hr><p>b</p>"),
        doc(vec![
            p(vec![text("a")]),
            json!({ "type": "horizontal_rule" }),
            p(vec![text("b")]),
        ])
    );
}

#[test]
fn test_heading_levels() {
    for level in 1..=6 {
        let parsed = parse_json(&format!("<h{level}>Title</h{level}>"));
        assert_eq!(
            parsed,
            doc(vec![json!({
                "type": "heading",
                "attrs": { "level": level },
                "content": [text("Title")],
            })])
        );
    }
}

#[test]
fn test_heading_level_from_h3() {
    let parsed = parse("<h3>x</h3>");
    assert_eq!(parsed.child(0).unwrap().attr("level"), Some(&json!(3)));
}

#[test]
fn test_hard_break() {
    assert_eq!(
        parse_json("<p>one<br>two</p>"),
        doc(vec![p(vec![
            text("one"),
            json!({ "type": "hard_break" }),
            text("two"),
        ])])
    );
}

#[test]
fn test_bare_text_is_wrapped_in_paragraph() {
    assert_eq!(parse_json("just text"), doc(vec![p(vec![text("just text")])]));
}

#[test]
fn test_empty_body_gets_a_paragraph() {
    assert_eq!(parse_json(""), doc(vec![json!({ "type": "paragraph" })]));
}

// ============================================================================
// Mark rules
// ============================================================================

#[test]
fn test_underline() {
    let expected = doc(vec![p(vec![marked("u", &["u"])])]);
    assert_eq!(parse_json("<p><u>u</u></p>"), expected);
    assert_eq!(
        parse_json(r#"<p><span style="text-decoration: underline">u</span></p>"#),
        expected
    );
}

#[test]
fn test_emphasis() {
    let expected = doc(vec![p(vec![marked("i", &["em"])])]);
    assert_eq!(parse_json("<p><i>i</i></p>"), expected);
    assert_eq!(parse_json("<p><em>i</em></p>"), expected);
    assert_eq!(
        parse_json(r#"<p><span style="font-style:italic">i</span></p>"#),
        expected
    );
}

#[test]
fn test_strong_tags() {
    let expected = doc(vec![p(vec![marked("text", &["strong"])])]);
    assert_eq!(parse_json("<p><strong>text</strong></p>"), expected);
    assert_eq!(parse_json("<p><b>text</b></p>"), expected);
    assert_eq!(parse_json("<b>text</b>"), expected);
}

#[test]
fn test_b_with_normal_weight_is_not_bold() {
    assert_eq!(
        parse_json(r#"<b style="font-weight:normal">text</b>"#),
        doc(vec![p(vec![text("text")])])
    );
}

#[test]
fn test_important_normal_weight_wins() {
    assert_eq!(
        parse_json(r#"<b style="font-weight:normal !important; font-weight: bold">x</b>"#),
        doc(vec![p(vec![text("x")])])
    );
    assert_eq!(
        parse_json(r#"<span style="font-weight: 700 !important; font-weight: 300">x</span>"#),
        doc(vec![p(vec![marked("x", &["strong"])])])
    );
}

#[test]
fn test_font_weight_styles() {
    let bold = doc(vec![p(vec![marked("text", &["strong"])])]);
    let plain = doc(vec![p(vec![text("text")])]);
    assert_eq!(parse_json(r#"<span style="font-weight:700">text</span>"#), bold);
    assert_eq!(parse_json(r#"<span style="font-weight: bold">text</span>"#), bold);
    assert_eq!(parse_json(r#"<span style="font-weight:bolder">text</span>"#), bold);
    assert_eq!(parse_json(r#"<span style="font-weight:300">text</span>"#), plain);
    assert_eq!(parse_json(r#"<span style="font-weight:normal">text</span>"#), plain);
}

#[test]
fn test_google_docs_paste() {
    let html = r#"<meta charset="utf-8"><b style="font-weight:normal;" id="docs-internal-guid-1234"><p dir="ltr"><span style="font-weight:400;font-style:normal">Plain </span><span style="font-weight:700">bold</span></p><p dir="ltr"><span style="font-style:italic;text-decoration:underline">both</span></p></b>"#;
    assert_eq!(
        parse_json(html),
        doc(vec![
            p(vec![text("Plain "), marked("bold", &["strong"])]),
            p(vec![marked("both", &["u", "em"])]),
        ])
    );
}

#[test]
fn test_marks_are_ordered_by_rank() {
    assert_eq!(
        parse_json("<p><strong><em><u>x</u></em></strong></p>"),
        doc(vec![p(vec![marked("x", &["u", "em", "strong"])])])
    );
}

#[test]
fn test_marks_outside_blocks_reach_text() {
    assert_eq!(
        parse_json("<em><p>a</p><p>b</p></em>"),
        doc(vec![p(vec![marked("a", &["em"])]), p(vec![marked("b", &["em"])])])
    );
}

// ============================================================================
// Lists
// ============================================================================

#[test]
fn test_bullet_list() {
    assert_eq!(
        parse_json("<ul><li><p>one</p></li><li>two</li></ul>"),
        doc(vec![json!({
            "type": "bullet_list",
            "content": [
                { "type": "list_item", "content": [p(vec![text("one")])] },
                { "type": "list_item", "content": [p(vec![text("two")])] },
            ],
        })])
    );
}

#[test]
fn test_ordered_list_start() {
    let parsed = parse(r#"<ol start="3"><li>x</li></ol>"#);
    let list = parsed.child(0).unwrap();
    assert_eq!(list.attr("order"), Some(&json!(3)));

    let parsed = parse("<ol><li>x</li></ol>");
    assert_eq!(parsed.child(0).unwrap().attr("order"), Some(&json!(1)));

    let parsed = parse(r#"<ol start="abc"><li>x</li></ol>"#);
    assert_eq!(parsed.child(0).unwrap().attr("order"), Some(&json!(1)));
}

#[test]
fn test_ordered_list_renders_start() {
    assert_eq!(
        render(&parse(r#"<ol start="4"><li>x</li></ol>"#)),
        r#"<ol start="4"><li><p>x</p></li></ol>"#
    );
    assert_eq!(
        render(&parse("<ol><li>x</li></ol>")),
        "<ol><li><p>x</p></li></ol>"
    );
}

#[test]
fn test_nested_list_is_moved_into_item() {
    assert_eq!(
        parse_json("<ul><li>a</li><ul><li>b</li></ul></ul>"),
        doc(vec![json!({
            "type": "bullet_list",
            "content": [{
                "type": "list_item",
                "content": [
                    p(vec![text("a")]),
                    {
                        "type": "bullet_list",
                        "content": [{ "type": "list_item", "content": [p(vec![text("b")])] }],
                    },
                ],
            }],
        })])
    );
}

#[test]
fn test_list_item_outside_list_gets_wrapped() {
    let parsed = parse("<li>stray</li>");
    let list = parsed.child(0).unwrap();
    let name = editor::schema().node_type(list.type_id()).name();
    assert!(name == "ordered_list" || name == "bullet_list", "{name}");
    parsed.check(editor::schema()).unwrap();
}

#[test]
fn test_lists_are_blocks() {
    let schema = editor::schema();
    let doc_match = schema.top_node_type().content_match(schema);
    for name in ["ordered_list", "bullet_list"] {
        let id = schema.node_type_by_name(name).unwrap().id();
        assert!(doc_match.match_type(id).is_some(), "{name}");
    }

    let item = schema.node_type_by_name("list_item").unwrap();
    let paragraph = schema.node_type_by_name("paragraph").unwrap().id();
    let hr = schema.node_type_by_name("horizontal_rule").unwrap().id();
    let after_para = item.content_match(schema).match_type(paragraph).unwrap();
    assert!(after_para.valid_end());
    assert!(after_para.match_type(hr).is_some());
    assert!(item.content_match(schema).match_type(hr).is_none());
}

#[test]
fn test_list_item_requires_paragraph_first() {
    let bad = from_json(&doc(vec![json!({
        "type": "bullet_list",
        "content": [{ "type": "list_item", "content": [{ "type": "horizontal_rule" }] }],
    })]));
    assert!(bad.check(editor::schema()).is_err());
}

// ============================================================================
// Unknown markup and whitespace
// ============================================================================

/// Parse on a thread with a small stack, like a worker pool would.
fn parse_json_on_small_stack(html: String) -> Value {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || parse_json(&html))
        .expect("spawn")
        .join()
        .expect("parse thread")
}

#[test]
fn test_deeply_nested_inline_elements() {
    let n = 10_000;
    let html = format!("<p>{}x{}</p>", "<span>".repeat(n), "</span>".repeat(n));
    assert_eq!(parse_json_on_small_stack(html), doc(vec![p(vec![text("x")])]));
}

#[test]
fn test_deeply_nested_lists() {
    let n = 2_000;
    let html = format!("{}deep{}", "<ul><li>".repeat(n), "</li></ul>".repeat(n));
    let parsed = parse_json_on_small_stack(html);
    assert_eq!(parsed["content"][0]["type"], "bullet_list");
    assert!(parsed.to_string().contains("\"deep\""));
}

#[test]
fn test_unknown_elements_are_transparent() {
    assert_eq!(
        parse_json("<div>text<p>x</p></div><section><p>y</p></section>"),
        doc(vec![p(vec![text("text")]), p(vec![text("x")]), p(vec![text("y")])])
    );
    assert_eq!(
        parse_json("<p>a <span class=\"c\">b</span></p>"),
        doc(vec![p(vec![text("a b")])])
    );
}

#[test]
fn test_ignored_elements() {
    assert_eq!(
        parse_json("<p>a<script>alert(1)</script><style>p{}</style>b</p>"),
        doc(vec![p(vec![text("ab")])])
    );
}

#[test]
fn test_whitespace_collapses() {
    assert_eq!(
        parse_json("<p>  a \n\t b  </p>\n\n<p> c</p>"),
        doc(vec![p(vec![text("a b")]), p(vec![text("c")])])
    );
}

#[test]
fn test_space_before_mark_is_kept() {
    assert_eq!(
        parse_json("<p>a <em> b</em></p>"),
        doc(vec![p(vec![text("a "), marked("b", &["em"])])])
    );
}

#[test]
fn test_preserve_whitespace_modes() {
    let preserve = ParseOptions {
        preserve_whitespace: WhitespaceMode::Preserve,
        ..ParseOptions::default()
    };
    let parsed = editor::parser().parse("<p>a\n  b</p>", &preserve).unwrap();
    assert_eq!(parsed.text_content(), "a   b");

    let full = ParseOptions {
        preserve_whitespace: WhitespaceMode::Full,
        ..ParseOptions::default()
    };
    let parsed = editor::parser().parse("<p>a\r\n  b</p>", &full).unwrap();
    assert_eq!(parsed.text_content(), "a\n  b");
}

#[test]
fn test_parse_into_other_top_node() {
    let options = ParseOptions {
        top_node: Some("paragraph".into()),
        ..ParseOptions::default()
    };
    let parsed = editor::parser().parse("a <b>b</b>", &options).unwrap();
    assert_eq!(editor::schema().node_type(parsed.type_id()).name(), "paragraph");
    assert_eq!(parsed.child_count(), 2);
}

// ============================================================================
// Serialization and round trips
// ============================================================================

#[test]
fn test_render_all_types() {
    let value = doc(vec![
        json!({ "type": "heading", "attrs": { "level": 2 }, "content": [text("Title")] }),
        p(vec![
            text("a "),
            marked("b", &["em"]),
            marked("c", &["em", "strong"]),
            json!({ "type": "hard_break" }),
            marked("d", &["u"]),
        ]),
        json!({ "type": "horizontal_rule" }),
        json!({
            "type": "bullet_list",
            "content": [{ "type": "list_item", "content": [p(vec![text("x")])] }],
        }),
    ]);
    assert_eq!(
        render(&from_json(&value)),
        "<h2>Title</h2><p>a <em>b<strong>c</strong></em><br><u>d</u></p><hr><ul><li><p>x</p></li></ul>"
    );
}

#[test]
fn test_round_trip() {
    let value = doc(vec![
        json!({ "type": "heading", "attrs": { "level": 4 }, "content": [marked("Big", &["u"])] }),
        p(vec![
            text("plain "),
            marked("em", &["em"]),
            text(" "),
            marked("both", &["em", "strong"]),
            json!({ "type": "hard_break" }),
            text("after"),
        ]),
        json!({ "type": "horizontal_rule" }),
        json!({
            "type": "ordered_list",
            "attrs": { "order": 7 },
            "content": [
                { "type": "list_item", "content": [
                    p(vec![text("one")]),
                    { "type": "bullet_list", "content": [
                        { "type": "list_item", "content": [p(vec![text("nested")])] },
                    ] },
                ] },
                { "type": "list_item", "content": [p(vec![text("two")])] },
            ],
        }),
    ]);
    let original = from_json(&value);
    original.check(editor::schema()).unwrap();

    let html = render(&original);
    let reparsed = parse(&html);
    assert_eq!(reparsed, original, "{html}");
}

#[test]
fn test_serialize_single_node() {
    let schema = editor::schema();
    let strong = schema.mark("strong", None).unwrap();
    let node = schema.text("bold", vec![strong]).unwrap();
    let dom = editor::serializer().serialize_node(&node).unwrap();
    assert_eq!(
        richtext_schema::dom::inner_html(&dom, dom.document()),
        "<strong>bold</strong>"
    );
}

#[test]
fn test_escaping() {
    let value = doc(vec![p(vec![text("a < b & \"c\"")])]);
    let html = render(&from_json(&value));
    assert_eq!(html, "<p>a &lt; b &amp; &quot;c&quot;</p>");
    assert_eq!(parse_json(&html), value);
}

// ============================================================================
// Construction and JSON
// ============================================================================

#[test]
fn test_heading_default_level() {
    let schema = editor::schema();
    let heading = schema
        .node("heading", None, Fragment::empty(), vec![])
        .unwrap();
    assert_eq!(heading.attr("level"), Some(&json!(1)));
}

#[test]
fn test_json_round_trip() {
    let value = doc(vec![
        json!({ "type": "heading", "attrs": { "level": 1 }, "content": [text("T")] }),
        p(vec![marked("x", &["strong"])]),
    ]);
    let node = from_json(&value);
    assert_eq!(node.to_json(editor::schema()).unwrap(), value);
}

#[test]
fn test_json_errors() {
    let schema = editor::schema();
    assert!(schema.node_from_json(&json!({ "type": "blockquote" })).is_err());
    assert!(schema.node_from_json(&json!([1, 2])).is_err());
    assert!(
        schema
            .node_from_json(&json!({ "type": "text", "text": "" }))
            .is_err()
    );
    assert!(
        schema
            .node_from_json(&p(vec![marked("x", &["sparkle"])]))
            .is_err()
    );
}

#[test]
fn test_check_rejects_invalid_documents() {
    let schema = editor::schema();
    assert!(from_json(&json!({ "type": "doc", "content": [] })).check(schema).is_err());
    assert!(from_json(&doc(vec![text("loose")])).check(schema).is_err());
    assert!(from_json(&doc(vec![p(vec![])])).check(schema).is_ok());
}

#[test]
fn test_strong_text_parsed_inside_heading() {
    assert_eq!(
        parse_json("<h1>A <b>B</b></h1>"),
        doc(vec![json!({
            "type": "heading",
            "attrs": { "level": 1 },
            "content": [text("A "), marked("B", &["strong"])],
        })])
    );
}
