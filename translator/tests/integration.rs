use std::io::Write;
use std::path::Path;

fn run(source: &str) -> String {
    translator::translate_string(source, Path::new("template.pug")).expect("translation failed")
}

fn run_err(source: &str) -> translator::RenderError {
    translator::translate_string(source, Path::new("template.pug"))
        .expect_err("translation unexpectedly succeeded")
}

#[test]
fn minimal_tag_chain() {
    let html = run("html\n\thead\n\t\ttitle= \"x\"\n\tbody\n\t\tp Hello\n");
    assert_eq!(
        html,
        "<html>\n\t<head>\n\t\t<title>x</title>\n\t</head>\n\t<body>\n\t\t<p>Hello</p>\n\t</body>\n</html>\n"
    );
}

#[test]
fn classes_and_id() {
    let html = run("div#main.a.b\n\tspan.c hi\n");
    assert_eq!(
        html,
        "<div id=\"main\" class=\"a b\">\n\t<span class=\"c\">hi</span>\n</div>\n"
    );
}

#[test]
fn doctype_and_void_tags() {
    let html = run("doctype html\nimg(src=\"a.png\")\nbr\n");
    assert_eq!(html, "<!DOCTYPE html>\n<img src=\"a.png\" />\n<br />\n");
}

#[test]
fn each_loop() {
    let html = run("ul\n\teach x in [a,\"b\",c]\n\t\tli= x\n");
    assert_eq!(
        html,
        "<ul>\n\t\t<li>a</li>\n\t\t<li>b</li>\n\t\t<li>c</li>\n</ul>\n"
    );
}

#[test]
fn if_elif_else_takes_first_truthy() {
    let html = run("- var n = 2\nif n == 1\n\tp one\nelse if n == 2\n\tp two\nelse\n\tp other\n");
    assert!(html.contains("<p>two</p>"), "got: {}", html);
    assert!(!html.contains("<p>one</p>"));
    assert!(!html.contains("<p>other</p>"));
}

#[test]
fn if_truthy_skips_chain() {
    let html = run("- var n = 1\nif n == 1\n\tp one\nelse\n\tp other\n");
    assert!(html.contains("<p>one</p>"));
    assert!(!html.contains("<p>other</p>"));
}

#[test]
fn folding_block() {
    let html = run("p\n\t| hello\n\t| world\n");
    assert_eq!(html, "<p>helloworld</p>\n");
}

#[test]
fn folding_single_line() {
    let html = run("div\n\tp\n\t\t| x\n");
    assert_eq!(html, "<div>\n\t<p>x</p>\n</div>\n");
}

#[test]
fn folding_interpolates_variables() {
    let html = run("- var w = world\np\n\t| hello \n\t| #{w}\n");
    assert_eq!(html, "<p>hello world</p>\n");
}

#[test]
fn inline_tag_chain_closes_in_reverse() {
    let html = run("p: span: b hi\n");
    assert_eq!(html, "<p><span><b>hi</b></span></p>\n");
}

#[test]
fn childless_element_closes_inline() {
    assert_eq!(run("p\n"), "<p></p>\n");
}

#[test]
fn element_with_children_closes_on_own_line() {
    let html = run("p hi\n\tb x\n");
    assert_eq!(html, "<p>hi\n\t<b>x</b>\n</p>\n");
}

#[test]
fn escaped_inline_text() {
    assert_eq!(run("p= '<b>'\n"), "<p>&lt;b&gt;</p>\n");
}

#[test]
fn raw_inline_text() {
    assert_eq!(run("p!= '<b>'\n"), "<p><b></p>\n");
}

#[test]
fn literal_inline_text_is_not_escaped() {
    assert_eq!(run("p 1 < 2\n"), "<p>1 < 2</p>\n");
}

#[test]
fn var_and_const_define_variables() {
    assert_eq!(run("- var a = 'x'\np= a\n"), "<p>x</p>\n");
    assert_eq!(run("- const a = y\np= a\n"), "<p>y</p>\n");
}

#[test]
fn variable_interpolation_in_text() {
    let html = run("- var name = world\np Hello #{name}\n");
    assert_eq!(html, "<p>Hello world</p>\n");
}

#[test]
fn variable_interpolation_in_attributes() {
    let html = run("- var url = 'x.html'\na(href=\"#{url}\") link\n");
    assert_eq!(html, "<a href=\"x.html\">link</a>\n");
}

#[test]
fn unknown_interpolation_left_untouched() {
    assert_eq!(run("p #{nope}\n"), "<p>#{nope}</p>\n");
}

#[test]
fn comments_survive_and_interpolate() {
    let html = run("- var n = 1\n//- note #{n}\n");
    assert_eq!(html, "<!-- note 1 -->\n");
}

#[test]
fn raw_comments_are_dropped() {
    assert_eq!(run("// hidden\np ok\n"), "<p>ok</p>\n");
}

#[test]
fn raw_html_children_are_verbatim() {
    let html = run("div\n\t.\n\t\t<b>bold</b>\n\t\ttext\n");
    assert_eq!(html, "<div>\n\t\t<b>bold</b>\n\t\ttext\n</div>\n");
}

#[test]
fn case_selects_matching_when() {
    let source = "- var x = b\ncase x\n\twhen \"a\"\n\t\tp A\n\twhen \"b\"\n\t\tp B\n\tdefault\n\t\tp D\n";
    let html = run(source);
    assert!(html.contains("<p>B</p>"), "got: {}", html);
    assert!(!html.contains("<p>A</p>"));
    assert!(!html.contains("<p>D</p>"));
}

#[test]
fn case_empty_arm_falls_through() {
    let source = "- var x = a\ncase x\n\twhen \"a\"\n\twhen \"b\"\n\t\tp B\n";
    assert!(run(source).contains("<p>B</p>"));
}

#[test]
fn case_break_renders_nothing() {
    let source = "- var x = a\ncase x\n\twhen \"a\"\n\t\t- break\n\tdefault\n\t\tp D\n";
    assert_eq!(run(source), "");
}

#[test]
fn case_falls_back_to_default() {
    let source = "case q\n\twhen \"a\"\n\t\tp A\n\tdefault\n\t\tp D\n";
    assert!(run(source).contains("<p>D</p>"));
}

#[test]
fn case_without_match_or_default_is_empty() {
    assert_eq!(run("case q\n\twhen \"a\"\n\t\tp A\n"), "");
}

#[test]
fn case_duplicate_default_errors() {
    let source = "case q\n\tdefault\n\t\tp A\n\tdefault\n\t\tp B\n";
    assert!(run_err(source).to_string().contains("default"));
}

#[test]
fn case_when_quote_mismatch_errors() {
    assert!(run_err("case q\n\twhen \"a'\n\t\tp A\n").to_string().contains("syntax"));
}

#[test]
fn for_loop_counts_and_drops_context() {
    let html = run("- var i = 9\n- for (var i = 0; i < 2; i += 1)\n\tli= i\np= i\n");
    assert_eq!(html, "\t<li>0</li>\n\t<li>1</li>\n<p>9</p>\n");
}

#[test]
fn each_retains_final_context() {
    let html = run("each x in [a,b]\n\tli= x\np= x\n");
    assert_eq!(html, "\t<li>a</li>\n\t<li>b</li>\n<p>b</p>\n");
}

#[test]
fn each_empty_list_renders_nothing() {
    assert_eq!(run("ul\n\teach x in []\n\t\tli= x\n"), "<ul>\n</ul>\n");
}

#[test]
fn each_does_not_define_on_empty_list() {
    let html = run("each x in []\n\tli= x\np= x\n");
    assert_eq!(html, "<p>x</p>\n");
}

#[test]
fn if_condition_assignment_is_truthy_but_scoped() {
    // An assignment is a valid (always truthy) condition, but the if
    // directive does not keep its context update.
    let html = run("- var x = 1\nif x += 4\n\tp #{x}\n");
    assert_eq!(html, "\t<p>1</p>\n");
}

#[test]
fn block_stores_then_overrides() {
    let html = run("block greeting\n\tp hi\nblock greeting\n");
    assert_eq!(html, "\t<p>hi</p>\n");
}

#[test]
fn bare_condition_is_rejected() {
    let err = run_err("- var n = 1\nif n\n\tp one\n");
    assert!(err.to_string().contains("expression"), "got: {}", err);
}

#[test]
fn misplaced_else_errors() {
    let source = "if 1 == 2\n\tp a\nelse\n\tp b\nelse\n\tp c\n";
    assert!(run_err(source).to_string().contains("else"));
}

#[test]
fn folding_at_top_level_errors() {
    assert!(run_err("| top\n").to_string().contains("top level"));
}

#[test]
fn malformed_element_head_errors() {
    assert!(matches!(
        run_err("<b>hi</b>\n"),
        translator::RenderError::Syntax(_)
    ));
}

#[test]
fn every_open_tag_is_closed() {
    let html = run("html\n\tbody\n\t\tdiv#a.b\n\t\t\tp deep\n\t\tp: span chain\n");
    for tag in ["html", "body", "div", "p", "span"] {
        let opens = html.matches(&format!("<{}", tag)).count();
        let closes = html.matches(&format!("</{}>", tag)).count();
        assert_eq!(opens, closes, "unbalanced <{}> in: {}", tag, html);
    }
}

#[test]
fn attribute_values_use_double_quotes() {
    let html = run("a(href='x' title='y') t\n");
    assert!(html.contains("href=\"x\""));
    assert!(html.contains("title=\"y\""));
    assert!(!html.contains('\''));
}

#[test]
fn include_splices_sibling_file() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    let part = dir.path().join("part.pug");
    let mut f = std::fs::File::create(&part).unwrap();
    write!(f, "p included\n").unwrap();

    let main = dir.path().join("main.pug");
    let mut f = std::fs::File::create(&main).unwrap();
    write!(f, "div\n\tinclude part.pug\n").unwrap();

    let html = translator::translate_file(&main).expect("translation failed");
    assert_eq!(html, "<div>\n\t<p>included</p>\n</div>\n");
}

#[test]
fn extends_behaves_like_include() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    let layout = dir.path().join("layout.pug");
    let mut f = std::fs::File::create(&layout).unwrap();
    write!(f, "html\n\tbody\n\t\tblock content\n").unwrap();

    let main = dir.path().join("page.pug");
    let mut f = std::fs::File::create(&main).unwrap();
    write!(f, "extends layout.pug\n").unwrap();

    let html = translator::translate_file(&main).expect("translation failed");
    assert_eq!(html, "<html>\n\t<body>\n\t</body>\n</html>\n");
}

#[test]
fn nested_include_resolves_against_root() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    let inner = dir.path().join("inner.pug");
    let mut f = std::fs::File::create(&inner).unwrap();
    write!(f, "p deep\n").unwrap();

    let outer = dir.path().join("outer.pug");
    let mut f = std::fs::File::create(&outer).unwrap();
    write!(f, "include inner.pug\n").unwrap();

    let main = dir.path().join("main.pug");
    let mut f = std::fs::File::create(&main).unwrap();
    write!(f, "div\n\tinclude outer.pug\n").unwrap();

    let html = translator::translate_file(&main).expect("translation failed");
    assert_eq!(html, "<div>\n\t<p>deep</p>\n</div>\n");
}

#[test]
fn include_variables_reach_the_parent() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    let vars = dir.path().join("vars.pug");
    let mut f = std::fs::File::create(&vars).unwrap();
    write!(f, "- var from = sub\n").unwrap();

    let main = dir.path().join("main.pug");
    let mut f = std::fs::File::create(&main).unwrap();
    write!(f, "include vars.pug\np= from\n").unwrap();

    let html = translator::translate_file(&main).expect("translation failed");
    assert_eq!(html, "<p>sub</p>\n");
}

#[test]
fn missing_include_is_an_io_error() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let main = dir.path().join("main.pug");
    let mut f = std::fs::File::create(&main).unwrap();
    write!(f, "include nope.pug\n").unwrap();

    let err = translator::translate_file(&main).unwrap_err();
    assert!(matches!(err, translator::RenderError::Io { .. }));
}

#[test]
fn self_include_hits_the_depth_limit() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let main = dir.path().join("loop.pug");
    let mut f = std::fs::File::create(&main).unwrap();
    write!(f, "include loop.pug\n").unwrap();

    let err = translator::translate_file(&main).unwrap_err();
    assert!(err.to_string().contains("depth"), "got: {}", err);
}
