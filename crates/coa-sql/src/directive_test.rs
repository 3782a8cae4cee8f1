use super::*;

const POST: &[DirectiveKey] = &DirectiveKey::POST_EXECUTE;

#[test]
fn test_key_parse_is_case_insensitive() {
    assert_eq!(DirectiveKey::parse("LOOP"), Some(DirectiveKey::Loop));
    assert_eq!(DirectiveKey::parse(" save "), Some(DirectiveKey::Save));
    assert_eq!(DirectiveKey::parse("vis"), None);
}

#[test]
fn test_extract_replaces_and_records() {
    let ext = extract("select {id} /*{{loop:people.csv}}*/", "", &[]);
    assert_eq!(ext.text, "select {id} ");
    assert_eq!(ext.get(DirectiveKey::Loop), Some("people.csv"));
}

#[test]
fn test_extract_trims_key_and_value() {
    let ext = extract("/*{{ Temp : dates.csv }}*/", "", &[]);
    assert_eq!(ext.get(DirectiveKey::Temp), Some("dates.csv"));
}

#[test]
fn test_value_splits_on_first_colon_only() {
    let ext = extract("/*{{file:C:/sql/inc.sql}}*/", "", &[]);
    assert_eq!(ext.get(DirectiveKey::File), Some("C:/sql/inc.sql"));
}

#[test]
fn test_empty_value_allowed() {
    let ext = extract("/*{{call:}}*/", "", &[]);
    assert_eq!(ext.get(DirectiveKey::Call), Some(""));
}

#[test]
fn test_annotation_pattern() {
    let ext = extract("/*{{temp:dates.csv}}*/", ANNOTATION_PATTERN, &[]);
    assert_eq!(ext.text, "/* {{replaceMe:temp}} */");
}

#[test]
fn test_pattern_tokens() {
    let ext = extract("/*{{save:x.csv}}*/", "[{cmdkey}={cmdvalue}]", &[]);
    assert_eq!(ext.text, "[save=x.csv]");
}

#[test]
fn test_skip_keys_left_verbatim() {
    // post-execute directives survive preparation
    let sql = "select 1 /*{{save:x.csv}}*/ /*{{load:db.t}}*/";
    let ext = extract(sql, ANNOTATION_PATTERN, POST);
    assert_eq!(ext.text, sql);
    assert!(ext.is_empty());
}

#[test]
fn test_unknown_key_left_verbatim() {
    let sql = "select 1 /*{{vis:chart.csv}}*/";
    let ext = extract(sql, "", &[]);
    assert_eq!(ext.text, sql);
    assert!(ext.is_empty());
}

#[test]
fn test_missing_colon_is_malformed() {
    let sql = "select 1 /*{{temp}}*/ /*{{save:y.csv}}*/";
    let ext = extract(sql, "", &[]);
    assert_eq!(ext.text, "select 1 /*{{temp}}*/ ");
    assert_eq!(ext.get(DirectiveKey::Save), Some("y.csv"));
    assert!(!ext.contains(DirectiveKey::Temp));
}

#[test]
fn test_unterminated_stops_scan() {
    let sql = "/*{{save:a.csv}}*/ select 1 /*{{load:db.t";
    let ext = extract(sql, "", &[]);
    assert_eq!(ext.text, " select 1 /*{{load:db.t");
    assert_eq!(ext.get(DirectiveKey::Save), Some("a.csv"));
    assert!(!ext.contains(DirectiveKey::Load));
}

#[test]
fn test_last_value_wins() {
    let ext = extract("/*{{save:a.csv}}*/ x /*{{SAVE:b.csv}}*/", "<>", &[]);
    assert_eq!(ext.text, "<> x <>");
    assert_eq!(ext.get(DirectiveKey::Save), Some("b.csv"));
}

#[test]
fn test_directives_in_handling_order() {
    let ext = extract(
        "/*{{loop:l.csv}}*/ /*{{temp:t.csv}}*/ /*{{file:f.sql}}*/",
        "",
        &[],
    );
    let keys: Vec<DirectiveKey> = ext.directives().iter().map(Directive::key).collect();
    assert_eq!(
        keys,
        vec![DirectiveKey::File, DirectiveKey::Temp, DirectiveKey::Loop]
    );
}

#[test]
fn test_extraction_is_idempotent() {
    let inputs = [
        "select 1 /*{{save:x.csv}}*/ /*{{load:db.t}}*/ /*{{temp:d.csv}}*/",
        "/*{{loop:p.csv}}*/ select {id} /*{{vis:v}}*/ /*{{oops}}*/",
        "select 2 /*{{file:inc.sql",
    ];
    for input in inputs {
        let first = extract(input, ANNOTATION_PATTERN, POST);
        let second = extract(&first.text, ANNOTATION_PATTERN, POST);
        assert_eq!(second.text, first.text, "{input}");
        assert!(second.is_empty(), "{input}");
    }
}

#[test]
fn test_marker_round_trip() {
    let d = Directive::new(DirectiveKey::Load, "db_stg.t");
    assert_eq!(d.to_marker(), "/*{{load:db_stg.t}}*/");
    assert_eq!(extract(&d.to_marker(), "", &[]).directives(), vec![d]);
}
