use pretty_assertions::assert_eq;

use super::*;

const FORMATTED: &str = r#"// Copyright notice.

//go:build !js

// Package example is a fixture.
package example

import (
	"errors"
	stdsync "sync"
)

// ErrClosed is returned after Close.
var ErrClosed = errors.New("closed")

const (
	A = iota // first
	B
)

type (
	T1 int
	T2 = T1
)

type List[E any] struct {
	items []E
}

func (l *List[E]) Len() int { return len(l.items) }

func (T1) String() string {
	// Not exported.
	return "t1"
}

var mu stdsync.Mutex
"#;

fn parse(source: &str) -> SourceFile {
    SourceFile::parse("example.go", source).unwrap()
}

#[test]
fn test_unmodified_file_prints_identically() {
    let file = parse(FORMATTED);
    assert_eq!(file.to_source(), FORMATTED);
}

#[test]
fn test_declarations_in_source_order() {
    let file = parse(FORMATTED);
    assert_eq!(file.package_name(), "example");

    let kinds: Vec<&str> = file
        .decls
        .iter()
        .map(|decl| match decl {
            Decl::Import(_) => "import",
            Decl::Func(_) => "func",
            Decl::Type(_) => "type",
            Decl::Value(group) => group.keyword.as_str(),
            Decl::Removed(_) => "removed",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["import", "var", "const", "type", "type", "func", "func", "var"]
    );
}

#[test]
fn test_only_top_level_comments_are_collected() {
    let file = parse(FORMATTED);
    let texts: Vec<&str> = file.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "// Copyright notice.",
            "//go:build !js",
            "// Package example is a fixture.",
            "// ErrClosed is returned after Close.",
        ]
    );
}

#[test]
fn test_group_specs_and_names() {
    let file = parse(FORMATTED);

    let Decl::Import(imports) = &file.decls[0] else {
        panic!("expected import declaration");
    };
    assert!(imports.is_grouped());
    let paths: Vec<&str> = imports.specs.iter().map(|s| s.path.value.as_str()).collect();
    assert_eq!(paths, vec!["errors", "sync"]);
    assert_eq!(imports.specs[0].name, None);
    assert_eq!(
        imports.specs[1].name.as_ref().map(|n| n.name.as_str()),
        Some("stdsync")
    );

    let Decl::Value(consts) = &file.decls[2] else {
        panic!("expected const declaration");
    };
    assert_eq!(consts.keyword, Keyword::Const);
    assert_eq!(consts.specs.len(), 2);
    assert_eq!(consts.specs[1].names[0].name, "B");

    let Decl::Type(types) = &file.decls[3] else {
        panic!("expected type declaration");
    };
    assert!(!types.specs[0].alias);
    assert!(types.specs[1].alias);
}

#[test]
fn test_receivers_reduce_to_base_type() {
    let file = parse(FORMATTED);
    let methods: Vec<(String, bool)> = file
        .decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::Func(func) => func
                .receiver
                .as_ref()
                .map(|r| (func.qualified_name(), r.pointer)),
            _ => None,
        })
        .collect();
    assert_eq!(
        methods,
        vec![("List.Len".to_string(), true), ("T1.String".to_string(), false)]
    );
}

#[test]
fn test_multi_name_value_spec() {
    let file = parse("package x\n\nvar a, _, c = f()\n");
    let Decl::Value(group) = &file.decls[0] else {
        panic!("expected var declaration");
    };
    let names: Vec<&str> = group.specs[0].names.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["a", "_", "c"]);
    assert!(group.specs[0].names[1].is_blank());
    assert!(!group.is_grouped());
}

#[test]
fn test_positions_are_one_based() {
    let file = parse("package x\n\nfunc F() {}\n");
    let Decl::Func(func) = &file.decls[0] else {
        panic!("expected func declaration");
    };
    assert_eq!(file.position(func.span.start), Position::new("example.go", 3, 1));
    assert_eq!(file.position(func.name.span.start).to_string(), "example.go:3:6");
}

#[test]
fn test_syntax_error_is_reported_with_position() {
    let err = SourceFile::parse("broken.go", "package x\n\nfunc (\n").unwrap_err();
    match err {
        crate::OverlayError::Parse { file, line, .. } => {
            assert_eq!(file, "broken.go");
            assert!(line >= 3);
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_missing_package_clause() {
    let err = SourceFile::parse("empty.go", "").unwrap_err();
    assert!(err.is_parse_error());
}

#[test]
fn test_removed_spec_keeps_group_layout() {
    let source = "package x\n\nvar (\n\t// A doc.\n\tA int // a\n\tB int\n\tC int // c\n)\n";

    let mut file = parse(source);
    if let Decl::Value(group) = &mut file.decls[0] {
        group.specs.retain(|spec| spec.names[0].name != "A");
    }
    assert_eq!(
        file.to_source(),
        "package x\n\nvar (\n\tB int\n\tC int // c\n)\n"
    );

    let mut file = parse(source);
    if let Decl::Value(group) = &mut file.decls[0] {
        group.specs.retain(|spec| spec.names[0].name != "C");
    }
    assert_eq!(
        file.to_source(),
        "package x\n\nvar (\n\t// A doc.\n\tA int // a\n\tB int\n)\n"
    );
}

#[test]
fn test_tombstone_and_placeholder_layout() {
    let mut file = parse("package x\n\n// F doc.\nfunc F() {}\n\nfunc G() {}\n");
    let anchor = file.decls[0].span().start;
    file.remove_decl(0);
    file.comments.push(Comment::placeholder(anchor, "// func F"));

    assert!(file.decls[0].is_removed());
    assert_eq!(
        file.to_source(),
        "package x\n\n// F doc.\n// func F\n\nfunc G() {}\n"
    );
}

#[test]
fn test_inserted_identifier_and_rewritten_path() {
    let mut file = parse("package x\n\nimport \"sync\"\n");
    for spec in file.import_specs_mut() {
        spec.name = Some(Ident::inserted(spec.path.span.start, "sync"));
        spec.path.value = "alt/nosync".to_string();
    }
    assert_eq!(
        file.to_source(),
        "package x\n\nimport sync \"alt/nosync\"\n"
    );
}

#[test]
fn test_unquote() {
    assert_eq!(unquote("\"fmt\""), "fmt");
    assert_eq!(unquote("`fmt`"), "fmt");
    assert_eq!(unquote("fmt"), "fmt");
}

#[test]
fn test_single_line_groups() {
    let source = "package x; var (V1 int; V2 int); const (A = 1; B = 2;); type (S int; U = S)\nvar (a, b = 1, 2; c = 3)\n";
    let file = parse(source);
    assert_eq!(
        file.to_source(),
        "package x\nvar (V1 int; V2 int)\nconst (A = 1; B = 2;)\ntype (S int; U = S)\nvar (a, b = 1, 2; c = 3)\n"
    );
    assert_eq!(file.decls.len(), 4);

    let Decl::Value(vars) = &file.decls[0] else {
        panic!("expected var declaration");
    };
    assert!(vars.is_grouped());
    assert_eq!(vars.layout().len(), 2);
    assert_eq!(&source[vars.specs[1].span.start..vars.specs[1].span.end], "V2 int");
    assert_eq!(&source[vars.span.start..vars.span.end], "var (V1 int; V2 int)");
    assert_eq!(vars.open, Some(source.find('(').unwrap() + 1));

    let Decl::Value(consts) = &file.decls[1] else {
        panic!("expected const declaration");
    };
    assert_eq!(&source[consts.specs[1].span.start..consts.specs[1].span.end], "B = 2");

    let Decl::Type(types) = &file.decls[2] else {
        panic!("expected type declaration");
    };
    assert!(types.specs[1].alias);
    assert_eq!(types.specs[1].name.name, "U");
    assert_eq!(file.position(types.specs[1].name.span.start).to_string(), "example.go:1:70");

    let Decl::Value(multi) = &file.decls[3] else {
        panic!("expected var declaration");
    };
    let names: Vec<&str> = multi
        .specs
        .iter()
        .flat_map(|spec| spec.names.iter())
        .map(|n| n.name.as_str())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_single_line_group_with_removed_spec() {
    let mut file = parse("package x; var (V1 int; V2 int; V3 int)");
    if let Decl::Value(group) = &mut file.decls[0] {
        group.specs.retain(|spec| spec.names[0].name != "V2");
    }
    assert_eq!(file.to_source(), "package x\nvar (V1 int; V3 int)");
}

#[test]
fn test_crlf_line_endings_survive_edits() {
    let mut file = parse("package x\r\n\r\nfunc F() {}\r\n\r\nfunc G() {}\r\n");
    let anchor = file.decls[0].span().start;
    file.remove_decl(0);
    file.comments.push(Comment::placeholder(anchor, "// func F"));
    assert_eq!(file.to_source(), "package x\r\n\r\n// func F\r\n\r\nfunc G() {}\r\n");

    let mut file = parse("package x\r\n\r\nvar (\r\n\tA int // a\r\n\tB int\r\n)\r\n");
    if let Decl::Value(group) = &mut file.decls[0] {
        group.specs.retain(|spec| spec.names[0].name != "A");
    }
    assert_eq!(file.to_source(), "package x\r\n\r\nvar (\r\n\tB int\r\n)\r\n");

    let mut file = parse("package x\r\nfunc F() {}; func G() {}\r\n");
    let anchor = file.decls[0].span().start;
    file.remove_decl(0);
    file.comments.push(Comment::placeholder(anchor, "// func F"));
    assert_eq!(file.to_source(), "package x\r\n// func F\r\nfunc G() {}\r\n");
}
