use std::env;

use bimaudit_dsl::{compile, default_grammar, TypeVocabulary};

fn main() {
    let mut args = env::args().skip(1);
    let Some(rule) = args.next() else {
        eprintln!("usage: bimaudit_parse_rule \"VERIFY <CHILD> CONTAINED_IN <PARENT>\"");
        std::process::exit(2);
    };
    if args.next().is_some() {
        eprintln!("usage: bimaudit_parse_rule \"VERIFY <CHILD> CONTAINED_IN <PARENT>\"");
        std::process::exit(2);
    }

    let grammar = match default_grammar() {
        Ok(g) => g,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let ast = match grammar.parse(rule.trim()) {
        Ok(ast) => ast,
        Err(err) => {
            eprintln!("parse error: {err}");
            std::process::exit(1);
        }
    };

    match compile(&ast, &TypeVocabulary::ifc()) {
        Ok(query) => {
            println!(
                "ok(rule): child={} parent={} relation={}",
                query.child_class, query.parent_class, query.relation
            );
            println!("{}", query.text);
        }
        Err(err) => {
            eprintln!("compile error: {err}");
            std::process::exit(1);
        }
    }
}
